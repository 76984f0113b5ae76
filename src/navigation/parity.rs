//! GPS LNAV word parity.
//!
//! Raw words are stored on 32 bits: bits 31 and 30 hold the D29/D30
//! parity bits of the previous word, bits 29 to 6 hold d1..d24 and
//! bits 5 to 0 the transmitted D25..D30 parity bits.

const DATA_MASK: u32 = 0x3fff_ffc0;
const PARITY_MASK: u32 = 0x3f;

/// Data bits involved in D25..D30, numbered 1..=24
const EQUATIONS: [(bool, &[u32]); 6] = [
    (true, &[1, 2, 3, 5, 6, 10, 11, 12, 13, 14, 17, 18, 20, 23]),
    (false, &[2, 3, 4, 6, 7, 11, 12, 13, 14, 15, 18, 19, 21, 24]),
    (true, &[1, 3, 4, 5, 7, 8, 12, 13, 14, 15, 16, 19, 20, 22]),
    (false, &[2, 4, 5, 6, 8, 9, 13, 14, 15, 16, 17, 20, 21, 23]),
    (false, &[1, 3, 5, 6, 7, 9, 10, 14, 15, 16, 17, 18, 21, 22, 24]),
    (true, &[3, 5, 6, 8, 9, 10, 11, 13, 15, 19, 22, 23, 24]),
];

fn previous_d29(word: u32) -> u32 {
    (word >> 31) & 1
}

fn previous_d30(word: u32) -> u32 {
    (word >> 30) & 1
}

/// Source data bits d1..d24, complemented when the previous D30 is set
pub fn source_data(word: u32) -> u32 {
    let data = (word >> 6) & 0x00ff_ffff;
    if previous_d30(word) == 1 {
        data ^ 0x00ff_ffff
    } else {
        data
    }
}

/// Recomputes D25..D30 from the data bits and the previous D29/D30
fn compute(word: u32) -> u32 {
    let source = if previous_d30(word) == 1 {
        word ^ DATA_MASK
    } else {
        word
    };

    let bit = |n: u32| (source >> (30 - n)) & 1;

    EQUATIONS.iter().fold(0, |parity, (uses_d29, bits)| {
        let seed = if *uses_d29 {
            previous_d29(word)
        } else {
            previous_d30(word)
        };
        let p = bits.iter().fold(seed, |acc, n| acc ^ bit(*n));
        (parity << 1) | p
    })
}

/// True when the transmitted parity bits match
pub fn check(word: u32) -> bool {
    compute(word) == word & PARITY_MASK
}

/// Encodes 24 source data bits into a raw word, following the previous raw word
#[cfg(test)]
pub fn encode(data: u32, previous: u32) -> u32 {
    let d29 = (previous >> 1) & 1;
    let d30 = previous & 1;

    let mut word = (d29 << 31) | (d30 << 30) | ((data & 0x00ff_ffff) << 6);

    if d30 == 1 {
        word ^= DATA_MASK;
    }

    word | compute(word)
}
