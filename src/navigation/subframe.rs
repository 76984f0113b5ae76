//! Subframe field extraction and interpretation.
//!
//! Field positions are 1-based bit indexes within the 240 data bits
//! of one subframe (10 words x 24 data bits, parity removed).

use thiserror::Error;

use crate::utils::GPS_PI;

/// Data bytes per subframe
pub const SUBFRAME_BYTES: usize = 30;

const PREAMBLE: u8 = 0x8b;

/// SV id (data bits 51..56) to page number, None for unassigned ids
const PAGES: [i8; 64] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, //
    16, 17, 18, 19, 20, 21, 22, 23, 24, 2, 3, 4, 5, 7, 8, 9, //
    10, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, //
    -1, -1, -1, 25, 13, 14, 15, 17, 18, 1, 19, 20, 22, 23, 12, 25,
];

/// User range accuracy (m) per URA index, negative when unusable
const URA_TABLE: [f64; 16] = [
    2.0, 2.8, 4.0, 5.7, 8.0, 11.3, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0, 2048.0,
    4096.0, -1.0,
];

/// Converts a URA index to meters
pub fn ura_meters(index: u8) -> f64 {
    URA_TABLE[(index & 0x0f) as usize]
}

#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("bad parity")]
    Parity,
    #[error("{0} missing words")]
    MissingWords(usize),
    #[error("bad preamble 0x{0:02x}")]
    Preamble(u8),
    #[error("tow mismatch (how={found}, expected {expected})")]
    TowMismatch { expected: u32, found: u32 },
    #[error("invalid subframe id {0}")]
    InvalidId(u8),
}

/// 240 data bits view
pub struct Bits<'a>(pub &'a [u8; SUBFRAME_BYTES]);

impl Bits<'_> {
    /// Unsigned field, MSB first
    pub fn unsigned(&self, start: usize, len: usize) -> u32 {
        (0..len).fold(0_u64, |acc, i| {
            let n = start - 1 + i;
            let bit = (self.0[n / 8] >> (7 - n % 8)) & 1;
            (acc << 1) | bit as u64
        }) as u32
    }

    /// Two's complement field
    pub fn signed(&self, start: usize, len: usize) -> i64 {
        let raw = self.unsigned(start, len) as i64;
        if raw & (1 << (len - 1)) != 0 {
            raw - (1 << len)
        } else {
            raw
        }
    }

    /// Signed field scaled by 2^exp
    pub fn real(&self, start: usize, len: usize, exp: i32) -> f64 {
        self.signed(start, len) as f64 * 2.0_f64.powi(exp)
    }

    /// Unsigned field scaled by 2^exp
    pub fn ureal(&self, start: usize, len: usize, exp: i32) -> f64 {
        self.unsigned(start, len) as f64 * 2.0_f64.powi(exp)
    }

    /// Signed angle, in semi-circles scaled by 2^exp, converted to radians
    pub fn angle(&self, start: usize, len: usize, exp: i32) -> f64 {
        self.real(start, len, exp) * GPS_PI
    }
}

/// Subframe 1: clock and health
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ClockHealth {
    /// Week number modulo 1024
    pub week: u16,
    pub l2_codes: u8,
    pub ura: u8,
    pub health: u8,
    pub iodc: u16,
    pub l2p_flag: u8,
    pub tgd: f64,
    pub toc: f64,
    pub af0: f64,
    pub af1: f64,
    pub af2: f64,
}

/// Subframe 2: first half of the ephemeris
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Orbit2 {
    pub iode: u8,
    pub crs: f64,
    pub dn: f64,
    pub m0: f64,
    pub cuc: f64,
    pub ecc: f64,
    pub cus: f64,
    pub sqrt_a: f64,
    pub toe: f64,
    pub fit_flag: u8,
    pub aodo: u32,
}

/// Subframe 3: second half of the ephemeris
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Orbit3 {
    pub cic: f64,
    pub omega0: f64,
    pub cis: f64,
    pub i0: f64,
    pub crc: f64,
    pub omega: f64,
    pub omega_dot: f64,
    pub iode: u8,
    pub idot: f64,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Almanac {
    pub prn: u8,
    pub ecc: f64,
    pub toa: u32,
    /// Inclination, offset included (rad)
    pub i0: f64,
    pub omega_dot: f64,
    pub health: u8,
    pub sqrt_a: f64,
    pub omega0: f64,
    pub omega: f64,
    pub m0: f64,
    pub af0: f64,
    pub af1: f64,
}

/// Ionospheric and UTC parameters (subframe 4, page 18)
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct IonoUtc {
    pub alpha: [f64; 4],
    pub beta: [f64; 4],
    pub a0: f64,
    pub a1: f64,
    pub tot: u32,
    pub wnt: u8,
    pub delta_t_ls: i8,
    pub wn_lsf: u8,
    pub dn: u8,
    pub delta_t_lsf: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subframe {
    ClockHealth(ClockHealth),
    Orbit2(Orbit2),
    Orbit3(Orbit3),
    Almanac(Almanac),
    IonoUtc(IonoUtc),
    /// Special message (subframe 4, page 17)
    Text(String),
    /// Configuration of all satellites and health of PRN 25..32 (subframe 4, page 25)
    Configuration { config: [u8; 32], health: [u8; 8] },
    /// Almanac reference and health of PRN 1..24 (subframe 5, page 25)
    AlmanacHealth { toa: u32, wna: u8, health: [u8; 24] },
    /// Navigation message correction table availability (subframe 4, page 13)
    Nmct(u8),
    /// Dummy satellite, no data
    Dummy,
    /// Reserved or spare page
    Reserved,
}

/// One interpreted subframe
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Subframe id (1..=5)
    pub id: u8,
    /// Page number, subframes 4 and 5 only
    pub page: Option<u8>,
    pub content: Subframe,
}

/// Interprets one complete subframe. `index` is the subframe count
/// the handover word must carry.
pub fn decode(data: &[u8; SUBFRAME_BYTES], index: u32) -> Result<Decoded, FrameError> {
    let bits = Bits(data);

    if data[0] != PREAMBLE {
        return Err(FrameError::Preamble(data[0]));
    }

    let how_tow = bits.unsigned(25, 17);
    if how_tow != index {
        return Err(FrameError::TowMismatch {
            expected: index,
            found: how_tow,
        });
    }

    let id = bits.unsigned(44, 3) as u8;

    match id {
        1 => Ok(Decoded {
            id,
            page: None,
            content: Subframe::ClockHealth(clock_health(&bits)),
        }),
        2 => Ok(Decoded {
            id,
            page: None,
            content: Subframe::Orbit2(orbit2(&bits)),
        }),
        3 => Ok(Decoded {
            id,
            page: None,
            content: Subframe::Orbit3(orbit3(&bits)),
        }),
        4 | 5 => {
            let sv_id = bits.unsigned(51, 6) as u8;
            let page = u8::try_from(PAGES[sv_id as usize]).ok();
            let content = if id == 4 {
                subframe4(&bits, sv_id, page)
            } else {
                subframe5(&bits, sv_id, page)
            };
            Ok(Decoded { id, page, content })
        },
        id => Err(FrameError::InvalidId(id)),
    }
}

fn clock_health(bits: &Bits) -> ClockHealth {
    ClockHealth {
        week: bits.unsigned(49, 10) as u16,
        l2_codes: bits.unsigned(59, 2) as u8,
        ura: bits.unsigned(61, 4) as u8,
        health: bits.unsigned(65, 6) as u8,
        iodc: ((bits.unsigned(71, 2) << 8) + bits.unsigned(169, 8)) as u16,
        l2p_flag: bits.unsigned(73, 1) as u8,
        tgd: bits.real(161, 8, -31),
        toc: (bits.unsigned(177, 16) << 4) as f64,
        af2: bits.real(193, 8, -55),
        af1: bits.real(201, 16, -43),
        af0: bits.real(217, 22, -31),
    }
}

fn orbit2(bits: &Bits) -> Orbit2 {
    Orbit2 {
        iode: bits.unsigned(49, 8) as u8,
        crs: bits.real(57, 16, -5),
        dn: bits.angle(73, 16, -43),
        m0: bits.angle(89, 32, -31),
        cuc: bits.real(121, 16, -29),
        ecc: bits.ureal(137, 32, -33),
        cus: bits.real(169, 16, -29),
        sqrt_a: bits.ureal(185, 32, -19),
        toe: (bits.unsigned(217, 16) << 4) as f64,
        fit_flag: bits.unsigned(233, 1) as u8,
        aodo: bits.unsigned(234, 5) * 900,
    }
}

fn orbit3(bits: &Bits) -> Orbit3 {
    Orbit3 {
        cic: bits.real(49, 16, -29),
        omega0: bits.angle(65, 32, -31),
        cis: bits.real(97, 16, -29),
        i0: bits.angle(113, 32, -31),
        crc: bits.real(145, 16, -5),
        omega: bits.angle(161, 32, -31),
        omega_dot: bits.angle(193, 24, -43),
        iode: bits.unsigned(217, 8) as u8,
        idot: bits.angle(225, 14, -43),
    }
}

fn almanac(bits: &Bits, prn: u8) -> Almanac {
    let af0 = (bits.unsigned(217, 8) << 3) | bits.unsigned(236, 3);
    let af0 = if af0 & 0x400 != 0 {
        af0 as i64 - 0x800
    } else {
        af0 as i64
    };

    Almanac {
        prn,
        ecc: bits.ureal(57, 16, -21),
        toa: bits.unsigned(73, 8) << 12,
        i0: (0.3 + bits.real(81, 16, -19)) * GPS_PI,
        omega_dot: bits.angle(97, 16, -38),
        health: bits.unsigned(113, 8) as u8,
        sqrt_a: bits.ureal(121, 24, -11),
        omega0: bits.angle(145, 24, -23),
        omega: bits.angle(169, 24, -23),
        m0: bits.angle(193, 24, -23),
        af0: af0 as f64 * 2.0_f64.powi(-20),
        af1: bits.real(225, 11, -38),
    }
}

fn iono_utc(bits: &Bits) -> IonoUtc {
    const EXPONENTS: [i32; 8] = [-30, -27, -24, -24, 11, 14, 16, 16];

    let mut params = [0.0; 8];
    for (k, exp) in EXPONENTS.iter().enumerate() {
        params[k] = bits.real(57 + 8 * k, 8, *exp);
    }

    IonoUtc {
        alpha: [params[0], params[1], params[2], params[3]],
        beta: [params[4], params[5], params[6], params[7]],
        a1: bits.real(121, 24, -50),
        a0: bits.real(145, 32, -30),
        tot: bits.unsigned(177, 8) << 12,
        wnt: bits.unsigned(185, 8) as u8,
        delta_t_ls: bits.signed(193, 8) as i8,
        wn_lsf: bits.unsigned(201, 8) as u8,
        dn: bits.unsigned(209, 8) as u8,
        delta_t_lsf: bits.signed(217, 8) as i8,
    }
}

fn subframe4(bits: &Bits, sv_id: u8, page: Option<u8>) -> Subframe {
    if (25..=32).contains(&sv_id) {
        return Subframe::Almanac(almanac(bits, sv_id));
    }

    match page {
        Some(0) => Subframe::Dummy,
        Some(13) => Subframe::Nmct(bits.unsigned(57, 2) as u8),
        Some(17) => {
            let text = bits.0[7..29]
                .iter()
                .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { ' ' })
                .collect::<String>();
            Subframe::Text(text.trim_end().to_string())
        },
        Some(18) => Subframe::IonoUtc(iono_utc(bits)),
        Some(25) => {
            let mut config = [0; 32];
            for (k, c) in config.iter_mut().enumerate() {
                *c = bits.unsigned(57 + 4 * k, 4) as u8;
            }
            let mut health = [0; 8];
            for (k, h) in health.iter_mut().enumerate() {
                *h = bits.unsigned(187 + 6 * k, 6) as u8;
            }
            Subframe::Configuration { config, health }
        },
        _ => Subframe::Reserved,
    }
}

fn subframe5(bits: &Bits, sv_id: u8, page: Option<u8>) -> Subframe {
    match page {
        Some(0) => Subframe::Dummy,
        Some(25) => {
            let mut health = [0; 24];
            for (k, h) in health.iter_mut().enumerate() {
                *h = bits.unsigned(73 + 6 * k, 6) as u8;
            }
            Subframe::AlmanacHealth {
                toa: bits.unsigned(57, 8) << 12,
                wna: bits.unsigned(65, 8) as u8,
                health,
            }
        },
        Some(_) if (1..=24).contains(&sv_id) => Subframe::Almanac(almanac(bits, sv_id)),
        _ => Subframe::Reserved,
    }
}
