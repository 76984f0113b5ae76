//! GPS legacy navigation message decoder.
//!
//! Each satellite gathers raw words into subframes. A subframe is
//! closed when a word from another subframe shows up, and only then
//! checked and interpreted.

use log::trace;

pub mod parity;
pub mod subframe;

use crate::{
    ephemeris::EphemerisSet,
    packet::{MAX_SATELLITES, NavWord},
};

use subframe::{Decoded, FrameError, IonoUtc, SUBFRAME_BYTES, Subframe};

/// Bits per subframe
const SUBFRAME_BITS: u32 = 300;

/// Bits per word
const WORD_BITS: u32 = 30;

/// Bit counter offset of the first word
const COUNTER_OFFSET: u32 = 30;

/// Report issued each time a satellite closes a subframe
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Satellite slot (PRN - 1)
    pub sv: u8,

    /// Index of the subframe now being received,
    /// the closed subframe was transmitted at 6 x (index - 1)
    pub index: u32,

    /// Parity status per word, None when the word was not received
    pub parity: [Option<bool>; 10],

    /// Interpretation
    pub result: Result<Decoded, FrameError>,

    /// Ephemeris, when this subframe completed a new issue of data
    pub new_ephemeris: Option<EphemerisSet>,
}

impl FrameReport {
    /// Transmission time of the closed subframe (s of week)
    pub fn tom(&self) -> u32 {
        6 * self.index.saturating_sub(1)
    }
}

/// Navigation state of one satellite
#[derive(Debug, Clone)]
pub struct SatelliteDecoder {
    sv: u8,

    /// Subframe being gathered
    index: Option<u32>,

    /// Data bits, parity removed
    data: [u8; SUBFRAME_BYTES],

    /// Parity status per word
    parity: [Option<bool>; 10],

    /// Ephemeris being gathered
    ephemeris: EphemerisSet,

    /// Latest issue of data reported
    last_issue: Option<u8>,

    /// Week used to resolve rollovers
    reference_week: Option<u32>,
}

impl SatelliteDecoder {
    pub fn new(sv: u8, reference_week: Option<u32>) -> Self {
        Self {
            sv,
            index: None,
            data: [0; SUBFRAME_BYTES],
            parity: [None; 10],
            ephemeris: EphemerisSet::new(sv + 1),
            last_issue: None,
            reference_week,
        }
    }

    /// Latches a new word, returns a [FrameReport] if a subframe was closed
    pub fn latch(&mut self, word: &NavWord) -> Option<FrameReport> {
        if word.counter < COUNTER_OFFSET {
            trace!("G{:02} - word counter {} out of range", self.sv + 1, word.counter);
            return None;
        }

        let index = (word.counter - COUNTER_OFFSET) / SUBFRAME_BITS;
        let position = (((word.counter - COUNTER_OFFSET) % SUBFRAME_BITS) / WORD_BITS) as usize;

        let report = match self.index {
            Some(current) if current != index => Some(self.close(index)),
            _ => None,
        };

        self.index = Some(index);

        self.parity[position] = Some(parity::check(word.word));

        let data = parity::source_data(word.word);
        self.data[3 * position] = (data >> 16) as u8;
        self.data[3 * position + 1] = (data >> 8) as u8;
        self.data[3 * position + 2] = data as u8;

        report
    }

    fn close(&mut self, index: u32) -> FrameReport {
        let parity = self.parity;

        let missing = parity.iter().filter(|p| p.is_none()).count();

        let result = if parity.iter().any(|p| *p == Some(false)) {
            Err(FrameError::Parity)
        } else if missing > 0 {
            Err(FrameError::MissingWords(missing))
        } else {
            subframe::decode(&self.data, index)
        };

        self.data = [0; SUBFRAME_BYTES];
        self.parity = [None; 10];

        if let Ok(decoded) = &result {
            self.ephemeris.update(&decoded.content, self.reference_week);
        }

        let mut new_ephemeris = None;

        if let Some(issue) = self.ephemeris.issue() {
            if self.last_issue != Some(issue) {
                self.last_issue = Some(issue);
                self.ephemeris.tom = (6 * index.saturating_sub(1)) as f64;
                new_ephemeris = Some(self.ephemeris);
            }
        }

        FrameReport {
            sv: self.sv,
            index,
            parity,
            result,
            new_ephemeris,
        }
    }
}

/// Navigation decoder for all satellites
pub struct Decoder {
    satellites: Vec<SatelliteDecoder>,

    /// Latest ionospheric and UTC parameters, from any satellite
    pub iono_utc: Option<IonoUtc>,
}

impl Decoder {
    pub fn new(reference_week: Option<u32>) -> Self {
        Self {
            satellites: (0..MAX_SATELLITES as u8)
                .map(|sv| SatelliteDecoder::new(sv, reference_week))
                .collect(),
            iono_utc: None,
        }
    }

    /// Latches a new [NavWord]
    pub fn latch(&mut self, word: &NavWord) -> Option<FrameReport> {
        let satellite = self.satellites.get_mut(word.sv as usize)?;
        let report = satellite.latch(word)?;

        if let Ok(Decoded {
            content: Subframe::IonoUtc(iono_utc),
            ..
        }) = &report.result
        {
            self.iono_utc = Some(*iono_utc);
        }

        Some(report)
    }
}
