//! Navigation message monitor: reports each closed subframe
//! of the selected satellites through the logger.

use log::info;

use crate::navigation::{
    FrameReport,
    subframe::{Decoded, Subframe},
};

/// Monitor selection
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Filter {
    /// Satellite (PRN), all satellites when None
    pub prn: Option<u8>,

    /// Subframe id (1..=5)
    pub subframe: Option<u8>,

    /// Page number (subframes 4 and 5)
    pub page: Option<u8>,

    /// Prints the decoded content
    pub verbose: bool,
}

impl Filter {
    /// True when this [FrameReport] should be reported.
    /// Subframes that could not be interpreted only pass when
    /// neither subframe id nor page is selected.
    pub fn matches(&self, report: &FrameReport) -> bool {
        if let Some(prn) = self.prn {
            if report.sv + 1 != prn {
                return false;
            }
        }

        if self.subframe.is_none() && self.page.is_none() {
            return true;
        }

        match &report.result {
            Ok(decoded) => {
                if let Some(id) = self.subframe {
                    if decoded.id != id {
                        return false;
                    }
                }
                match self.page {
                    Some(page) => decoded.page == Some(page),
                    None => true,
                }
            },
            Err(_) => false,
        }
    }
}

/// One mark per word: 'O' parity ok, 'X' parity failure, '.' not received
pub fn parity_marks(parity: &[Option<bool>; 10]) -> String {
    parity
        .iter()
        .map(|p| match p {
            Some(true) => 'O',
            Some(false) => 'X',
            None => '.',
        })
        .collect()
}

/// Short description of a decoded subframe
fn summary(decoded: &Decoded) -> String {
    let page = match decoded.page {
        Some(page) => format!(" page {:2}", page),
        None => "        ".to_string(),
    };

    let content = match &decoded.content {
        Subframe::ClockHealth(clock) => format!(
            "clock: week {} iodc {} ura {} health {:02x}",
            clock.week, clock.iodc, clock.ura, clock.health
        ),
        Subframe::Orbit2(orbit) => format!("ephemeris (1/2): iode {} toe {}", orbit.iode, orbit.toe),
        Subframe::Orbit3(orbit) => format!("ephemeris (2/2): iode {}", orbit.iode),
        Subframe::Almanac(almanac) => {
            format!("almanac: G{:02} toa {}", almanac.prn, almanac.toa)
        },
        Subframe::IonoUtc(iono_utc) => format!(
            "iono/utc: tot {} wnt {} leap {}",
            iono_utc.tot, iono_utc.wnt, iono_utc.delta_t_ls
        ),
        Subframe::Text(text) => format!("message: \"{}\"", text.trim_end()),
        Subframe::Configuration { .. } => "satellite configuration".to_string(),
        Subframe::AlmanacHealth { toa, wna, .. } => {
            format!("almanac health: toa {} wna {}", toa, wna)
        },
        Subframe::Nmct(available) => format!("nmct (availability {})", available),
        Subframe::Dummy => "dummy satellite".to_string(),
        Subframe::Reserved => "reserved".to_string(),
    };

    format!("sf {}{} {}", decoded.id, page, content)
}

#[derive(Debug, Default)]
pub struct Monitor {
    filter: Filter,

    /// Number of reported subframes
    pub reported: usize,
}

impl Monitor {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            reported: 0,
        }
    }

    /// Formats one report line, None when filtered out
    pub fn format(&self, report: &FrameReport) -> Option<String> {
        if !self.filter.matches(report) {
            return None;
        }

        let mut formatted = format!(
            "G{:02} HOW {:6} [{}] ",
            report.sv + 1,
            report.tom(),
            parity_marks(&report.parity)
        );

        match &report.result {
            Ok(decoded) => {
                formatted.push_str(&summary(decoded));
                if self.filter.verbose {
                    formatted.push_str(&format!("\n{:#?}", decoded.content));
                }
            },
            Err(e) => formatted.push_str(&format!("ERROR: {}", e)),
        }

        Some(formatted)
    }

    /// Reports a closed subframe
    pub fn latch(&mut self, report: &FrameReport) {
        if let Some(formatted) = self.format(report) {
            info!("{}", formatted);
            self.reported += 1;
        }
    }
}
