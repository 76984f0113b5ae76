use crate::navigation::subframe::{ClockHealth, Orbit2, Orbit3, Subframe};

/// Ephemeris of one satellite, gathered subframe by subframe
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct EphemerisSet {
    /// Satellite PRN
    pub prn: u8,

    /// Full GPS week, rollover resolved
    pub week: u32,

    /// Transmission time of the message (s of week)
    pub tom: f64,

    /// Subframe 1 content
    pub clock: Option<ClockHealth>,

    /// Subframe 2 content
    pub orbit2: Option<Orbit2>,

    /// Subframe 3 content
    pub orbit3: Option<Orbit3>,
}

impl EphemerisSet {
    pub fn new(prn: u8) -> Self {
        Self {
            prn,
            ..Default::default()
        }
    }

    /// Latches subframes 1, 2 or 3. Other subframes are ignored.
    pub fn update(&mut self, subframe: &Subframe, reference_week: Option<u32>) {
        match subframe {
            Subframe::ClockHealth(clock) => {
                self.week = resolve_week(clock.week, reference_week);
                self.clock = Some(*clock);
            },
            Subframe::Orbit2(orbit2) => self.orbit2 = Some(*orbit2),
            Subframe::Orbit3(orbit3) => self.orbit3 = Some(*orbit3),
            _ => {},
        }
    }

    /// Returns the issue of data, once IODC (LSB), IODE2 and IODE3 agree
    pub fn issue(&self) -> Option<u8> {
        let (clock, orbit2, orbit3) = (self.clock?, self.orbit2?, self.orbit3?);

        if (clock.iodc & 0xff) as u8 == orbit2.iode && orbit2.iode == orbit3.iode {
            Some(orbit3.iode)
        } else {
            None
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.clock.map(|clock| clock.health == 0).unwrap_or(false)
    }
}

/// Resolves a 10-bit week number against a reference week:
/// the closest rollover wins. Without reference, the first rollover is assumed.
pub fn resolve_week(week: u16, reference: Option<u32>) -> u32 {
    let week = (week & 0x3ff) as u32;

    match reference {
        Some(reference) => {
            let mut resolved = (reference / 1024) * 1024 + week;
            if resolved > reference + 512 && resolved >= 1024 {
                resolved -= 1024;
            } else if resolved + 512 < reference {
                resolved += 1024;
            }
            resolved
        },
        None => week + 1024,
    }
}
