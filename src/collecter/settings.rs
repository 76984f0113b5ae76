use std::path::Path;

use crate::time::Calendar;

/// Default observation station name
pub const DEFAULT_OBS_NAME: &str = "site";

/// Default navigation station name
pub const DEFAULT_NAV_NAME: &str = "brdc";

/// Supported observables, in header order
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Observable {
    /// C/A code pseudo range
    C1,
    /// L1 carrier phase
    L1,
    /// L1 Doppler shift
    D1,
}

impl std::fmt::Display for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::C1 => write!(f, "C1"),
            Self::L1 => write!(f, "L1"),
            Self::D1 => write!(f, "D1"),
        }
    }
}

impl Observable {
    /// Builds the observable list from a 3-bit mask:
    /// bit 0 selects C1, bit 1 L1 and bit 2 D1.
    pub fn from_mask(mask: u8) -> Vec<Self> {
        [Self::C1, Self::L1, Self::D1]
            .into_iter()
            .enumerate()
            .filter(|(k, _)| mask & (1 << k) != 0)
            .map(|(_, observable)| observable)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Observation station name
    pub name: String,

    /// Navigation station name
    pub nav_name: String,

    /// GZIP compression
    pub gzip: bool,

    /// Custom file prefix
    pub prefix: Option<String>,

    /// Stream to standard output rather than files
    pub stdout: bool,

    /// Custom marker name
    pub marker: String,

    /// Custom observer
    pub observer: Option<String>,

    /// Custom publishing agency
    pub agency: Option<String>,

    /// Custom header comment
    pub header_comment: Option<String>,

    /// Released observables
    pub observables: Vec<Observable>,

    /// Decimation interval (s)
    pub interval: u32,

    /// Declares half cycle L1 ambiguities (wavelength factor 2)
    pub half_cycle: bool,

    /// Signal strength digits
    pub snr: bool,

    /// Re-references each epoch to the nearest second
    pub clock_reset: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: DEFAULT_OBS_NAME.to_string(),
            nav_name: DEFAULT_NAV_NAME.to_string(),
            gzip: false,
            prefix: None,
            stdout: false,
            marker: "Measured Point".to_string(),
            observer: None,
            agency: None,
            header_comment: None,
            observables: vec![Observable::C1, Observable::L1],
            interval: 1,
            half_cycle: false,
            snr: true,
            clock_reset: false,
        }
    }
}

impl Settings {
    /// Returns the first file path of the session series
    /// that does not exist yet (session 9 is reused once all exist).
    pub fn filename(&self, is_nav: bool, t: &Calendar) -> String {
        let name = if is_nav { &self.nav_name } else { &self.name };

        let prefix = if let Some(prefix) = &self.prefix {
            format!("{}/", prefix)
        } else {
            "".to_string()
        };

        let mut filepath = String::new();

        for session in 1..=9 {
            filepath = format!(
                "{}{}",
                prefix,
                Self::v2_filename(name, session, is_nav, self.gzip, t)
            );

            if !Path::new(&filepath).exists() {
                break;
            }
        }

        filepath
    }

    fn v2_filename(name: &str, session: u8, is_nav: bool, gzip: bool, t: &Calendar) -> String {
        let mut formatted = format!("{:_<4.4}{:03}{}.{:02}", name, t.day_of_year, session, t.yy());

        if is_nav {
            formatted.push('N');
        } else {
            formatted.push('O');
        }

        if gzip {
            formatted.push_str(".gz");
        }

        formatted
    }
}

#[cfg(test)]
mod test {
    use super::{Observable, Settings};
    use crate::time::Calendar;
    use std::fs::File;

    #[test]
    fn test_v2_filename() {
        let t = Calendar::from_gps(2086, 3 * 86400);

        assert_eq!(Settings::v2_filename("site", 1, false, false, &t), "site0011.20O");
        assert_eq!(Settings::v2_filename("brdc", 3, true, false, &t), "brdc0013.20N");
        assert_eq!(Settings::v2_filename("abc", 1, false, true, &t), "abc_0011.20O.gz");
        assert_eq!(Settings::v2_filename("toolong", 2, true, true, &t), "tool0012.20N.gz");

        let t = Calendar::from_gps(1042, 6 * 86400 + 3600);
        assert_eq!(Settings::v2_filename("site", 1, false, false, &t), "site0011.00O");
    }

    #[test]
    fn session_number() {
        let prefix = std::env::temp_dir().join("gar2rinex-session-test");
        let _ = std::fs::remove_dir_all(&prefix);
        std::fs::create_dir_all(&prefix).unwrap();

        let settings = Settings {
            name: "sess".to_string(),
            prefix: Some(prefix.to_string_lossy().to_string()),
            ..Default::default()
        };

        let t = Calendar::from_gps(2086, 3 * 86400);

        let first = settings.filename(false, &t);
        assert!(first.ends_with("sess0011.20O"));

        File::create(&first).unwrap();
        let second = settings.filename(false, &t);
        assert!(second.ends_with("sess0012.20O"));

        // independent series
        assert!(settings.filename(true, &t).ends_with("brdc0011.20N"));

        let _ = std::fs::remove_dir_all(&prefix);
    }

    #[test]
    fn observable_mask() {
        assert_eq!(
            Observable::from_mask(7),
            vec![Observable::C1, Observable::L1, Observable::D1]
        );
        assert_eq!(Observable::from_mask(5), vec![Observable::C1, Observable::D1]);
        assert_eq!(Observable::from_mask(2), vec![Observable::L1]);
        assert!(Observable::from_mask(0).is_empty());
    }
}
