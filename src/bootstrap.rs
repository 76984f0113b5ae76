//! Position and time reference, obtained by a pre-scan of the whole log.

use log::{debug, info, trace, warn};

use crate::{
    error::Error,
    packet::{LAT_LON, PRODUCT_ID, PVT_FIX, PayloadLayout, ProductId, Record, UTC_TIME},
    reader::PacketReader,
    time::{gps_time_from_utc, gpst_epoch, week_from_receiver_days},
    utils::{llh_to_ecef, rad_to_ddeg},
};

/// User provided values. They always take precedence over recorded values.
#[derive(Debug, Clone, PartialEq)]
pub struct Overrides {
    /// Observation date (year, month, day), taken at 12:00:00 UTC
    pub date: Option<(i32, u8, u8)>,

    /// Approximate ECEF position (m)
    pub position: Option<(f64, f64, f64)>,

    /// Rank of the PVT record to trust, starting at 1
    pub pvt_index: usize,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            date: None,
            position: None,
            pvt_index: 1,
        }
    }
}

/// Where the reference was obtained
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Source {
    /// Position Velocity Time solution, with its fix type
    PvtFix(u16),
    /// Coarse position and UTC time records
    LatLonUtc,
    /// User overrides only
    User,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PvtFix(fix) => write!(f, "PVT record (fix type {})", fix),
            Self::LatLonUtc => write!(f, "position and UTC time records"),
            Self::User => write!(f, "user input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    /// Approximate ECEF position (m)
    pub position: (f64, f64, f64),

    /// GPS week
    pub week: u32,

    /// Time of week (s)
    pub tow: u32,

    pub source: Source,

    /// Receiver identification
    pub receiver: ProductId,
}

impl Bootstrap {
    /// Scans the whole log, then rewinds the reader
    pub fn scan(
        reader: &mut PacketReader,
        layout: &dyn PayloadLayout,
        overrides: &Overrides,
    ) -> Result<Self, Error> {
        let mut receiver = Option::<ProductId>::None;
        let mut pvt = Option::<((f64, f64, f64), u32, u32, u16)>::None;
        let mut pvt_count = 0;
        let mut latlon = None;
        let mut utc = None;

        reader.rewind();

        for raw in reader.by_ref() {
            if !matches!(raw.id, PVT_FIX | LAT_LON | UTC_TIME | PRODUCT_ID) {
                continue;
            }

            let record = match Record::decode(&raw, layout) {
                Ok(record) => record,
                Err(e) => {
                    trace!("bootstrap: {}", e);
                    continue;
                },
            };

            match record {
                Record::PvtFix(fix) => {
                    pvt_count += 1;
                    if pvt_count > overrides.pvt_index {
                        continue;
                    }

                    let position = llh_to_ecef(
                        rad_to_ddeg(fix.latitude),
                        rad_to_ddeg(fix.longitude),
                        (fix.altitude - fix.msl_height) as f64,
                    );

                    pvt = Some((
                        position,
                        week_from_receiver_days(fix.week_days),
                        (fix.tow + 0.5).floor() as u32,
                        fix.fix,
                    ));
                },
                Record::LatLon(pos) => latlon = Some(pos),
                Record::UtcTime(t) => utc = Some(t),
                Record::ProductId(Some(id)) => {
                    if receiver.is_none() {
                        debug!("receiver: {} v{:.2}", id.description, id.version);
                        receiver = Some(id);
                    }
                },
                _ => {},
            }
        }

        reader.rewind();

        let recorded = if let Some((position, week, tow, fix)) = pvt {
            if fix < 3 {
                warn!("no 3D fix in this session (fix type {}): approximate position may be poor", fix);
            }
            Some((position, week, tow, Source::PvtFix(fix)))
        } else if let (Some(pos), Some(t)) = (latlon, utc) {
            let position = llh_to_ecef(rad_to_ddeg(pos.latitude), rad_to_ddeg(pos.longitude), 0.0);

            let (week, tow) = gps_time_from_utc(
                t.year as i32,
                t.month,
                t.day,
                t.hour.clamp(0, 23) as u8,
                t.minute,
                t.second,
            );

            Some((position, week, tow, Source::LatLonUtc))
        } else {
            None
        };

        let user_time = overrides
            .date
            .map(|(year, month, day)| gps_time_from_utc(year, month, day, 12, 0, 0));

        let (mut position, mut week, mut tow, source) = match recorded {
            Some(recorded) => recorded,
            None => match (overrides.position, user_time) {
                (Some(position), Some((week, tow))) => (position, week, tow, Source::User),
                _ => return Err(Error::MissingReference),
            },
        };

        if let Some(user) = overrides.position {
            position = user;
        }

        if let Some((user_week, user_tow)) = user_time {
            week = user_week;
            tow = user_tow;
        }

        info!(
            "{} - reference obtained from {}: x={:.3} y={:.3} z={:.3}",
            gpst_epoch(week, tow as f64),
            source,
            position.0,
            position.1,
            position.2
        );

        Ok(Self {
            position,
            week,
            tow,
            source,
            receiver: receiver.unwrap_or_default(),
        })
    }
}
