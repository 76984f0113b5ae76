use hifitime::prelude::{Epoch, TimeScale};

/// Seconds per GPS week
pub const WEEK_SECONDS: i64 = 604_800;

/// Leap seconds applied when converting UTC calendar times to GPS time.
/// This is a fixed value, not a leap second table.
pub const LEGACY_LEAP_SECONDS: f64 = 13.0;

/// GPS week starting 1989-12-31, origin of the receiver day count
pub const RECEIVER_REFERENCE_WEEK: u32 = 521;

/// Julian day of the GPS origin (1980-01-06 00:00:00)
const GPS_ORIGIN_JULIAN_DAY: f64 = 2444244.5;

/// Days between 1970-01-01 and the GPS origin
const GPS_ORIGIN_UNIX_DAYS: i64 = 3657;

/// Broken down GPS calendar time (no leap seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 1 = January 1st
    pub day_of_year: u16,
}

impl Calendar {
    /// Calendar of whole second `seconds` counted from the start of GPS `week`.
    /// `seconds` may exceed one week, or be negative.
    pub fn from_gps(week: u32, seconds: i64) -> Self {
        let total = week as i64 * WEEK_SECONDS + seconds;
        let days = total.div_euclid(86_400);
        let secs = total.rem_euclid(86_400);

        let (year, month, day) = civil_from_days(days + GPS_ORIGIN_UNIX_DAYS);
        let day_of_year = days + GPS_ORIGIN_UNIX_DAYS - days_from_civil(year, 1, 1) + 1;

        Self {
            year,
            month,
            day,
            hour: (secs / 3600) as u8,
            minute: ((secs % 3600) / 60) as u8,
            second: (secs % 60) as u8,
            day_of_year: day_of_year as u16,
        }
    }

    /// Two digit year
    pub fn yy(&self) -> i32 {
        self.year.rem_euclid(100)
    }
}

/// Days since 1970-01-01 to (year, month, day)
fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year as i32, month as u8, day as u8)
}

/// (year, month, day) to days since 1970-01-01
fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = year as i64 - if month <= 2 { 1 } else { 0 };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Julian day, valid between March 1900 and February 2100
pub fn julian_day(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: f64) -> f64 {
    let (y, m) = if month <= 2 {
        (year as f64 - 1.0, month as f64 + 12.0)
    } else {
        (year as f64, month as f64)
    };

    let hours = hour as f64 + (minute as f64 + second / 60.0) / 60.0;

    (365.25 * y).floor() + (30.6001 * (m + 1.0)).floor() + day as f64 + hours / 24.0 + 1720981.5
}

/// UTC calendar time to (GPS week, time of week rounded to the second),
/// using [LEGACY_LEAP_SECONDS].
pub fn gps_time_from_utc(
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> (u32, u32) {
    let jd = julian_day(year, month, day, hour, minute, second as f64) + LEGACY_LEAP_SECONDS / 86400.0;
    let days = jd - GPS_ORIGIN_JULIAN_DAY;
    let week = (days / 7.0).floor();
    let tow = ((days - week * 7.0) * 86400.0).round();

    if tow >= WEEK_SECONDS as f64 {
        (week as u32 + 1, 0)
    } else {
        (week as u32, tow as u32)
    }
}

/// GPS week from the receiver day count (days since 1989-12-31)
pub fn week_from_receiver_days(days: u32) -> u32 {
    RECEIVER_REFERENCE_WEEK + days / 7
}

/// Week of a time of week, for a log that started at (`week`, `reference_tow`).
/// A time of week far behind the reference belongs to the next week.
pub fn week_of(week: u32, reference_tow: u32, tow: f64) -> u32 {
    let half = (WEEK_SECONDS / 2) as f64;
    let reference = reference_tow as f64;

    if tow + half < reference {
        week + 1
    } else if tow > reference + half {
        week.saturating_sub(1)
    } else {
        week
    }
}

/// GPST [Epoch], used to timestamp logs
pub fn gpst_epoch(week: u32, tow: f64) -> Epoch {
    let nanos = (tow.max(0.0) * 1.0E9).round() as u64;
    Epoch::from_time_of_week(week, nanos, TimeScale::GPST)
}
