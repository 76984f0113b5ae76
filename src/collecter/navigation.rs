use std::io::{BufWriter, Write};

use log::{debug, info};

use gnss::prelude::{Constellation, SV};

use crate::{
    collecter::{fd::FileDescriptor, format_d, header_line, program, settings::Settings},
    ephemeris::EphemerisSet,
    error::Error,
    navigation::subframe::{IonoUtc, ura_meters},
    time::{Calendar, gpst_epoch},
};

pub struct Collecter {
    /// Collection [Settings]
    settings: Settings,

    /// Custom header comments
    header_comments: Vec<String>,

    /// Current [FileDescriptor] handle
    fd: Option<BufWriter<FileDescriptor>>,

    /// Output file path, None when streaming to stdout
    pub path: Option<String>,

    /// Number of released ephemerides
    pub released: usize,
}

impl Collecter {
    /// Builds new [Collecter]
    pub fn new(settings: Settings, header_comments: Vec<String>) -> Self {
        Self {
            settings,
            header_comments,
            fd: None,
            path: None,
            released: 0,
        }
    }

    /// Obtain a new file descriptor
    fn fd(&mut self, t: &Calendar) -> Result<FileDescriptor, Error> {
        if self.settings.stdout {
            return Ok(FileDescriptor::stdout());
        }

        let filename = self.settings.filename(true, t);
        let fd = FileDescriptor::new(self.settings.gzip, &filename)?;

        info!("navigation: {}", filename);

        self.path = Some(filename);
        Ok(fd)
    }

    /// Latches a new ephemeris. Unhealthy satellites are not released.
    /// The header is released with the first ephemeris.
    pub fn latch(&mut self, eph: &EphemerisSet, iono_utc: Option<&IonoUtc>) -> Result<(), Error> {
        let sv = SV::new(Constellation::GPS, eph.prn);
        let t = gpst_epoch(eph.week, eph.tom);

        if !eph.is_healthy() {
            debug!("{}({}) - unhealthy satellite", t, sv);
            return Ok(());
        }

        let Some(record) = Self::format_record(eph) else {
            return Ok(());
        };

        if self.fd.is_none() {
            let calendar = Calendar::from_gps(eph.week, eph.tom as i64);
            let mut fd = BufWriter::new(self.fd(&calendar)?);

            fd.write_all(self.format_header(iono_utc, eph.week).as_bytes())?;
            self.fd = Some(fd);

            debug!("{} - NAV header released", t);
        }

        if let Some(fd) = &mut self.fd {
            fd.write_all(record.as_bytes())?;
            let _ = fd.flush(); // can fail
        }

        self.released += 1;
        debug!("{}({}) - new LNAV ephemeris", t, sv);

        Ok(())
    }

    /// Flushes and terminates the output
    pub fn finish(&mut self) -> Result<(), Error> {
        if let Some(fd) = self.fd.take() {
            let fd = fd.into_inner().map_err(|e| e.into_error())?;
            fd.finish()?;
        }
        Ok(())
    }

    pub fn format_header(&self, iono_utc: Option<&IonoUtc>, week: u32) -> String {
        let mut header = String::with_capacity(12 * 81);

        header.push_str(&header_line(
            &format!("{:9.2}{:11}{:<20}", 2.1, "", "N: GPS NAV DATA"),
            "RINEX VERSION / TYPE",
        ));

        header.push_str(&header_line(
            &format!(
                "{:<20.20}{:<20.20}",
                program(),
                self.settings.observer.as_deref().unwrap_or("Garmin Owner"),
            ),
            "PGM / RUN BY / DATE",
        ));

        header.push_str(&header_line(
            "** gar2rinex: Garmin G12 log to RINEX navigation",
            "COMMENT",
        ));

        for comment in self.header_comments.iter() {
            header.push_str(&header_line(comment, "COMMENT"));
        }

        if let Some(comment) = &self.settings.header_comment {
            header.push_str(&header_line(comment, "COMMENT"));
        }

        if let Some(iono_utc) = iono_utc {
            let alpha = iono_utc
                .alpha
                .iter()
                .map(|a| format!("{:>12}", format_d(*a, 4)))
                .collect::<String>();

            let beta = iono_utc
                .beta
                .iter()
                .map(|b| format!("{:>12}", format_d(*b, 4)))
                .collect::<String>();

            header.push_str(&header_line(&format!("  {}", alpha), "ION ALPHA"));
            header.push_str(&header_line(&format!("  {}", beta), "ION BETA"));

            header.push_str(&header_line(
                &format!(
                    "   {}{}{:9}{:9}",
                    format_d(iono_utc.a0, 12),
                    format_d(iono_utc.a1, 12),
                    iono_utc.tot,
                    utc_reference_week(week, iono_utc.wnt),
                ),
                "DELTA-UTC: A0,A1,T,W",
            ));

            header.push_str(&header_line(
                &format!("{:6}", iono_utc.delta_t_ls),
                "LEAP SECONDS",
            ));
        }

        header.push_str(&header_line("", "END OF HEADER"));
        header
    }

    /// Formats one ephemeris record, None when incomplete
    pub fn format_record(eph: &EphemerisSet) -> Option<String> {
        let (clock, orbit2, orbit3) = (eph.clock?, eph.orbit2?, eph.orbit3?);

        let toc = clock.toc.floor();
        let t = Calendar::from_gps(eph.week, toc as i64);

        let mut formatted = format!(
            "{:2} {:02} {:2} {:02} {:2} {:2}{:5.1}",
            eph.prn,
            t.yy(),
            t.month,
            t.day,
            t.hour,
            t.minute,
            t.second as f64 + clock.toc - toc,
        );

        for value in [clock.af0, clock.af1, clock.af2] {
            formatted.push_str(&format_d(value, 12));
        }

        formatted.push('\n');

        for values in [
            [orbit2.iode as f64, orbit2.crs, orbit2.dn, orbit2.m0],
            [orbit2.cuc, orbit2.ecc, orbit2.cus, orbit2.sqrt_a],
            [orbit2.toe, orbit3.cic, orbit3.omega0, orbit3.cis],
            [orbit3.i0, orbit3.crc, orbit3.omega, orbit3.omega_dot],
            [
                orbit3.idot,
                clock.l2_codes as f64,
                eph.week as f64,
                clock.l2p_flag as f64,
            ],
            [
                ura_meters(clock.ura),
                (clock.health >> 5) as f64,
                clock.tgd,
                clock.iodc as f64,
            ],
            [eph.tom, 0.0, 0.0, 0.0],
        ] {
            formatted.push_str("   ");
            for value in values {
                formatted.push_str(&format_d(value, 12));
            }
            formatted.push('\n');
        }

        Some(formatted)
    }
}

/// Full week of the UTC reference time, from its 8 LSB
fn utc_reference_week(week: u32, wnt: u8) -> u32 {
    let candidate = (week & !0xff) | wnt as u32;

    if candidate + 128 < week {
        candidate + 256
    } else if candidate > week + 128 && candidate >= 256 {
        candidate - 256
    } else {
        candidate
    }
}
