use log::{debug, info, trace};

use std::io::{BufWriter, Write};

use gnss::prelude::{Constellation, SV};
use hifitime::prelude::Duration;

use crate::{
    assembler::{ObsEntry, ObsEpoch},
    collecter::{
        fd::FileDescriptor,
        header_line, program,
        settings::{Observable, Settings},
    },
    error::Error,
    packet::ProductId,
    time::{Calendar, gpst_epoch, week_of},
    utils::{L1_FREQUENCY, SPEED_OF_LIGHT, signal_strength},
};

/// Satellites per epoch line
const SATELLITES_PER_LINE: usize = 12;

/// Static header content, known once the log has been pre-scanned
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    /// Approximate ECEF position (m)
    pub position: (f64, f64, f64),

    /// Receiver identification
    pub receiver: ProductId,

    /// Reference GPS week
    pub week: u32,

    /// Reference time of week (s)
    pub tow: u32,

    /// Comments released after the program line
    pub comments: Vec<String>,

    /// Describes where the approximate position comes from
    pub position_origin: String,
}

pub struct Collecter {
    /// [Settings]
    settings: Settings,

    /// [HeaderInfo]
    info: HeaderInfo,

    /// Current [FileDescriptor] handle
    fd: Option<BufWriter<FileDescriptor>>,

    /// Output file path, None when streaming to stdout
    pub path: Option<String>,

    /// Number of released epochs
    pub released: usize,
}

impl Collecter {
    /// Builds new [Collecter]
    pub fn new(settings: Settings, info: HeaderInfo) -> Self {
        Self {
            settings,
            info,
            fd: None,
            path: None,
            released: 0,
        }
    }

    /// Obtain a new file descriptor
    fn fd(&mut self) -> Result<FileDescriptor, Error> {
        if self.settings.stdout {
            return Ok(FileDescriptor::stdout());
        }

        let t = Calendar::from_gps(self.info.week, self.info.tow as i64);
        let filename = self.settings.filename(false, &t);

        let fd = FileDescriptor::new(self.settings.gzip, &filename)?;
        info!("observations: {}", filename);

        self.path = Some(filename);
        Ok(fd)
    }

    /// Latches an accepted epoch: the header is released on first call,
    /// the epoch is then released unless decimated.
    pub fn latch(&mut self, epoch: &ObsEpoch) -> Result<(), Error> {
        if self.fd.is_none() {
            self.release_header(epoch)?;
        }

        let interval = self.settings.interval.max(1) as i64;

        if epoch.itow() % interval != 0 {
            trace!("tow={} - decimated", epoch.itow());
            return Ok(());
        }

        if epoch.entries.is_empty() {
            return Ok(());
        }

        self.release_epoch(epoch)
    }

    /// Flushes and terminates the output
    pub fn finish(&mut self) -> Result<(), Error> {
        if let Some(fd) = self.fd.take() {
            let fd = fd.into_inner().map_err(|e| e.into_error())?;
            fd.finish()?;
        }
        Ok(())
    }

    fn release_header(&mut self, first: &ObsEpoch) -> Result<(), Error> {
        let mut fd = BufWriter::new(self.fd()?);

        let header = self.format_header(first);
        fd.write_all(header.as_bytes())?;

        let _ = fd.flush(); // can fail

        self.fd = Some(fd);

        debug!("{} - RINEX header redacted", self.log_epoch(first.tow));
        Ok(())
    }

    fn release_epoch(&mut self, epoch: &ObsEpoch) -> Result<(), Error> {
        let formatted = self.format_epoch(epoch);

        if let Some(fd) = &mut self.fd {
            fd.write_all(formatted.as_bytes())?;
        }

        self.released += 1;

        debug!(
            "{} - new epoch released: {}",
            self.log_epoch(epoch.tow),
            epoch
                .entries
                .iter()
                .map(|entry| SV::new(Constellation::GPS, entry.prn).to_string())
                .collect::<Vec<_>>()
                .join(",")
        );

        Ok(())
    }

    fn log_epoch(&self, tow: f64) -> hifitime::Epoch {
        gpst_epoch(self.week(tow), tow).round(Duration::from_seconds(1.0))
    }

    fn week(&self, tow: f64) -> u32 {
        week_of(self.info.week, self.info.tow, tow)
    }

    /// Clock offset removed from the receiver time (s)
    fn clock_offset(&self, tow: f64) -> f64 {
        if self.settings.clock_reset {
            let dt = tow - (tow + 0.5).floor();
            (dt * 1.0E9).floor() / 1.0E9
        } else {
            0.0
        }
    }

    /// Calendar and fractional seconds of receiver time `tow`
    fn calendar(&self, tow: f64) -> (Calendar, f64) {
        let t = tow - self.clock_offset(tow);
        let calendar = Calendar::from_gps(self.week(tow), t.floor() as i64);
        (calendar, calendar.second as f64 + t - t.floor())
    }

    pub fn format_header(&self, first: &ObsEpoch) -> String {
        let mut header = String::with_capacity(24 * 81);

        header.push_str(&header_line(
            &format!("{:9.2}{:11}{:<20}{:<20}", 2.11, "", "OBSERVATION DATA", "G (GPS)"),
            "RINEX VERSION / TYPE",
        ));

        let (t0, seconds) = self.calendar(first.tow);

        header.push_str(&header_line(
            &format!(
                "{:<20.20}{:<20.20}{:04}{:02}{:02} {:02}{:02}{:02} GPS",
                program(),
                self.settings.observer.as_deref().unwrap_or("Garmin Owner"),
                t0.year,
                t0.month,
                t0.day,
                t0.hour,
                t0.minute,
                t0.second,
            ),
            "PGM / RUN BY / DATE",
        ));

        header.push_str(&header_line(
            "** gar2rinex: Garmin G12 log to RINEX observations",
            "COMMENT",
        ));

        for comment in self.info.comments.iter() {
            header.push_str(&header_line(comment, "COMMENT"));
        }

        if let Some(comment) = &self.settings.header_comment {
            header.push_str(&header_line(comment, "COMMENT"));
        }

        header.push_str(&header_line(&self.settings.marker, "MARKER NAME"));
        header.push_str(&header_line("A001", "MARKER NUMBER"));

        header.push_str(&header_line(
            &format!(
                "{:<20.20}{:<40.40}",
                self.settings.observer.as_deref().unwrap_or("Unknown"),
                self.settings.agency.as_deref().unwrap_or("Unknown"),
            ),
            "OBSERVER / AGENCY",
        ));

        let receiver = &self.info.receiver;

        header.push_str(&header_line(
            &format!(
                "{:<20}{:<18.18}  {:<20.20}",
                format!("{:03}", receiver.product),
                receiver.description,
                format!("{:4.2}", receiver.version),
            ),
            "REC # / TYPE / VERS",
        ));

        header.push_str(&header_line(&format!("{:<20}{:<20}", "NONE", "NONE"), "ANT # / TYPE"));
        header.push_str(&header_line(&self.info.position_origin, "COMMENT"));

        let (x, y, z) = self.info.position;
        header.push_str(&header_line(
            &format!("{:14.4}{:14.4}{:14.4}", x, y, z),
            "APPROX POSITION XYZ",
        ));

        header.push_str(&header_line(
            &format!("{:14.4}{:14.4}{:14.4}", 0.0, 0.0, 0.0),
            "ANTENNA: DELTA H/E/N",
        ));

        header.push_str(&header_line(
            &format!("{:6}{:6}", if self.settings.half_cycle { 2 } else { 1 }, 0),
            "WAVELENGTH FACT L1/2",
        ));

        let mut types = format!("{:6}", self.settings.observables.len());
        for observable in self.settings.observables.iter() {
            types.push_str(&format!("{:>6}", observable.to_string()));
        }
        header.push_str(&header_line(&types, "# / TYPES OF OBSERV"));

        header.push_str(&header_line(
            &format!(
                "{:6}{:6}{:6}{:6}{:6}{:12.6}{:6}GPS",
                t0.year, t0.month, t0.day, t0.hour, t0.minute, seconds, ""
            ),
            "TIME OF FIRST OBS",
        ));

        header.push_str(&header_line(
            &format!("{:10.3}", self.settings.interval as f64),
            "INTERVAL",
        ));

        header.push_str(&header_line("", "END OF HEADER"));
        header
    }

    pub fn format_epoch(&self, epoch: &ObsEpoch) -> String {
        let (t, seconds) = self.calendar(epoch.tow);
        let dt = self.clock_offset(epoch.tow);

        let mut formatted = format!(
            " {:02} {:02} {:02} {:02} {:02}{:11.7}{:3}{:3}",
            t.yy(),
            t.month,
            t.day,
            t.hour,
            t.minute,
            seconds,
            0,
            epoch.entries.len(),
        );

        for (k, entry) in epoch.entries.iter().enumerate() {
            if k > 0 && k % SATELLITES_PER_LINE == 0 {
                formatted.push('\n');
                formatted.push_str(&format!("{:32}", ""));
            }
            formatted.push_str(&format!("G{:02}", entry.prn));
        }

        for _ in epoch.entries.len()..SATELLITES_PER_LINE {
            formatted.push_str("   ");
        }

        formatted.push('\n');

        for entry in epoch.entries.iter() {
            formatted.push_str(&self.format_entry(entry, dt));
            formatted.push('\n');
        }

        formatted
    }

    fn format_entry(&self, entry: &ObsEntry, dt: f64) -> String {
        let snr = if self.settings.snr {
            signal_strength(entry.signal)
        } else {
            0
        };

        let mut formatted = String::with_capacity(48);

        for observable in self.settings.observables.iter() {
            match observable {
                Observable::C1 => match entry.pseudorange {
                    Some(pr) => {
                        formatted.push_str(&format!("{:14.3} {}", pr - SPEED_OF_LIGHT * dt, snr))
                    },
                    None => formatted.push_str(&format!("{:16}", "")),
                },
                Observable::L1 => formatted.push_str(&format!(
                    "{:14.3} {}",
                    entry.phase - L1_FREQUENCY * dt,
                    snr
                )),
                Observable::D1 => {
                    if let Some(doppler) = entry.doppler {
                        formatted.push_str(&format!("{:14.3} {}", -doppler, snr));
                    }
                },
            }
        }

        formatted
    }
}

#[cfg(test)]
mod test {
    use super::{Collecter, HeaderInfo};
    use crate::{
        assembler::{ObsEntry, ObsEpoch},
        collecter::settings::{Observable, Settings},
        packet::ProductId,
    };

    fn info() -> HeaderInfo {
        HeaderInfo {
            position: (-1266643.1357, -4727176.5388, 4079014.0320),
            receiver: ProductId {
                product: 87,
                version: 2.1,
                description: "GPS 12 Software Version 2.10".to_string(),
            },
            week: 2086,
            tow: 3 * 86400,
            comments: vec!["** Receiver layout: GPS12".to_string()],
            position_origin: "** Position from receiver PVT solution".to_string(),
        }
    }

    fn settings() -> Settings {
        Settings {
            observables: Observable::from_mask(7),
            ..Default::default()
        }
    }

    fn entry(prn: u8) -> ObsEntry {
        ObsEntry {
            prn,
            pseudorange: Some(21_000_000.125),
            phase: 1234.5,
            doppler: Some(-1500.25),
            signal: 6500,
        }
    }

    #[test]
    fn header_layout() {
        let collecter = Collecter::new(settings(), info());

        let first = ObsEpoch {
            tow: 3.0 * 86400.0 + 3661.0,
            entries: vec![],
        };

        let header = collecter.format_header(&first);

        for line in header.lines() {
            assert_eq!(line.len(), 80, "\"{}\"", line);
        }

        let lines = header.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "     2.11           OBSERVATION DATA    G (GPS)             RINEX VERSION / TYPE"
        );
        assert!(lines[1].contains("20200101 010101 GPS"));
        assert!(lines.contains(
            &"087                 GPS 12 Software Ve  2.10                REC # / TYPE / VERS "
        ));
        assert!(lines.contains(
            &" -1266643.1357 -4727176.5388  4079014.0320                  APPROX POSITION XYZ "
        ));
        assert!(lines.contains(
            &"     3    C1    L1    D1                                    # / TYPES OF OBSERV "
        ));
        assert!(lines.contains(
            &"  2020     1     1     1     1    1.000000      GPS         TIME OF FIRST OBS   "
        ));
        assert!(lines.contains(
            &"     1.000                                                  INTERVAL            "
        ));
        assert!(lines.contains(
            &"     1     0                                                WAVELENGTH FACT L1/2"
        ));
        assert_eq!(lines.last().map(|l| l.trim()), Some("END OF HEADER"));
    }

    #[test]
    fn epoch_layout() {
        let collecter = Collecter::new(settings(), info());

        let epoch = ObsEpoch {
            tow: 3.0 * 86400.0 + 3661.0000002,
            entries: vec![
                entry(2),
                ObsEntry {
                    pseudorange: None,
                    doppler: None,
                    signal: 9500,
                    ..entry(17)
                },
            ],
        };

        let formatted = collecter.format_epoch(&epoch);
        let lines = formatted.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            " 20 01 01 01 01  1.0000002  0  2G02G17                              "
        );
        assert_eq!(lines[1], "  21000000.125 8      1234.500 8      1500.250 8");
        assert_eq!(lines[2], format!("{:22}1234.500 9", ""));
    }

    #[test]
    fn clock_reset() {
        let settings = Settings {
            clock_reset: true,
            snr: false,
            observables: vec![Observable::C1, Observable::L1],
            ..Default::default()
        };

        let collecter = Collecter::new(settings, info());

        let epoch = ObsEpoch {
            tow: 3.0 * 86400.0 + 3661.001,
            entries: vec![entry(5)],
        };

        let formatted = collecter.format_epoch(&epoch);
        let lines = formatted.lines().collect::<Vec<_>>();

        assert!(lines[0].starts_with(" 20 01 01 01 01  1.0000000  0  1G05"));

        let pr = lines[1][..14].trim().parse::<f64>().unwrap();
        assert!((pr - (21_000_000.125 - 299_792.458)).abs() < 2.0E-3, "{}", pr);
        assert!(lines[1].ends_with(" 0"));
        assert_eq!(lines[1].len(), 32);
    }

    #[test]
    fn continuation_lines() {
        let collecter = Collecter::new(settings(), info());

        let epoch = ObsEpoch {
            tow: 3.0 * 86400.0,
            entries: (1..=14).map(entry).collect(),
        };

        let formatted = collecter.format_epoch(&epoch);
        let lines = formatted.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 2 + 14);
        assert!(lines[0].ends_with(" 14G01G02G03G04G05G06G07G08G09G10G11G12"));
        assert_eq!(lines[1], format!("{:32}G13G14", ""));
    }
}
