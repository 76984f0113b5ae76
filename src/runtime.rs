//! Conversion session: bootstrap scan, then the main pass over the log.

use log::{debug, info, trace};

use crate::{
    assembler::{Assembler, Settings as AssemblerSettings},
    bootstrap::{Bootstrap, Overrides, Source},
    collecter::{
        navigation::Collecter as NavCollecter,
        observation::{Collecter as ObsCollecter, HeaderInfo},
        settings::{Observable, Settings as RinexSettings},
    },
    error::Error,
    monitor::{Filter, Monitor},
    navigation::Decoder,
    packet::{NavWord, PayloadLayout, ReceiverModel, Record},
    reader::PacketReader,
};

/// Everything a conversion session needs
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Receiver family
    pub model: ReceiverModel,

    /// Observation RINEX production
    pub observation: bool,

    /// Navigation RINEX production
    pub navigation: bool,

    /// Navigation message monitor
    pub monitor: Option<Filter>,

    pub rinex: RinexSettings,
    pub assembler: AssemblerSettings,
    pub overrides: Overrides,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            model: ReceiverModel::default(),
            observation: true,
            navigation: false,
            monitor: None,
            rinex: RinexSettings::default(),
            assembler: AssemblerSettings::default(),
            overrides: Overrides::default(),
        }
    }
}

impl Options {
    /// Rejects inconsistent combinations, and drops the phase-only
    /// fallback when phase is not released.
    pub fn validate(mut self) -> Result<Self, Error> {
        if self.observation && self.rinex.observables.is_empty() {
            return Err(Error::NoObservables);
        }

        if self.rinex.stdout && self.observation && self.navigation {
            return Err(Error::Configuration(
                "cannot stream observations and navigation to stdout at the same time".to_string(),
            ));
        }

        if self.rinex.interval == 0 {
            return Err(Error::Configuration("null decimation interval".to_string()));
        }

        if self.assembler.phase_only && !self.rinex.observables.contains(&Observable::L1) {
            debug!("phase-only fallback disabled: phase is not released");
            self.assembler.phase_only = false;
        }

        Ok(self)
    }
}

/// Session outcome
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    /// Accepted epochs
    pub accepted: usize,

    /// Rejected epochs
    pub rejected: usize,

    /// Malformed records
    pub malformed: usize,

    /// Observation file, when produced in a file
    pub observation: Option<String>,

    /// Released observation epochs
    pub epochs: usize,

    /// Navigation file, when produced in a file
    pub navigation: Option<String>,

    /// Released ephemerides
    pub ephemerides: usize,

    /// Reported subframes
    pub subframes: usize,
}

pub struct Runtime {
    layout: &'static dyn PayloadLayout,

    /// Position and time reference
    pub bootstrap: Bootstrap,

    assembler: Assembler,
    decoder: Decoder,

    obs: Option<ObsCollecter>,
    nav: Option<NavCollecter>,
    monitor: Option<Monitor>,

    malformed: usize,
}

impl Runtime {
    /// Runs the bootstrap scan and prepares the session.
    /// Fails when no position/time reference can be obtained.
    pub fn new(reader: &mut PacketReader, options: Options) -> Result<Self, Error> {
        let options = options.validate()?;
        let layout = options.model.layout();

        let bootstrap = Bootstrap::scan(reader, layout, &options.overrides)?;

        let comments = Self::header_comments(&options, layout);

        let obs = if options.observation {
            let info = HeaderInfo {
                position: bootstrap.position,
                receiver: bootstrap.receiver.clone(),
                week: bootstrap.week,
                tow: bootstrap.tow,
                comments: comments.clone(),
                position_origin: Self::position_origin(&bootstrap, &options.overrides),
            };
            Some(ObsCollecter::new(options.rinex.clone(), info))
        } else {
            None
        };

        let nav = if options.navigation {
            Some(NavCollecter::new(options.rinex.clone(), comments))
        } else {
            None
        };

        Ok(Self {
            layout,
            decoder: Decoder::new(Some(bootstrap.week)),
            bootstrap,
            assembler: Assembler::new(options.assembler),
            obs,
            nav,
            monitor: options.monitor.map(Monitor::new),
            malformed: 0,
        })
    }

    fn header_comments(options: &Options, layout: &dyn PayloadLayout) -> Vec<String> {
        let mut comments = vec![format!("** Receiver layout: {}", layout.name())];

        if options.assembler.relax {
            comments.push("** Relaxed epoch validation".to_string());
        }

        if options.assembler.phase_only {
            comments.push("** Phase only on stale clock reference".to_string());
        }

        if options.rinex.clock_reset {
            comments.push("** Receiver clock reset to integer seconds".to_string());
        }

        comments
    }

    fn position_origin(bootstrap: &Bootstrap, overrides: &Overrides) -> String {
        if overrides.position.is_some() {
            return "** Position provided by user".to_string();
        }

        match bootstrap.source {
            Source::PvtFix(fix) => format!("** Position from receiver PVT solution (fix {})", fix),
            Source::LatLonUtc => "** Position from receiver lat/lon record, null height".to_string(),
            Source::User => "** Position provided by user".to_string(),
        }
    }

    /// Main pass, from the first record of the log
    pub fn run(&mut self, reader: &mut PacketReader) -> Result<Report, Error> {
        reader.rewind();

        while let Some(raw) = reader.next() {
            let record = match Record::decode(&raw, self.layout) {
                Ok(record) => record,
                Err(e) => {
                    trace!("{}", e);
                    self.malformed += 1;
                    continue;
                },
            };

            match record {
                Record::Measurement(measurement) => {
                    if !self.assembler.push(measurement) {
                        // first record of the next epoch
                        reader.step_back();
                        self.close_epoch()?;
                    }
                },
                Record::Doppler(doppler) => self.assembler.push_doppler(doppler),
                Record::NavWord(word) => self.latch_nav_word(&word)?,
                _ => {},
            }
        }

        if self.assembler.has_pending() {
            self.close_epoch()?;
        }

        self.finish()
    }

    fn close_epoch(&mut self) -> Result<(), Error> {
        // rejections are logged by the assembler
        if let Ok(Some(epoch)) = self.assembler.close() {
            if let Some(obs) = &mut self.obs {
                obs.latch(&epoch)?;
            }
        }
        Ok(())
    }

    fn latch_nav_word(&mut self, word: &NavWord) -> Result<(), Error> {
        self.assembler.latch_clock_word(word);

        let Some(report) = self.decoder.latch(word) else {
            return Ok(());
        };

        if let Some(monitor) = &mut self.monitor {
            monitor.latch(&report);
        }

        if let (Some(nav), Some(eph)) = (&mut self.nav, &report.new_ephemeris) {
            nav.latch(eph, self.decoder.iono_utc.as_ref())?;
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<Report, Error> {
        let mut report = Report {
            accepted: self.assembler.summary.accepted,
            rejected: self.assembler.summary.rejected,
            malformed: self.malformed,
            ..Default::default()
        };

        if let Some(obs) = &mut self.obs {
            obs.finish()?;
            report.observation = obs.path.clone();
            report.epochs = obs.released;
        }

        if let Some(nav) = &mut self.nav {
            nav.finish()?;
            report.navigation = nav.path.clone();
            report.ephemerides = nav.released;
        }

        if let Some(monitor) = &self.monitor {
            report.subframes = monitor.reported;
        }

        info!(
            "{} epochs accepted, {} rejected, {} released",
            report.accepted, report.rejected, report.epochs
        );

        if self.nav.is_some() {
            info!("{} ephemerides released", report.ephemerides);
        }

        if report.malformed > 0 {
            debug!("{} malformed records", report.malformed);
        }

        Ok(report)
    }
}

/// Bootstrap then convert
pub fn convert(reader: &mut PacketReader, options: Options) -> Result<Report, Error> {
    let mut runtime = Runtime::new(reader, options)?;
    runtime.run(reader)
}
