use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command, value_parser};

use crate::{
    assembler::Settings as AssemblerSettings,
    bootstrap::Overrides,
    collecter::settings::{DEFAULT_NAV_NAME, DEFAULT_OBS_NAME, Observable, Settings as RinexSettings},
    error::Error,
    monitor::Filter,
    packet::ReceiverModel,
    runtime::Options,
    utils::llh_to_ecef,
};

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self {
            matches: Self::command().get_matches(),
        }
    }

    fn command() -> Command {
        Command::new("gar2rinex")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Garmin G12 binary log to RINEX converter")
            .color(ColorChoice::Always)
            .arg_required_else_help(true)
            .next_help_heading("Input")
            .arg(
                Arg::new("file")
                    .long("file")
                    .short('f')
                    .value_name("FILENAME")
                    .required(true)
                    .help("G12 log to convert. Use \"-\" to read standard input.
Gzip files are supported but they must be terminated with '.gz'"),
            )
            .arg(
                Arg::new("etrex")
                    .long("etrex")
                    .action(ArgAction::SetTrue)
                    .help("Log was recorded with an eTrex receiver (different payload layout)"),
            )
            .next_help_heading("Diagnostics")
            .arg(
                Arg::new("stats")
                    .long("stats")
                    .action(ArgAction::SetTrue)
                    .help("Print record statistics (JSON) and exit"),
            )
            .arg(
                Arg::new("monitor")
                    .long("monitor")
                    .value_name("PRN")
                    .value_parser(value_parser!(u8).range(1..=32))
                    .help("Monitor the navigation message of this satellite.
Observation RINEX is not produced in this mode"),
            )
            .arg(
                Arg::new("subframe")
                    .long("sf")
                    .value_name("ID")
                    .value_parser(value_parser!(u8).range(1..=5))
                    .requires("monitor")
                    .help("Only monitor this subframe"),
            )
            .arg(
                Arg::new("page")
                    .long("page")
                    .value_name("PAGE")
                    .value_parser(value_parser!(u8).range(1..=25))
                    .requires("monitor")
                    .help("Only monitor this page (subframes 4 and 5)"),
            )
            .arg(
                Arg::new("verbose-nav")
                    .long("verbose-nav")
                    .action(ArgAction::SetTrue)
                    .requires("monitor")
                    .help("Print the decoded content of each monitored subframe"),
            )
            .next_help_heading("Position & time reference")
            .arg(
                Arg::new("date")
                    .long("date")
                    .num_args(3)
                    .value_names(["YYYY", "MM", "DD"])
                    .value_parser(value_parser!(i32))
                    .help("Observation date. Required when the log has neither a position fix nor UTC time records"),
            )
            .arg(
                Arg::new("xyz")
                    .long("xyz")
                    .num_args(3)
                    .value_names(["X", "Y", "Z"])
                    .value_parser(value_parser!(f64))
                    .allow_negative_numbers(true)
                    .conflicts_with("llh")
                    .help("Approximate ECEF position (m), overrides the recorded position"),
            )
            .arg(
                Arg::new("llh")
                    .long("llh")
                    .num_args(3)
                    .value_names(["LAT", "LON", "H"])
                    .value_parser(value_parser!(f64))
                    .allow_negative_numbers(true)
                    .help("Approximate geodetic position (ddeg, ddeg, m), overrides the recorded position"),
            )
            .arg(
                Arg::new("pvt")
                    .long("pvt")
                    .value_name("N")
                    .value_parser(value_parser!(u64).range(1..))
                    .help("Trust the N-th position fix of the log. Default is the first one"),
            )
            .next_help_heading("Epoch validation")
            .arg(
                Arg::new("start")
                    .long("start")
                    .value_name("TOW")
                    .value_parser(value_parser!(i64))
                    .help("Discard epochs before this time of week (s)"),
            )
            .arg(
                Arg::new("stop")
                    .long("stop")
                    .value_name("TOW")
                    .value_parser(value_parser!(i64))
                    .help("Discard epochs after this time of week (s)"),
            )
            .arg(
                Arg::new("duration")
                    .long("duration")
                    .value_name("SECONDS")
                    .value_parser(value_parser!(i64))
                    .help("Discard epochs past this duration, counted from the start time"),
            )
            .arg(
                Arg::new("phase-only")
                    .long("phase-only")
                    .action(ArgAction::SetTrue)
                    .help("Release phase without pseudo range, rather than nothing, when the clock reference is stale"),
            )
            .arg(
                Arg::new("relax")
                    .long("relax")
                    .action(ArgAction::SetTrue)
                    .help("Release every satellite, whatever its tracking continuity"),
            )
            .next_help_heading("RINEX Collection")
            .arg(
                Arg::new("name")
                    .long("name")
                    .short('n')
                    .action(ArgAction::Set)
                    .help(format!("Define a custom name. To respect standard naming conventions,
this should be a 4 letter code, usually named after your geodetic marker.
When not defined, the default value is \"{}\".", DEFAULT_OBS_NAME)),
            )
            .arg(
                Arg::new("nav-name")
                    .long("nav-name")
                    .action(ArgAction::Set)
                    .help(format!("Custom navigation file name. Default is \"{}\".", DEFAULT_NAV_NAME)),
            )
            .arg(
                Arg::new("marker")
                    .long("marker")
                    .short('m')
                    .action(ArgAction::Set)
                    .help("Define the marker name"),
            )
            .arg(
                Arg::new("prefix")
                    .long("prefix")
                    .required(false)
                    .help("Custom directory prefix for output products. Default is none!"),
            )
            .arg(
                Arg::new("stdout")
                    .long("stdout")
                    .action(ArgAction::SetTrue)
                    .help("Stream RINEX to standard output rather than files"),
            )
            .arg(
                Arg::new("gzip")
                    .long("gzip")
                    .action(ArgAction::SetTrue)
                    .help("Gzip compress the RINEX output."),
            )
            .arg(
                Arg::new("agency")
                    .long("agency")
                    .action(ArgAction::Set)
                    .required(false)
                    .help("Define name of your Agency, to be used in all Headers"),
            )
            .arg(
                Arg::new("observer")
                    .long("observer")
                    .action(ArgAction::Set)
                    .required(false)
                    .help("Define name of Observer, to be used in all Headers"),
            )
            .arg(
                Arg::new("comment")
                    .long("comment")
                    .action(ArgAction::Set)
                    .required(false)
                    .help("Custom comment, to be used in all Headers"),
            )
            .next_help_heading("Observations collection")
            .arg(
                Arg::new("no-obs")
                    .long("no-obs")
                    .action(ArgAction::SetTrue)
                    .help("Disable Observation RINEX collection. You can use this if you intend to collect Ephemerides only for example"),
            )
            .arg(
                Arg::new("interval")
                    .short('s')
                    .long("interval")
                    .value_name("SECONDS")
                    .value_parser(value_parser!(u32).range(1..))
                    .help("Decimation interval. Default value is 1s (every epoch).")
            )
            .arg(
                Arg::new("no-pr")
                    .long("no-pr")
                    .action(ArgAction::SetTrue)
                    .help("Do not release pseudo range")
            )
            .arg(
                Arg::new("no-phase")
                    .long("no-phase")
                    .action(ArgAction::SetTrue)
                    .help("Do not release signal phase")
            )
            .arg(
                Arg::new("doppler")
                    .long("doppler")
                    .action(ArgAction::SetTrue)
                    .help("Release doppler shifts, which is not enabled by default")
            )
            .arg(
                Arg::new("half-cycle")
                    .long("half-cycle")
                    .action(ArgAction::SetTrue)
                    .help("Declare half cycle phase ambiguities (L1 wavelength factor 2)")
            )
            .arg(
                Arg::new("no-snr")
                    .long("no-snr")
                    .action(ArgAction::SetTrue)
                    .help("Do not release signal strength indicators")
            )
            .arg(
                Arg::new("clock-reset")
                    .long("clock-reset")
                    .action(ArgAction::SetTrue)
                    .help("Re-reference each epoch to the nearest integer second, correcting observations accordingly")
            )
            .next_help_heading("Navigation messages collection")
            .arg(
                Arg::new("nav")
                    .long("nav")
                    .required(false)
                    .action(ArgAction::SetTrue)
                    .help("Activate Navigation messages collection, which is not enabled by default.")
            )
    }

    /// Input file path
    pub fn filepath(&self) -> &str {
        self.matches
            .get_one::<String>("file")
            .map(|s| s.as_str())
            .unwrap_or("-")
    }

    /// Statistics mode
    pub fn stats(&self) -> bool {
        self.matches.get_flag("stats")
    }

    fn receiver_model(&self) -> ReceiverModel {
        if self.matches.get_flag("etrex") {
            ReceiverModel::Etrex
        } else {
            ReceiverModel::Gps12
        }
    }

    fn observables(&self) -> Vec<Observable> {
        let mut mask = 0x03;

        if self.matches.get_flag("no-pr") {
            mask &= !0x01;
        }
        if self.matches.get_flag("no-phase") {
            mask &= !0x02;
        }
        if self.matches.get_flag("doppler") {
            mask |= 0x04;
        }

        Observable::from_mask(mask)
    }

    fn monitor_filter(&self) -> Option<Filter> {
        let prn = *self.matches.get_one::<u8>("monitor")?;
        Some(Filter {
            prn: Some(prn),
            subframe: self.matches.get_one::<u8>("subframe").copied(),
            page: self.matches.get_one::<u8>("page").copied(),
            verbose: self.matches.get_flag("verbose-nav"),
        })
    }

    fn triplet<T: Copy + Send + Sync + 'static>(&self, key: &str) -> Option<(T, T, T)> {
        let values = self.matches.get_many::<T>(key)?.copied().collect::<Vec<_>>();
        match values[..] {
            [a, b, c] => Some((a, b, c)),
            _ => None,
        }
    }

    fn date(&self) -> Result<Option<(i32, u8, u8)>, Error> {
        let Some((year, month, day)) = self.triplet::<i32>("date") else {
            return Ok(None);
        };

        if !(1980..=2099).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(Error::InvalidDate(format!("{}-{}-{}", year, month, day)));
        }

        Ok(Some((year, month as u8, day as u8)))
    }

    fn position(&self) -> Option<(f64, f64, f64)> {
        if let Some(xyz) = self.triplet::<f64>("xyz") {
            return Some(xyz);
        }

        let (lat, lon, h) = self.triplet::<f64>("llh")?;
        Some(llh_to_ecef(lat, lon, h))
    }

    fn overrides(&self) -> Result<Overrides, Error> {
        Ok(Overrides {
            date: self.date()?,
            position: self.position(),
            pvt_index: self.matches.get_one::<u64>("pvt").map(|n| *n as usize).unwrap_or(1),
        })
    }

    fn assembler_settings(&self) -> AssemblerSettings {
        AssemblerSettings {
            start: self.matches.get_one::<i64>("start").copied(),
            stop: self.matches.get_one::<i64>("stop").copied(),
            duration: self.matches.get_one::<i64>("duration").copied(),
            relax: self.matches.get_flag("relax"),
            phase_only: self.matches.get_flag("phase-only"),
            tuning: Default::default(),
        }
    }

    fn rinex_settings(&self) -> RinexSettings {
        let defaults = RinexSettings::default();

        RinexSettings {
            name: self
                .matches
                .get_one::<String>("name")
                .cloned()
                .unwrap_or(defaults.name),
            nav_name: self
                .matches
                .get_one::<String>("nav-name")
                .cloned()
                .unwrap_or(defaults.nav_name),
            gzip: self.matches.get_flag("gzip"),
            prefix: self.matches.get_one::<String>("prefix").cloned(),
            stdout: self.matches.get_flag("stdout"),
            marker: self
                .matches
                .get_one::<String>("marker")
                .cloned()
                .unwrap_or(defaults.marker),
            observer: self.matches.get_one::<String>("observer").cloned(),
            agency: self.matches.get_one::<String>("agency").cloned(),
            header_comment: self.matches.get_one::<String>("comment").cloned(),
            observables: self.observables(),
            interval: self.matches.get_one::<u32>("interval").copied().unwrap_or(1),
            half_cycle: self.matches.get_flag("half-cycle"),
            snr: !self.matches.get_flag("no-snr"),
            clock_reset: self.matches.get_flag("clock-reset"),
        }
    }

    /// Session [Options]
    pub fn options(&self) -> Result<Options, Error> {
        let monitor = self.monitor_filter();

        Ok(Options {
            model: self.receiver_model(),
            observation: !self.matches.get_flag("no-obs") && monitor.is_none(),
            navigation: self.matches.get_flag("nav"),
            monitor,
            rinex: self.rinex_settings(),
            assembler: self.assembler_settings(),
            overrides: self.overrides()?,
        })
    }
}
