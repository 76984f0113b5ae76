#![doc(
    html_logo_url = "https://raw.githubusercontent.com/nav-solutions/.github/master/logos/logo2.jpg"
)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::type_complexity)]

/*
 * GAR2RINEX is part of the nav-solutions framework.
 * Authors: Guillaume W. Bres <guillaume.bressaix@gmail.com> et al,
 * (cf. https://github.com/nav-solutions/rinex/graphs/contributors)
 * This framework is shipped under Mozilla Public V2 license.
 *
 * Documentation: https://github.com/nav-solutions/gar2rinex
 */

extern crate gnss_rs as gnss;

use env_logger::{Builder, Target};

use log::{error, info};

mod assembler;
mod bootstrap;
mod cli;
mod collecter;
mod ephemeris;
mod error;
mod monitor;
mod navigation;
mod packet;
mod reader;
mod runtime;
mod stats;
mod time;
mod utils;

#[cfg(test)]
mod tests;

use crate::{cli::Cli, error::Error, reader::PacketReader, stats::Statistics};

fn run(cli: &Cli) -> Result<(), Error> {
    let mut reader = PacketReader::open(cli.filepath())?;

    if cli.stats() {
        let stats = Statistics::collect(&mut reader);
        println!("{}", stats.to_json()?);
        return Ok(());
    }

    let options = cli.options()?;
    let report = runtime::convert(&mut reader, options)?;

    if let Some(path) = &report.observation {
        info!("{}: {} epochs", path, report.epochs);
    }

    if let Some(path) = &report.navigation {
        info!("{}: {} ephemerides", path, report.ephemerides);
    }

    Ok(())
}

pub fn main() {
    let mut builder = Builder::from_default_env();

    // RINEX may be streamed to stdout
    builder
        .target(Target::Stderr)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    let cli = Cli::new();

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
