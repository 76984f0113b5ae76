use std::path::{Path, PathBuf};

use crate::{
    collecter::settings::Observable,
    navigation::test::{encode_subframe, ephemeris_triple},
    packet::{Doppler, Measurement, NavWord},
    reader::PacketReader,
    runtime::{Options, convert},
    tests::builder::LogBuilder,
    utils::llh_to_ecef,
};

/// Fresh output directory
fn workspace(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("gar2rinex-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}

fn options(prefix: &Path) -> Options {
    let mut options = Options::default();
    options.rinex.prefix = Some(prefix.to_string_lossy().to_string());
    options.rinex.observables = Observable::from_mask(7);
    options
}

/// Satellite slots, in transmission order
const SLOTS: [u8; 4] = [23, 1, 11, 4];

/// Start of the session: 2020-01-01 00:00:00 GPST
const TOW: f64 = 259_200.0;

fn measurement(sv: u8, epoch: u32) -> Measurement {
    Measurement {
        sv,
        tow: TOW + epoch as f64,
        pseudorange: 20_000_000.0 + 1000.0 * sv as f64 + 100.0 * epoch as f64,
        phase: 1000.5 + 10.25 * epoch as f64,
        tracked: 0x1000,
        doppler_raw: 32768 - 1500,
        signal: 7000,
        counter: 1_000_000 + 511_500 * epoch,
    }
}

fn doppler(sv: u8, epoch: u32) -> Doppler {
    Doppler {
        sv,
        pseudorange: measurement(sv, epoch).pseudorange,
        delta_range: -300.0,
    }
}

/// Product id, 3D fix at 40N 105W, then 5 epochs of 4 satellites
fn session() -> Vec<u8> {
    let mut builder = LogBuilder::default()
        .product_id(87, 210, "GPS 12 Software Version 2.10")
        .pvt_fix(40.0, -105.0, 1650.0, 50.0, 3, TOW, (2086 - 521) * 7 + 3);

    for epoch in 0..5 {
        for sv in SLOTS {
            builder = builder.nav_word(&NavWord {
                sv,
                counter: ((TOW + epoch as f64) * 50.0) as u32,
                word: 0,
            });
        }
        for sv in SLOTS {
            builder = builder.measurement(&measurement(sv, epoch));
        }
        for sv in SLOTS {
            builder = builder.doppler(&doppler(sv, epoch));
        }
    }

    builder.build()
}

#[test]
fn observation_conversion() {
    let prefix = workspace("obs");

    let mut reader = PacketReader::from_bytes(session());
    let report = convert(&mut reader, options(&prefix)).unwrap();

    assert_eq!(report.accepted, 5);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.epochs, 5);
    assert!(report.navigation.is_none());

    let path = report.observation.unwrap();
    assert!(path.ends_with("site0011.20O"), "{}", path);

    let content = std::fs::read_to_string(&path).unwrap();
    let (header, body) = content.split_once("END OF HEADER       \n").unwrap();

    assert!(header.contains("GPS 12 Software Ve"));
    assert!(header.contains("** Position from receiver PVT solution (fix 3)"));
    assert!(header.contains("** Receiver layout: GPS12"));

    let approx = header
        .lines()
        .find(|l| l.ends_with("APPROX POSITION XYZ "))
        .unwrap();

    let (x, y, z) = llh_to_ecef(40.0, -105.0, 1600.0);
    for (k, expected) in [x, y, z].iter().enumerate() {
        let value = approx[14 * k..14 * (k + 1)].trim().parse::<f64>().unwrap();
        assert!((value - expected).abs() < 1.0E-3, "{} {}", value, expected);
    }

    let lines = body.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 5 * 5);

    for (epoch, chunk) in lines.chunks(5).enumerate() {
        assert_eq!(
            chunk[0],
            format!(
                " 20 01 01 00 00{:11.7}  0  4G02G05G12G24{:24}",
                epoch as f64, ""
            )
        );

        // ascending PRN order
        for (line, sv) in chunk[1..].iter().zip([1, 4, 11, 23]) {
            let m = measurement(sv, epoch as u32);
            assert_eq!(
                *line,
                format!(
                    "{:14.3} 8{:14.3} 8{:14.3} 8",
                    m.pseudorange,
                    m.phase,
                    -doppler(sv, epoch as u32).doppler_hz()
                )
            );
        }
    }
}

#[test]
fn reruns_are_identical() {
    let prefix = workspace("rerun");

    let mut reader = PacketReader::from_bytes(session());
    let first = convert(&mut reader, options(&prefix)).unwrap();

    let mut reader = PacketReader::from_bytes(session());
    let second = convert(&mut reader, options(&prefix)).unwrap();

    let (first, second) = (first.observation.unwrap(), second.observation.unwrap());

    // next session number
    assert!(first.ends_with("site0011.20O"));
    assert!(second.ends_with("site0012.20O"));

    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn decimation_and_window() {
    let prefix = workspace("window");

    let mut options = options(&prefix);
    options.rinex.interval = 2;
    options.assembler.start = Some(259_201);

    let mut reader = PacketReader::from_bytes(session());
    let report = convert(&mut reader, options).unwrap();

    // first epoch is outside the window
    assert_eq!(report.accepted, 4);
    assert_eq!(report.rejected, 1);

    // 259202 and 259204 survive decimation
    assert_eq!(report.epochs, 2);
}

#[test]
fn gzip_output() {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let prefix = workspace("gzip");

    let mut options = options(&prefix);
    options.rinex.gzip = true;

    let mut reader = PacketReader::from_bytes(session());
    let report = convert(&mut reader, options).unwrap();

    let path = report.observation.unwrap();
    assert!(path.ends_with("site0011.20O.gz"));

    let mut content = String::new();
    GzDecoder::new(std::fs::File::open(&path).unwrap())
        .read_to_string(&mut content)
        .unwrap();

    assert!(content.starts_with("     2.11           OBSERVATION DATA"));
    assert_eq!(content.matches(" 20 01 01 00 00").count(), 5);
}

#[test]
fn navigation_conversion() {
    let prefix = workspace("nav");

    let mut builder =
        LogBuilder::default().pvt_fix(40.0, -105.0, 1650.0, 50.0, 3, 6000.0, (2098 - 521) * 7);

    let mut previous = 0;
    for (k, data) in ephemeris_triple(1000, 7, 7, 7).iter().enumerate() {
        for word in encode_subframe(3, 1000 + k as u32, data, &mut previous) {
            builder = builder.nav_word(&word);
        }
    }

    // closes the last subframe
    builder = builder.nav_word(&NavWord {
        sv: 3,
        counter: 30 + 300 * 1003,
        word: 0,
    });

    let mut options = options(&prefix);
    options.observation = false;
    options.navigation = true;

    let mut reader = PacketReader::from_bytes(builder.build());
    let report = convert(&mut reader, options).unwrap();

    assert!(report.observation.is_none());
    assert_eq!(report.ephemerides, 1);

    let path = report.navigation.unwrap();
    assert!(path.ends_with("brdc0821.20N"), "{}", path);

    let content = std::fs::read_to_string(&path).unwrap();
    let (header, body) = content.split_once("END OF HEADER       \n").unwrap();

    assert!(header.starts_with("     2.10           N: GPS NAV DATA"));

    let lines = body.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 8);
    assert!(lines[0].starts_with(" 4 20  3 22  2  0  0.0"), "{}", lines[0]);
}

#[test]
fn missing_reference_is_fatal() {
    let prefix = workspace("fatal");

    let bytes = LogBuilder::default()
        .measurement(&measurement(1, 0))
        .build();

    let mut reader = PacketReader::from_bytes(bytes);
    assert!(convert(&mut reader, options(&prefix)).is_err());
}
