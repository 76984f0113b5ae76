//! G12 record models and payload layouts.
//!
//! All multi-byte fields are little-endian. Two receiver families use
//! identical record ids but different field offsets for the
//! measurement (0x38) and Doppler (0x16) records: see [ReceiverModel].

use crate::{error::Error, reader::RawRecord, utils::L1_WAVELENGTH};

/// UTC calendar time
pub const UTC_TIME: u8 = 0x0e;
/// Coarse position
pub const LAT_LON: u8 = 0x11;
/// Doppler / delta range
pub const DOPPLER: u8 = 0x16;
/// Position Velocity Time solution
pub const PVT_FIX: u8 = 0x33;
/// Navigation word and 50 Hz bit counter
pub const NAV_WORD: u8 = 0x36;
/// Pseudorange, carrier phase and tracking state
pub const MEASUREMENT: u8 = 0x38;
/// Product identification
pub const PRODUCT_ID: u8 = 0xff;

/// Number of satellite slots a G12 log can describe
pub const MAX_SATELLITES: usize = 32;

/// Bounds checked little-endian accessors over one record payload
pub struct Payload<'a> {
    id: u8,
    bytes: &'a [u8],
}

impl<'a> Payload<'a> {
    pub fn new(id: u8, bytes: &'a [u8]) -> Self {
        Self { id, bytes }
    }

    fn slice<const N: usize>(&self, offset: usize) -> Result<[u8; N], Error> {
        self.bytes
            .get(offset..offset + N)
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::ShortPayload {
                id: self.id,
                needed: offset + N,
                got: self.bytes.len(),
            })
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8, Error> {
        Ok(self.slice::<1>(offset)?[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.slice(offset)?))
    }

    pub fn i16_at(&self, offset: usize) -> Result<i16, Error> {
        Ok(i16::from_le_bytes(self.slice(offset)?))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.slice(offset)?))
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32, Error> {
        Ok(i32::from_le_bytes(self.slice(offset)?))
    }

    pub fn f32_at(&self, offset: usize) -> Result<f32, Error> {
        Ok(f32::from_le_bytes(self.slice(offset)?))
    }

    pub fn f64_at(&self, offset: usize) -> Result<f64, Error> {
        Ok(f64::from_le_bytes(self.slice(offset)?))
    }

    pub fn bytes_at<const N: usize>(&self, offset: usize) -> Result<[u8; N], Error> {
        self.slice(offset)
    }

    /// Satellite slot, rejected when out of range
    pub fn sv_at(&self, offset: usize) -> Result<u8, Error> {
        let sv = self.u8_at(offset)?;
        if (sv as usize) < MAX_SATELLITES {
            Ok(sv)
        } else {
            Err(Error::InvalidSatellite { id: self.id, sv })
        }
    }
}

/// Pseudorange / phase / tracking measurement (0x38)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Satellite slot (PRN - 1)
    pub sv: u8,
    /// Receiver time of week (s)
    pub tow: f64,
    /// Pseudorange (m)
    pub pseudorange: f64,
    /// Accumulated carrier phase (cycles)
    pub phase: f64,
    /// Tracking counter
    pub tracked: i32,
    /// Raw Doppler, offset by 32768
    pub doppler_raw: u16,
    /// Raw signal metric
    pub signal: u16,
    /// Free running 511.5 kHz counter
    pub counter: u32,
}

impl Measurement {
    /// Builds from raw fields. Phase = integer cycles + 11-bit fraction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sv: u8,
        tow: f64,
        pseudorange: f64,
        carrier: u32,
        integrated: u32,
        tracked: i32,
        doppler_raw: u16,
        signal: u16,
        counter: u32,
    ) -> Self {
        Self {
            sv,
            tow,
            pseudorange,
            phase: integrated as f64 + (carrier & 2047) as f64 / 2048.0,
            tracked,
            doppler_raw,
            signal,
            counter,
        }
    }

    /// Raw Doppler with its offset removed (Hz)
    pub fn doppler_hz(&self) -> f64 {
        self.doppler_raw as f64 - 32768.0
    }
}

/// Doppler / delta range record (0x16)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Doppler {
    pub sv: u8,
    /// Pseudorange, used to pair this record with a [Measurement]
    pub pseudorange: f64,
    /// Range rate (m/s)
    pub delta_range: f32,
}

impl Doppler {
    /// Doppler shift (Hz)
    pub fn doppler_hz(&self) -> f64 {
        self.delta_range as f64 / L1_WAVELENGTH
    }
}

/// Navigation word (0x36)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavWord {
    pub sv: u8,
    /// 50 Hz bit counter
    pub counter: u32,
    /// Raw word with the previous D29/D30 in its two MSB
    pub word: u32,
}

impl NavWord {
    /// Time of week of this word, per the bit counter
    pub fn tow(&self) -> f64 {
        self.counter as f64 / 50.0
    }
}

/// Position Velocity Time solution (0x33)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvtFix {
    /// Altitude above ellipsoid (m)
    pub altitude: f32,
    pub epe: [f32; 3],
    /// Fix type, 3D fix starting at 3
    pub fix: u16,
    pub tow: f64,
    /// Latitude (rad)
    pub latitude: f64,
    /// Longitude (rad)
    pub longitude: f64,
    pub velocity: [f32; 3],
    /// Height of ellipsoid above MSL (m)
    pub msl_height: f32,
    pub leap_seconds: u16,
    /// Days from 1989-12-31 to the beginning of the current week
    pub week_days: u32,
}

/// Coarse position (0x11)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// UTC calendar time (0x0e)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtcTime {
    pub year: i16,
    pub month: u8,
    pub day: u8,
    pub hour: i16,
    pub minute: u8,
    pub second: u8,
}

/// Product identification (0xff)
#[derive(Debug, Clone, PartialEq)]
pub struct ProductId {
    pub product: u16,
    pub version: f64,
    pub description: String,
}

impl Default for ProductId {
    fn default() -> Self {
        Self {
            product: 0,
            version: 0.0,
            description: "Generic GPS12".to_string(),
        }
    }
}

impl ProductId {
    /// Decodes a product id, only if its description is plain ASCII
    fn decode(p: &Payload) -> Result<Option<Self>, Error> {
        let product = p.u16_at(0)?;
        let version = p.u16_at(2)? as f64 / 100.0;

        let text = p.bytes.get(4..).unwrap_or_default();
        let text = text.split(|b| *b == 0).next().unwrap_or_default();

        if !text.is_ascii() {
            return Ok(None);
        }

        Ok(Some(Self {
            product,
            version,
            description: String::from_utf8_lossy(text).trim().to_string(),
        }))
    }
}

/// Decoding strategy for the records whose layout depends on the receiver family
pub trait PayloadLayout {
    fn name(&self) -> &'static str;
    fn measurement(&self, p: &Payload) -> Result<Measurement, Error>;
    fn doppler(&self, p: &Payload) -> Result<Doppler, Error>;
}

/// GPS12 / GPS II layout
pub struct Gps12Layout;

/// eTrex layout
pub struct EtrexLayout;

impl PayloadLayout for Gps12Layout {
    fn name(&self) -> &'static str {
        "GPS12"
    }

    fn measurement(&self, p: &Payload) -> Result<Measurement, Error> {
        Ok(Measurement::new(
            p.sv_at(36)?,
            p.f64_at(28)?,
            p.f64_at(14)?,
            p.u32_at(0)?,
            p.u32_at(10)?,
            p.i32_at(4)?,
            p.u16_at(8)?,
            p.u16_at(26)?,
            p.u32_at(22)?,
        ))
    }

    fn doppler(&self, p: &Payload) -> Result<Doppler, Error> {
        Ok(Doppler {
            sv: p.sv_at(20)?,
            pseudorange: p.f64_at(8)?,
            delta_range: p.f32_at(0)?,
        })
    }
}

impl PayloadLayout for EtrexLayout {
    fn name(&self) -> &'static str {
        "eTrex"
    }

    fn measurement(&self, p: &Payload) -> Result<Measurement, Error> {
        Ok(Measurement::new(
            p.sv_at(36)?,
            p.f64_at(8)?,
            p.f64_at(0)?,
            p.u32_at(16)?,
            p.u32_at(24)?,
            p.i32_at(20)?,
            p.u16_at(32)?,
            p.u16_at(34)?,
            p.u32_at(28)?,
        ))
    }

    fn doppler(&self, p: &Payload) -> Result<Doppler, Error> {
        Ok(Doppler {
            sv: p.sv_at(20)?,
            pseudorange: p.f64_at(0)?,
            delta_range: p.f32_at(8)?,
        })
    }
}

/// Receiver family, selects the [PayloadLayout]
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub enum ReceiverModel {
    #[default]
    Gps12,
    Etrex,
}

impl ReceiverModel {
    pub fn layout(&self) -> &'static dyn PayloadLayout {
        match self {
            Self::Gps12 => &Gps12Layout,
            Self::Etrex => &EtrexLayout,
        }
    }
}

/// Decoded G12 record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    UtcTime(UtcTime),
    LatLon(LatLon),
    PvtFix(PvtFix),
    Doppler(Doppler),
    NavWord(NavWord),
    Measurement(Measurement),
    /// Product id, None when its description does not look like text
    ProductId(Option<ProductId>),
    /// Any record this converter does not interpret
    Other(u8),
}

impl Record {
    /// Interprets a [RawRecord] with the selected [PayloadLayout]
    pub fn decode(raw: &RawRecord, layout: &dyn PayloadLayout) -> Result<Self, Error> {
        let p = Payload::new(raw.id, &raw.payload);

        match raw.id {
            MEASUREMENT => Ok(Self::Measurement(layout.measurement(&p)?)),
            DOPPLER => Ok(Self::Doppler(layout.doppler(&p)?)),
            NAV_WORD => Ok(Self::NavWord(NavWord {
                counter: p.u32_at(0)?,
                word: u32::from_le_bytes(p.bytes_at::<4>(4)?),
                sv: p.sv_at(8)?,
            })),
            PVT_FIX => Ok(Self::PvtFix(PvtFix {
                altitude: p.f32_at(0)?,
                epe: [p.f32_at(4)?, p.f32_at(8)?, p.f32_at(12)?],
                fix: p.u16_at(16)?,
                tow: p.f64_at(18)?,
                latitude: p.f64_at(26)?,
                longitude: p.f64_at(34)?,
                velocity: [p.f32_at(42)?, p.f32_at(46)?, p.f32_at(50)?],
                msl_height: p.f32_at(54)?,
                leap_seconds: p.u16_at(58)?,
                week_days: p.u32_at(60)?,
            })),
            LAT_LON => Ok(Self::LatLon(LatLon {
                latitude: p.f64_at(0)?,
                longitude: p.f64_at(8)?,
            })),
            UTC_TIME => Ok(Self::UtcTime(UtcTime {
                month: p.u8_at(0)?,
                day: p.u8_at(1)?,
                year: p.i16_at(2)?,
                hour: p.i16_at(4)?,
                minute: p.u8_at(6)?,
                second: p.u8_at(7)?,
            })),
            PRODUCT_ID => Ok(Self::ProductId(ProductId::decode(&p)?)),
            id => Ok(Self::Other(id)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    fn gps12_measurement() -> Vec<u8> {
        let mut bytes = vec![0; 37];
        bytes[0..4].copy_from_slice(&(1024_u32 + 4096).to_le_bytes());
        bytes[4..8].copy_from_slice(&0x1200_i32.to_le_bytes());
        bytes[8..10].copy_from_slice(&33000_u16.to_le_bytes());
        bytes[10..14].copy_from_slice(&1000_u32.to_le_bytes());
        bytes[14..22].copy_from_slice(&21_000_000.5_f64.to_le_bytes());
        bytes[22..26].copy_from_slice(&123456_u32.to_le_bytes());
        bytes[26..28].copy_from_slice(&7000_u16.to_le_bytes());
        bytes[28..36].copy_from_slice(&345600.0_f64.to_le_bytes());
        bytes[36] = 4;
        bytes
    }

    #[test]
    fn gps12_measurement_layout() {
        let raw = RawRecord {
            id: MEASUREMENT,
            length: 37,
            payload: gps12_measurement(),
        };

        match Record::decode(&raw, ReceiverModel::Gps12.layout()).unwrap() {
            Record::Measurement(m) => {
                assert_eq!(m.sv, 4);
                assert_eq!(m.tow, 345600.0);
                assert_eq!(m.pseudorange, 21_000_000.5);
                assert_eq!(m.phase, 1000.5);
                assert_eq!(m.tracked, 0x1200);
                assert_eq!(m.doppler_hz(), 232.0);
                assert_eq!(m.signal, 7000);
                assert_eq!(m.counter, 123456);
            },
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn etrex_doppler_layout() {
        let mut bytes = vec![0; 21];
        bytes[0..8].copy_from_slice(&20_500_000.0_f64.to_le_bytes());
        bytes[8..12].copy_from_slice(&(-190.3_f32).to_le_bytes());
        bytes[20] = 31;

        let raw = RawRecord {
            id: DOPPLER,
            length: 21,
            payload: bytes,
        };

        match Record::decode(&raw, ReceiverModel::Etrex.layout()).unwrap() {
            Record::Doppler(d) => {
                assert_eq!(d.sv, 31);
                assert_eq!(d.pseudorange, 20_500_000.0);
                assert_eq!(d.delta_range, -190.3);
            },
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn out_of_range_satellite() {
        let mut payload = gps12_measurement();
        payload[36] = 32;

        let raw = RawRecord {
            id: MEASUREMENT,
            length: 37,
            payload,
        };

        assert!(matches!(
            Record::decode(&raw, ReceiverModel::Gps12.layout()),
            Err(Error::InvalidSatellite { id: MEASUREMENT, sv: 32 })
        ));
    }

    #[test]
    fn short_payload() {
        let raw = RawRecord {
            id: PVT_FIX,
            length: 10,
            payload: vec![0; 10],
        };

        assert!(matches!(
            Record::decode(&raw, ReceiverModel::Gps12.layout()),
            Err(Error::ShortPayload { id: PVT_FIX, .. })
        ));
    }

    #[test]
    fn product_id() {
        let mut payload = vec![0x57, 0x00, 0xd2, 0x00];
        payload.extend_from_slice(b"GPS 12 Software Version 2.10\0");

        let raw = RawRecord {
            id: PRODUCT_ID,
            length: payload.len() as u8,
            payload,
        };

        let decoded = Record::decode(&raw, ReceiverModel::Gps12.layout()).unwrap();
        assert_eq!(
            decoded,
            Record::ProductId(Some(ProductId {
                product: 87,
                version: 2.1,
                description: "GPS 12 Software Version 2.10".to_string(),
            }))
        );

        let raw = RawRecord {
            id: PRODUCT_ID,
            length: 6,
            payload: vec![0, 0, 0, 0, 0xc8, 0x90],
        };

        assert_eq!(
            Record::decode(&raw, ReceiverModel::Gps12.layout()).unwrap(),
            Record::ProductId(None)
        );
    }
}
