//! Synthetic G12 logs, GPS12 payload layout.

use crate::packet::{
    DOPPLER, Doppler, LAT_LON, MEASUREMENT, Measurement, NAV_WORD, NavWord, PRODUCT_ID, PVT_FIX,
    UTC_TIME,
};

#[derive(Debug, Default, Clone)]
pub struct LogBuilder {
    bytes: Vec<u8>,
}

impl LogBuilder {
    /// Appends one record
    pub fn raw(mut self, id: u8, payload: &[u8]) -> Self {
        self.bytes.push(id);
        self.bytes.push(payload.len() as u8);
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Coarse position (decimal degrees)
    pub fn lat_lon(self, lat: f64, lon: f64) -> Self {
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&lat.to_radians().to_le_bytes());
        payload.extend_from_slice(&lon.to_radians().to_le_bytes());
        self.raw(LAT_LON, &payload)
    }

    pub fn utc_time(self, year: i16, month: u8, day: u8, hour: i16, minute: u8, second: u8) -> Self {
        let mut payload = vec![month, day];
        payload.extend_from_slice(&year.to_le_bytes());
        payload.extend_from_slice(&hour.to_le_bytes());
        payload.push(minute);
        payload.push(second);
        self.raw(UTC_TIME, &payload)
    }

    /// Position fix (decimal degrees)
    #[allow(clippy::too_many_arguments)]
    pub fn pvt_fix(
        self,
        lat: f64,
        lon: f64,
        altitude: f32,
        msl_height: f32,
        fix: u16,
        tow: f64,
        week_days: u32,
    ) -> Self {
        let mut payload = vec![0; 64];
        payload[0..4].copy_from_slice(&altitude.to_le_bytes());
        payload[16..18].copy_from_slice(&fix.to_le_bytes());
        payload[18..26].copy_from_slice(&tow.to_le_bytes());
        payload[26..34].copy_from_slice(&lat.to_radians().to_le_bytes());
        payload[34..42].copy_from_slice(&lon.to_radians().to_le_bytes());
        payload[54..58].copy_from_slice(&msl_height.to_le_bytes());
        payload[60..64].copy_from_slice(&week_days.to_le_bytes());
        self.raw(PVT_FIX, &payload)
    }

    /// Product id, `version` is expressed in hundredths
    pub fn product_id(self, product: u16, version: u16, text: &str) -> Self {
        let mut payload = Vec::with_capacity(text.len() + 5);
        payload.extend_from_slice(&product.to_le_bytes());
        payload.extend_from_slice(&version.to_le_bytes());
        payload.extend_from_slice(text.as_bytes());
        payload.push(0);
        self.raw(PRODUCT_ID, &payload)
    }

    /// Measurement record. Phase must be positive
    /// and its fractional part a multiple of 1/2048.
    pub fn measurement(self, m: &Measurement) -> Self {
        let integrated = m.phase.floor();
        let carrier = ((m.phase - integrated) * 2048.0).round() as u32;

        let mut payload = vec![0; 37];
        payload[0..4].copy_from_slice(&carrier.to_le_bytes());
        payload[4..8].copy_from_slice(&m.tracked.to_le_bytes());
        payload[8..10].copy_from_slice(&m.doppler_raw.to_le_bytes());
        payload[10..14].copy_from_slice(&(integrated as u32).to_le_bytes());
        payload[14..22].copy_from_slice(&m.pseudorange.to_le_bytes());
        payload[22..26].copy_from_slice(&m.counter.to_le_bytes());
        payload[26..28].copy_from_slice(&m.signal.to_le_bytes());
        payload[28..36].copy_from_slice(&m.tow.to_le_bytes());
        payload[36] = m.sv;
        self.raw(MEASUREMENT, &payload)
    }

    pub fn doppler(self, d: &Doppler) -> Self {
        let mut payload = vec![0; 21];
        payload[0..4].copy_from_slice(&d.delta_range.to_le_bytes());
        payload[8..16].copy_from_slice(&d.pseudorange.to_le_bytes());
        payload[20] = d.sv;
        self.raw(DOPPLER, &payload)
    }

    pub fn nav_word(self, w: &NavWord) -> Self {
        let mut payload = vec![0; 9];
        payload[0..4].copy_from_slice(&w.counter.to_le_bytes());
        payload[4..8].copy_from_slice(&w.word.to_le_bytes());
        payload[8] = w.sv;
        self.raw(NAV_WORD, &payload)
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}
