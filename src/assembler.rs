//! Observation epoch assembly.
//!
//! Measurement records sharing one time of week form a candidate
//! epoch. Candidates are validated against the free running 511.5 kHz
//! counter, duplicates are resolved per satellite, and each satellite
//! is given a [Disposition] from its continuity state.

use itertools::Itertools;
use log::{debug, trace};

use crate::packet::{Doppler, MAX_SATELLITES, Measurement, NavWord};

/// Records buffered per epoch, per record type
const MAX_RECORDS: usize = 48;

/// Empirical thresholds. Legacy values by default.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tuning {
    /// Tracked counter units per distance unit, in duplicate resolution
    pub tracked_scale: f64,

    /// Tracked counter jump flagging a loss of lock
    pub lock_loss: i64,

    /// Age of the latest clock word after which the clock reference is stale (s)
    pub clock_timeout: f64,

    /// Accepted deviation of the 511.5 kHz counter (ticks)
    pub counter_tolerance: i64,

    /// Counter rate (ticks/s)
    pub counter_rate: f64,

    /// Minimal plausible pseudorange (m)
    pub min_pseudorange: f64,

    /// Maximal plausible pseudorange (m)
    pub max_pseudorange: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tracked_scale: 256.0,
            lock_loss: 256,
            clock_timeout: 2.0,
            counter_tolerance: 20,
            counter_rate: 511_500.0,
            min_pseudorange: 10.0,
            max_pseudorange: 1.0E9,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Settings {
    /// First time of week to convert (s), defaults to the first epoch
    pub start: Option<i64>,

    /// Last time of week to convert (s)
    pub stop: Option<i64>,

    /// Maximal duration from start (s)
    pub duration: Option<i64>,

    /// Dump every satellite, whatever its continuity
    pub relax: bool,

    /// Release the phase alone when the clock reference is stale
    pub phase_only: bool,

    pub tuning: Tuning,
}

/// Per satellite release decision
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Not seen yet
    #[default]
    Never,
    Skip,
    Dump,
    /// Stale clock reference: pseudorange is withheld
    PhaseOnly,
}

impl Disposition {
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Dump | Self::PhaseOnly)
    }
}

/// Continuity state of one satellite
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SatState {
    pub disposition: Disposition,
    pub pseudorange: f64,
    pub phase: f64,
    pub tracked: i32,
    pub counter: u32,
    pub signal: u16,

    /// Time of week of the latest clock word
    pub clock_word_tow: Option<f64>,

    /// Doppler (Hz) of the latest retained record
    pub doppler_estimate: f64,

    /// Doppler (Hz) attached in the current epoch
    pub doppler: Option<f64>,
}

/// One released satellite
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ObsEntry {
    pub prn: u8,
    /// None when only the phase is released
    pub pseudorange: Option<f64>,
    pub phase: f64,
    pub doppler: Option<f64>,
    pub signal: u16,
}

/// Accepted epoch
#[derive(Debug, Clone, PartialEq)]
pub struct ObsEpoch {
    /// Receiver time of week (s)
    pub tow: f64,

    /// Released satellites, in ascending PRN order
    pub entries: Vec<ObsEntry>,
}

impl ObsEpoch {
    /// Time of week rounded to the second
    pub fn itow(&self) -> i64 {
        (self.tow + 0.5).floor() as i64
    }
}

/// Reason for discarding a candidate epoch
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Rejection {
    OutsideWindow,
    NoCounter,
    CounterDeviation(i64),
    NullTime,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Summary {
    pub accepted: usize,
    pub rejected: usize,
}

pub struct Assembler {
    settings: Settings,

    /// Continuity state, indexed by satellite slot
    states: [SatState; MAX_SATELLITES],

    /// Measurements of the candidate epoch
    pending: Vec<Measurement>,

    /// Doppler records of the candidate epoch
    dopplers: Vec<Doppler>,

    /// (tow, counter) of the latest accepted epoch
    last: Option<(f64, u32)>,

    /// Window start
    start: Option<i64>,

    pub summary: Summary,
}

impl Assembler {
    pub fn new(settings: Settings) -> Self {
        Self {
            start: settings.start,
            settings,
            states: [SatState::default(); MAX_SATELLITES],
            pending: Vec::with_capacity(MAX_RECORDS),
            dopplers: Vec::with_capacity(MAX_RECORDS),
            last: None,
            summary: Default::default(),
        }
    }

    /// Continuity state of one satellite slot
    #[cfg(test)]
    pub fn state(&self, sv: u8) -> Option<&SatState> {
        self.states.get(sv as usize)
    }

    /// True when at least one measurement is pending
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Buffers a measurement. Returns false, without buffering,
    /// when the measurement belongs to the next epoch: the pending epoch
    /// should then be closed and the measurement presented again.
    pub fn push(&mut self, measurement: Measurement) -> bool {
        if let Some(first) = self.pending.first() {
            if first.tow != measurement.tow {
                return false;
            }
        }

        if self.pending.len() < MAX_RECORDS {
            self.pending.push(measurement);
        }

        true
    }

    /// Buffers a Doppler record for the pending epoch
    pub fn push_doppler(&mut self, doppler: Doppler) {
        if self.dopplers.len() < MAX_RECORDS {
            self.dopplers.push(doppler);
        }
    }

    /// Refreshes the clock reference of one satellite
    pub fn latch_clock_word(&mut self, word: &NavWord) {
        if let Some(state) = self.states.get_mut(word.sv as usize) {
            state.clock_word_tow = Some(word.tow());
        }
    }

    /// Closes the pending epoch
    pub fn close(&mut self) -> Result<Option<ObsEpoch>, Rejection> {
        let pending = std::mem::take(&mut self.pending);
        let dopplers = std::mem::take(&mut self.dopplers);

        let Some(tow) = pending.first().map(|m| m.tow) else {
            return Ok(None);
        };

        let result = self.validate(tow, pending, &dopplers);

        match result {
            Ok(_) => self.summary.accepted += 1,
            Err(rejection) => {
                self.summary.rejected += 1;
                debug!("tow={:.7} - epoch rejected: {:?}", tow, rejection);
            },
        }

        let epoch = result.map(|_| self.release(tow));

        for state in self.states.iter_mut() {
            if state.disposition != Disposition::Never {
                state.disposition = Disposition::Skip;
            }
            state.doppler = None;
        }

        epoch.map(Some)
    }

    fn validate(
        &mut self,
        tow: f64,
        pending: Vec<Measurement>,
        dopplers: &[Doppler],
    ) -> Result<(), Rejection> {
        let tuning = self.settings.tuning;
        let itow = (tow + 0.5).floor() as i64;

        let start = *self.start.get_or_insert(itow);

        if itow < start
            || self.settings.stop.is_some_and(|stop| itow > stop)
            || self.settings.duration.is_some_and(|duration| itow - start > duration)
        {
            return Err(Rejection::OutsideWindow);
        }

        let counter = plurality(&pending).ok_or(Rejection::NoCounter)?;

        if let Some((last_tow, last_counter)) = self.last {
            let ticks = ((tow - last_tow) * tuning.counter_rate).round() as i64;
            let expected = last_counter.wrapping_add(ticks as u32);
            let deviation = (expected.wrapping_sub(counter) as i32 as i64).abs();

            if deviation > tuning.counter_tolerance {
                return Err(Rejection::CounterDeviation(deviation));
            }
        }

        if tow == 0.0 {
            return Err(Rejection::NullTime);
        }

        let retained = pending
            .into_iter()
            .filter(|m| m.counter == counter)
            .collect::<Vec<_>>();

        for measurement in self.remove_duplicates(retained) {
            self.add_measurement(&measurement);
        }

        for doppler in dopplers {
            self.attach_doppler(doppler);
        }

        self.last = Some((tow, counter));
        Ok(())
    }

    /// One measurement per satellite, first appearance order preserved
    fn remove_duplicates(&self, measurements: Vec<Measurement>) -> Vec<Measurement> {
        measurements
            .iter()
            .map(|m| m.sv)
            .unique()
            .filter_map(|sv| {
                let candidates = measurements
                    .iter()
                    .filter(|m| m.sv == sv)
                    .copied()
                    .collect::<Vec<_>>();
                choose(&candidates, &self.states[sv as usize], &self.settings.tuning)
            })
            .collect()
    }

    fn add_measurement(&mut self, measurement: &Measurement) {
        let tuning = self.settings.tuning;
        let state = &mut self.states[measurement.sv as usize];

        let mut disposition = match state.disposition {
            Disposition::Never => {
                if measurement.tracked & 0xff == 0 {
                    Disposition::Dump
                } else {
                    Disposition::Skip
                }
            },
            _ => {
                let jump = (state.tracked as i64 - measurement.tracked as i64).abs();
                if jump > tuning.lock_loss {
                    Disposition::Skip
                } else {
                    Disposition::Dump
                }
            },
        };

        let stale = state
            .clock_word_tow
            .map(|t| measurement.tow > t + tuning.clock_timeout)
            .unwrap_or(true);

        if stale && disposition == Disposition::Dump {
            disposition = if self.settings.phase_only {
                Disposition::PhaseOnly
            } else {
                Disposition::Skip
            };
        }

        if self.settings.relax {
            disposition = Disposition::Dump;
        }

        if measurement.pseudorange <= tuning.min_pseudorange
            || measurement.pseudorange >= tuning.max_pseudorange
        {
            trace!(
                "G{:02} - implausible pseudorange {:.3}",
                measurement.sv + 1,
                measurement.pseudorange
            );
            return;
        }

        state.pseudorange = measurement.pseudorange;
        state.phase = measurement.phase;
        state.signal = measurement.signal;
        state.tracked = measurement.tracked;
        state.counter = measurement.counter;
        state.doppler_estimate = measurement.doppler_hz();
        state.disposition = disposition;
    }

    fn attach_doppler(&mut self, doppler: &Doppler) {
        if let Some(state) = self.states.get_mut(doppler.sv as usize) {
            if state.pseudorange == doppler.pseudorange {
                state.doppler = Some(doppler.doppler_hz());
            }
        }
    }

    fn release(&self, tow: f64) -> ObsEpoch {
        let entries = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.disposition.is_released())
            .map(|(sv, state)| ObsEntry {
                prn: sv as u8 + 1,
                pseudorange: if state.disposition == Disposition::PhaseOnly {
                    None
                } else {
                    Some(state.pseudorange)
                },
                phase: state.phase,
                doppler: state.doppler,
                signal: state.signal,
            })
            .collect();

        ObsEpoch { tow, entries }
    }
}

/// Most frequent counter value. On ties, the first seen value wins.
fn plurality(measurements: &[Measurement]) -> Option<u32> {
    let mut tally: Vec<(u32, usize)> = Vec::new();

    for m in measurements {
        match tally.iter_mut().find(|(counter, _)| *counter == m.counter) {
            Some((_, count)) => *count += 1,
            None => tally.push((m.counter, 1)),
        }
    }

    tally
        .into_iter()
        .fold(None, |best: Option<(u32, usize)>, (counter, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((counter, count)),
        })
        .map(|(counter, _)| counter)
}

/// Picks one candidate among duplicates of one satellite
fn choose(candidates: &[Measurement], last: &SatState, tuning: &Tuning) -> Option<Measurement> {
    if candidates.len() < 2 || last.disposition == Disposition::Never {
        return candidates.last().copied();
    }

    candidates
        .iter()
        .fold(None, |best: Option<(f64, &Measurement)>, m| {
            let distance = ((m.tracked as i64 - last.tracked as i64) as f64 / tuning.tracked_scale)
                .abs()
                + (m.doppler_hz() - last.doppler_estimate).abs();
            match best {
                Some((best_distance, _)) if best_distance <= distance => best,
                _ => Some((distance, m)),
            }
        })
        .map(|(_, m)| *m)
}
