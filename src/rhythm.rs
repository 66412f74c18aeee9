//! Musical time base: metronome and immutable snapshots.
//!
//! The [`Metronome`] anchors a beat grid to a monotonic origin instant.
//! Everything downstream (effects, beat-locked step intervals, status display)
//! reads musical time through a [`Snapshot`] taken once per tick, so a whole
//! frame observes one consistent beat position.
//!
//! Counters are 1-indexed: beat 1 begins at the origin. Phases are strictly
//! in `[0, 1)`.

use std::time::{Duration, Instant};

use crate::ConsoleError;

/// Lowest tempo the metronome accepts, in BPM.
pub const MIN_BPM: f64 = 20.0;
/// Highest tempo the metronome accepts, in BPM.
pub const MAX_BPM: f64 = 400.0;

/// Converts a beat count at a tempo into milliseconds.
fn beats_to_millis(beats: f64, bpm: f64) -> f64 {
    (60_000.0 / bpm) * beats
}

/// The beat grid: origin instant, tempo, and bar/phrase lengths.
///
/// `set_tempo` shifts the origin so the instantaneous beat number and beat
/// phase are unchanged under the new beat interval; a tempo change never makes
/// the show "jump".
#[derive(Debug, Clone)]
pub struct Metronome {
    origin: Instant,
    bpm: f64,
    beats_per_bar: u32,
    bars_per_phrase: u32,
}

impl Metronome {
    /// Creates a metronome whose beat 1 starts at `origin`.
    ///
    /// # Errors
    ///
    /// Rejects tempi outside `20..=400` BPM and zero bar/phrase lengths.
    pub fn new(
        bpm: f64,
        beats_per_bar: u32,
        bars_per_phrase: u32,
        origin: Instant,
    ) -> Result<Self, ConsoleError> {
        check_tempo(bpm)?;
        if beats_per_bar == 0 || bars_per_phrase == 0 {
            return Err(ConsoleError::InvalidConfig(
                "beats_per_bar and bars_per_phrase must be nonzero".into(),
            ));
        }
        Ok(Self {
            origin,
            bpm,
            beats_per_bar,
            bars_per_phrase,
        })
    }

    /// Current tempo in BPM.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Beat length in milliseconds.
    pub fn beat_interval_ms(&self) -> f64 {
        beats_to_millis(1.0, self.bpm)
    }

    /// Changes the tempo while preserving the current beat number and phase.
    ///
    /// The origin is moved so that at `at` the grid reads the same beat and
    /// beat phase under the new interval:
    /// `origin = at − new_interval · (phase + (beat − 1))`.
    ///
    /// # Errors
    ///
    /// Rejects tempi outside `20..=400` BPM; state is unchanged on rejection.
    pub fn set_tempo(&mut self, bpm: f64, at: Instant) -> Result<(), ConsoleError> {
        check_tempo(bpm)?;
        let interval = self.beat_interval_ms();
        let beat = marker_number(at, self.origin, interval);
        let phase = marker_phase(at, self.origin, interval);
        let new_interval = beats_to_millis(1.0, bpm);
        let back = new_interval * (phase + (beat - 1) as f64);
        self.origin = at - Duration::from_secs_f64((back / 1000.0).max(0.0));
        self.bpm = bpm;
        Ok(())
    }

    /// Changes the bar length. The origin is untouched, so the beat counter
    /// and phase are unaffected; only bar/phrase derivation changes.
    pub fn set_beats_per_bar(&mut self, beats: u32) -> Result<(), ConsoleError> {
        if beats == 0 {
            return Err(ConsoleError::InvalidConfig(
                "beats_per_bar must be nonzero".into(),
            ));
        }
        self.beats_per_bar = beats;
        Ok(())
    }

    /// Changes the phrase length, beat and bar counters unaffected.
    pub fn set_bars_per_phrase(&mut self, bars: u32) -> Result<(), ConsoleError> {
        if bars == 0 {
            return Err(ConsoleError::InvalidConfig(
                "bars_per_phrase must be nonzero".into(),
            ));
        }
        self.bars_per_phrase = bars;
        Ok(())
    }

    /// Re-anchors the grid to an external beat source.
    ///
    /// After this call `snapshot(at)` reports beat `external_beat` with beat
    /// phase 0. Used when a network beat clock (Link-style) hands the core an
    /// authoritative downbeat.
    pub fn align_to(&mut self, external_beat: i64, at: Instant) {
        let beats_before = (external_beat.max(1) - 1) as f64;
        let back = beats_to_millis(beats_before, self.bpm);
        self.origin = at - Duration::from_secs_f64(back / 1000.0);
    }

    /// Computes the musical position at `at`.
    pub fn snapshot(&self, at: Instant) -> Snapshot {
        let beat_interval = self.beat_interval_ms();
        let bar_interval = beat_interval * self.beats_per_bar as f64;
        let phrase_interval = bar_interval * self.bars_per_phrase as f64;

        Snapshot {
            origin: self.origin,
            instant: at,
            bpm: self.bpm,
            beats_per_bar: self.beats_per_bar,
            bars_per_phrase: self.bars_per_phrase,
            beat: marker_number(at, self.origin, beat_interval),
            bar: marker_number(at, self.origin, bar_interval),
            phrase: marker_number(at, self.origin, phrase_interval),
            beat_phase: marker_phase(at, self.origin, beat_interval),
            bar_phase: marker_phase(at, self.origin, bar_interval),
            phrase_phase: marker_phase(at, self.origin, phrase_interval),
        }
    }
}

fn check_tempo(bpm: f64) -> Result<(), ConsoleError> {
    if !bpm.is_finite() || !(MIN_BPM..=MAX_BPM).contains(&bpm) {
        return Err(ConsoleError::TempoOutOfRange(bpm));
    }
    Ok(())
}

/// 1-indexed marker count at `instant` on a grid of `interval_ms` from `start`.
fn marker_number(instant: Instant, start: Instant, interval_ms: f64) -> i64 {
    let elapsed = instant.saturating_duration_since(start).as_secs_f64() * 1000.0;
    (elapsed / interval_ms).floor() as i64 + 1
}

/// Fractional position within the current marker, in `[0, 1)`.
fn marker_phase(instant: Instant, start: Instant, interval_ms: f64) -> f64 {
    let elapsed = instant.saturating_duration_since(start).as_secs_f64() * 1000.0;
    let ratio = elapsed / interval_ms;
    ratio - ratio.floor()
}

/// An immutable record of musical time at one instant.
///
/// Consumers read but never mutate; a fresh snapshot is taken each tick.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    /// Timeline origin (start of beat 1).
    pub origin: Instant,
    /// The instant this snapshot was computed for.
    pub instant: Instant,
    /// Tempo in BPM at the snapshot instant.
    pub bpm: f64,
    /// Bar length in beats.
    pub beats_per_bar: u32,
    /// Phrase length in bars.
    pub bars_per_phrase: u32,
    /// 1-indexed beat counter.
    pub beat: i64,
    /// 1-indexed bar counter.
    pub bar: i64,
    /// 1-indexed phrase counter.
    pub phrase: i64,
    /// Position within the current beat, `[0, 1)`.
    pub beat_phase: f64,
    /// Position within the current bar, `[0, 1)`.
    pub bar_phase: f64,
    /// Position within the current phrase, `[0, 1)`.
    pub phrase_phase: f64,
}

impl Snapshot {
    /// Beat length in milliseconds.
    pub fn beat_interval_ms(&self) -> f64 {
        beats_to_millis(1.0, self.bpm)
    }

    /// Bar length in milliseconds.
    pub fn bar_interval_ms(&self) -> f64 {
        self.beat_interval_ms() * self.beats_per_bar as f64
    }

    /// Phrase length in milliseconds.
    pub fn phrase_interval_ms(&self) -> f64 {
        self.bar_interval_ms() * self.bars_per_phrase as f64
    }

    /// Absolute beat position including the fractional part, 0-based.
    ///
    /// Beat 1 at phase 0 maps to `0.0`. This is the axis beat-locked
    /// oscillators run on.
    pub fn beat_position(&self) -> f64 {
        (self.beat - 1) as f64 + self.beat_phase
    }

    /// Beat number within the current bar, 1-indexed.
    pub fn beat_within_bar(&self) -> u32 {
        ((self.beat - 1).rem_euclid(self.beats_per_bar as i64)) as u32 + 1
    }

    /// Bar number within the current phrase, 1-indexed.
    pub fn bar_within_phrase(&self) -> u32 {
        ((self.bar - 1).rem_euclid(self.bars_per_phrase as i64)) as u32 + 1
    }

    /// `true` on the first beat of a bar.
    pub fn is_downbeat(&self) -> bool {
        self.beat_within_bar() == 1
    }

    /// `true` on the first beat of a phrase.
    pub fn is_phrase_start(&self) -> bool {
        self.is_downbeat() && self.bar_within_phrase() == 1
    }

    /// The position as `"phrase.bar.beat"`, e.g. `"2.3.1"`.
    pub fn marker(&self) -> String {
        format!(
            "{}.{}.{}",
            self.phrase,
            self.bar_within_phrase(),
            self.beat_within_bar()
        )
    }
}
