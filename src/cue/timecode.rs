//! Timecode positions and sources.
//!
//! A [`TimecodeSource`] supplies a monotonically advancing playhead the
//! scheduler polls once per tick to fire timecode-anchored cues. The core
//! ships [`InternalTimecode`], a wall-clock playhead with play/pause/seek;
//! SMPTE ingestion lives outside the core and plugs in through the same
//! trait.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// A point on the timecode timeline.
///
/// Stored as elapsed time from timecode zero; SMPTE framing is a view applied
/// at a chosen frame rate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TimecodePosition(Duration);

impl TimecodePosition {
    /// Timecode zero.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Builds a position from elapsed time.
    pub fn from_duration(elapsed: Duration) -> Self {
        Self(elapsed)
    }

    /// Builds a position from seconds.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::from_secs_f64(secs.max(0.0)))
    }

    /// Builds a position from SMPTE fields at `frame_rate` fps.
    pub fn from_smpte(hours: u32, minutes: u32, seconds: u32, frames: u32, frame_rate: u32) -> Self {
        let rate = frame_rate.max(1);
        let secs = f64::from(hours) * 3600.0
            + f64::from(minutes) * 60.0
            + f64::from(seconds)
            + f64::from(frames) / f64::from(rate);
        Self::from_secs_f64(secs)
    }

    /// Elapsed time from timecode zero.
    pub fn as_duration(self) -> Duration {
        self.0
    }

    /// Elapsed seconds from timecode zero.
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// SMPTE view `(hours, minutes, seconds, frames)` at `frame_rate` fps.
    pub fn smpte(self, frame_rate: u32) -> (u32, u32, u32, u32) {
        let rate = frame_rate.max(1);
        let total = self.0.as_secs();
        let frames = (self.0.subsec_nanos() as f64 / 1e9 * f64::from(rate)) as u32;
        (
            (total / 3600) as u32,
            ((total % 3600) / 60) as u32,
            (total % 60) as u32,
            frames.min(rate - 1),
        )
    }
}

impl fmt::Display for TimecodePosition {
    /// Formats as `HH:MM:SS:FF` at 30 fps.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s, fr) = self.smpte(30);
        write!(f, "{h:02}:{m:02}:{s:02}:{fr:02}")
    }
}

/// A seekable, monotonically advancing playhead.
///
/// The scheduler queries `position` once per tick and compares it against
/// the previous tick's value: a forward crossing fires anchored cues, a
/// backward jump re-arms them.
pub trait TimecodeSource: Send {
    /// The playhead at `now`.
    fn position(&mut self, now: Instant) -> TimecodePosition;

    /// Moves the playhead.
    fn seek(&mut self, to: TimecodePosition, now: Instant);

    /// Starts the playhead advancing from its current position.
    fn play(&mut self, now: Instant);

    /// Freezes the playhead.
    fn pause(&mut self, now: Instant);
}

/// Wall-clock timecode derived from the tick clock.
#[derive(Debug, Default)]
pub struct InternalTimecode {
    /// Position accumulated up to the last play/pause/seek edge.
    base: Duration,
    /// Set while playing; the instant `base` was last valid.
    playing_since: Option<Instant>,
}

impl InternalTimecode {
    /// Creates a paused playhead at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while the playhead advances.
    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }
}

impl TimecodeSource for InternalTimecode {
    fn position(&mut self, now: Instant) -> TimecodePosition {
        let elapsed = match self.playing_since {
            Some(since) => self.base + now.saturating_duration_since(since),
            None => self.base,
        };
        TimecodePosition::from_duration(elapsed)
    }

    fn seek(&mut self, to: TimecodePosition, now: Instant) {
        self.base = to.as_duration();
        if self.playing_since.is_some() {
            self.playing_since = Some(now);
        }
    }

    fn play(&mut self, now: Instant) {
        if self.playing_since.is_none() {
            self.playing_since = Some(now);
        }
    }

    fn pause(&mut self, now: Instant) {
        if let Some(since) = self.playing_since.take() {
            self.base += now.saturating_duration_since(since);
        }
    }
}
