//! Audio playback boundary.
//!
//! The core does not decode or play audio. When a cue list with an associated
//! audio file starts or stops, the loop calls into an [`AudioPlayer`]
//! supplied by the host application. Calls are fire-and-forget; the core
//! never waits on playback and does not correct audio drift.

use std::path::Path;
use std::time::Instant;

/// A collaborator that plays show audio.
pub trait AudioPlayer: Send {
    /// Starts playing `file`. `at` is the tick instant the cue list went
    /// active, for hosts that want to compensate their own startup latency.
    fn play(&mut self, file: &Path, at: Instant);

    /// Stops playback.
    fn stop(&mut self);
}

/// Discards all audio commands. The default for headless use and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioPlayer;

impl AudioPlayer for NullAudioPlayer {
    fn play(&mut self, file: &Path, _at: Instant) {
        tracing::debug!(file = %file.display(), "audio play (no player attached)");
    }

    fn stop(&mut self) {}
}
