//! Handle to a running console.
//!
//! The handle is the facade's command surface: every method enqueues a
//! [`Command`] for the loop thread. Commands submitted before tick T are
//! visible by tick T+1; results and faults come back on the event stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;

use crate::command::{Command, StateSnapshot};
use crate::cue::{CueId, CueListId, Preset, TimecodePosition};
use crate::fixture::{Attribute, FixtureGroup, FixtureId, FixturePatch};
use crate::overrides::OverrideKind;
use crate::show::Show;
use crate::ConsoleError;

/// How long `snapshot_state` waits for the loop to reply.
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(1);

/// Command surface for a running console.
///
/// Cloneable across threads is deliberately *not* provided: one owner drives
/// the console; a UI or MIDI mapper submits through that owner. Dropping the
/// handle requests shutdown without waiting for the final blackout.
pub struct ConsoleHandle {
    command_tx: Sender<Command>,
    shutting_down: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleHandle {
    pub(crate) fn new(
        command_tx: Sender<Command>,
        shutting_down: Arc<AtomicBool>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            command_tx,
            shutting_down,
            thread: Mutex::new(Some(thread)),
        }
    }

    /// `true` until shutdown is requested.
    pub fn is_running(&self) -> bool {
        !self.shutting_down.load(Ordering::SeqCst)
    }

    fn send(&self, command: Command) -> Result<(), ConsoleError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(ConsoleError::ShuttingDown);
        }
        self.command_tx.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => ConsoleError::Backpressure,
            TrySendError::Disconnected(_) => ConsoleError::ShuttingDown,
        })
    }

    /// Patches a fixture.
    ///
    /// # Errors
    ///
    /// Queue errors only; patch conflicts surface on the event stream.
    pub fn patch(&self, patch: FixturePatch) -> Result<(), ConsoleError> {
        self.send(Command::Patch(patch))
    }

    /// Removes a fixture.
    pub fn unpatch(&self, fixture: FixtureId) -> Result<(), ConsoleError> {
        self.send(Command::Unpatch(fixture))
    }

    /// Registers or replaces a fixture group.
    pub fn set_group(&self, group: FixtureGroup) -> Result<(), ConsoleError> {
        self.send(Command::SetGroup(group))
    }

    /// Registers or replaces a preset.
    pub fn set_preset(&self, preset: Preset) -> Result<(), ConsoleError> {
        self.send(Command::SetPreset(preset))
    }

    /// Replaces the loaded show.
    pub fn load_show(&self, show: Show) -> Result<(), ConsoleError> {
        self.send(Command::LoadShow(Box::new(show)))
    }

    /// Drops the loaded show and blacks out.
    pub fn clear_show(&self) -> Result<(), ConsoleError> {
        self.send(Command::ClearShow)
    }

    /// Fires the next cue of a list.
    pub fn go(&self, list: CueListId) -> Result<(), ConsoleError> {
        self.send(Command::Go(list))
    }

    /// Fires a specific cue.
    pub fn go_cue(&self, list: CueListId, cue: CueId) -> Result<(), ConsoleError> {
        self.send(Command::GoCue(list, cue))
    }

    /// Fires the previous cue.
    pub fn go_previous(&self, list: CueListId) -> Result<(), ConsoleError> {
        self.send(Command::GoPrevious(list))
    }

    /// Halts a list, keeping its last composite on stage.
    pub fn stop(&self, list: CueListId) -> Result<(), ConsoleError> {
        self.send(Command::Stop(list))
    }

    /// Moves the timecode playhead; anchors ahead of it re-arm.
    pub fn seek(&self, position: TimecodePosition) -> Result<(), ConsoleError> {
        self.send(Command::Seek(position))
    }

    /// Freezes transport, fades, effects, and the internal playhead.
    pub fn pause(&self) -> Result<(), ConsoleError> {
        self.send(Command::Pause)
    }

    /// Resumes from pause.
    pub fn resume(&self) -> Result<(), ConsoleError> {
        self.send(Command::Resume)
    }

    /// Changes tempo, preserving the current beat and phase.
    pub fn set_tempo(&self, bpm: f64) -> Result<(), ConsoleError> {
        self.send(Command::SetTempo(bpm))
    }

    /// Re-anchors the beat grid to an external beat number.
    pub fn align_tempo(&self, beat: i64) -> Result<(), ConsoleError> {
        self.send(Command::AlignTempo(beat))
    }

    /// Places a live override above the cue composite.
    pub fn set_override(
        &self,
        kind: OverrideKind,
        fixture: FixtureId,
        attribute: Attribute,
        value: u8,
    ) -> Result<(), ConsoleError> {
        self.send(Command::SetOverride {
            kind,
            fixture,
            attribute,
            value,
        })
    }

    /// Releases a latched override.
    pub fn release_override(
        &self,
        fixture: FixtureId,
        attribute: Attribute,
    ) -> Result<(), ConsoleError> {
        self.send(Command::ReleaseOverride { fixture, attribute })
    }

    /// Captures read-only diagnostics from the loop thread.
    ///
    /// # Errors
    ///
    /// Queue errors, or [`ConsoleError::ShuttingDown`] if the loop exits
    /// before replying.
    pub fn snapshot_state(&self) -> Result<StateSnapshot, ConsoleError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.send(Command::SnapshotState(tx))?;
        rx.recv_timeout(SNAPSHOT_TIMEOUT)
            .map_err(|_| ConsoleError::ShuttingDown)
    }

    /// Requests shutdown and waits for the loop to emit its blackout frame
    /// and exit.
    ///
    /// Commands submitted after this call fail with
    /// [`ConsoleError::ShuttingDown`].
    ///
    /// # Errors
    ///
    /// [`ConsoleError::ShuttingDown`] if the loop was already gone.
    pub fn shutdown(&self) -> Result<(), ConsoleError> {
        let first = !self.shutting_down.swap(true, Ordering::SeqCst);
        if first {
            // Blocking send: the drain loop frees queue space every tick.
            self.command_tx
                .send(Command::Shutdown)
                .map_err(|_| ConsoleError::ShuttingDown)?;
        }
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                tracing::error!("playback thread panicked during shutdown");
            }
        }
        Ok(())
    }
}

impl Drop for ConsoleHandle {
    fn drop(&mut self) {
        if !self.shutting_down.swap(true, Ordering::SeqCst) {
            // Best effort: request shutdown without blocking on the join.
            let _ = self.command_tx.try_send(Command::Shutdown);
        }
    }
}
