//! Commands accepted by the playback core.
//!
//! Commands cross the thread boundary from the facade handle to the loop
//! through a bounded channel; everything submitted before tick T is visible
//! by tick T+1. Failures after acceptance surface as
//! [`ConsoleEvent::Error`](crate::ConsoleEvent::Error) on the event stream.

use std::net::SocketAddr;

use crossbeam_channel::Sender;

use crate::cue::{CueId, CueListId, CueState, Preset, TimecodePosition};
use crate::fixture::{Attribute, FixtureId, FixtureGroup, FixturePatch, FixtureState};
use crate::overrides::OverrideKind;
use crate::show::Show;

/// A command submitted through the console handle.
#[derive(Debug)]
pub enum Command {
    /// Patch a fixture.
    Patch(FixturePatch),
    /// Remove a fixture and its group memberships.
    Unpatch(FixtureId),
    /// Register or replace a fixture group.
    SetGroup(FixtureGroup),
    /// Register or replace a preset.
    SetPreset(Preset),
    /// Replace the loaded show.
    LoadShow(Box<Show>),
    /// Drop the loaded show, fixtures included.
    ClearShow,

    /// Fire the next cue of a list.
    Go(CueListId),
    /// Fire a specific cue.
    GoCue(CueListId, CueId),
    /// Fire the previous cue.
    GoPrevious(CueListId),
    /// Halt a list.
    Stop(CueListId),
    /// Move the timecode playhead.
    Seek(TimecodePosition),
    /// Freeze all transport, fades, and effects.
    Pause,
    /// Resume from pause.
    Resume,

    /// Change tempo, preserving the current beat and phase.
    SetTempo(f64),
    /// Re-anchor the beat grid to an external beat number.
    AlignTempo(i64),

    /// Place a live override above the cue composite.
    SetOverride {
        /// Hold behavior.
        kind: OverrideKind,
        /// Target fixture.
        fixture: FixtureId,
        /// Target attribute.
        attribute: Attribute,
        /// Value to hold.
        value: u8,
    },
    /// Release a latched override.
    ReleaseOverride {
        /// Target fixture.
        fixture: FixtureId,
        /// Target attribute.
        attribute: Attribute,
    },

    /// Request a diagnostics snapshot; the reply arrives on the provided
    /// channel before the next frame is emitted.
    SnapshotState(Sender<StateSnapshot>),

    /// Drain, emit a blackout frame on all mapped universes, and exit.
    Shutdown,
}

/// Read-only diagnostics captured between ticks.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Frames emitted since start.
    pub frame: u64,
    /// Current tempo in BPM.
    pub bpm: f64,
    /// Transport per list: current cue, state, fade progress.
    pub transport: Vec<(CueListId, Option<(CueId, CueState, f32)>)>,
    /// Current state of every patched fixture.
    pub fixtures: Vec<(FixtureId, FixtureState)>,
    /// Destination health as `(address, is_down)`.
    pub destinations: Vec<(SocketAddr, bool)>,
    /// Live override count.
    pub overrides: usize,
}
