//! Console events: the response stream of the playback core.
//!
//! Everything the core wants the outside world to know (ticks, cue
//! transport, degraded destinations, warnings) flows through
//! [`ConsoleEvent`]. Events are informational: playback continues after any
//! of them. Commands that are outright rejected return a
//! [`ConsoleError`](crate::ConsoleError) from the handle instead.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cue::{CueId, CueListId};
use crate::fixture::{Attribute, FixtureId, UniverseId};

/// Classification for warning events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A cue, effect, or override referenced something missing from the
    /// patch; playback continued with the resolvable targets.
    UnresolvedReference,
    /// A composited universe has no Art-Net destination (once per run).
    UnroutedUniverse,
    /// The command drain hit its high-water mark; commands are buffered,
    /// never silently dropped.
    CommandBackpressure,
}

/// Health of one Art-Net destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationStatus {
    /// A send failed; the destination may recover.
    Unreachable {
        /// OS error text.
        error: String,
    },
    /// Consecutive failures crossed the configured threshold.
    Down,
    /// Sends succeed again after failures.
    Restored,
}

/// Events streamed from the playback core.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    /// One frame was composited and emitted.
    Tick {
        /// Frames emitted since start.
        frame: u64,
        /// Lists with a cue mid-wait or mid-fade.
        active_cues: usize,
    },

    /// A cue received go.
    CueActivated {
        /// The owning list.
        list: CueListId,
        /// The activated cue.
        cue: CueId,
    },

    /// A cue's fade completed.
    CueCompleted {
        /// The owning list.
        list: CueListId,
        /// The completed cue.
        cue: CueId,
    },

    /// An override wrote to the frame this tick.
    OverrideApplied {
        /// Target fixture.
        fixture: FixtureId,
        /// Target attribute.
        attribute: Attribute,
        /// Byte written.
        value: u8,
    },

    /// A recoverable fault; playback continued.
    Warning {
        /// What kind of fault.
        kind: WarningKind,
        /// Human-readable detail.
        message: String,
    },

    /// A command failed after it was accepted into the queue.
    Error {
        /// What went wrong.
        message: String,
    },

    /// An Art-Net destination changed health.
    DestinationHealth {
        /// The destination.
        destination: SocketAddr,
        /// Its new status.
        status: DestinationStatus,
    },

    /// A universe was dropped for lack of a destination (once per run).
    UniverseUnrouted {
        /// The unrouted universe.
        universe: UniverseId,
    },

    /// A tick exceeded its period. The loop proceeds immediately and does
    /// not try to catch up.
    TickOverrun {
        /// Observed tick duration.
        duration: Duration,
    },

    /// Two or more consecutive overruns; elevated severity.
    TickSustainedOverrun {
        /// Overruns in the streak.
        consecutive: u32,
    },

    /// The loop emitted its blackout frame and exited.
    ShutdownComplete,
}

/// Callback type for receiving console events.
///
/// Register via [`ConsoleBuilder::on_event()`](crate::ConsoleBuilder::on_event).
/// The callback runs on the loop thread: keep it cheap and never block.
pub type EventCallback = Arc<dyn Fn(ConsoleEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure without the `Arc` ceremony.
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(ConsoleEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds a callback that forwards events into a bounded channel and hands
/// back the receiving end.
///
/// Events are dropped (with a `tracing` warning) if the channel is full; a
/// UI that stops draining must not stall the loop thread.
pub fn event_channel(capacity: usize) -> (EventCallback, crossbeam_channel::Receiver<ConsoleEvent>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let callback = event_callback(move |event| {
        if let Err(crossbeam_channel::TrySendError::Full(event)) = tx.try_send(event) {
            tracing::warn!(?event, "event channel full, dropping event");
        }
    });
    (callback, rx)
}
