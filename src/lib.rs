//! # halo-core
//!
//! The playback core of the Halo lighting console: a deterministic, beat-
//! and timecode-synchronized engine that renders a show (cue lists, cues,
//! effects, fixture state) into DMX universes emitted over Art-Net at a
//! fixed 44 Hz cadence, while staying responsive to live MIDI and operator
//! input.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use halo_core::{Console, ConsoleConfig, CueListId};
//!
//! let config = ConsoleConfig::new("192.168.1.100".parse()?);
//! let handle = Console::builder(config)
//!     .with_show(show)
//!     .on_event(|event| tracing::info!(?event, "console"))
//!     .start()?;
//!
//! handle.go(CueListId(1))?;     // fire the first cue
//! // ... perform ...
//! handle.shutdown()?;           // blackout and exit
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Loop thread**: owns every piece of mutable core state (fixture model,
//!   compositor, scheduler, effects, overrides, router) and runs the 44 Hz
//!   tick. No lock is taken inside the tick path.
//! - **Command channel**: bounded; the handle submits, the loop drains at
//!   tick start. Commands submitted before tick T are visible by tick T+1.
//! - **Event stream**: the loop reports ticks, cue transport, warnings, and
//!   destination health through a callback (or a channel adapter).
//!
//! Long-latency collaborators such as audio playback, MIDI input, and
//! external timecode live outside the crate behind the [`AudioPlayer`] and
//! [`TimecodeSource`] traits and the override command surface.
//!
//! Runtime data errors never crash the core: unresolved references, dead
//! destinations, and tick overruns degrade and report; only construction
//! contract violations (bad patch addresses, invalid profiles) are rejected
//! outright.

#![warn(missing_docs)]
// DMX math casts freely between byte space and f64 interpolation space.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

mod artnet;
mod audio;
mod builder;
mod command;
mod config;
mod cue;
mod dmx;
mod effect;
mod engine;
mod error;
mod event;
mod fixture;
mod handle;
mod overrides;
mod rhythm;
mod show;

pub use artnet::{
    encode_art_dmx, ArtNetRouter, Destination, RouterEvent, ARTNET_HEADER, ARTNET_PORT,
    ART_DMX_LEN, OP_OUTPUT, PROTOCOL_VERSION,
};
pub use audio::{AudioPlayer, NullAudioPlayer};
pub use builder::{Console, ConsoleBuilder};
pub use command::{Command, StateSnapshot};
pub use config::{
    ConsoleConfig, LightingRoute, OutputRouting, PixelRoute, DEFAULT_PIXEL_END_UNIVERSE,
    DEFAULT_PIXEL_START_UNIVERSE, DEFAULT_TICK_RATE,
};
pub use cue::{
    Cue, CueId, CueList, CueListId, CueScheduler, CueState, InternalTimecode, Preset, PresetId,
    SchedulerEvent, StaticValue, TimecodePosition, TimecodeSelection, TimecodeSource,
};
pub use dmx::{DmxCompositor, FrameMode, UNIVERSE_SIZE};
pub use effect::{
    DistributionMode, DistributionScope, EffectEngine, EffectInstance, EffectRate, EffectWrite,
    StepInterval, UnresolvedTarget, Waveform,
};
pub use error::ConsoleError;
pub use event::{
    event_callback, event_channel, ConsoleEvent, DestinationStatus, EventCallback, WarningKind,
};
pub use fixture::{
    Attribute, Fixture, FixtureGroup, FixtureId, FixtureModel, FixturePatch, FixtureState, GroupId,
    Profile, UniverseId,
};
pub use handle::ConsoleHandle;
pub use overrides::{AppliedOverride, OverrideKind, OverrideLayer};
pub use rhythm::{Metronome, Snapshot, MAX_BPM, MIN_BPM};
pub use show::Show;
