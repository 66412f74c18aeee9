//! Cues, cue lists, timecode, and the playback scheduler.

#[allow(clippy::module_inception)]
mod cue;
mod scheduler;
mod timecode;

pub use cue::{
    Cue, CueId, CueList, CueListId, CueState, Preset, PresetId, StaticValue, TimecodeSelection,
};
pub use scheduler::{CueScheduler, SchedulerEvent};
pub use timecode::{InternalTimecode, TimecodePosition, TimecodeSource};
