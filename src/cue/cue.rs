//! Cue and cue list data model.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::timecode::TimecodePosition;
use crate::effect::EffectInstance;
use crate::fixture::{Attribute, FixtureId};

/// Cue identifier, unique within a show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct CueId(pub u32);

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Cue list identifier, unique within a show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct CueListId(pub u32);

impl fmt::Display for CueListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Preset identifier, unique within a show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct PresetId(pub u32);

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One static channel target: fixture, attribute, byte value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticValue {
    /// Target fixture.
    pub fixture: FixtureId,
    /// Target attribute.
    pub attribute: Attribute,
    /// Target value.
    pub value: u8,
}

impl StaticValue {
    /// Convenience constructor.
    pub fn new(fixture: FixtureId, attribute: Attribute, value: u8) -> Self {
        Self {
            fixture,
            attribute,
            value,
        }
    }
}

/// A named bundle of static values, referenced from cues by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    /// Stable id.
    pub id: PresetId,
    /// Display name.
    pub name: String,
    /// Values applied when a cue references this preset.
    pub values: Vec<StaticValue>,
}

/// A named lighting state with fade, wait, and follow timings.
///
/// All timings are durations relative to the cue's *go* instant: the fade
/// begins `wait` after go, completes `fade` later, and a `follow` (when set)
/// triggers the next cue `follow` after go regardless of fade completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cue {
    /// Stable id, unique within the show.
    pub id: CueId,
    /// Display name.
    pub name: String,
    /// Fade duration; zero snaps to targets on the first tick after the wait.
    #[serde(default)]
    pub fade: Duration,
    /// Delay between go and the start of the fade.
    #[serde(default)]
    pub wait: Duration,
    /// Auto-advance delay after go; `None` means manual advance only.
    #[serde(default)]
    pub follow: Option<Duration>,
    /// A blocking cue stops earlier values from tracking through it.
    #[serde(default)]
    pub blocking: bool,
    /// Static channel targets.
    #[serde(default)]
    pub static_values: Vec<StaticValue>,
    /// Effects started when this cue activates.
    #[serde(default)]
    pub effects: Vec<EffectInstance>,
    /// Presets expanded into static targets at render time.
    #[serde(default)]
    pub presets: Vec<PresetId>,
    /// Timecode anchor; the scheduler fires go when the playhead crosses it.
    #[serde(default)]
    pub timecode: Option<TimecodePosition>,
}

impl Cue {
    /// Creates a manual cue with no timings and no content.
    pub fn new(id: CueId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            fade: Duration::ZERO,
            wait: Duration::ZERO,
            follow: None,
            blocking: false,
            static_values: Vec::new(),
            effects: Vec::new(),
            presets: Vec::new(),
            timecode: None,
        }
    }
}

/// Which timecode playhead drives a list's anchored cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimecodeSelection {
    /// Anchors in this list never fire automatically.
    #[default]
    None,
    /// The console's timecode source (internal wall-clock or external SMPTE).
    Console,
}

/// An ordered sequence of cues with its own transport state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueList {
    /// Stable id.
    pub id: CueListId,
    /// Display name.
    pub name: String,
    /// Render priority; higher-priority lists composite later and win.
    #[serde(default)]
    pub priority: u8,
    /// The cues, in playback order.
    pub cues: Vec<Cue>,
    /// Audio file started when this list first goes, stopped with the list.
    #[serde(default)]
    pub audio_file: Option<PathBuf>,
    /// Timecode source selection for anchored cues.
    #[serde(default)]
    pub timecode_source: TimecodeSelection,
}

impl CueList {
    /// Creates an empty manual list at priority 0.
    pub fn new(id: CueListId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            priority: 0,
            cues: Vec::new(),
            audio_file: None,
            timecode_source: TimecodeSelection::None,
        }
    }

    /// Index of the cue with `id`, if present.
    pub fn index_of(&self, id: CueId) -> Option<usize> {
        self.cues.iter().position(|c| c.id == id)
    }
}

/// Lifecycle of a cue inside the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueState {
    /// In the list, not yet given go.
    Pending,
    /// Go received; waiting out the cue's wait time.
    WaitPending,
    /// Wait elapsed; fade starting this tick.
    Active,
    /// Fade in progress.
    Fading,
    /// Fade complete; values merged into tracking.
    Done,
    /// Displaced before completion (go-next, stop, backward seek).
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_defaults() {
        let cue = Cue::new(CueId(1), "look 1");
        assert_eq!(cue.fade, Duration::ZERO);
        assert_eq!(cue.wait, Duration::ZERO);
        assert!(cue.follow.is_none());
        assert!(!cue.blocking);
    }

    #[test]
    fn test_list_index_of() {
        let mut list = CueList::new(CueListId(1), "main");
        list.cues.push(Cue::new(CueId(10), "a"));
        list.cues.push(Cue::new(CueId(20), "b"));
        assert_eq!(list.index_of(CueId(20)), Some(1));
        assert_eq!(list.index_of(CueId(30)), None);
    }
}
