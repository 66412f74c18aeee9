//! Show definition: the unit `load_show` operates on.
//!
//! A [`Show`] is supplied fully formed by an external loader (the JSON
//! show-file layer lives outside the core); the core validates it against
//! the patch rules when loading and never persists it.

use serde::{Deserialize, Serialize};

use crate::cue::{CueList, Preset};
use crate::fixture::{FixtureGroup, FixturePatch};

/// Everything a performance needs: patch, groups, presets, cue lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Show {
    /// Display name.
    pub name: String,
    /// Fixtures to patch, in patch order.
    #[serde(default)]
    pub patches: Vec<FixturePatch>,
    /// Fixture groups; member order drives effect distribution.
    #[serde(default)]
    pub groups: Vec<FixtureGroup>,
    /// Presets referenced from cues.
    #[serde(default)]
    pub presets: Vec<Preset>,
    /// The cue lists.
    #[serde(default)]
    pub cue_lists: Vec<CueList>,
}

impl Show {
    /// Creates an empty show.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_show() {
        let show = Show::new("friday night");
        assert_eq!(show.name, "friday night");
        assert!(show.patches.is_empty());
        assert!(show.cue_lists.is_empty());
    }
}
