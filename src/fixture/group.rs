//! Ordered fixture groups.
//!
//! Group order is the iteration axis for wave and step effect distribution,
//! so it is preserved exactly as declared, across show reloads.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::fixture::FixtureId;

/// Stable group identifier, unique within a show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An ordered sequence of fixture ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureGroup {
    /// Stable id.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Members, in distribution order.
    pub fixtures: Vec<FixtureId>,
}

impl FixtureGroup {
    /// Creates a group from members in the given order.
    pub fn new(id: GroupId, name: impl Into<String>, fixtures: Vec<FixtureId>) -> Self {
        Self {
            id,
            name: name.into(),
            fixtures,
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    /// `true` if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Removes a fixture wherever it appears, keeping the order of the rest.
    pub fn remove(&mut self, fixture: FixtureId) {
        self.fixtures.retain(|f| *f != fixture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_preserves_order() {
        let g = FixtureGroup::new(
            GroupId(1),
            "pars",
            vec![FixtureId(3), FixtureId(1), FixtureId(2)],
        );
        assert_eq!(g.fixtures, vec![FixtureId(3), FixtureId(1), FixtureId(2)]);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut g = FixtureGroup::new(
            GroupId(1),
            "pars",
            vec![FixtureId(3), FixtureId(1), FixtureId(2)],
        );
        g.remove(FixtureId(1));
        assert_eq!(g.fixtures, vec![FixtureId(3), FixtureId(2)]);
    }
}
