//! The fixture model: authoritative current state of every patched fixture.
//!
//! The model is owned by the loop thread. Command handlers mutate it between
//! ticks; the render path reads it and translates attribute state into DMX
//! channel writes through each fixture's profile.

use std::collections::BTreeMap;

use super::fixture::{Fixture, FixtureId, FixturePatch, UniverseId};
use super::group::{FixtureGroup, GroupId};
use super::profile::Attribute;
use crate::ConsoleError;

/// Registry of patched fixtures and their groups.
///
/// All cross-component references are ids; the model is the single owner of
/// fixture lifetimes.
#[derive(Debug, Default)]
pub struct FixtureModel {
    fixtures: BTreeMap<FixtureId, Fixture>,
    groups: BTreeMap<GroupId, FixtureGroup>,
}

impl FixtureModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches a fixture.
    ///
    /// # Errors
    ///
    /// - [`ConsoleError::PatchConflict`] for a duplicate id or an address
    ///   range overlapping an existing fixture in the same universe.
    /// - [`ConsoleError::FootprintOutOfRange`] if the footprint does not fit
    ///   inside `1..=512` (a footprint never crosses a universe boundary).
    pub fn patch(&mut self, patch: FixturePatch) -> Result<(), ConsoleError> {
        if self.fixtures.contains_key(&patch.id) {
            return Err(ConsoleError::patch_conflict(patch.id, "duplicate id"));
        }

        let count = patch.profile.channel_count();
        let end = patch.address as u32 + count as u32; // one past last
        if patch.address == 0 || end - 1 > 512 {
            return Err(ConsoleError::FootprintOutOfRange {
                fixture_id: patch.id,
                address: patch.address,
                end,
            });
        }

        for other in self.fixtures.values() {
            if other.universe() != patch.universe {
                continue;
            }
            let other_end = other.address() as u32 + other.profile().channel_count() as u32;
            let overlaps = (patch.address as u32) < other_end && (other.address() as u32) < end;
            if overlaps {
                return Err(ConsoleError::patch_conflict(
                    patch.id,
                    format!(
                        "addresses {}..{} overlap fixture {} at {}..{}",
                        patch.address,
                        end,
                        other.id(),
                        other.address(),
                        other_end
                    ),
                ));
            }
        }

        self.fixtures.insert(patch.id, Fixture::new(patch));
        Ok(())
    }

    /// Removes a fixture and its group memberships.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::UnknownFixture`] if the id is not patched.
    pub fn unpatch(&mut self, id: FixtureId) -> Result<Fixture, ConsoleError> {
        let fixture = self
            .fixtures
            .remove(&id)
            .ok_or(ConsoleError::UnknownFixture(id))?;
        for group in self.groups.values_mut() {
            group.remove(id);
        }
        Ok(fixture)
    }

    /// Registers or replaces a group definition.
    pub fn set_group(&mut self, group: FixtureGroup) {
        self.groups.insert(group.id, group);
    }

    /// Looks up a group.
    pub fn group(&self, id: GroupId) -> Option<&FixtureGroup> {
        self.groups.get(&id)
    }

    /// Updates one attribute of one fixture and marks it dirty.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::UnknownFixture`] if the id is not patched.
    pub fn set_state(
        &mut self,
        id: FixtureId,
        attribute: &Attribute,
        value: u8,
    ) -> Result<(), ConsoleError> {
        let fixture = self
            .fixtures
            .get_mut(&id)
            .ok_or(ConsoleError::UnknownFixture(id))?;
        fixture.set(attribute, value);
        Ok(())
    }

    /// Writes one RGB component of one pixel of a pixel bar.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::UnknownFixture`] if the id is not patched.
    pub fn set_pixel(
        &mut self,
        id: FixtureId,
        pixel: u16,
        component: usize,
        value: u8,
    ) -> Result<(), ConsoleError> {
        let fixture = self
            .fixtures
            .get_mut(&id)
            .ok_or(ConsoleError::UnknownFixture(id))?;
        fixture.set_pixel(pixel, component, value);
        Ok(())
    }

    /// Returns a copy of a fixture's current state.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::UnknownFixture`] if the id is not patched.
    pub fn state(&self, id: FixtureId) -> Result<super::fixture::FixtureState, ConsoleError> {
        self.fixtures
            .get(&id)
            .map(|f| f.state().clone())
            .ok_or(ConsoleError::UnknownFixture(id))
    }

    /// Maps an attribute through the profile to an absolute DMX address.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::UnknownFixture`] or [`ConsoleError::UnknownAttribute`].
    pub fn resolve_channel(
        &self,
        id: FixtureId,
        attribute: &Attribute,
    ) -> Result<(UniverseId, u16), ConsoleError> {
        let fixture = self
            .fixtures
            .get(&id)
            .ok_or(ConsoleError::UnknownFixture(id))?;
        let channel = fixture
            .channel_for(attribute)
            .ok_or_else(|| ConsoleError::UnknownAttribute {
                fixture_id: id,
                attribute: attribute.to_string(),
            })?;
        Ok((fixture.universe(), channel))
    }

    /// Looks up a fixture.
    pub fn fixture(&self, id: FixtureId) -> Option<&Fixture> {
        self.fixtures.get(&id)
    }

    pub(crate) fn fixture_mut(&mut self, id: FixtureId) -> Option<&mut Fixture> {
        self.fixtures.get_mut(&id)
    }

    /// Iterates fixtures in id order.
    pub fn fixtures(&self) -> impl Iterator<Item = &Fixture> {
        self.fixtures.values()
    }

    pub(crate) fn fixtures_mut(&mut self) -> impl Iterator<Item = &mut Fixture> {
        self.fixtures.values_mut()
    }

    /// Number of patched fixtures.
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    /// `true` when nothing is patched.
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Zeroes the state of every fixture (blocking-cue reset, blackout).
    pub fn reset_states(&mut self) {
        for fixture in self.fixtures.values_mut() {
            fixture.reset_state();
        }
    }

    /// Drops all fixtures and groups (show clear).
    pub fn clear(&mut self) {
        self.fixtures.clear();
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::profile::Profile;

    fn rgb(id: u32, universe: u16, address: u16) -> FixturePatch {
        FixturePatch {
            id: FixtureId(id),
            name: format!("par-{id}"),
            universe: UniverseId::new(universe).unwrap(),
            address,
            profile: Profile::new(
                "rgb",
                3,
                [
                    (Attribute::Red, 1),
                    (Attribute::Green, 2),
                    (Attribute::Blue, 3),
                ],
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_patch_and_resolve() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 10)).unwrap();
        let (universe, channel) = m.resolve_channel(FixtureId(1), &Attribute::Green).unwrap();
        assert_eq!(universe.get(), 1);
        assert_eq!(channel, 11);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 1)).unwrap();
        let err = m.patch(rgb(1, 1, 100)).unwrap_err();
        assert!(matches!(err, ConsoleError::PatchConflict { .. }));
    }

    #[test]
    fn test_overlapping_addresses_rejected() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 10)).unwrap(); // channels 10,11,12
        assert!(m.patch(rgb(2, 1, 12)).is_err()); // 12,13,14 hits 12
        assert!(m.patch(rgb(3, 1, 8)).is_err()); // 8,9,10 hits 10
        assert!(m.patch(rgb(4, 1, 7)).is_ok()); // 7,8,9 clears it
    }

    #[test]
    fn test_adjacent_addresses_allowed() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 10)).unwrap(); // channels 10,11,12
        m.patch(rgb(2, 1, 13)).unwrap(); // channels 13,14,15
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_same_address_different_universe_allowed() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 10)).unwrap();
        m.patch(rgb(2, 2, 10)).unwrap();
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_footprint_must_fit_universe() {
        let mut m = FixtureModel::new();
        let err = m.patch(rgb(1, 1, 511)).unwrap_err(); // 511..514
        assert!(matches!(err, ConsoleError::FootprintOutOfRange { .. }));
        assert!(m.patch(rgb(2, 1, 510)).is_ok()); // 510,511,512 fits
    }

    #[test]
    fn test_patch_unpatch_is_noop() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 1)).unwrap();
        m.unpatch(FixtureId(1)).unwrap();
        assert!(m.is_empty());
        assert!(matches!(
            m.unpatch(FixtureId(1)),
            Err(ConsoleError::UnknownFixture(_))
        ));
    }

    #[test]
    fn test_unpatch_removes_group_membership() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 1)).unwrap();
        m.patch(rgb(2, 1, 4)).unwrap();
        m.set_group(FixtureGroup::new(
            GroupId(7),
            "all",
            vec![FixtureId(1), FixtureId(2)],
        ));
        m.unpatch(FixtureId(1)).unwrap();
        assert_eq!(m.group(GroupId(7)).unwrap().fixtures, vec![FixtureId(2)]);
    }

    #[test]
    fn test_unknown_attribute_error() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 1)).unwrap();
        let err = m
            .resolve_channel(FixtureId(1), &Attribute::Intensity)
            .unwrap_err();
        assert!(matches!(err, ConsoleError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_set_state_marks_dirty() {
        let mut m = FixtureModel::new();
        m.patch(rgb(1, 1, 1)).unwrap();
        m.fixture_mut(FixtureId(1)).unwrap().mark_clean();
        m.set_state(FixtureId(1), &Attribute::Red, 255).unwrap();
        assert!(m.fixture(FixtureId(1)).unwrap().is_dirty());
        assert_eq!(m.state(FixtureId(1)).unwrap().red, 255);
    }
}
