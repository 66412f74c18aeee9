//! Fixture identity, patch location, and live state.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::profile::{Attribute, Profile};
use crate::ConsoleError;

/// Stable fixture identifier, unique within a show.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct FixtureId(pub u32);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A 15-bit Art-Net universe id, `1..=32767`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct UniverseId(u16);

impl UniverseId {
    /// Validates and wraps a raw universe number.
    ///
    /// # Errors
    ///
    /// Rejects 0 and values above 32767 (the Art-Net port address is 15 bits).
    pub fn new(raw: u16) -> Result<Self, ConsoleError> {
        if raw == 0 || raw > 0x7FFF {
            return Err(ConsoleError::UniverseOutOfRange(raw));
        }
        Ok(Self(raw))
    }

    /// The raw universe number.
    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for UniverseId {
    type Error = ConsoleError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<UniverseId> for u16 {
    fn from(u: UniverseId) -> u16 {
        u.0
    }
}

impl fmt::Display for UniverseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything needed to put a fixture on the wire: identity, location, profile.
///
/// This is the unit handed to `patch`; the model turns it into a live
/// [`Fixture`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturePatch {
    /// Stable id, unique within the show.
    pub id: FixtureId,
    /// Display name.
    pub name: String,
    /// Universe the footprint lives in.
    pub universe: UniverseId,
    /// First DMX address of the footprint, 1-based.
    pub address: u16,
    /// Channel map for this fixture model.
    pub profile: Profile,
}

/// Live attribute values for one fixture.
///
/// Values are DMX bytes. Attributes the profile does not map can still be
/// stored here; they simply never reach the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureState {
    /// Dimmer level.
    pub intensity: u8,
    /// Red component.
    pub red: u8,
    /// Green component.
    pub green: u8,
    /// Blue component.
    pub blue: u8,
    /// White auxiliary emitter.
    pub white: u8,
    /// Amber auxiliary emitter.
    pub amber: u8,
    /// UV auxiliary emitter.
    pub uv: u8,
    /// Pan position.
    pub pan: u8,
    /// Tilt position.
    pub tilt: u8,
    /// Strobe rate/function.
    pub strobe: u8,
    /// Named auxiliary values outside the fixed set.
    pub aux: HashMap<String, u8>,
    /// Per-pixel RGB values for pixel bars; empty otherwise.
    pub pixels: Vec<[u8; 3]>,
}

impl FixtureState {
    /// Reads the value stored for `attribute` (0 if never set).
    pub fn get(&self, attribute: &Attribute) -> u8 {
        match attribute {
            Attribute::Intensity => self.intensity,
            Attribute::Red => self.red,
            Attribute::Green => self.green,
            Attribute::Blue => self.blue,
            Attribute::White => self.white,
            Attribute::Amber => self.amber,
            Attribute::Uv => self.uv,
            Attribute::Pan => self.pan,
            Attribute::Tilt => self.tilt,
            Attribute::Strobe => self.strobe,
            Attribute::Aux(name) => self.aux.get(name).copied().unwrap_or(0),
            other => self.aux.get(&other.to_string()).copied().unwrap_or(0),
        }
    }

    /// Stores `value` for `attribute`.
    pub fn set(&mut self, attribute: &Attribute, value: u8) {
        match attribute {
            Attribute::Intensity => self.intensity = value,
            Attribute::Red => self.red = value,
            Attribute::Green => self.green = value,
            Attribute::Blue => self.blue = value,
            Attribute::White => self.white = value,
            Attribute::Amber => self.amber = value,
            Attribute::Uv => self.uv = value,
            Attribute::Pan => self.pan = value,
            Attribute::Tilt => self.tilt = value,
            Attribute::Strobe => self.strobe = value,
            Attribute::Aux(name) => {
                self.aux.insert(name.clone(), value);
            }
            other => {
                self.aux.insert(other.to_string(), value);
            }
        }
    }

    /// Resets every value (including pixels) to zero, keeping pixel layout.
    pub fn reset(&mut self) {
        let pixel_len = self.pixels.len();
        *self = FixtureState::default();
        self.pixels = vec![[0; 3]; pixel_len];
    }
}

/// A patched fixture: identity, location, profile, and current state.
///
/// Created at patch time, mutated only through the model/compositor path,
/// destroyed only on re-patch.
#[derive(Debug, Clone)]
pub struct Fixture {
    id: FixtureId,
    name: String,
    universe: UniverseId,
    address: u16,
    profile: Profile,
    state: FixtureState,
    dirty: bool,
}

impl Fixture {
    pub(crate) fn new(patch: FixturePatch) -> Self {
        let mut state = FixtureState::default();
        if patch.profile.is_pixel_bar() {
            state.pixels = vec![[0; 3]; patch.profile.pixel_count() as usize];
        }
        Self {
            id: patch.id,
            name: patch.name,
            universe: patch.universe,
            address: patch.address,
            profile: patch.profile,
            state,
            dirty: true,
        }
    }

    /// Stable fixture id.
    pub fn id(&self) -> FixtureId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Universe the footprint lives in.
    pub fn universe(&self) -> UniverseId {
        self.universe
    }

    /// First DMX address of the footprint, 1-based.
    pub fn address(&self) -> u16 {
        self.address
    }

    /// The fixture's channel map.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Current state (read-only).
    pub fn state(&self) -> &FixtureState {
        &self.state
    }

    /// `true` if state changed since the compositor last consumed it.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn set(&mut self, attribute: &Attribute, value: u8) {
        self.state.set(attribute, value);
        self.dirty = true;
    }

    pub(crate) fn set_pixel(&mut self, index: u16, channel: usize, value: u8) {
        if let Some(px) = self.state.pixels.get_mut(index as usize) {
            if channel < 3 {
                px[channel] = value;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn reset_state(&mut self) {
        self.state.reset();
        self.dirty = true;
    }

    /// Absolute 1-based DMX channel for `attribute`, within this universe.
    pub fn channel_for(&self, attribute: &Attribute) -> Option<u16> {
        self.profile
            .offset(attribute)
            .map(|off| self.address + off - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch() -> FixturePatch {
        FixturePatch {
            id: FixtureId(1),
            name: "wash-left".into(),
            universe: UniverseId::new(1).unwrap(),
            address: 10,
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
    fn test_universe_id_bounds() {
        assert!(UniverseId::new(0).is_err());
        assert!(UniverseId::new(1).is_ok());
        assert!(UniverseId::new(32767).is_ok());
        assert!(UniverseId::new(32768).is_err());
    }

    #[test]
    fn test_channel_for_maps_through_address() {
        let f = Fixture::new(patch());
        assert_eq!(f.channel_for(&Attribute::Red), Some(10));
        assert_eq!(f.channel_for(&Attribute::Blue), Some(12));
        assert_eq!(f.channel_for(&Attribute::Pan), None);
    }

    #[test]
    fn test_state_get_set_roundtrip() {
        let mut s = FixtureState::default();
        s.set(&Attribute::Red, 200);
        s.set(&Attribute::Aux("fog".into()), 33);
        assert_eq!(s.get(&Attribute::Red), 200);
        assert_eq!(s.get(&Attribute::Aux("fog".into())), 33);
        assert_eq!(s.get(&Attribute::Blue), 0);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut f = Fixture::new(patch());
        assert!(f.is_dirty());
        f.mark_clean();
        assert!(!f.is_dirty());
        f.set(&Attribute::Green, 1);
        assert!(f.is_dirty());
    }

    #[test]
    fn test_reset_keeps_pixel_layout() {
        let mut s = FixtureState {
            pixels: vec![[9, 9, 9]; 4],
            intensity: 100,
            ..Default::default()
        };
        s.reset();
        assert_eq!(s.intensity, 0);
        assert_eq!(s.pixels, vec![[0, 0, 0]; 4]);
    }
}
