//! Per-universe DMX frame composition.
//!
//! The compositor holds the 512-byte frame for every universe that will be
//! emitted this tick. Within a frame, the later of two writes to the same
//! channel wins; that ordering is the vehicle for override layering.

use std::collections::BTreeMap;

use crate::fixture::{Fixture, UniverseId};
use crate::ConsoleError;

/// Number of channels in a DMX universe.
pub const UNIVERSE_SIZE: usize = 512;

/// How [`DmxCompositor::begin_frame`] seeds the new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// Carry the previous frame forward; unmentioned channels keep their
    /// last value (tracking).
    Track,
    /// Zero-fill every universe (post-blackout, blocking reset).
    Zero,
}

/// Builds the outgoing DMX frames, one 512-byte buffer per universe.
#[derive(Debug, Default)]
pub struct DmxCompositor {
    frames: BTreeMap<UniverseId, [u8; UNIVERSE_SIZE]>,
}

impl DmxCompositor {
    /// Creates an empty compositor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new frame.
    ///
    /// In [`FrameMode::Track`] the previous frame is kept as the base; in
    /// [`FrameMode::Zero`] every known universe is cleared.
    pub fn begin_frame(&mut self, mode: FrameMode) {
        if mode == FrameMode::Zero {
            for frame in self.frames.values_mut() {
                frame.fill(0);
            }
        }
    }

    /// Writes one channel. `channel` is 1-based.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::ChannelOutOfRange`] for channels outside `1..=512`;
    /// the frame is untouched.
    pub fn write(
        &mut self,
        universe: UniverseId,
        channel: u16,
        value: u8,
    ) -> Result<(), ConsoleError> {
        if channel == 0 || channel as usize > UNIVERSE_SIZE {
            return Err(ConsoleError::ChannelOutOfRange(channel));
        }
        let frame = self
            .frames
            .entry(universe)
            .or_insert([0; UNIVERSE_SIZE]);
        frame[channel as usize - 1] = value;
        Ok(())
    }

    /// Walks the fixture's profile and writes every mapped attribute of its
    /// current state, plus per-pixel RGB for pixel bars.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::ChannelOutOfRange`] if the profile maps outside the
    /// universe (rejected at patch time; kept as a hard stop here).
    pub fn write_fixture(&mut self, fixture: &Fixture) -> Result<(), ConsoleError> {
        let universe = fixture.universe();
        let state = fixture.state();
        for (attribute, _) in fixture.profile().mapped() {
            // channel_for is Some for every mapped attribute
            if let Some(channel) = fixture.channel_for(attribute) {
                self.write(universe, channel, state.get(attribute))?;
            }
        }
        for (index, rgb) in state.pixels.iter().enumerate() {
            if let Some((r, g, b)) = fixture.profile().pixel_rgb_offsets(index as u16) {
                let base = fixture.address() - 1;
                self.write(universe, base + r, rgb[0])?;
                self.write(universe, base + g, rgb[1])?;
                self.write(universe, base + b, rgb[2])?;
            }
        }
        Ok(())
    }

    /// Zeroes a fixture's entire footprint.
    ///
    /// Used when a fixture is unpatched: with tracking carrying frames
    /// forward, its last-written bytes would otherwise stay on the wire with
    /// no remaining source for them.
    pub fn clear_fixture(&mut self, fixture: &Fixture) {
        let Some(frame) = self.frames.get_mut(&fixture.universe()) else {
            return;
        };
        let start = fixture.address() as usize - 1;
        let end = (start + fixture.profile().channel_count() as usize).min(UNIVERSE_SIZE);
        frame[start..end].fill(0);
    }

    /// Reads back a channel of the frame under construction (0 if the
    /// universe has never been written).
    pub fn channel(&self, universe: UniverseId, channel: u16) -> u8 {
        if channel == 0 || channel as usize > UNIVERSE_SIZE {
            return 0;
        }
        self.frames
            .get(&universe)
            .map(|f| f[channel as usize - 1])
            .unwrap_or(0)
    }

    /// Produces an immutable copy of every universe for the router.
    pub fn snapshot_universes(&self) -> BTreeMap<UniverseId, [u8; UNIVERSE_SIZE]> {
        self.frames.clone()
    }

    /// Universes the compositor has ever written this run.
    pub fn universes(&self) -> impl Iterator<Item = UniverseId> + '_ {
        self.frames.keys().copied()
    }

    /// Zeroes every known universe (shutdown blackout frame).
    pub fn blackout(&mut self) {
        for frame in self.frames.values_mut() {
            frame.fill(0);
        }
    }

    /// Ensures a universe exists (so blackout and routing cover it) without
    /// writing any channel.
    pub fn touch(&mut self, universe: UniverseId) {
        self.frames.entry(universe).or_insert([0; UNIVERSE_SIZE]);
    }

    /// Drops all frames (show clear).
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{Attribute, FixtureId, FixtureModel, FixturePatch, Profile};

    fn u(n: u16) -> UniverseId {
        UniverseId::new(n).unwrap()
    }

    #[test]
    fn test_write_sets_byte() {
        let mut c = DmxCompositor::new();
        c.write(u(1), 1, 255).unwrap();
        c.write(u(1), 512, 7).unwrap();
        assert_eq!(c.channel(u(1), 1), 255);
        assert_eq!(c.channel(u(1), 512), 7);
        assert_eq!(c.channel(u(1), 2), 0);
    }

    #[test]
    fn test_out_of_range_fails_loudly() {
        let mut c = DmxCompositor::new();
        assert!(matches!(
            c.write(u(1), 0, 1),
            Err(ConsoleError::ChannelOutOfRange(0))
        ));
        assert!(matches!(
            c.write(u(1), 513, 1),
            Err(ConsoleError::ChannelOutOfRange(513))
        ));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut c = DmxCompositor::new();
        c.write(u(1), 10, 100).unwrap();
        c.write(u(1), 10, 200).unwrap();
        assert_eq!(c.channel(u(1), 10), 200);
    }

    #[test]
    fn test_track_mode_keeps_previous_frame() {
        let mut c = DmxCompositor::new();
        c.write(u(1), 5, 42).unwrap();
        c.begin_frame(FrameMode::Track);
        assert_eq!(c.channel(u(1), 5), 42);
        c.begin_frame(FrameMode::Zero);
        assert_eq!(c.channel(u(1), 5), 0);
    }

    #[test]
    fn test_write_fixture_walks_profile() {
        let mut model = FixtureModel::new();
        model
            .patch(FixturePatch {
                id: FixtureId(1),
                name: "par".into(),
                universe: u(1),
                address: 100,
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
            })
            .unwrap();
        model.set_state(FixtureId(1), &Attribute::Red, 255).unwrap();
        model.set_state(FixtureId(1), &Attribute::Blue, 9).unwrap();

        let mut c = DmxCompositor::new();
        c.write_fixture(model.fixture(FixtureId(1)).unwrap()).unwrap();
        assert_eq!(c.channel(u(1), 100), 255);
        assert_eq!(c.channel(u(1), 101), 0);
        assert_eq!(c.channel(u(1), 102), 9);
    }

    #[test]
    fn test_write_fixture_pixels() {
        let mut model = FixtureModel::new();
        model
            .patch(FixturePatch {
                id: FixtureId(2),
                name: "bar".into(),
                universe: u(2),
                address: 1,
                profile: Profile::new("bar-2", 6, [])
                    .unwrap()
                    .with_pixels(2, 1)
                    .unwrap(),
            })
            .unwrap();
        model.set_pixel(FixtureId(2), 1, 0, 200).unwrap();

        let mut c = DmxCompositor::new();
        c.write_fixture(model.fixture(FixtureId(2)).unwrap()).unwrap();
        assert_eq!(c.channel(u(2), 4), 200); // pixel 1 red
        assert_eq!(c.channel(u(2), 1), 0); // pixel 0 red
    }

    #[test]
    fn test_clear_fixture_zeroes_footprint() {
        let mut model = FixtureModel::new();
        model
            .patch(FixturePatch {
                id: FixtureId(1),
                name: "par".into(),
                universe: u(1),
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
            })
            .unwrap();
        model.set_state(FixtureId(1), &Attribute::Red, 255).unwrap();

        let mut c = DmxCompositor::new();
        c.write(u(1), 9, 77).unwrap(); // a neighbour, untouched by the clear
        c.write_fixture(model.fixture(FixtureId(1)).unwrap()).unwrap();
        assert_eq!(c.channel(u(1), 10), 255);

        let fixture = model.unpatch(FixtureId(1)).unwrap();
        c.clear_fixture(&fixture);
        assert_eq!(c.channel(u(1), 10), 0);
        assert_eq!(c.channel(u(1), 11), 0);
        assert_eq!(c.channel(u(1), 12), 0);
        assert_eq!(c.channel(u(1), 9), 77);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut c = DmxCompositor::new();
        c.write(u(3), 1, 11).unwrap();
        let snap = c.snapshot_universes();
        c.write(u(3), 1, 99).unwrap();
        assert_eq!(snap.get(&u(3)).unwrap()[0], 11);
    }

    #[test]
    fn test_blackout_zeroes_all() {
        let mut c = DmxCompositor::new();
        c.write(u(1), 1, 255).unwrap();
        c.write(u(2), 2, 255).unwrap();
        c.blackout();
        assert_eq!(c.channel(u(1), 1), 0);
        assert_eq!(c.channel(u(2), 2), 0);
        // Universes remain known so the blackout frame still routes.
        assert_eq!(c.universes().count(), 2);
    }
}
