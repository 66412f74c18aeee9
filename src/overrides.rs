//! Live overrides composited above cue and effect output.
//!
//! Overrides are the MIDI/programmer hook: a note-on latches a strobe, a pad
//! flashes a wash for one tick. They write after the scheduler and effects,
//! so they always win at the channel level; among overrides, the most
//! recently applied wins within the tick.

use crate::dmx::DmxCompositor;
use crate::fixture::{Attribute, FixtureId, FixtureModel};

/// How long an override holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    /// Holds until explicitly released ("hold strobe while note-on").
    Latched,
    /// Applies for exactly one tick, then clears ("flash").
    Momentary,
}

#[derive(Debug, Clone)]
struct OverrideEntry {
    kind: OverrideKind,
    fixture: FixtureId,
    attribute: Attribute,
    value: u8,
    /// Application order; later entries overwrite earlier on conflict.
    seq: u64,
}

/// A value an override placed on the wire this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOverride {
    /// Target fixture.
    pub fixture: FixtureId,
    /// Target attribute.
    pub attribute: Attribute,
    /// Byte written.
    pub value: u8,
}

/// The transient override store.
#[derive(Debug, Default)]
pub struct OverrideLayer {
    entries: Vec<OverrideEntry>,
    next_seq: u64,
}

impl OverrideLayer {
    /// Creates an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or refreshes an override. Re-applying an existing
    /// `(fixture, attribute)` moves it to the front of the precedence order.
    pub fn set(&mut self, kind: OverrideKind, fixture: FixtureId, attribute: Attribute, value: u8) {
        self.entries
            .retain(|e| !(e.fixture == fixture && e.attribute == attribute));
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(OverrideEntry {
            kind,
            fixture,
            attribute,
            value,
            seq,
        });
    }

    /// Releases a latched override; the channel falls back to the cue/effect
    /// composite on the next tick.
    pub fn release(&mut self, fixture: FixtureId, attribute: &Attribute) {
        self.entries
            .retain(|e| !(e.fixture == fixture && &e.attribute == attribute));
    }

    /// Drops every override.
    pub fn release_all(&mut self) {
        self.entries.clear();
    }

    /// Number of live overrides.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no override is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes every override directly into the frame, oldest first so the
    /// most recent application wins, then clears momentary entries.
    ///
    /// Returns what was applied (for `override-applied` events) and the
    /// references that failed to resolve.
    pub fn apply(
        &mut self,
        model: &FixtureModel,
        compositor: &mut DmxCompositor,
    ) -> (Vec<AppliedOverride>, Vec<String>) {
        let mut applied = Vec::new();
        let mut unresolved = Vec::new();

        self.entries.sort_by_key(|e| e.seq);
        for entry in &self.entries {
            match model.resolve_channel(entry.fixture, &entry.attribute) {
                Ok((universe, channel)) => {
                    if compositor.write(universe, channel, entry.value).is_ok() {
                        applied.push(AppliedOverride {
                            fixture: entry.fixture,
                            attribute: entry.attribute.clone(),
                            value: entry.value,
                        });
                    }
                }
                Err(err) => unresolved.push(format!("override: {err}")),
            }
        }
        self.entries.retain(|e| e.kind == OverrideKind::Latched);

        (applied, unresolved)
    }
}
