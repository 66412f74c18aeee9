//! Oscillator effects and their distribution across fixture groups.
//!
//! An [`EffectInstance`] is a deterministic function of time: a waveform
//! sampled at a cycle phase derived either from wall-clock (Hz rates) or from
//! the metronome snapshot (beat-locked rates), scaled into a `[min, max]`
//! byte window. Distribution spreads one oscillator across a group: all
//! members together, a stepping window, or a traveling wave.
//!
//! Waveform shapes and distribution modes are closed sets: tagged variants,
//! not pluggable function pointers.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::fixture::{Attribute, FixtureId, FixtureModel, GroupId};
use crate::rhythm::Snapshot;

/// Oscillator shape. All shapes map a cycle phase in `[0, 1)` to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Waveform {
    /// `0.5 + 0.5·sin(2πφ)`.
    Sine,
    /// Rises linearly from 0 to 1 over the cycle.
    SawtoothUp,
    /// Falls linearly from 1 to 0 over the cycle.
    SawtoothDown,
    /// 1 for the first half of the cycle, 0 for the second.
    Square,
    /// Rises to 1 at mid-cycle, then falls back.
    Triangle,
}

impl Waveform {
    /// Samples the shape at `phase` (wrapped into `[0, 1)`).
    pub fn sample(self, phase: f64) -> f64 {
        let phase = frac(phase);
        match self {
            Waveform::SawtoothUp => phase,
            Waveform::SawtoothDown => 1.0 - phase,
            Waveform::Triangle => 1.0 - (2.0 * phase - 1.0).abs(),
            Waveform::Sine => 0.5 + 0.5 * (phase * std::f64::consts::TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Oscillation rate: wall-clock or locked to the beat grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectRate {
    /// Cycles per second.
    Hertz(f64),
    /// Beats per full cycle; phase follows the metronome, so tempo changes
    /// speed the effect up or down with the music.
    BeatsPerCycle(f64),
}

/// How one oscillator spreads across the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionMode {
    /// Every member receives the same value this tick.
    All,
    /// Members are partitioned into windows of `n`; only the active window
    /// receives the value, and the window advances once per step interval.
    Step(u16),
    /// Member `i` of `N` samples the oscillator at phase offset
    /// `i · (1/N) · n`, producing a traveling wave.
    Wave(u16),
}

/// Whether distribution slots are whole fixtures or individual pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionScope {
    /// One value per fixture (pixel bars act as a single lamp).
    #[default]
    Bar,
    /// One value per LED pixel across the group's pixel bars.
    Individual,
}

/// Cadence of the step window advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepInterval {
    /// Advance once per beat.
    Beat,
    /// Advance on a fixed wall-clock period.
    Millis(u64),
}

/// A running (or paused) oscillator bound to a group and attribute set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectInstance {
    /// Name, unique within its cue; tracking replaces effects by name.
    pub name: String,
    /// Target group.
    pub group: GroupId,
    /// Attributes driven by the oscillator.
    pub attributes: Vec<Attribute>,
    /// Oscillator shape.
    pub waveform: Waveform,
    /// Oscillation rate.
    pub rate: EffectRate,
    /// Output depth, `0.0..=1.0`. Zero produces no writes at all.
    pub amplitude: f64,
    /// Phase offset added to every sample, in cycles.
    pub offset: f64,
    /// Low end of the output window.
    pub min: u8,
    /// High end of the output window.
    pub max: u8,
    /// Distribution mode across the group.
    pub mode: DistributionMode,
    /// Fixture-level or pixel-level slots.
    pub scope: DistributionScope,
    /// Step window cadence (only meaningful for [`DistributionMode::Step`]).
    pub step_interval: StepInterval,

    #[serde(skip)]
    started_at: Option<Instant>,
    #[serde(skip)]
    paused_at: Option<Instant>,
}

impl EffectInstance {
    /// Creates a sine effect with full depth over the whole byte range;
    /// callers adjust fields as needed.
    pub fn new(name: impl Into<String>, group: GroupId, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            group,
            attributes,
            waveform: Waveform::Sine,
            rate: EffectRate::Hertz(1.0),
            amplitude: 1.0,
            offset: 0.0,
            min: 0,
            max: 255,
            mode: DistributionMode::All,
            scope: DistributionScope::Bar,
            step_interval: StepInterval::Beat,
            started_at: None,
            paused_at: None,
        }
    }

    /// Marks the effect running from `at`.
    pub fn start(&mut self, at: Instant) {
        self.started_at = Some(at);
        self.paused_at = None;
    }

    /// Freezes wall-clock phase at `at`.
    pub fn pause(&mut self, at: Instant) {
        if self.started_at.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(at);
        }
    }

    /// Resumes from a pause, keeping the frozen phase continuous.
    pub fn resume(&mut self, at: Instant) {
        if let (Some(started), Some(paused)) = (self.started_at, self.paused_at) {
            self.started_at = Some(started + at.saturating_duration_since(paused));
            self.paused_at = None;
        }
    }

    /// `true` once started and not paused.
    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.paused_at.is_none()
    }

    /// `true` once started (running or paused).
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    fn elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => self
                .paused_at
                .unwrap_or(now)
                .saturating_duration_since(started),
            None => Duration::ZERO,
        }
    }

    /// Cycle phase at `now`, before any per-slot distribution offset.
    pub fn cycle_phase(&self, now: Instant, snapshot: &Snapshot) -> f64 {
        match self.rate {
            EffectRate::Hertz(hz) => frac(self.elapsed(now).as_secs_f64() * hz + self.offset),
            EffectRate::BeatsPerCycle(beats) => {
                if beats <= 0.0 {
                    return frac(self.offset);
                }
                frac(snapshot.beat_position() / beats + self.offset)
            }
        }
    }

    /// Output byte for a slot at `phase_offset`, or `None` when the effect
    /// writes nothing (zero amplitude, not started).
    pub fn value_at(&self, phase_offset: f64, now: Instant, snapshot: &Snapshot) -> Option<u8> {
        if self.amplitude == 0.0 || self.started_at.is_none() {
            return None;
        }
        let raw = self.waveform.sample(self.cycle_phase(now, snapshot) + phase_offset);
        let depth = self.amplitude.clamp(0.0, 1.0);
        let span = self.max.saturating_sub(self.min) as f64;
        let value = self.min as f64 + raw * depth * span;
        Some(value.round().clamp(0.0, 255.0) as u8)
    }

    /// Index of the active step window at `now`, given `windows` windows.
    fn active_window(&self, windows: u64, now: Instant, snapshot: &Snapshot) -> u64 {
        if windows == 0 {
            return 0;
        }
        let steps = match self.step_interval {
            StepInterval::Beat => snapshot.beat_position().floor() as u64,
            StepInterval::Millis(ms) => {
                if ms == 0 {
                    0
                } else {
                    self.elapsed(now).as_millis() as u64 / ms
                }
            }
        };
        steps % windows
    }
}

/// One pending write produced by sampling an effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectWrite {
    /// A whole-fixture attribute value.
    Attribute {
        fixture: FixtureId,
        attribute: Attribute,
        value: u8,
    },
    /// A single RGB component of one pixel of a pixel bar.
    Pixel {
        fixture: FixtureId,
        pixel: u16,
        component: usize,
        value: u8,
    },
}

/// A reference that failed to resolve while sampling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnresolvedTarget {
    /// Effect that referenced it.
    pub effect: String,
    /// What failed to resolve.
    pub detail: String,
}

/// Samples active effects against the current patch.
///
/// The engine keeps a memo of already-reported unresolved references so each
/// one warns once per run rather than 44 times a second.
#[derive(Debug, Default)]
pub struct EffectEngine {
    reported: HashSet<UnresolvedTarget>,
}

/// A distribution slot: a fixture, or one pixel of a pixel bar.
enum Slot {
    Fixture(FixtureId),
    Pixel(FixtureId, u16),
}

impl EffectEngine {
    /// Creates an engine with an empty warning memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the warning memo (show reload).
    pub fn reset(&mut self) {
        self.reported.clear();
    }

    /// Samples `effects` and applies their values to `model`.
    ///
    /// Returns the unresolved references first seen this tick; the caller
    /// surfaces them as warnings. Unresolvable targets are skipped while the
    /// effect keeps driving the rest of its group.
    pub fn sample_into<'a, I>(
        &mut self,
        model: &mut FixtureModel,
        effects: I,
        snapshot: &Snapshot,
        now: Instant,
    ) -> Vec<UnresolvedTarget>
    where
        I: IntoIterator<Item = &'a EffectInstance>,
    {
        let mut fresh = Vec::new();
        for effect in effects {
            let (writes, unresolved) = self.plan(model, effect, snapshot, now);
            for warning in unresolved {
                if self.reported.insert(warning.clone()) {
                    fresh.push(warning);
                }
            }
            for write in writes {
                match write {
                    EffectWrite::Attribute {
                        fixture,
                        attribute,
                        value,
                    } => {
                        let _ = model.set_state(fixture, &attribute, value);
                    }
                    EffectWrite::Pixel {
                        fixture,
                        pixel,
                        component,
                        value,
                    } => {
                        let _ = model.set_pixel(fixture, pixel, component, value);
                    }
                }
            }
        }
        fresh
    }

    /// Computes the writes one effect would perform this tick.
    pub fn plan(
        &self,
        model: &FixtureModel,
        effect: &EffectInstance,
        snapshot: &Snapshot,
        now: Instant,
    ) -> (Vec<EffectWrite>, Vec<UnresolvedTarget>) {
        let mut writes = Vec::new();
        let mut unresolved = Vec::new();

        if !effect.is_started() || effect.amplitude == 0.0 {
            return (writes, unresolved);
        }

        let Some(group) = model.group(effect.group) else {
            unresolved.push(UnresolvedTarget {
                effect: effect.name.clone(),
                detail: format!("group {} not defined", effect.group),
            });
            return (writes, unresolved);
        };

        let slots = self.collect_slots(model, effect, group, &mut unresolved);
        let n = slots.len();
        if n == 0 {
            return (writes, unresolved);
        }

        for (index, slot) in slots.iter().enumerate() {
            match effect.mode {
                DistributionMode::All => {
                    if let Some(value) = effect.value_at(0.0, now, snapshot) {
                        self.push_slot_writes(model, effect, slot, value, &mut writes, &mut unresolved);
                    }
                }
                DistributionMode::Wave(cycles) => {
                    let phase = index as f64 * (1.0 / n as f64) * cycles as f64;
                    if let Some(value) = effect.value_at(phase, now, snapshot) {
                        self.push_slot_writes(model, effect, slot, value, &mut writes, &mut unresolved);
                    }
                }
                DistributionMode::Step(size) => {
                    let size = size.max(1) as usize;
                    let windows = n.div_ceil(size) as u64;
                    let active = effect.active_window(windows, now, snapshot) as usize;
                    // Slots outside the active window keep their base value.
                    if index / size != active {
                        continue;
                    }
                    if let Some(value) = effect.value_at(0.0, now, snapshot) {
                        self.push_slot_writes(model, effect, slot, value, &mut writes, &mut unresolved);
                    }
                }
            }
        }

        (writes, unresolved)
    }

    fn collect_slots(
        &self,
        model: &FixtureModel,
        effect: &EffectInstance,
        group: &crate::fixture::FixtureGroup,
        unresolved: &mut Vec<UnresolvedTarget>,
    ) -> Vec<Slot> {
        let mut slots = Vec::new();
        for &id in &group.fixtures {
            let Some(fixture) = model.fixture(id) else {
                unresolved.push(UnresolvedTarget {
                    effect: effect.name.clone(),
                    detail: format!("fixture {id} not patched"),
                });
                continue;
            };
            match effect.scope {
                DistributionScope::Bar => slots.push(Slot::Fixture(id)),
                DistributionScope::Individual => {
                    if fixture.profile().is_pixel_bar() {
                        for pixel in 0..fixture.profile().pixel_count() {
                            slots.push(Slot::Pixel(id, pixel));
                        }
                    } else {
                        slots.push(Slot::Fixture(id));
                    }
                }
            }
        }
        slots
    }

    fn push_slot_writes(
        &self,
        model: &FixtureModel,
        effect: &EffectInstance,
        slot: &Slot,
        value: u8,
        writes: &mut Vec<EffectWrite>,
        unresolved: &mut Vec<UnresolvedTarget>,
    ) {
        match slot {
            Slot::Fixture(id) => {
                for attribute in &effect.attributes {
                    let mapped = model
                        .fixture(*id)
                        .map(|f| f.profile().offset(attribute).is_some())
                        .unwrap_or(false);
                    if !mapped {
                        unresolved.push(UnresolvedTarget {
                            effect: effect.name.clone(),
                            detail: format!("fixture {id} has no '{attribute}' channel"),
                        });
                        continue;
                    }
                    writes.push(EffectWrite::Attribute {
                        fixture: *id,
                        attribute: attribute.clone(),
                        value,
                    });
                }
            }
            Slot::Pixel(id, pixel) => {
                for attribute in &effect.attributes {
                    let component = match attribute {
                        Attribute::Red => Some(0),
                        Attribute::Green => Some(1),
                        Attribute::Blue => Some(2),
                        _ => None,
                    };
                    match component {
                        Some(component) => writes.push(EffectWrite::Pixel {
                            fixture: *id,
                            pixel: *pixel,
                            component,
                            value,
                        }),
                        // Non-RGB attributes fall back to the whole fixture.
                        None => writes.push(EffectWrite::Attribute {
                            fixture: *id,
                            attribute: attribute.clone(),
                            value,
                        }),
                    }
                }
            }
        }
    }
}

fn frac(x: f64) -> f64 {
    let f = x - x.floor();
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureGroup, FixturePatch, Profile, UniverseId};
    use crate::rhythm::Metronome;

    #[test]
    fn test_waveform_shapes() {
        assert!((Waveform::SawtoothUp.sample(0.25) - 0.25).abs() < 1e-12);
        assert!((Waveform::SawtoothDown.sample(0.25) - 0.75).abs() < 1e-12);
        assert!((Waveform::Triangle.sample(0.25) - 0.5).abs() < 1e-12);
        assert!((Waveform::Triangle.sample(0.5) - 1.0).abs() < 1e-12);
        assert!((Waveform::Sine.sample(0.0) - 0.5).abs() < 1e-12);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-12);
        assert!((Waveform::Square.sample(0.49) - 1.0).abs() < 1e-12);
        assert!((Waveform::Square.sample(0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_waveform_wraps_phase() {
        assert!((Waveform::SawtoothUp.sample(1.25) - 0.25).abs() < 1e-12);
        assert!((Waveform::SawtoothUp.sample(-0.75) - 0.25).abs() < 1e-12);
    }

    fn two_fixture_model() -> FixtureModel {
        let mut model = FixtureModel::new();
        for (id, address) in [(1u32, 1u16), (2, 2)] {
            model
                .patch(FixturePatch {
                    id: FixtureId(id),
                    name: format!("dim-{id}"),
                    universe: UniverseId::new(1).unwrap(),
                    address,
                    profile: Profile::new("dimmer", 1, [(Attribute::Intensity, 1)]).unwrap(),
                })
                .unwrap();
        }
        model.set_group(FixtureGroup::new(
            GroupId(1),
            "dimmers",
            vec![FixtureId(1), FixtureId(2)],
        ));
        model
    }

    fn snapshot_at(origin: Instant, at: Instant) -> Snapshot {
        Metronome::new(120.0, 4, 8, origin).unwrap().snapshot(at)
    }

    #[test]
    fn test_wave_distribution_phase_offsets() {
        let origin = Instant::now();
        let now = origin + Duration::from_millis(250);
        let snapshot = snapshot_at(origin, now);

        let model = two_fixture_model();
        let mut fx = EffectInstance::new("wave", GroupId(1), vec![Attribute::Intensity]);
        fx.waveform = Waveform::SawtoothUp;
        fx.rate = EffectRate::Hertz(1.0);
        fx.mode = DistributionMode::Wave(1);
        fx.start(origin);

        let engine = EffectEngine::new();
        let (writes, unresolved) = engine.plan(&model, &fx, &snapshot, now);
        assert!(unresolved.is_empty());
        assert_eq!(writes.len(), 2);

        // t = 0.25 s, 1 Hz sawtooth-up: slot 0 at phase 0.25, slot 1 offset 0.5.
        let values: Vec<u8> = writes
            .iter()
            .map(|w| match w {
                EffectWrite::Attribute { value, .. } => *value,
                EffectWrite::Pixel { value, .. } => *value,
            })
            .collect();
        assert!((values[0] as i16 - 64).abs() <= 1, "got {}", values[0]);
        assert!((values[1] as i16 - 192).abs() <= 1, "got {}", values[1]);
    }

    #[test]
    fn test_all_distribution_same_value() {
        let origin = Instant::now();
        let now = origin + Duration::from_millis(100);
        let snapshot = snapshot_at(origin, now);

        let model = two_fixture_model();
        let mut fx = EffectInstance::new("all", GroupId(1), vec![Attribute::Intensity]);
        fx.waveform = Waveform::SawtoothUp;
        fx.start(origin);

        let engine = EffectEngine::new();
        let (writes, _) = engine.plan(&model, &fx, &snapshot, now);
        assert_eq!(writes.len(), 2);
        if let (
            EffectWrite::Attribute { value: a, .. },
            EffectWrite::Attribute { value: b, .. },
        ) = (&writes[0], &writes[1])
        {
            assert_eq!(a, b);
        } else {
            panic!("expected attribute writes");
        }
    }

    #[test]
    fn test_zero_amplitude_writes_nothing() {
        let origin = Instant::now();
        let now = origin + Duration::from_millis(100);
        let snapshot = snapshot_at(origin, now);

        let model = two_fixture_model();
        let mut fx = EffectInstance::new("flat", GroupId(1), vec![Attribute::Intensity]);
        fx.amplitude = 0.0;
        fx.start(origin);

        let engine = EffectEngine::new();
        let (writes, _) = engine.plan(&model, &fx, &snapshot, now);
        assert!(writes.is_empty());
    }

    #[test]
    fn test_step_distribution_windows() {
        let origin = Instant::now();
        let model = two_fixture_model();

        let mut fx = EffectInstance::new("step", GroupId(1), vec![Attribute::Intensity]);
        fx.waveform = Waveform::Square;
        fx.mode = DistributionMode::Step(1);
        fx.step_interval = StepInterval::Millis(100);
        fx.start(origin);

        let engine = EffectEngine::new();

        // First window: only fixture 1.
        let now = origin + Duration::from_millis(10);
        let (writes, _) = engine.plan(&model, &fx, &snapshot_at(origin, now), now);
        assert_eq!(writes.len(), 1);
        assert!(matches!(
            writes[0],
            EffectWrite::Attribute { fixture: FixtureId(1), .. }
        ));

        // After one interval the window advances to fixture 2.
        let now = origin + Duration::from_millis(110);
        let (writes, _) = engine.plan(&model, &fx, &snapshot_at(origin, now), now);
        assert_eq!(writes.len(), 1);
        assert!(matches!(
            writes[0],
            EffectWrite::Attribute { fixture: FixtureId(2), .. }
        ));

        // And wraps back.
        let now = origin + Duration::from_millis(210);
        let (writes, _) = engine.plan(&model, &fx, &snapshot_at(origin, now), now);
        assert!(matches!(
            writes[0],
            EffectWrite::Attribute { fixture: FixtureId(1), .. }
        ));
    }

    #[test]
    fn test_beat_locked_rate_follows_snapshot() {
        let origin = Instant::now();
        // 120 BPM: one beat = 500 ms. Two beats per cycle -> 1000 ms cycle.
        let now = origin + Duration::from_millis(500);
        let snapshot = snapshot_at(origin, now);

        let mut fx = EffectInstance::new("pulse", GroupId(1), vec![Attribute::Intensity]);
        fx.waveform = Waveform::SawtoothUp;
        fx.rate = EffectRate::BeatsPerCycle(2.0);
        fx.start(origin);

        // One beat in = half a cycle.
        let phase = fx.cycle_phase(now, &snapshot);
        assert!((phase - 0.5).abs() < 1e-9, "phase {phase}");
    }

    #[test]
    fn test_unresolved_group_reported_once() {
        let origin = Instant::now();
        let now = origin + Duration::from_millis(10);
        let snapshot = snapshot_at(origin, now);

        let mut model = two_fixture_model();
        let mut fx = EffectInstance::new("ghost", GroupId(99), vec![Attribute::Intensity]);
        fx.start(origin);

        let mut engine = EffectEngine::new();
        let first = engine.sample_into(&mut model, std::slice::from_ref(&fx), &snapshot, now);
        assert_eq!(first.len(), 1);
        let second = engine.sample_into(&mut model, std::slice::from_ref(&fx), &snapshot, now);
        assert!(second.is_empty());
    }

    #[test]
    fn test_unmapped_attribute_skipped_with_warning() {
        let origin = Instant::now();
        let now = origin + Duration::from_millis(10);
        let snapshot = snapshot_at(origin, now);

        let model = two_fixture_model();
        let mut fx = EffectInstance::new("tilt", GroupId(1), vec![Attribute::Tilt]);
        fx.start(origin);

        let engine = EffectEngine::new();
        let (writes, unresolved) = engine.plan(&model, &fx, &snapshot, now);
        assert!(writes.is_empty());
        assert_eq!(unresolved.len(), 2); // both fixtures lack tilt
    }

    #[test]
    fn test_individual_scope_expands_pixels() {
        let origin = Instant::now();
        let now = origin + Duration::from_millis(10);
        let snapshot = snapshot_at(origin, now);

        let mut model = FixtureModel::new();
        model
            .patch(FixturePatch {
                id: FixtureId(1),
                name: "bar".into(),
                universe: UniverseId::new(2).unwrap(),
                address: 1,
                profile: Profile::new("bar-4", 12, [])
                    .unwrap()
                    .with_pixels(4, 1)
                    .unwrap(),
            })
            .unwrap();
        model.set_group(FixtureGroup::new(GroupId(1), "bars", vec![FixtureId(1)]));

        let mut fx = EffectInstance::new("chase", GroupId(1), vec![Attribute::Red]);
        fx.scope = DistributionScope::Individual;
        fx.mode = DistributionMode::Wave(1);
        fx.start(origin);

        let engine = EffectEngine::new();
        let (writes, unresolved) = engine.plan(&model, &fx, &snapshot, now);
        assert!(unresolved.is_empty());
        assert_eq!(writes.len(), 4); // one red write per pixel
        assert!(writes
            .iter()
            .all(|w| matches!(w, EffectWrite::Pixel { component: 0, .. })));
    }

    #[test]
    fn test_pause_freezes_wall_clock_phase() {
        let origin = Instant::now();
        let snapshot = snapshot_at(origin, origin);

        let mut fx = EffectInstance::new("hold", GroupId(1), vec![Attribute::Intensity]);
        fx.rate = EffectRate::Hertz(1.0);
        fx.start(origin);
        fx.pause(origin + Duration::from_millis(250));

        let later = origin + Duration::from_secs(10);
        let phase = fx.cycle_phase(later, &snapshot);
        assert!((phase - 0.25).abs() < 1e-9);

        fx.resume(later);
        let phase = fx.cycle_phase(later, &snapshot);
        assert!((phase - 0.25).abs() < 1e-9);
    }
}
