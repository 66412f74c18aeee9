//! The cue scheduler: cue-list state machines rendered into attribute writes.
//!
//! Each tick the scheduler advances every list's transport (wait, fade,
//! follow, timecode anchors), applies tracked values from earlier cues, and
//! interpolates the active cue's targets from the composite captured at its
//! fade start toward its end values. Fades are pure functions of the tick
//! instant and cue state; nothing here owns a clock.
//!
//! Lists composite in ascending priority so higher-priority lists write last
//! and win at the channel level.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use super::cue::{
    Cue, CueId, CueList, CueListId, CueState, Preset, PresetId, StaticValue, TimecodeSelection,
};
use super::timecode::TimecodePosition;
use crate::effect::EffectInstance;
use crate::fixture::{Attribute, FixtureId, FixtureModel};
use crate::ConsoleError;

/// Linear easing; the single fade law the console currently ships.
fn ease(p: f64) -> f64 {
    p
}

/// Interpolates one byte along the fade, snapping discrete channels at the
/// halfway point.
fn fade_value(attribute: &Attribute, prev: u8, target: u8, p: f64) -> u8 {
    if attribute.is_discrete() {
        return if p >= 0.5 { target } else { prev };
    }
    (prev as f64 + (target as f64 - prev as f64) * ease(p)).round() as u8
}

/// Notifications produced while advancing the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A cue received go.
    CueActivated {
        /// The owning list.
        list: CueListId,
        /// The activated cue.
        cue: CueId,
    },
    /// A cue's fade completed and its values merged into tracking.
    CueCompleted {
        /// The owning list.
        list: CueListId,
        /// The completed cue.
        cue: CueId,
    },
    /// A reference failed to resolve; playback continued without it.
    Unresolved {
        /// Human-readable description, stable per fault for deduplication.
        detail: String,
    },
    /// Start the list's associated audio file.
    AudioPlay {
        /// File to play.
        file: PathBuf,
    },
    /// Stop list audio.
    AudioStop,
}

/// Accumulated values and effects that persist across cues.
///
/// A tracking console carries every value forward until a later cue changes
/// it or a blocking cue wipes the slate.
#[derive(Debug, Default)]
struct TrackingState {
    /// Key order is first-write order; later cues replace in place.
    values: Vec<StaticValue>,
    effects: BTreeMap<String, EffectInstance>,
}

impl TrackingState {
    fn merge_value(&mut self, value: StaticValue) {
        if let Some(existing) = self
            .values
            .iter_mut()
            .find(|v| v.fixture == value.fixture && v.attribute == value.attribute)
        {
            existing.value = value.value;
        } else {
            self.values.push(value);
        }
    }
}

/// A cue that has received go.
#[derive(Debug)]
struct CueRun {
    index: usize,
    state: CueState,
    /// `go_at + wait`; fade progress is measured from here.
    fade_start: Instant,
    /// Composite captured at fade start, per target key.
    base: HashMap<(FixtureId, Attribute), u8>,
    /// The cue's effects with live run state and their full amplitudes;
    /// amplitude ramps in over the fade.
    effects: Vec<(EffectInstance, f64)>,
}

/// Per-list playback state.
#[derive(Debug)]
struct ListPlayback {
    list: CueList,
    run: Option<CueRun>,
    last_index: Option<usize>,
    tracking: TrackingState,
    /// Re-armable timecode anchors, one flag per cue.
    armed: Vec<bool>,
    follow: Option<(Instant, usize)>,
    paused_at: Option<Instant>,
    audio_started: bool,
    last_timecode: Option<TimecodePosition>,
    /// Cue ids whose fades completed this session, oldest first.
    history: Vec<CueId>,
}

impl ListPlayback {
    fn new(list: CueList) -> Self {
        let armed = list.cues.iter().map(|c| c.timecode.is_some()).collect();
        Self {
            list,
            run: None,
            last_index: None,
            tracking: TrackingState::default(),
            armed,
            follow: None,
            paused_at: None,
            audio_started: false,
            last_timecode: None,
            history: Vec::new(),
        }
    }

    fn next_index(&self) -> usize {
        match (&self.run, self.last_index) {
            (Some(run), _) => run.index + 1,
            (None, Some(last)) => last + 1,
            (None, None) => 0,
        }
    }
}

/// Transport and fade engine for every cue list in the show.
#[derive(Debug, Default)]
pub struct CueScheduler {
    lists: Vec<ListPlayback>,
    presets: BTreeMap<PresetId, Preset>,
    warned: HashSet<String>,
    events: Vec<SchedulerEvent>,
}

impl CueScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the show content. Transport state is reset.
    pub fn load(&mut self, lists: Vec<CueList>, presets: Vec<Preset>) {
        self.lists = lists.into_iter().map(ListPlayback::new).collect();
        // Stable sort: priority ascending, declaration order within equal
        // priority. Higher priority renders later and wins.
        self.lists.sort_by_key(|p| p.list.priority);
        self.presets = presets.into_iter().map(|p| (p.id, p)).collect();
        self.warned.clear();
        self.events.clear();
    }

    /// Registers or replaces a preset; cues referencing it pick up the new
    /// values on their next go.
    pub fn set_preset(&mut self, preset: Preset) {
        self.presets.insert(preset.id, preset);
    }

    /// Drops all lists and presets.
    pub fn clear(&mut self) {
        self.lists.clear();
        self.presets.clear();
        self.warned.clear();
        self.events.clear();
    }

    /// Number of lists with a cue mid-wait or mid-fade.
    pub fn active_cue_count(&self) -> usize {
        self.lists
            .iter()
            .filter(|p| {
                p.run
                    .as_ref()
                    .is_some_and(|r| !matches!(r.state, CueState::Done | CueState::Cancelled))
            })
            .count()
    }

    /// Transport status per list: `(list, current cue, state, progress)`.
    pub fn transport(&self, now: Instant) -> Vec<(CueListId, Option<(CueId, CueState, f32)>)> {
        self.lists
            .iter()
            .map(|p| {
                let current = p.run.as_ref().and_then(|run| {
                    let cue = p.list.cues.get(run.index)?;
                    let eff_now = p.paused_at.unwrap_or(now);
                    let progress = fade_progress(cue, run, eff_now) as f32;
                    Some((cue.id, run.state, progress))
                });
                (p.list.id, current)
            })
            .collect()
    }

    /// Cue ids completed this session for `list`, oldest first.
    pub fn history(&self, list: CueListId) -> Option<&[CueId]> {
        self.lists
            .iter()
            .find(|p| p.list.id == list)
            .map(|p| p.history.as_slice())
    }

    /// Fires go on the next cue of `list`.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::UnknownCueList`] for an unloaded list,
    /// [`ConsoleError::UnknownCue`] past the end of the list.
    pub fn go(&mut self, list: CueListId, now: Instant) -> Result<(), ConsoleError> {
        let slot = self.find(list)?;
        let index = self.lists[slot].next_index();
        self.go_index(slot, index, now)
    }

    /// Fires go on a specific cue.
    ///
    /// # Errors
    ///
    /// Same as [`CueScheduler::go`].
    pub fn go_cue(&mut self, list: CueListId, cue: CueId, now: Instant) -> Result<(), ConsoleError> {
        let slot = self.find(list)?;
        let index = self.lists[slot]
            .list
            .index_of(cue)
            .ok_or(ConsoleError::UnknownCue {
                list: list.0,
                cue: cue.0,
            })?;
        self.go_index(slot, index, now)
    }

    /// Fires go on the cue before the current one.
    ///
    /// # Errors
    ///
    /// Same as [`CueScheduler::go`]; also fails at the top of the list.
    pub fn go_previous(&mut self, list: CueListId, now: Instant) -> Result<(), ConsoleError> {
        let slot = self.find(list)?;
        let current = self.lists[slot]
            .run
            .as_ref()
            .map(|r| r.index)
            .or(self.lists[slot].last_index)
            .ok_or(ConsoleError::UnknownCue { list: list.0, cue: 0 })?;
        if current == 0 {
            return Err(ConsoleError::UnknownCue { list: list.0, cue: 0 });
        }
        self.go_index(slot, current - 1, now)
    }

    /// Halts a list: the pending fade and follow are cancelled, its effects
    /// stop, and the last composite stays on stage.
    ///
    /// # Errors
    ///
    /// [`ConsoleError::UnknownCueList`] for an unloaded list.
    pub fn stop(&mut self, list: CueListId, now: Instant) -> Result<(), ConsoleError> {
        let slot = self.find(list)?;
        self.displace_run(slot, now);
        let playback = &mut self.lists[slot];
        playback.follow = None;
        playback.tracking.effects.clear();
        let stop_audio = playback.audio_started;
        playback.audio_started = false;
        if stop_audio {
            self.events.push(SchedulerEvent::AudioStop);
        }
        Ok(())
    }

    /// Freezes every list's transport and effects.
    pub fn pause(&mut self, now: Instant) {
        for playback in &mut self.lists {
            if playback.paused_at.is_none() {
                playback.paused_at = Some(now);
                for (effect, _) in playback.run.iter_mut().flat_map(|r| r.effects.iter_mut()) {
                    effect.pause(now);
                }
                for effect in playback.tracking.effects.values_mut() {
                    effect.pause(now);
                }
            }
        }
    }

    /// Resumes from [`CueScheduler::pause`], shifting every deadline by the
    /// pause duration so fades continue where they froze.
    pub fn resume(&mut self, now: Instant) {
        for playback in &mut self.lists {
            let Some(paused_at) = playback.paused_at.take() else {
                continue;
            };
            let gap = now.saturating_duration_since(paused_at);
            if let Some(run) = &mut playback.run {
                run.fade_start += gap;
            }
            if let Some((deadline, _)) = &mut playback.follow {
                *deadline += gap;
            }
            for (effect, _) in playback.run.iter_mut().flat_map(|r| r.effects.iter_mut()) {
                effect.resume(now);
            }
            for effect in playback.tracking.effects.values_mut() {
                effect.resume(now);
            }
        }
    }

    /// Reacts to a timecode seek: anchors ahead of the playhead re-arm, and
    /// an active cue whose anchor is now ahead is cleared.
    pub fn seek(&mut self, position: TimecodePosition, now: Instant) {
        for slot in 0..self.lists.len() {
            if self.lists[slot].list.timecode_source != TimecodeSelection::Console {
                continue;
            }
            let displace = {
                let playback = &self.lists[slot];
                playback.run.as_ref().is_some_and(|run| {
                    playback.list.cues[run.index]
                        .timecode
                        .is_some_and(|anchor| anchor > position)
                })
            };
            if displace {
                self.displace_run(slot, now);
                self.lists[slot].last_index = None;
            }
            let playback = &mut self.lists[slot];
            for (index, cue) in playback.list.cues.iter().enumerate() {
                if let Some(anchor) = cue.timecode {
                    if anchor > position {
                        playback.armed[index] = true;
                    }
                }
            }
            playback.last_timecode = Some(position);
        }
    }

    /// Advances every list to `now` and writes the resulting values into
    /// `model`. `timecode` is the console playhead for this tick, if any.
    ///
    /// Returns the transport events and first-seen warnings for this tick.
    pub fn render(
        &mut self,
        model: &mut FixtureModel,
        now: Instant,
        timecode: Option<TimecodePosition>,
    ) -> Vec<SchedulerEvent> {
        for slot in 0..self.lists.len() {
            let mut warnings = Vec::new();
            if self.lists[slot].paused_at.is_some() {
                warnings.extend(apply_tracking(&self.lists[slot], model));
                self.warn_fresh(warnings);
                continue;
            }
            self.check_timecode(slot, timecode, now);
            self.check_follow(slot, now);

            let Self {
                lists,
                presets,
                events,
                ..
            } = self;
            let playback = &mut lists[slot];
            warnings.extend(apply_tracking(playback, model));
            warnings.extend(advance_list(playback, presets, model, now, events));
            self.warn_fresh(warnings);
        }
        std::mem::take(&mut self.events)
    }

    /// Effects currently contributing: tracked effects plus the active cue's,
    /// in list render order.
    pub fn active_effects(&self) -> Vec<&EffectInstance> {
        let mut out = Vec::new();
        for playback in &self.lists {
            out.extend(playback.tracking.effects.values());
            if let Some(run) = &playback.run {
                if !matches!(run.state, CueState::Done | CueState::Cancelled) {
                    out.extend(run.effects.iter().map(|(e, _)| e));
                }
            }
        }
        out
    }

    fn find(&self, list: CueListId) -> Result<usize, ConsoleError> {
        self.lists
            .iter()
            .position(|p| p.list.id == list)
            .ok_or(ConsoleError::UnknownCueList(list.0))
    }

    fn go_index(&mut self, slot: usize, index: usize, now: Instant) -> Result<(), ConsoleError> {
        if index >= self.lists[slot].list.cues.len() {
            return Err(ConsoleError::UnknownCue {
                list: self.lists[slot].list.id.0,
                cue: index as u32,
            });
        }

        self.displace_run(slot, now);

        let playback = &mut self.lists[slot];
        let list_id = playback.list.id;
        let cue = &playback.list.cues[index];
        let cue_id = cue.id;
        let wait = cue.wait;
        let follow = cue.follow;
        let has_next = index + 1 < playback.list.cues.len();
        let audio_file = (!playback.audio_started)
            .then(|| playback.list.audio_file.clone())
            .flatten();

        playback.armed[index] = false;
        playback.run = Some(CueRun {
            index,
            state: CueState::WaitPending,
            fade_start: now + wait,
            base: HashMap::new(),
            effects: Vec::new(),
        });
        playback.follow = match follow {
            Some(delay) if has_next => Some((now + delay, index + 1)),
            _ => None,
        };
        if audio_file.is_some() {
            playback.audio_started = true;
        }

        if let Some(file) = audio_file {
            self.events.push(SchedulerEvent::AudioPlay { file });
        }
        self.events.push(SchedulerEvent::CueActivated {
            list: list_id,
            cue: cue_id,
        });
        Ok(())
    }

    /// Freezes the current run mid-flight: its in-progress values become its
    /// end state in tracking, and its effects keep running as tracked
    /// effects. This is what makes go-next a crossfade.
    fn displace_run(&mut self, slot: usize, now: Instant) {
        let Self { lists, presets, .. } = self;
        let playback = &mut lists[slot];
        let Some(mut run) = playback.run.take() else {
            return;
        };
        playback.last_index = Some(run.index);

        if matches!(run.state, CueState::Active | CueState::Fading) {
            let cue = &playback.list.cues[run.index];
            let p = fade_progress(cue, &run, now);
            let mut warnings = Vec::new();
            for value in resolve_targets(cue, presets, &mut warnings) {
                let key = (value.fixture, value.attribute.clone());
                let prev = run.base.get(&key).copied().unwrap_or(0);
                let frozen = fade_value(&value.attribute, prev, value.value, p);
                playback
                    .tracking
                    .merge_value(StaticValue::new(value.fixture, value.attribute, frozen));
            }
        }
        for (mut effect, full) in run.effects.drain(..) {
            effect.amplitude = full;
            playback.tracking.effects.insert(effect.name.clone(), effect);
        }
    }

    fn check_follow(&mut self, slot: usize, now: Instant) {
        if let Some((deadline, next)) = self.lists[slot].follow {
            if now >= deadline {
                self.lists[slot].follow = None;
                // Use the deadline as the go instant so chained follows and
                // fades stay deterministic regardless of tick alignment.
                let _ = self.go_index(slot, next, deadline);
            }
        }
    }

    fn check_timecode(&mut self, slot: usize, position: Option<TimecodePosition>, now: Instant) {
        if self.lists[slot].list.timecode_source != TimecodeSelection::Console {
            return;
        }
        let Some(position) = position else { return };
        let previous = self.lists[slot].last_timecode;
        self.lists[slot].last_timecode = Some(position);

        let mut fire = Vec::new();
        {
            let playback = &self.lists[slot];
            for (index, cue) in playback.list.cues.iter().enumerate() {
                let Some(anchor) = cue.timecode else { continue };
                if !playback.armed[index] {
                    continue;
                }
                let crossed = anchor <= position && previous.map_or(true, |prev| anchor > prev);
                if crossed {
                    fire.push((anchor, index));
                }
            }
        }
        fire.sort();
        for (_, index) in fire {
            let _ = self.go_index(slot, index, now);
        }
    }

    fn warn_fresh(&mut self, warnings: Vec<String>) {
        for detail in warnings {
            if self.warned.insert(detail.clone()) {
                tracing::warn!(%detail, "unresolved reference");
                self.events.push(SchedulerEvent::Unresolved { detail });
            }
        }
    }
}

/// Writes this list's tracked values into the model.
fn apply_tracking(playback: &ListPlayback, model: &mut FixtureModel) -> Vec<String> {
    let mut warnings = Vec::new();
    for value in &playback.tracking.values {
        if model
            .set_state(value.fixture, &value.attribute, value.value)
            .is_err()
        {
            warnings.push(format!("tracked fixture {} not patched", value.fixture));
        }
    }
    warnings
}

/// Advances one list's run: wait expiry, fade interpolation, completion.
fn advance_list(
    playback: &mut ListPlayback,
    presets: &BTreeMap<PresetId, Preset>,
    model: &mut FixtureModel,
    now: Instant,
    events: &mut Vec<SchedulerEvent>,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let ListPlayback {
        list,
        run: run_slot,
        last_index,
        tracking,
        history,
        ..
    } = playback;

    {
        let Some(run) = run_slot.as_mut() else {
            return warnings;
        };
        if matches!(run.state, CueState::Done | CueState::Cancelled) {
            return warnings;
        }

        // WaitPending -> Active at the fade start instant.
        if run.state == CueState::WaitPending {
            if now < run.fade_start {
                return warnings;
            }
            activate_run(list, run, tracking, presets, model, &mut warnings);
        }

        let cue = &list.cues[run.index];
        let p = fade_progress(cue, run, now);

        // Interpolate every target from the captured base toward its end
        // value.
        for value in resolve_targets(cue, presets, &mut warnings) {
            let key = (value.fixture, value.attribute.clone());
            let prev = run.base.get(&key).copied().unwrap_or(0);
            let level = fade_value(&value.attribute, prev, value.value, p);
            match model.fixture(value.fixture) {
                Some(fixture) => {
                    if fixture.profile().offset(&value.attribute).is_none() {
                        warnings.push(format!(
                            "cue {}: fixture {} has no '{}' channel",
                            cue.id, value.fixture, value.attribute
                        ));
                        continue;
                    }
                    let _ = model.set_state(value.fixture, &value.attribute, level);
                }
                None => warnings.push(format!(
                    "cue {}: fixture {} not patched",
                    cue.id, value.fixture
                )),
            }
        }

        // Effects ramp their amplitude in over the fade.
        for (effect, full) in &mut run.effects {
            effect.amplitude = *full * ease(p);
        }

        if p < 1.0 {
            run.state = CueState::Fading;
            return warnings;
        }
    }

    // Fade complete: fold the cue into tracking.
    if let Some(finished) = run_slot.take() {
        let cue = &list.cues[finished.index];
        let cue_id = cue.id;
        for value in resolve_targets(cue, presets, &mut warnings) {
            tracking.merge_value(value);
        }
        for (mut effect, full) in finished.effects {
            effect.amplitude = full;
            tracking.effects.insert(effect.name.clone(), effect);
        }
        *last_index = Some(finished.index);
        history.push(cue_id);
        events.push(SchedulerEvent::CueCompleted {
            list: list.id,
            cue: cue_id,
        });
    }
    warnings
}

/// WaitPending -> Active: blocking reset, base capture, effect start.
fn activate_run(
    list: &CueList,
    run: &mut CueRun,
    tracking: &mut TrackingState,
    presets: &BTreeMap<PresetId, Preset>,
    model: &mut FixtureModel,
    warnings: &mut Vec<String>,
) {
    let cue = &list.cues[run.index];

    if cue.blocking {
        // Previously tracked attributes not restated by this cue revert to
        // zero before the cue's own values apply.
        for value in std::mem::take(&mut tracking.values) {
            let _ = model.set_state(value.fixture, &value.attribute, 0);
        }
        tracking.effects.clear();
    }

    run.state = CueState::Active;
    for value in resolve_targets(cue, presets, warnings) {
        let prev = model
            .state(value.fixture)
            .map(|s| s.get(&value.attribute))
            .unwrap_or(0);
        run.base.insert((value.fixture, value.attribute), prev);
    }
    run.effects = cue
        .effects
        .iter()
        .map(|effect| {
            let mut effect = effect.clone();
            let full = effect.amplitude;
            effect.start(run.fade_start);
            (effect, full)
        })
        .collect();
}

fn fade_progress(cue: &Cue, run: &CueRun, now: Instant) -> f64 {
    if now < run.fade_start {
        return 0.0;
    }
    if cue.fade.is_zero() {
        return 1.0;
    }
    (now.saturating_duration_since(run.fade_start).as_secs_f64() / cue.fade.as_secs_f64())
        .clamp(0.0, 1.0)
}

/// Expands a cue's presets then overlays its own static values; later
/// writes to the same `(fixture, attribute)` win.
fn resolve_targets(
    cue: &Cue,
    presets: &BTreeMap<PresetId, Preset>,
    warnings: &mut Vec<String>,
) -> Vec<StaticValue> {
    let mut out: Vec<StaticValue> = Vec::new();
    let mut push = |value: &StaticValue| {
        if let Some(existing) = out
            .iter_mut()
            .find(|v| v.fixture == value.fixture && v.attribute == value.attribute)
        {
            existing.value = value.value;
        } else {
            out.push(value.clone());
        }
    };
    for preset_id in &cue.presets {
        match presets.get(preset_id) {
            Some(preset) => preset.values.iter().for_each(&mut push),
            None => warnings.push(format!("cue {}: preset {} not defined", cue.id, preset_id)),
        }
    }
    cue.static_values.iter().for_each(&mut push);
    out
}
