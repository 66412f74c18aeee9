//! The 44 Hz event loop.
//!
//! One dedicated worker thread owns every piece of mutable core state and
//! drives the per-tick protocol: drain commands, snapshot musical time,
//! render cues, sample effects, composite fixtures, apply overrides, freeze
//! and emit universes, then report status. Ticks that overrun their period
//! are reported and the loop proceeds immediately; there is no catch-up
//! debt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Receiver;

use crate::audio::AudioPlayer;
use crate::artnet::{ArtNetRouter, RouterEvent};
use crate::command::{Command, StateSnapshot};
use crate::config::ConsoleConfig;
use crate::cue::{CueScheduler, SchedulerEvent, TimecodeSource};
use crate::dmx::{DmxCompositor, FrameMode};
use crate::effect::EffectEngine;
use crate::event::{ConsoleEvent, DestinationStatus, EventCallback, WarningKind};
use crate::fixture::FixtureModel;
use crate::overrides::OverrideLayer;
use crate::rhythm::Metronome;
use crate::show::Show;
use crate::ConsoleError;

pub(crate) struct Engine {
    config: ConsoleConfig,
    metronome: Metronome,
    model: FixtureModel,
    compositor: DmxCompositor,
    scheduler: CueScheduler,
    effects: EffectEngine,
    overrides: OverrideLayer,
    router: ArtNetRouter,
    audio: Box<dyn AudioPlayer>,
    timecode: Box<dyn TimecodeSource>,
    command_rx: Receiver<Command>,
    event_callback: Option<EventCallback>,
    shutting_down: Arc<AtomicBool>,
    frame: u64,
    overrun_streak: u32,
    next_frame_mode: FrameMode,
    warned: std::collections::HashSet<String>,
}

impl Engine {
    pub(crate) fn new(
        config: ConsoleConfig,
        show: Option<Show>,
        audio: Box<dyn AudioPlayer>,
        mut timecode: Box<dyn TimecodeSource>,
        command_rx: Receiver<Command>,
        event_callback: Option<EventCallback>,
        shutting_down: Arc<AtomicBool>,
    ) -> Result<Self, ConsoleError> {
        config.validate()?;
        let (destinations, routes, default_route) = config.build_routing()?;
        let router = ArtNetRouter::new(
            config.source_ip,
            destinations,
            routes,
            default_route,
            config.destination_down_threshold,
        )?;

        let start = Instant::now();
        let metronome = Metronome::new(
            config.bpm,
            config.beats_per_bar,
            config.bars_per_phrase,
            start,
        )?;
        timecode.play(start);

        let mut engine = Self {
            config,
            metronome,
            model: FixtureModel::new(),
            compositor: DmxCompositor::new(),
            scheduler: CueScheduler::new(),
            effects: EffectEngine::new(),
            overrides: OverrideLayer::new(),
            router,
            audio,
            timecode,
            command_rx,
            event_callback,
            shutting_down,
            frame: 0,
            overrun_streak: 0,
            next_frame_mode: FrameMode::Track,
            warned: std::collections::HashSet::new(),
        };

        // Mapped universes exist from the start, so an idle console still
        // emits (and a shutdown blackout still covers) every routed universe.
        let routed: Vec<_> = engine.router.routed_universes().collect();
        for universe in routed {
            engine.compositor.touch(universe);
        }

        if let Some(show) = show {
            engine.load_show(show);
        }
        Ok(engine)
    }

    /// Runs until a shutdown command arrives. Consumes the engine.
    pub(crate) fn run(mut self) {
        let period = self.config.tick_interval();
        tracing::info!(
            tick_rate = self.config.tick_rate,
            "playback engine started"
        );

        loop {
            let tick_start = Instant::now();

            if self.drain_commands(tick_start) {
                self.shutdown_blackout();
                break;
            }
            self.tick(tick_start);

            let elapsed = tick_start.elapsed();
            if elapsed > period {
                self.overrun_streak += 1;
                tracing::warn!(?elapsed, "tick overrun");
                self.emit(ConsoleEvent::TickOverrun { duration: elapsed });
                if self.overrun_streak >= 2 {
                    self.emit(ConsoleEvent::TickSustainedOverrun {
                        consecutive: self.overrun_streak,
                    });
                }
                // Proceed immediately; never try to catch up.
            } else {
                self.overrun_streak = 0;
                thread::sleep(period - elapsed);
            }
        }
    }

    /// Steps 2-7 of the tick protocol.
    fn tick(&mut self, now: Instant) {
        let timecode = self.timecode.position(now);
        let snapshot = self.metronome.snapshot(now);

        // Cue rendering writes interpolated values into the fixture model.
        let scheduler_events = self.scheduler.render(&mut self.model, now, Some(timecode));
        for event in scheduler_events {
            match event {
                SchedulerEvent::CueActivated { list, cue } => {
                    self.emit(ConsoleEvent::CueActivated { list, cue });
                }
                SchedulerEvent::CueCompleted { list, cue } => {
                    self.emit(ConsoleEvent::CueCompleted { list, cue });
                }
                SchedulerEvent::Unresolved { detail } => {
                    self.emit(ConsoleEvent::Warning {
                        kind: WarningKind::UnresolvedReference,
                        message: detail,
                    });
                }
                SchedulerEvent::AudioPlay { file } => {
                    self.audio.play(&file, now);
                }
                SchedulerEvent::AudioStop => {
                    self.audio.stop();
                }
            }
        }

        // Effects write over the cue output at the attribute level.
        let unresolved =
            self.effects
                .sample_into(&mut self.model, self.scheduler.active_effects(), &snapshot, now);
        for target in unresolved {
            self.emit(ConsoleEvent::Warning {
                kind: WarningKind::UnresolvedReference,
                message: format!("effect '{}': {}", target.effect, target.detail),
            });
        }

        // Composite every fixture into its universe frame.
        self.compositor.begin_frame(self.next_frame_mode);
        self.next_frame_mode = FrameMode::Track;
        for fixture in self.model.fixtures() {
            if let Err(err) = self.compositor.write_fixture(fixture) {
                tracing::warn!(fixture = %fixture.id(), %err, "composite failed");
            }
        }
        for fixture in self.model.fixtures_mut() {
            fixture.mark_clean();
        }

        // Overrides write last and win.
        let (_applied, unresolved) = self.overrides.apply(&self.model, &mut self.compositor);
        for detail in unresolved {
            if self.warned.insert(detail.clone()) {
                self.emit(ConsoleEvent::Warning {
                    kind: WarningKind::UnresolvedReference,
                    message: detail,
                });
            }
        }

        // Freeze and hand to the router.
        let frames = self.compositor.snapshot_universes();
        let router_events = self.router.emit(&frames);
        for event in router_events {
            self.emit_router_event(event);
        }

        self.frame += 1;
        self.emit(ConsoleEvent::Tick {
            frame: self.frame,
            active_cues: self.scheduler.active_cue_count(),
        });
    }

    /// Drains the command queue. Returns `true` when shutdown was requested;
    /// commands already queued behind the shutdown are still executed.
    fn drain_commands(&mut self, now: Instant) -> bool {
        let mut drained = 0;
        let mut shutdown = false;
        while drained < self.config.command_queue_capacity {
            match self.command_rx.try_recv() {
                Ok(Command::Shutdown) => {
                    drained += 1;
                    shutdown = true;
                }
                Ok(command) => {
                    drained += 1;
                    self.handle_command(command, now);
                }
                Err(_) => break,
            }
        }
        if drained >= self.config.command_high_water {
            tracing::warn!(drained, "command queue above high-water mark");
            self.emit(ConsoleEvent::Warning {
                kind: WarningKind::CommandBackpressure,
                message: format!("drained {drained} commands in one tick"),
            });
        }
        shutdown
    }

    fn handle_command(&mut self, command: Command, now: Instant) {
        let result = match command {
            Command::Patch(patch) => self.model.patch(patch),
            Command::Unpatch(id) => match self.model.unpatch(id) {
                Ok(fixture) => {
                    // Tracking carries frames forward; with no source left
                    // for these channels, the last bytes must go dark now.
                    self.compositor.clear_fixture(&fixture);
                    Ok(())
                }
                Err(err) => Err(err),
            },
            Command::SetGroup(group) => {
                self.model.set_group(group);
                Ok(())
            }
            Command::SetPreset(preset) => {
                self.scheduler.set_preset(preset);
                Ok(())
            }
            Command::LoadShow(show) => {
                self.load_show(*show);
                Ok(())
            }
            Command::ClearShow => {
                self.clear_show();
                Ok(())
            }
            Command::Go(list) => self.scheduler.go(list, now),
            Command::GoCue(list, cue) => self.scheduler.go_cue(list, cue, now),
            Command::GoPrevious(list) => self.scheduler.go_previous(list, now),
            Command::Stop(list) => self.scheduler.stop(list, now),
            Command::Seek(position) => {
                self.timecode.seek(position, now);
                self.scheduler.seek(position, now);
                Ok(())
            }
            Command::Pause => {
                self.scheduler.pause(now);
                self.timecode.pause(now);
                Ok(())
            }
            Command::Resume => {
                self.scheduler.resume(now);
                self.timecode.play(now);
                Ok(())
            }
            Command::SetTempo(bpm) => self.metronome.set_tempo(bpm, now),
            Command::AlignTempo(beat) => {
                self.metronome.align_to(beat, now);
                Ok(())
            }
            Command::SetOverride {
                kind,
                fixture,
                attribute,
                value,
            } => {
                self.overrides.set(kind, fixture, attribute.clone(), value);
                self.emit(ConsoleEvent::OverrideApplied {
                    fixture,
                    attribute,
                    value,
                });
                Ok(())
            }
            Command::ReleaseOverride { fixture, attribute } => {
                self.overrides.release(fixture, &attribute);
                Ok(())
            }
            Command::SnapshotState(reply) => {
                let _ = reply.try_send(self.snapshot_state(now));
                Ok(())
            }
            Command::Shutdown => Ok(()), // handled by the drain loop
        };
        if let Err(err) = result {
            tracing::warn!(%err, "command failed");
            self.emit(ConsoleEvent::Error {
                message: err.to_string(),
            });
        }
    }

    /// Replaces the loaded show. All patches are validated against a fresh
    /// model first; one bad patch rejects the whole load and leaves current
    /// state untouched.
    fn load_show(&mut self, show: Show) {
        let mut model = FixtureModel::new();
        for patch in show.patches {
            if let Err(err) = model.patch(patch) {
                tracing::warn!(%err, "show rejected");
                self.emit(ConsoleEvent::Error {
                    message: format!("show '{}' rejected: {err}", show.name),
                });
                return;
            }
        }
        for group in show.groups {
            model.set_group(group);
        }

        self.model = model;
        self.scheduler.load(show.cue_lists, show.presets);
        self.effects.reset();
        self.overrides.release_all();
        self.warned.clear();

        // Old fixtures' channels go dark rather than lingering.
        self.compositor.blackout();
        tracing::info!(show = %show.name, fixtures = self.model.len(), "show loaded");
    }

    fn clear_show(&mut self) {
        self.model.clear();
        self.scheduler.clear();
        self.overrides.release_all();
        self.effects.reset();
        self.warned.clear();
        self.compositor.blackout();
        self.audio.stop();
    }

    fn snapshot_state(&self, now: Instant) -> StateSnapshot {
        StateSnapshot {
            frame: self.frame,
            bpm: self.metronome.bpm(),
            transport: self.scheduler.transport(now),
            fixtures: self
                .model
                .fixtures()
                .map(|f| (f.id(), f.state().clone()))
                .collect(),
            destinations: self.router.destination_health(),
            overrides: self.overrides.len(),
        }
    }

    /// Final tick: a zero-valued frame on every mapped universe, then exit.
    fn shutdown_blackout(&mut self) {
        self.audio.stop();
        self.compositor.blackout();
        let frames = self.compositor.snapshot_universes();
        let router_events = self.router.emit(&frames);
        for event in router_events {
            self.emit_router_event(event);
        }
        tracing::info!(frames = self.frame, "playback engine stopped");
        self.emit(ConsoleEvent::ShutdownComplete);
    }

    fn emit_router_event(&self, event: RouterEvent) {
        match event {
            RouterEvent::UnroutedUniverse { universe } => {
                self.emit(ConsoleEvent::UniverseUnrouted { universe });
            }
            RouterEvent::SendFailed { destination, error } => {
                self.emit(ConsoleEvent::DestinationHealth {
                    destination,
                    status: DestinationStatus::Unreachable { error },
                });
            }
            RouterEvent::DestinationDown { destination, .. } => {
                self.emit(ConsoleEvent::DestinationHealth {
                    destination,
                    status: DestinationStatus::Down,
                });
            }
            RouterEvent::DestinationRestored { destination } => {
                self.emit(ConsoleEvent::DestinationHealth {
                    destination,
                    status: DestinationStatus::Restored,
                });
            }
        }
    }

    fn emit(&self, event: ConsoleEvent) {
        if let Some(callback) = &self.event_callback {
            callback(event);
        }
    }
}
