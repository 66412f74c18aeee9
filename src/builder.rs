//! Builder for the playback console.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;

use crate::audio::{AudioPlayer, NullAudioPlayer};
use crate::config::ConsoleConfig;
use crate::cue::{InternalTimecode, TimecodeSource};
use crate::engine::Engine;
use crate::event::{event_callback, ConsoleEvent, EventCallback};
use crate::handle::ConsoleHandle;
use crate::show::Show;
use crate::ConsoleError;

/// Builder for configuring and starting the playback core.
///
/// # Example
///
/// ```no_run
/// use halo_core::{Console, ConsoleConfig};
///
/// let config = ConsoleConfig::new("192.168.1.100".parse().unwrap());
/// let handle = Console::builder(config)
///     .on_event(|event| tracing::debug!(?event, "console event"))
///     .start()?;
///
/// handle.go(halo_core::CueListId(1))?;
/// handle.shutdown()?;
/// # Ok::<(), halo_core::ConsoleError>(())
/// ```
#[must_use]
pub struct ConsoleBuilder {
    config: ConsoleConfig,
    show: Option<Show>,
    event_callback: Option<EventCallback>,
    audio: Box<dyn AudioPlayer>,
    timecode: Box<dyn TimecodeSource>,
}

impl ConsoleBuilder {
    /// Creates a builder from a resolved configuration.
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            config,
            show: None,
            event_callback: None,
            audio: Box::new(NullAudioPlayer),
            timecode: Box::new(InternalTimecode::new()),
        }
    }

    /// Loads `show` before the first tick.
    pub fn with_show(mut self, show: Show) -> Self {
        self.show = Some(show);
        self
    }

    /// Sets a callback for the console event stream.
    ///
    /// The callback runs on the loop thread: keep it cheap and never block.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(ConsoleEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Attaches an audio playback collaborator.
    pub fn with_audio(mut self, audio: impl AudioPlayer + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    /// Replaces the internal wall-clock timecode with an external source
    /// (SMPTE ingest, network clock).
    pub fn with_timecode(mut self, timecode: impl TimecodeSource + 'static) -> Self {
        self.timecode = Box::new(timecode);
        self
    }

    /// Validates the configuration, binds the Art-Net socket, spawns the
    /// loop thread, and returns the command handle.
    ///
    /// # Errors
    ///
    /// Configuration and socket errors; the thread is not spawned on error.
    pub fn start(self) -> Result<ConsoleHandle, ConsoleError> {
        let (command_tx, command_rx) = bounded(self.config.command_queue_capacity);
        let shutting_down = Arc::new(AtomicBool::new(false));

        let engine = Engine::new(
            self.config,
            self.show,
            self.audio,
            self.timecode,
            command_rx,
            self.event_callback,
            Arc::clone(&shutting_down),
        )?;

        let thread = thread::Builder::new()
            .name("halo-playback".into())
            .spawn(move || engine.run())
            .map_err(ConsoleError::Socket)?;

        Ok(ConsoleHandle::new(command_tx, shutting_down, thread))
    }
}

/// Entry point for the playback core.
///
/// A `Console` value is never constructed; it namespaces
/// [`Console::builder`], and the running core is owned by its loop thread
/// behind a [`ConsoleHandle`].
pub struct Console;

impl Console {
    /// Starts configuring a console.
    pub fn builder(config: ConsoleConfig) -> ConsoleBuilder {
        ConsoleBuilder::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn config() -> ConsoleConfig {
        let mut config = ConsoleConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        config.routing = crate::config::OutputRouting::Single {
            dest_ip: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        };
        config
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = config();
        config.tick_rate = -1.0;
        assert!(Console::builder(config).start().is_err());
    }

    #[test]
    fn test_start_and_shutdown() {
        let handle = Console::builder(config()).start().unwrap();
        assert!(handle.is_running());
        handle.shutdown().unwrap();
    }
}
