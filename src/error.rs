//! Error types for halo-core.
//!
//! Errors are split into two categories:
//! - **Rejections** ([`ConsoleError`]): a command or construction input violated
//!   a contract and was refused; core state is unchanged.
//! - **Recoverable faults**: runtime issues (unresolved references, send
//!   failures, tick overruns) surfaced via the
//!   [`ConsoleEvent`](crate::ConsoleEvent) stream. The engine never panics on
//!   runtime data errors.

use crate::fixture::FixtureId;

/// Rejections returned from the console facade and from construction.
///
/// Every variant leaves the core exactly as it was before the offending
/// command. Runtime degradation (a dead Art-Net destination, a cue referencing
/// a missing fixture) is *not* an error; it is reported through
/// [`ConsoleEvent`](crate::ConsoleEvent) while playback continues.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// A patch would collide with an existing fixture.
    #[error("patch conflict for fixture {fixture_id}: {reason}")]
    PatchConflict {
        /// Id of the fixture being patched.
        fixture_id: FixtureId,
        /// What collided (duplicate id, overlapping address range).
        reason: String,
    },

    /// A fixture id did not resolve in the current patch.
    #[error("unknown fixture: {0}")]
    UnknownFixture(FixtureId),

    /// A fixture's profile has no mapping for the requested attribute.
    #[error("fixture {fixture_id} has no '{attribute}' channel")]
    UnknownAttribute {
        /// Fixture whose profile was consulted.
        fixture_id: FixtureId,
        /// The attribute that did not resolve.
        attribute: String,
    },

    /// A cue list id did not resolve in the loaded show.
    #[error("unknown cue list: {0}")]
    UnknownCueList(u32),

    /// A cue id did not resolve within its list.
    #[error("unknown cue {cue} in list {list}")]
    UnknownCue {
        /// The list that was searched.
        list: u32,
        /// The cue id that was not found.
        cue: u32,
    },

    /// A DMX channel fell outside `1..=512`.
    #[error("channel {0} out of range (1..=512)")]
    ChannelOutOfRange(u16),

    /// A universe id fell outside the 15-bit Art-Net range `1..=32767`.
    #[error("universe {0} out of range (1..=32767)")]
    UniverseOutOfRange(u16),

    /// A fixture footprint would not fit inside its universe.
    #[error("fixture {fixture_id} footprint {address}..{end} exceeds universe bounds")]
    FootprintOutOfRange {
        /// Fixture being patched.
        fixture_id: FixtureId,
        /// First DMX address of the footprint.
        address: u16,
        /// One past the last DMX address of the footprint.
        end: u32,
    },

    /// A profile declared an invalid channel layout.
    #[error("invalid profile '{name}': {reason}")]
    InvalidProfile {
        /// Profile name.
        name: String,
        /// Why the layout was refused.
        reason: String,
    },

    /// Tempo outside the accepted `20..=400` BPM window.
    #[error("tempo {0} BPM out of range (20..=400)")]
    TempoOutOfRange(f64),

    /// The builder configuration was incomplete or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The command queue is full; the command was not enqueued.
    ///
    /// Nothing was dropped: the caller decides whether to retry. The loop
    /// additionally emits a backpressure warning when its drain saturates.
    #[error("command queue full")]
    Backpressure,

    /// A command arrived after shutdown was requested.
    #[error("console is shutting down")]
    ShuttingDown,

    /// The Art-Net socket could not be created or configured.
    #[error("artnet socket: {0}")]
    Socket(#[from] std::io::Error),
}

impl ConsoleError {
    /// Creates a patch conflict with the given reason.
    pub fn patch_conflict(fixture_id: FixtureId, reason: impl Into<String>) -> Self {
        Self::PatchConflict {
            fixture_id,
            reason: reason.into(),
        }
    }

    /// Creates an invalid-profile rejection with the given reason.
    pub fn invalid_profile(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProfile {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
