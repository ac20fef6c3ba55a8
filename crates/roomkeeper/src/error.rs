//! Unified error type for Roomkeeper.

use roomkeeper_platform::PlatformError;
use roomkeeper_protocol::ProtocolError;
use roomkeeper_room::RoomError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomkeeperError {
    /// Bad input: an undecodable event or a malformed command.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A platform call failed or timed out.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A settings or ownership rule was violated.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bot's event loop has exited.
    #[error("bot is no longer running")]
    Stopped,
}
