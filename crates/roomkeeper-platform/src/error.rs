use std::time::Duration;

use roomkeeper_protocol::{ChannelId, GuildId, UserId};

/// Errors returned by [`Platform`](crate::Platform) calls.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The guild is unknown or the bot is no longer a member.
    #[error("guild {0} not found")]
    GuildNotFound(GuildId),

    /// The channel doesn't exist (or was deleted in the meantime).
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    /// The user isn't a member of the guild.
    #[error("member {0} not found")]
    MemberNotFound(UserId),

    /// The bot lacks the permission required for this call.
    #[error("missing permissions: {0}")]
    Forbidden(String),

    /// The call didn't complete within the configured bound.
    #[error("platform call timed out after {0:?}")]
    Timeout(Duration),

    /// Any other request failure (network, rate limit, bad request).
    #[error("platform request failed: {0}")]
    Request(String),
}
