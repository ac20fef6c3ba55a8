//! Chat platform abstraction layer for Roomkeeper.
//!
//! Provides the [`Platform`] trait: every outbound call the bot makes to
//! the chat platform (create/delete/edit channels, move members, set
//! permission overwrites, post replies). Gateway sessions, rate limiting,
//! and REST retries belong to whatever client library implements it.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryPlatform`], a simulated guild used by
//!   the tests and the console demo

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::PlatformError;
#[cfg(feature = "memory")]
pub use memory::{MemoryPlatform, Operation, PlatformCall};

use std::fmt;
use std::future::Future;

use roomkeeper_protocol::{
    Capacity, ChannelId, GuildId, Reply, RoleId, UserId,
};

// ---------------------------------------------------------------------------
// Channel model
// ---------------------------------------------------------------------------

/// What kind of channel a [`ChannelInfo`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Category,
    Voice,
    Text,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => write!(f, "category"),
            Self::Voice => write!(f, "voice"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A snapshot of one channel as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
    pub kind: ChannelKind,
    /// The category this channel sits in, if any.
    pub parent_id: Option<ChannelId>,
    pub user_limit: Capacity,
    /// Members currently connected (voice channels only).
    pub member_count: usize,
}

/// Who a permission overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteTarget {
    Role(RoleId),
    Member(UserId),
}

impl fmt::Display for OverwriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => write!(f, "{role}"),
            Self::Member(user) => write!(f, "{user}"),
        }
    }
}

/// A per-channel permission overwrite.
///
/// Each field is tri-state: `Some(true)` allows, `Some(false)` denies,
/// `None` inherits from the category/guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionOverwrite {
    pub connect: Option<bool>,
    pub manage_channels: Option<bool>,
}

impl PermissionOverwrite {
    pub fn allow_connect() -> Self {
        Self {
            connect: Some(true),
            ..Self::default()
        }
    }

    pub fn deny_connect() -> Self {
        Self {
            connect: Some(false),
            ..Self::default()
        }
    }

    /// Connect plus manage-channel rights, as granted to a room owner.
    pub fn owner() -> Self {
        Self {
            connect: Some(true),
            manage_channels: Some(true),
        }
    }
}

/// Parameters for [`Platform::create_voice_channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoiceChannel {
    pub name: String,
    pub parent_id: Option<ChannelId>,
    pub user_limit: Capacity,
    /// Applied atomically with creation.
    pub overwrites: Vec<(OverwriteTarget, PermissionOverwrite)>,
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Outbound calls to the chat platform.
///
/// Every method is a network round trip with unbounded latency; callers
/// should bound them with a timeout. The returned futures are `Send` so a
/// bot generic over `P: Platform` can run on the multi-threaded runtime.
pub trait Platform: Send + Sync + 'static {
    /// Guilds the bot is a member of.
    fn guilds(
        &self,
    ) -> impl Future<Output = Result<Vec<GuildId>, PlatformError>> + Send;

    /// All channels of a guild, categories included.
    fn channels(
        &self,
        guild_id: GuildId,
    ) -> impl Future<Output = Result<Vec<ChannelInfo>, PlatformError>> + Send;

    /// One channel, or `None` if it no longer exists.
    fn channel(
        &self,
        channel_id: ChannelId,
    ) -> impl Future<Output = Result<Option<ChannelInfo>, PlatformError>> + Send;

    fn create_category(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> impl Future<Output = Result<ChannelInfo, PlatformError>> + Send;

    fn create_voice_channel(
        &self,
        guild_id: GuildId,
        channel: NewVoiceChannel,
    ) -> impl Future<Output = Result<ChannelInfo, PlatformError>> + Send;

    fn edit_user_limit(
        &self,
        channel_id: ChannelId,
        limit: Capacity,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    fn delete_channel(
        &self,
        channel_id: ChannelId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Moves a member who is connected to voice into `channel_id`.
    fn move_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Creates or replaces the overwrite for `target` on a channel.
    fn set_permission(
        &self,
        channel_id: ChannelId,
        target: OverwriteTarget,
        overwrite: PermissionOverwrite,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// The voice channel a member is connected to, if any.
    fn voice_channel_of(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<ChannelId>, PlatformError>> + Send;

    /// Posts a reply in a text channel.
    fn send_reply(
        &self,
        channel_id: ChannelId,
        reply: Reply,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

// ---------------------------------------------------------------------------
// Lookup helpers
// ---------------------------------------------------------------------------

/// Finds a category by display name.
pub fn find_category<'a>(
    channels: &'a [ChannelInfo],
    name: &str,
) -> Option<&'a ChannelInfo> {
    channels
        .iter()
        .find(|c| c.kind == ChannelKind::Category && c.name == name)
}

/// Finds a voice channel by name inside a category.
pub fn find_voice_channel<'a>(
    channels: &'a [ChannelInfo],
    parent_id: ChannelId,
    name: &str,
) -> Option<&'a ChannelInfo> {
    channels.iter().find(|c| {
        c.kind == ChannelKind::Voice
            && c.parent_id == Some(parent_id)
            && c.name == name
    })
}
