//! Core protocol types.
//!
//! Everything the gateway delivers to the bot, and everything the bot
//! sends back as a user-visible reply, is defined here.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A platform user.
///
/// Newtype wrapper so a `UserId` can never be passed where a `ChannelId`
/// is expected, even though both are `u64` snowflakes underneath.
/// `#[serde(transparent)]` keeps the wire form a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A channel: text, voice, or category.
///
/// Categories are channels too on the platforms we target, so one id type
/// covers all three.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A guild (server) the bot is a member of.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GuildId(pub u64);

impl GuildId {
    /// The guild's default ("everyone") role.
    ///
    /// The default role shares its id with the guild.
    pub fn default_role(self) -> RoleId {
        RoleId(self.0)
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// A guild role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoleId(pub u64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CategoryKind
// ---------------------------------------------------------------------------

/// Key of one configured (category, creation channel, default capacity)
/// triple, e.g. `gaming` or `music`.
///
/// Always lowercase: `CategoryKind::new("Gaming") == CategoryKind::new("gaming")`.
/// Deserialization goes through the same normalisation, so TOML table keys
/// and typed command arguments land on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CategoryKind(String);

impl CategoryKind {
    pub fn new(kind: impl AsRef<str>) -> Self {
        Self(kind.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CategoryKind {
    fn from(kind: String) -> Self {
        Self::new(kind)
    }
}

impl From<&str> for CategoryKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<CategoryKind> for String {
    fn from(kind: CategoryKind) -> Self {
        kind.0
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// A voice channel user limit. `0` means unlimited.
///
/// Only values in `0..=99` can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Capacity(u8);

impl Capacity {
    /// Largest user limit the platform accepts.
    pub const MAX: u8 = 99;

    /// No user limit.
    pub const UNLIMITED: Capacity = Capacity(0);

    /// Returns `None` if `limit` is outside `0..=99`.
    pub fn new(limit: i64) -> Option<Self> {
        u8::try_from(limit)
            .ok()
            .filter(|l| *l <= Self::MAX)
            .map(Self)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_unlimited(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for Capacity {
    type Error = String;

    fn try_from(limit: i64) -> Result<Self, Self::Error> {
        Self::new(limit).ok_or_else(|| {
            format!("capacity {limit} is outside 0..={}", Self::MAX)
        })
    }
}

impl From<Capacity> for u8 {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Inbound gateway events
// ---------------------------------------------------------------------------

/// A guild member as seen in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    /// The member's guild nickname, or their username if none is set.
    pub display_name: String,
}

/// A member moved between voice channels.
///
/// `before` is `None` when the member just connected to voice; `after` is
/// `None` when they disconnected. Both are set for a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdate {
    pub guild_id: GuildId,
    pub member: Member,
    #[serde(default)]
    pub before: Option<ChannelId>,
    #[serde(default)]
    pub after: Option<ChannelId>,
}

/// A text message posted in a guild channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreate {
    pub guild_id: GuildId,
    /// The text channel the message was posted in. Replies go here.
    pub channel_id: ChannelId,
    pub author: Member,
    pub content: String,
}

/// Events the gateway delivers to the bot.
///
/// Internally tagged: `{ "type": "VoiceStateUpdate", "guild_id": 1, ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayEvent {
    /// The session is established and the guild list is available.
    Ready,

    /// A guild became available after `Ready` (the bot was added to it,
    /// or it recovered from an outage).
    GuildAvailable { guild_id: GuildId },

    VoiceStateUpdate(VoiceStateUpdate),

    MessageCreate(MessageCreate),
}

// ---------------------------------------------------------------------------
// Outbound replies
// ---------------------------------------------------------------------------

/// One titled block inside an [`Embed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A structured rich reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub fields: Vec<EmbedField>,
}

/// What the bot posts back in response to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Reply {
    Text(String),
    Embed(Embed),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns the text of a `Text` reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Embed(_) => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
