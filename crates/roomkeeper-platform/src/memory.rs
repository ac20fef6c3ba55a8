//! In-memory [`Platform`]: a simulated set of guilds.
//!
//! `MemoryPlatform` keeps channels, voice connections, and permission
//! overwrites in a map behind a `tokio::sync::Mutex`. It records every
//! mutating call that took effect, can be told to fail the next call of a
//! given kind, and queues the voice-state events its own moves produce
//! (the real gateway would echo those back to the bot).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use roomkeeper_protocol::{
    Capacity, ChannelId, GatewayEvent, GuildId, Member, Reply, UserId,
    VoiceStateUpdate,
};
use tokio::sync::Mutex;

use crate::{
    ChannelInfo, ChannelKind, NewVoiceChannel, OverwriteTarget,
    PermissionOverwrite, Platform, PlatformError,
};

/// First id handed out to channels created on the simulated platform.
const FIRST_CHANNEL_ID: u64 = 1_000;

/// Platform operations, used to target failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Guilds,
    Channels,
    Channel,
    CreateCategory,
    CreateVoiceChannel,
    EditUserLimit,
    DeleteChannel,
    MoveMember,
    SetPermission,
    VoiceChannelOf,
    SendReply,
}

/// A mutating call that took effect on the simulated platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    CreateCategory {
        guild_id: GuildId,
        channel_id: ChannelId,
        name: String,
    },
    CreateVoiceChannel {
        guild_id: GuildId,
        channel_id: ChannelId,
        channel: NewVoiceChannel,
    },
    EditUserLimit {
        channel_id: ChannelId,
        limit: Capacity,
    },
    DeleteChannel {
        channel_id: ChannelId,
    },
    MoveMember {
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    },
    SetPermission {
        channel_id: ChannelId,
        target: OverwriteTarget,
        overwrite: PermissionOverwrite,
    },
}

#[derive(Debug, Default)]
struct GuildState {
    members: HashMap<UserId, Member>,
    /// Which voice channel each connected member is in.
    voice: HashMap<UserId, ChannelId>,
}

#[derive(Debug)]
struct ChannelState {
    guild_id: GuildId,
    name: String,
    kind: ChannelKind,
    parent_id: Option<ChannelId>,
    user_limit: Capacity,
    overwrites: Vec<(OverwriteTarget, PermissionOverwrite)>,
}

#[derive(Debug)]
struct Inner {
    next_id: u64,
    guilds: BTreeMap<GuildId, GuildState>,
    channels: BTreeMap<ChannelId, ChannelState>,
    calls: Vec<PlatformCall>,
    replies: Vec<(ChannelId, Reply)>,
    failures: HashMap<Operation, PlatformError>,
    events: VecDeque<GatewayEvent>,
    latency: Option<Duration>,
}

impl Inner {
    fn next_channel_id(&mut self) -> ChannelId {
        let id = ChannelId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Consumes an injected failure for `op`, if one is armed.
    fn check(&mut self, op: Operation) -> Result<(), PlatformError> {
        match self.failures.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn guild(&self, guild_id: GuildId) -> Result<&GuildState, PlatformError> {
        self.guilds
            .get(&guild_id)
            .ok_or(PlatformError::GuildNotFound(guild_id))
    }

    fn guild_mut(
        &mut self,
        guild_id: GuildId,
    ) -> Result<&mut GuildState, PlatformError> {
        self.guilds
            .get_mut(&guild_id)
            .ok_or(PlatformError::GuildNotFound(guild_id))
    }

    fn info(&self, channel_id: ChannelId) -> Option<ChannelInfo> {
        let state = self.channels.get(&channel_id)?;
        let member_count = self
            .guilds
            .get(&state.guild_id)
            .map(|g| g.voice.values().filter(|c| **c == channel_id).count())
            .unwrap_or(0);
        Some(ChannelInfo {
            id: channel_id,
            guild_id: state.guild_id,
            name: state.name.clone(),
            kind: state.kind,
            parent_id: state.parent_id,
            user_limit: state.user_limit,
            member_count,
        })
    }

    fn insert_channel(
        &mut self,
        guild_id: GuildId,
        name: &str,
        kind: ChannelKind,
        parent_id: Option<ChannelId>,
        user_limit: Capacity,
        overwrites: Vec<(OverwriteTarget, PermissionOverwrite)>,
    ) -> Result<ChannelId, PlatformError> {
        self.guild(guild_id)?;
        if let Some(parent) = parent_id {
            match self.channels.get(&parent) {
                Some(p)
                    if p.kind == ChannelKind::Category
                        && p.guild_id == guild_id => {}
                _ => return Err(PlatformError::ChannelNotFound(parent)),
            }
        }
        let id = self.next_channel_id();
        self.channels.insert(
            id,
            ChannelState {
                guild_id,
                name: name.to_string(),
                kind,
                parent_id,
                user_limit,
                overwrites,
            },
        );
        Ok(id)
    }

    /// Points a member's voice connection at `to` and returns the
    /// resulting event.
    fn set_voice(
        &mut self,
        guild_id: GuildId,
        member: Member,
        to: Option<ChannelId>,
    ) -> Result<VoiceStateUpdate, PlatformError> {
        if let Some(channel_id) = to {
            match self.channels.get(&channel_id) {
                Some(c) if c.kind == ChannelKind::Voice && c.guild_id == guild_id => {}
                _ => return Err(PlatformError::ChannelNotFound(channel_id)),
            }
        }
        let guild = self.guild_mut(guild_id)?;
        let user_id = member.user_id;
        guild.members.insert(user_id, member.clone());
        let before = match to {
            Some(channel_id) => guild.voice.insert(user_id, channel_id),
            None => guild.voice.remove(&user_id),
        };
        Ok(VoiceStateUpdate {
            guild_id,
            member,
            before,
            after: to,
        })
    }
}

/// A simulated chat platform. See the module docs.
#[derive(Debug)]
pub struct MemoryPlatform {
    inner: Mutex<Inner>,
}

impl MemoryPlatform {
    /// Creates a platform with no guilds.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: FIRST_CHANNEL_ID,
                guilds: BTreeMap::new(),
                channels: BTreeMap::new(),
                calls: Vec::new(),
                replies: Vec::new(),
                failures: HashMap::new(),
                events: VecDeque::new(),
                latency: None,
            }),
        }
    }

    /// Adds an empty guild the bot is a member of.
    pub fn with_guild(mut self, guild_id: GuildId) -> Self {
        self.inner.get_mut().guilds.entry(guild_id).or_default();
        self
    }

    /// Adds (or renames) a guild member. They start disconnected.
    pub async fn add_member(
        &self,
        guild_id: GuildId,
        member: Member,
    ) -> Result<(), PlatformError> {
        let mut inner = self.inner.lock().await;
        inner.guild_mut(guild_id)?.members.insert(member.user_id, member);
        Ok(())
    }

    /// Creates a category without recording a call.
    pub async fn seed_category(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> Result<ChannelId, PlatformError> {
        let mut inner = self.inner.lock().await;
        inner.insert_channel(
            guild_id,
            name,
            ChannelKind::Category,
            None,
            Capacity::UNLIMITED,
            Vec::new(),
        )
    }

    /// Creates a voice channel without recording a call.
    pub async fn seed_voice_channel(
        &self,
        guild_id: GuildId,
        parent_id: Option<ChannelId>,
        name: &str,
    ) -> Result<ChannelId, PlatformError> {
        let mut inner = self.inner.lock().await;
        inner.insert_channel(
            guild_id,
            name,
            ChannelKind::Voice,
            parent_id,
            Capacity::UNLIMITED,
            Vec::new(),
        )
    }

    /// A member moves themselves: connects to, switches to, or (with
    /// `None`) disconnects from voice. Returns the event the gateway would
    /// deliver. Unknown members are added to the guild.
    pub async fn connect(
        &self,
        guild_id: GuildId,
        member: Member,
        to: Option<ChannelId>,
    ) -> Result<VoiceStateUpdate, PlatformError> {
        let mut inner = self.inner.lock().await;
        inner.set_voice(guild_id, member, to)
    }

    /// Brings the simulation in line with an externally produced event.
    /// Only `after` is used; `before` is whatever the member was in.
    pub async fn apply_voice_state(
        &self,
        update: &VoiceStateUpdate,
    ) -> Result<VoiceStateUpdate, PlatformError> {
        self.connect(update.guild_id, update.member.clone(), update.after)
            .await
    }

    /// Makes the next call of kind `op` fail with
    /// [`PlatformError::Request`].
    pub async fn fail_next(&self, op: Operation) {
        let error = PlatformError::Request(format!("injected {op:?} failure"));
        self.fail_next_with(op, error).await;
    }

    /// Makes the next call of kind `op` fail with `error`.
    pub async fn fail_next_with(&self, op: Operation, error: PlatformError) {
        self.inner.lock().await.failures.insert(op, error);
    }

    /// Delays every subsequent platform call by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().await.latency = latency;
    }

    /// Mutating calls that took effect, oldest first.
    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Replies posted so far, oldest first.
    pub async fn replies(&self) -> Vec<(ChannelId, Reply)> {
        self.inner.lock().await.replies.clone()
    }

    /// Drains the voice-state events produced by the platform itself
    /// (bot-initiated moves, members dropped by a channel deletion).
    pub async fn take_events(&self) -> Vec<GatewayEvent> {
        self.inner.lock().await.events.drain(..).collect()
    }

    /// Current overwrites on a channel.
    pub async fn overwrites(
        &self,
        channel_id: ChannelId,
    ) -> Vec<(OverwriteTarget, PermissionOverwrite)> {
        self.inner
            .lock()
            .await
            .channels
            .get(&channel_id)
            .map(|c| c.overwrites.clone())
            .unwrap_or_default()
    }

    async fn delay(&self) {
        let latency = self.inner.lock().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MemoryPlatform {
    async fn guilds(&self) -> Result<Vec<GuildId>, PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::Guilds)?;
        Ok(inner.guilds.keys().copied().collect())
    }

    async fn channels(
        &self,
        guild_id: GuildId,
    ) -> Result<Vec<ChannelInfo>, PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::Channels)?;
        inner.guild(guild_id)?;
        let ids: Vec<ChannelId> = inner
            .channels
            .iter()
            .filter(|(_, c)| c.guild_id == guild_id)
            .map(|(id, _)| *id)
            .collect();
        Ok(ids.into_iter().filter_map(|id| inner.info(id)).collect())
    }

    async fn channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<Option<ChannelInfo>, PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::Channel)?;
        Ok(inner.info(channel_id))
    }

    async fn create_category(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> Result<ChannelInfo, PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::CreateCategory)?;
        let channel_id = inner.insert_channel(
            guild_id,
            name,
            ChannelKind::Category,
            None,
            Capacity::UNLIMITED,
            Vec::new(),
        )?;
        inner.calls.push(PlatformCall::CreateCategory {
            guild_id,
            channel_id,
            name: name.to_string(),
        });
        inner
            .info(channel_id)
            .ok_or(PlatformError::ChannelNotFound(channel_id))
    }

    async fn create_voice_channel(
        &self,
        guild_id: GuildId,
        channel: NewVoiceChannel,
    ) -> Result<ChannelInfo, PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::CreateVoiceChannel)?;
        let channel_id = inner.insert_channel(
            guild_id,
            &channel.name,
            ChannelKind::Voice,
            channel.parent_id,
            channel.user_limit,
            channel.overwrites.clone(),
        )?;
        inner.calls.push(PlatformCall::CreateVoiceChannel {
            guild_id,
            channel_id,
            channel,
        });
        inner
            .info(channel_id)
            .ok_or(PlatformError::ChannelNotFound(channel_id))
    }

    async fn edit_user_limit(
        &self,
        channel_id: ChannelId,
        limit: Capacity,
    ) -> Result<(), PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::EditUserLimit)?;
        let channel = inner
            .channels
            .get_mut(&channel_id)
            .filter(|c| c.kind == ChannelKind::Voice)
            .ok_or(PlatformError::ChannelNotFound(channel_id))?;
        channel.user_limit = limit;
        inner
            .calls
            .push(PlatformCall::EditUserLimit { channel_id, limit });
        Ok(())
    }

    async fn delete_channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<(), PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::DeleteChannel)?;
        let removed = inner
            .channels
            .remove(&channel_id)
            .ok_or(PlatformError::ChannelNotFound(channel_id))?;

        // Children of a deleted category fall back to the guild root.
        for child in inner.channels.values_mut() {
            if child.parent_id == Some(channel_id) {
                child.parent_id = None;
            }
        }

        // Anyone still connected is disconnected.
        let mut dropped = Vec::new();
        if let Some(guild) = inner.guilds.get_mut(&removed.guild_id) {
            let connected: Vec<UserId> = guild
                .voice
                .iter()
                .filter(|(_, c)| **c == channel_id)
                .map(|(u, _)| *u)
                .collect();
            for user_id in connected {
                guild.voice.remove(&user_id);
                if let Some(member) = guild.members.get(&user_id) {
                    dropped.push(member.clone());
                }
            }
        }
        for member in dropped {
            inner.events.push_back(GatewayEvent::VoiceStateUpdate(
                VoiceStateUpdate {
                    guild_id: removed.guild_id,
                    member,
                    before: Some(channel_id),
                    after: None,
                },
            ));
        }

        inner.calls.push(PlatformCall::DeleteChannel { channel_id });
        tracing::trace!(%channel_id, name = %removed.name, "simulated channel deleted");
        Ok(())
    }

    async fn move_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<(), PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::MoveMember)?;
        let guild = inner.guild(guild_id)?;
        let member = guild
            .members
            .get(&user_id)
            .cloned()
            .ok_or(PlatformError::MemberNotFound(user_id))?;
        if !guild.voice.contains_key(&user_id) {
            return Err(PlatformError::Request(format!(
                "member {user_id} is not connected to voice"
            )));
        }
        let event = inner.set_voice(guild_id, member, Some(channel_id))?;
        inner
            .events
            .push_back(GatewayEvent::VoiceStateUpdate(event));
        inner.calls.push(PlatformCall::MoveMember {
            guild_id,
            user_id,
            channel_id,
        });
        Ok(())
    }

    async fn set_permission(
        &self,
        channel_id: ChannelId,
        target: OverwriteTarget,
        overwrite: PermissionOverwrite,
    ) -> Result<(), PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::SetPermission)?;
        let channel = inner
            .channels
            .get_mut(&channel_id)
            .ok_or(PlatformError::ChannelNotFound(channel_id))?;
        match channel.overwrites.iter_mut().find(|(t, _)| *t == target) {
            Some((_, existing)) => *existing = overwrite,
            None => channel.overwrites.push((target, overwrite)),
        }
        inner.calls.push(PlatformCall::SetPermission {
            channel_id,
            target,
            overwrite,
        });
        Ok(())
    }

    async fn voice_channel_of(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<ChannelId>, PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::VoiceChannelOf)?;
        Ok(inner.guild(guild_id)?.voice.get(&user_id).copied())
    }

    async fn send_reply(
        &self,
        channel_id: ChannelId,
        reply: Reply,
    ) -> Result<(), PlatformError> {
        self.delay().await;
        let mut inner = self.inner.lock().await;
        inner.check(Operation::SendReply)?;
        inner.replies.push((channel_id, reply));
        Ok(())
    }
}
