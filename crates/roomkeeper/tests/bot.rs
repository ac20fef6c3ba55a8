//! End-to-end tests: a bot driven by gateway events against a simulated
//! guild.

use std::sync::Arc;
use std::time::Duration;

use roomkeeper::{Bot, BotConfig, RoomkeeperError};
use roomkeeper_platform::{
    ChannelKind, MemoryPlatform, Operation, OverwriteTarget,
    PermissionOverwrite, Platform, PlatformCall, PlatformError,
    find_category, find_voice_channel,
};
use roomkeeper_protocol::{
    Capacity, CategoryKind, ChannelId, Command, GatewayEvent, GuildId,
    Member, MessageCreate, Reply, UserId,
};
use roomkeeper_room::{CategorySettings, RoomError};

const GUILD: GuildId = GuildId(1);
const TEXT: ChannelId = ChannelId(42);

fn member(id: u64, name: &str) -> Member {
    Member {
        user_id: UserId(id),
        display_name: name.into(),
    }
}

// =========================================================================
// Harness: one guild with the default "gaming" kind already set up.
// =========================================================================

struct Harness {
    platform: Arc<MemoryPlatform>,
    bot: Bot<MemoryPlatform>,
    category: ChannelId,
    creation: ChannelId,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(BotConfig::default()).await
    }

    async fn with_config(config: BotConfig) -> Self {
        let platform = Arc::new(MemoryPlatform::new().with_guild(GUILD));
        let category = platform.seed_category(GUILD, "Gaming").await.unwrap();
        let creation = platform
            .seed_voice_channel(GUILD, Some(category), "Create-Talk")
            .await
            .unwrap();
        let bot = Bot::builder()
            .config(config)
            .build(Arc::clone(&platform))
            .unwrap();
        Self {
            platform,
            bot,
            category,
            creation,
        }
    }

    /// Moves `who` on the platform, delivers the event, then delivers any
    /// events the bot's own platform calls produced.
    async fn voice(&mut self, who: &Member, to: Option<ChannelId>) {
        let update = self.platform.connect(GUILD, who.clone(), to).await.unwrap();
        self.bot
            .handle_event(GatewayEvent::VoiceStateUpdate(update))
            .await;
        self.pump().await;
    }

    async fn pump(&mut self) {
        loop {
            let events = self.platform.take_events().await;
            if events.is_empty() {
                break;
            }
            for event in events {
                self.bot.handle_event(event).await;
            }
        }
    }

    async fn say(&mut self, who: &Member, content: &str) -> Option<Reply> {
        let before = self.platform.replies().await.len();
        self.bot
            .handle_event(GatewayEvent::MessageCreate(MessageCreate {
                guild_id: GUILD,
                channel_id: TEXT,
                author: who.clone(),
                content: content.into(),
            }))
            .await;
        let replies = self.platform.replies().await;
        assert!(replies.len() <= before + 1, "at most one reply per message");
        replies.get(before).map(|(channel, reply)| {
            assert_eq!(*channel, TEXT);
            reply.clone()
        })
    }

    async fn run(
        &mut self,
        who: &Member,
        command: Command,
    ) -> Result<Reply, RoomkeeperError> {
        self.bot.execute(GUILD, who, command).await
    }

    /// The room owned by `user`.
    fn room_of(&self, user: UserId) -> ChannelId {
        self.bot
            .state()
            .registry
            .owned_by(user)
            .unwrap()
            .room_id()
    }

    async fn location(&self, user: UserId) -> Option<ChannelId> {
        self.platform.voice_channel_of(GUILD, user).await.unwrap()
    }
}

/// The default config plus a "music" kind.
fn with_music(category_name: &str, capacity: i64) -> BotConfig {
    let mut config = BotConfig::default();
    config.categories.insert(
        CategoryKind::new("music"),
        CategorySettings {
            category_name: category_name.into(),
            creation_channel_name: "Create-Jam".into(),
            default_capacity: Capacity::new(capacity).unwrap(),
        },
    );
    config
}

fn assert_not_owner(result: Result<Reply, RoomkeeperError>) {
    assert!(
        matches!(result, Err(RoomkeeperError::Room(RoomError::NotOwner(_)))),
        "expected NotOwner, got {result:?}"
    );
}

// =========================================================================
// Room lifecycle
// =========================================================================

#[tokio::test]
async fn test_joining_creation_channel_creates_owned_room() {
    let mut h = Harness::new().await;
    let u = member(10, "U");

    h.voice(&u, Some(h.creation)).await;

    let registry = &h.bot.state().registry;
    assert_eq!(registry.len(), 1);
    let record = registry.owned_by(u.user_id).unwrap();
    assert!(!record.is_private());
    assert!(record.allowed_users().is_empty());

    let room = h.platform.channel(record.room_id()).await.unwrap().unwrap();
    assert_eq!(room.name, "Room U");
    assert_eq!(room.kind, ChannelKind::Voice);
    assert_eq!(room.parent_id, Some(h.category));
    assert_eq!(room.user_limit, Capacity::new(5).unwrap());
    assert_eq!(h.location(u.user_id).await, Some(room.id));
}

#[tokio::test]
async fn test_new_room_is_created_with_owner_overwrites() {
    let mut h = Harness::new().await;
    let u = member(10, "U");

    h.voice(&u, Some(h.creation)).await;

    let room = h.room_of(u.user_id);
    assert_eq!(
        h.platform.overwrites(room).await,
        vec![
            (
                OverwriteTarget::Role(GUILD.default_role()),
                PermissionOverwrite::deny_connect()
            ),
            (OverwriteTarget::Member(u.user_id), PermissionOverwrite::owner()),
        ]
    );
    let calls = h.platform.calls().await;
    assert!(matches!(calls[0], PlatformCall::CreateVoiceChannel { .. }));
    assert_eq!(
        calls[1],
        PlatformCall::MoveMember {
            guild_id: GUILD,
            user_id: u.user_id,
            channel_id: room,
        }
    );
    assert_eq!(calls.len(), 2);
}

#[tokio::test]
async fn test_room_name_follows_template() {
    let mut config = BotConfig::default();
    config.room_name_template = "{name}'s lounge".into();
    let mut h = Harness::with_config(config).await;
    let u = member(10, "ann");

    h.voice(&u, Some(h.creation)).await;

    let room = h.platform.channel(h.room_of(u.user_id)).await.unwrap().unwrap();
    assert_eq!(room.name, "ann's lounge");
}

#[tokio::test]
async fn test_draining_room_deletes_it() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);

    h.voice(&u, None).await;

    assert!(h.bot.state().registry.is_empty());
    assert_eq!(h.platform.channel(room).await.unwrap(), None);
    assert!(
        h.platform
            .calls()
            .await
            .contains(&PlatformCall::DeleteChannel { channel_id: room })
    );
}

#[tokio::test]
async fn test_room_survives_while_occupied() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    let v = member(20, "V");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    h.voice(&v, Some(room)).await;

    h.voice(&u, None).await;

    assert!(h.bot.state().registry.contains(room));
    assert!(h.platform.channel(room).await.unwrap().is_some());

    h.voice(&v, None).await;
    assert!(h.bot.state().registry.is_empty());
}

#[tokio::test]
async fn test_leaving_creation_channel_never_deletes_it() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.platform.fail_next(Operation::CreateVoiceChannel).await;
    h.voice(&u, Some(h.creation)).await;

    h.voice(&u, None).await;

    assert!(h.platform.channel(h.creation).await.unwrap().is_some());
    assert!(h.platform.calls().await.is_empty());
}

#[tokio::test]
async fn test_unmanaged_channels_are_ignored() {
    let mut h = Harness::new().await;
    let other = h.platform.seed_category(GUILD, "Off-topic").await.unwrap();
    let lounge = h
        .platform
        .seed_voice_channel(GUILD, Some(other), "Create-Talk")
        .await
        .unwrap();
    let u = member(10, "U");

    h.voice(&u, Some(lounge)).await;
    h.voice(&u, None).await;

    assert!(h.bot.state().registry.is_empty());
    assert!(h.platform.calls().await.is_empty());
}

#[tokio::test]
async fn test_leaving_room_for_creation_channel_swaps_rooms() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let first = h.room_of(u.user_id);

    h.voice(&u, Some(h.creation)).await;

    let second = h.room_of(u.user_id);
    assert_ne!(first, second);
    assert_eq!(h.bot.state().registry.len(), 1);
    assert_eq!(h.platform.channel(first).await.unwrap(), None);
    assert_eq!(h.location(u.user_id).await, Some(second));
}

#[tokio::test]
async fn test_same_channel_update_is_ignored() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    let calls = h.platform.calls().await.len();

    // A mute toggle: the member stays where they are.
    h.voice(&u, Some(room)).await;

    assert_eq!(h.platform.calls().await.len(), calls);
    assert_eq!(h.bot.state().registry.len(), 1);
}

#[tokio::test]
async fn test_failed_create_leaves_no_record() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.platform.fail_next(Operation::CreateVoiceChannel).await;

    h.voice(&u, Some(h.creation)).await;

    assert!(h.bot.state().registry.is_empty());
    assert_eq!(h.location(u.user_id).await, Some(h.creation));
}

#[tokio::test]
async fn test_failed_move_removes_new_room() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.platform.fail_next(Operation::MoveMember).await;

    h.voice(&u, Some(h.creation)).await;

    assert!(h.bot.state().registry.is_empty());
    assert_eq!(h.location(u.user_id).await, Some(h.creation));
    let calls = h.platform.calls().await;
    let PlatformCall::CreateVoiceChannel { channel_id, .. } = &calls[0] else {
        panic!("expected a create call, got {calls:?}");
    };
    let channel_id = *channel_id;
    assert_eq!(calls[1], PlatformCall::DeleteChannel { channel_id });
    assert_eq!(h.platform.channel(channel_id).await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_move_and_cleanup_keeps_tracking_room() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.platform.fail_next(Operation::MoveMember).await;
    h.platform.fail_next(Operation::DeleteChannel).await;

    h.voice(&u, Some(h.creation)).await;

    let room = h.room_of(u.user_id);
    assert!(h.platform.channel(room).await.unwrap().is_some());

    // The next time anyone passes through, the empty room goes away.
    let v = member(20, "V");
    h.voice(&v, Some(room)).await;
    h.voice(&v, None).await;
    assert!(h.bot.state().registry.is_empty());
    assert_eq!(h.platform.channel(room).await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_delete_retains_record() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    h.platform.fail_next(Operation::DeleteChannel).await;

    h.voice(&u, None).await;

    assert!(h.bot.state().registry.contains(room));
    assert!(h.platform.channel(room).await.unwrap().is_some());
}

#[tokio::test]
async fn test_vanished_room_record_is_dropped() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);

    // Someone deletes the room by hand; the platform disconnects U.
    h.platform.delete_channel(room).await.unwrap();
    h.pump().await;

    assert!(h.bot.state().registry.is_empty());
}

#[tokio::test]
async fn test_room_gone_before_cleanup_drops_record() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    h.platform
        .fail_next_with(
            Operation::DeleteChannel,
            PlatformError::ChannelNotFound(room),
        )
        .await;

    h.voice(&u, None).await;

    assert!(h.bot.state().registry.is_empty());
}

#[tokio::test]
async fn test_each_kind_creates_rooms_in_its_own_category() {
    let mut h = Harness::with_config(with_music("Music", 4)).await;
    h.bot.handle_event(GatewayEvent::Ready).await;
    h.pump().await;
    let channels = h.platform.channels(GUILD).await.unwrap();
    let music = find_category(&channels, "Music").unwrap().id;
    let jam = find_voice_channel(&channels, music, "Create-Jam").unwrap().id;
    let u = member(10, "U");

    h.voice(&u, Some(jam)).await;

    let room_id = h.room_of(u.user_id);
    let room = h.platform.channel(room_id).await.unwrap().unwrap();
    assert_eq!(room.parent_id, Some(music));
    assert_eq!(room.user_limit, Capacity::new(4).unwrap());
    assert_eq!(h.location(u.user_id).await, Some(room_id));

    h.voice(&u, None).await;

    assert!(h.bot.state().registry.is_empty());
    assert_eq!(h.platform.channel(room_id).await.unwrap(), None);
    assert!(h.platform.channel(jam).await.unwrap().is_some());
    let gaming: Vec<_> = h
        .platform
        .channels(GUILD)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.parent_id == Some(h.category))
        .map(|c| c.id)
        .collect();
    assert_eq!(gaming, vec![h.creation]);
}

#[tokio::test]
async fn test_kinds_sharing_a_category_each_keep_their_creation_channel() {
    let mut h = Harness::with_config(with_music("Gaming", 4)).await;
    let jam = h
        .platform
        .seed_voice_channel(GUILD, Some(h.category), "Create-Jam")
        .await
        .unwrap();
    let u = member(10, "U");
    let v = member(20, "V");

    h.voice(&u, Some(jam)).await;
    h.voice(&v, Some(h.creation)).await;

    let jam_room = h.platform.channel(h.room_of(u.user_id)).await.unwrap().unwrap();
    let talk_room = h.platform.channel(h.room_of(v.user_id)).await.unwrap().unwrap();
    assert_eq!(jam_room.user_limit, Capacity::new(4).unwrap());
    assert_eq!(talk_room.user_limit, Capacity::new(5).unwrap());

    h.voice(&u, None).await;
    h.voice(&v, None).await;

    assert!(h.bot.state().registry.is_empty());
    assert!(h.platform.channel(jam).await.unwrap().is_some());
    assert!(h.platform.channel(h.creation).await.unwrap().is_some());
}

#[tokio::test]
async fn test_renamed_category_shared_with_another_kind() {
    let mut h = Harness::with_config(with_music("Music", 4)).await;
    let admin = member(1, "admin");
    h.say(&admin, "!set-category-name music Gaming").await.unwrap();
    h.bot.handle_event(GatewayEvent::Ready).await;
    h.pump().await;
    let channels = h.platform.channels(GUILD).await.unwrap();
    let jam = find_voice_channel(&channels, h.category, "Create-Jam")
        .unwrap()
        .id;
    let u = member(10, "U");

    h.voice(&u, Some(jam)).await;
    assert_eq!(h.bot.state().registry.len(), 1);

    h.voice(&u, None).await;
    assert!(h.bot.state().registry.is_empty());
    assert!(h.platform.channel(jam).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_slow_platform_times_out_without_state_change() {
    let mut config = BotConfig::default();
    config.platform_timeout_secs = 1;
    let mut h = Harness::with_config(config).await;
    h.platform.set_latency(Some(Duration::from_secs(30))).await;
    let u = member(10, "U");

    h.voice(&u, Some(h.creation)).await;

    assert!(h.bot.state().registry.is_empty());
    assert!(h.platform.calls().await.is_empty());
}

// =========================================================================
// Owner commands
// =========================================================================

#[tokio::test]
async fn test_owner_commands_require_a_room() {
    let mut h = Harness::new().await;
    let u = member(10, "U");

    for command in [
        Command::SetCapacity { limit: 3 },
        Command::SetPrivate,
        Command::SetPublic,
        Command::Allow { user: UserId(20) },
    ] {
        assert_not_owner(h.run(&u, command).await);
    }
    assert!(h.platform.calls().await.is_empty());
}

#[tokio::test]
async fn test_set_private_twice_equals_once() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    h.run(&u, Command::SetPublic).await.unwrap();

    h.run(&u, Command::SetPrivate).await.unwrap();
    let once = h.platform.overwrites(room).await;
    h.run(&u, Command::SetPrivate).await.unwrap();
    let twice = h.platform.overwrites(room).await;

    assert_eq!(once, twice);
    assert!(h.bot.state().registry.get(room).unwrap().is_private());
    assert!(once.contains(&(
        OverwriteTarget::Role(GUILD.default_role()),
        PermissionOverwrite::deny_connect()
    )));
}

#[tokio::test]
async fn test_set_public_opens_room() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    h.run(&u, Command::SetPrivate).await.unwrap();

    let reply = h.run(&u, Command::SetPublic).await.unwrap();

    assert_eq!(reply.as_text(), Some("Your room is now public."));
    assert!(!h.bot.state().registry.get(room).unwrap().is_private());
    assert!(h.platform.overwrites(room).await.contains(&(
        OverwriteTarget::Role(GUILD.default_role()),
        PermissionOverwrite::allow_connect()
    )));
}

#[tokio::test]
async fn test_failed_permission_call_leaves_privacy_unchanged() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    h.platform.fail_next(Operation::SetPermission).await;

    let result = h.run(&u, Command::SetPrivate).await;

    assert!(matches!(result, Err(RoomkeeperError::Platform(_))));
    assert!(!h.bot.state().registry.get(room).unwrap().is_private());
}

#[tokio::test]
async fn test_allow_mention_grants_connect() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);

    let reply = h.say(&u, "!allow <@20>").await.unwrap();

    assert_eq!(reply.as_text(), Some("<@20> can now join your room."));
    let record = h.bot.state().registry.get(room).unwrap();
    assert!(record.allowed_users().contains(&UserId(20)));
    assert!(h.platform.calls().await.contains(&PlatformCall::SetPermission {
        channel_id: room,
        target: OverwriteTarget::Member(UserId(20)),
        overwrite: PermissionOverwrite::allow_connect(),
    }));
}

#[tokio::test]
async fn test_set_capacity_edits_own_room() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);

    let reply = h.say(&u, "!set-capacity 3").await.unwrap();

    assert_eq!(reply.as_text(), Some("Room limit set to 3."));
    let info = h.platform.channel(room).await.unwrap().unwrap();
    assert_eq!(info.user_limit.get(), 3);
}

#[tokio::test]
async fn test_set_capacity_rejects_out_of_range() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let calls = h.platform.calls().await.len();

    for limit in [-1, 100] {
        let result = h.run(&u, Command::SetCapacity { limit }).await;
        assert!(matches!(
            result,
            Err(RoomkeeperError::Room(RoomError::CapacityOutOfRange(l))) if l == limit
        ));
    }
    assert_eq!(h.platform.calls().await.len(), calls);
}

#[tokio::test]
async fn test_set_capacity_requires_being_in_own_room() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    let v = member(20, "V");
    let lobby = h.platform.seed_voice_channel(GUILD, None, "Lobby").await.unwrap();
    h.voice(&u, Some(h.creation)).await;
    let room = h.room_of(u.user_id);
    // V keeps the room alive while U steps out.
    h.voice(&v, Some(room)).await;
    h.voice(&u, Some(lobby)).await;

    let result = h.run(&u, Command::SetCapacity { limit: 3 }).await;

    assert!(matches!(
        result,
        Err(RoomkeeperError::Room(RoomError::NotInOwnRoom(_)))
    ));
    let reply = h.say(&u, "!setlimit 3").await.unwrap();
    assert_eq!(reply.as_text(), Some("You must be in your own room."));
}

// =========================================================================
// Admin commands and message handling
// =========================================================================

#[tokio::test]
async fn test_default_capacity_applies_to_new_rooms() {
    let mut h = Harness::new().await;
    let admin = member(1, "admin");

    let reply = h.say(&admin, "!set-default-capacity gaming 8").await.unwrap();
    assert_eq!(
        reply.as_text(),
        Some("New `gaming` rooms will have a limit of 8.")
    );

    let u = member(10, "U");
    h.voice(&u, Some(h.creation)).await;
    let room = h.platform.channel(h.room_of(u.user_id)).await.unwrap().unwrap();
    assert_eq!(room.user_limit.get(), 8);
}

#[tokio::test]
async fn test_default_capacity_errors_leave_settings_unchanged() {
    let mut h = Harness::new().await;
    let admin = member(1, "admin");
    let before = h.bot.state().settings.clone();

    let unknown = h.say(&admin, "!set-default-capacity sports 5").await.unwrap();
    assert_eq!(unknown.as_text(), Some("Unknown category kind `sports`."));
    let unknown = h.say(&admin, "!set-default-capacity sports 500").await.unwrap();
    assert_eq!(unknown.as_text(), Some("Unknown category kind `sports`."));
    let range = h.say(&admin, "!setdefaultlimit gaming 100").await.unwrap();
    assert_eq!(range.as_text(), Some("Capacity must be between 0 and 99."));

    assert_eq!(h.bot.state().settings, before);
}

#[tokio::test]
async fn test_renamed_creation_channel_moves_the_trigger() {
    let mut h = Harness::new().await;
    let admin = member(1, "admin");
    h.say(&admin, "!set-temp-channel-name gaming New Room").await.unwrap();
    let renamed = h
        .platform
        .seed_voice_channel(GUILD, Some(h.category), "New Room")
        .await
        .unwrap();
    let u = member(10, "U");

    h.voice(&u, Some(h.creation)).await;
    assert!(h.bot.state().registry.is_empty());

    h.voice(&u, Some(renamed)).await;
    assert_eq!(h.bot.state().registry.len(), 1);
}

#[tokio::test]
async fn test_show_settings_lists_every_kind() {
    let mut h = Harness::new().await;
    let admin = member(1, "admin");

    let reply = h.say(&admin, "!settings").await.unwrap();

    let Reply::Embed(embed) = reply else {
        panic!("expected an embed, got {reply:?}");
    };
    assert_eq!(embed.fields.len(), 1);
    assert_eq!(embed.fields[0].name, "gaming");
    assert!(embed.fields[0].value.contains("Create-Talk"));
}

#[tokio::test]
async fn test_non_commands_and_unknown_commands_get_no_reply() {
    let mut h = Harness::new().await;
    let u = member(10, "U");

    assert_eq!(h.say(&u, "hello everyone").await, None);
    assert_eq!(h.say(&u, "!dance").await, None);
}

#[tokio::test]
async fn test_malformed_command_gets_usage() {
    let mut h = Harness::new().await;
    let u = member(10, "U");

    let reply = h.say(&u, "!set-capacity lots").await.unwrap();

    assert_eq!(reply.as_text(), Some("Usage: `!set-capacity <0-99>`"));
}

#[tokio::test]
async fn test_not_owner_reply_over_chat() {
    let mut h = Harness::new().await;
    let u = member(10, "U");

    let reply = h.say(&u, "!private").await.unwrap();

    assert_eq!(reply.as_text(), Some("You don't own a room."));
}

// =========================================================================
// Bootstrap
// =========================================================================

#[tokio::test]
async fn test_bootstrap_creates_missing_structure_once() {
    let platform = Arc::new(
        MemoryPlatform::new()
            .with_guild(GUILD)
            .with_guild(GuildId(2)),
    );
    let mut bot = Bot::builder()
        .config(BotConfig::default())
        .build(Arc::clone(&platform))
        .unwrap();

    bot.handle_event(GatewayEvent::Ready).await;
    bot.handle_event(GatewayEvent::Ready).await;
    bot.handle_event(GatewayEvent::GuildAvailable { guild_id: GuildId(2) })
        .await;

    for guild in [GUILD, GuildId(2)] {
        let channels = platform.channels(guild).await.unwrap();
        assert_eq!(channels.len(), 2);
        let category = find_category(&channels, "Gaming").unwrap();
        let creation =
            find_voice_channel(&channels, category.id, "Create-Talk").unwrap();
        assert!(creation.user_limit.is_unlimited());
    }
    assert_eq!(platform.calls().await.len(), 4);
}

#[tokio::test]
async fn test_bootstrap_continues_after_a_failure() {
    let platform = Arc::new(
        MemoryPlatform::new()
            .with_guild(GUILD)
            .with_guild(GuildId(2)),
    );
    platform.fail_next(Operation::CreateCategory).await;
    let mut bot = Bot::builder()
        .build(Arc::clone(&platform))
        .unwrap();

    bot.handle_event(GatewayEvent::Ready).await;

    // The first guild failed, the second was set up.
    assert!(platform.channels(GUILD).await.unwrap().is_empty());
    assert_eq!(platform.channels(GuildId(2)).await.unwrap().len(), 2);

    bot.handle_event(GatewayEvent::GuildAvailable { guild_id: GUILD })
        .await;
    assert_eq!(platform.channels(GUILD).await.unwrap().len(), 2);
}

// =========================================================================
// Event loop
// =========================================================================

#[tokio::test]
async fn test_spawned_bot_bootstraps_then_creates_rooms() {
    let platform = Arc::new(MemoryPlatform::new().with_guild(GUILD));
    let bot = Bot::builder().build(Arc::clone(&platform)).unwrap();
    let (handle, task) = bot.spawn();

    handle.send(GatewayEvent::Ready).await.unwrap();
    drop(handle);
    task.await.unwrap();

    let channels = platform.channels(GUILD).await.unwrap();
    let category = find_category(&channels, "Gaming").unwrap().id;
    let creation = find_voice_channel(&channels, category, "Create-Talk")
        .unwrap()
        .id;

    let bot = Bot::builder().build(Arc::clone(&platform)).unwrap();
    let (handle, task) = bot.spawn();
    let u = member(10, "U");
    let update = platform.connect(GUILD, u.clone(), Some(creation)).await.unwrap();
    handle
        .send(GatewayEvent::VoiceStateUpdate(update))
        .await
        .unwrap();
    drop(handle);

    let state = task.await.unwrap();
    assert_eq!(state.registry.len(), 1);
    assert!(state.registry.owned_by(u.user_id).is_ok());
}

#[tokio::test]
async fn test_send_after_stop_fails() {
    let platform = Arc::new(MemoryPlatform::new());
    let bot = Bot::builder().build(platform).unwrap();
    let (handle, task) = bot.spawn();
    task.abort();
    let _ = task.await;

    let result = handle.send(GatewayEvent::Ready).await;
    assert!(matches!(result, Err(RoomkeeperError::Stopped)));
}

#[tokio::test]
async fn test_json_gateway_events_drive_the_bot() {
    let mut h = Harness::new().await;
    let u = member(10, "U");
    h.platform.connect(GUILD, u.clone(), Some(h.creation)).await.unwrap();

    let raw = format!(
        r#"{{"type": "VoiceStateUpdate", "guild_id": 1,
            "member": {{"user_id": 10, "display_name": "U"}},
            "after": {}}}"#,
        h.creation.0
    );
    let event: GatewayEvent = serde_json::from_str(&raw).unwrap();
    h.bot.handle_event(event).await;
    h.pump().await;

    assert_eq!(h.bot.state().registry.len(), 1);
    assert_ne!(h.location(u.user_id).await, Some(h.creation));
}
