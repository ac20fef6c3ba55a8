//! Text commands: admin settings and room-owner controls.
//!
//! Every command ends in exactly one reply. Failures are caught here and
//! rendered as text; only unknown commands are dropped silently.

use roomkeeper_platform::{
    OverwriteTarget, PermissionOverwrite, Platform, PlatformError,
};
use roomkeeper_protocol::{
    Capacity, Command, Embed, EmbedField, GuildId, Member,
    MessageCreate, ProtocolError, Reply, UserId,
};
use roomkeeper_room::{RoomError, SettingsStore};

use crate::RoomkeeperError;
use crate::bot::{BotState, Ctx};

/// Handles a chat message: parse, execute, reply.
pub(crate) async fn on_message<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    message: &MessageCreate,
) {
    let command = match Command::parse(&ctx.options.prefix, &message.content) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(ProtocolError::UnknownCommand(name)) => {
            tracing::debug!(
                command = %name,
                user_id = %message.author.user_id,
                "ignoring unknown command"
            );
            return;
        }
        Err(e) => {
            let reply =
                render_error(&ctx.options.prefix, &RoomkeeperError::from(e));
            respond(ctx, message, reply).await;
            return;
        }
    };

    tracing::debug!(
        command = command.name(),
        user_id = %message.author.user_id,
        guild_id = %message.guild_id,
        "command received"
    );

    let reply =
        match execute(ctx, state, message.guild_id, &message.author, command)
            .await
        {
            Ok(reply) => reply,
            Err(e) => render_error(&ctx.options.prefix, &e),
        };
    respond(ctx, message, reply).await;
}

async fn respond<P: Platform>(
    ctx: &Ctx<'_, P>,
    message: &MessageCreate,
    reply: Reply,
) {
    if let Err(e) = ctx
        .call(ctx.platform.send_reply(message.channel_id, reply))
        .await
    {
        tracing::warn!(
            channel_id = %message.channel_id,
            error = %e,
            "failed to send reply"
        );
    }
}

/// Runs a parsed command on behalf of `invoker`.
pub(crate) async fn execute<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    guild_id: GuildId,
    invoker: &Member,
    command: Command,
) -> Result<Reply, RoomkeeperError> {
    match command {
        Command::SetTempChannelName { kind, name } => {
            state.settings.set_creation_channel_name(&kind, name.as_str())?;
            tracing::info!(%kind, %name, "creation channel name changed");
            Ok(Reply::text(format!(
                "Creation channel for `{kind}` is now **{name}**."
            )))
        }
        Command::SetCategoryName { kind, name } => {
            state.settings.set_category_name(&kind, name.as_str())?;
            tracing::info!(%kind, %name, "category name changed");
            Ok(Reply::text(format!(
                "Category for `{kind}` is now **{name}**."
            )))
        }
        Command::SetDefaultCapacity { kind, limit } => {
            let capacity = state.settings.set_default_capacity(&kind, limit)?;
            tracing::info!(%kind, %capacity, "default capacity changed");
            Ok(Reply::text(format!(
                "New `{kind}` rooms will have a limit of {}.",
                describe_capacity(capacity)
            )))
        }
        Command::ShowSettings => Ok(Reply::Embed(settings_embed(&state.settings))),
        Command::SetCapacity { limit } => {
            set_capacity(ctx, state, guild_id, invoker.user_id, limit).await
        }
        Command::SetPrivate => set_privacy(ctx, state, invoker.user_id, true).await,
        Command::SetPublic => set_privacy(ctx, state, invoker.user_id, false).await,
        Command::Allow { user } => allow(ctx, state, invoker.user_id, user).await,
    }
}

async fn set_capacity<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    guild_id: GuildId,
    invoker: UserId,
    limit: i64,
) -> Result<Reply, RoomkeeperError> {
    let room_id = state.registry.owned_by(invoker)?.room_id();
    let capacity =
        Capacity::new(limit).ok_or(RoomError::CapacityOutOfRange(limit))?;

    let current = ctx
        .call(ctx.platform.voice_channel_of(guild_id, invoker))
        .await?;
    if current != Some(room_id) {
        return Err(RoomError::NotInOwnRoom(invoker).into());
    }

    ctx.call(ctx.platform.edit_user_limit(room_id, capacity))
        .await?;
    tracing::info!(%room_id, owner = %invoker, %capacity, "room capacity changed");
    Ok(Reply::text(format!(
        "Room limit set to {}.",
        describe_capacity(capacity)
    )))
}

async fn set_privacy<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    invoker: UserId,
    private: bool,
) -> Result<Reply, RoomkeeperError> {
    let record = state.registry.owned_by_mut(invoker)?;
    let room_id = record.room_id();
    // The room's own guild, which owns the default role being edited.
    let guild_id = ctx
        .call(ctx.platform.channel(room_id))
        .await?
        .map(|c| c.guild_id)
        .ok_or(PlatformError::ChannelNotFound(room_id))?;

    let overwrite = if private {
        PermissionOverwrite::deny_connect()
    } else {
        PermissionOverwrite::allow_connect()
    };
    ctx.call(ctx.platform.set_permission(
        room_id,
        OverwriteTarget::Role(guild_id.default_role()),
        overwrite,
    ))
    .await?;

    record.set_private(private);
    tracing::info!(%room_id, owner = %invoker, private, "room privacy changed");
    Ok(Reply::text(if private {
        "Your room is now private."
    } else {
        "Your room is now public."
    }))
}

async fn allow<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    invoker: UserId,
    user: UserId,
) -> Result<Reply, RoomkeeperError> {
    let record = state.registry.owned_by_mut(invoker)?;
    let room_id = record.room_id();

    ctx.call(ctx.platform.set_permission(
        room_id,
        OverwriteTarget::Member(user),
        PermissionOverwrite::allow_connect(),
    ))
    .await?;

    record.allow(user);
    tracing::info!(%room_id, owner = %invoker, allowed = %user, "member allowed into room");
    Ok(Reply::text(format!("<@{}> can now join your room.", user.0)))
}

fn describe_capacity(capacity: Capacity) -> String {
    if capacity.is_unlimited() {
        "unlimited".to_string()
    } else {
        capacity.to_string()
    }
}

fn settings_embed(settings: &SettingsStore) -> Embed {
    Embed {
        title: "Room settings".to_string(),
        fields: settings
            .iter()
            .map(|(kind, s)| EmbedField {
                name: kind.to_string(),
                value: format!(
                    "Category: {}\nCreation channel: {}\nDefault limit: {}",
                    s.category_name,
                    s.creation_channel_name,
                    describe_capacity(s.default_capacity)
                ),
                inline: false,
            })
            .collect(),
    }
}

/// The reply shown to the user for a failed command.
pub(crate) fn render_error(prefix: &str, error: &RoomkeeperError) -> Reply {
    let text = match error {
        RoomkeeperError::Protocol(ProtocolError::MalformedArguments {
            usage, ..
        }) => format!("Usage: `{prefix}{usage}`"),
        RoomkeeperError::Room(RoomError::UnknownCategoryKind(kind)) => {
            format!("Unknown category kind `{kind}`.")
        }
        RoomkeeperError::Room(RoomError::CapacityOutOfRange(_)) => {
            format!("Capacity must be between 0 and {}.", Capacity::MAX)
        }
        RoomkeeperError::Room(RoomError::NotOwner(_)) => {
            "You don't own a room.".to_string()
        }
        RoomkeeperError::Room(RoomError::NotInOwnRoom(_)) => {
            "You must be in your own room.".to_string()
        }
        RoomkeeperError::Platform(e) => {
            tracing::warn!(error = %e, "platform call failed during command");
            "Something went wrong talking to the server, try again.".to_string()
        }
        other => other.to_string(),
    };
    Reply::text(text)
}
