//! Room lifecycle: create a room when someone joins a creation channel,
//! delete it when the last member leaves.
//!
//! Each voice-state event is checked twice, independently: once for the
//! channel the member joined and once for the channel they left. A single
//! move can trigger both.

use roomkeeper_platform::{
    ChannelInfo, ChannelKind, NewVoiceChannel, OverwriteTarget,
    PermissionOverwrite, Platform, PlatformError,
};
use roomkeeper_protocol::{ChannelId, Member, VoiceStateUpdate};
use roomkeeper_room::RoomRecord;

use crate::bot::{BotState, Ctx};
use crate::config::NAME_PLACEHOLDER;

/// Handles one voice-state event.
pub(crate) async fn on_voice_state_update<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    update: &VoiceStateUpdate,
) {
    // Mute, deafen, and stream toggles arrive with an unchanged channel.
    if update.before == update.after {
        return;
    }

    if let Some(joined) = update.after {
        if let Err(e) = on_join(ctx, state, update, joined).await {
            tracing::warn!(
                channel_id = %joined,
                user_id = %update.member.user_id,
                error = %e,
                "join check failed"
            );
        }
    }

    if let Some(left) = update.before {
        if let Err(e) = on_leave(ctx, state, left).await {
            tracing::warn!(
                channel_id = %left,
                user_id = %update.member.user_id,
                error = %e,
                "leave check failed"
            );
        }
    }
}

/// Returns the name of `channel`'s parent category, if it has one.
async fn parent_category_name<P: Platform>(
    ctx: &Ctx<'_, P>,
    channel: &ChannelInfo,
) -> Result<Option<String>, PlatformError> {
    let Some(parent_id) = channel.parent_id else {
        return Ok(None);
    };
    let Some(parent) = ctx.call(ctx.platform.channel(parent_id)).await? else {
        return Ok(None);
    };
    if parent.kind != ChannelKind::Category {
        return Ok(None);
    }
    Ok(Some(parent.name))
}

// ---------------------------------------------------------------------------
// Absent -> Active
// ---------------------------------------------------------------------------

async fn on_join<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    update: &VoiceStateUpdate,
    joined: ChannelId,
) -> Result<(), PlatformError> {
    let Some(channel) = ctx.call(ctx.platform.channel(joined)).await? else {
        return Ok(());
    };
    if channel.kind != ChannelKind::Voice {
        return Ok(());
    }
    let Some(category) = parent_category_name(ctx, &channel).await? else {
        return Ok(());
    };
    let Some(kind) = state.settings.creation_kind(&category, &channel.name)
    else {
        return Ok(());
    };
    let Some(settings) = state.settings.get(kind) else {
        return Ok(());
    };
    let kind = kind.clone();

    let member = &update.member;
    let request = NewVoiceChannel {
        name: room_name(&ctx.options.room_name_template, member),
        parent_id: channel.parent_id,
        user_limit: settings.default_capacity,
        overwrites: vec![
            (
                OverwriteTarget::Role(update.guild_id.default_role()),
                PermissionOverwrite::deny_connect(),
            ),
            (
                OverwriteTarget::Member(member.user_id),
                PermissionOverwrite::owner(),
            ),
        ],
    };

    let room = ctx
        .call(ctx.platform.create_voice_channel(update.guild_id, request))
        .await?;

    if let Err(e) = ctx
        .call(ctx.platform.move_member(update.guild_id, member.user_id, room.id))
        .await
    {
        tracing::warn!(
            room_id = %room.id,
            user_id = %member.user_id,
            error = %e,
            "failed to move owner into new room, removing it"
        );
        match ctx.call(ctx.platform.delete_channel(room.id)).await {
            Ok(()) => return Ok(()),
            // Keep tracking the room so the next leave event cleans it up.
            Err(e) => tracing::warn!(
                room_id = %room.id,
                error = %e,
                "failed to remove orphaned room"
            ),
        }
    }

    state
        .registry
        .insert(RoomRecord::new(room.id, member.user_id));
    tracing::info!(
        room_id = %room.id,
        owner = %member.user_id,
        %kind,
        name = %room.name,
        "room created"
    );
    Ok(())
}

fn room_name(template: &str, member: &Member) -> String {
    template.replace(NAME_PLACEHOLDER, &member.display_name)
}

// ---------------------------------------------------------------------------
// Active -> Absent
// ---------------------------------------------------------------------------

async fn on_leave<P: Platform>(
    ctx: &Ctx<'_, P>,
    state: &mut BotState,
    left: ChannelId,
) -> Result<(), PlatformError> {
    let Some(channel) = ctx.call(ctx.platform.channel(left)).await? else {
        if state.registry.remove(left).is_some() {
            tracing::info!(room_id = %left, "dropped record of vanished room");
        }
        return Ok(());
    };
    if channel.kind != ChannelKind::Voice || channel.member_count > 0 {
        return Ok(());
    }
    let Some(category) = parent_category_name(ctx, &channel).await? else {
        return Ok(());
    };
    if !state.settings.manages_category(&category)
        || state.settings.creation_kind(&category, &channel.name).is_some()
    {
        return Ok(());
    }

    match ctx.call(ctx.platform.delete_channel(left)).await {
        Ok(()) => {}
        // Already gone.
        Err(PlatformError::ChannelNotFound(_)) => {}
        Err(e) => return Err(e),
    }
    let record = state.registry.remove(left);
    tracing::info!(
        room_id = %left,
        %category,
        owner = ?record.map(|r| r.owner()),
        "room deleted"
    );
    Ok(())
}
