//! Startup reconciliation: make sure every guild has each configured
//! category and its creation channel.
//!
//! Reruns are harmless. Existing structures are found by name and reused.

use roomkeeper_platform::{
    ChannelInfo, NewVoiceChannel, Platform, PlatformError, find_category,
    find_voice_channel,
};
use roomkeeper_protocol::{Capacity, GuildId};
use roomkeeper_room::{CategorySettings, SettingsStore};

use crate::bot::Ctx;

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReconcileReport {
    pub(crate) categories_created: usize,
    pub(crate) channels_created: usize,
    /// (guild, kind) pairs, or whole guilds, that could not be reconciled.
    pub(crate) failures: usize,
}

impl ReconcileReport {
    fn merge(&mut self, other: ReconcileReport) {
        self.categories_created += other.categories_created;
        self.channels_created += other.channels_created;
        self.failures += other.failures;
    }
}

/// Reconciles every guild the bot is in.
pub(crate) async fn reconcile_all<P: Platform>(
    ctx: &Ctx<'_, P>,
    settings: &SettingsStore,
) -> ReconcileReport {
    let guilds = match ctx.call(ctx.platform.guilds()).await {
        Ok(guilds) => guilds,
        Err(e) => {
            tracing::warn!(error = %e, "could not list guilds, skipping bootstrap");
            return ReconcileReport {
                failures: 1,
                ..ReconcileReport::default()
            };
        }
    };

    let mut report = ReconcileReport::default();
    for guild_id in guilds {
        report.merge(reconcile_guild(ctx, settings, guild_id).await);
    }
    report
}

/// Reconciles one guild.
pub(crate) async fn reconcile_guild<P: Platform>(
    ctx: &Ctx<'_, P>,
    settings: &SettingsStore,
    guild_id: GuildId,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut channels = match ctx.call(ctx.platform.channels(guild_id)).await {
        Ok(channels) => channels,
        Err(e) => {
            tracing::warn!(%guild_id, error = %e, "could not list channels");
            report.failures += 1;
            return report;
        }
    };

    for (kind, kind_settings) in settings.iter() {
        if let Err(e) = reconcile_kind(
            ctx,
            guild_id,
            kind_settings,
            &mut channels,
            &mut report,
        )
        .await
        {
            tracing::warn!(%guild_id, %kind, error = %e, "bootstrap failed");
            report.failures += 1;
        }
    }
    report
}

async fn reconcile_kind<P: Platform>(
    ctx: &Ctx<'_, P>,
    guild_id: GuildId,
    settings: &CategorySettings,
    channels: &mut Vec<ChannelInfo>,
    report: &mut ReconcileReport,
) -> Result<(), PlatformError> {
    let category_id = match find_category(channels, &settings.category_name) {
        Some(category) => category.id,
        None => {
            let category = ctx
                .call(ctx.platform.create_category(guild_id, &settings.category_name))
                .await?;
            tracing::info!(
                %guild_id,
                channel_id = %category.id,
                name = %category.name,
                "category created"
            );
            report.categories_created += 1;
            let id = category.id;
            channels.push(category);
            id
        }
    };

    if find_voice_channel(channels, category_id, &settings.creation_channel_name)
        .is_some()
    {
        return Ok(());
    }

    let channel = ctx
        .call(ctx.platform.create_voice_channel(
            guild_id,
            NewVoiceChannel {
                name: settings.creation_channel_name.clone(),
                parent_id: Some(category_id),
                user_limit: Capacity::UNLIMITED,
                overwrites: Vec::new(),
            },
        ))
        .await?;
    tracing::info!(
        %guild_id,
        channel_id = %channel.id,
        name = %channel.name,
        "creation channel created"
    );
    report.channels_created += 1;
    channels.push(channel);
    Ok(())
}
