//! `Bot` builder and event loop.
//!
//! The bot owns all mutable state (settings and room registry) and
//! processes gateway events one at a time from a single channel. Handlers
//! may await platform calls, but no second handler runs in the meantime,
//! so the state needs no locks.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use roomkeeper_platform::{Platform, PlatformError};
use roomkeeper_protocol::{Command, GatewayEvent, GuildId, Member, Reply};
use roomkeeper_room::{RoomRegistry, SettingsStore};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{BotConfig, ConfigError};
use crate::{RoomkeeperError, bootstrap, commands, lifecycle};

/// Buffered events between the gateway pump and the bot.
const EVENT_CHANNEL_SIZE: usize = 256;

/// Everything the bot mutates.
#[derive(Debug, Default)]
pub struct BotState {
    pub settings: SettingsStore,
    pub registry: RoomRegistry,
}

/// Options fixed for the bot's lifetime.
#[derive(Debug, Clone)]
pub(crate) struct BotOptions {
    pub(crate) prefix: String,
    pub(crate) room_name_template: String,
    pub(crate) platform_timeout: Duration,
}

/// What a handler needs besides the state: the platform and the options.
pub(crate) struct Ctx<'a, P: Platform> {
    pub(crate) platform: &'a P,
    pub(crate) options: &'a BotOptions,
}

impl<P: Platform> Ctx<'_, P> {
    /// Awaits a platform call, bounded by the configured timeout.
    pub(crate) async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, PlatformError>>,
    ) -> Result<T, PlatformError> {
        let limit = self.options.platform_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(PlatformError::Timeout(limit)),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring a [`Bot`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use roomkeeper::prelude::*;
///
/// # async fn demo() -> Result<(), RoomkeeperError> {
/// let config = BotConfig::load("roomkeeper.toml")?;
/// let platform = Arc::new(MemoryPlatform::new());
/// let bot = Bot::builder().config(config).build(platform)?;
/// let (handle, _task) = bot.spawn();
/// handle.send(GatewayEvent::Ready).await?;
/// # Ok(())
/// # }
/// ```
pub struct BotBuilder<P: Platform> {
    config: BotConfig,
    platform_timeout: Option<Duration>,
    _platform: PhantomData<fn() -> P>,
}

impl<P: Platform> BotBuilder<P> {
    /// Creates a builder with [`BotConfig::default`].
    pub fn new() -> Self {
        Self {
            config: BotConfig::default(),
            platform_timeout: None,
            _platform: PhantomData,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the command prefix.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.config.prefix = prefix.to_string();
        self
    }

    /// Sets the per-call platform timeout, overriding
    /// `platform_timeout_secs` from the config. Must be non-zero.
    pub fn platform_timeout(mut self, timeout: Duration) -> Self {
        self.platform_timeout = Some(timeout);
        self
    }

    /// Validates the configuration and builds the bot.
    pub fn build(
        self,
        platform: Arc<P>,
    ) -> Result<Bot<P>, RoomkeeperError> {
        self.config.validate()?;
        let platform_timeout = match self.platform_timeout {
            Some(timeout) if timeout.is_zero() => {
                return Err(ConfigError::Invalid(
                    "platform timeout must be non-zero".into(),
                )
                .into());
            }
            Some(timeout) => timeout,
            None => self.config.platform_timeout(),
        };
        let options = BotOptions {
            prefix: self.config.prefix.clone(),
            room_name_template: self.config.room_name_template.clone(),
            platform_timeout,
        };
        Ok(Bot {
            platform,
            state: BotState {
                settings: self.config.settings_store(),
                registry: RoomRegistry::new(),
            },
            options,
        })
    }
}

impl<P: Platform> Default for BotBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// The room bot. Feed it [`GatewayEvent`]s.
pub struct Bot<P: Platform> {
    platform: Arc<P>,
    state: BotState,
    options: BotOptions,
}

impl<P: Platform> Bot<P> {
    /// Creates a new builder.
    pub fn builder() -> BotBuilder<P> {
        BotBuilder::new()
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Handles one event to completion. Never fails: errors are logged or
    /// turned into replies.
    pub async fn handle_event(&mut self, event: GatewayEvent) {
        let ctx = Ctx {
            platform: self.platform.as_ref(),
            options: &self.options,
        };
        match event {
            GatewayEvent::Ready => {
                let report =
                    bootstrap::reconcile_all(&ctx, &self.state.settings).await;
                tracing::info!(
                    categories_created = report.categories_created,
                    channels_created = report.channels_created,
                    failures = report.failures,
                    "bootstrap finished"
                );
            }
            GatewayEvent::GuildAvailable { guild_id } => {
                let report = bootstrap::reconcile_guild(
                    &ctx,
                    &self.state.settings,
                    guild_id,
                )
                .await;
                tracing::info!(
                    %guild_id,
                    categories_created = report.categories_created,
                    channels_created = report.channels_created,
                    failures = report.failures,
                    "guild bootstrap finished"
                );
            }
            GatewayEvent::VoiceStateUpdate(update) => {
                lifecycle::on_voice_state_update(&ctx, &mut self.state, &update)
                    .await;
            }
            GatewayEvent::MessageCreate(message) => {
                commands::on_message(&ctx, &mut self.state, &message).await;
            }
        }
    }

    /// Runs one command for `invoker` and returns the reply it would post.
    ///
    /// This is the command boundary without the reply delivery; use it to
    /// drive the bot from something other than text messages.
    pub async fn execute(
        &mut self,
        guild_id: GuildId,
        invoker: &Member,
        command: Command,
    ) -> Result<Reply, RoomkeeperError> {
        let ctx = Ctx {
            platform: self.platform.as_ref(),
            options: &self.options,
        };
        commands::execute(&ctx, &mut self.state, guild_id, invoker, command)
            .await
    }

    /// Processes events until every sender is dropped, then returns the
    /// final state.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<GatewayEvent>,
    ) -> BotState {
        tracing::info!("roomkeeper bot running");

        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }

        tracing::info!(
            rooms = self.state.registry.len(),
            "event stream closed, bot stopped"
        );
        self.state
    }

    /// Spawns [`run`](Self::run) on the runtime.
    pub fn spawn(self) -> (BotHandle, JoinHandle<BotState>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let task = tokio::spawn(self.run(rx));
        (BotHandle { sender: tx }, task)
    }
}

/// Sends events to a spawned bot. Cheap to clone.
#[derive(Clone)]
pub struct BotHandle {
    sender: mpsc::Sender<GatewayEvent>,
}

impl BotHandle {
    /// Queues an event. Waits if the bot is behind.
    pub async fn send(&self, event: GatewayEvent) -> Result<(), RoomkeeperError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| RoomkeeperError::Stopped)
    }
}
