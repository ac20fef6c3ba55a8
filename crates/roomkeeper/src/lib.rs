//! # Roomkeeper
//!
//! A chat-server bot that hands out temporary voice rooms.
//!
//! Members join a per-category "creation" channel; the bot creates a room
//! named after them, moves them in, and gives them owner rights. When the
//! last member leaves, the room is deleted. Owners can cap, lock, unlock,
//! and hand out invites to their room with text commands.
//!
//! The bot talks to the chat service only through the
//! [`Platform`](roomkeeper_platform::Platform) trait and is driven by
//! [`GatewayEvent`](roomkeeper_protocol::GatewayEvent)s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roomkeeper::prelude::*;
//!
//! # async fn demo() -> Result<(), RoomkeeperError> {
//! roomkeeper::init_tracing("roomkeeper=info");
//!
//! let config = BotConfig::load("roomkeeper.toml")?;
//! let platform = Arc::new(MemoryPlatform::new().with_guild(GuildId(1)));
//! let (handle, task) = Bot::builder().config(config).build(platform)?.spawn();
//!
//! handle.send(GatewayEvent::Ready).await?;
//! drop(handle);
//! let _final_state = task.await;
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod bot;
mod commands;
mod config;
mod error;
mod lifecycle;
mod logging;

pub use bot::{Bot, BotBuilder, BotHandle, BotState};
pub use config::{BotConfig, ConfigError, NAME_PLACEHOLDER, TOKEN_ENV};
pub use error::RoomkeeperError;
pub use logging::init_tracing;

/// Common imports for driving the bot.
pub mod prelude {
    pub use crate::{Bot, BotConfig, BotHandle, BotState, RoomkeeperError};
    #[cfg(feature = "memory")]
    pub use roomkeeper_platform::MemoryPlatform;
    pub use roomkeeper_platform::{Platform, PlatformError};
    pub use roomkeeper_protocol::{
        ChannelId, Command, GatewayEvent, GuildId, Member, Reply, UserId,
        VoiceStateUpdate,
    };
    pub use roomkeeper_room::{RoomRecord, RoomRegistry, SettingsStore};
}
