//! Gateway protocol for Roomkeeper.
//!
//! This crate defines the "language" the bot speaks with the chat platform:
//!
//! - **Types** ([`GatewayEvent`], [`VoiceStateUpdate`], [`Reply`], the id
//!   newtypes): what arrives from the gateway and what goes back out.
//! - **Commands** ([`Command`]): the text-prefixed command grammar that
//!   users type into a text channel.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how gateway events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding
//!   events or parsing commands.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about rooms or the platform's REST
//! surface. It only knows how to name things and how to read them.
//!
//! ```text
//! Gateway (bytes) → Protocol (GatewayEvent / Command) → Bot (rooms, settings)
//! ```

mod codec;
mod command;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use command::{Command, DEFAULT_PREFIX};
pub use error::ProtocolError;
pub use types::{
    Capacity, CategoryKind, ChannelId, Embed, EmbedField, GatewayEvent,
    GuildId, Member, MessageCreate, Reply, RoleId, UserId, VoiceStateUpdate,
};
