//! Codec trait and implementations for serializing/deserializing gateway
//! payloads.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The bot doesn't care HOW events are serialized: it just needs
//! something that implements the [`Codec`] trait. Gateway adapters pick
//! the codec that matches their wire format; the console demo and the
//! tests use [`JsonCodec`].

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// - `Send + Sync` → the codec can be shared with the task that pumps
///   gateway events into the bot.
/// - `'static` → it owns everything it needs.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use roomkeeper_protocol::{Codec, GatewayEvent, GuildId, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let event: GatewayEvent = codec
///     .decode(br#"{"type": "GuildAvailable", "guild_id": 7}"#)
///     .unwrap();
/// assert_eq!(event, GatewayEvent::GuildAvailable { guild_id: GuildId(7) });
///
/// let bytes = codec.encode(&event).unwrap();
/// let again: GatewayEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, again);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
