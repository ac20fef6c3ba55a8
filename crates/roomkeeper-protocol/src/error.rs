//! Error types for the protocol layer.
//!
//! Each crate in Roomkeeper defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in reading input (a gateway
//! payload or a typed command), not in the platform or the room registry.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or an
    /// unknown event `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message starts with the prefix but names no known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A known command was invoked with arguments it can't use.
    ///
    /// `usage` is the correct invocation, without the prefix, so the
    /// reply can show the user how to fix it.
    #[error("usage: {usage}")]
    MalformedArguments {
        command: &'static str,
        usage: &'static str,
    },
}
