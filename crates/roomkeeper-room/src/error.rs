//! Error types for the room layer.

use roomkeeper_protocol::{CategoryKind, UserId};

/// Errors that can occur when reading or changing settings and rooms.
///
/// None of these touch the platform; they are all decided locally, before
/// any outbound call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The kind isn't one of the configured categories.
    #[error("unknown category kind `{0}`")]
    UnknownCategoryKind(CategoryKind),

    /// A user limit outside `0..=99`.
    #[error("capacity {0} is out of range (0-99)")]
    CapacityOutOfRange(i64),

    /// The user owns no room.
    #[error("user {0} does not own a room")]
    NotOwner(UserId),

    /// The user owns a room but isn't connected to it.
    #[error("user {0} is not in their own room")]
    NotInOwnRoom(UserId),
}
