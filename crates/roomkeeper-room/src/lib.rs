//! Room state for Roomkeeper.
//!
//! Two plain data structures, owned by the bot and handed to handlers by
//! reference. Neither does any I/O.
//!
//! # Key types
//!
//! - [`SettingsStore`]: per-kind category name, creation channel name,
//!   and default capacity
//! - [`RoomRegistry`]: live rooms by channel id
//! - [`RoomRecord`]: one room: owner, privacy, allow-list

mod error;
mod registry;
mod settings;

pub use error::RoomError;
pub use registry::{RoomRecord, RoomRegistry};
pub use settings::{CategorySettings, SettingsStore};
