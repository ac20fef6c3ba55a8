//! Room registry: which live rooms exist and who owns them.

use std::collections::{BTreeMap, BTreeSet};

use roomkeeper_protocol::{ChannelId, UserId};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomRecord
// ---------------------------------------------------------------------------

/// One live, user-owned room.
///
/// The id and owner are fixed at creation. Privacy can be toggled; the
/// allow-list only grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    room_id: ChannelId,
    owner: UserId,
    is_private: bool,
    allowed_users: BTreeSet<UserId>,
}

impl RoomRecord {
    /// A fresh public room with an empty allow-list.
    pub fn new(room_id: ChannelId, owner: UserId) -> Self {
        Self {
            room_id,
            owner,
            is_private: false,
            allowed_users: BTreeSet::new(),
        }
    }

    pub fn room_id(&self) -> ChannelId {
        self.room_id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn allowed_users(&self) -> &BTreeSet<UserId> {
        &self.allowed_users
    }

    pub fn set_private(&mut self, is_private: bool) {
        self.is_private = is_private;
    }

    /// Adds `user` to the allow-list. Returns `false` if already present.
    pub fn allow(&mut self, user: UserId) -> bool {
        self.allowed_users.insert(user)
    }
}

// ---------------------------------------------------------------------------
// RoomRegistry
// ---------------------------------------------------------------------------

/// All live rooms, keyed by channel id.
///
/// Holds a record for a room exactly while that room exists on the
/// platform. Only the lifecycle code inserts and removes; commands look
/// records up by owner and mutate them in place.
///
/// Kept in id order so that [`owned_by`](Self::owned_by) is deterministic
/// when a user owns more than one room: the oldest room wins.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<ChannelId, RoomRecord>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a room. Replaces (and returns) any record with the same id.
    pub fn insert(&mut self, record: RoomRecord) -> Option<RoomRecord> {
        tracing::debug!(
            room_id = %record.room_id,
            owner = %record.owner,
            "room registered"
        );
        self.rooms.insert(record.room_id, record)
    }

    pub fn remove(&mut self, room_id: ChannelId) -> Option<RoomRecord> {
        let removed = self.rooms.remove(&room_id);
        if removed.is_some() {
            tracing::debug!(%room_id, "room unregistered");
        }
        removed
    }

    pub fn get(&self, room_id: ChannelId) -> Option<&RoomRecord> {
        self.rooms.get(&room_id)
    }

    pub fn contains(&self, room_id: ChannelId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// The room owned by `user`.
    ///
    /// Linear scan; the registry holds tens of rooms, not thousands.
    pub fn owned_by(&self, user: UserId) -> Result<&RoomRecord, RoomError> {
        self.rooms
            .values()
            .find(|r| r.owner == user)
            .ok_or(RoomError::NotOwner(user))
    }

    pub fn owned_by_mut(
        &mut self,
        user: UserId,
    ) -> Result<&mut RoomRecord, RoomError> {
        self.rooms
            .values_mut()
            .find(|r| r.owner == user)
            .ok_or(RoomError::NotOwner(user))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomRecord> {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
