//! Category settings: the names and default limits the bot works with.

use std::collections::BTreeMap;

use roomkeeper_protocol::{Capacity, CategoryKind};
use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// CategorySettings
// ---------------------------------------------------------------------------

/// Settings for one [`CategoryKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySettings {
    /// Display name of the category that holds the creation channel and
    /// the rooms spawned from it.
    pub category_name: String,

    /// Name of the voice channel users join to get a room.
    pub creation_channel_name: String,

    /// User limit applied to new rooms. 0 = unlimited.
    #[serde(default)]
    pub default_capacity: Capacity,
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Per-kind settings, mutated at runtime by admin commands.
///
/// The set of kinds is fixed at construction; setters only change the
/// values of existing kinds and leave the store untouched on error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsStore {
    kinds: BTreeMap<CategoryKind, CategorySettings>,
}

impl SettingsStore {
    pub fn new(
        kinds: impl IntoIterator<Item = (CategoryKind, CategorySettings)>,
    ) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn get(&self, kind: &CategoryKind) -> Option<&CategorySettings> {
        self.kinds.get(kind)
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&CategoryKind, &CategorySettings)> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn set_creation_channel_name(
        &mut self,
        kind: &CategoryKind,
        name: impl Into<String>,
    ) -> Result<(), RoomError> {
        self.get_mut(kind)?.creation_channel_name = name.into();
        Ok(())
    }

    pub fn set_category_name(
        &mut self,
        kind: &CategoryKind,
        name: impl Into<String>,
    ) -> Result<(), RoomError> {
        self.get_mut(kind)?.category_name = name.into();
        Ok(())
    }

    /// Sets the default user limit for new rooms of `kind`.
    ///
    /// The kind is checked before the range, so an unknown kind is
    /// reported as such whatever the limit.
    pub fn set_default_capacity(
        &mut self,
        kind: &CategoryKind,
        limit: i64,
    ) -> Result<Capacity, RoomError> {
        let settings = self.get_mut(kind)?;
        let capacity =
            Capacity::new(limit).ok_or(RoomError::CapacityOutOfRange(limit))?;
        settings.default_capacity = capacity;
        Ok(capacity)
    }

    /// Returns `true` if any kind keeps its rooms in a category named
    /// `category_name`.
    pub fn manages_category(&self, category_name: &str) -> bool {
        self.kinds.values().any(|s| s.category_name == category_name)
    }

    /// Returns the kind whose creation channel is `channel_name` inside a
    /// category named `category_name`.
    ///
    /// Several kinds may share a category; each is matched on its own.
    pub fn creation_kind(
        &self,
        category_name: &str,
        channel_name: &str,
    ) -> Option<&CategoryKind> {
        self.kinds
            .iter()
            .find(|(_, s)| {
                s.category_name == category_name
                    && s.creation_channel_name == channel_name
            })
            .map(|(kind, _)| kind)
    }

    fn get_mut(
        &mut self,
        kind: &CategoryKind,
    ) -> Result<&mut CategorySettings, RoomError> {
        self.kinds
            .get_mut(kind)
            .ok_or_else(|| RoomError::UnknownCategoryKind(kind.clone()))
    }
}
