//! Integration tests for settings and the room registry working together,
//! the way the bot uses them across a room's life.

use roomkeeper_protocol::{Capacity, CategoryKind, ChannelId, UserId};
use roomkeeper_room::{CategorySettings, RoomError, RoomRecord, RoomRegistry, SettingsStore};

fn gaming() -> CategoryKind {
    CategoryKind::new("gaming")
}

fn store() -> SettingsStore {
    SettingsStore::new([(
        gaming(),
        CategorySettings {
            category_name: "Gaming".into(),
            creation_channel_name: "Create-Talk".into(),
            default_capacity: Capacity::new(5).unwrap(),
        },
    )])
}

#[test]
fn test_room_life() {
    let settings = store();
    let mut registry = RoomRegistry::new();
    let owner = UserId(10);

    // Created from the creation channel of a known kind.
    assert_eq!(settings.creation_kind("Gaming", "Create-Talk"), Some(&gaming()));
    registry.insert(RoomRecord::new(ChannelId(1002), owner));

    let record = registry.owned_by_mut(owner).unwrap();
    record.set_private(true);
    record.set_private(true);
    assert!(record.allow(UserId(20)));

    let record = registry.get(ChannelId(1002)).unwrap();
    assert!(record.is_private());
    assert_eq!(record.allowed_users().len(), 1);

    // Drained.
    assert!(registry.remove(ChannelId(1002)).is_some());
    assert_eq!(registry.owned_by(owner).unwrap_err(), RoomError::NotOwner(owner));
}

#[test]
fn test_rooms_of_different_owners_are_independent() {
    let mut registry = RoomRegistry::new();
    registry.insert(RoomRecord::new(ChannelId(1), UserId(10)));
    registry.insert(RoomRecord::new(ChannelId(2), UserId(20)));

    registry.owned_by_mut(UserId(10)).unwrap().set_private(true);

    assert!(registry.get(ChannelId(1)).unwrap().is_private());
    assert!(!registry.get(ChannelId(2)).unwrap().is_private());
    assert_eq!(registry.iter().count(), 2);
}

#[test]
fn test_settings_changes_are_seen_by_later_lookups() {
    let mut settings = store();

    settings.set_creation_channel_name(&gaming(), "New Room").unwrap();
    let capacity = settings.set_default_capacity(&gaming(), 12).unwrap();

    let current = settings.get(&gaming()).unwrap();
    assert_eq!(current.creation_channel_name, "New Room");
    assert_eq!(current.default_capacity, capacity);
    assert_eq!(settings.creation_kind("Gaming", "Create-Talk"), None);
    assert_eq!(settings.creation_kind("Gaming", "New Room"), Some(&gaming()));
}
