//! Item definitions shared between client and server.

use serde::{Deserialize, Serialize};

/// Item definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub item_type: ItemType,
    pub rarity: ItemRarity,
    pub max_stack: u32,
    /// Seconds of uninterrupted gathering needed for resource items
    pub gather_seconds: f32,
}

/// Item types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    Resource,
    Consumable,
    Material,
    Trophy,
}

/// Item rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Built-in item definitions
pub fn get_item_definitions() -> Vec<ItemDef> {
    vec![
        ItemDef {
            id: 1,
            name: "Iron Ore".into(),
            description: "A lump of ore chipped from the arena walls.".into(),
            item_type: ItemType::Resource,
            rarity: ItemRarity::Common,
            max_stack: 99,
            gather_seconds: 2.0,
        },
        ItemDef {
            id: 2,
            name: "Moonpetal".into(),
            description: "A pale flower that only grows underground.".into(),
            item_type: ItemType::Resource,
            rarity: ItemRarity::Uncommon,
            max_stack: 50,
            gather_seconds: 3.0,
        },
        ItemDef {
            id: 3,
            name: "Ember Crystal".into(),
            description: "Warm to the touch.".into(),
            item_type: ItemType::Resource,
            rarity: ItemRarity::Rare,
            max_stack: 20,
            gather_seconds: 4.0,
        },
        ItemDef {
            id: 4,
            name: "Void Shard".into(),
            description: "It hums when no one is looking.".into(),
            item_type: ItemType::Resource,
            rarity: ItemRarity::Epic,
            max_stack: 10,
            gather_seconds: 5.0,
        },
        ItemDef {
            id: 10,
            name: "Healing Tonic".into(),
            description: "Restores health between runs.".into(),
            item_type: ItemType::Consumable,
            rarity: ItemRarity::Common,
            max_stack: 20,
            gather_seconds: 0.0,
        },
        ItemDef {
            id: 11,
            name: "Bone Charm".into(),
            description: "Carved from something large.".into(),
            item_type: ItemType::Material,
            rarity: ItemRarity::Uncommon,
            max_stack: 99,
            gather_seconds: 0.0,
        },
        ItemDef {
            id: 12,
            name: "Warden's Sigil".into(),
            description: "Proof of a fallen warden.".into(),
            item_type: ItemType::Trophy,
            rarity: ItemRarity::Legendary,
            max_stack: 1,
            gather_seconds: 0.0,
        },
    ]
}

/// Look up a single item definition
pub fn get_item_by_id(id: u32) -> Option<ItemDef> {
    get_item_definitions().into_iter().find(|i| i.id == id)
}
