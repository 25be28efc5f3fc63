//! Zone management system.
//!
//! A zone describes what an arena session contains: arena size, enemy
//! roster, boss, resource pool and the reward table. Zones are loaded from
//! a JSON file when present, otherwise from a hardcoded fallback set.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, error, info, warn};
use serde::Deserialize;

use arena_shared::{Archetype, Element, LootEntry};

use crate::dungeon::MAX_ARENA_SIZE;

/// A group of identical enemies in a zone's roster
#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub archetype: Archetype,
    #[serde(default)]
    pub element: Element,
    pub count: u32,
}

/// A resource item and its relative spawn weight
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceWeight {
    pub item_id: u32,
    pub weight: u32,
}

/// Rewards for killing one enemy of an archetype
#[derive(Debug, Clone, Deserialize)]
pub struct MobReward {
    pub archetype: Archetype,
    pub xp: u64,
    pub gold: u64,
    #[serde(default)]
    pub loot: Vec<LootEntry>,
}

/// Zone definition
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneDefinition {
    pub id: u32,
    pub name: String,
    pub arena_width: u32,
    pub arena_height: u32,
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
    /// Element of the boss in the exit room, if the zone has one
    #[serde(default)]
    pub boss: Option<Element>,
    #[serde(default)]
    pub resource_pool: Vec<ResourceWeight>,
    #[serde(default)]
    pub resource_count: u32,
    #[serde(default)]
    pub rewards: Vec<MobReward>,
}

impl ZoneDefinition {
    pub fn reward_for(&self, archetype: Archetype) -> Option<&MobReward> {
        self.rewards.iter().find(|r| r.archetype == archetype)
    }
}

#[derive(Debug, Deserialize)]
struct ZoneFile {
    zones: Vec<ZoneDefinition>,
}

/// Manages zone definitions and provides zone-related queries
#[derive(Debug, Default)]
pub struct ZoneManager {
    /// All zone definitions, keyed by zone ID
    zones: HashMap<u32, ZoneDefinition>,
}

impl ZoneManager {
    /// Create a new zone manager with no zones
    pub fn new() -> Self {
        Self::default()
    }

    /// Zones from `path`, or the built-in set if the file is missing or
    /// invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let mut manager = Self::new();
        if manager.load_from_json(path) {
            return manager;
        }

        info!("No zone file loaded, using hardcoded fallback zones");
        Self::with_defaults()
    }

    /// Built-in zones
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        for zone in default_zones() {
            manager.zones.insert(zone.id, zone);
        }
        manager
    }

    /// Load zones from a JSON file
    /// Returns true if successful, false if file not found or parse error
    pub fn load_from_json<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read zone file {:?}: {}", path, e);
                }
                return false;
            }
        };

        let file: ZoneFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to parse zone file {:?}: {}", path, e);
                return false;
            }
        };

        if file.zones.is_empty() {
            warn!("Zone file {:?} contains no zones", path);
            return false;
        }

        for mut zone in file.zones {
            if zone.arena_width == 0 || zone.arena_height == 0 {
                warn!("Skipping zone {} ({}): arena has no area", zone.id, zone.name);
                continue;
            }
            if zone.arena_width > MAX_ARENA_SIZE || zone.arena_height > MAX_ARENA_SIZE {
                warn!(
                    "Zone {} ({}): arena {}x{} shrunk to at most {}",
                    zone.id, zone.name, zone.arena_width, zone.arena_height, MAX_ARENA_SIZE
                );
                zone.arena_width = zone.arena_width.min(MAX_ARENA_SIZE);
                zone.arena_height = zone.arena_height.min(MAX_ARENA_SIZE);
            }
            debug!("Loaded zone {} ({}) with {} roster entries", zone.id, zone.name, zone.roster.len());
            self.zones.insert(zone.id, zone);
        }

        info!("Loaded {} zones from {:?}", self.zones.len(), path);
        !self.zones.is_empty()
    }

    pub fn get_zone(&self, zone_id: u32) -> Option<&ZoneDefinition> {
        self.zones.get(&zone_id)
    }

    pub fn zone_exists(&self, zone_id: u32) -> bool {
        self.zones.contains_key(&zone_id)
    }

    /// All zone ids, sorted
    pub fn get_zone_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.zones.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

fn loot(item_id: u32, drop_chance: f32, min_quantity: u32, max_quantity: u32) -> LootEntry {
    LootEntry {
        item_id,
        drop_chance,
        min_quantity,
        max_quantity,
    }
}

fn standard_rewards(scale: u64) -> Vec<MobReward> {
    let reward = |archetype, xp: u64, gold: u64, loot: Vec<LootEntry>| MobReward {
        archetype,
        xp: xp * scale,
        gold: gold * scale,
        loot,
    };
    vec![
        reward(Archetype::Brute, 20, 6, vec![loot(11, 0.3, 1, 2)]),
        reward(Archetype::Guardian, 25, 8, vec![loot(11, 0.4, 1, 2)]),
        reward(Archetype::Assassin, 22, 10, vec![loot(10, 0.25, 1, 1)]),
        reward(Archetype::Caster, 24, 9, vec![loot(10, 0.35, 1, 1)]),
        reward(
            Archetype::Boss,
            150,
            60,
            vec![loot(12, 1.0, 1, 1), loot(10, 0.5, 1, 3)],
        ),
    ]
}

fn roster(archetype: Archetype, element: Element, count: u32) -> RosterEntry {
    RosterEntry {
        archetype,
        element,
        count,
    }
}

fn default_zones() -> Vec<ZoneDefinition> {
    vec![
        ZoneDefinition {
            id: 1,
            name: "Sunken Halls".into(),
            arena_width: 48,
            arena_height: 48,
            roster: vec![
                roster(Archetype::Brute, Element::None, 3),
                roster(Archetype::Assassin, Element::None, 2),
                roster(Archetype::Guardian, Element::None, 1),
            ],
            boss: None,
            resource_pool: vec![
                ResourceWeight { item_id: 1, weight: 5 },
                ResourceWeight { item_id: 2, weight: 3 },
            ],
            resource_count: 6,
            rewards: standard_rewards(1),
        },
        ZoneDefinition {
            id: 2,
            name: "Ember Depths".into(),
            arena_width: 56,
            arena_height: 56,
            roster: vec![
                roster(Archetype::Brute, Element::Fire, 3),
                roster(Archetype::Caster, Element::Fire, 2),
                roster(Archetype::Guardian, Element::Fire, 2),
                roster(Archetype::Assassin, Element::None, 2),
            ],
            boss: Some(Element::Fire),
            resource_pool: vec![
                ResourceWeight { item_id: 3, weight: 2 },
                ResourceWeight { item_id: 1, weight: 4 },
            ],
            resource_count: 8,
            rewards: standard_rewards(2),
        },
        ZoneDefinition {
            id: 3,
            name: "Frozen Crypt".into(),
            arena_width: 64,
            arena_height: 64,
            roster: vec![
                roster(Archetype::Caster, Element::Ice, 3),
                roster(Archetype::Guardian, Element::Ice, 2),
                roster(Archetype::Assassin, Element::Shadow, 3),
                roster(Archetype::Brute, Element::Ice, 2),
            ],
            boss: Some(Element::Shadow),
            resource_pool: vec![
                ResourceWeight { item_id: 4, weight: 1 },
                ResourceWeight { item_id: 2, weight: 3 },
            ],
            resource_count: 10,
            rewards: standard_rewards(3),
        },
    ]
}
