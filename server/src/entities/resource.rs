//! Gatherable resource nodes.

use arena_shared::{ItemDef, ItemRarity, ResourceSnapshot};

use crate::navigation::Vec2;

/// First id handed to resource nodes
pub const RESOURCE_ID_BASE: u64 = 20000;

#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub id: u64,
    pub item_id: u32,
    pub position: Vec2,
    pub rarity: ItemRarity,
    /// Seconds of uninterrupted gathering
    pub gather_seconds: f32,
    pub is_gathered: bool,
    /// At most one gatherer
    pub gathering_by: Option<u64>,
    /// Ticks of progress so far
    pub progress: u32,
}

impl ResourceNode {
    pub fn new(id: u64, item: &ItemDef, position: Vec2) -> Self {
        Self {
            id,
            item_id: item.id,
            position,
            rarity: item.rarity,
            gather_seconds: item.gather_seconds,
            is_gathered: false,
            gathering_by: None,
            progress: 0,
        }
    }

    /// Ticks needed to finish at the given tick rate
    pub fn required_ticks(&self, tick_rate: u32) -> u32 {
        ((self.gather_seconds * tick_rate as f32).ceil() as u32).max(1)
    }

    /// Can `gatherer` start on this node
    pub fn is_available_to(&self, gatherer: u64) -> bool {
        !self.is_gathered && self.gathering_by.map_or(true, |id| id == gatherer)
    }

    /// Drop the current gatherer and lose all progress
    pub fn reset(&mut self) {
        self.gathering_by = None;
        self.progress = 0;
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            id: self.id,
            resource_id: self.item_id,
            x: self.position.x,
            y: self.position.y,
            rarity: self.rarity,
            gather_time: self.gather_seconds,
            is_gathered: self.is_gathered,
            gathering_by: self.gathering_by,
            gather_progress: self.progress,
        }
    }
}
