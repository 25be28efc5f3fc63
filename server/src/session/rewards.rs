//! Session rewards.

use arena_shared::{Archetype, ItemStack};

use crate::rng::{RollKind, RollSource};
use crate::world::ZoneDefinition;

/// What a victorious run pays out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rewards {
    pub xp: u64,
    pub gold: u64,
    pub items: Vec<ItemStack>,
}

/// Turns a run's kills into rewards
pub trait RewardService: Send {
    fn rewards_for(&self, kills: &[Archetype], rolls: &mut dyn RollSource) -> Rewards;
}

/// Rewards from a zone's per-archetype reward table
#[derive(Debug, Clone)]
pub struct ZoneRewardTable {
    zone: ZoneDefinition,
}

impl ZoneRewardTable {
    pub fn new(zone: ZoneDefinition) -> Self {
        Self { zone }
    }

    pub fn for_zone(zone: &ZoneDefinition) -> Self {
        Self::new(zone.clone())
    }
}

fn add_item(items: &mut Vec<ItemStack>, item_id: u32, quantity: u32) {
    match items.iter_mut().find(|s| s.item_id == item_id) {
        Some(stack) => stack.quantity = stack.quantity.saturating_add(quantity),
        None => items.push(ItemStack { item_id, quantity }),
    }
}

impl RewardService for ZoneRewardTable {
    fn rewards_for(&self, kills: &[Archetype], rolls: &mut dyn RollSource) -> Rewards {
        let mut total = Rewards::default();

        for archetype in kills {
            let Some(reward) = self.zone.reward_for(*archetype) else {
                continue;
            };
            total.xp = total.xp.saturating_add(reward.xp);
            total.gold = total.gold.saturating_add(reward.gold);

            for entry in &reward.loot {
                if rolls.roll(RollKind::Loot) >= entry.drop_chance {
                    continue;
                }
                let span = entry.max_quantity.saturating_sub(entry.min_quantity).saturating_add(1);
                let extra = (rolls.roll(RollKind::Loot) * span as f32) as u32;
                let quantity = entry
                    .min_quantity
                    .saturating_add(extra)
                    .min(entry.max_quantity.max(entry.min_quantity));
                if quantity > 0 {
                    add_item(&mut total.items, entry.item_id, quantity);
                }
            }
        }

        total
    }
}
