//! Server-side entity definitions.

mod combatant;
mod enemy;
pub mod player;
mod projectile;
mod resource;

use arena_shared::{AbilityId, AbilityState};

pub use combatant::{Combatant, Stats};
pub use enemy::{predict_stance, AiContext, Enemy, EnemyIntent, ENEMY_ID_BASE};
pub use player::{Player, PLAYER_ID};
pub use projectile::{Projectile, ProjectileStep, PROJECTILE_ID_BASE};
pub use resource::{ResourceNode, RESOURCE_ID_BASE};

/// An ability on an action bar with its remaining cooldown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilitySlot {
    pub id: AbilityId,
    /// Ticks until usable again
    pub cooldown: u32,
}

impl AbilitySlot {
    pub fn new(id: AbilityId) -> Self {
        Self { id, cooldown: 0 }
    }

    pub fn max_cooldown(&self) -> u32 {
        self.id.def().cooldown
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown == 0
    }

    /// Put the ability on its full cooldown
    pub fn trigger(&mut self) {
        self.cooldown = self.max_cooldown();
    }

    pub fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    pub fn state(&self) -> AbilityState {
        AbilityState {
            id: self.id,
            cooldown: self.cooldown,
            max_cooldown: self.max_cooldown(),
        }
    }
}
