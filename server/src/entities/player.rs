//! Server-side player state.

use arena_shared::{get_item_by_id, InputState, ItemStack, PlayerSnapshot, Stance, DEFAULT_LOADOUT};

use super::{AbilitySlot, Combatant, Stats};
use crate::navigation::Vec2;

/// The single player in a session always has this id
pub const PLAYER_ID: u64 = 1;

/// Satchel capacity in stacks
const SATCHEL_SIZE: usize = 20;

const BASE_HP: u32 = 120;
const BASE_STAMINA: f32 = 100.0;
const PLAYER_RADIUS: f32 = 0.4;

/// Movement speed before the spd bonus, units per second
const BASE_MOVE_SPEED: f32 = 4.0;
const SPEED_PER_SPD: f32 = 0.05;

/// Server-side player state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u64,
    pub body: Combatant,
    pub abilities: Vec<AbilitySlot>,
    /// Buffered input for the next tick
    pub input: InputState,
    /// Resource node currently being gathered
    pub gathering: Option<u64>,
    satchel: Vec<Option<ItemStack>>,
}

impl Player {
    pub fn new(id: u64, position: Vec2) -> Self {
        let mut body = Combatant::new(
            position,
            PLAYER_RADIUS,
            BASE_HP,
            BASE_STAMINA,
            Stats {
                atk: 20,
                def: 10,
                spd: 10,
                luck: 10,
            },
        );
        body.stance = Stance::Balanced;

        Self {
            id,
            body,
            abilities: DEFAULT_LOADOUT.iter().map(|&id| AbilitySlot::new(id)).collect(),
            input: InputState::default(),
            gathering: None,
            satchel: vec![None; SATCHEL_SIZE],
        }
    }

    /// Units per second at full input
    pub fn move_speed(&self) -> f32 {
        BASE_MOVE_SPEED + self.body.stats.spd as f32 * SPEED_PER_SPD
    }

    pub fn slot_mut(&mut self, slot: u8) -> Option<&mut AbilitySlot> {
        self.abilities.get_mut(slot as usize)
    }

    pub fn tick_cooldowns(&mut self) {
        self.body.attack_cooldown = self.body.attack_cooldown.saturating_sub(1);
        for slot in &mut self.abilities {
            slot.tick();
        }
    }

    /// Add items to the satchel, stacking first
    pub fn add_to_satchel(&mut self, item_id: u32, quantity: u32) -> bool {
        let max_stack = get_item_by_id(item_id).map(|i| i.max_stack).unwrap_or(1).max(1);

        let mut remaining = quantity;

        // Try to stack with existing items
        for stack in self.satchel.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if stack.item_id == item_id && stack.quantity < max_stack {
                let can_add = (max_stack - stack.quantity).min(remaining);
                stack.quantity += can_add;
                remaining -= can_add;
            }
        }

        // Add to empty slots
        for slot in &mut self.satchel {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let add_amount = remaining.min(max_stack);
                *slot = Some(ItemStack {
                    item_id,
                    quantity: add_amount,
                });
                remaining -= add_amount;
            }
        }

        remaining == 0
    }

    /// Whether one more of `item_id` fits in the satchel
    pub fn has_room_for(&self, item_id: u32) -> bool {
        let max_stack = get_item_by_id(item_id).map(|i| i.max_stack).unwrap_or(1).max(1);
        self.satchel.iter().any(|slot| match slot {
            Some(stack) => stack.item_id == item_id && stack.quantity < max_stack,
            None => true,
        })
    }

    /// Total quantity per item, in order of first pickup
    pub fn satchel_totals(&self) -> Vec<ItemStack> {
        let mut totals: Vec<ItemStack> = Vec::new();
        for stack in self.satchel.iter().flatten() {
            match totals.iter_mut().find(|t| t.item_id == stack.item_id) {
                Some(total) => total.quantity += stack.quantity,
                None => totals.push(*stack),
            }
        }
        totals
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            x: self.body.position.x,
            y: self.body.position.y,
            hp: self.body.hp(),
            max_hp: self.body.max_hp,
            stamina: self.body.stamina(),
            max_stamina: self.body.max_stamina,
            stance: self.body.stance,
            facing: self.body.facing,
            attack_cooldown: self.body.attack_cooldown,
            abilities: self.abilities.iter().map(AbilitySlot::state).collect(),
            gathering: self.gathering,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::AbilityId;

    #[test]
    fn test_new_player_loadout() {
        let player = Player::new(PLAYER_ID, Vec2::new(5.0, 5.0));
        assert_eq!(player.abilities.len(), 8);
        assert_eq!(player.abilities[0].id, AbilityId::PowerStrike);
        assert!(player.abilities.iter().all(AbilitySlot::is_ready));
        assert_eq!(player.move_speed(), 4.5);
    }

    #[test]
    fn test_satchel_stacks() {
        let mut player = Player::new(PLAYER_ID, Vec2::ZERO);
        assert!(player.add_to_satchel(1, 3));
        assert!(player.add_to_satchel(2, 1));
        assert!(player.add_to_satchel(1, 2));
        assert_eq!(
            player.satchel_totals(),
            vec![
                ItemStack { item_id: 1, quantity: 5 },
                ItemStack { item_id: 2, quantity: 1 }
            ]
        );
    }

    #[test]
    fn test_satchel_overflow() {
        let mut player = Player::new(PLAYER_ID, Vec2::ZERO);
        // Warden's Sigil stacks to 1
        for _ in 0..SATCHEL_SIZE {
            assert!(player.has_room_for(12));
            assert!(player.add_to_satchel(12, 1));
        }
        assert!(!player.has_room_for(12));
        assert!(!player.has_room_for(1));
        assert!(!player.add_to_satchel(12, 1));
    }

    #[test]
    fn test_cooldowns_tick_down() {
        let mut player = Player::new(PLAYER_ID, Vec2::ZERO);
        player.abilities[0].trigger();
        player.body.attack_cooldown = 1;
        let before = player.abilities[0].cooldown;
        player.tick_cooldowns();
        assert_eq!(player.abilities[0].cooldown, before - 1);
        assert_eq!(player.body.attack_cooldown, 0);
    }
}
