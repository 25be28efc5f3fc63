//! Shared body and combat state for players and enemies.

use arena_shared::{Element, Stance};

use crate::combat::status::{stack_effect, tick_effects, StatusEffect, StatusTick};
use crate::navigation::Vec2;

/// Base combat stats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub atk: u32,
    pub def: u32,
    pub spd: u32,
    pub luck: u32,
}

/// Anything that moves, fights and carries status effects.
///
/// `hp` and `stamina` are only changed through methods so they stay within
/// `0..=max`.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    /// Facing angle in radians
    pub facing: f32,
    hp: u32,
    pub max_hp: u32,
    stamina: f32,
    pub max_stamina: f32,
    pub stance: Stance,
    pub element: Element,
    pub stats: Stats,
    /// Ticks until the next basic attack
    pub attack_cooldown: u32,
    pub buffs: Vec<StatusEffect>,
    pub debuffs: Vec<StatusEffect>,
    pub shield_equipped: bool,
    /// Guarding this tick
    pub guarding: bool,
    /// Entity that last damaged this one, for kill credit
    pub last_hit_by: Option<u64>,
}

impl Combatant {
    pub fn new(position: Vec2, radius: f32, max_hp: u32, max_stamina: f32, stats: Stats) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            radius,
            facing: 0.0,
            hp: max_hp,
            max_hp,
            stamina: max_stamina,
            max_stamina,
            stance: Stance::default(),
            element: Element::default(),
            stats,
            attack_cooldown: 0,
            buffs: Vec::new(),
            debuffs: Vec::new(),
            shield_equipped: false,
            guarding: false,
            last_hit_by: None,
        }
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn stamina(&self) -> f32 {
        self.stamina
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Remove up to `amount` hp. Returns the hp actually lost.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        dealt
    }

    /// Restore up to `amount` hp. Dead entities stay dead.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_dead() {
            return 0;
        }
        let healed = amount.min(self.max_hp - self.hp);
        self.hp += healed;
        healed
    }

    /// Spend stamina if enough is available
    pub fn spend_stamina(&mut self, cost: f32) -> bool {
        if self.stamina + f32::EPSILON < cost {
            return false;
        }
        self.stamina = (self.stamina - cost).clamp(0.0, self.max_stamina);
        true
    }

    pub fn regen_stamina(&mut self, amount: f32) {
        self.stamina = (self.stamina + amount).clamp(0.0, self.max_stamina);
    }

    /// Route an effect to buffs or debuffs with stacking rules applied
    pub fn add_effect(&mut self, effect: StatusEffect) {
        if effect.is_debuff() {
            stack_effect(&mut self.debuffs, effect);
        } else {
            stack_effect(&mut self.buffs, effect);
        }
    }

    pub fn is_stunned(&self) -> bool {
        self.debuffs
            .iter()
            .any(|e| matches!(e, StatusEffect::Stun { ticks } if *ticks > 0))
    }

    pub fn atk_buff_percent(&self) -> u32 {
        self.buffs
            .iter()
            .filter_map(|e| match e {
                StatusEffect::BuffAtk { percent, ticks } if *ticks > 0 => Some(*percent),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn def_buff_percent(&self) -> u32 {
        self.buffs
            .iter()
            .filter_map(|e| match e {
                StatusEffect::BuffDef { percent, ticks, .. } if *ticks > 0 => Some(*percent),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Attack after percentage buffs
    pub fn effective_atk(&self) -> f32 {
        self.stats.atk as f32 * (1.0 + self.atk_buff_percent() as f32 / 100.0)
    }

    /// Defense after percentage buffs
    pub fn effective_def(&self) -> f32 {
        self.stats.def as f32 * (1.0 + self.def_buff_percent() as f32 / 100.0)
    }

    /// Drop defense buffs that only last until the next hit
    pub fn expire_on_hit_buffs(&mut self) -> bool {
        let before = self.buffs.len();
        self.buffs
            .retain(|e| !matches!(e, StatusEffect::BuffDef { expires_on_hit: true, .. }));
        before != self.buffs.len()
    }

    /// Consume an armed riposte, returning its power
    pub fn take_riposte(&mut self) -> Option<f32> {
        let idx = self
            .buffs
            .iter()
            .position(|e| matches!(e, StatusEffect::Riposte { ticks, .. } if *ticks > 0))?;
        match self.buffs.remove(idx) {
            StatusEffect::Riposte { power, .. } => Some(power),
            _ => None,
        }
    }

    pub fn clear_debuffs(&mut self) {
        self.debuffs.clear();
    }

    /// Full hp and stamina, no debuffs, attack ready
    pub fn reset_to_full(&mut self) {
        self.hp = self.max_hp;
        self.stamina = self.max_stamina;
        self.attack_cooldown = 0;
        self.last_hit_by = None;
        self.clear_debuffs();
    }

    /// Advance buffs and debuffs by one tick and apply their damage and
    /// healing. Damage lands before healing.
    pub fn tick_status(&mut self) -> StatusTick {
        let mut report = StatusTick::default();
        tick_effects(&mut self.debuffs, &mut report);
        tick_effects(&mut self.buffs, &mut report);
        report.damage = self.apply_damage(report.damage);
        report.healing = self.heal(report.healing);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Combatant {
        Combatant::new(
            Vec2::ZERO,
            0.4,
            50,
            40.0,
            Stats {
                atk: 10,
                def: 5,
                spd: 10,
                luck: 10,
            },
        )
    }

    #[test]
    fn test_hp_is_clamped() {
        let mut c = sample();
        assert_eq!(c.apply_damage(70), 50);
        assert!(c.is_dead());
        assert_eq!(c.heal(10), 0);

        let mut c = sample();
        c.apply_damage(5);
        assert_eq!(c.heal(100), 5);
        assert_eq!(c.hp(), c.max_hp);
    }

    #[test]
    fn test_stamina_is_clamped() {
        let mut c = sample();
        assert!(!c.spend_stamina(41.0));
        assert!(c.spend_stamina(40.0));
        assert_eq!(c.stamina(), 0.0);
        c.regen_stamina(1000.0);
        assert_eq!(c.stamina(), 40.0);
    }

    #[test]
    fn test_effects_route_by_kind() {
        let mut c = sample();
        c.add_effect(StatusEffect::Stun { ticks: 3 });
        c.add_effect(StatusEffect::BuffAtk { percent: 30, ticks: 3 });
        assert_eq!(c.debuffs.len(), 1);
        assert_eq!(c.buffs.len(), 1);
        assert!(c.is_stunned());
        assert_eq!(c.effective_atk(), 13.0);
    }

    #[test]
    fn test_riposte_is_one_shot() {
        let mut c = sample();
        c.add_effect(StatusEffect::Riposte { power: 0.8, ticks: 10 });
        assert_eq!(c.take_riposte(), Some(0.8));
        assert_eq!(c.take_riposte(), None);
    }

    #[test]
    fn test_reset_clears_debuffs_only() {
        let mut c = sample();
        c.apply_damage(20);
        c.add_effect(StatusEffect::Poison { damage_per_tick: 1, ticks: 10 });
        c.add_effect(StatusEffect::BuffDef { percent: 20, ticks: 10, expires_on_hit: false });
        c.reset_to_full();
        assert_eq!(c.hp(), 50);
        assert!(c.debuffs.is_empty());
        assert_eq!(c.buffs.len(), 1);
    }
}
