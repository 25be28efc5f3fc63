//! Attack resolution.
//!
//! `resolve_attack` is a pure function of both combatants and the roll
//! source. `apply_attack` commits an outcome: damage, counters, riposte,
//! on-hit effects and the matching events.

pub mod status;

use arena_shared::{AbilityDef, AbilityEffect, AbilityId, Element, GameEvent, Stance};
use log::trace;

use crate::entities::Combatant;
use crate::rng::{RollKind, RollSource};
use status::StatusEffect;

/// Fraction of effective defense that mitigates damage
const MITIGATION_FACTOR: f32 = 0.85;

/// Damage variance, symmetric around zero
const VARIANCE: f32 = 0.1;

const BASE_DODGE_CHANCE: f32 = 0.20;
const DODGE_PER_SPD: f32 = 0.01;
const MIN_DODGE_CHANCE: f32 = 0.05;
const MAX_DODGE_CHANCE: f32 = 0.60;

const BASE_BLOCK_CHANCE: f32 = 0.20;
const SHIELD_BLOCK_BONUS: f32 = 0.15;

const MAX_LUCK_CRIT: f32 = 0.30;
const AGGRESSIVE_CRIT_BONUS: f32 = 0.10;
const CRIT_MULTIPLIER: f32 = 1.5;

/// Share of the defender's attack returned by a dodge counter
const DODGE_COUNTER_POWER: f32 = 0.5;

/// Melee reach, measured from the striker's center to the target's edge.
/// Counters and ripostes only land on attackers inside it.
pub const MELEE_REACH: f32 = 1.6;

/// Result of one attack attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Hit { damage: u32, crit: bool },
    /// Defender dodged and countered for `counter` damage
    Dodged { counter: u32 },
    Blocked,
    /// Either side was guarding: nothing happens
    Guarded,
}

/// Parameters of one attack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackSpec {
    pub ability: Option<AbilityId>,
    pub multiplier: f32,
    pub def_ignore: f32,
    pub amplify_element: bool,
    pub element: Element,
}

impl AttackSpec {
    /// Plain weapon swing
    pub fn basic(element: Element) -> Self {
        Self {
            ability: None,
            multiplier: 1.0,
            def_ignore: 0.0,
            amplify_element: false,
            element,
        }
    }

    pub fn ability(def: &AbilityDef, element: Element) -> Self {
        Self {
            ability: Some(def.id),
            multiplier: def.damage_multiplier,
            def_ignore: def.def_ignore,
            amplify_element: def.amplify_element,
            element,
        }
    }
}

/// Elemental chart lookup; amplifying attacks double a favorable bonus
pub fn elemental_multiplier(attack: Element, defender: Element, amplify: bool) -> f32 {
    let m = attack.multiplier_against(defender);
    if amplify && m > 1.0 {
        1.0 + 2.0 * (m - 1.0)
    } else {
        m
    }
}

/// Chance that an evasive defender avoids the attack
pub fn dodge_chance(attacker: &Combatant, defender: &Combatant) -> f32 {
    let spd_diff = defender.stats.spd as f32 - attacker.stats.spd as f32;
    let chance = (BASE_DODGE_CHANCE + spd_diff * DODGE_PER_SPD).clamp(MIN_DODGE_CHANCE, MAX_DODGE_CHANCE);
    if attacker.stance == Stance::Balanced {
        chance / 2.0
    } else {
        chance
    }
}

/// Chance that a defensive defender blocks the attack
pub fn block_chance(defender: &Combatant) -> f32 {
    if defender.shield_equipped {
        BASE_BLOCK_CHANCE + SHIELD_BLOCK_BONUS
    } else {
        BASE_BLOCK_CHANCE
    }
}

/// Chance of a critical hit
pub fn crit_chance(attacker: &Combatant) -> f32 {
    let luck = (attacker.stats.luck as f32 / 200.0).min(MAX_LUCK_CRIT);
    if attacker.stance == Stance::Aggressive {
        luck + AGGRESSIVE_CRIT_BONUS
    } else {
        luck
    }
}

/// Damage before variance and crit, floored at 1
pub fn base_damage(attacker: &Combatant, defender: &Combatant, spec: &AttackSpec) -> f32 {
    let elemental = elemental_multiplier(spec.element, defender.element, spec.amplify_element);
    let raw = attacker.effective_atk() * attacker.stance.attack_modifier() * spec.multiplier * elemental;
    let mitigation =
        defender.effective_def() * defender.stance.defense_modifier() * MITIGATION_FACTOR * (1.0 - spec.def_ignore);
    raw - mitigation
}

/// Decide the outcome of one attack. Rolls are drawn in a fixed order:
/// dodge (evasive defenders only), block (defensive defenders only),
/// variance, crit.
pub fn resolve_attack(
    attacker: &Combatant,
    defender: &Combatant,
    spec: &AttackSpec,
    rolls: &mut dyn RollSource,
) -> AttackOutcome {
    if attacker.guarding || defender.guarding {
        return AttackOutcome::Guarded;
    }

    match defender.stance {
        Stance::Evasive => {
            if rolls.roll(RollKind::Dodge) < dodge_chance(attacker, defender) {
                let counter = ((defender.stats.atk as f32 * DODGE_COUNTER_POWER).floor() as u32).max(1);
                return AttackOutcome::Dodged { counter };
            }
        }
        Stance::Defensive => {
            if rolls.roll(RollKind::Block) < block_chance(defender) {
                return AttackOutcome::Blocked;
            }
        }
        _ => {}
    }

    let variance = (rolls.roll(RollKind::Variance) * 2.0 - 1.0) * VARIANCE;
    let mut damage = ((base_damage(attacker, defender, spec) * (1.0 + variance)).floor()).max(1.0);

    let crit = rolls.roll(RollKind::Crit) < crit_chance(attacker);
    if crit {
        damage = (damage * CRIT_MULTIPLIER).floor();
    }

    AttackOutcome::Hit {
        damage: damage as u32,
        crit,
    }
}

/// Resolve and commit an attack between two entities, pushing the
/// resulting events.
pub fn apply_attack(
    attacker_id: u64,
    attacker: &mut Combatant,
    defender_id: u64,
    defender: &mut Combatant,
    spec: &AttackSpec,
    rolls: &mut dyn RollSource,
    events: &mut Vec<GameEvent>,
) -> AttackOutcome {
    let outcome = resolve_attack(attacker, defender, spec, rolls);
    trace!("[COMBAT] {} -> {}: {:?}", attacker_id, defender_id, outcome);
    let can_counter = defender.position.distance_to(attacker.position) - attacker.radius <= MELEE_REACH;

    match outcome {
        AttackOutcome::Guarded => events.push(GameEvent::Guard {
            attacker_id,
            defender_id,
        }),
        AttackOutcome::Blocked => events.push(GameEvent::Block {
            attacker_id,
            defender_id,
        }),
        AttackOutcome::Dodged { counter } => {
            events.push(GameEvent::Dodge {
                attacker_id,
                defender_id,
            });
            if !can_counter {
                return outcome;
            }
            let dealt = attacker.apply_damage(counter);
            attacker.last_hit_by = Some(defender_id);
            events.push(GameEvent::Damage {
                source: defender_id,
                target_id: attacker_id,
                amount: dealt,
                crit: false,
                ability: None,
            });
        }
        AttackOutcome::Hit { damage, crit } => {
            let dealt = defender.apply_damage(damage);
            defender.last_hit_by = Some(attacker_id);
            defender.expire_on_hit_buffs();
            events.push(GameEvent::Damage {
                source: attacker_id,
                target_id: defender_id,
                amount: dealt,
                crit,
                ability: spec.ability,
            });

            if defender.is_dead() {
                return outcome;
            }

            if let Some(effect) = spec
                .ability
                .and_then(|id| id.def().effect)
                .and_then(|e| StatusEffect::from_ability(&e))
                .filter(StatusEffect::is_debuff)
            {
                defender.add_effect(effect);
                events.push(GameEvent::Buff {
                    target_id: defender_id,
                    kind: effect.kind(),
                    magnitude: effect.magnitude(),
                    ticks: effect.ticks(),
                });
            }

            if let Some(power) = can_counter.then(|| defender.take_riposte()).flatten() {
                let counter = ((defender.stats.atk as f32 * power).floor() as u32).max(1);
                let dealt = attacker.apply_damage(counter);
                attacker.last_hit_by = Some(defender_id);
                events.push(GameEvent::Damage {
                    source: defender_id,
                    target_id: attacker_id,
                    amount: dealt,
                    crit: false,
                    ability: Some(AbilityId::Riposte),
                });
            }
        }
    }

    outcome
}

/// Apply a self-targeted ability to its caster. Returns false when the
/// ability is not self-targeted.
pub fn apply_self_ability(caster_id: u64, caster: &mut Combatant, def: &AbilityDef, events: &mut Vec<GameEvent>) -> bool {
    let Some(effect) = def.effect else {
        return false;
    };

    match effect {
        AbilityEffect::Heal { percent } => {
            let amount = caster.max_hp * percent / 100;
            let healed = caster.heal(amount);
            events.push(GameEvent::Heal {
                target_id: caster_id,
                amount: healed,
            });
        }
        AbilityEffect::Guard => {
            caster.guarding = true;
        }
        AbilityEffect::Stun { .. } | AbilityEffect::Poison { .. } | AbilityEffect::Reveal { .. } => return false,
        _ => {
            if let Some(status) = StatusEffect::from_ability(&effect) {
                caster.add_effect(status);
                events.push(GameEvent::Buff {
                    target_id: caster_id,
                    kind: status.kind(),
                    magnitude: status.magnitude(),
                    ticks: status.ticks(),
                });
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Stats;
    use crate::navigation::Vec2;
    use crate::rng::ScriptedRolls;

    fn fighter(atk: u32, def: u32, stance: Stance) -> Combatant {
        let mut c = Combatant::new(
            Vec2::ZERO,
            0.4,
            200,
            100.0,
            Stats {
                atk,
                def,
                spd: 10,
                luck: 10,
            },
        );
        c.stance = stance;
        c
    }

    #[test]
    fn test_aggressive_basic_attack_damage() {
        let attacker = fighter(20, 10, Stance::Aggressive);
        let defender = fighter(20, 10, Stance::Balanced);
        let outcome = resolve_attack(
            &attacker,
            &defender,
            &AttackSpec::basic(Element::None),
            &mut ScriptedRolls::neutral(),
        );
        assert_eq!(outcome, AttackOutcome::Hit { damage: 18, crit: false });
    }

    #[test]
    fn test_damage_floors_at_one() {
        let attacker = fighter(1, 10, Stance::Defensive);
        let defender = fighter(10, 100, Stance::Balanced);
        let outcome = resolve_attack(
            &attacker,
            &defender,
            &AttackSpec::basic(Element::None),
            &mut ScriptedRolls::neutral(),
        );
        assert_eq!(outcome, AttackOutcome::Hit { damage: 1, crit: false });
    }

    #[test]
    fn test_guard_beats_everything() {
        let attacker = fighter(20, 10, Stance::Aggressive);
        let mut defender = fighter(20, 10, Stance::Evasive);
        defender.guarding = true;
        let mut rolls = ScriptedRolls::new([0.0, 0.0, 0.0], 0.0);
        let outcome = resolve_attack(&attacker, &defender, &AttackSpec::basic(Element::None), &mut rolls);
        assert_eq!(outcome, AttackOutcome::Guarded);
        assert_eq!(rolls.remaining(), 3);
    }

    #[test]
    fn test_dodge_and_block_are_exclusive() {
        let attacker = fighter(20, 10, Stance::Aggressive);

        let evasive = fighter(20, 10, Stance::Evasive);
        let mut rolls = ScriptedRolls::new([0.0], 0.5);
        assert_eq!(
            resolve_attack(&attacker, &evasive, &AttackSpec::basic(Element::None), &mut rolls),
            AttackOutcome::Dodged { counter: 10 }
        );

        let mut defensive = fighter(20, 10, Stance::Defensive);
        defensive.shield_equipped = true;
        let mut rolls = ScriptedRolls::new([0.3], 0.5);
        assert_eq!(
            resolve_attack(&attacker, &defensive, &AttackSpec::basic(Element::None), &mut rolls),
            AttackOutcome::Blocked
        );

        // A balanced defender never rolls dodge or block, so a low first
        // roll only lowers variance.
        let balanced = fighter(20, 10, Stance::Balanced);
        let mut rolls = ScriptedRolls::new([0.0], 0.5);
        assert!(matches!(
            resolve_attack(&attacker, &balanced, &AttackSpec::basic(Element::None), &mut rolls),
            AttackOutcome::Hit { .. }
        ));
    }

    #[test]
    fn test_dodge_chance_clamped_and_halved() {
        let mut fast = fighter(10, 10, Stance::Evasive);
        fast.stats.spd = 200;
        let slow = fighter(10, 10, Stance::Aggressive);
        assert_eq!(dodge_chance(&slow, &fast), MAX_DODGE_CHANCE);

        let balanced = fighter(10, 10, Stance::Balanced);
        assert_eq!(dodge_chance(&balanced, &fast), MAX_DODGE_CHANCE / 2.0);

        let mut sluggish = fighter(10, 10, Stance::Evasive);
        sluggish.stats.spd = 0;
        let mut quick = fighter(10, 10, Stance::Aggressive);
        quick.stats.spd = 200;
        assert_eq!(dodge_chance(&quick, &sluggish), MIN_DODGE_CHANCE);
    }

    #[test]
    fn test_crit_multiplies_damage() {
        let attacker = fighter(20, 10, Stance::Aggressive);
        let defender = fighter(20, 10, Stance::Balanced);
        // variance 0, crit roll 0.0
        let mut rolls = ScriptedRolls::new([0.5, 0.0], 0.5);
        let outcome = resolve_attack(&attacker, &defender, &AttackSpec::basic(Element::None), &mut rolls);
        assert_eq!(outcome, AttackOutcome::Hit { damage: 27, crit: true });
    }

    #[test]
    fn test_amplified_element() {
        assert_eq!(elemental_multiplier(Element::Fire, Element::Ice, false), 1.5);
        assert_eq!(elemental_multiplier(Element::Fire, Element::Ice, true), 2.0);
        assert_eq!(elemental_multiplier(Element::Fire, Element::Fire, true), 0.75);
    }

    #[test]
    fn test_shield_wall_expires_on_hit() {
        let mut attacker = fighter(20, 10, Stance::Aggressive);
        let mut defender = fighter(20, 10, Stance::Balanced);
        let mut events = Vec::new();
        assert!(apply_self_ability(2, &mut defender, AbilityId::ShieldWall.def(), &mut events));
        assert_eq!(defender.def_buff_percent(), 100);

        let spec = AttackSpec::basic(Element::None);
        let first = apply_attack(1, &mut attacker, 2, &mut defender, &spec, &mut ScriptedRolls::neutral(), &mut events);
        // 27 - 17 = 10
        assert_eq!(first, AttackOutcome::Hit { damage: 10, crit: false });
        assert_eq!(defender.def_buff_percent(), 0);

        let second = apply_attack(1, &mut attacker, 2, &mut defender, &spec, &mut ScriptedRolls::neutral(), &mut events);
        assert_eq!(second, AttackOutcome::Hit { damage: 18, crit: false });
    }

    #[test]
    fn test_riposte_counters_once() {
        let mut attacker = fighter(20, 10, Stance::Aggressive);
        let mut defender = fighter(20, 10, Stance::Balanced);
        let mut events = Vec::new();
        apply_self_ability(2, &mut defender, AbilityId::Riposte.def(), &mut events);

        let spec = AttackSpec::basic(Element::None);
        apply_attack(1, &mut attacker, 2, &mut defender, &spec, &mut ScriptedRolls::neutral(), &mut events);
        assert_eq!(attacker.hp(), 200 - 16);
        apply_attack(1, &mut attacker, 2, &mut defender, &spec, &mut ScriptedRolls::neutral(), &mut events);
        assert_eq!(attacker.hp(), 200 - 16);
    }

    #[test]
    fn test_no_counter_against_distant_attacker() {
        let mut caster = fighter(20, 10, Stance::Aggressive);
        caster.position = Vec2::new(8.0, 0.0);
        let spec = AttackSpec::basic(Element::None);

        let mut evasive = fighter(20, 10, Stance::Evasive);
        let mut events = Vec::new();
        let outcome = apply_attack(1, &mut caster, 2, &mut evasive, &spec, &mut ScriptedRolls::new([0.0], 0.5), &mut events);
        assert_eq!(outcome, AttackOutcome::Dodged { counter: 10 });
        assert_eq!(caster.hp(), 200);
        assert_eq!(events, vec![GameEvent::Dodge { attacker_id: 1, defender_id: 2 }]);

        // Riposte stays armed until a melee attacker triggers it
        let mut defender = fighter(20, 10, Stance::Balanced);
        apply_self_ability(2, &mut defender, AbilityId::Riposte.def(), &mut events);
        apply_attack(1, &mut caster, 2, &mut defender, &spec, &mut ScriptedRolls::neutral(), &mut events);
        assert_eq!(caster.hp(), 200);

        caster.position = Vec2::new(1.0, 0.0);
        apply_attack(1, &mut caster, 2, &mut defender, &spec, &mut ScriptedRolls::neutral(), &mut events);
        assert_eq!(caster.hp(), 200 - 16);
    }

    #[test]
    fn test_poison_applied_on_hit() {
        let mut attacker = fighter(20, 10, Stance::Aggressive);
        let mut defender = fighter(20, 10, Stance::Balanced);
        let mut events = Vec::new();
        let spec = AttackSpec::ability(AbilityId::VenomEdge.def(), Element::None);
        apply_attack(1, &mut attacker, 2, &mut defender, &spec, &mut ScriptedRolls::neutral(), &mut events);
        assert_eq!(defender.debuffs.len(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Buff {
                target_id: 2,
                kind: arena_shared::EffectKind::Poison,
                ..
            }
        )));
    }
}
