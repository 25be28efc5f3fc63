//! Timed status effects.
//!
//! Every effect kind carries exactly the fields it needs, so an effect such
//! as a poison without per-tick damage cannot be built.

use arena_shared::{AbilityEffect, EffectKind, Stance};

/// Maximum concurrent poison stacks on one entity
pub const POISON_STACK_CAP: usize = 3;

/// An active buff or debuff. `ticks` is the remaining duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEffect {
    BuffAtk { percent: u32, ticks: u32 },
    BuffDef { percent: u32, ticks: u32, expires_on_hit: bool },
    Poison { damage_per_tick: u32, ticks: u32 },
    Stun { ticks: u32 },
    Regen { heal_per_tick: u32, ticks: u32 },
    Riposte { power: f32, ticks: u32 },
    Reveal { target: u64, stance: Stance, ticks: u32 },
}

impl StatusEffect {
    pub fn ticks(&self) -> u32 {
        match *self {
            StatusEffect::BuffAtk { ticks, .. }
            | StatusEffect::BuffDef { ticks, .. }
            | StatusEffect::Poison { ticks, .. }
            | StatusEffect::Stun { ticks }
            | StatusEffect::Regen { ticks, .. }
            | StatusEffect::Riposte { ticks, .. }
            | StatusEffect::Reveal { ticks, .. } => ticks,
        }
    }

    fn ticks_mut(&mut self) -> &mut u32 {
        match self {
            StatusEffect::BuffAtk { ticks, .. }
            | StatusEffect::BuffDef { ticks, .. }
            | StatusEffect::Poison { ticks, .. }
            | StatusEffect::Stun { ticks }
            | StatusEffect::Regen { ticks, .. }
            | StatusEffect::Riposte { ticks, .. }
            | StatusEffect::Reveal { ticks, .. } => ticks,
        }
    }

    /// Client-facing kind
    pub fn kind(&self) -> EffectKind {
        match self {
            StatusEffect::BuffAtk { .. } => EffectKind::BuffAtk,
            StatusEffect::BuffDef { .. } => EffectKind::BuffDef,
            StatusEffect::Poison { .. } => EffectKind::Poison,
            StatusEffect::Stun { .. } => EffectKind::Stun,
            StatusEffect::Regen { .. } => EffectKind::Heal,
            StatusEffect::Riposte { .. } => EffectKind::Riposte,
            StatusEffect::Reveal { .. } => EffectKind::Reveal,
        }
    }

    /// Headline number for event payloads
    pub fn magnitude(&self) -> f32 {
        match *self {
            StatusEffect::BuffAtk { percent, .. } | StatusEffect::BuffDef { percent, .. } => percent as f32,
            StatusEffect::Poison { damage_per_tick, .. } => damage_per_tick as f32,
            StatusEffect::Regen { heal_per_tick, .. } => heal_per_tick as f32,
            StatusEffect::Riposte { power, .. } => power,
            StatusEffect::Stun { .. } | StatusEffect::Reveal { .. } => 0.0,
        }
    }

    /// Debuffs are applied by an opponent; everything else is a buff
    pub fn is_debuff(&self) -> bool {
        matches!(self, StatusEffect::Poison { .. } | StatusEffect::Stun { .. })
    }

    /// Timed effect granted by an ability, if the ability grants one.
    /// Instant effects (heal, guard, reveal) return None.
    pub fn from_ability(effect: &AbilityEffect) -> Option<StatusEffect> {
        match *effect {
            AbilityEffect::Stun { ticks } => Some(StatusEffect::Stun { ticks }),
            AbilityEffect::Poison { damage_per_tick, ticks } => Some(StatusEffect::Poison { damage_per_tick, ticks }),
            AbilityEffect::BuffAtk { percent, ticks } => Some(StatusEffect::BuffAtk { percent, ticks }),
            AbilityEffect::BuffDef {
                percent,
                ticks,
                expires_on_hit,
            } => Some(StatusEffect::BuffDef {
                percent,
                ticks,
                expires_on_hit,
            }),
            AbilityEffect::Regen { heal_per_tick, ticks } => Some(StatusEffect::Regen { heal_per_tick, ticks }),
            AbilityEffect::Riposte { power, ticks } => Some(StatusEffect::Riposte { power, ticks }),
            AbilityEffect::Heal { .. } | AbilityEffect::Reveal { .. } | AbilityEffect::Guard => None,
        }
    }
}

/// Add `effect` to `list` following the stacking rules:
/// - poison stacks up to POISON_STACK_CAP; overflow refreshes the oldest stack
/// - buffs of the same kind only take a stronger value but always refresh duration
/// - stun keeps the longer duration
/// - riposte and reveal replace the previous one
pub fn stack_effect(list: &mut Vec<StatusEffect>, effect: StatusEffect) {
    match effect {
        StatusEffect::Poison { damage_per_tick, ticks } => {
            let stacks = list.iter().filter(|e| matches!(e, StatusEffect::Poison { .. })).count();
            if stacks < POISON_STACK_CAP {
                list.push(effect);
            } else if let Some(StatusEffect::Poison {
                damage_per_tick: old_damage,
                ticks: old_ticks,
            }) = list.iter_mut().find(|e| matches!(e, StatusEffect::Poison { .. }))
            {
                *old_damage = (*old_damage).max(damage_per_tick);
                *old_ticks = ticks;
            }
        }
        StatusEffect::BuffAtk { percent, ticks } => {
            match list.iter_mut().find(|e| matches!(e, StatusEffect::BuffAtk { .. })) {
                Some(StatusEffect::BuffAtk {
                    percent: old_percent,
                    ticks: old_ticks,
                }) => {
                    *old_percent = (*old_percent).max(percent);
                    *old_ticks = ticks;
                }
                _ => list.push(effect),
            }
        }
        StatusEffect::BuffDef {
            percent,
            ticks,
            expires_on_hit,
        } => match list.iter_mut().find(|e| matches!(e, StatusEffect::BuffDef { .. })) {
            Some(StatusEffect::BuffDef {
                percent: old_percent,
                ticks: old_ticks,
                expires_on_hit: old_expires,
            }) => {
                if percent > *old_percent {
                    *old_percent = percent;
                    *old_expires = expires_on_hit;
                }
                *old_ticks = ticks;
            }
            _ => list.push(effect),
        },
        StatusEffect::Regen { heal_per_tick, ticks } => {
            match list.iter_mut().find(|e| matches!(e, StatusEffect::Regen { .. })) {
                Some(StatusEffect::Regen {
                    heal_per_tick: old_heal,
                    ticks: old_ticks,
                }) => {
                    *old_heal = (*old_heal).max(heal_per_tick);
                    *old_ticks = ticks;
                }
                _ => list.push(effect),
            }
        }
        StatusEffect::Stun { ticks } => match list.iter_mut().find(|e| matches!(e, StatusEffect::Stun { .. })) {
            Some(StatusEffect::Stun { ticks: old_ticks }) => *old_ticks = (*old_ticks).max(ticks),
            _ => list.push(effect),
        },
        StatusEffect::Riposte { .. } => {
            list.retain(|e| !matches!(e, StatusEffect::Riposte { .. }));
            list.push(effect);
        }
        StatusEffect::Reveal { target, .. } => {
            list.retain(|e| !matches!(e, StatusEffect::Reveal { target: t, .. } if *t == target));
            list.push(effect);
        }
    }
}

/// What one tick of status processing did to an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTick {
    /// Poison damage due this tick (not yet applied)
    pub damage: u32,
    /// Regeneration due this tick (not yet applied)
    pub healing: u32,
    /// Kinds removed this tick
    pub expired: Vec<EffectKind>,
}

/// Advance one list by one tick. An effect whose remaining duration is
/// already zero is removed without applying; any other effect applies and
/// then counts down.
pub fn tick_effects(list: &mut Vec<StatusEffect>, report: &mut StatusTick) {
    list.retain_mut(|effect| {
        if effect.ticks() == 0 {
            report.expired.push(effect.kind());
            return false;
        }
        match *effect {
            StatusEffect::Poison { damage_per_tick, .. } => report.damage += damage_per_tick,
            StatusEffect::Regen { heal_per_tick, .. } => report.healing += heal_per_tick,
            _ => {}
        }
        *effect.ticks_mut() -= 1;
        true
    });
}
