//! Ability definitions shared between client and server.
//!
//! Cooldowns and effect durations are expressed in simulation ticks
//! (see `SERVER_TICK_RATE`).

use serde::{Deserialize, Serialize};

// =============================================================================
// Ability Types
// =============================================================================

/// Stable ability identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityId {
    // Player loadout
    PowerStrike,
    VenomEdge,
    WarCry,
    SecondWind,
    Riposte,
    Insight,
    Guard,
    Shatter,
    // Enemy abilities
    CrushingBlow,
    ShieldWall,
    VenomStrike,
    HexBolt,
    Cleave,
    Enrage,
    Rally,
}

/// Who an ability lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    /// Targets a single hostile
    Enemy,
    /// Targets the caster
    SelfOnly,
}

/// Side effect an ability applies after (or instead of) its damage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AbilityEffect {
    /// Target skips its actions while the stun lasts
    Stun { ticks: u32 },
    /// Stacking damage-over-time debuff
    Poison { damage_per_tick: u32, ticks: u32 },
    /// Percentage attack buff on the caster
    BuffAtk { percent: u32, ticks: u32 },
    /// Percentage defense buff on the caster
    BuffDef { percent: u32, ticks: u32, expires_on_hit: bool },
    /// Instant heal, percentage of max HP
    Heal { percent: u32 },
    /// Heal-over-time on the caster
    Regen { heal_per_tick: u32, ticks: u32 },
    /// Arms a one-shot counter against the next incoming hit
    Riposte { power: f32, ticks: u32 },
    /// Predicts the target's next stance
    Reveal { ticks: u32 },
    /// No damage dealt or received this tick, bonus stamina regen
    Guard,
}

/// Ability definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityDef {
    pub id: AbilityId,
    pub name: &'static str,
    pub description: &'static str,
    pub stamina_cost: f32,
    /// Cooldown in ticks
    pub cooldown: u32,
    /// Damage multiplier, 0.0 for abilities that deal no damage
    pub damage_multiplier: f32,
    /// Fraction of the defender's DEF ignored (0.0 - 1.0)
    pub def_ignore: f32,
    /// Doubles the elemental bonus when the chart already favors the attacker
    pub amplify_element: bool,
    pub target_type: TargetType,
    /// Range in arena units (0 = self)
    pub range: f32,
    pub effect: Option<AbilityEffect>,
}

impl AbilityDef {
    pub fn deals_damage(&self) -> bool {
        self.damage_multiplier > 0.0
    }
}

// =============================================================================
// Ability Definitions
// =============================================================================

const POWER_STRIKE: AbilityDef = AbilityDef {
    id: AbilityId::PowerStrike,
    name: "Power Strike",
    description: "A heavy blow dealing 160% damage.",
    stamina_cost: 20.0,
    cooldown: 60,
    damage_multiplier: 1.6,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::Enemy,
    range: 1.8,
    effect: None,
};

const VENOM_EDGE: AbilityDef = AbilityDef {
    id: AbilityId::VenomEdge,
    name: "Venom Edge",
    description: "A light cut that poisons the target for 2 seconds.",
    stamina_cost: 15.0,
    cooldown: 80,
    damage_multiplier: 0.8,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::Enemy,
    range: 1.8,
    effect: Some(AbilityEffect::Poison { damage_per_tick: 1, ticks: 40 }),
};

const WAR_CRY: AbilityDef = AbilityDef {
    id: AbilityId::WarCry,
    name: "War Cry",
    description: "Raise attack by 30% for 5 seconds.",
    stamina_cost: 25.0,
    cooldown: 200,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::SelfOnly,
    range: 0.0,
    effect: Some(AbilityEffect::BuffAtk { percent: 30, ticks: 100 }),
};

const SECOND_WIND: AbilityDef = AbilityDef {
    id: AbilityId::SecondWind,
    name: "Second Wind",
    description: "Restore 25% of maximum health.",
    stamina_cost: 30.0,
    cooldown: 300,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::SelfOnly,
    range: 0.0,
    effect: Some(AbilityEffect::Heal { percent: 25 }),
};

const RIPOSTE: AbilityDef = AbilityDef {
    id: AbilityId::Riposte,
    name: "Riposte",
    description: "Counter the next incoming hit for 80% attack.",
    stamina_cost: 15.0,
    cooldown: 120,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::SelfOnly,
    range: 0.0,
    effect: Some(AbilityEffect::Riposte { power: 0.8, ticks: 200 }),
};

const INSIGHT: AbilityDef = AbilityDef {
    id: AbilityId::Insight,
    name: "Insight",
    description: "Read the target and reveal the stance it will take next.",
    stamina_cost: 5.0,
    cooldown: 100,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::Enemy,
    range: 10.0,
    effect: Some(AbilityEffect::Reveal { ticks: 60 }),
};

const GUARD: AbilityDef = AbilityDef {
    id: AbilityId::Guard,
    name: "Guard",
    description: "Brace: no damage dealt or taken this tick, recover stamina faster.",
    stamina_cost: 10.0,
    cooldown: 40,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::SelfOnly,
    range: 0.0,
    effect: Some(AbilityEffect::Guard),
};

const SHATTER: AbilityDef = AbilityDef {
    id: AbilityId::Shatter,
    name: "Shatter",
    description: "Ignore half the target's defense; elemental advantage hits twice as hard.",
    stamina_cost: 25.0,
    cooldown: 100,
    damage_multiplier: 1.2,
    def_ignore: 0.5,
    amplify_element: true,
    target_type: TargetType::Enemy,
    range: 1.8,
    effect: None,
};

const CRUSHING_BLOW: AbilityDef = AbilityDef {
    id: AbilityId::CrushingBlow,
    name: "Crushing Blow",
    description: "An overhead smash that stuns for one second.",
    stamina_cost: 25.0,
    cooldown: 120,
    damage_multiplier: 1.5,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::Enemy,
    range: 1.6,
    effect: Some(AbilityEffect::Stun { ticks: 20 }),
};

const SHIELD_WALL: AbilityDef = AbilityDef {
    id: AbilityId::ShieldWall,
    name: "Shield Wall",
    description: "Double defense until the next hit lands.",
    stamina_cost: 20.0,
    cooldown: 160,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::SelfOnly,
    range: 0.0,
    effect: Some(AbilityEffect::BuffDef { percent: 100, ticks: 20, expires_on_hit: true }),
};

const VENOM_STRIKE: AbilityDef = AbilityDef {
    id: AbilityId::VenomStrike,
    name: "Venom Strike",
    description: "A poisoned stab.",
    stamina_cost: 15.0,
    cooldown: 90,
    damage_multiplier: 0.9,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::Enemy,
    range: 1.4,
    effect: Some(AbilityEffect::Poison { damage_per_tick: 1, ticks: 60 }),
};

const HEX_BOLT: AbilityDef = AbilityDef {
    id: AbilityId::HexBolt,
    name: "Hex Bolt",
    description: "A slow elemental bolt that pierces armor.",
    stamina_cost: 20.0,
    cooldown: 100,
    damage_multiplier: 1.3,
    def_ignore: 0.3,
    amplify_element: true,
    target_type: TargetType::Enemy,
    range: 7.0,
    effect: None,
};

const CLEAVE: AbilityDef = AbilityDef {
    id: AbilityId::Cleave,
    name: "Cleave",
    description: "A sweeping strike that bites through armor.",
    stamina_cost: 30.0,
    cooldown: 100,
    damage_multiplier: 1.8,
    def_ignore: 0.25,
    amplify_element: false,
    target_type: TargetType::Enemy,
    range: 2.2,
    effect: None,
};

const ENRAGE: AbilityDef = AbilityDef {
    id: AbilityId::Enrage,
    name: "Enrage",
    description: "Attack increased by 50% for 8 seconds.",
    stamina_cost: 40.0,
    cooldown: 400,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::SelfOnly,
    range: 0.0,
    effect: Some(AbilityEffect::BuffAtk { percent: 50, ticks: 160 }),
};

const RALLY: AbilityDef = AbilityDef {
    id: AbilityId::Rally,
    name: "Rally",
    description: "Regenerate health over 5 seconds.",
    stamina_cost: 35.0,
    cooldown: 500,
    damage_multiplier: 0.0,
    def_ignore: 0.0,
    amplify_element: false,
    target_type: TargetType::SelfOnly,
    range: 0.0,
    effect: Some(AbilityEffect::Regen { heal_per_tick: 1, ticks: 100 }),
};

impl AbilityId {
    /// Static definition for this ability
    pub fn def(&self) -> &'static AbilityDef {
        match self {
            AbilityId::PowerStrike => &POWER_STRIKE,
            AbilityId::VenomEdge => &VENOM_EDGE,
            AbilityId::WarCry => &WAR_CRY,
            AbilityId::SecondWind => &SECOND_WIND,
            AbilityId::Riposte => &RIPOSTE,
            AbilityId::Insight => &INSIGHT,
            AbilityId::Guard => &GUARD,
            AbilityId::Shatter => &SHATTER,
            AbilityId::CrushingBlow => &CRUSHING_BLOW,
            AbilityId::ShieldWall => &SHIELD_WALL,
            AbilityId::VenomStrike => &VENOM_STRIKE,
            AbilityId::HexBolt => &HEX_BOLT,
            AbilityId::Cleave => &CLEAVE,
            AbilityId::Enrage => &ENRAGE,
            AbilityId::Rally => &RALLY,
        }
    }
}

/// Default player action bar (slots 0-7)
pub const DEFAULT_LOADOUT: [AbilityId; 8] = [
    AbilityId::PowerStrike,
    AbilityId::VenomEdge,
    AbilityId::WarCry,
    AbilityId::SecondWind,
    AbilityId::Riposte,
    AbilityId::Insight,
    AbilityId::Guard,
    AbilityId::Shatter,
];
