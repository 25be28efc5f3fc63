//! Shared entity definitions.

use serde::{Deserialize, Serialize};

use crate::AbilityId;

/// Combat posture. Modifies outgoing damage, incoming defense and avoidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Aggressive,
    Defensive,
    Evasive,
    #[default]
    Balanced,
}

impl Stance {
    pub const ALL: [Stance; 4] = [
        Stance::Aggressive,
        Stance::Defensive,
        Stance::Evasive,
        Stance::Balanced,
    ];

    /// Multiplier applied to outgoing damage
    pub fn attack_modifier(&self) -> f32 {
        match self {
            Stance::Aggressive => 1.35,
            Stance::Defensive => 0.7,
            Stance::Evasive => 0.9,
            Stance::Balanced => 1.0,
        }
    }

    /// Multiplier applied to defense when receiving a hit
    pub fn defense_modifier(&self) -> f32 {
        match self {
            Stance::Aggressive => 0.8,
            Stance::Defensive => 1.4,
            Stance::Evasive => 0.9,
            Stance::Balanced => 1.0,
        }
    }
}

/// Elemental affinity of an entity or attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Fire,
    Ice,
    Shadow,
    Holy,
    #[default]
    None,
}

/// Damage multipliers indexed by [attacker][defender] in `Element::index` order.
const ELEMENT_CHART: [[f32; 5]; 5] = [
    //  fire  ice   shadow holy  none
    [0.75, 1.5, 1.0, 1.0, 1.0],   // fire
    [0.75, 0.75, 1.25, 1.0, 1.0], // ice
    [1.0, 1.0, 0.75, 1.5, 1.0],   // shadow
    [1.0, 1.0, 1.5, 0.75, 1.0],   // holy
    [1.0, 1.0, 1.0, 1.0, 1.0],    // none
];

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Fire,
        Element::Ice,
        Element::Shadow,
        Element::Holy,
        Element::None,
    ];

    fn index(&self) -> usize {
        match self {
            Element::Fire => 0,
            Element::Ice => 1,
            Element::Shadow => 2,
            Element::Holy => 3,
            Element::None => 4,
        }
    }

    /// Chart multiplier for an attack of `self` landing on `defender`
    pub fn multiplier_against(&self, defender: Element) -> f32 {
        ELEMENT_CHART[self.index()][defender.index()]
    }
}

/// Enemy behavioral class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Brute,
    Guardian,
    Assassin,
    Caster,
    Boss,
}

/// Fixed per-archetype constants. Speeds and distances are in arena units
/// (one unit per grid cell), cooldowns in ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchetypeProfile {
    pub display_name: &'static str,
    pub speed: f32,
    pub aggro_radius: f32,
    pub attack_range: f32,
    pub attack_cooldown: u32,
    pub leash_distance: f32,
    pub patrol_radius: f32,
    pub radius: f32,
    pub max_hp: u32,
    pub max_stamina: f32,
    pub atk: u32,
    pub def: u32,
    pub spd: u32,
    pub luck: u32,
    pub default_stance: Stance,
    /// Attacks travel as projectiles instead of landing instantly
    pub ranged: bool,
    pub shield: bool,
    pub abilities: &'static [AbilityId],
}

const BRUTE: ArchetypeProfile = ArchetypeProfile {
    display_name: "Brute",
    speed: 2.6,
    aggro_radius: 7.0,
    attack_range: 1.5,
    attack_cooldown: 30,
    leash_distance: 18.0,
    patrol_radius: 3.0,
    radius: 0.5,
    max_hp: 90,
    max_stamina: 60.0,
    atk: 16,
    def: 8,
    spd: 6,
    luck: 4,
    default_stance: Stance::Aggressive,
    ranged: false,
    shield: false,
    abilities: &[AbilityId::CrushingBlow],
};

const GUARDIAN: ArchetypeProfile = ArchetypeProfile {
    display_name: "Guardian",
    speed: 1.9,
    aggro_radius: 5.0,
    attack_range: 1.5,
    attack_cooldown: 40,
    leash_distance: 12.0,
    patrol_radius: 2.0,
    radius: 0.55,
    max_hp: 120,
    max_stamina: 80.0,
    atk: 11,
    def: 16,
    spd: 4,
    luck: 2,
    default_stance: Stance::Defensive,
    ranged: false,
    shield: true,
    abilities: &[AbilityId::ShieldWall],
};

const ASSASSIN: ArchetypeProfile = ArchetypeProfile {
    display_name: "Assassin",
    speed: 4.2,
    aggro_radius: 9.0,
    attack_range: 1.3,
    attack_cooldown: 20,
    leash_distance: 22.0,
    patrol_radius: 4.0,
    radius: 0.4,
    max_hp: 60,
    max_stamina: 70.0,
    atk: 14,
    def: 5,
    spd: 14,
    luck: 20,
    default_stance: Stance::Evasive,
    ranged: false,
    shield: false,
    abilities: &[AbilityId::VenomStrike],
};

const CASTER: ArchetypeProfile = ArchetypeProfile {
    display_name: "Caster",
    speed: 2.2,
    aggro_radius: 10.0,
    attack_range: 6.0,
    attack_cooldown: 50,
    leash_distance: 20.0,
    patrol_radius: 3.0,
    radius: 0.45,
    max_hp: 55,
    max_stamina: 90.0,
    atk: 15,
    def: 4,
    spd: 8,
    luck: 8,
    default_stance: Stance::Balanced,
    ranged: true,
    shield: false,
    abilities: &[AbilityId::HexBolt],
};

const BOSS: ArchetypeProfile = ArchetypeProfile {
    display_name: "Warden",
    speed: 2.8,
    aggro_radius: 12.0,
    attack_range: 2.0,
    attack_cooldown: 36,
    leash_distance: 26.0,
    patrol_radius: 2.0,
    radius: 0.8,
    max_hp: 400,
    max_stamina: 150.0,
    atk: 24,
    def: 14,
    spd: 9,
    luck: 12,
    default_stance: Stance::Balanced,
    ranged: false,
    shield: false,
    abilities: &[AbilityId::Cleave, AbilityId::Enrage, AbilityId::Rally],
};

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::Brute,
        Archetype::Guardian,
        Archetype::Assassin,
        Archetype::Caster,
        Archetype::Boss,
    ];

    pub fn profile(&self) -> &'static ArchetypeProfile {
        match self {
            Archetype::Brute => &BRUTE,
            Archetype::Guardian => &GUARDIAN,
            Archetype::Assassin => &ASSASSIN,
            Archetype::Caster => &CASTER,
            Archetype::Boss => &BOSS,
        }
    }
}

/// Enemy AI state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiState {
    #[default]
    Idle,
    Patrol,
    Chase,
    Attack,
    Cooldown,
}

impl AiState {
    /// Whether an enemy in this state counts as engaged with the player
    pub fn is_threatening(&self) -> bool {
        matches!(self, AiState::Chase | AiState::Attack | AiState::Cooldown)
    }
}

/// Loot table entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: u32,
    pub drop_chance: f32, // 0.0 - 1.0
    pub min_quantity: u32,
    pub max_quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_chart_neutral_row_and_column() {
        for element in Element::ALL {
            assert_eq!(Element::None.multiplier_against(element), 1.0);
            assert_eq!(element.multiplier_against(Element::None), 1.0);
        }
        assert_eq!(Element::Fire.multiplier_against(Element::Ice), 1.5);
        assert_eq!(Element::Holy.multiplier_against(Element::Shadow), 1.5);
    }

    #[test]
    fn test_archetype_profiles_are_distinct() {
        for a in Archetype::ALL {
            for b in Archetype::ALL {
                if a != b {
                    let (pa, pb) = (a.profile(), b.profile());
                    assert!(
                        pa.speed != pb.speed
                            || pa.aggro_radius != pb.aggro_radius
                            || pa.attack_range != pb.attack_range
                            || pa.attack_cooldown != pb.attack_cooldown
                    );
                }
            }
        }
    }

    #[test]
    fn test_leash_exceeds_aggro() {
        for archetype in Archetype::ALL {
            let profile = archetype.profile();
            assert!(profile.leash_distance > profile.aggro_radius);
            assert!(!profile.abilities.is_empty());
        }
    }
}
