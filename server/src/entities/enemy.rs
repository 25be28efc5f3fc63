//! Server-side enemy entity and its AI state machine.

use arena_shared::{AbilityId, AiState, Archetype, Element, EnemySnapshot, GameEvent, Stance, TargetType};
use log::trace;

use super::{AbilitySlot, Combatant, Stats};
use crate::combat::apply_self_ability;
use crate::dungeon::TileGrid;
use crate::navigation::{has_line_of_sight, steer_toward, BoxObstacle, NavigationState, Vec2};
use crate::rng::{RollKind, RollSource};

/// First id handed to enemies
pub const ENEMY_ID_BASE: u64 = 10000;

/// Chance per idle tick to start wandering
const WANDER_CHANCE: f32 = 0.02;

/// Distance at which a patrol point counts as reached
const ARRIVE_DISTANCE: f32 = 0.3;

/// Below this hp fraction non-boss enemies turn defensive
const LOW_HP_FRACTION: f32 = 0.3;

/// Below this hp fraction the boss turns aggressive
const BOSS_ENRAGE_FRACTION: f32 = 0.5;

/// What an enemy decided to do against the player this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyIntent {
    /// None for a basic attack
    pub ability: Option<AbilityId>,
    /// Travels as a projectile
    pub ranged: bool,
}

/// World facts the AI reads
pub struct AiContext<'a> {
    pub player_pos: Vec2,
    pub player_alive: bool,
    pub player_stance: Stance,
    pub walls: &'a [BoxObstacle],
    pub grid: &'a TileGrid,
    pub require_line_of_sight: bool,
}

/// Server-side enemy state
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u64,
    pub name: String,
    pub archetype: Archetype,
    pub body: Combatant,
    pub ai_state: AiState,
    pub spawn_position: Vec2,
    pub patrol_radius: f32,
    pub wander_target: Option<Vec2>,
    pub abilities: Vec<AbilitySlot>,
    /// Walking back after a leash break; ignores the player until home
    pub returning_home: bool,
    pub nav: NavigationState,
}

impl Enemy {
    pub fn new(id: u64, archetype: Archetype, element: Element, position: Vec2) -> Self {
        let profile = archetype.profile();
        let mut body = Combatant::new(
            position,
            profile.radius,
            profile.max_hp,
            profile.max_stamina,
            Stats {
                atk: profile.atk,
                def: profile.def,
                spd: profile.spd,
                luck: profile.luck,
            },
        );
        body.stance = profile.default_stance;
        body.element = element;
        body.shield_equipped = profile.shield;

        let name = match element {
            Element::None => profile.display_name.to_string(),
            other => format!("{:?} {}", other, profile.display_name),
        };

        Self {
            id,
            name,
            archetype,
            body,
            ai_state: AiState::Idle,
            spawn_position: position,
            patrol_radius: profile.patrol_radius,
            wander_target: None,
            abilities: profile.abilities.iter().map(|&id| AbilitySlot::new(id)).collect(),
            returning_home: false,
            nav: NavigationState::new(),
        }
    }

    pub fn is_boss(&self) -> bool {
        self.archetype == Archetype::Boss
    }

    pub fn tick_cooldowns(&mut self) {
        self.body.attack_cooldown = self.body.attack_cooldown.saturating_sub(1);
        for slot in &mut self.abilities {
            slot.tick();
        }
    }

    /// Run one AI step. Self-cast abilities land immediately and push their
    /// events; attacks against the player are returned as an intent.
    pub fn update_ai(
        &mut self,
        ctx: &AiContext,
        rolls: &mut dyn RollSource,
        events: &mut Vec<GameEvent>,
    ) -> Option<EnemyIntent> {
        if self.body.is_dead() {
            return None;
        }

        if self.body.is_stunned() {
            self.body.velocity = Vec2::ZERO;
            return None;
        }

        let profile = self.archetype.profile();
        let pos = self.body.position;
        let dist = pos.distance_to(ctx.player_pos);

        if self.ai_state.is_threatening() && pos.distance_to(self.spawn_position) > profile.leash_distance {
            self.leash_reset();
            return None;
        }

        let previous = self.ai_state;
        let mut intent = None;

        match self.ai_state {
            AiState::Idle => {
                if self.should_aggro(ctx, dist) {
                    self.ai_state = AiState::Chase;
                } else if rolls.roll(RollKind::Wander) < WANDER_CHANCE {
                    if let Some(target) = self.pick_wander_point(ctx.grid, rolls) {
                        self.wander_target = Some(target);
                        self.ai_state = AiState::Patrol;
                    }
                }
            }
            AiState::Patrol => {
                if self.should_aggro(ctx, dist) {
                    self.wander_target = None;
                    self.ai_state = AiState::Chase;
                } else {
                    let target = self.wander_target.unwrap_or(self.spawn_position);
                    if pos.distance_to(target) < ARRIVE_DISTANCE {
                        self.wander_target = None;
                        self.returning_home = false;
                        self.body.velocity = Vec2::ZERO;
                        self.ai_state = AiState::Idle;
                    } else {
                        self.move_toward(target, ctx);
                    }
                }
            }
            AiState::Chase => {
                if !ctx.player_alive || dist > profile.aggro_radius * 2.0 {
                    self.body.velocity = Vec2::ZERO;
                    self.ai_state = AiState::Idle;
                } else if dist < profile.attack_range {
                    self.body.velocity = Vec2::ZERO;
                    self.face(ctx.player_pos);
                    if self.body.attack_cooldown == 0 {
                        intent = Some(self.begin_attack(ctx.player_stance, events));
                        self.ai_state = AiState::Attack;
                    }
                } else {
                    self.move_toward(ctx.player_pos, ctx);
                }
            }
            AiState::Attack => {
                self.body.velocity = Vec2::ZERO;
                self.ai_state = AiState::Cooldown;
            }
            AiState::Cooldown => {
                self.body.velocity = Vec2::ZERO;
                if self.body.attack_cooldown == 0 {
                    self.ai_state = if ctx.player_alive && dist <= profile.aggro_radius * 2.0 {
                        AiState::Chase
                    } else {
                        AiState::Idle
                    };
                }
            }
        }

        if previous != self.ai_state {
            trace!("[AI] {} {} {:?} -> {:?}", self.name, self.id, previous, self.ai_state);
        }

        intent
    }

    fn should_aggro(&self, ctx: &AiContext, dist: f32) -> bool {
        if self.returning_home || !ctx.player_alive {
            return false;
        }
        if dist >= self.archetype.profile().aggro_radius {
            return false;
        }
        !ctx.require_line_of_sight || has_line_of_sight(self.body.position, ctx.player_pos, ctx.walls)
    }

    /// Pull back to spawn fully restored
    fn leash_reset(&mut self) {
        trace!("[AI] {} {} leashed, returning to spawn", self.name, self.id);
        self.body.reset_to_full();
        for slot in &mut self.abilities {
            slot.cooldown = 0;
        }
        self.body.stance = self.archetype.profile().default_stance;
        self.wander_target = Some(self.spawn_position);
        self.returning_home = true;
        self.nav.clear_path();
        self.ai_state = AiState::Patrol;
    }

    /// Commit to an attack: cooldown, stance, and the ability to use
    fn begin_attack(&mut self, player_stance: Stance, events: &mut Vec<GameEvent>) -> EnemyIntent {
        let profile = self.archetype.profile();
        self.body.attack_cooldown = profile.attack_cooldown;
        self.body.stance = predict_stance(self, player_stance);

        let mut ability = None;
        let stamina = self.body.stamina();
        if let Some(slot) = self
            .abilities
            .iter_mut()
            .find(|s| s.is_ready() && s.id.def().stamina_cost <= stamina)
        {
            let def = slot.id.def();
            slot.trigger();
            self.body.spend_stamina(def.stamina_cost);
            match def.target_type {
                TargetType::SelfOnly => {
                    events.push(GameEvent::AbilityUse {
                        caster_id: self.id,
                        ability: def.id,
                        target_id: Some(self.id),
                    });
                    apply_self_ability(self.id, &mut self.body, def, events);
                }
                TargetType::Enemy => ability = Some(def.id),
            }
        }

        EnemyIntent {
            ability,
            ranged: profile.ranged,
        }
    }

    fn pick_wander_point(&self, grid: &TileGrid, rolls: &mut dyn RollSource) -> Option<Vec2> {
        let angle = rolls.roll_range(RollKind::Wander, 0.0, std::f32::consts::TAU);
        let distance = rolls.roll_range(RollKind::Wander, 0.5, self.patrol_radius.max(0.5));
        let point = self.spawn_position + Vec2::from_angle(angle) * distance;
        grid.get(point.x.floor() as i32, point.y.floor() as i32).then_some(point)
    }

    fn move_toward(&mut self, target: Vec2, ctx: &AiContext) {
        let dir = steer_toward(
            self.body.position,
            target,
            ctx.walls,
            ctx.grid,
            &mut self.nav,
            self.body.radius,
        );
        self.body.velocity = dir * self.archetype.profile().speed;
        if dir.length_squared() > 0.0 {
            self.body.facing = dir.angle();
        }
    }

    fn face(&mut self, target: Vec2) {
        let to = target - self.body.position;
        if to.length_squared() > 0.0 {
            self.body.facing = to.angle();
        }
    }

    pub fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            name: self.name.clone(),
            x: self.body.position.x,
            y: self.body.position.y,
            hp: self.body.hp(),
            max_hp: self.body.max_hp,
            archetype: self.archetype,
            element: self.body.element,
            ai_state: self.ai_state,
            facing: self.body.facing,
        }
    }
}

/// Stance `enemy` will take on its next attack against a target in
/// `target_stance`. Pure: used by the AI and by reveal.
pub fn predict_stance(enemy: &Enemy, target_stance: Stance) -> Stance {
    let hp_fraction = enemy.body.hp() as f32 / enemy.body.max_hp.max(1) as f32;

    if !enemy.is_boss() && hp_fraction < LOW_HP_FRACTION {
        return Stance::Defensive;
    }
    if enemy.is_boss() && hp_fraction < BOSS_ENRAGE_FRACTION {
        return Stance::Aggressive;
    }

    match target_stance {
        Stance::Evasive => Stance::Balanced,
        Stance::Defensive => Stance::Aggressive,
        _ => enemy.archetype.profile().default_stance,
    }
}
