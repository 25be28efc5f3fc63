//! Arena world: all simulation state of one session and the tick that
//! advances it.

mod gathering;
mod zone_manager;

pub use gathering::{step_gathering, GATHER_RADIUS};
pub use zone_manager::{MobReward, ResourceWeight, RosterEntry, ZoneDefinition, ZoneManager};

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace};
use rand::Rng;

use arena_shared::{
    get_item_by_id, AbilityEffect, AbilityFailReason, AbilityId, Archetype, Element, GameEvent, InputState, ItemStack,
    SessionResult, Snapshot, TargetType, SERVER_TICK_RATE,
};

use crate::combat::status::StatusEffect;
use crate::combat::{apply_attack, apply_self_ability, AttackOutcome, AttackSpec, MELEE_REACH};
use crate::dungeon::ArenaLayout;
use crate::entities::{
    predict_stance, AiContext, Enemy, EnemyIntent, Player, Projectile, ProjectileStep, ResourceNode, ENEMY_ID_BASE,
    PLAYER_ID, PROJECTILE_ID_BASE, RESOURCE_ID_BASE,
};
use crate::navigation::{step_body, wall_boxes, BoxObstacle, Vec2};
use crate::rng::RollSource;

/// Reach of the player's basic attack, measured to the target's edge
const BASIC_ATTACK_RANGE: f32 = MELEE_REACH;

/// Ticks between player basic attacks
const PLAYER_ATTACK_COOLDOWN: u32 = 12;

/// Stamina regained per second
const STAMINA_REGEN_PER_SEC: f32 = 8.0;

/// Regen multiplier while guarding
const GUARD_REGEN_MULTIPLIER: f32 = 3.0;

/// Simulation settings fixed for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub tick_rate: u32,
    pub require_line_of_sight: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: SERVER_TICK_RATE,
            require_line_of_sight: true,
        }
    }
}

impl SimConfig {
    /// Seconds per tick
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

/// All state of one arena run
#[derive(Debug)]
pub struct ArenaWorld {
    pub layout: Arc<ArenaLayout>,
    walls: Vec<BoxObstacle>,
    pub player: Player,
    pub enemies: BTreeMap<u64, Enemy>,
    pub resources: Vec<ResourceNode>,
    pub projectiles: Vec<Projectile>,
    pub tick: u64,
    /// Archetypes of every enemy killed, in order
    pub kills: Vec<Archetype>,
    pub config: SimConfig,
    next_projectile_id: u64,
    /// Enemy-targeted ability validated this tick, resolved with the attacks
    pending_ability: Option<(AbilityId, u64)>,
    player_death_reported: bool,
}

impl ArenaWorld {
    /// Empty world with the player at the start room
    pub fn new(layout: Arc<ArenaLayout>, config: SimConfig) -> Self {
        let start = layout.start_room().center;
        let walls = wall_boxes(&layout.walls);
        Self {
            layout,
            walls,
            player: Player::new(PLAYER_ID, start),
            enemies: BTreeMap::new(),
            resources: Vec::new(),
            projectiles: Vec::new(),
            tick: 0,
            kills: Vec::new(),
            config,
            next_projectile_id: PROJECTILE_ID_BASE,
            pending_ability: None,
            player_death_reported: false,
        }
    }

    /// Spawn a zone's roster, boss and resources into a fresh world.
    /// Roster enemies go round-robin into every room except the start room,
    /// the boss into the exit room.
    pub fn populate<R: Rng>(layout: Arc<ArenaLayout>, zone: &ZoneDefinition, config: SimConfig, rng: &mut R) -> Self {
        let mut world = Self::new(layout, config);
        let layout = Arc::clone(&world.layout);

        let mut spawn_rooms: Vec<_> = layout.rooms.iter().filter(|r| !r.is_start).collect();
        if spawn_rooms.is_empty() {
            spawn_rooms = layout.rooms.iter().collect();
        }
        let mut next_id = ENEMY_ID_BASE;
        let mut room_cursor = 0;
        for entry in &zone.roster {
            for _ in 0..entry.count {
                let room = spawn_rooms[room_cursor % spawn_rooms.len()];
                room_cursor += 1;
                let position = layout.random_floor_point_in(room, rng);
                world.spawn_enemy(next_id, entry.archetype, entry.element, position);
                next_id += 1;
            }
        }

        if let Some(element) = zone.boss {
            let position = layout.random_floor_point_in(layout.exit_room(), rng);
            world.spawn_enemy(next_id, Archetype::Boss, element, position);
        }

        let total_weight: u32 = zone.resource_pool.iter().map(|r| r.weight).sum();
        if total_weight > 0 {
            for i in 0..zone.resource_count {
                let mut pick = rng.gen_range(0..total_weight);
                let Some(entry) = zone.resource_pool.iter().find(|r| {
                    if pick < r.weight {
                        true
                    } else {
                        pick -= r.weight;
                        false
                    }
                }) else {
                    continue;
                };
                let Some(item) = get_item_by_id(entry.item_id) else {
                    debug!("Zone {} lists unknown resource item {}", zone.id, entry.item_id);
                    continue;
                };
                let room = &layout.rooms[rng.gen_range(0..layout.rooms.len())];
                let position = layout.random_floor_point_in(room, rng);
                world
                    .resources
                    .push(ResourceNode::new(RESOURCE_ID_BASE + i as u64, &item, position));
            }
        }

        debug!(
            "Populated zone {} with {} enemies and {} resources",
            zone.id,
            world.enemies.len(),
            world.resources.len()
        );
        world
    }

    pub fn spawn_enemy(&mut self, id: u64, archetype: Archetype, element: Element, position: Vec2) {
        self.enemies.insert(id, Enemy::new(id, archetype, element, position));
    }

    /// Items the player gathered so far
    pub fn gathered_items(&self) -> Vec<ItemStack> {
        self.player.satchel_totals()
    }

    /// Player stands on the exit marker
    pub fn player_at_exit(&self) -> bool {
        let exit = self.layout.exit;
        self.player.body.position.distance_to(Vec2::new(exit.x, exit.y)) <= exit.radius
    }

    /// Victory when every enemy is dead, defeat when the player is
    pub fn outcome(&self) -> Option<SessionResult> {
        if self.player.body.is_dead() {
            Some(SessionResult::Defeat)
        } else if self.enemies.is_empty() {
            Some(SessionResult::Victory)
        } else {
            None
        }
    }

    pub fn snapshot(&self, zone_id: u32) -> Snapshot {
        Snapshot {
            tick: self.tick,
            zone_id,
            player: self.player.snapshot(),
            enemies: self.enemies.values().map(Enemy::snapshot).collect(),
            resources: self.resources.iter().map(ResourceNode::snapshot).collect(),
            arena: self.layout.info(),
        }
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self, input: &InputState, rolls: &mut dyn RollSource) -> Vec<GameEvent> {
        let mut events = Vec::new();

        self.player.body.guarding = false;
        for enemy in self.enemies.values_mut() {
            enemy.body.guarding = false;
        }
        self.player.input = input.clone().sanitized();

        self.consume_input(&mut events);
        self.tick_cooldowns();
        self.move_bodies();
        self.advance_projectiles(rolls, &mut events);
        let intents = self.run_ai(rolls, &mut events);
        self.resolve_attacks(intents, rolls, &mut events);
        self.tick_statuses(&mut events);

        let threatened = self.enemies.values().any(|e| e.ai_state.is_threatening());
        step_gathering(
            &mut self.player,
            &mut self.resources,
            threatened,
            self.config.tick_rate,
            &mut events,
        );

        self.regen_stamina();
        self.check_deaths(&mut events);

        self.tick += 1;
        events
    }

    // =========================================================================
    // Tick phases
    // =========================================================================

    fn consume_input(&mut self, events: &mut Vec<GameEvent>) {
        if self.player.body.is_dead() {
            return;
        }

        if let Some(stance) = self.player.input.stance_change {
            if self.player.body.stance != stance {
                trace!("[INPUT] stance {:?} -> {:?}", self.player.body.stance, stance);
            }
            self.player.body.stance = stance;
        }

        let Some(slot) = self.player.input.ability_slot else {
            return;
        };
        if let Err(reason) = self.use_ability(slot, events) {
            debug!("[INPUT] ability slot {} rejected: {}", slot, reason);
            events.push(GameEvent::AbilityFail {
                caster_id: self.player.id,
                slot: Some(slot),
                reason,
            });
        }
    }

    /// Validate and start an ability from the action bar
    fn use_ability(&mut self, slot: u8, events: &mut Vec<GameEvent>) -> Result<(), AbilityFailReason> {
        if self.player.body.is_stunned() {
            return Err(AbilityFailReason::Stunned);
        }

        let ability = self.player.slot_mut(slot).ok_or(AbilityFailReason::InvalidSlot)?;
        if !ability.is_ready() {
            return Err(AbilityFailReason::OnCooldown);
        }
        let def = ability.id.def();
        if self.player.body.stamina() + f32::EPSILON < def.stamina_cost {
            return Err(AbilityFailReason::InsufficientStamina);
        }

        let target = match def.target_type {
            TargetType::SelfOnly => None,
            TargetType::Enemy => Some(
                self.find_target(self.player.input.target_id, def.range)
                    .ok_or(AbilityFailReason::NoTarget)?,
            ),
        };

        if let Some(ability) = self.player.slot_mut(slot) {
            ability.trigger();
        }
        self.player.body.spend_stamina(def.stamina_cost);
        events.push(GameEvent::AbilityUse {
            caster_id: self.player.id,
            ability: def.id,
            target_id: target.or(Some(self.player.id)),
        });

        match (target, def.effect) {
            (None, _) => {
                apply_self_ability(self.player.id, &mut self.player.body, def, events);
            }
            (Some(target_id), Some(AbilityEffect::Reveal { ticks })) => {
                if let Some(enemy) = self.enemies.get(&target_id) {
                    let stance = predict_stance(enemy, self.player.body.stance);
                    self.player.body.add_effect(StatusEffect::Reveal {
                        target: target_id,
                        stance,
                        ticks,
                    });
                    events.push(GameEvent::Reveal { target_id, stance });
                }
            }
            (Some(target_id), _) => self.pending_ability = Some((def.id, target_id)),
        }

        Ok(())
    }

    /// Requested target if alive and in reach, otherwise the nearest enemy in
    /// reach. Reach is measured to the target's edge.
    fn find_target(&self, requested: Option<u64>, range: f32) -> Option<u64> {
        let pos = self.player.body.position;
        let in_reach = |e: &Enemy| !e.body.is_dead() && e.body.position.distance_to(pos) - e.body.radius <= range;

        if let Some(enemy) = requested.and_then(|id| self.enemies.get(&id)) {
            if in_reach(enemy) {
                return Some(enemy.id);
            }
        }

        self.enemies
            .values()
            .filter(|e| in_reach(*e))
            .min_by(|a, b| {
                a.body
                    .position
                    .distance_to(pos)
                    .total_cmp(&b.body.position.distance_to(pos))
            })
            .map(|e| e.id)
    }

    fn tick_cooldowns(&mut self) {
        self.player.tick_cooldowns();
        for enemy in self.enemies.values_mut() {
            enemy.tick_cooldowns();
        }
    }

    fn move_bodies(&mut self) {
        let dt = self.config.dt();
        let bounds = (self.layout.width as f32, self.layout.height as f32);

        let speed = self.player.move_speed();
        let player = &mut self.player;
        if player.body.is_dead() || player.body.is_stunned() || player.gathering.is_some() {
            player.body.velocity = Vec2::ZERO;
        } else {
            let dir = Vec2::new(player.input.move_x, player.input.move_y).clamp_length(1.0);
            if dir.length_squared() > 0.0 {
                player.body.velocity = dir * speed;
                player.body.facing = dir.angle();
            }
        }

        let (pos, vel) = step_body(
            player.body.position,
            player.body.velocity,
            player.body.radius,
            dt,
            &self.walls,
            bounds,
        );
        player.body.position = pos;
        player.body.velocity = vel;

        for enemy in self.enemies.values_mut() {
            let (pos, vel) = step_body(
                enemy.body.position,
                enemy.body.velocity,
                enemy.body.radius,
                dt,
                &self.walls,
                bounds,
            );
            enemy.body.position = pos;
            enemy.body.velocity = vel;
        }
    }

    fn advance_projectiles(&mut self, rolls: &mut dyn RollSource, events: &mut Vec<GameEvent>) {
        let dt = self.config.dt();
        let mut projectiles = std::mem::take(&mut self.projectiles);

        projectiles.retain_mut(|projectile| {
            if projectile.advance(dt, &self.walls) != ProjectileStep::Flying {
                return false;
            }
            if self.player.body.is_dead() || !projectile.hits(self.player.body.position, self.player.body.radius) {
                return true;
            }

            // Owner gone: the bolt fizzles
            let Some(owner) = self.enemies.get_mut(&projectile.owner) else {
                trace!("[PROJECTILE] {} fizzled, owner {} gone", projectile.id, projectile.owner);
                return false;
            };
            let spec = match projectile.ability {
                Some(id) => AttackSpec::ability(id.def(), projectile.element),
                None => AttackSpec::basic(projectile.element),
            };
            apply_attack(
                owner.id,
                &mut owner.body,
                self.player.id,
                &mut self.player.body,
                &spec,
                rolls,
                events,
            );
            false
        });

        self.projectiles = projectiles;
    }

    fn run_ai(&mut self, rolls: &mut dyn RollSource, events: &mut Vec<GameEvent>) -> Vec<(u64, EnemyIntent)> {
        let ctx = AiContext {
            player_pos: self.player.body.position,
            player_alive: !self.player.body.is_dead(),
            player_stance: self.player.body.stance,
            walls: &self.walls,
            grid: &self.layout.grid,
            require_line_of_sight: self.config.require_line_of_sight,
        };

        let mut intents = Vec::new();
        for enemy in self.enemies.values_mut() {
            if let Some(intent) = enemy.update_ai(&ctx, rolls, events) {
                intents.push((enemy.id, intent));
            }
        }
        intents
    }

    fn resolve_attacks(&mut self, intents: Vec<(u64, EnemyIntent)>, rolls: &mut dyn RollSource, events: &mut Vec<GameEvent>) {
        self.player_basic_attack(rolls, events);

        if let Some((ability, target_id)) = self.pending_ability.take() {
            match self.enemies.get_mut(&target_id).filter(|e| !e.body.is_dead()) {
                Some(enemy) => {
                    let spec = AttackSpec::ability(ability.def(), self.player.body.element);
                    apply_attack(
                        self.player.id,
                        &mut self.player.body,
                        enemy.id,
                        &mut enemy.body,
                        &spec,
                        rolls,
                        events,
                    );
                }
                None => events.push(GameEvent::AbilityFail {
                    caster_id: self.player.id,
                    slot: None,
                    reason: AbilityFailReason::NoTarget,
                }),
            }
        }

        for (enemy_id, intent) in intents {
            if self.player.body.is_dead() {
                break;
            }
            let Some(enemy) = self.enemies.get_mut(&enemy_id).filter(|e| !e.body.is_dead()) else {
                continue;
            };

            if intent.ranged {
                let projectile = Projectile::new(
                    self.next_projectile_id,
                    enemy.id,
                    enemy.body.position,
                    self.player.body.position,
                    intent.ability,
                    enemy.body.element,
                );
                self.next_projectile_id += 1;
                trace!("[PROJECTILE] {} fired by {}", projectile.id, enemy.id);
                self.projectiles.push(projectile);
                continue;
            }

            let spec = match intent.ability {
                Some(id) => AttackSpec::ability(id.def(), enemy.body.element),
                None => AttackSpec::basic(enemy.body.element),
            };
            apply_attack(
                enemy.id,
                &mut enemy.body,
                self.player.id,
                &mut self.player.body,
                &spec,
                rolls,
                events,
            );
        }
    }

    fn player_basic_attack(&mut self, rolls: &mut dyn RollSource, events: &mut Vec<GameEvent>) {
        let player = &self.player;
        if !player.input.attacking
            || player.body.attack_cooldown > 0
            || player.body.is_dead()
            || player.body.is_stunned()
            || player.gathering.is_some()
        {
            return;
        }

        let Some(target_id) = self.find_target(player.input.target_id, BASIC_ATTACK_RANGE) else {
            return;
        };
        let Some(enemy) = self.enemies.get_mut(&target_id) else {
            return;
        };

        self.player.body.attack_cooldown = PLAYER_ATTACK_COOLDOWN;
        let spec = AttackSpec::basic(self.player.body.element);
        let outcome = apply_attack(
            self.player.id,
            &mut self.player.body,
            enemy.id,
            &mut enemy.body,
            &spec,
            rolls,
            events,
        );
        if let AttackOutcome::Hit { damage, .. } = outcome {
            trace!("[COMBAT] player hit {} for {}", enemy.id, damage);
        }
    }

    fn tick_statuses(&mut self, events: &mut Vec<GameEvent>) {
        let player_id = self.player.id;
        let bodies = std::iter::once((player_id, &mut self.player.body))
            .chain(self.enemies.values_mut().map(|e| (e.id, &mut e.body)));

        for (id, body) in bodies {
            if body.is_dead() {
                continue;
            }
            let report = body.tick_status();
            if report.damage > 0 {
                events.push(GameEvent::Damage {
                    source: body.last_hit_by.unwrap_or(id),
                    target_id: id,
                    amount: report.damage,
                    crit: false,
                    ability: None,
                });
            }
            if report.healing > 0 {
                events.push(GameEvent::Heal {
                    target_id: id,
                    amount: report.healing,
                });
            }
        }
    }

    fn regen_stamina(&mut self) {
        let base = STAMINA_REGEN_PER_SEC * self.config.dt();

        if !self.player.body.is_dead() {
            let multiplier = if self.player.body.guarding { GUARD_REGEN_MULTIPLIER } else { 1.0 };
            self.player.body.regen_stamina(base * multiplier);
        }
        for enemy in self.enemies.values_mut() {
            enemy.body.regen_stamina(base);
        }
    }

    fn check_deaths(&mut self, events: &mut Vec<GameEvent>) {
        let dead: Vec<u64> = self
            .enemies
            .values()
            .filter(|e| e.body.is_dead())
            .map(|e| e.id)
            .collect();

        for id in dead {
            if let Some(enemy) = self.enemies.remove(&id) {
                debug!("[DEATH] {} {} killed by {:?}", enemy.name, id, enemy.body.last_hit_by);
                self.kills.push(enemy.archetype);
                events.push(GameEvent::Death {
                    entity_id: id,
                    killer_id: enemy.body.last_hit_by,
                });
            }
        }

        if self.player.body.is_dead() && !self.player_death_reported {
            self.player_death_reported = true;
            if let Some(node_id) = self.player.gathering.take() {
                if let Some(node) = self.resources.iter_mut().find(|n| n.id == node_id) {
                    node.reset();
                }
            }
            events.push(GameEvent::Death {
                entity_id: self.player.id,
                killer_id: self.player.body.last_hit_by,
            });
        }
    }
}

/// Advance `world` by one tick. The single simulation entry point shared by
/// the network and local drivers.
pub fn tick(world: &mut ArenaWorld, input: &InputState, rolls: &mut dyn RollSource) -> Vec<GameEvent> {
    world.tick(input, rolls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::{generate, ArenaLayout};
    use crate::rng::{seeded_rng, AuditedRolls, ScriptedRolls};
    use arena_shared::{AiState, Stance};

    fn open_world() -> ArenaWorld {
        ArenaWorld::new(Arc::new(ArenaLayout::open(40, 40)), SimConfig::default())
    }

    #[test]
    fn test_populate_places_everything_on_floor() {
        let zones = ZoneManager::with_defaults();
        let zone = zones.get_zone(2).unwrap();
        let layout = Arc::new(generate(zone.arena_width, zone.arena_height, Some(11)));
        let world = ArenaWorld::populate(Arc::clone(&layout), zone, SimConfig::default(), &mut seeded_rng(12));

        let roster: u32 = zone.roster.iter().map(|r| r.count).sum();
        assert_eq!(world.enemies.len() as u32, roster + 1);
        assert_eq!(world.resources.len() as u32, zone.resource_count);
        assert!(layout.is_walkable_at(world.player.body.position));
        for enemy in world.enemies.values() {
            assert!(layout.is_walkable_at(enemy.body.position));
            assert!(!layout.start_room().contains(enemy.body.position));
        }
        let boss = world.enemies.values().find(|e| e.is_boss()).unwrap();
        assert!(layout.exit_room().contains(boss.body.position));
        assert_eq!(boss.body.element, Element::Fire);
    }

    #[test]
    fn test_player_moves_and_collides_with_bounds() {
        let mut world = open_world();
        world.player.body.position = Vec2::new(1.0, 20.0);
        let input = InputState {
            move_x: -1.0,
            ..Default::default()
        };
        for _ in 0..20 {
            world.tick(&input, &mut ScriptedRolls::neutral());
        }
        assert!((world.player.body.position.x - world.player.body.radius).abs() < 1e-4);
        assert!(world.player.body.facing.abs() > 3.0);
    }

    #[test]
    fn test_diagonal_input_is_clamped() {
        let mut world = open_world();
        world.player.body.position = Vec2::new(20.0, 20.0);
        let input = InputState {
            move_x: 1.0,
            move_y: 1.0,
            ..Default::default()
        };
        world.tick(&input, &mut ScriptedRolls::neutral());
        let moved = world.player.body.position.distance_to(Vec2::new(20.0, 20.0));
        let expected = world.player.move_speed() * world.config.dt();
        assert!((moved - expected).abs() < 1e-4);
    }

    #[test]
    fn test_basic_attack_hits_nearest_enemy() {
        let mut world = open_world();
        world.player.body.position = Vec2::new(10.0, 10.0);
        world.spawn_enemy(ENEMY_ID_BASE, Archetype::Brute, Element::None, Vec2::new(11.0, 10.0));
        world.spawn_enemy(ENEMY_ID_BASE + 1, Archetype::Brute, Element::None, Vec2::new(30.0, 30.0));
        world.player.body.stance = Stance::Aggressive;

        let input = InputState {
            attacking: true,
            ..Default::default()
        };
        let events = world.tick(&input, &mut ScriptedRolls::neutral());

        // 20 * 1.35 = 27 against the brute's 8 def (aggressive 0.8): 27 - 5.44 -> 21
        assert!(events.contains(&GameEvent::Damage {
            source: PLAYER_ID,
            target_id: ENEMY_ID_BASE,
            amount: 21,
            crit: false,
            ability: None,
        }));
        assert_eq!(world.player.body.attack_cooldown, PLAYER_ATTACK_COOLDOWN);
        assert_eq!(world.enemies[&(ENEMY_ID_BASE + 1)].body.hp(), 90);
    }

    #[test]
    fn test_ability_failures_are_events() {
        let mut world = open_world();
        let input = InputState {
            ability_slot: Some(0),
            ..Default::default()
        };
        let events = world.tick(&input, &mut ScriptedRolls::neutral());
        assert!(events.contains(&GameEvent::AbilityFail {
            caster_id: PLAYER_ID,
            slot: Some(0),
            reason: AbilityFailReason::NoTarget,
        }));

        let input = InputState {
            ability_slot: Some(42),
            ..Default::default()
        };
        let events = world.tick(&input, &mut ScriptedRolls::neutral());
        assert!(matches!(
            events.as_slice(),
            [GameEvent::AbilityFail {
                reason: AbilityFailReason::InvalidSlot,
                ..
            }]
        ));
    }

    #[test]
    fn test_self_ability_goes_on_cooldown() {
        let mut world = open_world();
        let war_cry = InputState {
            ability_slot: Some(2),
            ..Default::default()
        };
        world.tick(&war_cry, &mut ScriptedRolls::neutral());
        assert_eq!(world.player.body.atk_buff_percent(), 30);
        assert_eq!(world.player.body.stamina(), 100.0 - 25.0 + 8.0 / 20.0);

        let events = world.tick(&war_cry, &mut ScriptedRolls::neutral());
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::AbilityFail {
                reason: AbilityFailReason::OnCooldown,
                ..
            }
        )));
    }

    #[test]
    fn test_reveal_reports_predicted_stance() {
        let mut world = open_world();
        world.player.body.position = Vec2::new(10.0, 10.0);
        world.spawn_enemy(ENEMY_ID_BASE, Archetype::Guardian, Element::None, Vec2::new(14.0, 10.0));
        world.player.body.stance = Stance::Defensive;

        let input = InputState {
            ability_slot: Some(5),
            ..Default::default()
        };
        let events = world.tick(&input, &mut ScriptedRolls::neutral());
        assert!(events.contains(&GameEvent::Reveal {
            target_id: ENEMY_ID_BASE,
            stance: Stance::Aggressive,
        }));
        // Reveal never changes the target
        assert_eq!(world.enemies[&ENEMY_ID_BASE].body.stance, Stance::Defensive);
    }

    #[test]
    fn test_poison_kill_is_credited() {
        let mut world = open_world();
        world.spawn_enemy(ENEMY_ID_BASE, Archetype::Assassin, Element::None, Vec2::new(35.0, 35.0));
        let enemy = world.enemies.get_mut(&ENEMY_ID_BASE).unwrap();
        enemy.body.apply_damage(enemy.body.max_hp - 1);
        enemy.body.last_hit_by = Some(PLAYER_ID);
        enemy.body.add_effect(StatusEffect::Poison {
            damage_per_tick: 1,
            ticks: 5,
        });

        let events = world.tick(&InputState::default(), &mut ScriptedRolls::neutral());
        assert!(events.contains(&GameEvent::Death {
            entity_id: ENEMY_ID_BASE,
            killer_id: Some(PLAYER_ID),
        }));
        assert!(world.enemies.is_empty());
        assert_eq!(world.kills, vec![Archetype::Assassin]);
        assert_eq!(world.outcome(), Some(SessionResult::Victory));
    }

    #[test]
    fn test_caster_projectile_reaches_player() {
        let mut world = open_world();
        world.config.require_line_of_sight = false;
        world.player.body.position = Vec2::new(10.0, 10.0);
        world.spawn_enemy(ENEMY_ID_BASE, Archetype::Caster, Element::Fire, Vec2::new(14.0, 10.0));

        let mut damaged = false;
        for _ in 0..20 {
            let events = world.tick(&InputState::default(), &mut ScriptedRolls::neutral());
            damaged |= events.iter().any(|e| matches!(e, GameEvent::Damage { target_id: PLAYER_ID, .. }));
        }
        assert!(damaged);
        assert!(world.player.body.hp() < world.player.body.max_hp);
        assert_eq!(world.enemies[&ENEMY_ID_BASE].ai_state, AiState::Cooldown);
    }

    #[test]
    fn test_brute_notices_player_at_aggro_edge() {
        let mut world = open_world();
        let aggro = Archetype::Brute.profile().aggro_radius;
        world.player.body.position = Vec2::new(10.0, 10.0);
        world.spawn_enemy(ENEMY_ID_BASE, Archetype::Brute, Element::None, Vec2::new(10.0 + aggro + 1.0, 10.0));

        world.tick(&InputState::default(), &mut ScriptedRolls::neutral());
        assert_eq!(world.enemies[&ENEMY_ID_BASE].ai_state, AiState::Idle);

        world.player.body.position = Vec2::new(12.0, 10.0);
        world.tick(&InputState::default(), &mut ScriptedRolls::neutral());
        assert_eq!(world.enemies[&ENEMY_ID_BASE].ai_state, AiState::Chase);
    }

    #[test]
    fn test_repeated_guard_cannot_stall_damage() {
        let mut world = open_world();
        world.player.body.position = Vec2::new(10.0, 10.0);
        world.spawn_enemy(ENEMY_ID_BASE, Archetype::Boss, Element::None, Vec2::new(11.0, 10.0));

        let guard = InputState {
            ability_slot: Some(6),
            ..Default::default()
        };
        let mut guards = 0;
        for _ in 0..400 {
            let events = world.tick(&guard, &mut ScriptedRolls::neutral());
            guards += events
                .iter()
                .filter(|e| matches!(e, GameEvent::AbilityUse { ability: AbilityId::Guard, .. }))
                .count();
            if world.player.body.hp() < world.player.body.max_hp {
                break;
            }
        }
        assert!(world.player.body.hp() < world.player.body.max_hp);
        assert!(guards <= 11);
    }

    #[test]
    fn test_invariants_hold_over_long_run() {
        let zones = ZoneManager::with_defaults();
        let zone = zones.get_zone(3).unwrap();
        let layout = Arc::new(generate(zone.arena_width, zone.arena_height, Some(5)));
        let mut world = ArenaWorld::populate(layout, zone, SimConfig::default(), &mut seeded_rng(6));
        let mut rolls = AuditedRolls::from_seed(7);

        for t in 0..600u32 {
            let angle = t as f32 * 0.05;
            let input = InputState {
                move_x: angle.cos(),
                move_y: angle.sin(),
                attacking: true,
                ability_slot: Some((t % 8) as u8),
                ..Default::default()
            };
            world.tick(&input, &mut rolls);

            let p = &world.player.body;
            assert!(p.hp() <= p.max_hp);
            assert!((0.0..=p.max_stamina).contains(&p.stamina()));
            for enemy in world.enemies.values() {
                assert!(enemy.body.hp() <= enemy.body.max_hp);
                assert!(enemy.body.hp() > 0);
                assert!((0.0..=enemy.body.max_stamina).contains(&enemy.body.stamina()));
            }
            if world.outcome().is_some() {
                break;
            }
        }
    }
}
