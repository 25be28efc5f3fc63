//! In-process session driver.
//!
//! Runs a session without a socket: an `Autopilot` reads the same
//! `ServerMessage`s a remote client would receive and answers with input.

use log::{debug, info, trace};
use tokio::sync::mpsc;

use arena_shared::{
    AbilityId, ArenaInfo, GameEvent, InputState, ServerMessage, SessionEndPayload, Snapshot, Stance, TargetType,
};

use super::{run_session, Session, SessionError, SessionInput, SnapshotSink};
use crate::config::ServerConfig;
use crate::dungeon::TileGrid;
use crate::entities::PLAYER_ID;
use crate::navigation::{steer_toward, wall_boxes, BoxObstacle, NavigationState, Vec2};
use crate::world::ZoneManager;

/// Forwards every message into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for ChannelSink {
    fn send(&self, msg: &ServerMessage) {
        // Receiver gone means nobody is watching any more
        let _ = self.tx.send(msg.clone());
    }
}

/// Writes session output to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl SnapshotSink for LogSink {
    fn send(&self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Event(GameEvent::Death { entity_id, killer_id }) => {
                info!("[LOCAL] {} died (killer {:?})", entity_id, killer_id)
            }
            ServerMessage::Event(event) => debug!("[LOCAL] {:?}", event),
            ServerMessage::Snapshot(s) => trace!(
                "[LOCAL] tick {} hp {}/{} enemies {}",
                s.tick,
                s.player.hp,
                s.player.max_hp,
                s.enemies.len()
            ),
            ServerMessage::SessionEnded(end) => info!("[LOCAL] session ended: {:?}", end),
            other => debug!("[LOCAL] {:?}", other),
        }
    }
}

/// Enemies closer than this get fought
const ENGAGE_RANGE: f32 = 8.0;
/// Stay inside basic attack range
const MELEE_RANGE: f32 = 1.4;
const PLAYER_RADIUS: f32 = 0.4;
/// Stamina kept back for emergencies
const STAMINA_RESERVE: f32 = 30.0;

/// Scripted controller: fight what is close, gather what is left, then leave
#[derive(Debug, Default)]
pub struct Autopilot {
    walls: Vec<BoxObstacle>,
    grid: Option<TileGrid>,
    exit: Option<Vec2>,
    nav: NavigationState,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one server message; returns input to send when there is
    /// something to do
    pub fn observe(&mut self, msg: &ServerMessage) -> Option<InputState> {
        match msg {
            ServerMessage::SessionStarted { arena, exit, .. } => {
                self.learn_arena(arena);
                self.exit = Some(Vec2::new(exit.x, exit.y));
                None
            }
            ServerMessage::Snapshot(snapshot) => Some(self.decide(snapshot)),
            _ => None,
        }
    }

    fn learn_arena(&mut self, arena: &ArenaInfo) {
        let mut grid = TileGrid::new(arena.width, arena.height);
        for y in 0..arena.height as i32 {
            for x in 0..arena.width as i32 {
                grid.set(x, y, true);
            }
        }
        for wall in &arena.walls {
            for y in wall.y..wall.y + wall.h {
                for x in wall.x..wall.x + wall.w {
                    grid.set(x as i32, y as i32, false);
                }
            }
        }
        self.walls = wall_boxes(&arena.walls);
        self.grid = Some(grid);
        self.nav.clear_path();
    }

    fn steer(&mut self, from: Vec2, to: Vec2) -> Vec2 {
        match &self.grid {
            Some(grid) => steer_toward(from, to, &self.walls, grid, &mut self.nav, PLAYER_RADIUS),
            None => (to - from).normalized(),
        }
    }

    fn decide(&mut self, snapshot: &Snapshot) -> InputState {
        let player = &snapshot.player;
        let pos = Vec2::new(player.x, player.y);
        let hp_ratio = player.hp as f32 / player.max_hp.max(1) as f32;
        let mut input = InputState::default();

        let wanted = if hp_ratio < 0.35 {
            Stance::Defensive
        } else {
            Stance::Aggressive
        };
        if player.stance != wanted {
            input.stance_change = Some(wanted);
        }

        let ready = |id: AbilityId, reserve: f32| -> Option<u8> {
            player
                .abilities
                .iter()
                .position(|a| a.id == id && a.cooldown == 0 && player.stamina >= id.def().stamina_cost + reserve)
                .map(|slot| slot as u8)
        };

        if hp_ratio < 0.4 {
            input.ability_slot = ready(AbilityId::SecondWind, 0.0);
        }

        let enemy = snapshot
            .enemies
            .iter()
            .map(|e| (e, Vec2::new(e.x, e.y).distance_to(pos)))
            .filter(|(_, d)| *d <= ENGAGE_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((enemy, distance)) = enemy {
            input.target_id = Some(enemy.id);
            input.attacking = true;
            if distance > MELEE_RANGE {
                let dir = self.steer(pos, Vec2::new(enemy.x, enemy.y));
                input.move_x = dir.x;
                input.move_y = dir.y;
            }
            if input.ability_slot.is_none() {
                input.ability_slot = [AbilityId::Shatter, AbilityId::PowerStrike, AbilityId::VenomEdge]
                    .into_iter()
                    .filter(|id| id.def().target_type == TargetType::Enemy && distance <= id.def().range)
                    .find_map(|id| ready(id, STAMINA_RESERVE));
            }
            return input;
        }

        let node = snapshot
            .resources
            .iter()
            .filter(|n| !n.is_gathered && n.gathering_by.map_or(true, |id| id == PLAYER_ID))
            .map(|n| (n, Vec2::new(n.x, n.y).distance_to(pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((node, distance)) = node {
            if distance > 1.0 {
                let dir = self.steer(pos, Vec2::new(node.x, node.y));
                input.move_x = dir.x;
                input.move_y = dir.y;
            } else {
                input.gather = true;
            }
            return input;
        }

        if let Some(exit) = self.exit {
            let dir = self.steer(pos, exit);
            input.move_x = dir.x;
            input.move_y = dir.y;
        }
        input
    }
}

/// Play one session in-process with the autopilot at the configured tick
/// rate
pub async fn run_local(
    config: &ServerConfig,
    zones: &ZoneManager,
    zone_id: u32,
    seed: Option<u64>,
) -> Result<SessionEndPayload, SessionError> {
    let zone = zones.get_zone(zone_id).ok_or(SessionError::UnknownZone(zone_id))?;
    let session = Session::new(1, zone, seed, config);
    let start = session.start_message();

    let (input_tx, input_rx) = mpsc::channel(64);
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();

    let mut autopilot = Autopilot::new();
    autopilot.observe(&start);
    LogSink.send(&start);

    let handle = tokio::spawn(run_session(
        session,
        input_rx,
        (ChannelSink::new(msg_tx), LogSink),
        config.tick_duration(),
    ));

    while let Some(msg) = msg_rx.recv().await {
        if let ServerMessage::SessionEnded(_) = msg {
            break;
        }
        if let Some(input) = autopilot.observe(&msg) {
            if input_tx.send(SessionInput::Input(input)).await.is_err() {
                break;
            }
        }
    }

    Ok(handle.await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ENEMY_ID_BASE;
    use arena_shared::SessionResult;

    fn started(session: &Session) -> Autopilot {
        let mut pilot = Autopilot::new();
        assert!(pilot.observe(&session.start_message()).is_none());
        pilot
    }

    fn test_session() -> Session {
        let zones = ZoneManager::with_defaults();
        Session::new(1, zones.get_zone(1).unwrap(), Some(11), &ServerConfig::default())
    }

    #[test]
    fn test_autopilot_attacks_nearby_enemy() {
        let mut session = test_session();
        let pos = session.world().player.body.position;
        let world = session.world_mut();
        let enemy = world.enemies.values_mut().next().unwrap();
        enemy.body.position = pos + Vec2::new(1.0, 0.0);
        let id = enemy.id;

        let mut pilot = started(&session);
        let input = pilot
            .observe(&ServerMessage::Snapshot(session.world().snapshot(1)))
            .unwrap();
        assert!(input.attacking);
        assert_eq!(input.target_id, Some(id));
        assert!(id >= ENEMY_ID_BASE);
        // Full stamina: the first damaging ability in priority order fires
        assert_eq!(input.ability_slot, Some(7));
        assert_eq!(input.stance_change, Some(Stance::Aggressive));
    }

    #[test]
    fn test_autopilot_heals_and_turtles_when_hurt() {
        let mut session = test_session();
        let max = session.world().player.body.max_hp;
        session.world_mut().player.body.apply_damage(max * 3 / 4);

        let mut pilot = started(&session);
        let input = pilot
            .observe(&ServerMessage::Snapshot(session.world().snapshot(1)))
            .unwrap();
        assert_eq!(input.stance_change, Some(Stance::Defensive));
        assert_eq!(input.ability_slot, Some(3));
    }

    #[test]
    fn test_autopilot_heads_for_exit_when_done() {
        let mut session = test_session();
        session.world_mut().enemies.clear();
        session.world_mut().resources.clear();

        let mut pilot = started(&session);
        let input = pilot
            .observe(&ServerMessage::Snapshot(session.world().snapshot(1)))
            .unwrap();
        assert!(input.is_moving());
        assert!(!input.attacking);
    }

    #[tokio::test]
    async fn test_run_local_times_out() {
        let config = ServerConfig {
            tick_rate: 1000,
            max_session_ticks: 30,
            ..Default::default()
        };
        let zones = ZoneManager::with_defaults();
        let payload = run_local(&config, &zones, 1, Some(9)).await.unwrap();
        assert_eq!(payload.result, SessionResult::Timeout);
    }

    #[tokio::test]
    async fn test_run_local_unknown_zone() {
        let zones = ZoneManager::with_defaults();
        let err = run_local(&ServerConfig::default(), &zones, 99, None).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownZone(99)));
    }
}
