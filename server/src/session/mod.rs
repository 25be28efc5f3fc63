//! Session lifecycle.
//!
//! A `Session` owns one arena world. `run_session` drives it at a fixed
//! rate from buffered input and pushes events and snapshots into a sink.
//! The network server and the local driver both run sessions through it.

mod local;
pub mod rewards;

pub use local::{run_local, Autopilot, ChannelSink, LogSink};
pub use rewards::{RewardService, Rewards, ZoneRewardTable};

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use arena_shared::{GameEvent, InputState, ServerMessage, SessionEndPayload, SessionResult, Snapshot};

use crate::config::ServerConfig;
use crate::dungeon::generate;
use crate::rng::{entropy_rng, seeded_rng, AuditedRolls, RollSource};
use crate::world::{ArenaWorld, ZoneDefinition};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} has already ended")]
    Ended(u64),
    #[error("unknown zone {0}")]
    UnknownZone(u32),
    #[error("session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Ended(SessionResult),
}

/// Everything one `step` produced
#[derive(Debug, Clone)]
pub struct StepReport {
    pub events: Vec<GameEvent>,
    pub snapshot: Snapshot,
    /// Set on the step that ended the session
    pub ended: Option<SessionEndPayload>,
}

/// Messages from a client to its running session
#[derive(Debug, Clone)]
pub enum SessionInput {
    Input(InputState),
    Flee,
}

/// Destination for session output. Sends never fail from the caller's
/// point of view.
pub trait SnapshotSink: Send + 'static {
    fn send(&self, msg: &ServerMessage);
}

impl<A: SnapshotSink, B: SnapshotSink> SnapshotSink for (A, B) {
    fn send(&self, msg: &ServerMessage) {
        self.0.send(msg);
        self.1.send(msg);
    }
}

/// One arena run
pub struct Session {
    pub id: u64,
    zone: ZoneDefinition,
    world: ArenaWorld,
    rolls: Box<dyn RollSource + Send>,
    rewards: Box<dyn RewardService>,
    state: SessionState,
    max_ticks: u64,
    end_payload: Option<SessionEndPayload>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("zone", &self.zone.id)
            .field("tick", &self.world.tick)
            .field("state", &self.state)
            .finish()
    }
}

impl Session {
    /// Generate the arena and populate it. A seed makes layout, spawns and
    /// rolls reproducible.
    pub fn new(id: u64, zone: &ZoneDefinition, seed: Option<u64>, config: &ServerConfig) -> Self {
        let layout = Arc::new(generate(zone.arena_width, zone.arena_height, seed));
        let sim = config.sim_config();

        let (world, rolls) = match seed {
            Some(seed) => (
                ArenaWorld::populate(layout, zone, sim, &mut seeded_rng(seed.wrapping_add(1))),
                AuditedRolls::from_seed(seed.wrapping_add(2)),
            ),
            None => (
                ArenaWorld::populate(layout, zone, sim, &mut entropy_rng()),
                AuditedRolls::from_entropy(),
            ),
        };

        info!(
            "Session {} started in zone {} ({}), {} enemies, seed {:?}",
            id,
            zone.id,
            zone.name,
            world.enemies.len(),
            seed
        );

        Self {
            id,
            zone: zone.clone(),
            world,
            rolls: Box::new(rolls),
            rewards: Box::new(ZoneRewardTable::for_zone(zone)),
            state: SessionState::Running,
            max_ticks: config.max_session_ticks,
            end_payload: None,
        }
    }

    /// Replace the roll source
    pub fn with_rolls(mut self, rolls: impl RollSource + Send + 'static) -> Self {
        self.rolls = Box::new(rolls);
        self
    }

    pub fn with_rewards(mut self, rewards: impl RewardService + 'static) -> Self {
        self.rewards = Box::new(rewards);
        self
    }

    pub fn zone_id(&self) -> u32 {
        self.zone.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn world(&self) -> &ArenaWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut ArenaWorld {
        &mut self.world
    }

    pub fn end_payload(&self) -> Option<&SessionEndPayload> {
        self.end_payload.as_ref()
    }

    /// Message announcing this session to its client
    pub fn start_message(&self) -> ServerMessage {
        ServerMessage::SessionStarted {
            session_id: self.id,
            zone_id: self.zone.id,
            arena: self.world.layout.info(),
            exit: self.world.layout.exit,
        }
    }

    /// Advance one tick
    pub fn step(&mut self, input: &InputState) -> Result<StepReport, SessionError> {
        if !self.is_running() {
            return Err(SessionError::Ended(self.id));
        }

        let events = self.world.tick(input, self.rolls.as_mut());

        let result = self.world.outcome().or_else(|| {
            if self.world.player_at_exit() {
                Some(SessionResult::Fled)
            } else if self.world.tick >= self.max_ticks {
                Some(SessionResult::Timeout)
            } else {
                None
            }
        });
        let ended = result.map(|r| self.finish(r));

        Ok(StepReport {
            events,
            snapshot: self.world.snapshot(self.zone.id),
            ended,
        })
    }

    /// Abandon the run. Returns the end payload, which is the existing one
    /// if the session already ended.
    pub fn flee(&mut self) -> SessionEndPayload {
        match &self.end_payload {
            Some(payload) => payload.clone(),
            None => self.finish(SessionResult::Fled),
        }
    }

    fn finish(&mut self, result: SessionResult) -> SessionEndPayload {
        let rewards = if result == SessionResult::Victory {
            self.rewards.rewards_for(&self.world.kills, self.rolls.as_mut())
        } else {
            Rewards::default()
        };

        let payload = SessionEndPayload {
            result,
            xp_gained: rewards.xp,
            gold_gained: rewards.gold,
            items_dropped: rewards.items,
            items_gathered: self.world.gathered_items(),
        };

        info!(
            "Session {} ended after {} ticks: {:?} ({} kills, {} xp, {} gold)",
            self.id,
            self.world.tick,
            result,
            self.world.kills.len(),
            payload.xp_gained,
            payload.gold_gained
        );

        self.state = SessionState::Ended(result);
        self.end_payload = Some(payload.clone());
        payload
    }
}

/// Drive a session at a fixed rate until it ends, the client flees, or the
/// input channel closes. Inputs received between ticks are merged: axes and
/// held flags take the latest value, one-shot requests wait for the next
/// tick that consumes them.
pub async fn run_session<S: SnapshotSink>(
    mut session: Session,
    mut input_rx: mpsc::Receiver<SessionInput>,
    sink: S,
    tick_duration: Duration,
) -> SessionEndPayload {
    let mut buffered = InputState::default();

    loop {
        let tick_start = Instant::now();

        let mut flee = false;
        loop {
            match input_rx.try_recv() {
                Ok(SessionInput::Input(input)) => buffered.merge(input),
                Ok(SessionInput::Flee) => {
                    flee = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Session {} input channel closed", session.id);
                    flee = true;
                    break;
                }
            }
        }

        if flee {
            let payload = session.flee();
            sink.send(&ServerMessage::SessionEnded(payload.clone()));
            return payload;
        }

        match session.step(&buffered) {
            Ok(report) => {
                for event in report.events {
                    sink.send(&ServerMessage::Event(event));
                }
                sink.send(&ServerMessage::Snapshot(report.snapshot));
                if let Some(payload) = report.ended {
                    sink.send(&ServerMessage::SessionEnded(payload.clone()));
                    return payload;
                }
            }
            Err(e) => {
                warn!("Session {} stopped: {}", session.id, e);
                return session.flee();
            }
        }

        // One-shots are consumed by the tick that saw them
        buffered.ability_slot = None;
        buffered.stance_change = None;

        // Sleep until next tick
        let elapsed = tick_start.elapsed();
        if elapsed < tick_duration {
            tokio::time::sleep(tick_duration - elapsed).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}
