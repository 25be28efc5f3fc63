//! Network protocol definitions shared between client and server.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AbilityId, AiState, Archetype, Element, ItemRarity, Stance};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 3;

/// Server tick rate in Hz
pub const SERVER_TICK_RATE: u32 = 20;

/// Default server port
pub const DEFAULT_PORT: u16 = 7777;

// =============================================================================
// Arena Types
// =============================================================================

/// Axis-aligned wall rectangle in grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl WallRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    /// Whether the cell (cx, cy) lies inside this rectangle
    pub fn contains_cell(&self, cx: u32, cy: u32) -> bool {
        cx >= self.x && cx < self.x + self.w && cy >= self.y && cy < self.y + self.h
    }

    /// Whether two rectangles share at least one cell
    pub fn overlaps(&self, other: &WallRect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Marker placed at the exit room
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitMarker {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Static arena geometry sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaInfo {
    pub width: u32,
    pub height: u32,
    pub walls: Vec<WallRect>,
}

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Live input from a client, buffered into the player until the next tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    pub move_x: f32,
    pub move_y: f32,
    pub attacking: bool,
    /// One-shot: consumed by the tick that reads it
    pub ability_slot: Option<u8>,
    /// One-shot: consumed by the tick that reads it
    pub stance_change: Option<Stance>,
    pub gather: bool,
    pub target_id: Option<u64>,
}

impl InputState {
    /// Clamp movement axes to [-1, 1]; non-finite axes become 0
    pub fn sanitized(mut self) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        self.move_x = clamp(self.move_x);
        self.move_y = clamp(self.move_y);
        self
    }

    pub fn is_moving(&self) -> bool {
        self.move_x != 0.0 || self.move_y != 0.0
    }

    /// Fold a newer input into this buffered one. Axes and held flags take
    /// the newer value; one-shot requests survive until consumed.
    pub fn merge(&mut self, newer: InputState) {
        let newer = newer.sanitized();
        self.move_x = newer.move_x;
        self.move_y = newer.move_y;
        self.attacking = newer.attacking;
        self.gather = newer.gather;
        self.target_id = newer.target_id;
        if newer.ability_slot.is_some() {
            self.ability_slot = newer.ability_slot;
        }
        if newer.stance_change.is_some() {
            self.stance_change = newer.stance_change;
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Start a new arena session in a zone
    StartSession {
        protocol_version: u32,
        zone_id: u32,
        /// Optional layout seed for a reproducible arena
        seed: Option<u64>,
    },

    /// Input for the running session (sent frequently)
    Input(InputState),

    /// Abandon the run
    Flee,

    /// Disconnect gracefully
    Disconnect,
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Why an ability request was turned into a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum AbilityFailReason {
    #[error("no ability in that slot")]
    InvalidSlot,
    #[error("ability is on cooldown")]
    OnCooldown,
    #[error("not enough stamina")]
    InsufficientStamina,
    #[error("no valid target in range")]
    NoTarget,
    #[error("caster is stunned")]
    Stunned,
}

/// Status effect kind as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    BuffAtk,
    BuffDef,
    Poison,
    Stun,
    Heal,
    Riposte,
    Reveal,
}

/// Why a gather was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatherCancelReason {
    Moved,
    Threatened,
    Released,
    SatchelFull,
}

/// Fire-once notifications, distinct from the per-tick snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Damage {
        source: u64,
        target_id: u64,
        amount: u32,
        crit: bool,
        ability: Option<AbilityId>,
    },
    Death {
        entity_id: u64,
        killer_id: Option<u64>,
    },
    Dodge {
        attacker_id: u64,
        defender_id: u64,
    },
    Block {
        attacker_id: u64,
        defender_id: u64,
    },
    Guard {
        attacker_id: u64,
        defender_id: u64,
    },
    GatherStart {
        node_id: u64,
    },
    Gather {
        node_id: u64,
        item_id: u32,
    },
    GatherCancel {
        node_id: u64,
        reason: GatherCancelReason,
    },
    AbilityUse {
        caster_id: u64,
        ability: AbilityId,
        target_id: Option<u64>,
    },
    AbilityFail {
        caster_id: u64,
        slot: Option<u8>,
        reason: AbilityFailReason,
    },
    Heal {
        target_id: u64,
        amount: u32,
    },
    Buff {
        target_id: u64,
        kind: EffectKind,
        magnitude: f32,
        ticks: u32,
    },
    Reveal {
        target_id: u64,
        stance: Stance,
    },
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionResult {
    Victory,
    Defeat,
    Fled,
    Timeout,
}

/// A quantity of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: u32,
    pub quantity: u32,
}

/// Payload sent once when a session terminates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEndPayload {
    pub result: SessionResult,
    pub xp_gained: u64,
    pub gold_gained: u64,
    pub items_dropped: Vec<ItemStack>,
    pub items_gathered: Vec<ItemStack>,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Session created, arena generated
    SessionStarted {
        session_id: u64,
        zone_id: u32,
        arena: ArenaInfo,
        exit: ExitMarker,
    },

    /// Session could not be created
    SessionRejected {
        reason: String,
    },

    /// World state (sent every tick)
    Snapshot(Snapshot),

    /// One-off event
    Event(GameEvent),

    /// Session terminated
    SessionEnded(SessionEndPayload),
}

// =============================================================================
// State Types
// =============================================================================

/// Ability cooldown as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityState {
    pub id: AbilityId,
    pub cooldown: u32,
    pub max_cooldown: u32,
}

/// Player state for snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub max_hp: u32,
    pub stamina: f32,
    pub max_stamina: f32,
    pub stance: Stance,
    pub facing: f32,
    pub attack_cooldown: u32,
    pub abilities: Vec<AbilityState>,
    /// Resource node currently being gathered
    pub gathering: Option<u64>,
}

/// Enemy state for snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: u64,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub hp: u32,
    pub max_hp: u32,
    pub archetype: Archetype,
    pub element: Element,
    pub ai_state: AiState,
    pub facing: f32,
}

/// Resource node state for snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: u64,
    pub resource_id: u32,
    pub x: f32,
    pub y: f32,
    pub rarity: ItemRarity,
    pub gather_time: f32,
    pub is_gathered: bool,
    pub gathering_by: Option<u64>,
    pub gather_progress: u32,
}

/// Full per-tick snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub zone_id: u32,
    pub player: PlayerSnapshot,
    pub enemies: Vec<EnemySnapshot>,
    pub resources: Vec<ResourceSnapshot>,
    pub arena: ArenaInfo,
}

// =============================================================================
// Serialization helpers
// =============================================================================

impl ClientMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ServerMessage {
    pub fn serialize(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_sanitize_clamps_axes() {
        let input = InputState {
            move_x: 3.0,
            move_y: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(input.move_x, 1.0);
        assert_eq!(input.move_y, 0.0);
    }

    #[test]
    fn test_merge_keeps_pending_one_shots() {
        let mut buffered = InputState::default();
        buffered.merge(InputState {
            ability_slot: Some(2),
            stance_change: Some(Stance::Evasive),
            ..Default::default()
        });
        buffered.merge(InputState {
            move_x: -0.5,
            attacking: true,
            ..Default::default()
        });
        assert_eq!(buffered.ability_slot, Some(2));
        assert_eq!(buffered.stance_change, Some(Stance::Evasive));
        assert_eq!(buffered.move_x, -0.5);
        assert!(buffered.attacking);
    }

    #[test]
    fn test_wall_rect_overlap() {
        let a = WallRect::new(0, 0, 4, 4);
        assert!(a.overlaps(&WallRect::new(3, 3, 2, 2)));
        assert!(!a.overlaps(&WallRect::new(4, 0, 2, 2)));
        assert!(a.contains_cell(3, 3));
        assert!(!a.contains_cell(4, 0));
    }

    #[test]
    fn test_client_message_decodes() {
        let msg = ClientMessage::StartSession {
            protocol_version: PROTOCOL_VERSION,
            zone_id: 1,
            seed: Some(42),
        };
        let bytes = msg.serialize().unwrap();
        match ClientMessage::deserialize(&bytes).unwrap() {
            ClientMessage::StartSession { zone_id, seed, .. } => {
                assert_eq!(zone_id, 1);
                assert_eq!(seed, Some(42));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
}
