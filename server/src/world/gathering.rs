//! Channelled resource gathering.

use arena_shared::{GameEvent, GatherCancelReason};
use log::{debug, warn};

use crate::entities::{Player, ResourceNode};

/// Maximum distance from a node to gather it
pub const GATHER_RADIUS: f32 = 1.5;

/// Speed below which the player counts as standing still
const STATIONARY_SPEED: f32 = 0.5;

/// Advance the player's gathering by one tick. `threatened` is true when any
/// enemy is engaged with the player.
pub fn step_gathering(
    player: &mut Player,
    nodes: &mut [ResourceNode],
    threatened: bool,
    tick_rate: u32,
    events: &mut Vec<GameEvent>,
) {
    match player.gathering {
        Some(node_id) => continue_gathering(player, node_id, nodes, threatened, tick_rate, events),
        None => try_start(player, nodes, threatened, events),
    }
}

fn continue_gathering(
    player: &mut Player,
    node_id: u64,
    nodes: &mut [ResourceNode],
    threatened: bool,
    tick_rate: u32,
    events: &mut Vec<GameEvent>,
) {
    let Some(node) = nodes.iter_mut().find(|n| n.id == node_id && !n.is_gathered) else {
        player.gathering = None;
        return;
    };

    let reason = if player.body.is_dead() || player.input.is_moving() {
        Some(GatherCancelReason::Moved)
    } else if threatened {
        Some(GatherCancelReason::Threatened)
    } else if !player.input.gather {
        Some(GatherCancelReason::Released)
    } else {
        None
    };

    if let Some(reason) = reason {
        debug!("[GATHER] node {} cancelled after {} ticks: {:?}", node.id, node.progress, reason);
        node.reset();
        player.gathering = None;
        events.push(GameEvent::GatherCancel { node_id, reason });
        return;
    }

    node.progress += 1;
    if node.progress < node.required_ticks(tick_rate) {
        return;
    }

    player.gathering = None;
    if !player.add_to_satchel(node.item_id, 1) {
        // Node stays up for a later attempt
        warn!("[GATHER] satchel full, node {} left ungathered", node.id);
        node.reset();
        events.push(GameEvent::GatherCancel {
            node_id,
            reason: GatherCancelReason::SatchelFull,
        });
        return;
    }
    node.is_gathered = true;
    node.gathering_by = None;
    events.push(GameEvent::Gather {
        node_id,
        item_id: node.item_id,
    });
}

fn try_start(player: &mut Player, nodes: &mut [ResourceNode], threatened: bool, events: &mut Vec<GameEvent>) {
    if !player.input.gather
        || player.input.is_moving()
        || player.body.velocity.length() >= STATIONARY_SPEED
        || threatened
        || player.body.is_dead()
        || player.body.is_stunned()
    {
        return;
    }

    let pos = player.body.position;
    let nearest = nodes
        .iter_mut()
        .filter(|n| {
            n.is_available_to(player.id)
                && n.position.distance_to(pos) <= GATHER_RADIUS
                && player.has_room_for(n.item_id)
        })
        .min_by(|a, b| a.position.distance_to(pos).total_cmp(&b.position.distance_to(pos)));

    if let Some(node) = nearest {
        node.gathering_by = Some(player.id);
        node.progress = 0;
        player.gathering = Some(node.id);
        events.push(GameEvent::GatherStart { node_id: node.id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{PLAYER_ID, RESOURCE_ID_BASE};
    use crate::navigation::Vec2;
    use arena_shared::{get_item_by_id, InputState, ItemStack};

    fn setup() -> (Player, Vec<ResourceNode>) {
        let mut player = Player::new(PLAYER_ID, Vec2::new(5.0, 5.0));
        player.input = InputState {
            gather: true,
            ..Default::default()
        };
        let ore = get_item_by_id(1).unwrap();
        let nodes = vec![ResourceNode::new(RESOURCE_ID_BASE, &ore, Vec2::new(6.0, 5.0))];
        (player, nodes)
    }

    #[test]
    fn test_gather_completes_once() {
        let (mut player, mut nodes) = setup();
        let mut events = Vec::new();
        let required = nodes[0].required_ticks(20);
        assert_eq!(required, 40);

        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        assert_eq!(events, vec![GameEvent::GatherStart { node_id: RESOURCE_ID_BASE }]);
        assert_eq!(nodes[0].gathering_by, Some(PLAYER_ID));

        for _ in 0..required {
            step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        }
        assert!(nodes[0].is_gathered);
        assert_eq!(player.gathering, None);
        assert_eq!(player.satchel_totals(), vec![ItemStack { item_id: 1, quantity: 1 }]);

        // Gathered nodes never pay out again
        events.clear();
        for _ in 0..50 {
            step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        }
        assert!(events.is_empty());
        assert_eq!(player.satchel_totals()[0].quantity, 1);
    }

    #[test]
    fn test_movement_cancels_and_resets() {
        let (mut player, mut nodes) = setup();
        let mut events = Vec::new();
        for _ in 0..10 {
            step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        }
        assert_eq!(nodes[0].progress, 9);

        player.input.move_x = 1.0;
        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        assert_eq!(nodes[0].progress, 0);
        assert_eq!(nodes[0].gathering_by, None);
        assert_eq!(
            events.last(),
            Some(&GameEvent::GatherCancel {
                node_id: RESOURCE_ID_BASE,
                reason: GatherCancelReason::Moved
            })
        );
    }

    #[test]
    fn test_threat_prevents_and_cancels() {
        let (mut player, mut nodes) = setup();
        let mut events = Vec::new();
        step_gathering(&mut player, &mut nodes, true, 20, &mut events);
        assert!(events.is_empty());

        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        step_gathering(&mut player, &mut nodes, true, 20, &mut events);
        assert!(matches!(
            events.last(),
            Some(GameEvent::GatherCancel {
                reason: GatherCancelReason::Threatened,
                ..
            })
        ));
    }

    #[test]
    fn test_release_cancels() {
        let (mut player, mut nodes) = setup();
        let mut events = Vec::new();
        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        player.input.gather = false;
        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        assert!(matches!(
            events.last(),
            Some(GameEvent::GatherCancel {
                reason: GatherCancelReason::Released,
                ..
            })
        ));
    }

    #[test]
    fn test_full_satchel_does_not_start() {
        let (mut player, mut nodes) = setup();
        let mut events = Vec::new();
        while player.add_to_satchel(12, 1) {}

        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        assert!(events.is_empty());
        assert_eq!(player.gathering, None);
        assert_eq!(nodes[0].gathering_by, None);
        assert!(!nodes[0].is_gathered);
    }

    #[test]
    fn test_satchel_filled_mid_gather_keeps_node() {
        let (mut player, mut nodes) = setup();
        let mut events = Vec::new();
        let required = nodes[0].required_ticks(20);
        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        while player.add_to_satchel(12, 1) {}

        for _ in 0..required {
            step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        }
        assert!(!nodes[0].is_gathered);
        assert_eq!(nodes[0].gathering_by, None);
        assert_eq!(player.gathering, None);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Gather { .. })));
        assert_eq!(
            events.last(),
            Some(&GameEvent::GatherCancel {
                node_id: RESOURCE_ID_BASE,
                reason: GatherCancelReason::SatchelFull
            })
        );
    }

    #[test]
    fn test_out_of_range_or_moving_does_not_start() {
        let (mut player, mut nodes) = setup();
        let mut events = Vec::new();
        player.body.position = Vec2::new(9.0, 5.0);
        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        assert!(events.is_empty());

        player.body.position = Vec2::new(5.0, 5.0);
        player.body.velocity = Vec2::new(2.0, 0.0);
        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        assert!(events.is_empty());

        nodes[0].gathering_by = Some(99);
        player.body.velocity = Vec2::ZERO;
        step_gathering(&mut player, &mut nodes, false, 20, &mut events);
        assert!(events.is_empty());
    }
}
