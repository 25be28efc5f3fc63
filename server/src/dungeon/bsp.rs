//! Binary space partitioning, room placement and corridor carving.

use std::collections::VecDeque;

use log::{debug, trace, warn};
use rand::Rng;

use super::grid::Rect;

/// Solid border around the arena, in cells
pub const BORDER: i32 = 1;

/// Maximum depth of the partition tree
pub const BSP_DEPTH: u32 = 4;

/// Smallest leaf side a split may produce
pub const MIN_LEAF_SIZE: i32 = 8;

const SPLIT_RATIO_MIN: f32 = 0.4;
const SPLIT_RATIO_MAX: f32 = 0.6;

/// Chance that a leaf is left empty
const LEAF_SKIP_CHANCE: f64 = 0.12;

/// Gap kept between a room and its leaf edge
const ROOM_MARGIN: i32 = 1;

pub const MIN_ROOM_SIZE: i32 = 4;

pub const CORRIDOR_WIDTH: i32 = 2;

/// Node of the partition tree
#[derive(Debug, Clone)]
pub enum BspNode {
    Leaf(Rect),
    Split {
        left: Box<BspNode>,
        right: Box<BspNode>,
    },
}

impl BspNode {
    /// Leaf rectangles in left-to-right order
    pub fn leaves(&self) -> Vec<Rect> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<Rect>) {
        match self {
            BspNode::Leaf(rect) => out.push(*rect),
            BspNode::Split { left, right } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            }
        }
    }
}

/// Recursively bisect `area`. `vertical` is the preferred cut when both
/// axes can be split; the preference flips at every level.
pub fn partition<R: Rng>(area: Rect, depth: u32, vertical: bool, rng: &mut R) -> BspNode {
    if depth == 0 {
        return BspNode::Leaf(area);
    }

    let can_vertical = area.w >= 2 * MIN_LEAF_SIZE;
    let can_horizontal = area.h >= 2 * MIN_LEAF_SIZE;
    let vertical = match (can_vertical, can_horizontal) {
        (true, true) => vertical,
        (true, false) => true,
        (false, true) => false,
        (false, false) => return BspNode::Leaf(area),
    };

    let len = if vertical { area.w } else { area.h };
    let ratio = rng.gen_range(SPLIT_RATIO_MIN..=SPLIT_RATIO_MAX);
    let cut = ((len as f32 * ratio).round() as i32).clamp(MIN_LEAF_SIZE, len - MIN_LEAF_SIZE);

    let (a, b) = if vertical {
        (
            Rect::new(area.x, area.y, cut, area.h),
            Rect::new(area.x + cut, area.y, len - cut, area.h),
        )
    } else {
        (
            Rect::new(area.x, area.y, area.w, cut),
            Rect::new(area.x, area.y + cut, area.w, len - cut),
        )
    };

    BspNode::Split {
        left: Box::new(partition(a, depth - 1, !vertical, rng)),
        right: Box::new(partition(b, depth - 1, !vertical, rng)),
    }
}

/// Inscribe a random room in a leaf, or None if the leaf is too small
pub fn inscribe_room<R: Rng>(leaf: &Rect, rng: &mut R) -> Option<Rect> {
    let avail_w = leaf.w - 2 * ROOM_MARGIN;
    let avail_h = leaf.h - 2 * ROOM_MARGIN;
    if avail_w < MIN_ROOM_SIZE || avail_h < MIN_ROOM_SIZE {
        trace!("[BSP] leaf {:?} too small for a room", leaf);
        return None;
    }

    let w = rng.gen_range(MIN_ROOM_SIZE.max(avail_w / 2)..=avail_w);
    let h = rng.gen_range(MIN_ROOM_SIZE.max(avail_h / 2)..=avail_h);
    let x = leaf.x + ROOM_MARGIN + rng.gen_range(0..=avail_w - w);
    let y = leaf.y + ROOM_MARGIN + rng.gen_range(0..=avail_h - h);
    Some(Rect::new(x, y, w, h))
}

/// Place rooms in leaves, skipping some at random.
///
/// Returns the rooms plus, for every leaf, the index of its room. Skipped
/// leaves are reused when fewer than two rooms were placed.
pub fn place_rooms<R: Rng>(leaves: &[Rect], rng: &mut R) -> (Vec<Rect>, Vec<Option<usize>>) {
    let mut rooms = Vec::new();
    let mut leaf_rooms = vec![None; leaves.len()];
    let mut skipped = Vec::new();

    for (i, leaf) in leaves.iter().enumerate() {
        if rng.gen_bool(LEAF_SKIP_CHANCE) {
            skipped.push(i);
            continue;
        }
        if let Some(room) = inscribe_room(leaf, rng) {
            leaf_rooms[i] = Some(rooms.len());
            rooms.push(room);
        }
    }

    if rooms.len() < 2 {
        debug!("[BSP] only {} rooms placed, backfilling skipped leaves", rooms.len());
        for i in skipped {
            if rooms.len() >= 2 {
                break;
            }
            if let Some(room) = inscribe_room(&leaves[i], rng) {
                leaf_rooms[i] = Some(rooms.len());
                rooms.push(room);
            }
        }
    }

    (rooms, leaf_rooms)
}

/// Two rooms from halving the interior along its longer axis
pub fn fallback_rooms(interior: &Rect) -> Vec<Rect> {
    let halves = if interior.w >= interior.h {
        let half = interior.w / 2;
        [
            Rect::new(interior.x, interior.y, half, interior.h),
            Rect::new(interior.x + half, interior.y, interior.w - half, interior.h),
        ]
    } else {
        let half = interior.h / 2;
        [
            Rect::new(interior.x, interior.y, interior.w, half),
            Rect::new(interior.x, interior.y + half, interior.w, interior.h - half),
        ]
    };

    halves
        .iter()
        .map(|h| {
            let margin = if h.w > 2 * ROOM_MARGIN && h.h > 2 * ROOM_MARGIN {
                ROOM_MARGIN
            } else {
                0
            };
            Rect::new(h.x + margin, h.y + margin, h.w - 2 * margin, h.h - 2 * margin)
        })
        .collect()
}

/// Closest room pair between two groups, by center distance
pub fn nearest_pair(a: &[usize], b: &[usize], rooms: &[Rect]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, i64)> = None;
    for &i in a {
        for &j in b {
            let (ax, ay) = rooms[i].center();
            let (bx, by) = rooms[j].center();
            let dx = (ax - bx) as i64;
            let dy = (ay - by) as i64;
            let d = dx * dx + dy * dy;
            if best.map_or(true, |(_, _, bd)| d < bd) {
                best = Some((i, j, d));
            }
        }
    }
    best.map(|(i, j, _)| (i, j))
}

/// Double-width L-shaped corridor between two cells, clipped to `bounds`
pub fn l_corridor(a: (i32, i32), b: (i32, i32), horizontal_first: bool, bounds: &Rect) -> Vec<Rect> {
    let corner = if horizontal_first { (b.0, a.1) } else { (a.0, b.1) };
    [segment(a, corner), segment(corner, b)]
        .iter()
        .filter_map(|s| s.clip(bounds))
        .collect()
}

fn segment(p: (i32, i32), q: (i32, i32)) -> Rect {
    Rect::new(
        p.0.min(q.0),
        p.1.min(q.1),
        (p.0 - q.0).abs() + CORRIDOR_WIDTH,
        (p.1 - q.1).abs() + CORRIDOR_WIDTH,
    )
}

/// Carve corridors bottom-up: at each split, join the nearest room pair
/// across the two subtrees.
pub fn connect_tree<R: Rng>(
    tree: &BspNode,
    leaf_rooms: &[Option<usize>],
    rooms: &[Rect],
    bounds: &Rect,
    corridors: &mut Vec<Rect>,
    rng: &mut R,
) {
    let mut next_leaf = 0;
    connect_subtree(tree, leaf_rooms, &mut next_leaf, rooms, bounds, corridors, rng);
}

fn connect_subtree<R: Rng>(
    node: &BspNode,
    leaf_rooms: &[Option<usize>],
    next_leaf: &mut usize,
    rooms: &[Rect],
    bounds: &Rect,
    corridors: &mut Vec<Rect>,
    rng: &mut R,
) -> Vec<usize> {
    match node {
        BspNode::Leaf(_) => {
            let room = leaf_rooms.get(*next_leaf).copied().flatten();
            *next_leaf += 1;
            room.into_iter().collect()
        }
        BspNode::Split { left, right } => {
            let mut l = connect_subtree(left, leaf_rooms, next_leaf, rooms, bounds, corridors, rng);
            let r = connect_subtree(right, leaf_rooms, next_leaf, rooms, bounds, corridors, rng);
            if let Some((i, j)) = nearest_pair(&l, &r, rooms) {
                let horizontal_first = rng.gen_bool(0.5);
                corridors.extend(l_corridor(rooms[i].center(), rooms[j].center(), horizontal_first, bounds));
            }
            l.extend(r);
            l
        }
    }
}

// ============================================================================
// Room graph
// ============================================================================

/// Rooms first, then corridors, with edges between rectangles whose cells touch
fn adjacency(rooms: &[Rect], corridors: &[Rect]) -> Vec<Vec<usize>> {
    let nodes: Vec<&Rect> = rooms.iter().chain(corridors.iter()).collect();
    let mut adj = vec![Vec::new(); nodes.len()];
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            if nodes[i].connects(nodes[j]) {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }
    adj
}

fn bfs(adj: &[Vec<usize>], start: usize) -> Vec<Option<u32>> {
    let mut dist = vec![None; adj.len()];
    let mut queue = VecDeque::new();
    dist[start] = Some(0);
    queue.push_back(start);
    while let Some(n) = queue.pop_front() {
        let d = dist[n].unwrap_or(0);
        for &m in &adj[n] {
            if dist[m].is_none() {
                dist[m] = Some(d + 1);
                queue.push_back(m);
            }
        }
    }
    dist
}

/// Hop distance from room `start` to every room through the rect graph
pub fn hop_distances(rooms: &[Rect], corridors: &[Rect], start: usize) -> Vec<Option<u32>> {
    let adj = adjacency(rooms, corridors);
    let mut dist = bfs(&adj, start);
    dist.truncate(rooms.len());
    dist
}

/// Join every room component to room 0's component. Returns the number
/// of corridors added.
pub fn repair_connectivity<R: Rng>(
    rooms: &[Rect],
    corridors: &mut Vec<Rect>,
    bounds: &Rect,
    rng: &mut R,
) -> usize {
    let mut added = 0;
    if rooms.len() < 2 {
        return added;
    }

    loop {
        let reached = hop_distances(rooms, corridors, 0);
        let (main, detached): (Vec<usize>, Vec<usize>) =
            (0..rooms.len()).partition(|&i| reached[i].is_some());
        if detached.is_empty() {
            break;
        }

        // Join one component per pass: the detached rooms connected to the first one
        let seed = detached[0];
        let comp_reach = hop_distances(rooms, corridors, seed);
        let component: Vec<usize> = detached
            .iter()
            .copied()
            .filter(|&i| comp_reach[i].is_some())
            .collect();

        let Some((i, j)) = nearest_pair(&main, &component, rooms) else {
            break;
        };
        debug!("[BSP] joining detached room {} to room {}", j, i);
        let horizontal_first = rng.gen_bool(0.5);
        corridors.extend(l_corridor(rooms[i].center(), rooms[j].center(), horizontal_first, bounds));
        added += 1;

        if added > rooms.len() * 2 {
            warn!("[BSP] connectivity repair gave up after {} corridors", added);
            break;
        }
    }

    added
}

/// Four 1x1 pillar cells in a symmetric grid, inset a quarter of each side
pub fn pillar_cells(room: &Rect) -> [(i32, i32); 4] {
    let ix = room.w / 4;
    let iy = room.h / 4;
    let (x0, x1) = (room.x + ix, room.right() - 1 - ix);
    let (y0, y1) = (room.y + iy, room.bottom() - 1 - iy);
    [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded_rng;

    #[test]
    fn test_partition_respects_min_leaf() {
        let mut rng = seeded_rng(3);
        let tree = partition(Rect::new(1, 1, 62, 46), BSP_DEPTH, true, &mut rng);
        let leaves = tree.leaves();
        assert!(leaves.len() > 1);
        for leaf in &leaves {
            assert!(leaf.w >= MIN_LEAF_SIZE && leaf.h >= MIN_LEAF_SIZE, "{:?}", leaf);
        }
        let area: i32 = leaves.iter().map(|l| l.area()).sum();
        assert_eq!(area, 62 * 46);
    }

    #[test]
    fn test_rooms_stay_inside_leaves() {
        let mut rng = seeded_rng(11);
        let leaf = Rect::new(5, 5, 12, 9);
        for _ in 0..50 {
            let room = inscribe_room(&leaf, &mut rng).unwrap();
            assert!(room.x > leaf.x && room.y > leaf.y);
            assert!(room.right() < leaf.right() && room.bottom() < leaf.bottom());
            assert!(room.w >= MIN_ROOM_SIZE && room.h >= MIN_ROOM_SIZE);
        }
        assert!(inscribe_room(&Rect::new(0, 0, 5, 12), &mut rng).is_none());
    }

    #[test]
    fn test_l_corridor_links_endpoints() {
        let bounds = Rect::new(0, 0, 40, 40);
        let a = Rect::new(2, 2, 4, 4);
        let b = Rect::new(20, 25, 5, 5);
        for horizontal_first in [true, false] {
            let corridor = l_corridor(a.center(), b.center(), horizontal_first, &bounds);
            assert_eq!(corridor.len(), 2);
            assert!(corridor[0].connects(&corridor[1]));
            assert!(corridor.iter().any(|c| c.connects(&a)));
            assert!(corridor.iter().any(|c| c.connects(&b)));
        }
    }

    #[test]
    fn test_repair_joins_isolated_rooms() {
        let mut rng = seeded_rng(5);
        let bounds = Rect::new(1, 1, 48, 48);
        let rooms = vec![
            Rect::new(2, 2, 6, 6),
            Rect::new(30, 2, 6, 6),
            Rect::new(2, 30, 6, 6),
            Rect::new(30, 30, 6, 6),
        ];
        let mut corridors = Vec::new();
        let added = repair_connectivity(&rooms, &mut corridors, &bounds, &mut rng);
        assert_eq!(added, 3);
        let hops = hop_distances(&rooms, &corridors, 0);
        assert!(hops.iter().all(|h| h.is_some()));
    }

    #[test]
    fn test_pillars_are_inset_and_separate() {
        let room = Rect::new(10, 10, 12, 10);
        let pillars = pillar_cells(&room);
        for (x, y) in pillars {
            assert!(x > room.x && x < room.right() - 1);
            assert!(y > room.y && y < room.bottom() - 1);
        }
        assert_ne!(pillars[0], pillars[1]);
        assert!((pillars[1].0 - pillars[0].0) > 1);
    }
}
