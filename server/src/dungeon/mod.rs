//! Procedural arena generation.
//!
//! A layout is generated once per session and is read-only afterwards.
//! The random source is always passed in, so concurrent generation never
//! touches shared state.

pub mod bsp;
pub mod grid;
pub mod mesh;

use log::debug;
use rand::Rng;

use arena_shared::{ArenaInfo, ExitMarker, WallRect};

use crate::navigation::Vec2;
use crate::rng::{entropy_rng, seeded_rng};

pub use grid::{Rect, TileGrid};

/// Arenas smaller than this on either side are enlarged
pub const MIN_ARENA_SIZE: u32 = 24;

/// Arenas larger than this on either side are shrunk
pub const MAX_ARENA_SIZE: u32 = 256;

/// Wall cells farther than this from any floor cell are dropped
pub const WALL_KEEP_RADIUS: i32 = 2;

/// Rooms larger than this (with both sides >= PILLAR_MIN_SIDE) get pillars
pub const PILLAR_AREA_THRESHOLD: i32 = 120;
pub const PILLAR_MIN_SIDE: i32 = 8;

/// Radius of the exit marker
pub const EXIT_RADIUS: f32 = 1.2;

/// A generated room
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub center: Vec2,
    pub is_start: bool,
    pub is_exit: bool,
}

impl Room {
    fn from_rect(rect: &Rect) -> Self {
        Self {
            x: rect.x as u32,
            y: rect.y as u32,
            w: rect.w as u32,
            h: rect.h as u32,
            center: Vec2::new(rect.x as f32 + rect.w as f32 / 2.0, rect.y as f32 + rect.h as f32 / 2.0),
            is_start: false,
            is_exit: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x as i32, self.y as i32, self.w as i32, self.h as i32)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x as f32
            && p.y >= self.y as f32
            && p.x < (self.x + self.w) as f32
            && p.y < (self.y + self.h) as f32
    }
}

/// Immutable arena produced by the generator
#[derive(Debug, Clone)]
pub struct ArenaLayout {
    pub width: u32,
    pub height: u32,
    pub walls: Vec<WallRect>,
    pub exit: ExitMarker,
    pub rooms: Vec<Room>,
    pub grid: TileGrid,
    start: usize,
    exit_room: usize,
}

impl ArenaLayout {
    pub fn start_room(&self) -> &Room {
        &self.rooms[self.start]
    }

    pub fn exit_room(&self) -> &Room {
        &self.rooms[self.exit_room]
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.grid.get(x, y)
    }

    /// Walkable test for a world position
    pub fn is_walkable_at(&self, p: Vec2) -> bool {
        self.grid.get(p.x.floor() as i32, p.y.floor() as i32)
    }

    /// Center of a random floor cell inside `room`, or the room center
    pub fn random_floor_point_in<R: Rng>(&self, room: &Room, rng: &mut R) -> Vec2 {
        for _ in 0..16 {
            let x = room.x as i32 + rng.gen_range(0..room.w as i32);
            let y = room.y as i32 + rng.gen_range(0..room.h as i32);
            if self.grid.get(x, y) {
                return Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            }
        }
        room.center
    }

    /// Wire view of the static geometry
    pub fn info(&self) -> ArenaInfo {
        ArenaInfo {
            width: self.width,
            height: self.height,
            walls: self.walls.clone(),
        }
    }

    /// Wall-less arena split into two rooms, start on the left and exit on
    /// the right. Used by tests and tools.
    pub fn open(width: u32, height: u32) -> Self {
        let mut grid = TileGrid::new(width, height);
        grid.carve_rect(&Rect::new(0, 0, width as i32, height as i32));

        let half = (width / 2) as i32;
        let mut left = Room::from_rect(&Rect::new(0, 0, half, height as i32));
        let mut right = Room::from_rect(&Rect::new(half, 0, width as i32 - half, height as i32));
        left.is_start = true;
        right.is_exit = true;

        Self {
            width,
            height,
            walls: Vec::new(),
            exit: ExitMarker {
                x: right.center.x,
                y: right.center.y,
                radius: EXIT_RADIUS,
            },
            rooms: vec![left, right],
            grid,
            start: 0,
            exit_room: 1,
        }
    }
}

/// Generate an arena. Seeded calls are reproducible on the same build.
pub fn generate(width: u32, height: u32, seed: Option<u64>) -> ArenaLayout {
    match seed {
        Some(seed) => generate_with_rng(width, height, &mut seeded_rng(seed)),
        None => generate_with_rng(width, height, &mut entropy_rng()),
    }
}

/// Generate an arena from an explicit random source
pub fn generate_with_rng<R: Rng>(width: u32, height: u32, rng: &mut R) -> ArenaLayout {
    let width = width.clamp(MIN_ARENA_SIZE, MAX_ARENA_SIZE);
    let height = height.clamp(MIN_ARENA_SIZE, MAX_ARENA_SIZE);
    let interior = Rect::new(
        bsp::BORDER,
        bsp::BORDER,
        width as i32 - 2 * bsp::BORDER,
        height as i32 - 2 * bsp::BORDER,
    );

    // 1-3: partition and rooms
    let tree = bsp::partition(interior, bsp::BSP_DEPTH, interior.w >= interior.h, rng);
    let leaves = tree.leaves();
    let (mut rooms, leaf_rooms) = bsp::place_rooms(&leaves, rng);

    // 4: corridors along the tree
    let mut corridors = Vec::new();
    if rooms.len() >= 2 {
        bsp::connect_tree(&tree, &leaf_rooms, &rooms, &interior, &mut corridors, rng);
    } else {
        debug!("[DUNGEON] BSP produced {} rooms, using fallback split", rooms.len());
        rooms = bsp::fallback_rooms(&interior);
    }

    // 5: connectivity repair
    let repaired = bsp::repair_connectivity(&rooms, &mut corridors, &interior, rng);

    // 6: start and exit
    let corners = [
        (0, 0),
        (width as i32, 0),
        (0, height as i32),
        (width as i32, height as i32),
    ];
    let corner = corners[rng.gen_range(0..corners.len())];
    let start = nearest_room_to(&rooms, corner);
    let exit_room = farthest_room_from(&rooms, &corridors, start);

    // 7-8: rasterize, pillars, boundary walls
    let mut grid = TileGrid::new(width, height);
    for rect in rooms.iter().chain(corridors.iter()) {
        grid.carve_rect(rect);
    }
    for room in &rooms {
        if room.area() > PILLAR_AREA_THRESHOLD && room.w >= PILLAR_MIN_SIDE && room.h >= PILLAR_MIN_SIDE {
            for (x, y) in bsp::pillar_cells(room) {
                grid.set(x, y, false);
            }
        }
    }

    let mask = boundary_mask(&grid);
    let walls = mesh::greedy_mesh(&mask, width, height);

    let mut rooms: Vec<Room> = rooms.iter().map(Room::from_rect).collect();
    rooms[start].is_start = true;
    rooms[exit_room].is_exit = true;
    let exit_center = rooms[exit_room].center;

    debug!(
        "[DUNGEON] {}x{}: {} rooms, {} corridors ({} repaired), {} wall rects",
        width,
        height,
        rooms.len(),
        corridors.len(),
        repaired,
        walls.len()
    );

    ArenaLayout {
        width,
        height,
        walls,
        exit: ExitMarker {
            x: exit_center.x,
            y: exit_center.y,
            radius: EXIT_RADIUS,
        },
        rooms,
        grid,
        start,
        exit_room,
    }
}

fn nearest_room_to(rooms: &[Rect], point: (i32, i32)) -> usize {
    let mut best = 0;
    let mut best_d = i64::MAX;
    for (i, room) in rooms.iter().enumerate() {
        let (cx, cy) = room.center();
        let dx = (cx - point.0) as i64;
        let dy = (cy - point.1) as i64;
        let d = dx * dx + dy * dy;
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// Room with the most hops from `start`; geometric distance breaks ties and
/// stands in for rooms the graph cannot reach.
fn farthest_room_from(rooms: &[Rect], corridors: &[Rect], start: usize) -> usize {
    let hops = bsp::hop_distances(rooms, corridors, start);
    let (sx, sy) = rooms[start].center();
    let geometric = |i: usize| {
        let (cx, cy) = rooms[i].center();
        let dx = (cx - sx) as i64;
        let dy = (cy - sy) as i64;
        dx * dx + dy * dy
    };

    let mut best: Option<(usize, Option<u32>, i64)> = None;
    for i in (0..rooms.len()).filter(|&i| i != start) {
        let candidate = (i, hops[i], geometric(i));
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let better = match (candidate.1, current.1) {
                    (Some(a), Some(b)) => a > b || (a == b && candidate.2 > current.2),
                    (Some(_), None) => true,
                    (None, Some(_)) => false,
                    (None, None) => candidate.2 > current.2,
                };
                if better {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.map(|(i, _, _)| i).unwrap_or(start)
}

/// Blocked cells within WALL_KEEP_RADIUS (Chebyshev) of a floor cell
pub fn boundary_mask(grid: &TileGrid) -> Vec<bool> {
    let (w, h) = (grid.width() as i32, grid.height() as i32);
    let mut mask = vec![false; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            if grid.get(x, y) {
                continue;
            }
            let near_floor = (-WALL_KEEP_RADIUS..=WALL_KEEP_RADIUS).any(|dy| {
                (-WALL_KEEP_RADIUS..=WALL_KEEP_RADIUS).any(|dx| grid.get(x + dx, y + dy))
            });
            mask[(y * w + x) as usize] = near_floor;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_cell(room: &Room, layout: &ArenaLayout) -> (i32, i32) {
        // Any floor cell of the room
        for y in room.y..room.y + room.h {
            for x in room.x..room.x + room.w {
                if layout.is_walkable(x as i32, y as i32) {
                    return (x as i32, y as i32);
                }
            }
        }
        panic!("room {:?} has no floor", room);
    }

    #[test]
    fn test_every_room_reachable_from_start() {
        for seed in 0..40 {
            for (w, h) in [(48, 48), (64, 40), (30, 60), (24, 24)] {
                let layout = generate(w, h, Some(seed));
                let (sx, sy) = room_cell(layout.start_room(), &layout);
                let reached = layout.grid.flood_from(sx, sy);
                for room in &layout.rooms {
                    let (x, y) = room_cell(room, &layout);
                    let i = (y as u32 * layout.width + x as u32) as usize;
                    assert!(reached[i], "seed {} {}x{}: room {:?} unreachable", seed, w, h, room);
                }
            }
        }
    }

    #[test]
    fn test_seeded_generation_is_byte_identical() {
        let a = generate(56, 48, Some(1234));
        let b = generate(56, 48, Some(1234));
        let bytes_a = bincode::serialize(&a.walls).unwrap();
        let bytes_b = bincode::serialize(&b.walls).unwrap();
        assert_eq!(bytes_a, bytes_b);
        assert_eq!(a.rooms, b.rooms);
        assert_eq!(a.exit, b.exit);
    }

    #[test]
    fn test_walls_round_trip_to_mask() {
        for seed in 0..10 {
            let layout = generate(48, 48, Some(seed));
            let mask = boundary_mask(&layout.grid);
            assert_eq!(mesh::rasterize(&layout.walls, layout.width, layout.height), mask);
        }
    }

    #[test]
    fn test_walls_never_cover_floor() {
        let layout = generate(64, 64, Some(99));
        let walls = mesh::rasterize(&layout.walls, layout.width, layout.height);
        for (wall, floor) in walls.iter().zip(layout.grid.cells()) {
            assert!(!(*wall && *floor));
        }
    }

    #[test]
    fn test_tiny_arena_still_has_two_rooms() {
        for seed in 0..20 {
            let layout = generate(4, 4, Some(seed));
            assert_eq!(layout.width, MIN_ARENA_SIZE);
            assert!(layout.rooms.len() >= 2);
            assert_eq!(layout.rooms.iter().filter(|r| r.is_start).count(), 1);
            assert_eq!(layout.rooms.iter().filter(|r| r.is_exit).count(), 1);
            assert_ne!(layout.start_room(), layout.exit_room());
        }
    }

    #[test]
    fn test_huge_arena_is_clamped() {
        let layout = generate(u32::MAX, u32::MAX, Some(1));
        assert_eq!(layout.width, MAX_ARENA_SIZE);
        assert_eq!(layout.height, MAX_ARENA_SIZE);
        assert!(layout.rooms.len() >= 2);
        assert!(layout.is_walkable_at(layout.start_room().center));
    }

    #[test]
    fn test_exit_marker_in_exit_room() {
        let layout = generate(48, 48, Some(7));
        let exit = Vec2::new(layout.exit.x, layout.exit.y);
        assert!(layout.exit_room().contains(exit));
    }

    #[test]
    fn test_large_rooms_get_pillars() {
        let mut found = false;
        for seed in 0..20 {
            let layout = generate(80, 80, Some(seed));
            for room in &layout.rooms {
                let r = room.rect();
                if r.area() > PILLAR_AREA_THRESHOLD && r.w >= PILLAR_MIN_SIDE && r.h >= PILLAR_MIN_SIDE {
                    for (x, y) in bsp::pillar_cells(&r) {
                        assert!(!layout.is_walkable(x, y));
                    }
                    found = true;
                }
            }
        }
        assert!(found, "no room large enough for pillars in 20 seeds");
    }

    #[test]
    fn test_random_floor_point_is_walkable() {
        let layout = generate(48, 48, Some(3));
        let mut rng = seeded_rng(3);
        for room in &layout.rooms {
            let p = layout.random_floor_point_in(room, &mut rng);
            assert!(layout.is_walkable_at(p));
        }
    }
}
