//! Movement, wall collision and steering for arena entities.
//!
//! This module provides:
//! - Wall boxes built from the arena's wall rectangles
//! - Circle-vs-box collision with inelastic push-out
//! - Line-of-sight tests
//! - Context-based steering with a grid A* fallback

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::f32::consts::PI;

use log::{debug, trace};

use arena_shared::WallRect;

use crate::dungeon::TileGrid;

/// Velocity multiplier applied after every tick
pub const FRICTION: f32 = 0.6;

/// Number of directions to sample for context steering
const STEERING_DIRECTIONS: usize = 16;

/// How far ahead to check for walls during steering
const STEERING_LOOKAHEAD: f32 = 3.0;

/// Push-out passes per tick for overlapping walls
const COLLISION_PASSES: usize = 3;

/// A* search budget in expanded cells
const PATH_MAX_ITERATIONS: usize = 600;

// ============================================================================
// Geometry
// ============================================================================

/// A 2D position or direction in arena units (one unit per grid cell)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Scale down to at most `max` length
    pub fn clamp_length(&self, max: f32) -> Self {
        let len = self.length();
        if len > max {
            *self * (max / len)
        } else {
            *self
        }
    }

    pub fn dot(&self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance_to(&self, other: Vec2) -> f32 {
        (other - *self).length()
    }

    /// Heading in radians, 0 along +x
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned wall box in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxObstacle {
    /// Minimum corner (smallest x, y)
    pub min: Vec2,
    /// Maximum corner (largest x, y)
    pub max: Vec2,
}

impl BoxObstacle {
    /// Create a box from min/max corners
    pub fn from_corners(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: Vec2::new(min_x.min(max_x), min_y.min(max_y)),
            max: Vec2::new(min_x.max(max_x), min_y.max(max_y)),
        }
    }

    pub fn from_wall(wall: &WallRect) -> Self {
        Self::from_corners(
            wall.x as f32,
            wall.y as f32,
            (wall.x + wall.w) as f32,
            (wall.y + wall.h) as f32,
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.min.x + self.max.x) * 0.5, (self.min.y + self.max.y) * 0.5)
    }
}

/// Convert wall rectangles to collision boxes
pub fn wall_boxes(walls: &[WallRect]) -> Vec<BoxObstacle> {
    walls.iter().map(BoxObstacle::from_wall).collect()
}

// ============================================================================
// Collision Detection
// ============================================================================

/// Check if a circle (at `pos` with `radius`) overlaps a box
pub fn circle_aabb_collision(pos: Vec2, radius: f32, obstacle: &BoxObstacle) -> bool {
    let closest_x = pos.x.clamp(obstacle.min.x, obstacle.max.x);
    let closest_y = pos.y.clamp(obstacle.min.y, obstacle.max.y);
    let dx = pos.x - closest_x;
    let dy = pos.y - closest_y;
    dx * dx + dy * dy < radius * radius
}

/// Check if a circle overlaps any wall
pub fn check_collision(pos: Vec2, radius: f32, walls: &[BoxObstacle]) -> bool {
    walls.iter().any(|b| circle_aabb_collision(pos, radius, b))
}

/// Push-out vector for a circle overlapping a box, if any
fn get_aabb_pushout(pos: Vec2, radius: f32, obstacle: &BoxObstacle) -> Option<Vec2> {
    let closest_x = pos.x.clamp(obstacle.min.x, obstacle.max.x);
    let closest_y = pos.y.clamp(obstacle.min.y, obstacle.max.y);

    let dx = pos.x - closest_x;
    let dy = pos.y - closest_y;
    let dist_sq = dx * dx + dy * dy;

    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    if dist > 0.0001 {
        let pushout_dist = radius - dist;
        Some(Vec2::new(dx / dist, dy / dist) * pushout_dist)
    } else {
        // Circle center is inside the box - push out along the shallowest side
        let left = pos.x - obstacle.min.x;
        let right = obstacle.max.x - pos.x;
        let top = pos.y - obstacle.min.y;
        let bottom = obstacle.max.y - pos.y;

        let min_side = left.min(right).min(top).min(bottom);
        let pushout = radius + min_side;

        if min_side == left {
            Some(Vec2::new(-pushout, 0.0))
        } else if min_side == right {
            Some(Vec2::new(pushout, 0.0))
        } else if min_side == top {
            Some(Vec2::new(0.0, -pushout))
        } else {
            Some(Vec2::new(0.0, pushout))
        }
    }
}

/// Push a moving circle out of every wall it overlaps. The velocity
/// component into each contact normal is removed; nothing bounces.
pub fn resolve_collision(pos: Vec2, velocity: Vec2, radius: f32, walls: &[BoxObstacle]) -> (Vec2, Vec2) {
    let mut pos = pos;
    let mut velocity = velocity;

    for _ in 0..COLLISION_PASSES {
        let mut collided = false;
        for wall in walls {
            if let Some(push) = get_aabb_pushout(pos, radius, wall) {
                let normal = push.normalized();
                pos = pos + push;
                let into = velocity.dot(normal);
                if into < 0.0 {
                    velocity = velocity - normal * into;
                }
                collided = true;
                trace!(
                    "[COLLISION] pushed ({:.2}, {:.2}) out of box ({:.1},{:.1})->({:.1},{:.1})",
                    push.x,
                    push.y,
                    wall.min.x,
                    wall.min.y,
                    wall.max.x,
                    wall.max.y
                );
            }
        }
        if !collided {
            break;
        }
    }

    (pos, velocity)
}

/// Keep a circle inside the arena rectangle
pub fn clamp_to_bounds(pos: Vec2, radius: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        pos.x.clamp(radius, (width - radius).max(radius)),
        pos.y.clamp(radius, (height - radius).max(radius)),
    )
}

/// Advance one body by one tick: integrate, collide, clamp, then apply
/// friction. Returns the new position and velocity.
pub fn step_body(
    pos: Vec2,
    velocity: Vec2,
    radius: f32,
    dt: f32,
    walls: &[BoxObstacle],
    bounds: (f32, f32),
) -> (Vec2, Vec2) {
    let moved = pos + velocity * dt;
    let (resolved, velocity) = resolve_collision(moved, velocity, radius, walls);
    let clamped = clamp_to_bounds(resolved, radius, bounds.0, bounds.1);
    (clamped, velocity * FRICTION)
}

// ============================================================================
// Line of Sight
// ============================================================================

/// Slab test: does the segment p0 -> p1 pass through the box?
fn segment_hits_box(p0: Vec2, p1: Vec2, b: &BoxObstacle) -> bool {
    let d = p1 - p0;
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;

    for (origin, dir, lo, hi) in [(p0.x, d.x, b.min.x, b.max.x), (p0.y, d.y, b.min.y, b.max.y)] {
        if dir.abs() < 1e-6 {
            if origin <= lo || origin >= hi {
                return false;
            }
        } else {
            let inv = 1.0 / dir;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min >= t_max {
                return false;
            }
        }
    }

    true
}

/// True when no wall blocks the straight line between two points
pub fn has_line_of_sight(from: Vec2, to: Vec2, walls: &[BoxObstacle]) -> bool {
    !walls.iter().any(|w| segment_hits_box(from, to, w))
}

// ============================================================================
// Context-Based Steering
// ============================================================================

/// Calculate the best movement direction using context-based steering
///
/// This works by:
/// 1. Sampling multiple directions around the entity
/// 2. For each direction, calculate an "interest" (how much it leads toward the target)
/// 3. For each direction, calculate a "danger" (how close walls are)
/// 4. Choose the direction with the highest (interest - danger) value
pub fn calculate_steering_direction(
    current_pos: Vec2,
    target_pos: Vec2,
    walls: &[BoxObstacle],
    radius: f32,
) -> Option<Vec2> {
    let to_target = target_pos - current_pos;
    if to_target.length() < 0.1 {
        return None;
    }
    let target_dir = to_target.normalized();

    let mut best_direction: Option<Vec2> = None;
    let mut best_score = f32::NEG_INFINITY;
    let mut blocked_directions = 0;

    for i in 0..STEERING_DIRECTIONS {
        let angle = (i as f32 / STEERING_DIRECTIONS as f32) * 2.0 * PI;
        let direction = Vec2::from_angle(angle);

        let interest = direction.dot(target_dir);

        let mut danger = 0.0f32;
        for check_dist in [1.0, 2.0, 3.0] {
            if check_collision(current_pos + direction * check_dist, radius, walls) {
                danger = danger.max(1.0 - (check_dist / STEERING_LOOKAHEAD));
            }
        }

        // Moving this way would collide immediately
        if check_collision(current_pos + direction * 0.5, radius, walls) {
            danger = 1.5;
            blocked_directions += 1;
        }

        let score = interest - danger * 2.0;
        if score > best_score {
            best_score = score;
            best_direction = Some(direction);
        }
    }

    trace!(
        "[STEER] best score={:.2}, blocked directions={}/{}",
        best_score,
        blocked_directions,
        STEERING_DIRECTIONS
    );

    if best_score > -0.5 {
        best_direction
    } else {
        debug!("[STEER] all directions blocked (best score={:.2})", best_score);
        None
    }
}

// ============================================================================
// A* Pathfinding (grid cells)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenNode {
    f_cost: f32,
    cell: (i32, i32),
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f_cost
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.cell.cmp(&other.cell))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn cell_of(p: Vec2) -> (i32, i32) {
    (p.x.floor() as i32, p.y.floor() as i32)
}

fn cell_center(c: (i32, i32)) -> Vec2 {
    Vec2::new(c.0 as f32 + 0.5, c.1 as f32 + 0.5)
}

/// Find a path over floor cells. Returns waypoints (cell centers, excluding
/// the start cell, ending with `goal`).
pub fn find_path(grid: &TileGrid, start: Vec2, goal: Vec2, max_iterations: usize) -> Option<Vec<Vec2>> {
    const DIRECTIONS: [(i32, i32); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];

    let start_cell = cell_of(start);
    let goal_cell = cell_of(goal);
    if !grid.get(goal_cell.0, goal_cell.1) {
        return None;
    }

    let heuristic = |c: (i32, i32)| {
        let dx = (c.0 - goal_cell.0) as f32;
        let dy = (c.1 - goal_cell.1) as f32;
        (dx * dx + dy * dy).sqrt()
    };

    let mut open = BinaryHeap::new();
    let mut g_cost: HashMap<(i32, i32), f32> = HashMap::new();
    let mut parent: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
    g_cost.insert(start_cell, 0.0);
    open.push(OpenNode {
        f_cost: heuristic(start_cell),
        cell: start_cell,
    });

    let mut iterations = 0;
    while let Some(OpenNode { cell, .. }) = open.pop() {
        iterations += 1;
        if iterations > max_iterations {
            break;
        }

        if cell == goal_cell {
            let mut path = vec![goal];
            let mut current = cell;
            while let Some(&prev) = parent.get(&current) {
                if prev != start_cell {
                    path.push(cell_center(prev));
                }
                current = prev;
            }
            path.reverse();
            return Some(path);
        }

        let current_g = g_cost.get(&cell).copied().unwrap_or(f32::INFINITY);
        for (dx, dy) in DIRECTIONS {
            let next = (cell.0 + dx, cell.1 + dy);
            if !grid.get(next.0, next.1) {
                continue;
            }
            // No corner cutting past blocked cells
            if dx != 0 && dy != 0 && (!grid.get(cell.0 + dx, cell.1) || !grid.get(cell.0, cell.1 + dy)) {
                continue;
            }

            let step = if dx != 0 && dy != 0 { 1.414 } else { 1.0 };
            let g = current_g + step;
            if g < g_cost.get(&next).copied().unwrap_or(f32::INFINITY) {
                g_cost.insert(next, g);
                parent.insert(next, cell);
                open.push(OpenNode {
                    f_cost: g + heuristic(next),
                    cell: next,
                });
            }
        }
    }

    None
}

// ============================================================================
// High-Level Navigation
// ============================================================================

/// Per-entity navigation memory
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    /// Current waypoint path (if using A*)
    pub path: Vec<Vec2>,
    /// Current waypoint index
    pub path_index: usize,
    /// Ticks without meaningful progress
    pub stuck_ticks: u32,
    /// Last position (for stuck detection)
    pub last_position: Option<Vec2>,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.path_index = 0;
        self.stuck_ticks = 0;
    }

    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.path.get(self.path_index).copied()
    }

    pub fn advance_waypoint(&mut self) {
        if self.path_index < self.path.len() {
            self.path_index += 1;
        }
    }
}

/// Ticks without progress before switching to A*
const STUCK_TICKS_BEFORE_PATHING: u32 = 6;

/// Unit direction an entity should move in to reach `target`.
///
/// Context steering handles open ground; once the entity stops making
/// progress it follows an A* path over the grid until the path runs out.
pub fn steer_toward(
    current_pos: Vec2,
    target_pos: Vec2,
    walls: &[BoxObstacle],
    grid: &TileGrid,
    nav: &mut NavigationState,
    radius: f32,
) -> Vec2 {
    let to_target = target_pos - current_pos;
    if to_target.length() < 0.2 {
        nav.clear_path();
        return Vec2::ZERO;
    }

    if let Some(last) = nav.last_position {
        if current_pos.distance_to(last) < 0.01 {
            nav.stuck_ticks += 1;
        } else {
            nav.stuck_ticks = 0;
        }
    }
    nav.last_position = Some(current_pos);

    if nav.stuck_ticks >= STUCK_TICKS_BEFORE_PATHING && nav.path.is_empty() {
        debug!("[NAV] stuck for {} ticks, switching to A*", nav.stuck_ticks);
        nav.stuck_ticks = 0;
        if let Some(path) = find_path(grid, current_pos, target_pos, PATH_MAX_ITERATIONS) {
            debug!("[NAV] A* found path with {} waypoints", path.len());
            nav.path = path;
            nav.path_index = 0;
        }
    }

    // Follow the path while one is active
    while let Some(waypoint) = nav.current_waypoint() {
        if current_pos.distance_to(waypoint) < 0.5 {
            nav.advance_waypoint();
            continue;
        }
        return (waypoint - current_pos).normalized();
    }
    if !nav.path.is_empty() {
        nav.path.clear();
        nav.path_index = 0;
    }

    if has_line_of_sight(current_pos, target_pos, walls) && !check_collision(current_pos + to_target.normalized() * 0.5, radius, walls) {
        return to_target.normalized();
    }

    calculate_steering_direction(current_pos, target_pos, walls, radius).unwrap_or_else(|| to_target.normalized())
}
