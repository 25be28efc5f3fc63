//! Ranged enemy attacks in flight.

use arena_shared::{AbilityId, Element};

use crate::navigation::{check_collision, BoxObstacle, Vec2};

/// First id handed to projectiles
pub const PROJECTILE_ID_BASE: u64 = 30000;

/// Units per second
const PROJECTILE_SPEED: f32 = 9.0;

/// Lifetime in ticks
const PROJECTILE_TTL: u32 = 40;

const PROJECTILE_RADIUS: f32 = 0.3;

/// What happened to a projectile this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileStep {
    Flying,
    HitWall,
    Expired,
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u64,
    /// Enemy that fired it
    pub owner: u64,
    pub position: Vec2,
    pub velocity: Vec2,
    pub ability: Option<AbilityId>,
    pub element: Element,
    pub ticks_left: u32,
    pub radius: f32,
}

impl Projectile {
    pub fn new(id: u64, owner: u64, from: Vec2, to: Vec2, ability: Option<AbilityId>, element: Element) -> Self {
        let dir = (to - from).normalized();
        Self {
            id,
            owner,
            position: from,
            velocity: dir * PROJECTILE_SPEED,
            ability,
            element,
            ticks_left: PROJECTILE_TTL,
            radius: PROJECTILE_RADIUS,
        }
    }

    /// Move one tick
    pub fn advance(&mut self, dt: f32, walls: &[BoxObstacle]) -> ProjectileStep {
        if self.ticks_left == 0 {
            return ProjectileStep::Expired;
        }
        self.ticks_left -= 1;
        self.position = self.position + self.velocity * dt;
        if check_collision(self.position, self.radius, walls) {
            ProjectileStep::HitWall
        } else {
            ProjectileStep::Flying
        }
    }

    /// Overlaps a circle
    pub fn hits(&self, center: Vec2, radius: f32) -> bool {
        self.position.distance_to(center) <= self.radius + radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projectile_flies_and_expires() {
        let mut p = Projectile::new(PROJECTILE_ID_BASE, 10000, Vec2::ZERO, Vec2::new(100.0, 0.0), None, Element::None);
        for _ in 0..PROJECTILE_TTL {
            assert_eq!(p.advance(0.05, &[]), ProjectileStep::Flying);
        }
        assert_eq!(p.advance(0.05, &[]), ProjectileStep::Expired);
        assert!((p.position.x - 18.0).abs() < 1e-3);
    }

    #[test]
    fn test_projectile_stops_at_wall() {
        let wall = BoxObstacle::from_corners(1.0, -1.0, 2.0, 1.0);
        let mut p = Projectile::new(PROJECTILE_ID_BASE, 10000, Vec2::ZERO, Vec2::new(5.0, 0.0), None, Element::None);
        let mut steps = Vec::new();
        for _ in 0..5 {
            steps.push(p.advance(0.05, &[wall]));
        }
        assert!(steps.contains(&ProjectileStep::HitWall));
    }
}
