//! Homing projectiles launched by structures.

use glam::Vec2;
use tile_defence_core::{MoverId, ProjectileId, ProjectileSnapshot, StructureId};

/// Projectile travelling toward the current position of its target.
#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) structure: StructureId,
    pub(crate) target: MoverId,
    pub(crate) position: Vec2,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
}

impl Projectile {
    /// Moves toward `target` by at most `distance`. Returns `true` when the
    /// remaining gap is covered, leaving the projectile on the target.
    pub(crate) fn home_in(&mut self, target: Vec2, distance: f32) -> bool {
        let offset = target - self.position;
        if offset.length() <= distance {
            self.position = target;
            return true;
        }

        self.position += offset.normalize_or_zero() * distance;
        false
    }

    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            structure: self.structure,
            target: self.target,
            position: self.position,
            damage: self.damage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projectile(position: Vec2) -> Projectile {
        Projectile {
            id: ProjectileId::new(0),
            structure: StructureId::new(0),
            target: MoverId::new(0),
            position,
            speed: 2.0,
            damage: 1.0,
        }
    }

    #[test]
    fn short_steps_close_the_gap_along_the_line() {
        let mut projectile = projectile(Vec2::ZERO);

        assert!(!projectile.home_in(Vec2::new(3.0, 4.0), 2.5));
        assert!(projectile.position.distance(Vec2::new(1.5, 2.0)) < 1e-5);

        assert!(projectile.home_in(Vec2::new(3.0, 4.0), 3.0));
        assert_eq!(projectile.position, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn moving_target_is_chased_from_the_current_position() {
        let mut projectile = projectile(Vec2::ZERO);

        assert!(!projectile.home_in(Vec2::new(4.0, 0.0), 1.0));
        assert!(!projectile.home_in(Vec2::new(1.0, 3.0), 1.0));

        assert!(projectile.position.distance(Vec2::new(1.0, 1.0)) < 1e-5);
    }

    #[test]
    fn stalled_projectile_holds_position() {
        let mut projectile = projectile(Vec2::new(1.0, 1.0));

        assert!(!projectile.home_in(Vec2::new(2.0, 1.0), 0.0));
        assert_eq!(projectile.position, Vec2::new(1.0, 1.0));
        assert!(projectile.home_in(Vec2::new(1.0, 1.0), 0.0));
    }
}
