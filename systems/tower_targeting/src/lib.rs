#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.
//!
//! A structure keeps its lock for as long as the locked mover exists and stays
//! within range. Once the lock is released the structure searches again and
//! picks the nearest mover inside its circular range, preferring the lower
//! mover identifier when distances match.

use std::collections::BTreeMap;

use glam::Vec2;
use tile_defence_core::{MoverId, MoverView, Phase, StructureId, StructureView, TowerTarget};

/// Tower targeting system that remembers target locks between ticks.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    locks: BTreeMap<StructureId, MoverId>,
    mover_workspace: Vec<MoverCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system without any locks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mover currently locked by the structure, if any.
    #[must_use]
    pub fn lock(&self, structure: StructureId) -> Option<MoverId> {
        self.locks.get(&structure).copied()
    }

    /// Computes tower targets for the provided world snapshot.
    ///
    /// The output buffer is cleared before populating it with the latest
    /// assignments, ordered by structure identifier.
    pub fn handle(
        &mut self,
        phase: Phase,
        structures: &StructureView,
        movers: &MoverView,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if phase != Phase::Wave {
            self.locks.clear();
            return;
        }

        self.prepare_mover_workspace(movers);
        let previous = std::mem::take(&mut self.locks);

        for structure in structures.iter() {
            let origin = structure.coord.center();
            let max_distance = structure.range * structure.range;

            let retained = previous.get(&structure.id).copied().filter(|mover| {
                self.mover_workspace
                    .iter()
                    .find(|candidate| candidate.id == *mover)
                    .is_some_and(|candidate| {
                        candidate.position.distance_squared(origin) <= max_distance
                    })
            });

            let Some(mover) = retained.or_else(|| self.nearest(origin, max_distance)) else {
                continue;
            };

            let _ = self.locks.insert(structure.id, mover);
            out.push(TowerTarget {
                structure: structure.id,
                mover,
            });
        }
    }

    fn prepare_mover_workspace(&mut self, movers: &MoverView) {
        self.mover_workspace.clear();
        self.mover_workspace.reserve(movers.len());
        self.mover_workspace
            .extend(movers.iter().map(|snapshot| MoverCandidate {
                id: snapshot.id,
                position: snapshot.position,
            }));
    }

    fn nearest(&self, origin: Vec2, max_distance: f32) -> Option<MoverId> {
        let mut best: Option<(f32, MoverId)> = None;

        for candidate in &self.mover_workspace {
            let distance = candidate.position.distance_squared(origin);
            if distance > max_distance {
                continue;
            }

            let closer = match best {
                Some((best_distance, best_id)) => {
                    distance < best_distance || (distance == best_distance && candidate.id < best_id)
                }
                None => true,
            };
            if closer {
                best = Some((distance, candidate.id));
            }
        }

        best.map(|(_, id)| id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct MoverCandidate {
    id: MoverId,
    position: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::{EnemyKind, MoverSnapshot, StructureKind, StructureSnapshot, TileCoord};

    fn structure(id: u32, coord: (u32, u32), range: f32) -> StructureSnapshot {
        StructureSnapshot {
            id: StructureId::new(id),
            kind: StructureKind::new(0),
            coord: TileCoord::new(coord.0, coord.1),
            level: 1,
            range,
            damage: 1.0,
            fire_rate: 1.0,
            projectile_speed: 10.0,
            original_cost: 10,
        }
    }

    fn mover(id: u32, position: (f32, f32)) -> MoverSnapshot {
        MoverSnapshot {
            id: MoverId::new(id),
            enemy: EnemyKind::new(0),
            position: Vec2::new(position.0, position.1),
            health: 5.0,
            waypoint_cursor: 0,
        }
    }

    fn run(
        system: &mut TowerTargeting,
        structures: Vec<StructureSnapshot>,
        movers: Vec<MoverSnapshot>,
    ) -> Vec<TowerTarget> {
        let mut out = Vec::new();
        system.handle(
            Phase::Wave,
            &StructureView::from_snapshots(structures),
            &MoverView::from_snapshots(movers),
            &mut out,
        );
        out
    }

    #[test]
    fn targets_nearest_mover_within_range() {
        let mut system = TowerTargeting::new();
        let out = run(
            &mut system,
            vec![structure(1, (4, 4), 3.0)],
            vec![mover(2, (6.0, 4.0)), mover(3, (5.0, 4.5)), mover(4, (9.0, 4.0))],
        );

        assert_eq!(
            out,
            vec![TowerTarget {
                structure: StructureId::new(1),
                mover: MoverId::new(3),
            }]
        );
    }

    #[test]
    fn smaller_mover_id_is_preferred_when_distances_match() {
        let mut system = TowerTargeting::new();
        let out = run(
            &mut system,
            vec![structure(1, (2, 2), 2.0)],
            vec![mover(20, (3.0, 2.0)), mover(10, (1.0, 2.0))],
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].mover, MoverId::new(10));
    }

    #[test]
    fn lock_is_retained_while_target_stays_in_range() {
        let mut system = TowerTargeting::new();
        let towers = || vec![structure(1, (0, 0), 2.0)];

        let out = run(&mut system, towers(), vec![mover(1, (1.5, 0.0))]);
        assert_eq!(out[0].mover, MoverId::new(1));

        let out = run(
            &mut system,
            towers(),
            vec![mover(1, (1.8, 0.0)), mover(2, (0.5, 0.0))],
        );
        assert_eq!(out[0].mover, MoverId::new(1), "lock must survive a closer arrival");

        let out = run(
            &mut system,
            towers(),
            vec![mover(1, (2.5, 0.0)), mover(2, (0.5, 0.0))],
        );
        assert_eq!(out[0].mover, MoverId::new(2), "lock released once out of range");
        assert_eq!(system.lock(StructureId::new(1)), Some(MoverId::new(2)));
    }

    #[test]
    fn removed_target_releases_lock() {
        let mut system = TowerTargeting::new();
        let towers = || vec![structure(1, (0, 0), 2.0)];

        let _ = run(&mut system, towers(), vec![mover(1, (1.0, 0.0))]);
        let out = run(&mut system, towers(), Vec::new());

        assert!(out.is_empty());
        assert_eq!(system.lock(StructureId::new(1)), None);
    }

    #[test]
    fn mover_outside_range_is_ignored() {
        let mut system = TowerTargeting::new();
        let out = run(
            &mut system,
            vec![structure(1, (0, 0), 1.5)],
            vec![mover(2, (20.0, 20.0))],
        );

        assert!(out.is_empty());
    }

    #[test]
    fn leaving_the_wave_clears_output_and_locks() {
        let mut system = TowerTargeting::new();
        let _ = run(
            &mut system,
            vec![structure(1, (0, 0), 2.0)],
            vec![mover(1, (1.0, 1.0))],
        );

        let mut out = vec![TowerTarget {
            structure: StructureId::new(99),
            mover: MoverId::new(99),
        }];
        system.handle(
            Phase::Build,
            &StructureView::from_snapshots(vec![structure(1, (0, 0), 2.0)]),
            &MoverView::from_snapshots(vec![mover(1, (1.0, 1.0))]),
            &mut out,
        );

        assert!(out.is_empty());
        assert_eq!(system.lock(StructureId::new(1)), None);
    }
}
