#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that launches and steers projectiles from targeting data.
//!
//! Every wave tick the system first asks the world to move the projectiles
//! already in flight by the time that elapsed, then launches new projectiles
//! from structures whose cooldown ran out. Projectiles launched in a tick
//! therefore start travelling on the next one.

use std::time::Duration;

use tile_defence_core::{
    Command, CooldownView, Event, Phase, ProjectileView, StructureId, TowerTarget,
};

/// Tower combat system that queues projectile commands during waves.
#[derive(Debug, Default)]
pub struct TowerCombat {
    launched: Vec<StructureId>,
}

impl TowerCombat {
    /// Creates a new tower combat system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::AdvanceProjectiles` for the time carried by `events`
    /// while anything is in flight, followed by one `Command::FireProjectile`
    /// per ready structure that holds a target.
    ///
    /// The world re-validates range and cooldown when applying a launch and
    /// discards projectiles whose target is gone when advancing them.
    pub fn handle(
        &mut self,
        phase: Phase,
        events: &[Event],
        cooldowns: &CooldownView,
        projectiles: &ProjectileView,
        targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if phase != Phase::Wave {
            return;
        }

        let elapsed: Duration = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt } => Some(*dt),
                _ => None,
            })
            .sum();
        if !projectiles.is_empty() && !elapsed.is_zero() {
            out.push(Command::AdvanceProjectiles { dt: elapsed });
        }

        self.launched.clear();
        for target in targets {
            if self.launched.contains(&target.structure) {
                continue;
            }
            let ready = cooldowns
                .get(target.structure)
                .is_some_and(|snapshot| snapshot.ready_in.is_zero());
            if ready {
                self.launched.push(target.structure);
                out.push(Command::FireProjectile {
                    structure: target.structure,
                    target: target.mover,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tile_defence_core::{CooldownSnapshot, MoverId, ProjectileId, ProjectileSnapshot};

    #[test]
    fn nothing_moves_or_launches_outside_waves() {
        let mut system = TowerCombat::new();
        let cooldowns = CooldownView::from_snapshots(vec![snapshot(1, Duration::ZERO)]);
        let mut out = Vec::new();

        system.handle(
            Phase::Build,
            &[elapsed(250)],
            &cooldowns,
            &in_flight(&[(0, 7)]),
            &[target(1, 7)],
            &mut out,
        );

        assert!(out.is_empty());
    }

    #[test]
    fn flight_is_advanced_before_new_launches() {
        let mut system = TowerCombat::new();
        let cooldowns = CooldownView::from_snapshots(vec![
            snapshot(5, Duration::ZERO),
            snapshot(2, Duration::from_millis(400)),
        ]);
        let events = [elapsed(100), Event::LivesChanged { lives: 3 }, elapsed(150)];
        let mut out = Vec::new();

        system.handle(
            Phase::Wave,
            &events,
            &cooldowns,
            &in_flight(&[(0, 4)]),
            &[target(2, 4), target(5, 1)],
            &mut out,
        );

        assert_eq!(
            out,
            vec![
                Command::AdvanceProjectiles {
                    dt: Duration::from_millis(250),
                },
                Command::FireProjectile {
                    structure: StructureId::new(5),
                    target: MoverId::new(1),
                },
            ],
        );
    }

    #[test]
    fn empty_sky_needs_no_advance() {
        let mut system = TowerCombat::new();
        let cooldowns = CooldownView::from_snapshots(vec![snapshot(3, Duration::ZERO)]);
        let mut out = Vec::new();

        system.handle(
            Phase::Wave,
            &[elapsed(100)],
            &cooldowns,
            &ProjectileView::default(),
            &[target(3, 9), target(3, 2), target(42, 3)],
            &mut out,
        );

        assert_eq!(
            out,
            vec![Command::FireProjectile {
                structure: StructureId::new(3),
                target: MoverId::new(9),
            }],
        );
    }

    #[test]
    fn paused_ticks_leave_projectiles_in_place() {
        let mut system = TowerCombat::new();
        let mut out = Vec::new();

        system.handle(
            Phase::Wave,
            &[elapsed(0)],
            &CooldownView::default(),
            &in_flight(&[(1, 1), (2, 1)]),
            &[],
            &mut out,
        );

        assert!(out.is_empty());
    }

    fn elapsed(millis: u64) -> Event {
        Event::TimeAdvanced {
            dt: Duration::from_millis(millis),
        }
    }

    fn in_flight(projectiles: &[(u32, u32)]) -> ProjectileView {
        ProjectileView::from_snapshots(
            projectiles
                .iter()
                .map(|&(id, mover)| ProjectileSnapshot {
                    id: ProjectileId::new(id),
                    structure: StructureId::new(0),
                    target: MoverId::new(mover),
                    position: Vec2::ZERO,
                    damage: 1.0,
                })
                .collect(),
        )
    }

    fn snapshot(structure: u32, ready_in: Duration) -> CooldownSnapshot {
        CooldownSnapshot {
            structure: StructureId::new(structure),
            ready_in,
        }
    }

    fn target(structure: u32, mover: u32) -> TowerTarget {
        TowerTarget {
            structure: StructureId::new(structure),
            mover: MoverId::new(mover),
        }
    }
}
