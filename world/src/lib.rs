#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Tile Defence.
//!
//! The world owns the grid, the placement ledger, every active mover, the
//! projectiles in flight and the phase state machine together with lives and
//! currency. It is mutated only
//! through [`apply`] and observed through the functions in [`query`].

mod grid;
mod ledger;
mod navigation;
mod projectiles;

use std::time::Duration;

use glam::Vec2;
use tile_defence_core::{
    Catalog, Command, EconomyError, EnemyKind, Event, LevelDefinition, LevelError, MoverId, Phase,
    ProjectileId, SimulationConfig, SpawnError, StructureId, StructureKind, TileCoord, TileKind,
    WaveDefinition, WELCOME_BANNER,
};
use tracing::{debug, info, warn};

pub use grid::Grid;
pub use navigation::find_path;

use ledger::PlacementLedger;
use projectiles::Projectile;

/// Represents the authoritative Tile Defence world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    grid: Grid,
    waves: Vec<WaveDefinition>,
    catalog: Catalog,
    config: SimulationConfig,
    starting_lives: u32,
    starting_currency: u32,
    phase: Phase,
    lives: u32,
    currency: u32,
    wave: u32,
    wave_clock: Duration,
    build_countdown: Option<Duration>,
    spawning: bool,
    movers: Vec<Mover>,
    next_mover_id: MoverId,
    projectiles: Vec<Projectile>,
    next_projectile_id: ProjectileId,
    ledger: PlacementLedger,
}

impl World {
    /// Creates a world for the provided level.
    ///
    /// Fails when the level layout is malformed, when it grants no lives,
    /// when no route connects the start and end tiles, or when the waves and
    /// catalog disagree.
    pub fn new(
        level: &LevelDefinition,
        catalog: Catalog,
        config: SimulationConfig,
    ) -> Result<Self, LevelError> {
        validate_catalog(&catalog)?;
        let grid = Grid::from_level(level)?;
        if level.starting_lives == 0 {
            return Err(LevelError::NoLives);
        }
        validate_waves(&level.waves, &catalog)?;

        if find_path(&grid, grid.start(), grid.end()).is_none() {
            return Err(LevelError::Unreachable {
                start: grid.start(),
                end: grid.end(),
            });
        }

        info!(
            width = grid.width(),
            height = grid.height(),
            waves = level.waves.len(),
            "level loaded"
        );

        Ok(Self {
            banner: WELCOME_BANNER,
            grid,
            waves: level.waves.clone(),
            catalog,
            config,
            starting_lives: level.starting_lives,
            starting_currency: level.starting_currency,
            phase: Phase::None,
            lives: level.starting_lives,
            currency: level.starting_currency,
            wave: 0,
            wave_clock: Duration::ZERO,
            build_countdown: None,
            spawning: false,
            movers: Vec::new(),
            next_mover_id: MoverId::new(0),
            projectiles: Vec::new(),
            next_projectile_id: ProjectileId::new(0),
            ledger: PlacementLedger::new(),
        })
    }

    fn total_waves(&self) -> u32 {
        u32::try_from(self.waves.len()).unwrap_or(u32::MAX)
    }

    fn enter_phase(&mut self, phase: Phase, out_events: &mut Vec<Event>) {
        if self.phase == phase || self.phase.is_terminal() {
            return;
        }

        self.build_countdown = None;
        self.spawning = false;
        self.projectiles.clear();
        self.phase = phase;
        info!(?phase, wave = self.wave, "phase changed");
        out_events.push(Event::PhaseChanged { phase });

        match phase {
            Phase::Build => {
                let countdown = self.config.build_countdown();
                self.build_countdown = Some(countdown);
                out_events.push(Event::CountdownChanged {
                    seconds_remaining: whole_seconds(countdown),
                });
            }
            Phase::Wave => {
                self.wave = self.wave.saturating_add(1);
                self.wave_clock = Duration::ZERO;
                self.spawning = true;
                out_events.push(Event::WaveStarted {
                    wave: self.wave,
                    total: self.total_waves(),
                });
            }
            Phase::None | Phase::GameOver | Phase::Victory => {}
        }
    }

    fn advance_build_countdown(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let Some(remaining) = self.build_countdown else {
            return;
        };

        let next = remaining.saturating_sub(dt);
        if next.is_zero() {
            self.build_countdown = None;
            if self.phase == Phase::Build {
                self.enter_phase(Phase::Wave, out_events);
            }
            return;
        }

        self.build_countdown = Some(next);
        let seconds_remaining = whole_seconds(next);
        if seconds_remaining != whole_seconds(remaining) {
            out_events.push(Event::CountdownChanged { seconds_remaining });
        }
    }

    fn lose_life(&mut self, out_events: &mut Vec<Event>) {
        if self.lives == 0 {
            return;
        }

        self.lives -= 1;
        out_events.push(Event::LivesChanged { lives: self.lives });
        if self.lives == 0 {
            self.enter_phase(Phase::GameOver, out_events);
        }
    }

    fn credit(&mut self, amount: u32, out_events: &mut Vec<Event>) {
        if amount == 0 {
            return;
        }
        self.currency = self.currency.saturating_add(amount);
        out_events.push(Event::CurrencyChanged {
            currency: self.currency,
        });
    }

    fn spawn_mover(&mut self, wave: u32, enemy: EnemyKind, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Wave || wave != self.wave {
            return;
        }

        let Some(definition) = self.catalog.enemy(enemy) else {
            warn!(wave, %enemy, "spawn aborted: unknown enemy kind");
            out_events.push(Event::SpawnAborted {
                wave,
                enemy,
                reason: SpawnError::UnknownEnemy,
            });
            return;
        };

        let start = self.grid.start();
        let end = self.grid.end();
        let Some(waypoints) = find_path(&self.grid, start, end) else {
            warn!(wave, %enemy, %start, %end, "spawn aborted: no path");
            out_events.push(Event::SpawnAborted {
                wave,
                enemy,
                reason: SpawnError::PathUnreachable { start, end },
            });
            return;
        };

        let id = self.next_mover_id;
        self.next_mover_id = MoverId::new(id.get().saturating_add(1));
        self.movers.push(Mover {
            id,
            enemy,
            health: definition.health,
            speed: definition.speed,
            bounty: definition.bounty,
            position: start.center(),
            waypoints,
            cursor: 0,
        });
        debug!(mover = %id, %enemy, wave, "mover spawned");
        out_events.push(Event::MoverSpawned {
            mover: id,
            enemy,
            tile: start,
        });
    }

    fn advance_movers(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Wave {
            return;
        }

        let seconds = dt.as_secs_f32();
        let mut arrived = Vec::new();
        for mover in &mut self.movers {
            if mover.travel(mover.speed * seconds) {
                arrived.push((mover.id, mover.position));
            }
        }

        for (mover, position) in arrived {
            self.movers.retain(|candidate| candidate.id != mover);
            debug!(%mover, "mover reached the end tile");
            out_events.push(Event::MoverReachedEnd { mover, position });
            self.lose_life(out_events);
        }
    }

    fn fire(&mut self, structure: StructureId, target: MoverId, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Wave {
            return;
        }

        let Some(state) = self.ledger.get_mut(structure) else {
            return;
        };
        if !state.cooldown.is_zero() {
            return;
        }

        let Some(mover) = self.movers.iter().find(|mover| mover.id == target) else {
            return;
        };
        let origin = state.coord.center();
        if origin.distance(mover.position) > state.range {
            return;
        }

        state.cooldown = state.reload();
        let id = self.next_projectile_id;
        self.next_projectile_id = ProjectileId::new(id.get().saturating_add(1));
        self.projectiles.push(Projectile {
            id,
            structure,
            target,
            position: origin,
            speed: state.projectile_speed,
            damage: state.damage,
        });
        out_events.push(Event::ProjectileLaunched {
            projectile: id,
            structure,
            target,
            position: origin,
        });
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Wave {
            return;
        }

        let seconds = dt.as_secs_f32();
        for mut projectile in std::mem::take(&mut self.projectiles) {
            let Some(index) = self
                .movers
                .iter()
                .position(|mover| mover.id == projectile.target)
            else {
                debug!(projectile = %projectile.id, "projectile lost its target");
                out_events.push(Event::ProjectileExpired {
                    projectile: projectile.id,
                });
                continue;
            };

            let distance = projectile.speed * seconds;
            if projectile.home_in(self.movers[index].position, distance) {
                self.strike(index, &projectile, out_events);
            } else {
                self.projectiles.push(projectile);
            }
        }
    }

    fn strike(&mut self, index: usize, projectile: &Projectile, out_events: &mut Vec<Event>) {
        let mover = &mut self.movers[index];
        mover.health -= projectile.damage;
        let target = mover.id;
        let position = mover.position;
        out_events.push(Event::ProjectileImpact {
            projectile: projectile.id,
            structure: projectile.structure,
            position,
        });
        out_events.push(Event::MoverHit {
            mover: target,
            position,
            health_remaining: mover.health,
        });

        if mover.health <= 0.0 {
            let bounty = mover.bounty;
            let _ = self.movers.remove(index);
            debug!(mover = %target, bounty, "mover destroyed");
            out_events.push(Event::MoverDied {
                mover: target,
                position,
                bounty,
            });
            self.credit(bounty, out_events);
        }
    }

    fn resolve_wave(&mut self, out_events: &mut Vec<Event>) {
        if self.phase != Phase::Wave || self.spawning || !self.movers.is_empty() {
            return;
        }

        let wave = self.wave;
        if wave >= self.total_waves() {
            out_events.push(Event::WaveCompleted { wave, bonus: 0 });
            self.enter_phase(Phase::Victory, out_events);
            return;
        }

        let bonus = self.config.wave_completion_bonus;
        out_events.push(Event::WaveCompleted { wave, bonus });
        self.credit(bonus, out_events);
        self.enter_phase(Phase::Build, out_events);
    }

    fn place_structure(
        &mut self,
        kind: StructureKind,
        coord: TileCoord,
    ) -> Result<StructureId, EconomyError> {
        if self.phase != Phase::Build {
            return Err(EconomyError::WrongPhase);
        }
        let definition = self
            .catalog
            .structure(kind)
            .ok_or(EconomyError::UnknownStructureKind)?;
        if self.grid.kind(coord) != Some(TileKind::TowerPlacement) {
            return Err(EconomyError::NotBuildable);
        }
        self.ledger.place(coord, definition, &mut self.currency)
    }

    fn upgrade_structure(&mut self, structure: StructureId) -> Result<TileCoord, EconomyError> {
        if self.phase != Phase::Build {
            return Err(EconomyError::WrongPhase);
        }
        let kind = self
            .ledger
            .get(structure)
            .map(|state| state.kind)
            .ok_or(EconomyError::NotFound)?;
        let definition = self
            .catalog
            .structure(kind)
            .ok_or(EconomyError::UnknownStructureKind)?;
        self.ledger
            .upgrade(structure, definition, &mut self.currency)
            .map(|state| state.coord)
    }

    fn sell_structure(&mut self, structure: StructureId) -> Result<(TileCoord, u32), EconomyError> {
        if self.phase != Phase::Build {
            return Err(EconomyError::WrongPhase);
        }
        self.ledger.sell(structure, &mut self.currency)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Start => {
            if world.phase != Phase::None {
                return;
            }
            world.lives = world.starting_lives;
            world.currency = world.starting_currency;
            out_events.push(Event::SessionStarted {
                lives: world.lives,
                currency: world.currency,
                total_waves: world.total_waves(),
            });
            world.enter_phase(Phase::Build, out_events);
        }
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            if world.phase.is_terminal() {
                return;
            }

            for state in world.ledger.iter_mut() {
                state.cooldown = state.cooldown.saturating_sub(dt);
            }

            match world.phase {
                Phase::Wave => world.wave_clock = world.wave_clock.saturating_add(dt),
                Phase::Build => world.advance_build_countdown(dt, out_events),
                Phase::None | Phase::GameOver | Phase::Victory => {}
            }
        }
        Command::SpawnMover { wave, enemy } => world.spawn_mover(wave, enemy, out_events),
        Command::SpawningFinished { wave } => {
            if world.phase == Phase::Wave && wave == world.wave {
                world.spawning = false;
            }
        }
        Command::AdvanceMovers { dt } => world.advance_movers(dt, out_events),
        Command::FireProjectile { structure, target } => world.fire(structure, target, out_events),
        Command::AdvanceProjectiles { dt } => world.advance_projectiles(dt, out_events),
        Command::ResolveWave => world.resolve_wave(out_events),
        Command::PlaceStructure { kind, coord } => match world.place_structure(kind, coord) {
            Ok(structure) => {
                debug!(%structure, %coord, "structure placed");
                out_events.push(Event::StructurePlaced {
                    structure,
                    kind,
                    coord,
                });
                out_events.push(Event::CurrencyChanged {
                    currency: world.currency,
                });
            }
            Err(reason) => {
                warn!(%kind, %coord, %reason, "placement rejected");
                out_events.push(Event::PlacementRejected {
                    kind,
                    coord,
                    reason,
                });
            }
        },
        Command::UpgradeStructure { structure } => match world.upgrade_structure(structure) {
            Ok(coord) => {
                debug!(%structure, %coord, "structure upgraded");
                out_events.push(Event::StructureUpgraded { structure, coord });
                out_events.push(Event::CurrencyChanged {
                    currency: world.currency,
                });
            }
            Err(reason) => {
                warn!(%structure, %reason, "upgrade rejected");
                out_events.push(Event::UpgradeRejected { structure, reason });
            }
        },
        Command::SellStructure { structure } => match world.sell_structure(structure) {
            Ok((coord, refund)) => {
                debug!(%structure, %coord, refund, "structure sold");
                out_events.push(Event::StructureSold {
                    structure,
                    coord,
                    refund,
                });
                out_events.push(Event::CurrencyChanged {
                    currency: world.currency,
                });
            }
            Err(reason) => {
                warn!(%structure, %reason, "sale rejected");
                out_events.push(Event::SaleRejected { structure, reason });
            }
        },
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{Grid, World};
    use tile_defence_core::{
        Catalog, CooldownSnapshot, CooldownView, MoverSnapshot, MoverView, Phase,
        ProjectileView, SimulationConfig, StructureId, StructureSnapshot, StructureView,
        TileCoord, WaveDefinition,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase
    }

    /// Lives remaining.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Currency available.
    #[must_use]
    pub fn currency(world: &World) -> u32 {
        world.currency
    }

    /// Current one-based wave index (zero before the first wave) and the
    /// number of waves in the level.
    #[must_use]
    pub fn wave_progress(world: &World) -> (u32, u32) {
        (world.wave, world.total_waves())
    }

    /// Simulated time elapsed since the current wave started.
    #[must_use]
    pub fn wave_clock(world: &World) -> Duration {
        world.wave_clock
    }

    /// Time left on the build countdown, if one is running.
    #[must_use]
    pub fn build_countdown(world: &World) -> Option<Duration> {
        world.build_countdown
    }

    /// Reports whether the running wave still expects spawns.
    #[must_use]
    pub fn is_spawning(world: &World) -> bool {
        world.spawning
    }

    /// Wave definitions of the loaded level.
    #[must_use]
    pub fn waves(world: &World) -> &[WaveDefinition] {
        &world.waves
    }

    /// Read-only access to the tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Read-only access to the catalog the world was created with.
    #[must_use]
    pub fn catalog(world: &World) -> &Catalog {
        &world.catalog
    }

    /// Read-only access to the state machine tunables.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Number of movers currently on the grid.
    #[must_use]
    pub fn active_mover_count(world: &World) -> usize {
        world.movers.len()
    }

    /// Captures a read-only view of the movers on the grid.
    #[must_use]
    pub fn mover_view(world: &World) -> MoverView {
        MoverView::from_snapshots(
            world
                .movers
                .iter()
                .map(|mover| MoverSnapshot {
                    id: mover.id,
                    enemy: mover.enemy,
                    position: mover.position,
                    health: mover.health,
                    waypoint_cursor: mover.cursor,
                })
                .collect(),
        )
    }

    /// Captures a read-only view of the projectiles in flight.
    #[must_use]
    pub fn projectile_view(world: &World) -> ProjectileView {
        ProjectileView::from_snapshots(
            world
                .projectiles
                .iter()
                .map(|projectile| projectile.snapshot())
                .collect(),
        )
    }

    /// Captures a read-only view of the placed structures.
    #[must_use]
    pub fn structure_view(world: &World) -> StructureView {
        StructureView::from_snapshots(world.ledger.iter().map(|state| state.snapshot()).collect())
    }

    /// Captures the remaining cooldown of every structure.
    #[must_use]
    pub fn cooldown_view(world: &World) -> CooldownView {
        CooldownView::from_snapshots(
            world
                .ledger
                .iter()
                .map(|state| CooldownSnapshot {
                    structure: state.id,
                    ready_in: state.cooldown,
                })
                .collect(),
        )
    }

    /// Structure occupying the tile, if any.
    #[must_use]
    pub fn structure_at(world: &World, coord: TileCoord) -> Option<StructureId> {
        world.ledger.at(coord)
    }

    /// Snapshot of a single structure.
    #[must_use]
    pub fn structure(world: &World, id: StructureId) -> Option<StructureSnapshot> {
        world.ledger.get(id).map(|state| state.snapshot())
    }
}

#[derive(Clone, Debug)]
struct Mover {
    id: MoverId,
    enemy: EnemyKind,
    health: f32,
    speed: f32,
    bounty: u32,
    position: Vec2,
    waypoints: Vec<TileCoord>,
    cursor: usize,
}

impl Mover {
    /// Moves the mover along its waypoints, carrying leftover distance across
    /// waypoints. Returns `true` once the final waypoint has been passed.
    fn travel(&mut self, mut distance: f32) -> bool {
        while let Some(waypoint) = self.waypoints.get(self.cursor) {
            let target = waypoint.center();
            let remaining = self.position.distance(target);
            if remaining > distance {
                self.position += (target - self.position) / remaining * distance;
                return false;
            }

            self.position = target;
            distance -= remaining;
            self.cursor += 1;
        }

        true
    }
}

fn whole_seconds(duration: Duration) -> u32 {
    let seconds = duration
        .as_secs()
        .saturating_add(u64::from(duration.subsec_nanos() > 0));
    u32::try_from(seconds).unwrap_or(u32::MAX)
}

fn is_valid_delay(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn validate_catalog(catalog: &Catalog) -> Result<(), LevelError> {
    let positive = |value: f32| value.is_finite() && value > 0.0;
    for enemy in &catalog.enemies {
        if !positive(enemy.health) || !positive(enemy.speed) {
            return Err(LevelError::InvalidEnemyStats { enemy: enemy.kind });
        }
    }

    for structure in &catalog.structures {
        let upgrade = &structure.upgrade;
        let stats = [
            structure.range,
            structure.damage,
            structure.fire_rate,
            structure.range + upgrade.range_increase,
            structure.damage + upgrade.damage_increase,
            structure.fire_rate + upgrade.fire_rate_increase,
        ];
        if !stats.into_iter().all(is_valid_delay) || !positive(structure.projectile_speed) {
            return Err(LevelError::InvalidStructureStats {
                kind: structure.kind,
            });
        }
    }

    Ok(())
}

fn validate_waves(waves: &[WaveDefinition], catalog: &Catalog) -> Result<(), LevelError> {
    for (wave, definition) in (1_u32..).zip(waves) {
        if !is_valid_delay(definition.initial_delay_secs) {
            return Err(LevelError::InvalidTiming { wave });
        }

        for group in &definition.spawn_groups {
            if !is_valid_delay(group.interval_secs) || !is_valid_delay(group.delay_after_secs) {
                return Err(LevelError::InvalidTiming { wave });
            }
            if catalog.enemy(group.enemy).is_none() {
                return Err(LevelError::UnknownEnemy {
                    wave,
                    enemy: group.enemy,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_secs(5)), 5);
        assert_eq!(whole_seconds(Duration::from_millis(4_001)), 5);
        assert_eq!(whole_seconds(Duration::from_millis(999)), 1);
        assert_eq!(whole_seconds(Duration::ZERO), 0);
    }

    #[test]
    fn travel_carries_leftover_distance_across_waypoints() {
        let mut mover = Mover {
            id: MoverId::new(0),
            enemy: EnemyKind::new(0),
            health: 10.0,
            speed: 1.0,
            bounty: 5,
            position: Vec2::ZERO,
            waypoints: vec![
                TileCoord::new(1, 0),
                TileCoord::new(1, 1),
                TileCoord::new(2, 1),
            ],
            cursor: 0,
        };

        assert!(!mover.travel(1.5));
        assert_eq!(mover.cursor, 1);
        assert!((mover.position - Vec2::new(1.0, 0.5)).length() < 1e-5);

        assert!(mover.travel(1.5));
        assert_eq!(mover.cursor, 3);
        assert_eq!(mover.position, Vec2::new(2.0, 1.0));
    }
}
