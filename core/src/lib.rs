#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tile Defence engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! that systems and presentation layers react to deterministically. Level,
//! wave and catalog definitions are plain data and travel through `serde`.

use std::{fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Tile Defence.";

/// Top-level phase of the simulation state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// The session has been constructed but not started.
    #[default]
    None,
    /// Players may build while the countdown to the next wave runs.
    Build,
    /// Enemies spawn and advance toward the end tile.
    Wave,
    /// Lives ran out. Terminal.
    GameOver,
    /// Every wave was cleared. Terminal.
    Victory,
}

impl Phase {
    /// Reports whether the phase absorbs every further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Victory)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Leaves the `None` phase and opens the first build phase.
    Start,
    /// Advances timers (build countdown, wave clock, tower cooldowns).
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a mover of the given kind enter the grid at the start tile.
    SpawnMover {
        /// Wave that scheduled the spawn; stale waves are ignored.
        wave: u32,
        /// Enemy definition used for the mover.
        enemy: EnemyKind,
    },
    /// Reports that the spawn schedule of a wave has been exhausted.
    SpawningFinished {
        /// Wave whose schedule finished.
        wave: u32,
    },
    /// Moves every active mover along its waypoints.
    AdvanceMovers {
        /// Duration of simulated time the movers travel for.
        dt: Duration,
    },
    /// Launches a projectile from a structure toward its locked target.
    FireProjectile {
        /// Structure that fires.
        structure: StructureId,
        /// Mover the projectile homes in on.
        target: MoverId,
    },
    /// Moves every in-flight projectile toward its target.
    AdvanceProjectiles {
        /// Duration of simulated time the projectiles travel for.
        dt: Duration,
    },
    /// Ends the running wave if spawning finished and no movers remain.
    ResolveWave,
    /// Requests placement of a structure on the provided tile.
    PlaceStructure {
        /// Type of structure to construct.
        kind: StructureKind,
        /// Tile the structure occupies.
        coord: TileCoord,
    },
    /// Requests the single upgrade tier of an existing structure.
    UpgradeStructure {
        /// Structure to upgrade.
        structure: StructureId,
    },
    /// Requests that a structure be sold and its tile freed.
    SellStructure {
        /// Structure to sell.
        structure: StructureId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces the starting ledger of a freshly started session.
    SessionStarted {
        /// Lives available at the start of the level.
        lives: u32,
        /// Currency available at the start of the level.
        currency: u32,
        /// Number of waves the level contains.
        total_waves: u32,
    },
    /// Announces that the simulation entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
    /// Reports the whole seconds left on the build countdown.
    CountdownChanged {
        /// Remaining seconds, rounded up.
        seconds_remaining: u32,
    },
    /// Announces that a wave began.
    WaveStarted {
        /// One-based index of the wave.
        wave: u32,
        /// Number of waves in the level.
        total: u32,
    },
    /// Announces that a wave was cleared.
    WaveCompleted {
        /// One-based index of the wave.
        wave: u32,
        /// Currency awarded for clearing it.
        bonus: u32,
    },
    /// Reports the new number of lives.
    LivesChanged {
        /// Lives remaining.
        lives: u32,
    },
    /// Reports the new currency balance.
    CurrencyChanged {
        /// Currency available.
        currency: u32,
    },
    /// Confirms that a mover entered the grid.
    MoverSpawned {
        /// Identifier assigned to the mover.
        mover: MoverId,
        /// Enemy definition the mover was created from.
        enemy: EnemyKind,
        /// Tile the mover spawned on.
        tile: TileCoord,
    },
    /// Reports that a scheduled spawn could not be carried out.
    SpawnAborted {
        /// Wave that scheduled the spawn.
        wave: u32,
        /// Enemy definition that was requested.
        enemy: EnemyKind,
        /// Reason the spawn failed.
        reason: SpawnError,
    },
    /// Reports that a mover passed its final waypoint.
    MoverReachedEnd {
        /// Mover that left the grid.
        mover: MoverId,
        /// Position at which it left.
        position: Vec2,
    },
    /// Reports that a mover took damage.
    MoverHit {
        /// Mover that was hit.
        mover: MoverId,
        /// Position of the mover when hit.
        position: Vec2,
        /// Health left after the hit.
        health_remaining: f32,
    },
    /// Reports that a mover was destroyed by tower fire.
    MoverDied {
        /// Mover that died.
        mover: MoverId,
        /// Position at which it died.
        position: Vec2,
        /// Currency credited for the kill.
        bounty: u32,
    },
    /// Reports that a structure launched a projectile.
    ProjectileLaunched {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Structure that fired.
        structure: StructureId,
        /// Mover the projectile homes in on.
        target: MoverId,
        /// Launch position.
        position: Vec2,
    },
    /// Reports where a projectile landed.
    ProjectileImpact {
        /// Projectile that landed.
        projectile: ProjectileId,
        /// Structure that fired the projectile.
        structure: StructureId,
        /// Impact position.
        position: Vec2,
    },
    /// Reports that a projectile lost its target before arriving.
    ProjectileExpired {
        /// Projectile that was discarded.
        projectile: ProjectileId,
    },
    /// Confirms that a structure was placed.
    StructurePlaced {
        /// Identifier assigned to the structure.
        structure: StructureId,
        /// Type of structure placed.
        kind: StructureKind,
        /// Tile it occupies.
        coord: TileCoord,
    },
    /// Confirms that a structure was upgraded.
    StructureUpgraded {
        /// Structure that was upgraded.
        structure: StructureId,
        /// Tile it occupies.
        coord: TileCoord,
    },
    /// Confirms that a structure was sold.
    StructureSold {
        /// Structure that was sold.
        structure: StructureId,
        /// Tile it used to occupy.
        coord: TileCoord,
        /// Currency credited for the sale.
        refund: u32,
    },
    /// Reports that a placement request was rejected.
    PlacementRejected {
        /// Type of structure requested.
        kind: StructureKind,
        /// Tile requested.
        coord: TileCoord,
        /// Specific reason the placement failed.
        reason: EconomyError,
    },
    /// Reports that an upgrade request was rejected.
    UpgradeRejected {
        /// Structure targeted by the request.
        structure: StructureId,
        /// Specific reason the upgrade failed.
        reason: EconomyError,
    },
    /// Reports that a sale request was rejected.
    SaleRejected {
        /// Structure targeted by the request.
        structure: StructureId,
        /// Specific reason the sale failed.
        reason: EconomyError,
    },
}

/// Cardinal movement directions on the tile grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in clockwise order starting at north.
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Reports whether the direction runs along a column.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::North | Self::South)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Unique identifier assigned to a mover.
    MoverId
);
numeric_id!(
    /// Unique identifier assigned to a placed structure.
    StructureId
);
numeric_id!(
    /// Unique identifier assigned to an in-flight projectile.
    ProjectileId
);
numeric_id!(
    /// Key of an enemy definition inside the catalog.
    EnemyKind
);
numeric_id!(
    /// Key of a structure definition inside the catalog.
    StructureKind
);

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index (x) of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index (y) of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the neighbouring tile in the given direction inside a
    /// `width × height` grid, if it exists.
    #[must_use]
    pub fn step(self, direction: Direction, width: u32, height: u32) -> Option<TileCoord> {
        let (column, row) = match direction {
            Direction::North => (Some(self.column), self.row.checked_sub(1)),
            Direction::East => (self.column.checked_add(1), Some(self.row)),
            Direction::South => (Some(self.column), self.row.checked_add(1)),
            Direction::West => (self.column.checked_sub(1), Some(self.row)),
        };
        let (column, row) = (column?, row?);
        (column < width && row < height).then_some(TileCoord::new(column, row))
    }

    /// Centre of the tile in continuous tile units.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.column as f32, self.row as f32)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Immutable classification of a grid tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Walkable tile between start and end.
    Path,
    /// Buildable tile.
    TowerPlacement,
    /// Neither walkable nor buildable.
    Obstacle,
    /// Walkable tile where movers enter.
    Start,
    /// Walkable tile where movers leave and cost a life.
    End,
}

impl TileKind {
    /// Reports whether movers may enter tiles of this kind.
    #[must_use]
    pub const fn is_traversable(self) -> bool {
        matches!(self, Self::Path | Self::Start | Self::End)
    }

    /// Reports whether structures may be placed on tiles of this kind.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        matches!(self, Self::TowerPlacement)
    }
}

/// A single grid cell paired with its classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    /// Location of the tile.
    pub coord: TileCoord,
    /// Classification of the tile.
    pub kind: TileKind,
}

/// Static description of a playable level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// Number of tile columns.
    pub width: u32,
    /// Number of tile rows.
    pub height: u32,
    /// Row-major tile kinds, indexed `row * width + column`.
    pub tiles: Vec<TileKind>,
    /// Tile where movers spawn.
    pub start: TileCoord,
    /// Tile movers try to reach.
    pub end: TileCoord,
    /// Lives available when the level starts.
    pub starting_lives: u32,
    /// Currency available when the level starts.
    pub starting_currency: u32,
    /// Waves in the order they are played.
    #[serde(default)]
    pub waves: Vec<WaveDefinition>,
}

impl LevelDefinition {
    /// Row-major index of the coordinate, if it lies inside the level.
    #[must_use]
    pub fn index(&self, coord: TileCoord) -> Option<usize> {
        if coord.column() >= self.width || coord.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Kind of the tile at the coordinate, if it lies inside the level.
    #[must_use]
    pub fn tile_kind(&self, coord: TileCoord) -> Option<TileKind> {
        self.index(coord)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Number of waves the level contains.
    #[must_use]
    pub fn total_waves(&self) -> u32 {
        u32::try_from(self.waves.len()).unwrap_or(u32::MAX)
    }
}

/// Ordered spawn schedule of a single wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Seconds to wait before the first group starts.
    #[serde(default)]
    pub initial_delay_secs: f32,
    /// Groups spawned one after another.
    pub spawn_groups: Vec<SpawnGroup>,
}

impl WaveDefinition {
    /// Initial delay as a duration; invalid values collapse to zero.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        seconds(self.initial_delay_secs)
    }
}

/// Batch of identical movers spawned at a fixed cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Enemy definition to spawn.
    pub enemy: EnemyKind,
    /// Number of movers in the group.
    pub count: u32,
    /// Seconds between consecutive spawns of the group.
    #[serde(default)]
    pub interval_secs: f32,
    /// Seconds to wait after the group before the next one starts.
    #[serde(default)]
    pub delay_after_secs: f32,
}

impl SpawnGroup {
    /// Spawn interval as a duration; invalid values collapse to zero.
    #[must_use]
    pub fn interval(&self) -> Duration {
        seconds(self.interval_secs)
    }

    /// Post-group delay as a duration; invalid values collapse to zero.
    #[must_use]
    pub fn delay_after(&self) -> Duration {
        seconds(self.delay_after_secs)
    }
}

/// Converts a seconds value into a duration, mapping negative or
/// non-finite values to zero.
#[must_use]
pub fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}

/// Stats of an enemy type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    /// Catalog key.
    pub kind: EnemyKind,
    /// Display name.
    pub name: String,
    /// Starting health.
    pub health: f32,
    /// Travel speed in tiles per second.
    pub speed: f32,
    /// Currency credited when the enemy is destroyed.
    pub bounty: u32,
}

/// Stat increases applied by the single upgrade tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    /// Currency debited for the upgrade.
    pub cost: u32,
    /// Added targeting radius in tiles.
    pub range_increase: f32,
    /// Added damage per shot.
    pub damage_increase: f32,
    /// Added shots per second.
    pub fire_rate_increase: f32,
}

/// Stats of a buildable structure type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    /// Catalog key.
    pub kind: StructureKind,
    /// Display name.
    pub name: String,
    /// Targeting radius in tiles.
    pub range: f32,
    /// Damage per shot.
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Travel speed of launched projectiles in tiles per second.
    #[serde(default = "default_projectile_speed")]
    pub projectile_speed: f32,
    /// Currency debited on placement.
    pub cost: u32,
    /// Upgrade tier.
    pub upgrade: UpgradeDefinition,
}

/// Projectile speed used when a structure definition omits one.
pub const DEFAULT_PROJECTILE_SPEED: f32 = 10.0;

const fn default_projectile_speed() -> f32 {
    DEFAULT_PROJECTILE_SPEED
}

/// Read-only enemy and structure definitions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Enemy definitions.
    #[serde(default)]
    pub enemies: Vec<EnemyDefinition>,
    /// Structure definitions.
    #[serde(default)]
    pub structures: Vec<StructureDefinition>,
}

impl Catalog {
    /// Looks up an enemy definition.
    #[must_use]
    pub fn enemy(&self, kind: EnemyKind) -> Option<&EnemyDefinition> {
        self.enemies.iter().find(|definition| definition.kind == kind)
    }

    /// Looks up a structure definition.
    #[must_use]
    pub fn structure(&self, kind: StructureKind) -> Option<&StructureDefinition> {
        self.structures
            .iter()
            .find(|definition| definition.kind == kind)
    }
}

/// Tunables of the phase state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Length of every build phase in seconds.
    pub build_countdown_secs: f32,
    /// Currency awarded when a non-final wave is cleared.
    pub wave_completion_bonus: u32,
}

impl SimulationConfig {
    /// Build countdown as a duration.
    #[must_use]
    pub fn build_countdown(&self) -> Duration {
        seconds(self.build_countdown_secs)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            build_countdown_secs: 5.0,
            wave_completion_bonus: 25,
        }
    }
}

/// Immutable representation of a single mover's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct MoverSnapshot {
    /// Unique identifier assigned to the mover.
    pub id: MoverId,
    /// Enemy definition the mover was created from.
    pub enemy: EnemyKind,
    /// Continuous position in tile units.
    pub position: Vec2,
    /// Health remaining.
    pub health: f32,
    /// Index of the waypoint the mover is heading to.
    pub waypoint_cursor: usize,
}

/// Read-only snapshot describing all active movers.
#[derive(Clone, Debug, Default)]
pub struct MoverView {
    snapshots: Vec<MoverSnapshot>,
}

impl MoverView {
    /// Creates a new mover view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<MoverSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &MoverSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a mover.
    #[must_use]
    pub fn get(&self, id: MoverId) -> Option<&MoverSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of movers in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no movers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Immutable representation of a placed structure.
#[derive(Clone, Debug, PartialEq)]
pub struct StructureSnapshot {
    /// Identifier allocated by the world.
    pub id: StructureId,
    /// Type of structure.
    pub kind: StructureKind,
    /// Tile the structure occupies.
    pub coord: TileCoord,
    /// Upgrade tier, starting at 1.
    pub level: u8,
    /// Current targeting radius in tiles.
    pub range: f32,
    /// Current damage per shot.
    pub damage: f32,
    /// Current shots per second.
    pub fire_rate: f32,
    /// Travel speed of launched projectiles in tiles per second.
    pub projectile_speed: f32,
    /// Currency paid on placement.
    pub original_cost: u32,
}

/// Read-only snapshot describing all placed structures.
#[derive(Clone, Debug, Default)]
pub struct StructureView {
    snapshots: Vec<StructureSnapshot>,
}

impl StructureView {
    /// Creates a new structure view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<StructureSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &StructureSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<StructureSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a projectile in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier allocated by the world.
    pub id: ProjectileId,
    /// Structure that launched the projectile.
    pub structure: StructureId,
    /// Mover the projectile homes in on.
    pub target: MoverId,
    /// Continuous position in tile units.
    pub position: Vec2,
    /// Damage applied on arrival.
    pub damage: f32,
}

/// Read-only snapshot describing all projectiles in flight.
#[derive(Clone, Debug, Default)]
pub struct ProjectileView {
    snapshots: Vec<ProjectileSnapshot>,
}

impl ProjectileView {
    /// Creates a new projectile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ProjectileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in launch order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectileSnapshot> {
        self.snapshots.iter()
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Target lock of a structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Structure holding the lock.
    pub structure: StructureId,
    /// Mover being tracked.
    pub mover: MoverId,
}

/// Time until a structure may fire again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownSnapshot {
    /// Structure the cooldown belongs to.
    pub structure: StructureId,
    /// Remaining cooldown; zero when ready.
    pub ready_in: Duration,
}

/// Read-only snapshot of all structure cooldowns, ordered by structure.
#[derive(Clone, Debug, Default)]
pub struct CooldownView {
    snapshots: Vec<CooldownSnapshot>,
}

impl CooldownView {
    /// Creates a new cooldown view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CooldownSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.structure);
        Self { snapshots }
    }

    /// Cooldown of the structure, if it exists.
    #[must_use]
    pub fn get(&self, structure: StructureId) -> Option<&CooldownSnapshot> {
        self.snapshots
            .binary_search_by_key(&structure, |snapshot| snapshot.structure)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<CooldownSnapshot> {
        self.snapshots
    }
}

/// Structural problems that make a level unusable. Fatal to level load.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LevelError {
    /// One of the dimensions is zero.
    #[error("grid dimensions {width}x{height} are empty")]
    EmptyGrid {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// The tile array does not cover the grid exactly.
    #[error("tile layout holds {actual} tiles, expected {expected}")]
    TileCountMismatch {
        /// `width * height`.
        expected: usize,
        /// Length of the tile array.
        actual: usize,
    },
    /// A referenced coordinate lies outside the grid.
    #[error("coordinate {coord} lies outside the grid")]
    OutOfBounds {
        /// Offending coordinate.
        coord: TileCoord,
    },
    /// The layout does not contain exactly one tile of a marker kind.
    #[error("layout contains {count} {kind:?} tiles, expected exactly one")]
    MarkerCount {
        /// Marker kind (`Start` or `End`).
        kind: TileKind,
        /// Number of tiles found.
        count: usize,
    },
    /// The declared coordinate does not hold the matching marker tile.
    #[error("{kind:?} coordinate {coord} does not hold a {kind:?} tile")]
    MarkerMismatch {
        /// Marker kind (`Start` or `End`).
        kind: TileKind,
        /// Declared coordinate.
        coord: TileCoord,
    },
    /// No traversable route connects start and end.
    #[error("no path connects start {start} to end {end}")]
    Unreachable {
        /// Start tile.
        start: TileCoord,
        /// End tile.
        end: TileCoord,
    },
    /// The level grants no lives, so it could never be lost.
    #[error("level must start with at least one life")]
    NoLives,
    /// A wave references an enemy missing from the catalog.
    #[error("wave {wave} references unknown enemy kind {enemy}")]
    UnknownEnemy {
        /// One-based wave index.
        wave: u32,
        /// Missing enemy kind.
        enemy: EnemyKind,
    },
    /// A wave contains negative or non-finite timings.
    #[error("wave {wave} contains a negative or non-finite delay")]
    InvalidTiming {
        /// One-based wave index.
        wave: u32,
    },
    /// An enemy definition has unusable stats.
    #[error("enemy kind {enemy} needs positive finite health and speed")]
    InvalidEnemyStats {
        /// Offending enemy kind.
        enemy: EnemyKind,
    },
    /// A structure definition has unusable stats.
    #[error(
        "structure kind {kind} needs non-negative finite range, damage and fire rate \
         and a positive projectile speed"
    )]
    InvalidStructureStats {
        /// Offending structure kind.
        kind: StructureKind,
    },
}

/// Failures of the procedural path generator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The parameters can never produce a layout.
    #[error("invalid generation parameters: {reason}")]
    InvalidParameters {
        /// Human readable explanation.
        reason: &'static str,
    },
    /// Every attempt exhausted its step budget.
    #[error("path generation failed after {attempts} attempts")]
    GenerationFailed {
        /// Attempts made.
        attempts: u32,
    },
}

/// Reasons a scheduled spawn may be aborted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum SpawnError {
    /// The pathfinder found no route for the mover.
    #[error("no path from {start} to {end}")]
    PathUnreachable {
        /// Start tile.
        start: TileCoord,
        /// End tile.
        end: TileCoord,
    },
    /// The enemy kind does not exist in the catalog.
    #[error("unknown enemy kind")]
    UnknownEnemy,
}

/// Reasons a build, upgrade or sell request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum EconomyError {
    /// The tile already holds a structure.
    #[error("tile is already occupied")]
    Occupied,
    /// The currency balance does not cover the cost.
    #[error("need {required} coins, have {available}")]
    InsufficientFunds {
        /// Cost of the action.
        required: u32,
        /// Balance at the time of the request.
        available: u32,
    },
    /// The structure already reached its single upgrade tier.
    #[error("structure is already at max level")]
    AlreadyMaxLevel,
    /// No structure with the identifier exists.
    #[error("structure not found")]
    NotFound,
    /// The tile is outside the grid or not a tower placement tile.
    #[error("tile does not accept structures")]
    NotBuildable,
    /// The structure kind does not exist in the catalog.
    #[error("unknown structure kind")]
    UnknownStructureKind,
    /// Economy actions are only accepted during the build phase.
    #[error("only allowed during the build phase")]
    WrongPhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn step_stays_inside_grid() {
        let corner = TileCoord::new(0, 0);
        assert_eq!(corner.step(Direction::North, 3, 3), None);
        assert_eq!(corner.step(Direction::West, 3, 3), None);
        assert_eq!(
            corner.step(Direction::East, 3, 3),
            Some(TileCoord::new(1, 0))
        );

        let far = TileCoord::new(2, 2);
        assert_eq!(far.step(Direction::East, 3, 3), None);
        assert_eq!(far.step(Direction::South, 3, 3), None);
    }

    #[test]
    fn tile_kinds_classify_traversal_and_building() {
        assert!(TileKind::Start.is_traversable());
        assert!(TileKind::End.is_traversable());
        assert!(TileKind::Path.is_traversable());
        assert!(!TileKind::Obstacle.is_traversable());
        assert!(TileKind::TowerPlacement.is_buildable());
        assert!(!TileKind::Path.is_buildable());
    }

    #[test]
    fn level_index_is_row_major() {
        let level = LevelDefinition {
            width: 4,
            height: 3,
            tiles: vec![TileKind::TowerPlacement; 12],
            start: TileCoord::new(0, 0),
            end: TileCoord::new(3, 2),
            starting_lives: 20,
            starting_currency: 100,
            waves: Vec::new(),
        };

        assert_eq!(level.index(TileCoord::new(3, 2)), Some(11));
        assert_eq!(level.index(TileCoord::new(1, 1)), Some(5));
        assert_eq!(level.index(TileCoord::new(4, 0)), None);
        assert_eq!(level.tile_kind(TileCoord::new(0, 3)), None);
    }

    #[test]
    fn invalid_seconds_collapse_to_zero() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f32::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1_500));
    }

    #[test]
    fn terminal_phases_are_absorbing() {
        assert!(Phase::GameOver.is_terminal());
        assert!(Phase::Victory.is_terminal());
        assert!(!Phase::Build.is_terminal());
        assert!(!Phase::Wave.is_terminal());
    }

    #[test]
    fn level_definition_survives_bincode_persistence() {
        let level = LevelDefinition {
            width: 2,
            height: 1,
            tiles: vec![TileKind::Start, TileKind::End],
            start: TileCoord::new(0, 0),
            end: TileCoord::new(1, 0),
            starting_lives: 3,
            starting_currency: 50,
            waves: vec![WaveDefinition {
                initial_delay_secs: 0.5,
                spawn_groups: vec![SpawnGroup {
                    enemy: EnemyKind::new(2),
                    count: 4,
                    interval_secs: 1.0,
                    delay_after_secs: 2.0,
                }],
            }],
        };

        let bytes = bincode::serialize(&level).expect("serialize");
        let restored: LevelDefinition = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, level);
    }

    #[test]
    fn economy_error_messages_name_the_shortfall() {
        let error = EconomyError::InsufficientFunds {
            required: 100,
            available: 40,
        };
        assert_eq!(error.to_string(), "need 100 coins, have 40");
    }
}
