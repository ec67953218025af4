#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Host object that drives a Tile Defence session.
//!
//! [`Simulation`] owns the world together with every system and advances them
//! in a fixed order on each explicit [`Simulation::tick`]: timers, spawns,
//! mover movement, tower targeting, projectile flight and launches, then the
//! wave completion check. Presentation layers observe the session through [`Notification`]
//! values delivered to subscribed [`Observer`]s.

mod sequence;

use std::{fmt, time::Duration};

use glam::Vec2;
use tile_defence_core::{
    Catalog, Command, EconomyError, Event, LevelDefinition, LevelError, Phase, SimulationConfig,
    SpawnError, StructureId, StructureKind, TileCoord, TowerTarget,
};
use tile_defence_system_builder::{Builder, BuilderNotice, PlayerAction};
use tile_defence_system_spawning::Spawning;
use tile_defence_system_tower_combat::TowerCombat;
use tile_defence_system_tower_targeting::TowerTargeting;
use tile_defence_world::{self as world, query, World};
use tracing::debug;

pub use sequence::LevelSequence;

/// Status text shown when economy input arrives outside the build phase.
pub const WRONG_PHASE_STATUS: &str = "Can only build during Build Phase!";

/// Change notifications published to observers.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// Currency balance changed.
    CurrencyChanged(u32),
    /// Remaining lives changed.
    LivesChanged(u32),
    /// Phase of the state machine changed.
    PhaseChanged(Phase),
    /// Current wave and total number of waves.
    WaveProgress {
        /// One-based current wave, zero before the first wave.
        current: u32,
        /// Waves in the level.
        total: u32,
    },
    /// Whole seconds left before the next wave starts.
    BuildCountdown(u32),
    /// Transient status message for the build interface.
    BuildStatus(String),
    /// A structure was placed.
    StructurePlaced {
        /// Structure that was placed.
        structure: StructureId,
        /// Tile it occupies.
        coord: TileCoord,
    },
    /// A structure was upgraded.
    StructureUpgraded {
        /// Structure that was upgraded.
        structure: StructureId,
        /// Tile it occupies.
        coord: TileCoord,
    },
    /// A structure was sold.
    StructureSold {
        /// Structure that was sold.
        structure: StructureId,
        /// Tile it occupied.
        coord: TileCoord,
    },
    /// An enemy was hit.
    EnemyHit {
        /// Position of the enemy.
        position: Vec2,
    },
    /// An enemy died.
    EnemyDied {
        /// Position of the enemy.
        position: Vec2,
    },
    /// A shot landed.
    ProjectileImpact {
        /// Impact position.
        position: Vec2,
    },
    /// A scheduled spawn could not be carried out.
    SpawnAborted {
        /// Wave that scheduled the spawn.
        wave: u32,
        /// Reason the spawn failed.
        reason: SpawnError,
    },
}

/// Receiver of simulation notifications.
pub trait Observer {
    /// Called once per notification, in publication order.
    fn notify(&mut self, notification: &Notification);
}

impl<F> Observer for F
where
    F: FnMut(&Notification),
{
    fn notify(&mut self, notification: &Notification) {
        self(notification);
    }
}

/// A running Tile Defence session.
pub struct Simulation {
    world: World,
    spawning: Spawning,
    targeting: TowerTargeting,
    combat: TowerCombat,
    builder: Builder,
    targets: Vec<TowerTarget>,
    observers: Vec<Box<dyn Observer>>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("world", &self.world)
            .field("builder", &self.builder)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates a session for the provided level; fails if the level is invalid.
    pub fn new(
        level: &LevelDefinition,
        catalog: Catalog,
        config: SimulationConfig,
    ) -> Result<Self, LevelError> {
        Ok(Self {
            world: World::new(level, catalog, config)?,
            spawning: Spawning::new(),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            builder: Builder::new(),
            targets: Vec::new(),
            observers: Vec::new(),
        })
    }

    /// Registers an observer that receives every later notification.
    pub fn subscribe<O>(&mut self, observer: O)
    where
        O: Observer + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the player's selection state.
    #[must_use]
    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> Phase {
        query::phase(&self.world)
    }

    /// Leaves the idle phase and opens the first build phase.
    pub fn start(&mut self) {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Start, &mut events);
        self.observe(&events);
        self.publish_events(&events);
    }

    /// Advances the session by `dt` of simulated time.
    pub fn tick(&mut self, dt: Duration) {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        let mut commands = Vec::new();
        self.spawning.handle(
            &events,
            query::phase(&self.world),
            query::waves(&self.world),
            &mut commands,
        );
        self.apply_all(&mut commands, &mut events);

        world::apply(&mut self.world, Command::AdvanceMovers { dt }, &mut events);

        let phase = query::phase(&self.world);
        self.targeting.handle(
            phase,
            &query::structure_view(&self.world),
            &query::mover_view(&self.world),
            &mut self.targets,
        );
        self.combat.handle(
            phase,
            &events,
            &query::cooldown_view(&self.world),
            &query::projectile_view(&self.world),
            &self.targets,
            &mut commands,
        );
        self.apply_all(&mut commands, &mut events);

        world::apply(&mut self.world, Command::ResolveWave, &mut events);

        self.observe(&events);
        self.publish_events(&events);
    }

    /// Chooses the structure kind used by later placements.
    pub fn select_structure_kind(&mut self, kind: StructureKind) {
        self.act(PlayerAction::SelectStructureKind(kind));
    }

    /// Places the selected kind on the tile, or selects the structure already there.
    pub fn place_at(&mut self, coord: TileCoord) {
        self.act(PlayerAction::PlaceAt(coord));
    }

    /// Selects an existing structure.
    pub fn select_structure(&mut self, structure: StructureId) {
        self.act(PlayerAction::SelectStructure(structure));
    }

    /// Upgrades the selected structure.
    pub fn upgrade_selected(&mut self) {
        self.act(PlayerAction::UpgradeSelected);
    }

    /// Sells the selected structure.
    pub fn sell_selected(&mut self) {
        self.act(PlayerAction::SellSelected);
    }

    /// Clears the current selection.
    pub fn deselect(&mut self) {
        self.act(PlayerAction::Deselect);
    }

    fn act(&mut self, action: PlayerAction) {
        let mut commands = Vec::new();
        let mut notices = Vec::new();
        let world = &self.world;
        self.builder.handle(
            &[],
            Some(action),
            |coord| query::structure_at(world, coord),
            &mut commands,
            &mut notices,
        );

        for notice in notices {
            if let Some(status) = self.notice_status(notice) {
                self.publish(&Notification::BuildStatus(status));
            }
        }

        let mut events = Vec::new();
        self.apply_all(&mut commands, &mut events);
        self.observe(&events);
        self.publish_events(&events);
    }

    fn apply_all(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn observe(&mut self, events: &[Event]) {
        let mut commands = Vec::new();
        let mut notices = Vec::new();
        let world = &self.world;
        self.builder.handle(
            events,
            None,
            |coord| query::structure_at(world, coord),
            &mut commands,
            &mut notices,
        );
    }

    fn publish_events(&mut self, events: &[Event]) {
        for event in events {
            for notification in self.translate(event) {
                self.publish(&notification);
            }
        }
    }

    fn publish(&mut self, notification: &Notification) {
        debug!(?notification, "notify");
        for observer in &mut self.observers {
            observer.notify(notification);
        }
    }

    fn structure_name(&self, kind: StructureKind) -> String {
        query::catalog(&self.world)
            .structure(kind)
            .map_or_else(|| format!("structure {kind}"), |definition| definition.name.clone())
    }

    fn notice_status(&self, notice: BuilderNotice) -> Option<String> {
        match notice {
            BuilderNotice::KindSelected(kind) => {
                Some(format!("Selected: {}", self.structure_name(kind)))
            }
            BuilderNotice::StructureSelected(structure) => {
                let snapshot = query::structure(&self.world, structure)?;
                Some(format!(
                    "Selected: {} (level {})",
                    self.structure_name(snapshot.kind),
                    snapshot.level
                ))
            }
            BuilderNotice::Deselected => None,
            BuilderNotice::NothingSelected => Some("Nothing selected!".to_owned()),
            BuilderNotice::WrongPhase => Some(WRONG_PHASE_STATUS.to_owned()),
        }
    }

    fn translate(&self, event: &Event) -> Vec<Notification> {
        match event {
            Event::SessionStarted {
                lives,
                currency,
                total_waves,
            } => vec![
                Notification::LivesChanged(*lives),
                Notification::CurrencyChanged(*currency),
                Notification::WaveProgress {
                    current: 0,
                    total: *total_waves,
                },
            ],
            Event::PhaseChanged { phase } => vec![Notification::PhaseChanged(*phase)],
            Event::CountdownChanged { seconds_remaining } => {
                vec![Notification::BuildCountdown(*seconds_remaining)]
            }
            Event::WaveStarted { wave, total } => vec![Notification::WaveProgress {
                current: *wave,
                total: *total,
            }],
            Event::LivesChanged { lives } => vec![Notification::LivesChanged(*lives)],
            Event::CurrencyChanged { currency } => vec![Notification::CurrencyChanged(*currency)],
            Event::SpawnAborted { wave, reason, .. } => vec![Notification::SpawnAborted {
                wave: *wave,
                reason: *reason,
            }],
            Event::MoverHit { position, .. } => vec![Notification::EnemyHit {
                position: *position,
            }],
            Event::MoverDied { position, .. } => vec![Notification::EnemyDied {
                position: *position,
            }],
            Event::ProjectileImpact { position, .. } => vec![Notification::ProjectileImpact {
                position: *position,
            }],
            Event::StructurePlaced {
                structure, coord, ..
            } => vec![Notification::StructurePlaced {
                structure: *structure,
                coord: *coord,
            }],
            Event::StructureUpgraded { structure, coord } => vec![
                Notification::StructureUpgraded {
                    structure: *structure,
                    coord: *coord,
                },
                Notification::BuildStatus("Upgraded!".to_owned()),
            ],
            Event::StructureSold {
                structure,
                coord,
                refund,
            } => vec![
                Notification::StructureSold {
                    structure: *structure,
                    coord: *coord,
                },
                Notification::BuildStatus(format!("Sold for {refund} coins!")),
            ],
            Event::PlacementRejected { reason, .. }
            | Event::UpgradeRejected { reason, .. }
            | Event::SaleRejected { reason, .. } => {
                vec![Notification::BuildStatus(rejection_status(*reason))]
            }
            Event::TimeAdvanced { .. }
            | Event::WaveCompleted { .. }
            | Event::MoverSpawned { .. }
            | Event::MoverReachedEnd { .. }
            | Event::ProjectileLaunched { .. }
            | Event::ProjectileExpired { .. } => Vec::new(),
        }
    }
}

fn rejection_status(reason: EconomyError) -> String {
    match reason {
        EconomyError::Occupied => "Tile already occupied!".to_owned(),
        EconomyError::InsufficientFunds { required, .. } => format!("Need {required} coins!"),
        EconomyError::AlreadyMaxLevel => "Max level reached!".to_owned(),
        EconomyError::NotFound => "Structure not found!".to_owned(),
        EconomyError::NotBuildable => "Cannot build here!".to_owned(),
        EconomyError::UnknownStructureKind => "Unknown structure!".to_owned(),
        EconomyError::WrongPhase => WRONG_PHASE_STATUS.to_owned(),
    }
}
