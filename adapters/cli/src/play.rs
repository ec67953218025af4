use std::time::Duration;

use anyhow::{Context, Result};
use tile_defence_core::{Catalog, Direction, Phase, StructureDefinition, TileCoord};
use tile_defence_simulation::{LevelSequence, Notification, Simulation};
use tile_defence_world::query;
use tracing::{debug, info, warn};

use crate::scenario::Scenario;

/// Settings of a headless run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PlayOptions {
    /// Simulated time advanced per tick.
    pub(crate) dt: Duration,
    /// Tick limit per level.
    pub(crate) max_ticks: u64,
    /// Places the cheapest structure next to the path at every build phase.
    pub(crate) auto_build: bool,
    /// Zero-based index of the first level to play.
    pub(crate) first_level: usize,
}

/// Result of playing one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LevelOutcome {
    /// Zero-based level index.
    pub(crate) level: usize,
    /// Phase the level ended in.
    pub(crate) phase: Phase,
    /// Lives left.
    pub(crate) lives: u32,
    /// Currency left.
    pub(crate) currency: u32,
    /// Ticks simulated.
    pub(crate) ticks: u64,
}

/// Plays the scenario's levels in order until one is lost or all are won.
pub(crate) fn play(scenario: &Scenario, options: PlayOptions) -> Result<Vec<LevelOutcome>> {
    let mut sequence =
        LevelSequence::new(scenario.levels.clone()).context("scenario contains no levels")?;
    let _ = sequence.select(options.first_level);

    let mut outcomes = Vec::new();
    loop {
        let outcome = play_level(scenario, &sequence, options)?;
        outcomes.push(outcome);

        if outcome.phase != Phase::Victory || sequence.advance().is_none() {
            return Ok(outcomes);
        }
    }
}

fn play_level(
    scenario: &Scenario,
    sequence: &LevelSequence,
    options: PlayOptions,
) -> Result<LevelOutcome> {
    let level = sequence.position();
    let mut simulation = Simulation::new(
        sequence.current(),
        scenario.catalog.clone(),
        scenario.config.clone(),
    )
    .with_context(|| format!("level {level} is invalid"))?;
    simulation.subscribe(move |notification: &Notification| log_notification(level, notification));

    info!(level, "{}", query::welcome_banner(simulation.world()));
    simulation.start();

    let mut built = false;
    let mut ticks = 0;
    while ticks < options.max_ticks && !simulation.phase().is_terminal() {
        if simulation.phase() == Phase::Build {
            if options.auto_build && !built {
                auto_build(&mut simulation);
            }
            built = true;
        } else {
            built = false;
        }

        simulation.tick(options.dt);
        ticks += 1;
    }

    if !simulation.phase().is_terminal() {
        warn!(level, ticks, "tick limit reached before the level ended");
    }

    let world = simulation.world();
    Ok(LevelOutcome {
        level,
        phase: simulation.phase(),
        lives: query::lives(world),
        currency: query::currency(world),
        ticks,
    })
}

/// Spends the balance on the cheapest structure, filling free buildable tiles
/// that touch the path in row-major order.
fn auto_build(simulation: &mut Simulation) {
    let Some((kind, cost)) = cheapest_structure(query::catalog(simulation.world()))
        .map(|structure| (structure.kind, structure.cost))
    else {
        return;
    };

    for coord in build_sites(simulation) {
        if query::currency(simulation.world()) < cost {
            break;
        }
        simulation.select_structure_kind(kind);
        simulation.place_at(coord);
    }
    debug!(
        structures = query::structure_view(simulation.world()).iter().count(),
        "auto build finished"
    );
}

fn build_sites(simulation: &Simulation) -> Vec<TileCoord> {
    let world = simulation.world();
    let grid = query::grid(world);
    grid.tiles()
        .filter(|tile| tile.kind.is_buildable())
        .filter(|tile| query::structure_at(world, tile.coord).is_none())
        .filter(|tile| {
            Direction::ALL.into_iter().any(|direction| {
                tile.coord
                    .step(direction, grid.width(), grid.height())
                    .is_some_and(|next| grid.is_traversable(next))
            })
        })
        .map(|tile| tile.coord)
        .collect()
}

fn log_notification(level: usize, notification: &Notification) {
    match notification {
        Notification::PhaseChanged(phase) => info!(level, ?phase, "phase changed"),
        Notification::WaveProgress { current, total } => {
            info!(level, current, total, "wave progress");
        }
        Notification::LivesChanged(lives) => info!(level, lives, "lives changed"),
        Notification::SpawnAborted { wave, reason } => {
            warn!(level, wave, %reason, "spawn aborted");
        }
        Notification::BuildStatus(status) => debug!(level, status = status.as_str(), "build"),
        other => debug!(level, notification = ?other, "notification"),
    }
}

fn cheapest_structure(catalog: &Catalog) -> Option<&StructureDefinition> {
    catalog
        .structures
        .iter()
        .min_by_key(|structure| (structure.cost, structure.kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_defence_core::{
        EnemyDefinition, EnemyKind, LevelDefinition, SimulationConfig, SpawnGroup, StructureKind,
        TileKind, UpgradeDefinition, WaveDefinition,
    };

    fn scenario(lives: u32, currency: u32, levels: usize) -> Scenario {
        let mut tiles = vec![TileKind::Start];
        tiles.extend([TileKind::Path; 4]);
        tiles.push(TileKind::End);
        tiles.extend([TileKind::TowerPlacement; 6]);
        let level = LevelDefinition {
            width: 6,
            height: 2,
            tiles,
            start: TileCoord::new(0, 0),
            end: TileCoord::new(5, 0),
            starting_lives: lives,
            starting_currency: currency,
            waves: vec![WaveDefinition {
                initial_delay_secs: 0.0,
                spawn_groups: vec![SpawnGroup {
                    enemy: EnemyKind::new(0),
                    count: 2,
                    interval_secs: 1.0,
                    delay_after_secs: 0.0,
                }],
            }],
        };

        Scenario {
            config: SimulationConfig {
                build_countdown_secs: 1.0,
                ..SimulationConfig::default()
            },
            catalog: Catalog {
                enemies: vec![EnemyDefinition {
                    kind: EnemyKind::new(0),
                    name: "Scout".to_owned(),
                    health: 10.0,
                    speed: 1.0,
                    bounty: 5,
                }],
                structures: vec![
                    StructureDefinition {
                        kind: StructureKind::new(0),
                        name: "Mortar".to_owned(),
                        range: 2.0,
                        damage: 10.0,
                        fire_rate: 0.5,
                        projectile_speed: 10.0,
                        cost: 80,
                        upgrade: UpgradeDefinition {
                            cost: 60,
                            range_increase: 0.5,
                            damage_increase: 5.0,
                            fire_rate_increase: 0.5,
                        },
                    },
                    StructureDefinition {
                        kind: StructureKind::new(1),
                        name: "Cannon".to_owned(),
                        range: 1.5,
                        damage: 5.0,
                        fire_rate: 1.0,
                        projectile_speed: 10.0,
                        cost: 50,
                        upgrade: UpgradeDefinition {
                            cost: 40,
                            range_increase: 0.5,
                            damage_increase: 5.0,
                            fire_rate_increase: 1.0,
                        },
                    },
                ],
            },
            levels: vec![level; levels],
        }
    }

    fn options(auto_build: bool) -> PlayOptions {
        PlayOptions {
            dt: Duration::from_millis(100),
            max_ticks: 10_000,
            auto_build,
            first_level: 0,
        }
    }

    #[test]
    fn auto_build_defends_every_level() {
        let scenario = scenario(20, 100, 2);
        assert_eq!(
            cheapest_structure(&scenario.catalog).map(|structure| structure.kind),
            Some(StructureKind::new(1))
        );

        let outcomes = play(&scenario, options(true)).expect("scenario plays");

        assert_eq!(outcomes.len(), 2);
        for (index, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.level, index);
            assert_eq!(outcome.phase, Phase::Victory);
            assert_eq!(outcome.lives, 20);
        }
    }

    #[test]
    fn lost_level_ends_the_run() {
        let scenario = scenario(1, 0, 3);

        let outcomes = play(&scenario, options(false)).expect("scenario plays");

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].phase, Phase::GameOver);
        assert_eq!(outcomes[0].lives, 0);
    }

    #[test]
    fn first_level_is_clamped_to_the_sequence() {
        let scenario = scenario(20, 0, 2);
        let mut late = options(false);
        late.first_level = 9;

        let outcomes = play(&scenario, late).expect("scenario plays");

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].level, 1);
        assert_eq!(outcomes[0].phase, Phase::Victory);
        assert_eq!(outcomes[0].lives, 18);
    }
}
