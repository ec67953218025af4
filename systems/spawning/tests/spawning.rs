use std::time::Duration;

use tile_defence_core::{
    Catalog, Command, EnemyDefinition, EnemyKind, Event, LevelDefinition, Phase,
    SimulationConfig, SpawnGroup, TileCoord, TileKind, WaveDefinition,
};
use tile_defence_system_spawning::Spawning;
use tile_defence_world::{self as world, query, World};

const SCOUT: EnemyKind = EnemyKind::new(4);

fn level(waves: Vec<WaveDefinition>) -> LevelDefinition {
    let mut tiles = vec![TileKind::Path; 12];
    tiles[0] = TileKind::Start;
    tiles[11] = TileKind::End;
    LevelDefinition {
        width: 12,
        height: 1,
        tiles,
        start: TileCoord::new(0, 0),
        end: TileCoord::new(11, 0),
        starting_lives: 20,
        starting_currency: 100,
        waves,
    }
}

fn catalog() -> Catalog {
    Catalog {
        enemies: vec![EnemyDefinition {
            kind: SCOUT,
            name: "Scout".to_owned(),
            health: 1.0,
            speed: 0.5,
            bounty: 1,
        }],
        structures: Vec::new(),
    }
}

fn wave(count: u32, initial_delay_secs: f32, interval_secs: f32) -> WaveDefinition {
    WaveDefinition {
        initial_delay_secs,
        spawn_groups: vec![SpawnGroup {
            enemy: SCOUT,
            count,
            interval_secs,
            delay_after_secs: 0.0,
        }],
    }
}

/// Drives the world and the spawning system with a fixed step, returning the
/// spawn counts observed after every step.
fn drive(world: &mut World, spawning: &mut Spawning, steps: usize, dt: Duration) -> Vec<usize> {
    let mut counts = Vec::with_capacity(steps);
    for _ in 0..steps {
        let mut events = Vec::new();
        world::apply(world, Command::Tick { dt }, &mut events);

        let mut commands = Vec::new();
        spawning.handle(&events, query::phase(world), query::waves(world), &mut commands);
        for command in commands {
            world::apply(world, command, &mut events);
        }
        counts.push(query::active_mover_count(world));
    }
    counts
}

fn started(level: &LevelDefinition) -> World {
    let config = SimulationConfig {
        build_countdown_secs: 1.0,
        ..SimulationConfig::default()
    };
    let mut world = World::new(level, catalog(), config).expect("valid level");
    let mut events = Vec::new();
    world::apply(&mut world, Command::Start, &mut events);
    world
}

#[test]
fn first_spawn_lands_on_the_tick_that_starts_the_wave() {
    let level = level(vec![wave(3, 0.0, 1.0)]);
    let mut world = started(&level);
    let mut spawning = Spawning::new();

    let counts = drive(&mut world, &mut spawning, 4, Duration::from_secs(1));

    assert_eq!(counts, vec![1, 2, 3, 3]);
    assert!(spawning.cursor().is_some_and(|cursor| cursor.is_finished()));
    assert!(!query::is_spawning(&world));
}

#[test]
fn initial_delay_postpones_spawns() {
    let level = level(vec![wave(2, 2.0, 0.5)]);
    let mut world = started(&level);
    let mut spawning = Spawning::new();

    let counts = drive(&mut world, &mut spawning, 8, Duration::from_millis(500));

    assert_eq!(counts, vec![0, 0, 0, 0, 0, 1, 2, 2]);
}

#[test]
fn leaving_the_wave_drops_the_schedule() {
    let level = level(vec![wave(5, 0.0, 1.0)]);
    let mut spawning = Spawning::new();
    let mut commands = Vec::new();

    spawning.handle(
        &[Event::WaveStarted { wave: 1, total: 1 }],
        Phase::Wave,
        &level.waves,
        &mut commands,
    );
    assert_eq!(commands.len(), 1);
    assert!(spawning.cursor().is_some());

    commands.clear();
    spawning.handle(
        &[Event::PhaseChanged {
            phase: Phase::GameOver,
        }],
        Phase::GameOver,
        &level.waves,
        &mut commands,
    );
    assert!(spawning.cursor().is_none());

    spawning.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_secs(10),
        }],
        Phase::Wave,
        &level.waves,
        &mut commands,
    );
    assert!(commands.is_empty());
}

#[test]
fn empty_wave_finishes_at_once() {
    let level = level(vec![WaveDefinition {
        initial_delay_secs: 0.0,
        spawn_groups: Vec::new(),
    }]);
    let mut spawning = Spawning::new();
    let mut commands = Vec::new();

    spawning.handle(
        &[Event::WaveStarted { wave: 1, total: 1 }],
        Phase::Wave,
        &level.waves,
        &mut commands,
    );

    assert_eq!(commands, vec![Command::SpawningFinished { wave: 1 }]);
}
