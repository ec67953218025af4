#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system that walks a wave's spawn schedule.
//!
//! Waiting between spawns is modelled as a [`SpawnCursor`] that is advanced
//! by the simulated time reported in [`Event::TimeAdvanced`]; nothing blocks
//! and a phase change simply drops the cursor.

use std::time::Duration;

use tile_defence_core::{Command, Event, Phase, WaveDefinition};
use tracing::debug;

/// Resumable position inside a wave's spawn schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnCursor {
    wave: u32,
    group: usize,
    emitted: u32,
    delay_applied: bool,
    remaining: Duration,
    finished: bool,
}

impl SpawnCursor {
    /// Creates a cursor positioned before the initial delay of the wave.
    #[must_use]
    pub fn new(wave: u32, definition: Option<&WaveDefinition>) -> Self {
        Self {
            wave,
            group: 0,
            emitted: 0,
            delay_applied: false,
            remaining: definition.map_or(Duration::ZERO, WaveDefinition::initial_delay),
            finished: false,
        }
    }

    /// Wave the cursor belongs to.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Index of the spawn group currently being emitted.
    #[must_use]
    pub const fn group_index(&self) -> usize {
        self.group
    }

    /// Number of movers emitted from the current group.
    #[must_use]
    pub const fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Time left until the cursor performs its next action.
    #[must_use]
    pub const fn time_until_next_action(&self) -> Duration {
        self.remaining
    }

    /// Reports whether the schedule has been exhausted.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Spends `budget` of simulated time, emitting every command that falls due.
    ///
    /// Each group spawns `count` movers, waiting the group interval after every
    /// spawn, then waits the group's trailing delay before the next group.
    pub fn advance(
        &mut self,
        budget: Duration,
        definition: Option<&WaveDefinition>,
        out: &mut Vec<Command>,
    ) {
        if self.finished {
            return;
        }

        let mut budget = budget;
        loop {
            if self.remaining > budget {
                self.remaining -= budget;
                return;
            }
            budget -= self.remaining;
            self.remaining = Duration::ZERO;

            let Some(group) = definition.and_then(|wave| wave.spawn_groups.get(self.group)) else {
                self.finished = true;
                debug!(wave = self.wave, "spawn schedule exhausted");
                out.push(Command::SpawningFinished { wave: self.wave });
                return;
            };

            if !self.delay_applied && self.emitted < group.count {
                out.push(Command::SpawnMover {
                    wave: self.wave,
                    enemy: group.enemy,
                });
                self.emitted += 1;
                self.remaining = group.interval();
                continue;
            }

            if !self.delay_applied {
                self.delay_applied = true;
                self.remaining = group.delay_after();
                continue;
            }

            self.group += 1;
            self.emitted = 0;
            self.delay_applied = false;
        }
    }
}

/// Pure system that emits spawn commands while a wave is running.
#[derive(Debug, Default)]
pub struct Spawning {
    cursor: Option<SpawnCursor>,
}

impl Spawning {
    /// Creates a new spawning system with no active schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active schedule, if a wave is running.
    #[must_use]
    pub fn cursor(&self) -> Option<&SpawnCursor> {
        self.cursor.as_ref()
    }

    /// Consumes world events to emit spawn commands for the running wave.
    ///
    /// `waves` holds the level's wave definitions indexed by one-based wave
    /// number minus one.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: Phase,
        waves: &[WaveDefinition],
        out: &mut Vec<Command>,
    ) {
        if phase != Phase::Wave {
            self.cursor = None;
            return;
        }

        for event in events {
            match event {
                Event::WaveStarted { wave, .. } => {
                    let definition = wave_definition(waves, *wave);
                    let mut cursor = SpawnCursor::new(*wave, definition);
                    cursor.advance(Duration::ZERO, definition, out);
                    self.cursor = Some(cursor);
                }
                Event::TimeAdvanced { dt } => {
                    if let Some(cursor) = self.cursor.as_mut() {
                        let definition = wave_definition(waves, cursor.wave());
                        cursor.advance(*dt, definition, out);
                    }
                }
                Event::PhaseChanged { phase } if *phase != Phase::Wave => self.cursor = None,
                _ => {}
            }
        }
    }
}

fn wave_definition(waves: &[WaveDefinition], wave: u32) -> Option<&WaveDefinition> {
    let index = usize::try_from(wave.checked_sub(1)?).ok()?;
    waves.get(index)
}
