#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural level layout generator.
//!
//! A randomized walk with backtracking carves a single path from the left
//! edge of the grid to the right edge. Every candidate step is checked in
//! order against the grid bounds, the existing walk, an "early join" rule
//! that keeps the path from touching itself and a rule that forbids 2×2
//! blocks of path tiles. The walk is deterministic for a given seed.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tile_defence_core::{Direction, GenerationError, LevelDefinition, TileCoord, TileKind};
use tracing::{debug, info, warn};

/// Probability of still stepping right while the length target is unmet.
const RIGHTWARD_BIAS: f64 = 0.15;

/// Step budget of a single attempt, as a multiple of the grid area.
const STEP_BUDGET_FACTOR: usize = 5;

/// Parameters steering a generation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Number of tile columns.
    pub width: u32,
    /// Number of tile rows.
    pub height: u32,
    /// Share of the grid, in percent, the path should cover at least.
    pub density_percent: u32,
    /// Attempts made before giving up.
    pub max_attempts: u32,
    /// Seed of the random walk.
    pub seed: u64,
    /// Row of the start tile; chosen at random per attempt when absent.
    #[serde(default)]
    pub start_row: Option<u32>,
}

impl GenerationParams {
    /// Minimum number of path tiles: the density share of the area, rounded
    /// up, but never less than the grid width.
    #[must_use]
    pub fn target_length(&self) -> usize {
        let area = u64::from(self.width) * u64::from(self.height);
        let density_share = (u64::from(self.density_percent) * area).div_ceil(100);
        let target = density_share.max(u64::from(self.width));
        usize::try_from(target).unwrap_or(usize::MAX)
    }

    fn validate(&self) -> Result<(), GenerationError> {
        let reason = if self.width < 2 {
            "width must be at least 2"
        } else if self.height < 1 {
            "height must be at least 1"
        } else if self.density_percent > 100 {
            "density must not exceed 100 percent"
        } else if self.max_attempts == 0 {
            "at least one attempt is required"
        } else if self.start_row.is_some_and(|row| row >= self.height) {
            "start row lies outside the grid"
        } else {
            return Ok(());
        };
        Err(GenerationError::InvalidParameters { reason })
    }
}

/// Successful generator output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedLayout {
    /// Number of tile columns.
    pub width: u32,
    /// Number of tile rows.
    pub height: u32,
    /// Row-major tile kinds.
    pub tiles: Vec<TileKind>,
    /// First tile of the walk, on the left edge.
    pub start: TileCoord,
    /// Last tile of the walk, on the right edge.
    pub end: TileCoord,
    /// Walk from start to end inclusive.
    pub path: Vec<TileCoord>,
}

impl GeneratedLayout {
    /// Overwrites the layout-related fields of the level.
    pub fn write_into(&self, level: &mut LevelDefinition) {
        level.width = self.width;
        level.height = self.height;
        level.tiles.clone_from(&self.tiles);
        level.start = self.start;
        level.end = self.end;
    }
}

/// Generates a layout, retrying up to `params.max_attempts` times.
pub fn generate(params: &GenerationParams) -> Result<GeneratedLayout, GenerationError> {
    params.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let target = params.target_length();

    for attempt in 1..=params.max_attempts {
        let start_row = params
            .start_row
            .unwrap_or_else(|| rng.gen_range(0..params.height));
        let mut walk = Walk::new(params.width, params.height);

        if walk.run(TileCoord::new(0, start_row), target, &mut rng) {
            let layout = walk.into_layout();
            info!(
                attempt,
                width = params.width,
                height = params.height,
                length = layout.path.len(),
                "path generated"
            );
            return Ok(layout);
        }

        debug!(attempt, start_row, "path generation attempt failed");
    }

    warn!(
        attempts = params.max_attempts,
        width = params.width,
        height = params.height,
        density = params.density_percent,
        "path generation exhausted its attempts"
    );
    Err(GenerationError::GenerationFailed {
        attempts: params.max_attempts,
    })
}

/// State of a single generation attempt.
#[derive(Debug)]
struct Walk {
    width: u32,
    height: u32,
    cells: Vec<TileCoord>,
    tried: Vec<u8>,
    on_walk: Vec<bool>,
}

impl Walk {
    fn new(width: u32, height: u32) -> Self {
        let area = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            cells: Vec::new(),
            tried: Vec::new(),
            on_walk: vec![false; area],
        }
    }

    fn run(&mut self, start: TileCoord, target: usize, rng: &mut ChaCha8Rng) -> bool {
        let budget = self.on_walk.len().saturating_mul(STEP_BUDGET_FACTOR);
        self.push(start);

        for _ in 0..budget {
            if self.is_complete(target) {
                return true;
            }

            let Some(&head) = self.cells.last() else {
                return false;
            };

            match self.choose(head, target, rng) {
                Some(direction) => {
                    if let Some(mask) = self.tried.last_mut() {
                        *mask |= bit(direction);
                    }
                    if let Some(next) = head.step(direction, self.width, self.height) {
                        self.push(next);
                    }
                }
                None => self.pop(),
            }
        }

        self.is_complete(target)
    }

    /// Head on the right edge with enough tiles behind it.
    fn is_complete(&self, target: usize) -> bool {
        self.cells.len() >= target
            && self
                .cells
                .last()
                .is_some_and(|head| head.column() + 1 == self.width)
    }

    fn choose(&self, head: TileCoord, target: usize, rng: &mut ChaCha8Rng) -> Option<Direction> {
        let tried = self.tried.last().copied().unwrap_or(0);
        let valid =
            |direction: Direction| tried & bit(direction) == 0 && self.accepts(head, direction);

        let right = valid(Direction::East);
        let vertical: Vec<Direction> = [Direction::North, Direction::South]
            .into_iter()
            .filter(|direction| valid(*direction))
            .collect();

        let prefer_right = if self.cells.len() < target {
            right && (vertical.is_empty() || rng.gen_bool(RIGHTWARD_BIAS))
        } else {
            right
        };

        if prefer_right {
            return Some(Direction::East);
        }

        if let Some(direction) = vertical.choose(rng) {
            return Some(*direction);
        }

        valid(Direction::West).then_some(Direction::West)
    }

    /// Checks bounds, walk membership, early joins and 2×2 blocks in order.
    fn accepts(&self, from: TileCoord, direction: Direction) -> bool {
        let Some(destination) = from.step(direction, self.width, self.height) else {
            return false;
        };

        if self.contains(destination) {
            return false;
        }

        let joins_early = Direction::ALL.into_iter().any(|side| {
            destination
                .step(side, self.width, self.height)
                .is_some_and(|neighbor| neighbor != from && self.contains(neighbor))
        });
        if joins_early {
            return false;
        }

        !self.completes_block(destination)
    }

    fn completes_block(&self, destination: TileCoord) -> bool {
        let column = i64::from(destination.column());
        let row = i64::from(destination.row());

        [(-1, -1), (0, -1), (-1, 0), (0, 0)]
            .into_iter()
            .any(|(dx, dy)| {
                let corners = [(0, 0), (1, 0), (0, 1), (1, 1)].map(|(cx, cy)| {
                    let x = column + dx + cx;
                    let y = row + dy + cy;
                    (x, y)
                });
                corners.into_iter().all(|(x, y)| {
                    if x == column && y == row {
                        return true;
                    }
                    match (u32::try_from(x), u32::try_from(y)) {
                        (Ok(x), Ok(y)) => self.contains(TileCoord::new(x, y)),
                        _ => false,
                    }
                })
            })
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if coord.column() >= self.width || coord.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn contains(&self, coord: TileCoord) -> bool {
        self.index(coord)
            .and_then(|index| self.on_walk.get(index).copied())
            .unwrap_or(false)
    }

    fn push(&mut self, coord: TileCoord) {
        if let Some(index) = self.index(coord) {
            self.on_walk[index] = true;
        }
        self.cells.push(coord);
        self.tried.push(0);
    }

    /// Abandons the head; the predecessor keeps the move marked as tried.
    fn pop(&mut self) {
        let _ = self.tried.pop();
        if let Some(coord) = self.cells.pop() {
            if let Some(index) = self.index(coord) {
                self.on_walk[index] = false;
            }
        }
    }

    fn into_layout(self) -> GeneratedLayout {
        let mut tiles = vec![TileKind::TowerPlacement; self.on_walk.len()];
        for coord in &self.cells {
            if let Some(index) = self.index(*coord) {
                tiles[index] = TileKind::Path;
            }
        }

        let start = self.cells.first().copied().unwrap_or(TileCoord::new(0, 0));
        let end = self.cells.last().copied().unwrap_or(start);
        for (coord, kind) in [(start, TileKind::Start), (end, TileKind::End)] {
            if let Some(index) = self.index(coord) {
                tiles[index] = kind;
            }
        }

        GeneratedLayout {
            width: self.width,
            height: self.height,
            tiles,
            start,
            end,
            path: self.cells,
        }
    }
}

const fn bit(direction: Direction) -> u8 {
    match direction {
        Direction::North => 0b0001,
        Direction::East => 0b0010,
        Direction::South => 0b0100,
        Direction::West => 0b1000,
    }
}
