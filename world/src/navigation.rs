//! A* route search used by the world to hand movers their waypoints.

use std::{cmp::Reverse, collections::BinaryHeap};

use tile_defence_core::{Direction, TileCoord};

use crate::grid::Grid;

/// Frontier entry ordered by estimated total cost, then by heuristic, then by
/// insertion order so equal-cost searches always expand in the same sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    estimate: u32,
    heuristic: u32,
    sequence: u64,
    coord: TileCoord,
}

/// Finds a shortest route between two traversable tiles.
///
/// The returned waypoints exclude `start` and end with `goal`. Steps cost 1
/// and only the four cardinal neighbours are considered. Returns `None` when
/// either endpoint is not traversable or the goal cannot be reached, and an
/// empty route when both endpoints coincide.
#[must_use]
pub fn find_path(grid: &Grid, start: TileCoord, goal: TileCoord) -> Option<Vec<TileCoord>> {
    if !grid.is_traversable(start) || !grid.is_traversable(goal) {
        return None;
    }

    if start == goal {
        return Some(Vec::new());
    }

    let cell_count = grid.cell_count();
    let mut cost_so_far = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<TileCoord>> = vec![None; cell_count];
    let mut closed = vec![false; cell_count];
    let mut open = BinaryHeap::new();
    let mut sequence = 0_u64;

    let start_index = grid.index(start)?;
    cost_so_far[start_index] = 0;
    let heuristic = start.manhattan_distance(goal);
    open.push(Reverse(OpenEntry {
        estimate: heuristic,
        heuristic,
        sequence,
        coord: start,
    }));

    while let Some(Reverse(entry)) = open.pop() {
        let Some(index) = grid.index(entry.coord) else {
            continue;
        };

        if closed[index] {
            continue;
        }
        closed[index] = true;

        if entry.coord == goal {
            return Some(reconstruct(grid, &came_from, start, goal));
        }

        let next_cost = cost_so_far[index].saturating_add(1);

        for direction in Direction::ALL {
            let Some(neighbor) = entry.coord.step(direction, grid.width(), grid.height()) else {
                continue;
            };

            if !grid.is_traversable(neighbor) {
                continue;
            }

            let Some(neighbor_index) = grid.index(neighbor) else {
                continue;
            };

            if closed[neighbor_index] || next_cost >= cost_so_far[neighbor_index] {
                continue;
            }

            cost_so_far[neighbor_index] = next_cost;
            came_from[neighbor_index] = Some(entry.coord);
            sequence += 1;
            let heuristic = neighbor.manhattan_distance(goal);
            open.push(Reverse(OpenEntry {
                estimate: next_cost.saturating_add(heuristic),
                heuristic,
                sequence,
                coord: neighbor,
            }));
        }
    }

    None
}

fn reconstruct(
    grid: &Grid,
    came_from: &[Option<TileCoord>],
    start: TileCoord,
    goal: TileCoord,
) -> Vec<TileCoord> {
    let mut route = Vec::new();
    let mut cursor = goal;

    while cursor != start {
        route.push(cursor);
        let Some(previous) = grid
            .index(cursor)
            .and_then(|index| came_from.get(index).copied().flatten())
        else {
            break;
        };
        cursor = previous;
    }

    route.reverse();
    route
}
