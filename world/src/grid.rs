//! Immutable tile grid instantiated from a level definition.

use tile_defence_core::{LevelDefinition, LevelError, Tile, TileCoord, TileKind};

/// Dense row-major tile layout with its start and end markers.
#[derive(Clone, Debug)]
pub struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
    start: TileCoord,
    end: TileCoord,
}

impl Grid {
    /// Builds a grid from the provided level, validating its structure.
    ///
    /// Reachability of the end tile is not checked here; the world runs the
    /// pathfinder once the grid exists.
    pub fn from_level(level: &LevelDefinition) -> Result<Self, LevelError> {
        if level.width == 0 || level.height == 0 {
            return Err(LevelError::EmptyGrid {
                width: level.width,
                height: level.height,
            });
        }

        let expected = usize::try_from(u64::from(level.width) * u64::from(level.height))
            .unwrap_or(usize::MAX);
        if level.tiles.len() != expected {
            return Err(LevelError::TileCountMismatch {
                expected,
                actual: level.tiles.len(),
            });
        }

        let grid = Self {
            width: level.width,
            height: level.height,
            tiles: level.tiles.clone(),
            start: level.start,
            end: level.end,
        };

        for (kind, coord) in [(TileKind::Start, level.start), (TileKind::End, level.end)] {
            let count = grid.tiles.iter().filter(|tile| **tile == kind).count();
            if count != 1 {
                return Err(LevelError::MarkerCount { kind, count });
            }

            match grid.kind(coord) {
                None => return Err(LevelError::OutOfBounds { coord }),
                Some(found) if found != kind => {
                    return Err(LevelError::MarkerMismatch { kind, coord })
                }
                Some(_) => {}
            }
        }

        Ok(grid)
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Tile where movers enter.
    #[must_use]
    pub const fn start(&self) -> TileCoord {
        self.start
    }

    /// Tile movers try to reach.
    #[must_use]
    pub const fn end(&self) -> TileCoord {
        self.end
    }

    /// Kind of the tile at the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn kind(&self, coord: TileCoord) -> Option<TileKind> {
        self.index(coord)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Reports whether movers may stand on the coordinate.
    #[must_use]
    pub fn is_traversable(&self, coord: TileCoord) -> bool {
        self.kind(coord).is_some_and(TileKind::is_traversable)
    }

    /// Iterates all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        let width = self.width;
        (0_u32..).zip(self.tiles.iter()).map(move |(index, kind)| Tile {
            coord: TileCoord::new(index % width, index / width),
            kind: *kind,
        })
    }

    pub(crate) fn index(&self, coord: TileCoord) -> Option<usize> {
        if coord.column() >= self.width || coord.row() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let row = usize::try_from(coord.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor(width: u32) -> LevelDefinition {
        let mut tiles = vec![TileKind::Path; width as usize];
        tiles[0] = TileKind::Start;
        tiles[width as usize - 1] = TileKind::End;
        LevelDefinition {
            width,
            height: 1,
            tiles,
            start: TileCoord::new(0, 0),
            end: TileCoord::new(width - 1, 0),
            starting_lives: 20,
            starting_currency: 100,
            waves: Vec::new(),
        }
    }

    #[test]
    fn accepts_well_formed_corridor() {
        let grid = Grid::from_level(&corridor(4)).expect("valid level");
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.kind(TileCoord::new(3, 0)), Some(TileKind::End));
        assert!(grid.is_traversable(TileCoord::new(1, 0)));
        assert!(!grid.is_traversable(TileCoord::new(4, 0)));
        assert_eq!(grid.tiles().count(), 4);
    }

    #[test]
    fn rejects_empty_grid() {
        let mut level = corridor(3);
        level.height = 0;
        assert_eq!(
            Grid::from_level(&level).unwrap_err(),
            LevelError::EmptyGrid {
                width: 3,
                height: 0
            }
        );
    }

    #[test]
    fn rejects_short_tile_array() {
        let mut level = corridor(3);
        let _ = level.tiles.pop();
        assert_eq!(
            Grid::from_level(&level).unwrap_err(),
            LevelError::TileCountMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn rejects_duplicate_start_tiles() {
        let mut level = corridor(4);
        level.tiles[1] = TileKind::Start;
        assert_eq!(
            Grid::from_level(&level).unwrap_err(),
            LevelError::MarkerCount {
                kind: TileKind::Start,
                count: 2
            }
        );
    }

    #[test]
    fn rejects_misplaced_end_marker() {
        let mut level = corridor(4);
        level.end = TileCoord::new(2, 0);
        assert_eq!(
            Grid::from_level(&level).unwrap_err(),
            LevelError::MarkerMismatch {
                kind: TileKind::End,
                coord: TileCoord::new(2, 0)
            }
        );
    }

    #[test]
    fn rejects_out_of_bounds_start() {
        let mut level = corridor(4);
        level.start = TileCoord::new(0, 5);
        assert_eq!(
            Grid::from_level(&level).unwrap_err(),
            LevelError::OutOfBounds {
                coord: TileCoord::new(0, 5)
            }
        );
    }
}
