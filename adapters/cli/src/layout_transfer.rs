use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_defence_core::{LevelDefinition, TileCoord, TileKind};

const LAYOUT_DOMAIN: &str = "level";
const LAYOUT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const LAYOUT_HEADER: &str = "level:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Tile layout of a level, detached from its economy and waves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LevelLayout {
    /// Number of tile columns.
    pub(crate) width: u32,
    /// Number of tile rows.
    pub(crate) height: u32,
    /// Row-major tile kinds.
    pub(crate) tiles: Vec<TileKind>,
    /// Tile where movers spawn.
    pub(crate) start: TileCoord,
    /// Tile movers try to reach.
    pub(crate) end: TileCoord,
}

impl LevelLayout {
    /// Captures the layout of a level.
    #[must_use]
    pub(crate) fn from_level(level: &LevelDefinition) -> Self {
        Self {
            width: level.width,
            height: level.height,
            tiles: level.tiles.clone(),
            start: level.start,
            end: level.end,
        }
    }

    /// Overwrites the layout fields of `level`, keeping its economy and waves.
    pub(crate) fn write_into(&self, level: &mut LevelDefinition) {
        level.width = self.width;
        level.height = self.height;
        level.tiles.clone_from(&self.tiles);
        level.start = self.start;
        level.end = self.end;
    }

    /// Encodes the layout into a single line suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableLayout {
            start: self.start,
            end: self.end,
            tiles: self.tiles.iter().map(|kind| tile_symbol(*kind)).collect(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{LAYOUT_HEADER}:{}x{}:{encoded}",
            self.width, self.height
        ))
    }

    /// Decodes a layout from its single-line representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != LAYOUT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != LAYOUT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (width, height) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableLayout =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        let tiles = decoded
            .tiles
            .chars()
            .map(|symbol| tile_kind(symbol).ok_or(LayoutTransferError::UnknownTile(symbol)))
            .collect::<Result<Vec<_>, _>>()?;
        let expected = u64::from(width) * u64::from(height);
        if tiles.len() as u64 != expected {
            return Err(LayoutTransferError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }

        Ok(Self {
            width,
            height,
            tiles,
            start: decoded.start,
            end: decoded.end,
        })
    }

    /// Renders the layout as one line of tile symbols per row.
    #[must_use]
    pub(crate) fn render(&self) -> String {
        let width = usize::try_from(self.width).unwrap_or(usize::MAX).max(1);
        self.tiles
            .chunks(width)
            .map(|row| row.iter().map(|kind| tile_symbol(*kind)).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    start: TileCoord,
    end: TileCoord,
    tiles: String,
}

/// Errors that can occur while transferring layout strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("layout payload was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("layout string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("layout string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The prefix segment named another format.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version identifier is not understood.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be (de)serialised.
    #[error("could not parse layout payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// The payload used a symbol that names no tile kind.
    #[error("unknown tile symbol '{0}'")]
    UnknownTile(char),
    /// The payload does not cover the grid exactly.
    #[error("layout holds {actual} tiles, dimensions require {expected}")]
    TileCountMismatch {
        /// Tiles required by the dimensions.
        expected: u64,
        /// Tiles present in the payload.
        actual: usize,
    },
}

/// Single-character symbol used for a tile kind.
#[must_use]
pub(crate) const fn tile_symbol(kind: TileKind) -> char {
    match kind {
        TileKind::Path => '#',
        TileKind::TowerPlacement => '.',
        TileKind::Obstacle => 'x',
        TileKind::Start => 'S',
        TileKind::End => 'E',
    }
}

const fn tile_kind(symbol: char) -> Option<TileKind> {
    match symbol {
        '#' => Some(TileKind::Path),
        '.' => Some(TileKind::TowerPlacement),
        'x' => Some(TileKind::Obstacle),
        'S' => Some(TileKind::Start),
        'E' => Some(TileKind::End),
        _ => None,
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (width, height) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> LevelLayout {
        LevelLayout {
            width: 4,
            height: 2,
            tiles: vec![
                TileKind::Start,
                TileKind::Path,
                TileKind::Path,
                TileKind::End,
                TileKind::TowerPlacement,
                TileKind::Obstacle,
                TileKind::TowerPlacement,
                TileKind::TowerPlacement,
            ],
            start: TileCoord::new(0, 0),
            end: TileCoord::new(3, 0),
        }
    }

    #[test]
    fn encoded_layout_decodes_back() {
        let layout = corridor();

        let encoded = layout.encode().expect("layout encodes");
        assert!(encoded.starts_with(&format!("{LAYOUT_HEADER}:4x2:")));
        assert!(!encoded.contains('\n'));

        let decoded = LevelLayout::decode(&encoded).expect("layout decodes");
        assert_eq!(decoded, layout);
    }

    #[test]
    fn render_prints_one_row_per_line() {
        assert_eq!(corridor().render(), "S##E\n.x..");
    }

    #[test]
    fn foreign_prefix_is_rejected() {
        let error = LevelLayout::decode("grid:v1:4x2:AAAA").expect_err("wrong domain");
        assert!(matches!(error, LayoutTransferError::InvalidPrefix(prefix) if prefix == "grid"));
    }

    #[test]
    fn dimensions_must_match_payload() {
        let encoded = corridor().encode().expect("layout encodes");
        let resized = encoded.replacen(":4x2:", ":3x2:", 1);

        let error = LevelLayout::decode(&resized).expect_err("tile count differs");
        assert!(matches!(
            error,
            LayoutTransferError::TileCountMismatch {
                expected: 6,
                actual: 8
            }
        ));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let error = LevelLayout::decode("level:v1:0x3:AAAA").expect_err("empty grid");
        assert!(matches!(error, LayoutTransferError::InvalidDimensions(_)));
    }
}
