use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tile_defence_core::{Catalog, LevelDefinition, SimulationConfig};

/// Scenario file: shared tunables and catalog plus the ordered level list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Scenario {
    /// Phase machine tunables.
    #[serde(default)]
    pub(crate) config: SimulationConfig,
    /// Enemy and structure definitions shared by all levels.
    #[serde(default)]
    pub(crate) catalog: Catalog,
    /// Levels in the order they are played.
    pub(crate) levels: Vec<LevelDefinition>,
}

impl Scenario {
    /// Reads and parses a scenario TOML file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario = Self::parse(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))?;
        Ok(scenario)
    }

    /// Parses scenario TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text)?;
        ensure!(!scenario.levels.is_empty(), "scenario contains no levels");
        Ok(scenario)
    }
}

/// Reads and parses a single level TOML file.
pub(crate) fn load_level(path: &Path) -> Result<LevelDefinition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read level {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse level {}", path.display()))
}

/// Serialises a level as TOML and writes it to `path`.
pub(crate) fn write_level(path: &Path, level: &LevelDefinition) -> Result<()> {
    let text = toml::to_string_pretty(level).context("failed to serialise level")?;
    fs::write(path, text).with_context(|| format!("failed to write level {}", path.display()))
}
