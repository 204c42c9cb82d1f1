//! Scenario files describing the rules, wave plan and opening tower layout of a match.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use rampart_core::{CellCoord, MatchConfig, TowerKind};
use rampart_system_spawning::Config as WavePlan;
use serde::Deserialize;

/// Scenario compiled into the binary and played when no file is supplied.
const BUILTIN_SCENARIO: &str = include_str!("../../../demos/skirmish.toml");

/// Tower placed before the first tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct Placement {
    /// Archetype to build.
    pub(crate) kind: TowerKind,
    /// Cell the tower occupies.
    pub(crate) cell: CellCoord,
}

/// Everything required to run a headless match.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    /// Match rules and archetype catalogs.
    pub(crate) rules: MatchConfig,
    /// Wave plan fed to the spawner.
    pub(crate) waves: WavePlan,
    /// Opening tower layout.
    pub(crate) towers: Vec<Placement>,
}

impl Scenario {
    /// Parses the scenario bundled with the binary.
    pub(crate) fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_SCENARIO).context("built-in scenario is invalid")
    }

    /// Reads and validates a scenario from a TOML file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("scenario {} is invalid", path.display()))
    }

    /// Parses and validates a scenario from TOML contents.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        self.rules
            .validate()
            .context("match rules failed validation")?;

        for group in self.waves.groups() {
            if self.rules.enemy(group.kind).is_none() {
                bail!(
                    "wave group spawns {:?}, which has no enemy archetype",
                    group.kind
                );
            }
            if group.count > 0 && group.interval_ms == 0 {
                bail!("wave group of {:?} has a zero spawn interval", group.kind);
            }
        }

        for placement in &self.towers {
            if self.rules.tower(placement.kind).is_none() {
                bail!(
                    "tower at {:?} uses {:?}, which has no tower archetype",
                    placement.cell,
                    placement.kind
                );
            }
        }

        Ok(())
    }
}
