//! Static record tables behind related bindings.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};

use crate::binding::{Record, Target};

const DEFAULT_FIXTURES_JSON: &str = include_str!("../assets/binding-fixtures.json");

static BUNDLED: LazyLock<Result<FixtureSet, String>> =
    LazyLock::new(|| FixtureSet::from_json(DEFAULT_FIXTURES_JSON).map_err(|e| format!("{e:#}")));

/// Lookup tables keyed by binding target.
#[derive(Debug, Clone, Default)]
pub struct FixtureSet {
    tables: HashMap<Target, Vec<Record>>,
}

impl FixtureSet {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<Record>> =
            serde_json::from_str(text).context("failed to parse binding fixtures json")?;
        let tables = raw
            .into_iter()
            .map(|(k, v)| (Target::from(k), v))
            .collect();
        Ok(Self { tables })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures at {}", path.display()))?;
        Self::from_json(&text)
    }

    /// The fixture tables shipped with the crate.
    pub fn bundled() -> Result<&'static FixtureSet> {
        BUNDLED
            .as_ref()
            .map_err(|e| anyhow::anyhow!("bundled fixtures are invalid: {e}"))
    }

    pub fn records(&self, target: &Target) -> Option<&[Record]> {
        self.tables.get(target).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tables_cover_every_known_target() {
        let fx = FixtureSet::bundled().unwrap();
        for t in [
            Target::Brand,
            Target::Product,
            Target::Feature,
            Target::Solution,
            Target::UseCase,
        ] {
            assert!(
                fx.records(&t).is_some_and(|r| !r.is_empty()),
                "missing fixtures for {t}"
            );
        }
        assert_eq!(fx.records(&Target::Product).unwrap().len(), 6);
    }
}
