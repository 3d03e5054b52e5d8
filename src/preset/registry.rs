use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::signature::Signature;
use crate::binding::Binding;
use crate::scene::SceneObject;

const DEFAULT_PRESETS_JSON: &str = include_str!("../../assets/presets.json");

static BUNDLED: LazyLock<Result<PresetRegistry, String>> = LazyLock::new(|| {
    PresetRegistry::from_json(DEFAULT_PRESETS_JSON).map_err(|e| format!("{e:#}"))
});

/// Preset offered when nothing in the registry fits a binding.
pub const FALLBACK_PRESET_KEY: &str = "generic.empty";

/// A named scene configuration.
///
/// `config` keeps the authored JSON so integrity hashing sees exactly what
/// was committed; `scene` is the typed view used for instantiation.
#[derive(Debug, Clone)]
pub struct Preset {
    pub key: String,
    pub signature: Signature,
    pub config: serde_json::Value,
    pub scene: SceneObject,
}

#[derive(Deserialize)]
struct PresetFile {
    presets: Vec<PresetEntry>,
}

#[derive(Deserialize)]
struct PresetEntry {
    key: String,
    signature: Signature,
    config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetSelection {
    pub key: String,
    /// True when `key` differs from the preset that was assigned before.
    pub auto_selected: bool,
    /// The previously assigned key, when it no longer fits the binding.
    pub previous_incompatible: Option<String>,
}

/// Read-only key → preset map that remembers authoring order.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: Vec<Preset>,
    index: HashMap<String, usize>,
}

impl PresetRegistry {
    pub fn from_json(text: &str) -> Result<Self> {
        let file: PresetFile =
            serde_json::from_str(text).context("failed to parse presets json")?;
        let mut registry = Self::default();
        for entry in file.presets {
            let scene: SceneObject = serde_json::from_value(entry.config.clone())
                .with_context(|| format!("preset '{}' has an invalid config", entry.key))?;
            registry.insert(Preset {
                key: entry.key,
                signature: entry.signature,
                config: entry.config,
                scene,
            })?;
        }
        Ok(registry)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read presets at {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn bundled() -> Result<&'static PresetRegistry> {
        BUNDLED
            .as_ref()
            .map_err(|e| anyhow::anyhow!("bundled presets are invalid: {e}"))
    }

    pub fn insert(&mut self, preset: Preset) -> Result<()> {
        if self.index.contains_key(&preset.key) {
            bail!("duplicate preset key '{}'", preset.key);
        }
        self.index.insert(preset.key.clone(), self.presets.len());
        self.presets.push(preset);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Preset> {
        self.index.get(key).map(|&i| &self.presets[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Presets a section with `binding` may choose from, in registry order.
    /// The catch-all fallback is never offered as a choice.
    pub fn compatible_presets<'a>(&'a self, binding: &'a Binding) -> impl Iterator<Item = &'a Preset> {
        self.presets
            .iter()
            .filter(move |p| p.signature != Signature::Any && p.signature.accepts(binding))
    }

    /// Re-check a section's preset after its binding changed.
    pub fn select_preset(&self, binding: &Binding, current: Option<&str>) -> PresetSelection {
        if let Some(key) = current.filter(|k| self.get(k).is_some_and(|p| p.signature.accepts(binding))) {
            return PresetSelection {
                key: key.to_string(),
                auto_selected: false,
                previous_incompatible: None,
            };
        }

        let key = self
            .compatible_presets(binding)
            .next()
            .map(|p| p.key.clone())
            .unwrap_or_else(|| FALLBACK_PRESET_KEY.to_string());
        tracing::debug!(
            previous = current.unwrap_or(""),
            selected = %key,
            "auto-selected preset for binding"
        );
        PresetSelection {
            auto_selected: current != Some(key.as_str()),
            previous_incompatible: current.map(str::to_string),
            key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Cardinality, Target};

    #[test]
    fn bundled_registry_loads_in_order() {
        let reg = PresetRegistry::bundled().unwrap();
        assert!(reg.len() >= 10);
        assert_eq!(reg.keys().next(), Some("self.page.one.hero.v1"));
        assert!(reg.contains("related.product.many.marquee.v1"));
        assert!(reg.contains(FALLBACK_PRESET_KEY));
        let marquee = reg.get("related.product.many.marquee.v1").unwrap();
        assert_eq!(marquee.scene.id, "products");
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let json = r#"{"presets": [
            {"key": "a.v1", "signature": {"kind": "self"}, "config": {"shape": "group"}},
            {"key": "a.v1", "signature": {"kind": "self"}, "config": {"shape": "group"}}
        ]}"#;
        let err = PresetRegistry::from_json(json).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate preset key"));
    }

    #[test]
    fn invalid_config_names_the_preset() {
        let json = r#"{"presets": [
            {"key": "bad.v1", "signature": {"kind": "self"}, "config": {"shape": "hexagon"}}
        ]}"#;
        let err = PresetRegistry::from_json(json).unwrap_err();
        assert!(format!("{err:#}").contains("bad.v1"));
    }

    #[test]
    fn compatible_presets_filter_by_signature() {
        let reg = PresetRegistry::bundled().unwrap();
        let binding = Binding::related(Target::Product, Cardinality::Many);
        let keys: Vec<_> = reg.compatible_presets(&binding).map(|p| p.key.as_str()).collect();
        assert!(keys.contains(&"related.product.many.marquee.v1"));
        assert!(keys.iter().all(|k| k.starts_with("related.product.many")));
        assert!(!keys.contains(&FALLBACK_PRESET_KEY));
    }

    #[test]
    fn select_keeps_compatible_current_preset() {
        let reg = PresetRegistry::bundled().unwrap();
        let binding = Binding::related(Target::Product, Cardinality::Many);
        let sel = reg.select_preset(&binding, Some("related.product.many.grid.v1"));
        assert_eq!(sel.key, "related.product.many.grid.v1");
        assert!(!sel.auto_selected);
        assert!(sel.previous_incompatible.is_none());
    }

    #[test]
    fn select_switches_after_binding_edit() {
        let reg = PresetRegistry::bundled().unwrap();
        let binding = Binding::related(Target::Feature, Cardinality::Many);
        let sel = reg.select_preset(&binding, Some("related.product.many.grid.v1"));
        assert_eq!(sel.key, "related.feature.many.grid.v1");
        assert!(sel.auto_selected);
        assert_eq!(
            sel.previous_incompatible.as_deref(),
            Some("related.product.many.grid.v1")
        );
    }

    #[test]
    fn select_falls_back_when_nothing_fits() {
        let reg = PresetRegistry::bundled().unwrap();
        let binding = Binding::related(Target::from("partner".to_string()), Cardinality::Many);
        let sel = reg.select_preset(&binding, None);
        assert_eq!(sel.key, FALLBACK_PRESET_KEY);
        assert!(sel.auto_selected);
    }
}
