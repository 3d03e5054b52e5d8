//! Canonical hashing of preset configs and the manifest that pins locked
//! versions.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use serde_json::Value;

use super::registry::PresetRegistry;

const DEFAULT_MANIFEST_JSON: &str = include_str!("../../assets/preset-manifest.json");

static BUNDLED: LazyLock<Result<IntegrityManifest, String>> = LazyLock::new(|| {
    IntegrityManifest::from_json(DEFAULT_MANIFEST_JSON).map_err(|e| format!("{e:#}"))
});

/// Key-sorted, whitespace-free JSON. Numbers with no fractional part print
/// as integers so `1` and `1.0` hash alike.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let _ = write!(out, "{i}");
            } else if let Some(u) = n.as_u64() {
                let _ = write!(out, "{u}");
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    let _ = write!(out, "{}", f as i64);
                } else {
                    let _ = write!(out, "{f}");
                }
            }
        }
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

/// DJB2 over UTF-8 bytes, as eight lowercase hex digits.
pub fn djb2_hex(text: &str) -> String {
    let hash = text
        .bytes()
        .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(u32::from(b)));
    format!("{hash:08x}")
}

pub fn preset_hash(config: &Value) -> String {
    djb2_hex(&canonical_json(config))
}

/// True for keys ending in `.v<digits>`.
pub fn is_version_suffixed(key: &str) -> bool {
    key.rsplit_once('.').is_some_and(|(_, last)| {
        last.strip_prefix('v')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    Ok,
    /// Not pinned yet. Informational.
    MissingInManifest,
    /// A locked version changed without a version bump.
    VersionViolation { expected: String, actual: String },
    /// An unlocked preset drifted from a stale manifest entry.
    Mismatch { expected: String, actual: String },
}

impl IntegrityStatus {
    pub fn code(&self) -> &'static str {
        match self {
            IntegrityStatus::Ok => "ok",
            IntegrityStatus::MissingInManifest => "missing_in_manifest",
            IntegrityStatus::VersionViolation { .. } => "version_violation",
            IntegrityStatus::Mismatch { .. } => "mismatch",
        }
    }
}

/// Preset key → expected config hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityManifest {
    hashes: BTreeMap<String, String>,
}

impl IntegrityManifest {
    pub fn new(hashes: BTreeMap<String, String>) -> Self {
        Self { hashes }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let hashes = serde_json::from_str(text).context("failed to parse preset manifest json")?;
        Ok(Self { hashes })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest at {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn bundled() -> Result<&'static IntegrityManifest> {
        BUNDLED
            .as_ref()
            .map_err(|e| anyhow::anyhow!("bundled preset manifest is invalid: {e}"))
    }

    pub fn expected(&self, key: &str) -> Option<&str> {
        self.hashes.get(key).map(String::as_str)
    }

    pub fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    pub fn check(&self, key: &str, config: &Value) -> IntegrityStatus {
        let Some(expected) = self.hashes.get(key) else {
            return IntegrityStatus::MissingInManifest;
        };
        let actual = preset_hash(config);
        if &actual == expected {
            IntegrityStatus::Ok
        } else if is_version_suffixed(key) {
            IntegrityStatus::VersionViolation {
                expected: expected.clone(),
                actual,
            }
        } else {
            IntegrityStatus::Mismatch {
                expected: expected.clone(),
                actual,
            }
        }
    }

    /// Current hash of every locked preset in `registry`, ready to be
    /// committed as the new manifest.
    pub fn regenerate(registry: &PresetRegistry) -> Self {
        let hashes: BTreeMap<String, String> = registry
            .iter()
            .filter(|p| is_version_suffixed(&p.key))
            .map(|p| (p.key.clone(), preset_hash(&p.config)))
            .collect();
        tracing::info!(presets = hashes.len(), "regenerated preset manifest");
        Self { hashes }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.hashes).context("failed to serialize preset manifest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn canonical_form_sorts_keys_and_normalises_numbers() {
        let v = json!({"b": 1, "a": [1.5, 2.0, "x"]});
        assert_eq!(canonical_json(&v), r#"{"a":[1.5,2,"x"],"b":1}"#);
        assert_eq!(preset_hash(&v), "d1ee3d2b");
    }

    #[test]
    fn hash_is_order_independent_and_leaf_sensitive() {
        let a = json!({"shape": "card", "heading": "Hi", "frameWidth": 240});
        let b = json!({"frameWidth": 240, "heading": "Hi", "shape": "card"});
        assert_eq!(preset_hash(&a), preset_hash(&a));
        assert_eq!(preset_hash(&a), preset_hash(&b));
        let c = json!({"shape": "card", "heading": "Hi", "frameWidth": 241});
        assert_ne!(preset_hash(&a), preset_hash(&c));
        assert_eq!(preset_hash(&json!({"a": 1})), "56391ecd");
        assert_eq!(preset_hash(&json!({"a": 2})), "56391eee");
    }

    #[test]
    fn version_suffix_detection() {
        assert!(is_version_suffixed("related.product.many.marquee.v1"));
        assert!(is_version_suffixed("x.v12"));
        assert!(!is_version_suffixed("generic.empty"));
        assert!(!is_version_suffixed("x.v"));
        assert!(!is_version_suffixed("x.v1a"));
        assert!(!is_version_suffixed("v1"));
    }

    #[test]
    fn check_classifies_drift() {
        let config = json!({"shape": "group"});
        let mut hashes = BTreeMap::new();
        hashes.insert("locked.v1".to_string(), "00000000".to_string());
        hashes.insert("loose".to_string(), "00000000".to_string());
        hashes.insert("good.v2".to_string(), preset_hash(&config));
        let m = IntegrityManifest::new(hashes);

        assert_eq!(m.check("good.v2", &config), IntegrityStatus::Ok);
        assert_eq!(m.check("absent.v1", &config), IntegrityStatus::MissingInManifest);
        assert!(matches!(
            m.check("locked.v1", &config),
            IntegrityStatus::VersionViolation { .. }
        ));
        assert_eq!(m.check("loose", &config).code(), "mismatch");
    }

    #[test]
    fn bundled_manifest_matches_bundled_presets() {
        let reg = PresetRegistry::bundled().unwrap();
        let manifest = IntegrityManifest::bundled().unwrap();
        for preset in reg.iter() {
            let status = manifest.check(&preset.key, &preset.config);
            if is_version_suffixed(&preset.key) {
                assert_eq!(status, IntegrityStatus::Ok, "{}", preset.key);
            } else {
                assert_eq!(status, IntegrityStatus::MissingInManifest, "{}", preset.key);
            }
        }
        assert_eq!(&IntegrityManifest::regenerate(reg), manifest);
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            (-1000i64..1000).prop_map(|i| json!(i)),
            "[a-z]{0,6}".prop_map(Value::String),
        ]
    }

    proptest! {
        #[test]
        fn key_order_never_changes_the_hash(entries in proptest::collection::btree_map("[a-z]{1,5}", leaf(), 1..8)) {
            let pairs: Vec<(String, String)> = entries.iter().map(|(k, v)| (json!(k).to_string(), v.to_string())).collect();
            let sorted: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}:{v}")).collect();
            let sorted = format!("{{{}}}", sorted.join(","));
            let authored: Vec<String> = pairs.iter().rev().map(|(k, v)| format!("{k}: {v}")).collect();
            let authored = format!("{{ {} }}", authored.join(", "));

            let value: Value = serde_json::from_str(&authored).unwrap();
            prop_assert_eq!(canonical_json(&value), sorted.clone());
            prop_assert_eq!(
                preset_hash(&value),
                preset_hash(&serde_json::from_str(&sorted).unwrap())
            );
        }
    }
}
