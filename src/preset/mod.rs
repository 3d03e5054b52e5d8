//! Presentation presets: signature-tagged scene configurations, and the
//! integrity guard that pins locked versions to a hash manifest.

pub mod integrity;
pub mod registry;
pub mod signature;

pub use integrity::{IntegrityManifest, IntegrityStatus, canonical_json, is_version_suffixed, preset_hash};
pub use registry::{FALLBACK_PRESET_KEY, Preset, PresetRegistry, PresetSelection};
pub use signature::{Signature, matches};
