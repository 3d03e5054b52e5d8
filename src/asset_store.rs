use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

/// Metadata + raw bytes for a single image resource.
#[derive(Debug, Clone)]
pub struct AssetData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Thread-safe, clone-friendly in-memory image cache keyed by the URL that
/// scene nodes reference (`/images/products/atlas.png`).
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    inner: Arc<Mutex<HashMap<String, AssetData>>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an asset.
    pub fn insert(&self, url: impl Into<String>, data: AssetData) {
        let url = url.into();
        let Ok(mut map) = self.inner.lock() else {
            return;
        };
        map.insert(url, data);
    }

    pub fn get(&self, url: &str) -> Option<AssetData> {
        let map = self.inner.lock().ok()?;
        map.get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner
            .lock()
            .ok()
            .is_some_and(|map| map.contains_key(url))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the image stored under `url`. `None` when it is not stored.
    pub fn load_image(&self, url: &str) -> Result<Option<image::DynamicImage>> {
        let Some(data) = self.get(url) else {
            return Ok(None);
        };
        let img = image::load_from_memory(&data.bytes)
            .with_context(|| format!("failed to decode image for '{url}'"))?;
        Ok(Some(img))
    }
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Mirror a directory of images into a store, keyed as `/<relative path>`
/// with forward slashes. Files with unknown extensions are skipped.
pub fn load_from_dir(base_dir: &Path) -> Result<AssetStore> {
    let store = AssetStore::new();
    let mut pending = vec![base_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to list {}", dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to read entry in {}", dir.display()))?
                .path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Some(mime) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(mime_for_extension)
            else {
                continue;
            };
            let rel = path.strip_prefix(base_dir).unwrap_or(&path);
            let url = format!(
                "/{}",
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            );
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read asset {}", path.display()))?;
            store.insert(
                url,
                AssetData {
                    bytes,
                    mime_type: mime.to_string(),
                },
            );
        }
    }
    tracing::debug!(assets = store.len(), dir = %base_dir.display(), "loaded asset directory");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn store_round_trips_and_decodes() {
        let store = AssetStore::new();
        assert!(store.load_image("/a.png").unwrap().is_none());
        store.insert(
            "/a.png",
            AssetData {
                bytes: png_bytes(),
                mime_type: "image/png".to_string(),
            },
        );
        assert!(store.contains("/a.png"));
        let img = store.load_image("/a.png").unwrap().unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));

        store.insert(
            "/broken.png",
            AssetData {
                bytes: vec![1, 2, 3],
                mime_type: "image/png".to_string(),
            },
        );
        assert!(store.load_image("/broken.png").is_err());
    }

    #[test]
    fn directory_keys_are_url_paths() {
        let dir = std::env::temp_dir().join(format!("section-forge-assets-{}", std::process::id()));
        let nested = dir.join("images").join("products");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("atlas.png"), png_bytes()).unwrap();
        std::fs::write(nested.join("notes.txt"), b"skip").unwrap();

        let store = load_from_dir(&dir).unwrap();
        assert!(store.contains("/images/products/atlas.png"));
        assert_eq!(store.len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
