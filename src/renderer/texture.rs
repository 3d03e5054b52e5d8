//! Image textures that start as a placeholder and are swapped in place once
//! decoding finishes on a worker thread.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender};

use super::utils::{is_data_url, load_image_from_data_url};
use crate::asset_store::AssetStore;

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// The 1x1 stand-in shown until the real image arrives.
    pub fn placeholder() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![255, 255, 255, 255],
        }
    }

    pub fn from_dynamic(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        }
    }

    pub fn size(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// One texture binding on a node.
#[derive(Debug, Clone)]
pub struct TextureSlot {
    pub url: String,
    pub image: DecodedImage,
    loaded: bool,
    /// Bumped whenever the pixels change, so GPU owners know to re-upload.
    pub generation: u64,
}

impl TextureSlot {
    pub fn placeholder(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            image: DecodedImage::placeholder(),
            loaded: false,
            generation: 0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        !self.loaded
    }

    pub fn swap_in(&mut self, image: DecodedImage) {
        self.image = image;
        self.loaded = true;
        self.generation += 1;
    }
}

#[derive(Debug)]
pub struct LoadedTexture {
    pub url: String,
    pub result: Result<DecodedImage, String>,
}

/// Where texture bytes come from, in lookup order: data URLs, the
/// in-memory store, then files under `base_dir`.
#[derive(Debug, Clone, Default)]
pub struct TextureSources {
    pub store: AssetStore,
    pub base_dir: Option<PathBuf>,
}

impl TextureSources {
    pub fn load(&self, url: &str) -> Result<DecodedImage> {
        if is_data_url(url) {
            let img = load_image_from_data_url(url)?;
            return Ok(DecodedImage::from_dynamic(&img));
        }
        if let Some(img) = self.store.load_image(url)? {
            return Ok(DecodedImage::from_dynamic(&img));
        }
        let base = self
            .base_dir
            .as_ref()
            .ok_or_else(|| anyhow!("no asset for '{url}' and no base directory"))?;
        let path = base.join(url.trim_start_matches('/'));
        let img = image::open(&path).with_context(|| format!("failed to load image {}", path.display()))?;
        Ok(DecodedImage::from_dynamic(&img))
    }
}

/// Fire-and-forget image loading. Requests decode on worker threads; the
/// frame loop calls [`TextureLoader::poll`] to collect finished images.
pub struct TextureLoader {
    sources: TextureSources,
    tx: Sender<LoadedTexture>,
    rx: Receiver<LoadedTexture>,
    in_flight: HashMap<String, usize>,
}

impl TextureLoader {
    pub fn new(sources: TextureSources) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            sources,
            tx,
            rx,
            in_flight: HashMap::new(),
        }
    }

    /// Start loading `url` unless a load is already pending.
    pub fn request(&mut self, url: &str) {
        if url.is_empty() {
            return;
        }
        let pending = self.in_flight.entry(url.to_string()).or_insert(0);
        *pending += 1;
        if *pending > 1 {
            return;
        }
        let sources = self.sources.clone();
        let tx = self.tx.clone();
        let url = url.to_string();
        std::thread::spawn(move || {
            let result = sources.load(&url).map_err(|e| format!("{e:#}"));
            // The loader may be gone by now; nothing to report to.
            let _ = tx.send(LoadedTexture { url, result });
        });
    }

    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Drain finished loads without blocking.
    pub fn poll(&mut self) -> Vec<LoadedTexture> {
        let mut done = Vec::new();
        while let Ok(loaded) = self.rx.try_recv() {
            self.in_flight.remove(&loaded.url);
            done.push(loaded);
        }
        done
    }

    /// Block until nothing is in flight. Used by offscreen rendering.
    pub fn wait_all(&mut self) -> Vec<LoadedTexture> {
        let mut done = Vec::new();
        while !self.in_flight.is_empty() {
            match self.rx.recv() {
                Ok(loaded) => {
                    self.in_flight.remove(&loaded.url);
                    done.push(loaded);
                }
                Err(_) => break,
            }
        }
        done
    }
}

/// Apply finished loads to matching slots. Failures leave the placeholder in
/// place. Returns how many slots changed.
pub fn apply_loaded(slots: &mut [&mut TextureSlot], loaded: Vec<LoadedTexture>) -> usize {
    let mut changed = 0;
    for item in loaded {
        match item.result {
            Ok(image) => {
                for slot in slots.iter_mut().filter(|s| s.url == item.url) {
                    slot.swap_in(image.clone());
                    changed += 1;
                }
                tracing::debug!(url = %item.url, "texture swapped in");
            }
            Err(e) => tracing::warn!(url = %item.url, error = %e, "texture load failed; keeping placeholder"),
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn png_data_url() -> String {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([0, 128, 255, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        let b64 = base64::engine::general_purpose::STANDARD.encode(out.into_inner());
        format!("data:image/png;base64,{b64}")
    }

    #[test]
    fn slot_starts_as_placeholder() {
        let slot = TextureSlot::placeholder("/x.png");
        assert!(slot.is_placeholder());
        assert_eq!((slot.image.width, slot.image.height), (1, 1));
    }

    #[test]
    fn loader_swaps_decoded_image_in_place() {
        let url = png_data_url();
        let mut loader = TextureLoader::new(TextureSources::default());
        loader.request(&url);
        loader.request(&url);
        assert_eq!(loader.pending(), 1);

        let mut slot = TextureSlot::placeholder(url.clone());
        let loaded = loader.wait_all();
        assert_eq!(apply_loaded(&mut [&mut slot], loaded), 1);
        assert!(!slot.is_placeholder());
        assert_eq!((slot.image.width, slot.image.height), (3, 2));
        assert_eq!(slot.generation, 1);
    }

    #[test]
    fn failed_load_keeps_placeholder() {
        let mut loader = TextureLoader::new(TextureSources::default());
        loader.request("/missing.png");
        let mut slot = TextureSlot::placeholder("/missing.png");
        let loaded = loader.wait_all();
        assert!(loaded[0].result.is_err());
        assert_eq!(apply_loaded(&mut [&mut slot], loaded), 0);
        assert!(slot.is_placeholder());
    }
}
