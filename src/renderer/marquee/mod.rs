//! The GPU marquee track: one shared canvas drawing every item of a
//! `webgl`-policy marquee list as instanced rounded-rect quads.

pub mod gpu;
pub mod radius;
pub mod state;
pub mod wgsl;

use std::sync::Arc;

use anyhow::Result;

use crate::renderer::raymarch::frame_loop::FrameLoop;
use crate::renderer::resources::ResourceSink;
use crate::renderer::texture::{LoadedTexture, TextureSlot, apply_loaded};
use crate::scene::SceneObject;

pub use radius::CornerRadii;
pub use state::{MarqueeInstance, MarqueeItem, MarqueeTrackState, TrackStyle};

/// Track state plus its frame loop and one texture slot per item.
///
/// Dropping the track stops its loop; the canvas ([`gpu::MarqueeCanvas`])
/// holds the context lease separately.
#[derive(Debug)]
pub struct MarqueeTrack {
    state: MarqueeTrackState,
    frame_loop: FrameLoop,
    textures: Vec<TextureSlot>,
}

impl MarqueeTrack {
    pub fn new(node: &SceneObject, sink: Arc<dyn ResourceSink>) -> Result<Self> {
        let state = MarqueeTrackState::from_node(node)?;
        let textures = state
            .items()
            .iter()
            .map(|item| TextureSlot::placeholder(item.image_url.clone()))
            .collect();
        let frame_loop = FrameLoop::new(state.id().to_string(), sink, true);
        Ok(Self {
            state,
            frame_loop,
            textures,
        })
    }

    pub fn id(&self) -> &str {
        self.state.id()
    }

    pub fn state(&self) -> &MarqueeTrackState {
        &self.state
    }

    pub fn texture_slots(&self) -> &[TextureSlot] {
        &self.textures
    }

    /// Distinct non-empty image URLs, in item order.
    pub fn texture_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for slot in &self.textures {
            if !slot.url.is_empty() && !urls.contains(&slot.url.as_str()) {
                urls.push(&slot.url);
            }
        }
        urls
    }

    pub fn apply_textures(&mut self, loaded: Vec<LoadedTexture>) -> usize {
        let mut slots: Vec<&mut TextureSlot> = self.textures.iter_mut().collect();
        let changed = apply_loaded(&mut slots, loaded);
        if changed > 0 {
            self.frame_loop.request_redraw();
        }
        changed
    }

    /// Intersection observer callback.
    pub fn set_visible(&mut self, visible: bool) {
        self.frame_loop.set_visible(visible);
    }

    /// Resize observer callback.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.state.resize(width, height);
        self.frame_loop.request_redraw();
    }

    pub fn set_pointer(&mut self, pointer: Option<[f32; 2]>) {
        self.state.set_pointer(pointer);
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Advances one frame and returns the quads to draw, or `None` when the
    /// loop is suspended and nothing asked for a redraw.
    pub fn tick(&mut self, dt: f32) -> Option<Vec<MarqueeInstance>> {
        if !self.frame_loop.take_frame() {
            return None;
        }
        self.state.tick(dt);
        Some(self.state.instances())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::resources::CountingSink;
    use crate::renderer::texture::DecodedImage;
    use crate::scene::{ListConfig, ListItem, ListLayout, RenderPolicy, RendererKind, ShapeKind};

    fn node() -> SceneObject {
        let list = ListConfig {
            list_layout: ListLayout::Marquee,
            item_width: 100.0,
            item_height: 60.0,
            gap: 10.0,
            render_policy: RenderPolicy {
                renderer: RendererKind::Webgl,
                ..RenderPolicy::default()
            },
            list_items: ["a", "b", "a"]
                .iter()
                .enumerate()
                .map(|(i, img)| ListItem {
                    id: Some(format!("i{i}")),
                    media_url: Some(format!("/img/{img}.png")),
                    ..ListItem::default()
                })
                .collect(),
            ..ListConfig::default()
        };
        let mut node = SceneObject::new("logos", ShapeKind::List(list));
        node.transform.frame_width = 500.0;
        node.transform.frame_height = 120.0;
        node
    }

    #[test]
    fn offscreen_track_stops_and_drop_releases_the_loop() {
        let sink = CountingSink::new();
        let mut track = MarqueeTrack::new(&node(), sink.clone()).unwrap();
        assert!(track.is_running());
        assert!(track.tick(1.0 / 60.0).is_some());

        track.set_visible(false);
        assert!(!track.is_running());
        assert_eq!(sink.live_loops(), 0);
        assert!(track.tick(1.0 / 60.0).is_none());

        track.set_visible(true);
        assert_eq!(sink.live_loops(), 1);
        drop(track);
        assert_eq!(sink.live_loops(), 0);
    }

    #[test]
    fn shared_urls_are_requested_once_and_fill_every_slot() {
        let sink = CountingSink::new();
        let mut track = MarqueeTrack::new(&node(), sink).unwrap();
        assert_eq!(track.texture_urls(), vec!["/img/a.png", "/img/b.png"]);

        let changed = track.apply_textures(vec![LoadedTexture {
            url: "/img/a.png".to_string(),
            result: Ok(DecodedImage {
                width: 2,
                height: 2,
                rgba: vec![0; 16],
            }),
        }]);
        assert_eq!(changed, 2);
        let loaded: Vec<bool> = track.texture_slots().iter().map(|s| !s.is_placeholder()).collect();
        assert_eq!(loaded, vec![true, false, true]);
    }

    #[test]
    fn resize_changes_the_drawn_coverage() {
        let sink = CountingSink::new();
        let mut track = MarqueeTrack::new(&node(), sink).unwrap();
        let narrow = track.tick(0.0).unwrap().len();
        track.resize(2000.0, 120.0);
        let wide = track.tick(0.0).unwrap().len();
        assert!(wide > narrow);
    }
}
