//! One raymarched canvas per GPU-capable scene node.
//!
//! [`RaymarchNode`] holds everything that changes per frame (clock, motion,
//! loop state, the plane texture) and produces a uniform block per tick.
//! [`gpu::RaymarchCanvas`] owns the wgpu objects and is the only part that
//! needs a device.

pub mod frame_loop;
pub mod gpu;
pub mod motion;
pub mod texture_fit;
pub mod uniforms;
pub mod wgsl;

use std::sync::Arc;

use anyhow::{Result, bail};

use crate::color::{Rgba, hue_rotation_matrix, parse_hex_or};
use crate::renderer::resources::ResourceSink;
use crate::renderer::texture::{DecodedImage, TextureSlot};
use crate::scene::{AnimationMode, PrimitiveConfig, SceneObject, SdfShape, ShapeKind, StormConfig};

use frame_loop::FrameLoop;
use motion::{MotionState, euler_matrix, mode_id};
use texture_fit::{UvRect, fit_uv};
use uniforms::{RaymarchUniforms, columns};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaymarchProgram {
    Primitive(SdfShape),
    Storm,
}

impl RaymarchProgram {
    pub fn for_kind(kind: &ShapeKind) -> Option<Self> {
        match kind {
            ShapeKind::Storm(_) => Some(RaymarchProgram::Storm),
            other => other.primitive().map(|(shape, _)| RaymarchProgram::Primitive(shape)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RaymarchProgram::Primitive(shape) => shape.as_str(),
            RaymarchProgram::Storm => "storm",
        }
    }

    pub fn wgsl(self) -> String {
        match self {
            RaymarchProgram::Primitive(shape) => wgsl::primitive_wgsl(shape),
            RaymarchProgram::Storm => wgsl::storm_wgsl(),
        }
    }

    pub fn samples_texture(self) -> bool {
        self == RaymarchProgram::Primitive(SdfShape::Plane)
    }
}

#[derive(Debug)]
pub struct RaymarchNode {
    node: SceneObject,
    program: RaymarchProgram,
    motion: MotionState,
    frame_loop: FrameLoop,
    texture: Option<TextureSlot>,
    time: f32,
    size: [f32; 2],
}

impl RaymarchNode {
    /// Mounts `node`. Its children are not part of this canvas.
    pub fn new(node: &SceneObject, sink: Arc<dyn ResourceSink>) -> Result<Self> {
        let Some(program) = RaymarchProgram::for_kind(&node.kind) else {
            bail!("node '{}' ({}) is not raymarched", node.id, node.shape_name());
        };
        let (mode, suspend) = match &node.kind {
            ShapeKind::Storm(storm) => (AnimationMode::Static, storm.suspend_when_offscreen),
            kind => match kind.primitive() {
                Some((_, p)) => (p.animation_mode, p.suspend_when_offscreen),
                None => (AnimationMode::Static, true),
            },
        };
        let texture = match &node.kind {
            ShapeKind::Plane(plane) if !plane.image_url.is_empty() => {
                Some(TextureSlot::placeholder(plane.image_url.clone()))
            }
            _ => None,
        };
        let mut own = node.clone();
        own.children.clear();
        Ok(Self {
            motion: MotionState::new(&node.id, mode),
            frame_loop: FrameLoop::new(node.id.clone(), sink, suspend),
            size: [node.transform.frame_width.max(1.0), node.transform.frame_height.max(1.0)],
            node: own,
            program,
            texture,
            time: 0.0,
        })
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn node(&self) -> &SceneObject {
        &self.node
    }

    pub fn program(&self) -> RaymarchProgram {
        self.program
    }

    pub fn wgsl(&self) -> String {
        self.program.wgsl()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn size(&self) -> [f32; 2] {
        self.size
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn texture(&self) -> Option<&TextureSlot> {
        self.texture.as_ref()
    }

    pub fn texture_slot_mut(&mut self) -> Option<&mut TextureSlot> {
        self.texture.as_mut()
    }

    /// Swaps the placeholder for decoded pixels and asks for one redraw, so
    /// an idle node still shows the image.
    pub fn apply_texture(&mut self, image: DecodedImage) {
        if let Some(slot) = self.texture.as_mut() {
            tracing::debug!(node = %self.node.id, url = %slot.url, "texture swapped in");
            slot.swap_in(image);
            self.frame_loop.request_redraw();
        }
    }

    /// Call after the host swapped pixels into [`Self::texture_slot_mut`] directly.
    pub fn texture_changed(&mut self) {
        self.frame_loop.request_redraw();
    }

    /// Pointer normalised to -1..1 over the canvas, `None` once it leaves.
    pub fn set_pointer(&mut self, pointer: Option<[f32; 2]>) {
        if self.motion.mode != AnimationMode::Hover {
            return;
        }
        let range = self.primitive().map_or(0.0, |p| p.hover_range);
        self.motion.set_pointer(pointer, range);
        self.frame_loop.set_idle(false);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.frame_loop.set_visible(visible);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = [width.max(1.0), height.max(1.0)];
        self.frame_loop.request_redraw();
    }

    /// Advances the clock by `dt` seconds and returns the uniforms to draw,
    /// or `None` when this frame should be skipped.
    pub fn tick(&mut self, dt: f32, progress: f32) -> Option<RaymarchUniforms> {
        if !self.frame_loop.take_frame() {
            return None;
        }
        self.time += dt.max(0.0);
        self.advance(dt, progress);
        Some(self.uniforms(progress))
    }

    /// Uniforms at an absolute time, ignoring the frame loop. Used for
    /// offscreen renders.
    pub fn uniforms_at(&mut self, time: f32, progress: f32) -> RaymarchUniforms {
        self.time = time.max(0.0);
        self.advance(0.0, progress);
        self.uniforms(progress)
    }

    fn primitive(&self) -> Option<&PrimitiveConfig> {
        self.node.kind.primitive().map(|(_, p)| p)
    }

    fn aspect(&self) -> f32 {
        self.size[0] / self.size[1]
    }

    fn advance(&mut self, dt: f32, progress: f32) {
        let aspect = self.aspect();
        let time = self.time;
        let wants_frames = match self.node.kind.primitive() {
            Some((_, config)) => {
                self.motion.step(dt, time, config, aspect);
                self.motion.wants_frames(config.noise.resolve(progress))
            }
            None => true,
        };
        self.frame_loop.set_idle(!wants_frames);
    }

    pub fn uniforms(&self, progress: f32) -> RaymarchUniforms {
        match &self.node.kind {
            ShapeKind::Storm(storm) => self.storm_uniforms(storm, progress),
            kind => match kind.primitive() {
                Some((_, config)) => self.primitive_uniforms(config, progress),
                None => RaymarchUniforms::default(),
            },
        }
    }

    fn primitive_uniforms(&self, p: &PrimitiveConfig, progress: f32) -> RaymarchUniforms {
        let t = &self.node.transform;
        let color = parse_hex_or(&p.color, Rgba::WHITE);
        let (corner_radius, uv_rect, ready) = match (&self.node.kind, &self.texture) {
            (ShapeKind::Plane(plane), Some(slot)) if !slot.is_placeholder() => (
                plane.corner_radius,
                fit_uv(plane.image_fit, self.size, slot.image.size()),
                1.0,
            ),
            (ShapeKind::Plane(plane), _) => (plane.corner_radius, UvRect::IDENTITY, 0.0),
            _ => (0.0, UvRect::IDENTITY, 0.0),
        };
        RaymarchUniforms {
            resolution_time: [self.size[0], self.size[1], self.time, progress],
            color: [color.r, color.g, color.b, color.a * t.opacity.resolve(progress).clamp(0.0, 1.0)],
            shape: [
                p.height.resolve(progress),
                p.base_width.resolve(progress),
                t.scale.resolve(progress),
                p.color_frequency.resolve(progress),
            ],
            look: [
                p.glow.resolve(progress),
                p.bloom.resolve(progress),
                p.noise.resolve(progress),
                p.saturation.resolve(progress),
            ],
            rot: columns(self.motion.rotation(self.time, p, progress)),
            hue: columns(hue_rotation_matrix(p.hue_rotation.resolve(progress))),
            motion: [self.motion.marquee_offset(), p.rotate_speed, mode_id(p.animation_mode), corner_radius],
            uv_rect: uv_rect.to_array(),
            flash: [0.0; 4],
            storm: [0.0, 0.0, 0.0, ready],
        }
    }

    fn storm_uniforms(&self, s: &StormConfig, progress: f32) -> RaymarchUniforms {
        let t = &self.node.transform;
        let color = parse_hex_or(&s.color, Rgba::WHITE);
        let flash = parse_hex_or(&s.flash_color, Rgba::WHITE);
        RaymarchUniforms {
            resolution_time: [self.size[0], self.size[1], self.time, progress],
            color: [color.r, color.g, color.b, color.a * t.opacity.resolve(progress).clamp(0.0, 1.0)],
            shape: [1.0, 1.0, t.scale.resolve(progress), 1.0],
            look: [1.0, 0.0, s.noise.resolve(progress), s.saturation.resolve(progress)],
            rot: columns(euler_matrix(0.0, 0.0, 0.0)),
            hue: columns(hue_rotation_matrix(s.hue_rotation.resolve(progress))),
            motion: [0.0, 0.0, mode_id(AnimationMode::Static), 0.0],
            uv_rect: UvRect::IDENTITY.to_array(),
            flash: [flash.r, flash.g, flash.b, s.flash_intensity.resolve(progress)],
            storm: [
                s.density.resolve(progress).clamp(0.0, 1.0),
                s.speed,
                s.flash_frequency,
                0.0,
            ],
        }
    }
}
