use bytemuck::{Pod, Zeroable};

/// Mirrors `Params` in the generated WGSL. Everything is a vec4 so the
/// std140-style layout needs no padding fields.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct RaymarchUniforms {
    /// width, height, time (s), progress
    pub resolution_time: [f32; 4],
    /// rgb, opacity
    pub color: [f32; 4],
    /// height, base width, scale, colour frequency
    pub shape: [f32; 4],
    /// glow, bloom, noise, saturation
    pub look: [f32; 4],
    /// Object rotation, column-major.
    pub rot: [[f32; 4]; 3],
    /// Hue rotation, column-major.
    pub hue: [[f32; 4]; 3],
    /// marquee offset, rotate speed, animation mode id, plane corner radius
    pub motion: [f32; 4],
    /// texture uv offset.xy, uv scale.xy
    pub uv_rect: [f32; 4],
    /// storm flash rgb, flash intensity
    pub flash: [f32; 4],
    /// storm density, storm speed, flash frequency, texture ready flag
    pub storm: [f32; 4],
}

pub const UNIFORM_SIZE: u64 = std::mem::size_of::<RaymarchUniforms>() as u64;

/// Row-major 3x3 into three padded columns.
pub fn columns(m: [[f32; 3]; 3]) -> [[f32; 4]; 3] {
    [
        [m[0][0], m[1][0], m[2][0], 0.0],
        [m[0][1], m[1][1], m[2][1], 0.0],
        [m[0][2], m[1][2], m[2][2], 0.0],
    ]
}
