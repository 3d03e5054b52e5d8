//! Image fitting for the textured plane, shared by placement and the
//! per-fragment UV lookup.

use crate::scene::ImageFit;

/// Maps destination UV (0..1) to texture UV: `tex = dst * scale + offset`.
/// Texture UVs outside 0..1 are transparent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub offset: [f32; 2],
    pub scale: [f32; 2],
}

impl UvRect {
    pub const IDENTITY: UvRect = UvRect {
        offset: [0.0, 0.0],
        scale: [1.0, 1.0],
    };

    pub fn apply(&self, uv: [f32; 2]) -> [f32; 2] {
        [
            uv[0] * self.scale[0] + self.offset[0],
            uv[1] * self.scale[1] + self.offset[1],
        ]
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.offset[0], self.offset[1], self.scale[0], self.scale[1]]
    }
}

fn centered(scale: [f32; 2]) -> UvRect {
    UvRect {
        offset: [0.5 - scale[0] * 0.5, 0.5 - scale[1] * 0.5],
        scale,
    }
}

/// UV mapping for a texture of `tex` pixels drawn into `dst` pixels.
pub fn fit_uv(fit: ImageFit, dst: [f32; 2], tex: [f32; 2]) -> UvRect {
    let dst_aspect = (dst[0] / dst[1].max(0.0001)).max(0.0001);
    let tex_aspect = (tex[0] / tex[1].max(0.0001)).max(0.0001);
    match fit {
        // Crop the longer texture axis.
        ImageFit::Cover => {
            if dst_aspect > tex_aspect {
                centered([1.0, tex_aspect / dst_aspect])
            } else {
                centered([dst_aspect / tex_aspect, 1.0])
            }
        }
        // Letterbox: UVs beyond 0..1 fall outside the image.
        ImageFit::Contain => {
            if dst_aspect > tex_aspect {
                centered([dst_aspect / tex_aspect, 1.0])
            } else {
                centered([1.0, tex_aspect / dst_aspect])
            }
        }
        // One texel per pixel, centred.
        ImageFit::Native => centered([
            dst[0] / tex[0].max(1.0),
            dst[1] / tex[1].max(1.0),
        ]),
    }
}

/// Where the image lands inside the container, as `[x, y, w, h]` pixels.
pub fn placement_rect(fit: ImageFit, dst: [f32; 2], tex: [f32; 2]) -> [f32; 4] {
    let uv = fit_uv(fit, dst, tex);
    let w = dst[0] / uv.scale[0];
    let h = dst[1] / uv.scale[1];
    [(dst[0] - w) * 0.5, (dst[1] - h) * 0.5, w, h]
}
