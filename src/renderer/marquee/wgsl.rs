//! Instanced rounded-rectangle program for the marquee track.

/// Item images live in one texture array, one layer per item.
pub const MARQUEE_WGSL: &str = r#"
struct Track {
    // width, height, unused, unused
    resolution: vec4<f32>,
    border_color: vec4<f32>,
    // colour drawn while an item has no image yet
    fill: vec4<f32>,
};

@group(0) @binding(0) var<uniform> track: Track;
@group(0) @binding(1) var item_tex: texture_2d_array<f32>;
@group(0) @binding(2) var item_sampler: sampler;

struct InstanceIn {
    // x, y, width, height in pixels
    @location(0) rect: vec4<f32>,
    // top-left, top-right, bottom-right, bottom-left
    @location(1) radii: vec4<f32>,
    // scale, grayscale, border width, texture layer (negative: none)
    @location(2) style: vec4<f32>,
};

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) half_size: vec2<f32>,
    @location(2) radii: vec4<f32>,
    @location(3) style: vec4<f32>,
    @location(4) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32, inst: InstanceIn) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let c = corners[vertex_index];
    let scale = inst.style.x;
    let center = inst.rect.xy + inst.rect.zw * 0.5;
    let half_size = inst.rect.zw * 0.5 * scale;
    let offset = (c * 2.0 - vec2<f32>(1.0, 1.0)) * half_size;
    let px = center + offset;

    var out: VsOut;
    out.position = vec4<f32>(
        px.x / track.resolution.x * 2.0 - 1.0,
        1.0 - px.y / track.resolution.y * 2.0,
        0.0,
        1.0,
    );
    out.local = offset;
    out.half_size = half_size;
    out.radii = inst.radii * scale;
    out.style = inst.style;
    out.uv = c;
    return out;
}

// Rounded box with one radius per corner; y grows downward.
fn sd_rounded_box(p: vec2<f32>, b: vec2<f32>, r4: vec4<f32>) -> f32 {
    let pair = select(vec2<f32>(r4.w, r4.z), vec2<f32>(r4.x, r4.y), p.y < 0.0);
    let r = select(pair.x, pair.y, p.x > 0.0);
    let q = abs(p) - b + vec2<f32>(r, r);
    return min(max(q.x, q.y), 0.0) + length(max(q, vec2<f32>(0.0, 0.0))) - r;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let d = sd_rounded_box(in.local, in.half_size, in.radii);
    let coverage = clamp(0.5 - d, 0.0, 1.0);
    if (coverage <= 0.0) {
        discard;
    }

    var col = track.fill;
    if (in.style.w >= 0.0) {
        col = textureSampleLevel(item_tex, item_sampler, in.uv, i32(in.style.w), 0.0);
    }
    let luma = dot(col.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
    var rgb = mix(col.rgb, vec3<f32>(luma, luma, luma), in.style.y);

    // Inner stroke: the band between the edge and `border` pixels inside it.
    let border = in.style.z;
    if (border > 0.0) {
        let inner = clamp(0.5 - (d + border), 0.0, 1.0);
        rgb = mix(rgb, track.border_color.rgb, (1.0 - inner) * track.border_color.a);
    }

    let a = coverage * max(col.a, select(0.0, track.border_color.a, border > 0.0));
    return vec4<f32>(rgb * a, a);
}
"#;
