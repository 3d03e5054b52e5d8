//! WGSL for the raymarch canvases.
//!
//! Every program shares the `Params` uniform block and a fullscreen
//! triangle; the fragment stage differs per program. Primitive programs
//! splice a per-shape distance function into one raymarch loop.

use crate::scene::SdfShape;

/// Fixed raymarch step budget.
pub const MAX_STEPS: u32 = 64;

const PRELUDE: &str = r#"
struct Params {
    resolution_time: vec4<f32>,
    color: vec4<f32>,
    shape: vec4<f32>,
    look: vec4<f32>,
    rot0: vec4<f32>,
    rot1: vec4<f32>,
    rot2: vec4<f32>,
    hue0: vec4<f32>,
    hue1: vec4<f32>,
    hue2: vec4<f32>,
    motion: vec4<f32>,
    uv_rect: vec4<f32>,
    flash: vec4<f32>,
    storm: vec4<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VsOut {
    var corners = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    let p = corners[vertex_index];
    var out: VsOut;
    out.position = vec4<f32>(p, 0.0, 1.0);
    out.uv = vec2<f32>(p.x * 0.5 + 0.5, 0.5 - p.y * 0.5);
    return out;
}

fn hash21(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453);
}

// Hue matrix, then saturation, then film grain.
fn grade(col_in: vec3<f32>, uv: vec2<f32>) -> vec3<f32> {
    let hue = mat3x3<f32>(params.hue0.xyz, params.hue1.xyz, params.hue2.xyz);
    var col = hue * col_in;
    let luma = dot(col, vec3<f32>(0.2126, 0.7152, 0.0722));
    col = mix(vec3<f32>(luma), col, params.look.w);
    let seed = uv * params.resolution_time.xy + vec2<f32>(params.resolution_time.z * 61.0, 0.0);
    col = col + vec3<f32>((hash21(seed) - 0.5) * params.look.z);
    return clamp(col, vec3<f32>(0.0), vec3<f32>(1.0));
}
"#;

const SDF_HELPERS: &str = r#"
fn sd_box(p: vec3<f32>, b: vec3<f32>) -> f32 {
    let q = abs(p) - b;
    return length(max(q, vec3<f32>(0.0))) + min(max(q.x, max(q.y, q.z)), 0.0);
}

fn sd_round_box(p: vec3<f32>, b: vec3<f32>, r: f32) -> f32 {
    let q = abs(p) - b + vec3<f32>(r);
    return length(max(q, vec3<f32>(0.0))) + min(max(q.x, max(q.y, q.z)), 0.0) - r;
}

fn aspect() -> f32 {
    return params.resolution_time.x / max(params.resolution_time.y, 1.0);
}

fn plane_half() -> vec2<f32> {
    return vec2<f32>(1.4 * aspect() * params.shape.y, 1.4 * params.shape.x);
}
"#;

const RAYMARCH: &str = r#"
const MAX_STEPS: i32 = __STEPS__;
const MAX_DIST: f32 = 8.0;
const SURFACE: f32 = 0.001;

// World to object space: inverse rotation, uniform scale, and the
// time-driven wobble of `rotate` mode.
fn warp(p_in: vec3<f32>) -> vec3<f32> {
    let rot = mat3x3<f32>(params.rot0.xyz, params.rot1.xyz, params.rot2.xyz);
    var p = (transpose(rot) * p_in) / max(params.shape.z, 0.0001);
    if (params.motion.z == 1.0) {
        let a = params.resolution_time.z * params.motion.y;
        let ca = cos(a);
        let sa = sin(a);
        p = vec3<f32>(ca * p.x + sa * p.z, p.y, -sa * p.x + ca * p.z);
        let b = sin(params.resolution_time.z * 0.7) * 0.35;
        let cb = cos(b);
        let sb = sin(b);
        p = vec3<f32>(p.x, cb * p.y - sb * p.z, sb * p.y + cb * p.z);
    }
    return p;
}

fn scene_sdf(p: vec3<f32>) -> f32 {
    return sd_shape(warp(p)) * max(params.shape.z, 0.0001);
}

fn normal_at(p: vec3<f32>) -> vec3<f32> {
    let e = vec2<f32>(0.001, 0.0);
    return normalize(vec3<f32>(
        scene_sdf(p + e.xyy) - scene_sdf(p - e.xyy),
        scene_sdf(p + e.yxy) - scene_sdf(p - e.yxy),
        scene_sdf(p + e.yyx) - scene_sdf(p - e.yyx),
    ));
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let time = params.resolution_time.z;
    var ndc = vec2<f32>(in.uv.x * 2.0 - 1.0, 1.0 - in.uv.y * 2.0);
    ndc.x = ndc.x * aspect() + params.motion.x;
    let ro = vec3<f32>(0.0, 0.0, 3.0);
    let rd = normalize(vec3<f32>(ndc, -2.0));

    var t = 0.0;
    var glow = 0.0;
    var hit = false;
    for (var i: i32 = 0; i < MAX_STEPS; i = i + 1) {
        let d = scene_sdf(ro + rd * t);
        glow = glow + exp(-max(d, 0.0) * 6.0) / f32(MAX_STEPS);
        if (d < SURFACE) {
            hit = true;
            break;
        }
        t = t + max(d * 0.9, 0.01);
        if (t > MAX_DIST) {
            break;
        }
    }

    let band = vec3<f32>(0.5) + 0.5 * cos(vec3<f32>(0.0, 2.094, 4.188) + vec3<f32>(t * params.shape.w + time * 0.5));
    var col = params.color.rgb * glow * params.look.x * (vec3<f32>(0.6) + 0.4 * band);
    col = col + params.color.rgb * glow * glow * params.look.y;
    var alpha = clamp(glow * params.look.x, 0.0, 1.0);
    if (hit) {
        let surf = surface(ro + rd * t, band);
        col = col + surf.rgb;
        alpha = max(alpha, surf.a);
    }
    col = vec3<f32>(1.0) - exp(-col * 1.4);
    col = grade(col, in.uv);
    let a = alpha * params.color.a;
    return vec4<f32>(col * a, a);
}
"#;

const LIT_SURFACE: &str = r#"
fn surface(p: vec3<f32>, band: vec3<f32>) -> vec4<f32> {
    let n = normal_at(p);
    let lambert = 0.35 + 0.65 * max(dot(n, normalize(vec3<f32>(0.4, 0.7, 0.6))), 0.0);
    return vec4<f32>(params.color.rgb * lambert * (vec3<f32>(0.7) + 0.3 * band), 1.0);
}
"#;

const TEXTURED_SURFACE: &str = r#"
@group(0) @binding(1) var plane_tex: texture_2d<f32>;
@group(0) @binding(2) var plane_sampler: sampler;

fn surface(p: vec3<f32>, band: vec3<f32>) -> vec4<f32> {
    let lp = warp(p);
    let half = plane_half();
    let face_uv = vec2<f32>(lp.x / (2.0 * half.x) + 0.5, 0.5 - lp.y / (2.0 * half.y));
    let tex_uv = face_uv * params.uv_rect.zw + params.uv_rect.xy;
    // Sampled at an explicit level: this runs inside the march loop's
    // non-uniform control flow.
    let texel = textureSampleLevel(plane_tex, plane_sampler, clamp(tex_uv, vec2<f32>(0.0), vec2<f32>(1.0)), 0.0);
    let inside = all(tex_uv >= vec2<f32>(0.0)) && all(tex_uv <= vec2<f32>(1.0));
    if (params.storm.w < 0.5) {
        return vec4<f32>(params.color.rgb * (vec3<f32>(0.7) + 0.3 * band), 1.0);
    }
    if (!inside) {
        return vec4<f32>(0.0);
    }
    return vec4<f32>(texel.rgb, texel.a);
}
"#;

const STORM: &str = r#"
fn vnoise(p: vec2<f32>) -> f32 {
    let cell = floor(p);
    let f = fract(p);
    let u = f * f * (vec2<f32>(3.0) - 2.0 * f);
    let a = hash21(cell);
    let b = hash21(cell + vec2<f32>(1.0, 0.0));
    let c = hash21(cell + vec2<f32>(0.0, 1.0));
    let d = hash21(cell + vec2<f32>(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

fn fbm(p_in: vec2<f32>) -> f32 {
    var p = p_in;
    var amp = 0.5;
    var sum = 0.0;
    for (var i: i32 = 0; i < 5; i = i + 1) {
        sum = sum + amp * vnoise(p);
        p = p * 2.03 + vec2<f32>(1.7, 9.2);
        amp = amp * 0.5;
    }
    return sum;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let time = params.resolution_time.z;
    let ratio = params.resolution_time.x / max(params.resolution_time.y, 1.0);
    let uv = vec2<f32>(in.uv.x * ratio, in.uv.y);
    let drift = time * params.storm.y;
    let n = fbm(uv * 3.0 + vec2<f32>(drift, drift * 0.35));
    let detail = fbm(uv * 7.0 - vec2<f32>(drift * 1.3, 0.0));
    let cloud = smoothstep(1.0 - params.storm.x, 1.0, n * 0.75 + detail * 0.5);

    let beat = floor(time * params.storm.z);
    let strike = step(0.6, hash21(vec2<f32>(beat, 3.7)));
    let fade = 1.0 - fract(time * params.storm.z);
    let lightning = strike * fade * fade * params.flash.w;

    var col = params.color.rgb * (0.35 + 0.65 * cloud) + params.flash.rgb * lightning * cloud;
    col = vec3<f32>(1.0) - exp(-col * 1.6);
    col = grade(col, in.uv);
    let a = clamp(0.25 + cloud * 0.75, 0.0, 1.0) * params.color.a;
    return vec4<f32>(col * a, a);
}
"#;

fn sdf_body(shape: SdfShape) -> &'static str {
    match shape {
        // Anisotropic octahedron: height stretches the vertical axis only.
        SdfShape::Tetrahedron => {
            "    let r = vec3<f32>(0.6 * params.shape.y, 0.9 * params.shape.x, 0.6 * params.shape.y);\n    let q = abs(p) / r;\n    return (q.x + q.y + q.z - 1.0) * 0.57735 * min(r.x, r.y);"
        }
        SdfShape::Cube => {
            "    return sd_box(p, vec3<f32>(0.5 * params.shape.y, 0.5 * params.shape.x, 0.5 * params.shape.y));"
        }
        SdfShape::Sphere => "    return length(p) - 0.6 * params.shape.y;",
        SdfShape::Cylinder => {
            "    let d = abs(vec2<f32>(length(p.xz), p.y)) - vec2<f32>(0.45 * params.shape.y, 0.7 * params.shape.x);\n    return min(max(d.x, d.y), 0.0) + length(max(d, vec2<f32>(0.0)));"
        }
        SdfShape::Torus => {
            "    let q = vec2<f32>(length(p.xz) - 0.6 * params.shape.y, p.y);\n    return length(q) - 0.2 * params.shape.x;"
        }
        SdfShape::Column => "    return length(p.xz) - 0.3 * params.shape.y;",
        SdfShape::Plane => {
            "    let half = plane_half();\n    return sd_round_box(p, vec3<f32>(half.x, half.y, 0.02), params.motion.w);"
        }
    }
}

/// Fragment program for a raymarched primitive.
pub fn primitive_wgsl(shape: SdfShape) -> String {
    let mut src = String::with_capacity(8 * 1024);
    src.push_str(PRELUDE);
    src.push_str(SDF_HELPERS);
    src.push_str("\nfn sd_shape(p: vec3<f32>) -> f32 {\n");
    src.push_str(sdf_body(shape));
    src.push_str("\n}\n");
    src.push_str(&RAYMARCH.replace("__STEPS__", &MAX_STEPS.to_string()));
    src.push_str(if shape == SdfShape::Plane {
        TEXTURED_SURFACE
    } else {
        LIT_SURFACE
    });
    src
}

pub fn storm_wgsl() -> String {
    let mut src = String::with_capacity(4 * 1024);
    src.push_str(PRELUDE);
    src.push_str(STORM);
    src
}
