//! Per-node rotation state for the four raymarch animation modes, plus the
//! horizontal scroll used by `marquee` mode.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::scene::{AnimationMode, PrimitiveConfig};

/// Below this many degrees of remaining travel, hover motion counts as settled.
pub const SETTLE_EPSILON_DEG: f32 = 0.01;

/// Row-major rotation for Euler angles in degrees, applied X then Y then Z.
pub fn euler_matrix(x_deg: f32, y_deg: f32, z_deg: f32) -> [[f32; 3]; 3] {
    let (sx, cx) = x_deg.to_radians().sin_cos();
    let (sy, cy) = y_deg.to_radians().sin_cos();
    let (sz, cz) = z_deg.to_radians().sin_cos();
    [
        [cz * cy, cz * sy * sx - sz * cx, cz * sy * cx + sz * sx],
        [sz * cy, sz * sy * sx + cz * cx, sz * sy * cx - cz * sx],
        [-sy, cy * sx, cy * cx],
    ]
}

/// Per-axis oscillation drawn once per instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillation {
    pub freq: [f32; 3],
    pub phase: [f32; 3],
    pub amp_deg: [f32; 3],
}

impl Oscillation {
    pub fn seeded(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut draw = |lo: f32, hi: f32| [rng.random_range(lo..hi), rng.random_range(lo..hi), rng.random_range(lo..hi)];
        let freq = draw(0.15, 0.45);
        let phase = draw(0.0, std::f32::consts::TAU);
        let amp_deg = draw(20.0, 50.0);
        Self { freq, phase, amp_deg }
    }

    pub fn angles(&self, time: f32) -> [f32; 3] {
        std::array::from_fn(|i| {
            self.amp_deg[i] * (time * self.freq[i] * std::f32::consts::TAU + self.phase[i]).sin()
        })
    }
}

/// FNV-1a, so the seed depends only on the node id.
pub fn id_seed(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[derive(Debug, Clone)]
pub struct MotionState {
    pub mode: AnimationMode,
    yaw: f32,
    pitch: f32,
    target_yaw: f32,
    target_pitch: f32,
    oscillation: Oscillation,
    marquee_offset: f32,
}

impl MotionState {
    pub fn new(node_id: &str, mode: AnimationMode) -> Self {
        Self {
            mode,
            yaw: 0.0,
            pitch: 0.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            oscillation: Oscillation::seeded(id_seed(node_id)),
            marquee_offset: 0.0,
        }
    }

    pub fn oscillation(&self) -> &Oscillation {
        &self.oscillation
    }

    /// Pointer position normalised to -1..1 across the container, or `None`
    /// when it left. Only hover mode reacts.
    pub fn set_pointer(&mut self, pointer: Option<[f32; 2]>, range_deg: f32) {
        let [x, y] = pointer.unwrap_or([0.0, 0.0]);
        self.target_yaw = x.clamp(-1.0, 1.0) * range_deg;
        self.target_pitch = -y.clamp(-1.0, 1.0) * range_deg;
    }

    /// Advance by `dt` seconds. `aspect` is container width over height.
    pub fn step(&mut self, dt: f32, time: f32, config: &PrimitiveConfig, aspect: f32) {
        match self.mode {
            AnimationMode::Hover => {
                // Exponential approach, frame-rate independent.
                let k = 1.0 - (-config.hover_smoothing.max(0.0) * dt).exp();
                self.yaw += (self.target_yaw - self.yaw) * k;
                self.pitch += (self.target_pitch - self.pitch) * k;
                if self.is_settled() {
                    self.yaw = self.target_yaw;
                    self.pitch = self.target_pitch;
                }
            }
            AnimationMode::Marquee => {
                let span = 2.0 * aspect.max(0.0001) + 2.0;
                let raw = time * config.marquee_speed * config.marquee_direction.sign();
                self.marquee_offset = (raw + span * 0.5).rem_euclid(span) - span * 0.5;
            }
            _ => {}
        }
    }

    pub fn is_settled(&self) -> bool {
        (self.target_yaw - self.yaw).abs() < SETTLE_EPSILON_DEG
            && (self.target_pitch - self.pitch).abs() < SETTLE_EPSILON_DEG
    }

    pub fn yaw_pitch(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    pub fn marquee_offset(&self) -> f32 {
        self.marquee_offset
    }

    /// Rotation handed to the shader. `rotate` mode's wobble is applied in
    /// the shader on top of the static angles.
    pub fn rotation(&self, time: f32, config: &PrimitiveConfig, progress: f32) -> [[f32; 3]; 3] {
        let base = [
            config.rotation_x.resolve(progress),
            config.rotation_y.resolve(progress),
            config.rotation_z.resolve(progress),
        ];
        match self.mode {
            AnimationMode::Static | AnimationMode::Rotate | AnimationMode::Marquee => {
                euler_matrix(base[0], base[1], base[2])
            }
            AnimationMode::Hover => euler_matrix(base[0] + self.pitch, base[1] + self.yaw, base[2]),
            AnimationMode::ThreeDRotate => {
                let osc = self.oscillation.angles(time);
                euler_matrix(base[0] + osc[0], base[1] + osc[1], base[2] + osc[2])
            }
        }
    }

    /// Whether this node needs frames without outside input. Hover mode
    /// stops asking once settled and noise is off.
    pub fn wants_frames(&self, noise: f32) -> bool {
        match self.mode {
            AnimationMode::Hover => !self.is_settled() || noise != 0.0,
            _ => true,
        }
    }
}

/// Shader id of each mode.
pub fn mode_id(mode: AnimationMode) -> f32 {
    match mode {
        AnimationMode::Static => 0.0,
        AnimationMode::Rotate => 1.0,
        AnimationMode::Hover => 2.0,
        AnimationMode::ThreeDRotate => 3.0,
        AnimationMode::Marquee => 4.0,
    }
}
