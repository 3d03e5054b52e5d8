use anyhow::{Result, bail};

fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Straight-alpha colour with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn with_rgb(self, [r, g, b]: [f32; 3]) -> Self {
        Self { r, g, b, a: self.a }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |x: f32| (clamp01(x) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// `#rrggbb`, or `#rrggbbaa` when not opaque.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex(s: &str) -> Result<Rgba> {
    let Some(hex) = s.trim().strip_prefix('#') else {
        bail!("colour '{s}' must start with '#'");
    };
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("colour '{s}' has non-hex digits");
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    let [r, g, b, a] = match hex.len() {
        3 => [nibble(0)?, nibble(1)?, nibble(2)?, 255],
        4 => [nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?],
        6 => [byte(0)?, byte(2)?, byte(4)?, 255],
        8 => [byte(0)?, byte(2)?, byte(4)?, byte(6)?],
        n => bail!("colour '{s}' has {n} hex digits"),
    };
    let f = |v: u8| f32::from(v) / 255.0;
    Ok(Rgba::new(f(r), f(g), f(b), f(a)))
}

/// Like [`parse_hex`], but falls back to `fallback` and logs.
pub fn parse_hex_or(s: &str, fallback: Rgba) -> Rgba {
    parse_hex(s).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "using fallback colour");
        fallback
    })
}

/// Hue rotation as a 3x3 matrix (row-major), using the luminance-preserving
/// coefficients of the CSS `hue-rotate()` filter.
// https://www.w3.org/TR/filter-effects-1/#feColorMatrixElement
pub fn hue_rotation_matrix(degrees: f32) -> [[f32; 3]; 3] {
    let (s, c) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + c * 0.787 - s * 0.213,
            0.715 - c * 0.715 - s * 0.715,
            0.072 - c * 0.072 + s * 0.928,
        ],
        [
            0.213 - c * 0.213 + s * 0.143,
            0.715 + c * 0.285 + s * 0.140,
            0.072 - c * 0.072 - s * 0.283,
        ],
        [
            0.213 - c * 0.213 - s * 0.787,
            0.715 - c * 0.715 + s * 0.715,
            0.072 + c * 0.928 + s * 0.072,
        ],
    ]
}

pub fn hue_rotate([r, g, b]: [f32; 3], degrees: f32) -> [f32; 3] {
    let m = hue_rotation_matrix(degrees);
    [
        m[0][0] * r + m[0][1] * g + m[0][2] * b,
        m[1][0] * r + m[1][1] * g + m[1][2] * b,
        m[2][0] * r + m[2][1] * g + m[2][2] * b,
    ]
}

/// Rec. 709 luma.
pub fn luminance([r, g, b]: [f32; 3]) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// `amount` 0 is greyscale, 1 is unchanged, above 1 oversaturates.
pub fn saturate(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    let l = luminance(rgb);
    rgb.map(|c| l + (c - l) * amount)
}

/// Mix towards greyscale; `amount` 1 is fully grey.
pub fn grayscale(rgb: [f32; 3], amount: f32) -> [f32; 3] {
    saturate(rgb, 1.0 - clamp01(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn parses_every_hex_form() {
        assert_eq!(parse_hex("#fff").unwrap(), Rgba::WHITE);
        assert_eq!(parse_hex("#ff000080").unwrap().to_rgba8(), [255, 0, 0, 128]);
        assert_eq!(parse_hex("#7c5cff").unwrap().to_hex(), "#7c5cff");
        assert_eq!(parse_hex("#0000").unwrap().a, 0.0);
        assert!(parse_hex("7c5cff").is_err());
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#zzzzzz").is_err());
    }

    #[test]
    fn zero_hue_rotation_is_identity() {
        let rgb = [0.2, 0.5, 0.9];
        assert!(close(hue_rotate(rgb, 0.0), rgb));
        assert!(close(hue_rotate(rgb, 360.0), rgb));
    }

    #[test]
    fn hue_rotation_keeps_greys() {
        let grey = [0.4, 0.4, 0.4];
        assert!(close(hue_rotate(grey, 137.0), grey));
    }

    #[test]
    fn saturation_extremes() {
        let rgb = [1.0, 0.0, 0.0];
        let l = luminance(rgb);
        assert!(close(saturate(rgb, 0.0), [l, l, l]));
        assert!(close(saturate(rgb, 1.0), rgb));
        assert!(close(grayscale(rgb, 1.0), [l, l, l]));
    }
}
