//! CSS-style corner radius lists.

use anyhow::{Result, anyhow, bail};

/// Per-corner radii in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerRadii {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl CornerRadii {
    pub const fn uniform(r: f32) -> Self {
        Self {
            top_left: r,
            top_right: r,
            bottom_right: r,
            bottom_left: r,
        }
    }

    /// Parses one to four lengths, expanded the way `border-radius` does.
    /// Lengths may carry a `px` suffix.
    pub fn parse(s: &str) -> Result<Self> {
        let values = s
            .split_whitespace()
            .map(parse_length)
            .collect::<Result<Vec<f32>>>()?;
        let r = match values.as_slice() {
            [a] => Self::uniform(*a),
            [a, b] => Self {
                top_left: *a,
                top_right: *b,
                bottom_right: *a,
                bottom_left: *b,
            },
            [a, b, c] => Self {
                top_left: *a,
                top_right: *b,
                bottom_right: *c,
                bottom_left: *b,
            },
            [a, b, c, d] => Self {
                top_left: *a,
                top_right: *b,
                bottom_right: *c,
                bottom_left: *d,
            },
            [] => bail!("empty radius"),
            _ => bail!("radius '{s}' has more than four values"),
        };
        Ok(r)
    }

    pub fn parse_or(s: &str, fallback: CornerRadii) -> Self {
        Self::parse(s).unwrap_or_else(|e| {
            tracing::warn!(radius = s, error = %e, "invalid corner radius; using fallback");
            fallback
        })
    }

    /// Scales radii down so adjacent corners never overlap on a `w` x `h` box.
    pub fn fit(self, w: f32, h: f32) -> Self {
        let limit = 0.5 * w.min(h).max(0.0);
        let c = |r: f32| r.clamp(0.0, limit);
        Self {
            top_left: c(self.top_left),
            top_right: c(self.top_right),
            bottom_right: c(self.bottom_right),
            bottom_left: c(self.bottom_left),
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }
}

fn parse_length(token: &str) -> Result<f32> {
    let number = token.strip_suffix("px").unwrap_or(token);
    let v: f32 = number
        .parse()
        .map_err(|_| anyhow!("invalid radius length '{token}'"))?;
    if !v.is_finite() || v < 0.0 {
        bail!("radius length '{token}' must be a non-negative number");
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_like_border_radius() {
        assert_eq!(CornerRadii::parse("12px").unwrap(), CornerRadii::uniform(12.0));
        assert_eq!(CornerRadii::parse("4 8").unwrap().to_array(), [4.0, 8.0, 4.0, 8.0]);
        assert_eq!(CornerRadii::parse("1px 2px 3px").unwrap().to_array(), [1.0, 2.0, 3.0, 2.0]);
        assert_eq!(
            CornerRadii::parse("24px 24px 8px 8px").unwrap().to_array(),
            [24.0, 24.0, 8.0, 8.0]
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(CornerRadii::parse("").is_err());
        assert!(CornerRadii::parse("1 2 3 4 5").is_err());
        assert!(CornerRadii::parse("2em").is_err());
        assert!(CornerRadii::parse("-3px").is_err());
        assert_eq!(CornerRadii::parse_or("wat", CornerRadii::uniform(6.0)), CornerRadii::uniform(6.0));
    }

    #[test]
    fn fit_clamps_to_half_the_short_side() {
        let r = CornerRadii::parse("80px 10px").unwrap().fit(200.0, 100.0);
        assert_eq!(r.to_array(), [50.0, 10.0, 50.0, 10.0]);
    }
}
