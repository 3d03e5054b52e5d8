//! Animated parameters: the atomic value type every scene field animates through.

use serde::{Deserialize, Serialize};

/// A scalar that may interpolate linearly with section progress.
///
/// `value` is the value at progress 0. `end_value` can be staged without
/// enabling interpolation; it only takes effect once `is_linked` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawParam", rename_all = "camelCase")]
pub struct AnimatedParam {
    pub value: f32,
    pub end_value: Option<f32>,
    pub is_linked: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParam {
    Fixed(f32),
    Full {
        value: f32,
        #[serde(default, rename = "endValue")]
        end_value: Option<f32>,
        #[serde(default, rename = "isLinked")]
        is_linked: bool,
    },
}

impl From<RawParam> for AnimatedParam {
    fn from(raw: RawParam) -> Self {
        match raw {
            RawParam::Fixed(value) => Self::fixed(value),
            RawParam::Full {
                value,
                end_value,
                is_linked,
            } => Self {
                value,
                end_value,
                is_linked,
            },
        }
    }
}

impl Default for AnimatedParam {
    fn default() -> Self {
        Self::fixed(0.0)
    }
}

impl From<f32> for AnimatedParam {
    fn from(value: f32) -> Self {
        Self::fixed(value)
    }
}

impl AnimatedParam {
    pub const fn fixed(value: f32) -> Self {
        Self {
            value,
            end_value: None,
            is_linked: false,
        }
    }

    pub const fn linked(value: f32, end_value: f32) -> Self {
        Self {
            value,
            end_value: Some(end_value),
            is_linked: true,
        }
    }

    /// Effective value at `progress`. Progress outside [0, 1] extrapolates.
    pub fn resolve(&self, progress: f32) -> f32 {
        match (self.is_linked, self.end_value) {
            (true, Some(end)) => self.value + (end - self.value) * progress,
            _ => self.value,
        }
    }

    /// Stage an end value without touching the link flag.
    pub fn with_end(mut self, end_value: f32) -> Self {
        self.end_value = Some(end_value);
        self
    }

    pub fn is_animated(&self) -> bool {
        self.is_linked && self.end_value.is_some_and(|e| e != self.value)
    }
}

/// Free-function form used by renderers that only hold a reference.
pub fn resolve(param: &AnimatedParam, progress: f32) -> f32 {
    param.resolve(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unlinked_end_value_is_inert() {
        let p = AnimatedParam::fixed(2.0).with_end(10.0);
        assert_eq!(p.resolve(0.0), 2.0);
        assert_eq!(p.resolve(0.5), 2.0);
        assert_eq!(p.resolve(1.0), 2.0);
        assert!(!p.is_animated());
    }

    #[test]
    fn linked_param_extrapolates_outside_unit_range() {
        let p = AnimatedParam::linked(0.0, 10.0);
        assert_eq!(p.resolve(1.5), 15.0);
        assert_eq!(p.resolve(-0.5), -5.0);
    }

    #[test]
    fn deserializes_bare_number_and_full_object() {
        let bare: AnimatedParam = serde_json::from_str("1.5").unwrap();
        assert_eq!(bare, AnimatedParam::fixed(1.5));

        let full: AnimatedParam =
            serde_json::from_str(r#"{"value": 1, "endValue": 3, "isLinked": true}"#).unwrap();
        assert_eq!(full, AnimatedParam::linked(1.0, 3.0));

        let staged: AnimatedParam =
            serde_json::from_str(r#"{"value": 1, "endValue": 3}"#).unwrap();
        assert!(!staged.is_linked);
        assert_eq!(staged.end_value, Some(3.0));
    }

    #[test]
    fn serializes_as_full_object() {
        let json = serde_json::to_value(AnimatedParam::linked(1.0, 2.0)).unwrap();
        assert_eq!(json["value"], 1.0);
        assert_eq!(json["endValue"], 2.0);
        assert_eq!(json["isLinked"], true);
    }

    proptest! {
        #[test]
        fn unlinked_resolves_to_value(v in -1.0e4f32..1.0e4, e in -1.0e4f32..1.0e4, x in -10.0f32..10.0) {
            let p = AnimatedParam { value: v, end_value: Some(e), is_linked: false };
            prop_assert_eq!(p.resolve(x), v);
        }

        #[test]
        fn linked_hits_endpoints_and_is_monotonic(v in -1.0e3f32..1.0e3, e in -1.0e3f32..1.0e3, a in 0.0f32..1.0, b in 0.0f32..1.0) {
            let p = AnimatedParam::linked(v, e);
            prop_assert_eq!(p.resolve(0.0), v);
            prop_assert!((p.resolve(1.0) - e).abs() <= 1e-3);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            if e >= v {
                prop_assert!(p.resolve(lo) <= p.resolve(hi) + 1e-3);
            } else {
                prop_assert!(p.resolve(lo) + 1e-3 >= p.resolve(hi));
            }
        }
    }
}
