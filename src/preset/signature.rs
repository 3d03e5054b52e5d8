use serde::{Deserialize, Serialize};

use crate::binding::{Binding, Cardinality, Target};

/// Binding shape a preset declares itself compatible with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Signature {
    #[serde(rename = "self")]
    SelfSubject,
    #[serde(rename_all = "camelCase")]
    Related {
        target: Target,
        cardinality: Cardinality,
        /// `None` matches any relation key on the binding.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relation_key: Option<String>,
    },
    /// Accepts every binding. Reserved for the generic fallback preset.
    Any,
}

impl Signature {
    pub fn accepts(&self, binding: &Binding) -> bool {
        matches(binding, self)
    }

    pub fn describe(&self) -> String {
        match self {
            Signature::SelfSubject => "self".to_string(),
            Signature::Related {
                target,
                cardinality,
                relation_key: Some(key),
            } => format!("related {target}/{} ({key})", cardinality.as_str()),
            Signature::Related {
                target, cardinality, ..
            } => format!("related {target}/{}", cardinality.as_str()),
            Signature::Any => "any".to_string(),
        }
    }
}

pub fn matches(binding: &Binding, signature: &Signature) -> bool {
    match (binding, signature) {
        (_, Signature::Any) => true,
        (Binding::SelfSubject, Signature::SelfSubject) => true,
        (
            Binding::Related {
                target,
                cardinality,
                relation_key,
                ..
            },
            Signature::Related {
                target: sig_target,
                cardinality: sig_cardinality,
                relation_key: sig_key,
            },
        ) => {
            target == sig_target
                && cardinality == sig_cardinality
                && sig_key
                    .as_ref()
                    .is_none_or(|k| relation_key.as_deref() == Some(k.as_str()))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn related(target: Target, cardinality: Cardinality, key: Option<&str>) -> Binding {
        Binding::Related {
            target,
            cardinality,
            relation_key: key.map(str::to_string),
            scope: None,
        }
    }

    fn sig(target: Target, cardinality: Cardinality, key: Option<&str>) -> Signature {
        Signature::Related {
            target,
            cardinality,
            relation_key: key.map(str::to_string),
        }
    }

    #[test]
    fn self_only_matches_self() {
        assert!(matches(&Binding::SelfSubject, &Signature::SelfSubject));
        assert!(!matches(
            &Binding::SelfSubject,
            &sig(Target::Product, Cardinality::Many, None)
        ));
        assert!(!matches(
            &related(Target::Product, Cardinality::Many, None),
            &Signature::SelfSubject
        ));
    }

    #[test]
    fn unspecified_relation_key_is_a_wildcard() {
        let s = sig(Target::Feature, Cardinality::Many, None);
        assert!(matches(&related(Target::Feature, Cardinality::Many, None), &s));
        assert!(matches(
            &related(Target::Feature, Cardinality::Many, Some("featured")),
            &s
        ));
    }

    #[test]
    fn specified_relation_key_must_be_equal() {
        let s = sig(Target::Feature, Cardinality::Many, Some("featured"));
        assert!(matches(
            &related(Target::Feature, Cardinality::Many, Some("featured")),
            &s
        ));
        assert!(!matches(&related(Target::Feature, Cardinality::Many, None), &s));
        assert!(!matches(
            &related(Target::Feature, Cardinality::Many, Some("other")),
            &s
        ));
    }

    #[test]
    fn target_and_cardinality_must_agree() {
        let s = sig(Target::Product, Cardinality::Many, None);
        assert!(!matches(&related(Target::Product, Cardinality::One, None), &s));
        assert!(!matches(&related(Target::Feature, Cardinality::Many, None), &s));
    }

    #[test]
    fn any_accepts_everything() {
        assert!(Signature::Any.accepts(&Binding::SelfSubject));
        assert!(Signature::Any.accepts(&related(Target::Brand, Cardinality::One, None)));
    }

    #[test]
    fn parses_from_json() {
        let s: Signature = serde_json::from_str(
            r#"{"kind": "related", "target": "feature", "cardinality": "many", "relationKey": "featured"}"#,
        )
        .unwrap();
        assert_eq!(s, sig(Target::Feature, Cardinality::Many, Some("featured")));
        assert_eq!(s.describe(), "related feature/many (featured)");
        let any: Signature = serde_json::from_str(r#"{"kind": "any"}"#).unwrap();
        assert_eq!(any, Signature::Any);
    }
}
