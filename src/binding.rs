//! Section data bindings and their resolution to records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fixtures::FixtureSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Binding {
    #[serde(rename = "self")]
    SelfSubject,
    #[serde(rename_all = "camelCase")]
    Related {
        target: Target,
        cardinality: Cardinality,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relation_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<Scope>,
    },
}

impl Binding {
    pub fn related(target: Target, cardinality: Cardinality) -> Self {
        Binding::Related {
            target,
            cardinality,
            relation_key: None,
            scope: None,
        }
    }
}

/// Entity kinds a related binding can point at.
///
/// Unrecognised names are kept verbatim so templates authored against newer
/// targets still load; they resolve through the generic stub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    Brand,
    Product,
    Feature,
    Solution,
    UseCase,
    Other(String),
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        match s.as_str() {
            "brand" => Target::Brand,
            "product" => Target::Product,
            "feature" => Target::Feature,
            "solution" => Target::Solution,
            "useCase" => Target::UseCase,
            _ => Target::Other(s),
        }
    }
}

impl From<Target> for String {
    fn from(t: Target) -> Self {
        t.as_str().to_string()
    }
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Target::Brand => "brand",
            Target::Product => "product",
            Target::Feature => "feature",
            Target::Solution => "solution",
            Target::UseCase => "useCase",
            Target::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Target::Other(_))
    }

    /// Human label used when synthesising records.
    pub fn display_name(&self) -> String {
        match self {
            Target::UseCase => "Use case".to_string(),
            other => {
                let s = other.as_str();
                let mut chars = s.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::One => "one",
            Cardinality::Many => "many",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Field name sorted ascending by string comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<BTreeMap<String, String>>,
}

/// A flat content record. Missing fields read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub BTreeMap<String, String>);

impl Record {
    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }
}

/// Describes the page's own subject for `self` bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubjectInfo {
    pub title: String,
    pub description: String,
    pub hero_image: String,
    pub icon: String,
}

/// Number of stub records produced for unknown `many` targets.
pub const GENERIC_STUB_COUNT: usize = 3;

/// Turns binding declarations into records.
///
/// This is the seam where a real content source would replace the fixtures:
/// binding in, record array out.
#[derive(Debug, Clone)]
pub struct BindingResolver<'a> {
    fixtures: &'a FixtureSet,
    subject: SubjectInfo,
}

impl<'a> BindingResolver<'a> {
    pub fn new(fixtures: &'a FixtureSet, subject: SubjectInfo) -> Self {
        Self { fixtures, subject }
    }

    /// Resolver whose `self` record is synthesised from the page subject target.
    pub fn for_target(fixtures: &'a FixtureSet, target: &Target) -> Self {
        let name = target.display_name();
        Self::new(
            fixtures,
            SubjectInfo {
                title: name.clone(),
                description: format!("Everything about this {}.", name.to_lowercase()),
                hero_image: format!("/images/{}/hero.jpg", target.as_str()),
                icon: target.as_str().to_string(),
            },
        )
    }

    pub fn resolve(&self, binding: &Binding) -> Vec<Record> {
        match binding {
            Binding::SelfSubject => vec![self.self_record()],
            Binding::Related {
                target,
                cardinality,
                scope,
                ..
            } => {
                let base = match self.fixtures.records(target) {
                    Some(records) => records.to_vec(),
                    None if *cardinality == Cardinality::Many => generic_stub(target),
                    None => Vec::new(),
                };
                let mut records = match scope {
                    Some(scope) => apply_scope(base, scope),
                    None => base,
                };
                if *cardinality == Cardinality::One {
                    records.truncate(1);
                }
                tracing::debug!(
                    binding_target = %target,
                    cardinality = cardinality.as_str(),
                    count = records.len(),
                    "resolved related binding"
                );
                records
            }
        }
    }

    fn self_record(&self) -> Record {
        Record::default()
            .with("id", "self")
            .with("title", self.subject.title.clone())
            .with("description", self.subject.description.clone())
            .with("image", self.subject.hero_image.clone())
            .with("icon", self.subject.icon.clone())
    }
}

/// Filter, then sort, then limit, in that order.
pub fn apply_scope(records: Vec<Record>, scope: &Scope) -> Vec<Record> {
    let mut out: Vec<Record> = match &scope.filter {
        Some(filter) => records
            .into_iter()
            .filter(|r| filter.iter().all(|(k, v)| r.get(k) == v))
            .collect(),
        None => records,
    };
    if let Some(field) = &scope.sort {
        // Stable, so equal keys keep fixture order.
        out.sort_by(|a, b| a.get(field).cmp(b.get(field)));
    }
    if let Some(limit) = scope.limit {
        out.truncate(limit);
    }
    out
}

fn generic_stub(target: &Target) -> Vec<Record> {
    (1..=GENERIC_STUB_COUNT)
        .map(|i| {
            Record::default()
                .with("id", format!("{}-{i}", target.as_str()))
                .with("title", format!("{} {i}", target.display_name()))
                .with("description", String::new())
                .with("image", String::new())
                .with("icon", String::new())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> FixtureSet {
        FixtureSet::from_json(
            r#"{
                "feature": [
                    {"id": "f1", "title": "Logo kit", "category": "Branding"},
                    {"id": "f2", "title": "Analytics", "category": "Insights"},
                    {"id": "f3", "title": "Brand voice", "category": "Branding"},
                    {"id": "f4", "title": "Asset library", "category": "Branding"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn scoped(scope: Scope) -> Binding {
        Binding::Related {
            target: Target::Feature,
            cardinality: Cardinality::Many,
            relation_key: None,
            scope: Some(scope),
        }
    }

    #[test]
    fn binding_json_shapes() {
        let b: Binding = serde_json::from_str(r#"{"kind": "self"}"#).unwrap();
        assert_eq!(b, Binding::SelfSubject);

        let b: Binding = serde_json::from_str(
            r#"{"kind": "related", "target": "useCase", "cardinality": "many", "relationKey": "featured", "scope": {"limit": 2}}"#,
        )
        .unwrap();
        let Binding::Related { target, relation_key, scope, .. } = b else {
            panic!("expected related");
        };
        assert_eq!(target, Target::UseCase);
        assert_eq!(relation_key.as_deref(), Some("featured"));
        assert_eq!(scope.unwrap().limit, Some(2));
    }

    #[test]
    fn filter_keeps_matching_records_in_order() {
        let fx = fixtures();
        let r = BindingResolver::for_target(&fx, &Target::Product);
        let mut filter = BTreeMap::new();
        filter.insert("category".to_string(), "Branding".to_string());
        let out = r.resolve(&scoped(Scope {
            filter: Some(filter),
            ..Scope::default()
        }));
        let ids: Vec<_> = out.iter().map(|r| r.get("id")).collect();
        assert_eq!(ids, vec!["f1", "f3", "f4"]);
    }

    #[test]
    fn filter_then_sort_then_limit() {
        let fx = fixtures();
        let r = BindingResolver::for_target(&fx, &Target::Product);
        let mut filter = BTreeMap::new();
        filter.insert("category".to_string(), "Branding".to_string());
        let out = r.resolve(&scoped(Scope {
            filter: Some(filter),
            sort: Some("title".to_string()),
            limit: Some(2),
        }));
        let titles: Vec<_> = out.iter().map(|r| r.get("title")).collect();
        assert_eq!(titles, vec!["Asset library", "Brand voice"]);
    }

    #[test]
    fn self_binding_yields_single_subject_record() {
        let fx = fixtures();
        let r = BindingResolver::new(
            &fx,
            SubjectInfo {
                title: "Acme".to_string(),
                hero_image: "/hero.png".to_string(),
                ..SubjectInfo::default()
            },
        );
        let out = r.resolve(&Binding::SelfSubject);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("title"), "Acme");
        assert_eq!(out[0].get("image"), "/hero.png");
    }

    #[test]
    fn unknown_many_target_falls_back_to_stub() {
        let fx = fixtures();
        let r = BindingResolver::for_target(&fx, &Target::Product);
        let target = Target::from("partner".to_string());
        assert!(!target.is_known());
        let out = r.resolve(&Binding::related(target.clone(), Cardinality::Many));
        assert_eq!(out.len(), GENERIC_STUB_COUNT);
        assert_eq!(out[0].get("title"), "Partner 1");
        assert!(r.resolve(&Binding::related(target, Cardinality::One)).is_empty());
    }

    #[test]
    fn cardinality_one_keeps_first_record() {
        let fx = fixtures();
        let r = BindingResolver::for_target(&fx, &Target::Product);
        let out = r.resolve(&Binding::related(Target::Feature, Cardinality::One));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("id"), "f1");
    }
}
