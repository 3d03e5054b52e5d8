//! Section and page-template validation.
//!
//! Results are data: a report of diagnostics per section or template. A
//! fatal diagnostic keeps the section (or the whole page, for template
//! diagnostics) from rendering; warnings and info never block.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::binding::Cardinality;
use crate::page::{PageKind, PageTemplate, Section, Slot};
use crate::preset::{IntegrityManifest, IntegrityStatus, PresetRegistry, is_version_suffixed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// A required field is missing.
    Structural,
    /// A name does not resolve.
    Referential,
    /// Values disagree with each other.
    Semantic,
    /// A naming rule is not followed.
    Convention,
    /// A preset drifted from its pinned hash.
    Integrity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, kind: DiagnosticKind, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn fatal(kind: DiagnosticKind, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, kind, code, message)
    }

    pub fn warning(kind: DiagnosticKind, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, code, message)
    }

    pub fn info(kind: DiagnosticKind, code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, kind, code, message)
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}/{:?}] {}: {}", self.severity, self.kind, self.code, self.message)
    }
}

/// Where a section is in its validation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    None,
    Validated,
    Errors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    pub section_id: String,
    pub status: SectionStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl SectionReport {
    pub fn new(section_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            status: SectionStatus::None,
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, d: Diagnostic) {
        self.diagnostics.push(d);
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    pub fn fatal_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_fatal()).count()
    }

    fn finish(mut self) -> Self {
        self.status = if self.has_fatal() {
            SectionStatus::Errors
        } else {
            SectionStatus::Validated
        };
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl TemplateReport {
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }
}

impl fmt::Display for TemplateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Run the section checks in order. Structural and referential failures
/// stop the run; later checks only add to the report.
pub fn validate_section(
    section: &Section,
    registry: &PresetRegistry,
    manifest: &IntegrityManifest,
) -> SectionReport {
    let mut report = SectionReport::new(&section.id);

    let mut missing = Vec::new();
    if section.binding.is_none() {
        missing.push("binding");
    }
    if section.placement.is_none() {
        missing.push("placement");
    }
    if section.presentation_key.is_none() {
        missing.push("presentationKey");
    }
    for field in &missing {
        report.push(Diagnostic::fatal(
            DiagnosticKind::Structural,
            "missing_field",
            format!("section '{}' has no {field}", section.id),
        ));
    }
    let (Some(binding), Some(key)) = (&section.binding, &section.presentation_key) else {
        return report.finish();
    };
    if !missing.is_empty() {
        return report.finish();
    }

    let Some(preset) = registry.get(key) else {
        report.push(Diagnostic::fatal(
            DiagnosticKind::Referential,
            "unknown_preset",
            format!("preset '{key}' is not registered"),
        ));
        return report.finish();
    };

    if !preset.signature.accepts(binding) {
        report.push(Diagnostic::fatal(
            DiagnosticKind::Semantic,
            "signature_mismatch",
            format!(
                "preset '{key}' expects a {} binding",
                preset.signature.describe()
            ),
        ));
    }

    if !is_version_suffixed(key) {
        report.push(Diagnostic::warning(
            DiagnosticKind::Convention,
            "missing_version_suffix",
            format!("preset key '{key}' does not end in .vN"),
        ));
    }

    match manifest.check(key, &preset.config) {
        IntegrityStatus::Ok => {}
        IntegrityStatus::MissingInManifest => report.push(Diagnostic::info(
            DiagnosticKind::Integrity,
            "missing_in_manifest",
            format!("preset '{key}' is not pinned in the manifest"),
        )),
        IntegrityStatus::VersionViolation { expected, actual } => {
            tracing::warn!(preset = %key, %expected, %actual, "locked preset changed without a version bump");
            report.push(Diagnostic::fatal(
                DiagnosticKind::Integrity,
                "version_violation",
                format!("locked preset '{key}' changed (expected {expected}, found {actual}); bump its version"),
            ));
        }
        IntegrityStatus::Mismatch { expected, actual } => {
            tracing::warn!(preset = %key, %expected, %actual, "preset manifest entry is stale");
            report.push(Diagnostic::warning(
                DiagnosticKind::Integrity,
                "mismatch",
                format!("preset '{key}' hash {actual} differs from manifest {expected}"),
            ));
        }
    }

    report.finish()
}

/// Page-level checks. Any fatal diagnostic here blocks the whole page.
pub fn validate_template(template: &PageTemplate) -> TemplateReport {
    let mut report = TemplateReport::default();

    match (&template.page_context, &template.page_subject) {
        (Some(ctx), Some(subject)) => {
            let expected = match ctx.kind {
                PageKind::Detail => Cardinality::One,
                PageKind::Index => Cardinality::Many,
            };
            if subject.cardinality != expected {
                report.diagnostics.push(Diagnostic::fatal(
                    DiagnosticKind::Semantic,
                    "context_cardinality",
                    format!(
                        "{} pages need a '{}' subject, found '{}'",
                        ctx.kind.as_str(),
                        expected.as_str(),
                        subject.cardinality.as_str()
                    ),
                ));
            }
        }
        (ctx, subject) => {
            if ctx.is_none() {
                report.diagnostics.push(Diagnostic::fatal(
                    DiagnosticKind::Structural,
                    "missing_field",
                    "page template has no pageContext",
                ));
            }
            if subject.is_none() {
                report.diagnostics.push(Diagnostic::fatal(
                    DiagnosticKind::Structural,
                    "missing_field",
                    "page template has no pageSubject",
                ));
            }
        }
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for section in &template.sections {
        if section.id.is_empty() {
            report.diagnostics.push(Diagnostic::fatal(
                DiagnosticKind::Structural,
                "missing_field",
                "a section has no id",
            ));
            continue;
        }
        *seen.entry(section.id.as_str()).or_default() += 1;
    }
    let mut duplicates: Vec<&str> = seen.into_iter().filter(|&(_, n)| n > 1).map(|(id, _)| id).collect();
    duplicates.sort_unstable();
    for id in duplicates {
        report.diagnostics.push(Diagnostic::fatal(
            DiagnosticKind::Structural,
            "duplicate_section_id",
            format!("section id '{id}' is used more than once"),
        ));
    }

    for slot in [Slot::Start, Slot::End] {
        let n = template
            .sections
            .iter()
            .filter(|s| s.placement.as_ref().is_some_and(|p| p.slot == slot))
            .count();
        if n > 1 {
            report.diagnostics.push(Diagnostic::warning(
                DiagnosticKind::Convention,
                "multiple_slot_sections",
                format!("{n} sections claim the {} slot", slot.as_str()),
            ));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Binding, Target};
    use crate::page::{PageContext, PageSubject, Placement};
    use crate::preset::{Preset, Signature, preset_hash};
    use std::collections::BTreeMap;

    fn section(id: &str, key: Option<&str>, binding: Option<Binding>) -> Section {
        Section {
            id: id.to_string(),
            placement: Some(Placement::free(1)),
            binding,
            presentation_key: key.map(str::to_string),
            overrides: Default::default(),
        }
    }

    fn bundled() -> (&'static PresetRegistry, &'static IntegrityManifest) {
        (
            PresetRegistry::bundled().unwrap(),
            IntegrityManifest::bundled().unwrap(),
        )
    }

    fn products() -> Binding {
        Binding::related(Target::Product, Cardinality::Many)
    }

    #[test]
    fn bundled_preset_with_matching_binding_validates() {
        let (reg, man) = bundled();
        let r = validate_section(
            &section("s", Some("related.product.many.marquee.v1"), Some(products())),
            reg,
            man,
        );
        assert_eq!(r.status, SectionStatus::Validated);
        assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    }

    #[test]
    fn unknown_preset_is_one_fatal_and_stops() {
        let (reg, man) = bundled();
        let r = validate_section(&section("s", Some("nope.v1"), Some(products())), reg, man);
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].code, "unknown_preset");
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::Referential);
        assert_eq!(r.status, SectionStatus::Errors);
    }

    #[test]
    fn missing_fields_short_circuit() {
        let (reg, man) = bundled();
        let mut s = section("s", None, None);
        s.placement = None;
        let r = validate_section(&s, reg, man);
        assert_eq!(r.fatal_count(), 3);
        assert!(r.diagnostics.iter().all(|d| d.kind == DiagnosticKind::Structural));
    }

    #[test]
    fn signature_mismatch_is_fatal() {
        let (reg, man) = bundled();
        let r = validate_section(
            &section("s", Some("related.product.many.marquee.v1"), Some(Binding::SelfSubject)),
            reg,
            man,
        );
        assert!(r.has_fatal());
        assert_eq!(r.diagnostics[0].code, "signature_mismatch");
    }

    #[test]
    fn fallback_preset_warns_but_renders() {
        let (reg, man) = bundled();
        let r = validate_section(&section("s", Some("generic.empty"), Some(products())), reg, man);
        assert_eq!(r.status, SectionStatus::Validated);
        let codes: Vec<_> = r.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["missing_version_suffix", "missing_in_manifest"]);
    }

    #[test]
    fn integrity_drift_by_lock_state() {
        let config = serde_json::json!({"id": "x", "shape": "group"});
        let mut reg = PresetRegistry::default();
        for key in ["locked.v1", "loose"] {
            reg.insert(Preset {
                key: key.to_string(),
                signature: Signature::SelfSubject,
                scene: serde_json::from_value(config.clone()).unwrap(),
                config: config.clone(),
            })
            .unwrap();
        }
        let stale = format!("{:08x}", 0u32);
        assert_ne!(stale, preset_hash(&config));
        let man = IntegrityManifest::new(BTreeMap::from([
            ("locked.v1".to_string(), stale.clone()),
            ("loose".to_string(), stale),
        ]));

        let locked = validate_section(&section("a", Some("locked.v1"), Some(Binding::SelfSubject)), &reg, &man);
        assert!(locked.has_fatal());
        assert!(locked.diagnostics.iter().any(|d| d.code == "version_violation"));

        let loose = validate_section(&section("b", Some("loose"), Some(Binding::SelfSubject)), &reg, &man);
        assert!(!loose.has_fatal());
        assert!(loose.diagnostics.iter().any(|d| d.code == "mismatch"));
    }

    fn template(kind: PageKind, cardinality: Cardinality) -> PageTemplate {
        PageTemplate {
            page_context: Some(PageContext { kind }),
            page_subject: Some(PageSubject {
                target: Target::Product,
                cardinality,
            }),
            subject: None,
            sections: Vec::new(),
        }
    }

    #[test]
    fn detail_page_with_many_subject_fails() {
        let r = validate_template(&template(PageKind::Detail, Cardinality::Many));
        assert!(r.has_fatal());
        assert_eq!(r.diagnostics[0].code, "context_cardinality");
        assert!(!validate_template(&template(PageKind::Detail, Cardinality::One)).has_fatal());
        assert!(validate_template(&template(PageKind::Index, Cardinality::One)).has_fatal());
    }

    #[test]
    fn duplicate_ids_are_fatal_and_extra_start_warns() {
        let mut t = template(PageKind::Index, Cardinality::Many);
        let mut a = section("a", Some("generic.empty"), Some(products()));
        a.placement = Some(Placement::start());
        let mut b = a.clone();
        b.id = "b".to_string();
        let dup = section("a", Some("generic.empty"), Some(products()));
        t.sections = vec![a, b, dup];
        let r = validate_template(&t);
        let codes: Vec<_> = r.diagnostics.iter().map(|d| (d.code, d.severity)).collect();
        assert!(codes.contains(&("duplicate_section_id", Severity::Fatal)));
        assert!(codes.contains(&("multiple_slot_sections", Severity::Warning)));
    }
}
