//! Page templates: section ordering and composition into renderable scenes.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::binding::{Binding, BindingResolver, Cardinality, SubjectInfo, Target};
use crate::fixtures::FixtureSet;
use crate::inject::{Overrides, instantiate};
use crate::preset::{IntegrityManifest, PresetRegistry};
use crate::renderer::dispatch::DispatchPlan;
use crate::scene::SceneObject;
use crate::validation::{Diagnostic, DiagnosticKind, SectionReport, TemplateReport, validate_section, validate_template};

const DEMO_PAGE_JSON: &str = include_str!("../assets/demo-page.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Start,
    Free,
    End,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Start => "start",
            Slot::Free => "free",
            Slot::End => "end",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Slot::Start => 0,
            Slot::Free => 1,
            Slot::End => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub slot: Slot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl Placement {
    pub fn start() -> Self {
        Self {
            slot: Slot::Start,
            order: None,
        }
    }

    pub fn end() -> Self {
        Self {
            slot: Slot::End,
            order: None,
        }
    }

    pub fn free(order: i32) -> Self {
        Self {
            slot: Slot::Free,
            order: Some(order),
        }
    }
}

/// One scroll-driven section. Required fields are optional here so that a
/// malformed template still loads and validation can report what is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub binding: Option<Binding>,
    #[serde(default)]
    pub presentation_key: Option<String>,
    #[serde(default, skip_serializing_if = "Overrides::is_empty")]
    pub overrides: Overrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Detail,
    Index,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::Detail => "detail",
            PageKind::Index => "index",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub kind: PageKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSubject {
    pub target: Target,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTemplate {
    #[serde(default)]
    pub page_context: Option<PageContext>,
    #[serde(default)]
    pub page_subject: Option<PageSubject>,
    /// Overrides the synthesised record used by `self` bindings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectInfo>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl PageTemplate {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse page template json")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read page template at {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn demo() -> Result<Self> {
        Self::from_json(DEMO_PAGE_JSON)
    }

    /// Start sections, then free sections by ascending `order`, then end
    /// sections. Sections without an order sort after ordered ones; ties keep
    /// template order.
    pub fn ordered_sections(&self) -> Vec<&Section> {
        let mut out: Vec<&Section> = self.sections.iter().collect();
        out.sort_by_key(|s| {
            let slot = s.placement.as_ref().map_or(Slot::Free, |p| p.slot);
            let order = s.placement.as_ref().and_then(|p| p.order);
            (slot.rank(), order.is_none(), order.unwrap_or(0))
        });
        out
    }
}

/// Read-only data a page is composed against.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub registry: &'a PresetRegistry,
    pub manifest: &'a IntegrityManifest,
    pub fixtures: &'a FixtureSet,
}

impl ResolutionContext<'static> {
    pub fn bundled() -> Result<Self> {
        Ok(Self {
            registry: PresetRegistry::bundled()?,
            manifest: IntegrityManifest::bundled()?,
            fixtures: FixtureSet::bundled()?,
        })
    }
}

/// Per-section progress supplied by the host's scroll tracking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionProgress {
    pub default: f32,
    pub per_section: HashMap<String, f32>,
}

impl SectionProgress {
    pub fn uniform(progress: f32) -> Self {
        Self {
            default: progress,
            per_section: HashMap::new(),
        }
    }

    pub fn with(mut self, section_id: impl Into<String>, progress: f32) -> Self {
        self.per_section.insert(section_id.into(), progress);
        self
    }

    pub fn get(&self, section_id: &str) -> f32 {
        self.per_section
            .get(section_id)
            .copied()
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone)]
pub struct SectionScene {
    pub section_id: String,
    pub preset_key: String,
    pub progress: f32,
    pub scene: SceneObject,
    pub plan: DispatchPlan,
    /// Non-blocking diagnostics.
    pub report: SectionReport,
}

#[derive(Debug, Clone)]
pub enum ResolvedSection {
    Scene(Box<SectionScene>),
    Diagnostics(SectionReport),
}

impl ResolvedSection {
    pub fn section_id(&self) -> &str {
        match self {
            ResolvedSection::Scene(s) => &s.section_id,
            ResolvedSection::Diagnostics(r) => &r.section_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposedPage {
    pub sections: Vec<ResolvedSection>,
    /// Template warnings. Template fatals never produce a page.
    pub template_report: TemplateReport,
}

/// Validate the template, then resolve every section in page order.
///
/// A bad section becomes a diagnostics entry; a bad template returns its
/// report instead of a page.
pub fn compose_page(
    template: &PageTemplate,
    ctx: &ResolutionContext<'_>,
    progress: &SectionProgress,
) -> std::result::Result<ComposedPage, TemplateReport> {
    let template_report = validate_template(template);
    if template_report.has_fatal() {
        tracing::warn!(diagnostics = template_report.diagnostics.len(), "page template rejected");
        return Err(template_report);
    }

    let resolver = match (&template.subject, &template.page_subject) {
        (Some(subject), _) => BindingResolver::new(ctx.fixtures, subject.clone()),
        (None, Some(ps)) => BindingResolver::for_target(ctx.fixtures, &ps.target),
        (None, None) => BindingResolver::new(ctx.fixtures, SubjectInfo::default()),
    };

    let sections: Vec<ResolvedSection> = template
        .ordered_sections()
        .into_iter()
        .map(|s| resolve_section(s, ctx, &resolver, progress.get(&s.id)))
        .collect();

    let rendered = sections
        .iter()
        .filter(|s| matches!(s, ResolvedSection::Scene(_)))
        .count();
    tracing::info!(
        sections = sections.len(),
        rendered,
        blocked = sections.len() - rendered,
        "composed page"
    );
    Ok(ComposedPage {
        sections,
        template_report,
    })
}

fn resolve_section(
    section: &Section,
    ctx: &ResolutionContext<'_>,
    resolver: &BindingResolver<'_>,
    progress: f32,
) -> ResolvedSection {
    let mut report = validate_section(section, ctx.registry, ctx.manifest);
    let (Some(binding), Some(key)) = (&section.binding, &section.presentation_key) else {
        return blocked(report);
    };
    let Some(preset) = ctx.registry.get(key).filter(|_| !report.has_fatal()) else {
        return blocked(report);
    };

    let records = resolver.resolve(binding);
    let inst = match instantiate(preset, &section.overrides, binding, &records) {
        Ok(inst) => inst,
        Err(e) => {
            report.push(Diagnostic::fatal(
                DiagnosticKind::Semantic,
                "invalid_override",
                format!("{e:#}"),
            ));
            return blocked(report);
        }
    };
    for id in &inst.unmatched_overrides {
        report.push(Diagnostic::warning(
            DiagnosticKind::Referential,
            "unknown_override_target",
            format!("override names node '{id}' which preset '{key}' does not have"),
        ));
    }

    let plan = DispatchPlan::build(&inst.scene);
    tracing::debug!(
        section = %section.id,
        preset = %key,
        records = records.len(),
        gpu_jobs = plan.gpu_jobs.len(),
        "resolved section"
    );
    ResolvedSection::Scene(Box::new(SectionScene {
        section_id: section.id.clone(),
        preset_key: key.clone(),
        progress,
        scene: inst.scene,
        plan,
        report,
    }))
}

fn blocked(mut report: SectionReport) -> ResolvedSection {
    if !report.has_fatal() {
        report.push(Diagnostic::fatal(
            DiagnosticKind::Structural,
            "unresolvable",
            "section could not be resolved",
        ));
    }
    tracing::warn!(
        section = %report.section_id,
        fatal = report.fatal_count(),
        "section blocked by diagnostics"
    );
    ResolvedSection::Diagnostics(report)
}
