//! Whole-page DOM: one `<section>` per resolved section, diagnostic panels
//! for blocked ones.

use crate::page::{ComposedPage, ResolvedSection, SectionScene};
use crate::validation::{Diagnostic, SectionReport, Severity, TemplateReport};

use super::node::{DomNode, css_num, px};
use super::render::DomRenderer;

const PAGE_CSS: &str = "\
body { margin: 0; background: #0b0d17; color: #f5f6fa; font-family: system-ui, sans-serif; }
.sf-section { position: relative; overflow: hidden; }
.sf-gpu-mount { pointer-events: none; }
.sf-body { display: flex; flex-direction: column; gap: 4px; min-width: 0; }
.sf-heading { margin: 0; font-size: 1.1rem; }
.sf-subtitle, .sf-label { margin: 0; opacity: 0.75; }
.sf-diagnostic-panel, .sf-template-errors { margin: 16px; padding: 16px; border: 2px solid #ff5c5c; border-radius: 8px; background: #2a0f14; }
.sf-section-warnings { margin: 8px 16px; padding: 8px 12px; border: 1px solid #ffb020; border-radius: 6px; background: #2a220f; }
";

pub fn render_page(page: &ComposedPage) -> DomNode {
    let mut main = DomNode::new("main").class("sf-page");
    let warnings = visible(&page.template_report.diagnostics);
    if !warnings.is_empty() {
        main = main.child(
            DomNode::new("aside")
                .class("sf-section-warnings")
                .attr("data-scope", "template")
                .child(diagnostic_list(&warnings)),
        );
    }
    main.children(page.sections.iter().map(|s| match s {
        ResolvedSection::Scene(scene) => section(scene),
        ResolvedSection::Diagnostics(report) => diagnostic_panel(report),
    }))
}

fn section(s: &SectionScene) -> DomNode {
    let t = &s.scene.transform;
    let mut el = DomNode::new("section")
        .class("sf-section")
        .attr("data-section-id", s.section_id.clone())
        .attr("data-preset", s.preset_key.clone())
        .attr("data-progress", css_num(s.progress))
        .style("min-height", px(t.frame_height));
    let warnings = visible(&s.report.diagnostics);
    if !warnings.is_empty() {
        el = el.child(
            DomNode::new("aside")
                .class("sf-section-warnings")
                .child(diagnostic_list(&warnings)),
        );
    }
    match DomRenderer::new(&s.plan, s.progress).render(&s.scene) {
        Some(root) => el.child(root),
        None => el,
    }
}

/// Rendered in place of a section that has a fatal diagnostic.
pub fn diagnostic_panel(report: &SectionReport) -> DomNode {
    let all: Vec<&Diagnostic> = report.diagnostics.iter().collect();
    DomNode::new("section")
        .class("sf-section")
        .class("sf-section-blocked")
        .attr("data-section-id", report.section_id.clone())
        .child(
            DomNode::new("div")
                .class("sf-diagnostic-panel")
                .attr("role", "alert")
                .child(DomNode::new("h4").text(format!(
                    "Section \"{}\" cannot render ({} error{})",
                    report.section_id,
                    report.fatal_count(),
                    if report.fatal_count() == 1 { "" } else { "s" }
                )))
                .child(diagnostic_list(&all)),
        )
}

/// Replaces the whole page when the template itself is invalid.
pub fn template_errors(report: &TemplateReport) -> DomNode {
    let all: Vec<&Diagnostic> = report.diagnostics.iter().collect();
    DomNode::new("main").class("sf-page").child(
        DomNode::new("div")
            .class("sf-template-errors")
            .attr("role", "alert")
            .child(DomNode::new("h3").text("Page template is invalid"))
            .child(diagnostic_list(&all)),
    )
}

/// Warnings and fatals; info stays in the logs.
fn visible(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics.iter().filter(|d| d.severity > Severity::Info).collect()
}

fn diagnostic_list(diagnostics: &[&Diagnostic]) -> DomNode {
    DomNode::new("ul").children(diagnostics.iter().map(|d| {
        let severity = match d.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Fatal => "fatal",
        };
        DomNode::new("li")
            .class("sf-diagnostic")
            .class(format!("sf-{severity}"))
            .attr("data-code", d.code)
            .text(format!("[{:?}] {}: {}", d.kind, d.code, d.message))
    }))
}

/// Standalone HTML document around `body`.
pub fn document_html(title: &str, body: &DomNode) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{PAGE_CSS}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        super::node::escape(title),
        body.to_html()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::DiagnosticKind;

    #[test]
    fn blocked_section_lists_every_diagnostic() {
        let mut report = SectionReport::new("hero");
        report.push(Diagnostic::fatal(DiagnosticKind::Referential, "unknown_preset", "nope"));
        report.push(Diagnostic::warning(DiagnosticKind::Convention, "missing_version_suffix", "x"));
        let el = diagnostic_panel(&report);
        assert!(el.has_class("sf-section-blocked"));
        assert_eq!(el.count_with_class("sf-diagnostic"), 2);
        assert!(el.text_content().contains("(1 error)"));
        assert!(el.find_by_attr("data-code", "unknown_preset").is_some());
    }

    #[test]
    fn template_errors_replace_the_page() {
        let report = TemplateReport {
            diagnostics: vec![Diagnostic::fatal(DiagnosticKind::Semantic, "context_cardinality", "bad")],
        };
        let html = document_html("t", &template_errors(&report));
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("Page template is invalid"));
        assert!(html.contains("data-code=\"context_cardinality\""));
    }
}
