//! WGSL validation using the naga library.

use anyhow::{Context, Result, anyhow};

/// Parse WGSL with naga's front-end.
///
/// Returns the parsed module, or an error that carries the numbered source.
pub fn validate_wgsl(source: &str) -> Result<naga::Module> {
    naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow!("WGSL validation failed:\n{}", format_naga_error(source, &e)))
}

/// Like [`validate_wgsl`], naming what generated the source (e.g. "raymarch node hero-prism").
pub fn validate_wgsl_with_context(source: &str, context: &str) -> Result<naga::Module> {
    validate_wgsl(source).with_context(|| format!("{context} generated invalid WGSL"))
}

/// Whether `module` declares an entry point named `name`.
pub fn has_entry_point(module: &naga::Module, name: &str) -> bool {
    module.entry_points.iter().any(|ep| ep.name == name)
}

fn format_naga_error(source: &str, error: &naga::front::wgsl::ParseError) -> String {
    let mut output = format!("  {error}\n\nGenerated WGSL:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_module_and_finds_entry_points() {
        let source = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;
        let module = validate_wgsl(source).unwrap();
        assert!(has_entry_point(&module, "vs_main"));
        assert!(has_entry_point(&module, "fs_main"));
        assert!(!has_entry_point(&module, "cs_main"));
    }

    #[test]
    fn rejects_syntax_errors() {
        assert!(validate_wgsl("fn invalid() -> { return vec4<f32>(1.0); }").is_err());
    }

    #[test]
    fn rejects_type_errors() {
        let source = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: vec4<f32> = 1.0;
    return x;
}
"#;
        assert!(validate_wgsl(source).is_err());
    }

    #[test]
    fn context_is_part_of_the_error() {
        let err = validate_wgsl_with_context("invalid wgsl", "storm node sky").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("storm node sky"));
        assert!(msg.contains("   1 | invalid wgsl"));
    }
}
