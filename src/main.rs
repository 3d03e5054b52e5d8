use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use section_forge::asset_store::{AssetStore, load_from_dir};
use section_forge::page::{
    ComposedPage, PageTemplate, ResolutionContext, ResolvedSection, SectionProgress, compose_page,
};
use section_forge::preset::{IntegrityManifest, PresetRegistry};
use section_forge::renderer::dispatch::{GpuJob, GpuJobKind};
use section_forge::renderer::headless::{HeadlessOptions, render_node_to_png};
use section_forge::renderer::marquee::wgsl::MARQUEE_WGSL;
use section_forge::renderer::raymarch::RaymarchProgram;
use section_forge::renderer::texture::TextureSources;
use section_forge::renderer::utils::sanitize_ident;
use section_forge::renderer::{document_html, render_page};
use tracing_subscriber::EnvFilter;

const SUPPORTED: &str = "--page <template.json>, --progress <f32>, --section-progress <id>=<f32>, \
--out-dir <dir>, --render-png <node-id>, --assets <dir>, --print-manifest";

#[derive(Debug, Default, Clone, PartialEq)]
struct Cli {
    page: Option<PathBuf>,
    progress: f32,
    section_progress: Vec<(String, f32)>,
    out_dir: Option<PathBuf>,
    render_png: Option<String>,
    /// Image directory preloaded into the asset store for `--render-png`.
    assets: Option<PathBuf>,
    print_manifest: bool,
}

fn parse_progress(flag: &str, v: &str) -> Result<f32> {
    v.trim()
        .parse::<f32>()
        .map_err(|e| anyhow!("invalid value for {flag}: '{v}' ({e})"))
}

fn arg_value<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a String> {
    args.get(i + 1)
        .ok_or_else(|| anyhow!("missing value for {name}"))
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--page" => {
                cli.page = Some(PathBuf::from(arg_value(args, i, "--page")?));
                i += 2;
            }
            "--progress" => {
                cli.progress = parse_progress("--progress", arg_value(args, i, "--progress")?)?;
                i += 2;
            }
            "--section-progress" => {
                let v = arg_value(args, i, "--section-progress")?;
                let Some((id, p)) = v.split_once('=') else {
                    bail!("--section-progress expects <id>=<f32>, got '{v}'");
                };
                cli.section_progress
                    .push((id.to_string(), parse_progress("--section-progress", p)?));
                i += 2;
            }
            "--out-dir" => {
                cli.out_dir = Some(PathBuf::from(arg_value(args, i, "--out-dir")?));
                i += 2;
            }
            "--render-png" => {
                cli.render_png = Some(arg_value(args, i, "--render-png")?.clone());
                i += 2;
            }
            "--assets" => {
                cli.assets = Some(PathBuf::from(arg_value(args, i, "--assets")?));
                i += 2;
            }
            "--print-manifest" => {
                cli.print_manifest = true;
                i += 1;
            }
            other => bail!("unknown argument: {other} (supported: {SUPPORTED})"),
        }
    }
    if cli.render_png.is_some() && cli.out_dir.is_none() {
        bail!("--render-png needs --out-dir");
    }
    Ok(cli)
}

fn load_template(cli: &Cli) -> Result<PageTemplate> {
    match &cli.page {
        Some(path) => PageTemplate::from_path(path),
        None => PageTemplate::demo(),
    }
}

fn job_wgsl(job: &GpuJob) -> Option<String> {
    match job.kind {
        GpuJobKind::Raymarch => RaymarchProgram::for_kind(&job.node.kind).map(|p| p.wgsl()),
        GpuJobKind::MarqueeTrack => Some(MARQUEE_WGSL.to_string()),
    }
}

fn scenes(page: &ComposedPage) -> impl Iterator<Item = &section_forge::page::SectionScene> {
    page.sections.iter().filter_map(|s| match s {
        ResolvedSection::Scene(scene) => Some(scene.as_ref()),
        ResolvedSection::Diagnostics(_) => None,
    })
}

fn write_outputs(page: &ComposedPage, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let html = document_html("section-forge", &render_page(page));
    let html_path = out_dir.join("page.html");
    std::fs::write(&html_path, html).with_context(|| format!("failed to write {}", html_path.display()))?;

    let mut shaders = 0;
    for scene in scenes(page) {
        for job in &scene.plan.gpu_jobs {
            let Some(source) = job_wgsl(job) else {
                continue;
            };
            let path = out_dir.join(format!("{}.wgsl", sanitize_ident(&job.node.id)));
            std::fs::write(&path, source).with_context(|| format!("failed to write {}", path.display()))?;
            shaders += 1;
        }
    }
    tracing::info!(dir = %out_dir.display(), shaders, "wrote page outputs");
    Ok(())
}

fn render_png(page: &ComposedPage, node_id: &str, out_dir: &Path, sources: TextureSources) -> Result<()> {
    let (scene, job) = scenes(page)
        .find_map(|scene| {
            scene
                .plan
                .gpu_jobs
                .iter()
                .find(|j| j.node.id == node_id)
                .map(|j| (scene, j))
        })
        .ok_or_else(|| anyhow!("no GPU node '{node_id}' in the composed page"))?;

    let options = HeadlessOptions {
        width: job.node.transform.frame_width.max(1.0).round() as u32,
        height: job.node.transform.frame_height.max(1.0).round() as u32,
        progress: scene.progress,
        sources,
        ..HeadlessOptions::default()
    };
    let path = out_dir.join(format!("{}.png", sanitize_ident(node_id)));
    render_node_to_png(&job.node, &options, &path)?;
    println!("saved: {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    if cli.print_manifest {
        let manifest = IntegrityManifest::regenerate(PresetRegistry::bundled()?);
        println!("{}", manifest.to_json_pretty()?);
        return Ok(());
    }

    let template = load_template(&cli)?;
    let ctx = ResolutionContext::bundled()?;
    let progress = cli
        .section_progress
        .iter()
        .fold(SectionProgress::uniform(cli.progress), |p, (id, v)| p.with(id.clone(), *v));

    let page = compose_page(&template, &ctx, &progress)
        .map_err(|report| anyhow!("page template rejected:\n{report}"))?;

    let Some(out_dir) = cli.out_dir.as_deref() else {
        println!("{}", document_html("section-forge", &render_page(&page)));
        return Ok(());
    };
    write_outputs(&page, out_dir)?;

    if let Some(node_id) = cli.render_png.as_deref() {
        let store = match cli.assets.as_deref() {
            Some(dir) => load_from_dir(dir)?,
            None => AssetStore::new(),
        };
        let sources = TextureSources {
            store,
            base_dir: cli.page.as_deref().and_then(Path::parent).map(Path::to_path_buf),
        };
        render_png(&page, node_id, out_dir, sources)?;
    }
    Ok(())
}
