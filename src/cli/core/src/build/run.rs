/* src/cli/core/src/build/run.rs */

// Build orchestrator: discovery, bundling, static generation, manifest.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tessera_renderer::{RendererClient, RendererOptions, RuntimeSource};
use tessera_server::manifest::MANIFEST_FILE;

use super::assemble::{assemble_entries, finish_manifest};
use super::bundle::{BuildJob, bundle_entries, discard_server_css};
use super::css::dedup_css;
use super::discover::{Discovered, describe_pages, scan_sources};
use super::entries::write_page_entries;
use super::package::package_runtime;
use super::statics::generate_static_pages;
use super::types::{BuildContext, BuildReport, BuildStage, DiscoveredPage, PageFailure, PagePlan};
use crate::config::{Discovery, TesseraConfig};
use crate::ui;

const TOTAL_STEPS: u32 = 7;

// -- Entry point --

pub async fn run_build(config: &TesseraConfig, base_dir: &Path) -> Result<BuildReport> {
  let started = Instant::now();
  ui::banner(&config.project.name);

  if let Some(warning) = config.build.host_command_warning() {
    ui::warn(&warning);
  }
  ui::step(1, TOTAL_STEPS, &format!("Discovering pages ({})", config.build.discovery.as_str()));
  let discovered = discover(config, base_dir).await?;
  for warning in &discovered.warnings {
    ui::warn(warning);
  }
  ui::detail_ok(&format!("{} pages found", discovered.pages.len()));
  ui::blank();

  let renderer = Arc::new(start_renderer(config, base_dir).await?);
  let ctx = BuildContext {
    base_dir: base_dir.to_path_buf(),
    out_dir: base_dir.join(&config.build.out_dir),
    renderer: renderer.clone(),
    workers: config.build.workers(),
    host_command: config.build.host_command.clone(),
    export_timeout: config.build.export_timeout(),
    runtime_dir: config.renderer.runtime_dir.as_ref().map(|d| base_dir.join(d)),
  };
  let result = run_pipeline(&ctx, discovered.pages).await;
  if let Err(e) = renderer.stop().await {
    ui::warn(&format!("failed to stop the renderer: {e}"));
  }
  let report = result?;

  let elapsed = started.elapsed().as_secs_f64();
  ui::ok(&format!("build complete in {elapsed:.1}s"));
  ui::detail(&format!(
    "{} entries \u{00b7} {} static pages \u{00b7} {} failed{}",
    report.entries,
    report.static_files,
    report.failures.len(),
    if report.packaged_runtime { " \u{00b7} runtime packaged" } else { "" },
  ));
  Ok(report)
}

async fn discover(config: &TesseraConfig, base_dir: &Path) -> Result<Discovered> {
  match config.build.discovery {
    Discovery::Scan => scan_sources(&base_dir.join(&config.build.source_dir), base_dir),
    Discovery::Describe => {
      let command =
        config.build.host_command.as_deref().context("build.host_command is required")?;
      describe_pages(base_dir, command, config.build.export_timeout()).await
    }
  }
}

async fn start_renderer(config: &TesseraConfig, base_dir: &Path) -> Result<RendererClient> {
  let Some(runtime) = &config.renderer.runtime_dir else {
    bail!("renderer.runtime_dir is required to build pages");
  };
  let mut options = RendererOptions::new(
    config.renderer.program.as_str(),
    RuntimeSource::Directory(base_dir.join(runtime)),
  );
  options.args.clone_from(&config.renderer.args);
  options.entry.clone_from(&config.renderer.entry);
  options.startup_timeout = config.renderer.startup_timeout();
  options.working_dir = Some(base_dir.to_path_buf());
  RendererClient::start(options).await.context("failed to start the renderer")
}

fn clear_outputs(ctx: &BuildContext) -> Result<()> {
  for dir in [ctx.client_dir(), ctx.server_dir(), ctx.pages_dir(), ctx.entries_dir()] {
    if dir.exists() {
      std::fs::remove_dir_all(&dir).with_context(|| format!("failed to clear {}", dir.display()))?;
    }
  }
  // A manifest from an earlier build would point at the assets removed above.
  let manifest = ctx.out_dir.join(MANIFEST_FILE);
  if manifest.exists() {
    std::fs::remove_file(&manifest)
      .with_context(|| format!("failed to remove {}", manifest.display()))?;
  }
  std::fs::create_dir_all(&ctx.out_dir)
    .with_context(|| format!("failed to create {}", ctx.out_dir.display()))
}

fn print_failures(failures: &[PageFailure]) {
  for failure in failures {
    let first_line = failure.message.lines().next().unwrap_or_default();
    ui::detail_fail(&format!(
      "{} ({}): {first_line}",
      failure.component_path,
      failure.stage.as_str()
    ));
  }
}

/// Write entry sources, splitting them into client and SSR build jobs.
fn generate_entries(
  ctx: &BuildContext,
  plans: Vec<PagePlan>,
  failures: &mut Vec<PageFailure>,
) -> (Vec<BuildJob>, Vec<BuildJob>) {
  let mut client_jobs = Vec::new();
  let mut ssr_jobs = Vec::new();
  for plan in plans {
    match write_page_entries(&ctx.entries_dir(), &plan) {
      Ok(entries) => {
        if let Some(server) = entries.server {
          ssr_jobs.push(BuildJob { plan: plan.clone(), entry: server });
        }
        client_jobs.push(BuildJob { plan, entry: entries.client });
      }
      Err(e) => failures.push(PageFailure {
        component_path: plan.page.component_path,
        stage: BuildStage::Entry,
        message: e.to_string(),
      }),
    }
  }
  (client_jobs, ssr_jobs)
}

/// Phases 2-7 over already discovered pages.
pub(crate) async fn run_pipeline(
  ctx: &BuildContext,
  pages: Vec<DiscoveredPage>,
) -> Result<BuildReport> {
  clear_outputs(ctx)?;
  let plans: Vec<PagePlan> = pages.into_iter().map(|p| PagePlan::new(p, &ctx.base_dir)).collect();
  let mut failures = Vec::new();

  // [2/7] Entry generation
  ui::step(2, TOTAL_STEPS, "Generating entries");
  let (client_jobs, mut ssr_jobs) = generate_entries(ctx, plans, &mut failures);
  print_failures(&failures);
  ui::detail_ok(&format!("{} client, {} server entries", client_jobs.len(), ssr_jobs.len()));
  ui::blank();

  // [3/7] Client build
  ui::step(3, TOTAL_STEPS, "Building client bundles");
  let (client_built, client_failures) = bundle_entries(ctx, BuildStage::Client, client_jobs).await;
  print_failures(&client_failures);
  failures.extend(client_failures);
  ui::detail_ok(&format!("{} built", client_built.len()));
  ui::blank();

  // [4/7] SSR build
  ui::step(4, TOTAL_STEPS, "Building SSR bundles");
  let client_ok: HashSet<&str> = client_built.iter().map(|p| p.entry_name.as_str()).collect();
  ssr_jobs.retain(|job| client_ok.contains(job.plan.entry_name.as_str()));
  let (ssr_built, ssr_failures) = bundle_entries(ctx, BuildStage::Ssr, ssr_jobs).await;
  print_failures(&ssr_failures);
  failures.extend(ssr_failures);
  let discarded = discard_server_css(&ctx.server_dir())?;
  if discarded > 0 {
    ui::detail(&format!("discarded {discarded} server stylesheet(s)"));
  }
  ui::detail_ok(&format!("{} built", ssr_built.len()));
  ui::blank();

  // [5/7] Manifest pass 1
  ui::step(5, TOTAL_STEPS, "Assembling manifest");
  let failed: HashSet<String> = failures.iter().map(|f| f.component_path.clone()).collect();
  let ready: Vec<PagePlan> =
    client_built.into_iter().filter(|p| !failed.contains(&p.page.component_path)).collect();
  let css = dedup_css(&ctx.client_dir(), ready.iter().map(|p| p.entry_name.as_str()))?;
  if !css.removed.is_empty() {
    ui::detail(&format!("deduplicated {} stylesheet(s)", css.removed.len()));
  }
  let (entries, manifest_failures) = assemble_entries(&ctx.out_dir, &ready, &css)?;
  print_failures(&manifest_failures);
  failures.extend(manifest_failures);
  if entries.is_empty() && !failures.is_empty() {
    ui::fail("every page failed to build");
    bail!("build failed: all {} page(s) failed", failures.len());
  }
  ui::detail_ok(&format!("{} entries", entries.len()));
  ui::blank();

  // [6/7] Static generation
  ui::step(6, TOTAL_STEPS, "Generating static pages");
  let statics = generate_static_pages(ctx, &ready, &entries)
    .await
    .context("static generation failed")?;
  let static_files = statics.files();
  ui::detail_ok(&format!("{static_files} HTML files"));
  ui::blank();

  // [7/7] Manifest pass 2 + packaging
  ui::step(7, TOTAL_STEPS, "Writing manifest");
  let manifest = finish_manifest(entries, statics);
  manifest.save(&ctx.out_dir).context("failed to write manifest")?;
  let size = std::fs::metadata(ctx.out_dir.join(MANIFEST_FILE)).map_or(0, |m| m.len());
  ui::detail_ok(&format!("{MANIFEST_FILE} ({})", ui::format_size(size)));
  let packaged_runtime =
    package_runtime(&ctx.out_dir, ctx.runtime_dir.as_deref(), manifest.has_ssr_entries())?;
  if packaged_runtime {
    ui::detail_ok("runtime/");
  }
  ui::blank();

  if !failures.is_empty() {
    ui::warn(&format!("{} page(s) failed and were left out of the manifest", failures.len()));
  }
  Ok(BuildReport { entries: manifest.entries.len(), static_files, failures, packaged_runtime })
}
