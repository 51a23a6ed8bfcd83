/* src/cli/core/src/build/statics.rs */

// Static generation: client-only shells, simple prerenders and the pages
// enumerated by static data loaders through the export side channel.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde_json::Value;
use tessera_server::export::{DOCUMENT_VERSION, EXPORT_ENV, ExportDocument, parse_document};
use tessera_server::html::{DocumentParts, PageAssets, assemble_document, client_only_shell};
use tessera_server::manifest::{
  SERVER_DIR, default_page_html, resolve_output_path, static_route_html,
};
use tessera_server::naming::{normalize_component_path, validate_static_path};
use tessera_server::{ManifestEntry, PageMode, TesseraError, normalize_path};

use super::assemble::StaticPages;
use super::pool::run_bounded;
use super::types::{BuildContext, PagePlan};
use crate::shell::capture_host_output;

/// One build-time render and the file it produces.
struct RenderJob {
  entry_name: String,
  bundle: String,
  props: Value,
  title: Option<String>,
  assets: PageAssets,
  /// Manifest-relative HTML path.
  html: String,
  /// Normalized request path for loader-enumerated pages.
  route: Option<String>,
}

fn write_page(out_dir: &Path, html_path: &str, document: &str) -> Result<(), TesseraError> {
  let file = resolve_output_path(out_dir, html_path);
  if let Some(parent) = file.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(file, document)?;
  Ok(())
}

/// Generate every prebuilt HTML file for the entries that built. Any failure
/// here fails the build.
pub(crate) async fn generate_static_pages(
  ctx: &BuildContext,
  plans: &[PagePlan],
  entries: &BTreeMap<String, ManifestEntry>,
) -> Result<StaticPages, TesseraError> {
  let mut statics = StaticPages::default();
  let mut jobs = Vec::new();
  let mut loader_pages = Vec::new();

  for plan in plans {
    let Some(entry) = entries.get(&plan.entry_name) else { continue };
    let assets = PageAssets::from_entry(entry);
    match plan.page.mode {
      PageMode::Ssr => {}
      PageMode::ClientOnly => {
        let html = default_page_html(&plan.entry_name);
        write_page(&ctx.out_dir, &html, &client_only_shell(plan.page.title.as_deref(), &assets))?;
        statics.html.insert(plan.entry_name.clone(), html);
      }
      PageMode::StaticPrerender if plan.page.has_static_loader => loader_pages.push(plan),
      PageMode::StaticPrerender => jobs.push(RenderJob {
        entry_name: plan.entry_name.clone(),
        bundle: server_bundle(ctx, plan),
        props: Value::Object(serde_json::Map::new()),
        title: plan.page.title.clone(),
        assets,
        html: default_page_html(&plan.entry_name),
        route: None,
      }),
    }
  }

  if !loader_pages.is_empty() {
    let exported = export_static_data(ctx).await?;
    jobs.extend(loader_jobs(ctx, &loader_pages, entries, exported)?);
  }

  let out_dir = ctx.out_dir.clone();
  let results = run_bounded(
    jobs,
    ctx.workers,
    |job| {
      let renderer = ctx.renderer.clone();
      let out_dir = out_dir.clone();
      async move {
        let rendered = renderer.render(&job.bundle, &job.props).await?;
        let document = assemble_document(&DocumentParts {
          head: &rendered.head,
          body: &rendered.body,
          title: job.title.as_deref(),
          props: Some(&job.props),
          assets: &job.assets,
        });
        write_page(&out_dir, &job.html, &document)?;
        Ok::<_, TesseraError>((job.entry_name, job.route, job.html))
      }
    },
    |panic| Err(TesseraError::renderer(format!("render worker panicked: {panic}"))),
  )
  .await;

  for result in results {
    let (entry_name, route, html) = result?;
    match route {
      Some(route) => {
        statics.routes.entry(entry_name).or_default().insert(route, html);
      }
      None => {
        statics.html.insert(entry_name, html);
      }
    }
  }
  Ok(statics)
}

fn server_bundle(ctx: &BuildContext, plan: &PagePlan) -> String {
  ctx.out_dir.join(SERVER_DIR).join(format!("{}.js", plan.entry_name)).to_string_lossy().into_owned()
}

/// Run the host once with `TESSERA_EXPORT=1` and read its export document.
async fn export_static_data(ctx: &BuildContext) -> Result<ExportDocument, TesseraError> {
  let command = ctx.host_command.as_deref().ok_or_else(|| {
    TesseraError::configuration("pages with static data loaders need build.host_command")
  })?;
  let stdout =
    capture_host_output(&ctx.base_dir, command, &[(EXPORT_ENV, "1")], ctx.export_timeout).await?;
  let doc: ExportDocument = parse_document(&stdout)?;
  if doc.version != DOCUMENT_VERSION {
    return Err(TesseraError::configuration(format!(
      "export document version {} is not supported (expected {DOCUMENT_VERSION})",
      doc.version
    )));
  }
  Ok(doc)
}

/// Validate every exported path and turn it into a render job. Paths are
/// checked across all pages before anything renders.
fn loader_jobs(
  ctx: &BuildContext,
  pages: &[&PagePlan],
  entries: &BTreeMap<String, ManifestEntry>,
  exported: ExportDocument,
) -> Result<Vec<RenderJob>, TesseraError> {
  let mut by_component: HashMap<String, Vec<_>> = HashMap::new();
  for page in exported.pages {
    by_component.entry(normalize_component_path(&page.component_path)).or_default().extend(page.entries);
  }

  let mut claimed: HashMap<String, String> = HashMap::new();
  let mut jobs = Vec::new();
  for plan in pages {
    let component = &plan.page.component_path;
    let Some(static_entries) = by_component.remove(&normalize_component_path(component)) else {
      return Err(TesseraError::configuration(format!(
        "{component} has a static data loader but is missing from the export document"
      )));
    };
    let Some(entry) = entries.get(&plan.entry_name) else { continue };
    let assets = PageAssets::from_entry(entry);

    for static_entry in static_entries {
      validate_static_path(&static_entry.path).map_err(|reason| TesseraError::PathValidation {
        component: component.clone(),
        path: static_entry.path.clone(),
        reason,
      })?;
      let route = normalize_path(&static_entry.path);
      if let Some(first) = claimed.insert(route.clone(), component.clone()) {
        return Err(TesseraError::DuplicateStaticPath {
          path: route,
          first,
          second: component.clone(),
        });
      }
      jobs.push(RenderJob {
        entry_name: plan.entry_name.clone(),
        bundle: server_bundle(ctx, plan),
        props: static_entry.props,
        title: plan.page.title.clone(),
        assets: assets.clone(),
        html: static_route_html(&route),
        route: Some(route),
      });
    }
  }
  Ok(jobs)
}
