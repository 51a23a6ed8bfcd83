/* src/server/core/rust/src/handler/mod.rs */

//! Per-page request handling: decide, set up, render, assemble.

mod render;
mod setup;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;

use crate::cache::RenderCache;
use crate::config::ServeConfig;
use crate::decision::{Action, DecisionInput, decide};
use crate::errors::TesseraError;
use crate::html::{client_only_shell, dev_error_page, prod_error_page, PageAssets};
use crate::manifest::{default_page_html, resolve_output_path, Manifest, ManifestEntry};
use crate::naming::entry_name_for_path;
use crate::page::{PageConfig, PageRequest};
use crate::renderer::Renderer;

/// What the HTTP layer should send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResponse {
  Html { status: u16, body: String },
  /// A prebuilt file inside the output directory.
  File { path: PathBuf },
  Redirect { location: String, status: u16 },
  NotFound,
}

impl PageResponse {
  pub fn status(&self) -> u16 {
    match self {
      Self::Html { status, .. } | Self::Redirect { status, .. } => *status,
      Self::File { .. } => 200,
      Self::NotFound => 404,
    }
  }

  fn ok(body: String) -> Self {
    Self::Html { status: 200, body }
  }
}

/// State shared by every page handler of one serving process.
pub struct ServeContext {
  pub config: ServeConfig,
  out_dir: PathBuf,
  manifest: Option<Manifest>,
  renderer: Option<Arc<dyn Renderer>>,
  cache: RenderCache,
}

impl ServeContext {
  /// Production loads the manifest and checks every referenced asset before
  /// serving; development starts empty and builds pages on first request.
  pub fn bootstrap(
    config: ServeConfig,
    renderer: Option<Arc<dyn Renderer>>,
  ) -> Result<Self, TesseraError> {
    let out_dir = config.out_dir();
    let manifest = if config.dev {
      None
    } else {
      let manifest = Manifest::load(&out_dir)?;
      manifest.verify_assets(&out_dir)?;
      if manifest.has_ssr_entries() && renderer.is_none() {
        return Err(TesseraError::configuration(
          "manifest has ssr entries but no renderer is available",
        ));
      }
      tracing::info!(entries = manifest.entries.len(), out_dir = %out_dir.display(), "manifest loaded");
      Some(manifest)
    };
    Ok(Self::with_manifest(config, manifest, renderer))
  }

  /// Assemble a context without touching the filesystem.
  pub fn with_manifest(
    config: ServeConfig,
    manifest: Option<Manifest>,
    renderer: Option<Arc<dyn Renderer>>,
  ) -> Self {
    let out_dir = config.out_dir();
    let cache = RenderCache::new(config.render_cache_ttl);
    Self { config, out_dir, manifest, renderer, cache }
  }

  pub fn out_dir(&self) -> &std::path::Path {
    &self.out_dir
  }

  pub fn manifest(&self) -> Option<&Manifest> {
    self.manifest.as_ref()
  }

  pub fn renderer(&self) -> Option<&Arc<dyn Renderer>> {
    self.renderer.as_ref()
  }

  pub fn cache(&self) -> &RenderCache {
    &self.cache
  }
}

/// Cached outcome of a page's one-shot development setup.
type SetupResult = Result<ManifestEntry, Arc<TesseraError>>;

/// Serves every route bound to one page config.
pub struct PageHandler {
  ctx: Arc<ServeContext>,
  page: Arc<PageConfig>,
  entry_name: String,
  setup: OnceCell<SetupResult>,
}

impl PageHandler {
  pub fn new(ctx: Arc<ServeContext>, page: Arc<PageConfig>) -> Self {
    let entry_name = entry_name_for_path(&page.component_path);
    Self { ctx, page, entry_name, setup: OnceCell::new() }
  }

  pub fn entry_name(&self) -> &str {
    &self.entry_name
  }

  pub fn page(&self) -> &PageConfig {
    &self.page
  }

  pub async fn handle(&self, req: PageRequest) -> PageResponse {
    let started = Instant::now();
    let response = self.respond(&req).await;
    tracing::info!(
      component = %self.page.component_path,
      path = %req.path,
      status = response.status(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "page request"
    );
    response
  }

  fn manifest_entry(&self) -> Option<&ManifestEntry> {
    if self.ctx.config.dev {
      self.setup.get().and_then(|r| r.as_ref().ok())
    } else {
      self.ctx.manifest.as_ref().and_then(|m| m.entries.get(&self.entry_name))
    }
  }

  /// `/pages/<entry>/index.html` when that file was built, else empty.
  fn fallback_static_path(&self) -> String {
    if self.ctx.config.dev {
      return String::new();
    }
    let path = default_page_html(&self.entry_name);
    if resolve_output_path(&self.ctx.out_dir, &path).is_file() { path } else { String::new() }
  }

  async fn respond(&self, req: &PageRequest) -> PageResponse {
    let static_path = self.fallback_static_path();
    let entry = self.manifest_entry();
    let input = DecisionInput {
      is_dev: self.ctx.config.dev,
      mode: self.page.mode,
      request_path: &req.path,
      has_manifest: entry.is_some(),
      entry_name: &self.entry_name,
      static_path: &static_path,
      has_renderer: self.ctx.renderer.is_some(),
      entry,
    };
    let action = decide(&input);
    tracing::debug!(component = %self.page.component_path, ?action, "page decision");

    match action {
      Action::NeedsSetup => match self.run_setup().await {
        Ok(entry) => self.render_action(req, Some(entry), setup_followup(&input, entry)).await,
        Err(err) => self.error_response(&err),
      },
      other => self.render_action(req, entry, other).await,
    }
  }

  async fn render_action(
    &self,
    req: &PageRequest,
    entry: Option<&ManifestEntry>,
    action: Action,
  ) -> PageResponse {
    match action {
      Action::ServeStaticFile(path) | Action::ServeRouteFile(path) => {
        PageResponse::File { path: resolve_output_path(&self.ctx.out_dir, &path) }
      }
      Action::NotFound => PageResponse::NotFound,
      Action::RenderClientOnlyShell => {
        let assets = entry.map(PageAssets::from_entry).unwrap_or_default();
        PageResponse::ok(client_only_shell(self.page.title.as_deref(), &assets))
      }
      Action::RenderStaticPrerender => self.render_static(req, entry).await,
      Action::RenderSsr => self.render_ssr(req, entry).await,
      // A completed setup never asks for another.
      Action::NeedsSetup => PageResponse::NotFound,
    }
  }

  fn error_response(&self, err: &TesseraError) -> PageResponse {
    tracing::error!(component = %self.page.component_path, error = %err, "page request failed");
    let body = if self.ctx.config.dev {
      dev_error_page(&self.page.component_path, err)
    } else {
      prod_error_page(500)
    };
    PageResponse::Html { status: 500, body }
  }
}

/// Re-decide once the page's bundle exists.
fn setup_followup(input: &DecisionInput<'_>, entry: &ManifestEntry) -> Action {
  decide(&DecisionInput { has_manifest: true, entry: Some(entry), ..*input })
}

#[cfg(test)]
mod tests;
