/* src/server/core/rust/src/handler/render.rs */

use serde_json::Value;

use super::{PageHandler, PageResponse};
use crate::cache::cache_key;
use crate::errors::{as_redirect, LoaderError, RenderError, TesseraError};
use crate::html::{assemble_document, DocumentParts, PageAssets};
use crate::manifest::{resolve_output_path, ManifestEntry};
use crate::naming::normalize_path;
use crate::page::PageRequest;
use crate::renderer::RenderedPage;

/// Props resolution either yields props or ends the request early.
enum Props {
  Ready(Value),
  Respond(PageResponse),
}

impl PageHandler {
  pub(super) async fn render_ssr(
    &self,
    req: &PageRequest,
    entry: Option<&ManifestEntry>,
  ) -> PageResponse {
    let props = match &self.page.props_loader {
      Some(loader) => match loader(req.clone()).await {
        Ok(props) => props,
        Err(err) => return self.loader_failure(&err, "props loader"),
      },
      None => Value::Object(serde_json::Map::new()),
    };
    self.render_document(entry, props).await
  }

  /// Development rendering of a static page: props come from the static data
  /// loader entry matching the request path.
  pub(super) async fn render_static(
    &self,
    req: &PageRequest,
    entry: Option<&ManifestEntry>,
  ) -> PageResponse {
    match self.static_props(req).await {
      Props::Ready(props) => self.render_document(entry, props).await,
      Props::Respond(response) => response,
    }
  }

  async fn static_props(&self, req: &PageRequest) -> Props {
    let Some(loader) = &self.page.static_loader else {
      return Props::Ready(Value::Object(serde_json::Map::new()));
    };
    let entries = match loader().await {
      Ok(entries) => entries,
      Err(err) => return Props::Respond(self.loader_failure(&err, "static data loader")),
    };
    let wanted = normalize_path(&req.path);
    match entries.into_iter().find(|e| normalize_path(&e.path) == wanted) {
      Some(found) => Props::Ready(found.props),
      None => Props::Respond(PageResponse::NotFound),
    }
  }

  fn loader_failure(&self, err: &LoaderError, what: &str) -> PageResponse {
    if let Some(redirect) = as_redirect(err) {
      return PageResponse::Redirect {
        location: redirect.location().to_string(),
        status: redirect.status(),
      };
    }
    self.error_response(&TesseraError::Render(RenderError::new(format!("{what} failed: {err}"))))
  }

  /// Component source in development, the SSR bundle in production.
  fn render_target(&self, entry: Option<&ManifestEntry>) -> Result<String, TesseraError> {
    if self.ctx.config.dev {
      let source = self.ctx.config.project_root.join(&self.page.component_path);
      return Ok(source.to_string_lossy().into_owned());
    }
    let ssr = entry.and_then(|e| e.ssr.as_deref()).ok_or_else(|| {
      TesseraError::configuration(format!("no ssr bundle for {}", self.page.component_path))
    })?;
    let bundle = resolve_output_path(&self.ctx.out_dir, ssr);
    if !bundle.is_file() {
      return Err(TesseraError::configuration(format!(
        "ssr bundle {} is missing",
        bundle.display()
      )));
    }
    Ok(bundle.to_string_lossy().into_owned())
  }

  async fn render_cached(&self, target: &str, props: &Value) -> Result<RenderedPage, TesseraError> {
    let renderer =
      self.ctx.renderer.as_ref().ok_or_else(|| TesseraError::configuration("no renderer available"))?;
    let key = cache_key(target, props);
    if let Some(hit) = self.ctx.cache.get(&key) {
      return Ok(hit);
    }
    let rendered = renderer.render(target, props).await?;
    self.ctx.cache.insert(key, rendered.clone());
    Ok(rendered)
  }

  async fn render_document(&self, entry: Option<&ManifestEntry>, props: Value) -> PageResponse {
    let rendered = match self.render_target(entry) {
      Ok(target) => self.render_cached(&target, &props).await,
      Err(err) => Err(err),
    };
    let rendered = match rendered {
      Ok(rendered) => rendered,
      Err(err) => return self.error_response(&err),
    };
    let assets = entry.map(PageAssets::from_entry).unwrap_or_default();
    PageResponse::ok(assemble_document(&DocumentParts {
      head: &rendered.head,
      body: &rendered.body,
      title: self.page.title.as_deref(),
      props: Some(&props),
      assets: &assets,
    }))
  }
}
