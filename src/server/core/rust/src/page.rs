/* src/server/core/rust/src/page.rs */

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::LoaderError;
use crate::manifest::PageMode;
use crate::renderer::BoxFuture;

/// Request context handed to a props loader.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
  /// Request path as received, e.g. "/blog/hello/".
  pub path: String,
  /// Route captures, e.g. `{ "slug": "hello" }` for "/blog/{slug}".
  pub params: HashMap<String, String>,
  pub query: HashMap<String, String>,
  /// Header names are lowercase.
  pub headers: HashMap<String, String>,
}

impl PageRequest {
  pub fn new(path: impl Into<String>) -> Self {
    Self { path: path.into(), ..Default::default() }
  }

  pub fn param(&self, name: &str) -> Option<&str> {
    self.params.get(name).map(String::as_str)
  }
}

/// One prerendered path produced by a static data loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticEntry {
  pub path: String,
  #[serde(default)]
  pub props: serde_json::Value,
}

impl StaticEntry {
  pub fn new(path: impl Into<String>, props: serde_json::Value) -> Self {
    Self { path: path.into(), props }
  }
}

pub type PropsLoaderFn =
  Arc<dyn Fn(PageRequest) -> BoxFuture<'static, Result<serde_json::Value, LoaderError>> + Send + Sync>;
pub type StaticDataLoaderFn =
  Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<StaticEntry>, LoaderError>> + Send + Sync>;

/// A page component and how it renders. Immutable once registered.
#[derive(Clone)]
pub struct PageConfig {
  pub component_path: String,
  pub mode: PageMode,
  pub props_loader: Option<PropsLoaderFn>,
  pub static_loader: Option<StaticDataLoaderFn>,
  /// Emitted as `<title>` when the rendered head has none.
  pub title: Option<String>,
}

/// Start a page definition for the component at `component_path` (relative to the project root).
/// Pages are server-rendered unless an option says otherwise.
pub fn page(component_path: impl Into<String>) -> PageConfig {
  PageConfig {
    component_path: component_path.into(),
    mode: PageMode::Ssr,
    props_loader: None,
    static_loader: None,
    title: None,
  }
}

impl PageConfig {
  /// Serve a static shell and mount the component in the browser only.
  pub fn client_only(mut self) -> Self {
    self.mode = PageMode::ClientOnly;
    self.static_loader = None;
    self
  }

  /// Render once at build time with empty props.
  pub fn static_prerender(mut self) -> Self {
    self.mode = PageMode::StaticPrerender;
    self
  }

  /// Render at build time once per entry returned by `loader`.
  pub fn static_paths<F, Fut>(mut self, loader: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<StaticEntry>, LoaderError>> + Send + 'static,
  {
    self.mode = PageMode::StaticPrerender;
    self.static_loader = Some(Arc::new(move || Box::pin(loader())));
    self
  }

  /// Per-request props for server-rendered pages.
  pub fn props<F, Fut>(mut self, loader: F) -> Self
  where
    F: Fn(PageRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, LoaderError>> + Send + 'static,
  {
    self.props_loader = Some(Arc::new(move |req| Box::pin(loader(req))));
    self
  }

  pub fn title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  pub fn has_static_loader(&self) -> bool {
    self.static_loader.is_some()
  }
}

impl std::fmt::Debug for PageConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PageConfig")
      .field("component_path", &self.component_path)
      .field("mode", &self.mode)
      .field("props_loader", &self.props_loader.is_some())
      .field("static_loader", &self.static_loader.is_some())
      .field("title", &self.title)
      .finish()
  }
}
