/* src/server/core/rust/src/renderer.rs */

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::errors::TesseraError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Output of one component render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
  pub body: String,
  pub head: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
  Browser,
  Ssr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub entrypoints: Vec<PathBuf>,
  pub outdir: PathBuf,
  pub target: BuildTarget,
  /// Output naming pattern, e.g. the entry name for a single-entry build.
  pub entry_names: Option<String>,
}

/// The external rendering runtime, as seen by the build pipeline and the page handler.
pub trait Renderer: Send + Sync {
  /// Render the component (or SSR bundle) at `path` with `props`.
  fn render<'a>(
    &'a self,
    path: &'a str,
    props: &'a serde_json::Value,
  ) -> BoxFuture<'a, Result<RenderedPage, TesseraError>>;

  fn build(&self, request: BuildRequest) -> BoxFuture<'_, Result<(), TesseraError>>;

  /// Browser build of `entrypoints` into `outdir`, named by `entry_names`.
  fn build_client(
    &self,
    entrypoints: Vec<PathBuf>,
    outdir: PathBuf,
    entry_names: Option<String>,
  ) -> BoxFuture<'_, Result<(), TesseraError>> {
    self.build(BuildRequest { entrypoints, outdir, target: BuildTarget::Browser, entry_names })
  }

  fn build_ssr(
    &self,
    entrypoints: Vec<PathBuf>,
    outdir: PathBuf,
  ) -> BoxFuture<'_, Result<(), TesseraError>> {
    self.build(BuildRequest { entrypoints, outdir, target: BuildTarget::Ssr, entry_names: None })
  }
}
