/* src/cli/core/src/build/types.rs */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tessera_server::manifest::{CLIENT_DIR, ENTRIES_DIR, PAGES_DIR, SERVER_DIR};
use tessera_server::{PageMode, Renderer, entry_name_for_path};

/// One page registration found by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPage {
  pub component_path: String,
  pub mode: PageMode,
  pub has_static_loader: bool,
  /// Emitted into the prebuilt shell's `<title>`.
  pub title: Option<String>,
}

/// A discovered page with its derived build names.
#[derive(Debug, Clone)]
pub(crate) struct PagePlan {
  pub page: DiscoveredPage,
  pub entry_name: String,
  /// Component source resolved against the project root.
  pub component: PathBuf,
}

impl PagePlan {
  pub fn new(page: DiscoveredPage, base_dir: &Path) -> Self {
    let entry_name = entry_name_for_path(&page.component_path);
    let component = base_dir.join(&page.component_path);
    Self { page, entry_name, component }
  }
}

/// Everything a build phase needs besides its inputs.
#[derive(Clone)]
pub struct BuildContext {
  pub base_dir: PathBuf,
  pub out_dir: PathBuf,
  pub renderer: Arc<dyn Renderer>,
  pub workers: usize,
  pub host_command: Option<String>,
  pub export_timeout: Duration,
  /// Rendering runtime packaged when an ssr entry exists.
  pub runtime_dir: Option<PathBuf>,
}

impl BuildContext {
  pub fn client_dir(&self) -> PathBuf {
    self.out_dir.join(CLIENT_DIR)
  }

  pub fn server_dir(&self) -> PathBuf {
    self.out_dir.join(SERVER_DIR)
  }

  pub fn entries_dir(&self) -> PathBuf {
    self.out_dir.join(ENTRIES_DIR)
  }

  pub fn pages_dir(&self) -> PathBuf {
    self.out_dir.join(PAGES_DIR)
  }
}

/// Build phase a page failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
  Entry,
  Client,
  Ssr,
}

impl BuildStage {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Entry => "entry generation",
      Self::Client => "client build",
      Self::Ssr => "ssr build",
    }
  }
}

#[derive(Debug, Clone)]
pub struct PageFailure {
  pub component_path: String,
  pub stage: BuildStage,
  pub message: String,
}

#[derive(Debug, Default)]
pub struct BuildReport {
  /// Manifest entries written.
  pub entries: usize,
  /// HTML files written by static generation.
  pub static_files: usize,
  pub failures: Vec<PageFailure>,
  pub packaged_runtime: bool,
}
