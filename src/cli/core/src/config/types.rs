/* src/cli/core/src/config/types.rs */

use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TesseraConfig {
  pub project: ProjectConfig,
  #[serde(default)]
  pub build: BuildSection,
  #[serde(default)]
  pub renderer: RendererSection,
}

impl TesseraConfig {
  pub fn validate(&self) -> Result<()> {
    self.build.validate()?;
    self.renderer.validate()
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
  pub name: String,
}

/// How the build finds page registrations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discovery {
  /// Read `page("...")` call sites out of the host sources.
  #[default]
  Scan,
  /// Ask the host binary for its page list (`TESSERA_DESCRIBE=1`).
  Describe,
}

impl Discovery {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Scan => "scan",
      Self::Describe => "describe",
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
  #[serde(default = "default_source_dir")]
  pub source_dir: String,
  #[serde(default = "default_out_dir")]
  pub out_dir: String,
  /// Shell command starting the host binary; needed for describe discovery
  /// and for pages with static data loaders. The export timeout starts when
  /// this command is spawned, so it should run an already built binary.
  pub host_command: Option<String>,
  #[serde(default)]
  pub discovery: Discovery,
  #[serde(default = "default_export_timeout_secs")]
  pub export_timeout_secs: u64,
  pub workers: Option<usize>,
}

impl Default for BuildSection {
  fn default() -> Self {
    Self {
      source_dir: default_source_dir(),
      out_dir: default_out_dir(),
      host_command: None,
      discovery: Discovery::default(),
      export_timeout_secs: default_export_timeout_secs(),
      workers: None,
    }
  }
}

impl BuildSection {
  pub fn validate(&self) -> Result<()> {
    if self.workers == Some(0) {
      bail!("build.workers must be greater than 0");
    }
    if self.export_timeout_secs == 0 {
      bail!("build.export_timeout_secs must be greater than 0");
    }
    if self.discovery == Discovery::Describe && self.host_command.is_none() {
      bail!("build.discovery = \"describe\" requires build.host_command");
    }
    Ok(())
  }

  /// Size of the per-phase worker pool.
  pub fn workers(&self) -> usize {
    self
      .workers
      .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, NonZeroUsize::get))
  }

  pub fn export_timeout(&self) -> Duration {
    Duration::from_secs(self.export_timeout_secs)
  }

  /// Warn when the host command compiles before running, since that compile
  /// counts against the export timeout.
  pub fn host_command_warning(&self) -> Option<String> {
    let command = self.host_command.as_deref()?.trim_start();
    let mut words = command.split_whitespace();
    if words.next() != Some("cargo") || words.next() != Some("run") {
      return None;
    }
    Some(format!(
      "build.host_command `{command}` compiles the host inside the {}s export timeout; \
       point it at a prebuilt binary (for example ./target/debug/<name>)",
      self.export_timeout_secs
    ))
  }
}

fn default_source_dir() -> String {
  "src".to_string()
}

fn default_out_dir() -> String {
  ".tessera/output".to_string()
}

fn default_export_timeout_secs() -> u64 {
  90
}

#[derive(Debug, Clone, Deserialize)]
pub struct RendererSection {
  #[serde(default = "default_program")]
  pub program: String,
  /// Rendering runtime directory, relative to the project root.
  pub runtime_dir: Option<String>,
  #[serde(default = "default_entry")]
  pub entry: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default = "default_startup_timeout_secs")]
  pub startup_timeout_secs: u64,
}

impl Default for RendererSection {
  fn default() -> Self {
    Self {
      program: default_program(),
      runtime_dir: None,
      entry: default_entry(),
      args: Vec::new(),
      startup_timeout_secs: default_startup_timeout_secs(),
    }
  }
}

impl RendererSection {
  pub fn validate(&self) -> Result<()> {
    if self.program.trim().is_empty() {
      bail!("renderer.program must not be empty");
    }
    if self.startup_timeout_secs == 0 {
      bail!("renderer.startup_timeout_secs must be greater than 0");
    }
    Ok(())
  }

  pub fn startup_timeout(&self) -> Duration {
    Duration::from_secs(self.startup_timeout_secs)
  }
}

fn default_program() -> String {
  "bun".to_string()
}

fn default_entry() -> String {
  "index.js".to_string()
}

fn default_startup_timeout_secs() -> u64 {
  10
}
