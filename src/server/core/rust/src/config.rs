/* src/server/core/rust/src/config.rs */

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::TesseraError;
use crate::manifest::RUNTIME_DIR;

pub const DEV_ENV: &str = "TESSERA_DEV";
pub const OUTPUT_DIR_ENV: &str = "TESSERA_OUTPUT_DIR";
pub const PROJECT_ROOT_ENV: &str = "TESSERA_PROJECT_ROOT";
pub const RENDERER_PROGRAM_ENV: &str = "TESSERA_RENDERER_PROGRAM";
pub const RENDERER_RUNTIME_ENV: &str = "TESSERA_RENDERER_RUNTIME";
pub const RENDER_CACHE_TTL_ENV: &str = "TESSERA_RENDER_CACHE_TTL_MS";

pub const DEFAULT_OUTPUT_DIR: &str = ".tessera/output";
pub const DEFAULT_RENDERER_PROGRAM: &str = "bun";
pub const DEFAULT_RENDER_CACHE_TTL: Duration = Duration::from_secs(60);

/// Runtime settings of a serving process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
  /// Development decision tree: source-direct rendering, lazy per-page builds.
  pub dev: bool,
  pub project_root: PathBuf,
  /// Build output directory (absolute, or relative to `project_root`).
  pub output_dir: PathBuf,
  pub renderer_program: String,
  /// Runtime directory for the renderer. Production defaults to the packaged
  /// `runtime/` inside the output directory.
  pub renderer_runtime: Option<PathBuf>,
  pub render_cache_ttl: Duration,
}

impl Default for ServeConfig {
  fn default() -> Self {
    Self {
      dev: false,
      project_root: PathBuf::from("."),
      output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
      renderer_program: DEFAULT_RENDERER_PROGRAM.to_string(),
      renderer_runtime: None,
      render_cache_ttl: DEFAULT_RENDER_CACHE_TTL,
    }
  }
}

impl ServeConfig {
  pub fn from_env() -> Result<Self, TesseraError> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Build from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TesseraError> {
    let dev = lookup(DEV_ENV).is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"));
    let project_root = lookup(PROJECT_ROOT_ENV).map_or_else(|| PathBuf::from("."), PathBuf::from);
    let output_dir = lookup(OUTPUT_DIR_ENV).map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from);
    let renderer_program =
      lookup(RENDERER_PROGRAM_ENV).unwrap_or_else(|| DEFAULT_RENDERER_PROGRAM.to_string());
    let renderer_runtime = lookup(RENDERER_RUNTIME_ENV).map(PathBuf::from);
    let render_cache_ttl = match lookup(RENDER_CACHE_TTL_ENV) {
      Some(raw) => Duration::from_millis(raw.trim().parse().map_err(|_| {
        TesseraError::configuration(format!("{RENDER_CACHE_TTL_ENV} must be milliseconds, got {raw:?}"))
      })?),
      None if dev => Duration::ZERO,
      None => DEFAULT_RENDER_CACHE_TTL,
    };
    Ok(Self { dev, project_root, output_dir, renderer_program, renderer_runtime, render_cache_ttl })
  }

  /// Output directory resolved against the project root.
  pub fn out_dir(&self) -> PathBuf {
    if self.output_dir.is_absolute() {
      self.output_dir.clone()
    } else {
      self.project_root.join(&self.output_dir)
    }
  }

  /// Runtime directory to start the renderer from, if one is configured.
  pub fn runtime_dir(&self) -> Option<PathBuf> {
    match &self.renderer_runtime {
      Some(dir) if dir.is_absolute() => Some(dir.clone()),
      Some(dir) => Some(self.project_root.join(dir)),
      None if self.dev => None,
      None => Some(self.out_dir().join(RUNTIME_DIR)),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
      vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |name| map.get(name).cloned()
  }

  #[test]
  fn production_defaults() {
    let config = ServeConfig::from_lookup(lookup(&[])).unwrap();
    assert!(!config.dev);
    assert_eq!(config.out_dir(), PathBuf::from("./.tessera/output"));
    assert_eq!(config.render_cache_ttl, DEFAULT_RENDER_CACHE_TTL);
    assert_eq!(config.runtime_dir(), Some(PathBuf::from("./.tessera/output/runtime")));
  }

  #[test]
  fn dev_disables_cache_by_default() {
    let config = ServeConfig::from_lookup(lookup(&[(DEV_ENV, "1")])).unwrap();
    assert!(config.dev);
    assert_eq!(config.render_cache_ttl, Duration::ZERO);
    assert_eq!(config.runtime_dir(), None);
  }

  #[test]
  fn explicit_values_win() {
    let config = ServeConfig::from_lookup(lookup(&[
      (DEV_ENV, "true"),
      (PROJECT_ROOT_ENV, "/app"),
      (OUTPUT_DIR_ENV, "/srv/out"),
      (RENDERER_RUNTIME_ENV, "node_modules/@tessera/runtime"),
      (RENDER_CACHE_TTL_ENV, "250"),
    ]))
    .unwrap();
    assert_eq!(config.out_dir(), PathBuf::from("/srv/out"));
    assert_eq!(config.runtime_dir(), Some(PathBuf::from("/app/node_modules/@tessera/runtime")));
    assert_eq!(config.render_cache_ttl, Duration::from_millis(250));
  }

  #[test]
  fn rejects_bad_ttl() {
    let err = ServeConfig::from_lookup(lookup(&[(RENDER_CACHE_TTL_ENV, "soon")])).unwrap_err();
    assert!(matches!(err, TesseraError::Configuration(_)));
  }
}
