/* src/cli/core/src/config/loader.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::types::TesseraConfig;

pub const CONFIG_FILE: &str = "tessera.toml";

/// Find `tessera.toml` in `start` or the nearest ancestor holding one.
pub fn find_tessera_config(start: &Path) -> Result<PathBuf> {
  let mut dir =
    start.canonicalize().with_context(|| format!("failed to canonicalize {}", start.display()))?;
  loop {
    let candidate = dir.join(CONFIG_FILE);
    if candidate.is_file() {
      return Ok(candidate);
    }
    if !dir.pop() {
      bail!("{CONFIG_FILE} not found (searched upward from {})", start.display());
    }
  }
}

pub fn parse_tessera_config(content: &str) -> Result<TesseraConfig> {
  let config: TesseraConfig = toml::from_str(content)?;
  config.validate()?;
  Ok(config)
}

pub fn load_tessera_config(path: &Path) -> Result<TesseraConfig> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  parse_tessera_config(&content).with_context(|| format!("invalid {}", path.display()))
}
