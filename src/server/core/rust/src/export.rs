/* src/server/core/rust/src/export.rs */

//! Build-time side channels of the host binary.
//!
//! The build tool runs the host a second time with one of these flags set.
//! Instead of serving, the host writes a single JSON document to stdout and
//! exits: `TESSERA_EXPORT` evaluates every static data loader,
//! `TESSERA_DESCRIBE` lists the registered pages.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::errors::TesseraError;
use crate::manifest::PageMode;
use crate::page::StaticEntry;
use crate::server::Pages;

pub const EXPORT_ENV: &str = "TESSERA_EXPORT";
pub const DESCRIBE_ENV: &str = "TESSERA_DESCRIBE";
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedPage {
  pub component_path: String,
  pub entries: Vec<StaticEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
  pub version: u32,
  pub pages: Vec<ExportedPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
  pub component_path: String,
  pub mode: PageMode,
  pub has_static_loader: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeDocument {
  pub version: u32,
  pub pages: Vec<PageDescriptor>,
}

/// Which side channel, if any, this process was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
  Export,
  Describe,
}

impl BuildMode {
  pub fn from_env() -> Option<Self> {
    if env_flag(EXPORT_ENV) {
      Some(Self::Export)
    } else if env_flag(DESCRIBE_ENV) {
      Some(Self::Describe)
    } else {
      None
    }
  }
}

pub(crate) fn env_flag(name: &str) -> bool {
  std::env::var(name).is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

/// Parse a side-channel document from captured stdout. When the host logged
/// other lines too, the last line holding a versioned document is used.
pub fn parse_document<T: serde::de::DeserializeOwned>(stdout: &str) -> Result<T, TesseraError> {
  if let Ok(doc) = serde_json::from_str::<T>(stdout.trim()) {
    return Ok(doc);
  }
  let line = stdout
    .lines()
    .rev()
    .map(str::trim)
    .find(|l| l.starts_with("{\"version\""))
    .ok_or_else(|| TesseraError::renderer("host output contained no side-channel document"))?;
  Ok(serde_json::from_str(line)?)
}

impl Pages {
  /// Evaluate every static data loader, in component-path order.
  pub async fn export_static_data(&self) -> Result<ExportDocument, TesseraError> {
    let mut pages = Vec::new();
    for config in self.configs() {
      let Some(loader) = &config.static_loader else { continue };
      let entries = loader().await.map_err(|e| {
        TesseraError::configuration(format!(
          "static data loader for {} failed: {e}",
          config.component_path
        ))
      })?;
      pages.push(ExportedPage { component_path: config.component_path.clone(), entries });
    }
    Ok(ExportDocument { version: DOCUMENT_VERSION, pages })
  }

  pub fn describe(&self) -> DescribeDocument {
    let pages = self
      .configs()
      .map(|c| PageDescriptor {
        component_path: c.component_path.clone(),
        mode: c.mode,
        has_static_loader: c.has_static_loader(),
        title: c.title.clone(),
      })
      .collect();
    DescribeDocument { version: DOCUMENT_VERSION, pages }
  }

  /// Answer a build-time side channel if this process was started for one.
  /// Returns `true` when a document was written; the host must then exit
  /// instead of serving. Call only after every page is registered.
  pub async fn run_build_mode(&self) -> Result<bool, TesseraError> {
    let Some(mode) = BuildMode::from_env() else { return Ok(false) };
    let json = match mode {
      BuildMode::Export => serde_json::to_string(&self.export_static_data().await?)?,
      BuildMode::Describe => serde_json::to_string(&self.describe())?,
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(json.as_bytes())?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(true)
  }
}
