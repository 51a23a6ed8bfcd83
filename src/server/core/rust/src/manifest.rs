/* src/server/core/rust/src/manifest.rs */

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::TesseraError;

pub const MANIFEST_FILE: &str = "manifest.json";
/// Client bundles, served publicly under [`ASSET_PREFIX`].
pub const CLIENT_DIR: &str = "client";
pub const SERVER_DIR: &str = "server";
pub const PAGES_DIR: &str = "pages";
pub const ENTRIES_DIR: &str = ".entries";
pub const RUNTIME_DIR: &str = "runtime";
pub const ASSET_PREFIX: &str = "/assets";
pub const CHUNK_PREFIX: &str = "chunk-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageMode {
  Ssr,
  ClientOnly,
  StaticPrerender,
}

impl PageMode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ssr => "ssr",
      Self::ClientOnly => "client-only",
      Self::StaticPrerender => "static-prerender",
    }
  }

  /// Client-only and static pages ship prebuilt HTML and never need an SSR bundle at serve time.
  pub fn is_static(self) -> bool {
    !matches!(self, Self::Ssr)
  }
}

impl fmt::Display for PageMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
  pub script: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub css: Option<String>,
  #[serde(default)]
  pub chunks: Vec<String>,
  #[serde(rename = "static")]
  pub is_static: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ssr: Option<String>,
  pub mode: PageMode,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub html: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub static_routes: Option<BTreeMap<String, String>>,
}

impl ManifestEntry {
  pub fn new(mode: PageMode, script: impl Into<String>) -> Self {
    Self {
      script: script.into(),
      css: None,
      chunks: Vec::new(),
      is_static: mode.is_static(),
      ssr: None,
      mode,
      html: None,
      static_routes: None,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  #[serde(default)]
  pub entries: BTreeMap<String, ManifestEntry>,
  #[serde(default)]
  pub chunks: BTreeMap<String, String>,
}

impl Manifest {
  pub fn from_json(json: &str) -> Result<Self, TesseraError> {
    let manifest: Self = serde_json::from_str(json)?;
    manifest.check_invariants()?;
    Ok(manifest)
  }

  pub fn to_json_pretty(&self) -> Result<String, TesseraError> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Load `manifest.json` from a build output directory.
  pub fn load(out_dir: &Path) -> Result<Self, TesseraError> {
    let path = out_dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| {
      TesseraError::configuration(format!("failed to read {}: {e}", path.display()))
    })?;
    Self::from_json(&content).map_err(|e| {
      TesseraError::configuration(format!("invalid manifest {}: {e}", path.display()))
    })
  }

  pub fn save(&self, out_dir: &Path) -> Result<(), TesseraError> {
    std::fs::create_dir_all(out_dir)?;
    std::fs::write(out_dir.join(MANIFEST_FILE), self.to_json_pretty()?)?;
    Ok(())
  }

  pub fn has_ssr_entries(&self) -> bool {
    self.entries.values().any(|e| e.mode == PageMode::Ssr)
  }

  /// Check that every file the manifest references exists under `out_dir`,
  /// plus the packaged runtime when any entry renders on the server.
  pub fn verify_assets(&self, out_dir: &Path) -> Result<(), TesseraError> {
    let missing = |what: &str, name: &str, path: &Path| {
      TesseraError::configuration(format!(
        "manifest entry {name}: {what} {} does not exist",
        path.display()
      ))
    };
    for (name, entry) in &self.entries {
      let mut files: Vec<(&str, PathBuf)> = vec![("script", asset_file_path(out_dir, &entry.script))];
      if let Some(css) = &entry.css {
        files.push(("stylesheet", asset_file_path(out_dir, css)));
      }
      for chunk in &entry.chunks {
        files.push(("chunk", asset_file_path(out_dir, chunk)));
      }
      if let Some(ssr) = &entry.ssr {
        files.push(("ssr bundle", resolve_output_path(out_dir, ssr)));
      }
      if let Some(html) = &entry.html {
        files.push(("page", resolve_output_path(out_dir, html)));
      }
      for html in entry.static_routes.iter().flat_map(BTreeMap::values) {
        files.push(("static route", resolve_output_path(out_dir, html)));
      }
      if let Some((what, path)) = files.iter().find(|(_, p)| !p.is_file()) {
        return Err(missing(what, name, path));
      }
    }
    if self.has_ssr_entries() {
      let runtime = out_dir.join(RUNTIME_DIR);
      if !runtime.is_dir() {
        return Err(TesseraError::configuration(format!(
          "ssr entries present but the packaged runtime {} is missing",
          runtime.display()
        )));
      }
    }
    Ok(())
  }

  fn check_invariants(&self) -> Result<(), TesseraError> {
    for (name, entry) in &self.entries {
      if entry.is_static != entry.mode.is_static() {
        return Err(TesseraError::configuration(format!(
          "manifest entry {name}: static={} contradicts mode {}",
          entry.is_static, entry.mode
        )));
      }
      if entry.mode.is_static() && entry.ssr.is_some() {
        return Err(TesseraError::configuration(format!(
          "manifest entry {name}: {} entries must not carry an ssr bundle",
          entry.mode
        )));
      }
      if entry.static_routes.is_some() && entry.mode != PageMode::StaticPrerender {
        return Err(TesseraError::configuration(format!(
          "manifest entry {name}: staticRoutes on a {} entry",
          entry.mode
        )));
      }
    }
    Ok(())
  }
}

/// Public URL of a file in the client output directory.
pub fn asset_public_path(file: &str) -> String {
  format!("{ASSET_PREFIX}/{file}")
}

/// Default HTML location for a client-only shell or simple static page.
pub fn default_page_html(entry_name: &str) -> String {
  format!("/{PAGES_DIR}/{entry_name}/index.html")
}

/// HTML location for one dynamically enumerated static path (already normalized).
pub fn static_route_html(normalized_path: &str) -> String {
  if normalized_path == "/" {
    format!("/{PAGES_DIR}/routes/index.html")
  } else {
    format!("/{PAGES_DIR}/routes{normalized_path}/index.html")
  }
}

/// File behind a public asset URL (`/assets/x.js` -> `<out>/client/x.js`).
pub fn asset_file_path(out_dir: &Path, public_path: &str) -> PathBuf {
  let file = public_path.strip_prefix(ASSET_PREFIX).unwrap_or(public_path);
  out_dir.join(CLIENT_DIR).join(file.trim_start_matches('/'))
}

/// Map a manifest-relative path (`/pages/x/index.html`, `server/x.js`) onto the output directory.
pub fn resolve_output_path(out_dir: &Path, manifest_path: &str) -> PathBuf {
  out_dir.join(manifest_path.trim_start_matches('/'))
}

/// Files the client build produced for one entry, relative to the client directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutputs {
  pub script: String,
  pub css: Option<String>,
  /// Shared chunks the entry script imports.
  pub chunks: Vec<String>,
}

/// Shared chunk files (`chunk-*.js`) present in the client directory.
pub fn list_chunk_files(client_dir: &Path) -> Result<BTreeSet<String>, TesseraError> {
  let mut chunks = BTreeSet::new();
  let Ok(entries) = std::fs::read_dir(client_dir) else { return Ok(chunks) };
  for entry in entries {
    let entry = entry?;
    let name = entry.file_name().to_string_lossy().to_string();
    if name.starts_with(CHUNK_PREFIX) && name.ends_with(".js") {
      chunks.insert(name);
    }
  }
  Ok(chunks)
}

/// Classify the client build outputs of `entry_name`. Returns `None` when the
/// entry script is missing (the entry failed to build).
pub fn collect_entry_outputs(
  client_dir: &Path,
  entry_name: &str,
  known_chunks: &BTreeSet<String>,
) -> Result<Option<EntryOutputs>, TesseraError> {
  let script = format!("{entry_name}.js");
  let script_path = client_dir.join(&script);
  if !script_path.is_file() {
    return Ok(None);
  }
  let css = format!("{entry_name}.css");
  let css = client_dir.join(&css).is_file().then_some(css);

  let source = std::fs::read_to_string(&script_path)?;
  let chunks = referenced_chunks(&source)
    .into_iter()
    .filter(|c| known_chunks.contains(c))
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();

  Ok(Some(EntryOutputs { script, css, chunks }))
}

/// Find `chunk-<id>.js` file names mentioned in bundled JS.
fn referenced_chunks(source: &str) -> Vec<String> {
  let mut found = Vec::new();
  let mut rest = source;
  while let Some(pos) = rest.find(CHUNK_PREFIX) {
    let after = &rest[pos + CHUNK_PREFIX.len()..];
    let id_len =
      after.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_')).unwrap_or(after.len());
    if id_len > 0 && after[id_len..].starts_with(".js") {
      found.push(format!("{CHUNK_PREFIX}{}.js", &after[..id_len]));
    }
    rest = &after[id_len..];
  }
  found
}
