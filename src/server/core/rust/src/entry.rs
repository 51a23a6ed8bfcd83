/* src/server/core/rust/src/entry.rs */

//! Synthesized entry sources handed to the renderer's bundler.
//! Each entry is a few lines of JS importing the page component by absolute path.

use std::path::{Path, PathBuf};

use crate::errors::TesseraError;
use crate::manifest::PageMode;

/// Element the page component mounts into.
pub const ROOT_ID: &str = "root";
/// Script element carrying the server-embedded props.
pub const PROPS_ID: &str = "__tessera_props";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
  /// Browser entry that hydrates server-rendered markup with embedded props.
  Hydrate,
  /// Browser entry that mounts into an empty shell.
  ClientOnly,
  /// Re-exports the component unchanged, for bundling it directly for SSR.
  BareImport,
  /// Server entry exporting `render(props)`.
  Server,
}

impl EntryKind {
  /// Browser entry kind for a page mode.
  pub fn client_for(mode: PageMode) -> Self {
    match mode {
      PageMode::ClientOnly => Self::ClientOnly,
      PageMode::Ssr | PageMode::StaticPrerender => Self::Hydrate,
    }
  }

  /// Subdirectory of the entries directory holding this kind. Browser and
  /// server entries of one page share a file name, so bundled outputs are
  /// named after the entry.
  pub fn target_dir(self) -> &'static str {
    match self {
      Self::Hydrate | Self::ClientOnly => "client",
      Self::BareImport | Self::Server => "server",
    }
  }
}

fn js_string(value: &str) -> String {
  serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn read_props_snippet() -> String {
  format!(
    "const propsEl = document.getElementById({});\n\
     const props = propsEl ? JSON.parse(propsEl.textContent || \"{{}}\") : {{}};\n",
    js_string(PROPS_ID)
  )
}

/// Generate the source text of an entry importing `component`.
pub fn entry_source(kind: EntryKind, component: &Path) -> String {
  let import = js_string(&component.to_string_lossy().replace('\\', "/"));
  let root = js_string(ROOT_ID);
  match kind {
    EntryKind::Hydrate => format!(
      "import {{ createElement }} from \"react\";\n\
       import {{ hydrateRoot }} from \"react-dom/client\";\n\
       import Page from {import};\n\
       {}\
       hydrateRoot(document.getElementById({root}), createElement(Page, props));\n",
      read_props_snippet()
    ),
    EntryKind::ClientOnly => format!(
      "import {{ createElement }} from \"react\";\n\
       import {{ createRoot }} from \"react-dom/client\";\n\
       import Page from {import};\n\
       {}\
       createRoot(document.getElementById({root})).render(createElement(Page, props));\n",
      read_props_snippet()
    ),
    EntryKind::BareImport => format!("export {{ default }} from {import};\n"),
    EntryKind::Server => format!(
      "import {{ createElement }} from \"react\";\n\
       import {{ renderToString }} from \"react-dom/server\";\n\
       import Page from {import};\n\
       export function render(props) {{\n\
       \x20 return renderToString(createElement(Page, props ?? {{}}));\n\
       }}\n\
       export default render;\n"
    ),
  }
}

/// Write the entry source for `entry_name` under `entries_dir`, returning its
/// path (`<entries_dir>/<client|server>/<entry_name>.js`).
pub fn write_entry(
  entries_dir: &Path,
  entry_name: &str,
  kind: EntryKind,
  component: &Path,
) -> Result<PathBuf, TesseraError> {
  let dir = entries_dir.join(kind.target_dir());
  std::fs::create_dir_all(&dir)?;
  let path = dir.join(format!("{entry_name}.js"));
  std::fs::write(&path, entry_source(kind, component))?;
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hydrate_entry_reads_props_and_hydrates() {
    let src = entry_source(EntryKind::Hydrate, Path::new("/app/src/pages/Home.tsx"));
    assert!(src.contains("import Page from \"/app/src/pages/Home.tsx\";"));
    assert!(src.contains("hydrateRoot(document.getElementById(\"root\")"));
    assert!(src.contains("getElementById(\"__tessera_props\")"));
  }

  #[test]
  fn client_only_entry_mounts_without_hydration() {
    let src = entry_source(EntryKind::ClientOnly, Path::new("/app/App.tsx"));
    assert!(src.contains("createRoot("));
    assert!(!src.contains("hydrateRoot"));
  }

  #[test]
  fn server_entry_exports_render() {
    let src = entry_source(EntryKind::Server, Path::new("/app/Post.tsx"));
    assert!(src.contains("export function render(props)"));
    assert!(src.contains("renderToString"));
  }

  #[test]
  fn import_path_is_quoted_safely() {
    let src = entry_source(EntryKind::BareImport, Path::new("/app/we\"ird.tsx"));
    assert_eq!(src, "export { default } from \"/app/we\\\"ird.tsx\";\n");
  }

  #[test]
  fn client_kind_follows_mode() {
    assert_eq!(EntryKind::client_for(PageMode::ClientOnly), EntryKind::ClientOnly);
    assert_eq!(EntryKind::client_for(PageMode::Ssr), EntryKind::Hydrate);
    assert_eq!(EntryKind::client_for(PageMode::StaticPrerender), EntryKind::Hydrate);
  }

  #[test]
  fn write_entry_names_file_by_kind() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_entry(dir.path(), "home_1", EntryKind::Server, Path::new("/x/Home.tsx")).unwrap();
    assert!(path.ends_with("server/home_1.js"));
    assert!(std::fs::read_to_string(path).unwrap().contains("export function render"));
  }
}
