/* src/cli/core/src/build/entries.rs */

// Entry generation: the small sources handed to the bundler for each page.

use std::path::{Path, PathBuf};

use tessera_server::PageMode;
use tessera_server::TesseraError;
use tessera_server::entry::{EntryKind, write_entry};

use super::types::PagePlan;

/// Entry sources written for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageEntries {
  pub client: PathBuf,
  /// Absent for client-only pages.
  pub server: Option<PathBuf>,
}

/// Server-side entry kind for a page. Every server-rendered page, whether per
/// request or at build time, is bundled behind the same `render(props)` export.
pub(crate) fn server_kind(mode: PageMode) -> Option<EntryKind> {
  match mode {
    PageMode::Ssr | PageMode::StaticPrerender => Some(EntryKind::Server),
    PageMode::ClientOnly => None,
  }
}

pub(crate) fn write_page_entries(
  entries_dir: &Path,
  plan: &PagePlan,
) -> Result<PageEntries, TesseraError> {
  if !plan.component.is_file() {
    return Err(TesseraError::configuration(format!(
      "component {} not found",
      plan.component.display()
    )));
  }
  let client = write_entry(
    entries_dir,
    &plan.entry_name,
    EntryKind::client_for(plan.page.mode),
    &plan.component,
  )?;
  let server = server_kind(plan.page.mode)
    .map(|kind| write_entry(entries_dir, &plan.entry_name, kind, &plan.component))
    .transpose()?;
  Ok(PageEntries { client, server })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::types::DiscoveredPage;

  fn plan(dir: &Path, component: &str, mode: PageMode) -> PagePlan {
    let page = DiscoveredPage {
      component_path: component.into(),
      mode,
      has_static_loader: false,
      title: None,
    };
    PagePlan::new(page, dir)
  }

  #[test]
  fn client_only_pages_get_no_server_entry() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("App.tsx"), "").unwrap();
    let entries =
      write_page_entries(&dir.path().join(".entries"), &plan(dir.path(), "App.tsx", PageMode::ClientOnly))
        .unwrap();
    assert!(entries.server.is_none());
    let source = std::fs::read_to_string(entries.client).unwrap();
    assert!(source.contains("createRoot"));
  }

  #[test]
  fn ssr_and_static_pages_get_matching_server_entries() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Home.tsx"), "").unwrap();
    std::fs::write(dir.path().join("About.tsx"), "").unwrap();
    let entries_dir = dir.path().join(".entries");

    let ssr = plan(dir.path(), "Home.tsx", PageMode::Ssr);
    let written = write_page_entries(&entries_dir, &ssr).unwrap();
    let server = written.server.unwrap();
    assert_eq!(server, entries_dir.join("server").join(format!("{}.js", ssr.entry_name)));
    assert!(std::fs::read_to_string(&server).unwrap().contains("export function render"));
    assert!(std::fs::read_to_string(&written.client).unwrap().contains("hydrateRoot"));

    let about = plan(dir.path(), "About.tsx", PageMode::StaticPrerender);
    let server = write_page_entries(&entries_dir, &about).unwrap().server.unwrap();
    assert_eq!(server, entries_dir.join("server").join(format!("{}.js", about.entry_name)));
    let source = std::fs::read_to_string(server).unwrap();
    assert!(source.contains("export function render(props)"));
    assert!(!source.contains("export { default }"));
  }

  #[test]
  fn missing_component_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = write_page_entries(dir.path(), &plan(dir.path(), "Gone.tsx", PageMode::Ssr)).unwrap_err();
    assert!(err.to_string().contains("Gone.tsx"));
  }
}
