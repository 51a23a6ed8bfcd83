/* src/cli/core/src/build/assemble.rs */

// Manifest assembly from the bundled output tree.

use std::collections::BTreeMap;
use std::path::Path;

use tessera_server::manifest::{
  CLIENT_DIR, SERVER_DIR, asset_public_path, collect_entry_outputs, list_chunk_files,
};
use tessera_server::{Manifest, ManifestEntry, PageMode, TesseraError};

use super::css::CssTable;
use super::types::{BuildStage, PageFailure, PagePlan};

/// Pass 1: classify each page's client outputs into a manifest entry.
/// Pages whose script (or, for ssr pages, server bundle) is missing are
/// reported as failures and left out.
pub(crate) fn assemble_entries(
  out_dir: &Path,
  plans: &[PagePlan],
  css: &CssTable,
) -> Result<(BTreeMap<String, ManifestEntry>, Vec<PageFailure>), TesseraError> {
  let client_dir = out_dir.join(CLIENT_DIR);
  let known_chunks = list_chunk_files(&client_dir)?;
  let mut entries = BTreeMap::new();
  let mut failures = Vec::new();

  for plan in plans {
    let failure = |stage, message: String| PageFailure {
      component_path: plan.page.component_path.clone(),
      stage,
      message,
    };
    let Some(outputs) = collect_entry_outputs(&client_dir, &plan.entry_name, &known_chunks)? else {
      failures.push(failure(
        BuildStage::Client,
        format!("client build produced no {}.js", plan.entry_name),
      ));
      continue;
    };

    let mut entry = ManifestEntry::new(plan.page.mode, asset_public_path(&outputs.script));
    entry.css = css.by_entry.get(&plan.entry_name).cloned();
    entry.chunks = outputs.chunks.iter().map(|c| asset_public_path(c)).collect();
    if plan.page.mode == PageMode::Ssr {
      let bundle = format!("{SERVER_DIR}/{}.js", plan.entry_name);
      if !out_dir.join(&bundle).is_file() {
        failures.push(failure(BuildStage::Ssr, format!("ssr build produced no {bundle}")));
        continue;
      }
      entry.ssr = Some(bundle);
    }
    entries.insert(plan.entry_name.clone(), entry);
  }
  Ok((entries, failures))
}

/// Prebuilt HTML produced by static generation, keyed by entry name.
#[derive(Debug, Default)]
pub(crate) struct StaticPages {
  pub html: BTreeMap<String, String>,
  pub routes: BTreeMap<String, BTreeMap<String, String>>,
}

impl StaticPages {
  pub fn files(&self) -> usize {
    self.html.len() + self.routes.values().map(BTreeMap::len).sum::<usize>()
  }
}

/// Pass 2: attach static HTML and collect the shared chunk table.
pub(crate) fn finish_manifest(
  mut entries: BTreeMap<String, ManifestEntry>,
  statics: StaticPages,
) -> Manifest {
  for (name, html) in statics.html {
    if let Some(entry) = entries.get_mut(&name) {
      entry.html = Some(html);
    }
  }
  for (name, routes) in statics.routes {
    if let Some(entry) = entries.get_mut(&name) {
      entry.static_routes = Some(routes);
    }
  }

  let mut chunks = BTreeMap::new();
  for chunk in entries.values().flat_map(|e| e.chunks.iter()) {
    if let Some(file) = chunk.rsplit('/').next() {
      chunks.insert(file.to_string(), chunk.clone());
    }
  }
  Manifest { entries, chunks }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::types::DiscoveredPage;

  fn plan(component: &str, mode: PageMode) -> PagePlan {
    let page = DiscoveredPage {
      component_path: component.into(),
      mode,
      has_static_loader: false,
      title: None,
    };
    PagePlan::new(page, Path::new("/project"))
  }

  #[test]
  fn classifies_outputs_and_shared_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();
    let home = plan("src/Home.tsx", PageMode::Ssr);
    let app = plan("src/App.tsx", PageMode::ClientOnly);
    std::fs::create_dir_all(out.join("client")).unwrap();
    std::fs::create_dir_all(out.join("server")).unwrap();
    std::fs::write(out.join("client/chunk-AB12.js"), "").unwrap();
    std::fs::write(
      out.join(format!("client/{}.js", home.entry_name)),
      "import \"./chunk-AB12.js\";",
    )
    .unwrap();
    std::fs::write(out.join(format!("client/{}.js", app.entry_name)), "").unwrap();
    std::fs::write(out.join(format!("server/{}.js", home.entry_name)), "").unwrap();

    let mut css = CssTable::default();
    css.by_entry.insert(app.entry_name.clone(), "/assets/shared.css".into());
    let (entries, failures) = assemble_entries(out, &[home.clone(), app.clone()], &css).unwrap();
    assert!(failures.is_empty());

    let home_entry = &entries[&home.entry_name];
    assert_eq!(home_entry.chunks, vec!["/assets/chunk-AB12.js".to_string()]);
    assert_eq!(home_entry.ssr.as_deref(), Some(format!("server/{}.js", home.entry_name).as_str()));
    assert!(!home_entry.is_static);
    let app_entry = &entries[&app.entry_name];
    assert_eq!(app_entry.css.as_deref(), Some("/assets/shared.css"));
    assert!(app_entry.ssr.is_none());

    let mut statics = StaticPages::default();
    statics.html.insert(app.entry_name.clone(), "/pages/app/index.html".into());
    let manifest = finish_manifest(entries, statics);
    assert_eq!(manifest.chunks["chunk-AB12.js"], "/assets/chunk-AB12.js");
    assert_eq!(manifest.entries[&app.entry_name].html.as_deref(), Some("/pages/app/index.html"));
  }

  #[test]
  fn missing_outputs_become_failures() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();
    let home = plan("src/Home.tsx", PageMode::Ssr);
    let gone = plan("src/Gone.tsx", PageMode::ClientOnly);
    std::fs::create_dir_all(out.join("client")).unwrap();
    std::fs::write(out.join(format!("client/{}.js", home.entry_name)), "").unwrap();

    let (entries, failures) = assemble_entries(out, &[home, gone], &CssTable::default()).unwrap();
    assert!(entries.is_empty());
    let stages: Vec<_> = failures.iter().map(|f| f.stage).collect();
    assert_eq!(stages, vec![BuildStage::Ssr, BuildStage::Client]);
  }
}
