/* src/server/core/rust/src/handler/setup.rs */

use std::sync::Arc;

use super::PageHandler;
use crate::entry::{write_entry, EntryKind};
use crate::errors::TesseraError;
use crate::manifest::{
  asset_public_path, collect_entry_outputs, list_chunk_files, ManifestEntry, CLIENT_DIR,
  ENTRIES_DIR,
};

impl PageHandler {
  /// Build this page's development bundle, at most once per handler.
  /// Concurrent first requests wait on the same build; a failure is cached
  /// and returned to every later request.
  pub(super) async fn run_setup(&self) -> Result<&ManifestEntry, Arc<TesseraError>> {
    let result = self
      .setup
      .get_or_init(|| async {
        tracing::info!(component = %self.page.component_path, entry = %self.entry_name, "building page for development");
        self.build_dev_entry().await.map_err(|err| {
          tracing::error!(component = %self.page.component_path, error = %err, "development setup failed");
          Arc::new(err)
        })
      })
      .await;
    result.as_ref().map_err(Arc::clone)
  }

  async fn build_dev_entry(&self) -> Result<ManifestEntry, TesseraError> {
    let renderer = self
      .ctx
      .renderer
      .as_ref()
      .ok_or_else(|| TesseraError::configuration("development setup needs a renderer"))?;
    let out_dir = &self.ctx.out_dir;
    let component = self.ctx.config.project_root.join(&self.page.component_path);
    let entry_file = write_entry(
      &out_dir.join(ENTRIES_DIR),
      &self.entry_name,
      EntryKind::client_for(self.page.mode),
      &component,
    )?;

    let client_dir = out_dir.join(CLIENT_DIR);
    renderer.build_client(vec![entry_file], client_dir.clone(), Some(self.entry_name.clone())).await?;

    let known = list_chunk_files(&client_dir)?;
    let outputs = collect_entry_outputs(&client_dir, &self.entry_name, &known)?.ok_or_else(|| {
      TesseraError::renderer(format!(
        "build for {} reported success but produced no {}.js",
        self.page.component_path, self.entry_name
      ))
    })?;

    let mut entry = ManifestEntry::new(self.page.mode, asset_public_path(&outputs.script));
    entry.css = outputs.css.as_deref().map(asset_public_path);
    entry.chunks = outputs.chunks.iter().map(|c| asset_public_path(c)).collect();
    Ok(entry)
  }
}
