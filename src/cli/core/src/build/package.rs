/* src/cli/core/src/build/package.rs */

// Packaging of the rendering runtime next to the build output.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tessera_server::manifest::RUNTIME_DIR;

/// Copy `runtime_dir` into `<out>/runtime` when the manifest has ssr
/// entries; otherwise remove any stale copy. Returns whether it was packaged.
pub(crate) fn package_runtime(
  out_dir: &Path,
  runtime_dir: Option<&Path>,
  has_ssr_entries: bool,
) -> Result<bool> {
  let target = out_dir.join(RUNTIME_DIR);
  if target.exists() {
    std::fs::remove_dir_all(&target)
      .with_context(|| format!("failed to remove {}", target.display()))?;
  }
  if !has_ssr_entries {
    return Ok(false);
  }
  let Some(source) = runtime_dir else {
    bail!("ssr pages need a rendering runtime; set renderer.runtime_dir");
  };
  if !source.is_dir() {
    bail!("renderer runtime {} does not exist", source.display());
  }
  copy_dir(source, &target)?;
  Ok(true)
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
  std::fs::create_dir_all(to).with_context(|| format!("failed to create {}", to.display()))?;
  for entry in std::fs::read_dir(from).with_context(|| format!("failed to read {}", from.display()))? {
    let entry = entry?;
    let dest = to.join(entry.file_name());
    // Follows symlinks: package managers link dependency directories.
    let meta = std::fs::metadata(entry.path())
      .with_context(|| format!("failed to read {}", entry.path().display()))?;
    if meta.is_dir() {
      copy_dir(&entry.path(), &dest)?;
    } else {
      std::fs::copy(entry.path(), &dest)
        .with_context(|| format!("failed to copy {}", entry.path().display()))?;
    }
  }
  Ok(())
}
