/* src/cli/core/src/build/bundle.rs */

// Client and SSR bundling through the renderer, one build call per entry.

use std::path::{Path, PathBuf};

use tessera_server::TesseraError;

use super::pool::run_bounded;
use super::types::{BuildContext, BuildStage, PageFailure, PagePlan};

/// One entry to bundle.
pub(crate) struct BuildJob {
  pub plan: PagePlan,
  pub entry: PathBuf,
}

/// Bundle every job for `stage`. Returns the plans that built and the
/// failures of the rest; one failing entry never stops the others.
pub(crate) async fn bundle_entries(
  ctx: &BuildContext,
  stage: BuildStage,
  jobs: Vec<BuildJob>,
) -> (Vec<PagePlan>, Vec<PageFailure>) {
  let outdir = match stage {
    BuildStage::Ssr => ctx.server_dir(),
    _ => ctx.client_dir(),
  };
  let plans: Vec<PagePlan> = jobs.iter().map(|j| j.plan.clone()).collect();
  let results = run_bounded(
    jobs,
    ctx.workers,
    |job| {
      let renderer = ctx.renderer.clone();
      let outdir = outdir.clone();
      async move {
        let entrypoints = vec![job.entry];
        match stage {
          BuildStage::Ssr => renderer.build_ssr(entrypoints, outdir).await,
          _ => renderer.build_client(entrypoints, outdir, Some(job.plan.entry_name)).await,
        }
      }
    },
    |panic| Err(TesseraError::renderer(format!("build worker panicked: {panic}"))),
  )
  .await;

  let mut built = Vec::new();
  let mut failures = Vec::new();
  for (plan, result) in plans.into_iter().zip(results) {
    match result {
      Ok(()) => built.push(plan),
      Err(e) => {
        tracing::debug!(component = %plan.page.component_path, stage = stage.as_str(), "entry failed");
        failures.push(PageFailure {
          component_path: plan.page.component_path,
          stage,
          message: e.to_string(),
        });
      }
    }
  }
  (built, failures)
}

/// Remove stylesheets the SSR target emitted; only client CSS is published.
pub(crate) fn discard_server_css(server_dir: &Path) -> Result<usize, TesseraError> {
  let Ok(entries) = std::fs::read_dir(server_dir) else { return Ok(0) };
  let mut removed = 0;
  for entry in entries {
    let path = entry?.path();
    if path.extension().is_some_and(|ext| ext == "css") {
      std::fs::remove_file(&path)?;
      removed += 1;
    }
  }
  Ok(removed)
}
