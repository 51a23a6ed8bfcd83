/* src/cli/core/src/main.rs */

mod build;
mod config;
mod shell;
mod ui;

use anyhow::{Context, Result};

use config::{find_tessera_config, load_tessera_config};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt().with_writer(std::io::stderr).with_target(false).init();

  let cwd = std::env::current_dir().context("failed to get cwd")?;
  let config_path = find_tessera_config(&cwd)?;
  let base_dir = config_path.parent().context("config file has no parent directory")?.to_path_buf();
  let config = load_tessera_config(&config_path)?;

  build::run::run_build(&config, &base_dir).await?;
  Ok(())
}
