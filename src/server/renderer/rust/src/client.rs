/* src/server/renderer/rust/src/client.rs */

use std::path::{Path, PathBuf};

use serde_json::Value;
use tessera_server::{BoxFuture, BuildRequest, RenderedPage, Renderer, TesseraError};
use tokio::sync::Mutex;

use crate::process::{RendererOptions, RendererProcess};
use crate::protocol::{decode_build, decode_render, encode_build, encode_render};
use crate::transport::Transport;

/// Client for one rendering-runtime subprocess. Safe to share across tasks;
/// concurrent calls use separate pooled connections.
pub struct RendererClient {
  transport: Transport,
  process: Mutex<Option<RendererProcess>>,
}

impl RendererClient {
  /// Spawn the runtime and wait until its socket is accepting.
  pub async fn start(options: RendererOptions) -> Result<Self, TesseraError> {
    let process = RendererProcess::spawn(&options).await?;
    Ok(Self { transport: Transport::new(process.socket.clone()), process: Mutex::new(Some(process)) })
  }

  /// Attach to a runtime someone else manages. `stop` then only drops connections.
  pub fn connect(socket: PathBuf) -> Self {
    Self { transport: Transport::new(socket), process: Mutex::new(None) }
  }

  pub fn socket_path(&self) -> &Path {
    self.transport.socket()
  }

  /// Terminate the subprocess and remove its socket and runtime temp directories.
  pub async fn stop(&self) -> Result<(), TesseraError> {
    self.transport.close_idle();
    let Some(mut process) = self.process.lock().await.take() else { return Ok(()) };
    if process.child.try_wait()?.is_none() {
      process.child.kill().await?;
    }
    tracing::info!(socket = %process.socket.display(), "renderer stopped");
    Ok(())
  }
}

impl Renderer for RendererClient {
  fn render<'a>(
    &'a self,
    path: &'a str,
    props: &'a Value,
  ) -> BoxFuture<'a, Result<RenderedPage, TesseraError>> {
    Box::pin(async move {
      let line = self.transport.call(&encode_render(path, props)?).await?;
      decode_render(&line)
    })
  }

  fn build(&self, request: BuildRequest) -> BoxFuture<'_, Result<(), TesseraError>> {
    Box::pin(async move {
      tracing::debug!(target_kind = ?request.target, entries = request.entrypoints.len(), "renderer build");
      let line = self.transport.call(&encode_build(&request)?).await?;
      decode_build(&line)
    })
  }
}
