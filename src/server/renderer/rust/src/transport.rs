/* src/server/renderer/rust/src/transport.rs */

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tessera_server::TesseraError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

const MAX_IDLE: usize = 16;

struct Connection {
  reader: BufReader<OwnedReadHalf>,
  writer: OwnedWriteHalf,
}

impl Connection {
  async fn exchange(&mut self, request: &[u8]) -> std::io::Result<String> {
    self.writer.write_all(request).await?;
    self.writer.flush().await?;
    let mut line = String::new();
    if self.reader.read_line(&mut line).await? == 0 {
      return Err(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "renderer closed the connection",
      ));
    }
    Ok(line)
  }
}

/// Request/response over the renderer socket with a pool of idle connections.
pub(crate) struct Transport {
  socket: PathBuf,
  idle: Mutex<Vec<Connection>>,
}

impl Transport {
  pub(crate) fn new(socket: PathBuf) -> Self {
    Self { socket, idle: Mutex::new(Vec::new()) }
  }

  pub(crate) fn socket(&self) -> &Path {
    &self.socket
  }

  async fn connect(&self) -> Result<Connection, TesseraError> {
    let stream = UnixStream::connect(&self.socket).await.map_err(|e| {
      TesseraError::renderer(format!("connect {}: {e}", self.socket.display()))
    })?;
    let (read, writer) = stream.into_split();
    Ok(Connection { reader: BufReader::new(read), writer })
  }

  fn take_idle(&self) -> Option<Connection> {
    self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop()
  }

  fn release(&self, conn: Connection) {
    let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
    if idle.len() < MAX_IDLE {
      idle.push(conn);
    }
  }

  pub(crate) fn close_idle(&self) {
    self.idle.lock().unwrap_or_else(PoisonError::into_inner).clear();
  }

  /// Send one request line and return the response line. A pooled connection
  /// that fails is discarded and the request retried once on a fresh one.
  pub(crate) async fn call(&self, request: &[u8]) -> Result<String, TesseraError> {
    if let Some(mut conn) = self.take_idle() {
      match conn.exchange(request).await {
        Ok(line) => {
          self.release(conn);
          return Ok(line);
        }
        Err(e) => tracing::debug!(error = %e, "stale renderer connection, reconnecting"),
      }
    }
    let mut conn = self.connect().await?;
    let line = conn
      .exchange(request)
      .await
      .map_err(|e| TesseraError::renderer(format!("renderer request failed: {e}")))?;
    self.release(conn);
    Ok(line)
  }
}
