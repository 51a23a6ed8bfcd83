/* src/server/renderer/rust/src/process.rs */

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tessera_server::TesseraError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

/// Environment variable carrying the socket path to the runtime.
pub const SOCKET_ENV: &str = "TESSERA_RENDERER_SOCKET";
pub const SOCKET_FILE: &str = "renderer.sock";
pub const DEFAULT_ENTRY: &str = "index.js";
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One file of a runtime compiled into the host binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFile {
  /// Relative to the runtime root, `/`-separated.
  pub path: &'static str,
  pub contents: &'static [u8],
}

#[derive(Debug, Clone)]
pub enum RuntimeSource {
  Directory(PathBuf),
  /// Extracted into a temporary directory for the client's lifetime.
  Embedded(Vec<EmbeddedFile>),
}

#[derive(Debug, Clone)]
pub struct RendererOptions {
  /// Interpreter running the runtime entry, e.g. `bun` or `node`.
  pub program: String,
  /// Arguments placed before the entry path.
  pub args: Vec<String>,
  pub runtime: RuntimeSource,
  pub entry: String,
  pub startup_timeout: Duration,
  /// Defaults to the runtime directory.
  pub working_dir: Option<PathBuf>,
  pub env: Vec<(String, String)>,
}

impl RendererOptions {
  pub fn new(program: impl Into<String>, runtime: RuntimeSource) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      runtime,
      entry: DEFAULT_ENTRY.to_string(),
      startup_timeout: DEFAULT_STARTUP_TIMEOUT,
      working_dir: None,
      env: Vec::new(),
    }
  }
}

/// A running renderer subprocess and the temp directories it owns.
pub(crate) struct RendererProcess {
  pub(crate) child: Child,
  pub(crate) socket: PathBuf,
  // dropped together with the process
  _socket_dir: TempDir,
  _runtime_dir: Option<TempDir>,
}

impl RendererProcess {
  pub(crate) async fn spawn(options: &RendererOptions) -> Result<Self, TesseraError> {
    let socket_dir = tempfile::Builder::new().prefix("tessera-renderer-").tempdir()?;
    let socket = socket_dir.path().join(SOCKET_FILE);

    let (runtime_root, runtime_dir) = match &options.runtime {
      RuntimeSource::Directory(dir) => (dir.clone(), None),
      RuntimeSource::Embedded(files) => {
        let dir = extract_embedded(files)?;
        (dir.path().to_path_buf(), Some(dir))
      }
    };
    let entry = runtime_root.join(&options.entry);
    if !entry.is_file() {
      return Err(TesseraError::configuration(format!(
        "renderer runtime entry {} does not exist",
        entry.display()
      )));
    }

    let mut cmd = Command::new(&options.program);
    cmd.args(&options.args);
    cmd.arg(&entry);
    cmd.current_dir(options.working_dir.as_deref().unwrap_or(&runtime_root));
    cmd.env(SOCKET_ENV, &socket);
    for (key, val) in &options.env {
      cmd.env(key, val);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
      TesseraError::renderer(format!("failed to start {}: {e}", options.program))
    })?;
    forward_output(&mut child);

    wait_for_socket(&mut child, &socket, options.startup_timeout).await?;
    tracing::info!(pid = child.id(), socket = %socket.display(), "renderer started");
    Ok(Self { child, socket, _socket_dir: socket_dir, _runtime_dir: runtime_dir })
  }
}

fn extract_embedded(files: &[EmbeddedFile]) -> Result<TempDir, TesseraError> {
  let dir = tempfile::Builder::new().prefix("tessera-runtime-").tempdir()?;
  for file in files {
    let relative = Path::new(file.path);
    if relative.is_absolute() || file.path.split('/').any(|seg| seg == "..") {
      return Err(TesseraError::configuration(format!(
        "embedded runtime file {} escapes the runtime directory",
        file.path
      )));
    }
    let target = dir.path().join(relative);
    if let Some(parent) = target.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, file.contents)?;
  }
  Ok(dir)
}

/// Runtime output goes to tracing: stdout at debug, stderr at warn.
fn forward_output(child: &mut Child) {
  if let Some(stdout) = child.stdout.take() {
    tokio::spawn(async move {
      let mut lines = BufReader::new(stdout).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "tessera_renderer::runtime", "{line}");
      }
    });
  }
  if let Some(stderr) = child.stderr.take() {
    tokio::spawn(async move {
      let mut lines = BufReader::new(stderr).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!(target: "tessera_renderer::runtime", "{line}");
      }
    });
  }
}

async fn wait_for_socket(
  child: &mut Child,
  socket: &Path,
  timeout: Duration,
) -> Result<(), TesseraError> {
  let started = Instant::now();
  loop {
    if socket.exists() {
      return Ok(());
    }
    if let Some(status) = child.try_wait()? {
      return Err(TesseraError::renderer(format!("renderer exited during startup ({status})")));
    }
    if started.elapsed() >= timeout {
      let _ = child.kill().await;
      return Err(TesseraError::renderer(format!(
        "renderer did not open {} within {timeout:?}",
        socket.display()
      )));
    }
    tokio::time::sleep(POLL_INTERVAL).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn runtime_with_entry() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_ENTRY), "// runtime").unwrap();
    dir
  }

  fn sh(script: &str, runtime: RuntimeSource) -> RendererOptions {
    RendererOptions {
      args: vec!["-c".into(), script.into()],
      startup_timeout: Duration::from_millis(300),
      ..RendererOptions::new("sh", runtime)
    }
  }

  #[tokio::test]
  async fn startup_timeout_is_fatal() {
    let runtime = runtime_with_entry();
    let options = sh("sleep 5", RuntimeSource::Directory(runtime.path().to_path_buf()));
    let started = Instant::now();
    let Err(err) = RendererProcess::spawn(&options).await else { panic!("expected timeout") };
    assert!(err.to_string().contains("did not open"));
    assert!(started.elapsed() < Duration::from_secs(3));
  }

  #[tokio::test]
  async fn early_exit_is_reported() {
    let runtime = runtime_with_entry();
    let options = sh("exit 3", RuntimeSource::Directory(runtime.path().to_path_buf()));
    let Err(err) = RendererProcess::spawn(&options).await else { panic!("expected failure") };
    assert!(err.to_string().contains("exited during startup"));
  }

  #[tokio::test]
  async fn missing_entry_is_configuration_error() {
    let runtime = tempfile::tempdir().unwrap();
    let options = sh("sleep 5", RuntimeSource::Directory(runtime.path().to_path_buf()));
    let Err(err) = RendererProcess::spawn(&options).await else { panic!("expected failure") };
    assert!(matches!(err, TesseraError::Configuration(_)));
  }

  #[tokio::test]
  async fn embedded_runtime_is_extracted_and_socket_env_set() {
    let files = vec![
      EmbeddedFile { path: "index.js", contents: b"// entry" },
      EmbeddedFile { path: "lib/render.js", contents: b"// lib" },
    ];
    let options = sh(
      "test -f lib/render.js && touch \"$TESSERA_RENDERER_SOCKET\" && sleep 5",
      RuntimeSource::Embedded(files),
    );
    let mut process = RendererProcess::spawn(&options).await.unwrap();
    assert!(process.socket.ends_with(SOCKET_FILE));
    let runtime = process._runtime_dir.as_ref().unwrap().path().to_path_buf();
    assert!(runtime.join("lib/render.js").is_file());

    process.child.kill().await.unwrap();
    drop(process);
    assert!(!runtime.exists());
  }

  #[test]
  fn embedded_paths_cannot_escape() {
    let files = [EmbeddedFile { path: "../evil.js", contents: b"" }];
    assert!(extract_embedded(&files).is_err());
  }
}
