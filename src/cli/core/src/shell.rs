/* src/cli/core/src/shell.rs */

// Runs the host binary for its build-time side channels.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tessera_server::TesseraError;
use tokio::process::Command;

use crate::ui;

/// Run `command` through `sh -c` with `env` set and return its stdout.
///
/// The child is killed when `timeout` elapses; that case is reported as
/// [`TesseraError::ExportTimeout`] so the ordering hint reaches the user.
pub(crate) async fn capture_host_output(
  base_dir: &Path,
  command: &str,
  env: &[(&str, &str)],
  timeout: Duration,
) -> Result<String, TesseraError> {
  ui::detail(command);
  let mut cmd = Command::new("sh");
  cmd.args(["-c", command]);
  cmd.current_dir(base_dir);
  for (k, v) in env {
    cmd.env(k, v);
  }
  cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

  let child = cmd
    .spawn()
    .map_err(|e| TesseraError::configuration(format!("failed to run host command `{command}`: {e}")))?;
  let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
    Ok(output) => output?,
    Err(_) => return Err(TesseraError::ExportTimeout { timeout }),
  };

  if !output.status.success() {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut msg = format!("host command exited with status {}", output.status);
    if !stderr.is_empty() {
      msg.push('\n');
      msg.push_str(&stderr);
    }
    if !stdout.is_empty() {
      msg.push('\n');
      msg.push_str(&stdout);
    }
    return Err(TesseraError::Configuration(msg));
  }
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn returns_stdout_with_env() {
    let dir = tempfile::tempdir().unwrap();
    let out = capture_host_output(
      dir.path(),
      "printf '%s' \"$TESSERA_EXPORT\"",
      &[("TESSERA_EXPORT", "1")],
      Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert_eq!(out, "1");
  }

  #[tokio::test]
  async fn hung_host_times_out_with_ordering_hint() {
    let dir = tempfile::tempdir().unwrap();
    let err = capture_host_output(dir.path(), "sleep 5", &[], Duration::from_millis(200))
      .await
      .unwrap_err();
    assert!(matches!(err, TesseraError::ExportTimeout { .. }));
    assert!(err.to_string().contains("page-registration ordering bug"));
  }

  #[tokio::test]
  async fn failing_host_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let err = capture_host_output(dir.path(), "echo boom >&2; exit 3", &[], Duration::from_secs(5))
      .await
      .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("boom"), "{msg}");
  }
}
