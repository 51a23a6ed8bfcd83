/* src/server/renderer/rust/src/protocol.rs */

//! Wire format: one JSON object per line in each direction.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_server::errors::{BuildError, BuildMessage, RenderError, RenderMessage};
use tessera_server::{BuildRequest, BuildTarget, RenderedPage, TesseraError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
  Render,
  Build,
}

#[derive(Serialize)]
struct Envelope<P> {
  endpoint: Endpoint,
  payload: P,
}

#[derive(Serialize)]
struct RenderPayload<'a> {
  path: &'a str,
  props: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildPayload {
  entrypoints: Vec<String>,
  outdir: String,
  target: BuildTarget,
  #[serde(skip_serializing_if = "Option::is_none")]
  entry_names: Option<String>,
}

fn path_string(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

fn to_line<P: Serialize>(endpoint: Endpoint, payload: P) -> Result<Vec<u8>, TesseraError> {
  let mut line = serde_json::to_vec(&Envelope { endpoint, payload })?;
  line.push(b'\n');
  Ok(line)
}

pub fn encode_render(path: &str, props: &Value) -> Result<Vec<u8>, TesseraError> {
  to_line(Endpoint::Render, RenderPayload { path, props })
}

pub fn encode_build(request: &BuildRequest) -> Result<Vec<u8>, TesseraError> {
  to_line(
    Endpoint::Build,
    BuildPayload {
      entrypoints: request.entrypoints.iter().map(|p| path_string(p)).collect(),
      outdir: path_string(&request.outdir),
      target: request.target,
      entry_names: request.entry_names.clone(),
    },
  )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePosition {
  #[serde(default)]
  file: String,
  #[serde(default)]
  line: u32,
  #[serde(default)]
  column: u32,
  #[serde(default)]
  line_text: String,
}

#[derive(Debug, Deserialize)]
struct WireSubError {
  #[serde(default)]
  message: String,
  #[serde(default)]
  stack: Option<String>,
  #[serde(default)]
  position: Option<WirePosition>,
  #[serde(default)]
  specifier: Option<String>,
  #[serde(default)]
  referrer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
  #[serde(default)]
  message: String,
  #[serde(default)]
  stack: Option<String>,
  #[serde(default)]
  errors: Vec<WireSubError>,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
  #[serde(default)]
  html: Option<String>,
  #[serde(default)]
  head: Option<String>,
  #[serde(default)]
  error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
  #[serde(default)]
  ok: bool,
  #[serde(default)]
  error: Option<WireError>,
}

fn protocol_error(endpoint: &str, err: &serde_json::Error) -> TesseraError {
  TesseraError::renderer(format!("malformed {endpoint} response: {err}"))
}

pub fn decode_render(line: &str) -> Result<RenderedPage, TesseraError> {
  let response: RenderResponse =
    serde_json::from_str(line).map_err(|e| protocol_error("render", &e))?;
  if let Some(error) = response.error {
    return Err(
      RenderError {
        message: error.message,
        stack: error.stack,
        errors: error
          .errors
          .into_iter()
          .map(|e| RenderMessage { message: e.message, stack: e.stack })
          .collect(),
      }
      .into(),
    );
  }
  let body = response.html.ok_or_else(|| TesseraError::renderer("render response carried no html"))?;
  Ok(RenderedPage { body, head: response.head.unwrap_or_default() })
}

pub fn decode_build(line: &str) -> Result<(), TesseraError> {
  let response: BuildResponse = serde_json::from_str(line).map_err(|e| protocol_error("build", &e))?;
  if let Some(error) = response.error {
    let errors = error
      .errors
      .into_iter()
      .map(|e| {
        let position = e.position.unwrap_or_default();
        BuildMessage {
          message: e.message,
          file: position.file,
          line: position.line,
          column: position.column,
          line_text: position.line_text,
          specifier: e.specifier,
          referrer: e.referrer,
        }
      })
      .collect();
    return Err(BuildError { message: error.message, stack: error.stack, errors }.into());
  }
  if !response.ok {
    return Err(BuildError::new("renderer reported an unsuccessful build without details").into());
  }
  Ok(())
}
