/* src/server/core/rust/src/errors.rs */

use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TesseraError {
  /// Missing manifest or assets in production. Fatal at startup.
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Render(#[from] RenderError),

  #[error("invalid static path \"{path}\" from {component}: {reason}")]
  PathValidation { component: String, path: String, reason: String },

  #[error("duplicate static path \"{path}\": produced by both {first} and {second}")]
  DuplicateStaticPath { path: String, first: String, second: String },

  #[error(
    "static export did not finish within {}s; this is likely a page-registration ordering bug \
     (every page must be registered before the host checks for export mode)",
    .timeout.as_secs()
  )]
  ExportTimeout { timeout: Duration },

  #[error("renderer: {0}")]
  Renderer(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

impl TesseraError {
  pub fn configuration(msg: impl Into<String>) -> Self {
    Self::Configuration(msg.into())
  }

  pub fn renderer(msg: impl Into<String>) -> Self {
    Self::Renderer(msg.into())
  }
}

/// One positioned diagnostic inside a failed build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMessage {
  pub message: String,
  pub file: String,
  pub line: u32,
  pub column: u32,
  pub line_text: String,
  pub specifier: Option<String>,
  pub referrer: Option<String>,
}

/// Aggregated failure reported by the renderer's `build` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildError {
  pub message: String,
  pub stack: Option<String>,
  pub errors: Vec<BuildMessage>,
}

impl BuildError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into(), stack: None, errors: Vec::new() }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "build failed: {}", self.message)?;
    for err in &self.errors {
      if err.file.is_empty() {
        write!(f, "\n  {}", err.message)?;
      } else {
        write!(f, "\n  {}:{}:{}: {}", err.file, err.line, err.column, err.message)?;
      }
      if !err.line_text.is_empty() {
        write!(f, "\n    | {}", err.line_text)?;
      }
      if let Some(spec) = &err.specifier {
        match &err.referrer {
          Some(referrer) => write!(f, "\n    (importing \"{spec}\" from {referrer})")?,
          None => write!(f, "\n    (importing \"{spec}\")")?,
        }
      }
    }
    Ok(())
  }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderMessage {
  pub message: String,
  pub stack: Option<String>,
}

/// Failure reported by the renderer's `render` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderError {
  pub message: String,
  pub stack: Option<String>,
  pub errors: Vec<RenderMessage>,
}

impl RenderError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into(), stack: None, errors: Vec::new() }
  }
}

impl fmt::Display for RenderError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "render failed: {}", self.message)?;
    for err in &self.errors {
      write!(f, "\n  {}", err.message)?;
    }
    Ok(())
  }
}

impl std::error::Error for RenderError {}

/// Typed loader outcome: return it (boxed) from a props or static-data loader
/// to answer the request with an HTTP redirect instead of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
  location: String,
  status: u16,
}

impl Redirect {
  pub fn new(location: impl Into<String>, status: u16) -> Self {
    Self { location: location.into(), status }
  }

  /// 302 Found
  pub fn to(location: impl Into<String>) -> Self {
    Self::new(location, 302)
  }

  /// 308 Permanent Redirect
  pub fn permanent(location: impl Into<String>) -> Self {
    Self::new(location, 308)
  }

  pub fn location(&self) -> &str {
    &self.location
  }

  pub fn status(&self) -> u16 {
    self.status
  }
}

impl fmt::Display for Redirect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "redirect {} -> {}", self.status, self.location)
  }
}

impl std::error::Error for Redirect {}

/// Error type returned by page loaders.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync>;

/// Recover the redirect contract from a loader error, if it carries one.
pub fn as_redirect(err: &LoaderError) -> Option<&Redirect> {
  err.downcast_ref::<Redirect>()
}
