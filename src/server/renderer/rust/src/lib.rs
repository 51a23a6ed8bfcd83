/* src/server/renderer/rust/src/lib.rs */

//! Client for the external rendering runtime.
//!
//! The runtime runs as one subprocess per client and listens on a Unix socket
//! whose path it receives in `TESSERA_RENDERER_SOCKET`. Requests and responses
//! are single JSON lines; see [`protocol`].

mod client;
mod process;
pub mod protocol;
mod transport;

pub use client::RendererClient;
pub use process::{
  DEFAULT_ENTRY, DEFAULT_STARTUP_TIMEOUT, EmbeddedFile, RendererOptions, RuntimeSource, SOCKET_ENV,
  SOCKET_FILE,
};
