/* src/server/core/rust/src/lib.rs */

pub mod cache;
pub mod config;
pub mod decision;
pub mod entry;
pub mod errors;
pub mod escape;
pub mod export;
pub mod handler;
pub mod html;
pub mod manifest;
pub mod naming;
pub mod page;
pub mod renderer;
pub mod server;

// Re-exports for ergonomic use
pub use config::ServeConfig;
pub use decision::{Action, DecisionInput, decide};
pub use errors::{LoaderError, Redirect, TesseraError};
pub use export::BuildMode;
pub use handler::{PageHandler, PageResponse, ServeContext};
pub use manifest::{Manifest, ManifestEntry, PageMode};
pub use naming::{entry_name_for_path, normalize_path};
pub use page::{PageConfig, PageRequest, StaticEntry, page};
pub use renderer::{BoxFuture, BuildRequest, BuildTarget, RenderedPage, Renderer};
pub use server::{PageRoute, Pages};
