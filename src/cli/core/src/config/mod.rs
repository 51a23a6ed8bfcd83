/* src/cli/core/src/config/mod.rs */

mod loader;
mod types;


pub use loader::{CONFIG_FILE, find_tessera_config, load_tessera_config, parse_tessera_config};
pub use types::{BuildSection, Discovery, RendererSection, TesseraConfig};
