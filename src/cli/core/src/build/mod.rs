/* src/cli/core/src/build/mod.rs */

mod assemble;
mod bundle;
mod css;
mod discover;
mod entries;
mod package;
mod pool;
pub mod run;
mod statics;
pub mod types;
