//! Terminal front end for the declarative executor
//!
//! The engine plugs sumo-source's UI into `declarative`:
//! 1. Diffing - Render pending changes per source
//! 2. Confirming - Ask before anything is sent (unless `--yes`)
//! 3. Executing - Spinner per source, then a summary

pub mod differ;
pub mod executor;

pub use executor::{PromptConfirm, UiProgress, print_summary};
