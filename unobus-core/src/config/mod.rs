//! Engine configuration
//!
//! Settings are gathered into [`ConfigValues`] (from TOML, serde or code)
//! and turn into an [`EngineConfig`] only after validation.

pub mod parse;
pub mod types;

pub use parse::{parse_config, parse_values};
pub use types::*;
