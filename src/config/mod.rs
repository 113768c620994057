//! Configuration parsing and types.
//!
//! - `types` - Root config structure (`FleetConfig`)
//! - `duration` - Human-readable durations ("500ms", "2m")
//! - `parser` - `hermes.yaml` discovery, loading and environment overrides
//! - `validation` - Config validation

mod duration;
mod parser;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use types::*;
