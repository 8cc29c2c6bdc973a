//! Configuration module
//!
//! Application settings (`config.toml`) and the static per-grid
//! configuration supplied by the host.

pub mod config;
pub mod grid_config;

pub use config::{Config, DisplayConfig, GridSettings, KeybindingConfig};
pub use grid_config::{ColumnDescriptor, GridConfig};
