//! Configuration for the Aether atmosphere baker.
//!
//! Bake settings persist to disk as a RON file and can be overridden from the
//! command line. Missing sections and fields fall back to defaults, so older
//! files keep loading as settings are added.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BakeConfig, CONFIG_FILE, Config, DebugConfig, LayoutConfig, OutputConfig, default_config_dir,
};
pub use error::ConfigError;
