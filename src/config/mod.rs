#[cfg(feature = "cli")]
pub mod cli;
pub mod registry;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use registry::{ConfigRegistry, RunFilter, TeamEntry};
pub use toml_config::{HttpSettings, RunConfig};
