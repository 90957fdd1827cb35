pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{HttpFetcher, LocalStorage};
pub use app::pipelines::RosterPipeline;
pub use app::url_check::{check_team_urls, UrlCheckReport};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{ConfigRegistry, RunConfig, RunFilter};
pub use core::cancel::CancellationToken;
pub use core::etl::EtlEngine;
pub use core::manager::{RosterManager, RunOptions};
pub use core::season::Season;
pub use domain::model::{EntityFailure, EntityKind, EntityState, RosterRecord, RunReport, Team};
pub use utils::error::{EtlError, Result};
