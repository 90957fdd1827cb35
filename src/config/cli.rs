use crate::config::toml_config::RunConfig;
use crate::utils::error::{EtlError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "roster-etl")]
#[command(about = "Collect college soccer rosters for one season")]
pub struct CliConfig {
    /// TOML run configuration
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Team table in teams.csv layout (ncaa_id,team,url,division[,platform,url_format])
    #[arg(long)]
    pub teams_csv: Option<String>,

    /// Season, e.g. 2024 or 2024-25
    #[arg(long, short = 's')]
    pub season: Option<String>,

    #[arg(long = "division", value_delimiter = ',')]
    pub divisions: Vec<String>,

    /// Only these team ids
    #[arg(long = "team", value_delimiter = ',')]
    pub teams: Vec<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "List the URLs each team would be fetched from, without fetching")]
    pub dry_run: bool,

    #[arg(long, help = "Fetch each selected team's configured URL once and report 404s and errors")]
    pub check_urls: bool,
}

impl CliConfig {
    /// Load the TOML file (if any) and apply the flags on top of it.
    pub fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => {
                let season = self.season.clone().ok_or_else(|| EtlError::MissingConfigError {
                    field: "--season (or --config)".to_string(),
                })?;
                RunConfig::new(season)
            }
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(season) = &self.season {
            config.run.season = season.clone();
        }
        if let Some(csv) = &self.teams_csv {
            config.teams_csv = Some(csv.clone());
        }
        if !self.divisions.is_empty() {
            config.run.divisions = self.divisions.clone();
        }
        if !self.teams.is_empty() {
            config.run.teams = self.teams.clone();
        }
        if let Some(path) = &self.output_path {
            config.output.path = path.clone();
        }
        if let Some(workers) = self.workers {
            config.concurrency.workers = workers;
        }
    }
}
