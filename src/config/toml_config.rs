use crate::config::registry::{ConfigRegistry, RunFilter, TeamEntry};
use crate::core::manager::RunOptions;
use crate::core::season::Season;
use crate::domain::model::{EntityKind, Team};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_output_formats, validate_path, validate_range,
    validate_season, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; roster-etl/0.1; +https://github.com/roster-etl)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunSection,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub concurrency: ConcurrencySettings,
    #[serde(default)]
    pub output: OutputSettings,
    /// A `teams.csv` style table, read before any inline `[[teams]]`.
    #[serde(default)]
    pub teams_csv: Option<String>,
    #[serde(default)]
    pub teams: Vec<TeamEntry>,
    /// Directory relative `teams_csv` paths resolve against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    pub season: String,
    #[serde(default)]
    pub entity: EntityKind,
    #[serde(default)]
    pub divisions: Vec<String>,
    /// Team-id subset; empty runs every selected division.
    #[serde(default)]
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_seconds() -> u64 {
    20
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencySettings {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_per_host")]
    pub per_host: usize,
}

fn default_workers() -> usize {
    8
}

fn default_per_host() -> usize {
    2
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            per_host: default_per_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["json".to_string(), "csv".to_string()]
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            formats: default_formats(),
        }
    }
}

fn env_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex"))
}

impl RunConfig {
    /// A config with defaults everywhere; teams come from `teams_csv` or CLI flags.
    pub fn new(season: impl Into<String>) -> Self {
        Self {
            run: RunSection {
                season: season.into(),
                entity: EntityKind::Roster,
                divisions: Vec::new(),
                teams: Vec::new(),
            },
            http: HttpSettings::default(),
            concurrency: ConcurrencySettings::default(),
            output: OutputSettings::default(),
            teams_csv: None,
            teams: Vec::new(),
            base_dir: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.as_ref().parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unset variables stay literal.
    fn substitute_env_vars(content: &str) -> String {
        env_var_re()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn season(&self) -> Result<Season> {
        validate_season("run.season", &self.run.season)
    }

    pub fn filter(&self) -> RunFilter {
        RunFilter::all()
            .with_divisions(self.run.divisions.iter().cloned())
            .with_team_ids(self.run.teams.iter().cloned())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            workers: self.concurrency.workers,
            per_host: self.concurrency.per_host,
            entity: self.run.entity,
        }
    }

    pub fn teams_csv_path(&self) -> Option<PathBuf> {
        let raw = self.teams_csv.as_deref()?;
        let path = PathBuf::from(raw);
        match &self.base_dir {
            Some(dir) if path.is_relative() => Some(dir.join(path)),
            _ => Some(path),
        }
    }

    /// Build the immutable team table: CSV rows first, then inline entries.
    pub fn registry(&self) -> Result<ConfigRegistry> {
        let mut teams: Vec<Team> = match self.teams_csv_path() {
            Some(path) => ConfigRegistry::from_csv_path(&path)?.teams().to_vec(),
            None => Vec::new(),
        };
        teams.extend(self.teams.iter().cloned().map(Team::from));
        ConfigRegistry::from_teams(teams)
    }

    pub fn writes_json(&self) -> bool {
        self.output.formats.iter().any(|f| f == "json")
    }

    pub fn writes_csv(&self) -> bool {
        self.output.formats.iter().any(|f| f == "csv")
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        self.season()?;
        validate_range("http.timeout_seconds", self.http.timeout_seconds, 1, 300)?;
        validate_range("http.retry_attempts", self.http.retry_attempts, 0, 10)?;
        validate_range("http.retry_delay_ms", self.http.retry_delay_ms, 0, 60_000)?;
        validate_non_empty_string("http.user_agent", &self.http.user_agent)?;
        validate_range("concurrency.workers", self.concurrency.workers, 1, 64)?;
        validate_range("concurrency.per_host", self.concurrency.per_host, 1, 16)?;
        validate_path("output.path", &self.output.path)?;
        validate_output_formats("output.formats", &self.output.formats)?;
        if let Some(csv) = &self.teams_csv {
            validate_path("teams_csv", csv)?;
        }
        if self.teams.is_empty() && self.teams_csv.is_none() {
            return Err(EtlError::MissingConfigError {
                field: "teams or teams_csv".to_string(),
            });
        }
        Ok(())
    }
}
