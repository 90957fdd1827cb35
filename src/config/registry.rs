use crate::domain::model::{FormatParams, Team};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_unique_ids, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Subset of the registry a run processes. Empty lists mean "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub divisions: Vec<String>,
    pub team_ids: Vec<String>,
}

impl RunFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_divisions<I, S>(mut self, divisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.divisions = divisions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_team_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.team_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches(&self, team: &Team) -> bool {
        let division_ok = self.divisions.is_empty()
            || self
                .divisions
                .iter()
                .any(|d| d.trim().eq_ignore_ascii_case(team.division.trim()));
        let id_ok = self.team_ids.is_empty() || self.team_ids.iter().any(|id| id.trim() == team.id);
        division_ok && id_ok
    }
}

/// Row layout of the `teams.csv` files the scrapers have always used.
#[derive(Debug, Deserialize)]
struct TeamCsvRow {
    ncaa_id: String,
    team: String,
    url: String,
    #[serde(default)]
    division: String,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    url_format: Option<String>,
}

impl From<TeamCsvRow> for Team {
    fn from(row: TeamCsvRow) -> Self {
        let mut team = Team::new(row.ncaa_id.trim(), row.team.trim(), row.url.trim())
            .with_division(row.division.trim());
        if let Some(platform) = row.platform.filter(|p| !p.trim().is_empty()) {
            team = team.with_platform(platform.trim());
        }
        if let Some(format) = row.url_format.filter(|f| !f.trim().is_empty()) {
            team = team.with_url_format(format.trim());
        }
        team
    }
}

/// The immutable team table for one run.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    teams: Vec<Team>,
}

impl ConfigRegistry {
    pub fn from_teams(teams: Vec<Team>) -> Result<Self> {
        let registry = Self { teams };
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        let mut teams = Vec::new();
        for row in csv_reader.deserialize::<TeamCsvRow>() {
            teams.push(Team::from(row?));
        }
        Self::from_teams(teams)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        tracing::debug!("Loading team table from {}", path.as_ref().display());
        Self::from_csv_reader(file)
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    /// Teams matching the filter, in configuration order.
    pub fn select(&self, filter: &RunFilter) -> Vec<Team> {
        for id in &filter.team_ids {
            if self.get(id.trim()).is_none() {
                tracing::warn!("Requested team id {} is not in the team table", id);
            }
        }
        self.teams.iter().filter(|t| filter.matches(t)).cloned().collect()
    }
}

impl Validate for ConfigRegistry {
    fn validate(&self) -> Result<()> {
        for (index, team) in self.teams.iter().enumerate() {
            validate_non_empty_string(&format!("teams[{}].id", index), &team.id)?;
            validate_non_empty_string(&format!("teams[{}].name", index), &team.name)?;
            validate_url(&format!("teams[{}].base_url", index), &team.base_url)?;
        }
        validate_unique_ids("teams.id", self.teams.iter().map(|t| t.id.as_str()))?;
        Ok(())
    }
}

/// TOML shape of one `[[teams]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEntry {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub division: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub url_format: Option<String>,
    #[serde(default)]
    pub params: FormatParams,
}

impl From<TeamEntry> for Team {
    fn from(entry: TeamEntry) -> Self {
        let mut team = Team::new(entry.id, entry.name, entry.url)
            .with_division(entry.division)
            .with_params(entry.params);
        if let Some(platform) = entry.platform {
            team = team.with_platform(platform);
        }
        if let Some(format) = entry.url_format {
            team = team.with_url_format(format);
        }
        team
    }
}

impl TryFrom<Vec<TeamEntry>> for ConfigRegistry {
    type Error = EtlError;

    fn try_from(entries: Vec<TeamEntry>) -> Result<Self> {
        Self::from_teams(entries.into_iter().map(Team::from).collect())
    }
}
