use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Which page of a team site a run targets. Also the keyword the season
/// verifier looks for next to the season token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Roster,
    Schedule,
}

impl EntityKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::Roster => "roster",
            EntityKind::Schedule => "schedule",
        }
    }

    pub fn keyword(&self) -> &'static str {
        self.path_segment()
    }
}

/// Per-team parameters that only some URL formats and strategies read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatParams {
    /// Used by the `template` URL format. Placeholders: `{base}`, `{entity}`,
    /// `{season}`, `{single}`, `{range}` (`2024-25`) and `{range_long}` (`2024-2025`).
    #[serde(default)]
    pub url_template: Option<String>,
    /// Dynamic strategy: JSON pointer to the player array inside the embedded blob.
    #[serde(default)]
    pub roster_path: Option<String>,
    /// Dynamic strategy: programmatic key -> canonical field name overrides.
    #[serde(default)]
    pub key_table: HashMap<String, String>,
    /// Table strategy: extra header label -> canonical field name synonyms.
    #[serde(default)]
    pub header_aliases: HashMap<String, String>,
}

/// One configured roster source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub division: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_url_format")]
    pub url_format: String,
    #[serde(default)]
    pub params: FormatParams,
}

fn default_platform() -> String {
    "standard".to_string()
}

fn default_url_format() -> String {
    "default".to_string()
}

impl Team {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
            division: String::new(),
            platform: default_platform(),
            url_format: default_url_format(),
            params: FormatParams::default(),
        }
    }

    pub fn with_division(mut self, division: impl Into<String>) -> Self {
        self.division = division.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_url_format(mut self, url_format: impl Into<String>) -> Self {
        self.url_format = url_format.into();
        self
    }

    pub fn with_params(mut self, params: FormatParams) -> Self {
        self.params = params;
        self
    }
}

/// A fetched document and where it came from.
#[derive(Debug, Clone)]
pub struct RawPageContent {
    pub url: String,
    pub body: String,
}

/// One normalized player row. Field names on the wire follow the schema the
/// downstream CSV tooling expects (`ncaa_id`, `class`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterRecord {
    #[serde(rename = "ncaa_id")]
    pub team_id: String,
    pub team: String,
    pub season: String,
    pub division: String,
    pub jersey: Option<String>,
    pub name: String,
    pub position: String,
    pub height: String,
    #[serde(rename = "class")]
    pub academic_year: String,
    pub major: String,
    pub hometown: String,
    pub high_school: String,
    pub previous_school: String,
    pub url: String,
    pub height_metric: Option<String>,
    pub strategy: String,
}

impl RosterRecord {
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Strategy output: records in page order plus what the strategy could not use.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<RosterRecord>,
    pub unmapped_headers: Vec<String>,
    pub dropped_blocks: usize,
}

impl Extraction {
    /// Keeps only named records; nameless blocks are counted, never emitted.
    pub fn push(&mut self, record: RosterRecord) {
        if record.is_valid() {
            self.records.push(record);
        } else {
            self.dropped_blocks += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Confirmed,
    Mismatch,
    NoToken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub matched_token: Option<String>,
    pub found_tokens: Vec<String>,
    pub evidence: Option<String>,
}

impl VerificationResult {
    pub fn is_confirmed(&self) -> bool {
        self.status == VerificationStatus::Confirmed
    }
}

/// Per-entity pipeline state. Terminal states are the four run outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityState {
    Pending,
    Fetched,
    Verified,
    Extracted,
    Accepted,
    FetchFailed,
    VerifyFailed,
    ZeroRecords,
}

impl EntityState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntityState::Accepted
                | EntityState::FetchFailed
                | EntityState::VerifyFailed
                | EntityState::ZeroRecords
        )
    }

    /// Returns the next state if `next` is reachable from `self`.
    pub fn advance(self, next: EntityState) -> Option<EntityState> {
        use EntityState::*;
        let legal = matches!(
            (self, next),
            (Pending, Fetched)
                | (Pending, FetchFailed)
                | (Fetched, Verified)
                | (Fetched, VerifyFailed)
                | (Verified, Extracted)
                | (Verified, ZeroRecords)
                | (Extracted, Accepted)
                | (Extracted, ZeroRecords)
        );
        legal.then_some(next)
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityState::Pending => "PENDING",
            EntityState::Fetched => "FETCHED",
            EntityState::Verified => "VERIFIED",
            EntityState::Extracted => "EXTRACTED",
            EntityState::Accepted => "ACCEPTED",
            EntityState::FetchFailed => "FETCH_FAILED",
            EntityState::VerifyFailed => "VERIFY_FAILED",
            EntityState::ZeroRecords => "ZERO_RECORDS",
        };
        f.write_str(s)
    }
}

/// A team that did not produce accepted records, with enough context to re-run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFailure {
    pub team_id: String,
    pub team: String,
    pub division: String,
    pub reason: String,
    pub url: Option<String>,
}

/// Per-field population counts over accepted records. Empty fields are
/// field-parse gaps; they never fail a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldCoverage {
    pub records: usize,
    pub populated: BTreeMap<String, usize>,
    pub unmapped_headers: BTreeMap<String, usize>,
    pub dropped_blocks: usize,
}

impl FieldCoverage {
    pub fn observe(&mut self, record: &RosterRecord) {
        self.records += 1;
        let fields: [(&str, bool); 10] = [
            ("jersey", record.jersey.as_deref().is_some_and(|j| !j.is_empty())),
            ("position", !record.position.is_empty()),
            ("height", !record.height.is_empty()),
            ("class", !record.academic_year.is_empty()),
            ("major", !record.major.is_empty()),
            ("hometown", !record.hometown.is_empty()),
            ("high_school", !record.high_school.is_empty()),
            ("previous_school", !record.previous_school.is_empty()),
            ("url", !record.url.is_empty()),
            ("height_metric", record.height_metric.is_some()),
        ];
        for (field, present) in fields {
            let slot = self.populated.entry(field.to_string()).or_insert(0);
            if present {
                *slot += 1;
            }
        }
    }

    pub fn gaps(&self, field: &str) -> usize {
        self.records - self.populated.get(field).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &FieldCoverage) {
        self.records += other.records;
        self.dropped_blocks += other.dropped_blocks;
        for (field, count) in &other.populated {
            *self.populated.entry(field.clone()).or_insert(0) += count;
        }
        for (header, count) in &other.unmapped_headers {
            *self.unmapped_headers.entry(header.clone()).or_insert(0) += count;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub teams: usize,
    pub accepted: usize,
    pub fetch_failed: usize,
    pub verify_failed: usize,
    pub zero_records: usize,
    pub cancelled: usize,
    pub records: usize,
}

/// Outcome of one run. Constructed once by the manager after all entity
/// pipelines have joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub season: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: Vec<RosterRecord>,
    pub accepted: Vec<String>,
    pub fetch_failed: Vec<EntityFailure>,
    pub verify_failed: Vec<EntityFailure>,
    pub zero_records: Vec<EntityFailure>,
    pub cancelled: Vec<String>,
    pub coverage: FieldCoverage,
}

impl RunReport {
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            teams: self.accepted.len()
                + self.fetch_failed.len()
                + self.verify_failed.len()
                + self.zero_records.len()
                + self.cancelled.len(),
            accepted: self.accepted.len(),
            fetch_failed: self.fetch_failed.len(),
            verify_failed: self.verify_failed.len(),
            zero_records: self.zero_records.len(),
            cancelled: self.cancelled.len(),
            records: self.records.len(),
        }
    }

    pub fn records_for<'a>(&'a self, team_id: &'a str) -> impl Iterator<Item = &'a RosterRecord> + 'a {
        self.records.iter().filter(move |r| r.team_id == team_id)
    }

    /// Terminal outcome of a team, `None` if it was cancelled or never part of the run.
    pub fn outcome_of(&self, team_id: &str) -> Option<EntityState> {
        if self.accepted.iter().any(|id| id == team_id) {
            return Some(EntityState::Accepted);
        }
        let sets = [
            (&self.fetch_failed, EntityState::FetchFailed),
            (&self.verify_failed, EntityState::VerifyFailed),
            (&self.zero_records, EntityState::ZeroRecords),
        ];
        sets.into_iter()
            .find(|(set, _)| set.iter().any(|f| f.team_id == team_id))
            .map(|(_, state)| state)
    }
}
