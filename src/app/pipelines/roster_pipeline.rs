use crate::config::registry::RunFilter;
use crate::core::manager::RosterManager;
use crate::core::season::Season;
use crate::domain::model::{FieldCoverage, RosterRecord, RunCounts, RunReport};
use crate::domain::ports::{Pipeline, Storage, TransformResult};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

const CSV_HEADERS: [&str; 16] = [
    "ncaa_id",
    "team",
    "season",
    "division",
    "jersey",
    "name",
    "position",
    "height",
    "class",
    "major",
    "hometown",
    "high_school",
    "previous_school",
    "url",
    "height_metric",
    "strategy",
];

pub const FETCH_FAILED_FILE: &str = "fetch_failed.json";
pub const VERIFY_FAILED_FILE: &str = "verify_failed.json";
pub const ZERO_RECORDS_FILE: &str = "zero_records.json";
pub const SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    season: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_ms: i64,
    counts: RunCounts,
    cancelled: &'a [String],
    coverage: &'a FieldCoverage,
    files: Vec<String>,
}

/// Runs the manager and writes the roster tables plus one report per failure category.
pub struct RosterPipeline<S: Storage> {
    storage: S,
    manager: RosterManager,
    season: Season,
    filter: RunFilter,
    output_path: String,
    write_json: bool,
    write_csv: bool,
}

impl<S: Storage> RosterPipeline<S> {
    pub fn new(storage: S, manager: RosterManager, season: Season, filter: RunFilter, output_path: impl Into<String>) -> Self {
        Self {
            storage,
            manager,
            season,
            filter,
            output_path: output_path.into(),
            write_json: true,
            write_csv: true,
        }
    }

    pub fn with_formats(mut self, formats: &[String]) -> Self {
        self.write_json = formats.iter().any(|f| f == "json");
        self.write_csv = formats.iter().any(|f| f == "csv");
        self
    }

    pub fn manager(&self) -> &RosterManager {
        &self.manager
    }

    fn roster_file(&self, extension: &str) -> String {
        format!("rosters_{}.{}", self.season, extension)
    }
}

pub fn render_csv(records: &[RosterRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::ProcessingError {
            message: format!("Failed to finish CSV output: {}", e),
        })
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for RosterPipeline<S> {
    async fn extract(&self) -> Result<RunReport> {
        tracing::info!("🚀 Collecting rosters for season {}", self.season);
        self.manager.run(&self.season, &self.filter).await
    }

    async fn transform(&self, report: RunReport) -> Result<TransformResult> {
        let mut files = Vec::new();

        if self.write_json {
            files.push((self.roster_file("json"), serde_json::to_vec_pretty(&report.records)?));
        }
        if self.write_csv {
            files.push((self.roster_file("csv"), render_csv(&report.records)?));
        }

        // Failure reports are always written so a re-run can target them.
        files.push((FETCH_FAILED_FILE.to_string(), serde_json::to_vec_pretty(&report.fetch_failed)?));
        files.push((VERIFY_FAILED_FILE.to_string(), serde_json::to_vec_pretty(&report.verify_failed)?));
        files.push((ZERO_RECORDS_FILE.to_string(), serde_json::to_vec_pretty(&report.zero_records)?));

        let mut names: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
        names.push(SUMMARY_FILE.to_string());
        let summary = RunSummary {
            season: &report.season,
            started_at: report.started_at,
            finished_at: report.finished_at,
            duration_ms: (report.finished_at - report.started_at).num_milliseconds(),
            counts: report.counts(),
            cancelled: &report.cancelled,
            coverage: &report.coverage,
            files: names,
        };
        files.push((SUMMARY_FILE.to_string(), serde_json::to_vec_pretty(&summary)?));

        for field in ["position", "height", "class", "hometown"] {
            let gaps = report.coverage.gaps(field);
            if gaps > 0 {
                tracing::debug!("{} of {} records have no {}", gaps, report.coverage.records, field);
            }
        }

        Ok(TransformResult { report, files })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        for (name, data) in &result.files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }
        Ok(format!("{}/{}", self.output_path.trim_end_matches('/'), SUMMARY_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use crate::config::registry::ConfigRegistry;
    use crate::core::manager::RunOptions;
    use crate::domain::model::Team;
    use crate::domain::ports::{FetchOutcome, Fetcher};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct StaticFetcher;

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> FetchOutcome {
            if url.starts_with("https://a.edu") {
                FetchOutcome::Success(
                    r#"<title>2024 Women's Soccer Roster</title>
                    <table><tr><th>No.</th><th>Name</th><th>Cl.</th></tr>
                    <tr><td>3</td><td>Rae, "Ace" Diaz</td><td>Fr.</td></tr></table>"#
                        .to_string(),
                )
            } else {
                FetchOutcome::NotFound
            }
        }
    }

    fn pipeline(dir: &TempDir) -> RosterPipeline<LocalStorage> {
        let teams = vec![
            Team::new("1", "A", "https://a.edu/wsoc").with_platform("table").with_url_format("single_year"),
            Team::new("2", "B", "https://b.edu/wsoc"),
        ];
        let registry = Arc::new(ConfigRegistry::from_teams(teams).unwrap());
        let manager = RosterManager::new(Arc::new(StaticFetcher), registry, RunOptions::default());
        let output = dir.path().to_str().unwrap().to_string();
        RosterPipeline::new(
            LocalStorage::new(dir.path()),
            manager,
            Season::parse("2024").unwrap(),
            RunFilter::all(),
            output,
        )
    }

    #[tokio::test]
    async fn test_transform_renders_all_files() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir);
        let report = pipeline.extract().await.unwrap();
        let result = pipeline.transform(report).await.unwrap();
        let names: Vec<&str> = result.files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "rosters_2024.json",
                "rosters_2024.csv",
                FETCH_FAILED_FILE,
                VERIFY_FAILED_FILE,
                ZERO_RECORDS_FILE,
                SUMMARY_FILE
            ]
        );

        let csv = String::from_utf8(result.files[1].1.clone()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADERS.join(","));
        assert!(lines.next().unwrap().starts_with("1,A,2024,,3,\"Rae, \"\"Ace\"\" Diaz\",,,Freshman"));
    }

    #[tokio::test]
    async fn test_load_writes_through_storage() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir).with_formats(&["json".to_string()]);
        let report = pipeline.extract().await.unwrap();
        let result = pipeline.transform(report).await.unwrap();
        let summary_path = pipeline.load(result).await.unwrap();
        assert!(summary_path.ends_with(SUMMARY_FILE));

        assert!(dir.path().join("rosters_2024.json").exists());
        assert!(!dir.path().join("rosters_2024.csv").exists());

        let failed: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(FETCH_FAILED_FILE)).unwrap()).unwrap();
        assert_eq!(failed[0]["team_id"], "2");

        let summary: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["counts"]["accepted"], 1);
        assert_eq!(summary["counts"]["fetch_failed"], 1);
        assert_eq!(summary["coverage"]["records"], 1);
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(csv).unwrap().trim(), CSV_HEADERS.join(","));
    }
}
