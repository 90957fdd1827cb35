//! Liveness check of the configured team URLs, without parsing anything.

use crate::domain::model::Team;
use crate::domain::ports::{FetchOutcome, Fetcher, Storage};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const URL_CHECKS_FILE: &str = "url_checks.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCheck {
    pub team_id: String,
    pub team: String,
    pub url: String,
    /// Set for reachable pages that answered with something other than 200.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCheckReport {
    pub valid: Vec<UrlCheck>,
    pub not_found: Vec<UrlCheck>,
    pub errors: Vec<UrlCheck>,
}

impl UrlCheckReport {
    pub fn total(&self) -> usize {
        self.valid.len() + self.not_found.len() + self.errors.len()
    }

    pub async fn save<S: Storage>(&self, storage: &S) -> Result<String> {
        storage
            .write_file(URL_CHECKS_FILE, &serde_json::to_vec_pretty(self)?)
            .await?;
        Ok(URL_CHECKS_FILE.to_string())
    }
}

enum Verdict {
    Valid,
    NotFound,
    Error,
}

fn classify(team: &Team, outcome: FetchOutcome) -> (Verdict, UrlCheck) {
    let mut check = UrlCheck {
        team_id: team.id.clone(),
        team: team.name.clone(),
        url: team.base_url.clone(),
        warning: None,
        error: None,
    };
    let verdict = match outcome {
        FetchOutcome::Success(_) => Verdict::Valid,
        // Answered, just not with 200: the page exists.
        FetchOutcome::PermanentFailure(status) => {
            check.warning = Some(status);
            Verdict::Valid
        }
        FetchOutcome::NotFound => Verdict::NotFound,
        FetchOutcome::TransientFailure(message) => {
            check.error = Some(message);
            Verdict::Error
        }
    };
    (verdict, check)
}

/// Fetch every team's configured URL once and sort the teams by result.
/// Lists keep the order of `teams`.
pub async fn check_team_urls(fetcher: Arc<dyn Fetcher>, teams: &[Team], workers: usize) -> UrlCheckReport {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    for (index, team) in teams.iter().cloned().enumerate() {
        let fetcher = fetcher.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let outcome = fetcher.fetch(&team.base_url).await;
            (index, classify(&team, outcome))
        });
    }

    let mut results: Vec<Option<(Verdict, UrlCheck)>> = (0..teams.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!("URL check task failed: {}", e),
        }
    }

    let mut report = UrlCheckReport::default();
    for (result, team) in results.into_iter().zip(teams) {
        let (verdict, check) = result.unwrap_or_else(|| {
            let (_, mut check) = classify(team, FetchOutcome::NotFound);
            check.error = Some("internal: check task aborted".to_string());
            (Verdict::Error, check)
        });
        match verdict {
            Verdict::Valid => {
                match &check.warning {
                    Some(w) => tracing::warn!("⚠️ {} [{}]: {} ({})", check.team, check.team_id, check.url, w),
                    None => tracing::info!("✅ {} [{}]: {}", check.team, check.team_id, check.url),
                }
                report.valid.push(check);
            }
            Verdict::NotFound => {
                tracing::warn!("❌ {} [{}]: 404 {}", check.team, check.team_id, check.url);
                report.not_found.push(check);
            }
            Verdict::Error => {
                tracing::warn!("❌ {} [{}]: {}", check.team, check.team_id, check.url);
                report.errors.push(check);
            }
        }
    }

    tracing::info!(
        "URL check: {} teams, {} valid, {} not found, {} errors",
        report.total(),
        report.valid.len(),
        report.not_found.len(),
        report.errors.len()
    );
    report
}
