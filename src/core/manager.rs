//! Runs every selected team through fetch, verify and extract, and gathers
//! the per-team outcomes into one [`RunReport`].
//!
//! Each team is processed in its own task and owns its result until all
//! tasks have joined; nothing is shared between teams except the fetcher and
//! the concurrency limits. The merged report is ordered by configuration
//! order, so two runs over the same inputs produce the same failure lists.

use crate::config::registry::{ConfigRegistry, RunFilter};
use crate::core::cancel::CancellationToken;
use crate::core::season::{Season, SeasonVerifier};
use crate::core::strategies::{RosterStrategy, StrategyFactory};
use crate::core::url_builder;
use crate::domain::model::{
    EntityFailure, EntityKind, EntityState, FieldCoverage, RawPageContent, RosterRecord, RunReport,
    Team, VerificationStatus,
};
use crate::domain::ports::{FetchOutcome, Fetcher};
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Teams processed at once.
    pub workers: usize,
    /// Concurrent fetches against one host.
    pub per_host: usize,
    pub entity: EntityKind,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            per_host: 2,
            entity: EntityKind::Roster,
        }
    }
}

#[derive(Debug)]
enum EntityOutcome {
    Accepted {
        records: Vec<RosterRecord>,
        coverage: FieldCoverage,
    },
    Failed {
        state: EntityState,
        reason: String,
        url: Option<String>,
    },
    Cancelled,
}

#[derive(Debug)]
struct EntityResult {
    index: usize,
    team: Team,
    outcome: EntityOutcome,
}

impl EntityResult {
    fn failed(index: usize, team: Team, state: EntityState, reason: impl Into<String>, url: Option<String>) -> Self {
        Self {
            index,
            team,
            outcome: EntityOutcome::Failed {
                state,
                reason: reason.into(),
                url,
            },
        }
    }
}

/// One semaphore per host, created on first use.
#[derive(Debug, Default)]
struct HostLimiter {
    per_host: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    fn new(per_host: usize) -> Self {
        Self {
            per_host: per_host.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, url: &str) -> Arc<Semaphore> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        match self.hosts.lock() {
            Ok(mut hosts) => hosts
                .entry(host)
                .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
                .clone(),
            Err(_) => Arc::new(Semaphore::new(self.per_host)),
        }
    }
}

struct RunContext {
    fetcher: Arc<dyn Fetcher>,
    factory: StrategyFactory,
    verifier: SeasonVerifier,
    season: Season,
    entity: EntityKind,
    cancel: CancellationToken,
    workers: Arc<Semaphore>,
    hosts: HostLimiter,
}

async fn acquire(semaphore: Arc<Semaphore>, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    }
}

fn transition(team: &Team, from: EntityState, to: EntityState) -> EntityState {
    match from.advance(to) {
        Some(next) => {
            tracing::debug!("{} [{}]: {} -> {}", team.name, team.id, from, next);
            next
        }
        None => {
            tracing::error!("{} [{}]: illegal transition {} -> {}", team.name, team.id, from, to);
            to
        }
    }
}

/// Parse outside of any await point; the document is dropped before returning.
fn extract_records(
    strategy: &dyn RosterStrategy,
    content: &str,
    team: &Team,
    season: &Season,
) -> Result<(Vec<RosterRecord>, FieldCoverage)> {
    let extraction = strategy.parse(content, team, season)?;

    let mut coverage = FieldCoverage {
        dropped_blocks: extraction.dropped_blocks,
        ..Default::default()
    };
    for header in &extraction.unmapped_headers {
        *coverage.unmapped_headers.entry(header.clone()).or_insert(0) += 1;
    }
    if extraction.records.is_empty() {
        return Err(EtlError::ProcessingError {
            message: format!(
                "no named player records ({} nameless blocks)",
                extraction.dropped_blocks
            ),
        });
    }
    for record in &extraction.records {
        coverage.observe(record);
    }
    Ok((extraction.records, coverage))
}

fn cancelled(index: usize, team: Team) -> EntityResult {
    EntityResult {
        index,
        team,
        outcome: EntityOutcome::Cancelled,
    }
}

async fn process_entity(ctx: Arc<RunContext>, index: usize, team: Team) -> EntityResult {
    let mut state = EntityState::Pending;

    let strategy = ctx.factory.resolve(&team).and_then(|strategy| {
        url_builder::build(&team.base_url, &ctx.season, &team.url_format, ctx.entity, &team.params)
            .map(|urls| (strategy, urls))
    });
    let (strategy, candidates) = match strategy {
        Ok(resolved) => resolved,
        Err(e) => {
            let reason = e.entity_reason();
            tracing::warn!("❌ {} [{}]: {}", team.name, team.id, reason);
            transition(&team, state, EntityState::FetchFailed);
            return EntityResult::failed(index, team, EntityState::FetchFailed, reason, None);
        }
    };

    // Candidates are tried in order. A page that fetches but shows another
    // season moves on to the next candidate; only the last verdict is kept.
    //
    // The host permit is taken before the worker slot and the worker slot is
    // released before waiting on the next host, so no task ever holds a worker
    // while queued behind a busy host.
    let mut last_fetch_failure: Option<(String, EtlError)> = None;
    let mut last_verify_failure: Option<(String, EtlError)> = None;
    let mut verified: Option<(RawPageContent, OwnedSemaphorePermit)> = None;

    for url in &candidates {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let Some(host) = acquire(ctx.hosts.semaphore(url), &ctx.cancel).await else {
            break;
        };
        let Some(worker) = acquire(ctx.workers.clone(), &ctx.cancel).await else {
            break;
        };
        tracing::debug!("{} [{}]: fetching {}", team.name, team.id, url);
        let outcome = ctx.fetcher.fetch(url).await;
        drop(host);

        let content = match outcome {
            FetchOutcome::Success(content) => content,
            other => {
                if let Some(err) = other.error_for(url) {
                    tracing::debug!("{} [{}]: {}", team.name, team.id, err);
                    last_fetch_failure = Some((url.clone(), err));
                }
                continue;
            }
        };

        let verdict = ctx.verifier.verify(&content, &ctx.season, ctx.entity);
        if verdict.is_confirmed() {
            verified = Some((
                RawPageContent {
                    url: url.clone(),
                    body: content,
                },
                worker,
            ));
            break;
        }
        let message = match verdict.status {
            VerificationStatus::Mismatch => format!("found {}", verdict.found_tokens.join(", ")),
            _ => format!("no season token near the {} heading", ctx.entity.keyword()),
        };
        let err = EtlError::VerificationFailure {
            expected: ctx.season.to_string(),
            message,
        };
        tracing::debug!("{} [{}]: {} not confirmed: {}", team.name, team.id, url, err);
        last_verify_failure = Some((url.clone(), err));
    }

    let Some((page, _worker)) = verified else {
        if let Some((url, err)) = last_verify_failure {
            state = transition(&team, state, EntityState::Fetched);
            transition(&team, state, EntityState::VerifyFailed);
            let reason = err.entity_reason();
            tracing::warn!("❌ {} [{}]: verify failed: {}", team.name, team.id, reason);
            return EntityResult::failed(index, team, EntityState::VerifyFailed, reason, Some(url));
        }
        if ctx.cancel.is_cancelled() {
            return cancelled(index, team);
        }
        transition(&team, state, EntityState::FetchFailed);
        let Some((url, err)) = last_fetch_failure else {
            tracing::warn!("❌ {} [{}]: no candidate URLs", team.name, team.id);
            return EntityResult::failed(index, team, EntityState::FetchFailed, "no candidate URLs", None);
        };
        let reason = err.entity_reason();
        if err.is_transient() {
            tracing::warn!(
                "❌ {} [{}]: fetch failed at {}: {} ({})",
                team.name,
                team.id,
                url,
                reason,
                err.recovery_suggestion()
            );
        } else {
            tracing::warn!("❌ {} [{}]: fetch failed at {}: {}", team.name, team.id, url, reason);
        }
        return EntityResult::failed(index, team, EntityState::FetchFailed, reason, Some(url));
    };

    state = transition(&team, state, EntityState::Fetched);
    state = transition(&team, state, EntityState::Verified);

    match extract_records(strategy.as_ref(), &page.body, &team, &ctx.season) {
        Ok((records, coverage)) => {
            state = transition(&team, state, EntityState::Extracted);
            transition(&team, state, EntityState::Accepted);
            tracing::info!("✅ {} [{}]: {} records ({})", team.name, team.id, records.len(), strategy.name());
            EntityResult {
                index,
                team,
                outcome: EntityOutcome::Accepted { records, coverage },
            }
        }
        Err(err) => {
            transition(&team, state, EntityState::ZeroRecords);
            let reason = err.entity_reason();
            tracing::warn!("❌ {} [{}]: zero records: {}", team.name, team.id, reason);
            EntityResult::failed(index, team, EntityState::ZeroRecords, reason, Some(page.url))
        }
    }
}

pub struct RosterManager {
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<ConfigRegistry>,
    factory: StrategyFactory,
    options: RunOptions,
    cancel: CancellationToken,
}

impl RosterManager {
    pub fn new(fetcher: Arc<dyn Fetcher>, registry: Arc<ConfigRegistry>, options: RunOptions) -> Self {
        Self {
            fetcher,
            registry,
            factory: StrategyFactory::new(),
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    /// Process every team the filter selects. Entity failures are part of
    /// the report; only a broken verifier setup fails the run.
    pub async fn run(&self, season: &Season, filter: &RunFilter) -> Result<RunReport> {
        let started_at = Utc::now();
        let teams = self.registry.select(filter);
        tracing::info!(
            "Processing {} teams for season {} ({} workers, {} per host)",
            teams.len(),
            season,
            self.options.workers,
            self.options.per_host
        );

        let ctx = Arc::new(RunContext {
            fetcher: self.fetcher.clone(),
            factory: self.factory,
            verifier: SeasonVerifier::new()?,
            season: season.clone(),
            entity: self.options.entity,
            cancel: self.cancel.clone(),
            workers: Arc::new(Semaphore::new(self.options.workers.max(1))),
            hosts: HostLimiter::new(self.options.per_host),
        });

        let mut tasks = JoinSet::new();
        for (index, team) in teams.iter().cloned().enumerate() {
            tasks.spawn(process_entity(ctx.clone(), index, team));
        }

        let mut results: Vec<Option<EntityResult>> = (0..teams.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    let index = result.index;
                    results[index] = Some(result);
                }
                Err(e) => tracing::error!("Entity task failed: {}", e),
            }
        }

        // A task that panicked still owes its team an outcome.
        let results = results.into_iter().zip(teams).enumerate().map(|(index, (result, team))| {
            result.unwrap_or_else(|| {
                EntityResult::failed(index, team, EntityState::FetchFailed, "internal: entity task aborted", None)
            })
        });

        let report = merge(season, started_at, results);
        let counts = report.counts();
        tracing::info!(
            "Run finished: {} accepted, {} fetch failed, {} verify failed, {} zero records, {} cancelled, {} records",
            counts.accepted,
            counts.fetch_failed,
            counts.verify_failed,
            counts.zero_records,
            counts.cancelled,
            counts.records
        );
        if let Some(reason) = self.cancel.reason() {
            tracing::warn!("Run was cancelled: {}", reason);
        }
        Ok(report)
    }
}

fn merge(
    season: &Season,
    started_at: chrono::DateTime<Utc>,
    results: impl Iterator<Item = EntityResult>,
) -> RunReport {
    let mut report = RunReport {
        season: season.to_string(),
        started_at,
        finished_at: started_at,
        records: Vec::new(),
        accepted: Vec::new(),
        fetch_failed: Vec::new(),
        verify_failed: Vec::new(),
        zero_records: Vec::new(),
        cancelled: Vec::new(),
        coverage: FieldCoverage::default(),
    };

    for result in results {
        let team = result.team;
        match result.outcome {
            EntityOutcome::Accepted { records, coverage } => {
                report.accepted.push(team.id);
                report.records.extend(records);
                report.coverage.merge(&coverage);
            }
            EntityOutcome::Failed { state, reason, url } => {
                let failure = EntityFailure {
                    team_id: team.id,
                    team: team.name,
                    division: team.division,
                    reason,
                    url,
                };
                match state {
                    EntityState::VerifyFailed => report.verify_failed.push(failure),
                    EntityState::ZeroRecords => report.zero_records.push(failure),
                    _ => report.fetch_failed.push(failure),
                }
            }
            EntityOutcome::Cancelled => report.cancelled.push(team.id),
        }
    }

    report.finished_at = Utc::now();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn roster_page(season: &str, players: &[&str]) -> String {
        let units: String = players
            .iter()
            .map(|name| {
                format!(
                    r#"<li class="sidearm-roster-player"><span class="sidearm-roster-player-jersey-number">1</span>
                       <div class="sidearm-roster-player-name"><h3><a href="/roster/x">{}</a></h3></div></li>"#,
                    name
                )
            })
            .collect();
        format!(
            "<html><head><title>{} Men's Soccer Roster</title></head><body><ul>{}</ul></body></html>",
            season, units
        )
    }

    #[derive(Default)]
    struct MockFetcher {
        pages: HashMap<String, FetchOutcome>,
        calls: Mutex<Vec<String>>,
        delay: Option<Duration>,
        cancel_on: Option<(String, CancellationToken)>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockFetcher {
        fn with(mut self, url: &str, outcome: FetchOutcome) -> Self {
            self.pages.insert(url.to_string(), outcome);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> FetchOutcome {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some((trigger, token)) = &self.cancel_on {
                if trigger == url {
                    token.cancel("interrupted");
                }
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.pages.get(url).cloned().unwrap_or(FetchOutcome::NotFound)
        }
    }

    fn season() -> Season {
        Season::parse("2024-25").unwrap()
    }

    fn manager(fetcher: MockFetcher, teams: Vec<Team>) -> (RosterManager, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let registry = Arc::new(ConfigRegistry::from_teams(teams).unwrap());
        let manager = RosterManager::new(fetcher.clone(), registry, RunOptions::default());
        (manager, fetcher)
    }

    #[tokio::test]
    async fn test_each_team_gets_exactly_one_outcome() {
        let fetcher = MockFetcher::default()
            .with(
                "https://a.edu/sports/msoc/roster/2024-25",
                FetchOutcome::Success(roster_page("2024-25", &["Ann Able", "Bo Baker"])),
            )
            .with(
                "https://c.edu/sports/msoc/roster/2024-25",
                FetchOutcome::Success(roster_page("2023-24", &["Old Timer"])),
            )
            .with(
                "https://d.edu/sports/msoc/roster/2024-25",
                FetchOutcome::Success(roster_page("2024-25", &[])),
            )
            .with(
                "https://e.edu/sports/msoc/roster/2024-25",
                FetchOutcome::TransientFailure("timed out".to_string()),
            );
        let teams = vec![
            Team::new("1", "Accepted U", "https://a.edu/sports/msoc"),
            Team::new("2", "Missing U", "https://b.edu/sports/msoc"),
            Team::new("3", "Stale U", "https://c.edu/sports/msoc"),
            Team::new("4", "Empty U", "https://d.edu/sports/msoc"),
            Team::new("5", "Slow U", "https://e.edu/sports/msoc"),
            Team::new("6", "Odd U", "https://f.edu/sports/msoc").with_platform("presto"),
        ];
        let (manager, fetcher) = manager(fetcher, teams);
        let report = manager.run(&season(), &RunFilter::all()).await.unwrap();

        assert_eq!(report.outcome_of("1"), Some(EntityState::Accepted));
        assert_eq!(report.outcome_of("2"), Some(EntityState::FetchFailed));
        assert_eq!(report.outcome_of("3"), Some(EntityState::VerifyFailed));
        assert_eq!(report.outcome_of("4"), Some(EntityState::ZeroRecords));
        assert_eq!(report.outcome_of("5"), Some(EntityState::FetchFailed));
        assert_eq!(report.outcome_of("6"), Some(EntityState::FetchFailed));

        let counts = report.counts();
        assert_eq!(counts.teams, 6);
        assert_eq!(counts.records, 2);
        assert_eq!(report.records_for("1").count(), 2);
        assert_eq!(report.records[0].name, "Ann Able");
        assert_eq!(report.records[0].season, "2024-25");

        let odd = report.fetch_failed.iter().find(|f| f.team_id == "6").unwrap();
        assert!(odd.reason.starts_with("configuration:"));
        assert!(!fetcher.calls().iter().any(|u| u.contains("f.edu")));

        let stale = &report.verify_failed[0];
        assert!(stale.reason.contains("2023-24"));
        assert_eq!(stale.url.as_deref(), Some("https://c.edu/sports/msoc/roster/2024-25"));
    }

    #[tokio::test]
    async fn test_failure_sets_follow_configuration_order() {
        let teams: Vec<Team> = (0..12)
            .map(|i| Team::new(format!("{}", i), format!("Team {}", i), format!("https://t{}.edu/msoc", i)))
            .collect();
        let (manager, _) = manager(MockFetcher::default(), teams);
        let report = manager.run(&season(), &RunFilter::all()).await.unwrap();
        let ids: Vec<&str> = report.fetch_failed.iter().map(|f| f.team_id.as_str()).collect();
        let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fallback_moves_past_wrong_season() {
        let fetcher = MockFetcher::default()
            .with(
                "https://a.edu/wsoc/roster",
                FetchOutcome::Success(roster_page("2025", &["Next Year"])),
            )
            .with(
                "https://a.edu/wsoc/roster/2024",
                FetchOutcome::Success(roster_page("2024", &["This Year"])),
            );
        let teams = vec![Team::new("1", "A", "https://a.edu/wsoc").with_url_format("fallback")];
        let (manager, fetcher) = manager(fetcher, teams);
        let report = manager.run(&season(), &RunFilter::all()).await.unwrap();
        assert_eq!(report.outcome_of("1"), Some(EntityState::Accepted));
        assert_eq!(report.records[0].name, "This Year");
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fetches_nothing() {
        let teams = vec![
            Team::new("1", "A", "https://a.edu/msoc"),
            Team::new("2", "B", "https://b.edu/msoc"),
        ];
        let (manager, fetcher) = manager(MockFetcher::default(), teams);
        manager.cancellation_token().cancel("interrupted");
        let report = manager.run(&season(), &RunFilter::all()).await.unwrap();
        assert_eq!(report.cancelled, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(report.outcome_of("1"), None);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_per_host_limit_is_respected() {
        let mut fetcher = MockFetcher {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let teams: Vec<Team> = (0..6)
            .map(|i| Team::new(i.to_string(), format!("T{}", i), format!("https://shared.edu/t{}", i)))
            .collect();
        for t in &teams {
            fetcher = fetcher.with(
                &format!("{}/roster/2024-25", t.base_url),
                FetchOutcome::Success(roster_page("2024-25", &["P One"])),
            );
        }
        let fetcher = Arc::new(fetcher);
        let registry = Arc::new(ConfigRegistry::from_teams(teams).unwrap());
        let options = RunOptions {
            workers: 6,
            per_host: 2,
            ..Default::default()
        };
        let manager = RosterManager::new(fetcher.clone(), registry, options);
        let report = manager.run(&season(), &RunFilter::all()).await.unwrap();
        assert_eq!(report.counts().accepted, 6);
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_extract_records_classifies_empty_pages() {
        let team = Team::new("1", "A", "https://a.edu");
        let strategy = StrategyFactory::new().resolve(&team).unwrap();
        let err = extract_records(strategy.as_ref(), "<p>nothing</p>", &team, &season()).unwrap_err();
        assert!(matches!(err, EtlError::StructuralError { .. }));
        assert!(err.entity_reason().starts_with("structure:"));

        let nameless = r#"<ul><li class="sidearm-roster-player"><span class="sidearm-roster-player-jersey-number">9</span></li></ul>"#;
        let err = extract_records(strategy.as_ref(), nameless, &team, &season()).unwrap_err();
        assert_eq!(err.entity_reason(), "no named player records (1 nameless blocks)");
    }

    fn accepting_fetcher(teams: &[Team]) -> MockFetcher {
        let mut fetcher = MockFetcher {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        for (i, t) in teams.iter().enumerate() {
            fetcher = fetcher.with(
                &format!("{}/roster/2024-25", t.base_url),
                FetchOutcome::Success(roster_page("2024-25", &[&format!("Player {}", i)])),
            );
        }
        fetcher
    }

    #[tokio::test]
    async fn test_cancel_mid_run_keeps_finished_and_in_flight_teams() {
        let teams: Vec<Team> = ["a", "b", "c", "d"]
            .iter()
            .map(|h| Team::new(*h, h.to_uppercase(), format!("https://{}.edu/msoc", h)))
            .collect();
        let token = CancellationToken::new();
        let fetcher = Arc::new(MockFetcher {
            cancel_on: Some(("https://b.edu/msoc/roster/2024-25".to_string(), token.clone())),
            ..accepting_fetcher(&teams)
        });
        let registry = Arc::new(ConfigRegistry::from_teams(teams).unwrap());
        let options = RunOptions {
            workers: 1,
            ..Default::default()
        };
        let manager = RosterManager::new(fetcher.clone(), registry, options).with_cancellation(token);
        let report = manager.run(&season(), &RunFilter::all()).await.unwrap();

        // "a" finished before the cancel, "b" was mid-fetch when it arrived.
        assert_eq!(report.outcome_of("a"), Some(EntityState::Accepted));
        assert_eq!(report.outcome_of("b"), Some(EntityState::Accepted));
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.cancelled, vec!["c".to_string(), "d".to_string()]);
        assert_eq!(
            fetcher.calls(),
            vec![
                "https://a.edu/msoc/roster/2024-25".to_string(),
                "https://b.edu/msoc/roster/2024-25".to_string(),
            ]
        );

        let mut seen: Vec<String> = report.accepted.clone();
        seen.extend(report.fetch_failed.iter().map(|f| f.team_id.clone()));
        seen.extend(report.verify_failed.iter().map(|f| f.team_id.clone()));
        seen.extend(report.zero_records.iter().map(|f| f.team_id.clone()));
        seen.extend(report.cancelled.iter().cloned());
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
        assert_eq!(report.counts().teams, 4);
    }

    #[tokio::test]
    async fn test_busy_host_does_not_hold_worker_slots() {
        let teams = vec![
            Team::new("s1", "Slow 1", "https://slow.edu/t1"),
            Team::new("s2", "Slow 2", "https://slow.edu/t2"),
            Team::new("s3", "Slow 3", "https://slow.edu/t3"),
            Team::new("f", "Fast", "https://fast.edu/t"),
        ];
        let fetcher = Arc::new(accepting_fetcher(&teams));
        let registry = Arc::new(ConfigRegistry::from_teams(teams).unwrap());
        let options = RunOptions {
            workers: 2,
            per_host: 1,
            ..Default::default()
        };
        let manager = RosterManager::new(fetcher.clone(), registry, options);
        let report = manager.run(&season(), &RunFilter::all()).await.unwrap();

        assert_eq!(report.counts().accepted, 4);
        let calls = fetcher.calls();
        assert_eq!(calls[0], "https://slow.edu/t1/roster/2024-25");
        // The other host gets the free worker while slow.edu is busy.
        assert_eq!(calls[1], "https://fast.edu/t/roster/2024-25");
        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 2);
    }
}
