use crate::domain::model::RunReport;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Result of one fetch, already classified so the manager never inspects
/// transport errors itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(String),
    /// Timeouts, connection resets, 5xx, 429. Only reported after retries ran out.
    TransientFailure(String),
    PermanentFailure(String),
    NotFound,
}

impl FetchOutcome {
    /// The failure as an entity-scoped error; `None` for a successful fetch.
    pub fn error_for(&self, url: &str) -> Option<EtlError> {
        let url = url.to_string();
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::TransientFailure(message) => Some(EtlError::TransientFetchError {
                url,
                message: message.clone(),
            }),
            FetchOutcome::PermanentFailure(message) => Some(EtlError::PermanentFetchError {
                url,
                message: message.clone(),
            }),
            FetchOutcome::NotFound => Some(EtlError::PageNotFound { url }),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Output of the transform phase: the finalized report plus its rendered files.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub report: RunReport,
    pub files: Vec<(String, Vec<u8>)>,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RunReport>;
    async fn transform(&self, report: RunReport) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
