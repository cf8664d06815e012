use super::providers::Provider;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("solver rejected the task: {0}")]
    Rejected(String),

    #[error("solver produced no token within {0:?}")]
    TimedOut(Duration),
}

/// External challenge-solving capability: hand over (provider, site key,
/// page URL), get back a solution token. Implementations bound their own
/// latency; callers should expect `solve` to block for seconds to tens of
/// seconds.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    async fn solve(
        &self,
        provider: Provider,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, SolverError>;
}

/// Client for the classic two-step solving API: submit the task, then poll
/// for the token.
pub struct HttpSolver {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    max_wait: Duration,
}

/// Both API endpoints answer in this envelope when asked for JSON.
#[derive(Debug, Deserialize)]
struct SolverResponse {
    status: i32,
    request: String,
}

impl HttpSolver {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: "https://2captcha.com".to_string(),
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(120),
        }
    }

    /// Point the client at a different API host (tests, compatible
    /// services).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    async fn submit(
        &self,
        provider: Provider,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, SolverError> {
        let response: SolverResponse = self
            .http
            .get(format!("{}/in.php", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("method", provider.solve_method()),
                (provider.key_param(), site_key),
                ("pageurl", page_url),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;

        if response.status != 1 {
            return Err(SolverError::Rejected(response.request));
        }
        Ok(response.request)
    }

    async fn poll(&self, task_id: &str) -> Result<String, SolverError> {
        let deadline = Instant::now() + self.max_wait;
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let response: SolverResponse = self
                .http
                .get(format!("{}/res.php", self.base_url))
                .query(&[
                    ("key", self.api_key.as_str()),
                    ("action", "get"),
                    ("id", task_id),
                    ("json", "1"),
                ])
                .send()
                .await?
                .json()
                .await?;

            if response.status == 1 {
                return Ok(response.request);
            }
            if response.request != "CAPCHA_NOT_READY" {
                return Err(SolverError::Rejected(response.request));
            }
            if Instant::now() >= deadline {
                return Err(SolverError::TimedOut(self.max_wait));
            }
        }
    }
}

#[async_trait]
impl ChallengeSolver for HttpSolver {
    async fn solve(
        &self,
        provider: Provider,
        site_key: &str,
        page_url: &str,
    ) -> Result<String, SolverError> {
        ::log::info!(
            "Submitting {} challenge (site key {}) to solving service",
            provider,
            site_key
        );
        let task_id = self.submit(provider, site_key, page_url).await?;
        ::log::debug!("Solver accepted task {}", task_id);
        self.poll(&task_id).await
    }
}
