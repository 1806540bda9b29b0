//! HTTP client for the REST endpoints.
//!
//! Read endpoints return whole snapshots; `start_run` and `stop_run` are the
//! only commands. Nothing here retries: a failed request is reported once and
//! the caller decides what to do.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use bobsled_core::{
    IndexSnapshot, LatestRunsSnapshot, PageId, Run, RunId, RunPatch, Snapshot, TaskName,
    TaskSnapshot,
};

use crate::error::ClientError;
use crate::origin::Origin;

/// HTTP client for REST API endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    origin: Origin,
}

/// Body of `GET /api/task/{name}/run`.
///
/// The backend answers an already-running task with `{"error": ...}` and a
/// success status, and older deployments return the bare run.
#[derive(Deserialize)]
#[serde(untagged)]
enum StartRunResponse {
    Wrapped { run: Run },
    Rejected { error: String },
    Bare(Run),
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(origin: Origin) -> Self {
        Self {
            inner: reqwest::Client::new(),
            origin,
        }
    }

    /// The origin this client talks to.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Fetch the snapshot that backs a page.
    pub async fn snapshot(&self, page: &PageId) -> Result<Snapshot, ClientError> {
        Ok(match page {
            PageId::Index => Snapshot::Index(self.index().await?),
            PageId::Task(name) => Snapshot::Task(self.task(name).await?),
            PageId::Run(uuid) => Snapshot::Run(self.run(uuid).await?),
            PageId::LatestRuns => Snapshot::LatestRuns(self.latest_runs().await?),
        })
    }

    /// `GET /api/index`
    pub async fn index(&self) -> Result<IndexSnapshot, ClientError> {
        self.get_json(&["api", "index"]).await
    }

    /// `GET /api/task/{name}`
    pub async fn task(&self, name: &TaskName) -> Result<TaskSnapshot, ClientError> {
        self.get_json(&["api", "task", name.as_str()]).await
    }

    /// `GET /api/run/{uuid}`
    pub async fn run(&self, uuid: &RunId) -> Result<Run, ClientError> {
        self.get_json(&["api", "run", uuid.as_str()]).await
    }

    /// `GET /api/latest_runs`
    pub async fn latest_runs(&self) -> Result<LatestRunsSnapshot, ClientError> {
        self.get_json(&["api", "latest_runs"]).await
    }

    /// Start a run of a task. Returns the newly created run.
    pub async fn start_run(&self, name: &TaskName) -> Result<Run, ClientError> {
        let response: StartRunResponse = self.get_json(&["api", "task", name.as_str(), "run"]).await?;
        match response {
            StartRunResponse::Wrapped { run } | StartRunResponse::Bare(run) => Ok(run),
            StartRunResponse::Rejected { error } => Err(ClientError::Rejected(error)),
        }
    }

    /// Ask the backend to stop a run.
    ///
    /// The acknowledgment rarely carries the final state; whatever run fields
    /// it does carry come back as a patch (often empty).
    pub async fn stop_run(&self, uuid: &RunId) -> Result<RunPatch, ClientError> {
        let path = ["api", "run", uuid.as_str(), "stop"];
        let body = self.get_text(&path).await?;
        if body.trim().is_empty() {
            return Ok(RunPatch::default());
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// Get JSON from an endpoint.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T, ClientError> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Serialization(e.to_string()))
    }

    async fn get_text(&self, path: &[&str]) -> Result<String, ClientError> {
        let url = self.origin.api_url(path);
        debug!(url = %url, "GET request");

        let response = self.inner.get(url.clone()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: url.path().to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
