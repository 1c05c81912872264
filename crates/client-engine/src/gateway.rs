//! Gateway adapter for the remote analysis service.
//!
//! The adapter normalizes the service's two ways of saying "not ready yet"
//! (a structured pending/processing payload, or a bare HTTP 202) into
//! [`StatusProbe`], so the poll loop never branches on transport details.

use std::future::Future;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;

use riskscan_client_core::analysis::{AnalysisResult, RemoteStatus};
use riskscan_client_core::document::DocumentFile;

/// Errors surfaced by gateway operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The service rejected the request with a structured detail message.
    #[error("{message}")]
    Rejected {
        /// Server-supplied detail.
        message: String,
    },
    /// Network failure, unexpected status, or a malformed response body.
    #[error("{message}")]
    Transport {
        /// Human-readable description.
        message: String,
    },
}

// FastAPI-style error body.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: String,
}

/// Response to an accepted submission.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAccepted {
    /// Opaque job handle correlating status and result queries.
    pub analysis_id: String,
    /// Initial remote status (normally `pending`).
    pub status: RemoteStatus,
    /// Server-side creation timestamp (naive ISO string).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Optional informational message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Structured status payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisStatus {
    /// Job handle this status belongs to.
    pub analysis_id: String,
    /// Remote lifecycle status.
    pub status: RemoteStatus,
    /// Service-side progress estimate in `[0, 100]`, when available.
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    /// Server-side creation timestamp (naive ISO string).
    #[serde(default)]
    pub created_at: Option<String>,
    /// Server-side completion timestamp (naive ISO string).
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Failure message, when `status` is `failed`.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One status query, normalized over the two "not ready" shapes.
#[derive(Debug, Clone)]
pub enum StatusProbe {
    /// Normal structured payload.
    Status(AnalysisStatus),
    /// Accepted-but-not-ready transport indicator (HTTP 202, no payload).
    NotReady,
}

/// The remote analysis service, as the engine sees it.
pub trait AnalysisGateway {
    /// Submit a document for analysis, returning the job handle.
    fn submit(
        &self,
        document: &DocumentFile,
    ) -> impl Future<Output = Result<UploadAccepted, GatewayError>> + Send;

    /// Query the status of a job.
    fn query_status(
        &self,
        analysis_id: &str,
    ) -> impl Future<Output = Result<StatusProbe, GatewayError>> + Send;

    /// Fetch the final result of a completed job.
    fn fetch_result(
        &self,
        analysis_id: &str,
    ) -> impl Future<Output = Result<AnalysisResult, GatewayError>> + Send;

    /// Liveness probe; not part of the job lifecycle.
    fn health_check(
        &self,
    ) -> impl Future<Output = Result<serde_json::Value, GatewayError>> + Send;
}

impl<G> AnalysisGateway for std::sync::Arc<G>
where
    G: AnalysisGateway + Send + Sync,
{
    async fn submit(&self, document: &DocumentFile) -> Result<UploadAccepted, GatewayError> {
        (**self).submit(document).await
    }

    async fn query_status(&self, analysis_id: &str) -> Result<StatusProbe, GatewayError> {
        (**self).query_status(analysis_id).await
    }

    async fn fetch_result(&self, analysis_id: &str) -> Result<AnalysisResult, GatewayError> {
        (**self).fetch_result(analysis_id).await
    }

    async fn health_check(&self) -> Result<serde_json::Value, GatewayError> {
        (**self).health_check().await
    }
}

/// HTTP implementation of [`AnalysisGateway`].
pub struct HttpGateway {
    http: reqwest::Client,
    base: Url,
}

impl HttpGateway {
    /// Build a gateway against the given backend base URL.
    pub fn new(base: Url) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base.join(path).map_err(transport)
    }
}

impl AnalysisGateway for HttpGateway {
    async fn submit(&self, document: &DocumentFile) -> Result<UploadAccepted, GatewayError> {
        let url = self.endpoint("api/v1/contracts/upload")?;

        let part = reqwest::multipart::Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(document.kind.mime())
            .map_err(transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }
        res.json().await.map_err(transport)
    }

    async fn query_status(&self, analysis_id: &str) -> Result<StatusProbe, GatewayError> {
        let url = self.endpoint(&format!("api/v1/contracts/{analysis_id}/status"))?;
        let res = self.http.get(url).send().await.map_err(transport)?;

        let status = res.status();
        if status == StatusCode::ACCEPTED {
            return Ok(StatusProbe::NotReady);
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }
        let payload: AnalysisStatus = res.json().await.map_err(transport)?;
        Ok(StatusProbe::Status(payload))
    }

    async fn fetch_result(&self, analysis_id: &str) -> Result<AnalysisResult, GatewayError> {
        let url = self.endpoint(&format!("api/v1/contracts/{analysis_id}/results"))?;
        let res = self.http.get(url).send().await.map_err(transport)?;

        let status = res.status();
        // A completed job must have a result; a 202 here is an inconsistency,
        // not a reason to keep polling.
        if status == StatusCode::ACCEPTED {
            return Err(GatewayError::Transport {
                message: "result not available for completed analysis".to_string(),
            });
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }
        res.json().await.map_err(transport)
    }

    async fn health_check(&self) -> Result<serde_json::Value, GatewayError> {
        let url = self.endpoint("api/v1/health")?;
        let res = self.http.get(url).send().await.map_err(transport)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }
        res.json().await.map_err(transport)
    }
}

fn transport<E: std::fmt::Display>(err: E) -> GatewayError {
    GatewayError::Transport {
        message: err.to_string(),
    }
}

fn classify_http_error(status: StatusCode, body: &str) -> GatewayError {
    if let Ok(err) = serde_json::from_str::<ApiErrorBody>(body) {
        return GatewayError::Rejected {
            message: err.detail,
        };
    }
    GatewayError::Transport {
        message: format!("http {status}: {body}"),
    }
}
