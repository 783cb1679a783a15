use http::{Response, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::body::{full, ResponseBody};

/// Every fallible boundary in the proxy: startup (fatal) and per-request
/// (rendered to the client as JSON). Cacheability parse failures are not
/// represented here. They resolve to a boolean/fallback at the point of
/// parsing and never propagate as errors (see `cachefik-cache::policy`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("docker discovery failed: {0}")]
    Discovery(#[from] bollard::errors::Error),

    #[error("failed to bind listener on {addr}: {source}")]
    Bind { addr: String, #[source] source: std::io::Error },

    #[error("no upstream found")]
    NoRoute,

    #[error("upstream error: {0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    /// The HTTP status to report for errors that reach a client.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoRoute => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Discovery(_) | AppError::Bind { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The stable, client-facing message (never the full `Display`, which
    /// may carry internal detail unsuitable for an external response).
    pub fn client_message(&self) -> &'static str {
        match self {
            AppError::NoRoute => "no upstream found",
            AppError::Upstream(_) => "upstream error",
            AppError::Discovery(_) | AppError::Bind { .. } => "internal error",
        }
    }

    /// Render as the wire-format JSON response this proxy always uses for
    /// errors it reports to clients.
    pub fn into_response(self) -> Response<ResponseBody> {
        json_error(self.client_message(), self.status())
    }
}

/// `{"error": <message>, "code": <status>}`.
#[derive(Serialize)]
struct ApiError {
    error: String,
    code: u16,
}

pub fn json_error(message: &str, status: StatusCode) -> Response<ResponseBody> {
    let body = ApiError { error: message.to_string(), code: status.as_u16() };
    let bytes = serde_json::to_vec(&body).expect("ApiError serialization cannot fail");

    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(full(bytes))
        .expect("building a response from known-valid parts cannot fail")
}
