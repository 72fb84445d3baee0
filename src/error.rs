use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Website not found: {0}")]
    WebsiteNotFound(i64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("LLM analysis is not configured")]
    LlmNotConfigured,

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("{0}")]
    Other(String),
}

impl DashboardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DashboardError::Validation(msg.into())
    }
}

impl From<anyhow::Error> for DashboardError {
    fn from(e: anyhow::Error) -> Self {
        DashboardError::Storage(e.to_string())
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
            DashboardError::WebsiteNotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DashboardError::LlmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Llm(_) => StatusCode::BAD_GATEWAY,
            DashboardError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
