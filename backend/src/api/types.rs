//! REST API request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dispatch::{AnalysisRequest, Envelope};
use crate::error::ErrorKind;

/// JSON body of `POST /analyze`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeBody {
    #[serde(default)]
    pub domain: Option<String>,
    /// Free text or a structured mapping
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl AnalyzeBody {
    pub fn into_request(self) -> AnalysisRequest {
        AnalysisRequest::from_value(self.payload.unwrap_or(Value::Null))
            .with_domain(self.domain)
            .with_hint(self.hint)
    }
}

/// `GET /artifacts?limit=N`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// `POST /ingest?domain=X`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestQuery {
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub reasoner: ReasonerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonerStatus {
    pub name: String,
    pub available: bool,
}

/// HTTP status for a failure class
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::EmptyInput
        | ErrorKind::InvalidInput
        | ErrorKind::UnsupportedFormat
        | ErrorKind::ParseError => StatusCode::BAD_REQUEST,
        ErrorKind::AnalyzerFailure | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({ "error": error })
}

/// Error half of a handler result
pub type ApiError = (StatusCode, Json<Value>);

pub fn api_error(status: StatusCode, error: impl AsRef<str>) -> ApiError {
    (status, Json(error_response(error.as_ref())))
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = self.error_kind().map(status_for).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Modality;

    #[test]
    fn test_body_into_request() {
        let body: AnalyzeBody = serde_json::from_value(json!({
            "domain": "",
            "payload": { "a": 1 },
            "hint": "short"
        }))
        .unwrap();
        let request = body.into_request();

        assert_eq!(request.modality(), Modality::JsonWithoutDomain);
        assert_eq!(request.hint.as_deref(), Some("short"));
    }

    #[test]
    fn test_missing_payload_is_unsupported() {
        let request = AnalyzeBody::default().into_request();
        assert_eq!(request.modality(), Modality::Unsupported);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::EmptyInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::ParseError), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::AnalyzerFailure), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::ServiceUnavailable), StatusCode::SERVICE_UNAVAILABLE);
    }
}
