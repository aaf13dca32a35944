//! Dispatch orchestrator: classifies each request and picks the path.
//!
//! Precedence, first match wins:
//!
//! 1. File upload: images go to the reasoner's vision path, everything else
//!    through the normalizer and then the reasoner.
//! 2. Free text: a JSON object in the text is handled as structured input,
//!    anything else is a chat turn. Blank text is rejected.
//! 3. Structured payload whose domain resolves in the registry: the analyzer.
//! 4. Structured payload without a matching domain: reasoner summary.
//! 5. Anything else is invalid.
//!
//! Every successful path appends exactly one artifact after the analyzer or
//! reasoner has answered. Failed requests append nothing.

pub mod envelope;
pub mod request;

pub use envelope::{Envelope, Failure, Reply};
pub use request::{AnalysisRequest, Modality, RequestInput};

use serde_json::{json, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::artifacts::{
    ArtifactLog, KIND_ANALYSIS, KIND_CHAT, KIND_DOCUMENT, KIND_INGEST, KIND_SUMMARY, KIND_VISION,
};
use crate::error::{AnalyzerError, DispatchError, DispatchResult, NormalizeError};
use crate::normalizer::{FileKind, Normalizer, Upload};
use crate::reasoner::{prompt, Reasoner};
use crate::registry::{Analyzer, AnalyzerRegistry, Payload};

/// Domain recorded for chat turns without a domain
pub const CHAT_DOMAIN: &str = "chat";
/// Domain recorded for unmatched structured payloads without a domain
pub const JSON_DOMAIN: &str = "json";
/// Domain recorded for uploads without a domain
pub const FILE_DOMAIN: &str = "file";

/// Routes requests to the normalizer, the registry and the reasoner.
pub struct Orchestrator {
    registry: Arc<AnalyzerRegistry>,
    reasoner: Arc<dyn Reasoner>,
    artifacts: ArtifactLog,
    normalizer: Normalizer,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AnalyzerRegistry>,
        reasoner: Arc<dyn Reasoner>,
        artifacts: ArtifactLog,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            registry,
            reasoner,
            artifacts,
            normalizer,
        }
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    pub fn reasoner(&self) -> &dyn Reasoner {
        self.reasoner.as_ref()
    }

    pub fn artifacts(&self) -> &ArtifactLog {
        &self.artifacts
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Handle a request and fold the outcome into an envelope.
    pub async fn handle(&self, request: AnalysisRequest) -> Envelope {
        match self.dispatch(request).await {
            Ok(reply) => reply.into(),
            Err(e) => {
                if e.kind().is_client_error() {
                    log_warning(format!("Rejected request: {}", e));
                } else {
                    log_error(format!("Request failed: {}", e));
                }
                e.into()
            }
        }
    }

    /// Route a request and return the reply or the typed failure.
    pub async fn dispatch(&self, request: AnalysisRequest) -> DispatchResult<Reply> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("request", id = %request_id, modality = ?request.modality());

        async move {
            let AnalysisRequest {
                input,
                domain,
                hint,
            } = request;
            let hint = hint.as_deref();

            match input {
                RequestInput::File(upload) => self.analyze_file(&request_id, upload, domain, hint).await,
                RequestInput::Text(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        return Err(DispatchError::EmptyInput);
                    }
                    match serde_json::from_str::<Value>(text) {
                        Ok(Value::Object(payload)) => {
                            tracing::debug!("free text carries a JSON object");
                            self.analyze_structured(&request_id, payload, domain, hint).await
                        }
                        _ => self.chat(&request_id, text, domain, hint).await,
                    }
                }
                RequestInput::Structured(payload) => {
                    self.analyze_structured(&request_id, payload, domain, hint).await
                }
                RequestInput::Invalid(value) => Err(DispatchError::InvalidInput(format!(
                    "payload must be text or an object, got {}",
                    value_type(&value)
                ))),
            }
        }
        .instrument(span)
        .await
    }

    /// Run every row of a table upload through one analyzer and record a
    /// single summary artifact.
    pub async fn ingest_table(&self, domain: &str, upload: Upload) -> DispatchResult<Reply> {
        let request_id = Uuid::new_v4().to_string();
        let analyzer = self
            .registry
            .resolve(domain)
            .ok_or_else(|| DispatchError::InvalidInput(format!("unknown domain '{}'", domain)))?;

        if !FileKind::detect(&upload)?.is_table() {
            return Err(NormalizeError::UnsupportedFormat(format!(
                "{} is not a table",
                upload.filename
            ))
            .into());
        }

        log_info(format!("Ingesting {} into '{}'", upload.filename, domain));
        let content = self.normalizer.extract(&upload)?;

        let mut results = Vec::with_capacity(content.rows.len());
        let mut failed = 0;
        for (index, row) in content.rows.iter().enumerate() {
            match run_analyzer(analyzer.as_ref(), row) {
                Ok(output) => results.push(json!({ "row": index, "output": output })),
                Err(e) => {
                    failed += 1;
                    results.push(json!({ "row": index, "error": e.to_string() }));
                }
            }
        }

        let rows = content.rows.len();
        if failed > 0 {
            log_warning(format!("{} of {} rows rejected by '{}'", failed, rows, domain));
        }
        log_success(format!("Ingested {} rows into '{}'", rows - failed, domain));

        let mut summary = json!({
            "filename": upload.filename,
            "rows": rows,
            "succeeded": rows - failed,
            "failed": failed,
            "truncated": content.truncated,
            "results": results,
        });
        if let Some(notice) = content.notice {
            summary["notice"] = Value::String(notice);
        }

        self.record(&request_id, domain.to_string(), KIND_INGEST, summary.clone(), summary)
    }

    // =========================================================================
    // Paths
    // =========================================================================

    async fn analyze_file(
        &self,
        request_id: &str,
        upload: Upload,
        domain: Option<String>,
        hint: Option<&str>,
    ) -> DispatchResult<Reply> {
        let domain = domain.unwrap_or_else(|| FILE_DOMAIN.to_string());
        log_info(format!("Received {} ({} bytes)", upload.filename, upload.bytes.len()));

        if FileKind::detect(&upload)? == FileKind::Image {
            let media_type = upload.resolved_media_type();
            let instruction = prompt::vision_prompt(&upload.filename, hint);
            let answer = self
                .reasoner
                .complete_vision(&upload.bytes, &media_type, &instruction)
                .await?;

            log_success(format!("Image {} described", upload.filename));
            let artifact = json!({
                "requestId": request_id,
                "filename": upload.filename,
                "mediaType": media_type,
                "bytes": upload.bytes.len(),
                "hint": hint,
                "output": answer,
            });
            return self.record(request_id, domain, KIND_VISION, Value::String(answer), artifact);
        }

        let content = self.normalizer.extract(&upload)?;

        // Optional capability missing: answer softly, no reasoner call
        if let Some(notice) = &content.notice {
            log_warning(format!("{}: {}", upload.filename, notice));
            let result = json!({ "filename": upload.filename, "notice": notice });
            let artifact = json!({
                "requestId": request_id,
                "filename": upload.filename,
                "notice": notice,
            });
            return self.record(request_id, domain, KIND_DOCUMENT, result, artifact);
        }

        if content.text.trim().is_empty() {
            return Err(DispatchError::EmptyInput);
        }
        log_success(format!(
            "Extracted {:?} content from {} ({} rows, truncated: {})",
            content.kind,
            upload.filename,
            content.rows.len(),
            content.truncated
        ));

        let instruction = prompt::document_prompt(&upload.filename, &content, hint);
        let answer = self.reasoner.complete_text(&instruction).await?;

        let artifact = json!({
            "requestId": request_id,
            "filename": upload.filename,
            "contentKind": content.kind,
            "rows": content.rows.len(),
            "truncated": content.truncated,
            "hint": hint,
            "output": answer,
        });
        self.record(request_id, domain, KIND_DOCUMENT, Value::String(answer), artifact)
    }

    async fn analyze_structured(
        &self,
        request_id: &str,
        payload: Payload,
        domain: Option<String>,
        hint: Option<&str>,
    ) -> DispatchResult<Reply> {
        if let Some(analyzer) = domain.as_deref().and_then(|d| self.registry.resolve(d)) {
            let code = analyzer.code().to_string();
            log_info(format!("Routing to analyzer '{}'", code));

            let output = run_analyzer(analyzer.as_ref(), &payload).map_err(|source| {
                DispatchError::Analyzer {
                    domain: code.clone(),
                    source,
                }
            })?;

            let artifact = json!({
                "requestId": request_id,
                "input": payload,
                "output": output,
            });
            return self.record(request_id, code, KIND_ANALYSIS, Value::Object(output), artifact);
        }

        if let Some(domain) = &domain {
            tracing::debug!(domain = %domain, "no analyzer registered, summarizing");
        }
        let instruction = prompt::summarize_json_prompt(
            &payload,
            domain.as_deref(),
            hint,
            self.normalizer.text_budget(),
        );
        let answer = self.reasoner.complete_text(&instruction).await?;

        let artifact = json!({
            "requestId": request_id,
            "input": payload,
            "hint": hint,
            "output": answer,
        });
        let domain = domain.unwrap_or_else(|| JSON_DOMAIN.to_string());
        self.record(request_id, domain, KIND_SUMMARY, Value::String(answer), artifact)
    }

    async fn chat(
        &self,
        request_id: &str,
        text: &str,
        domain: Option<String>,
        hint: Option<&str>,
    ) -> DispatchResult<Reply> {
        let instruction = prompt::chat_prompt(text, domain.as_deref(), hint);
        let answer = self.reasoner.complete_text(&instruction).await?;

        let artifact = json!({
            "requestId": request_id,
            "input": text,
            "hint": hint,
            "output": answer,
        });
        let domain = domain.unwrap_or_else(|| CHAT_DOMAIN.to_string());
        self.record(request_id, domain, KIND_CHAT, Value::String(answer), artifact)
    }

    /// Append the artifact and build the reply.
    fn record(
        &self,
        request_id: &str,
        domain: String,
        kind: &str,
        result: Value,
        artifact: Value,
    ) -> DispatchResult<Reply> {
        let artifact_id = self.artifacts.append(&domain, kind, &artifact)?;
        log_success(format!("Recorded artifact #{} ({}/{})", artifact_id, domain, kind));

        Ok(Reply {
            result,
            domain,
            kind: kind.to_string(),
            artifact_id,
            request_id: request_id.to_string(),
        })
    }
}

/// Call an analyzer, turning a panic into an analyzer error.
fn run_analyzer(analyzer: &dyn Analyzer, payload: &Payload) -> Result<Payload, AnalyzerError> {
    match catch_unwind(AssertUnwindSafe(|| analyzer.analyze(payload))) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(AnalyzerError::Panicked(message))
        }
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
