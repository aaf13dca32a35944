//! Inbound analysis requests.

use serde_json::Value;

use crate::normalizer::Upload;
use crate::registry::Payload;

/// Request body as received, before classification.
#[derive(Debug, Clone)]
pub enum RequestInput {
    File(Upload),
    Text(String),
    Structured(Payload),
    /// A body shape no path accepts (numbers, arrays, null)
    Invalid(Value),
}

/// Structural category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    File,
    FreeText,
    JsonWithDomain,
    JsonWithoutDomain,
    Unsupported,
}

/// One inbound analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub input: RequestInput,
    pub domain: Option<String>,
    pub hint: Option<String>,
}

impl AnalysisRequest {
    pub fn new(input: RequestInput) -> Self {
        Self {
            input,
            domain: None,
            hint: None,
        }
    }

    pub fn file(upload: Upload) -> Self {
        Self::new(RequestInput::File(upload))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(RequestInput::Text(text.into()))
    }

    pub fn structured(payload: Payload) -> Self {
        Self::new(RequestInput::Structured(payload))
    }

    /// Classify a JSON `payload` value: strings are free text, objects are
    /// structured, anything else is invalid.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::text(text),
            Value::Object(map) => Self::structured(map),
            other => Self::new(RequestInput::Invalid(other)),
        }
    }

    /// Blank domains count as absent.
    pub fn with_domain<S: AsRef<str>>(mut self, domain: Option<S>) -> Self {
        self.domain = non_blank(domain);
        self
    }

    pub fn with_hint<S: AsRef<str>>(mut self, hint: Option<S>) -> Self {
        self.hint = non_blank(hint);
        self
    }

    pub fn modality(&self) -> Modality {
        match (&self.input, &self.domain) {
            (RequestInput::File(_), _) => Modality::File,
            (RequestInput::Text(_), _) => Modality::FreeText,
            (RequestInput::Structured(_), Some(_)) => Modality::JsonWithDomain,
            (RequestInput::Structured(_), None) => Modality::JsonWithoutDomain,
            (RequestInput::Invalid(_), _) => Modality::Unsupported,
        }
    }
}

fn non_blank<S: AsRef<str>>(value: Option<S>) -> Option<String> {
    value
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
}
