//! Response envelope: exactly one of `result` or `error`.

use serde::Serialize;
use serde_json::Value;

use crate::error::{DispatchError, ErrorKind};

/// Successful outcome of a request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// Analyzer mapping or reasoner text
    pub result: Value,
    pub domain: String,
    pub kind: String,
    pub artifact_id: i64,
    pub request_id: String,
}

/// Failed outcome of a request.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub error: String,
    #[serde(skip)]
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Reply(Reply),
    Failure(Failure),
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Reply(_))
    }

    /// Error classification, `None` on success
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Envelope::Reply(_) => None,
            Envelope::Failure(f) => Some(f.kind),
        }
    }
}

impl From<DispatchError> for Envelope {
    fn from(err: DispatchError) -> Self {
        Envelope::Failure(Failure {
            kind: err.kind(),
            error: err.to_string(),
        })
    }
}

impl From<Reply> for Envelope {
    fn from(reply: Reply) -> Self {
        Envelope::Reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_and_failure_never_overlap() {
        let ok: Envelope = Reply {
            result: json!("hi"),
            domain: "chat".into(),
            kind: "chat".into(),
            artifact_id: 3,
            request_id: "r".into(),
        }
        .into();
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["result"], "hi");
        assert_eq!(value["artifactId"], 3);
        assert!(value.get("error").is_none());

        let failed: Envelope = DispatchError::EmptyInput.into();
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value, json!({ "error": "Empty input" }));
        assert_eq!(failed.error_kind(), Some(ErrorKind::EmptyInput));
    }
}
