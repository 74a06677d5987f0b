use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message returned with every completed scan, regardless of per-file failures.
pub const SCAN_COMPLETED: &str = "Scan completed";

/// Result of scanning a single notebook, keyed by the notebook's base name.
///
/// Serialized untagged so the wire shape is either `{file, output}` or
/// `{file, error}`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ScanEntry {
    /// Scanner exited 0; `output` is its stdout verbatim.
    Success { file: String, output: String },
    /// Scanner failed; `error` is its stderr verbatim.
    Failure { file: String, error: String },
}

impl ScanEntry {
    pub fn file(&self) -> &str {
        match self {
            ScanEntry::Success { file, .. } | ScanEntry::Failure { file, .. } => file,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScanEntry::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScanResponse {
    pub message: String,
    pub results: Vec<ScanEntry>,
}

impl ScanResponse {
    pub fn completed(results: Vec<ScanEntry>) -> Self {
        Self {
            message: SCAN_COMPLETED.to_string(),
            results,
        }
    }
}

/// Body of every non-200 response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_wire_shapes() {
        let ok = ScanEntry::Success {
            file: "a.ipynb".to_string(),
            output: "clean".to_string(),
        };
        let failed = ScanEntry::Failure {
            file: "b.ipynb".to_string(),
            error: "boom".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"file": "a.ipynb", "output": "clean"})
        );
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"file": "b.ipynb", "error": "boom"})
        );
    }

    #[test]
    fn test_response_parses_mixed_results() {
        let body = json!({
            "message": "Scan completed",
            "results": [
                {"file": "a.ipynb", "output": ""},
                {"file": "b.ipynb", "error": "exit 1"}
            ]
        });

        let parsed: ScanResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.message, SCAN_COMPLETED);
        assert!(parsed.results[0].is_success());
        assert!(!parsed.results[1].is_success());
        assert_eq!(parsed.results[1].file(), "b.ipynb");
    }
}
