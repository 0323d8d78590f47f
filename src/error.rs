use reqwest::StatusCode;
use thiserror::Error;

/// The text shown to the user for every correction failure.
pub const CORRECTION_FAILED: &str = "Failed to correct text";

/// Why a correction request did not produce text.
///
/// The variants are kept apart for logging only; the UI collapses all of
/// them into [`CORRECTION_FAILED`].
#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gemini API error {0}")]
    Status(StatusCode),

    #[error("unexpected response body: {0}")]
    Malformed(String),

    #[error("no Gemini API key configured")]
    MissingApiKey,

    #[error("correction task aborted: {0}")]
    Aborted(String),
}

impl CorrectionError {
    pub fn user_message(&self) -> &'static str {
        CORRECTION_FAILED
    }
}

impl From<serde_json::Error> for CorrectionError {
    fn from(err: serde_json::Error) -> Self {
        CorrectionError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_collapses_to_one_message() {
        let errors = [
            CorrectionError::Status(StatusCode::INTERNAL_SERVER_ERROR),
            CorrectionError::Malformed("missing candidates".to_string()),
            CorrectionError::MissingApiKey,
            CorrectionError::Aborted("task panicked".to_string()),
        ];
        for err in errors {
            assert_eq!(err.user_message(), "Failed to correct text");
        }
    }

    #[test]
    fn test_json_error_is_malformed() {
        let err: CorrectionError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, CorrectionError::Malformed(_)));
    }
}
