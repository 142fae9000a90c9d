use crate::llm::LLMError;
use thiserror::Error;

/// Failures surfaced to callers of the script service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The generation backend call itself failed
    #[error("Generation backend error: {0}")]
    Upstream(#[from] LLMError),

    /// The backend answered but produced no usable text
    #[error("Generation backend returned empty content")]
    EmptyGeneration,

    #[error("Generation backend returned malformed structured output: {0}")]
    MalformedOutput(String),

    /// No scene prompts could be recovered; the caller should reformat the script
    #[error("No scene prompts found in the script")]
    NoPromptsFound,

    #[error("Scene prompt extraction failed: {0}")]
    ExtractionInternal(String),
}

impl ServiceError {
    /// Stable identifier used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidRequest(_) => "invalid_request",
            ServiceError::Upstream(_) => "upstream_error",
            ServiceError::EmptyGeneration => "empty_generation",
            ServiceError::MalformedOutput(_) => "malformed_output",
            ServiceError::NoPromptsFound => "no_prompts_found",
            ServiceError::ExtractionInternal(_) => "extraction_error",
        }
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_keeps_cause() {
        let err = ServiceError::from(LLMError::ResponseError("rate limited".to_string()));
        assert_eq!(err.kind(), "upstream_error");
        assert!(err.to_string().contains("rate limited"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            ServiceError::InvalidRequest(String::new()).kind(),
            ServiceError::EmptyGeneration.kind(),
            ServiceError::MalformedOutput(String::new()).kind(),
            ServiceError::NoPromptsFound.kind(),
            ServiceError::ExtractionInternal(String::new()).kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
