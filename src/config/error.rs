//! Configuration error types with actionable user messages.

use thiserror::Error;

/// Configuration errors with enough context to fix the problem.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {message}\n\nHow to fix: {fix_hint}")]
    Invalid {
        /// What is wrong.
        message: String,
        /// How to fix it.
        fix_hint: String,
    },
}

impl ConfigurationError {
    /// Shorthand for an [`ConfigurationError::Invalid`] value.
    pub fn invalid(message: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            fix_hint: fix_hint.into(),
        }
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_error_includes_fix_hint() {
        let err = ConfigurationError::invalid("llm.base_url is empty", "set GROQ_BASE_URL");
        let rendered = err.to_string();
        assert!(rendered.contains("llm.base_url is empty"));
        assert!(rendered.contains("set GROQ_BASE_URL"));
    }
}
