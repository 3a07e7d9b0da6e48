//! Application-wide error types.

use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("prompt error: {0}")]
    Prompt(String),

    #[error("memory error: {0}")]
    Memory(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("sql error: {0}")]
    Sql(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        AppError::Llm(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("config error"));
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn provider_error_converts_to_llm() {
        let e: AppError = ProviderError::Request("connection refused".into()).into();
        assert!(matches!(e, AppError::Llm(_)));
        assert!(e.to_string().contains("connection refused"));
    }

    #[test]
    fn input_error_display() {
        let e = AppError::Input("empty question".into());
        assert_eq!(e.to_string(), "invalid input: empty question");
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
