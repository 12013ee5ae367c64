//! Errors raised while assembling a kiosk.

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid configuration: {}", format_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("No tokio runtime available. Call .build() from within a runtime")]
    NoRuntime,
}

fn format_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
