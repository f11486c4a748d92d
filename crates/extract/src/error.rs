use thiserror::Error;

/// Errors reported by extraction configuration checks.
///
/// Building a record never fails; ambiguous or inconsistent text degrades
/// individual fields instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
