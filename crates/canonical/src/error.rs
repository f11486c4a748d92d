use thiserror::Error;

/// Errors reported by normalization configuration checks.
///
/// [`normalize`](crate::normalize) itself never fails; only
/// [`NormalizeConfig::validate`](crate::NormalizeConfig::validate) produces
/// this error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
