//! YAML configuration file support.
//!
//! One file carries every stage's settings: normalization, extraction, the
//! parse cache and the matching policy. Every section is optional and falls
//! back to its defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "oncology screening"
//!
//! normalize:
//!   version: 1
//!   normalize_unicode: true
//!   join_continuations: true
//!
//! extract:
//!   max_key_terms: 20
//!   min_key_term_chars: 10
//!   max_stage_terms: 10
//!   scan_inclusion_for_allowance: true
//!
//! cache:
//!   capacity: 1024
//!
//! matcher:
//!   penalize_unmentioned: false
//!   explain: true
//!   thresholds:
//!     excellent: 70
//!     good: 50
//!     fair: 30
//!   weights:
//!     cancer_type: 30
//!     disease_stage: 20
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use canonical::NormalizeConfig;
use extract::{ExtractConfig, MemoryCache, NoopCache, ParseCache};
use matcher::{MatchConfig, Matcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ParserConfig;

/// Errors that can occur when loading YAML configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TrialMatchConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub normalize: NormalizeConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub cache: CacheYamlConfig,

    #[serde(default)]
    pub matcher: MatchConfig,
}

impl TrialMatchConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: TrialMatchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.normalize
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("normalize: {err}")))?;
        self.extract
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("extract: {err}")))?;
        self.matcher
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("matcher: {err}")))?;
        Ok(())
    }

    pub fn parser(&self) -> ParserConfig {
        ParserConfig {
            normalize: self.normalize.clone(),
            extract: self.extract.clone(),
        }
    }

    pub fn build_matcher(&self) -> Result<Matcher, ConfigLoadError> {
        Matcher::new(self.matcher.clone())
            .map_err(|err| ConfigLoadError::Validation(format!("matcher: {err}")))
    }

    /// A bounded in-memory cache, or a no-op cache when `capacity` is 0.
    pub fn build_cache(&self) -> Arc<dyn ParseCache> {
        match self.cache.capacity {
            0 => Arc::new(NoopCache),
            capacity => Arc::new(MemoryCache::new(capacity)),
        }
    }
}

impl Default for TrialMatchConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            normalize: NormalizeConfig::default(),
            extract: ExtractConfig::default(),
            cache: CacheYamlConfig::default(),
            matcher: MatchConfig::default(),
        }
    }
}

/// Parse cache YAML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheYamlConfig {
    /// Maximum cached records; 0 disables caching.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheYamlConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    MemoryCache::DEFAULT_CAPACITY
}
