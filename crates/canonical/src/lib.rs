//! Eligibility text normalization layer.
//!
//! Registry eligibility text arrives as loosely formatted prose: headings in
//! varying case, bullets, numbered lists, wrapped lines and the occasional
//! inline "Inclusion: ... Exclusion: ..." paragraph. This crate turns that
//! into an ordered list of lower-cased sentences, each tagged with the section
//! it came from, so the field extractors can work on small predictable units.
//!
//! ## What we do
//!
//! - Unicode NFKC folding (configurable)
//! - Inclusion/exclusion heading detection, inline or on their own line
//! - Bullet and numbering removal, continuation-line joining
//! - Sentence splitting on `.` / `;`, lower-casing, whitespace collapsing
//! - A versioned content hash of the raw input, used as the parse cache key
//!
//! ## Never fails
//!
//! [`normalize`] never returns an error. Empty or missing text yields an
//! empty sentence list; text before any heading is treated as inclusion
//! criteria.
//!
//! ## Invariants worth knowing
//!
//! - Output depends only on trial id + text + config
//! - Sentence order follows the source text
//! - Hash = SHA-256(version || 0x00 || trial_id || 0x00 || raw_text)

mod config;
mod document;
mod error;
mod hash;
mod pipeline;
mod section;
mod whitespace;

pub use crate::config::NormalizeConfig;
pub use crate::document::NormalizedCriteria;
pub use crate::error::CanonicalError;
pub use crate::hash::{content_hash, hash_text};
pub use crate::pipeline::normalize;
pub use crate::section::{CriteriaItem, CriteriaSentence, SectionKind};
pub use crate::whitespace::collapse_whitespace;
