//! Error types for design-space construction and layer expansion.

use std::{collections::BTreeSet, result};

use thiserror::Error;

/// Result type for design-space operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while building or expanding a design space.
#[derive(Debug, Error)]
pub enum Error {
    /// Axis bounds or tag are invalid.
    #[error("invalid axis '{axis}': {message}")]
    InvalidAxis { axis: String, message: String },

    /// Two axes share a name or tag.
    #[error("duplicate axis '{0}'")]
    DuplicateAxis(String),

    /// A location references an axis the design space does not define.
    #[error("location axis '{axis}' unknown for '{owner}'")]
    UnknownAxis { axis: String, owner: String },

    /// A coordinate falls outside its axis bounds after mapping to user space.
    #[error(
        "location for axis '{axis}' (mapped to {value}) out of range for '{owner}' [{minimum}..{maximum}]"
    )]
    OutOfRange {
        axis: String,
        owner: String,
        value: f64,
        minimum: f64,
        maximum: f64,
    },

    /// A substitution rule's range is empty or reversed.
    #[error("invalid substitution rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },

    /// A layer name carries a brace or bracket marker that cannot be decoded.
    #[error("malformed layer name '{layer}': {message}")]
    MalformedLayerName { layer: String, message: String },

    /// Bracket layers sharing a threshold touch different glyph sets.
    #[error(
        "bracket layers with crossover at {threshold}: bracket layers for {glyphs:?} seem to be missing somewhere"
    )]
    InconsistentBracketLayer {
        threshold: i64,
        glyphs: BTreeSet<String>,
    },

    /// A master refers to a source that has not been loaded.
    #[error("master '{0}' has no loaded source")]
    UnknownSource(String),

    /// A master selects a layer its source does not have.
    #[error("source '{source_name}' has no layer '{layer}'")]
    UnknownLayer { source_name: String, layer: String },

    /// The source loader failed.
    #[error("failed to load source '{filename}': {message}")]
    SourceLoad { filename: String, message: String },
}
