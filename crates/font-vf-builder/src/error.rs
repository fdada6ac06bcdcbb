//! Error types for variable font building.

/// Result type for variable font building operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during variable font building.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Design-space construction or expansion failed.
    #[error(transparent)]
    Designspace(#[from] varlayer_font_designspace::Error),

    /// No master sits at the default location.
    #[error("base master not found; no master at default location?")]
    NoBaseMaster,

    /// More than one master sits at the default location.
    #[error("masters {first} and {second} are both at the default location")]
    AmbiguousBaseMaster { first: usize, second: usize },

    /// Two masters share a normalized location.
    #[error("masters {first} and {second} share the location {location:?}")]
    DuplicateMasterLocation {
        first: usize,
        second: usize,
        location: Vec<f64>,
    },

    /// A compiled master lacks TrueType outlines.
    #[error("master {index} ('{name}') has no glyf table; only TrueType masters are supported")]
    UnsupportedMasterFormat { index: usize, name: String },

    /// The base master selects a sparse layer.
    #[error(
        "default master '{0}' must not be a sparse master, check the default values for all axes and the corresponding source"
    )]
    InvalidBaseMaster(String),

    /// Masters are structurally incompatible.
    #[error("cannot merge {table}: {message}")]
    MergeInvariant { table: &'static str, message: String },

    /// Compiling a master failed.
    #[error("failed to compile master '{master}': {message}")]
    Compile { master: String, message: String },

    /// Read error.
    #[error("font read error: {0}")]
    Read(#[from] read_fonts::ReadError),

    /// Write error.
    #[error("font write error: {0}")]
    Write(#[from] write_fonts::error::Error),

    /// Font builder error.
    #[error("font builder error: {0}")]
    Builder(#[from] write_fonts::BuilderError),

    /// Gvar building error.
    #[error("error building gvar table: {0:?}")]
    GvarBuild(write_fonts::tables::gvar::GvarInputError),

    /// I/O error while saving masters for inspection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn merge(table: &'static str, message: impl Into<String>) -> Self {
        Self::MergeInvariant { table, message: message.into() }
    }
}
