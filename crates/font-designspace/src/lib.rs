//! # Design Space
//!
//! The design-space model for building a variable font from layered
//! sources: axes with user→design maps, validated master and instance
//! locations, substitution rules, and the source glyph arena the masters
//! draw from.
//!
//! Two expanders grow a design space before compilation:
//!
//! - [`apply_bracket_layers`] turns `[threshold]` layers into alternate
//!   glyphs plus [`SubstitutionRule`]s on the first axis.
//! - [`apply_brace_layers`] turns `{x, y, ...}` layers into sparse masters.
//!
//! ## Example
//!
//! ```
//! use font_types::Tag;
//! use varlayer_font_designspace::{
//!     Axis, DesignSpace, Glyph, Layer, Location, LogDiagnostics, MasterSource, SourceArena,
//!     SourceFont, apply_brace_layers, apply_bracket_layers,
//! };
//!
//! let mut arena = SourceArena::new();
//! let regular = arena.insert(
//!     SourceFont::new("Regular.ufo")
//!         .with_glyph(Glyph::new("a", 500))
//!         .with_layer(Layer::new("{500}").with_glyph(Glyph::new("a", 520))),
//! );
//! let black = arena.insert(SourceFont::new("Black.ufo").with_glyph(Glyph::new("a", 600)));
//!
//! let mut designspace = DesignSpace::new();
//! designspace.add_axis(Axis::new(Tag::new(b"wght"), "Weight", 100.0, 100.0, 900.0))?;
//! designspace.add_master(
//!     MasterSource::new("Regular", "Regular.ufo", Location::new().with("Weight", 100.0))
//!         .with_source(regular),
//! )?;
//! designspace.add_master(
//!     MasterSource::new("Black", "Black.ufo", Location::new().with("Weight", 900.0))
//!         .with_source(black),
//! )?;
//!
//! apply_bracket_layers(&mut designspace, &mut arena, &LogDiagnostics)?;
//! assert_eq!(apply_brace_layers(&mut designspace, &arena, &LogDiagnostics)?, 1);
//! assert_eq!(designspace.masters().len(), 3);
//! # Ok::<(), varlayer_font_designspace::Error>(())
//! ```

mod axis;
mod brace;
mod bracket;
mod designspace;
mod diagnostics;
mod error;
mod location;
mod source;

pub use axis::{Axis, AxisLabel, normalize_value, piecewise_linear_map};
pub use brace::apply_brace_layers;
pub use bracket::{apply_bracket_layers, bracket_glyph_name};
pub use designspace::{DesignSpace, Instance, MasterSource, SubstitutionRule};
pub use diagnostics::{CollectingDiagnostics, Diagnostics, LogDiagnostics};
pub use error::{Error, Result};
pub use location::Location;
pub use source::{
    Component, FontInfo, Glyph, Layer, SourceArena, SourceFont, SourceId, SourceLoader,
};

/// Name of the layer a master uses when it selects none.
pub const DEFAULT_LAYER_NAME: &str = "public.default";

/// Infix joining a glyph name and its bracket threshold.
pub const BRACKET_GLYPH_INFIX: &str = ".BRACKET.";

/// Layers whose name contains this are never expanded.
pub const BACKGROUND_LAYER_MARKER: &str = ".background";
