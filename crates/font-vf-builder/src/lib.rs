//! # Variable Font Builder
//!
//! Build a TrueType variable font from a layered design space.
//!
//! The pipeline expands bracket and brace layers in the design space,
//! compiles one static font per master through a [`MasterCompiler`],
//! builds a [`VariationModel`] from the normalized master locations and
//! merges the compiled masters into one variable font. Sparse masters only
//! contribute deltas for the glyphs they contain; substitution rules become
//! feature variations in GSUB.
//!
//! ## Example
//!
//! ```no_run
//! use font_types::Tag;
//! use kurbo::BezPath;
//! use varlayer_font_designspace::{
//!     Axis, DesignSpace, Glyph, Location, LogDiagnostics, MasterSource, SourceArena, SourceFont,
//! };
//! use varlayer_font_vf_builder::{Options, TrueTypeCompiler, generate_variable_font};
//!
//! fn bar(width: f64) -> BezPath {
//!     let mut path = BezPath::new();
//!     path.move_to((50.0, 0.0));
//!     path.line_to((50.0 + width, 0.0));
//!     path.line_to((50.0 + width, 700.0));
//!     path.line_to((50.0, 700.0));
//!     path.close_path();
//!     path
//! }
//!
//! let mut sources = SourceArena::new();
//! let light = sources.insert(
//!     SourceFont::new("Light.ufo").with_glyph(Glyph::new("I", 200).with_outline(bar(100.0))),
//! );
//! let bold = sources.insert(
//!     SourceFont::new("Bold.ufo").with_glyph(Glyph::new("I", 400).with_outline(bar(300.0))),
//! );
//!
//! let mut designspace = DesignSpace::new();
//! designspace.add_axis(Axis::new(Tag::new(b"wght"), "Weight", 100.0, 100.0, 900.0))?;
//! designspace.add_master(
//!     MasterSource::new("Light", "Light.ufo", Location::new().with("Weight", 100.0))
//!         .with_source(light),
//! )?;
//! designspace.add_master(
//!     MasterSource::new("Bold", "Bold.ufo", Location::new().with("Weight", 900.0))
//!         .with_source(bold),
//! )?;
//!
//! let font = generate_variable_font(
//!     &mut designspace,
//!     &mut sources,
//!     &TrueTypeCompiler,
//!     &Options::default(),
//!     &LogDiagnostics,
//! )?;
//! std::fs::write("Variable.ttf", font)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compiler;
mod error;
mod masters;
mod options;
mod pipeline;
mod tables;
mod variation_model;
mod vf_builder;

pub use compiler::{
    CompiledMaster, MasterCompiler, MasterInput, TrueTypeCompiler, compile_masters,
    shared_glyph_order,
};
pub use error::{Error, Result};
pub use options::{DEFAULT_FEATURE_VARIATION_TAG, Options};
pub use pipeline::{BuildFailure, generate_variable_font};
pub use variation_model::{Region, SubModels, VariationModel, ot_round};
pub use vf_builder::build_variable_font;
