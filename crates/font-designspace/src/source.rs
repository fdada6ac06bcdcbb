//! Source fonts: an arena of named layers of named glyphs.
//!
//! Sources are loaded once per filename and addressed by [`SourceId`].
//! Every master referring to the same file shares one [`SourceFont`].
//! Expansion mutates sources through `&mut SourceArena`; compilation
//! only ever sees `&SourceArena`, so the borrow checker enforces that
//! no source changes once compilation starts.

use std::collections::BTreeMap;

use font_types::Tag;
use indexmap::IndexMap;
use kurbo::{Affine, BezPath};
use log::debug;

use crate::{
    DEFAULT_LAYER_NAME,
    error::{Error, Result},
};

/// A reference to another glyph placed with an affine transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub base: String,
    pub transform: Affine,
}

/// A glyph as drawn in one layer of a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glyph {
    pub name: String,
    pub advance: u16,
    /// Contours built from line and quadratic segments.
    pub outline: BezPath,
    pub components: Vec<Component>,
    pub codepoints: Vec<char>,
    /// TrueType glyph program, only written for outline glyphs
    pub instructions: Vec<u8>,
}

impl Glyph {
    pub fn new(name: &str, advance: u16) -> Self {
        Self { name: name.to_string(), advance, ..Default::default() }
    }

    pub fn with_outline(mut self, outline: BezPath) -> Self {
        self.outline = outline;
        self
    }

    pub fn with_component(mut self, base: &str, transform: Affine) -> Self {
        self.components.push(Component { base: base.to_string(), transform });
        self
    }

    pub fn with_codepoint(mut self, codepoint: char) -> Self {
        self.codepoints.push(codepoint);
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<Vec<u8>>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Copy outline, components, advance and instructions under a new name.
    ///
    /// Codepoints are not carried over.
    pub fn copy_as(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            advance: self.advance,
            outline: self.outline.clone(),
            components: self.components.clone(),
            codepoints: Vec::new(),
            instructions: self.instructions.clone(),
        }
    }

    pub fn is_composite(&self) -> bool {
        !self.components.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.outline.elements().is_empty() && self.components.is_empty()
    }
}

/// A named glyph set within a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    pub name: String,
    glyphs: IndexMap<String, Glyph>,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), glyphs: IndexMap::new() }
    }

    pub fn with_glyph(mut self, glyph: Glyph) -> Self {
        self.insert(glyph);
        self
    }

    /// Insert a glyph, replacing any glyph of the same name in place.
    pub fn insert(&mut self, glyph: Glyph) {
        self.glyphs.insert(glyph.name.clone(), glyph);
    }

    pub fn get(&self, name: &str) -> Option<&Glyph> {
        self.glyphs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.glyphs.contains_key(name)
    }

    pub fn glyph_names(&self) -> impl Iterator<Item = &str> {
        self.glyphs.keys().map(String::as_str)
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.values()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Font-wide metadata a compiler needs besides glyphs.
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub family_name: String,
    pub style_name: String,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub x_height: i16,
    pub cap_height: i16,
    pub italic_angle: f64,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub weight_class: u16,
    pub width_class: u16,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            family_name: "Untitled".to_string(),
            style_name: "Regular".to_string(),
            units_per_em: 1000,
            ascender: 800,
            descender: -200,
            line_gap: 0,
            x_height: 500,
            cap_height: 700,
            italic_angle: 0.0,
            underline_position: -100,
            underline_thickness: 50,
            weight_class: 400,
            width_class: 5,
        }
    }
}

/// One loaded source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFont {
    pub filename: String,
    pub info: FontInfo,
    layers: IndexMap<String, Layer>,
    /// Prebuilt binary tables (hinting programs, layout tables) carried
    /// into every full master compiled from this source.
    pub extra_tables: BTreeMap<Tag, Vec<u8>>,
}

impl SourceFont {
    /// Create a source with an empty default layer.
    pub fn new(filename: &str) -> Self {
        let mut layers = IndexMap::new();
        layers.insert(DEFAULT_LAYER_NAME.to_string(), Layer::new(DEFAULT_LAYER_NAME));
        Self {
            filename: filename.to_string(),
            info: FontInfo::default(),
            layers,
            extra_tables: BTreeMap::new(),
        }
    }

    pub fn with_info(mut self, info: FontInfo) -> Self {
        self.info = info;
        self
    }

    /// Add a glyph to the default layer.
    pub fn with_glyph(mut self, glyph: Glyph) -> Self {
        self.insert_glyph(glyph);
        self
    }

    /// Add (or replace) a named layer.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.insert(layer.name.clone(), layer);
        self
    }

    pub fn with_table(mut self, tag: Tag, data: Vec<u8>) -> Self {
        self.extra_tables.insert(tag, data);
        self
    }

    /// Insert a glyph into the default layer.
    pub fn insert_glyph(&mut self, glyph: Glyph) {
        self.default_layer_mut().insert(glyph);
    }

    pub fn default_layer(&self) -> &Layer {
        // inserted by `new` and never removed
        &self.layers[DEFAULT_LAYER_NAME]
    }

    fn default_layer_mut(&mut self) -> &mut Layer {
        self.layers
            .entry(DEFAULT_LAYER_NAME.to_string())
            .or_insert_with(|| Layer::new(DEFAULT_LAYER_NAME))
    }

    /// Look up a layer; `None` selects the default layer.
    pub fn layer(&self, name: Option<&str>) -> Option<&Layer> {
        match name {
            None => Some(self.default_layer()),
            Some(name) => self.layers.get(name),
        }
    }

    /// Like [`layer`](Self::layer) but failing with [`Error::UnknownLayer`].
    pub fn require_layer(&self, name: Option<&str>) -> Result<&Layer> {
        self.layer(name).ok_or_else(|| Error::UnknownLayer {
            source_name: self.filename.clone(),
            layer: name.unwrap_or(DEFAULT_LAYER_NAME).to_string(),
        })
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }
}

/// Handle to a [`SourceFont`] inside a [`SourceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(usize);

impl SourceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Loads source fonts by filename.
pub trait SourceLoader {
    fn load(&self, filename: &str) -> Result<SourceFont>;
}

/// Owner of every loaded source, deduplicated by filename.
#[derive(Debug, Clone, Default)]
pub struct SourceArena {
    fonts: Vec<SourceFont>,
    by_filename: IndexMap<String, SourceId>,
}

impl SourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. A source whose filename is already present is not
    /// added again; the existing handle is returned.
    pub fn insert(&mut self, font: SourceFont) -> SourceId {
        if let Some(&id) = self.by_filename.get(&font.filename) {
            debug!("Source '{}' already loaded", font.filename);
            return id;
        }
        let id = SourceId(self.fonts.len());
        self.by_filename.insert(font.filename.clone(), id);
        self.fonts.push(font);
        id
    }

    /// Load a source through `loader` unless it is already present.
    pub fn load(&mut self, filename: &str, loader: &dyn SourceLoader) -> Result<SourceId> {
        if let Some(&id) = self.by_filename.get(filename) {
            return Ok(id);
        }
        let font = loader.load(filename)?;
        let id = SourceId(self.fonts.len());
        self.by_filename.insert(filename.to_string(), id);
        self.fonts.push(font);
        Ok(id)
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceFont> {
        self.fonts.get(id.0)
    }

    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut SourceFont> {
        self.fonts.get_mut(id.0)
    }

    pub fn find(&self, filename: &str) -> Option<SourceId> {
        self.by_filename.get(filename).copied()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
