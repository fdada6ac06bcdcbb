//! Compiling masters into static TrueType binaries.
//!
//! The merger only ever sees compiled binaries. [`MasterCompiler`] is the
//! seam to whatever turns a source layer into a font; [`TrueTypeCompiler`]
//! is a small reference implementation building the tables the merger
//! reads.

use std::collections::HashMap;

use font_types::{F2Dot14, FWord, Fixed, LongDateTime, UfWord, Version16Dot16};
use kurbo::{Affine, Rect, Shape};
use log::{debug, info};
use rayon::prelude::*;
use read_fonts::types::{GlyphId, GlyphId16, NameId, Tag};
use varlayer_font_designspace::{
    DesignSpace, Diagnostics, Glyph, Layer, MasterSource, SourceArena, SourceFont,
};
use write_fonts::{
    FontBuilder,
    tables::{
        cmap::Cmap,
        glyf::{
            Anchor, Bbox, Component, ComponentFlags, CompositeGlyph, GlyfLocaBuilder,
            Glyph as WriteGlyph, SimpleGlyph, Transform,
        },
        head::{Flags, Head, MacStyle},
        hhea::Hhea,
        hmtx::{Hmtx, LongMetric},
        loca::LocaFormat,
        maxp::Maxp,
        name::{Name, NameRecord},
        os2::{Os2, SelectionFlags},
        post::Post,
    },
};

use crate::{
    error::{Error, Result},
    options::Options,
};

const NOTDEF: &str = ".notdef";

/// Everything a compiler needs to build one master.
#[derive(Debug, Clone, Copy)]
pub struct MasterInput<'a> {
    pub name: &'a str,
    pub source: &'a SourceFont,
    /// Layer supplying the outlines
    pub layer: &'a Layer,
    /// Whether the layer may cover only part of the glyph set
    pub sparse: bool,
    /// Glyph order shared by every master
    pub glyph_order: &'a [String],
}

/// Compiles one master into a static font binary.
///
/// The binary must contain `glyf`, `loca`, `head`, `maxp` and `hmtx` with
/// one glyph per entry of the shared glyph order, in that order. Glyphs the
/// layer does not contain must be written empty.
pub trait MasterCompiler: Sync {
    fn compile(&self, input: &MasterInput<'_>) -> Result<Vec<u8>>;
}

/// A compiled master and what it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMaster {
    pub name: String,
    pub data: Vec<u8>,
    pub glyph_order: Vec<String>,
    /// Per glyph id: whether the master's layer supplies that glyph
    pub present: Vec<bool>,
    pub sparse: bool,
}

impl CompiledMaster {
    pub fn is_present(&self, gid: GlyphId) -> bool {
        self.present.get(gid.to_u32() as usize).copied().unwrap_or(false)
    }
}

/// Compile every master of `designspace`, in master order.
pub fn compile_masters(
    designspace: &DesignSpace,
    sources: &SourceArena,
    compiler: &dyn MasterCompiler,
    options: &Options,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<CompiledMaster>> {
    let glyph_order = shared_glyph_order(designspace, sources)?;
    info!(
        "Compiling {} masters ({} glyphs each)",
        designspace.masters().len(),
        glyph_order.len()
    );

    let compile_one = |master: &MasterSource| -> Result<CompiledMaster> {
        let source = master_source(master, sources)?;
        let layer = source.require_layer(master.layer.as_deref())?;
        let input = MasterInput {
            name: &master.name,
            source,
            layer,
            sparse: master.is_sparse(),
            glyph_order: &glyph_order,
        };
        let data = compiler.compile(&input)?;
        let present: Vec<bool> = glyph_order.iter().map(|name| layer.contains(name)).collect();
        diagnostics.debug(&format!(
            "Compiled master '{}' ({} of {} glyphs)",
            master.name,
            present.iter().filter(|p| **p).count(),
            present.len()
        ));
        Ok(CompiledMaster {
            name: master.name.clone(),
            data,
            glyph_order: glyph_order.clone(),
            present,
            sparse: master.is_sparse(),
        })
    };

    if options.parallel_compile {
        designspace.masters().par_iter().map(compile_one).collect()
    } else {
        designspace.masters().iter().map(compile_one).collect()
    }
}

/// `.notdef` first when the base source has one, then the base source's
/// default layer in its own order.
///
/// The base source is the source of the first master at the default
/// location, sparse or not, falling back to the first full master. Whether
/// that master can actually serve as the base is checked after compilation.
pub fn shared_glyph_order(designspace: &DesignSpace, sources: &SourceArena) -> Result<Vec<String>> {
    let masters = designspace.masters();
    let base = masters
        .iter()
        .find(|m| designspace.normalize(&m.location).iter().all(|v| *v == 0.0))
        .or_else(|| masters.iter().find(|m| !m.is_sparse()))
        .ok_or(Error::NoBaseMaster)?;
    let layer = master_source(base, sources)?.default_layer();

    let mut order = Vec::with_capacity(layer.len());
    if layer.contains(NOTDEF) {
        order.push(NOTDEF.to_string());
    }
    order.extend(layer.glyph_names().filter(|n| *n != NOTDEF).map(str::to_string));
    Ok(order)
}

fn master_source<'a>(master: &MasterSource, sources: &'a SourceArena) -> Result<&'a SourceFont> {
    master
        .source
        .and_then(|id| sources.get(id))
        .ok_or_else(|| varlayer_font_designspace::Error::UnknownSource(master.name.clone()).into())
}

/// Reference compiler producing a minimal TrueType font.
///
/// Every master gets `glyf`, `loca`, `head`, `hhea`, `hmtx` and `maxp`. Full
/// masters additionally get `cmap`, `OS/2`, `name`, `post` and the source's
/// extra tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueTypeCompiler;

impl MasterCompiler for TrueTypeCompiler {
    fn compile(&self, input: &MasterInput<'_>) -> Result<Vec<u8>> {
        let num_glyphs = u16::try_from(input.glyph_order.len()).map_err(|_| Error::Compile {
            master: input.name.to_string(),
            message: format!("{} glyphs, at most 65535 fit in a font", input.glyph_order.len()),
        })?;
        let gids: HashMap<&str, GlyphId16> = input
            .glyph_order
            .iter()
            .zip(0..num_glyphs)
            .map(|(name, gid)| (name.as_str(), GlyphId16::new(gid)))
            .collect();

        let mut glyf_builder = GlyfLocaBuilder::new();
        let mut h_metrics = Vec::with_capacity(input.glyph_order.len());
        let mut stats = GlyphStats::default();

        for name in input.glyph_order {
            let Some(glyph) = input.layer.get(name) else {
                glyf_builder.add_glyph(&WriteGlyph::Empty)?;
                h_metrics.push(LongMetric { advance: 0, side_bearing: 0 });
                continue;
            };
            let compiled = compile_glyph(input, glyph, &gids)?;
            let bbox = glyph_bbox(&compiled);
            glyf_builder.add_glyph(&compiled)?;
            stats.add(&compiled, bbox, glyph.advance);
            h_metrics.push(LongMetric {
                advance: glyph.advance,
                side_bearing: bbox.map_or(0, |b| b.x_min),
            });
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let info = &input.source.info;
        let mut builder = FontBuilder::new();
        builder.add_table(&glyf)?;
        builder.add_table(&loca)?;
        builder.add_table(&make_head(input, &stats, loca_format))?;
        builder.add_table(&make_hhea(input, &stats, num_glyphs))?;
        builder.add_table(&Hmtx { h_metrics, left_side_bearings: vec![] })?;
        builder.add_table(&make_maxp(&stats, num_glyphs))?;

        if !input.sparse {
            let mappings: Vec<(char, GlyphId)> = input
                .glyph_order
                .iter()
                .filter_map(|name| Some((input.layer.get(name)?, gids.get(name.as_str())?)))
                .flat_map(|(glyph, gid)| {
                    glyph.codepoints.iter().map(move |c| (*c, GlyphId::from(*gid)))
                })
                .collect();
            let cmap = Cmap::from_mappings(mappings.iter().copied()).map_err(|e| {
                Error::Compile { master: input.name.to_string(), message: format!("{e:?}") }
            })?;
            builder.add_table(&cmap)?;
            builder.add_table(&make_os2(input, &stats, &mappings))?;
            builder.add_table(&make_name(input))?;
            builder.add_table(&Post {
                version: Version16Dot16::VERSION_3_0,
                italic_angle: Fixed::from_f64(info.italic_angle),
                underline_position: FWord::new(info.underline_position),
                underline_thickness: FWord::new(info.underline_thickness),
                is_fixed_pitch: 0,
                min_mem_type42: 0,
                max_mem_type42: 0,
                min_mem_type1: 0,
                max_mem_type1: 0,
                num_glyphs: None,
                glyph_name_index: None,
                string_data: None,
            })?;
            for (tag, data) in &input.source.extra_tables {
                builder.add_raw(*tag, data.clone());
            }
        }

        debug!("Compiled '{}' with {} glyphs", input.name, num_glyphs);
        Ok(builder.build())
    }
}

fn compile_glyph(
    input: &MasterInput<'_>,
    glyph: &Glyph,
    gids: &HashMap<&str, GlyphId16>,
) -> Result<WriteGlyph> {
    let compile_error =
        |message: String| Error::Compile { master: input.name.to_string(), message };

    if glyph.is_composite() {
        let mut composite: Option<CompositeGlyph> = None;
        for component in &glyph.components {
            let gid = gids.get(component.base.as_str()).ok_or_else(|| {
                compile_error(format!(
                    "glyph '{}' uses missing component '{}'",
                    glyph.name, component.base
                ))
            })?;
            let bounds = component_bounds(input, &component.base, component.transform, 0)
                .unwrap_or(Rect::ZERO);
            let part = make_component(*gid, component.transform);
            match composite.as_mut() {
                Some(composite) => composite.add_component(part, bounds),
                None => composite = Some(CompositeGlyph::new(part, bounds)),
            }
        }
        let composite = composite.ok_or_else(|| {
            compile_error(format!("glyph '{}' has no components", glyph.name))
        })?;
        return Ok(WriteGlyph::Composite(composite));
    }

    if glyph.outline.elements().is_empty() {
        return Ok(WriteGlyph::Empty);
    }
    let mut simple = SimpleGlyph::from_bezpath(&glyph.outline)
        .map_err(|e| compile_error(format!("glyph '{}': {e:?}", glyph.name)))?;
    simple.instructions = glyph.instructions.clone();
    Ok(WriteGlyph::Simple(simple))
}

fn make_component(gid: GlyphId16, transform: Affine) -> Component {
    let [xx, yx, xy, yy, dx, dy] = transform.as_coeffs();
    Component::new(
        gid,
        Anchor::Offset { x: dx.round() as i16, y: dy.round() as i16 },
        Transform {
            xx: F2Dot14::from_f32(xx as f32),
            yx: F2Dot14::from_f32(yx as f32),
            xy: F2Dot14::from_f32(xy as f32),
            yy: F2Dot14::from_f32(yy as f32),
        },
        ComponentFlags::default(),
    )
}

/// Bounds of `name` placed with `transform`, resolving nested components.
///
/// Glyphs missing from the master's layer are looked up in the source's
/// default layer.
fn component_bounds(
    input: &MasterInput<'_>,
    name: &str,
    transform: Affine,
    depth: usize,
) -> Option<Rect> {
    if depth > 64 {
        return None;
    }
    let glyph = input.layer.get(name).or_else(|| input.source.default_layer().get(name))?;
    let mut bounds = (!glyph.outline.elements().is_empty())
        .then(|| (transform * glyph.outline.clone()).bounding_box());
    for component in &glyph.components {
        if let Some(inner) =
            component_bounds(input, &component.base, transform * component.transform, depth + 1)
        {
            bounds = Some(bounds.map_or(inner, |b| b.union(inner)));
        }
    }
    bounds
}

fn glyph_bbox(glyph: &WriteGlyph) -> Option<Bbox> {
    match glyph {
        WriteGlyph::Empty => None,
        WriteGlyph::Simple(simple) => Some(simple.bbox),
        WriteGlyph::Composite(composite) => Some(composite.bbox),
    }
}

/// Running totals for head, hhea, maxp and OS/2.
#[derive(Debug, Default)]
struct GlyphStats {
    bounds: Option<Bbox>,
    advance_max: u16,
    advance_sum: u64,
    advance_count: u64,
    min_lsb: Option<i16>,
    min_rsb: Option<i16>,
    max_extent: Option<i16>,
    max_points: u16,
    max_contours: u16,
    max_components: u16,
    max_instructions: u16,
}

impl GlyphStats {
    fn add(&mut self, glyph: &WriteGlyph, bbox: Option<Bbox>, advance: u16) {
        self.advance_max = self.advance_max.max(advance);
        if advance > 0 {
            self.advance_sum += u64::from(advance);
            self.advance_count += 1;
        }
        if let Some(b) = bbox {
            self.bounds = Some(self.bounds.map_or(b, |acc| acc.union(b)));
            let rsb = (i32::from(advance) - i32::from(b.x_max))
                .clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            self.min_lsb = Some(self.min_lsb.map_or(b.x_min, |v| v.min(b.x_min)));
            self.min_rsb = Some(self.min_rsb.map_or(rsb, |v| v.min(rsb)));
            self.max_extent = Some(self.max_extent.map_or(b.x_max, |v| v.max(b.x_max)));
        }
        match glyph {
            WriteGlyph::Simple(simple) => {
                let points: usize = simple.contours.iter().map(|c| c.len()).sum();
                self.max_points = self.max_points.max(saturating_u16(points));
                self.max_contours = self.max_contours.max(saturating_u16(simple.contours.len()));
                self.max_instructions =
                    self.max_instructions.max(saturating_u16(simple.instructions.len()));
            }
            WriteGlyph::Composite(composite) => {
                self.max_components =
                    self.max_components.max(saturating_u16(composite.components().len()));
            }
            WriteGlyph::Empty => {}
        }
    }

    fn bounds(&self) -> Bbox {
        self.bounds.unwrap_or(Bbox { x_min: 0, y_min: 0, x_max: 0, y_max: 0 })
    }
}

/// maxp counts are upper bounds; anything past 16 bits pins to the top.
fn saturating_u16(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

fn make_head(input: &MasterInput<'_>, stats: &GlyphStats, loca_format: LocaFormat) -> Head {
    let bounds = stats.bounds();
    Head {
        font_revision: Fixed::from_f64(1.0),
        checksum_adjustment: 0,
        magic_number: 0x5F0F3CF5,
        flags: Flags::empty(),
        units_per_em: input.source.info.units_per_em,
        created: LongDateTime::new(0),
        modified: LongDateTime::new(0),
        x_min: bounds.x_min,
        y_min: bounds.y_min,
        x_max: bounds.x_max,
        y_max: bounds.y_max,
        mac_style: MacStyle::empty(),
        lowest_rec_ppem: 8,
        font_direction_hint: 2,
        index_to_loc_format: match loca_format {
            LocaFormat::Short => 0,
            LocaFormat::Long => 1,
        },
    }
}

fn make_hhea(input: &MasterInput<'_>, stats: &GlyphStats, num_glyphs: u16) -> Hhea {
    let info = &input.source.info;
    Hhea {
        ascender: FWord::new(info.ascender),
        descender: FWord::new(info.descender),
        line_gap: FWord::new(info.line_gap),
        advance_width_max: UfWord::new(stats.advance_max),
        min_left_side_bearing: FWord::new(stats.min_lsb.unwrap_or(0)),
        min_right_side_bearing: FWord::new(stats.min_rsb.unwrap_or(0)),
        x_max_extent: FWord::new(stats.max_extent.unwrap_or(0)),
        caret_slope_rise: 1,
        caret_slope_run: 0,
        caret_offset: 0,
        number_of_h_metrics: num_glyphs,
    }
}

fn make_maxp(stats: &GlyphStats, num_glyphs: u16) -> Maxp {
    Maxp {
        num_glyphs,
        max_points: Some(stats.max_points),
        max_contours: Some(stats.max_contours),
        max_composite_points: Some(0),
        max_composite_contours: Some(0),
        max_zones: Some(1),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(stats.max_instructions),
        max_component_elements: Some(stats.max_components),
        max_component_depth: Some(u16::from(stats.max_components > 0)),
    }
}

fn make_os2(input: &MasterInput<'_>, stats: &GlyphStats, mappings: &[(char, GlyphId)]) -> Os2 {
    let info = &input.source.info;
    let upm = f64::from(info.units_per_em);
    let scaled = |factor: f64| (upm * factor).round() as i16;
    let first_char = mappings.iter().map(|(c, _)| *c as u32).min().unwrap_or(0);
    let last_char = mappings.iter().map(|(c, _)| *c as u32).max().unwrap_or(0);
    let bounds = stats.bounds();

    Os2 {
        x_avg_char_width: stats.advance_sum.checked_div(stats.advance_count).unwrap_or(0) as i16,
        us_weight_class: info.weight_class,
        us_width_class: info.width_class,
        fs_type: 0,
        y_subscript_x_size: scaled(0.65),
        y_subscript_y_size: scaled(0.6),
        y_subscript_x_offset: 0,
        y_subscript_y_offset: scaled(0.075),
        y_superscript_x_size: scaled(0.65),
        y_superscript_y_size: scaled(0.6),
        y_superscript_x_offset: 0,
        y_superscript_y_offset: scaled(0.35),
        y_strikeout_size: info.underline_thickness,
        y_strikeout_position: (f64::from(info.x_height) * 0.6).round() as i16,
        s_family_class: 0,
        panose_10: [0; 10],
        ul_unicode_range_1: 0,
        ul_unicode_range_2: 0,
        ul_unicode_range_3: 0,
        ul_unicode_range_4: 0,
        ach_vend_id: Tag::new(b"NONE"),
        fs_selection: SelectionFlags::REGULAR | SelectionFlags::USE_TYPO_METRICS,
        us_first_char_index: first_char.min(0xFFFF) as u16,
        us_last_char_index: last_char.min(0xFFFF) as u16,
        s_typo_ascender: info.ascender,
        s_typo_descender: info.descender,
        s_typo_line_gap: info.line_gap,
        us_win_ascent: bounds.y_max.max(0) as u16,
        us_win_descent: bounds.y_min.min(0).unsigned_abs(),
        ul_code_page_range_1: Some(1),
        ul_code_page_range_2: Some(0),
        sx_height: Some(info.x_height),
        s_cap_height: Some(info.cap_height),
        us_default_char: Some(0),
        us_break_char: Some(0x20),
        us_max_context: Some(0),
        us_lower_optical_point_size: None,
        us_upper_optical_point_size: None,
    }
}

fn make_name(input: &MasterInput<'_>) -> Name {
    let info = &input.source.info;
    let full_name = format!("{} {}", info.family_name, info.style_name);
    let postscript_name: String = format!("{}-{}", info.family_name, info.style_name)
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"[](){}<>/%".contains(*c))
        .collect();
    let entries = [
        (NameId::FAMILY_NAME, info.family_name.clone()),
        (NameId::SUBFAMILY_NAME, info.style_name.clone()),
        (NameId::UNIQUE_ID, postscript_name.clone()),
        (NameId::FULL_NAME, full_name),
        (NameId::VERSION_STRING, "Version 1.000".to_string()),
        (NameId::POSTSCRIPT_NAME, postscript_name),
    ];
    let records = entries
        .into_iter()
        .map(|(id, text)| NameRecord::new(3, 1, 0x409, id, text.into()))
        .collect();
    Name::new(records)
}

#[cfg(test)]
mod tests {
    use kurbo::BezPath;
    use read_fonts::{FontRef, TableProvider};
    use varlayer_font_designspace::{Axis, Location, LogDiagnostics};

    use super::*;

    fn square(size: f64) -> BezPath {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((size, 0.0));
        path.line_to((size, size));
        path.line_to((0.0, size));
        path.close_path();
        path
    }

    fn source() -> SourceFont {
        SourceFont::new("Test.ufo")
            .with_glyph(Glyph::new(".notdef", 500).with_outline(square(400.0)))
            .with_glyph(Glyph::new("a", 520).with_outline(square(300.0)).with_codepoint('a'))
            .with_glyph(
                Glyph::new("aacute", 520).with_component("a", Affine::translate((10.0, 0.0))),
            )
            .with_glyph(Glyph::new("space", 250).with_codepoint(' '))
    }

    #[test]
    fn compiles_full_master() {
        let source = source();
        let order: Vec<String> =
            [".notdef", "a", "aacute", "space"].iter().map(|s| s.to_string()).collect();
        let input = MasterInput {
            name: "Regular",
            source: &source,
            layer: source.default_layer(),
            sparse: false,
            glyph_order: &order,
        };
        let data = TrueTypeCompiler.compile(&input).unwrap();
        let font = FontRef::new(&data).unwrap();

        assert_eq!(font.maxp().unwrap().num_glyphs(), 4);
        assert_eq!(font.hmtx().unwrap().advance(GlyphId::new(1)), Some(520));
        assert_eq!(font.hmtx().unwrap().side_bearing(GlyphId::new(2)), Some(10));
        assert_eq!(font.cmap().unwrap().map_codepoint('a'), Some(GlyphId::new(1)));
        assert!(font.os2().is_ok());
        assert!(font.name().is_ok());
    }

    #[test]
    fn sparse_master_writes_absent_glyphs_empty() {
        let source = source().with_layer(
            Layer::new("{500}").with_glyph(Glyph::new("a", 540).with_outline(square(320.0))),
        );
        let order: Vec<String> =
            [".notdef", "a", "aacute", "space"].iter().map(|s| s.to_string()).collect();
        let input = MasterInput {
            name: "Regular {500}",
            source: &source,
            layer: source.layer(Some("{500}")).unwrap(),
            sparse: true,
            glyph_order: &order,
        };
        let data = TrueTypeCompiler.compile(&input).unwrap();
        let font = FontRef::new(&data).unwrap();

        let glyf = font.glyf().unwrap();
        let loca = font.loca(None).unwrap();
        assert!(loca.get_glyf(GlyphId::new(0), &glyf).unwrap().is_none());
        assert!(loca.get_glyf(GlyphId::new(1), &glyf).unwrap().is_some());
        assert_eq!(font.hmtx().unwrap().advance(GlyphId::new(1)), Some(540));
        assert!(font.cmap().is_err());
    }

    #[test]
    fn missing_component_is_a_compile_error() {
        let source = SourceFont::new("Broken.ufo")
            .with_glyph(Glyph::new("b", 500).with_component("missing", Affine::IDENTITY));
        let order = vec!["b".to_string()];
        let input = MasterInput {
            name: "Broken",
            source: &source,
            layer: source.default_layer(),
            sparse: false,
            glyph_order: &order,
        };
        let err = TrueTypeCompiler.compile(&input).unwrap_err();
        assert!(matches!(err, Error::Compile { .. }));
    }

    #[test]
    fn too_many_glyphs_is_a_compile_error() {
        let source = SourceFont::new("Huge.ufo");
        let order: Vec<String> = (0..=u32::from(u16::MAX)).map(|i| format!("g{i}")).collect();
        let input = MasterInput {
            name: "Huge",
            source: &source,
            layer: source.default_layer(),
            sparse: false,
            glyph_order: &order,
        };
        let err = TrueTypeCompiler.compile(&input).unwrap_err();
        assert!(matches!(err, Error::Compile { ref message, .. } if message.contains("65536")));
    }

    #[test]
    fn maxp_counts_saturate() {
        assert_eq!(saturating_u16(12), 12);
        assert_eq!(saturating_u16(70_000), u16::MAX);
    }

    #[test]
    fn glyph_order_and_presence() {
        let mut arena = SourceArena::new();
        let regular = arena.insert(
            SourceFont::new("Regular.ufo")
                .with_glyph(Glyph::new("b", 500))
                .with_glyph(Glyph::new(".notdef", 500))
                .with_glyph(Glyph::new("a", 500))
                .with_layer(Layer::new("{500}").with_glyph(Glyph::new("a", 550))),
        );
        let mut ds = DesignSpace::new();
        ds.add_axis(Axis::weight()).unwrap();
        ds.add_master(
            MasterSource::new("Regular", "Regular.ufo", Location::new().with("Weight", 400.0))
                .with_source(regular),
        )
        .unwrap();
        ds.add_master(
            MasterSource::new("Medium", "Regular.ufo", Location::new().with("Weight", 500.0))
                .with_source(regular)
                .with_layer("{500}"),
        )
        .unwrap();

        assert_eq!(shared_glyph_order(&ds, &arena).unwrap(), [".notdef", "b", "a"]);

        let options = Options::new().parallel_compile(true);
        let masters =
            compile_masters(&ds, &arena, &TrueTypeCompiler, &options, &LogDiagnostics).unwrap();
        assert_eq!(masters.len(), 2);
        assert_eq!(masters[0].present, [true, true, true]);
        assert_eq!(masters[1].present, [false, false, true]);
        assert!(masters[1].sparse);
    }
}
