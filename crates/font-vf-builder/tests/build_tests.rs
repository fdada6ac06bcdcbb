//! End-to-end variable font builds from in-memory sources.

use font_types::Tag;
use kurbo::BezPath;
use log::Level;
use read_fonts::{FontRef, TableProvider, tables::layout::Condition};
use skrifa::{
    MetadataProvider,
    instance::Size,
    outline::{DrawSettings, OutlinePen},
};
use varlayer_font_designspace::{
    Axis, CollectingDiagnostics, DesignSpace, Glyph, Instance, Layer, Location, MasterSource,
    SourceArena, SourceFont,
};
use varlayer_font_vf_builder::{
    Error, MasterCompiler, MasterInput, Options, TrueTypeCompiler, VariationModel,
    build_variable_font, compile_masters, generate_variable_font,
};
use write_fonts::{
    FontBuilder,
    tables::{
        gpos::{
            ExtensionPosFormat1, ExtensionSubtable, Gpos, PairPos, PairPosFormat1, PairSet,
            PairValueRecord, PositionLookup, ValueRecord,
        },
        layout::{
            CoverageTable, Feature, FeatureList, FeatureRecord, LangSys, Lookup, LookupFlag,
            LookupList, Script, ScriptList, ScriptRecord,
        },
    },
    types::GlyphId16,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn square(size: f64) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.line_to((0.0, size));
    path.line_to((size, size));
    path.line_to((size, 0.0));
    path.close_path();
    path
}

fn glyph(name: &str, size: f64) -> Glyph {
    Glyph::new(name, (size as u16) + 100).with_outline(square(size))
}

/// Two masters on a 100..900 weight axis, default at 100.
fn weight_space(regular: SourceFont, black: SourceFont) -> (DesignSpace, SourceArena) {
    let mut arena = SourceArena::new();
    let regular = arena.insert(regular);
    let black = arena.insert(black);

    let mut ds = DesignSpace::new();
    ds.add_axis(Axis::new(Tag::new(b"wght"), "Weight", 100.0, 100.0, 900.0)).unwrap();
    ds.add_master(
        MasterSource::new("Regular", "Regular.ufo", Location::new().with("Weight", 100.0))
            .with_source(regular),
    )
    .unwrap();
    ds.add_master(
        MasterSource::new("Black", "Black.ufo", Location::new().with("Weight", 900.0))
            .with_source(black),
    )
    .unwrap();
    (ds, arena)
}

fn simple_space() -> (DesignSpace, SourceArena) {
    weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0).with_codepoint('a'))
            .with_glyph(glyph("b", 100.0).with_codepoint('b')),
        SourceFont::new("Black.ufo")
            .with_glyph(glyph("a", 200.0).with_codepoint('a'))
            .with_glyph(glyph("b", 200.0).with_codepoint('b')),
    )
}

fn build(
    ds: &mut DesignSpace,
    arena: &mut SourceArena,
    options: &Options,
) -> (Vec<u8>, CollectingDiagnostics) {
    let diagnostics = CollectingDiagnostics::new();
    let data = generate_variable_font(ds, arena, &TrueTypeCompiler, options, &diagnostics)
        .unwrap_or_else(|failure| panic!("build failed: {failure}"));
    (data, diagnostics)
}

/// Tracks the rightmost x coordinate drawn.
#[derive(Default)]
struct MaxX(f32);

impl OutlinePen for MaxX {
    fn move_to(&mut self, x: f32, _y: f32) {
        self.0 = self.0.max(x);
    }

    fn line_to(&mut self, x: f32, _y: f32) {
        self.0 = self.0.max(x);
    }

    fn quad_to(&mut self, _cx0: f32, _cy0: f32, x: f32, y: f32) {
        self.line_to(x, y);
    }

    fn curve_to(&mut self, _cx0: f32, _cy0: f32, _cx1: f32, _cy1: f32, x: f32, y: f32) {
        self.line_to(x, y);
    }

    fn close(&mut self) {}
}

/// Width of the square glyph `gid` at `weight`.
fn width_at(data: &[u8], gid: u32, weight: f32) -> f32 {
    let font = skrifa::FontRef::new(data).unwrap();
    let location = font.axes().location([("wght", weight)]);
    let glyph = font.outline_glyphs().get(skrifa::GlyphId::new(gid)).unwrap();
    let mut pen = MaxX::default();
    glyph.draw(DrawSettings::unhinted(Size::unscaled(), &location), &mut pen).unwrap();
    pen.0
}

// ============================================================================
// Variation tables
// ============================================================================

#[test]
fn builds_variation_tables() {
    init();
    let (mut ds, mut arena) = simple_space();
    ds.add_instance(Instance::new("Black", Location::new().with("Weight", 900.0))).unwrap();
    let (data, _) = build(&mut ds, &mut arena, &Options::default());

    let font = FontRef::new(&data).unwrap();
    let fvar = font.fvar().unwrap();
    assert_eq!(fvar.axis_count(), 1);
    assert_eq!(fvar.instance_count(), 1);
    let axis = &fvar.axes().unwrap()[0];
    assert_eq!(axis.axis_tag(), Tag::new(b"wght"));
    assert_eq!(axis.min_value().to_f64(), 100.0);
    assert_eq!(axis.max_value().to_f64(), 900.0);

    for tag in [b"avar", b"STAT", b"HVAR", b"gvar", b"glyf", b"cmap", b"name"] {
        assert!(font.table_data(Tag::new(tag)).is_some(), "missing {}", Tag::new(tag));
    }
    assert!(font.table_data(Tag::new(b"GSUB")).is_none());
}

#[test]
fn outlines_and_advances_interpolate() {
    init();
    let (mut ds, mut arena) = simple_space();
    let (data, _) = build(&mut ds, &mut arena, &Options::default());

    assert_eq!(width_at(&data, 0, 100.0), 100.0);
    assert_eq!(width_at(&data, 0, 500.0), 150.0);
    assert_eq!(width_at(&data, 0, 900.0), 200.0);

    let font = skrifa::FontRef::new(&data).unwrap();
    let location = font.axes().location([("wght", 500.0)]);
    let metrics = font.glyph_metrics(Size::unscaled(), &location);
    assert_eq!(metrics.advance_width(skrifa::GlyphId::new(1)), Some(250.0));
}

#[test]
fn optimized_gvar_interpolates_the_same() {
    init();
    let (mut ds, mut arena) = simple_space();
    let (data, _) = build(&mut ds, &mut arena, &Options::new().optimize_gvar(true));
    assert_eq!(width_at(&data, 1, 500.0), 150.0);
}

#[test]
fn output_is_deterministic() {
    init();
    let (mut ds, mut arena) = simple_space();
    let (first, _) = build(&mut ds, &mut arena, &Options::default());
    let (mut ds, mut arena) = simple_space();
    let (second, _) = build(&mut ds, &mut arena, &Options::default());
    assert_eq!(first, second);
}

#[test]
fn dropped_tables_are_left_out() {
    init();
    let (mut ds, mut arena) = simple_space();
    let (data, _) = build(&mut ds, &mut arena, &Options::new().drop_tables(["STAT", "MVAR"]));
    let font = FontRef::new(&data).unwrap();
    assert!(font.table_data(Tag::new(b"STAT")).is_none());
    assert!(font.table_data(Tag::new(b"fvar")).is_some());
}

// ============================================================================
// Sparse masters
// ============================================================================

#[test]
fn sparse_master_shapes_its_glyphs_only() {
    init();
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_glyph(glyph("b", 100.0))
            .with_layer(Layer::new("{500}").with_glyph(glyph("a", 130.0))),
        SourceFont::new("Black.ufo").with_glyph(glyph("a", 200.0)).with_glyph(glyph("b", 200.0)),
    );
    let (data, _) = build(&mut ds, &mut arena, &Options::default());
    assert_eq!(ds.masters().len(), 3);

    // 'a' passes through the sparse master, 'b' interpolates straight
    assert_eq!(width_at(&data, 0, 500.0), 130.0);
    assert_eq!(width_at(&data, 0, 300.0), 115.0);
    assert_eq!(width_at(&data, 0, 700.0), 165.0);
    assert_eq!(width_at(&data, 1, 500.0), 150.0);
}

#[test]
fn incompatible_outlines_are_a_merge_error() {
    init();
    let mut triangle = BezPath::new();
    triangle.move_to((0.0, 0.0));
    triangle.line_to((100.0, 200.0));
    triangle.line_to((200.0, 0.0));
    triangle.close_path();
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo").with_glyph(glyph("a", 100.0)),
        SourceFont::new("Black.ufo").with_glyph(Glyph::new("a", 300).with_outline(triangle)),
    );

    let failure = generate_variable_font(
        &mut ds,
        &mut arena,
        &TrueTypeCompiler,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(matches!(failure.error, Error::MergeInvariant { table: "gvar", .. }));
    assert_eq!(failure.masters.len(), 2);
}

#[test]
fn deltas_beyond_16_bits_are_a_merge_error() {
    init();
    let bar = |x: f64| {
        let mut path = BezPath::new();
        path.move_to((x, 0.0));
        path.line_to((x, 100.0));
        path.line_to((0.0, 100.0));
        path.line_to((0.0, 0.0));
        path.close_path();
        Glyph::new("a", 500).with_outline(path)
    };
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo").with_glyph(bar(-30000.0)),
        SourceFont::new("Black.ufo").with_glyph(bar(30000.0)),
    );

    let failure = generate_variable_font(
        &mut ds,
        &mut arena,
        &TrueTypeCompiler,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(
        matches!(&failure.error, Error::MergeInvariant { table: "gvar", message } if message.contains("16 bits")),
        "{}",
        failure.error
    );
}

// ============================================================================
// Substitution rules
// ============================================================================

#[test]
fn bracket_layer_becomes_one_feature_variation() {
    init();
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_glyph(glyph("dollar", 100.0).with_codepoint('$'))
            .with_layer(Layer::new("Regular [400]").with_glyph(glyph("dollar", 110.0))),
        SourceFont::new("Black.ufo")
            .with_glyph(glyph("a", 200.0))
            .with_glyph(glyph("dollar", 200.0).with_codepoint('$'))
            .with_layer(Layer::new("Black [400]").with_glyph(glyph("dollar", 210.0))),
    );
    let (data, _) = build(&mut ds, &mut arena, &Options::default());
    assert_eq!(ds.rules().len(), 1);

    let font = FontRef::new(&data).unwrap();
    let gsub = font.gsub().unwrap();
    let feature_records = gsub.feature_list().unwrap().feature_records();
    assert_eq!(feature_records.len(), 1);
    assert_eq!(feature_records[0].feature_tag(), Tag::new(b"rvrn"));
    assert_eq!(gsub.lookup_list().unwrap().lookup_count(), 1);

    let variations = gsub.feature_variations().unwrap().unwrap();
    let records = variations.feature_variation_records();
    assert_eq!(records.len(), 1);
    let condition_set = records[0].condition_set(variations.offset_data()).unwrap().unwrap();
    match condition_set.conditions().get(0).unwrap() {
        Condition::Format1AxisRange(range) => {
            assert_eq!(range.axis_index(), 0);
            assert_eq!(range.filter_range_min_value().to_f32(), 0.375);
            assert_eq!(range.filter_range_max_value().to_f32(), 1.0);
        }
        _ => panic!("expected an axis range condition"),
    }

    // The clone interpolates between its own bracket outlines
    assert_eq!(width_at(&data, 2, 900.0), 210.0);
}

// ============================================================================
// Layout and hinting
// ============================================================================

/// Pair adjustment kerning `a` (gid 0) against `b` (gid 1).
fn kern_pair(advance: i16) -> PairPos {
    let record = PairValueRecord::new(
        GlyphId16::new(1),
        ValueRecord::new().with_x_advance(advance),
        ValueRecord::new(),
    );
    PairPos::Format1(PairPosFormat1::new(
        CoverageTable::format_1(vec![GlyphId16::new(0)]),
        vec![PairSet::new(vec![record])],
    ))
}

/// GPOS with `lookup` as its only `kern` lookup.
fn kern_gpos(lookup: PositionLookup) -> Vec<u8> {
    let gpos = Gpos::new(
        ScriptList::new(vec![ScriptRecord::new(
            Tag::new(b"DFLT"),
            Script::new(Some(LangSys::new(vec![0])), vec![]),
        )]),
        FeatureList::new(vec![FeatureRecord::new(Tag::new(b"kern"), Feature::new(None, vec![0]))]),
        LookupList::new(vec![lookup]),
    );
    write_fonts::dump_table(&gpos).unwrap()
}

fn kern_table(advance: i16) -> Vec<u8> {
    kern_gpos(PositionLookup::Pair(Lookup::new(LookupFlag::empty(), vec![kern_pair(advance)])))
}

/// The same kerning wrapped in an extension lookup.
fn extension_kern_table(advance: i16) -> Vec<u8> {
    kern_gpos(PositionLookup::Extension(Lookup::new(
        LookupFlag::empty(),
        vec![ExtensionSubtable::Pair(ExtensionPosFormat1::new(2, kern_pair(advance)))],
    )))
}

#[test]
fn varying_kerning_moves_into_gdef() {
    init();
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_glyph(glyph("b", 100.0))
            .with_table(Tag::new(b"GPOS"), kern_table(-50)),
        SourceFont::new("Black.ufo")
            .with_glyph(glyph("a", 200.0))
            .with_glyph(glyph("b", 200.0))
            .with_table(Tag::new(b"GPOS"), kern_table(-80)),
    );
    let (data, _) = build(&mut ds, &mut arena, &Options::default());

    let font = FontRef::new(&data).unwrap();
    assert!(font.gpos().is_ok());
    let store = font.gdef().unwrap().item_var_store().unwrap().unwrap();
    assert_eq!(store.item_variation_data_count(), 1);
}

#[test]
fn varying_extension_kerning_moves_into_gdef() {
    init();
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_glyph(glyph("b", 100.0))
            .with_table(Tag::new(b"GPOS"), extension_kern_table(-50)),
        SourceFont::new("Black.ufo")
            .with_glyph(glyph("a", 200.0))
            .with_glyph(glyph("b", 200.0))
            .with_table(Tag::new(b"GPOS"), extension_kern_table(-80)),
    );
    let (data, _) = build(&mut ds, &mut arena, &Options::default());

    let font = FontRef::new(&data).unwrap();
    let lookup = font.gpos().unwrap().lookup_list().unwrap().lookups().get(0).unwrap();
    assert!(matches!(lookup, read_fonts::tables::gpos::PositionLookup::Extension(_)));
    let store = font.gdef().unwrap().item_var_store().unwrap().unwrap();
    assert_eq!(store.item_variation_data_count(), 1);
}

#[test]
fn different_layout_structure_is_rejected() {
    init();
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_glyph(glyph("b", 100.0))
            .with_table(Tag::new(b"GPOS"), kern_table(-50)),
        SourceFont::new("Black.ufo").with_glyph(glyph("a", 200.0)).with_glyph(glyph("b", 200.0)),
    );
    let failure = generate_variable_font(
        &mut ds,
        &mut arena,
        &TrueTypeCompiler,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(matches!(failure.error, Error::MergeInvariant { table: "GPOS", .. }));
}

#[test]
fn differing_font_program_drops_hinting() {
    init();
    let fpgm = Tag::new(b"fpgm");
    let cvt = Tag::new(b"cvt ");
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_table(fpgm, vec![0xB0, 0])
            .with_table(cvt, vec![0, 100]),
        SourceFont::new("Black.ufo")
            .with_glyph(glyph("a", 200.0))
            .with_table(fpgm, vec![0xB0, 1])
            .with_table(cvt, vec![0, 100]),
    );
    let (data, diagnostics) = build(&mut ds, &mut arena, &Options::default());

    let font = FontRef::new(&data).unwrap();
    assert!(font.table_data(fpgm).is_none());
    assert!(font.table_data(cvt).is_none());
    let warnings = diagnostics.messages(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("fpgm"), "{warnings:?}");
    assert!(warnings[0].contains("Black"), "{warnings:?}");
    assert_eq!(width_at(&data, 0, 500.0), 150.0);
}

#[test]
fn differing_control_values_become_cvar() {
    init();
    let fpgm = Tag::new(b"fpgm");
    let cvt = Tag::new(b"cvt ");
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_table(fpgm, vec![0xB0, 0])
            .with_table(cvt, vec![0, 100, 0, 200]),
        SourceFont::new("Black.ufo")
            .with_glyph(glyph("a", 200.0))
            .with_table(fpgm, vec![0xB0, 0])
            .with_table(cvt, vec![0, 100, 1, 4]),
    );
    let (data, diagnostics) = build(&mut ds, &mut arena, &Options::default());

    assert!(diagnostics.messages(Level::Warn).is_empty());
    let font = FontRef::new(&data).unwrap();
    assert_eq!(font.table_data(fpgm).unwrap().as_bytes(), &[0xB0, 0]);
    assert_eq!(font.table_data(cvt).unwrap().as_bytes(), &[0, 100, 0, 200]);

    let cvar = font.table_data(Tag::new(b"cvar")).unwrap();
    let cvar = cvar.as_bytes();
    // version 1.0, one tuple with shared point numbers
    assert_eq!(&cvar[0..6], &[0, 1, 0, 0, 0x80, 0x01]);
    // its peak sits at the Black master
    assert_eq!(&cvar[12..14], &[0x40, 0x00]);
}

#[test]
fn differing_glyph_programs_drop_hinting() {
    init();
    let fpgm = Tag::new(b"fpgm");
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo")
            .with_glyph(glyph("a", 100.0).with_instructions([0xB0, 1]))
            .with_glyph(glyph("b", 100.0).with_instructions([0xB0, 2]))
            .with_table(fpgm, vec![0xB0, 0]),
        SourceFont::new("Black.ufo")
            .with_glyph(glyph("a", 200.0).with_instructions([0xB0, 1]))
            .with_glyph(glyph("b", 200.0).with_instructions([0xB0, 3]))
            .with_table(fpgm, vec![0xB0, 0]),
    );
    let (data, diagnostics) = build(&mut ds, &mut arena, &Options::default());

    let warnings = diagnostics.messages(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("glyph 'b'"), "{warnings:?}");
    assert!(warnings[0].contains("Black"), "{warnings:?}");

    let font = FontRef::new(&data).unwrap();
    assert!(font.table_data(fpgm).is_none());
    let glyf = font.glyf().unwrap();
    let loca = font.loca(None).unwrap();
    for gid in 0..2 {
        match loca.get_glyf(read_fonts::types::GlyphId::new(gid), &glyf).unwrap() {
            Some(read_fonts::tables::glyf::Glyph::Simple(simple)) => {
                assert!(simple.instructions().is_empty());
            }
            _ => panic!("expected a simple glyph"),
        }
    }
    assert_eq!(font.maxp().unwrap().max_size_of_instructions(), Some(0));
    assert_eq!(width_at(&data, 1, 500.0), 150.0);
}

#[test]
fn matching_glyph_programs_are_kept() {
    init();
    let (mut ds, mut arena) = weight_space(
        SourceFont::new("Regular.ufo").with_glyph(glyph("a", 100.0).with_instructions([0xB0, 1])),
        SourceFont::new("Black.ufo").with_glyph(glyph("a", 200.0).with_instructions([0xB0, 1])),
    );
    let (data, diagnostics) = build(&mut ds, &mut arena, &Options::default());

    assert!(diagnostics.messages(Level::Warn).is_empty());
    let font = FontRef::new(&data).unwrap();
    let glyf = font.glyf().unwrap();
    let loca = font.loca(None).unwrap();
    match loca.get_glyf(read_fonts::types::GlyphId::new(0), &glyf).unwrap() {
        Some(read_fonts::tables::glyf::Glyph::Simple(simple)) => {
            assert_eq!(simple.instructions(), &[0xB0, 1]);
        }
        _ => panic!("expected a simple glyph"),
    }
}

// ============================================================================
// Base master and master format errors
// ============================================================================

#[test]
fn missing_base_master_fails() {
    init();
    let mut arena = SourceArena::new();
    let light = arena.insert(SourceFont::new("Light.ufo").with_glyph(glyph("a", 100.0)));
    let bold = arena.insert(SourceFont::new("Bold.ufo").with_glyph(glyph("a", 200.0)));
    let mut ds = DesignSpace::new();
    ds.add_axis(Axis::new(Tag::new(b"wght"), "Weight", 100.0, 400.0, 900.0)).unwrap();
    ds.add_master(
        MasterSource::new("Light", "Light.ufo", Location::new().with("Weight", 100.0))
            .with_source(light),
    )
    .unwrap();
    ds.add_master(
        MasterSource::new("Bold", "Bold.ufo", Location::new().with("Weight", 900.0))
            .with_source(bold),
    )
    .unwrap();

    let failure = generate_variable_font(
        &mut ds,
        &mut arena,
        &TrueTypeCompiler,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(matches!(failure.error, Error::NoBaseMaster));
    assert_eq!(failure.masters.len(), 2);
}

#[test]
fn ambiguous_base_master_keeps_compiled_masters() {
    init();
    let (mut ds, mut arena) = simple_space();
    let regular = ds.masters()[0].source.unwrap();
    ds.add_master(
        MasterSource::new("Regular copy", "Regular.ufo", Location::new().with("Weight", 100.0))
            .with_source(regular),
    )
    .unwrap();

    let failure = generate_variable_font(
        &mut ds,
        &mut arena,
        &TrueTypeCompiler,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(matches!(failure.error, Error::AmbiguousBaseMaster { first: 0, second: 2 }));
    assert_eq!(failure.masters.len(), 3);

    let dir = std::env::temp_dir().join(format!("varlayer-masters-{}", std::process::id()));
    let paths = failure.write_masters(&dir).unwrap();
    assert_eq!(paths.len(), 3);
    assert!(paths[2].ends_with("2.ttf"));
    let saved = std::fs::read(&paths[1]).unwrap();
    assert_eq!(saved, failure.masters[1].data);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn sparse_base_master_is_rejected() {
    init();
    let (ds, arena) = simple_space();
    let mut masters = compile_masters(
        &ds,
        &arena,
        &TrueTypeCompiler,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap();
    masters[0].sparse = true;
    let model = VariationModel::from_designspace(&ds).unwrap();

    let err = build_variable_font(
        &ds,
        &masters,
        &model,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidBaseMaster(name) if name == "Regular"));
}

#[test]
fn brace_layer_at_default_location_keeps_compiled_masters() {
    init();
    let mut arena = SourceArena::new();
    let light = arena.insert(
        SourceFont::new("Light.ufo")
            .with_glyph(glyph("a", 100.0))
            .with_layer(Layer::new("{400}").with_glyph(glyph("a", 150.0))),
    );
    let black = arena.insert(SourceFont::new("Black.ufo").with_glyph(glyph("a", 200.0)));
    let mut ds = DesignSpace::new();
    ds.add_axis(Axis::new(Tag::new(b"wght"), "Weight", 100.0, 400.0, 900.0)).unwrap();
    ds.add_master(
        MasterSource::new("Light", "Light.ufo", Location::new().with("Weight", 100.0))
            .with_source(light),
    )
    .unwrap();
    ds.add_master(
        MasterSource::new("Black", "Black.ufo", Location::new().with("Weight", 900.0))
            .with_source(black),
    )
    .unwrap();

    let failure = generate_variable_font(
        &mut ds,
        &mut arena,
        &TrueTypeCompiler,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(matches!(&failure.error, Error::InvalidBaseMaster(name) if name == "Light {400}"));
    assert_eq!(failure.masters.len(), 3);
    assert!(failure.masters[2].sparse);
}

/// Compiles every master, then strips outlines from `Black`.
struct StripOutlines;

impl MasterCompiler for StripOutlines {
    fn compile(&self, input: &MasterInput<'_>) -> varlayer_font_vf_builder::Result<Vec<u8>> {
        let data = TrueTypeCompiler.compile(input)?;
        if input.name != "Black" {
            return Ok(data);
        }
        let font = FontRef::new(&data)?;
        let mut builder = FontBuilder::new();
        for record in font.table_directory.table_records() {
            let tag = record.tag();
            if tag != Tag::new(b"glyf")
                && tag != Tag::new(b"loca")
                && let Some(table) = font.table_data(tag)
            {
                builder.add_raw(tag, table);
            }
        }
        Ok(builder.build())
    }
}

#[test]
fn masters_without_glyf_are_unsupported() {
    init();
    let (mut ds, mut arena) = simple_space();
    let failure = generate_variable_font(
        &mut ds,
        &mut arena,
        &StripOutlines,
        &Options::default(),
        &CollectingDiagnostics::new(),
    )
    .unwrap_err();
    assert!(matches!(
        failure.error,
        Error::UnsupportedMasterFormat { index: 1, ref name } if name == "Black"
    ));
}
