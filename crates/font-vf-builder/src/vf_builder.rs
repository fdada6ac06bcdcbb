//! Variable font merger.
//!
//! Merges compiled masters into one variable font. The default master
//! seeds every table that does not vary; the variation tables are built
//! from all masters through the variation model.

use std::{collections::HashSet, time::Instant};

use log::{debug, info};
use read_fonts::types::Tag;
use varlayer_font_designspace::{DesignSpace, Diagnostics};
use write_fonts::FontBuilder;

use crate::{
    compiler::CompiledMaster,
    error::{Error, Result},
    masters::Masters,
    options::Options,
    tables::{
        avar::build_avar,
        feature_variations::add_feature_variations,
        fvar::build_fvar,
        gvar::build_gvar,
        hint::{HINT_TABLES, Hinting, add_unhinted_glyphs, merge_hinting},
        hvar::build_hvar,
        layout::{build_gdef, merge_gpos, merge_gsub},
        mvar::build_mvar,
        name::NameTableBuilder,
        stat::build_stat,
    },
    variation_model::VariationModel,
};

/// Tables that are rebuilt, or that a variable font must not carry over.
const SKIP_TABLES: &[Tag] = &[
    Tag::new(b"fvar"),
    Tag::new(b"avar"),
    Tag::new(b"gvar"),
    Tag::new(b"cvar"),
    Tag::new(b"STAT"),
    Tag::new(b"HVAR"),
    Tag::new(b"MVAR"),
    Tag::new(b"DSIG"),
    Tag::new(b"name"),
    Tag::new(b"GDEF"),
    Tag::new(b"GSUB"),
    Tag::new(b"GPOS"),
];

/// Build a variable font from compiled masters.
///
/// `masters` is index-aligned with the masters of `designspace`, and
/// `model` must have been built from the same locations.
///
/// This function:
/// 1. Checks that every master is TrueType and the default is complete
/// 2. Builds fvar, avar and STAT from the axes and instances
/// 3. Builds gvar, HVAR and MVAR from the outline and metric deltas
/// 4. Merges GSUB and GPOS, adding feature variations for substitution rules
/// 5. Copies the remaining tables from the default master
pub fn build_variable_font(
    designspace: &DesignSpace,
    masters: &[CompiledMaster],
    model: &VariationModel,
    options: &Options,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<u8>> {
    let start = Instant::now();
    if model.axis_count() != designspace.axes().len() {
        return Err(Error::merge(
            "fvar",
            format!(
                "variation model has {} axes, design space has {}",
                model.axis_count(),
                designspace.axes().len()
            ),
        ));
    }
    let masters = Masters::new(masters, model)?;
    diagnostics.info(&format!(
        "Building variable font from {} masters (default: '{}')",
        masters.len(),
        masters.name(masters.base)
    ));

    let mut names = NameTableBuilder::new(masters.base_font());
    let fvar = build_fvar(designspace, &mut names);
    let stat = build_stat(designspace, &mut names);
    let avar = build_avar(designspace);
    debug!("Built fvar, STAT and avar for {} axes", designspace.axes().len());

    let gvar_start = Instant::now();
    let gvar = build_gvar(&masters, options)?;
    info!("Built gvar table in {:.2}s", gvar_start.elapsed().as_secs_f64());

    let hvar = build_hvar(&masters)?;
    let mvar = build_mvar(&masters)?;
    debug!("Built HVAR{}", if mvar.is_some() { " and MVAR" } else { "" });

    let gsub = merge_gsub(&masters)?;
    let gsub =
        add_feature_variations(designspace, &masters, gsub, options.feature_variation_tag)?;
    let positioning = merge_gpos(&masters)?;
    let gdef = build_gdef(&masters, positioning.var_store);

    let hinting = merge_hinting(&masters, diagnostics)?;
    debug!("Hinting: {hinting:?}");

    let name = names.build();

    // Assemble the font
    let mut builder = FontBuilder::new();
    if !options.should_drop(Tag::new(b"fvar")) {
        builder.add_table(&fvar)?;
    }
    if !options.should_drop(Tag::new(b"avar")) {
        builder.add_table(&avar)?;
    }
    if !options.should_drop(Tag::new(b"STAT")) {
        builder.add_table(&stat)?;
    }
    if !options.should_drop(Tag::new(b"name")) {
        builder.add_table(&name)?;
    }
    if !options.should_drop(Tag::new(b"gvar")) {
        builder.add_table(&gvar)?;
    }
    if !options.should_drop(Tag::new(b"HVAR")) {
        builder.add_table(&hvar)?;
    }
    if let Some(mvar) = mvar.filter(|_| !options.should_drop(Tag::new(b"MVAR"))) {
        builder.add_table(&mvar)?;
    }
    if let Some(gsub) = gsub.filter(|_| !options.should_drop(Tag::new(b"GSUB"))) {
        builder.add_table(&gsub)?;
    }
    if let Some(gpos) = positioning.gpos.filter(|_| !options.should_drop(Tag::new(b"GPOS"))) {
        builder.add_table(&gpos)?;
    }
    if let Some(gdef) = gdef.filter(|_| !options.should_drop(Tag::new(b"GDEF"))) {
        builder.add_table(&gdef)?;
    }

    // Copy tables from the default master
    let mut skip_set: HashSet<Tag> = SKIP_TABLES.iter().copied().collect();
    let base = masters.base_font();
    match hinting {
        Hinting::Keep { cvar: Some(cvar) } if !options.should_drop(Tag::new(b"cvar")) => {
            builder.add_raw(Tag::new(b"cvar"), cvar);
        }
        Hinting::Keep { .. } => {}
        Hinting::Drop => {
            add_unhinted_glyphs(&mut builder, base)?;
            skip_set.extend(HINT_TABLES);
            skip_set.extend([b"glyf", b"loca", b"head", b"maxp"].map(Tag::new));
        }
    }
    for record in base.table_directory.table_records() {
        let tag = record.tag();
        if !skip_set.contains(&tag)
            && !options.should_drop(tag)
            && let Some(data) = base.table_data(tag)
        {
            builder.add_raw(tag, data);
        }
    }

    let data = builder.build();
    info!(
        "Built variable font ({} bytes) in {:.2}s",
        data.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(data)
}
