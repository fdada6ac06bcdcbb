//! Metrics variations table.

use read_fonts::{
    FontRef, TableProvider,
    tables::mvar::tags as mvar_tags,
    types::{MajorMinor, Tag},
};
use write_fonts::tables::{
    mvar::{Mvar, ValueRecord},
    variations::ivs_builder::VariationStoreBuilder,
};

use super::{region_deltas, select};
use crate::{error::Result, masters::Masters};

/// Font-wide metrics tracked in MVAR, read from one master
fn font_metrics(font: &FontRef) -> Vec<(Tag, Option<i32>)> {
    let os2 = font.os2().ok();
    let post = font.post().ok();
    let hhea = font.hhea().ok();

    let from_os2 = |f: fn(&read_fonts::tables::os2::Os2) -> i32| os2.as_ref().map(f);

    vec![
        (mvar_tags::HASC, from_os2(|t| i32::from(t.s_typo_ascender()))),
        (mvar_tags::HDSC, from_os2(|t| i32::from(t.s_typo_descender()))),
        (mvar_tags::HLGP, from_os2(|t| i32::from(t.s_typo_line_gap()))),
        (mvar_tags::HCLA, from_os2(|t| i32::from(t.us_win_ascent()))),
        (mvar_tags::HCLD, from_os2(|t| i32::from(t.us_win_descent()))),
        (mvar_tags::XHGT, os2.as_ref().and_then(|t| t.sx_height()).map(i32::from)),
        (mvar_tags::CPHT, os2.as_ref().and_then(|t| t.s_cap_height()).map(i32::from)),
        (mvar_tags::SBXS, from_os2(|t| i32::from(t.y_subscript_x_size()))),
        (mvar_tags::SBYS, from_os2(|t| i32::from(t.y_subscript_y_size()))),
        (mvar_tags::SBXO, from_os2(|t| i32::from(t.y_subscript_x_offset()))),
        (mvar_tags::SBYO, from_os2(|t| i32::from(t.y_subscript_y_offset()))),
        (mvar_tags::SPXS, from_os2(|t| i32::from(t.y_superscript_x_size()))),
        (mvar_tags::SPYS, from_os2(|t| i32::from(t.y_superscript_y_size()))),
        (mvar_tags::SPXO, from_os2(|t| i32::from(t.y_superscript_x_offset()))),
        (mvar_tags::SPYO, from_os2(|t| i32::from(t.y_superscript_y_offset()))),
        (mvar_tags::STRS, from_os2(|t| i32::from(t.y_strikeout_size()))),
        (mvar_tags::STRO, from_os2(|t| i32::from(t.y_strikeout_position()))),
        (mvar_tags::UNDO, post.as_ref().map(|t| i32::from(t.underline_position().to_i16()))),
        (mvar_tags::UNDS, post.as_ref().map(|t| i32::from(t.underline_thickness().to_i16()))),
        (mvar_tags::HCRS, hhea.as_ref().map(|t| i32::from(t.caret_slope_rise()))),
        (mvar_tags::HCRN, hhea.as_ref().map(|t| i32::from(t.caret_slope_run()))),
        (mvar_tags::HCOF, hhea.as_ref().map(|t| i32::from(t.caret_offset()))),
    ]
}

/// Build MVAR from the full masters' font-wide metrics.
///
/// Returns `None` when no metric varies.
pub(crate) fn build_mvar(masters: &Masters) -> Result<Option<Mvar>> {
    let full = masters.full_mask();
    let model = masters.model.sub_model(&full)?;
    let per_master: Vec<Vec<(Tag, Option<i32>)>> =
        masters.fonts.iter().map(font_metrics).collect();

    let mut builder = VariationStoreBuilder::new(masters.model.axis_count() as u16);
    let mut pending = Vec::new();
    let base_metrics = &per_master[masters.base];
    for (metric_idx, (tag, base_value)) in base_metrics.iter().enumerate() {
        if base_value.is_none() {
            continue;
        }
        let values: Vec<f64> = per_master
            .iter()
            .map(|metrics| metrics[metric_idx].1.or(*base_value).unwrap_or(0) as f64)
            .collect();
        let values = select(&values, &full);
        if values.iter().all(|v| *v == values[0]) {
            continue;
        }
        let deltas = region_deltas(&model, &values);
        if deltas.is_empty() {
            continue;
        }
        pending.push((*tag, builder.add_deltas(deltas)));
    }

    if pending.is_empty() {
        return Ok(None);
    }

    let (store, key_map) = builder.build();
    let mut records: Vec<ValueRecord> = pending
        .into_iter()
        .filter_map(|(tag, id)| {
            let index = key_map.get(id)?;
            Some(ValueRecord::new(tag, index.delta_set_outer_index, index.delta_set_inner_index))
        })
        .collect();
    records.sort_by_key(|r| r.value_tag);

    Ok(Some(Mvar::new(MajorMinor::new(1, 0), Some(store), records)))
}
