//! Horizontal metrics variations table.

use std::result;

use read_fonts::{
    TableProvider,
    types::GlyphId,
};
use write_fonts::tables::{hvar::Hvar, variations::ivs_builder::VariationStoreBuilder};

use super::{region_deltas, select};
use crate::{error::Result, masters::Masters, variation_model::SubModels};

/// Build HVAR with advance width deltas for every glyph.
///
/// Delta sets are stored in glyph order so no advance mapping is needed.
pub(crate) fn build_hvar(masters: &Masters) -> Result<Hvar> {
    let hmtxs = masters.fonts.iter().map(|f| f.hmtx()).collect::<result::Result<Vec<_>, _>>()?;
    let num_glyphs = masters.num_glyphs()?;
    let mut sub_models = SubModels::new(masters.model);
    let axis_count = masters.model.axis_count() as u16;
    let mut builder = VariationStoreBuilder::new_with_implicit_indices(axis_count);

    for glyph_idx in 0..num_glyphs {
        let gid = GlyphId::new(u32::from(glyph_idx));
        let present: Vec<bool> =
            (0..masters.len()).map(|i| masters.is_present(i, gid)).collect();
        let advances: Vec<f64> =
            hmtxs.iter().map(|hmtx| f64::from(hmtx.advance(gid).unwrap_or(0))).collect();

        let model = sub_models.get(&present)?;
        builder.add_deltas(region_deltas(model, &select(&advances, &present)));
    }

    let (store, _) = builder.build();
    Ok(Hvar::new(store, None, None, None))
}
