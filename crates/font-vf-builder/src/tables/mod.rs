//! Builders for the tables of the variable font.

pub(crate) mod avar;
pub(crate) mod feature_variations;
pub(crate) mod fvar;
pub(crate) mod gvar;
pub(crate) mod hint;
pub(crate) mod hvar;
pub(crate) mod layout;
pub(crate) mod mvar;
pub(crate) mod name;
pub(crate) mod stat;

use read_fonts::types::F2Dot14;
use write_fonts::tables::{
    gvar::Tent,
    variations::{RegionAxisCoordinates, VariationRegion},
};

use crate::variation_model::{Region, VariationModel};

pub(crate) fn f2dot14(value: f64) -> F2Dot14 {
    F2Dot14::from_f32(value as f32)
}

/// Item variation store region for a support.
pub(crate) fn variation_region(region: &Region) -> VariationRegion {
    VariationRegion::new(
        region
            .axes
            .iter()
            .map(|&(start, peak, end)| RegionAxisCoordinates {
                start_coord: f2dot14(start),
                peak_coord: f2dot14(peak),
                end_coord: f2dot14(end),
            })
            .collect(),
    )
}

/// Tuple variation header tents for a support.
pub(crate) fn region_tents(region: &Region) -> Vec<Tent> {
    region
        .axes
        .iter()
        .map(|&(start, peak, end)| {
            if peak == 0.0 {
                Tent::new(F2Dot14::ZERO, None)
            } else {
                Tent::new(f2dot14(peak), Some((f2dot14(start), f2dot14(end))))
            }
        })
        .collect()
}

/// Nonzero deltas of `values` paired with their regions, base excluded.
///
/// `values` holds one value per master flagged in the model's presence.
pub(crate) fn region_deltas(model: &VariationModel, values: &[f64]) -> Vec<(VariationRegion, i32)> {
    model
        .deltas(values)
        .into_iter()
        .zip(model.supports())
        .skip(1)
        .filter(|(delta, _)| *delta != 0.0)
        .map(|(delta, region)| (variation_region(region), delta as i32))
        .collect()
}

/// Keep the entries of `values` whose flag is set.
pub(crate) fn select<T: Clone>(values: &[T], present: &[bool]) -> Vec<T> {
    values.iter().zip(present).filter(|(_, p)| **p).map(|(v, _)| v.clone()).collect()
}
