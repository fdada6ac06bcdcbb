//! Glyph variations table.
//!
//! Each glyph's points (outline points or component offsets, followed by
//! the four phantom points) are collected from every master carrying the
//! glyph and decomposed with the model restricted to those masters.

use std::time::Instant;

use kurbo::{Point, Vec2};
use log::{info, warn};
use read_fonts::{
    FontRef, TableProvider,
    tables::{
        glyf::{Anchor, Glyf, Glyph},
        hmtx::Hmtx,
        loca::Loca,
    },
    types::GlyphId,
};
use write_fonts::tables::gvar::{
    GlyphDelta, GlyphDeltas, GlyphVariations, Gvar, iup::iup_delta_optimize,
};

use super::{region_tents, select};
use crate::{
    error::{Error, Result},
    masters::Masters,
    options::Options,
    variation_model::SubModels,
};

/// Tolerance, in font units, for deltas inferred by interpolation
const IUP_TOLERANCE: f64 = 0.5;

const NUM_PHANTOM_POINTS: usize = 4;

/// Outline data of one glyph in one master
#[derive(Debug, Clone, PartialEq)]
enum Outline {
    Empty,
    Simple { points: Vec<(f64, f64)>, end_pts: Vec<u16> },
    Composite { offsets: Vec<(f64, f64)> },
}

impl Outline {
    fn is_empty(&self) -> bool {
        matches!(self, Outline::Empty)
    }

    fn kind(&self) -> &'static str {
        match self {
            Outline::Empty => "empty",
            Outline::Simple { .. } => "simple",
            Outline::Composite { .. } => "composite",
        }
    }

    fn coordinates(&self) -> &[(f64, f64)] {
        match self {
            Outline::Empty => &[],
            Outline::Simple { points, .. } => points,
            Outline::Composite { offsets } => offsets,
        }
    }
}

#[derive(Debug, Clone)]
struct MasterGlyph {
    outline: Outline,
    phantoms: [(f64, f64); NUM_PHANTOM_POINTS],
}

impl MasterGlyph {
    fn all_points(&self) -> Vec<(f64, f64)> {
        let mut points = self.outline.coordinates().to_vec();
        points.extend_from_slice(&self.phantoms);
        points
    }
}

/// Glyph tables of one master
struct MasterTables<'a> {
    glyf: Glyf<'a>,
    loca: Loca<'a>,
    hmtx: Hmtx<'a>,
}

impl<'a> MasterTables<'a> {
    fn new(font: &FontRef<'a>) -> Result<Self> {
        Ok(Self { glyf: font.glyf()?, loca: font.loca(None)?, hmtx: font.hmtx()? })
    }

    fn glyph(&self, gid: GlyphId) -> Result<MasterGlyph> {
        let glyph = self.loca.get_glyf(gid, &self.glyf)?;

        let (outline, x_min) = match glyph {
            None => (Outline::Empty, 0),
            Some(Glyph::Simple(simple)) => (
                Outline::Simple {
                    points: simple.points().map(|p| (f64::from(p.x), f64::from(p.y))).collect(),
                    end_pts: simple.end_pts_of_contours().iter().map(|e| e.get()).collect(),
                },
                simple.x_min(),
            ),
            Some(Glyph::Composite(composite)) => (
                Outline::Composite {
                    offsets: composite
                        .components()
                        .map(|c| match c.anchor {
                            Anchor::Offset { x, y } => (f64::from(x), f64::from(y)),
                            Anchor::Point { .. } => (0.0, 0.0),
                        })
                        .collect(),
                },
                composite.x_min(),
            ),
        };

        let advance = f64::from(self.hmtx.advance(gid).unwrap_or(0));
        let lsb = f64::from(self.hmtx.side_bearing(gid).unwrap_or(0));
        let left = f64::from(x_min) - lsb;
        // Left and right phantoms; vertical ones stay at the origin
        let phantoms = [(left, 0.0), (left + advance, 0.0), (0.0, 0.0), (0.0, 0.0)];

        Ok(MasterGlyph { outline, phantoms })
    }
}

/// Build gvar from the masters' outlines and horizontal metrics.
pub(crate) fn build_gvar(masters: &Masters, options: &Options) -> Result<Gvar> {
    let tables: Vec<MasterTables> =
        masters.fonts.iter().map(MasterTables::new).collect::<Result<Vec<_>>>()?;
    let num_glyphs = masters.num_glyphs()?;
    let axis_count = masters.model.axis_count() as u16;
    let mut sub_models = SubModels::new(masters.model);

    let start = Instant::now();
    let mut variations: Vec<GlyphVariations> = Vec::with_capacity(num_glyphs as usize);
    let mut tuple_count = 0usize;
    for glyph_idx in 0..num_glyphs {
        let gid = GlyphId::new(u32::from(glyph_idx));
        let glyph_variations =
            build_glyph_variations(gid, masters, &tables, &mut sub_models, options)?;
        tuple_count += glyph_variations.len();
        variations.push(GlyphVariations::new(gid, glyph_variations));
    }
    info!(
        "Glyph variations computed in {:.2}s ({num_glyphs} glyphs, {tuple_count} tuples)",
        start.elapsed().as_secs_f64()
    );

    Gvar::new(variations, axis_count).map_err(Error::GvarBuild)
}

fn build_glyph_variations(
    gid: GlyphId,
    masters: &Masters,
    tables: &[MasterTables],
    sub_models: &mut SubModels,
    options: &Options,
) -> Result<Vec<GlyphDeltas>> {
    let base = masters.base;
    let default_glyph = tables[base].glyph(gid)?;

    let mut present = vec![false; masters.len()];
    let mut glyphs: Vec<MasterGlyph> = Vec::with_capacity(masters.len());
    for (idx, master_tables) in tables.iter().enumerate() {
        let glyph = master_tables.glyph(gid)?;
        present[idx] = masters.is_present(idx, gid)
            && !(glyph.outline.is_empty() && !default_glyph.outline.is_empty());
        if present[idx] && idx != base {
            check_compatible(&default_glyph.outline, &glyph.outline, || {
                format!(
                    "glyph '{}' in master '{}'",
                    glyph_name(masters, gid),
                    masters.name(idx)
                )
            })?;
        }
        glyphs.push(glyph);
    }

    if present.iter().filter(|p| **p).count() < 2 {
        return Ok(Vec::new());
    }

    let model = sub_models.get(&present)?;
    let values: Vec<Vec<(f64, f64)>> =
        select(&glyphs, &present).iter().map(MasterGlyph::all_points).collect();
    let deltas = model.point_deltas(&values);

    let is_composite = matches!(default_glyph.outline, Outline::Composite { .. });
    let mut result = Vec::with_capacity(deltas.len().saturating_sub(1));
    for (support, tuple) in model.supports().iter().zip(deltas).skip(1) {
        if !is_composite && tuple.iter().all(|&(x, y)| x == 0.0 && y == 0.0) {
            continue;
        }
        let required = required_deltas(gid, &tuple)?;
        let glyph_deltas = match &default_glyph.outline {
            Outline::Simple { end_pts, .. } if options.optimize_gvar => {
                optimize_deltas(gid, &tuple, &default_glyph, end_pts).unwrap_or(required)
            }
            _ => required,
        };
        result.push(GlyphDeltas::new(region_tents(support), glyph_deltas));
    }
    Ok(result)
}

/// Every delta of `tuple` as a required delta; deltas must fit in 16 bits.
fn required_deltas(gid: GlyphId, tuple: &[(f64, f64)]) -> Result<Vec<GlyphDelta>> {
    let to_i16 = |v: f64| {
        i16::try_from(v as i64).map_err(|_| {
            Error::merge("gvar", format!("glyph {} has a delta of {v}, outside 16 bits", gid.to_u32()))
        })
    };
    tuple.iter().map(|&(x, y)| Ok(GlyphDelta::required(to_i16(x)?, to_i16(y)?))).collect()
}

/// Mark deltas that interpolation recovers within tolerance as optional.
///
/// Phantom point deltas are always kept.
fn optimize_deltas(
    gid: GlyphId,
    tuple: &[(f64, f64)],
    default_glyph: &MasterGlyph,
    end_pts: &[u16],
) -> Option<Vec<GlyphDelta>> {
    let raw: Vec<Vec2> = tuple.iter().map(|&(x, y)| Vec2::new(x, y)).collect();
    let coords: Vec<Point> = default_glyph.all_points().into_iter().map(Point::from).collect();
    let contour_ends: Vec<usize> = end_pts.iter().map(|e| usize::from(*e)).collect();
    let num_outline_points = tuple.len() - NUM_PHANTOM_POINTS;

    match iup_delta_optimize(raw, coords, IUP_TOLERANCE, &contour_ends) {
        Ok(optimized) => Some(
            optimized
                .into_iter()
                .enumerate()
                .map(|(i, d)| {
                    if i >= num_outline_points { GlyphDelta::required(d.x, d.y) } else { d }
                })
                .collect(),
        ),
        Err(e) => {
            warn!("IUP optimization failed for glyph {}: {e:?}", gid.to_u32());
            None
        }
    }
}

fn check_compatible(
    default: &Outline,
    other: &Outline,
    describe: impl Fn() -> String,
) -> Result<()> {
    let incompatible =
        |detail: String| Err(Error::merge("gvar", format!("{} {detail}", describe())));

    match (default, other) {
        (Outline::Empty, Outline::Empty) => Ok(()),
        (
            Outline::Simple { points: a, end_pts: ea },
            Outline::Simple { points: b, end_pts: eb },
        ) => {
            if a.len() != b.len() {
                return incompatible(format!(
                    "has {} points, default master has {}",
                    b.len(),
                    a.len()
                ));
            }
            if ea != eb {
                return incompatible(
                    "has different contour end points than the default master".to_string(),
                );
            }
            Ok(())
        }
        (Outline::Composite { offsets: a }, Outline::Composite { offsets: b }) => {
            if a.len() != b.len() {
                return incompatible(format!(
                    "has {} components, default master has {}",
                    b.len(),
                    a.len()
                ));
            }
            Ok(())
        }
        _ => incompatible(format!(
            "is {}, default master glyph is {}",
            other.kind(),
            default.kind()
        )),
    }
}

fn glyph_name(masters: &Masters, gid: GlyphId) -> String {
    masters.compiled[masters.base]
        .glyph_order
        .get(gid.to_u32() as usize)
        .cloned()
        .unwrap_or_else(|| format!("gid{}", gid.to_u32()))
}
