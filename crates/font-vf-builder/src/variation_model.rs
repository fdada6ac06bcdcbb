//! Variation model for computing master deltas.
//!
//! Masters are ordered so that simpler locations come first, each master
//! is given a support region, and master values are decomposed into
//! deltas that, weighted by each region's scalar, reproduce every master
//! exactly. This matches the model used by fontTools varLib, so fonts
//! built here interpolate the same way.

use std::{
    cmp::Ordering,
    collections::{HashMap, hash_map::Entry},
};

use varlayer_font_designspace::DesignSpace;

use crate::error::{Error, Result};

/// Round half up, the OpenType rounding convention.
pub fn ot_round(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// A region in the variation space, defined by (start, peak, end) tuples.
///
/// Each tuple defines the contribution curve for one axis. Axes whose peak
/// is zero do not constrain the region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// (min, peak, max) for each axis in normalized coordinates
    pub axes: Vec<(f64, f64, f64)>,
}

impl Region {
    /// The region covering the whole space; its scalar is always 1.
    pub fn base(axis_count: usize) -> Self {
        Self { axes: vec![(0.0, 0.0, 0.0); axis_count] }
    }

    pub fn is_base(&self) -> bool {
        self.axes.iter().all(|&(_, peak, _)| peak == 0.0)
    }

    fn active_axes(&self) -> impl Iterator<Item = usize> + '_ {
        self.axes.iter().enumerate().filter(|(_, t)| t.1 != 0.0).map(|(i, _)| i)
    }

    /// Compute the scalar contribution of this region at a given location.
    ///
    /// Follows the OpenType rules: tuples with peak 0, an inverted range or
    /// a range crossing zero are ignored.
    pub fn scalar_at(&self, location: &[f64]) -> f64 {
        let mut scalar = 1.0;

        for (i, &(lower, peak, upper)) in self.axes.iter().enumerate() {
            if peak == 0.0 || lower > peak || peak > upper || (lower < 0.0 && upper > 0.0) {
                continue;
            }
            let v = location.get(i).copied().unwrap_or(0.0);
            if v == peak {
                continue;
            }
            if v <= lower || upper <= v {
                return 0.0;
            }
            if v < peak {
                scalar *= (v - lower) / (peak - lower);
            } else {
                scalar *= (v - upper) / (peak - upper);
            }
        }

        scalar
    }
}

/// Variation model for computing deltas from master values.
#[derive(Debug, Clone)]
pub struct VariationModel {
    /// Normalized master locations in caller order
    locations: Vec<Vec<f64>>,
    /// Model position → caller index
    reverse_mapping: Vec<usize>,
    /// Support region per model position; position 0 is the base
    supports: Vec<Region>,
    /// For each model position, the earlier positions contributing to it
    delta_weights: Vec<Vec<(usize, f64)>>,
}

impl VariationModel {
    /// Create a variation model from normalized master locations.
    ///
    /// Exactly one location must be the origin and no two may coincide.
    pub fn new(locations: Vec<Vec<f64>>) -> Result<Self> {
        let axis_count = locations.iter().map(Vec::len).max().unwrap_or(0);
        let locations: Vec<Vec<f64>> = locations
            .into_iter()
            .map(|mut loc| {
                loc.resize(axis_count, 0.0);
                loc
            })
            .collect();

        let mut bases = locations.iter().enumerate().filter(|(_, l)| is_origin(l)).map(|(i, _)| i);
        match (bases.next(), bases.next()) {
            (None, _) => return Err(Error::NoBaseMaster),
            (Some(first), Some(second)) => {
                return Err(Error::AmbiguousBaseMaster { first, second });
            }
            _ => {}
        }
        for (i, a) in locations.iter().enumerate() {
            if let Some(j) = locations[i + 1..].iter().position(|b| a == b) {
                return Err(Error::DuplicateMasterLocation {
                    first: i,
                    second: i + 1 + j,
                    location: a.clone(),
                });
            }
        }

        let key = SortKey::new(&locations);
        let mut reverse_mapping: Vec<usize> = (0..locations.len()).collect();
        reverse_mapping.sort_by(|&a, &b| key.compare(&locations[a], &locations[b]));

        let sorted: Vec<&[f64]> =
            reverse_mapping.iter().map(|&i| locations[i].as_slice()).collect();
        let supports = compute_supports(&sorted, axis_count);
        let delta_weights = sorted
            .iter()
            .enumerate()
            .map(|(i, loc)| {
                supports[..i]
                    .iter()
                    .enumerate()
                    .map(|(j, support)| (j, support.scalar_at(loc)))
                    .filter(|&(_, scalar)| scalar != 0.0)
                    .collect()
            })
            .collect();

        Ok(Self { locations, reverse_mapping, supports, delta_weights })
    }

    /// Create the model for the masters of a design space, in master order.
    pub fn from_designspace(designspace: &DesignSpace) -> Result<Self> {
        let axis_count = designspace.axes().len();
        let mut model = Self::new(designspace.normalized_master_locations())?;
        // Single-master design spaces still need one coordinate per axis
        for support in &mut model.supports {
            support.axes.resize(axis_count, (0.0, 0.0, 0.0));
        }
        for location in &mut model.locations {
            location.resize(axis_count, 0.0);
        }
        Ok(model)
    }

    /// Caller index of the base master.
    pub fn base_index(&self) -> usize {
        self.reverse_mapping[0]
    }

    pub fn master_count(&self) -> usize {
        self.locations.len()
    }

    pub fn axis_count(&self) -> usize {
        self.supports.first().map_or(0, |s| s.axes.len())
    }

    /// Normalized master locations in caller order.
    pub fn locations(&self) -> &[Vec<f64>] {
        &self.locations
    }

    /// Caller index of the master at each model position.
    pub fn master_order(&self) -> &[usize] {
        &self.reverse_mapping
    }

    /// Support regions in model order; the first is the base region.
    pub fn supports(&self) -> &[Region] {
        &self.supports
    }

    /// Decompose master values into deltas, in model order.
    ///
    /// `values` is indexed like the locations the model was built from. The
    /// first output is the base value; each delta is rounded as it is
    /// produced so later deltas absorb the rounding error.
    pub fn deltas(&self, values: &[f64]) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::with_capacity(self.supports.len());
        for (i, weights) in self.delta_weights.iter().enumerate() {
            let mut delta = values[self.reverse_mapping[i]];
            for &(j, weight) in weights {
                delta -= out[j] * weight;
            }
            out.push(ot_round(delta));
        }
        out
    }

    /// [`deltas`](Self::deltas) for many points at once.
    ///
    /// `values[master][point]`; the result is `deltas[position][point]`.
    pub fn point_deltas(&self, values: &[Vec<(f64, f64)>]) -> Vec<Vec<(f64, f64)>> {
        let mut out: Vec<Vec<(f64, f64)>> = Vec::with_capacity(self.supports.len());
        for (i, weights) in self.delta_weights.iter().enumerate() {
            let mut delta = values[self.reverse_mapping[i]].clone();
            for &(j, weight) in weights {
                for (d, prev) in delta.iter_mut().zip(&out[j]) {
                    d.0 -= prev.0 * weight;
                    d.1 -= prev.1 * weight;
                }
            }
            out.push(delta.into_iter().map(|(x, y)| (ot_round(x), ot_round(y))).collect());
        }
        out
    }

    /// Value at a normalized location, reconstructed from the deltas.
    pub fn interpolate(&self, values: &[f64], location: &[f64]) -> f64 {
        self.deltas(values)
            .iter()
            .zip(&self.supports)
            .map(|(delta, support)| delta * support.scalar_at(location))
            .sum()
    }

    /// A model over the masters flagged in `present`.
    pub fn sub_model(&self, present: &[bool]) -> Result<VariationModel> {
        let locations = self
            .locations
            .iter()
            .zip(present)
            .filter(|(_, p)| **p)
            .map(|(l, _)| l.clone())
            .collect();
        VariationModel::new(locations)
    }
}

/// Sub-models keyed by master presence, built on first use.
#[derive(Debug)]
pub struct SubModels<'a> {
    model: &'a VariationModel,
    cache: HashMap<Vec<bool>, VariationModel>,
}

impl<'a> SubModels<'a> {
    pub fn new(model: &'a VariationModel) -> Self {
        Self { model, cache: HashMap::new() }
    }

    /// The model for masters flagged in `present`. Values passed to it must
    /// be those of the present masters only, in master order.
    pub fn get(&mut self, present: &[bool]) -> Result<&VariationModel> {
        if present.iter().all(|p| *p) {
            return Ok(self.model);
        }
        match self.cache.entry(present.to_vec()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let sub = self.model.sub_model(present)?;
                Ok(entry.insert(sub))
            }
        }
    }
}

fn is_origin(location: &[f64]) -> bool {
    location.iter().all(|v| *v == 0.0)
}

/// Master ordering: fewer active axes first, then masters lying on an
/// axis-aligned master position, then by axis order, sign and magnitude.
struct SortKey {
    /// Values seen on each axis among single-axis masters (plus 0)
    axis_points: Vec<Option<Vec<f64>>>,
}

impl SortKey {
    fn new(locations: &[Vec<f64>]) -> Self {
        let axis_count = locations.first().map_or(0, Vec::len);
        let mut axis_points: Vec<Option<Vec<f64>>> = vec![None; axis_count];
        for loc in locations {
            let mut active = loc.iter().enumerate().filter(|(_, v)| **v != 0.0);
            if let (Some((axis, &value)), None) = (active.next(), active.next()) {
                let points = axis_points[axis].get_or_insert_with(|| vec![0.0]);
                if !points.contains(&value) {
                    points.push(value);
                }
            }
        }
        Self { axis_points }
    }

    fn compare(&self, a: &[f64], b: &[f64]) -> Ordering {
        let (ka, kb) = (self.key(a), self.key(b));
        ka.0.cmp(&kb.0)
            .then(kb.1.cmp(&ka.1))
            .then_with(|| ka.2.cmp(&kb.2))
            .then_with(|| ka.3.cmp(&kb.3))
            .then_with(|| {
                ka.4.iter()
                    .zip(&kb.4)
                    .map(|(x, y)| x.total_cmp(y))
                    .find(|o| o.is_ne())
                    .unwrap_or_else(|| ka.4.len().cmp(&kb.4.len()))
            })
    }

    /// (rank, on-point axis count, axes, signs, magnitudes)
    fn key(&self, loc: &[f64]) -> (usize, usize, Vec<usize>, Vec<i8>, Vec<f64>) {
        let axes: Vec<usize> =
            loc.iter().enumerate().filter(|(_, v)| **v != 0.0).map(|(i, _)| i).collect();
        let on_point = axes
            .iter()
            .filter(|&&axis| {
                self.axis_points[axis].as_ref().is_some_and(|points| points.contains(&loc[axis]))
            })
            .count();
        let signs = axes.iter().map(|&axis| if loc[axis] < 0.0 { -1 } else { 1 }).collect();
        let magnitudes = axes.iter().map(|&axis| loc[axis].abs()).collect();
        (axes.len(), on_point, axes, signs, magnitudes)
    }
}

/// Support regions for locations already in model order.
fn compute_supports(locations: &[&[f64]], axis_count: usize) -> Vec<Region> {
    // extremes of each axis over the masters active on it
    let mut min_v = vec![0.0f64; axis_count];
    let mut max_v = vec![0.0f64; axis_count];
    let mut seen = vec![false; axis_count];
    for loc in locations {
        for (axis, &v) in loc.iter().enumerate().filter(|(_, v)| **v != 0.0) {
            if seen[axis] {
                min_v[axis] = min_v[axis].min(v);
                max_v[axis] = max_v[axis].max(v);
            } else {
                (min_v[axis], max_v[axis], seen[axis]) = (v, v, true);
            }
        }
    }

    let mut regions: Vec<Region> = locations
        .iter()
        .map(|loc| Region {
            axes: loc
                .iter()
                .enumerate()
                .map(|(axis, &v)| {
                    if v == 0.0 {
                        (0.0, 0.0, 0.0)
                    } else if v > 0.0 {
                        (0.0, v, max_v[axis])
                    } else {
                        (min_v[axis], v, 0.0)
                    }
                })
                .collect(),
        })
        .collect();

    // Shrink each region so it stops at the peaks of earlier masters lying
    // inside it on the same set of axes.
    for i in 0..regions.len() {
        let loc_axes: Vec<usize> = regions[i].active_axes().collect();
        let mut region = regions[i].clone();
        for prev in &regions[..i] {
            if prev.active_axes().ne(loc_axes.iter().copied()) {
                continue;
            }
            let relevant = loc_axes.iter().all(|&axis| {
                let (lower, peak, upper) = region.axes[axis];
                let prev_peak = prev.axes[axis].1;
                prev_peak == peak || (lower < prev_peak && prev_peak < upper)
            });
            if !relevant {
                continue;
            }

            let mut best_axes: Vec<(usize, (f64, f64, f64))> = Vec::new();
            let mut best_ratio = -1.0;
            for &axis in &loc_axes {
                let val = prev.axes[axis].1;
                let (lower, loc_v, upper) = region.axes[axis];
                let (mut new_lower, mut new_upper) = (lower, upper);
                let ratio = if val < loc_v {
                    new_lower = val;
                    (val - loc_v) / (lower - loc_v)
                } else if loc_v < val {
                    new_upper = val;
                    (val - loc_v) / (upper - loc_v)
                } else {
                    continue;
                };
                if ratio > best_ratio {
                    best_axes.clear();
                    best_ratio = ratio;
                }
                if ratio == best_ratio {
                    best_axes.push((axis, (new_lower, loc_v, new_upper)));
                }
            }
            for (axis, triple) in best_axes {
                region.axes[axis] = triple;
            }
        }
        regions[i] = region;
    }
    regions
}
