//! Axis-threshold glyph substitution from bracket layers.
//!
//! A layer named e.g. `Bold [400]` holds alternates that replace the
//! default glyphs from coordinate 400 of the first axis upwards. The
//! alternates are copied into the default layer as
//! `<glyph>.BRACKET.<threshold>` and a substitution rule is added for
//! every range between consecutive thresholds.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::{
    BACKGROUND_LAYER_MARKER, BRACKET_GLYPH_INFIX,
    designspace::{DesignSpace, SubstitutionRule},
    diagnostics::Diagnostics,
    error::{Error, Result},
    source::{SourceArena, SourceId},
};

/// Name of the glyph holding the alternate for `glyph` at `threshold`.
pub fn bracket_glyph_name(glyph: &str, threshold: i64) -> String {
    format!("{glyph}{BRACKET_GLYPH_INFIX}{threshold}")
}

/// Clone bracket-layer glyphs and add substitution rules for them.
/// Returns the number of rules added.
///
/// Does nothing if the design space already has rules.
pub fn apply_bracket_layers(
    designspace: &mut DesignSpace,
    arena: &mut SourceArena,
    diagnostics: &dyn Diagnostics,
) -> Result<usize> {
    if !designspace.rules().is_empty() {
        diagnostics.info("Substitution rules already present, not adding additional ones.");
        return Ok(0);
    }
    let Some(axis) = designspace.axes().first().cloned() else {
        return Ok(0);
    };

    // Top of the axis as reached by the masters, in design coordinates.
    let axis_max = designspace
        .masters()
        .iter()
        .map(|m| m.location.get(&axis.name).unwrap_or_else(|| axis.design_default()))
        .fold(f64::NEG_INFINITY, f64::max);

    // Each source once, in master order.
    let mut owners: Vec<SourceId> = Vec::new();
    let mut seen = HashSet::new();
    for master in designspace.masters() {
        let id = master.source.ok_or_else(|| Error::UnknownSource(master.name.clone()))?;
        if seen.insert(id) {
            owners.push(id);
        }
    }

    // threshold -> (owner, layer name)
    let mut bracket_layers: BTreeMap<i64, Vec<(SourceId, String)>> = BTreeMap::new();
    for &id in &owners {
        let font = arena
            .get(id)
            .ok_or_else(|| Error::UnknownSource(format!("#{}", id.index())))?;
        for layer in font.layers() {
            let Some(threshold) = bracket_threshold(&layer.name)? else {
                continue;
            };
            let value = threshold as f64;
            if !axis.contains_design(value) {
                return Err(Error::OutOfRange {
                    axis: axis.name.clone(),
                    owner: layer.name.clone(),
                    value: axis.map_backward(value),
                    minimum: axis.minimum,
                    maximum: axis.maximum,
                });
            }
            // No master reaches it, so the range it would start is empty.
            if value >= axis_max {
                diagnostics.warn(&format!(
                    "Bracket layer '{}' in '{}' starts at {threshold}, at or above the last \
                     master on '{}' ({axis_max}); ignoring it",
                    layer.name, font.filename, axis.name
                ));
                continue;
            }
            bracket_layers.entry(threshold).or_default().push((id, layer.name.clone()));
        }
    }
    if bracket_layers.is_empty() {
        return Ok(0);
    }

    // Every source must carry the same glyphs at a given threshold.
    let mut crossovers: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (&threshold, layers) in &bracket_layers {
        let glyph_set = |owner: SourceId, layer: &str| -> BTreeSet<String> {
            arena
                .get(owner)
                .and_then(|font| font.layer(Some(layer)))
                .map(|l| l.glyph_names().map(str::to_string).collect())
                .unwrap_or_default()
        };

        let (first_owner, first_layer) = &layers[0];
        let expected = glyph_set(*first_owner, first_layer);
        for (owner, layer) in &layers[1..] {
            let other = glyph_set(*owner, layer);
            if other != expected {
                return Err(Error::InconsistentBracketLayer {
                    threshold,
                    glyphs: expected.symmetric_difference(&other).cloned().collect(),
                });
            }
        }
        if let Some(missing) = owners.iter().find(|o| !layers.iter().any(|(id, _)| id == *o)) {
            let filename = arena.get(*missing).map(|f| f.filename.as_str()).unwrap_or_default();
            diagnostics.warn(&format!("No bracket layer at {threshold} in '{filename}'"));
            return Err(Error::InconsistentBracketLayer { threshold, glyphs: expected });
        }

        for glyph in expected {
            crossovers.entry(glyph).or_default().push(threshold);
        }
    }

    // Copy bracket glyphs into each owner's default layer.
    for (&threshold, layers) in &bracket_layers {
        for (owner, layer_name) in layers {
            let Some(font) = arena.get_mut(*owner) else {
                continue;
            };
            let copies: Vec<_> = font
                .layer(Some(layer_name))
                .map(|layer| {
                    layer
                        .glyphs()
                        .map(|g| g.copy_as(&bracket_glyph_name(&g.name, threshold)))
                        .collect()
                })
                .unwrap_or_default();
            for glyph in copies {
                font.insert_glyph(glyph);
            }
        }
    }

    let mut added = 0;
    for (glyph, mut thresholds) in crossovers {
        thresholds.sort_unstable();
        let bounds: Vec<f64> = thresholds
            .iter()
            .map(|&t| t as f64)
            .chain(std::iter::once(axis_max))
            .collect();
        for (threshold, range) in thresholds.iter().zip(bounds.windows(2)) {
            let replacement = bracket_glyph_name(&glyph, *threshold);
            designspace.push_rule_unchecked(SubstitutionRule {
                name: replacement.clone(),
                glyph: glyph.clone(),
                replacement,
                axis: axis.name.clone(),
                minimum: range[0],
                maximum: range[1],
            });
            added += 1;
        }
    }
    diagnostics.info(&format!("Added {added} substitution rules from bracket layers"));
    Ok(added)
}

/// Decode the `[n]` marker of a layer name.
///
/// Returns `None` for layers without a marker and for background layers.
fn bracket_threshold(layer_name: &str) -> Result<Option<i64>> {
    if layer_name.contains(BACKGROUND_LAYER_MARKER) {
        return Ok(None);
    }
    let compact: String = layer_name.chars().filter(|c| *c != ' ').collect();
    let (Some(open), Some(close)) = (compact.find('['), compact.find(']')) else {
        return Ok(None);
    };
    if close < open {
        return Err(Error::MalformedLayerName {
            layer: layer_name.to_string(),
            message: "']' before '['".to_string(),
        });
    }
    compact[open + 1..close].parse::<i64>().map(Some).map_err(|_| Error::MalformedLayerName {
        layer: layer_name.to_string(),
        message: "only bracket layers with one integer location on the first axis are supported"
            .to_string(),
    })
}
