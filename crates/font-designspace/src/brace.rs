//! Sparse intermediate masters from brace layers.
//!
//! A layer named e.g. `Regular {500, 100}` holds glyphs drawn at that
//! location. Each such layer becomes its own master that supplies only the
//! glyphs it contains.

use std::collections::HashSet;

use crate::{
    BACKGROUND_LAYER_MARKER,
    designspace::{DesignSpace, MasterSource},
    diagnostics::Diagnostics,
    error::{Error, Result},
    location::Location,
    source::SourceArena,
};

/// Add one sparse master for every brace layer found in the masters'
/// sources. Returns the number of masters added.
///
/// Does nothing if any master already selects a non-default layer, so
/// running it twice leaves the design space unchanged.
pub fn apply_brace_layers(
    designspace: &mut DesignSpace,
    arena: &SourceArena,
    diagnostics: &dyn Diagnostics,
) -> Result<usize> {
    if designspace.masters().iter().any(MasterSource::is_sparse) {
        diagnostics.info("Sparse layers already present, not adding additional ones.");
        return Ok(0);
    }

    let mut seen = HashSet::new();
    let mut sparse = Vec::new();
    for master in designspace.masters() {
        let id = master.source.ok_or_else(|| Error::UnknownSource(master.name.clone()))?;
        if !seen.insert(id) {
            continue;
        }
        let font = arena.get(id).ok_or_else(|| Error::UnknownSource(master.name.clone()))?;

        for layer in font.layers() {
            let Some(coordinates) = brace_coordinates(&layer.name)? else {
                continue;
            };
            if coordinates.len() != designspace.axes().len() {
                return Err(Error::MalformedLayerName {
                    layer: layer.name.clone(),
                    message: format!(
                        "expected {} coordinates, found {}",
                        designspace.axes().len(),
                        coordinates.len()
                    ),
                });
            }

            let location: Location = designspace
                .axes()
                .iter()
                .zip(&coordinates)
                .map(|(axis, &value)| (axis.name.as_str(), value))
                .collect();
            let name = format!("{} {}", master.name, layer.name);
            designspace.validate_location(&location, &name)?;

            diagnostics.debug(&format!("Sparse master '{name}' from '{}'", font.filename));
            sparse.push(MasterSource {
                name,
                filename: master.filename.clone(),
                source: Some(id),
                layer: Some(layer.name.clone()),
                location,
            });
        }
    }

    let added = sparse.len();
    for master in sparse {
        designspace.push_master_unchecked(master);
    }
    if added > 0 {
        diagnostics.info(&format!("Added {added} sparse masters from brace layers"));
    }
    Ok(added)
}

/// Decode the `{a, b, ...}` marker of a layer name.
///
/// Returns `None` for layers without a marker and for background layers.
fn brace_coordinates(layer_name: &str) -> Result<Option<Vec<f64>>> {
    if layer_name.contains(BACKGROUND_LAYER_MARKER) {
        return Ok(None);
    }
    let (Some(open), Some(close)) = (layer_name.find('{'), layer_name.find('}')) else {
        return Ok(None);
    };
    let malformed = |message: String| Error::MalformedLayerName {
        layer: layer_name.to_string(),
        message,
    };
    if close < open {
        return Err(malformed("'}' before '{'".to_string()));
    }

    layer_name[open + 1..close]
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|_| malformed(format!("'{part}' is not a number")))
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
