//! Font variations table.

use read_fonts::types::{Fixed, NameId};
use varlayer_font_designspace::DesignSpace;
use write_fonts::tables::fvar::{AxisInstanceArrays, Fvar, InstanceRecord, VariationAxisRecord};

use super::name::NameTableBuilder;

/// Axis qualifier flag hiding the axis from user interfaces
const HIDDEN_AXIS: u16 = 0x0001;

/// Placeholder for instances without a PostScript name
const NO_POSTSCRIPT_NAME: u16 = 0xFFFF;

/// Build fvar from the axes and instances, in user coordinates.
pub(crate) fn build_fvar(designspace: &DesignSpace, names: &mut NameTableBuilder) -> Fvar {
    let axes: Vec<VariationAxisRecord> = designspace
        .axes()
        .iter()
        .map(|axis| VariationAxisRecord {
            axis_tag: axis.tag,
            min_value: Fixed::from_f64(axis.minimum),
            default_value: Fixed::from_f64(axis.default),
            max_value: Fixed::from_f64(axis.maximum),
            flags: if axis.hidden { HIDDEN_AXIS } else { 0 },
            axis_name_id: names.add(&axis.display_name),
        })
        .collect();

    let any_postscript_name = designspace.instances().iter().any(|i| i.postscript_name.is_some());

    let instances: Vec<InstanceRecord> = designspace
        .instances()
        .iter()
        .map(|instance| {
            let coordinates: Vec<Fixed> = designspace
                .axes()
                .iter()
                .zip(designspace.design_coordinates(&instance.location))
                .map(|(axis, value)| Fixed::from_f64(axis.map_backward(value)))
                .collect();

            let subfamily_name_id = names.add(&instance.name);
            let post_script_name_id = any_postscript_name.then(|| match &instance.postscript_name {
                Some(ps_name) => names.add(ps_name),
                None => NameId::new(NO_POSTSCRIPT_NAME),
            });

            InstanceRecord { subfamily_name_id, flags: 0, coordinates, post_script_name_id }
        })
        .collect();

    Fvar { axis_instance_arrays: AxisInstanceArrays { axes, instances }.into() }
}
