//! Style attributes table.

use read_fonts::types::{Fixed, NameId};
use varlayer_font_designspace::DesignSpace;
use write_fonts::tables::stat::{AxisRecord as StatAxisRecord, AxisValue, AxisValueTableFlags, Stat};

use super::name::NameTableBuilder;

/// Build STAT from the axes and their labels.
///
/// Each label becomes a format 1 axis value; the axis names are shared
/// with fvar through the name builder.
pub(crate) fn build_stat(designspace: &DesignSpace, names: &mut NameTableBuilder) -> Stat {
    let axis_records: Vec<StatAxisRecord> = designspace
        .axes()
        .iter()
        .enumerate()
        .map(|(idx, axis)| StatAxisRecord::new(axis.tag, names.add(&axis.display_name), idx as u16))
        .collect();

    let mut axis_values: Vec<AxisValue> = Vec::new();
    for (idx, axis) in designspace.axes().iter().enumerate() {
        for label in &axis.labels {
            let mut flags = AxisValueTableFlags::empty();
            if label.elidable {
                flags |= AxisValueTableFlags::ELIDABLE_AXIS_VALUE_NAME;
            }
            axis_values.push(AxisValue::format_1(
                idx as u16,
                flags,
                names.add(&label.name),
                Fixed::from_f64(label.value),
            ));
        }
    }

    Stat::new(axis_records, axis_values, NameId::SUBFAMILY_NAME)
}
