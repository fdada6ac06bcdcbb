//! Axis variations table.

use varlayer_font_designspace::DesignSpace;
use write_fonts::tables::avar::{Avar, AxisValueMap, SegmentMaps};

use super::f2dot14;

/// Build avar from each axis' user→design map in normalized coordinates.
///
/// Axes without a map still get the identity segments.
pub(crate) fn build_avar(designspace: &DesignSpace) -> Avar {
    let axis_segment_maps = designspace
        .axes()
        .iter()
        .map(|axis| {
            SegmentMaps::new(
                axis.normalized_map()
                    .into_iter()
                    .map(|(from, to)| AxisValueMap {
                        from_coordinate: f2dot14(from),
                        to_coordinate: f2dot14(to),
                    })
                    .collect(),
            )
        })
        .collect();

    Avar::new(axis_segment_maps)
}

#[cfg(test)]
mod tests {
    use read_fonts::{
        FontData, FontRead,
        tables::avar::Avar as ReadAvar,
        types::{F2Dot14, Tag},
    };
    use varlayer_font_designspace::Axis;
    use write_fonts::dump_table;

    use super::*;

    #[test]
    fn mapped_axis_gets_extra_segment() {
        let mut designspace = DesignSpace::new();
        designspace
            .add_axis(Axis::weight().with_map([
                (100.0, 20.0),
                (400.0, 80.0),
                (700.0, 170.0),
                (900.0, 200.0),
            ]))
            .unwrap();
        designspace
            .add_axis(Axis::new(Tag::new(b"wdth"), "Width", 75.0, 100.0, 100.0))
            .unwrap();

        let bytes = dump_table(&build_avar(&designspace)).unwrap();
        let avar = ReadAvar::read(FontData::new(&bytes)).unwrap();
        let maps: Vec<_> = avar.axis_segment_maps().iter().map(|m| m.unwrap()).collect();
        assert_eq!(maps.len(), 2);

        let weight: Vec<(F2Dot14, F2Dot14)> = maps[0]
            .axis_value_maps()
            .iter()
            .map(|m| (m.from_coordinate(), m.to_coordinate()))
            .collect();
        // 700 normalizes to 0.6 in user space and (170-80)/(200-80) = 0.75 in design space
        assert_eq!(weight.len(), 4);
        assert_eq!(weight[2], (F2Dot14::from_f32(0.6), F2Dot14::from_f32(0.75)));
        assert_eq!(maps[1].axis_value_maps().len(), 3);
    }
}
