//! TrueType hinting tables.
//!
//! Hinting programs cannot be interpolated. When every master carries the
//! same `fpgm`, `prep` and glyph programs, the default master's hinting is
//! kept and control values that vary across masters become `cvar`
//! deltas. Otherwise all hinting is dropped from the variable font.

use read_fonts::{
    FontRef, TableProvider,
    tables::glyf::{CompositeGlyphFlags, Glyph as ReadGlyph},
    types::{BigEndian, GlyphId, Tag},
};
use varlayer_font_designspace::Diagnostics;
use write_fonts::{
    FontBuilder, dump_table,
    from_obj::ToOwnedTable,
    tables::{
        glyf::{
            Bbox, Component, ComponentFlags, CompositeGlyph, Contour, GlyfLocaBuilder,
            Glyph as WriteGlyph, SimpleGlyph, Transform,
        },
        head::Head,
        maxp::Maxp,
        variations::{PackedDeltas, Tuple, TupleVariationHeader},
    },
};

use super::f2dot14;
use crate::{
    error::{Error, Result},
    masters::Masters,
    variation_model::{Region, SubModels, VariationModel},
};

const FPGM: Tag = Tag::new(b"fpgm");
const PREP: Tag = Tag::new(b"prep");
const CVT: Tag = Tag::new(b"cvt ");

/// Tables that go away with the hinting.
pub(crate) const HINT_TABLES: [Tag; 4] = [FPGM, PREP, CVT, Tag::new(b"cvar")];

const SHARED_POINT_NUMBERS: u16 = 0x8000;

/// Outcome of merging the masters' hinting.
#[derive(Debug)]
pub(crate) enum Hinting {
    /// The default master's hinting applies to every master; `cvar` holds
    /// the serialized control value variations, if any vary.
    Keep { cvar: Option<Vec<u8>> },
    /// Masters disagree on their programs.
    Drop,
}

/// Compare the masters' hinting programs and build `cvar` when only the
/// control values differ. Every reason to drop hinting is reported through
/// `diagnostics`.
pub(crate) fn merge_hinting(masters: &Masters, diagnostics: &dyn Diagnostics) -> Result<Hinting> {
    let base = masters.base_font();

    for tag in [FPGM, PREP] {
        let base_program = base.table_data(tag).map(|d| d.as_bytes().to_vec());
        for index in 0..masters.len() {
            let Some(program) = masters.fonts[index].table_data(tag) else {
                continue;
            };
            if base_program.as_deref() != Some(program.as_bytes()) {
                diagnostics.warn(&format!(
                    "Masters have incompatible '{tag}' tables ('{}' differs from the default \
                     master), hinting is discarded",
                    masters.name(index)
                ));
                return Ok(Hinting::Drop);
            }
        }
    }

    if let Some((gid, index)) = mismatched_glyph_program(masters)? {
        diagnostics.warn(&format!(
            "Masters have incompatible glyph programs in glyph '{}' ('{}' differs from the \
             default master), hinting is discarded",
            masters.glyph_name(gid).unwrap_or("?"),
            masters.name(index)
        ));
        return Ok(Hinting::Drop);
    }

    let control_values = masters
        .fonts
        .iter()
        .map(control_values)
        .collect::<Result<Vec<Option<Vec<i16>>>>>()?;
    let Some(base_values) = &control_values[masters.base] else {
        if let Some(index) = control_values.iter().position(Option::is_some) {
            diagnostics.warn(&format!(
                "Master '{}' has a 'cvt ' table but the default master has none, hinting is \
                 discarded",
                masters.name(index)
            ));
            return Ok(Hinting::Drop);
        }
        return Ok(Hinting::Keep { cvar: None });
    };
    let mismatched = control_values.iter().enumerate().find_map(|(index, values)| {
        values.as_ref().filter(|v| v.len() != base_values.len()).map(|v| (index, v.len()))
    });
    if let Some((index, len)) = mismatched {
        diagnostics.warn(&format!(
            "Masters have incompatible 'cvt ' tables ('{}' has {len} values, the default \
             master {}), hinting is discarded",
            masters.name(index),
            base_values.len()
        ));
        return Ok(Hinting::Drop);
    }

    let present: Vec<bool> = control_values.iter().map(Option::is_some).collect();
    let mut sub_models = SubModels::new(masters.model);
    let model = sub_models.get(&present)?;
    let values: Vec<&Vec<i16>> = control_values.iter().flatten().collect();
    Ok(Hinting::Keep { cvar: build_cvar(model, &values)? })
}

/// First glyph, and master, whose non-empty glyph program differs from the
/// default master's.
fn mismatched_glyph_program(masters: &Masters) -> Result<Option<(GlyphId, usize)>> {
    let programs = masters
        .fonts
        .iter()
        .map(glyph_programs)
        .collect::<Result<Vec<Vec<Vec<u8>>>>>()?;
    let base_programs = &programs[masters.base];

    for (gid, base_program) in base_programs.iter().enumerate() {
        let gid = GlyphId::new(gid as u32);
        for (index, master_programs) in programs.iter().enumerate() {
            if index == masters.base || !masters.is_present(index, gid) {
                continue;
            }
            let program = master_programs.get(gid.to_u32() as usize).map_or(&[][..], Vec::as_slice);
            if !program.is_empty() && program != base_program.as_slice() {
                return Ok(Some((gid, index)));
            }
        }
    }
    Ok(None)
}

/// Glyph program of every glyph, empty for glyphs without one.
fn glyph_programs(font: &FontRef) -> Result<Vec<Vec<u8>>> {
    let glyf = font.glyf()?;
    let loca = font.loca(None)?;
    (0..loca.len())
        .map(|gid| {
            Ok(match loca.get_glyf(GlyphId::new(gid as u32), &glyf)? {
                Some(ReadGlyph::Simple(simple)) => simple.instructions().to_vec(),
                Some(ReadGlyph::Composite(composite)) => {
                    composite.instructions().map(<[u8]>::to_vec).unwrap_or_default()
                }
                None => Vec::new(),
            })
        })
        .collect()
}

fn control_values(font: &FontRef) -> Result<Option<Vec<i16>>> {
    let Some(data) = font.table_data(CVT) else {
        return Ok(None);
    };
    let values: &[BigEndian<i16>] = data.read_array(0..data.len() / 2 * 2)?;
    Ok(Some(values.iter().map(|v| v.get()).collect()))
}

/// Serialize one tuple per support whose deltas are not all zero. All
/// tuples share the "all points" point numbers.
fn build_cvar(model: &VariationModel, values: &[&Vec<i16>]) -> Result<Option<Vec<u8>>> {
    let Some(first) = values.first() else {
        return Ok(None);
    };
    // columns[cvt index][support]
    let columns: Vec<Vec<f64>> = (0..first.len())
        .map(|i| {
            let column: Vec<f64> = values.iter().map(|v| f64::from(v[i])).collect();
            model.deltas(&column)
        })
        .collect();

    let mut headers = Vec::new();
    let mut data = vec![0u8]; // shared point numbers: all
    for (support_index, support) in model.supports().iter().enumerate().skip(1) {
        let deltas = columns
            .iter()
            .map(|column| {
                let delta = column[support_index];
                i16::try_from(delta as i64).map_err(|_| {
                    Error::merge("cvar", format!("control value delta {delta} outside 16 bits"))
                })
            })
            .collect::<Result<Vec<i16>>>()?;
        if deltas.iter().all(|d| *d == 0) {
            continue;
        }
        let packed = dump_table(&PackedDeltas::new(deltas.iter().map(|&d| i32::from(d)).collect()))
            .map_err(|e| Error::merge("cvar", e.to_string()))?;
        let size = u16::try_from(packed.len())
            .map_err(|_| Error::merge("cvar", "tuple data exceeds 64K"))?;
        let (peak, intermediate) = tuple_region(support);
        let header = TupleVariationHeader::new(size, None, Some(peak), intermediate, false);
        headers.push(dump_table(&header).map_err(|e| Error::merge("cvar", e.to_string()))?);
        data.extend(packed);
    }
    if headers.is_empty() {
        return Ok(None);
    }

    let header_len: usize = headers.iter().map(Vec::len).sum();
    let count = u16::try_from(headers.len())
        .ok()
        .filter(|c| *c <= 0x0FFF)
        .ok_or_else(|| Error::merge("cvar", "too many tuple variations"))?;
    let data_offset = u16::try_from(8 + header_len)
        .map_err(|_| Error::merge("cvar", "tuple headers exceed 64K"))?;

    let mut table = Vec::with_capacity(8 + header_len + data.len());
    for field in [1u16, 0, count | SHARED_POINT_NUMBERS, data_offset] {
        table.extend(field.to_be_bytes());
    }
    for header in headers {
        table.extend(header);
    }
    table.extend(data);
    Ok(Some(table))
}

/// Peak tuple, plus the intermediate region when it differs from the one
/// implied by the peak.
fn tuple_region(support: &Region) -> (Tuple, Option<(Tuple, Tuple)>) {
    let peak = Tuple::new(support.axes.iter().map(|a| f2dot14(a.1)).collect());
    let implied =
        support.axes.iter().all(|&(start, peak, end)| start == peak.min(0.0) && end == peak.max(0.0));
    let intermediate = (!implied).then(|| {
        (
            Tuple::new(support.axes.iter().map(|a| f2dot14(a.0)).collect()),
            Tuple::new(support.axes.iter().map(|a| f2dot14(a.2)).collect()),
        )
    });
    (peak, intermediate)
}

/// Add the default master's `glyf`, `loca`, `head` and `maxp` with every
/// glyph program removed.
pub(crate) fn add_unhinted_glyphs(builder: &mut FontBuilder, base: &FontRef) -> Result<()> {
    let glyf = base.glyf()?;
    let loca = base.loca(None)?;
    let mut glyf_builder = GlyfLocaBuilder::new();
    for gid in 0..loca.len() {
        let glyph = match loca.get_glyf(GlyphId::new(gid as u32), &glyf)? {
            Some(ReadGlyph::Simple(simple)) => WriteGlyph::Simple(unhinted_simple(&simple)),
            Some(ReadGlyph::Composite(composite)) => unhinted_composite(&composite),
            None => WriteGlyph::Empty,
        };
        glyf_builder.add_glyph(&glyph)?;
    }
    let (glyf, loca, loca_format) = glyf_builder.build();

    let mut head: Head = base.head()?.to_owned_table();
    head.index_to_loc_format = loca_format as i16;
    let mut maxp: Maxp = base.maxp()?.to_owned_table();
    maxp.max_zones = maxp.max_zones.map(|_| 1);
    for field in [
        &mut maxp.max_twilight_points,
        &mut maxp.max_storage,
        &mut maxp.max_function_defs,
        &mut maxp.max_instruction_defs,
        &mut maxp.max_stack_elements,
        &mut maxp.max_size_of_instructions,
    ] {
        *field = field.map(|_| 0);
    }

    builder.add_table(&glyf)?;
    builder.add_table(&loca)?;
    builder.add_table(&head)?;
    builder.add_table(&maxp)?;
    Ok(())
}

fn unhinted_simple(glyph: &read_fonts::tables::glyf::SimpleGlyph) -> SimpleGlyph {
    let points: Vec<_> = glyph.points().collect();
    let mut contours = Vec::new();
    let mut start = 0;
    for end in glyph.end_pts_of_contours() {
        let end = usize::from(end.get()) + 1;
        contours.push(Contour::from(points[start..end].to_vec()));
        start = end;
    }
    SimpleGlyph {
        bbox: Bbox {
            x_min: glyph.x_min(),
            y_min: glyph.y_min(),
            x_max: glyph.x_max(),
            y_max: glyph.y_max(),
        },
        contours,
        instructions: Vec::new(),
    }
}

fn unhinted_composite(glyph: &read_fonts::tables::glyf::CompositeGlyph) -> WriteGlyph {
    let bbox = Bbox {
        x_min: glyph.x_min(),
        y_min: glyph.y_min(),
        x_max: glyph.x_max(),
        y_max: glyph.y_max(),
    };
    let mut components = glyph.components().map(|c| {
        Component::new(
            c.glyph,
            c.anchor,
            Transform {
                xx: c.transform.xx,
                yx: c.transform.yx,
                xy: c.transform.xy,
                yy: c.transform.yy,
            },
            ComponentFlags {
                round_xy_to_grid: c.flags.contains(CompositeGlyphFlags::ROUND_XY_TO_GRID),
                use_my_metrics: c.flags.contains(CompositeGlyphFlags::USE_MY_METRICS),
                scaled_component_offset: c
                    .flags
                    .contains(CompositeGlyphFlags::SCALED_COMPONENT_OFFSET),
                unscaled_component_offset: c
                    .flags
                    .contains(CompositeGlyphFlags::UNSCALED_COMPONENT_OFFSET),
                overlap_compound: c.flags.contains(CompositeGlyphFlags::OVERLAP_COMPOUND),
            },
        )
    });
    let Some(first) = components.next() else {
        return WriteGlyph::Empty;
    };
    let mut composite = CompositeGlyph::new(first, bbox);
    for component in components {
        composite.add_component(component, bbox);
    }
    WriteGlyph::Composite(composite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implied_region_has_no_intermediate() {
        let (peak, intermediate) = tuple_region(&Region { axes: vec![(0.0, 1.0, 1.0)] });
        assert_eq!(peak.values, [f2dot14(1.0)]);
        assert!(intermediate.is_none());

        let (_, intermediate) = tuple_region(&Region { axes: vec![(0.0, 0.5, 1.0)] });
        let (start, end) = intermediate.unwrap();
        assert_eq!(start.values, [f2dot14(0.0)]);
        assert_eq!(end.values, [f2dot14(1.0)]);
    }

    #[test]
    fn cvar_holds_one_tuple_per_varying_support() {
        let model = VariationModel::new(vec![vec![0.0], vec![1.0]]).unwrap();
        let regular = vec![100, 200];
        let black = vec![100, 260];

        let cvar = build_cvar(&model, &[&regular, &black]).unwrap().unwrap();
        assert_eq!(&cvar[0..4], &[0, 1, 0, 0]);
        assert_eq!(u16::from_be_bytes([cvar[4], cvar[5]]), SHARED_POINT_NUMBERS | 1);
        let data_offset = usize::from(u16::from_be_bytes([cvar[6], cvar[7]]));
        // variationDataSize, tupleIndex, one peak coordinate
        assert_eq!(data_offset, 8 + 6);
        assert_eq!(&cvar[12..14], &[0x40, 0x00]);
        assert_eq!(cvar[data_offset], 0);
    }

    #[test]
    fn equal_control_values_build_no_cvar() {
        let model = VariationModel::new(vec![vec![0.0], vec![1.0], vec![0.5]]).unwrap();
        let values = vec![100, 200];
        assert!(build_cvar(&model, &[&values, &values, &values]).unwrap().is_none());
    }
}
