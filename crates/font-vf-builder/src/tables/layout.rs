//! GSUB, GPOS and GDEF for the variable font.
//!
//! Substitutions must be identical in every full master. Positioning must
//! share its structure across masters; the metrics that differ (value
//! record placements and advances, anchor coordinates) get variation
//! indices into an item variation store carried by GDEF.

use read_fonts::{TableProvider, tables::gpos::ValueFormat, types::Tag};
use write_fonts::{
    NullableOffsetMarker,
    from_obj::ToOwnedTable,
    tables::{
        gdef::Gdef,
        gpos::{
            AnchorTable, CursivePosFormat1, ExtensionSubtable, Gpos, MarkBasePosFormat1,
            MarkLigPosFormat1, MarkMarkPosFormat1, PairPos, PositionLookup, PositionLookupList,
            SinglePos, ValueRecord,
        },
        gsub::Gsub,
        layout::{DeviceOrVariationIndex, VariationIndex},
        variations::{ItemVariationStore, ivs_builder::VariationStoreBuilder},
    },
};

use super::{region_deltas, select};
use crate::{
    error::{Error, Result},
    masters::Masters,
    variation_model::VariationModel,
};

/// Check that every full master shares the base master's GSUB and return
/// an owned copy of it.
pub(crate) fn merge_gsub(masters: &Masters) -> Result<Option<Gsub>> {
    let tag = Tag::new(b"GSUB");
    let base_data = masters.base_font().table_data(tag).map(|d| d.as_bytes().to_vec());
    for idx in masters.full_indices() {
        let data = masters.fonts[idx].table_data(tag).map(|d| d.as_bytes().to_vec());
        if data != base_data {
            return Err(Error::merge(
                "GSUB",
                format!(
                    "master '{}' has different substitutions than '{}'",
                    masters.name(idx),
                    masters.name(masters.base)
                ),
            ));
        }
    }

    match masters.base_font().gsub() {
        Ok(gsub) => Ok(Some(build_gsub_without_feature_variations(&gsub)?)),
        Err(_) => Ok(None),
    }
}

/// Merged GPOS plus the item variation store its variation indices point into
pub(crate) struct MergedPositioning {
    pub gpos: Option<Gpos>,
    pub var_store: Option<ItemVariationStore>,
}

/// Merge the full masters' GPOS tables into the base one.
pub(crate) fn merge_gpos(masters: &Masters) -> Result<MergedPositioning> {
    let full = masters.full_indices();
    let base_gpos = match masters.base_font().gpos() {
        Ok(gpos) => gpos,
        Err(_) => {
            if let Some(idx) = full.iter().find(|i| masters.fonts[**i].gpos().is_ok()) {
                return Err(Error::merge(
                    "GPOS",
                    format!(
                        "master '{}' has GPOS but the default master has none",
                        masters.name(*idx)
                    ),
                ));
            }
            return Ok(MergedPositioning { gpos: None, var_store: None });
        }
    };
    let mut gpos = build_gpos_without_feature_variations(&base_gpos)?;

    if full.len() < 2 {
        return Ok(MergedPositioning { gpos: Some(gpos), var_store: None });
    }

    let base_skeleton = skeleton(&gpos.lookup_list);
    let mut values: Vec<Vec<Metric>> = Vec::with_capacity(full.len());
    for &idx in &full {
        if idx == masters.base {
            let mut slots = Vec::new();
            collect_slots(&mut gpos.lookup_list, &mut slots);
            values.push(slots.iter().map(Slot::metric).collect());
            continue;
        }
        let read = masters.fonts[idx].gpos().map_err(|_| {
            Error::merge("GPOS", format!("master '{}' has no GPOS", masters.name(idx)))
        })?;
        let mut other = build_gpos_without_feature_variations(&read)?;
        if other.script_list != gpos.script_list || other.feature_list != gpos.feature_list {
            return Err(Error::merge(
                "GPOS",
                format!("master '{}' has different scripts or features", masters.name(idx)),
            ));
        }
        if skeleton(&other.lookup_list) != base_skeleton {
            return Err(Error::merge(
                "GPOS",
                format!("master '{}' has differently structured lookups", masters.name(idx)),
            ));
        }
        let mut slots = Vec::new();
        collect_slots(&mut other.lookup_list, &mut slots);
        values.push(slots.iter().map(Slot::metric).collect());
    }

    let model = masters.model.sub_model(&masters.full_mask())?;
    let base_position = full.iter().position(|i| *i == masters.base).unwrap_or(0);
    let mut builder = VariationStoreBuilder::new(masters.model.axis_count() as u16);
    let pending = add_metric_deltas(&model, &values, base_position, &mut builder)?;

    if pending.is_empty() {
        return Ok(MergedPositioning { gpos: Some(gpos), var_store: None });
    }

    let (store, key_map) = builder.build();
    let mut slots = Vec::new();
    collect_slots(&mut gpos.lookup_list, &mut slots);
    for (slot_idx, target, id) in pending {
        let Some(index) = key_map.get(id) else {
            continue;
        };
        slots[slot_idx].set_variation(target, &values[base_position][slot_idx], index);
    }
    unify_value_formats(&mut gpos.lookup_list);

    Ok(MergedPositioning { gpos: Some(gpos), var_store: Some(store) })
}

/// GDEF of the base master, with the merged item variation store.
pub(crate) fn build_gdef(masters: &Masters, var_store: Option<ItemVariationStore>) -> Option<Gdef> {
    let mut gdef = match masters.base_font().gdef() {
        Ok(gdef) => build_gdef_without_varstore(&gdef),
        Err(_) if var_store.is_some() => Gdef::new(None, None, None, None),
        Err(_) => return None,
    };
    if let Some(store) = var_store {
        gdef.item_var_store = NullableOffsetMarker::new(Some(store));
    }
    Some(gdef)
}

/// One metric of a positioning lookup as seen in a single master
#[derive(Debug, Clone, PartialEq)]
enum Metric {
    Value([Option<i16>; 4]),
    Anchor(i16, i16),
    MissingAnchor,
}

impl Metric {
    fn kind(&self) -> &'static str {
        match self {
            Metric::Value(_) => "value record",
            Metric::Anchor(..) => "anchor",
            Metric::MissingAnchor => "missing anchor",
        }
    }

    fn component_count(&self) -> usize {
        match self {
            Metric::Value(_) => 4,
            Metric::Anchor(..) => 2,
            Metric::MissingAnchor => 0,
        }
    }

    fn component(&self, idx: usize) -> f64 {
        match self {
            Metric::Value(fields) => f64::from(fields[idx].unwrap_or(0)),
            Metric::Anchor(x, y) => f64::from(if idx == 0 { *x } else { *y }),
            Metric::MissingAnchor => 0.0,
        }
    }
}

/// A mutable reference to a metric in an owned lookup list
enum Slot<'a> {
    Value(&'a mut ValueRecord),
    Anchor(&'a mut AnchorTable),
    MissingAnchor,
}

impl Slot<'_> {
    fn metric(&self) -> Metric {
        match self {
            Slot::Value(record) => Metric::Value([
                record.x_placement,
                record.y_placement,
                record.x_advance,
                record.y_advance,
            ]),
            Slot::Anchor(anchor) => {
                let (x, y) = anchor_coordinates(anchor);
                Metric::Anchor(x, y)
            }
            Slot::MissingAnchor => Metric::MissingAnchor,
        }
    }

    fn blank(&mut self) {
        match self {
            Slot::Value(record) => **record = ValueRecord::default(),
            Slot::Anchor(anchor) => **anchor = AnchorTable::format_1(0, 0),
            Slot::MissingAnchor => {}
        }
    }

    /// Attach `index` to component `target` of this metric.
    fn set_variation(&mut self, target: usize, base: &Metric, index: VariationIndex) {
        let device = NullableOffsetMarker::new(Some(DeviceOrVariationIndex::from(index)));
        match self {
            Slot::Value(record) => {
                let value = base.component(target) as i16;
                match target {
                    0 => {
                        record.x_placement = Some(value);
                        record.x_placement_device = device;
                    }
                    1 => {
                        record.y_placement = Some(value);
                        record.y_placement_device = device;
                    }
                    2 => {
                        record.x_advance = Some(value);
                        record.x_advance_device = device;
                    }
                    _ => {
                        record.y_advance = Some(value);
                        record.y_advance_device = device;
                    }
                }
            }
            Slot::Anchor(anchor) => {
                if !matches!(anchor, AnchorTable::Format3(_)) {
                    let (x, y) = anchor_coordinates(anchor);
                    **anchor = AnchorTable::format_3(x, y, None, None);
                }
                if let AnchorTable::Format3(table) = &mut **anchor {
                    if target == 0 {
                        table.x_device = device;
                    } else {
                        table.y_device = device;
                    }
                }
            }
            Slot::MissingAnchor => {}
        }
    }
}

fn anchor_coordinates(anchor: &AnchorTable) -> (i16, i16) {
    match anchor {
        AnchorTable::Format1(table) => (table.x_coordinate, table.y_coordinate),
        AnchorTable::Format2(table) => (table.x_coordinate, table.y_coordinate),
        AnchorTable::Format3(table) => (table.x_coordinate, table.y_coordinate),
    }
}

/// Add a delta set for every metric component that differs between masters.
///
/// Returns (slot, component, delta set id) triples.
fn add_metric_deltas(
    model: &VariationModel,
    values: &[Vec<Metric>],
    base_position: usize,
    builder: &mut VariationStoreBuilder,
) -> Result<Vec<(usize, usize, u32)>> {
    let base_values = &values[base_position];
    for master_values in values {
        if master_values.len() != base_values.len() {
            return Err(Error::merge("GPOS", "masters have different numbers of metrics"));
        }
    }

    let all_present = vec![true; values.len()];
    let mut pending = Vec::new();
    for (slot_idx, base_metric) in base_values.iter().enumerate() {
        for master_values in values {
            let metric = &master_values[slot_idx];
            if std::mem::discriminant(metric) != std::mem::discriminant(base_metric) {
                return Err(Error::merge(
                    "GPOS",
                    format!(
                        "{} where the default master has a {}",
                        metric.kind(),
                        base_metric.kind()
                    ),
                ));
            }
        }
        for component in 0..base_metric.component_count() {
            let component_values: Vec<f64> =
                values.iter().map(|v| v[slot_idx].component(component)).collect();
            if component_values.iter().all(|v| *v == component_values[0]) {
                continue;
            }
            let deltas = region_deltas(model, &select(&component_values, &all_present));
            if deltas.is_empty() {
                continue;
            }
            pending.push((slot_idx, component, builder.add_deltas(deltas)));
        }
    }
    Ok(pending)
}

/// Collect the metric slots of a lookup list in traversal order.
///
/// Extension subtables are traversed as the lookup type they wrap.
fn collect_slots<'a>(lookup_list: &'a mut PositionLookupList, slots: &mut Vec<Slot<'a>>) {
    for lookup in lookup_list.lookups.iter_mut() {
        match &mut **lookup {
            PositionLookup::Single(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    single_slots(subtable, slots);
                }
            }
            PositionLookup::Pair(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    pair_slots(subtable, slots);
                }
            }
            PositionLookup::Cursive(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    cursive_slots(subtable, slots);
                }
            }
            PositionLookup::MarkToBase(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    mark_base_slots(subtable, slots);
                }
            }
            PositionLookup::MarkToLig(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    mark_lig_slots(subtable, slots);
                }
            }
            PositionLookup::MarkToMark(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    mark_mark_slots(subtable, slots);
                }
            }
            PositionLookup::Extension(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    match &mut **subtable {
                        ExtensionSubtable::Single(ext) => single_slots(&mut ext.extension, slots),
                        ExtensionSubtable::Pair(ext) => pair_slots(&mut ext.extension, slots),
                        ExtensionSubtable::Cursive(ext) => cursive_slots(&mut ext.extension, slots),
                        ExtensionSubtable::MarkToBase(ext) => {
                            mark_base_slots(&mut ext.extension, slots)
                        }
                        ExtensionSubtable::MarkToLig(ext) => {
                            mark_lig_slots(&mut ext.extension, slots)
                        }
                        ExtensionSubtable::MarkToMark(ext) => {
                            mark_mark_slots(&mut ext.extension, slots)
                        }
                        ExtensionSubtable::Contextual(_) | ExtensionSubtable::ChainContextual(_) => {}
                    }
                }
            }
            // Contextual lookups carry no metrics; they only need to match.
            PositionLookup::Contextual(_) | PositionLookup::ChainContextual(_) => {}
        }
    }
}

fn anchor_slots<'a>(
    anchors: impl Iterator<Item = &'a mut NullableOffsetMarker<AnchorTable>>,
    slots: &mut Vec<Slot<'a>>,
) {
    for anchor in anchors {
        slots.push(match anchor.as_mut() {
            Some(anchor) => Slot::Anchor(anchor),
            None => Slot::MissingAnchor,
        });
    }
}

fn single_slots<'a>(subtable: &'a mut SinglePos, slots: &mut Vec<Slot<'a>>) {
    match subtable {
        SinglePos::Format1(table) => slots.push(Slot::Value(&mut table.value_record)),
        SinglePos::Format2(table) => slots.extend(table.value_records.iter_mut().map(Slot::Value)),
    }
}

fn pair_slots<'a>(subtable: &'a mut PairPos, slots: &mut Vec<Slot<'a>>) {
    match subtable {
        PairPos::Format1(table) => {
            for pair_set in table.pair_sets.iter_mut() {
                for record in pair_set.pair_value_records.iter_mut() {
                    slots.push(Slot::Value(&mut record.value_record1));
                    slots.push(Slot::Value(&mut record.value_record2));
                }
            }
        }
        PairPos::Format2(table) => {
            for class1 in table.class1_records.iter_mut() {
                for record in class1.class2_records.iter_mut() {
                    slots.push(Slot::Value(&mut record.value_record1));
                    slots.push(Slot::Value(&mut record.value_record2));
                }
            }
        }
    }
}

fn cursive_slots<'a>(subtable: &'a mut CursivePosFormat1, slots: &mut Vec<Slot<'a>>) {
    for record in subtable.entry_exit_record.iter_mut() {
        anchor_slots([&mut record.entry_anchor, &mut record.exit_anchor].into_iter(), slots);
    }
}

fn mark_base_slots<'a>(subtable: &'a mut MarkBasePosFormat1, slots: &mut Vec<Slot<'a>>) {
    for record in subtable.mark_array.mark_records.iter_mut() {
        slots.push(Slot::Anchor(&mut record.mark_anchor));
    }
    for record in subtable.base_array.base_records.iter_mut() {
        anchor_slots(record.base_anchors.iter_mut(), slots);
    }
}

fn mark_lig_slots<'a>(subtable: &'a mut MarkLigPosFormat1, slots: &mut Vec<Slot<'a>>) {
    for record in subtable.mark_array.mark_records.iter_mut() {
        slots.push(Slot::Anchor(&mut record.mark_anchor));
    }
    for attach in subtable.ligature_array.ligature_attaches.iter_mut() {
        for component in attach.component_records.iter_mut() {
            anchor_slots(component.ligature_anchors.iter_mut(), slots);
        }
    }
}

fn mark_mark_slots<'a>(subtable: &'a mut MarkMarkPosFormat1, slots: &mut Vec<Slot<'a>>) {
    for record in subtable.mark1_array.mark_records.iter_mut() {
        slots.push(Slot::Anchor(&mut record.mark_anchor));
    }
    for record in subtable.mark2_array.mark2_records.iter_mut() {
        anchor_slots(record.mark2_anchors.iter_mut(), slots);
    }
}

/// The lookup list with every metric zeroed, for structural comparison.
fn skeleton(lookup_list: &PositionLookupList) -> PositionLookupList {
    let mut copy = lookup_list.clone();
    let mut slots = Vec::new();
    collect_slots(&mut copy, &mut slots);
    for slot in slots.iter_mut() {
        slot.blank();
    }
    drop(slots);
    copy
}

/// Give every value record in a subtable the union of their formats.
fn unify_value_formats(lookup_list: &mut PositionLookupList) {
    for lookup in lookup_list.lookups.iter_mut() {
        match &mut **lookup {
            PositionLookup::Single(lookup) => {
                lookup.subtables.iter_mut().for_each(|s| unify_single(s));
            }
            PositionLookup::Pair(lookup) => {
                lookup.subtables.iter_mut().for_each(|s| unify_pair(s));
            }
            PositionLookup::Extension(lookup) => {
                for subtable in lookup.subtables.iter_mut() {
                    match &mut **subtable {
                        ExtensionSubtable::Single(ext) => unify_single(&mut ext.extension),
                        ExtensionSubtable::Pair(ext) => unify_pair(&mut ext.extension),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn unify<'a>(records: impl Iterator<Item = &'a mut ValueRecord>) {
    let records: Vec<&mut ValueRecord> = records.collect();
    let format = records.iter().fold(ValueFormat::empty(), |acc, r| acc | r.format());
    for record in records {
        record.set_explicit_value_format(format);
    }
}

fn unify_single(subtable: &mut SinglePos) {
    if let SinglePos::Format2(table) = subtable {
        unify(table.value_records.iter_mut());
    }
}

fn unify_pair(subtable: &mut PairPos) {
    match subtable {
        PairPos::Format1(table) => {
            unify(
                table
                    .pair_sets
                    .iter_mut()
                    .flat_map(|s| s.pair_value_records.iter_mut())
                    .map(|r| &mut r.value_record1),
            );
            unify(
                table
                    .pair_sets
                    .iter_mut()
                    .flat_map(|s| s.pair_value_records.iter_mut())
                    .map(|r| &mut r.value_record2),
            );
        }
        PairPos::Format2(table) => {
            unify(
                table
                    .class1_records
                    .iter_mut()
                    .flat_map(|c| c.class2_records.iter_mut())
                    .map(|r| &mut r.value_record1),
            );
            unify(
                table
                    .class1_records
                    .iter_mut()
                    .flat_map(|c| c.class2_records.iter_mut())
                    .map(|r| &mut r.value_record2),
            );
        }
    }
}

/// Build a GDEF table without VarStore.
///
/// The base master's own store, if any, describes no axes of the new font.
fn build_gdef_without_varstore(gdef: &read_fonts::tables::gdef::Gdef) -> Gdef {
    let glyph_class_def = gdef
        .glyph_class_def()
        .transpose()
        .ok()
        .flatten()
        .map(|g| g.to_owned_table());
    let attach_list = gdef
        .attach_list()
        .transpose()
        .ok()
        .flatten()
        .map(|a| a.to_owned_table());
    let lig_caret_list = gdef
        .lig_caret_list()
        .transpose()
        .ok()
        .flatten()
        .map(|l| l.to_owned_table());
    let mark_attach_class_def = gdef
        .mark_attach_class_def()
        .transpose()
        .ok()
        .flatten()
        .map(|m| m.to_owned_table());

    let mut new_gdef =
        Gdef::new(glyph_class_def, attach_list, lig_caret_list, mark_attach_class_def);
    new_gdef.mark_glyph_sets_def = gdef
        .mark_glyph_sets_def()
        .transpose()
        .ok()
        .flatten()
        .map(|m| m.to_owned_table())
        .into();
    new_gdef
}

/// Build a GSUB table without FeatureVariations.
///
/// Conditions are regenerated from the substitution rules.
pub(crate) fn build_gsub_without_feature_variations(
    gsub: &read_fonts::tables::gsub::Gsub,
) -> Result<Gsub> {
    let script_list = gsub.script_list()?.to_owned_table();
    let feature_list = gsub.feature_list()?.to_owned_table();
    let lookup_list = gsub.lookup_list()?.to_owned_table();

    Ok(Gsub::new(script_list, feature_list, lookup_list))
}

fn build_gpos_without_feature_variations(gpos: &read_fonts::tables::gpos::Gpos) -> Result<Gpos> {
    let script_list = gpos.script_list()?.to_owned_table();
    let feature_list = gpos.feature_list()?.to_owned_table();
    let lookup_list = gpos.lookup_list()?.to_owned_table();

    Ok(Gpos::new(script_list, feature_list, lookup_list))
}
