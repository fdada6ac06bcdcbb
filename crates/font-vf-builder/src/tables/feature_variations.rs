//! Feature variations implementing substitution rules.
//!
//! The rules' normalized ranges are cut into segments at every range
//! boundary. Each segment gets the union of the substitutions active in
//! it, adjacent segments with the same substitutions are merged, and every
//! remaining segment becomes one feature variation record swapping in a
//! single substitution lookup.

use std::collections::BTreeMap;

use read_fonts::types::{F2Dot14, GlyphId16, Tag};
use varlayer_font_designspace::DesignSpace;
use write_fonts::{
    NullableOffsetMarker,
    tables::{
        gsub::{Gsub, SingleSubst, SubstitutionLookup},
        layout::{
            Condition, ConditionSet, CoverageTable, Feature, FeatureRecord,
            FeatureTableSubstitution, FeatureTableSubstitutionRecord, FeatureVariationRecord,
            FeatureVariations, LangSys, Lookup, LookupFlag, Script, ScriptRecord,
        },
    },
};

use super::f2dot14;
use crate::{
    error::{Error, Result},
    masters::Masters,
};

/// `requiredFeatureIndex` of a language system without one
const NO_REQUIRED_FEATURE: u16 = 0xFFFF;

/// Glyph name → replacement name
type Substitutions = BTreeMap<String, String>;

/// A normalized axis range `[start, end)` and its substitutions
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    start: f64,
    end: f64,
    substitutions: Substitutions,
}

/// One substitution rule in normalized coordinates
#[derive(Debug, Clone)]
struct NormalizedRule<'a> {
    minimum: f64,
    maximum: f64,
    glyph: &'a str,
    replacement: &'a str,
}

/// Add the substitution rules of `designspace` to `gsub` as feature
/// variations of `feature_tag`.
///
/// Returns the table unchanged when there are no rules.
pub(crate) fn add_feature_variations(
    designspace: &DesignSpace,
    masters: &Masters,
    gsub: Option<Gsub>,
    feature_tag: Tag,
) -> Result<Option<Gsub>> {
    let rules = designspace.rules();
    let Some(first) = rules.first() else {
        return Ok(gsub);
    };

    if let Some(other) = rules.iter().find(|r| r.axis != first.axis) {
        return Err(Error::merge(
            "GSUB",
            format!(
                "substitution rules must all use one axis, found '{}' and '{}'",
                first.axis, other.axis
            ),
        ));
    }
    let Some(axis_index) = designspace.axes().iter().position(|a| a.name == first.axis) else {
        return Err(Error::merge(
            "GSUB",
            format!("substitution rule '{}' uses unknown axis '{}'", first.name, first.axis),
        ));
    };
    let axis = &designspace.axes()[axis_index];

    let normalized: Vec<NormalizedRule> = rules
        .iter()
        .map(|rule| NormalizedRule {
            minimum: axis.normalize(rule.minimum),
            maximum: axis.normalize(rule.maximum),
            glyph: &rule.glyph,
            replacement: &rule.replacement,
        })
        .collect();

    let segments = merge_adjacent(segment_rules(&normalized)?);
    if segments.is_empty() {
        return Ok(gsub);
    }

    let mut gsub = gsub.unwrap_or_else(|| {
        Gsub::new(Default::default(), Default::default(), Default::default())
    });

    // One lookup per distinct substitution map, appended after existing lookups
    let mut lookup_indices: Vec<(Substitutions, u16)> = Vec::new();
    let mut records: Vec<(F2Dot14, F2Dot14, u16)> = Vec::new();
    for (start, end, substitutions) in encode_ranges(&segments) {
        let lookup_index = match lookup_indices.iter().find(|(s, _)| *s == substitutions) {
            Some((_, index)) => *index,
            None => {
                let index = u16::try_from(gsub.lookup_list.lookups.len())
                    .map_err(|_| Error::merge("GSUB", "too many lookups for a substitution rule"))?;
                gsub.lookup_list.lookups.push(single_subst_lookup(masters, &substitutions)?.into());
                lookup_indices.push((substitutions, index));
                index
            }
        };
        records.push((start, end, lookup_index));
    }

    let feature_index = add_empty_feature(&mut gsub, feature_tag)?;
    let feature_variation_records = records
        .into_iter()
        .map(|(start, end, lookup_index)| {
            let condition = Condition::format_1_axis_range(axis_index as u16, start, end);
            let substitution = FeatureTableSubstitutionRecord::new(
                feature_index,
                Feature::new(None, vec![lookup_index]),
            );
            FeatureVariationRecord {
                condition_set: NullableOffsetMarker::new(Some(ConditionSet::new(vec![condition]))),
                feature_table_substitution: NullableOffsetMarker::new(Some(
                    FeatureTableSubstitution::new(vec![substitution]),
                )),
            }
        })
        .collect();
    gsub.feature_variations =
        NullableOffsetMarker::new(Some(FeatureVariations::new(feature_variation_records)));

    Ok(Some(gsub))
}

/// Cut the rule ranges into segments carrying the active substitutions.
fn segment_rules(rules: &[NormalizedRule]) -> Result<Vec<Segment>> {
    let mut boundaries: Vec<f64> = rules.iter().flat_map(|r| [r.minimum, r.maximum]).collect();
    boundaries.sort_by(f64::total_cmp);
    boundaries.dedup();

    let mut segments = Vec::new();
    for bounds in boundaries.windows(2) {
        let (start, end) = (bounds[0], bounds[1]);
        let mut substitutions = Substitutions::new();
        for rule in rules.iter().filter(|r| r.minimum <= start && start < r.maximum) {
            match substitutions.get(rule.glyph) {
                Some(existing) if existing != rule.replacement => {
                    return Err(Error::merge(
                        "GSUB",
                        format!(
                            "glyph '{}' is replaced by both '{existing}' and '{}' \
                             in [{start}, {end})",
                            rule.glyph, rule.replacement
                        ),
                    ));
                }
                _ => {
                    substitutions.insert(rule.glyph.to_string(), rule.replacement.to_string());
                }
            }
        }
        if !substitutions.is_empty() {
            segments.push(Segment { start, end, substitutions });
        }
    }
    Ok(segments)
}

fn merge_adjacent(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(last)
                if last.end == segment.start && last.substitutions == segment.substitutions =>
            {
                last.end = segment.end;
            }
            _ => merged.push(segment),
        }
    }
    merged
}

/// Encode segments as inclusive F2Dot14 ranges, highest segment first.
///
/// Records are matched in order, so a segment starting where another ends
/// wins at the shared boundary. An upper bound that no other segment
/// starts at is pulled in by one step to keep it exclusive; the top of the
/// axis stays inclusive.
fn encode_ranges(segments: &[Segment]) -> Vec<(F2Dot14, F2Dot14, Substitutions)> {
    let mut encoded: Vec<(F2Dot14, F2Dot14, Substitutions)> = segments
        .iter()
        .map(|segment| {
            let mut end = f2dot14(segment.end);
            let adjoined = segments.iter().any(|s| s.start == segment.end);
            if !adjoined && segment.end < 1.0 {
                end = F2Dot14::from_bits(end.to_bits() - 1);
            }
            (f2dot14(segment.start), end, segment.substitutions.clone())
        })
        .collect();
    encoded.sort_by(|a, b| b.0.cmp(&a.0));
    encoded
}

fn single_subst_lookup(
    masters: &Masters,
    substitutions: &Substitutions,
) -> Result<SubstitutionLookup> {
    let gid = |name: &str| {
        masters
            .glyph_id(name)
            .and_then(|gid| u16::try_from(gid.to_u32()).ok())
            .map(GlyphId16::new)
            .ok_or_else(|| {
                Error::merge("GSUB", format!("substitution rule references unknown glyph '{name}'"))
            })
    };

    let mut pairs: Vec<(GlyphId16, GlyphId16)> = substitutions
        .iter()
        .map(|(glyph, replacement)| Ok((gid(glyph)?, gid(replacement)?)))
        .collect::<Result<Vec<_>>>()?;
    pairs.sort();

    let coverage = CoverageTable::format_1(pairs.iter().map(|p| p.0).collect());
    let single_subst = SingleSubst::format_2(coverage, pairs.iter().map(|p| p.1).collect());
    Ok(SubstitutionLookup::Single(Lookup::new(LookupFlag::empty(), vec![single_subst])))
}

/// Insert an empty feature at its tag-sorted position in the feature
/// list and register it with every language system.
///
/// Feature indices after the insertion point shift up by one.
fn add_empty_feature(gsub: &mut Gsub, tag: Tag) -> Result<u16> {
    let records = &mut gsub.feature_list.feature_records;
    let position = records.partition_point(|r| r.feature_tag <= tag);
    let feature_index = u16::try_from(position)
        .map_err(|_| Error::merge("GSUB", format!("no room for feature '{tag}'")))?;
    records.insert(position, FeatureRecord::new(tag, Feature::new(None, vec![])));

    if gsub.script_list.script_records.is_empty() {
        let script = Script::new(Some(LangSys::new(vec![feature_index])), vec![]);
        gsub.script_list.script_records.push(ScriptRecord::new(Tag::new(b"DFLT"), script));
        return Ok(feature_index);
    }

    let register = |lang_sys: &mut LangSys| {
        for index in lang_sys.feature_indices.iter_mut() {
            if *index >= feature_index {
                *index += 1;
            }
        }
        if lang_sys.required_feature_index != NO_REQUIRED_FEATURE
            && lang_sys.required_feature_index >= feature_index
        {
            lang_sys.required_feature_index += 1;
        }
        lang_sys.feature_indices.push(feature_index);
        lang_sys.feature_indices.sort_unstable();
    };
    for record in gsub.script_list.script_records.iter_mut() {
        if let Some(default_lang_sys) = record.script.default_lang_sys.as_mut() {
            register(default_lang_sys);
        }
        for lang_sys_record in record.script.lang_sys_records.iter_mut() {
            register(&mut lang_sys_record.lang_sys);
        }
    }
    Ok(feature_index)
}
