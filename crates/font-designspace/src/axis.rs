//! Variation axes, their user→design maps and normalization.

use font_types::Tag;

use crate::error::{Error, Result};

/// Registered axes that may be declared by name alone.
const STANDARD_AXES: &[(&str, [u8; 4], &str)] = &[
    ("weight", *b"wght", "Weight"),
    ("width", *b"wdth", "Width"),
    ("slant", *b"slnt", "Slant"),
    ("optical", *b"opsz", "Optical Size"),
    ("italic", *b"ital", "Italic"),
];

/// A named stop on an axis, emitted as a STAT axis value.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabel {
    pub name: String,
    /// User-space value.
    pub value: f64,
    pub elidable: bool,
}

impl AxisLabel {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), value, elidable: false }
    }

    pub fn elidable(mut self) -> Self {
        self.elidable = true;
        self
    }
}

/// A variation axis in the design space.
///
/// `minimum`, `default` and `maximum` are user-space values. Master and
/// instance locations are expressed in design coordinates, related to user
/// space through `map`.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Four-character axis tag (e.g. `wght`)
    pub tag: Tag,
    /// Axis name used as the key of every [`Location`](crate::Location)
    pub name: String,
    /// Name written to the font's name table
    pub display_name: String,
    pub minimum: f64,
    pub default: f64,
    pub maximum: f64,
    /// (user, design) pairs, sorted by user value
    pub map: Vec<(f64, f64)>,
    pub labels: Vec<AxisLabel>,
    /// Hidden axes set the fvar HIDDEN_AXIS flag.
    pub hidden: bool,
}

impl Axis {
    /// Create a new axis with an identity user→design map.
    pub fn new(tag: Tag, name: &str, minimum: f64, default: f64, maximum: f64) -> Self {
        Self {
            tag,
            name: name.to_string(),
            display_name: name.to_string(),
            minimum,
            default,
            maximum,
            map: Vec::new(),
            labels: Vec::new(),
            hidden: false,
        }
    }

    /// Create one of the registered axes (`weight`, `width`, `slant`,
    /// `optical`, `italic`) by name, filling in its tag and display name.
    pub fn standard(name: &str, minimum: f64, default: f64, maximum: f64) -> Option<Self> {
        let (_, tag, display) = STANDARD_AXES.iter().find(|(n, _, _)| *n == name)?;
        let mut axis = Self::new(Tag::new(tag), name, minimum, default, maximum);
        axis.display_name = display.to_string();
        Some(axis)
    }

    /// Create a standard weight axis (wght: 100-900, default 400).
    pub fn weight() -> Self {
        Self::new(Tag::new(b"wght"), "Weight", 100.0, 400.0, 900.0)
    }

    /// Set the user→design map. Pairs are sorted by user value.
    pub fn with_map(mut self, map: impl IntoIterator<Item = (f64, f64)>) -> Self {
        self.map = map.into_iter().collect();
        self.map.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_label(mut self, label: AxisLabel) -> Self {
        self.labels.push(label);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Check bounds, tag and map monotonicity.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Error::InvalidAxis { axis: self.name.clone(), message };

        if self.name.is_empty() {
            return Err(invalid("axis name must not be empty".to_string()));
        }
        if self.tag.validate().is_err() {
            return Err(invalid(format!("'{}' is not a valid tag", self.tag)));
        }
        if !(self.minimum <= self.default && self.default <= self.maximum) {
            return Err(invalid(format!(
                "bounds must satisfy minimum <= default <= maximum, got {} / {} / {}",
                self.minimum, self.default, self.maximum
            )));
        }
        for pair in self.map.windows(2) {
            let ((u0, d0), (u1, d1)) = (pair[0], pair[1]);
            if u0 == u1 || d1 < d0 {
                return Err(invalid(format!(
                    "map must be strictly increasing, got ({u0}, {d0}) then ({u1}, {d1})"
                )));
            }
        }
        Ok(())
    }

    /// Map a user-space value to design space.
    pub fn map_forward(&self, value: f64) -> f64 {
        piecewise_linear_map(value, self.map.iter().copied())
    }

    /// Map a design-space value back to user space.
    pub fn map_backward(&self, value: f64) -> f64 {
        let mut inverse: Vec<(f64, f64)> = self.map.iter().map(|&(u, d)| (d, u)).collect();
        inverse.sort_by(|a, b| a.0.total_cmp(&b.0));
        piecewise_linear_map(value, inverse)
    }

    /// The (minimum, default, maximum) triple in design coordinates.
    pub fn design_triple(&self) -> (f64, f64, f64) {
        (
            self.map_forward(self.minimum),
            self.map_forward(self.default),
            self.map_forward(self.maximum),
        )
    }

    /// The axis default in design coordinates.
    pub fn design_default(&self) -> f64 {
        self.map_forward(self.default)
    }

    /// Whether a design coordinate lies within the axis bounds once mapped
    /// back to user space.
    pub fn contains_design(&self, value: f64) -> bool {
        let user = self.map_backward(value);
        self.minimum <= user && user <= self.maximum
    }

    /// Normalize a design coordinate to [-1, 1].
    ///
    /// The value is clamped to the axis range first; values below the
    /// default land in [-1, 0], values above it in [0, 1].
    pub fn normalize(&self, value: f64) -> f64 {
        normalize_value(value, self.design_triple())
    }

    /// The avar segment map for this axis in normalized coordinates.
    ///
    /// Always contains -1, 0 and 1. An axis without a map yields exactly
    /// those three identity pairs.
    pub fn normalized_map(&self) -> Vec<(f64, f64)> {
        let user_triple = (self.minimum, self.default, self.maximum);
        let design_triple = self.design_triple();

        let mut segments: Vec<(f64, f64)> = vec![(-1.0, -1.0), (0.0, 0.0), (1.0, 1.0)];
        for &(user, design) in &self.map {
            let from = normalize_value(user, user_triple);
            let to = normalize_value(design, design_triple);
            match segments.iter_mut().find(|(k, _)| *k == from) {
                Some(existing) => existing.1 = to,
                None => segments.push((from, to)),
            }
        }
        segments.sort_by(|a, b| a.0.total_cmp(&b.0));
        segments
    }
}

/// Normalize `value` against a (lower, default, upper) triple.
pub fn normalize_value(value: f64, (lower, default, upper): (f64, f64, f64)) -> f64 {
    let value = value.clamp(lower, upper);
    if value == default {
        0.0
    } else if value < default {
        (value - default) / (default - lower)
    } else {
        (value - default) / (upper - default)
    }
}

/// Piecewise-linear interpolation through sorted `(key, value)` pairs.
///
/// Outside the key range the nearest pair's offset is applied, so the map
/// keeps its slope of 1 beyond the ends. An empty mapping is the identity.
pub fn piecewise_linear_map(value: f64, mapping: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let mapping: Vec<(f64, f64)> = mapping.into_iter().collect();
    let (Some(&(first_key, first_value)), Some(&(last_key, last_value))) =
        (mapping.first(), mapping.last())
    else {
        return value;
    };

    if let Some(&(_, exact)) = mapping.iter().find(|(k, _)| *k == value) {
        return exact;
    }
    if value < first_key {
        return value + first_value - first_key;
    }
    if value > last_key {
        return value + last_value - last_key;
    }

    for pair in mapping.windows(2) {
        let ((a, va), (b, vb)) = (pair[0], pair[1]);
        if a < value && value < b {
            return va + (vb - va) * (value - a) / (b - a);
        }
    }
    value
}
