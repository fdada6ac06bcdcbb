//! Typed design-space locations.

use indexmap::IndexMap;

/// A design-space location: axis name → design coordinate.
///
/// A `Location` on its own is just a mapping; it is checked against the
/// axis registry when handed to [`DesignSpace`](crate::DesignSpace).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location(IndexMap<String, f64>);

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, axis: &str, value: f64) -> Self {
        self.insert(axis, value);
        self
    }

    pub fn insert(&mut self, axis: &str, value: f64) {
        self.0.insert(axis.to_string(), value);
    }

    pub fn get(&self, axis: &str) -> Option<f64> {
        self.0.get(axis).copied()
    }

    pub fn contains(&self, axis: &str) -> bool {
        self.0.contains_key(axis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for Location {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.as_ref().to_string(), v)).collect())
    }
}
