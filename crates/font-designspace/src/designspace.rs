//! The design-space document: axes, masters, instances and rules.

use log::debug;

use crate::{
    DEFAULT_LAYER_NAME,
    axis::Axis,
    error::{Error, Result},
    location::Location,
    source::{SourceArena, SourceId, SourceLoader},
};

/// A master: a source's layer placed at a design-space location.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterSource {
    pub name: String,
    pub filename: String,
    /// Resolved by [`DesignSpace::load_sources`] or set directly.
    pub source: Option<SourceId>,
    /// Layer supplying the outlines; `None` means the default layer.
    pub layer: Option<String>,
    pub location: Location,
}

impl MasterSource {
    pub fn new(name: &str, filename: &str, location: Location) -> Self {
        Self {
            name: name.to_string(),
            filename: filename.to_string(),
            source: None,
            layer: None,
            location,
        }
    }

    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_layer(mut self, layer: &str) -> Self {
        self.layer = Some(layer.to_string());
        self
    }

    /// Name of the layer this master draws from.
    pub fn layer_name(&self) -> &str {
        self.layer.as_deref().unwrap_or(DEFAULT_LAYER_NAME)
    }

    /// Whether this master selects a non-default layer and therefore may
    /// supply only part of the glyph set.
    pub fn is_sparse(&self) -> bool {
        self.layer_name() != DEFAULT_LAYER_NAME
    }
}

/// A named instance, written to fvar.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Subfamily name (e.g. "Bold")
    pub name: String,
    pub postscript_name: Option<String>,
    pub location: Location,
}

impl Instance {
    pub fn new(name: &str, location: Location) -> Self {
        Self { name: name.to_string(), postscript_name: None, location }
    }

    pub fn with_postscript_name(mut self, name: &str) -> Self {
        self.postscript_name = Some(name.to_string());
        self
    }
}

/// Replace `glyph` by `replacement` while `minimum <= axis < maximum`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionRule {
    pub name: String,
    pub glyph: String,
    pub replacement: String,
    pub axis: String,
    /// Design coordinate, inclusive.
    pub minimum: f64,
    /// Design coordinate, exclusive.
    pub maximum: f64,
}

impl SubstitutionRule {
    pub fn contains(&self, value: f64) -> bool {
        self.minimum <= value && value < self.maximum
    }
}

/// Axes, masters, instances and substitution rules of one variable font.
///
/// Every location is validated when it is added; collections only grow.
#[derive(Debug, Clone, Default)]
pub struct DesignSpace {
    axes: Vec<Axis>,
    masters: Vec<MasterSource>,
    instances: Vec<Instance>,
    rules: Vec<SubstitutionRule>,
}

impl DesignSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_axis(&mut self, axis: Axis) -> Result<()> {
        axis.validate()?;
        if self.axes.iter().any(|a| a.name == axis.name || a.tag == axis.tag) {
            return Err(Error::DuplicateAxis(axis.name));
        }
        self.axes.push(axis);
        Ok(())
    }

    /// Append a master, returning its index.
    pub fn add_master(&mut self, master: MasterSource) -> Result<usize> {
        self.validate_location(&master.location, &master.name)?;
        self.masters.push(master);
        Ok(self.masters.len() - 1)
    }

    pub fn add_instance(&mut self, instance: Instance) -> Result<()> {
        self.validate_location(&instance.location, &instance.name)?;
        self.instances.push(instance);
        Ok(())
    }

    /// Append a substitution rule. Its range is in design coordinates and
    /// must be non-empty and inside the axis bounds.
    pub fn add_rule(&mut self, rule: SubstitutionRule) -> Result<()> {
        let Some(axis) = self.axis(&rule.axis) else {
            return Err(Error::UnknownAxis { axis: rule.axis, owner: rule.name });
        };
        for value in [rule.minimum, rule.maximum] {
            if !axis.contains_design(value) {
                return Err(Error::OutOfRange {
                    axis: rule.axis.clone(),
                    owner: rule.name.clone(),
                    value: axis.map_backward(value),
                    minimum: axis.minimum,
                    maximum: axis.maximum,
                });
            }
        }
        if rule.minimum >= rule.maximum {
            return Err(Error::InvalidRule {
                message: format!("empty range [{}, {})", rule.minimum, rule.maximum),
                rule: rule.name,
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.name == name)
    }

    pub fn masters(&self) -> &[MasterSource] {
        &self.masters
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn rules(&self) -> &[SubstitutionRule] {
        &self.rules
    }

    /// Check that every axis in `location` exists and that each coordinate,
    /// mapped back to user space, lies within its axis bounds.
    pub fn validate_location(&self, location: &Location, owner: &str) -> Result<()> {
        for (name, value) in location.iter() {
            let axis = self.axis(name).ok_or_else(|| Error::UnknownAxis {
                axis: name.to_string(),
                owner: owner.to_string(),
            })?;
            if !axis.contains_design(value) {
                return Err(Error::OutOfRange {
                    axis: name.to_string(),
                    owner: owner.to_string(),
                    value: axis.map_backward(value),
                    minimum: axis.minimum,
                    maximum: axis.maximum,
                });
            }
        }
        Ok(())
    }

    /// Fill every missing master and instance coordinate with the axis
    /// default in design coordinates.
    pub fn resolve_defaults(&mut self) {
        let axes = &self.axes;
        let locations = self
            .masters
            .iter_mut()
            .map(|m| &mut m.location)
            .chain(self.instances.iter_mut().map(|i| &mut i.location));
        for location in locations {
            for axis in axes {
                if !location.contains(&axis.name) {
                    location.insert(&axis.name, axis.design_default());
                }
            }
        }
    }

    /// Design coordinates in axis order; missing axes take their default.
    pub fn design_coordinates(&self, location: &Location) -> Vec<f64> {
        self.axes
            .iter()
            .map(|axis| location.get(&axis.name).unwrap_or_else(|| axis.design_default()))
            .collect()
    }

    /// Normalized coordinates in axis order.
    pub fn normalize(&self, location: &Location) -> Vec<f64> {
        self.axes
            .iter()
            .zip(self.design_coordinates(location))
            .map(|(axis, value)| axis.normalize(value))
            .collect()
    }

    pub fn normalized_master_locations(&self) -> Vec<Vec<f64>> {
        self.masters.iter().map(|m| self.normalize(&m.location)).collect()
    }

    /// Resolve each master's filename to a loaded source, loading each file
    /// once.
    pub fn load_sources(&mut self, arena: &mut SourceArena, loader: &dyn SourceLoader) -> Result<()> {
        for master in &mut self.masters {
            if master.source.is_none() {
                let id = arena.load(&master.filename, loader)?;
                debug!("Master '{}' uses source {}", master.name, id.index());
                master.source = Some(id);
            }
        }
        Ok(())
    }

    pub(crate) fn push_master_unchecked(&mut self, master: MasterSource) {
        self.masters.push(master);
    }

    pub(crate) fn push_rule_unchecked(&mut self, rule: SubstitutionRule) {
        self.rules.push(rule);
    }
}
