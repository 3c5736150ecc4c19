//! Simulation state: every numeric variable of a run plus its index metadata.
//!
//! A [`SimulationState`] is materialised from a [`SymbolicModel`] (or assembled with a
//! [`StateBuilder`]), filled in by the simulator and then exported or copied back
//! into the symbolic model.
//!
//! Values are read through a [`StateView`], which fixes how keys are interpreted
//! (labels or positions). Views in different modes can be used side by side; the
//! state itself has no addressing-mode flag.

mod value;
mod view;

pub use value::StateValue;
pub use view::{ReadLog, StateView};

use crate::errors::{SimError, SimResult};
use crate::index::{Dimension, IndexSet, Label};
use crate::variable::{AddressingMode, FloatValue, NumericVariable, VariableKind};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A quantity declared by the symbolic model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub kind: VariableKind,
    pub dims: Vec<Dimension>,
    pub unit: Option<String>,
    /// Current values, or `None` if the quantity has not been initialised
    pub values: Option<ArrayD<FloatValue>>,
}

impl VariableDeclaration {
    pub fn variable(name: impl Into<String>, dims: &[Dimension]) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Variable,
            dims: dims.to_vec(),
            unit: None,
            values: None,
        }
    }

    pub fn parameter(name: impl Into<String>, dims: &[Dimension], values: ArrayD<FloatValue>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Parameter,
            dims: dims.to_vec(),
            unit: None,
            values: Some(values),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_values(mut self, values: ArrayD<FloatValue>) -> Self {
        self.values = Some(values);
        self
    }
}

/// The symbolic model that a simulation state mirrors
///
/// This is the boundary to the equation framework that owns the optimisation problem.
/// The simulator only needs to enumerate what is declared, read the current values and,
/// for warm starts, write initial values back.
pub trait SymbolicModel {
    /// Labels of the time index, in order
    fn time_labels(&self) -> Vec<Label>;

    /// Labels of the region index, in order
    fn region_labels(&self) -> Vec<Label>;

    /// Every declared variable and parameter with at least one dimension
    fn declarations(&self) -> Vec<VariableDeclaration>;

    /// Zero-dimensional parameters
    fn scalars(&self) -> Vec<(String, FloatValue)>;

    /// Set the initial value used by the solver for one element of a variable
    fn set_initial_value(&mut self, name: &str, key: &[Label], value: FloatValue) -> SimResult<()>;
}

/// One exported row: a variable in one region (or globally) over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub variable: String,
    /// Region label, or `Global` for time-only variables
    pub region: Label,
    pub unit: Option<String>,
    pub values: Vec<FloatValue>,
}

/// All numeric variables of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    time: Arc<IndexSet>,
    regions: Arc<IndexSet>,
    variables: BTreeMap<String, NumericVariable>,
    scalars: BTreeMap<String, FloatValue>,
}

impl SimulationState {
    /// Create an empty state over the given time and region indices
    pub fn new(time: IndexSet, regions: IndexSet) -> Self {
        Self {
            time: Arc::new(time),
            regions: Arc::new(regions),
            variables: BTreeMap::new(),
            scalars: BTreeMap::new(),
        }
    }

    /// Materialise a state from the declarations and current values of a symbolic model
    pub fn from_model<M: SymbolicModel + ?Sized>(model: &M) -> SimResult<Self> {
        let time = IndexSet::new(Dimension::Time, model.time_labels())?;
        let regions = IndexSet::new(Dimension::Region, model.region_labels())?;
        let mut state = Self::new(time, regions);
        for declaration in model.declarations() {
            state.declare(declaration)?;
        }
        for (name, value) in model.scalars() {
            state.insert_scalar(name, value);
        }
        Ok(state)
    }

    /// Add (or replace) a variable
    ///
    /// Values that are not supplied are NaN.
    pub fn declare(&mut self, declaration: VariableDeclaration) -> SimResult<()> {
        let index = declaration
            .dims
            .iter()
            .map(|dim| match dim {
                Dimension::Time => self.time.clone(),
                Dimension::Region => self.regions.clone(),
            })
            .collect();
        let mut variable = NumericVariable::new(&declaration.name, declaration.kind, index);
        if let Some(unit) = declaration.unit {
            variable = variable.with_unit(unit);
        }
        if let Some(values) = declaration.values {
            variable = variable.with_values(values)?;
        }
        self.variables.insert(declaration.name, variable);
        Ok(())
    }

    pub fn insert_scalar(&mut self, name: impl Into<String>, value: FloatValue) {
        self.scalars.insert(name.into(), value);
    }

    pub fn time(&self) -> &IndexSet {
        &self.time
    }

    pub fn regions(&self) -> &IndexSet {
        &self.regions
    }

    pub fn n_timesteps(&self) -> usize {
        self.time.len()
    }

    pub fn n_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn variable(&self, name: &str) -> SimResult<&NumericVariable> {
        self.variables
            .get(name)
            .ok_or_else(|| SimError::UnknownVariable(name.to_string()))
    }

    pub fn variable_mut(&mut self, name: &str) -> SimResult<&mut NumericVariable> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| SimError::UnknownVariable(name.to_string()))
    }

    pub fn variables(&self) -> impl Iterator<Item = &NumericVariable> {
        self.variables.values()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// True if `name` is a variable or a scalar
    pub fn contains(&self, name: &str) -> bool {
        self.has_variable(name) || self.scalars.contains_key(name)
    }

    /// Kind of a quantity; scalars are always parameters
    pub fn kind_of(&self, name: &str) -> Option<VariableKind> {
        match self.variables.get(name) {
            Some(variable) => Some(variable.kind()),
            None => self
                .scalars
                .contains_key(name)
                .then_some(VariableKind::Parameter),
        }
    }

    pub fn scalar(&self, name: &str) -> SimResult<FloatValue> {
        self.scalars
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownVariable(name.to_string()))
    }

    /// Names of all variables indexed by time, sorted
    pub fn time_indexed_variables(&self) -> Vec<&str> {
        self.variables
            .values()
            .filter(|v| v.is_time_indexed())
            .map(|v| v.name())
            .collect()
    }

    /// Read-only access with keys interpreted in `mode`
    pub fn view(&self, mode: AddressingMode) -> StateView<'_> {
        StateView::new(self, mode)
    }

    /// Shorthand for a label-addressed view
    pub fn labels(&self) -> StateView<'_> {
        self.view(AddressingMode::Label)
    }

    /// Shorthand for a position-addressed view
    pub fn positions(&self) -> StateView<'_> {
        self.view(AddressingMode::Position)
    }

    /// Write a single value with the key interpreted in `mode`
    pub fn set(
        &mut self,
        mode: AddressingMode,
        name: &str,
        key: &[Label],
        value: FloatValue,
    ) -> SimResult<()> {
        self.variable_mut(name)?.set(mode, key, value)
    }

    /// One row per time-indexed variable and region, with values in time order
    ///
    /// Time-only variables produce a single `Global` row. Column headers are the
    /// time labels, see [`SimulationState::time`].
    pub fn export_rows(&self) -> Vec<ExportRow> {
        let mut rows = vec![];
        for variable in self.variables.values().filter(|v| v.is_time_indexed()) {
            let values = variable.values();
            match variable.shape().len() {
                1 => rows.push(ExportRow {
                    variable: variable.name().to_string(),
                    region: Label::from("Global"),
                    unit: variable.unit().map(str::to_string),
                    values: values.iter().copied().collect(),
                }),
                2 => {
                    for (r, region) in self.regions.labels().iter().enumerate() {
                        rows.push(ExportRow {
                            variable: variable.name().to_string(),
                            region: region.clone(),
                            unit: variable.unit().map(str::to_string),
                            values: values
                                .index_axis(ndarray::Axis(1), r)
                                .iter()
                                .copied()
                                .collect(),
                        });
                    }
                }
                _ => {}
            }
        }
        rows
    }
}

/// Assemble a [`SimulationState`] without a symbolic model.
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    time_labels: Option<Vec<Label>>,
    region_labels: Vec<Label>,
    declarations: Vec<VariableDeclaration>,
    initial_values: Vec<(String, ArrayD<FloatValue>)>,
    scalars: Vec<(String, FloatValue)>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_labels<L: Into<Label>>(
        &mut self,
        labels: impl IntoIterator<Item = L>,
    ) -> &mut Self {
        self.time_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Use timesteps `0..n` as time labels
    pub fn with_time_steps(&mut self, n: usize) -> &mut Self {
        self.with_time_labels(0..n)
    }

    pub fn with_regions<L: Into<Label>>(
        &mut self,
        labels: impl IntoIterator<Item = L>,
    ) -> &mut Self {
        self.region_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_declaration(&mut self, declaration: VariableDeclaration) -> &mut Self {
        self.declarations.push(declaration);
        self
    }

    pub fn with_variable(&mut self, name: &str, dims: &[Dimension]) -> &mut Self {
        self.with_declaration(VariableDeclaration::variable(name, dims))
    }

    pub fn with_parameter(
        &mut self,
        name: &str,
        dims: &[Dimension],
        values: ArrayD<FloatValue>,
    ) -> &mut Self {
        self.with_declaration(VariableDeclaration::parameter(name, dims, values))
    }

    /// Initial values for a variable declared on this builder
    pub fn with_values(&mut self, name: &str, values: ArrayD<FloatValue>) -> &mut Self {
        self.initial_values.push((name.to_string(), values));
        self
    }

    pub fn with_scalar(&mut self, name: &str, value: FloatValue) -> &mut Self {
        self.scalars.push((name.to_string(), value));
        self
    }

    pub fn build(&self) -> SimResult<SimulationState> {
        let time_labels = self
            .time_labels
            .clone()
            .ok_or_else(|| SimError::InvalidConfig("no time index was provided".to_string()))?;
        let mut state = SimulationState::new(
            IndexSet::new(Dimension::Time, time_labels)?,
            IndexSet::new(Dimension::Region, self.region_labels.clone())?,
        );
        for declaration in &self.declarations {
            state.declare(declaration.clone())?;
        }
        for (name, values) in &self.initial_values {
            state.variable_mut(name)?.assign(values.clone())?;
        }
        for (name, value) in &self.scalars {
            state.insert_scalar(name.as_str(), *value);
        }
        Ok(state)
    }
}
