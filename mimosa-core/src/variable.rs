//! Dense numeric arrays mirroring the named quantities of the symbolic model.
//!
//! A [`NumericVariable`] is either a scalar series over time, a time × region table,
//! or a per-region parameter. Values can be addressed by label (`"USA"`, a time
//! label) or by array position, see [`AddressingMode`].

use crate::errors::{SimError, SimResult};
use crate::index::{Dimension, IndexSet, Label};
use crate::state::StateValue;
use ndarray::Dimension as _;
use ndarray::{Array1, ArrayD, ArrayView1, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Floating point type used for all numeric state
pub type FloatValue = f64;

/// How the elements of a key are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    /// Keys are index labels, e.g. `["USA", 2]`
    Label,
    /// Keys are array positions, e.g. `[0, 2]`
    Position,
}

/// Whether a declared quantity is computed by the model or supplied as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    /// A decision or state variable of the model.
    ///
    /// Variables are either produced by an equation or act as control inputs.
    Variable,
    /// A raw input parameter which is never produced by an equation
    Parameter,
}

/// A dense, multi-dimensional array for one named quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericVariable {
    name: String,
    unit: Option<String>,
    kind: VariableKind,
    index: Vec<Arc<IndexSet>>,
    values: ArrayD<FloatValue>,
}

impl NumericVariable {
    /// Create a new variable with all values set to NaN
    pub fn new(name: impl Into<String>, kind: VariableKind, index: Vec<Arc<IndexSet>>) -> Self {
        let shape: Vec<usize> = index.iter().map(|i| i.len()).collect();
        Self {
            name: name.into(),
            unit: None,
            kind,
            index,
            values: ArrayD::from_elem(IxDyn(&shape), FloatValue::NAN),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Replace all values
    ///
    /// The shape of `values` must match the cardinalities of the variable's dimensions.
    pub fn with_values(mut self, values: ArrayD<FloatValue>) -> SimResult<Self> {
        self.assign(values)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn dims(&self) -> Vec<Dimension> {
        self.index.iter().map(|i| i.dimension()).collect()
    }

    pub fn index_sets(&self) -> &[Arc<IndexSet>] {
        &self.index
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn values(&self) -> &ArrayD<FloatValue> {
        &self.values
    }

    pub fn is_time_indexed(&self) -> bool {
        self.index
            .first()
            .is_some_and(|i| i.dimension() == Dimension::Time)
    }

    /// True for time × region variables
    pub fn is_regional(&self) -> bool {
        self.dims() == [Dimension::Time, Dimension::Region]
    }

    /// Overwrite every value, checking the shape first
    pub fn assign(&mut self, values: ArrayD<FloatValue>) -> SimResult<()> {
        if values.shape() != self.values.shape() {
            return Err(SimError::ShapeMismatch {
                variable: self.name.clone(),
                expected: self.values.shape().to_vec(),
                got: values.shape().to_vec(),
            });
        }
        self.values = values;
        Ok(())
    }

    /// Convert a key into array positions
    fn resolve(&self, mode: AddressingMode, key: &[Label]) -> SimResult<Vec<usize>> {
        if key.len() != self.index.len() {
            return Err(SimError::DimensionMismatch {
                variable: self.name.clone(),
                expected: self.index.len(),
                got: key.len(),
            });
        }

        key.iter()
            .zip(self.index.iter())
            .map(|(label, index)| match mode {
                AddressingMode::Label => {
                    index.position(label).ok_or_else(|| SimError::UnknownLabel {
                        variable: self.name.clone(),
                        dimension: index.dimension().to_string(),
                        label: label.to_string(),
                    })
                }
                AddressingMode::Position => {
                    let position = label.as_position().ok_or_else(|| SimError::NotAPosition {
                        variable: self.name.clone(),
                        label: label.to_string(),
                    })?;
                    self.check_position(index, position)
                }
            })
            .collect()
    }

    fn check_position(&self, index: &IndexSet, position: usize) -> SimResult<usize> {
        if position < index.len() {
            Ok(position)
        } else {
            Err(SimError::PositionOutOfRange {
                variable: self.name.clone(),
                dimension: index.dimension().to_string(),
                position,
                length: index.len(),
            })
        }
    }

    /// Read a single value
    pub fn get(&self, mode: AddressingMode, key: &[Label]) -> SimResult<FloatValue> {
        let positions = self.resolve(mode, key)?;
        Ok(self.values[IxDyn(&positions)])
    }

    /// Write a single value
    pub fn set(&mut self, mode: AddressingMode, key: &[Label], value: FloatValue) -> SimResult<()> {
        let positions = self.resolve(mode, key)?;
        self.values[IxDyn(&positions)] = value;
        Ok(())
    }

    /// Read a single value by array positions
    pub fn at(&self, positions: &[usize]) -> SimResult<FloatValue> {
        if positions.len() != self.index.len() {
            return Err(SimError::DimensionMismatch {
                variable: self.name.clone(),
                expected: self.index.len(),
                got: positions.len(),
            });
        }
        for (index, position) in self.index.iter().zip(positions) {
            self.check_position(index, *position)?;
        }
        Ok(self.values[IxDyn(positions)])
    }

    /// All values along the trailing axis at `position` of the leading axis
    ///
    /// For a time × region variable this is the regional row of one timestep.
    pub fn row(&self, position: usize) -> SimResult<ArrayView1<'_, FloatValue>> {
        self.check_rank(2)?;
        self.check_position(&self.index[0], position)?;
        let row = self.values.index_axis(Axis(0), position);
        row.into_dimensionality()
            .map_err(|e| SimError::Error(format!("{}: {}", self.name, e)))
    }

    /// All values of a one-dimensional variable
    pub fn series(&self) -> SimResult<ArrayView1<'_, FloatValue>> {
        self.check_rank(1)?;
        self.values
            .view()
            .into_dimensionality()
            .map_err(|e| SimError::Error(format!("{}: {}", self.name, e)))
    }

    /// Write one timestep of the variable
    ///
    /// For time-only variables `value` must be a scalar. For time × region variables a
    /// scalar is broadcast to every region, a regional value must have one entry per region.
    pub fn set_row(&mut self, position: usize, value: &StateValue) -> SimResult<()> {
        match (self.index.len(), value) {
            (1, StateValue::Scalar(v)) => {
                self.check_position(&self.index[0], position)?;
                self.values[IxDyn(&[position])] = *v;
                Ok(())
            }
            (1, StateValue::Regional(values)) => Err(SimError::ShapeMismatch {
                variable: self.name.clone(),
                expected: vec![],
                got: vec![values.len()],
            }),
            (2, value) => {
                self.check_position(&self.index[0], position)?;
                let n = self.index[1].len();
                let mut row = self.values.index_axis_mut(Axis(0), position);
                match value {
                    StateValue::Scalar(v) => row.fill(*v),
                    StateValue::Regional(values) => {
                        if values.len() != n {
                            return Err(SimError::ShapeMismatch {
                                variable: self.name.clone(),
                                expected: vec![n],
                                got: vec![values.len()],
                            });
                        }
                        row.assign(values);
                    }
                }
                Ok(())
            }
            (rank, _) => Err(SimError::DimensionMismatch {
                variable: self.name.clone(),
                expected: rank,
                got: 1,
            }),
        }
    }

    /// Write a single time × region cell by position
    pub fn set_at(&mut self, positions: &[usize], value: FloatValue) -> SimResult<()> {
        self.at(positions)?;
        self.values[IxDyn(positions)] = value;
        Ok(())
    }

    /// Copy the values of a one-dimensional variable into an owned array
    pub fn to_series(&self) -> SimResult<Array1<FloatValue>> {
        Ok(self.series()?.to_owned())
    }

    /// Every value keyed by its labels, in index order
    pub fn labelled_values(&self) -> Vec<(Vec<Label>, FloatValue)> {
        self.values
            .indexed_iter()
            .map(|(positions, value)| {
                let labels = positions
                    .slice()
                    .iter()
                    .zip(self.index.iter())
                    .filter_map(|(p, index)| index.label(*p).cloned())
                    .collect();
                (labels, *value)
            })
            .collect()
    }

    fn check_rank(&self, expected: usize) -> SimResult<()> {
        if self.index.len() == expected {
            Ok(())
        } else {
            Err(SimError::DimensionMismatch {
                variable: self.name.clone(),
                expected: self.index.len(),
                got: expected,
            })
        }
    }
}

impl fmt::Display for NumericVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values = format!("{}", self.values);
        if values.len() > 50 {
            values.truncate(50);
            values.push_str("...");
        }
        write!(f, "NumericVariable({}, {})", self.name, values)?;
        if let Some(unit) = &self.unit {
            write!(f, " [{}]", unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn regional() -> NumericVariable {
        let time = Arc::new(IndexSet::time_steps(4));
        let regions = Arc::new(IndexSet::new(Dimension::Region, ["region1", "region2"]).unwrap());
        // 100 * t + region number
        let values = Array2::from_shape_fn((4, 2), |(t, r)| (100 * t + r + 1) as f64);
        NumericVariable::new("var2", VariableKind::Variable, vec![time, regions])
            .with_values(values.into_dyn())
            .unwrap()
    }

    #[test]
    fn new_variables_are_nan() {
        let time = Arc::new(IndexSet::time_steps(3));
        let var = NumericVariable::new("x", VariableKind::Variable, vec![time]);
        assert_eq!(var.shape(), &[3]);
        assert!(var.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn label_and_position_addressing_agree() {
        let var = regional();
        let by_label = var
            .get(AddressingMode::Label, &[2.into(), "region1".into()])
            .unwrap();
        let by_position = var.get(AddressingMode::Position, &[2.into(), 0.into()]).unwrap();
        assert_eq!(by_label, 201.0);
        assert_eq!(by_label, by_position);
    }

    #[test]
    fn text_labels_are_not_positions() {
        let var = regional();
        let err = var
            .get(AddressingMode::Position, &[2.into(), "region1".into()])
            .unwrap_err();
        assert!(matches!(err, SimError::NotAPosition { .. }));
    }

    #[test]
    fn unknown_labels_and_positions_are_errors() {
        let var = regional();
        assert!(matches!(
            var.get(AddressingMode::Label, &[2.into(), "region9".into()]),
            Err(SimError::UnknownLabel { .. })
        ));
        assert!(matches!(
            var.get(AddressingMode::Position, &[7.into(), 0.into()]),
            Err(SimError::PositionOutOfRange { .. })
        ));
        assert!(matches!(
            var.get(AddressingMode::Position, &[1.into()]),
            Err(SimError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn set_row_broadcasts_scalars() {
        let mut var = regional();
        var.set_row(1, &StateValue::Scalar(7.0)).unwrap();
        assert_eq!(var.row(1).unwrap(), array![7.0, 7.0]);

        var.set_row(2, &StateValue::Regional(array![1.0, 2.0])).unwrap();
        assert_eq!(var.row(2).unwrap(), array![1.0, 2.0]);

        let err = var
            .set_row(2, &StateValue::Regional(array![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch { .. }));
    }

    #[test]
    fn set_by_label() {
        let mut var = regional();
        var.set(AddressingMode::Label, &[3.into(), "region2".into()], -1.0)
            .unwrap();
        assert_eq!(var.at(&[3, 1]).unwrap(), -1.0);
    }

    #[test]
    fn labelled_values_follow_index_order() {
        let var = regional();
        let labelled = var.labelled_values();
        assert_eq!(labelled.len(), 8);
        assert_eq!(labelled[0], (vec![Label::Int(0), "region1".into()], 1.0));
        assert_eq!(labelled[7], (vec![Label::Int(3), "region2".into()], 302.0));
    }

    #[test]
    fn shape_is_checked_on_assignment() {
        let mut var = regional();
        let err = var.assign(ndarray::ArrayD::zeros(IxDyn(&[3, 2]))).unwrap_err();
        assert!(matches!(err, SimError::ShapeMismatch { .. }));
    }

    #[test]
    fn display_truncates_long_values() {
        let time = Arc::new(IndexSet::time_steps(20));
        let var = NumericVariable::new("var2", VariableKind::Variable, vec![time])
            .with_values(ndarray::ArrayD::zeros(IxDyn(&[20])))
            .unwrap()
            .with_unit("GtCO2");
        let text = var.to_string();
        assert!(text.starts_with("NumericVariable(var2, "));
        assert!(text.contains("..."));
        assert!(text.ends_with("[GtCO2]"));
    }
}
