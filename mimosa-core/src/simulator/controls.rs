use crate::errors::{SimError, SimResult};
use crate::index::Label;
use crate::variable::{AddressingMode, FloatValue, NumericVariable};
use ndarray::{ArrayD, IxDyn};
use std::collections::BTreeMap;

/// Values for one control variable of a run
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Zero everywhere
    Zero,
    /// The same value for every timestep and region
    Uniform(FloatValue),
    /// A full array with the shape of the variable
    Array(ArrayD<FloatValue>),
    /// Values keyed by labels (time, then region); cells that are not listed are zero
    Labelled(BTreeMap<Vec<Label>, FloatValue>),
}

/// Controls keyed by variable name
pub type Controls = BTreeMap<String, Control>;

impl Control {
    pub(crate) fn apply(&self, variable: &mut NumericVariable) -> SimResult<()> {
        let shape = IxDyn(variable.shape());
        match self {
            Control::Zero => variable.assign(ArrayD::zeros(shape)),
            Control::Uniform(value) => variable.assign(ArrayD::from_elem(shape, *value)),
            Control::Array(values) => {
                if values.shape() != variable.shape() {
                    return Err(SimError::InvalidControlShape {
                        name: variable.name().to_string(),
                        expected: variable.shape().to_vec(),
                        got: values.shape().to_vec(),
                    });
                }
                variable.assign(values.clone())
            }
            Control::Labelled(values) => {
                variable.assign(ArrayD::zeros(shape))?;
                for (key, value) in values {
                    variable.set(AddressingMode::Label, key, *value)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Dimension, IndexSet};
    use crate::variable::VariableKind;
    use ndarray::{array, Array2};
    use std::sync::Arc;

    fn abatement() -> NumericVariable {
        let time = Arc::new(IndexSet::new(Dimension::Time, [2020, 2030]).unwrap());
        let regions = Arc::new(IndexSet::new(Dimension::Region, ["USA", "EU"]).unwrap());
        NumericVariable::new("relative_abatement", VariableKind::Variable, vec![time, regions])
    }

    #[test]
    fn uniform_and_zero() {
        let mut variable = abatement();
        Control::Uniform(0.3).apply(&mut variable).unwrap();
        assert!(variable.values().iter().all(|v| *v == 0.3));
        Control::Zero.apply(&mut variable).unwrap();
        assert!(variable.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn array_shape_is_checked() {
        let mut variable = abatement();
        let err = Control::Array(Array2::zeros((3, 2)).into_dyn())
            .apply(&mut variable)
            .unwrap_err();
        assert_eq!(
            err,
            SimError::InvalidControlShape {
                name: "relative_abatement".to_string(),
                expected: vec![2, 2],
                got: vec![3, 2],
            }
        );
    }

    #[test]
    fn labelled_cells() {
        let mut variable = abatement();
        let values = BTreeMap::from([(vec![Label::from(2030), Label::from("EU")], 0.5)]);
        Control::Labelled(values).apply(&mut variable).unwrap();
        assert_eq!(
            variable.values(),
            &array![[0.0, 0.0], [0.0, 0.5]].into_dyn()
        );
    }
}
