use crate::errors::{SimError, SimResult};
use crate::variable::FloatValue;
use ndarray::Array1;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Represents a value that is either a scalar or resolved per region
///
/// `StateValue` is what regional equations return. When an equation is evaluated for
/// all regions at once, values read from time × region variables are
/// [`StateValue::Regional`] and arithmetic is applied element-wise, with scalars
/// broadcast across regions.
///
/// # Examples
///
/// ```rust
/// use mimosa_core::state::StateValue;
/// use ndarray::array;
///
/// let gdp = StateValue::Regional(array![10.0, 20.0]);
/// let damages = gdp * 0.1 + 1.0;
/// assert_eq!(damages, StateValue::Regional(array![2.0, 3.0]));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StateValue {
    /// A single value (a global quantity, or one region)
    Scalar(FloatValue),
    /// One value per region, in region order
    Regional(Array1<FloatValue>),
}

impl StateValue {
    /// Get the value as a scalar for use in scalar-only logic
    ///
    /// Fails with [`SimError::NotVectorizable`] for regional values. Equation bodies use
    /// this to signal that they branch on a scalar condition and must be evaluated
    /// one region at a time.
    pub fn scalar(&self) -> SimResult<FloatValue> {
        match self {
            StateValue::Scalar(v) => Ok(*v),
            StateValue::Regional(_) => Err(SimError::NotVectorizable),
        }
    }

    /// Get the scalar value if this is a Scalar variant
    pub fn as_scalar(&self) -> Option<FloatValue> {
        match self {
            StateValue::Scalar(v) => Some(*v),
            StateValue::Regional(_) => None,
        }
    }

    /// Get the regional values if this is a Regional variant
    pub fn as_regional(&self) -> Option<&Array1<FloatValue>> {
        match self {
            StateValue::Scalar(_) => None,
            StateValue::Regional(values) => Some(values),
        }
    }

    /// Convert to a scalar value, averaging regional values
    pub fn to_scalar(&self) -> FloatValue {
        match self {
            StateValue::Scalar(v) => *v,
            StateValue::Regional(_) => self.mean(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, StateValue::Scalar(_))
    }

    pub fn is_regional(&self) -> bool {
        matches!(self, StateValue::Regional(_))
    }

    /// Apply `f` to every value
    pub fn map(self, f: impl Fn(FloatValue) -> FloatValue) -> Self {
        match self {
            StateValue::Scalar(v) => StateValue::Scalar(f(v)),
            StateValue::Regional(values) => StateValue::Regional(values.mapv(f)),
        }
    }

    pub fn powi(self, n: i32) -> Self {
        self.map(|v| v.powi(n))
    }

    pub fn powf(self, n: FloatValue) -> Self {
        self.map(|v| v.powf(n))
    }

    pub fn exp(self) -> Self {
        self.map(FloatValue::exp)
    }

    pub fn ln(self) -> Self {
        self.map(FloatValue::ln)
    }

    /// Element-wise maximum with a constant
    pub fn max(self, other: FloatValue) -> Self {
        self.map(|v| v.max(other))
    }

    /// Element-wise minimum with a constant
    pub fn min(self, other: FloatValue) -> Self {
        self.map(|v| v.min(other))
    }

    /// Sum over regions (the value itself for scalars)
    pub fn sum(&self) -> FloatValue {
        match self {
            StateValue::Scalar(v) => *v,
            StateValue::Regional(values) => values.sum(),
        }
    }

    /// Mean over regions (the value itself for scalars)
    pub fn mean(&self) -> FloatValue {
        match self {
            StateValue::Scalar(v) => *v,
            StateValue::Regional(values) => values.mean().unwrap_or(FloatValue::NAN),
        }
    }
}

impl From<FloatValue> for StateValue {
    fn from(value: FloatValue) -> Self {
        StateValue::Scalar(value)
    }
}

impl From<Array1<FloatValue>> for StateValue {
    fn from(values: Array1<FloatValue>) -> Self {
        StateValue::Regional(values)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<StateValue> for StateValue {
            type Output = StateValue;

            /// # Panics
            ///
            /// Panics if both operands are regional with a different number of regions
            fn $method(self, rhs: StateValue) -> StateValue {
                match (self, rhs) {
                    (StateValue::Scalar(a), StateValue::Scalar(b)) => StateValue::Scalar(a $op b),
                    (StateValue::Scalar(a), StateValue::Regional(b)) => {
                        StateValue::Regional(b.mapv(|b| a $op b))
                    }
                    (StateValue::Regional(a), StateValue::Scalar(b)) => {
                        StateValue::Regional(a.mapv(|a| a $op b))
                    }
                    (StateValue::Regional(a), StateValue::Regional(b)) => {
                        StateValue::Regional(a $op b)
                    }
                }
            }
        }

        impl $trait<FloatValue> for StateValue {
            type Output = StateValue;

            fn $method(self, rhs: FloatValue) -> StateValue {
                self $op StateValue::Scalar(rhs)
            }
        }

        impl $trait<StateValue> for FloatValue {
            type Output = StateValue;

            fn $method(self, rhs: StateValue) -> StateValue {
                StateValue::Scalar(self) $op rhs
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);

impl Neg for StateValue {
    type Output = StateValue;

    fn neg(self) -> StateValue {
        self.map(|v| -v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scalars_broadcast_over_regions() {
        let regional = StateValue::Regional(array![1.0, 2.0, 3.0]);
        assert_eq!(
            2.0 * regional.clone() + 1.0,
            StateValue::Regional(array![3.0, 5.0, 7.0])
        );
        assert_eq!(
            StateValue::Scalar(10.0) - regional,
            StateValue::Regional(array![9.0, 8.0, 7.0])
        );
    }

    #[test]
    fn regional_values_combine_element_wise() {
        let a = StateValue::Regional(array![1.0, 2.0]);
        let b = StateValue::Regional(array![4.0, 8.0]);
        assert_eq!(b / a, StateValue::Regional(array![4.0, 4.0]));
    }

    #[test]
    fn scalar_only_logic_rejects_regional_values() {
        assert_eq!(StateValue::Scalar(3.0).scalar(), Ok(3.0));
        let err = StateValue::Regional(array![1.0]).scalar().unwrap_err();
        assert!(err.is_not_vectorizable());
    }

    #[test]
    fn reductions() {
        let v = StateValue::Regional(array![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v.sum(), 10.0);
        assert_eq!(v.to_scalar(), 2.5);
        assert_eq!(StateValue::Scalar(2.0).sum(), 2.0);
    }

    #[test]
    fn element_wise_functions() {
        let v = StateValue::Regional(array![-1.0, 2.0]);
        assert_eq!(v.clone().max(0.0), StateValue::Regional(array![0.0, 2.0]));
        assert_eq!(v.clone().powi(2), StateValue::Regional(array![1.0, 4.0]));
        assert_eq!(-v, StateValue::Regional(array![1.0, -2.0]));
    }
}
