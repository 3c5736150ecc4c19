//! Climate damages as a fraction of gross GDP
//!
//! $$ D_r(t) = c_r \cdot \max(T(t), 0)^{\gamma} $$
//!
//! with a regional coefficient $c_r$ and a common exponent $\gamma$.

use crate::standard_variables::{VAR_DAMAGE_COEFFICIENT, VAR_DAMAGE_FRACTION, VAR_TEMPERATURE};
use mimosa_core::equation::{Equation, EquationSet};
use mimosa_core::index::Dimension;
use mimosa_core::state::VariableDeclaration;
use mimosa_core::variable::FloatValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageParameters {
    pub exponent: FloatValue,
    /// Upper limit of the damage fraction
    pub max_fraction: FloatValue,
}

impl Default for DamageParameters {
    fn default() -> Self {
        Self {
            exponent: 2.0,
            max_fraction: 0.9,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Damages {
    parameters: DamageParameters,
}

impl Damages {
    pub fn from_parameters(parameters: DamageParameters) -> Self {
        Self { parameters }
    }
}

impl EquationSet for Damages {
    fn declarations(&self) -> Vec<VariableDeclaration> {
        vec![VAR_DAMAGE_FRACTION.variable(&[Dimension::Time, Dimension::Region])]
    }

    fn equations(&self) -> Vec<Equation> {
        let DamageParameters {
            exponent,
            max_fraction,
        } = self.parameters;
        vec![Equation::regional(VAR_DAMAGE_FRACTION.name, move |s, t, r| {
            let temperature = s.global(VAR_TEMPERATURE.name, t)?.max(0.0);
            let coefficient = s.region_param(VAR_DAMAGE_COEFFICIENT.name, r)?;
            Ok((coefficient * temperature.powf(exponent)).min(max_fraction))
        })]
    }
}
