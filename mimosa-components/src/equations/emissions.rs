//! Regional and global CO2 emissions
//!
//! Regional emissions are the baseline reduced by the relative abatement. Global
//! emissions are summed over regions and accumulated over time.

use crate::standard_variables::{
    SCALAR_DT, VAR_BASELINE_EMISSIONS, VAR_CUMULATIVE_EMISSIONS, VAR_GLOBAL_EMISSIONS,
    VAR_REGIONAL_EMISSIONS, VAR_RELATIVE_ABATEMENT,
};
use mimosa_core::equation::{Equation, EquationSet};
use mimosa_core::index::Dimension;
use mimosa_core::state::VariableDeclaration;
use mimosa_core::variable::FloatValue;
use serde::{Deserialize, Serialize};

/// Parameters for the emissions equations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionsParameters {
    /// Cumulative emissions at the first timestep
    /// unit: GtCO2
    pub cumulative_emissions_initial: FloatValue,
}

impl Default for EmissionsParameters {
    fn default() -> Self {
        Self {
            cumulative_emissions_initial: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Emissions {
    parameters: EmissionsParameters,
}

impl Emissions {
    pub fn from_parameters(parameters: EmissionsParameters) -> Self {
        Self { parameters }
    }

    /// Trapezoidal accumulation over one timestep
    pub fn calculate_cumulative(
        previous: FloatValue,
        emissions_previous: FloatValue,
        emissions: FloatValue,
        dt: FloatValue,
    ) -> FloatValue {
        previous + dt * (emissions_previous + emissions) / 2.0
    }
}

impl EquationSet for Emissions {
    fn declarations(&self) -> Vec<VariableDeclaration> {
        vec![
            VAR_REGIONAL_EMISSIONS.variable(&[Dimension::Time, Dimension::Region]),
            VAR_GLOBAL_EMISSIONS.variable(&[Dimension::Time]),
            VAR_CUMULATIVE_EMISSIONS.variable(&[Dimension::Time]),
        ]
    }

    fn equations(&self) -> Vec<Equation> {
        let initial = self.parameters.cumulative_emissions_initial;
        vec![
            Equation::regional(VAR_REGIONAL_EMISSIONS.name, |s, t, r| {
                let baseline = s.regional(VAR_BASELINE_EMISSIONS.name, t, r)?;
                let abatement = s.regional(VAR_RELATIVE_ABATEMENT.name, t, r)?;
                Ok(baseline * (1.0 - abatement))
            }),
            Equation::global(VAR_GLOBAL_EMISSIONS.name, |s, t| {
                s.sum_regions(VAR_REGIONAL_EMISSIONS.name, t)
            }),
            Equation::global(VAR_CUMULATIVE_EMISSIONS.name, move |s, t| {
                if t == 0 {
                    return Ok(initial);
                }
                Ok(Self::calculate_cumulative(
                    s.global(VAR_CUMULATIVE_EMISSIONS.name, t - 1)?,
                    s.global(VAR_GLOBAL_EMISSIONS.name, t - 1)?,
                    s.global(VAR_GLOBAL_EMISSIONS.name, t)?,
                    s.scalar(SCALAR_DT)?,
                ))
            }),
        ]
    }
}
