//! Costs of abating emissions
//!
//! The marginal abatement cost curve of each region is $MAC_r(a) = m_r a^{\beta}$.
//! Total costs are the area under the curve up to the abatement level, applied to
//! the baseline emissions:
//! $$ C_r(t) = m_r \cdot E^{base}_r(t) \cdot \frac{a^{\beta + 1}}{\beta + 1} $$

use crate::standard_variables::{
    VAR_ABATEMENT_COSTS, VAR_BASELINE_EMISSIONS, VAR_MAC_COEFFICIENT, VAR_RELATIVE_ABATEMENT,
};
use mimosa_core::equation::{Equation, EquationSet, Regions};
use mimosa_core::index::Dimension;
use mimosa_core::state::{StateValue, VariableDeclaration};
use mimosa_core::variable::FloatValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MitigationParameters {
    /// Exponent of the marginal abatement cost curve
    pub mac_exponent: FloatValue,
}

impl Default for MitigationParameters {
    fn default() -> Self {
        Self { mac_exponent: 2.0 }
    }
}

#[derive(Debug, Clone)]
pub struct Mitigation {
    parameters: MitigationParameters,
}

impl Mitigation {
    pub fn from_parameters(parameters: MitigationParameters) -> Self {
        Self { parameters }
    }

    /// Abatement costs in billion USD per year for one region
    ///
    /// The cost curve is only defined for positive abatement; negative abatement
    /// (emissions above baseline) is free.
    pub fn calculate_costs(
        &self,
        abatement: FloatValue,
        baseline_emissions: FloatValue,
        mac_coefficient: FloatValue,
    ) -> FloatValue {
        if abatement <= 0.0 {
            return 0.0;
        }
        let exponent = self.parameters.mac_exponent + 1.0;
        mac_coefficient * baseline_emissions * abatement.powf(exponent) / exponent
    }
}

impl EquationSet for Mitigation {
    fn declarations(&self) -> Vec<VariableDeclaration> {
        vec![VAR_ABATEMENT_COSTS.variable(&[Dimension::Time, Dimension::Region])]
    }

    fn equations(&self) -> Vec<Equation> {
        let mitigation = self.clone();
        // Branches on the abatement level, so it is evaluated one region at a time
        vec![Equation::regional(VAR_ABATEMENT_COSTS.name, move |s, t, r: Regions| {
            let abatement = s.regional(VAR_RELATIVE_ABATEMENT.name, t, r)?.scalar()?;
            let baseline = s.regional(VAR_BASELINE_EMISSIONS.name, t, r)?.scalar()?;
            let coefficient = s.region_param(VAR_MAC_COEFFICIENT.name, r)?.scalar()?;
            Ok(StateValue::Scalar(mitigation.calculate_costs(
                abatement,
                baseline,
                coefficient,
            )))
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn test_no_costs_without_abatement() {
        let mitigation = Mitigation::from_parameters(MitigationParameters::default());
        assert_eq!(mitigation.calculate_costs(0.0, 40.0, 500.0), 0.0);
        assert_eq!(mitigation.calculate_costs(-0.1, 40.0, 500.0), 0.0);
    }

    #[test]
    fn test_area_under_cost_curve() {
        let mitigation = Mitigation::from_parameters(MitigationParameters::default());
        // 500 * 10 * 0.5^3 / 3
        assert!(is_close!(
            mitigation.calculate_costs(0.5, 10.0, 500.0),
            500.0 * 10.0 * 0.125 / 3.0
        ));
    }
}
