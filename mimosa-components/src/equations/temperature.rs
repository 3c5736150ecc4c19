//! Global temperature from cumulative emissions
//!
//! Uses the transient climate response to cumulative emissions (TCRE):
//! $$ T(t) = T_0 + TCRE \cdot \frac{E_{cum}(t)}{1000} $$

use crate::standard_variables::{VAR_CUMULATIVE_EMISSIONS, VAR_TEMPERATURE};
use mimosa_core::equation::{Equation, EquationSet};
use mimosa_core::index::Dimension;
use mimosa_core::state::VariableDeclaration;
use mimosa_core::variable::FloatValue;
use serde::{Deserialize, Serialize};

/// Parameters for the TCRE temperature equation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureParameters {
    /// Temperature above pre-industrial at the first timestep
    /// unit: K
    pub temperature_initial: FloatValue,
    /// Warming per 1000 GtCO2 of cumulative emissions
    /// unit: K / (1000 GtCO2)
    pub tcre: FloatValue,
}

impl Default for TemperatureParameters {
    fn default() -> Self {
        Self {
            temperature_initial: 1.2,
            tcre: 0.62,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Temperature {
    parameters: TemperatureParameters,
}

impl Temperature {
    pub fn from_parameters(parameters: TemperatureParameters) -> Self {
        Self { parameters }
    }

    pub fn calculate_temperature(&self, cumulative_emissions: FloatValue) -> FloatValue {
        self.parameters.temperature_initial + self.parameters.tcre * cumulative_emissions / 1000.0
    }
}

impl EquationSet for Temperature {
    fn declarations(&self) -> Vec<VariableDeclaration> {
        vec![VAR_TEMPERATURE.variable(&[Dimension::Time])]
    }

    fn equations(&self) -> Vec<Equation> {
        let temperature = self.clone();
        vec![Equation::global(VAR_TEMPERATURE.name, move |s, t| {
            Ok(temperature.calculate_temperature(s.global(VAR_CUMULATIVE_EMISSIONS.name, t)?))
        })]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn test_initial_temperature_without_emissions() {
        let temperature = Temperature::from_parameters(TemperatureParameters::default());
        assert_eq!(temperature.calculate_temperature(0.0), 1.2);
    }

    #[test]
    fn test_tcre_scaling() {
        let temperature = Temperature::from_parameters(TemperatureParameters {
            temperature_initial: 0.0,
            tcre: 0.5,
        });
        assert!(is_close!(temperature.calculate_temperature(2000.0), 1.0));
    }
}
