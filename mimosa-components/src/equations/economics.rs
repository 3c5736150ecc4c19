//! Cobb-Douglas production, capital accumulation and the use of output
//!
//! $$ Y_r(t) = A_r(t) \cdot K_r(t)^{\alpha} \cdot L_r(t)^{1 - \alpha} $$
//! $$ K_r(t) = (1 - \delta)^{\Delta t} K_r(t - 1) + \Delta t \cdot I_r(t - 1) $$
//!
//! Net output subtracts climate damages and abatement costs. A fixed share of net
//! output is invested, the rest is consumed.

use crate::standard_variables::{
    SCALAR_DT, VAR_ABATEMENT_COSTS, VAR_CAPITAL_STOCK, VAR_CONSUMPTION, VAR_DAMAGE_FRACTION,
    VAR_GDP_GROSS, VAR_GDP_NET, VAR_INVESTMENTS, VAR_POPULATION, VAR_TFP,
};
use mimosa_core::equation::{Equation, EquationSet};
use mimosa_core::index::Dimension;
use mimosa_core::state::VariableDeclaration;
use mimosa_core::variable::FloatValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsParameters {
    /// Capital share of production
    pub alpha: FloatValue,
    /// Annual depreciation rate of capital
    pub depreciation: FloatValue,
    pub savings_rate: FloatValue,
    /// Initial capital stock per unit of productivity-weighted population
    pub initial_capital_factor: FloatValue,
}

impl Default for EconomicsParameters {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            depreciation: 0.05,
            savings_rate: 0.24,
            initial_capital_factor: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Economics {
    parameters: EconomicsParameters,
}

impl Economics {
    pub fn from_parameters(parameters: EconomicsParameters) -> Self {
        Self { parameters }
    }
}

impl EquationSet for Economics {
    fn declarations(&self) -> Vec<VariableDeclaration> {
        let regional = [Dimension::Time, Dimension::Region];
        vec![
            VAR_CAPITAL_STOCK.variable(&regional),
            VAR_GDP_GROSS.variable(&regional),
            VAR_GDP_NET.variable(&regional),
            VAR_INVESTMENTS.variable(&regional),
            VAR_CONSUMPTION.variable(&regional),
        ]
    }

    fn equations(&self) -> Vec<Equation> {
        let EconomicsParameters {
            alpha,
            depreciation,
            savings_rate,
            initial_capital_factor,
        } = self.parameters;

        vec![
            Equation::regional(VAR_CAPITAL_STOCK.name, move |s, t, r| {
                if t == 0 {
                    let population = s.regional(VAR_POPULATION.name, 0, r)?;
                    let tfp = s.regional(VAR_TFP.name, 0, r)?;
                    return Ok(population * tfp * initial_capital_factor);
                }
                let dt = s.scalar(SCALAR_DT)?;
                let previous = s.regional(VAR_CAPITAL_STOCK.name, t - 1, r)?;
                let investments = s.regional(VAR_INVESTMENTS.name, t - 1, r)?;
                Ok(previous * (1.0 - depreciation).powf(dt) + investments * dt)
            }),
            Equation::regional(VAR_GDP_GROSS.name, move |s, t, r| {
                let tfp = s.regional(VAR_TFP.name, t, r)?;
                let capital = s.regional(VAR_CAPITAL_STOCK.name, t, r)?;
                let population = s.regional(VAR_POPULATION.name, t, r)?;
                Ok(tfp * capital.powf(alpha) * population.powf(1.0 - alpha))
            }),
            Equation::regional(VAR_GDP_NET.name, |s, t, r| {
                let gross = s.regional(VAR_GDP_GROSS.name, t, r)?;
                let damages = s.regional(VAR_DAMAGE_FRACTION.name, t, r)?;
                // billion to trillion USD
                let costs = s.regional(VAR_ABATEMENT_COSTS.name, t, r)? / 1000.0;
                Ok(gross * (1.0 - damages) - costs)
            }),
            Equation::regional(VAR_INVESTMENTS.name, move |s, t, r| {
                Ok(s.regional(VAR_GDP_NET.name, t, r)? * savings_rate)
            }),
            Equation::regional(VAR_CONSUMPTION.name, |s, t, r| {
                let net = s.regional(VAR_GDP_NET.name, t, r)?;
                let investments = s.regional(VAR_INVESTMENTS.name, t, r)?;
                Ok(net - investments)
            }),
        ]
    }
}
