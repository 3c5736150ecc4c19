//! Utility of consumption and its discounted sum
//!
//! Per-capita consumption is valued with a constant elasticity of marginal utility
//! $\eta$. The net present value accumulates population-weighted utility, discounted
//! with the pure rate of time preference.

use crate::standard_variables::{
    SCALAR_DT, VAR_CONSUMPTION, VAR_NPV, VAR_POPULATION, VAR_UTILITY, VAR_WELFARE,
};
use mimosa_core::equation::{Equation, EquationSet};
use mimosa_core::index::Dimension;
use mimosa_core::state::VariableDeclaration;
use mimosa_core::variable::FloatValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelfareParameters {
    /// Elasticity of marginal utility of consumption
    pub elasmu: FloatValue,
    /// Pure rate of time preference
    /// unit: 1 / yr
    pub prtp: FloatValue,
}

impl Default for WelfareParameters {
    fn default() -> Self {
        Self {
            elasmu: 1.45,
            prtp: 0.015,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Welfare {
    parameters: WelfareParameters,
}

impl Welfare {
    pub fn from_parameters(parameters: WelfareParameters) -> Self {
        Self { parameters }
    }

    /// Utility of per-capita consumption (thousand USD per person)
    pub fn calculate_utility(&self, consumption_per_capita: FloatValue) -> FloatValue {
        let elasmu = self.parameters.elasmu;
        if elasmu == 1.0 {
            consumption_per_capita.ln()
        } else {
            (consumption_per_capita.powf(1.0 - elasmu) - 1.0) / (1.0 - elasmu)
        }
    }

    /// Discount factor `years` after the first timestep
    pub fn calculate_discount_factor(&self, years: FloatValue) -> FloatValue {
        (-self.parameters.prtp * years).exp()
    }
}

impl EquationSet for Welfare {
    fn declarations(&self) -> Vec<VariableDeclaration> {
        vec![
            VAR_UTILITY.variable(&[Dimension::Time, Dimension::Region]),
            VAR_WELFARE.variable(&[Dimension::Time]),
            VAR_NPV.variable(&[Dimension::Time]),
        ]
    }

    fn equations(&self) -> Vec<Equation> {
        let utility = self.clone();
        let discount = self.clone();
        vec![
            Equation::regional(VAR_UTILITY.name, move |s, t, r| {
                let population = s.regional(VAR_POPULATION.name, t, r)?;
                // trillion USD per million people to thousand USD per person
                let per_capita = s.regional(VAR_CONSUMPTION.name, t, r)? / population.clone() * 1e3;
                Ok(population * per_capita.map(|c| utility.calculate_utility(c)))
            }),
            Equation::global(VAR_WELFARE.name, |s, t| {
                s.sum_regions(VAR_UTILITY.name, t)
            }),
            Equation::global(VAR_NPV.name, move |s, t| {
                let dt = s.scalar(SCALAR_DT)?;
                let previous = if t == 0 { 0.0 } else { s.global(VAR_NPV.name, t - 1)? };
                let factor = discount.calculate_discount_factor(dt * t as FloatValue);
                Ok(previous + dt * factor * s.global(VAR_WELFARE.name, t)?)
            }),
        ]
    }
}
