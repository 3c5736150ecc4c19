//! Names and units of the variables shared between equation modules.
//!
//! Inputs are supplied by [`crate::model::ModelData`], outputs are written by the
//! equation modules in [`crate::equations`].

use mimosa_core::index::Dimension;
use mimosa_core::state::VariableDeclaration;

/// A named model quantity with its unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardVariable {
    pub name: &'static str,
    pub unit: &'static str,
}

impl StandardVariable {
    /// Declaration of this quantity as a model variable
    pub fn variable(&self, dims: &[Dimension]) -> VariableDeclaration {
        VariableDeclaration::variable(self.name, dims).with_unit(self.unit)
    }
}

macro_rules! standard_variable {
    ($ident:ident, $name:expr, $unit:expr) => {
        pub const $ident: StandardVariable = StandardVariable {
            name: $name,
            unit: $unit,
        };
    };
}

// Inputs
standard_variable!(VAR_POPULATION, "population", "million people");
standard_variable!(VAR_TFP, "total_factor_productivity", "-");
standard_variable!(VAR_BASELINE_EMISSIONS, "baseline_emissions", "GtCO2 / yr");
standard_variable!(VAR_DAMAGE_COEFFICIENT, "damage_coefficient", "1 / K^2");
standard_variable!(VAR_MAC_COEFFICIENT, "mac_coefficient", "USD / tCO2");
standard_variable!(VAR_RELATIVE_ABATEMENT, "relative_abatement", "-");

/// Length of a timestep, a zero-dimensional parameter
pub const SCALAR_DT: &str = "dt";

// Emissions and temperature
standard_variable!(VAR_REGIONAL_EMISSIONS, "regional_emissions", "GtCO2 / yr");
standard_variable!(VAR_GLOBAL_EMISSIONS, "global_emissions", "GtCO2 / yr");
standard_variable!(VAR_CUMULATIVE_EMISSIONS, "cumulative_emissions", "GtCO2");
standard_variable!(VAR_TEMPERATURE, "temperature", "K");

// Impacts
standard_variable!(VAR_DAMAGE_FRACTION, "damage_fraction", "-");
standard_variable!(VAR_ABATEMENT_COSTS, "abatement_costs", "billion USD / yr");

// Economics
standard_variable!(VAR_CAPITAL_STOCK, "capital_stock", "trillion USD");
standard_variable!(VAR_GDP_GROSS, "GDP_gross", "trillion USD / yr");
standard_variable!(VAR_GDP_NET, "GDP_net", "trillion USD / yr");
standard_variable!(VAR_INVESTMENTS, "investments", "trillion USD / yr");
standard_variable!(VAR_CONSUMPTION, "consumption", "trillion USD / yr");

// Welfare
standard_variable!(VAR_UTILITY, "utility", "-");
standard_variable!(VAR_WELFARE, "welfare", "-");
standard_variable!(VAR_NPV, "NPV", "-");
