//! Equation modules of the climate-economy model.
//!
//! Each module holds its parameters, declares the variables it writes and provides
//! the equations as an [`EquationSet`](mimosa_core::equation::EquationSet).

pub mod damages;
pub mod economics;
pub mod emissions;
pub mod mitigation;
pub mod temperature;
pub mod welfare;

pub use damages::{DamageParameters, Damages};
pub use economics::{Economics, EconomicsParameters};
pub use emissions::{Emissions, EmissionsParameters};
pub use mitigation::{Mitigation, MitigationParameters};
pub use temperature::{Temperature, TemperatureParameters};
pub use welfare::{Welfare, WelfareParameters};
