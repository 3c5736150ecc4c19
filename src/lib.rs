//! Dependency-ordered simulation of climate-economy model equations.
//!
//! This crate bundles the evaluator ([`mimosa_core`]) with the standard equation
//! modules ([`mimosa_components`]).

pub use mimosa_components as components;
pub use mimosa_core::{
    config, dependencies, equation, errors, index, simulator, state, variable, warm_start,
};
pub use ndarray;
