//! Numeric evaluation of a climate-economy model's equations.
//!
//! The equations of the symbolic model are treated as a dataflow graph: their
//! dependencies are extracted, ordered, and then evaluated timestep by timestep over
//! dense arrays, without running the nonlinear solver.
//!
//! ```rust
//! use mimosa_core::config::ExtractionConfig;
//! use mimosa_core::equation::Equation;
//! use mimosa_core::index::Dimension;
//! use mimosa_core::simulator::Simulator;
//! use mimosa_core::state::StateBuilder;
//! use ndarray::array;
//!
//! let state = StateBuilder::new()
//!     .with_time_steps(3)
//!     .with_variable("E", &[Dimension::Time])
//!     .with_values("E", array![10.0, 12.0, 14.0].into_dyn())
//!     .with_variable("cumulative_E", &[Dimension::Time])
//!     .build()
//!     .unwrap();
//!
//! let equations = vec![Equation::global("cumulative_E", |s, t| {
//!     let previous = if t == 0 { 0.0 } else { s.global("cumulative_E", t - 1)? };
//!     Ok(previous + s.global("E", t)?)
//! })];
//!
//! let simulator = Simulator::prepare(equations, &state, &ExtractionConfig::default()).unwrap();
//! let mut state = simulator.fresh_state();
//! simulator.simulate(&mut state).unwrap();
//! assert_eq!(state.positions().global("cumulative_E", 2), Ok(36.0));
//! ```

pub mod config;
pub mod dependencies;
pub mod equation;
pub mod example_equations;
pub mod index;
pub mod simulator;
pub mod state;
pub mod variable;
pub mod warm_start;

pub mod errors;
