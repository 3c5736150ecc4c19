//! Time-stepped evaluation of a sorted equation set.
//!
//! A [`Simulator`] is prepared once per equation set: dependencies are extracted,
//! the graph is checked for cycles and the equations are sorted. Each run then gets
//! its own [`SimulationState`], copied from the template the simulator was prepared
//! with, and fills it timestep by timestep.

mod controls;
mod scenario;

pub use controls::{Control, Controls};
pub use scenario::{DataCache, Scenario};

use crate::config::ExtractionConfig;
use crate::dependencies::{DependencyExtractor, DependencyGraph};
use crate::equation::{Equation, EquationKind, Regions};
use crate::errors::{SimError, SimResult};
use crate::state::{SimulationState, StateValue, SymbolicModel};
use crate::variable::VariableKind;
use ndarray::Array1;
use std::time::Instant;
use tracing::{debug, info};

/// Evaluates equations in dependency order over every timestep
#[derive(Debug)]
pub struct Simulator {
    equations: Vec<Equation>,
    graph: DependencyGraph,
    template: SimulationState,
}

impl Simulator {
    /// Extract dependencies, check for cycles and sort the equations
    ///
    /// `template` is the state every run starts from. It must declare the output
    /// variable of every equation and hold the values of all inputs. Equations whose
    /// dependencies are traced or rendered need a template with more timesteps than
    /// `extraction.timestep`.
    pub fn prepare(
        equations: Vec<Equation>,
        template: &SimulationState,
        config: &ExtractionConfig,
    ) -> SimResult<Self> {
        let extractor = DependencyExtractor::new(template, config)?;
        let equations = extractor.extract_all(equations)?;
        let graph = DependencyGraph::build(&equations, template)?;
        let equations = graph.sort(equations)?;

        info!(
            equations = equations.len(),
            inputs = graph.inputs().len(),
            controls = ?graph.control_variables(),
            "prepared simulator"
        );
        Ok(Self {
            equations,
            graph,
            template: template.clone(),
        })
    }

    /// Equations in evaluation order
    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn template(&self) -> &SimulationState {
        &self.template
    }

    /// Variables without an equation that a run may set
    pub fn control_variables(&self) -> Vec<&str> {
        self.graph.control_variables()
    }

    /// A clean copy of the template state
    pub fn fresh_state(&self) -> SimulationState {
        self.template.clone()
    }

    /// Fill in every equation output of `state`, timestep by timestep
    pub fn simulate(&self, state: &mut SimulationState) -> SimResult<()> {
        self.simulate_skipping(state, |_| false)
    }

    /// Run a what-if scenario on `state`
    pub fn simulate_scenario(&self, state: &mut SimulationState, scenario: &Scenario) -> SimResult<()> {
        for (name, values) in scenario.fixed() {
            state.variable_mut(name)?.assign(values.clone())?;
        }
        debug!(scenario = scenario.name(), "running scenario");
        self.simulate_skipping(state, |name| scenario.skips(name))
    }

    fn simulate_skipping(
        &self,
        state: &mut SimulationState,
        skip: impl Fn(&str) -> bool,
    ) -> SimResult<()> {
        let start = Instant::now();
        for t in state.time().positions() {
            for equation in self.equations.iter().filter(|e| !skip(e.name())) {
                let value = evaluate(equation, state, t)?;
                state.variable_mut(equation.name())?.set_row(t, &value)?;
            }
        }
        debug!(
            timesteps = state.n_timesteps(),
            equations = self.equations.len(),
            elapsed = ?start.elapsed(),
            "simulation finished"
        );
        Ok(())
    }

    /// Write control values into `state`
    ///
    /// Control variables without an entry in `controls` are set to zero.
    pub fn set_controls(&self, state: &mut SimulationState, controls: &Controls) -> SimResult<()> {
        let available = self.control_variables();
        if let Some(name) = controls.keys().find(|n| !available.contains(&n.as_str())) {
            return Err(SimError::UnknownControlVariable {
                name: name.clone(),
                available: available.iter().map(|n| n.to_string()).collect(),
            });
        }

        for name in available {
            let control = controls.get(name).unwrap_or(&Control::Zero);
            control.apply(state.variable_mut(name)?)?;
        }
        Ok(())
    }

    /// Set the controls, then simulate
    pub fn run(&self, state: &mut SimulationState, controls: &Controls) -> SimResult<()> {
        self.set_controls(state, controls)?;
        self.simulate(state)
    }

    /// Run a fresh state with every control at zero
    pub fn run_nopolicy_baseline(&self) -> SimResult<SimulationState> {
        let mut state = self.fresh_state();
        self.run(&mut state, &Controls::new())?;
        info!("finished no-policy baseline");
        Ok(state)
    }

    /// Run a scenario on a fresh state
    pub fn run_scenario(&self, scenario: &Scenario, controls: &Controls) -> SimResult<SimulationState> {
        let mut state = self.fresh_state();
        self.set_controls(&mut state, controls)?;
        self.simulate_scenario(&mut state, scenario)?;
        Ok(state)
    }
}

/// Evaluate one equation at timestep `t`
///
/// Regional equations are first evaluated for all regions at once. If the body
/// reports that it cannot be vectorised, it is evaluated once per region instead.
fn evaluate(equation: &Equation, state: &SimulationState, t: usize) -> SimResult<StateValue> {
    let view = state.positions();
    match equation.kind() {
        EquationKind::Global => equation.evaluate(&view, t, Regions::All),
        EquationKind::Regional => match equation.evaluate(&view, t, Regions::All) {
            Err(e) if e.is_not_vectorizable() => {
                let values = state
                    .regions()
                    .positions()
                    .map(|r| equation.evaluate_one(&view, t, r))
                    .collect::<SimResult<Vec<_>>>()?;
                Ok(StateValue::Regional(Array1::from(values)))
            }
            result => result,
        },
    }
}

/// Copy simulated values into the symbolic model as initial values
///
/// Every time-indexed variable that is not a parameter is written by label. Values
/// that are not finite are skipped. Returns the number of values written.
pub fn initialize_model<M: SymbolicModel + ?Sized>(
    model: &mut M,
    state: &SimulationState,
) -> SimResult<usize> {
    let mut written = 0;
    for variable in state
        .variables()
        .filter(|v| v.kind() == VariableKind::Variable && v.is_time_indexed())
    {
        for (key, value) in variable.labelled_values() {
            if value.is_finite() {
                model.set_initial_value(variable.name(), &key, value)?;
                written += 1;
            }
        }
    }
    info!(values = written, "initialised symbolic model from simulation");
    Ok(written)
}
