//! A cheap initial guess for the nonlinear solver.
//!
//! The search uses one number per timestep for the control variable, broadcast to
//! every region, and maximises the final value of the objective variable by running
//! the simulator. It takes a single projected gradient step and accepts whatever it
//! reaches: the result only needs to be a good starting point.

use crate::config::WarmStartConfig;
use crate::errors::{SimError, SimResult};
use crate::simulator::{Control, Controls, Simulator};
use crate::state::SimulationState;
use crate::variable::FloatValue;
use ndarray::{Array1, Array2, Zip};
use tracing::{debug, info, warn};

/// Armijo sufficient decrease constant
const SUFFICIENT_DECREASE: FloatValue = 1e-4;

#[derive(Debug, Clone)]
pub struct WarmStartResult {
    /// Control value per timestep
    pub trajectory: Array1<FloatValue>,
    /// Final objective value (not negated)
    pub objective: FloatValue,
    /// Number of simulations run
    pub evaluations: usize,
    /// The state simulated at `trajectory`
    pub state: SimulationState,
}

/// A simulation at one candidate trajectory
struct Evaluation {
    /// Negated objective, infinite if the objective is not finite
    loss: FloatValue,
    state: SimulationState,
}

pub struct WarmStartSearch<'a> {
    simulator: &'a Simulator,
    config: WarmStartConfig,
    controls: Controls,
}

impl<'a> WarmStartSearch<'a> {
    pub fn new(simulator: &'a Simulator, config: WarmStartConfig) -> SimResult<Self> {
        config.validate()?;

        let available = simulator.control_variables();
        if !available.contains(&config.control_variable.as_str()) {
            return Err(SimError::UnknownControlVariable {
                name: config.control_variable.clone(),
                available: available.iter().map(|n| n.to_string()).collect(),
            });
        }
        let objective = simulator.template().variable(&config.objective_variable)?;
        if objective.shape().len() != 1 || !objective.is_time_indexed() {
            return Err(SimError::InvalidConfig(format!(
                "objective variable '{}' must be indexed by time only",
                config.objective_variable
            )));
        }

        Ok(Self {
            simulator,
            config,
            controls: Controls::new(),
        })
    }

    /// Values for the other control variables, held fixed during the search
    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = controls;
        self
    }

    fn n_timesteps(&self) -> usize {
        self.simulator.template().n_timesteps()
    }

    /// Lower and upper bound per timestep
    ///
    /// The upper bound grows linearly from `upper_bound_start` to
    /// `upper_bound_start + upper_bound_growth` over the horizon.
    pub fn bounds(&self) -> (Array1<FloatValue>, Array1<FloatValue>) {
        let n = self.n_timesteps();
        let lower = Array1::from_elem(n, self.config.lower_bound);
        let upper = Array1::from_shape_fn(n, |t| {
            let fraction = if n > 1 { t as FloatValue / (n - 1) as FloatValue } else { 0.0 };
            self.config.upper_bound_start + self.config.upper_bound_growth * fraction
        });
        (lower, upper)
    }

    /// `start_fraction * lower + (1 - start_fraction) * upper`
    pub fn start_point(&self) -> Array1<FloatValue> {
        let (lower, upper) = self.bounds();
        let p = self.config.start_fraction;
        lower * p + upper * (1.0 - p)
    }

    fn control_for(&self, trajectory: &Array1<FloatValue>) -> SimResult<Control> {
        let variable = self.simulator.template().variable(&self.config.control_variable)?;
        let values = match variable.shape() {
            [_] => trajectory.clone().into_dyn(),
            [n_t, n_r] => {
                Array2::from_shape_fn((*n_t, *n_r), |(t, _)| trajectory[t]).into_dyn()
            }
            shape => {
                return Err(SimError::InvalidControlShape {
                    name: self.config.control_variable.clone(),
                    expected: vec![self.n_timesteps()],
                    got: shape.to_vec(),
                })
            }
        };
        Ok(Control::Array(values))
    }

    fn evaluate(&self, trajectory: &Array1<FloatValue>, evaluations: &mut usize) -> SimResult<Evaluation> {
        let mut controls = self.controls.clone();
        controls.insert(self.config.control_variable.clone(), self.control_for(trajectory)?);

        let mut state = self.simulator.fresh_state();
        self.simulator.run(&mut state, &controls)?;
        *evaluations += 1;

        let objective = state
            .variable(&self.config.objective_variable)?
            .at(&[self.n_timesteps() - 1])?;
        let loss = if objective.is_finite() { -objective } else { FloatValue::INFINITY };
        Ok(Evaluation { loss, state })
    }

    /// Forward differences, or backward ones where a forward step would leave the box
    ///
    /// Components whose box is narrower than the step in both directions are zero.
    fn gradient(
        &self,
        x: &Array1<FloatValue>,
        loss: FloatValue,
        (lower, upper): (&Array1<FloatValue>, &Array1<FloatValue>),
        evaluations: &mut usize,
    ) -> SimResult<Array1<FloatValue>> {
        let h = self.config.gradient_step;
        let mut gradient = Array1::zeros(x.len());
        for i in 0..x.len() {
            let forward = if x[i] + h <= upper[i] {
                true
            } else if x[i] - h >= lower[i] {
                false
            } else {
                continue;
            };
            let mut shifted_point = x.clone();
            shifted_point[i] += if forward { h } else { -h };
            let shifted = self.evaluate(&shifted_point, evaluations)?.loss;
            gradient[i] = if forward { (shifted - loss) / h } else { (loss - shifted) / h };
        }
        Ok(gradient)
    }

    pub fn run(&self) -> SimResult<WarmStartResult> {
        let (lower, upper) = self.bounds();
        let mut evaluations = 0;
        let mut x = self.start_point();
        let mut current = self.evaluate(&x, &mut evaluations)?;

        for iteration in 0..self.config.max_iterations {
            let gradient = self.gradient(&x, current.loss, (&lower, &upper), &mut evaluations)?;
            let largest = gradient.iter().fold(0.0, |m: FloatValue, g| m.max(g.abs()));
            if !largest.is_finite() || largest == 0.0 {
                debug!(iteration, "gradient is zero or not finite, stopping");
                break;
            }

            // First trial step spans the widest box
            let width = (&upper - &lower).fold(0.0, |m: FloatValue, w| m.max(*w));
            let mut step = width / largest;
            let mut improved = None;
            for _ in 0..self.config.max_line_search_steps {
                let mut candidate = &x - &(&gradient * step);
                Zip::from(&mut candidate)
                    .and(&lower)
                    .and(&upper)
                    .for_each(|c, &l, &u| *c = c.clamp(l, u));

                let decrease = gradient.dot(&(&candidate - &x));
                let trial = self.evaluate(&candidate, &mut evaluations)?;
                if trial.loss <= current.loss + SUFFICIENT_DECREASE * decrease {
                    improved = Some((candidate, trial));
                    break;
                }
                step /= 2.0;
            }

            match improved {
                Some((candidate, trial)) => {
                    x = candidate;
                    current = trial;
                }
                None => {
                    warn!(iteration, "warm start line search did not improve the objective");
                    break;
                }
            }
        }

        let objective = -current.loss;
        info!(objective, evaluations, "warm start finished");
        Ok(WarmStartResult {
            trajectory: x,
            objective,
            evaluations,
            state: current.state,
        })
    }
}
