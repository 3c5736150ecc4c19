//! Small equation sets used in tests and documentation.

use crate::equation::{Equation, Regions};
use crate::errors::{SimError, SimResult};
use crate::index::Dimension;
use crate::state::{SimulationState, StateBuilder};
use ndarray::array;

/// Four timesteps and two regions with `var1 = [0, 1, 2, 3]`
pub fn example_state() -> SimResult<SimulationState> {
    StateBuilder::new()
        .with_time_steps(4)
        .with_regions(["region1", "region2"])
        .with_variable("var1", &[Dimension::Time])
        .with_values("var1", array![0.0, 1.0, 2.0, 3.0].into_dyn())
        .with_variable("var2", &[Dimension::Time])
        .with_variable("var3", &[Dimension::Time, Dimension::Region])
        .build()
}

/// `var2[t] = var1[t]^2 + 1` and `var3[t, r] = var2[t] + 5`, listed out of order
pub fn example_equations() -> Vec<Equation> {
    vec![
        Equation::regional("var3", |s, t, regions| {
            Ok(s.regional("var2", t, regions)? + 5.0)
        }),
        Equation::global("var2", |s, t| Ok(s.global("var1", t)?.powi(2) + 1.0)),
    ]
}

/// Same as [`example_equations`], but `var3` can only be evaluated region by region
pub fn scalar_only_equations() -> Vec<Equation> {
    vec![
        Equation::regional("var3", |s, t, regions| match regions {
            Regions::All => Err(SimError::NotVectorizable),
            Regions::One(_) => Ok(s.regional("var2", t, regions)? + 5.0),
        }),
        Equation::global("var2", |s, t| Ok(s.global("var1", t)?.powi(2) + 1.0)),
    ]
}

/// `A[t] = B[t] + 1` and `B[t] = A[t] * 2`
pub fn cyclic_equations() -> SimResult<(SimulationState, Vec<Equation>)> {
    let state = StateBuilder::new()
        .with_time_steps(3)
        .with_variable("A", &[Dimension::Time])
        .with_variable("B", &[Dimension::Time])
        .build()?;
    let equations = vec![
        Equation::global("A", |s, t| Ok(s.global("B", t)? + 1.0)),
        Equation::global("B", |s, t| Ok(s.global("A", t)? * 2.0)),
    ];
    Ok((state, equations))
}
