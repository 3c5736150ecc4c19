use approx::assert_relative_eq;
use is_close::is_close;
use mimosa_core::config::{ExtractionConfig, SimulationConfig};
use mimosa_core::equation::{Equation, Regions};
use mimosa_core::errors::SimError;
use mimosa_core::index::{Dimension, Label};
use mimosa_core::simulator::Simulator;
use mimosa_core::state::{SimulationState, StateBuilder, StateValue};
use mimosa_core::variable::AddressingMode;
use ndarray::{array, Array2};

fn two_region_state() -> SimulationState {
    StateBuilder::new()
        .with_time_steps(4)
        .with_regions(["region1", "region2"])
        .with_variable("var1", &[Dimension::Time])
        .with_values("var1", array![0.0, 1.0, 2.0, 3.0].into_dyn())
        .with_variable("var2", &[Dimension::Time])
        .with_variable("var3", &[Dimension::Time, Dimension::Region])
        .build()
        .unwrap()
}

fn var2() -> Equation {
    Equation::global("var2", |s, t| Ok(s.global("var1", t)?.powi(2) + 1.0))
}

#[test]
fn test_end_to_end_two_regions() {
    let state = two_region_state();
    let equations = vec![
        Equation::regional("var3", |s, t, r| Ok(s.regional("var2", t, r)? + 5.0)),
        var2(),
    ];
    let simulator = Simulator::prepare(equations, &state, &ExtractionConfig::default()).unwrap();

    let mut state = simulator.fresh_state();
    simulator.simulate(&mut state).unwrap();

    let var2 = state.variable("var2").unwrap().to_series().unwrap();
    assert_eq!(var2, array![1.0, 2.0, 5.0, 10.0]);

    let view = state.labels();
    for t in 0..4usize {
        for region in ["region1", "region2"] {
            let var3 = view.get("var3", &[Label::from(t), Label::from(region)]).unwrap();
            assert!(is_close!(var3, var2[t] + 5.0));
            assert!(is_close!(var3, (t * t) as f64 + 6.0));
        }
    }
}

#[test]
fn test_vectorised_and_per_region_bodies_agree() {
    let state = StateBuilder::new()
        .with_time_steps(5)
        .with_regions(["USA", "EU", "CHN"])
        .with_variable("gdp", &[Dimension::Time, Dimension::Region])
        .with_values(
            "gdp",
            Array2::from_shape_fn((5, 3), |(t, r)| 10.0 + t as f64 * (r + 1) as f64).into_dyn(),
        )
        .with_parameter("share", &[Dimension::Region], array![0.1, 0.2, 0.3].into_dyn())
        .with_variable("output", &[Dimension::Time, Dimension::Region])
        .build()
        .unwrap();

    let vectorised = Equation::regional("output", |s, t, r| {
        Ok((s.regional("gdp", t, r)? * s.region_param("share", r)?).ln())
    });
    let per_region = Equation::regional("output", |s, t, r| {
        let gdp = s.regional("gdp", t, r)?.scalar()?;
        let share = s.region_param("share", r)?.scalar()?;
        Ok(StateValue::Scalar((gdp * share).ln()))
    });

    let mut results = vec![];
    for equation in [vectorised, per_region] {
        let simulator =
            Simulator::prepare(vec![equation], &state, &ExtractionConfig::default()).unwrap();
        let mut state = simulator.fresh_state();
        simulator.simulate(&mut state).unwrap();
        results.push(state.variable("output").unwrap().values().clone());
    }
    assert_eq!(results[0], results[1]);
}

#[test]
fn test_cycle_is_reported() {
    let state = StateBuilder::new()
        .with_time_steps(3)
        .with_variable("A", &[Dimension::Time])
        .with_variable("B", &[Dimension::Time])
        .build()
        .unwrap();
    let equations = vec![
        Equation::global("A", |s, t| s.global("B", t)),
        Equation::global("B", |s, t| s.global("A", t)),
    ];

    let err = Simulator::prepare(equations, &state, &ExtractionConfig::default())
        .err()
        .unwrap();
    let message = err.to_string();
    assert!(matches!(err, SimError::CircularDependency { .. }));
    assert!(message.contains('A') && message.contains('B'), "{}", message);
}

#[test]
fn test_previous_timestep_self_reference_sorts() {
    let state = StateBuilder::new()
        .with_time_steps(4)
        .with_variable("growth", &[Dimension::Time])
        .with_values("growth", array![0.1, 0.1, 0.2, 0.2].into_dyn())
        .with_variable("K", &[Dimension::Time])
        .build()
        .unwrap();
    let equations = vec![Equation::global("K", |s, t| {
        if t == 0 {
            return Ok(100.0);
        }
        Ok(s.global("K", t - 1)? * (1.0 + s.global("growth", t)?))
    })];

    let simulator = Simulator::prepare(equations, &state, &ExtractionConfig::default()).unwrap();
    let mut state = simulator.fresh_state();
    simulator.simulate(&mut state).unwrap();

    assert_relative_eq!(state.positions().global("K", 3).unwrap(), 100.0 * 1.1 * 1.2 * 1.2);
}

#[test]
fn test_label_and_position_addressing_agree() {
    let mut state = two_region_state();
    state
        .set(AddressingMode::Position, "var3", &[2.into(), 0.into()], 42.0)
        .unwrap();

    let by_label = state.labels().get("var3", &[2.into(), "region1".into()]).unwrap();
    let by_position = state.view(AddressingMode::Position).get("var3", &[2.into(), 0.into()]).unwrap();
    assert_eq!(by_label, 42.0);
    assert_eq!(by_label, by_position);
    assert_eq!(state.positions().at("var3", 2, 0).unwrap(), 42.0);
}

#[test]
fn test_rendered_expressions_order_equations() {
    let state = two_region_state();
    let equations = vec![
        Equation::regional("var3", |s, t, r| Ok(s.regional("var2", t, r)? + 5.0))
            .with_rendered_expression(|t, r| {
                format!("var3[{},{}] == var2[{}] + 5", t, r.map(|r| r.to_string()).unwrap_or_default(), t)
            }),
        var2().with_rendered_expression(|t, _| format!("var2[{t}] == var1[{t}]**2 + 1", t = t)),
    ];
    let simulator = Simulator::prepare(equations, &state, &ExtractionConfig::default()).unwrap();
    let names: Vec<_> = simulator.equations().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["var2", "var3"]);
}

#[test]
fn test_all_region_sampling_from_config() {
    let config = SimulationConfig::from_toml_str(
        r#"
        [extraction]
        region_sampling = "all"
        "#,
    )
    .unwrap();
    let state = two_region_state();
    let equations = vec![
        Equation::regional("var3", |s, t, r| match r {
            Regions::One(1) => s.regional("var1", t, r),
            _ => s.regional("var2", t, r),
        }),
        var2(),
    ];

    let err = Simulator::prepare(equations, &state, &config.extraction).err().unwrap();
    assert!(matches!(err, SimError::RegionDependentDependencies { .. }));
}
