use crate::equation::Regions;
use crate::errors::{SimError, SimResult};
use crate::index::{IndexSet, Label};
use crate::state::{SimulationState, StateValue};
use crate::variable::{AddressingMode, FloatValue, NumericVariable};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// The variable reads observed while an equation body was evaluated
///
/// Each read is recorded with the timestep position it targeted, or `None` for reads of
/// quantities without a time dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadLog {
    reads: BTreeSet<(String, Option<usize>)>,
}

impl ReadLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, name: &str, timestep: Option<usize>) {
        self.reads.insert((name.to_string(), timestep));
    }

    pub fn reads(&self) -> impl Iterator<Item = (&str, Option<usize>)> {
        self.reads.iter().map(|(name, t)| (name.as_str(), *t))
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

/// Read-only access to a [`SimulationState`] in one addressing mode
///
/// Several views with different modes can coexist over the same state. The typed
/// helpers (`global`, `at`, `regional`, ...) always take array positions, which is
/// what equation bodies are given. [`StateView::get`] interprets its key according
/// to the view's mode.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    state: &'a SimulationState,
    mode: AddressingMode,
    log: Option<&'a RefCell<ReadLog>>,
}

impl<'a> StateView<'a> {
    pub(crate) fn new(state: &'a SimulationState, mode: AddressingMode) -> Self {
        Self {
            state,
            mode,
            log: None,
        }
    }

    /// A view that records every variable read into `log`
    pub(crate) fn recording(
        state: &'a SimulationState,
        mode: AddressingMode,
        log: &'a RefCell<ReadLog>,
    ) -> Self {
        Self {
            state,
            mode,
            log: Some(log),
        }
    }

    fn record(&self, name: &str, timestep: Option<usize>) {
        if let Some(log) = self.log {
            log.borrow_mut().record(name, timestep);
        }
    }

    pub fn mode(&self) -> AddressingMode {
        self.mode
    }

    pub fn state(&self) -> &'a SimulationState {
        self.state
    }

    pub fn time(&self) -> &'a IndexSet {
        self.state.time()
    }

    pub fn regions(&self) -> &'a IndexSet {
        self.state.regions()
    }

    pub fn n_timesteps(&self) -> usize {
        self.state.n_timesteps()
    }

    pub fn n_regions(&self) -> usize {
        self.state.n_regions()
    }

    /// Direct access to a variable's array (not recorded)
    pub fn variable(&self, name: &str) -> SimResult<&'a NumericVariable> {
        self.state.variable(name)
    }

    /// Read one value, interpreting `key` in this view's addressing mode
    pub fn get(&self, name: &str, key: &[Label]) -> SimResult<FloatValue> {
        let variable = self.state.variable(name)?;
        let value = variable.get(self.mode, key)?;
        let timestep = if variable.is_time_indexed() {
            match self.mode {
                AddressingMode::Label => self.time().position(&key[0]),
                AddressingMode::Position => key[0].as_position(),
            }
        } else {
            None
        };
        self.record(name, timestep);
        Ok(value)
    }

    /// A zero-dimensional parameter
    pub fn scalar(&self, name: &str) -> SimResult<FloatValue> {
        let value = self.state.scalar(name)?;
        self.record(name, None);
        Ok(value)
    }

    /// A time-only variable at timestep `t`
    pub fn global(&self, name: &str, t: usize) -> SimResult<FloatValue> {
        let value = self.state.variable(name)?.at(&[t])?;
        self.record(name, Some(t));
        Ok(value)
    }

    /// A time × region variable at timestep `t` and region `r`
    pub fn at(&self, name: &str, t: usize, r: usize) -> SimResult<FloatValue> {
        let value = self.state.variable(name)?.at(&[t, r])?;
        self.record(name, Some(t));
        Ok(value)
    }

    /// A variable at timestep `t` for the selected regions
    ///
    /// Time-only variables are returned as a scalar whatever the selection, so that
    /// they broadcast against regional values.
    pub fn regional(&self, name: &str, t: usize, regions: Regions) -> SimResult<StateValue> {
        let variable = self.state.variable(name)?;
        let value = match (variable.shape().len(), regions) {
            (1, _) => StateValue::Scalar(variable.at(&[t])?),
            (_, Regions::All) => StateValue::Regional(variable.row(t)?.to_owned()),
            (_, Regions::One(r)) => StateValue::Scalar(variable.at(&[t, r])?),
        };
        self.record(name, Some(t));
        Ok(value)
    }

    /// A region-only parameter for the selected regions
    ///
    /// Zero-dimensional scalars are accepted too and returned as a scalar.
    pub fn region_param(&self, name: &str, regions: Regions) -> SimResult<StateValue> {
        if !self.state.has_variable(name) {
            return self.scalar(name).map(StateValue::Scalar);
        }
        let variable = self.state.variable(name)?;
        let value = match regions {
            Regions::All => StateValue::Regional(variable.series()?.to_owned()),
            Regions::One(r) => StateValue::Scalar(variable.at(&[r])?),
        };
        self.record(name, None);
        Ok(value)
    }

    /// Sum of a time × region variable over all regions at timestep `t`
    pub fn sum_regions(&self, name: &str, t: usize) -> SimResult<FloatValue> {
        let value = self.state.variable(name)?.row(t)?.sum();
        self.record(name, Some(t));
        Ok(value)
    }

    /// Timestep position of a time label
    pub fn time_position(&self, label: &Label) -> SimResult<usize> {
        self.time()
            .position(label)
            .ok_or_else(|| SimError::UnknownLabel {
                variable: "<state>".to_string(),
                dimension: "time".to_string(),
                label: label.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Dimension;
    use crate::state::StateBuilder;
    use ndarray::{array, Array2};

    fn state() -> SimulationState {
        StateBuilder::new()
            .with_time_steps(4)
            .with_regions(["region1", "region2"])
            .with_variable("var1", &[Dimension::Time])
            .with_variable("var2", &[Dimension::Time, Dimension::Region])
            .with_values(
                "var2",
                Array2::from_shape_fn((4, 2), |(t, r)| (100 * t + r + 1) as f64).into_dyn(),
            )
            .with_parameter(
                "weight",
                &[Dimension::Region],
                array![0.25, 0.75].into_dyn(),
            )
            .with_scalar("rho", 0.015)
            .build()
            .unwrap()
    }

    #[test]
    fn label_and_position_views_agree() {
        let state = state();
        let by_label = state.labels().get("var2", &[2.into(), "region1".into()]);
        let by_position = state.positions().get("var2", &[2.into(), 0.into()]);
        assert_eq!(by_label, Ok(201.0));
        assert_eq!(by_label, by_position);
    }

    #[test]
    fn position_view_rejects_text_labels() {
        let state = state();
        let err = state
            .positions()
            .get("var2", &[2.into(), "region1".into()])
            .unwrap_err();
        assert!(matches!(err, SimError::NotAPosition { .. }));
    }

    #[test]
    fn label_view_rejects_unknown_labels() {
        let state = state();
        let err = state
            .labels()
            .get("var2", &[2.into(), "region9".into()])
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownLabel { .. }));
    }

    #[test]
    fn regional_selection() {
        let state = state();
        let view = state.positions();
        assert_eq!(
            view.regional("var2", 1, Regions::All),
            Ok(StateValue::Regional(array![101.0, 102.0]))
        );
        assert_eq!(
            view.regional("var2", 1, Regions::One(1)),
            Ok(StateValue::Scalar(102.0))
        );
        assert_eq!(view.sum_regions("var2", 3), Ok(603.0));
        assert_eq!(
            view.region_param("weight", Regions::All),
            Ok(StateValue::Regional(array![0.25, 0.75]))
        );
        assert_eq!(
            view.region_param("rho", Regions::One(0)),
            Ok(StateValue::Scalar(0.015))
        );
    }

    #[test]
    fn recording_view_logs_reads() {
        let state = state();
        let log = RefCell::new(ReadLog::new());
        let view = StateView::recording(&state, AddressingMode::Position, &log);

        view.global("var1", 1).unwrap();
        view.at("var2", 0, 1).unwrap();
        view.scalar("rho").unwrap();

        let reads: Vec<_> = log
            .borrow()
            .reads()
            .map(|(n, t)| (n.to_string(), t))
            .collect();
        assert_eq!(
            reads,
            vec![
                ("rho".to_string(), None),
                ("var1".to_string(), Some(1)),
                ("var2".to_string(), Some(0)),
            ]
        );
    }
}
