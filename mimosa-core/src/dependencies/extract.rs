use crate::config::{ExtractionConfig, RegionSampling};
use crate::equation::{DependencySource, Equation, EquationKind, Regions};
use crate::errors::{SimError, SimResult};
use crate::index::Label;
use crate::state::{ReadLog, SimulationState, StateView};
use crate::variable::{AddressingMode, VariableKind};
use regex::Regex;
use std::cell::RefCell;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Same-timestep and previous-timestep names read by one sample of an equation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Sample {
    current: BTreeSet<String>,
    previous: BTreeSet<String>,
}

/// Discovers which variables each equation reads
///
/// Equations are sampled at a fixed representative timestep (never the initial one)
/// and, for regional equations, at a representative region.
pub struct DependencyExtractor<'a> {
    state: &'a SimulationState,
    timestep: usize,
    region: usize,
    sampling: RegionSampling,
    reference: Regex,
}

impl<'a> DependencyExtractor<'a> {
    pub fn new(state: &'a SimulationState, config: &ExtractionConfig) -> SimResult<Self> {
        config.validate()?;
        let region = match &config.representative_region {
            Some(label) => state.regions().position(label).ok_or_else(|| {
                SimError::InvalidConfig(format!(
                    "representative region '{}' is not a region of the state",
                    label
                ))
            })?,
            None => 0,
        };
        let reference = Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\[\s*['"]?([^,\]'"\s]+)['"]?\s*[,\]]"#)
            .map_err(|e| SimError::Error(e.to_string()))?;

        Ok(Self {
            state,
            timestep: config.timestep,
            region,
            sampling: config.region_sampling,
            reference,
        })
    }

    /// Populate the dependency sets of every equation
    pub fn extract_all(&self, equations: Vec<Equation>) -> SimResult<Vec<Equation>> {
        equations.into_iter().map(|e| self.extract(e)).collect()
    }

    /// Populate the dependency sets of one equation
    pub fn extract(&self, equation: Equation) -> SimResult<Equation> {
        let sample = self.sample(&equation, self.region)?;

        let sample_all_regions = self.sampling == RegionSampling::All
            && equation.kind() == EquationKind::Regional
            && !matches!(equation.source(), DependencySource::Declared { .. });
        if sample_all_regions {
            for region in self.state.regions().positions() {
                if region == self.region {
                    continue;
                }
                if self.sample(&equation, region)? != sample {
                    return Err(SimError::RegionDependentDependencies {
                        equation: equation.name().to_string(),
                        representative: self.region_label(self.region),
                        region: self.region_label(region),
                    });
                }
            }
        }

        debug!(
            equation = equation.name(),
            current = ?sample.current,
            previous = ?sample.previous,
            "extracted dependencies"
        );
        Ok(equation.with_dependencies(sample.current, sample.previous))
    }

    fn region_label(&self, region: usize) -> String {
        self.state
            .regions()
            .label(region)
            .map(|l| l.to_string())
            .unwrap_or_else(|| region.to_string())
    }

    fn sample(&self, equation: &Equation, region: usize) -> SimResult<Sample> {
        let (current, previous) = match equation.source() {
            DependencySource::Traced => {
                self.check_timestep()?;
                self.traced(equation, region)
            }
            DependencySource::Declared { current, previous } => {
                (current.iter().cloned().collect(), previous.iter().cloned().collect())
            }
            DependencySource::Rendered(render) => {
                self.check_timestep()?;
                let time = self.time_label(self.timestep)?;
                let region_label = match equation.kind() {
                    EquationKind::Global => None,
                    EquationKind::Regional => self.state.regions().label(region),
                };
                self.rendered(equation, &render(time, region_label))?
            }
        };
        Ok(self.classify(equation, current, previous))
    }

    /// Traced and rendered equations are sampled at the extraction timestep, which
    /// the state must contain. Declared dependencies need no sampling.
    fn check_timestep(&self) -> SimResult<()> {
        if self.timestep >= self.state.n_timesteps() {
            return Err(SimError::InvalidConfig(format!(
                "extraction.timestep {} is outside of the {} timesteps of the state",
                self.timestep,
                self.state.n_timesteps()
            )));
        }
        Ok(())
    }

    fn time_label(&self, position: usize) -> SimResult<&'a Label> {
        self.state
            .time()
            .label(position)
            .ok_or_else(|| SimError::Error(format!("no time label at position {}", position)))
    }

    /// Run the body once against a recording view
    fn traced(&self, equation: &Equation, region: usize) -> (BTreeSet<String>, BTreeSet<String>) {
        let log = RefCell::new(ReadLog::new());
        let view = StateView::recording(self.state, AddressingMode::Position, &log);
        if let Err(e) = equation.evaluate(&view, self.timestep, Regions::One(region)) {
            debug!(
                equation = equation.name(),
                error = %e,
                "tracing failed, using the reads observed before the failure"
            );
        }

        let mut current = BTreeSet::new();
        let mut previous = BTreeSet::new();
        for (name, timestep) in log.borrow().reads() {
            match timestep {
                Some(t) if t == self.timestep => {
                    current.insert(name.to_string());
                }
                Some(t) if t < self.timestep => {
                    previous.insert(name.to_string());
                }
                Some(_) => {}
                None => {
                    current.insert(name.to_string());
                }
            }
        }
        (current, previous)
    }

    /// Scan a realised expression for `name[<label>` references
    ///
    /// Only the right-hand side of `lhs == rhs` is inspected.
    fn rendered(
        &self,
        equation: &Equation,
        expression: &str,
    ) -> SimResult<(BTreeSet<String>, BTreeSet<String>)> {
        let rhs = expression
            .split_once("==")
            .map(|(_, rhs)| rhs)
            .unwrap_or(expression);
        let current_label = self.time_label(self.timestep)?.to_string();
        let previous_label = self.time_label(self.timestep - 1)?.to_string();

        let mut current = BTreeSet::new();
        let mut previous = BTreeSet::new();
        for captures in self.reference.captures_iter(rhs) {
            let name = &captures[1];
            let label = &captures[2];
            if label == current_label {
                current.insert(name.to_string());
            } else if label == previous_label {
                previous.insert(name.to_string());
            }
        }

        if current.is_empty() && previous.is_empty() && rhs.contains('[') {
            warn!(
                equation = equation.name(),
                expression = rhs.trim(),
                "no dependencies found in expression, assuming the equation is independent"
            );
        }
        Ok((current, previous))
    }

    /// Drop parameters and unknown names, and remove names read at both timesteps
    /// from the previous-timestep set
    fn classify(
        &self,
        equation: &Equation,
        current: BTreeSet<String>,
        previous: BTreeSet<String>,
    ) -> Sample {
        let keep = |name: &String| match self.state.kind_of(name) {
            Some(VariableKind::Variable) => true,
            Some(VariableKind::Parameter) => false,
            None => {
                debug!(
                    equation = equation.name(),
                    name = name.as_str(),
                    "ignoring reference to a name that is not part of the state"
                );
                false
            }
        };
        let current: BTreeSet<String> = current.into_iter().filter(keep).collect();
        let previous = previous
            .into_iter()
            .filter(keep)
            .filter(|name| !current.contains(name))
            .collect();
        Sample { current, previous }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Dimension;
    use crate::state::{StateBuilder, StateValue};
    use ndarray::array;

    fn state() -> SimulationState {
        StateBuilder::new()
            .with_time_labels([2020, 2025, 2030])
            .with_regions(["USA", "EU", "CHN"])
            .with_variable("E", &[Dimension::Time])
            .with_variable("T", &[Dimension::Time])
            .with_variable("GDP", &[Dimension::Time, Dimension::Region])
            .with_variable("Y", &[Dimension::Time, Dimension::Region])
            .with_variable("Y10", &[Dimension::Time, Dimension::Region])
            .with_parameter("tfp", &[Dimension::Region], array![1.0, 2.0, 3.0].into_dyn())
            .with_scalar("tcre", 0.6)
            .build()
            .unwrap()
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn traced_reads_are_classified_by_timestep() {
        let state = state();
        let extractor = DependencyExtractor::new(&state, &ExtractionConfig::default()).unwrap();

        let temperature = Equation::global("T", |s, t| {
            if t == 0 {
                return Ok(1.1);
            }
            Ok(s.global("T", t - 1)? + s.scalar("tcre")? * s.global("E", t)?)
        });
        let temperature = extractor.extract(temperature).unwrap();

        assert_eq!(names(temperature.dependencies()), vec!["E"]);
        assert_eq!(names(temperature.prev_time_dependencies()), vec!["T"]);
    }

    #[test]
    fn reads_at_both_timesteps_are_hard() {
        let state = state();
        let extractor = DependencyExtractor::new(&state, &ExtractionConfig::default()).unwrap();

        let growth = Equation::regional("Y", |s, t, r| {
            let now = s.regional("GDP", t, r)?;
            let before = s.regional("GDP", t - 1, r)?;
            Ok(now / before * s.region_param("tfp", r)?)
        });
        let growth = extractor.extract(growth).unwrap();

        assert_eq!(names(growth.dependencies()), vec!["GDP"]);
        assert!(growth.prev_time_dependencies().is_empty());
    }

    #[test]
    fn declared_dependencies_are_filtered() {
        let state = state();
        let extractor = DependencyExtractor::new(&state, &ExtractionConfig::default()).unwrap();

        let equation = Equation::global("T", |_, _| Ok(0.0))
            .with_declared_dependencies(["E", "tcre", "not_a_variable"], ["T", "E"]);
        let equation = extractor.extract(equation).unwrap();

        assert_eq!(names(equation.dependencies()), vec!["E"]);
        assert_eq!(names(equation.prev_time_dependencies()), vec!["T"]);
    }

    #[test]
    fn rendered_expressions_use_the_right_hand_side() {
        let state = state();
        let extractor = DependencyExtractor::new(&state, &ExtractionConfig::default()).unwrap();

        let equation = Equation::regional("Y", |_, _, _| Ok(StateValue::Scalar(0.0)))
            .with_rendered_expression(|t, r| {
                let r = r.map(|r| r.to_string()).unwrap_or_default();
                format!(
                    "Y[{t},{r}] == GDP[{t},{r}] * tfp[{r}] + Y10[2020,{r}] + E[{t}]",
                    t = t,
                    r = r
                )
            });
        let equation = extractor.extract(equation).unwrap();

        assert_eq!(names(equation.dependencies()), vec!["E", "GDP"]);
        assert_eq!(names(equation.prev_time_dependencies()), vec!["Y10"]);
    }

    #[test]
    fn rendered_labels_must_match_exactly() {
        let state = StateBuilder::new()
            .with_time_steps(12)
            .with_variable("a", &[Dimension::Time])
            .with_variable("b", &[Dimension::Time])
            .build()
            .unwrap();
        let extractor = DependencyExtractor::new(&state, &ExtractionConfig::default()).unwrap();

        let equation = Equation::global("a", |_, _| Ok(0.0))
            .with_rendered_expression(|_, _| "a[1] == b[10] + b[11]".to_string());
        let equation = extractor.extract(equation).unwrap();

        assert!(equation.dependencies().is_empty());
        assert!(equation.prev_time_dependencies().is_empty());
    }

    #[test]
    fn region_dependent_structure_is_detected() {
        let state = state();
        let config = ExtractionConfig {
            region_sampling: RegionSampling::All,
            ..Default::default()
        };
        let extractor = DependencyExtractor::new(&state, &config).unwrap();

        let equation = Equation::regional("Y", |s, t, r| match r {
            Regions::One(2) => s.regional("Y10", t, r),
            _ => s.regional("GDP", t, r),
        });
        let err = extractor.extract(equation).unwrap_err();
        assert_eq!(
            err,
            SimError::RegionDependentDependencies {
                equation: "Y".to_string(),
                representative: "USA".to_string(),
                region: "CHN".to_string(),
            }
        );
    }

    #[test]
    fn representative_region_must_exist() {
        let state = state();
        let config = ExtractionConfig {
            representative_region: Some(Label::from("MARS")),
            ..Default::default()
        };
        assert!(matches!(
            DependencyExtractor::new(&state, &config),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn single_timestep_states_need_declared_dependencies() {
        let state = StateBuilder::new()
            .with_time_labels([2020])
            .with_regions(["USA"])
            .with_variable("E", &[Dimension::Time])
            .with_variable("T", &[Dimension::Time])
            .build()
            .unwrap();
        let extractor = DependencyExtractor::new(&state, &ExtractionConfig::default()).unwrap();

        let declared = Equation::global("T", |s, t| Ok(0.5 * s.global("E", t)?))
            .with_declared_dependencies(["E"], Vec::<&str>::new());
        let declared = extractor.extract(declared).unwrap();
        assert_eq!(names(declared.dependencies()), vec!["E"]);

        let traced = Equation::global("T", |s, t| Ok(0.5 * s.global("E", t)?));
        assert!(matches!(
            extractor.extract(traced),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
