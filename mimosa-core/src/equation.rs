//! Named units of computation producing one variable's values.
//!
//! An [`Equation`] is either global (indexed by time) or regional (indexed by time and
//! region). Its body is an opaque closure that reads from a [`StateView`] at array
//! positions; the simulator decides in which order bodies run.

use crate::errors::{SimError, SimResult};
use crate::index::Label;
use crate::state::{StateValue, StateView, VariableDeclaration};
use crate::variable::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Body of a time-indexed equation: `(state, t) -> value`
pub type GlobalFn = dyn Fn(&StateView<'_>, usize) -> SimResult<FloatValue>;

/// Body of a time × region equation: `(state, t, regions) -> value`
pub type RegionalFn = dyn Fn(&StateView<'_>, usize, Regions) -> SimResult<StateValue>;

/// Realised textual form of an equation: `(time label, region label) -> expression`
pub type RenderFn = dyn Fn(&Label, Option<&Label>) -> String;

/// The regions a regional equation body is evaluated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regions {
    /// Every region at once, producing a [`StateValue::Regional`]
    All,
    /// A single region by position, producing a [`StateValue::Scalar`]
    One(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquationKind {
    Global,
    Regional,
}

impl fmt::Display for EquationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquationKind::Global => write!(f, "global"),
            EquationKind::Regional => write!(f, "regional"),
        }
    }
}

#[derive(Clone)]
enum Body {
    Global(Arc<GlobalFn>),
    Regional(Arc<RegionalFn>),
}

/// Where the dependency sets of an equation come from
#[derive(Clone, Default)]
pub enum DependencySource {
    /// Probe the body against a state view that records every read
    #[default]
    Traced,
    /// Explicit lists of names read at the current and previous timestep
    Declared {
        current: Vec<String>,
        previous: Vec<String>,
    },
    /// Scan the realised expression text for `name[<time label>` references
    Rendered(Arc<RenderFn>),
}

impl fmt::Debug for DependencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencySource::Traced => write!(f, "Traced"),
            DependencySource::Declared { current, previous } => f
                .debug_struct("Declared")
                .field("current", current)
                .field("previous", previous)
                .finish(),
            DependencySource::Rendered(_) => write!(f, "Rendered(..)"),
        }
    }
}

/// A named computation rule producing the values of one variable
///
/// The name of an equation is the name of the variable it writes.
#[derive(Clone)]
pub struct Equation {
    name: String,
    body: Body,
    source: DependencySource,
    dependencies: BTreeSet<String>,
    prev_time_dependencies: BTreeSet<String>,
}

impl Equation {
    /// An equation indexed by time only
    pub fn global(
        name: impl Into<String>,
        body: impl Fn(&StateView<'_>, usize) -> SimResult<FloatValue> + 'static,
    ) -> Self {
        Self::with_body(name, Body::Global(Arc::new(body)))
    }

    /// An equation indexed by time and region
    ///
    /// The body is first called with [`Regions::All`]. If it returns
    /// [`SimError::NotVectorizable`] it is called again once per region.
    pub fn regional(
        name: impl Into<String>,
        body: impl Fn(&StateView<'_>, usize, Regions) -> SimResult<StateValue> + 'static,
    ) -> Self {
        Self::with_body(name, Body::Regional(Arc::new(body)))
    }

    fn with_body(name: impl Into<String>, body: Body) -> Self {
        Self {
            name: name.into(),
            body,
            source: DependencySource::Traced,
            dependencies: BTreeSet::new(),
            prev_time_dependencies: BTreeSet::new(),
        }
    }

    /// Use explicitly declared dependencies instead of tracing the body
    pub fn with_declared_dependencies<'a>(
        mut self,
        current: impl IntoIterator<Item = &'a str>,
        previous: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.source = DependencySource::Declared {
            current: current.into_iter().map(str::to_string).collect(),
            previous: previous.into_iter().map(str::to_string).collect(),
        };
        self
    }

    /// Discover dependencies from the realised expression text
    pub fn with_rendered_expression(
        mut self,
        render: impl Fn(&Label, Option<&Label>) -> String + 'static,
    ) -> Self {
        self.source = DependencySource::Rendered(Arc::new(render));
        self
    }

    pub(crate) fn with_dependencies(
        mut self,
        dependencies: BTreeSet<String>,
        prev_time_dependencies: BTreeSet<String>,
    ) -> Self {
        self.dependencies = dependencies;
        self.prev_time_dependencies = prev_time_dependencies;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EquationKind {
        match self.body {
            Body::Global(_) => EquationKind::Global,
            Body::Regional(_) => EquationKind::Regional,
        }
    }

    pub fn source(&self) -> &DependencySource {
        &self.source
    }

    /// Names read at the same timestep
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Names read at the previous timestep
    ///
    /// These never constrain the evaluation order.
    pub fn prev_time_dependencies(&self) -> &BTreeSet<String> {
        &self.prev_time_dependencies
    }

    /// Evaluate the body at timestep `t`
    ///
    /// `regions` is ignored for global equations.
    pub fn evaluate(
        &self,
        state: &StateView<'_>,
        t: usize,
        regions: Regions,
    ) -> SimResult<StateValue> {
        match &self.body {
            Body::Global(body) => body(state, t).map(StateValue::Scalar),
            Body::Regional(body) => body(state, t, regions),
        }
    }

    /// Evaluate the body for one region and return a single number
    pub fn evaluate_one(&self, state: &StateView<'_>, t: usize, region: usize) -> SimResult<FloatValue> {
        match self.evaluate(state, t, Regions::One(region))? {
            StateValue::Scalar(value) => Ok(value),
            StateValue::Regional(values) if values.len() == 1 => Ok(values[0]),
            StateValue::Regional(values) => Err(SimError::ShapeMismatch {
                variable: self.name.clone(),
                expected: vec![],
                got: vec![values.len()],
            }),
        }
    }
}

/// A group of related equations together with the variables they write
///
/// Implementations hold their own parameters and capture them in the equation bodies.
pub trait EquationSet {
    /// The output variables of [`EquationSet::equations`]
    fn declarations(&self) -> Vec<VariableDeclaration>;

    fn equations(&self) -> Vec<Equation>;
}

impl fmt::Debug for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equation")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("source", &self.source)
            .field("dependencies", &self.dependencies)
            .field("prev_time_dependencies", &self.prev_time_dependencies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Dimension;
    use crate::state::StateBuilder;
    use ndarray::array;

    #[test]
    fn global_and_regional_bodies() {
        let state = StateBuilder::new()
            .with_time_steps(2)
            .with_regions(["a", "b"])
            .with_variable("x", &[Dimension::Time])
            .with_values("x", array![1.0, 2.0].into_dyn())
            .build()
            .unwrap();
        let view = state.positions();

        let double = Equation::global("y", |s, t| Ok(2.0 * s.global("x", t)?));
        assert_eq!(double.kind(), EquationKind::Global);
        assert_eq!(double.evaluate(&view, 1, Regions::All), Ok(StateValue::Scalar(4.0)));

        let spread = Equation::regional("z", |s, t, regions| {
            let x = s.global("x", t)?;
            Ok(match regions {
                Regions::All => StateValue::Regional(array![x, x + 1.0]),
                Regions::One(r) => StateValue::Scalar(x + r as f64),
            })
        });
        assert_eq!(spread.kind(), EquationKind::Regional);
        assert_eq!(spread.evaluate_one(&view, 0, 1), Ok(2.0));
        assert_eq!(
            spread.evaluate(&view, 0, Regions::All),
            Ok(StateValue::Regional(array![1.0, 2.0]))
        );
    }

    #[test]
    fn declared_dependencies() {
        let equation = Equation::global("K", |_, _| Ok(0.0))
            .with_declared_dependencies(["I"], ["K"]);
        match equation.source() {
            DependencySource::Declared { current, previous } => {
                assert_eq!(current, &vec!["I".to_string()]);
                assert_eq!(previous, &vec!["K".to_string()]);
            }
            other => panic!("unexpected source {:?}", other),
        }
        // Populated by the extractor, not at construction
        assert!(equation.dependencies().is_empty());
    }
}
