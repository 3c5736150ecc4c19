use crate::equation::{Equation, EquationKind};
use crate::errors::{SimError, SimResult};
use crate::index::Dimension;
use crate::state::SimulationState;
use crate::variable::VariableKind;
use petgraph::algo::tarjan_scc;
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Graph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// Whether an edge constrains the evaluation order within a timestep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Read at the same timestep
    Hard,
    /// Read at the previous timestep
    Soft,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Hard => write!(f, "hard"),
            EdgeKind::Soft => write!(f, "soft"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    /// False for leaf inputs that must be populated before a run
    pub has_equation: bool,
    pub kind: Option<VariableKind>,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub type DGraph = Graph<GraphNode, EdgeKind>;

/// Directed graph of `dependency -> dependent` edges between variables
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DGraph,
    nodes: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph for equations whose dependencies have been extracted
    ///
    /// Every equation must write a distinct variable declared in `state` with the
    /// dimensions matching the equation kind.
    pub fn build(equations: &[Equation], state: &SimulationState) -> SimResult<Self> {
        let mut graph = Self {
            graph: Graph::new(),
            nodes: BTreeMap::new(),
        };

        for equation in equations {
            verify_output(equation, state)?;
            let node = graph.node(equation.name(), state);
            if graph.graph[node].has_equation {
                return Err(SimError::DuplicateEquation(equation.name().to_string()));
            }
            graph.graph[node].has_equation = true;
        }

        for equation in equations {
            let dependent = graph.node(equation.name(), state);
            for (names, kind) in [
                (equation.dependencies(), EdgeKind::Hard),
                (equation.prev_time_dependencies(), EdgeKind::Soft),
            ] {
                for name in names {
                    let dependency = graph.node(name, state);
                    graph.graph.add_edge(dependency, dependent, kind);
                }
            }
        }
        Ok(graph)
    }

    fn node(&mut self, name: &str, state: &SimulationState) -> NodeIndex {
        if let Some(index) = self.nodes.get(name) {
            return *index;
        }
        let index = self.graph.add_node(GraphNode {
            name: name.to_string(),
            has_equation: false,
            kind: state.kind_of(name),
        });
        self.nodes.insert(name.to_string(), index);
        index
    }

    pub fn graph(&self) -> &DGraph {
        &self.graph
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn has_equation(&self, name: &str) -> bool {
        self.nodes
            .get(name)
            .is_some_and(|index| self.graph[*index].has_equation)
    }

    /// Leaf variables without an equation, sorted by name
    pub fn inputs(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, index)| !self.graph[**index].has_equation)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Inputs which are model variables rather than parameters
    ///
    /// These are the quantities a run may set, such as the abatement rate.
    pub fn control_variables(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, index)| {
                let node = &self.graph[**index];
                !node.has_equation && node.kind == Some(VariableKind::Variable)
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn successors(&self, index: NodeIndex, kind: EdgeKind) -> BTreeSet<&str> {
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .filter(|e| *e.weight() == kind)
            .map(|e| self.graph[e.target()].name.as_str())
            .collect()
    }

    /// Every elementary cycle formed by same-timestep dependencies
    ///
    /// Each cycle starts at its lexicographically smallest member and follows the
    /// edges from dependency to dependent. The list is sorted.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let hard = self
            .graph
            .filter_map(|_, n| Some(n.name.as_str()), |_, e| (*e == EdgeKind::Hard).then_some(()));

        let mut cycles = vec![];
        for component in tarjan_scc(&hard) {
            let mut members: Vec<&str> = component.iter().map(|i| self.graph[*i].name.as_str()).collect();
            members.sort_unstable();

            let self_loop = members.len() == 1
                && self.successors(component[0], EdgeKind::Hard).contains(members[0]);
            if members.len() < 2 && !self_loop {
                continue;
            }

            for (i, start) in members.iter().enumerate() {
                let allowed: BTreeSet<&str> = members[i..].iter().copied().collect();
                let mut path = vec![*start];
                self.walk_cycles(start, &allowed, &mut path, &mut cycles);
            }
        }
        cycles.sort();
        cycles
    }

    fn walk_cycles<'a>(
        &'a self,
        start: &str,
        allowed: &BTreeSet<&str>,
        path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        let Some(current) = path.last().and_then(|name| self.nodes.get(*name)) else {
            return;
        };
        for next in self.successors(*current, EdgeKind::Hard) {
            if next == start {
                cycles.push(path.iter().map(|n| n.to_string()).collect());
            } else if allowed.contains(next) && !path.contains(&next) {
                path.push(next);
                self.walk_cycles(start, allowed, path, cycles);
                path.pop();
            }
        }
    }

    /// Fail with [`SimError::CircularDependency`] if any cycle exists
    pub fn check_acyclic(&self) -> SimResult<()> {
        let cycles = self.cycles();
        if cycles.is_empty() {
            Ok(())
        } else {
            Err(SimError::CircularDependency { cycles })
        }
    }

    /// Names of the equations in a valid evaluation order
    ///
    /// Kahn's algorithm over the same-timestep edges. Among the nodes that are ready,
    /// the lexicographically smallest name is taken first so the order is reproducible.
    pub fn topological_order(&self) -> SimResult<Vec<&str>> {
        self.check_acyclic()?;

        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|index| {
                let degree = self
                    .graph
                    .edges_directed(index, Direction::Incoming)
                    .filter(|e| *e.weight() == EdgeKind::Hard)
                    .count();
                (index, degree)
            })
            .collect();
        let mut ready: BTreeSet<&str> = self
            .nodes
            .iter()
            .filter(|(_, index)| in_degree[*index] == 0)
            .map(|(name, _)| name.as_str())
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(name) = ready.pop_first() {
            let index = self.nodes[name];
            for next in self.successors(index, EdgeKind::Hard) {
                let next_index = self.nodes[next];
                if let Some(degree) = in_degree.get_mut(&next_index) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(next);
                    }
                }
            }
            if self.graph[index].has_equation {
                order.push(name);
            }
        }
        Ok(order)
    }

    /// Reorder `equations` into evaluation order
    ///
    /// `equations` must be the set this graph was built from.
    pub fn sort(&self, equations: Vec<Equation>) -> SimResult<Vec<Equation>> {
        let order = self.topological_order()?;
        let mut by_name: HashMap<String, Equation> = equations
            .into_iter()
            .map(|e| (e.name().to_string(), e))
            .collect();

        let sorted = order
            .iter()
            .map(|name| {
                by_name
                    .remove(*name)
                    .ok_or_else(|| SimError::Error(format!("no equation named '{}'", name)))
            })
            .collect::<SimResult<Vec<_>>>()?;
        debug!(order = ?order, "sorted equations");
        Ok(sorted)
    }

    /// Graphviz representation; equations are boxes and soft edges are dashed
    pub fn as_dot(&self) -> Dot<'_, &DGraph> {
        Dot::with_attr_getters(
            &self.graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, er| match er.weight() {
                EdgeKind::Hard => String::new(),
                EdgeKind::Soft => "style = dashed".to_string(),
            },
            &|_, (_, node)| {
                let shape = if node.has_equation { "box" } else { "ellipse" };
                format!("label = {:?} shape = {}", node.name, shape)
            },
        )
    }
}

/// The output variable must exist with the dimensions implied by the equation kind
fn verify_output(equation: &Equation, state: &SimulationState) -> SimResult<()> {
    let variable = state
        .variable(equation.name())
        .map_err(|_| SimError::MissingOutputVariable(equation.name().to_string()))?;
    let expected: &[Dimension] = match equation.kind() {
        EquationKind::Global => &[Dimension::Time],
        EquationKind::Regional => &[Dimension::Time, Dimension::Region],
    };
    if variable.dims() != expected {
        return Err(SimError::EquationShapeMismatch {
            equation: equation.name().to_string(),
            kind: equation.kind().to_string(),
            dims: format!("{:?}", variable.dims()),
        });
    }
    Ok(())
}
