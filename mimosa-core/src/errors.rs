use thiserror::Error;

/// Render a list of cycles as one `A -> B -> A` chain per line.
fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut chain = cycle.clone();
            if let Some(first) = cycle.first() {
                chain.push(first.clone());
            }
            chain.join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Error type for invalid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("{0}")]
    Error(String),
    #[error("Circular dependencies found:\n\n{}", format_cycles(.cycles))]
    CircularDependency { cycles: Vec<Vec<String>> },
    #[error("No variable named '{0}' exists in the simulation state")]
    UnknownVariable(String),
    #[error("Label '{label}' is not part of the {dimension} index of variable '{variable}'")]
    UnknownLabel {
        variable: String,
        dimension: String,
        label: String,
    },
    #[error("Position {position} is out of range for the {dimension} index of variable '{variable}' (length {length})")]
    PositionOutOfRange {
        variable: String,
        dimension: String,
        position: usize,
        length: usize,
    },
    #[error("Label '{label}' cannot be used as a position for variable '{variable}'")]
    NotAPosition { variable: String, label: String },
    #[error("Variable '{variable}' has {expected} dimension(s) but was indexed with {got}")]
    DimensionMismatch {
        variable: String,
        expected: usize,
        got: usize,
    },
    #[error("Shape mismatch for variable '{variable}': expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        variable: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Duplicate label '{label}' in the {dimension} index")]
    DuplicateLabel { dimension: String, label: String },
    #[error("A value for all regions cannot be reduced to a scalar")]
    NotVectorizable,
    #[error("Equation '{0}' writes to a variable that is not declared in the simulation state")]
    MissingOutputVariable(String),
    #[error("More than one equation writes to '{0}'")]
    DuplicateEquation(String),
    #[error("Equation '{equation}' is {kind} but its output variable has dimensions {dims}")]
    EquationShapeMismatch {
        equation: String,
        kind: String,
        dims: String,
    },
    #[error("Variable '{name}' is not a control variable. Available control variables: {available:?}")]
    UnknownControlVariable {
        name: String,
        available: Vec<String>,
    },
    #[error("Control '{name}' must have shape {expected:?}, but has shape {got:?}")]
    InvalidControlShape {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Dependencies of equation '{equation}' differ between region '{representative}' and region '{region}'")]
    RegionDependentDependencies {
        equation: String,
        representative: String,
        region: String,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SimError {
    /// Returns true for the recoverable vectorised-evaluation mismatch.
    pub fn is_not_vectorizable(&self) -> bool {
        matches!(self, SimError::NotVectorizable)
    }
}

/// Convenience type for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_are_rendered_as_closed_chains() {
        let err = SimError::CircularDependency {
            cycles: vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["C".to_string()],
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Circular dependencies found:"));
        assert!(msg.contains("A -> B -> A"));
        assert!(msg.contains("C -> C"));
    }
}
