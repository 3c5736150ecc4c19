//! Index sets for the time and region axes.
//!
//! Every axis of a [`NumericVariable`](crate::variable::NumericVariable) is described
//! by an [`IndexSet`]: an ordered list of labels (time indices, region codes) together
//! with the reverse mapping from label to array position.

use crate::errors::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// A dimension along which a variable can be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    /// The discrete time axis
    Time,
    /// The ordered set of geographic/economic regions
    Region,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Time => write!(f, "time"),
            Dimension::Region => write!(f, "region"),
        }
    }
}

/// A label of an index set element.
///
/// Time steps are usually labelled with integers while regions use text codes
/// such as `"USA"` or `"CAN"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl Label {
    /// Interpret the label as an array position.
    ///
    /// Only non-negative integer labels are valid positions.
    pub fn as_position(&self) -> Option<usize> {
        match self {
            Label::Int(i) => usize::try_from(*i).ok(),
            Label::Text(_) => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(i) => write!(f, "{}", i),
            Label::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Text(value)
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Int(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Label::Int(value as i64)
    }
}

impl From<usize> for Label {
    fn from(value: usize) -> Self {
        Label::Int(value as i64)
    }
}

/// An ordered index set with both label-based and position-based addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIndexSet")]
pub struct IndexSet {
    dimension: Dimension,
    labels: Vec<Label>,
    #[serde(skip_serializing)]
    positions: HashMap<Label, usize>,
}

#[derive(Deserialize)]
struct RawIndexSet {
    dimension: Dimension,
    labels: Vec<Label>,
}

impl TryFrom<RawIndexSet> for IndexSet {
    type Error = SimError;

    fn try_from(raw: RawIndexSet) -> SimResult<Self> {
        IndexSet::new(raw.dimension, raw.labels)
    }
}

impl IndexSet {
    /// Create a new index set
    ///
    /// Returns an error if any label occurs more than once.
    pub fn new<L: Into<Label>>(
        dimension: Dimension,
        labels: impl IntoIterator<Item = L>,
    ) -> SimResult<Self> {
        let labels: Vec<Label> = labels.into_iter().map(Into::into).collect();
        let mut positions = HashMap::with_capacity(labels.len());
        for (position, label) in labels.iter().enumerate() {
            if positions.insert(label.clone(), position).is_some() {
                return Err(SimError::DuplicateLabel {
                    dimension: dimension.to_string(),
                    label: label.to_string(),
                });
            }
        }
        Ok(Self {
            dimension,
            labels,
            positions,
        })
    }

    /// Create a time index labelled `0..n`
    pub fn time_steps(n: usize) -> Self {
        let labels: Vec<Label> = (0..n).map(Label::from).collect();
        let positions = labels
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect();
        Self {
            dimension: Dimension::Time,
            labels,
            positions,
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in index order
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Positions in index order (`0..len`)
    pub fn positions(&self) -> Range<usize> {
        0..self.labels.len()
    }

    pub fn label(&self, position: usize) -> Option<&Label> {
        self.labels.get(position)
    }

    pub fn position(&self, label: &Label) -> Option<usize> {
        self.positions.get(label).copied()
    }
}
