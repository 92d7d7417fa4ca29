use crate::error::{RankError, RankResult};
use crate::labels::{Labels, DEFAULT_LABEL};

/// An immutable value sequence identified by its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    y: Vec<f64>,
    labels: Labels,
}

impl Series {
    pub fn new(values: Vec<f64>, labels: Labels) -> RankResult<Self> {
        if labels.is_empty() {
            return Err(RankError::invalid_input(
                "must provide a label set for the series",
            ));
        }
        Ok(Self { y: values, labels })
    }

    /// Series labelled only by `uid=<uid>`, for callers with no natural labels.
    pub fn with_uid(values: Vec<f64>, uid: impl Into<String>) -> RankResult<Self> {
        let uid = uid.into();
        if uid.trim().is_empty() {
            return Err(RankError::invalid_input("default uid label must not be empty"));
        }
        Self::new(values, Labels::from_pairs([(DEFAULT_LABEL, uid)]))
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.y
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn label_value(&self, key: &str) -> Option<&str> {
        self.labels.get(key)
    }

    /// Unique identifier within a group: the identity over all label keys.
    pub fn identity(&self) -> String {
        self.labels.full_identity()
    }
}
