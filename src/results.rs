use crate::config::ResultStoreConfig;
use crate::labels::Labels;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of comparing one candidate against the reference.
///
/// `labels` are the candidate's full label set; an empty set marks "no valid
/// comparison" and is ignored by [`ResultStore::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub labels: Labels,
    pub lag: i64,
    pub similarity: f64,
}

impl Score {
    pub fn new(labels: Labels, lag: i64, similarity: f64) -> Self {
        Self {
            labels,
            lag,
            similarity,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.similarity.abs()
    }
}

/// Drained store contents, ascending by `|similarity|`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub scores: Vec<Score>,
    /// Mean of `|similarity|`; `None` when nothing was retained.
    pub mean_abs_similarity: Option<f64>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

// Heap key: magnitude, then signed value, then identity, so ordering is total.
#[derive(Debug)]
struct ByMagnitude(Score);

impl Ord for ByMagnitude {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .magnitude()
            .total_cmp(&other.0.magnitude())
            .then_with(|| self.0.similarity.total_cmp(&other.0.similarity))
            .then_with(|| {
                self.0
                    .labels
                    .full_identity()
                    .cmp(&other.0.labels.full_identity())
            })
    }
}

impl PartialOrd for ByMagnitude {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ByMagnitude {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ByMagnitude {}

/// Thread-safe top-N store of the highest-magnitude scores passing the lag and
/// threshold filters.
#[derive(Debug)]
pub struct ResultStore {
    config: ResultStoreConfig,
    scores: Mutex<BinaryHeap<Reverse<ByMagnitude>>>,
}

impl ResultStore {
    pub fn new(max_lag: usize, top_n: usize, threshold: f64) -> Self {
        Self::from_config(ResultStoreConfig {
            max_lag,
            top_n,
            threshold,
        })
    }

    pub fn from_config(config: ResultStoreConfig) -> Self {
        let config = config.normalized();
        Self {
            scores: Mutex::new(BinaryHeap::with_capacity(config.top_n)),
            config,
        }
    }

    pub fn config(&self) -> &ResultStoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BinaryHeap<Reverse<ByMagnitude>>> {
        self.scores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn passed(&self, score: &Score) -> bool {
        score.lag.unsigned_abs() <= self.config.max_lag as u64
            && score.magnitude() >= self.config.threshold
    }

    /// Records `score` if it passes the filters and beats the weakest retained score
    /// once the store is full. Returns whether it was retained.
    pub fn update(&self, score: Score) -> bool {
        if score.labels.is_empty() || !self.passed(&score) || self.config.top_n == 0 {
            return false;
        }

        let mut scores = self.lock();
        if scores.len() < self.config.top_n {
            scores.push(Reverse(ByMagnitude(score)));
            return true;
        }

        let beats_min = scores
            .peek()
            .map(|Reverse(min)| score.magnitude() > min.0.magnitude())
            .unwrap_or(true);
        if beats_min {
            scores.pop();
            scores.push(Reverse(ByMagnitude(score)));
        }
        beats_min
    }

    /// Drains the store, leaving it empty for the next run.
    pub fn fetch(&self) -> Ranking {
        let mut heap = std::mem::take(&mut *self.lock());

        let mut scores = Vec::with_capacity(heap.len());
        while let Some(Reverse(ByMagnitude(score))) = heap.pop() {
            scores.push(score);
        }

        let mean_abs_similarity = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(Score::magnitude).sum::<f64>() / scores.len() as f64)
        };

        Ranking {
            scores,
            mean_abs_similarity,
        }
    }
}
