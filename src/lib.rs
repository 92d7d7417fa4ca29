//! Rank labeled time series by normalized cross-correlation against a reference.
//!
//! Build a [`Group`] of candidate [`Series`], hand it to a [`RankingEngine`] together
//! with the reference series and a shared [`ResultStore`], then call
//! [`RankingEngine::run`] with the label keys to group by. [`ResultStore::fetch`]
//! drains the top matches in ascending similarity order.

pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod labels;
pub mod reference;
pub mod results;
pub mod series;
pub mod stats;
pub mod xcorr;

#[cfg(test)]
pub mod test_support;

pub use config::{DegenerateHandling, EngineConfig, ResultStoreConfig};
pub use engine::{RankingEngine, RunSummary};
pub use error::{ErrorKind, RankError, RankResult};
pub use group::Group;
pub use labels::{Labels, DEFAULT_LABEL};
pub use reference::ReferenceContext;
pub use results::{Ranking, ResultStore, Score};
pub use series::Series;
