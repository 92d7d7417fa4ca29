use crate::config::{DegenerateHandling, EngineConfig};
use crate::error::{RankError, RankResult};
use crate::group::Group;
use crate::reference::ReferenceContext;
use crate::results::{ResultStore, Score};
use crate::series::Series;
use crate::xcorr;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Counters for one completed [`RankingEngine::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cohorts: usize,
    /// Cohorts that produced a best score.
    pub scored: usize,
    /// Best scores the result store kept after filtering.
    pub retained: usize,
    /// Candidates with zero variance.
    pub degenerate: usize,
    /// Most scoring tasks observed running at the same time.
    pub peak_in_flight: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct CohortOutcome {
    best: Option<Score>,
    degenerate: usize,
}

/// Gauge of scoring tasks currently on the blocking pool.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }

    fn take_peak(&self) -> usize {
        self.peak.swap(0, Ordering::SeqCst)
    }
}

struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Ranks a comparison group against one reference series.
///
/// The reference transform is computed once at construction and shared read-only
/// by every scoring task. Each run re-indexes the group by the requested keys,
/// scores every cohort on the blocking pool (bounded by the configured
/// concurrency), keeps the best member per cohort, and feeds those scores into
/// the shared [`ResultStore`].
#[derive(Debug)]
pub struct RankingEngine {
    reference: Arc<ReferenceContext>,
    comparison: Group,
    results: Arc<ResultStore>,
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
    in_flight: Arc<InFlight>,
}

impl RankingEngine {
    pub fn new(
        reference: &Series,
        comparison: Group,
        results: Arc<ResultStore>,
        config: EngineConfig,
    ) -> RankResult<Self> {
        for (uid, s) in comparison.iter() {
            if s.len() != reference.len() {
                return Err(RankError::LengthMismatch {
                    identity: uid.to_string(),
                    context: "the reference".to_string(),
                    expected: reference.len(),
                    actual: s.len(),
                });
            }
        }

        let reference = ReferenceContext::new(reference)?;
        let concurrency = config.concurrency();
        tracing::debug!(
            reference = %reference.labels().full_identity(),
            series_len = reference.series_len(),
            transform_len = reference.n(),
            concurrency,
            "ranking engine ready"
        );

        Ok(Self {
            reference: Arc::new(reference),
            comparison,
            results,
            config,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            in_flight: Arc::new(InFlight::default()),
        })
    }

    pub fn reference(&self) -> &ReferenceContext {
        &self.reference
    }

    pub fn comparison(&self) -> &Group {
        &self.comparison
    }

    pub fn results(&self) -> &Arc<ResultStore> {
        &self.results
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scores every cohort of the comparison group and records each cohort's best
    /// score in the result store.
    ///
    /// With no grouping keys every series forms its own cohort. Degenerate
    /// candidates never fail the run.
    pub async fn run<S: AsRef<str>>(&mut self, grouping_keys: &[S]) -> RankResult<RunSummary> {
        let started = Instant::now();
        let keys: Vec<&str> = grouping_keys.iter().map(AsRef::as_ref).collect();
        tracing::info!(
            phase = "start",
            group = %self.comparison.name(),
            member_count = self.comparison.len(),
            grouping_keys = ?keys,
            concurrency = self.config.concurrency(),
            "ranking run started"
        );

        let cohorts = self.comparison.index_by_keys(&keys);
        tracing::debug!(
            phase = "indexing",
            cohort_count = cohorts.len(),
            "cohort index rebuilt"
        );

        self.in_flight.take_peak();
        let mut pending = FuturesUnordered::new();
        for (slot, cohort) in cohorts.iter().enumerate() {
            let members = self.comparison.filter_by_label_values(cohort);
            let permit = self.semaphore.clone().acquire_owned().await?;
            let reference = self.reference.clone();
            let in_flight = self.in_flight.clone();
            let handling = self.config.degenerate_candidates;
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _running = in_flight.enter();
                score_members(&reference, &members, handling)
            });
            pending.push(async move { (slot, handle.await) });
        }
        tracing::debug!(
            phase = "dispatching",
            task_count = pending.len(),
            "cohort tasks dispatched"
        );

        // Outcomes go back into cohort order so the store sees the same update
        // sequence whatever order the tasks finish in.
        let mut outcomes: Vec<Option<CohortOutcome>> = cohorts.iter().map(|_| None).collect();
        while let Some((slot, joined)) = pending.next().await {
            match joined {
                Ok(outcome) => outcomes[slot] = Some(outcome),
                Err(err) => {
                    tracing::warn!(error = %err, "cohort scoring task failed");
                    return Err(err.into());
                }
            }
        }

        let mut summary = RunSummary {
            cohorts: cohorts.len(),
            peak_in_flight: self.in_flight.take_peak(),
            ..RunSummary::default()
        };
        for outcome in outcomes.into_iter().flatten() {
            summary.degenerate += outcome.degenerate;
            if let Some(score) = outcome.best {
                summary.scored += 1;
                if self.results.update(score) {
                    summary.retained += 1;
                }
            }
        }
        summary.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            phase = "done",
            cohort_count = summary.cohorts,
            scored_count = summary.scored,
            retained_count = summary.retained,
            degenerate_count = summary.degenerate,
            peak_in_flight = summary.peak_in_flight,
            duration_ms = summary.duration_ms,
            "ranking run complete"
        );
        Ok(summary)
    }

    /// Scores an ad-hoc batch of series as a single cohort.
    ///
    /// The best score (if any) is submitted to the result store and also returned,
    /// whether or not the store kept it.
    pub async fn score_cohort<I>(&self, candidates: I) -> RankResult<Option<Score>>
    where
        I: IntoIterator<Item = Series>,
    {
        let members: Vec<Arc<Series>> = candidates.into_iter().map(Arc::new).collect();
        for s in &members {
            if s.len() != self.reference.series_len() {
                return Err(RankError::LengthMismatch {
                    identity: s.identity(),
                    context: "the reference".to_string(),
                    expected: self.reference.series_len(),
                    actual: s.len(),
                });
            }
        }

        let permit = self.semaphore.clone().acquire_owned().await?;
        let reference = self.reference.clone();
        let in_flight = self.in_flight.clone();
        let handling = self.config.degenerate_candidates;
        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _running = in_flight.enter();
            score_members(&reference, &members, handling)
        })
        .await?;

        if let Some(score) = outcome.best.clone() {
            self.results.update(score);
        }
        Ok(outcome.best)
    }
}

fn score_members(
    reference: &ReferenceContext,
    members: &[Arc<Series>],
    handling: DegenerateHandling,
) -> CohortOutcome {
    let mut outcome = CohortOutcome::default();

    for s in members {
        let score = match xcorr::correlate_with_reference(reference, s.values()) {
            Ok(correlation) => Score::new(s.labels().clone(), correlation.lag, correlation.value),
            Err(RankError::DegenerateSeries) => {
                outcome.degenerate += 1;
                tracing::debug!(
                    series = %s.identity(),
                    handling = handling.as_str(),
                    "degenerate candidate"
                );
                match handling {
                    DegenerateHandling::Uncorrelated => Score::new(s.labels().clone(), 0, 0.0),
                    DegenerateHandling::Skip => continue,
                }
            }
            Err(err) => {
                tracing::warn!(series = %s.identity(), error = %err, "candidate not scored");
                continue;
            }
        };

        let better = outcome
            .best
            .as_ref()
            .map(|best| score.magnitude() > best.magnitude())
            .unwrap_or(true);
        if better {
            outcome.best = Some(score);
        }
    }

    outcome
}
