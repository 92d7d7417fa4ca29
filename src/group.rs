use crate::error::{RankError, RankResult};
use crate::labels::Labels;
use crate::series::Series;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A named collection of equal-length series, unique by label identity.
///
/// Besides the registry, a group carries a cohort index built by
/// [`Group::index_by_keys`]. The index is per-run state: every call discards the
/// previous one, and [`Group::filter_by_label_values`] only reads it.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    n: usize,
    registry: BTreeMap<String, Arc<Series>>,
    index: HashMap<String, Vec<String>>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            n: 0,
            registry: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of member series.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Shared sequence length, fixed by the first member added (0 while empty).
    pub fn series_len(&self) -> usize {
        self.n
    }

    pub fn get(&self, identity: &str) -> Option<&Arc<Series>> {
        self.registry.get(identity)
    }

    /// Members ordered by identity.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Series>)> {
        self.registry.iter().map(|(uid, s)| (uid.as_str(), s))
    }

    /// Registers each series in order. Members added before a failure stay registered.
    pub fn add<I>(&mut self, series: I) -> RankResult<()>
    where
        I: IntoIterator<Item = Series>,
    {
        for s in series {
            if s.labels().is_empty() {
                return Err(RankError::invalid_input(format!(
                    "series without labels cannot join group {}",
                    self.name
                )));
            }

            let uid = s.identity();
            if self.registry.contains_key(&uid) {
                return Err(RankError::DuplicateMember {
                    identity: uid,
                    group: self.name.clone(),
                });
            }

            if self.registry.is_empty() {
                self.n = s.len();
            } else if s.len() != self.n {
                return Err(RankError::LengthMismatch {
                    identity: uid,
                    context: format!("group {}", self.name),
                    expected: self.n,
                    actual: s.len(),
                });
            }

            self.registry.insert(uid, Arc::new(s));
        }
        Ok(())
    }

    /// Rebuilds the cohort index for `keys` and returns one label set per cohort.
    ///
    /// With no keys every series is its own cohort, described by its full label set.
    /// Otherwise a cohort's labels are the grouping keys the member actually carries.
    pub fn index_by_keys<S: AsRef<str>>(&mut self, keys: &[S]) -> Vec<Labels> {
        let mut distinct = Vec::new();
        let mut index: HashMap<String, Vec<String>> = HashMap::new();

        for (uid, s) in &self.registry {
            let (guid, cohort) = if keys.is_empty() {
                (uid.clone(), s.labels().clone())
            } else {
                (s.labels().identity(keys), s.labels().project(keys))
            };

            let members = index.entry(guid).or_insert_with(|| {
                distinct.push(cohort);
                Vec::new()
            });
            members.push(uid.clone());
        }

        self.index = index;
        distinct
    }

    /// Members of the cohort identified by `labels` in the current index.
    pub fn filter_by_label_values(&self, labels: &Labels) -> Vec<Arc<Series>> {
        let guid = labels.full_identity();
        self.index
            .get(&guid)
            .map(|uids| {
                uids.iter()
                    .filter_map(|uid| self.registry.get(uid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{colo_fixture, labels, series};

    #[test]
    fn add_rejects_duplicate_identity() {
        let y = [1.0, 2.0, 3.0];
        let mut group = Group::new("test");
        group.add([series(&y, &[("a", "v1")])]).unwrap();
        group.add([series(&y, &[("a", "v2")])]).unwrap();
        group
            .add([series(&y, &[("a", "v1"), ("c", "v2"), ("b", "v3")])])
            .unwrap();
        // keys are case sensitive
        group
            .add([series(&y, &[("a", "v1"), ("A", "v2"), ("b", "v3")])])
            .unwrap();

        let err = group.add([series(&y, &[("a", "v1")])]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateMember);
        assert_eq!(group.len(), 4);
    }

    #[test]
    fn add_rejects_length_mismatch_without_rollback() {
        let mut group = Group::new("test");
        let err = group
            .add([
                series(&[1.0, 2.0, 3.0], &[("host", "a")]),
                series(&[1.0, 2.0, 3.0], &[("host", "b")]),
                series(&[1.0, 2.0], &[("host", "c")]),
                series(&[1.0, 2.0, 3.0], &[("host", "d")]),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LengthMismatch);
        assert_eq!(group.len(), 2);
        assert_eq!(group.series_len(), 3);
        assert!(group.get("host:a").is_some());
        assert!(group.get("host:d").is_none());
    }

    #[test]
    fn members_share_one_length() {
        let mut group = Group::new("test");
        group.add(colo_fixture()).unwrap();
        let lengths: Vec<usize> = group.iter().map(|(_, s)| s.len()).collect();
        assert!(lengths.iter().all(|len| *len == group.series_len()));
    }

    #[test]
    fn index_counts_distinct_cohorts() {
        let mut group = Group::new("test");
        group.add(colo_fixture()).unwrap();

        let cases: &[(&[&str], usize)] = &[
            (&["graph"], 3),
            (&["host"], 2),
            (&["colo"], 2),
            (&["graph", "host"], 4),
            (&["host", "colo"], 4),
            (&["graph", "colo"], 4),
            (&["graph", "host", "colo"], 6),
        ];
        for (keys, expected) in cases {
            let cohorts = group.index_by_keys(keys);
            assert_eq!(cohorts.len(), *expected, "grouped by {keys:?}");
        }
    }

    #[test]
    fn empty_keys_index_each_series_separately() {
        let mut group = Group::new("test");
        group
            .add([
                series(&[1.0, 2.0], &[("graph", "cpu"), ("host", "a")]),
                series(&[1.0, 2.0], &[("graph", "cpu"), ("host", "b")]),
                series(&[1.0, 2.0], &[("uid", "x")]),
            ])
            .unwrap();

        let cohorts = group.index_by_keys::<&str>(&[]);
        assert_eq!(cohorts.len(), 3);
        for cohort in &cohorts {
            let members = group.filter_by_label_values(cohort);
            assert_eq!(members.len(), 1);
            assert_eq!(members[0].labels(), cohort);
        }
    }

    #[test]
    fn filter_returns_cohort_members() {
        let mut group = Group::new("test");
        group.add(colo_fixture()).unwrap();

        let cases: &[(&[(&str, &str)], usize)] = &[
            (&[("graph", "graph1")], 4),
            (&[("graph", "graph2")], 1),
            (&[("host", "host1")], 3),
            (&[("host", "host2")], 3),
            (&[("host", "host0")], 0),
            (&[("graph", "graph1"), ("host", "host2")], 2),
            (&[("graph", "graph1"), ("host", "host0")], 0),
        ];
        for (pairs, expected) in cases {
            let wanted = labels(pairs);
            group.index_by_keys(&wanted.keys());
            let members = group.filter_by_label_values(&wanted);
            assert_eq!(members.len(), *expected, "filtered by {wanted:?}");
        }
    }

    #[test]
    fn reindexing_discards_previous_index() {
        let mut group = Group::new("test");
        group.add(colo_fixture()).unwrap();

        group.index_by_keys(&["graph"]);
        assert_eq!(
            group
                .filter_by_label_values(&labels(&[("graph", "graph1")]))
                .len(),
            4
        );

        group.index_by_keys(&["host"]);
        assert!(group
            .filter_by_label_values(&labels(&[("graph", "graph1")]))
            .is_empty());
    }

    #[test]
    fn series_missing_grouping_keys_share_an_unlabelled_cohort() {
        let mut group = Group::new("test");
        group
            .add([
                series(&[1.0, 2.0], &[("graph", "cpu")]),
                series(&[1.0, 2.0], &[("uid", "x")]),
                series(&[1.0, 2.0], &[("uid", "y")]),
            ])
            .unwrap();

        let cohorts = group.index_by_keys(&["graph"]);
        assert_eq!(cohorts.len(), 2);
        let unlabelled = group.filter_by_label_values(&Labels::new());
        assert_eq!(unlabelled.len(), 2);
    }
}
