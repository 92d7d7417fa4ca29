use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label name used when a series is registered without caller labels.
pub const DEFAULT_LABEL: &str = "uid";

/// Key/value labels attached to a series.
///
/// Keys are held in a `BTreeMap`, so [`Labels::keys`] is always sorted and two label
/// sets built from the same pairs in any order compare (and identify) equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels {
    labels: BTreeMap<String, String>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs.into_iter().collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Label keys in lexicographic order.
    pub fn keys(&self) -> Vec<&str> {
        self.labels.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical `key1:val1,key2:val2` string over `subset` (all keys when empty).
    ///
    /// Requested keys are sorted and de-duplicated; keys missing from this set are skipped.
    pub fn identity<S: AsRef<str>>(&self, subset: &[S]) -> String {
        let mut keys: Vec<&str> = if subset.is_empty() {
            self.keys()
        } else {
            subset.iter().map(AsRef::as_ref).collect()
        };
        keys.sort_unstable();
        keys.dedup();

        keys.into_iter()
            .filter_map(|key| self.get(key).map(|value| format!("{key}:{value}")))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Identity over every key in the set.
    pub fn full_identity(&self) -> String {
        self.identity::<&str>(&[])
    }

    /// The subset of this set restricted to `keys`; absent keys are omitted.
    pub fn project<S: AsRef<str>>(&self, keys: &[S]) -> Labels {
        keys.iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.get(key).map(|value| (key.to_string(), value.to_string()))
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            labels: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_sorted_regardless_of_insertion_order() {
        let labels = Labels::from_pairs([("host", "h1"), ("graph", "cpu"), ("dc", "east")]);
        assert_eq!(labels.keys(), vec!["dc", "graph", "host"]);
    }

    #[test]
    fn identity_is_invariant_under_insertion_and_subset_order() {
        let a = Labels::from_pairs([("host", "h1"), ("graph", "cpu"), ("dc", "east")]);
        let b = Labels::from_pairs([("dc", "east"), ("host", "h1"), ("graph", "cpu")]);
        assert_eq!(a.full_identity(), b.full_identity());
        assert_eq!(a.full_identity(), "dc:east,graph:cpu,host:h1");

        assert_eq!(a.identity(&["host", "graph"]), b.identity(&["graph", "host"]));
        assert_eq!(a.identity(&["host", "graph"]), "graph:cpu,host:h1");
    }

    #[test]
    fn identity_skips_missing_keys() {
        let labels = Labels::from_pairs([("graph", "cpu"), ("host", "h1")]);
        assert_eq!(labels.identity(&["host", "region"]), "host:h1");
        assert_eq!(labels.identity(&["region"]), "");
    }

    #[test]
    fn identity_ignores_duplicate_requested_keys() {
        let labels = Labels::from_pairs([("graph", "cpu"), ("host", "h1")]);
        assert_eq!(labels.identity(&["host", "host"]), "host:h1");
    }

    #[test]
    fn empty_labels_have_empty_identity() {
        let labels = Labels::new();
        assert!(labels.is_empty());
        assert_eq!(labels.full_identity(), "");
        assert_eq!(labels.identity(&["graph"]), "");
    }

    #[test]
    fn project_keeps_only_present_keys() {
        let labels = Labels::from_pairs([("graph", "cpu"), ("host", "h1")]);
        let projected = labels.project(&["graph", "region"]);
        assert_eq!(projected, Labels::from_pairs([("graph", "cpu")]));
    }

    #[test]
    fn serializes_as_plain_map() {
        let labels = Labels::from_pairs([("host", "h1"), ("graph", "cpu")]);
        let value = serde_json::to_value(&labels).unwrap();
        assert_eq!(value, serde_json::json!({"graph": "cpu", "host": "h1"}));
    }
}
