use crate::labels::Labels;
use crate::series::Series;
use std::sync::Once;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    Labels::from_pairs(pairs.iter().copied())
}

pub fn series(values: &[f64], pairs: &[(&str, &str)]) -> Series {
    Series::new(values.to_vec(), labels(pairs)).expect("labelled test series")
}

/// The six graph/host/colo combinations used by the grouping tests.
pub fn colo_fixture() -> Vec<Series> {
    let y = [0.0, 1.0, 2.0, 3.0];
    [
        ("graph1", "host1", "colo1"),
        ("graph1", "host1", "colo2"),
        ("graph1", "host2", "colo1"),
        ("graph1", "host2", "colo2"),
        ("graph2", "host1", "colo1"),
        ("graph3", "host2", "colo1"),
    ]
    .iter()
    .map(|&(graph, host, colo)| series(&y, &[("graph", graph), ("host", host), ("colo", colo)]))
    .collect()
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
