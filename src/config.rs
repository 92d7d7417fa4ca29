use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_PATH_VAR: &str = "SERIES_RANK_CONFIG_PATH";
pub const CONCURRENCY_VAR: &str = "SERIES_RANK_CONCURRENCY";
pub const DEGENERATE_VAR: &str = "SERIES_RANK_DEGENERATE";
pub const MAX_LAG_VAR: &str = "SERIES_RANK_MAX_LAG";
pub const TOP_N_VAR: &str = "SERIES_RANK_TOP_N";
pub const THRESHOLD_VAR: &str = "SERIES_RANK_THRESHOLD";

const DEFAULT_CONCURRENCY: usize = 1;
const DEFAULT_MAX_LAG: usize = 10;
const DEFAULT_TOP_N: usize = 20;
const DEFAULT_THRESHOLD: f64 = 0.0;

/// What a zero-variance candidate contributes to its cohort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateHandling {
    /// Score it as similarity 0 at lag 0.
    #[default]
    Uncorrelated,
    /// Drop it; a cohort of only flat candidates yields no score.
    Skip,
}

impl DegenerateHandling {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegenerateHandling::Uncorrelated => "uncorrelated",
            DegenerateHandling::Skip => "skip",
        }
    }
}

impl FromStr for DegenerateHandling {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "uncorrelated" | "zero" => Ok(DegenerateHandling::Uncorrelated),
            "skip" | "drop" => Ok(DegenerateHandling::Skip),
            other => Err(format!("expected `uncorrelated` or `skip`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on concurrently running cohort tasks; values below 1 act as 1.
    pub concurrency: usize,
    pub degenerate_candidates: DegenerateHandling,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            degenerate_candidates: DegenerateHandling::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let overrides = config_path().and_then(|path| load_config_overrides(&path));
        Self::from_lookup(env_lookup, overrides.as_ref())
    }

    /// Builds the config from `lookup` (environment-shaped), falling back to the
    /// override file and then to defaults.
    pub fn from_lookup<F>(lookup: F, overrides: Option<&ConfigOverrides>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let concurrency = parse_var::<usize, _>(&lookup, CONCURRENCY_VAR)?
            .or_else(|| overrides.and_then(|ov| ov.concurrency))
            .unwrap_or(defaults.concurrency)
            .max(1);
        let degenerate_candidates = parse_var::<DegenerateHandling, _>(&lookup, DEGENERATE_VAR)?
            .or_else(|| overrides.and_then(|ov| ov.degenerate_candidates))
            .unwrap_or(defaults.degenerate_candidates);

        Ok(Self {
            concurrency,
            degenerate_candidates,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultStoreConfig {
    pub max_lag: usize,
    pub top_n: usize,
    pub threshold: f64,
}

impl Default for ResultStoreConfig {
    fn default() -> Self {
        Self {
            max_lag: DEFAULT_MAX_LAG,
            top_n: DEFAULT_TOP_N,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ResultStoreConfig {
    /// Threshold clamped into `[0, 1]`; non-finite thresholds fall back to 0.
    pub fn normalized(mut self) -> Self {
        self.threshold = if self.threshold.is_finite() {
            self.threshold.clamp(0.0, 1.0)
        } else {
            DEFAULT_THRESHOLD
        };
        self
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let overrides = config_path().and_then(|path| load_config_overrides(&path));
        Self::from_lookup(env_lookup, overrides.as_ref())
    }

    pub fn from_lookup<F>(lookup: F, overrides: Option<&ConfigOverrides>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_lag = parse_var::<usize, _>(&lookup, MAX_LAG_VAR)?
            .or_else(|| overrides.and_then(|ov| ov.max_lag))
            .unwrap_or(defaults.max_lag);
        let top_n = parse_var::<usize, _>(&lookup, TOP_N_VAR)?
            .or_else(|| overrides.and_then(|ov| ov.top_n))
            .unwrap_or(defaults.top_n);
        let threshold = parse_var::<f64, _>(&lookup, THRESHOLD_VAR)?
            .or_else(|| overrides.and_then(|ov| ov.threshold))
            .unwrap_or(defaults.threshold);

        Ok(Self {
            max_lag,
            top_n,
            threshold,
        }
        .normalized())
    }
}

/// Optional JSON file with values the environment leaves unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub degenerate_candidates: Option<DegenerateHandling>,
    #[serde(default)]
    pub max_lag: Option<usize>,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn config_path() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_VAR)
        .ok()
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

pub fn load_config_overrides(path: &Path) -> Option<ConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read series-rank config; using env defaults"
            );
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse series-rank config; using env defaults"
            );
            None
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|err| anyhow!("invalid {key}={raw}: {err}"))
}
