//! Runtime configuration from `PSCUE_*` environment variables.
//!
//! Configuration is read once per process. Unknown or unparseable values
//! fall back to their defaults with a single warning log, so a typo in a
//! profile never disables completion.

use tracing::warn;

/// Default bound on the command-history ring.
pub const DEFAULT_HISTORY_SIZE: usize = 1000;

/// Default half-life driver for recency decay, in days.
pub const DEFAULT_SCORE_DECAY_DAYS: f64 = 30.0;

/// Tuning knobs for the smart directory-navigation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Weight of the frequency component in candidate scoring.
    pub frequency_weight: f64,
    /// Weight of the recency component.
    pub recency_weight: f64,
    /// Weight of the directory-distance component.
    pub distance_weight: f64,
    /// Maximum depth for the filesystem scan below the current directory.
    pub max_depth: usize,
    /// Whether the filesystem scan runs at all.
    pub recursive_search: bool,
    /// Minimum match percentage for a fuzzy candidate to qualify.
    pub fuzzy_min_match_percentage: f64,
    /// Multiplicative boost applied to exact basename matches.
    pub exact_match_boost: f64,
    /// Recency decay window in days.
    pub score_decay_days: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            frequency_weight: 0.5,
            recency_weight: 0.3,
            distance_weight: 0.2,
            max_depth: 3,
            recursive_search: true,
            fuzzy_min_match_percentage: 60.0,
            exact_match_boost: 2.0,
            score_decay_days: DEFAULT_SCORE_DECAY_DAYS,
        }
    }
}

/// Process-wide configuration assembled from the environment.
#[derive(Debug, Clone, Default)]
pub struct CueConfig {
    /// When true, the feedback path is a no-op (nothing is learned).
    pub disable_learning: bool,
    /// Bound on the command-history ring.
    pub history_size: Option<usize>,
    /// Glob patterns; commands matching any of them are not learned from.
    pub ignore_patterns: Vec<glob::Pattern>,
    /// Smart-navigation tuning.
    pub navigation: NavigationConfig,
    /// Verbose diagnostic logging requested via `PSCUE_DEBUG`.
    pub debug: bool,
}

impl CueConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        let mut cfg = CueConfig {
            disable_learning: env_truthy("PSCUE_DISABLE_LEARNING"),
            history_size: env_parse("PSCUE_HISTORY_SIZE"),
            ignore_patterns: parse_ignore_patterns(),
            navigation: NavigationConfig::default(),
            debug: env_truthy("PSCUE_DEBUG"),
        };

        let nav = &mut cfg.navigation;
        if let Some(v) = env_parse("PSCUE_PCD_FREQUENCY_WEIGHT") {
            nav.frequency_weight = v;
        }
        if let Some(v) = env_parse("PSCUE_PCD_RECENCY_WEIGHT") {
            nav.recency_weight = v;
        }
        if let Some(v) = env_parse("PSCUE_PCD_DISTANCE_WEIGHT") {
            nav.distance_weight = v;
        }
        if let Some(v) = env_parse("PSCUE_PCD_MAX_DEPTH") {
            nav.max_depth = v;
        }
        if let Some(v) = env_bool("PSCUE_PCD_RECURSIVE_SEARCH") {
            nav.recursive_search = v;
        }
        if let Some(v) = env_parse("PSCUE_PCD_FUZZY_MIN_MATCH_PERCENTAGE") {
            nav.fuzzy_min_match_percentage = v;
        }
        if let Some(v) = env_parse("PSCUE_PCD_EXACT_MATCH_BOOST") {
            nav.exact_match_boost = v;
        }
        if let Some(v) = env_parse("PSCUE_PCD_SCORE_DECAY_DAYS") {
            nav.score_decay_days = v;
        }

        cfg
    }

    /// Effective history bound (env override or default).
    pub fn effective_history_size(&self) -> usize {
        self.history_size.unwrap_or(DEFAULT_HISTORY_SIZE)
    }

    /// True when `command_line` matches one of the ignore patterns.
    pub fn is_ignored(&self, command_line: &str) -> bool {
        self.ignore_patterns
            .iter()
            .any(|p| p.matches(command_line))
    }
}

/// Truthiness matching shell conventions: `1`, `true`, `yes`, `on` (any case).
fn env_truthy(key: &str) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

/// Parse an explicit boolean; `None` when unset or unparseable.
fn env_bool(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            warn!(key, value = other, "unrecognized boolean value, using default");
            None
        }
    }
}

/// Parse a value via `FromStr`; warn and fall back on failure.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = raw.as_str(), "unparseable value, using default");
            None
        }
    }
}

/// Parse `PSCUE_IGNORE_PATTERNS`, a `;`- or `,`-separated glob list.
///
/// Invalid patterns are skipped with a warning rather than disabling the
/// whole list.
fn parse_ignore_patterns() -> Vec<glob::Pattern> {
    let Ok(raw) = std::env::var("PSCUE_IGNORE_PATTERNS") else {
        return Vec::new();
    };
    raw.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match glob::Pattern::new(s) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(pattern = s, error = %e, "invalid ignore pattern, skipping");
                None
            }
        })
        .collect()
}
