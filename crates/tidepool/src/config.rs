//! Pool configuration: scaling policy, size bounds and the fetch retry schedule.
//!
//! A `PoolConfig` can be built in code (`Default` plus `with_*` setters) or
//! parsed from TOML:
//!
//! ```toml
//! policy = "adaptive"
//! target_utilization = 0.7
//! scale_cap = 0.3
//! cooldown = "1s"
//! desired_size = 5
//! min_size = 3
//! max_size = 10
//! retry_times = 3
//! retry_interval = "100ms"
//! retry_backoff = 2.0
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// How the capacity planner is allowed to resize the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingPolicy {
    /// Size never changes automatically; only `prewarm` and manual `scale`.
    Fixed,
    /// Grow and shrink toward the target utilization, limited by `scale_cap`.
    #[default]
    Adaptive,
    /// Like `Adaptive`, but growth steps are not limited by `scale_cap`.
    Unlimited,
}

impl fmt::Display for ScalingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingPolicy::Fixed => write!(f, "fixed"),
            ScalingPolicy::Adaptive => write!(f, "adaptive"),
            ScalingPolicy::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl FromStr for ScalingPolicy {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ScalingPolicy::Fixed),
            "adaptive" => Ok(ScalingPolicy::Adaptive),
            "unlimited" => Ok(ScalingPolicy::Unlimited),
            other => Err(PoolError::Config(format!("unknown scaling policy: {other}"))),
        }
    }
}

/// Configuration for an object pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Scaling policy (default: adaptive).
    pub policy: ScalingPolicy,
    /// Desired fraction of borrowed members, in `[0, 1]` (default: 0.7).
    pub target_utilization: f64,
    /// Largest fraction of the current size one planning step may change,
    /// in `[0, 1]` (default: 0.3).
    pub scale_cap: f64,
    /// Minimum time between consecutive shrinks (default: 1s).
    #[serde(with = "duration_str")]
    pub cooldown: Duration,
    /// Size reached by `prewarm` (default: 5).
    pub desired_size: usize,
    /// Lower bound kept by the planner (default: 3).
    pub min_size: usize,
    /// Hard upper bound on pool size (default: 10).
    pub max_size: usize,
    /// Number of fetch attempts before reporting overload (default: 3).
    pub retry_times: u32,
    /// Sleep after the first failed fetch attempt (default: 100ms).
    #[serde(with = "duration_str")]
    pub retry_interval: Duration,
    /// Factor applied to the sleep after every failed attempt (default: 2.0).
    pub retry_backoff: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            policy: ScalingPolicy::Adaptive,
            target_utilization: 0.7,
            scale_cap: 0.3,
            cooldown: Duration::from_secs(1),
            desired_size: 5,
            min_size: 3,
            max_size: 10,
            retry_times: 3,
            retry_interval: Duration::from_millis(100),
            retry_backoff: 2.0,
        }
    }
}

impl PoolConfig {
    pub fn with_policy(mut self, policy: ScalingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_target_utilization(mut self, target: f64) -> Self {
        self.target_utilization = target;
        self
    }

    pub fn with_scale_cap(mut self, cap: f64) -> Self {
        self.scale_cap = cap;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set desired, min and max size in one call.
    pub fn with_sizes(mut self, desired: usize, min: usize, max: usize) -> Self {
        self.desired_size = desired;
        self.min_size = min;
        self.max_size = max;
        self
    }

    pub fn with_retry(mut self, times: u32, interval: Duration, backoff: f64) -> Self {
        self.retry_times = times;
        self.retry_interval = interval;
        self.retry_backoff = backoff;
        self
    }

    /// Check bounds and fractions. Called by `ObjectPool::new`.
    pub fn validate(&self) -> PoolResult<()> {
        check_fraction("target_utilization", self.target_utilization)?;
        check_fraction("scale_cap", self.scale_cap)?;

        if self.min_size > self.max_size {
            return Err(PoolError::Config(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.desired_size > self.max_size {
            return Err(PoolError::Config(format!(
                "desired_size ({}) exceeds max_size ({})",
                self.desired_size, self.max_size
            )));
        }
        if !self.retry_backoff.is_finite() || self.retry_backoff < 0.0 {
            return Err(PoolError::Config(format!(
                "retry_backoff must be a finite non-negative number, got {}",
                self.retry_backoff
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> PoolResult<Self> {
        let config: PoolConfig = toml::from_str(content).map_err(anyhow::Error::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> PoolResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn check_fraction(name: &str, value: f64) -> PoolResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PoolError::Config(format!("{name} must be within [0, 1], got {value}")))
    }
}

/// Parse a duration string like "250ms", "1.5s", "2m" or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let invalid = || format!("invalid duration: {s:?}");

    let parse = |n: &str| n.trim().parse::<f64>().map_err(|_| invalid());

    let secs = if let Some(ms) = s.strip_suffix("ms") {
        parse(ms)? / 1000.0
    } else if let Some(secs) = s.strip_suffix('s') {
        parse(secs)?
    } else if let Some(mins) = s.strip_suffix('m') {
        parse(mins)? * 60.0
    } else {
        parse(s)?
    };

    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

/// Serde adapter writing durations as human-readable strings.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Secs(f64),
    }

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => super::parse_duration(&s).map_err(serde::de::Error::custom),
            Raw::Secs(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|_| serde::de::Error::custom(format!("invalid duration: {secs}"))),
        }
    }
}
