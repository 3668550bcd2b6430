//! Simulation options.
//!
//! Options can be set in code through the `with_*` builders or read from a
//! TOML document; any option left out takes its default. Every path into a
//! [`Simulation`](crate::Simulation) runs [`SimulationConfig::validate`] first.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detection::CollapseDetector;
use crate::errors::ConfigError;

/// Identifier of a collapse detection strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollapseMethod {
    /// Fixed negative entropy-change threshold.
    Threshold,
    /// Outlier test on the entropy-change history.
    ZScore,
}

impl CollapseMethod {
    /// Every recognised method.
    pub const ALL: [CollapseMethod; 2] = [CollapseMethod::Threshold, CollapseMethod::ZScore];

    /// Identifier accepted by [`FromStr`] and TOML.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CollapseMethod::Threshold => "threshold",
            CollapseMethod::ZScore => "zscore",
        }
    }
}

impl fmt::Display for CollapseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollapseMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownCollapseMethod(s.to_string()))
    }
}

/// Default step budget.
fn default_max_steps() -> usize {
    100
}

/// Default diffusion increment.
fn default_redistribution_dt() -> f64 {
    1.0
}

/// Default detection strategy.
fn default_collapse_method() -> CollapseMethod {
    CollapseMethod::ZScore
}

/// Default entropy-drop threshold.
fn default_collapse_threshold() -> f64 {
    -0.5
}

/// Default z-score cutoff.
fn default_collapse_zscore() -> f64 {
    3.0
}

/// Default z-score warm-up length.
fn default_zscore_min_history() -> usize {
    5
}

/// Default initial load factor.
fn default_load_factor_start() -> f64 {
    1.0
}

/// Options of a single simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Upper bound on the number of solved steps.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Pseudo-time increment of the redistribution step.
    #[serde(default = "default_redistribution_dt")]
    pub redistribution_dt: f64,
    /// Collapse detection strategy.
    #[serde(default = "default_collapse_method")]
    pub collapse_method: CollapseMethod,
    /// Entropy change, in nats, below which the threshold detector fires.
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: f64,
    /// Deviation count used by the z-score detector.
    #[serde(default = "default_collapse_zscore")]
    pub collapse_zscore: f64,
    /// Records needed before the z-score detector activates.
    #[serde(default = "default_zscore_min_history")]
    pub zscore_min_history: usize,
    /// Load factor of step 0.
    #[serde(default = "default_load_factor_start")]
    pub load_factor_start: f64,
    /// Load factor increment per step.
    #[serde(default)]
    pub load_factor_step: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            redistribution_dt: default_redistribution_dt(),
            collapse_method: default_collapse_method(),
            collapse_threshold: default_collapse_threshold(),
            collapse_zscore: default_collapse_zscore(),
            zscore_min_history: default_zscore_min_history(),
            load_factor_start: default_load_factor_start(),
            load_factor_step: 0.0,
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Examples
    /// ```
    /// use collapsex::{CollapseMethod, SimulationConfig};
    ///
    /// let config = SimulationConfig::from_toml_str(
    ///     "collapse_method = \"threshold\"\ncollapse_threshold = -0.01\nmax_steps = 50\n",
    /// )
    /// .expect("valid configuration");
    /// assert_eq!(config.collapse_method, CollapseMethod::Threshold);
    /// assert_eq!(config.redistribution_dt, 1.0);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents, unknown keys and
    /// unknown method identifiers, or the first validation error.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`SimulationConfig::from_toml_str`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check every option against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::NonPositiveMaxSteps);
        }
        if !(self.redistribution_dt > 0.0 && self.redistribution_dt.is_finite()) {
            return Err(ConfigError::NonPositiveTimeStep(self.redistribution_dt));
        }
        if !(self.collapse_threshold < 0.0) {
            return Err(ConfigError::NonNegativeThreshold(self.collapse_threshold));
        }
        if !(self.collapse_zscore > 0.0 && self.collapse_zscore.is_finite()) {
            return Err(ConfigError::NonPositiveZScore(self.collapse_zscore));
        }
        if self.zscore_min_history == 0 {
            return Err(ConfigError::ZeroMinHistory);
        }
        for (name, value) in [
            ("load_factor_start", self.load_factor_start),
            ("load_factor_step", self.load_factor_step),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteLoadFactor { name, value });
            }
        }
        Ok(())
    }

    /// Set the step budget.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the redistribution time increment.
    #[must_use]
    pub fn with_redistribution_dt(mut self, dt: f64) -> Self {
        self.redistribution_dt = dt;
        self
    }

    /// Select the detection strategy.
    #[must_use]
    pub fn with_method(mut self, method: CollapseMethod) -> Self {
        self.collapse_method = method;
        self
    }

    /// Select the detection strategy by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCollapseMethod`] for anything but
    /// `"threshold"` or `"zscore"`.
    pub fn with_collapse_method(self, method: &str) -> Result<Self, ConfigError> {
        Ok(self.with_method(method.parse()?))
    }

    /// Set the threshold detector's cutoff.
    #[must_use]
    pub fn with_collapse_threshold(mut self, threshold: f64) -> Self {
        self.collapse_threshold = threshold;
        self
    }

    /// Set the z-score detector's cutoff.
    #[must_use]
    pub fn with_collapse_zscore(mut self, zscore: f64) -> Self {
        self.collapse_zscore = zscore;
        self
    }

    /// Set how many records the z-score detector waits for.
    #[must_use]
    pub fn with_zscore_min_history(mut self, min_history: usize) -> Self {
        self.zscore_min_history = min_history;
        self
    }

    /// Set an incremental loading protocol.
    #[must_use]
    pub fn with_load_factor(mut self, start: f64, step: f64) -> Self {
        self.load_factor_start = start;
        self.load_factor_step = step;
        self
    }

    /// Detector described by these options.
    #[must_use]
    pub fn detector(&self) -> CollapseDetector {
        match self.collapse_method {
            CollapseMethod::Threshold => CollapseDetector::Threshold {
                threshold: self.collapse_threshold,
            },
            CollapseMethod::ZScore => CollapseDetector::ZScore {
                z_threshold: self.collapse_zscore,
                min_history: self.zscore_min_history,
            },
        }
    }

    /// Load factor applied at `step`.
    #[must_use]
    pub fn load_factor(&self, step: usize) -> f64 {
        self.load_factor_start + step as f64 * self.load_factor_step
    }
}
