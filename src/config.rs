// src/config.rs

//! Configuration for the `packet-report` binary and the self-test.
//!
//! Read from the JSON file named by `PACKETMATH_CONFIG`. Every field has a
//! default, so a partial file (or no file at all) is fine.

use crate::error::Result;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "PACKETMATH_CONFIG";

/// Process-wide configuration, loaded on first use.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub selftest: SelfTestConfig,
    pub report: ReportConfig,
}

// --- Self-test Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelfTestConfig {
    /// Scalars per generated test buffer. Rounded up to a whole number of
    /// packets, with room for the unaligned and realignment checks.
    pub length: usize,
    /// Seed of the xorshift data generator.
    pub seed: u64,
    /// Relative tolerance for `f32` reductions, on top of the tree-summation bound.
    pub relative_tolerance: f64,
    /// Names of the checks to run. Empty runs all of them.
    pub checks: Vec<String>,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        SelfTestConfig {
            length: 64,
            seed: 0x5eed_1234_abcd_0001,
            relative_tolerance: 1e-5,
            checks: Vec::new(),
        }
    }
}

impl SelfTestConfig {
    pub fn wants(&self, check: &str) -> bool {
        self.checks.is_empty() || self.checks.iter().any(|c| c == check)
    }
}

// --- Report Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Pretty-print the JSON report.
    pub pretty: bool,
    /// Include the per-scalar packet bindings.
    pub include_capabilities: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            pretty: true,
            include_capabilities: true,
        }
    }
}

impl Config {
    /// Parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load from `PACKETMATH_CONFIG`, falling back to defaults when it is unset
    /// or unreadable.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            info!("{} not set, using default configuration", CONFIG_ENV);
            return Config::default();
        };
        let path = Path::new(&path);
        match Config::load(path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring {}: {}", path.display(), e);
                Config::default()
            }
        }
    }
}
