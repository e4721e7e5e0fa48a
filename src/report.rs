//! The document printed by `packet-report`.

use crate::config::Config;
use crate::cpu::BuildInfo;
use crate::selftest::SuiteReport;
use crate::traits::PacketInfo;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub build: BuildInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<PacketInfo>,
    pub selftest: Vec<SuiteReport>,
}

impl Report {
    /// Describe the build and, when a provider is compiled in, run the self-test.
    pub fn collect(config: &Config) -> Self {
        let capabilities = if config.report.include_capabilities {
            bindings()
        } else {
            Vec::new()
        };
        Self {
            build: BuildInfo::current(),
            capabilities,
            selftest: selftest(config),
        }
    }

    pub fn passed(&self) -> bool {
        self.selftest.iter().all(|s| s.passed)
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
fn bindings() -> Vec<PacketInfo> {
    vec![
        PacketInfo::of::<f32>(),
        PacketInfo::of::<f64>(),
        PacketInfo::of::<i32>(),
    ]
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx")))]
fn bindings() -> Vec<PacketInfo> {
    vec![PacketInfo::of::<i32>()]
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
fn selftest(config: &Config) -> Vec<SuiteReport> {
    crate::selftest::run_provider::<crate::avx::Avx>(&config.selftest)
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx")))]
fn selftest(_config: &Config) -> Vec<SuiteReport> {
    log::info!("no packet provider compiled in; skipping self-test");
    Vec::new()
}
