//! Build-time vs. run-time instruction set agreement.
//!
//! The provider is picked at compile time by `cfg(target_feature)`. Running
//! that binary on a CPU without the same features is undefined behaviour at the
//! first AVX instruction, so the report binary checks before it runs anything.

use crate::error::{PacketError, Result};
use log::{debug, error, warn};
use serde::Serialize;

/// Target features forwarded by `build.rs`.
const TARGET_FEATURES: &str = env!("PACKETMATH_TARGET_FEATURES");
const TARGET_ARCH: &str = env!("PACKETMATH_TARGET_ARCH");

/// What the library was compiled for.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub arch: &'static str,
    pub target_features: Vec<String>,
    /// Name of the compiled-in provider, if any.
    pub provider: Option<&'static str>,
    pub fma: bool,
}

impl BuildInfo {
    pub fn current() -> Self {
        let mut target_features: Vec<String> = TARGET_FEATURES
            .split(',')
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        target_features.sort();
        Self {
            arch: TARGET_ARCH,
            target_features,
            provider: provider_name(),
            fma: cfg!(target_feature = "fma"),
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
fn provider_name() -> Option<&'static str> {
    use crate::packet::Provider;
    Some(<crate::avx::Avx as Provider>::NAME)
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "avx")))]
fn provider_name() -> Option<&'static str> {
    None
}

/// Fail if the running CPU lacks a feature the provider was compiled with.
///
/// Features the CPU has but the build did not enable only produce a warning:
/// the code is correct, just not as fast as it could be.
#[cfg(target_arch = "x86_64")]
pub fn check_build_consistency() -> Result<()> {
    evaluate(&[
        ("avx", cfg!(target_feature = "avx"), is_x86_feature_detected!("avx")),
        ("fma", cfg!(target_feature = "fma"), is_x86_feature_detected!("fma")),
    ])
}

/// `(feature, built, present)` triples, checked in order.
#[cfg_attr(not(target_arch = "x86_64"), allow(dead_code))]
fn evaluate(checks: &[(&'static str, bool, bool)]) -> Result<()> {
    for &(name, built, present) in checks {
        match (built, present) {
            (true, false) => {
                error!("build requires `{}` but the running CPU lacks it", name);
                return Err(PacketError::MissingCpuFeature(name));
            }
            (false, true) => warn!("CPU supports `{}` but the build did not enable it", name),
            _ => debug!("target feature `{}`: built={} cpu={}", name, built, present),
        }
    }
    Ok(())
}

#[cfg(not(target_arch = "x86_64"))]
pub fn check_build_consistency() -> Result<()> {
    debug!("no x86_64 provider to check on {}", TARGET_ARCH);
    Ok(())
}
