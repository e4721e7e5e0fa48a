// src/main.rs

use packetmath::config::CONFIG;
use packetmath::cpu;
use packetmath::report::Report;

use anyhow::Context;
use log::{error, info};

/// Entry point for `packet-report`: check the CPU, run the self-test, print JSON.
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting packet-report...");

    // The provider's instructions are undefined on a CPU without them, so
    // this has to pass before anything touches a packet.
    cpu::check_build_consistency().context("Build does not match the running CPU")?;

    let config = &*CONFIG;
    let report = Report::collect(config);
    let json = report
        .to_json(config.report.pretty)
        .context("Failed to serialize report")?;
    println!("{}", json);

    if !report.passed() {
        for suite in &report.selftest {
            for check in suite.failures() {
                error!(
                    "{}: `{}` failed: {}",
                    suite.packet,
                    check.name,
                    check.detail.as_deref().unwrap_or("")
                );
            }
        }
        anyhow::bail!("packet self-test failed");
    }

    info!("All packet checks passed.");
    Ok(())
}
