// build.rs

fn main() {
    // --- Record the target features the provider was compiled against ---
    // The AVX provider and the fused multiply-add primitive are selected with
    // `cfg(target_feature = ...)`. Cargo hands the resolved feature list to
    // build scripts; we forward it so `packet-report` can print exactly what
    // the library was built for, and callers can check they match.
    let features = std::env::var("CARGO_CFG_TARGET_FEATURE").unwrap_or_default();
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    println!("cargo:rustc-env=PACKETMATH_TARGET_FEATURES={}", features);
    println!("cargo:rustc-env=PACKETMATH_TARGET_ARCH={}", arch);

    // Rebuild when the flags that decide the provider change.
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RUSTFLAGS");
    println!("cargo:rerun-if-env-changed=CARGO_ENCODED_RUSTFLAGS");
}
