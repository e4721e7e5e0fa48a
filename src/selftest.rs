//! Runtime check of every packet primitive against a scalar reference.
//!
//! Each check stores packets back to arrays and compares lane by lane with
//! the scalar computation. Lane-wise primitives must match bit for bit. Sum
//! and product reductions are held to the balanced-tree error bound, since
//! their combination order differs from any scalar loop.

use crate::align::Aligned32;
use crate::config::SelfTestConfig;
use crate::packet::{Packet, Provider};
use crate::traits::{short_type_name, Real};
use log::{debug, warn};
use serde::Serialize;

/// Every check name, in the order they run.
pub const CHECKS: &[&str] = &[
    "add",
    "sub",
    "mul",
    "div",
    "negate",
    "min",
    "max",
    "and",
    "or",
    "xor",
    "and_not",
    "sequential",
    "load_aligned",
    "load_unaligned",
    "load_dup",
    "store_splat",
    "first",
    "reverse",
    "abs",
    "reduce_sum",
    "reduce_product",
    "reduce_min",
    "reduce_max",
    "reduce_pairwise",
    "align",
    "mul_add",
];

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub packet: String,
    pub lanes: usize,
    pub passed: bool,
    pub checks: Vec<CheckResult>,
}

impl SuiteReport {
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

// ============================================================================
// Data
// ============================================================================

/// Marsaglia xorshift64. Deterministic, which is all the self-test needs.
#[derive(Debug, Clone)]
pub struct XorShift64(u64);

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point.
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Magnitude in `[0.5, 4)` with a random sign. Keeps products of a few
    /// lanes well inside the range of `f32`.
    pub fn next_sample(&mut self) -> f64 {
        let magnitude = 0.5 + 3.5 * self.next_unit();
        if self.next_u64() & 1 == 0 {
            magnitude
        } else {
            -magnitude
        }
    }
}

/// Runtime offset → compile-time [`Packet::align`] instantiation.
///
/// Only the self-test needs to loop over offsets; kernels always name `K`
/// statically.
pub trait Realign: Packet {
    /// `None` when `offset >= LANES`.
    fn align_dyn(self, second: Self, offset: usize) -> Option<Self>;
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
macro_rules! impl_realign {
    ($ty:ty => $($k:literal)*) => {
        impl Realign for $ty {
            fn align_dyn(self, second: Self, offset: usize) -> Option<Self> {
                match offset {
                    $($k => Some(self.align::<$k>(second)),)*
                    _ => None,
                }
            }
        }
    };
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
impl_realign!(crate::avx::F32x8 => 0 1 2 3 4 5 6 7);
#[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
impl_realign!(crate::avx::F64x4 => 0 1 2 3);

// ============================================================================
// Comparison helpers
// ============================================================================

type Outcome = Result<(), String>;

fn same_bits<S: Real>(got: &[S], want: &[S]) -> Outcome {
    for (i, (g, w)) in got.iter().zip(want).enumerate() {
        if g.to_raw_bits() != w.to_raw_bits() {
            return Err(format!("lane {}: got {:?}, expected {:?}", i, g, w));
        }
    }
    Ok(())
}

fn binary<P: Packet>(
    a: &[P::Scalar],
    b: &[P::Scalar],
    vector: impl Fn(P, P) -> P,
    scalar: impl Fn(P::Scalar, P::Scalar) -> P::Scalar,
) -> Outcome {
    for (x, y) in a.chunks_exact(P::LANES).zip(b.chunks_exact(P::LANES)) {
        let got = vector(P::from_slice(x), P::from_slice(y)).to_array();
        let want: Vec<P::Scalar> = x.iter().zip(y).map(|(&x, &y)| scalar(x, y)).collect();
        same_bits(got.as_ref(), &want)?;
    }
    Ok(())
}

fn unary<P: Packet>(
    a: &[P::Scalar],
    vector: impl Fn(P) -> P,
    scalar: impl Fn(P::Scalar) -> P::Scalar,
) -> Outcome {
    for x in a.chunks_exact(P::LANES) {
        let got = vector(P::from_slice(x)).to_array();
        let want: Vec<P::Scalar> = x.iter().map(|&x| scalar(x)).collect();
        same_bits(got.as_ref(), &want)?;
    }
    Ok(())
}

fn bits<S: Real>(a: S, b: S, op: impl Fn(u64, u64) -> u64) -> S {
    S::from_raw_bits(op(a.to_raw_bits(), b.to_raw_bits()))
}

/// Compensated summation in `f64`, used as the exact reference.
fn neumaier(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0f64;
    let mut c = 0.0f64;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            c += (sum - t) + v;
        } else {
            c += (v - t) + sum;
        }
        sum = t;
    }
    sum + c
}

fn within(name: &str, got: f64, want: f64, allowed: f64) -> Outcome {
    let err = (got - want).abs();
    if err <= allowed {
        Ok(())
    } else {
        Err(format!(
            "{}: got {:e}, expected {:e} (error {:e} > {:e})",
            name, got, want, err, allowed
        ))
    }
}

// ============================================================================
// Suite
// ============================================================================

struct Suite<'a> {
    config: &'a SelfTestConfig,
    checks: Vec<CheckResult>,
}

impl Suite<'_> {
    fn check(&mut self, name: &'static str, f: impl FnOnce() -> Outcome) {
        if !self.config.wants(name) {
            return;
        }
        let outcome = f();
        match &outcome {
            Ok(()) => debug!("check `{}` passed", name),
            Err(detail) => warn!("check `{}` failed: {}", name, detail),
        }
        self.checks.push(CheckResult {
            name,
            passed: outcome.is_ok(),
            detail: outcome.err(),
        });
    }
}

/// Run every selected check for packet type `P`.
pub fn run<P: Realign>(config: &SelfTestConfig) -> SuiteReport {
    let lanes = P::LANES;
    // Whole packets only, and at least two so the realignment and
    // unaligned checks have a neighbour to read from.
    let n = config.length.max(2 * lanes).div_ceil(lanes) * lanes;

    let mut rng = XorShift64::new(config.seed);
    let mut generate = |len: usize| -> Vec<P::Scalar> {
        (0..len).map(|_| P::Scalar::from_f64(rng.next_sample())).collect()
    };
    let a = generate(n);
    let b = generate(n);
    let c = generate(n);

    let eps = P::Scalar::EPSILON.to_f64();
    // f32 gets the configured slack on top of the tree bound.
    let slack = if eps >= f32::EPSILON as f64 {
        config.relative_tolerance
    } else {
        0.0
    };
    let depth = (lanes as f64).log2().ceil();

    let mut suite = Suite {
        config,
        checks: Vec::new(),
    };

    // --- Elementwise ---
    suite.check("add", || binary::<P>(&a, &b, |x, y| x + y, |x, y| x + y));
    suite.check("sub", || binary::<P>(&a, &b, |x, y| x - y, |x, y| x - y));
    suite.check("mul", || binary::<P>(&a, &b, |x, y| x * y, |x, y| x * y));
    suite.check("div", || binary::<P>(&a, &b, |x, y| x / y, |x, y| x / y));
    suite.check("negate", || {
        unary::<P>(&a, |x| -x, |x| P::Scalar::ZERO - x)?;
        let zero = (-P::splat(P::Scalar::ZERO)).first();
        if zero.to_raw_bits() != 0 {
            return Err(format!("-(+0) gave {:?}", zero));
        }
        Ok(())
    });
    suite.check("min", || {
        binary::<P>(&a, &b, |x, y| x.min(y), |x, y| if x < y { x } else { y })
    });
    suite.check("max", || {
        binary::<P>(&a, &b, |x, y| x.max(y), |x, y| if x > y { x } else { y })
    });
    suite.check("and", || binary::<P>(&a, &b, |x, y| x & y, |x, y| bits(x, y, |p, q| p & q)));
    suite.check("or", || binary::<P>(&a, &b, |x, y| x | y, |x, y| bits(x, y, |p, q| p | q)));
    suite.check("xor", || binary::<P>(&a, &b, |x, y| x ^ y, |x, y| bits(x, y, |p, q| p ^ q)));
    suite.check("and_not", || {
        binary::<P>(&a, &b, |x, y| x.and_not(y), |x, y| bits(x, y, |p, q| p & !q))
    });
    suite.check("sequential", || {
        let got = P::sequential(a[0]).to_array();
        let want: Vec<P::Scalar> = (0..lanes)
            .map(|i| a[0] + P::Scalar::from_f64(i as f64))
            .collect();
        same_bits(got.as_ref(), &want)
    });

    // --- Memory ---
    suite.check("load_aligned", || {
        for chunk in a.chunks_exact(lanes) {
            let mut block = Aligned32(P::Array::default());
            block.0.as_mut().copy_from_slice(chunk);
            let p = P::load_aligned_from(&block);
            same_bits(p.to_array().as_ref(), chunk)?;

            let mut out = Aligned32(P::Array::default());
            p.store_aligned_to(&mut out);
            same_bits(out.0.as_ref(), chunk)?;
        }
        Ok(())
    });
    suite.check("load_unaligned", || {
        for offset in 1..lanes {
            let p = P::from_slice(&a[offset..]);
            same_bits(p.to_array().as_ref(), &a[offset..offset + lanes])?;

            let mut out = vec![P::Scalar::ZERO; lanes + offset];
            p.store(&mut out[offset..]);
            same_bits(&out[offset..], &a[offset..offset + lanes])?;
        }
        Ok(())
    });
    suite.check("load_dup", || {
        for start in 0..lanes {
            let got = P::from_slice_dup(&a[start..]).to_array();
            let want: Vec<P::Scalar> = (0..lanes).map(|i| a[start + i / 2]).collect();
            same_bits(got.as_ref(), &want)?;
        }
        Ok(())
    });
    suite.check("store_splat", || {
        let mut out = Aligned32(P::Array::default());
        // SAFETY: `out` is exactly one aligned packet.
        unsafe { P::store_splat(out.0.as_mut().as_mut_ptr(), b[0]) };
        same_bits(out.0.as_ref(), &vec![b[0]; lanes][..])
    });
    suite.check("first", || {
        for chunk in a.chunks_exact(lanes) {
            same_bits(&[P::from_slice(chunk).first()], &chunk[..1])?;
        }
        Ok(())
    });

    // --- Shuffles ---
    suite.check("reverse", || {
        for chunk in a.chunks_exact(lanes) {
            let p = P::from_slice(chunk);
            let want: Vec<P::Scalar> = chunk.iter().rev().copied().collect();
            same_bits(p.reverse().to_array().as_ref(), &want)?;
            same_bits(p.reverse().reverse().to_array().as_ref(), chunk)?;
        }
        Ok(())
    });
    suite.check("abs", || unary::<P>(&a, |x| x.abs(), |x| x.abs()));

    // --- Reductions ---
    suite.check("reduce_sum", || {
        for chunk in a.chunks_exact(lanes) {
            let got = P::from_slice(chunk).reduce_sum().to_f64();
            let want = neumaier(chunk.iter().map(|x| x.to_f64()));
            let magnitude: f64 = chunk.iter().map(|x| x.to_f64().abs()).sum();
            let allowed = (depth + 1.0) * eps * magnitude + slack * want.abs();
            within("reduce_sum", got, want, allowed)?;
        }
        Ok(())
    });
    suite.check("reduce_product", || {
        for chunk in a.chunks_exact(lanes) {
            let got = P::from_slice(chunk).reduce_product().to_f64();
            let want: f64 = chunk.iter().map(|x| x.to_f64()).product();
            let allowed = (lanes as f64) * eps * want.abs() + slack * want.abs();
            within("reduce_product", got, want, allowed)?;
        }
        Ok(())
    });
    suite.check("reduce_min", || {
        for chunk in a.chunks_exact(lanes) {
            let got = P::from_slice(chunk).reduce_min();
            let want = chunk[1..]
                .iter()
                .fold(chunk[0], |m, &x| if x < m { x } else { m });
            same_bits(&[got], &[want])?;
        }
        Ok(())
    });
    suite.check("reduce_max", || {
        for chunk in a.chunks_exact(lanes) {
            let got = P::from_slice(chunk).reduce_max();
            let want = chunk[1..]
                .iter()
                .fold(chunk[0], |m, &x| if x > m { x } else { m });
            same_bits(&[got], &[want])?;
        }
        Ok(())
    });
    suite.check("reduce_pairwise", || {
        let mut accs = P::Accumulators::default();
        for (i, acc) in accs.as_mut().iter_mut().enumerate() {
            *acc = P::from_slice(&a[i..]) * P::from_slice(&b[i..]);
        }
        let got = P::reduce_pairwise(accs).to_array();
        let want: Vec<P::Scalar> = accs.as_ref().iter().map(|p| p.reduce_sum()).collect();
        same_bits(got.as_ref(), &want)
    });

    // --- Realignment ---
    suite.check("align", || {
        let first = P::from_slice(&a[..]);
        let second = P::from_slice(&a[lanes..]);
        for k in 0..lanes {
            let got = first
                .align_dyn(second, k)
                .ok_or_else(|| format!("offset {} rejected", k))?;
            same_bits(got.to_array().as_ref(), &a[k..k + lanes])
                .map_err(|e| format!("offset {}: {}", k, e))?;
        }
        if first.align_dyn(second, lanes).is_some() {
            return Err(format!("offset {} accepted", lanes));
        }
        Ok(())
    });

    #[cfg(target_feature = "fma")]
    suite.check("mul_add", || {
        for ((x, y), z) in a
            .chunks_exact(lanes)
            .zip(b.chunks_exact(lanes))
            .zip(c.chunks_exact(lanes))
        {
            let got = P::from_slice(x).mul_add(P::from_slice(y), P::from_slice(z)).to_array();
            let want: Vec<P::Scalar> = (0..lanes).map(|i| x[i].fused_mul_add(y[i], z[i])).collect();
            same_bits(got.as_ref(), &want)?;
        }
        Ok(())
    });
    #[cfg(not(target_feature = "fma"))]
    let _ = &c;

    let passed = suite.checks.iter().all(|c| c.passed);
    SuiteReport {
        packet: short_type_name::<P>().to_string(),
        lanes,
        passed,
        checks: suite.checks,
    }
}

/// Run the suite for both float packets of provider `V`.
pub fn run_provider<V>(config: &SelfTestConfig) -> Vec<SuiteReport>
where
    V: Provider,
    V::F32: Realign,
    V::F64: Realign,
{
    vec![run::<V::F32>(config), run::<V::F64>(config)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xorshift_is_deterministic_and_bounded() {
        let mut r1 = XorShift64::new(7);
        let mut r2 = XorShift64::new(7);
        for _ in 0..1000 {
            let x = r1.next_sample();
            assert_eq!(x, r2.next_sample());
            assert!((0.5..4.0).contains(&x.abs()), "{}", x);
        }
        assert_ne!(XorShift64::new(0).next_u64(), 0);
    }

    #[test]
    fn neumaier_recovers_cancelled_terms() {
        assert_eq!(neumaier([1e16, 1.0, -1e16]), 1.0);
        assert_eq!(neumaier([]), 0.0);
    }

    #[test]
    fn check_names_are_unique() {
        let mut names = CHECKS.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), CHECKS.len());
    }

    #[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
    mod avx {
        use super::super::*;
        use crate::avx::{Avx, F32x8, F64x4};

        #[test_log::test]
        fn every_check_passes_for_both_widths() {
            let reports = run_provider::<Avx>(&SelfTestConfig::default());
            assert_eq!(reports.len(), 2);
            for report in &reports {
                let failed: Vec<_> = report.failures().collect();
                assert!(failed.is_empty(), "{}: {:?}", report.packet, failed);
                let expected = CHECKS.len() - usize::from(!cfg!(target_feature = "fma"));
                assert_eq!(report.checks.len(), expected);
            }
            assert_eq!(reports[0].packet, "F32x8");
            assert_eq!(reports[1].packet, "F64x4");
        }

        #[test]
        fn check_filter_and_odd_lengths() {
            let config = SelfTestConfig {
                length: 3,
                seed: 42,
                checks: vec!["align".into(), "reduce_sum".into()],
                ..SelfTestConfig::default()
            };
            let report = run::<F32x8>(&config);
            let names: Vec<_> = report.checks.iter().map(|c| c.name).collect();
            assert_eq!(names, ["reduce_sum", "align"]);
            assert!(report.passed);
        }

        #[test]
        fn align_dyn_rejects_out_of_range_offsets() {
            let p = F64x4::splat(1.0);
            assert!(p.align_dyn(p, 3).is_some());
            assert!(p.align_dyn(p, 4).is_none());
            let q = F32x8::splat(1.0);
            assert!(q.align_dyn(q, 8).is_none());
        }
    }
}
