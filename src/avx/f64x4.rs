//! 4-lane `f64` packet.

use super::AlignOffset;
use crate::packet::Packet;
use crate::traits::Unpacket;
use core::arch::x86_64::*;
use core::fmt::{Debug, Formatter};
use core::ops::*;

/// 4-lane f64 SIMD vector for AVX.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct F64x4(__m256d);

impl Default for F64x4 {
    fn default() -> Self {
        unsafe { Self(_mm256_setzero_pd()) }
    }
}

impl Debug for F64x4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "F64x4({:?})", self.to_array())
    }
}

impl Unpacket for F64x4 {
    type Scalar = f64;
    const SIZE: usize = 4;
}

impl F64x4 {
    #[inline(always)]
    pub fn from_raw(v: __m256d) -> Self {
        Self(v)
    }

    #[inline(always)]
    pub fn into_raw(self) -> __m256d {
        self.0
    }
}

/// `(a0∘a2) ∘ (a1∘a3)`, the order `reduce_pairwise` reproduces.
#[inline(always)]
fn fold<F>(a: __m256d, op: F) -> f64
where
    F: Fn(__m128d, __m128d) -> __m128d,
{
    unsafe {
        let lo = _mm256_castpd256_pd128(a);
        let hi = _mm256_extractf128_pd::<1>(a);
        let q = op(lo, hi);
        let q = op(q, _mm_unpackhi_pd(q, q));
        _mm_cvtsd_f64(q)
    }
}

/// NaN-skipping min/max fold; same contract as the `f32` version.
#[inline(always)]
fn fold_ordered<F>(a: __m256d, identity: f64, op: F) -> f64
where
    F: Fn(__m128d, __m128d) -> __m128d,
{
    unsafe {
        let lane0 = _mm_cvtsd_f64(_mm256_castpd256_pd128(a));
        if lane0.is_nan() {
            return lane0;
        }
        let nan = _mm256_cmp_pd::<_CMP_UNORD_Q>(a, a);
        fold(_mm256_blendv_pd(a, _mm256_set1_pd(identity), nan), op)
    }
}

impl Packet for F64x4 {
    type Scalar = f64;
    type Array = [f64; 4];
    type Accumulators = [F64x4; 4];

    const LANES: usize = 4;
    const ALIGNMENT: usize = super::VECTOR_BYTES;

    #[inline(always)]
    fn splat(value: f64) -> Self {
        unsafe { Self(_mm256_set1_pd(value)) }
    }

    #[inline(always)]
    fn sequential(start: f64) -> Self {
        unsafe {
            let offsets = _mm256_set_pd(3.0, 2.0, 1.0, 0.0);
            Self(_mm256_add_pd(_mm256_set1_pd(start), offsets))
        }
    }

    #[inline(always)]
    fn from_array(array: [f64; 4]) -> Self {
        unsafe { Self(_mm256_loadu_pd(array.as_ptr())) }
    }

    #[inline(always)]
    fn to_array(self) -> [f64; 4] {
        let mut arr = [0.0f64; 4];
        unsafe { _mm256_storeu_pd(arr.as_mut_ptr(), self.0) };
        arr
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_min_pd(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_max_pd(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_andnot_pd(rhs.0, self.0)) }
    }

    #[cfg(target_feature = "fma")]
    #[inline(always)]
    fn mul_add(self, b: Self, c: Self) -> Self {
        unsafe { Self(_mm256_fmadd_pd(self.0, b.0, c.0)) }
    }

    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f64) -> Self {
        unsafe { Self(_mm256_load_pd(ptr)) }
    }

    #[inline(always)]
    unsafe fn load_unaligned(ptr: *const f64) -> Self {
        unsafe { Self(_mm256_loadu_pd(ptr)) }
    }

    #[inline(always)]
    unsafe fn load_dup(ptr: *const f64) -> Self {
        unsafe {
            let x = _mm_loadu_pd(ptr);
            let lo = _mm_unpacklo_pd(x, x); // a0 a0
            let hi = _mm_unpackhi_pd(x, x); // a1 a1
            Self(_mm256_set_m128d(hi, lo))
        }
    }

    #[inline(always)]
    unsafe fn store_aligned(self, ptr: *mut f64) {
        unsafe { _mm256_store_pd(ptr, self.0) }
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, ptr: *mut f64) {
        unsafe { _mm256_storeu_pd(ptr, self.0) }
    }

    #[inline(always)]
    fn prefetch(ptr: *const f64) {
        unsafe { _mm_prefetch::<_MM_HINT_T0>(ptr as *const i8) }
    }

    #[inline(always)]
    fn first(self) -> f64 {
        unsafe { _mm_cvtsd_f64(_mm256_castpd256_pd128(self.0)) }
    }

    #[inline(always)]
    fn reverse(self) -> Self {
        unsafe {
            // Swap within each half, then swap the halves.
            let tmp = _mm256_shuffle_pd::<5>(self.0, self.0);
            Self(_mm256_permute2f128_pd::<1>(tmp, tmp))
        }
    }

    #[inline(always)]
    fn abs(self) -> Self {
        unsafe {
            let mask = _mm256_castsi256_pd(_mm256_set1_epi64x(0x7FFF_FFFF_FFFF_FFFF));
            Self(_mm256_and_pd(self.0, mask))
        }
    }

    #[inline(always)]
    fn reduce_sum(self) -> f64 {
        fold(self.0, |a, b| unsafe { _mm_add_pd(a, b) })
    }

    #[inline(always)]
    fn reduce_product(self) -> f64 {
        fold(self.0, |a, b| unsafe { _mm_mul_pd(a, b) })
    }

    #[inline(always)]
    fn reduce_min(self) -> f64 {
        fold_ordered(self.0, f64::INFINITY, |a, b| unsafe { _mm_min_pd(a, b) })
    }

    #[inline(always)]
    fn reduce_max(self) -> f64 {
        fold_ordered(self.0, f64::NEG_INFINITY, |a, b| unsafe { _mm_max_pd(a, b) })
    }

    #[inline(always)]
    fn reduce_pairwise(vecs: [F64x4; 4]) -> Self {
        unsafe {
            // t0 = [v0_0 + v0_2, v0_1 + v0_3 | v2_0 + v2_2, v2_1 + v2_3]
            let t0 = _mm256_add_pd(
                _mm256_permute2f128_pd::<0x20>(vecs[0].0, vecs[2].0),
                _mm256_permute2f128_pd::<0x31>(vecs[0].0, vecs[2].0),
            );
            let t1 = _mm256_add_pd(
                _mm256_permute2f128_pd::<0x20>(vecs[1].0, vecs[3].0),
                _mm256_permute2f128_pd::<0x31>(vecs[1].0, vecs[3].0),
            );
            Self(_mm256_hadd_pd(t0, t1))
        }
    }

    #[inline(always)]
    fn align<const OFFSET: usize>(self, second: Self) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = AlignOffset::<OFFSET, 4>::VALID;
        if OFFSET == 0 {
            return self;
        }
        unsafe {
            // [f2 f3 | s0 s1]
            let mid = _mm256_permute2f128_pd::<0x21>(self.0, second.0);
            let (a, b) = if OFFSET < 2 {
                (self.0, mid)
            } else {
                (mid, second.0)
            };
            if OFFSET % 2 == 0 {
                Self(a)
            } else {
                // Per half: [a1, b0]
                Self(_mm256_shuffle_pd::<5>(a, b))
            }
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

impl Add for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_add_pd(self.0, rhs.0)) }
    }
}

impl Sub for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_sub_pd(self.0, rhs.0)) }
    }
}

impl Mul for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_mul_pd(self.0, rhs.0)) }
    }
}

impl Div for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_div_pd(self.0, rhs.0)) }
    }
}

impl Neg for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        unsafe { Self(_mm256_sub_pd(_mm256_setzero_pd(), self.0)) }
    }
}

impl BitAnd for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_and_pd(self.0, rhs.0)) }
    }
}

impl BitOr for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_or_pd(self.0, rhs.0)) }
    }
}

impl BitXor for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_xor_pd(self.0, rhs.0)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avx_f64_arithmetic_and_negate() {
        let a = F64x4::from_array([1.5, -2.0, 0.0, 8.0]);
        let b = F64x4::splat(2.0);
        assert_eq!((a + b).to_array(), [3.5, 0.0, 2.0, 10.0]);
        assert_eq!((a - b).to_array(), [-0.5, -4.0, -2.0, 6.0]);
        assert_eq!((a * b).to_array(), [3.0, -4.0, 0.0, 16.0]);
        assert_eq!((a / b).to_array(), [0.75, -1.0, 0.0, 4.0]);

        let neg = (-a).to_array();
        assert_eq!(neg, [-1.5, 2.0, 0.0, -8.0]);
        assert!(neg[2].is_sign_positive());
    }

    #[test]
    fn test_avx_f64_min_max_follow_hardware_convention() {
        let a = F64x4::from_array([1.0, f64::NAN, 3.0, -0.0]);
        let b = F64x4::from_array([2.0, 5.0, f64::NAN, 0.0]);
        let lo = a.min(b).to_array();
        assert_eq!(lo[0], 1.0);
        // NaN in either operand selects the second operand.
        assert_eq!(lo[1], 5.0);
        assert!(lo[2].is_nan());
        assert!(lo[3].is_sign_positive());
        let hi = a.max(b).to_array();
        assert_eq!(hi[0], 2.0);
        assert_eq!(hi[1], 5.0);
    }

    #[test]
    fn test_avx_f64_min_max_reduction_skips_nan_lanes() {
        for lane in 1..4 {
            let mut x = [1.0f64, 2.0, 3.0, 4.0];
            x[lane] = f64::NAN;
            let p = F64x4::from_array(x);
            let hi = if lane == 3 { 3.0 } else { 4.0 };
            assert_eq!(p.reduce_min(), 1.0, "NaN in lane {}", lane);
            assert_eq!(p.reduce_max(), hi, "NaN in lane {}", lane);
        }

        let p = F64x4::from_array([f64::NAN, 2.0, 3.0, 4.0]);
        assert!(p.reduce_min().is_nan());
        assert!(p.reduce_max().is_nan());

        let p = F64x4::from_array([5.0, f64::NAN, f64::NAN, f64::NAN]);
        assert_eq!(p.reduce_min(), 5.0);
        assert_eq!(p.reduce_max(), 5.0);
    }

    #[test]
    fn test_avx_f64_memory() {
        let p = F64x4::from_slice_dup(&[7.0, 9.0]);
        assert_eq!(p.to_array(), [7.0, 7.0, 9.0, 9.0]);

        let src = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(F64x4::from_slice(&src[1..]).to_array(), [1.0, 2.0, 3.0, 4.0]);

        let mut out = [0.0; 5];
        F64x4::sequential(-1.0).store(&mut out[1..]);
        assert_eq!(out, [0.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(F64x4::sequential(-1.0).first(), -1.0);
    }

    #[test]
    fn test_avx_f64_shuffles() {
        let a = F64x4::from_array([-1.0, 2.0, -3.0, 4.0]);
        assert_eq!(a.reverse().to_array(), [4.0, -3.0, 2.0, -1.0]);
        assert_eq!(a.reverse().reverse().to_array(), a.to_array());
        assert_eq!(a.abs().to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.reduce_sum(), 2.0);
        assert_eq!(a.reduce_product(), 24.0);
        assert_eq!(a.reduce_min(), -3.0);
        assert_eq!(a.reduce_max(), 4.0);
    }

    #[test]
    fn test_avx_f64_reduce_pairwise() {
        let vecs = [
            F64x4::from_array([1.0, 2.0, 3.0, 4.0]),
            F64x4::from_array([0.1, 0.2, 0.3, 0.4]),
            F64x4::from_array([1e16, 1.0, -1e16, 1.0]),
            F64x4::from_array([-5.0, 0.25, 5.5, 1e-3]),
        ];
        let out = F64x4::reduce_pairwise(vecs).to_array();
        for i in 0..4 {
            assert_eq!(out[i].to_bits(), vecs[i].reduce_sum().to_bits(), "lane {}", i);
        }
    }

    #[test]
    fn test_avx_f64_align_every_offset() {
        let first = F64x4::sequential(0.0);
        let second = F64x4::sequential(4.0);
        assert_eq!(first.align::<0>(second).to_array(), [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(first.align::<1>(second).to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(first.align::<2>(second).to_array(), [2.0, 3.0, 4.0, 5.0]);
        assert_eq!(first.align::<3>(second).to_array(), [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_avx_f64_and_not_and_bitwise() {
        let a = F64x4::splat(-2.0);
        let sign = F64x4::splat(-0.0);
        assert_eq!(a.and_not(sign).to_array(), [2.0; 4]);
        assert_eq!((a ^ sign).to_array(), [2.0; 4]);
        assert_eq!((F64x4::splat(2.0) | sign).to_array(), [-2.0; 4]);
        assert_eq!((a & sign).to_array(), [-0.0; 4]);
    }
}
