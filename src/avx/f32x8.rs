//! 8-lane `f32` packet.

use super::AlignOffset;
use crate::packet::Packet;
use crate::traits::Unpacket;
use core::arch::x86_64::*;
use core::fmt::{Debug, Formatter};
use core::ops::*;

/// 8-lane f32 SIMD vector for AVX.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct F32x8(__m256);

impl Default for F32x8 {
    fn default() -> Self {
        unsafe { Self(_mm256_setzero_ps()) }
    }
}

impl Debug for F32x8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let arr = self.to_array();
        write!(f, "F32x8({:?})", arr)
    }
}

impl Unpacket for F32x8 {
    type Scalar = f32;
    const SIZE: usize = 8;
}

impl F32x8 {
    #[inline(always)]
    pub fn from_raw(v: __m256) -> Self {
        Self(v)
    }

    #[inline(always)]
    pub fn into_raw(self) -> __m256 {
        self.0
    }
}

// ============================================================================
// Shuffle helpers
// ============================================================================

/// Fold all eight lanes with `op`, pairing lanes `i` and `i + 4` first, then
/// adjacent pairs, then the two partial results:
/// `((a0∘a4)∘(a1∘a5)) ∘ ((a2∘a6)∘(a3∘a7))`.
///
/// `reduce_pairwise` reproduces this order exactly.
#[inline(always)]
fn fold<F>(a: __m256, op: F) -> f32
where
    F: Fn(__m128, __m128) -> __m128,
{
    unsafe {
        let lo = _mm256_castps256_ps128(a);
        let hi = _mm256_extractf128_ps::<1>(a);
        let q = op(lo, hi);
        let q = op(q, _mm_shuffle_ps::<0xB1>(q, q)); // _MM_SHUFFLE(2, 3, 0, 1)
        let q = op(q, _mm_movehl_ps(q, q));
        _mm_cvtss_f32(q)
    }
}

/// Min/max fold that skips NaN lanes after lane 0.
///
/// Matches a scalar scan `r = a[0]; if a[i] < r { r = a[i] }`: a NaN in lane
/// 0 is returned as is, any other NaN lane is ignored. NaN lanes are replaced
/// by `identity` (the op's neutral infinity) before the tree.
#[inline(always)]
fn fold_ordered<F>(a: __m256, identity: f32, op: F) -> f32
where
    F: Fn(__m128, __m128) -> __m128,
{
    unsafe {
        let lane0 = _mm_cvtss_f32(_mm256_castps256_ps128(a));
        if lane0.is_nan() {
            return lane0;
        }
        let nan = _mm256_cmp_ps::<_CMP_UNORD_Q>(a, a);
        fold(_mm256_blendv_ps(a, _mm256_set1_ps(identity), nan), op)
    }
}

// Per 128-bit half, shift the concatenation `a ++ b` down by 1, 2 or 3 lanes.
// AVX has no cross-half permute, so callers line the halves up first.

#[inline(always)]
fn shift_halves_1(a: __m256, b: __m256) -> __m256 {
    unsafe {
        // [a3, a3, b0, b0], _MM_SHUFFLE(0, 0, 3, 3)
        let t = _mm256_shuffle_ps::<0x0F>(a, b);
        // [a1, a2, a3, b0], _MM_SHUFFLE(2, 1, 2, 1)
        _mm256_shuffle_ps::<0x99>(a, t)
    }
}

#[inline(always)]
fn shift_halves_2(a: __m256, b: __m256) -> __m256 {
    // [a2, a3, b0, b1], _MM_SHUFFLE(1, 0, 3, 2)
    unsafe { _mm256_shuffle_ps::<0x4E>(a, b) }
}

#[inline(always)]
fn shift_halves_3(a: __m256, b: __m256) -> __m256 {
    unsafe {
        // [a3, a3, b0, b0], _MM_SHUFFLE(0, 0, 3, 3)
        let t = _mm256_shuffle_ps::<0x0F>(a, b);
        // [a3, b0, b1, b2], _MM_SHUFFLE(2, 1, 2, 0)
        _mm256_shuffle_ps::<0x98>(t, b)
    }
}

impl Packet for F32x8 {
    type Scalar = f32;
    type Array = [f32; 8];
    type Accumulators = [F32x8; 8];

    const LANES: usize = 8;
    const ALIGNMENT: usize = super::VECTOR_BYTES;

    #[inline(always)]
    fn splat(value: f32) -> Self {
        unsafe { Self(_mm256_set1_ps(value)) }
    }

    #[inline(always)]
    fn sequential(start: f32) -> Self {
        unsafe {
            // _mm256_set_ps args are in reverse order
            let offsets = _mm256_set_ps(7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0);
            Self(_mm256_add_ps(_mm256_set1_ps(start), offsets))
        }
    }

    #[inline(always)]
    fn from_array(array: [f32; 8]) -> Self {
        unsafe { Self(_mm256_loadu_ps(array.as_ptr())) }
    }

    #[inline(always)]
    fn to_array(self) -> [f32; 8] {
        let mut arr = [0.0f32; 8];
        unsafe { _mm256_storeu_ps(arr.as_mut_ptr(), self.0) };
        arr
    }

    #[inline(always)]
    fn min(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_min_ps(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_max_ps(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        // _mm256_andnot_ps(a, b) computes (!a) & b
        unsafe { Self(_mm256_andnot_ps(rhs.0, self.0)) }
    }

    #[cfg(target_feature = "fma")]
    #[inline(always)]
    fn mul_add(self, b: Self, c: Self) -> Self {
        unsafe { Self(_mm256_fmadd_ps(self.0, b.0, c.0)) }
    }

    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f32) -> Self {
        unsafe { Self(_mm256_load_ps(ptr)) }
    }

    #[inline(always)]
    unsafe fn load_unaligned(ptr: *const f32) -> Self {
        unsafe { Self(_mm256_loadu_ps(ptr)) }
    }

    #[inline(always)]
    unsafe fn load_dup(ptr: *const f32) -> Self {
        unsafe {
            // Only four scalars are read.
            let x = _mm_loadu_ps(ptr);
            let lo = _mm_unpacklo_ps(x, x); // a0 a0 a1 a1
            let hi = _mm_unpackhi_ps(x, x); // a2 a2 a3 a3
            Self(_mm256_set_m128(hi, lo))
        }
    }

    #[inline(always)]
    unsafe fn store_aligned(self, ptr: *mut f32) {
        unsafe { _mm256_store_ps(ptr, self.0) }
    }

    #[inline(always)]
    unsafe fn store_unaligned(self, ptr: *mut f32) {
        unsafe { _mm256_storeu_ps(ptr, self.0) }
    }

    #[inline(always)]
    fn prefetch(ptr: *const f32) {
        unsafe { _mm_prefetch::<_MM_HINT_T0>(ptr as *const i8) }
    }

    #[inline(always)]
    fn first(self) -> f32 {
        unsafe { _mm_cvtss_f32(_mm256_castps256_ps128(self.0)) }
    }

    #[inline(always)]
    fn reverse(self) -> Self {
        unsafe {
            // Reverse within each half, then swap the halves.
            let tmp = _mm256_permute_ps::<0x1b>(self.0);
            Self(_mm256_permute2f128_ps::<1>(tmp, tmp))
        }
    }

    #[inline(always)]
    fn abs(self) -> Self {
        unsafe {
            // Mask off sign bit (bit 31)
            let mask = _mm256_castsi256_ps(_mm256_set1_epi32(0x7FFF_FFFF));
            Self(_mm256_and_ps(self.0, mask))
        }
    }

    #[inline(always)]
    fn reduce_sum(self) -> f32 {
        fold(self.0, |a, b| unsafe { _mm_add_ps(a, b) })
    }

    #[inline(always)]
    fn reduce_product(self) -> f32 {
        fold(self.0, |a, b| unsafe { _mm_mul_ps(a, b) })
    }

    #[inline(always)]
    fn reduce_min(self) -> f32 {
        fold_ordered(self.0, f32::INFINITY, |a, b| unsafe { _mm_min_ps(a, b) })
    }

    #[inline(always)]
    fn reduce_max(self) -> f32 {
        fold_ordered(self.0, f32::NEG_INFINITY, |a, b| unsafe { _mm_max_ps(a, b) })
    }

    #[inline(always)]
    fn reduce_pairwise(vecs: [F32x8; 8]) -> Self {
        unsafe {
            // t_k = [lo(v_k) + hi(v_k) | lo(v_k+4) + hi(v_k+4)]
            let mut t = [_mm256_setzero_ps(); 4];
            for k in 0..4 {
                let a = vecs[k].0;
                let b = vecs[k + 4].0;
                let lows = _mm256_permute2f128_ps::<0x20>(a, b);
                let highs = _mm256_permute2f128_ps::<0x31>(a, b);
                t[k] = _mm256_add_ps(lows, highs);
            }
            // Adjacent pairs, then pairs of pairs. Each half now holds one
            // total per input packet: [v0 v1 v2 v3 | v4 v5 v6 v7].
            let h01 = _mm256_hadd_ps(t[0], t[1]);
            let h23 = _mm256_hadd_ps(t[2], t[3]);
            Self(_mm256_hadd_ps(h01, h23))
        }
    }

    #[inline(always)]
    fn align<const OFFSET: usize>(self, second: Self) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = AlignOffset::<OFFSET, 8>::VALID;
        if OFFSET == 0 {
            return self;
        }
        unsafe {
            // [f4..f7 | s0..s3]
            let mid = _mm256_permute2f128_ps::<0x21>(self.0, second.0);
            let (a, b) = if OFFSET < 4 {
                (self.0, mid)
            } else {
                (mid, second.0)
            };
            Self(match OFFSET % 4 {
                0 => a,
                1 => shift_halves_1(a, b),
                2 => shift_halves_2(a, b),
                _ => shift_halves_3(a, b),
            })
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

impl Add for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_add_ps(self.0, rhs.0)) }
    }
}

impl Sub for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_sub_ps(self.0, rhs.0)) }
    }
}

impl Mul for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_mul_ps(self.0, rhs.0)) }
    }
}

impl Div for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_div_ps(self.0, rhs.0)) }
    }
}

impl Neg for F32x8 {
    type Output = Self;
    /// `0 - x`: negating `+0.0` gives `+0.0`, not `-0.0`.
    #[inline(always)]
    fn neg(self) -> Self {
        unsafe { Self(_mm256_sub_ps(_mm256_setzero_ps(), self.0)) }
    }
}

impl BitAnd for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_and_ps(self.0, rhs.0)) }
    }
}

impl BitOr for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_or_ps(self.0, rhs.0)) }
    }
}

impl BitXor for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_xor_ps(self.0, rhs.0)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::Aligned32;

    const A: [f32; 8] = [1.0, -2.0, 3.0, -4.0, 5.0, -6.0, 7.0, -8.0];
    const B: [f32; 8] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];

    #[test]
    fn test_avx_f32_arithmetic() {
        let a = F32x8::from_array(A);
        let b = F32x8::from_array(B);
        let sum = (a + b).to_array();
        let diff = (b - a).to_array();
        let prod = (a * b).to_array();
        let quot = (b / a).to_array();
        for i in 0..8 {
            assert_eq!(sum[i], A[i] + B[i]);
            assert_eq!(diff[i], B[i] - A[i]);
            assert_eq!(prod[i], A[i] * B[i]);
            assert_eq!(quot[i], B[i] / A[i]);
        }
    }

    #[test]
    fn test_avx_f32_negate_is_subtraction_from_zero() {
        let out = (-F32x8::from_array(A)).to_array();
        for i in 0..8 {
            assert_eq!(out[i], -A[i]);
        }
        let zero = (-F32x8::splat(0.0)).first();
        assert_eq!(zero.to_bits(), 0.0f32.to_bits(), "0 - (+0) must stay +0");
    }

    #[test]
    fn test_avx_f32_sequential() {
        let seq = F32x8::sequential(10.0);
        assert_eq!(seq.to_array(), [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0]);
    }

    #[test]
    fn test_avx_f32_and_not_clears_rhs_bits() {
        let a = F32x8::splat(-3.5);
        let sign = F32x8::splat(-0.0);
        assert_eq!(a.and_not(sign).to_array(), [3.5; 8]);
    }

    #[test]
    fn test_avx_f32_load_dup() {
        let src = [1.0f32, 2.0, 3.0, 4.0];
        let p = F32x8::from_slice_dup(&src);
        assert_eq!(p.to_array(), [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_avx_f32_aligned_round_trip() {
        let src = Aligned32(A);
        let p = F32x8::load_aligned_from(&src);
        let mut dst = Aligned32([0.0f32; 8]);
        p.store_aligned_to(&mut dst);
        assert_eq!(dst.0, A);

        unsafe { F32x8::store_splat(dst.as_mut_ptr(), 2.5) };
        assert_eq!(dst.0, [2.5; 8]);
    }

    #[test]
    fn test_avx_f32_reverse_and_abs() {
        let a = F32x8::from_array(A);
        assert_eq!(a.reverse().to_array(), [-8.0, 7.0, -6.0, 5.0, -4.0, 3.0, -2.0, 1.0]);
        assert_eq!(a.abs().to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_avx_f32_reductions() {
        let a = F32x8::from_array(A);
        assert_eq!(a.reduce_sum(), -4.0);
        assert_eq!(a.reduce_product(), 40320.0);
        assert_eq!(a.reduce_min(), -8.0);
        assert_eq!(a.reduce_max(), 7.0);
        assert_eq!(a.first(), 1.0);
    }

    #[test]
    fn test_avx_f32_reduce_pairwise() {
        let mut vecs = [F32x8::default(); 8];
        for (i, v) in vecs.iter_mut().enumerate() {
            *v = F32x8::sequential(i as f32 * 0.37 - 1.0) * F32x8::splat(1.0 + i as f32);
        }
        let out = F32x8::reduce_pairwise(vecs).to_array();
        for i in 0..8 {
            assert_eq!(out[i].to_bits(), vecs[i].reduce_sum().to_bits(), "lane {}", i);
        }
    }

    #[test]
    fn test_avx_f32_align_every_offset() {
        let first = F32x8::sequential(0.0);
        let second = F32x8::sequential(8.0);
        let expect = |k: usize| -> [f32; 8] { core::array::from_fn(|i| (i + k) as f32) };
        assert_eq!(first.align::<0>(second).to_array(), expect(0));
        assert_eq!(first.align::<1>(second).to_array(), expect(1));
        assert_eq!(first.align::<2>(second).to_array(), expect(2));
        assert_eq!(first.align::<3>(second).to_array(), expect(3));
        assert_eq!(first.align::<4>(second).to_array(), expect(4));
        assert_eq!(first.align::<5>(second).to_array(), expect(5));
        assert_eq!(first.align::<6>(second).to_array(), expect(6));
        assert_eq!(first.align::<7>(second).to_array(), expect(7));
    }

    #[cfg(target_feature = "fma")]
    #[test]
    fn test_avx_f32_mul_add_single_rounding() {
        // (1 + 2^-12)^2 = 1 + 2^-11 + 2^-24. Rounding the product first
        // drops the 2^-24 tie, the fused form keeps it exactly.
        let x = 1.0f32 + 1.0 / 4096.0;
        let a = F32x8::splat(x);
        let c = F32x8::splat(-1.0);
        let fused = a.mul_add(a, c).first();
        assert_eq!(fused, x.mul_add(x, -1.0));
        assert_eq!(fused, 1.0 / 2048.0 + 1.0 / 16_777_216.0);
        assert_ne!(fused, x * x - 1.0);
    }

    #[test]
    fn test_avx_f32_min_max_reduction_skips_nan_lanes() {
        let base = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        for lane in 1..8 {
            let mut x = base;
            x[lane] = f32::NAN;
            let p = F32x8::from_array(x);
            let hi = if lane == 7 { 7.0 } else { 8.0 };
            assert_eq!(p.reduce_min(), 1.0, "NaN in lane {}", lane);
            assert_eq!(p.reduce_max(), hi, "NaN in lane {}", lane);
        }

        // Lane 0 seeds the scan, so a NaN there is the result.
        let mut x = base;
        x[0] = f32::NAN;
        assert!(F32x8::from_array(x).reduce_min().is_nan());
        assert!(F32x8::from_array(x).reduce_max().is_nan());

        let mut x = [f32::NAN; 8];
        x[0] = -3.0;
        assert_eq!(F32x8::from_array(x).reduce_min(), -3.0);
        assert_eq!(F32x8::from_array(x).reduce_max(), -3.0);

        let all_nan = F32x8::splat(f32::NAN);
        assert!(all_nan.reduce_min().is_nan());
        assert!(all_nan.reduce_max().is_nan());
    }

    #[test]
    #[should_panic]
    fn test_avx_f32_store_panic() {
        let a = F32x8::default();
        let mut out = [0.0; 7]; // Too small
        a.store(&mut out);
    }
}
