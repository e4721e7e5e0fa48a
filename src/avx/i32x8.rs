//! 8-lane `i32` register.
//!
//! Plain AVX only moves 256-bit integer data; arithmetic on it arrives with
//! AVX2. This type is the load/store/broadcast companion of [`F32x8`] and is
//! not the packet binding for `i32`.
//!
//! [`F32x8`]: super::F32x8

use crate::traits::Unpacket;
use core::arch::x86_64::*;
use core::fmt::{Debug, Formatter};
use core::ops::Div;

#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct I32x8(__m256i);

impl Default for I32x8 {
    fn default() -> Self {
        unsafe { Self(_mm256_setzero_si256()) }
    }
}

impl Debug for I32x8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "I32x8({:?})", self.to_array())
    }
}

impl Unpacket for I32x8 {
    type Scalar = i32;
    const SIZE: usize = 8;
}

impl I32x8 {
    pub const LANES: usize = 8;

    #[inline(always)]
    pub fn splat(value: i32) -> Self {
        unsafe { Self(_mm256_set1_epi32(value)) }
    }

    #[inline(always)]
    pub fn from_array(array: [i32; 8]) -> Self {
        unsafe { Self(_mm256_loadu_si256(array.as_ptr() as *const __m256i)) }
    }

    #[inline(always)]
    pub fn to_array(self) -> [i32; 8] {
        let mut arr = [0i32; 8];
        unsafe { _mm256_storeu_si256(arr.as_mut_ptr() as *mut __m256i, self.0) };
        arr
    }

    /// # Safety
    ///
    /// `ptr` must be valid for reads of 8 `i32` and aligned to 32 bytes.
    #[inline(always)]
    pub unsafe fn load_aligned(ptr: *const i32) -> Self {
        unsafe { Self(_mm256_load_si256(ptr as *const __m256i)) }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for reads of 8 `i32`.
    #[inline(always)]
    pub unsafe fn load_unaligned(ptr: *const i32) -> Self {
        unsafe { Self(_mm256_loadu_si256(ptr as *const __m256i)) }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of 8 `i32` and aligned to 32 bytes.
    #[inline(always)]
    pub unsafe fn store_aligned(self, ptr: *mut i32) {
        unsafe { _mm256_store_si256(ptr as *mut __m256i, self.0) }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for writes of 8 `i32`.
    #[inline(always)]
    pub unsafe fn store_unaligned(self, ptr: *mut i32) {
        unsafe { _mm256_storeu_si256(ptr as *mut __m256i, self.0) }
    }

    /// # Safety
    ///
    /// Same as [`I32x8::store_aligned`].
    #[inline(always)]
    pub unsafe fn store_splat(ptr: *mut i32, value: i32) {
        unsafe { Self::splat(value).store_aligned(ptr) }
    }

    #[inline(always)]
    pub fn prefetch(ptr: *const i32) {
        unsafe { _mm_prefetch::<_MM_HINT_T0>(ptr as *const i8) }
    }

    #[inline(always)]
    pub fn first(self) -> i32 {
        unsafe { _mm_cvtsi128_si32(_mm256_castsi256_si128(self.0)) }
    }

    #[inline(always)]
    pub fn conj(self) -> Self {
        self
    }

    #[inline(always)]
    pub fn from_raw(v: __m256i) -> Self {
        Self(v)
    }

    #[inline(always)]
    pub fn into_raw(self) -> __m256i {
        self.0
    }
}

/// Integer division has no AVX instruction. Debug builds trap; release builds
/// yield zero.
impl Div for I32x8 {
    type Output = Self;
    #[inline(always)]
    fn div(self, _rhs: Self) -> Self {
        debug_assert!(false, "packet integer division is not supported by AVX");
        Self::default()
    }
}
