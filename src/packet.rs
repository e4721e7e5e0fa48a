//! The packet protocol.
//!
//! Every provider (one instruction set, one register width) implements
//! [`Packet`] for each of its floating-point packet types. Generic kernels are
//! written against the trait and monomorphised per packet type, so each call
//! lowers to the provider's instruction sequence with no runtime dispatch.
//!
//! # Layers
//!
//! - **Elementwise**: operator impls (`+ - * / -x & | ^`) plus [`Packet::min`],
//!   [`Packet::max`], [`Packet::and_not`], [`Packet::conj`] and, under the
//!   `fma` target feature, [`Packet::mul_add`].
//! - **Memory**: aligned / unaligned loads and stores, broadcast-duplicate
//!   load, broadcast store, prefetch, first lane.
//! - **Shuffles**: reverse, abs, horizontal reductions, pairwise reduction of
//!   `LANES` packets and realignment by a compile-time offset.

use crate::align::Aligned32;
use crate::traits::Real;
use core::fmt::Debug;
use core::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Sub};

/// Operations every floating-point packet supports.
pub trait Packet:
    Copy
    + Debug
    + Default
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
{
    /// Lane type.
    type Scalar: Real;
    /// `[Scalar; LANES]`.
    type Array: Copy + Default + Debug + AsRef<[Self::Scalar]> + AsMut<[Self::Scalar]>;
    /// `[Self; LANES]`, the input of [`Packet::reduce_pairwise`].
    type Accumulators: Copy + Default + AsRef<[Self]> + AsMut<[Self]>;

    /// Number of lanes.
    const LANES: usize;
    /// Required alignment, in bytes, of aligned loads and stores.
    const ALIGNMENT: usize;

    // =========================================================================
    // Construction
    // =========================================================================

    /// Broadcast `value` to every lane.
    fn splat(value: Self::Scalar) -> Self;

    /// `[start, start + 1, ..., start + LANES - 1]`.
    fn sequential(start: Self::Scalar) -> Self;

    fn from_array(array: Self::Array) -> Self;

    fn to_array(self) -> Self::Array;

    // =========================================================================
    // Elementwise
    // =========================================================================

    /// Lane-wise minimum with the hardware convention: `if a < b { a } else { b }`,
    /// so a NaN in either lane yields the second operand.
    fn min(self, rhs: Self) -> Self;

    /// Lane-wise maximum: `if a > b { a } else { b }`.
    fn max(self, rhs: Self) -> Self;

    /// `self & !rhs`, bitwise.
    fn and_not(self, rhs: Self) -> Self;

    /// Complex conjugate. Identity for real lanes.
    #[inline(always)]
    fn conj(self) -> Self {
        self
    }

    /// `self * b + c` with a single rounding.
    #[cfg(target_feature = "fma")]
    fn mul_add(self, b: Self, c: Self) -> Self;

    // =========================================================================
    // Memory
    // =========================================================================

    /// Load `LANES` scalars from an aligned address.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `LANES` scalars and aligned to
    /// [`Self::ALIGNMENT`] bytes. Misalignment is not checked.
    unsafe fn load_aligned(ptr: *const Self::Scalar) -> Self;

    /// Load `LANES` scalars from any address.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `LANES` scalars.
    unsafe fn load_unaligned(ptr: *const Self::Scalar) -> Self;

    /// Load `LANES / 2` scalars and duplicate each one into two adjacent lanes:
    /// scalar `i` lands in lanes `2i` and `2i + 1`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `LANES / 2` scalars.
    unsafe fn load_dup(ptr: *const Self::Scalar) -> Self;

    /// Store all lanes to an aligned address.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `LANES` scalars and aligned to
    /// [`Self::ALIGNMENT`] bytes.
    unsafe fn store_aligned(self, ptr: *mut Self::Scalar);

    /// Store all lanes to any address.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `LANES` scalars.
    unsafe fn store_unaligned(self, ptr: *mut Self::Scalar);

    /// Write `value` to all `LANES` slots at an aligned address.
    ///
    /// # Safety
    ///
    /// Same as [`Packet::store_aligned`].
    #[inline(always)]
    unsafe fn store_splat(ptr: *mut Self::Scalar, value: Self::Scalar) {
        Self::splat(value).store_aligned(ptr)
    }

    /// Hint that `ptr` will be read soon. Never faults, may be a no-op.
    fn prefetch(ptr: *const Self::Scalar);

    /// Lane 0.
    fn first(self) -> Self::Scalar;

    /// Load from the front of `slice`.
    ///
    /// # Panics
    ///
    /// Panics if `slice.len() < LANES`.
    #[inline(always)]
    fn from_slice(slice: &[Self::Scalar]) -> Self {
        assert!(slice.len() >= Self::LANES);
        unsafe { Self::load_unaligned(slice.as_ptr()) }
    }

    /// Broadcast-duplicate load from the front of `slice`.
    ///
    /// # Panics
    ///
    /// Panics if `slice.len() < LANES / 2`.
    #[inline(always)]
    fn from_slice_dup(slice: &[Self::Scalar]) -> Self {
        assert!(slice.len() >= Self::LANES / 2);
        unsafe { Self::load_dup(slice.as_ptr()) }
    }

    /// Store to the front of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() < LANES`.
    #[inline(always)]
    fn store(&self, out: &mut [Self::Scalar]) {
        assert!(out.len() >= Self::LANES);
        unsafe { self.store_unaligned(out.as_mut_ptr()) }
    }

    /// Aligned load from storage that is aligned by construction.
    #[inline(always)]
    fn load_aligned_from(src: &Aligned32<Self::Array>) -> Self {
        debug_assert!(Self::ALIGNMENT <= core::mem::align_of::<Aligned32<Self::Array>>());
        let array: &Self::Array = src;
        unsafe { Self::load_aligned(array.as_ref().as_ptr()) }
    }

    /// Aligned store into storage that is aligned by construction.
    #[inline(always)]
    fn store_aligned_to(&self, dst: &mut Aligned32<Self::Array>) {
        debug_assert!(Self::ALIGNMENT <= core::mem::align_of::<Aligned32<Self::Array>>());
        let array: &mut Self::Array = dst;
        unsafe { self.store_aligned(array.as_mut().as_mut_ptr()) }
    }

    // =========================================================================
    // Shuffles and reductions
    // =========================================================================

    /// Lane order inverted: lane `i` becomes lane `LANES - 1 - i`.
    fn reverse(self) -> Self;

    /// Lane-wise absolute value (sign bit cleared).
    fn abs(self) -> Self;

    /// Sum of all lanes, combined as a balanced tree.
    fn reduce_sum(self) -> Self::Scalar;

    /// Product of all lanes, combined as a balanced tree.
    fn reduce_product(self) -> Self::Scalar;

    /// Minimum lane, using the [`Packet::min`] convention at each step.
    fn reduce_min(self) -> Self::Scalar;

    /// Maximum lane, using the [`Packet::max`] convention at each step.
    fn reduce_max(self) -> Self::Scalar;

    /// Lane `i` of the result is `vecs[i].reduce_sum()`, bit for bit.
    fn reduce_pairwise(vecs: Self::Accumulators) -> Self;

    /// Shift the concatenation `self ++ second` down by `OFFSET` lanes:
    /// lane `i` is `self[i + OFFSET]` for `i < LANES - OFFSET`, else
    /// `second[i + OFFSET - LANES]`.
    ///
    /// `OFFSET == 0` returns `self`. `OFFSET >= LANES` fails to compile.
    fn align<const OFFSET: usize>(self, second: Self) -> Self;
}

/// One instruction set's set of packet types.
pub trait Provider: 'static + Copy + Clone + Send + Sync + Debug {
    /// Short identifier, e.g. `"avx"`.
    const NAME: &'static str;
    /// Register width in bytes.
    const VECTOR_BYTES: usize;

    type F32: Packet<Scalar = f32>;
    type F64: Packet<Scalar = f64>;
}
