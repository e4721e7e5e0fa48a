//! Storage that satisfies the aligned load/store precondition by construction.
//!
//! Aligned packet loads and stores are undefined behaviour on a misaligned
//! address and are never checked at runtime. Wrapping the backing array in
//! [`Aligned32`] moves that obligation into the type system, so the safe
//! `load_aligned_from` / `store_aligned_to` entry points can skip the check.

use core::ops::{Deref, DerefMut};

/// Alignment of one 256-bit register, in bytes.
pub const ALIGN_32: usize = 32;

/// A value stored at a 32-byte aligned address.
///
/// `Aligned32<[f32; 8]>` and `Aligned32<[f64; 4]>` are exactly one AVX register
/// wide; larger arrays work too, each 32-byte chunk starting on a boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(C, align(32))]
pub struct Aligned32<T>(pub T);

impl<T> Aligned32<T> {
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Aligned32<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Aligned32<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// Number of leading elements of `data` to skip before the first element whose
/// address is a multiple of `alignment`. Saturates at `data.len()`.
///
/// `alignment` must be a power of two.
#[inline]
pub fn first_aligned<S>(data: &[S], alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    let size = core::mem::size_of::<S>();
    let addr = data.as_ptr() as usize;
    let misalign = addr & (alignment - 1);
    if misalign == 0 {
        return 0;
    }
    if size == 0 || misalign % size != 0 {
        // Element boundaries never meet the alignment boundary.
        return data.len();
    }
    ((alignment - misalign) / size).min(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned32_has_register_alignment() {
        assert_eq!(core::mem::align_of::<Aligned32<[f32; 8]>>(), ALIGN_32);
        assert_eq!(core::mem::size_of::<Aligned32<[f32; 8]>>(), 32);
        assert_eq!(core::mem::size_of::<Aligned32<[f64; 4]>>(), 32);

        let buf = Aligned32([0.0f32; 8]);
        assert_eq!(buf.as_ptr() as usize % ALIGN_32, 0);
    }

    #[test]
    fn first_aligned_counts_to_next_boundary() {
        let buf = Aligned32([0.0f32; 16]);
        assert_eq!(first_aligned(&buf[..], ALIGN_32), 0);
        assert_eq!(first_aligned(&buf[1..], ALIGN_32), 7);
        assert_eq!(first_aligned(&buf[5..], ALIGN_32), 3);
        assert_eq!(first_aligned(&buf[8..], ALIGN_32), 0);
    }

    #[test]
    fn first_aligned_saturates_on_short_slices() {
        let buf = Aligned32([0.0f64; 8]);
        assert_eq!(first_aligned(&buf[1..2], ALIGN_32), 1);
        assert_eq!(first_aligned(&buf[1..], ALIGN_32), 3);
        assert_eq!(first_aligned::<f64>(&[], ALIGN_32), 0);
    }
}
