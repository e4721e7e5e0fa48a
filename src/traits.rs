//! Compile-time packet descriptors.
//!
//! Generic kernel code never names a concrete packet type. It asks the
//! scalar for one:
//!
//! - [`PacketTraits`] maps a scalar (`f32`, `f64`, `i32`) to its packet type,
//!   lane count, alignment requirement and [`Capabilities`].
//! - [`Unpacket`] is the reverse lookup, from a packet back to its scalar and
//!   lane count.
//!
//! Both are resolved statically; [`PacketInfo`] is a serialisable snapshot of
//! the same information for reports.

use bitflags::bitflags;
use core::fmt::Debug;
use core::ops::{Add, Div, Mul, Neg, Sub};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Capability flags carried by a scalar's packet binding.
    ///
    /// Callers check these before reaching for an optional primitive. There is
    /// no software fallback inside a provider.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        /// The scalar has a multi-lane packet.
        const VECTORIZABLE      = 1 << 0;
        /// Aligned loads are valid on any scalar-aligned address of an aligned array.
        const ALIGNED_ON_SCALAR = 1 << 1;
        /// Lane-wise division is available.
        const DIV               = 1 << 2;
        /// Single-rounding `a * b + c` is available.
        const FMA               = 1 << 3;
        const SIN               = 1 << 4;
        const COS               = 1 << 5;
        const LOG               = 1 << 6;
        const EXP               = 1 << 7;
        const SQRT              = 1 << 8;
    }
}

/// Reverse lookup: packet type → scalar type and lane count.
pub trait Unpacket: Copy {
    /// Element type of one lane.
    type Scalar: Copy;
    /// Number of lanes.
    const SIZE: usize;
}

/// Forward lookup: scalar type → packet binding.
pub trait PacketTraits: Copy + Sized + 'static {
    /// Packet type the kernel layer instantiates for this scalar.
    type Packet: Unpacket<Scalar = Self>;
    /// Lane count of [`Self::Packet`].
    const SIZE: usize;
    /// Alignment, in bytes, required by aligned loads and stores.
    const ALIGNMENT: usize;
    /// Capability flags.
    const CAPABILITIES: Capabilities;

    const VECTORIZABLE: bool = Self::CAPABILITIES.contains(Capabilities::VECTORIZABLE);
    const HAS_DIV: bool = Self::CAPABILITIES.contains(Capabilities::DIV);
    const HAS_FMA: bool = Self::CAPABILITIES.contains(Capabilities::FMA);
}

// Scalars are their own single-lane packet. This is the binding a scalar gets
// when no provider enables it.
macro_rules! impl_scalar_unpacket {
    ($($t:ty),*) => {
        $(
            impl Unpacket for $t {
                type Scalar = $t;
                const SIZE: usize = 1;
            }
        )*
    };
}

impl_scalar_unpacket!(f32, f64, i32);

/// `i32` is declared but not enabled: 256-bit integer arithmetic needs AVX2.
impl PacketTraits for i32 {
    type Packet = i32;
    const SIZE: usize = 1;
    const ALIGNMENT: usize = core::mem::align_of::<i32>();
    const CAPABILITIES: Capabilities = Capabilities::empty();
}

/// Floating-point lane type.
///
/// The packet protocol only needs `Copy`; kernels and the self-test also need
/// scalar arithmetic for heads, tails and reference values.
pub trait Real:
    Copy
    + Debug
    + Default
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;
    const EPSILON: Self;

    fn abs(self) -> Self;
    /// Correctly rounded `self * b + c`.
    fn fused_mul_add(self, b: Self, c: Self) -> Self;
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
    /// Bit pattern, zero-extended.
    fn to_raw_bits(self) -> u64;
    /// Inverse of [`Real::to_raw_bits`]; high bits beyond the width are ignored.
    fn from_raw_bits(bits: u64) -> Self;
}

impl Real for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const EPSILON: Self = f32::EPSILON;

    #[inline(always)]
    fn abs(self) -> Self {
        f32::abs(self)
    }

    #[inline(always)]
    fn fused_mul_add(self, b: Self, c: Self) -> Self {
        f32::mul_add(self, b, c)
    }

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline(always)]
    fn to_raw_bits(self) -> u64 {
        self.to_bits() as u64
    }

    #[inline(always)]
    fn from_raw_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl Real for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const EPSILON: Self = f64::EPSILON;

    #[inline(always)]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline(always)]
    fn fused_mul_add(self, b: Self, c: Self) -> Self {
        f64::mul_add(self, b, c)
    }

    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline(always)]
    fn to_raw_bits(self) -> u64 {
        self.to_bits()
    }

    #[inline(always)]
    fn from_raw_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

/// Serialisable snapshot of a scalar's packet binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketInfo {
    pub scalar: String,
    pub packet: String,
    pub lanes: usize,
    pub alignment: usize,
    pub capabilities: Capabilities,
}

impl PacketInfo {
    /// Describe the binding of scalar `T`.
    pub fn of<T: PacketTraits>() -> Self {
        Self {
            scalar: short_type_name::<T>().to_string(),
            packet: short_type_name::<T::Packet>().to_string(),
            lanes: T::SIZE,
            alignment: T::ALIGNMENT,
            capabilities: T::CAPABILITIES,
        }
    }
}

pub(crate) fn short_type_name<T>() -> &'static str {
    let full = core::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
