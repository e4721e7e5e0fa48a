//! AVX provider: 256-bit packets of 8 × `f32` and 4 × `f64`.
//!
//! Compiled only when the build enables `target_feature = "avx"`. The fused
//! multiply-add primitive additionally needs `target_feature = "fma"`.
//!
//! | Scalar | Packet    | Lanes | Alignment |
//! |--------|-----------|-------|-----------|
//! | `f32`  | [`F32x8`] | 8     | 32        |
//! | `f64`  | [`F64x4`] | 4     | 32        |
//! | `i32`  | scalar    | 1     | 4         |
//!
//! [`I32x8`] exists as the integer companion register (load, store, broadcast)
//! but `i32` is not bound to it: AVX has no 256-bit integer arithmetic.

mod f32x8;
mod f64x4;
mod i32x8;

pub use f32x8::F32x8;
pub use f64x4::F64x4;
pub use i32x8::I32x8;

use crate::packet::Provider;
use crate::traits::{Capabilities, PacketTraits};

/// Width of one YMM register in bytes.
pub const VECTOR_BYTES: usize = 32;

/// AVX provider marker.
#[derive(Copy, Clone, Debug, Default)]
pub struct Avx;

impl Provider for Avx {
    const NAME: &'static str = "avx";
    const VECTOR_BYTES: usize = VECTOR_BYTES;
    type F32 = F32x8;
    type F64 = F64x4;
}

const FMA_CAPABILITY: Capabilities = if cfg!(target_feature = "fma") {
    Capabilities::FMA
} else {
    Capabilities::empty()
};

/// Division is native for both widths; no transcendental is provided at this width.
const FLOAT_CAPABILITIES: Capabilities = Capabilities::VECTORIZABLE
    .union(Capabilities::ALIGNED_ON_SCALAR)
    .union(Capabilities::DIV)
    .union(FMA_CAPABILITY);

impl PacketTraits for f32 {
    type Packet = F32x8;
    const SIZE: usize = 8;
    const ALIGNMENT: usize = VECTOR_BYTES;
    const CAPABILITIES: Capabilities = FLOAT_CAPABILITIES;
}

impl PacketTraits for f64 {
    type Packet = F64x4;
    const SIZE: usize = 4;
    const ALIGNMENT: usize = VECTOR_BYTES;
    const CAPABILITIES: Capabilities = FLOAT_CAPABILITIES;
}

/// Compile-time guard for [`Packet::align`](crate::packet::Packet::align).
///
/// Referencing `VALID` from a monomorphised call site fails the build when
/// `OFFSET >= LANES`.
pub(crate) struct AlignOffset<const OFFSET: usize, const LANES: usize>;

impl<const OFFSET: usize, const LANES: usize> AlignOffset<OFFSET, LANES> {
    pub(crate) const VALID: () = assert!(
        OFFSET < LANES,
        "realignment offset must be smaller than the lane count"
    );
}
