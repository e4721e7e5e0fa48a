//! Fixed-width SIMD packets for generic numeric kernels.
//!
//! A *packet* is one vector register viewed as `LANES` scalars. Kernels are
//! written once against the [`Packet`] trait and instantiated per scalar type
//! through [`PacketTraits`]; the provider compiled in decides which
//! instructions they lower to.
//!
//! This crate carries the 256-bit AVX provider ([`avx`]), present when the
//! build enables `target_feature = "avx"`:
//!
//! ```ignore
//! use packetmath::{avx::F32x8, Packet};
//!
//! let a = F32x8::sequential(1.0);
//! assert_eq!(a.reduce_sum(), 36.0);
//! assert_eq!(a.align::<2>(a).first(), 3.0);
//! ```

pub mod align;
#[cfg(all(target_arch = "x86_64", target_feature = "avx"))]
pub mod avx;
pub mod config;
pub mod cpu;
pub mod error;
pub mod kernels;
pub mod packet;
pub mod report;
pub mod selftest;
pub mod traits;

pub use align::Aligned32;
pub use error::{PacketError, Result};
pub use packet::{Packet, Provider};
pub use traits::{Capabilities, PacketInfo, PacketTraits, Real, Unpacket};
