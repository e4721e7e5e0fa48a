//! Generic slice kernels built only on [`Packet`].
//!
//! These are the shape of loop the packet protocol exists for: scalar head up
//! to the first aligned element, packet body, scalar tail. Each function is
//! monomorphised per packet type; nothing here knows which provider is active.

use crate::align::first_aligned;
use crate::error::{PacketError, Result};
use crate::packet::Packet;
use crate::traits::{PacketTraits, Real};
use log::trace;

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(PacketError::LengthMismatch { expected, found });
    }
    Ok(())
}

/// Sum of `data`. The packet body uses aligned loads.
pub fn sum<P: Packet>(data: &[P::Scalar]) -> P::Scalar {
    let head = first_aligned(data, P::ALIGNMENT);
    let (head, rest) = data.split_at(head);

    let mut total = P::Scalar::ZERO;
    for &x in head {
        total = total + x;
    }

    let body = rest.len() - rest.len() % P::LANES;
    let mut acc = P::default();
    for chunk in rest[..body].chunks_exact(P::LANES) {
        // SAFETY: `rest` starts on an ALIGNMENT boundary and every chunk is
        // a whole number of packets past it.
        acc = acc + unsafe { P::load_aligned(chunk.as_ptr()) };
    }
    total = total + acc.reduce_sum();

    let tail = &rest[body..];
    if !tail.is_empty() {
        trace!("sum: {} head, {} tail scalars", head.len(), tail.len());
    }
    for &x in tail {
        total = total + x;
    }
    total
}

/// [`sum`] with the packet type taken from the scalar's [`PacketTraits`]
/// binding.
pub fn sum_of<T>(data: &[T]) -> T
where
    T: PacketTraits + Real,
    T::Packet: Packet<Scalar = T>,
{
    sum::<T::Packet>(data)
}

/// Inner product of `a` and `b`.
pub fn dot<P: Packet>(a: &[P::Scalar], b: &[P::Scalar]) -> Result<P::Scalar> {
    check_len(a.len(), b.len())?;

    let body = a.len() - a.len() % P::LANES;
    let mut acc = P::default();
    for (x, y) in a[..body].chunks_exact(P::LANES).zip(b[..body].chunks_exact(P::LANES)) {
        acc = acc + P::from_slice(x) * P::from_slice(y);
    }

    let mut total = acc.reduce_sum();
    if body < a.len() {
        trace!("dot: {} tail scalars", a.len() - body);
    }
    for (&x, &y) in a[body..].iter().zip(&b[body..]) {
        total = total + x * y;
    }
    Ok(total)
}

/// `y = alpha * x + y`. Uses the fused primitive when the build has FMA.
pub fn axpy<P: Packet>(alpha: P::Scalar, x: &[P::Scalar], y: &mut [P::Scalar]) -> Result<()> {
    check_len(y.len(), x.len())?;

    let body = x.len() - x.len() % P::LANES;
    let a = P::splat(alpha);
    for (xs, ys) in x[..body]
        .chunks_exact(P::LANES)
        .zip(y[..body].chunks_exact_mut(P::LANES))
    {
        let xv = P::from_slice(xs);
        let yv = P::from_slice(ys);
        #[cfg(target_feature = "fma")]
        let r = a.mul_add(xv, yv);
        #[cfg(not(target_feature = "fma"))]
        let r = a * xv + yv;
        r.store(ys);
    }

    if body < x.len() {
        trace!("axpy: {} tail scalars", x.len() - body);
    }
    for (&xi, yi) in x[body..].iter().zip(&mut y[body..]) {
        #[cfg(target_feature = "fma")]
        {
            *yi = alpha.fused_mul_add(xi, *yi);
        }
        #[cfg(not(target_feature = "fma"))]
        {
            *yi = alpha * xi + *yi;
        }
    }
    Ok(())
}

/// Largest absolute value in `data`, or zero when empty.
pub fn max_abs<P: Packet>(data: &[P::Scalar]) -> P::Scalar {
    let body = data.len() - data.len() % P::LANES;
    let mut best = P::Scalar::ZERO;
    if body > 0 {
        let mut acc = P::default();
        for chunk in data[..body].chunks_exact(P::LANES) {
            acc = acc.max(P::from_slice(chunk).abs());
        }
        best = acc.reduce_max();
    }
    for &x in &data[body..] {
        let x = x.abs();
        if x > best {
            best = x;
        }
    }
    best
}

/// `out[j] = sum(series[j])` for every series.
///
/// Series are processed `LANES` at a time: each gets its own packet
/// accumulator and one [`Packet::reduce_pairwise`] finishes the group.
pub fn multi_sum<P: Packet>(series: &[&[P::Scalar]], out: &mut [P::Scalar]) -> Result<()> {
    check_len(series.len(), out.len())?;

    for (group, results) in series.chunks(P::LANES).zip(out.chunks_mut(P::LANES)) {
        let mut accs = P::Accumulators::default();
        let mut tails = P::Array::default();
        let tails = tails.as_mut();

        for (j, s) in group.iter().enumerate() {
            let body = s.len() - s.len() % P::LANES;
            let mut acc = P::default();
            for chunk in s[..body].chunks_exact(P::LANES) {
                acc = acc + P::from_slice(chunk);
            }
            accs.as_mut()[j] = acc;
            for &x in &s[body..] {
                tails[j] = tails[j] + x;
            }
        }

        // Unused accumulators stay zero, so their lanes are simply dropped.
        let sums = P::reduce_pairwise(accs).to_array();
        for (j, r) in results.iter_mut().enumerate() {
            *r = sums.as_ref()[j] + tails[j];
        }
    }
    Ok(())
}

/// `dst[i] += src[i + K]` for every `i` in `dst`.
///
/// The packet body loads `src` on the same lane grid as `dst` and builds the
/// shifted window with [`Packet::align`], so no unaligned offset load is
/// needed. Requires `src.len() >= dst.len() + K`.
pub fn add_shifted<P: Packet, const K: usize>(src: &[P::Scalar], dst: &mut [P::Scalar]) -> Result<()> {
    let needed = dst.len() + K;
    if src.len() < needed {
        return Err(PacketError::LengthMismatch {
            expected: needed,
            found: src.len(),
        });
    }

    let lanes = P::LANES;
    let mut i = 0;
    if src.len() >= lanes {
        let mut current = P::from_slice(&src[..lanes]);
        // The next packet must exist in full for the window to be complete.
        while i + lanes <= dst.len() && i + 2 * lanes <= src.len() {
            let next = P::from_slice(&src[i + lanes..]);
            let window = current.align::<K>(next);
            let sum = P::from_slice(&dst[i..]) + window;
            sum.store(&mut dst[i..]);
            current = next;
            i += lanes;
        }
    }

    if i < dst.len() {
        trace!("add_shifted: {} tail scalars", dst.len() - i);
    }
    for (j, d) in dst.iter_mut().enumerate().skip(i) {
        *d = *d + src[j + K];
    }
    Ok(())
}

#[cfg(all(test, target_arch = "x86_64", target_feature = "avx"))]
mod tests {
    use super::*;
    use crate::align::Aligned32;
    use crate::avx::{F32x8, F64x4};

    #[test]
    fn sum_handles_misaligned_head_and_tail() {
        let buf = Aligned32(core::array::from_fn::<f32, 40, _>(|i| i as f32));
        for start in 0..9 {
            for end in [start, start + 3, 29, 40] {
                let slice = &buf[start..end];
                let expected: f32 = slice.iter().sum();
                assert_eq!(sum::<F32x8>(slice), expected, "{}..{}", start, end);
            }
        }
    }

    #[test]
    fn sum_of_uses_the_bound_packet() {
        let data: Vec<f32> = (0..27).map(|i| (i % 5) as f32 - 2.0).collect();
        assert_eq!(sum_of(&data), sum::<F32x8>(&data));
        assert_eq!(sum_of(&data), data.iter().sum::<f32>());

        let data: Vec<f64> = (0..11).map(|i| i as f64 * 0.5).collect();
        assert_eq!(sum_of(&data), sum::<F64x4>(&data));
        assert_eq!(sum_of::<f64>(&[]), 0.0);
    }

    #[test]
    fn dot_rejects_mismatched_lengths() {
        let a = [1.0f64; 5];
        let b = [1.0f64; 6];
        match dot::<F64x4>(&a, &b) {
            Err(PacketError::LengthMismatch { expected: 5, found: 6 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(dot::<F64x4>(&a, &a[..]).ok(), Some(5.0));
    }

    #[test]
    fn max_abs_sees_body_and_tail() {
        let mut data = [0.5f32; 19];
        data[3] = -7.0;
        assert_eq!(max_abs::<F32x8>(&data), 7.0);
        data[18] = -9.0;
        assert_eq!(max_abs::<F32x8>(&data), 9.0);
        assert_eq!(max_abs::<F32x8>(&[]), 0.0);
    }
}
