pub mod barrett;
pub mod limb;
pub mod prime;

/// Exclusive upper bound on every limb modulus.
pub const MODULUS_BOUND: u64 = 1 << 62;

pub trait WordOps<O> {
    fn reverse_bits_msb(self, n: u32) -> O;
}

impl WordOps<usize> for usize {
    /// Reverses the `n` least significant bits.
    #[inline(always)]
    fn reverse_bits_msb(self, n: u32) -> usize {
        self.reverse_bits().checked_shr(usize::BITS - n).unwrap_or(0)
    }
}

pub trait ReduceOnce<O> {
    /// Assigns self-q to self if self >= q.
    /// User must ensure that self < 2q.
    fn reduce_once_assign(&mut self, q: O);
    /// Returns self-q if self >= q else self.
    /// User must ensure that self < 2q.
    fn reduce_once(&self, q: O) -> O;
}

impl ReduceOnce<u64> for u64 {
    #[inline(always)]
    fn reduce_once_assign(&mut self, q: u64) {
        debug_assert!(q < 0x8000000000000000, "2q >= 2^64");
        *self = (*self).min(self.wrapping_sub(q))
    }

    #[inline(always)]
    fn reduce_once(&self, q: u64) -> u64 {
        debug_assert!(q < 0x8000000000000000, "2q >= 2^64");
        (*self).min(self.wrapping_sub(q))
    }
}

/// Returns a + b mod q when `is_add`, a - b mod q otherwise.
/// Requires a, b < q.
#[inline(always)]
pub fn add_mod(a: u64, b: u64, q: u64, is_add: bool) -> u64 {
    debug_assert!(a < q, "a:{} q:{}", a, q);
    debug_assert!(b < q, "b:{} q:{}", b, q);
    if is_add {
        (a + b).reduce_once(q)
    } else if a >= b {
        a - b
    } else {
        (a as u128 + q as u128 - b as u128) as u64
    }
}

#[inline(always)]
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    add_mod(a, b, q, false)
}

/// Returns -a mod q, mapping 0 to 0.
#[inline(always)]
pub fn neg_mod(a: u64, q: u64) -> u64 {
    debug_assert!(a < q, "a:{} q:{}", a, q);
    if a == 0 {
        0
    } else {
        q - a
    }
}

/// Barrett modular multiplication: returns a * b mod q for a, b < q < 2^62
/// given m = floor(2^(2*k_half) / q).
#[inline(always)]
pub fn mult_mod(a: u64, b: u64, q: u64, m: u64, k_half: u32) -> u64 {
    debug_assert!(a < q, "a:{} q:{}", a, q);
    debug_assert!(b < q, "b:{} q:{}", b, q);
    let p: u128 = a as u128 * b as u128;
    let p_hi: u64 = (p >> (k_half - 1)) as u64;
    let quotient: u64 = ((p_hi as u128 * m as u128) >> (k_half + 1)) as u64;
    let mut r: u64 = (p as u64).wrapping_sub(quotient.wrapping_mul(q));
    r.reduce_once_assign(q);
    r.reduce_once_assign(q);
    debug_assert!(r < q, "barrett output {} >= q={}", r, q);
    r
}

/// Exact 64x64 -> 128 product from three 32x32 sub-products.
#[inline(always)]
pub fn karatsuba(a: u64, b: u64) -> u128 {
    const MASK_32: u64 = 0xFFFF_FFFF;
    let (a_lo, a_hi) = (a & MASK_32, a >> 32);
    let (b_lo, b_hi) = (b & MASK_32, b >> 32);

    let z0: u128 = (a_lo * b_lo) as u128;
    let z2: u128 = (a_hi * b_hi) as u128;
    let z1: u128 = (a_lo + a_hi) as u128 * (b_lo + b_hi) as u128;
    let mid: u128 = z1 - z2 - z0;

    (z2 << 64) + (mid << 32) + z0
}

#[cfg(test)]
mod tests {
    use super::barrett::Barrett;
    use super::*;
    use sampling::source::Source;

    const MODULI: [u64; 6] = [
        3,
        101,
        65537,
        0x800000000004001,
        0x1fffffffffe00001,
        0x3fffffffffffffff,
    ];

    #[test]
    fn add_sub_exhaustive_small() {
        let q: u64 = 17;
        for a in 0..q {
            for b in 0..q {
                assert_eq!(add_mod(a, b, q, true), (a + b) % q);
                assert_eq!(add_mod(a, b, q, false), (a + q - b) % q);
            }
        }
    }

    #[test]
    fn add_sub_random() {
        let mut source: Source = Source::new([0u8; 32]);
        for q in MODULI {
            for _ in 0..1 << 12 {
                let a: u64 = source.next_below(q);
                let b: u64 = source.next_below(q);
                assert_eq!(
                    add_mod(a, b, q, true) as u128,
                    (a as u128 + b as u128) % q as u128
                );
                assert_eq!(
                    add_mod(a, b, q, false) as u128,
                    (a as u128 + q as u128 - b as u128) % q as u128
                );
            }
            assert_eq!(add_mod(q - 1, q - 1, q, true), q - 2);
            assert_eq!(add_mod(0, q - 1, q, false), 1);
        }
    }

    #[test]
    fn neg_keeps_zero() {
        assert_eq!(neg_mod(0, 101), 0);
        assert_eq!(neg_mod(1, 101), 100);
    }

    #[test]
    fn barrett_matches_u128_reference() {
        let mut source: Source = Source::new([1u8; 32]);
        for q in MODULI {
            let barrett: Barrett = Barrett::new(q);
            for _ in 0..1 << 12 {
                let a: u64 = source.next_below(q);
                let b: u64 = source.next_below(q);
                assert_eq!(
                    mult_mod(a, b, q, barrett.m(), barrett.k_half()) as u128,
                    (a as u128 * b as u128) % q as u128,
                    "a={} b={} q={}",
                    a,
                    b,
                    q
                );
            }
            let worst: u64 = mult_mod(q - 1, q - 1, q, barrett.m(), barrett.k_half());
            assert_eq!(worst as u128, ((q - 1) as u128 * (q - 1) as u128) % q as u128);
        }
    }

    #[test]
    fn karatsuba_is_exact() {
        let mut source: Source = Source::new([2u8; 32]);
        for _ in 0..1 << 14 {
            let a: u64 = source.next_u64();
            let b: u64 = source.next_u64();
            assert_eq!(karatsuba(a, b), a as u128 * b as u128);
        }
        assert_eq!(karatsuba(u64::MAX, u64::MAX), u64::MAX as u128 * u64::MAX as u128);
        assert_eq!(karatsuba(0, u64::MAX), 0);
    }

    #[test]
    fn reverse_bits_msb() {
        assert_eq!(0b001usize.reverse_bits_msb(3), 0b100);
        assert_eq!(0b110usize.reverse_bits_msb(3), 0b011);
        assert_eq!(5usize.reverse_bits_msb(0), 0);
    }

    #[test]
    fn reduce_once_below_2q() {
        for q in MODULI {
            assert_eq!((q - 1).reduce_once(q), q - 1);
            assert_eq!(q.reduce_once(q), 0);
            assert_eq!((2 * q - 1).reduce_once(q), q - 1);
            let mut x: u64 = q + 1;
            x.reduce_once_assign(q);
            assert_eq!(x, 1);
        }
    }
}
