use crate::error::{CoprocError, Result};
use crate::modulus::{mult_mod, MODULUS_BOUND};

/// Barrett constants of one modulus: `k_half` is the bit length of q and
/// `m = floor(2^(2*k_half) / q)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barrett {
    m: u64,
    k_half: u32,
}

impl Barrett {
    /// Derives the constants of q. Requires 2 <= q < 2^62.
    pub fn new(q: u64) -> Barrett {
        debug_assert!((2..MODULUS_BOUND).contains(&q), "invalid q={}", q);
        let k_half: u32 = u64::BITS - q.leading_zeros();
        let m: u64 = ((1u128 << (2 * k_half)) / q as u128) as u64;
        Self { m, k_half }
    }

    /// Accepts caller-supplied constants, checking them against q.
    pub fn from_raw(q: u64, m: u64, k_half: u64) -> Result<Barrett> {
        let expected: Barrett = Barrett::new(q);
        if expected.m != m || expected.k_half as u64 != k_half {
            return Err(CoprocError::InvalidBarrett {
                modulus: q,
                m,
                k_half,
            });
        }
        Ok(expected)
    }

    #[inline(always)]
    pub fn m(&self) -> u64 {
        self.m
    }

    #[inline(always)]
    pub fn k_half(&self) -> u32 {
        self.k_half
    }

    #[inline(always)]
    pub fn mul(&self, a: u64, b: u64, q: u64) -> u64 {
        mult_mod(a, b, q, self.m, self.k_half)
    }
}
