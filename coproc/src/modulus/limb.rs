use crate::error::{CoprocError, Result};
use crate::modulus::barrett::Barrett;
use crate::modulus::{add_mod, neg_mod, sub_mod, MODULUS_BOUND};

/// One RNS channel: a modulus below 2^62 and its Barrett constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limb {
    q: u64,
    barrett: Barrett,
}

impl Limb {
    pub fn new(q: u64) -> Result<Self> {
        check_modulus(q)?;
        Ok(Self {
            q,
            barrett: Barrett::new(q),
        })
    }

    /// Builds a limb from host-supplied `(MODULUS, M, K_HALF)` entries.
    pub fn from_raw(q: u64, m: u64, k_half: u64) -> Result<Self> {
        check_modulus(q)?;
        Ok(Self {
            q,
            barrett: Barrett::from_raw(q, m, k_half)?,
        })
    }

    #[inline(always)]
    pub fn q(&self) -> u64 {
        self.q
    }

    #[inline(always)]
    pub fn barrett(&self) -> &Barrett {
        &self.barrett
    }

    #[inline(always)]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        add_mod(a, b, self.q, true)
    }

    #[inline(always)]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        sub_mod(a, b, self.q)
    }

    #[inline(always)]
    pub fn neg(&self, a: u64) -> u64 {
        neg_mod(a, self.q)
    }

    #[inline(always)]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.barrett.mul(a, b, self.q)
    }

    /// Returns x^exponent mod q.
    pub fn pow(&self, x: u64, exponent: u64) -> u64 {
        let mut y: u64 = 1 % self.q;
        let mut x: u64 = x % self.q;
        let mut i: u64 = exponent;
        while i > 0 {
            if i & 1 == 1 {
                y = self.mul(y, x);
            }
            x = self.mul(x, x);
            i >>= 1;
        }
        y
    }

    /// Returns x^-1 mod q. q must be prime.
    pub fn inv(&self, x: u64) -> Result<u64> {
        let x: u64 = x % self.q;
        if x == 0 {
            return Err(CoprocError::NotInvertible {
                value: x,
                modulus: self.q,
            });
        }
        Ok(self.pow(x, self.q - 2))
    }
}

fn check_modulus(q: u64) -> Result<()> {
    if !(2..MODULUS_BOUND).contains(&q) {
        return Err(CoprocError::ModulusOutOfRange { modulus: q });
    }
    Ok(())
}
