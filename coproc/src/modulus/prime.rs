use crate::error::{CoprocError, Result};
use crate::modulus::limb::Limb;
use primality_test::is_prime;

/// Walks the primes q = 1 mod `nth_root` around 2^bits, upwards from 2^bits + 1
/// and downwards from 2^bits + 1 - nth_root.
pub struct NttFriendlyPrimes {
    bits: u32,
    nth_root: u64,
    next_prime: u64,
    prev_prime: u64,
    check_next_prime: bool,
    check_prev_prime: bool,
}

impl NttFriendlyPrimes {
    /// `nth_root` must be a power of two and `bits` at most 61, so every
    /// candidate stays below 2^62.
    pub fn new(bits: u32, nth_root: u64) -> Result<Self> {
        if nth_root == 0 || nth_root & (nth_root - 1) != 0 {
            return Err(CoprocError::NotPowerOfTwo {
                value: nth_root as usize,
            });
        }
        if bits > 61 || (1u64 << bits) <= nth_root {
            return Err(CoprocError::PrimesExhausted { bits, nth_root });
        }
        let next_prime: u64 = (1u64 << bits) + 1;
        Ok(Self {
            bits,
            nth_root,
            next_prime,
            prev_prime: next_prime - nth_root,
            check_next_prime: true,
            check_prev_prime: true,
        })
    }

    fn upper(&self) -> u64 {
        (1u64 << self.bits) + (1u64 << (self.bits - 1))
    }

    fn lower(&self) -> u64 {
        1u64 << (self.bits - 1)
    }

    pub fn next_upstream_prime(&mut self) -> Result<u64> {
        while self.check_next_prime {
            if self.next_prime > self.upper() {
                self.check_next_prime = false;
                break;
            }
            let candidate: u64 = self.next_prime;
            self.next_prime += self.nth_root;
            if is_prime(candidate) {
                return Ok(candidate);
            }
        }
        Err(CoprocError::PrimesExhausted {
            bits: self.bits,
            nth_root: self.nth_root,
        })
    }

    pub fn next_downstream_prime(&mut self) -> Result<u64> {
        while self.check_prev_prime {
            if self.prev_prime < self.lower() {
                self.check_prev_prime = false;
                break;
            }
            let candidate: u64 = self.prev_prime;
            self.prev_prime -= self.nth_root;
            if is_prime(candidate) {
                return Ok(candidate);
            }
        }
        Err(CoprocError::PrimesExhausted {
            bits: self.bits,
            nth_root: self.nth_root,
        })
    }

    /// Alternates between the two directions, falling back to whichever one
    /// still has candidates.
    pub fn next_alternating_prime(&mut self, upstream: bool) -> Result<u64> {
        if upstream {
            self.next_upstream_prime()
                .or_else(|_| self.next_downstream_prime())
        } else {
            self.next_downstream_prime()
                .or_else(|_| self.next_upstream_prime())
        }
    }

    pub fn next_alternating_primes(&mut self, k: usize) -> Result<Vec<u64>> {
        (0..k)
            .map(|i| self.next_alternating_prime(i & 1 == 0))
            .collect()
    }
}

/// Returns the primitive `2·ring_dim`-th root of unity modulo q with the
/// smallest generating candidate. q must be prime with q = 1 mod 2·ring_dim
/// and ring_dim a power of two.
pub fn primitive_2nth_root(limb: &Limb, ring_dim: usize) -> Result<u64> {
    let q: u64 = limb.q();
    let order: u64 = (ring_dim as u64) << 1;
    let no_root: CoprocError = CoprocError::NoPrimitiveRoot { modulus: q, order };
    if (q - 1) % order != 0 || !is_prime(q) {
        return Err(no_root);
    }
    let cofactor: u64 = (q - 1) / order;
    // Half of all candidates are quadratic non-residues, each of which works.
    (2..q.min(1 << 16))
        .map(|candidate| limb.pow(candidate, cofactor))
        .find(|psi| limb.pow(*psi, ring_dim as u64) == q - 1)
        .ok_or(no_root)
}
