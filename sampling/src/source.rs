use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic stream of test operands: residues, limb-major coefficient
/// buffers and small bounded matrices.
pub struct Source {
    source: ChaCha8Rng,
}

impl Source {
    pub fn new(seed: [u8; 32]) -> Source {
        Source {
            source: ChaCha8Rng::from_seed(seed),
        }
    }

    #[inline(always)]
    pub fn next_u64(&mut self) -> u64 {
        self.source.next_u64()
    }

    /// Rejection-samples a value in [0, max) from words masked by `mask`.
    /// `mask` must cover `max - 1`.
    #[inline(always)]
    pub fn next_u64n(&mut self, max: u64, mask: u64) -> u64 {
        let mut x: u64 = self.next_u64() & mask;
        while x >= max {
            x = self.next_u64() & mask;
        }
        x
    }

    /// Uniform value in [0, bound).
    #[inline(always)]
    pub fn next_below(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "invalid bound: 0");
        let mask: u64 = u64::MAX >> (bound - 1).leading_zeros().min(63);
        self.next_u64n(bound, mask)
    }

    pub fn fill_below(&mut self, bound: u64, buf: &mut [u64]) {
        buf.iter_mut().for_each(|x| *x = self.next_below(bound));
    }

    /// Fills a limb-major buffer: chunk `l` of length `n` is sampled
    /// uniformly modulo `moduli[l]`.
    pub fn fill_residues(&mut self, moduli: &[u64], n: usize, buf: &mut [u64]) {
        assert!(
            buf.len() >= moduli.len() * n,
            "invalid buffer: buf.len()={} < {}",
            buf.len(),
            moduli.len() * n
        );
        buf.chunks_exact_mut(n)
            .zip(moduli.iter())
            .for_each(|(chunk, q)| self.fill_below(*q, chunk));
    }

    pub fn residues(&mut self, moduli: &[u64], n: usize) -> Vec<u64> {
        let mut buf: Vec<u64> = vec![0u64; moduli.len() * n];
        self.fill_residues(moduli, n, &mut buf);
        buf
    }
}
