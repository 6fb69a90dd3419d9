use crate::bconv::{bconv_systolic, BconvReport, BconvShape};
use crate::error::{CoprocError, Result};
use crate::modulus::limb::Limb;
use num_bigint::BigUint;
use num_traits::One;

#[inline(always)]
fn residue(x: &BigUint, m: u64) -> u64 {
    (x % m).iter_u64_digits().next().unwrap_or(0)
}

/// Fast base conversion from basis `q` to basis `p`: for residues `x_i` of
/// `x < Q`, produces `y_j = x + α·Q mod p_j` with `0 <= α < SIZE_Q`.
pub struct BaseConversion {
    q_basis: Vec<Limb>,
    p_basis: Vec<Limb>,
    modulus: BigUint,
    q_hat_inv: Vec<u64>,
    weights: Vec<u64>,
}

impl BaseConversion {
    /// The `q` moduli must be pairwise coprime.
    pub fn new(q_basis: &[u64], p_basis: &[u64]) -> Result<Self> {
        let q_basis: Vec<Limb> = q_basis.iter().map(|q| Limb::new(*q)).collect::<Result<_>>()?;
        let p_basis: Vec<Limb> = p_basis.iter().map(|p| Limb::new(*p)).collect::<Result<_>>()?;
        BconvShape::new(1, q_basis.len(), p_basis.len())?;

        let modulus: BigUint = q_basis
            .iter()
            .fold(BigUint::one(), |acc, limb| acc * limb.q());

        let q_hats: Vec<BigUint> = q_basis.iter().map(|limb| &modulus / limb.q()).collect();

        let q_hat_inv: Vec<u64> = q_hats
            .iter()
            .zip(q_basis.iter())
            .map(|(q_hat, limb)| {
                let qi: BigUint = BigUint::from(limb.q());
                (q_hat % &qi)
                    .modinv(&qi)
                    .map(|inv| residue(&inv, limb.q()))
                    .ok_or(CoprocError::NotInvertible {
                        value: residue(q_hat, limb.q()),
                        modulus: limb.q(),
                    })
            })
            .collect::<Result<_>>()?;

        let weights: Vec<u64> = q_hats
            .iter()
            .flat_map(|q_hat| p_basis.iter().map(move |p| residue(q_hat, p.q())))
            .collect();

        Ok(Self {
            q_basis,
            p_basis,
            modulus,
            q_hat_inv,
            weights,
        })
    }

    pub fn size_q(&self) -> usize {
        self.q_basis.len()
    }

    pub fn size_p(&self) -> usize {
        self.p_basis.len()
    }

    /// `Q = Π q_i`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// `(Q/q_i)^-1 mod q_i`.
    pub fn q_hat_inv(&self) -> &[u64] {
        &self.q_hat_inv
    }

    /// Row-major `SIZE_Q×SIZE_P` stationary matrix `(Q/q_i) mod p_j`.
    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    pub fn p_moduli(&self) -> Vec<u64> {
        self.p_basis.iter().map(Limb::q).collect()
    }

    /// Replaces every residue `x[r][i]` by `x[r][i]·(Q/q_i)^-1 mod q_i`.
    pub fn prescale(&self, x: &mut [u64]) -> Result<()> {
        let size_q: usize = self.size_q();
        if x.len() % size_q != 0 {
            return Err(CoprocError::LengthMismatch {
                context: "bconv prescale",
                expected: (x.len() / size_q + 1) * size_q,
                got: x.len(),
            });
        }
        x.chunks_exact(size_q).try_for_each(|row| {
            row.iter().zip(self.q_basis.iter()).try_for_each(|(xi, limb)| {
                if *xi >= limb.q() {
                    return Err(CoprocError::OperandOutOfRange {
                        context: "bconv prescale",
                        value: *xi,
                        bound: limb.q(),
                    });
                }
                Ok(())
            })
        })?;
        x.chunks_exact_mut(size_q).for_each(|row| {
            row.iter_mut()
                .zip(self.q_basis.iter().zip(self.q_hat_inv.iter()))
                .for_each(|(xi, (limb, c))| *xi = limb.mul(*xi, *c))
        });
        Ok(())
    }

    /// Converts a row-major `RING_DIM×SIZE_Q` residue matrix into the
    /// `RING_DIM×SIZE_P` matrix over the `p` basis.
    pub fn convert(&self, x: &[u64], out: &mut [u64]) -> Result<BconvReport> {
        let mut scaled: Vec<u64> = x.to_vec();
        self.prescale(&mut scaled)?;
        let shape: BconvShape =
            BconvShape::new(scaled.len() / self.size_q(), self.size_q(), self.size_p())?;
        bconv_systolic(shape, &scaled, &self.weights, &self.p_moduli(), out)
    }
}
