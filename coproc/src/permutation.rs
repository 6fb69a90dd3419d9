//! Row-wise cyclic shifts and the Galois-automorphism crossbar.

use crate::config::CoreConfig;
use crate::error::{CoprocError, Result};
use crate::modulus::limb::Limb;
use crate::tile::Tile;

/// Direction of an [PermutationNetwork::interleave] pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shift {
    /// `out[i][(j + i) mod SQRT] = in[i][j]`.
    Right,
    /// `out[i][(j - i) mod SQRT] = in[i][j]`.
    Left,
}

pub struct PermutationNetwork {
    config: CoreConfig,
    staging: Tile,
}

impl PermutationNetwork {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            config: *config,
            staging: Tile::new(config),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Cyclically shifts row `i` by `i` positions, staged through a full-size
    /// buffer so every read sees the pre-shift tile.
    pub fn interleave(&mut self, tile: &mut Tile, shift: Shift) {
        debug_assert_eq!(tile.sqrt(), self.config.sqrt());
        let mask: usize = self.config.sqrt() - 1;
        self.staging.copy_from(tile);
        tile.rows_mut()
            .zip(self.staging.rows())
            .enumerate()
            .for_each(|(i, (out, row))| {
                row.iter().enumerate().for_each(|(j, x)| {
                    let dst: usize = match shift {
                        Shift::Right => (j + i) & mask,
                        Shift::Left => j.wrapping_sub(i) & mask,
                    };
                    out[dst] = *x
                })
            });
    }

    /// In column `c`, moves the entry of row `r` to row `(c - r) mod SQRT`.
    pub fn reflect_columns(&mut self, tile: &mut Tile) {
        debug_assert_eq!(tile.sqrt(), self.config.sqrt());
        let sqrt: usize = self.config.sqrt();
        let mask: usize = sqrt - 1;
        self.staging.copy_from(tile);
        for r in 0..sqrt {
            for c in 0..sqrt {
                tile.set(c.wrapping_sub(r) & mask, c, self.staging.get(r, c));
            }
        }
    }

    /// `out[j][i] = in[i][j]` as interleave right, column reflection, interleave left.
    pub fn transpose(&mut self, tile: &mut Tile) {
        self.interleave(tile, Shift::Right);
        self.reflect_columns(tile);
        self.interleave(tile, Shift::Left);
    }

    /// Applies `X -> X^k` to the coefficient tile `input`, with `k` the entry
    /// `step` of `steps`, negating wrapped coefficients modulo `limbs[mod_index]`.
    pub fn automorphism(
        &self,
        input: &Tile,
        steps: &GaloisSteps,
        step: usize,
        output: &mut Tile,
        limbs: &[Limb],
        mod_index: usize,
    ) -> Result<()> {
        if steps.order() != self.config.cyclotomic_order() {
            return Err(CoprocError::LengthMismatch {
                context: "automorphism step table order",
                expected: self.config.cyclotomic_order(),
                got: steps.order(),
            });
        }
        let gal_el: usize = steps.element(step)?;
        let limb: &Limb = limbs.get(mod_index).ok_or(CoprocError::ModIndexOutOfRange {
            offset: mod_index,
            end: mod_index.saturating_add(1),
            available: limbs.len(),
        })?;

        let ring_dim: usize = self.config.ring_dim();
        let log_sqrt: usize = self.config.log_sqrt();
        let sqrt_mask: usize = self.config.sqrt() - 1;
        let order_mask: usize = self.config.cyclotomic_order() - 1;

        input.as_slice().iter().enumerate().for_each(|(idx, x)| {
            let raw: usize = idx.wrapping_mul(gal_el) & order_mask;
            let dest: usize = raw & (ring_dim - 1);
            let value: u64 = if raw >= ring_dim { limb.neg(*x) } else { *x };
            output.set(dest >> log_sqrt, dest & sqrt_mask, value);
        });
        Ok(())
    }
}

/// Table of odd Galois elements modulo the cyclotomic order `2·RING_DIM`,
/// indexed by automorphism step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GaloisSteps {
    order: usize,
    elements: Vec<usize>,
}

/// Generator of the rotation subgroup.
pub const GALOIS_GENERATOR: usize = 5;

impl GaloisSteps {
    /// `k_r = 5^r mod 2·RING_DIM` for `r` in `[0, RING_DIM/2)`.
    pub fn rotations(config: &CoreConfig) -> Self {
        let order: usize = config.cyclotomic_order();
        let mask: usize = order - 1;
        let mut elements: Vec<usize> = Vec::with_capacity(config.ring_dim() >> 1);
        let mut k: usize = 1;
        for _ in 0..config.ring_dim() >> 1 {
            elements.push(k);
            k = (k * GALOIS_GENERATOR) & mask;
        }
        Self { order, elements }
    }

    /// Caller-supplied elements, each reduced modulo `2·RING_DIM`. Even
    /// elements share a factor with the order and are rejected.
    pub fn from_elements(config: &CoreConfig, elements: &[usize]) -> Result<Self> {
        let order: usize = config.cyclotomic_order();
        let elements: Vec<usize> = elements
            .iter()
            .map(|k| {
                if k & 1 == 0 {
                    Err(CoprocError::GaloisNotCoprime { element: *k, order })
                } else {
                    Ok(k & (order - 1))
                }
            })
            .collect::<Result<_>>()?;
        Ok(Self { order, elements })
    }

    #[inline(always)]
    pub fn order(&self) -> usize {
        self.order
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    pub fn element(&self, step: usize) -> Result<usize> {
        self.elements
            .get(step)
            .copied()
            .ok_or(CoprocError::StepOutOfRange {
                step,
                len: self.elements.len(),
            })
    }

    /// Returns the step whose element undoes `step`, if the table holds it.
    /// For [GaloisSteps::rotations] this is `(len - step) mod len`.
    pub fn inverse_step(&self, step: usize) -> Result<Option<usize>> {
        let inverse: usize = galois_inverse(self.element(step)?, self.order)?;
        Ok(self.elements.iter().position(|k| *k == inverse))
    }
}

/// Returns `k^-1 mod order` for odd `k` and a power-of-two `order`.
pub fn galois_inverse(k: usize, order: usize) -> Result<usize> {
    if order == 0 || order & (order - 1) != 0 {
        return Err(CoprocError::NotPowerOfTwo { value: order });
    }
    if k & 1 == 0 {
        return Err(CoprocError::GaloisNotCoprime { element: k, order });
    }
    // k·k = 1 mod 8, each Newton step doubles the number of correct bits.
    let k64: u64 = k as u64;
    let mut x: u64 = k64;
    for _ in 0..5 {
        x = x.wrapping_mul(2u64.wrapping_sub(k64.wrapping_mul(x)));
    }
    Ok((x as usize) & (order - 1))
}
