//! Four-step negacyclic NTT over `SQRT×SQRT` tiles.
//!
//! With `n = SQRT·n1 + n2` and `k = k1 + SQRT·k2`, the forward transform
//! `A[k] = Σ a[n]·ψ^(n(2k+1))` splits into
//!
//! 1. a twist of row `n1` by `ψ^(SQRT·n1)`,
//! 2. length-`SQRT` cyclic DFTs down every column, read along the diagonals of
//!    the right-interleaved tile,
//! 3. an inter-pass twiddle `ψ^(n2(2k1+1))` on entry `(k1, n2)`,
//! 4. length-`SQRT` cyclic DFTs along every row,
//! 5. a transpose through the permutation network, leaving `A` in natural order.
//!
//! The inverse runs the same steps in reverse with `ψ^-1`, and folds `N^-1`
//! into the twist. Every twiddle comes from a per-limb [TwiddleTable] of
//! `BU_NUM×RING_DIM` entries; the butterfly never knows the direction it runs.

use crate::config::{ActiveLimbs, CoreConfig};
use crate::error::{CoprocError, Result};
use crate::limbset::LimbSet;
use crate::modulus::limb::Limb;
use crate::modulus::{add_mod, mult_mod, WordOps};
use crate::permutation::{PermutationNetwork, Shift};
use crate::tile::{Tile, TileBank};
use std::ops::Range;
use tracing::{debug, instrument, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

/// Radix-2 butterfly: `(in1 + in2·w, in1 - in2·w) mod q`.
#[inline(always)]
pub fn configurable_pe(
    in1: u64,
    in2: u64,
    twiddle: u64,
    q: u64,
    k_half: u32,
    m: u64,
) -> (u64, u64) {
    let t: u64 = mult_mod(in2, twiddle, q, m, k_half);
    (add_mod(in1, t, q, true), add_mod(in1, t, q, false))
}

/// Operand positions `(p, p + h)` of butterfly `b` in stage `stage`, where
/// `h = 2^stage` and the input is in bit-reversed order.
#[inline(always)]
pub fn compute_indices(stage: usize, b: usize) -> (usize, usize) {
    let h: usize = 1 << stage;
    let p: usize = (b >> stage) * (h << 1) + (b & (h - 1));
    (p, p + h)
}

/// Flat table index of the twiddle used by butterfly `b` in stage `stage`.
#[inline(always)]
pub fn generate_twiddle_index(config: &CoreConfig, stage: usize, b: usize) -> usize {
    b * config.ring_dim() + stage
}

/// Flat table index of the twist factor of row `n1`.
#[inline(always)]
pub fn twist_index(config: &CoreConfig, n1: usize) -> usize {
    let bu: usize = config.bu_num();
    (n1 % bu) * config.ring_dim() + config.log_sqrt() + n1 / bu
}

/// Flat table index of the inter-pass twiddle of tile entry `(k1, n2)`.
#[inline(always)]
pub fn pass_index(config: &CoreConfig, k1: usize, n2: usize) -> usize {
    let bu: usize = config.bu_num();
    let e: usize = k1 * config.sqrt() + n2;
    (e % bu) * config.ring_dim() + config.log_sqrt() + 2 + e / bu
}

/// Bit-reversal order feeding the first butterfly stage.
pub fn generate_input_index(config: &CoreConfig) -> Vec<usize> {
    let log_sqrt: u32 = config.log_sqrt() as u32;
    (0..config.sqrt())
        .map(|i| i.reverse_bits_msb(log_sqrt))
        .collect()
}

/// Destination of every tile position after the final repermutation:
/// the entry at `k1·SQRT + k2` lands at `k2·SQRT + k1`.
pub fn generate_output_index(config: &CoreConfig) -> Vec<usize> {
    let sqrt: usize = config.sqrt();
    (0..config.ring_dim())
        .map(|idx| (idx % sqrt) * sqrt + idx / sqrt)
        .collect()
}

/// Per-limb table of powers of `ψ` (or `ψ^-1`) in the layout the kernel reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TwiddleTable {
    direction: Direction,
    data: Box<[u64]>,
}

impl TwiddleTable {
    /// `psi` must be a primitive `2·RING_DIM`-th root of unity modulo the limb.
    pub fn new(config: &CoreConfig, limb: &Limb, psi: u64, direction: Direction) -> Result<Self> {
        let ring_dim: usize = config.ring_dim();
        let psi: u64 = psi % limb.q();
        if limb.pow(psi, ring_dim as u64) != limb.q() - 1 {
            return Err(CoprocError::NoPrimitiveRoot {
                modulus: limb.q(),
                order: config.cyclotomic_order() as u64,
            });
        }
        let (root, scale): (u64, u64) = match direction {
            Direction::Forward => (psi, 1),
            Direction::Inverse => (limb.inv(psi)?, limb.inv(ring_dim as u64)?),
        };

        let sqrt: usize = config.sqrt();
        let mut data: Vec<u64> = vec![0u64; config.bu_num() * ring_dim];

        for stage in 0..config.log_sqrt() {
            let h: usize = 1 << stage;
            let stride: usize = sqrt / (h << 1);
            for b in 0..config.bu_num() {
                let exponent: u64 = (2 * sqrt * (b & (h - 1)) * stride) as u64;
                data[generate_twiddle_index(config, stage, b)] = limb.pow(root, exponent);
            }
        }

        for n1 in 0..sqrt {
            let twist: u64 = limb.pow(root, (sqrt * n1) as u64);
            data[twist_index(config, n1)] = limb.mul(twist, scale);
        }

        for k1 in 0..sqrt {
            for n2 in 0..sqrt {
                data[pass_index(config, k1, n2)] = limb.pow(root, (n2 * (2 * k1 + 1)) as u64);
            }
        }

        Ok(Self {
            direction,
            data: data.into_boxed_slice(),
        })
    }

    pub fn forward(config: &CoreConfig, limb: &Limb, psi: u64) -> Result<Self> {
        Self::new(config, limb, psi, Direction::Forward)
    }

    pub fn inverse(config: &CoreConfig, limb: &Limb, psi: u64) -> Result<Self> {
        Self::new(config, limb, psi, Direction::Inverse)
    }

    /// Both direction tables of one limb.
    pub fn pair(config: &CoreConfig, limb: &Limb, psi: u64) -> Result<(Self, Self)> {
        Ok((
            Self::forward(config, limb, psi)?,
            Self::inverse(config, limb, psi)?,
        ))
    }

    /// Wraps a host-supplied `BU_NUM×RING_DIM` table, checking its shape and
    /// that every entry is reduced.
    pub fn from_raw(
        config: &CoreConfig,
        limb: &Limb,
        data: &[u64],
        direction: Direction,
    ) -> Result<Self> {
        let expected: usize = config.bu_num() * config.ring_dim();
        if data.len() != expected {
            return Err(CoprocError::LengthMismatch {
                context: "twiddle table",
                expected,
                got: data.len(),
            });
        }
        if let Some(x) = data.iter().find(|x| **x >= limb.q()) {
            return Err(CoprocError::OperandOutOfRange {
                context: "twiddle table",
                value: *x,
                bound: limb.q(),
            });
        }
        Ok(Self {
            direction,
            data: data.into(),
        })
    }

    #[inline(always)]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> u64 {
        self.data[index]
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.data
    }
}

pub struct NttKernel {
    config: CoreConfig,
    network: PermutationNetwork,
    input_index: Vec<usize>,
    stage_pairs: Vec<Vec<(usize, usize)>>,
    lane: Vec<u64>,
    permuted: Vec<u64>,
}

impl NttKernel {
    pub fn new(config: &CoreConfig) -> Self {
        let stage_pairs: Vec<Vec<(usize, usize)>> = (0..config.log_sqrt())
            .map(|stage| {
                (0..config.bu_num())
                    .map(|b| compute_indices(stage, b))
                    .collect()
            })
            .collect();
        Self {
            config: *config,
            network: PermutationNetwork::new(config),
            input_index: generate_input_index(config),
            stage_pairs,
            lane: vec![0u64; config.sqrt()],
            permuted: vec![0u64; config.sqrt()],
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Transforms one tile in place in the direction of `table`.
    pub fn transform(&mut self, tile: &mut Tile, limb: &Limb, table: &TwiddleTable) {
        debug_assert_eq!(tile.sqrt(), self.config.sqrt());
        match table.direction() {
            Direction::Forward => {
                self.twist(tile, limb, table);
                self.network.interleave(tile, Shift::Right);
                self.column_passes(tile, limb, table);
                self.network.interleave(tile, Shift::Left);
                self.inter_pass(tile, limb, table);
                self.row_passes(tile, limb, table);
                self.network.transpose(tile);
            }
            Direction::Inverse => {
                self.network.transpose(tile);
                self.row_passes(tile, limb, table);
                self.inter_pass(tile, limb, table);
                self.network.interleave(tile, Shift::Right);
                self.column_passes(tile, limb, table);
                self.network.interleave(tile, Shift::Left);
                self.twist(tile, limb, table);
            }
        }
    }

    /// Runs one transform per active limb: tile `l` uses the modulus and
    /// table at index `l + offset` of `limbset`.
    #[instrument(
        level = "debug",
        skip_all,
        fields(direction = ?direction, limbs = active.count, offset = active.offset)
    )]
    pub fn compute(
        &mut self,
        bank: &mut TileBank,
        limbset: &LimbSet,
        direction: Direction,
        active: ActiveLimbs,
    ) -> Result<()> {
        if limbset.config() != &self.config {
            return Err(CoprocError::ConfigMismatch);
        }
        let moduli: Range<usize> = active.validate(self.config.max_limbs(), limbset.len())?;
        for (l, mod_index) in moduli.enumerate() {
            trace!(limb = l, mod_index, "transform");
            let limb: &Limb = limbset.limb(mod_index);
            let table: &TwiddleTable = limbset.table(mod_index, direction);
            self.transform(bank.tile_mut(l), limb, table);
        }
        debug!(limbs = active.count, "ntt done");
        Ok(())
    }

    fn twist(&self, tile: &mut Tile, limb: &Limb, table: &TwiddleTable) {
        tile.rows_mut().enumerate().for_each(|(n1, row)| {
            let w: u64 = table.get(twist_index(&self.config, n1));
            row.iter_mut().for_each(|x| *x = limb.mul(*x, w));
        });
    }

    fn inter_pass(&self, tile: &mut Tile, limb: &Limb, table: &TwiddleTable) {
        tile.rows_mut().enumerate().for_each(|(k1, row)| {
            row.iter_mut().enumerate().for_each(|(n2, x)| {
                *x = limb.mul(*x, table.get(pass_index(&self.config, k1, n2)))
            });
        });
    }

    /// Column `j` of the unskewed tile sits on the diagonal `(i, (i + j) mod SQRT)`
    /// of the right-interleaved tile.
    fn column_passes(&mut self, tile: &mut Tile, limb: &Limb, table: &TwiddleTable) {
        let sqrt: usize = self.config.sqrt();
        let mask: usize = sqrt - 1;
        for j in 0..sqrt {
            (0..sqrt).for_each(|i| self.lane[i] = tile.get(i, (i + j) & mask));
            self.cyclic_dft(limb, table);
            (0..sqrt).for_each(|i| tile.set(i, (i + j) & mask, self.lane[i]));
        }
    }

    fn row_passes(&mut self, tile: &mut Tile, limb: &Limb, table: &TwiddleTable) {
        for i in 0..self.config.sqrt() {
            self.lane.copy_from_slice(tile.row(i));
            self.cyclic_dft(limb, table);
            tile.row_mut(i).copy_from_slice(&self.lane);
        }
    }

    /// Length-`SQRT` cyclic DFT of `self.lane`, natural order in and out.
    fn cyclic_dft(&mut self, limb: &Limb, table: &TwiddleTable) {
        let (q, m, k_half) = (limb.q(), limb.barrett().m(), limb.barrett().k_half());
        self.input_index
            .iter()
            .zip(self.permuted.iter_mut())
            .for_each(|(src, x)| *x = self.lane[*src]);
        for (stage, pairs) in self.stage_pairs.iter().enumerate() {
            pairs.iter().enumerate().for_each(|(b, (p, r))| {
                let w: u64 = table.get(generate_twiddle_index(&self.config, stage, b));
                let (res1, res2) =
                    configurable_pe(self.permuted[*p], self.permuted[*r], w, q, k_half, m);
                self.permuted[*p] = res1;
                self.permuted[*r] = res2;
            });
        }
        self.lane.copy_from_slice(&self.permuted);
    }
}
