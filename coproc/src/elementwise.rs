use crate::config::{ActiveLimbs, CoreConfig};
use crate::error::Result;
use crate::modulus::limb::Limb;
use crate::tile::TileBank;
use itertools::izip;
use std::ops::Range;
use tracing::{debug, instrument};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementwiseOp {
    Add,
    Sub,
    Mul,
}

impl ElementwiseOp {
    #[inline(always)]
    pub fn apply(self, limb: &Limb, a: u64, b: u64) -> u64 {
        match self {
            ElementwiseOp::Add => limb.add(a, b),
            ElementwiseOp::Sub => limb.sub(a, b),
            ElementwiseOp::Mul => limb.mul(a, b),
        }
    }
}

/// Tile-wide modular add, sub and multiply. Tile `l` is reduced by the modulus
/// at index `l + offset`.
pub struct ElementwiseKernel {
    config: CoreConfig,
}

impl ElementwiseKernel {
    pub fn new(config: &CoreConfig) -> Self {
        Self { config: *config }
    }

    fn active_moduli(&self, limbs: &[Limb], active: ActiveLimbs) -> Result<Range<usize>> {
        active.validate(self.config.max_limbs(), limbs.len())
    }

    /// `out = in1 op in2` on every active tile.
    #[instrument(
        level = "debug",
        skip_all,
        fields(op = ?op, limbs = active.count, offset = active.offset)
    )]
    pub fn compute(
        &self,
        op: ElementwiseOp,
        in1: &TileBank,
        in2: &TileBank,
        out: &mut TileBank,
        limbs: &[Limb],
        active: ActiveLimbs,
    ) -> Result<()> {
        let moduli: Range<usize> = self.active_moduli(limbs, active)?;
        izip!(in1.tiles(), in2.tiles(), out.tiles_mut(), &limbs[moduli]).for_each(
            |(a, b, c, limb)| {
                izip!(a.as_slice(), b.as_slice(), c.as_mut_slice())
                    .for_each(|(a, b, c)| *c = op.apply(limb, *a, *b))
            },
        );
        debug!(limbs = active.count, "elementwise done");
        Ok(())
    }

    /// `acc = acc op other`, the output aliasing the first operand.
    #[instrument(
        level = "debug",
        skip_all,
        fields(op = ?op, limbs = active.count, offset = active.offset)
    )]
    pub fn compute_assign(
        &self,
        op: ElementwiseOp,
        acc: &mut TileBank,
        other: &TileBank,
        limbs: &[Limb],
        active: ActiveLimbs,
    ) -> Result<()> {
        let moduli: Range<usize> = self.active_moduli(limbs, active)?;
        izip!(acc.tiles_mut(), other.tiles(), &limbs[moduli]).for_each(|(a, b, limb)| {
            izip!(a.as_mut_slice(), b.as_slice()).for_each(|(a, b)| *a = op.apply(limb, *a, *b))
        });
        debug!(limbs = active.count, "elementwise done");
        Ok(())
    }

    pub fn compute_add(
        &self,
        in1: &TileBank,
        in2: &TileBank,
        out: &mut TileBank,
        limbs: &[Limb],
        active: ActiveLimbs,
    ) -> Result<()> {
        self.compute(ElementwiseOp::Add, in1, in2, out, limbs, active)
    }

    pub fn compute_sub(
        &self,
        in1: &TileBank,
        in2: &TileBank,
        out: &mut TileBank,
        limbs: &[Limb],
        active: ActiveLimbs,
    ) -> Result<()> {
        self.compute(ElementwiseOp::Sub, in1, in2, out, limbs, active)
    }

    pub fn compute_mult(
        &self,
        in1: &TileBank,
        in2: &TileBank,
        out: &mut TileBank,
        limbs: &[Limb],
        active: ActiveLimbs,
    ) -> Result<()> {
        self.compute(ElementwiseOp::Mul, in1, in2, out, limbs, active)
    }
}
