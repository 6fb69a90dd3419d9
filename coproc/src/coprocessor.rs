//! Host-facing front door: one invocation per call, selected by [Opcode].
//!
//! Tiled kernels stage the caller's linear buffers through two on-chip tile
//! banks. Every check runs before a caller buffer is written, so a rejected
//! invocation leaves the output exactly as it was.

use crate::bconv::{bconv_systolic, BconvReport, BconvShape};
use crate::config::{ActiveLimbs, CoreConfig};
use crate::dma::Dma;
use crate::elementwise::{ElementwiseKernel, ElementwiseOp};
use crate::error::{CoprocError, Result};
use crate::limbset::LimbSet;
use crate::modulus::limb::Limb;
use crate::ntt::{Direction, NttKernel};
use crate::opcode::Opcode;
use crate::tile::TileBank;
use std::ops::Range;
use tracing::{debug, instrument, warn};

/// One invocation with its operands.
pub enum Invocation<'a> {
    Init(LimbSet),
    Add {
        in1: &'a [u64],
        in2: &'a [u64],
        out: &'a mut [u64],
        active: ActiveLimbs,
    },
    Sub {
        in1: &'a [u64],
        in2: &'a [u64],
        out: &'a mut [u64],
        active: ActiveLimbs,
    },
    Mul {
        in1: &'a [u64],
        in2: &'a [u64],
        out: &'a mut [u64],
        active: ActiveLimbs,
    },
    Ntt {
        data: &'a mut [u64],
        active: ActiveLimbs,
    },
    Intt {
        data: &'a mut [u64],
        active: ActiveLimbs,
    },
    Bconv {
        shape: BconvShape,
        x: &'a [u64],
        w: &'a [u64],
        moduli: &'a [u64],
        out: &'a mut [u64],
    },
}

impl Invocation<'_> {
    pub fn opcode(&self) -> Opcode {
        match self {
            Invocation::Init(_) => Opcode::Init,
            Invocation::Add { .. } => Opcode::Add,
            Invocation::Sub { .. } => Opcode::Sub,
            Invocation::Mul { .. } => Opcode::Mul,
            Invocation::Ntt { .. } => Opcode::Ntt,
            Invocation::Intt { .. } => Opcode::Intt,
            Invocation::Bconv { .. } => Opcode::Bconv,
        }
    }
}

pub struct Coprocessor {
    config: CoreConfig,
    dma: Dma,
    elementwise: ElementwiseKernel,
    ntt: NttKernel,
    bank_a: TileBank,
    bank_b: TileBank,
    limbset: Option<LimbSet>,
}

impl Coprocessor {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            config: *config,
            dma: Dma::new(config),
            elementwise: ElementwiseKernel::new(config),
            ntt: NttKernel::new(config),
            bank_a: TileBank::new(config),
            bank_b: TileBank::new(config),
            limbset: None,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn limbset(&self) -> Option<&LimbSet> {
        self.limbset.as_ref()
    }

    /// INIT: installs the moduli and twiddle tables used by later invocations.
    pub fn init(&mut self, limbset: LimbSet) -> Result<()> {
        if limbset.config() != &self.config {
            let err: CoprocError = CoprocError::ConfigMismatch;
            warn!(opcode = ?Opcode::Init, %err, "invocation rejected");
            return Err(err);
        }
        debug!(limbs = limbset.len(), "limb set installed");
        self.limbset = Some(limbset);
        Ok(())
    }

    pub fn add(
        &mut self,
        in1: &[u64],
        in2: &[u64],
        out: &mut [u64],
        active: ActiveLimbs,
    ) -> Result<()> {
        self.elementwise_op(ElementwiseOp::Add, in1, in2, out, active)
    }

    pub fn sub(
        &mut self,
        in1: &[u64],
        in2: &[u64],
        out: &mut [u64],
        active: ActiveLimbs,
    ) -> Result<()> {
        self.elementwise_op(ElementwiseOp::Sub, in1, in2, out, active)
    }

    pub fn mul(
        &mut self,
        in1: &[u64],
        in2: &[u64],
        out: &mut [u64],
        active: ActiveLimbs,
    ) -> Result<()> {
        self.elementwise_op(ElementwiseOp::Mul, in1, in2, out, active)
    }

    /// Forward transform of every active limb, in place.
    pub fn ntt(&mut self, data: &mut [u64], active: ActiveLimbs) -> Result<()> {
        self.transform(Direction::Forward, data, active)
    }

    /// Inverse transform of every active limb, in place.
    pub fn intt(&mut self, data: &mut [u64], active: ActiveLimbs) -> Result<()> {
        self.transform(Direction::Inverse, data, active)
    }

    /// BCONV: the systolic engine reads and writes the linear streams
    /// directly and needs no installed limb set.
    pub fn bconv(
        &self,
        shape: BconvShape,
        x: &[u64],
        w: &[u64],
        moduli: &[u64],
        out: &mut [u64],
    ) -> Result<BconvReport> {
        bconv_systolic(shape, x, w, moduli, out)
            .inspect_err(|err| warn!(opcode = ?Opcode::Bconv, %err, "invocation rejected"))
    }

    /// Dispatches one invocation. Only BCONV returns a report.
    #[instrument(level = "debug", skip_all, fields(opcode = ?invocation.opcode()))]
    pub fn execute(&mut self, invocation: Invocation<'_>) -> Result<Option<BconvReport>> {
        match invocation {
            Invocation::Init(limbset) => self.init(limbset).map(|_| None),
            Invocation::Add {
                in1,
                in2,
                out,
                active,
            } => self.add(in1, in2, out, active).map(|_| None),
            Invocation::Sub {
                in1,
                in2,
                out,
                active,
            } => self.sub(in1, in2, out, active).map(|_| None),
            Invocation::Mul {
                in1,
                in2,
                out,
                active,
            } => self.mul(in1, in2, out, active).map(|_| None),
            Invocation::Ntt { data, active } => self.ntt(data, active).map(|_| None),
            Invocation::Intt { data, active } => self.intt(data, active).map(|_| None),
            Invocation::Bconv {
                shape,
                x,
                w,
                moduli,
                out,
            } => self.bconv(shape, x, w, moduli, out).map(Some),
        }
    }

    fn elementwise_op(
        &mut self,
        op: ElementwiseOp,
        in1: &[u64],
        in2: &[u64],
        out: &mut [u64],
        active: ActiveLimbs,
    ) -> Result<()> {
        let opcode: Opcode = match op {
            ElementwiseOp::Add => Opcode::Add,
            ElementwiseOp::Sub => Opcode::Sub,
            ElementwiseOp::Mul => Opcode::Mul,
        };
        self.run_elementwise(op, in1, in2, out, active)
            .inspect_err(|err| warn!(opcode = ?opcode, %err, "invocation rejected"))
    }

    fn run_elementwise(
        &mut self,
        op: ElementwiseOp,
        in1: &[u64],
        in2: &[u64],
        out: &mut [u64],
        active: ActiveLimbs,
    ) -> Result<()> {
        let limbset: &LimbSet = self.limbset.as_ref().ok_or(CoprocError::NotInitialized)?;
        let moduli: Range<usize> = active.validate(self.config.max_limbs(), limbset.len())?;
        let limbs: &[Limb] = &limbset.limbs()[moduli];
        self.dma.load(in1, &mut self.bank_a, active.count)?;
        self.dma.load(in2, &mut self.bank_b, active.count)?;
        check_residues(&self.bank_a, limbs)?;
        check_residues(&self.bank_b, limbs)?;
        check_capacity(&self.config, out.len(), active.count)?;
        self.elementwise
            .compute_assign(op, &mut self.bank_a, &self.bank_b, limbset.limbs(), active)?;
        self.dma.store(&self.bank_a, out, active.count)
    }

    fn transform(
        &mut self,
        direction: Direction,
        data: &mut [u64],
        active: ActiveLimbs,
    ) -> Result<()> {
        let opcode: Opcode = match direction {
            Direction::Forward => Opcode::Ntt,
            Direction::Inverse => Opcode::Intt,
        };
        self.run_transform(direction, data, active)
            .inspect_err(|err| warn!(opcode = ?opcode, %err, "invocation rejected"))
    }

    fn run_transform(
        &mut self,
        direction: Direction,
        data: &mut [u64],
        active: ActiveLimbs,
    ) -> Result<()> {
        let limbset: &LimbSet = self.limbset.as_ref().ok_or(CoprocError::NotInitialized)?;
        let moduli: Range<usize> = active.validate(self.config.max_limbs(), limbset.len())?;
        self.dma.load(data, &mut self.bank_a, active.count)?;
        check_residues(&self.bank_a, &limbset.limbs()[moduli])?;
        self.ntt.compute(&mut self.bank_a, limbset, direction, active)?;
        self.dma.store(&self.bank_a, data, active.count)
    }
}

/// Every staged coefficient of tile `l` must be reduced modulo `limbs[l]`.
fn check_residues(bank: &TileBank, limbs: &[Limb]) -> Result<()> {
    bank.tiles()
        .iter()
        .zip(limbs)
        .try_for_each(|(tile, limb)| match tile.as_slice().iter().find(|x| **x >= limb.q()) {
            Some(x) => Err(CoprocError::OperandOutOfRange {
                context: "residue",
                value: *x,
                bound: limb.q(),
            }),
            None => Ok(()),
        })
}

fn check_capacity(config: &CoreConfig, len: usize, num_active_limbs: usize) -> Result<()> {
    let words: usize = config.words(num_active_limbs);
    if len < words {
        return Err(CoprocError::BufferTooShort {
            context: "dma store",
            expected: words,
            got: len,
        });
    }
    Ok(())
}
