//! Weight-stationary systolic array computing
//! `out[r][c] = (Σ_k x[r][k]·w[k][c]) mod m[c]`.
//!
//! The `SIZE_Q×SIZE_P` grid is advanced by one global clock. In each cycle
//! every producer pushes first (row feeders, zero sum feeders, and every PE's
//! registered outputs), then every consumer pops (PE inputs, the x drain, and
//! the per-column collectors). Row `i` of the feed is skewed by `i` cycles,
//! so the bottom PE of column `c` delivers row `r` to the collector in cycle
//! `SIZE_Q + c + r`.

pub mod crt;
pub mod pe;

use crate::error::{CoprocError, Result};
use crate::modulus::MODULUS_BOUND;
use pe::{Fifo, ProcessingElement};
use tracing::{debug, instrument};

/// Largest `SIZE_Q` for which `SIZE_Q` products of operands below 2^62 fit
/// the 128-bit accumulator.
pub const MAX_SIZE_Q: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BconvShape {
    ring_dim: usize,
    size_q: usize,
    size_p: usize,
}

impl BconvShape {
    pub fn new(ring_dim: usize, size_q: usize, size_p: usize) -> Result<Self> {
        if ring_dim == 0 || size_q == 0 || size_p == 0 {
            return Err(CoprocError::EmptyShape {
                ring_dim,
                size_q,
                size_p,
            });
        }
        if size_q > MAX_SIZE_Q {
            return Err(CoprocError::TooManyInputChannels {
                size_q,
                max: MAX_SIZE_Q,
            });
        }
        Ok(Self {
            ring_dim,
            size_q,
            size_p,
        })
    }

    #[inline(always)]
    pub fn ring_dim(&self) -> usize {
        self.ring_dim
    }

    #[inline(always)]
    pub fn size_q(&self) -> usize {
        self.size_q
    }

    #[inline(always)]
    pub fn size_p(&self) -> usize {
        self.size_p
    }

    /// Skew of both feeds plus the sequence length.
    #[inline(always)]
    pub fn total_cycles(&self) -> usize {
        self.size_p + self.size_q + self.ring_dim
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BconvReport {
    pub cycles: usize,
}

#[derive(Clone, Copy, Debug, Default)]
struct Collector {
    discarded: usize,
    captured: usize,
}

/// One invocation's PE grid and links. `x_links[i][j]` feeds PE `(i, j)` from
/// the west, `sum_links[j][i]` feeds it from the north.
pub struct SystolicArray {
    shape: BconvShape,
    pes: Vec<ProcessingElement>,
    x_links: Vec<Fifo<u64>>,
    sum_links: Vec<Fifo<u128>>,
    collectors: Vec<Collector>,
}

impl SystolicArray {
    /// Installs `w[i][j]` and `moduli[j]` into PE `(i, j)`.
    pub fn new(shape: BconvShape, w_linear: &[u64], mod_linear: &[u64]) -> Result<Self> {
        let (size_q, size_p) = (shape.size_q(), shape.size_p());
        check_len("bconv weights", size_q * size_p, w_linear.len())?;
        check_len("bconv moduli", size_p, mod_linear.len())?;
        check_operands("bconv weights", &w_linear[..size_q * size_p])?;
        if mod_linear[..size_p].contains(&0) {
            return Err(CoprocError::ModulusOutOfRange { modulus: 0 });
        }
        let pes: Vec<ProcessingElement> = w_linear[..size_q * size_p]
            .iter()
            .enumerate()
            .map(|(idx, w)| ProcessingElement::new(*w, mod_linear[idx % size_p]))
            .collect();
        Ok(Self {
            shape,
            pes,
            x_links: vec![Fifo::new(); size_q * (size_p + 1)],
            sum_links: vec![Fifo::new(); size_p * (size_q + 1)],
            collectors: vec![Collector::default(); size_p],
        })
    }

    pub fn shape(&self) -> &BconvShape {
        &self.shape
    }

    pub fn pe(&self, i: usize, j: usize) -> &ProcessingElement {
        &self.pes[i * self.shape.size_p() + j]
    }

    #[inline(always)]
    fn x_link(&self, i: usize, j: usize) -> usize {
        i * (self.shape.size_p() + 1) + j
    }

    #[inline(always)]
    fn sum_link(&self, j: usize, i: usize) -> usize {
        j * (self.shape.size_q() + 1) + i
    }

    /// Streams `x_linear` through the grid and writes the reduced products to
    /// `out_linear`. The array is spent afterwards.
    pub fn run(mut self, x_linear: &[u64], out_linear: &mut [u64]) -> Result<BconvReport> {
        let shape: BconvShape = self.shape;
        let (ring_dim, size_q, size_p) = (shape.ring_dim(), shape.size_q(), shape.size_p());
        check_len("bconv input", ring_dim * size_q, x_linear.len())?;
        check_len("bconv output", ring_dim * size_p, out_linear.len())?;
        check_operands("bconv input", &x_linear[..ring_dim * size_q])?;

        for t in 0..shape.total_cycles() {
            self.produce(t, x_linear);
            self.consume(out_linear);
        }

        debug_assert!(self.collectors.iter().all(|c| c.captured == ring_dim));
        Ok(BconvReport {
            cycles: shape.total_cycles(),
        })
    }

    fn produce(&mut self, t: usize, x_linear: &[u64]) {
        let (ring_dim, size_q, size_p) = (
            self.shape.ring_dim(),
            self.shape.size_q(),
            self.shape.size_p(),
        );
        for i in 0..size_q {
            let x: u64 = if t >= i && t < i + ring_dim {
                x_linear[(t - i) * size_q + i]
            } else {
                0
            };
            let link: usize = self.x_link(i, 0);
            push(&mut self.x_links[link], x);
        }
        for j in 0..size_p {
            let link: usize = self.sum_link(j, 0);
            push(&mut self.sum_links[link], 0);
        }
        for i in 0..size_q {
            for j in 0..size_p {
                let (x, sum) = self.pes[i * size_p + j].emit();
                let (east, south) = (self.x_link(i, j + 1), self.sum_link(j, i + 1));
                push(&mut self.x_links[east], x);
                push(&mut self.sum_links[south], sum);
            }
        }
    }

    fn consume(&mut self, out_linear: &mut [u64]) {
        let (ring_dim, size_q, size_p) = (
            self.shape.ring_dim(),
            self.shape.size_q(),
            self.shape.size_p(),
        );
        for i in 0..size_q {
            for j in 0..size_p {
                let (west, north) = (self.x_link(i, j), self.sum_link(j, i));
                let x: u64 = pop(&mut self.x_links[west]);
                let sum: u128 = pop(&mut self.sum_links[north]);
                self.pes[i * size_p + j].latch(x, sum);
            }
            let drain: usize = self.x_link(i, size_p);
            pop(&mut self.x_links[drain]);
        }
        for j in 0..size_p {
            let link: usize = self.sum_link(j, size_q);
            let sum: u128 = pop(&mut self.sum_links[link]);
            let modulus: u64 = self.pes[(size_q - 1) * size_p + j].modulus();
            let collector: &mut Collector = &mut self.collectors[j];
            if collector.discarded < size_q + j {
                collector.discarded += 1;
            } else if collector.captured < ring_dim {
                out_linear[collector.captured * size_p + j] = (sum % modulus as u128) as u64;
                collector.captured += 1;
            }
        }
    }
}

/// Every producer pushes once and every consumer pops once per cycle, so a
/// link never holds more than one word between phases.
#[inline(always)]
fn push<T: Copy + Default>(link: &mut Fifo<T>, value: T) {
    let accepted: bool = link.push(value);
    debug_assert!(accepted, "systolic link overflow");
}

#[inline(always)]
fn pop<T: Copy + Default>(link: &mut Fifo<T>) -> T {
    let value: Option<T> = link.pop();
    debug_assert!(value.is_some(), "systolic link underflow");
    value.unwrap_or_default()
}

fn check_len(context: &'static str, expected: usize, got: usize) -> Result<()> {
    if got < expected {
        return Err(CoprocError::BufferTooShort {
            context,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_operands(context: &'static str, values: &[u64]) -> Result<()> {
    match values.iter().find(|x| **x >= MODULUS_BOUND) {
        Some(x) => Err(CoprocError::OperandOutOfRange {
            context,
            value: *x,
            bound: MODULUS_BOUND,
        }),
        None => Ok(()),
    }
}

/// Runs one base conversion: `x_linear` is `RING_DIM×SIZE_Q`, `w_linear` is
/// `SIZE_Q×SIZE_P`, `mod_linear` is `SIZE_P` and `out_linear` receives
/// `RING_DIM×SIZE_P`, all row-major.
#[instrument(
    level = "debug",
    skip_all,
    fields(ring_dim = shape.ring_dim(), size_q = shape.size_q(), size_p = shape.size_p())
)]
pub fn bconv_systolic(
    shape: BconvShape,
    x_linear: &[u64],
    w_linear: &[u64],
    mod_linear: &[u64],
    out_linear: &mut [u64],
) -> Result<BconvReport> {
    let array: SystolicArray = SystolicArray::new(shape, w_linear, mod_linear)?;
    let report: BconvReport = array.run(x_linear, out_linear)?;
    debug!(cycles = report.cycles, "bconv done");
    Ok(report)
}
