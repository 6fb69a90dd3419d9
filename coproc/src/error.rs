//! Error types for the coprocessor boundary.
//!
//! Every variant is a configuration error: it is raised before a kernel
//! touches any tile, never in the middle of a run.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoprocError {
    /// Moduli must lie in [2, 2^62).
    #[error("modulus {modulus} is outside [2, 2^62)")]
    ModulusOutOfRange { modulus: u64 },

    /// Caller-supplied Barrett constants do not match the modulus.
    #[error("barrett constants (m={m}, k_half={k_half}) are invalid for modulus {modulus}")]
    InvalidBarrett { modulus: u64, m: u64, k_half: u64 },

    #[error("{value} is not a power of two")]
    NotPowerOfTwo { value: usize },

    /// The twiddle table packs `log2(SQRT)` stage columns, two twist columns
    /// and `2 * SQRT` inter-pass columns into `RING_DIM = SQRT^2` slots. This
    /// layout does not fit SQRT = 2, so the limit is a layout choice.
    #[error("SQRT={sqrt} is below the supported minimum of {min}")]
    SqrtTooSmall { sqrt: usize, min: usize },

    #[error("SQRT={sqrt} overflows the ring dimension")]
    RingDimOverflow { sqrt: usize },

    #[error("MAX_LIMBS must be at least one")]
    NoLimbs,

    #[error("num_active_limbs={requested} exceeds MAX_LIMBS={max}")]
    TooManyLimbs { requested: usize, max: usize },

    #[error("modulus indices [{offset}, {end}) exceed the {available} installed moduli")]
    ModIndexOutOfRange {
        offset: usize,
        end: usize,
        available: usize,
    },

    #[error("galois element {element} is not coprime with {order}")]
    GaloisNotCoprime { element: usize, order: usize },

    #[error("automorphism step {step} is outside the step table of length {len}")]
    StepOutOfRange { step: usize, len: usize },

    #[error("{context}: buffer holds {got} words, expected at least {expected}")]
    BufferTooShort {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{context}: length mismatch, expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{context}: operand {value} is not below {bound}")]
    OperandOutOfRange {
        context: &'static str,
        value: u64,
        bound: u64,
    },

    #[error("base conversion shape {ring_dim}x{size_q}x{size_p} has an empty dimension")]
    EmptyShape {
        ring_dim: usize,
        size_q: usize,
        size_p: usize,
    },

    #[error("SIZE_Q={size_q} exceeds the accumulator bound of {max} input channels")]
    TooManyInputChannels { size_q: usize, max: usize },

    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("no limb set installed, run INIT first")]
    NotInitialized,

    #[error("limb set was built for a different core configuration")]
    ConfigMismatch,

    #[error("no NTT-friendly prime of {bits} bits left for order {nth_root}")]
    PrimesExhausted { bits: u32, nth_root: u64 },

    #[error("no primitive {order}-th root of unity modulo {modulus}")]
    NoPrimitiveRoot { modulus: u64, order: u64 },

    #[error("{value} is not invertible modulo {modulus}")]
    NotInvertible { value: u64, modulus: u64 },
}

pub type Result<T> = std::result::Result<T, CoprocError>;
