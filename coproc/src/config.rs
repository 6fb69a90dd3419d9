use crate::error::{CoprocError, Result};
use std::ops::Range;

/// Smallest supported tile side. The twiddle layout needs `log2(SQRT) + 2 + 2·SQRT`
/// table columns, which only fits into `RING_DIM` entries from `SQRT = 4` on.
pub const MIN_SQRT: usize = 4;

/// Immutable sizing of the tiled kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    sqrt: usize,
    log_sqrt: usize,
    ring_dim: usize,
    bu_num: usize,
    max_limbs: usize,
}

impl CoreConfig {
    /// Returns the configuration for `SQRT×SQRT` tiles and up to `max_limbs`
    /// RNS channels.
    pub fn new(sqrt: usize, max_limbs: usize) -> Result<Self> {
        let log_sqrt: usize = exact_log2(sqrt)? as usize;
        if sqrt < MIN_SQRT {
            return Err(CoprocError::SqrtTooSmall { sqrt, min: MIN_SQRT });
        }
        let ring_dim: usize = sqrt
            .checked_mul(sqrt)
            .and_then(|n| n.checked_mul(2).map(|_| n))
            .ok_or(CoprocError::RingDimOverflow { sqrt })?;
        if max_limbs == 0 {
            return Err(CoprocError::NoLimbs);
        }
        Ok(Self {
            sqrt,
            log_sqrt,
            ring_dim,
            bu_num: sqrt >> 1,
            max_limbs,
        })
    }

    #[inline(always)]
    pub fn sqrt(&self) -> usize {
        self.sqrt
    }

    #[inline(always)]
    pub fn log_sqrt(&self) -> usize {
        self.log_sqrt
    }

    #[inline(always)]
    pub fn ring_dim(&self) -> usize {
        self.ring_dim
    }

    #[inline(always)]
    pub fn log_ring_dim(&self) -> usize {
        self.log_sqrt << 1
    }

    /// Butterfly units per stage.
    #[inline(always)]
    pub fn bu_num(&self) -> usize {
        self.bu_num
    }

    #[inline(always)]
    pub fn max_limbs(&self) -> usize {
        self.max_limbs
    }

    /// 2·RING_DIM.
    #[inline(always)]
    pub fn cyclotomic_order(&self) -> usize {
        self.ring_dim << 1
    }

    /// Number of coefficients held by `num_limbs` limbs.
    #[inline(always)]
    pub fn words(&self, num_limbs: usize) -> usize {
        num_limbs * self.ring_dim
    }
}

/// Returns log2(x) for an exact power of two.
pub fn exact_log2(x: usize) -> Result<u32> {
    if x == 0 || x & (x - 1) != 0 {
        return Err(CoprocError::NotPowerOfTwo { value: x });
    }
    Ok(x.trailing_zeros())
}

/// The `(num_active_limbs, mod_idx_offset)` pair of one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveLimbs {
    pub count: usize,
    pub offset: usize,
}

impl ActiveLimbs {
    pub fn new(count: usize, offset: usize) -> Self {
        Self { count, offset }
    }

    /// All limbs from index 0.
    pub fn prefix(count: usize) -> Self {
        Self { count, offset: 0 }
    }

    /// Checks the pair against the tile capacity and the number of installed
    /// moduli, and returns the range of modulus indices in use.
    pub fn validate(&self, max_limbs: usize, available: usize) -> Result<Range<usize>> {
        if self.count > max_limbs {
            return Err(CoprocError::TooManyLimbs {
                requested: self.count,
                max: max_limbs,
            });
        }
        let end: usize = self
            .offset
            .checked_add(self.count)
            .filter(|end| *end <= available)
            .ok_or(CoprocError::ModIndexOutOfRange {
                offset: self.offset,
                end: self.offset.saturating_add(self.count),
                available,
            })?;
        Ok(self.offset..end)
    }
}
