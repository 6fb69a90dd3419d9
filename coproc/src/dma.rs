//! Linear buffers to limb tiles and back, `addr = limb·RING_DIM + i·SQRT + j`.

use crate::config::CoreConfig;
use crate::error::{CoprocError, Result};
use crate::tile::TileBank;
use tracing::trace;

#[inline(always)]
pub fn linear_address(config: &CoreConfig, limb: usize, i: usize, j: usize) -> usize {
    limb * config.ring_dim() + i * config.sqrt() + j
}

pub struct Dma {
    config: CoreConfig,
}

impl Dma {
    pub fn new(config: &CoreConfig) -> Self {
        Self { config: *config }
    }

    fn check(&self, context: &'static str, num_active_limbs: usize, len: usize) -> Result<usize> {
        if num_active_limbs > self.config.max_limbs() {
            return Err(CoprocError::TooManyLimbs {
                requested: num_active_limbs,
                max: self.config.max_limbs(),
            });
        }
        let words: usize = self.config.words(num_active_limbs);
        if len < words {
            return Err(CoprocError::BufferTooShort {
                context,
                expected: words,
                got: len,
            });
        }
        Ok(words)
    }

    /// Copies the first `num_active_limbs` limbs of `src` into `dest`. Tiles
    /// past the active prefix keep their contents.
    pub fn load(&self, src: &[u64], dest: &mut TileBank, num_active_limbs: usize) -> Result<()> {
        let words: usize = self.check("dma load", num_active_limbs, src.len())?;
        src[..words]
            .chunks_exact(self.config.ring_dim())
            .zip(dest.tiles_mut())
            .for_each(|(chunk, tile)| tile.as_mut_slice().copy_from_slice(chunk));
        trace!(limbs = num_active_limbs, words, "dma load");
        Ok(())
    }

    /// Copies the first `num_active_limbs` tiles of `src` into `dest`. Words
    /// past the active prefix keep their contents.
    pub fn store(&self, src: &TileBank, dest: &mut [u64], num_active_limbs: usize) -> Result<()> {
        let words: usize = self.check("dma store", num_active_limbs, dest.len())?;
        dest[..words]
            .chunks_exact_mut(self.config.ring_dim())
            .zip(src.tiles())
            .for_each(|(chunk, tile)| chunk.copy_from_slice(tile.as_slice()));
        trace!(limbs = num_active_limbs, words, "dma store");
        Ok(())
    }
}
