use crate::config::CoreConfig;

/// One limb's `RING_DIM` coefficients laid out as a row-major `SQRT×SQRT` grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    sqrt: usize,
    data: Box<[u64]>,
}

impl Tile {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            sqrt: config.sqrt(),
            data: vec![0u64; config.ring_dim()].into_boxed_slice(),
        }
    }

    /// Builds a tile whose entry `(i, j)` is `f(i, j)`.
    pub fn from_fn<F: FnMut(usize, usize) -> u64>(config: &CoreConfig, mut f: F) -> Self {
        let sqrt: usize = config.sqrt();
        let data: Box<[u64]> = (0..config.ring_dim())
            .map(|idx| f(idx / sqrt, idx % sqrt))
            .collect();
        Self { sqrt, data }
    }

    #[inline(always)]
    pub fn sqrt(&self) -> usize {
        self.sqrt
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.data[i * self.sqrt + j]
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, value: u64) {
        self.data[i * self.sqrt + j] = value
    }

    #[inline(always)]
    pub fn row(&self, i: usize) -> &[u64] {
        &self.data[i * self.sqrt..(i + 1) * self.sqrt]
    }

    #[inline(always)]
    pub fn row_mut(&mut self, i: usize) -> &mut [u64] {
        &mut self.data[i * self.sqrt..(i + 1) * self.sqrt]
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, u64> {
        self.data.chunks_exact(self.sqrt)
    }

    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, u64> {
        self.data.chunks_exact_mut(self.sqrt)
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u64] {
        &self.data
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        &mut self.data
    }

    pub fn copy_from(&mut self, other: &Tile) {
        debug_assert_eq!(self.sqrt, other.sqrt, "tiles of different shape");
        self.data.copy_from_slice(&other.data)
    }
}

/// `MAX_LIMBS` tiles, one per limb slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileBank {
    tiles: Box<[Tile]>,
}

impl TileBank {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            tiles: (0..config.max_limbs()).map(|_| Tile::new(config)).collect(),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline(always)]
    pub fn tile(&self, limb: usize) -> &Tile {
        &self.tiles[limb]
    }

    #[inline(always)]
    pub fn tile_mut(&mut self, limb: usize) -> &mut Tile {
        &mut self.tiles[limb]
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }
}
