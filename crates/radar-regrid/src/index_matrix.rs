//! Grid cell to source sample correspondence.
//!
//! An [`IndexMatrix`] lists, for every cell of a resolved grid, the indices of
//! the samples whose rotated-frame position falls inside it. It depends only
//! on geometry (radar identity, grid, densification factor), so it is built
//! once per [`Signature`] and reused for every later acquisition.

use std::fmt;
use std::io::{Read, Write};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::{CacheError, IndexMatrixStore};
use crate::error::Result;
use crate::grid::ResolvedGrid;
use crate::scan::{canonical_bits, RadarIdentity};

/// Magic bytes at the start of a serialized index matrix.
pub const MAGIC: &[u8; 4] = b"IMTX";

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Cells of `lat_dim x lon_dim`, row-major, each a sorted list of sample indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMatrix {
    lat_dim: usize,
    lon_dim: usize,
    cells: Vec<Vec<usize>>,
}

impl IndexMatrix {
    /// Matrix with no assigned samples.
    pub fn empty(lat_dim: usize, lon_dim: usize) -> Self {
        Self {
            lat_dim,
            lon_dim,
            cells: vec![Vec::new(); lat_dim * lon_dim],
        }
    }

    /// `(lat_dim, lon_dim)`
    pub fn dims(&self) -> (usize, usize) {
        (self.lat_dim, self.lon_dim)
    }

    /// Sample indices of one cell.
    pub fn cell(&self, row: usize, col: usize) -> &[usize] {
        if row >= self.lat_dim || col >= self.lon_dim {
            return &[];
        }
        &self.cells[row * self.lon_dim + col]
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &[usize]> {
        self.cells.iter().map(Vec::as_slice)
    }

    /// Total number of assigned samples.
    pub fn assigned_count(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Number of cells with no samples.
    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    /// Largest assigned sample index.
    pub fn max_index(&self) -> Option<usize> {
        self.cells.iter().filter_map(|c| c.last().copied()).max()
    }

    /// Whether the matrix has the shape of `grid`.
    pub fn fits(&self, grid: &ResolvedGrid) -> bool {
        self.dims() == grid.cell_dims()
    }

    /// Check that every index addresses one of `sample_count` samples and
    /// that no index is assigned to more than one cell.
    pub fn check_samples(&self, sample_count: usize) -> std::result::Result<(), CacheError> {
        let mut seen = vec![false; sample_count];
        for cell in &self.cells {
            for &index in cell {
                match seen.get_mut(index) {
                    None => {
                        return Err(CacheError::corrupt(format!(
                            "sample index {index} out of range for {sample_count} samples"
                        )))
                    }
                    Some(true) => {
                        return Err(CacheError::corrupt(format!(
                            "sample index {index} assigned to more than one cell"
                        )))
                    }
                    Some(slot) => *slot = true,
                }
            }
        }
        Ok(())
    }

    /// Serialize to the compact binary format.
    ///
    /// Layout (little-endian): magic, `u32` version, `u64` lat_dim, `u64`
    /// lon_dim, then per cell a `u64` count followed by `u64` indices.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::result::Result<(), CacheError> {
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(self.lat_dim as u64).to_le_bytes())?;
        writer.write_all(&(self.lon_dim as u64).to_le_bytes())?;

        for cell in &self.cells {
            writer.write_all(&(cell.len() as u64).to_le_bytes())?;
            for &index in cell {
                writer.write_all(&(index as u64).to_le_bytes())?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Deserialize from the binary format written by [`IndexMatrix::write_to`].
    pub fn read_from<R: Read>(mut reader: R) -> std::result::Result<Self, CacheError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CacheError::corrupt("invalid magic bytes"));
        }

        let mut buf4 = [0u8; 4];
        reader.read_exact(&mut buf4)?;
        let version = u32::from_le_bytes(buf4);
        if version != FORMAT_VERSION {
            return Err(CacheError::corrupt(format!(
                "unsupported format version {version}"
            )));
        }

        let lat_dim = read_usize(&mut reader)?;
        let lon_dim = read_usize(&mut reader)?;
        let n_cells = lat_dim
            .checked_mul(lon_dim)
            .ok_or_else(|| CacheError::corrupt(format!("dimensions {lat_dim}x{lon_dim} overflow")))?;

        // Counts come from disk; never trust them for allocation sizes
        let mut cells = Vec::with_capacity(n_cells.min(1 << 20));
        for _ in 0..n_cells {
            let count = read_usize(&mut reader)?;
            let mut cell = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                cell.push(read_usize(&mut reader)?);
            }
            if cell.windows(2).any(|w| w[0] >= w[1]) {
                return Err(CacheError::corrupt("cell indices not strictly increasing"));
            }
            cells.push(cell);
        }

        Ok(Self {
            lat_dim,
            lon_dim,
            cells,
        })
    }
}

fn read_usize<R: Read>(reader: &mut R) -> std::result::Result<usize, CacheError> {
    let mut buf8 = [0u8; 8];
    reader.read_exact(&mut buf8)?;
    usize::try_from(u64::from_le_bytes(buf8))
        .map_err(|_| CacheError::corrupt("value does not fit in usize"))
}

/// Deterministic cache key of an index matrix.
///
/// The readable part (radar name, extent, resolutions, factor) makes cache
/// files auditable by name; the trailing digest covers the exact bit patterns
/// of every input that affects cell membership, so values that print alike
/// still get distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn new(identity: &RadarIdentity, grid: &ResolvedGrid, azimuth_factor: usize) -> Self {
        let exact = format!(
            "{}|{:016x}|{:016x}|{:016x}|{:016x}|{:016x}|{:016x}|{}|{}|{}",
            identity.canonical(),
            canonical_bits(grid.lon_start),
            canonical_bits(grid.lon_end),
            canonical_bits(grid.lat_start),
            canonical_bits(grid.lat_end),
            canonical_bits(grid.res_m),
            canonical_bits(grid.res_deg),
            grid.lon_dim,
            grid.lat_dim,
            azimuth_factor,
        );

        Self(format!(
            "{}_{}_{}_{}_{}_{}_{}_k{}_g{:016x}",
            identity.file_safe_name(),
            fixed(grid.lon_start, 6),
            fixed(grid.lon_end, 6),
            fixed(grid.lat_start, 6),
            fixed(grid.lat_end, 6),
            fixed(grid.res_m, 3),
            fixed(grid.res_deg, 9),
            azimuth_factor,
            fnv1a64(exact.as_bytes()),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used by file-backed stores.
    pub fn file_name(&self) -> String {
        format!("index_matrix_{}.imx", self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-precision formatting without a negative zero.
fn fixed(value: f64, precision: usize) -> String {
    let s = format!("{:.*}", precision, value);
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}

/// 64-bit FNV-1a. Stable across runs and platforms.
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// How an index matrix was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Loaded from the store.
    Hit,
    /// Not in the store; built.
    Miss,
    /// The store failed or returned an unusable entry; built.
    LoadFailed,
}

impl CacheOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
            Self::LoadFailed => write!(f, "load-failed"),
        }
    }
}

/// Builds index matrices and keeps them in an [`IndexMatrixStore`].
///
/// Store failures never fail a build: a failed load is a miss, a failed
/// store is logged.
pub struct IndexMatrixBuilder<S> {
    store: S,
}

impl<S: IndexMatrixStore> IndexMatrixBuilder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Assign every position to the cell containing it.
    ///
    /// `positions[i]` is the rotated-frame (lon, lat) of sample `i`.
    /// Positions outside the grid are skipped.
    pub fn build(positions: &[(f64, f64)], grid: &ResolvedGrid) -> IndexMatrix {
        Self::build_from(positions.iter().copied().enumerate(), grid)
    }

    /// Like [`IndexMatrixBuilder::build`] for `(index, position)` pairs in
    /// any order. The result does not depend on the order; an index given
    /// more than once is assigned once.
    pub fn build_from<I>(samples: I, grid: &ResolvedGrid) -> IndexMatrix
    where
        I: IntoIterator<Item = (usize, (f64, f64))>,
    {
        let mut matrix = IndexMatrix::empty(grid.lat_dim, grid.lon_dim);
        for (index, (lon, lat)) in samples {
            if let Some((row, col)) = grid.cell_of(lon, lat) {
                matrix.cells[grid.flat_index(row, col)].push(index);
            }
        }
        for cell in &mut matrix.cells {
            cell.sort_unstable();
            cell.dedup();
        }
        matrix
    }

    /// Load the matrix for `signature`, or build it with `build` and store it.
    ///
    /// A loaded matrix whose shape does not match `grid`, or whose indices do
    /// not partition a subset of `sample_count` samples, is discarded.
    pub fn get_or_build<F>(
        &self,
        signature: &Signature,
        grid: &ResolvedGrid,
        sample_count: usize,
        build: F,
    ) -> Result<(IndexMatrix, CacheOutcome)>
    where
        F: FnOnce() -> Result<IndexMatrix>,
    {
        let outcome = match self.store.load(signature) {
            Ok(Some(matrix)) if !matrix.fits(grid) => {
                warn!(
                    signature = %signature,
                    cached = ?matrix.dims(),
                    expected = ?grid.cell_dims(),
                    "Cached index matrix has wrong shape, rebuilding"
                );
                CacheOutcome::LoadFailed
            }
            Ok(Some(matrix)) => match matrix.check_samples(sample_count) {
                Ok(()) => {
                    info!(signature = %signature, "Index matrix cache hit");
                    return Ok((matrix, CacheOutcome::Hit));
                }
                Err(e) => {
                    warn!(signature = %signature, error = %e, "Cached index matrix does not match samples, rebuilding");
                    CacheOutcome::LoadFailed
                }
            },
            Ok(None) => {
                info!(signature = %signature, "Index matrix cache miss");
                CacheOutcome::Miss
            }
            Err(e) => {
                warn!(signature = %signature, error = %e, "Index matrix cache load failed, rebuilding");
                CacheOutcome::LoadFailed
            }
        };

        let start = Instant::now();
        let matrix = build()?;
        debug!(
            signature = %signature,
            cells = matrix.cells.len(),
            assigned = matrix.assigned_count(),
            empty_cells = matrix.empty_cells(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built index matrix"
        );

        if let Err(e) = self.store.store(signature, &matrix) {
            warn!(signature = %signature, error = %e, "Failed to store index matrix");
        }
        Ok((matrix, outcome))
    }
}
