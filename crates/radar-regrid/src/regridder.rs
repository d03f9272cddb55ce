//! End-to-end regridding of polar scans.

use std::time::Instant;

use projection::{EffectiveEarthBeam, GeodesicForward, PoleRotation, RotatedPole};
use tracing::{debug, info};

use crate::aggregate::{GridAggregator, GriddedField};
use crate::cache::IndexMatrixStore;
use crate::config::RegridConfig;
use crate::error::{RegridError, Result};
use crate::grid::{GridSpec, ResolvedGrid};
use crate::index_matrix::{CacheOutcome, IndexMatrixBuilder, Signature};
use crate::scan::PolarScan;
use crate::source::SampleSource;
use crate::transform::{densify, CoordinateTransformPipeline, SourceSampleSet};

/// Store type produced from a [`RegridConfig`].
pub type BoxedStore = Box<dyn IndexMatrixStore + Send + Sync>;

/// Result of regridding one scan.
#[derive(Debug, Clone)]
pub struct RegridOutput {
    /// Grid with sentinels resolved, for axis labels
    pub grid: ResolvedGrid,
    pub field: GriddedField,
    pub signature: Signature,
    pub cache: CacheOutcome,
}

/// One scan of a pair, with an optional per-radar densification factor.
#[derive(Debug, Clone, Copy)]
pub struct ScanInput<'a> {
    pub scan: &'a PolarScan,
    pub azimuth_factor: Option<usize>,
}

impl<'a> ScanInput<'a> {
    pub fn new(scan: &'a PolarScan) -> Self {
        Self {
            scan,
            azimuth_factor: None,
        }
    }

    pub fn with_factor(mut self, factor: usize) -> Self {
        self.azimuth_factor = Some(factor);
        self
    }
}

/// Transform, bin and aggregate scans onto a grid, reusing index matrices
/// through the injected store.
pub struct Regridder<G, R, S> {
    pipeline: CoordinateTransformPipeline<G, R>,
    builder: IndexMatrixBuilder<S>,
    azimuth_factor: usize,
}

impl Regridder<EffectiveEarthBeam, RotatedPole, BoxedStore> {
    /// Standard beam model, configured pole and cache tiers.
    pub fn from_config(config: &RegridConfig) -> Result<Self> {
        config.validate()?;
        let pole = config.pole.rotated_pole()?;
        Ok(Self::new(
            CoordinateTransformPipeline::standard(pole),
            config.cache_store(),
            config.azimuth_factor,
        ))
    }
}

impl<G, R, S> Regridder<G, R, S>
where
    G: GeodesicForward,
    R: PoleRotation,
    S: IndexMatrixStore,
{
    pub fn new(pipeline: CoordinateTransformPipeline<G, R>, store: S, azimuth_factor: usize) -> Self {
        Self {
            pipeline,
            builder: IndexMatrixBuilder::new(store),
            azimuth_factor,
        }
    }

    pub fn azimuth_factor(&self) -> usize {
        self.azimuth_factor
    }

    pub fn store(&self) -> &S {
        self.builder.store()
    }

    /// Regrid a scan with the default densification factor.
    pub fn regrid(&self, scan: &PolarScan, spec: &GridSpec) -> Result<RegridOutput> {
        self.regrid_with(scan, spec, self.azimuth_factor)
    }

    /// Regrid a scan with an explicit densification factor.
    pub fn regrid_with(&self, scan: &PolarScan, spec: &GridSpec, factor: usize) -> Result<RegridOutput> {
        let mut set = densify(scan, factor)?;
        let grid = self.resolve(spec, &mut set)?;
        self.regrid_set(&mut set, grid)
    }

    /// Read a scan from a source and regrid it.
    pub fn regrid_source(&self, source: &dyn SampleSource, spec: &GridSpec) -> Result<RegridOutput> {
        debug!(source = %source.describe(), "Reading scan");
        let scan = source.read_scan()?;
        self.regrid(&scan, spec)
    }

    /// Regrid two scans onto one grid.
    ///
    /// Sentinel bounds are resolved once, against the first scan, and the
    /// resulting grid is used for both so the fields are congruent.
    pub fn regrid_pair(
        &self,
        first: ScanInput<'_>,
        second: ScanInput<'_>,
        spec: &GridSpec,
    ) -> Result<(RegridOutput, RegridOutput)> {
        let mut a = densify(first.scan, first.azimuth_factor.unwrap_or(self.azimuth_factor))?;
        let grid = self.resolve(spec, &mut a)?;
        let mut b = densify(second.scan, second.azimuth_factor.unwrap_or(self.azimuth_factor))?;

        let out_a = self.regrid_set(&mut a, grid.clone())?;
        let out_b = self.regrid_set(&mut b, grid)?;
        Ok((out_a, out_b))
    }

    /// Fix the grid bounds. Samples are only transformed here if a bound
    /// has to come from the data.
    fn resolve(&self, spec: &GridSpec, set: &mut SourceSampleSet) -> Result<ResolvedGrid> {
        if !spec.needs_data_extent() {
            return spec.resolve_with_extent(None);
        }
        if !set.is_transformed() {
            self.pipeline.apply(set)?;
        }
        let grid = spec.resolve(set)?;
        debug!(
            lon = ?(grid.lon_start, grid.lon_end),
            lat = ?(grid.lat_start, grid.lat_end),
            dims = ?grid.cell_dims(),
            "Resolved grid extent from data"
        );
        Ok(grid)
    }

    fn regrid_set(&self, set: &mut SourceSampleSet, grid: ResolvedGrid) -> Result<RegridOutput> {
        let start = Instant::now();
        let signature = Signature::new(set.identity(), &grid, set.factor);

        let sample_count = set.len();
        let pipeline = &self.pipeline;
        let (matrix, cache) = self.builder.get_or_build(&signature, &grid, sample_count, || {
            if !set.is_transformed() {
                pipeline.apply(set)?;
            }
            let positions = set
                .positions()
                .ok_or_else(|| RegridError::source_failed("sample set has no positions"))?;
            Ok(IndexMatrixBuilder::<S>::build(positions, &grid))
        })?;

        let field = GridAggregator::aggregate(&matrix, set.values())?;

        info!(
            radar = %set.identity().name,
            signature = %signature,
            cache = %cache,
            cells = field.data.len(),
            valid = field.valid_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Regridded scan"
        );

        Ok(RegridOutput {
            grid,
            field,
            signature,
            cache,
        })
    }
}
