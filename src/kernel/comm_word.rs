//! Comm-word (spectrum) kernel implementation
//!
//! The comm-word kernel compares two word histograms by the counts of the
//! words they share:
//! K(x, y) = Σ_w c_x(w) · c_y(w)
//!
//! With `use_sign` every nonzero count is treated as 1, turning it into a
//! presence kernel that counts shared words.
//!
//! Raw values are scaled by one of six normalization rules. `Sqrt` and
//! `Full` read a diagonal cache of `sqrt(K(x, x))` values that is built when
//! the feature sets are bound.
//!
//! For linear scoring, a weighted sum of lhs histograms can be folded into a
//! dense dictionary indexed by word id (`LinearOptimization`). Each rhs
//! vector is then scored in O(nnz) without touching the training vectors.
//! That path does not normalize; callers fold normalization into the weights
//! (see `normalize_lhs`).

use crate::cache::{CacheStats, KernelCache};
use crate::core::{
    KernelConfig, KernelError, NormalizationType, Result, Side, WordFeatures, MAX_CACHE_SIZE_MB,
};
use crate::kernel::{DiagonalCache, Kernel, LinearOptimization, OptimizationDictionary};
use crate::persistence;
use log::{debug, warn};
use std::io::{Read, Write};
use std::sync::Arc;

/// Spectrum kernel over two bound word-feature sets
pub struct CommWordKernel<F: WordFeatures> {
    config: KernelConfig,
    lhs: Option<Arc<F>>,
    rhs: Option<Arc<F>>,
    diagonal: DiagonalCache,
    dictionary: Option<OptimizationDictionary>,
    value_cache: Option<KernelCache>,
}

impl<F: WordFeatures> CommWordKernel<F> {
    /// Creates a kernel with an explicit cache size (MB), sign mode and normalization
    ///
    /// # Examples
    /// ```
    /// use commword::data::WordStringFeatures;
    /// use commword::{CommWordKernel, NormalizationType};
    ///
    /// let kernel: CommWordKernel<WordStringFeatures> =
    ///     CommWordKernel::new(10, false, NormalizationType::Full);
    /// assert!(!kernel.is_initialized());
    /// ```
    pub fn new(cache_size: usize, use_sign: bool, normalization: NormalizationType) -> Self {
        Self::with_config(KernelConfig {
            cache_size,
            use_sign,
            normalization,
        })
    }

    /// Creates a kernel from a configuration.
    ///
    /// A `cache_size` above `MAX_CACHE_SIZE_MB` is clamped; use
    /// `KernelConfig::validate` to reject it instead.
    pub fn with_config(config: KernelConfig) -> Self {
        if config.validate().is_err() {
            warn!(
                "Cache size {} MB clamped to {} MB",
                config.cache_size, MAX_CACHE_SIZE_MB
            );
        }
        let value_cache = (config.cache_size > 0).then(|| {
            KernelCache::with_memory_limit(config.cache_size.saturating_mul(1024 * 1024))
        });

        Self {
            config,
            lhs: None,
            rhs: None,
            diagonal: DiagonalCache::default(),
            dictionary: None,
            value_cache,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn normalization(&self) -> NormalizationType {
        self.config.normalization
    }

    pub fn use_sign(&self) -> bool {
        self.config.use_sign
    }

    /// Bind a feature pair and build the diagonal cache.
    ///
    /// The cache is rebuilt when `do_init` is set, when no cache exists, or
    /// when the pair differs from the bound one. When `lhs` and `rhs` are the
    /// same `Arc` the diagonal is computed once and shared. On error the
    /// previous binding and cache are left untouched.
    pub fn init(&mut self, lhs: Arc<F>, rhs: Arc<F>, do_init: bool) -> Result<()> {
        let shared = Arc::ptr_eq(&lhs, &rhs);

        if do_init || !self.is_bound_to(&lhs, &rhs) || !self.diagonal.is_initialized() {
            self.diagonal =
                DiagonalCache::build(lhs.as_ref(), rhs.as_ref(), shared, self.config.use_sign)?;
        }

        if let Some(dictionary) = &self.dictionary {
            if dictionary.len() != lhs.num_symbols() {
                warn!(
                    "Dropping optimization dictionary of size {}: lhs alphabet has {} words",
                    dictionary.len(),
                    lhs.num_symbols()
                );
                self.dictionary = None;
            }
        }

        debug!(
            "Bound {} lhs and {} rhs vectors",
            lhs.num_vectors(),
            rhs.num_vectors()
        );
        self.lhs = Some(lhs);
        self.rhs = Some(rhs);
        self.invalidate_values();
        Ok(())
    }

    /// Release the diagonal cache and the optimization dictionary
    pub fn cleanup(&mut self) {
        self.delete_optimization();
        self.diagonal.clear();
        self.invalidate_values();
    }

    /// Unbind the lhs feature set and release its diagonal entries
    pub fn remove_lhs(&mut self) {
        self.lhs = None;
        self.diagonal.release_lhs();
        self.invalidate_values();
    }

    /// Unbind the rhs feature set and release its diagonal entries
    pub fn remove_rhs(&mut self) {
        self.rhs = None;
        self.diagonal.release_rhs();
        self.invalidate_values();
    }

    /// Whether the diagonal cache is fully built for both sides
    pub fn is_initialized(&self) -> bool {
        self.diagonal.is_initialized()
    }

    /// Whether lhs and rhs diagonals share one buffer
    pub fn has_shared_diagonal(&self) -> bool {
        self.diagonal.is_shared()
    }

    pub fn sqrtdiag_lhs(&self) -> Option<&[f64]> {
        self.diagonal.lhs()
    }

    pub fn sqrtdiag_rhs(&self) -> Option<&[f64]> {
        self.diagonal.rhs()
    }

    /// Apply the configured normalization of lhs vector `idx` to `value`.
    ///
    /// Normalization is linear in `value`, so normalizing a training weight
    /// before `init_optimization` makes `compute_optimized` equal the
    /// weighted sum of normalized kernel values.
    pub fn normalize_lhs(&self, value: f64, idx: usize) -> Result<f64> {
        let lhs = self.features(Side::Lhs)?;
        check_index(Side::Lhs, idx, lhs.num_vectors())?;

        let sqrt_diag = if self.config.normalization.needs_diagonal() {
            let diag = self.diagonal.lhs().ok_or_else(|| {
                KernelError::Uninitialized("diagonal cache not built".to_string())
            })?;
            let entry = diag.get(idx).copied().ok_or_else(|| {
                KernelError::Uninitialized(format!("no diagonal entry for lhs vector {idx}"))
            })?;
            Some(entry)
        } else {
            None
        };

        self.config
            .normalization
            .normalize(value, sqrt_diag, lhs.vector_len(idx)?)
    }

    /// `compute` through the LRU value cache
    pub fn kernel(&mut self, a: usize, b: usize) -> Result<f64> {
        if let Some(value) = self.value_cache.as_mut().and_then(|cache| cache.get(a, b)) {
            return Ok(value);
        }

        let value = self.compute(a, b)?;
        if let Some(cache) = self.value_cache.as_mut() {
            cache.put(a, b, value);
        }
        Ok(value)
    }

    /// Value cache statistics, if caching is enabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.value_cache.as_ref().map(KernelCache::stats)
    }

    /// Accumulated dictionary weights, indexed by word id
    pub fn get_dictionary(&self) -> Option<&[f64]> {
        self.dictionary.as_ref().map(OptimizationDictionary::weights)
    }

    /// Number of dictionary entries (0 when none is allocated)
    pub fn dictionary_size(&self) -> usize {
        self.dictionary.as_ref().map_or(0, OptimizationDictionary::len)
    }

    /// Write the diagonal cache as init data
    pub fn save_init<W: Write>(&self, writer: W) -> Result<()> {
        persistence::write_diagonal(&self.diagonal, writer)
    }

    /// Replace the diagonal cache with previously saved init data.
    ///
    /// Both sides must be bound to the feature sets the data was computed
    /// for; only the vector counts can be checked.
    pub fn load_init<R: Read>(&mut self, reader: R) -> Result<()> {
        let lhs = self.features(Side::Lhs)?;
        let rhs = self.features(Side::Rhs)?;

        let diagonal = persistence::read_diagonal(
            reader,
            Arc::ptr_eq(lhs, rhs),
            lhs.num_vectors(),
            rhs.num_vectors(),
        )?;

        self.diagonal = diagonal;
        self.invalidate_values();
        Ok(())
    }

    fn features(&self, side: Side) -> Result<&Arc<F>> {
        let features = match side {
            Side::Lhs => self.lhs.as_ref(),
            Side::Rhs => self.rhs.as_ref(),
        };
        features.ok_or(KernelError::NotBound(side))
    }

    fn is_bound_to(&self, lhs: &Arc<F>, rhs: &Arc<F>) -> bool {
        match (&self.lhs, &self.rhs) {
            (Some(l), Some(r)) => Arc::ptr_eq(l, lhs) && Arc::ptr_eq(r, rhs),
            _ => false,
        }
    }

    fn invalidate_values(&mut self) {
        if let Some(cache) = self.value_cache.as_mut() {
            cache.clear();
        }
    }
}

impl<F: WordFeatures> Kernel for CommWordKernel<F> {
    fn name(&self) -> &'static str {
        "CommWord"
    }

    fn num_lhs(&self) -> usize {
        self.lhs.as_ref().map_or(0, |f| f.num_vectors())
    }

    fn num_rhs(&self) -> usize {
        self.rhs.as_ref().map_or(0, |f| f.num_vectors())
    }

    fn compute(&self, a: usize, b: usize) -> Result<f64> {
        let lhs = self.features(Side::Lhs)?;
        let rhs = self.features(Side::Rhs)?;
        check_index(Side::Lhs, a, lhs.num_vectors())?;
        check_index(Side::Rhs, b, rhs.num_vectors())?;

        let x = lhs.histogram(a)?;
        let y = rhs.histogram(b)?;
        let raw = x.dot(&y, self.config.use_sign);

        self.normalize_lhs(raw, a)
    }
}

impl<F: WordFeatures> LinearOptimization for CommWordKernel<F> {
    fn init_optimization(&mut self, indices: &[usize], weights: &[f64]) -> Result<()> {
        if indices.len() != weights.len() {
            return Err(KernelError::InvalidParameter(format!(
                "{} indices but {} weights",
                indices.len(),
                weights.len()
            )));
        }

        let lhs = Arc::clone(self.features(Side::Lhs)?);
        for &idx in indices {
            check_index(Side::Lhs, idx, lhs.num_vectors())?;
        }

        // Accumulate into a copy so a failed fetch keeps the old dictionary
        let mut staged = match &self.dictionary {
            Some(dictionary) => dictionary.try_clone()?,
            None => {
                debug!("Allocating dictionary of {} words", lhs.num_symbols());
                OptimizationDictionary::new(lhs.num_symbols())?
            }
        };

        for (&idx, &weight) in indices.iter().zip(weights) {
            let histogram = lhs.histogram(idx)?;
            staged.accumulate(&histogram, weight, self.config.use_sign)?;
        }

        debug!(
            "Accumulated {} vectors into optimization dictionary",
            indices.len()
        );
        self.dictionary = Some(staged);
        Ok(())
    }

    fn delete_optimization(&mut self) {
        if self.dictionary.take().is_some() {
            debug!("Released optimization dictionary");
        }
    }

    fn compute_optimized(&self, idx: usize) -> Result<f64> {
        let dictionary = self.dictionary.as_ref().ok_or_else(|| {
            KernelError::Uninitialized("optimization dictionary not built".to_string())
        })?;

        let rhs = self.features(Side::Rhs)?;
        check_index(Side::Rhs, idx, rhs.num_vectors())?;

        let histogram = rhs.histogram(idx)?;
        dictionary.score(&histogram, self.config.use_sign)
    }

    fn add_to_normal(&mut self, idx: usize, weight: f64) -> Result<()> {
        let lhs = Arc::clone(self.features(Side::Lhs)?);
        check_index(Side::Lhs, idx, lhs.num_vectors())?;
        let histogram = lhs.histogram(idx)?;

        let (mut dictionary, created) = match self.dictionary.take() {
            Some(dictionary) => (dictionary, false),
            None => (OptimizationDictionary::new(lhs.num_symbols())?, true),
        };

        // accumulate() leaves the dictionary untouched when it fails
        let result = dictionary.accumulate(&histogram, weight, self.config.use_sign);
        if result.is_ok() || !created {
            self.dictionary = Some(dictionary);
        }
        result
    }

    fn clear_normal(&mut self) {
        if let Some(dictionary) = self.dictionary.as_mut() {
            dictionary.clear();
        }
    }
}

fn check_index(side: Side, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(KernelError::InvalidIndex { side, index, len })
    }
}
