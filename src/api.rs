//! High-level helpers for kernel matrices and linear scoring
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use commword::api::LinearScorer;
//! use commword::data::{Alphabet, WordStringFeatures};
//! use commword::KernelConfig;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let train = Arc::new(WordStringFeatures::from_file("train.txt", Alphabet::Dna, 3)?);
//! let test = Arc::new(WordStringFeatures::from_file("test.txt", Alphabet::Dna, 3)?);
//!
//! let mut scorer = LinearScorer::new(KernelConfig::default());
//! scorer.fit(train, test, &[0, 1], &[1.0, -1.0])?;
//! println!("{:?}", scorer.score_all()?);
//! # Ok(())
//! # }
//! ```

use crate::core::{KernelConfig, KernelError, Result, WordFeatures};
use crate::kernel::{CommWordKernel, Kernel, LinearOptimization};
use log::debug;
use std::sync::Arc;

/// Kernel values of lhs vector `a` against every rhs vector
pub fn kernel_row<K: Kernel>(kernel: &K, a: usize) -> Result<Vec<f64>> {
    (0..kernel.num_rhs()).map(|b| kernel.compute(a, b)).collect()
}

/// Full kernel matrix, one row per lhs vector
pub fn kernel_matrix<K: Kernel>(kernel: &K) -> Result<Vec<Vec<f64>>> {
    (0..kernel.num_lhs()).map(|a| kernel_row(kernel, a)).collect()
}

/// Scores rhs vectors against a weighted combination of lhs vectors through
/// the dictionary fast path
pub struct LinearScorer<F: WordFeatures> {
    kernel: CommWordKernel<F>,
}

impl<F: WordFeatures> LinearScorer<F> {
    pub fn new(config: KernelConfig) -> Self {
        Self::with_kernel(CommWordKernel::with_config(config))
    }

    pub fn with_kernel(kernel: CommWordKernel<F>) -> Self {
        Self { kernel }
    }

    /// Bind `train`/`test` and build the dictionary from `weights` over
    /// training vectors `indices`.
    ///
    /// Each weight is scaled by its training vector's normalization first,
    /// so `score(t) == Σ_k weights[k] · K(indices[k], t)`.
    pub fn fit(
        &mut self,
        train: Arc<F>,
        test: Arc<F>,
        indices: &[usize],
        weights: &[f64],
    ) -> Result<()> {
        if indices.len() != weights.len() {
            return Err(KernelError::InvalidParameter(format!(
                "{} indices but {} weights",
                indices.len(),
                weights.len()
            )));
        }

        self.kernel.init(train, test, true)?;

        let folded = indices
            .iter()
            .zip(weights)
            .map(|(&idx, &w)| self.kernel.normalize_lhs(w, idx))
            .collect::<Result<Vec<f64>>>()?;

        self.kernel.delete_optimization();
        self.kernel.init_optimization(indices, &folded)?;
        debug!(
            "Fitted linear scorer on {} training vectors",
            indices.len()
        );
        Ok(())
    }

    /// Score one test vector
    pub fn score(&self, idx: usize) -> Result<f64> {
        self.kernel.compute_optimized(idx)
    }

    /// Score every test vector
    pub fn score_all(&self) -> Result<Vec<f64>> {
        (0..self.kernel.num_rhs()).map(|t| self.score(t)).collect()
    }

    pub fn kernel(&self) -> &CommWordKernel<F> {
        &self.kernel
    }

    pub fn into_kernel(self) -> CommWordKernel<F> {
        self.kernel
    }
}
