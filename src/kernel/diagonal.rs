//! Diagonal self-similarity cache
//!
//! Holds `sqrt(k(x, x))` for every bound lhs and rhs vector. When both sides
//! are the same feature set the two sides share one buffer; the buffer is
//! released once neither side references it.

use crate::core::{KernelError, Result, WordFeatures};
use log::debug;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct DiagonalCache {
    lhs: Option<Arc<[f64]>>,
    rhs: Option<Arc<[f64]>>,
}

impl DiagonalCache {
    /// Compute the cache for a feature pair; `shared` means lhs and rhs are the same set
    pub fn build<F: WordFeatures>(lhs: &F, rhs: &F, shared: bool, use_sign: bool) -> Result<Self> {
        let lhs_diag = sqrt_self_similarities(lhs, use_sign)?;
        let rhs_diag = if shared {
            None
        } else {
            Some(sqrt_self_similarities(rhs, use_sign)?)
        };

        debug!(
            "Built diagonal cache: {} lhs entries, {} rhs entries{}",
            lhs_diag.len(),
            rhs_diag.as_ref().map_or(lhs_diag.len(), Vec::len),
            if shared { " (shared)" } else { "" }
        );

        Ok(Self::from_parts(lhs_diag, rhs_diag))
    }

    /// Assemble a cache from fully computed arrays; `rhs == None` shares the lhs buffer
    pub fn from_parts(lhs: Vec<f64>, rhs: Option<Vec<f64>>) -> Self {
        let lhs: Arc<[f64]> = lhs.into();
        let rhs = match rhs {
            Some(rhs) => rhs.into(),
            None => Arc::clone(&lhs),
        };
        Self {
            lhs: Some(lhs),
            rhs: Some(rhs),
        }
    }

    /// Both sides present
    pub fn is_initialized(&self) -> bool {
        self.lhs.is_some() && self.rhs.is_some()
    }

    /// Whether lhs and rhs reference the same buffer
    pub fn is_shared(&self) -> bool {
        match (&self.lhs, &self.rhs) {
            (Some(lhs), Some(rhs)) => Arc::ptr_eq(lhs, rhs),
            _ => false,
        }
    }

    pub fn lhs(&self) -> Option<&[f64]> {
        self.lhs.as_deref()
    }

    pub fn rhs(&self) -> Option<&[f64]> {
        self.rhs.as_deref()
    }

    pub fn release_lhs(&mut self) {
        self.lhs = None;
    }

    pub fn release_rhs(&mut self) {
        self.rhs = None;
    }

    pub fn clear(&mut self) {
        self.lhs = None;
        self.rhs = None;
    }
}

/// `sqrt(h · h)` for every vector of a feature set
fn sqrt_self_similarities<F: WordFeatures>(features: &F, use_sign: bool) -> Result<Vec<f64>> {
    let n = features.num_vectors();
    let mut diag = Vec::new();
    diag.try_reserve_exact(n)
        .map_err(|_| KernelError::Allocation(n))?;

    for i in 0..n {
        let histogram = features.histogram(i)?;
        diag.push(histogram.self_dot(use_sign).sqrt());
    }

    Ok(diag)
}
