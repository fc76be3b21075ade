//! Dense word-weight dictionary for linear scoring
//!
//! Accumulates `Σ_k w_k · h_k` over training histograms into one array
//! indexed by word id, so a new vector is scored in O(nnz).

use crate::core::types::term;
use crate::core::{KernelError, Result, WordHistogram};

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationDictionary {
    weights: Vec<f64>,
}

impl OptimizationDictionary {
    /// Allocate a zeroed dictionary with one weight per word id
    pub fn new(size: usize) -> Result<Self> {
        let mut weights = Vec::new();
        weights
            .try_reserve_exact(size)
            .map_err(|_| KernelError::Allocation(size))?;
        weights.resize(size, 0.0);
        Ok(Self { weights })
    }

    /// Copy the dictionary, surfacing allocation failure instead of aborting
    pub fn try_clone(&self) -> Result<Self> {
        let mut weights = Vec::new();
        weights
            .try_reserve_exact(self.weights.len())
            .map_err(|_| KernelError::Allocation(self.weights.len()))?;
        weights.extend_from_slice(&self.weights);
        Ok(Self { weights })
    }

    /// Add `weight · h` to the dictionary. Leaves it untouched on error.
    pub fn accumulate(&mut self, histogram: &WordHistogram, weight: f64, use_sign: bool) -> Result<()> {
        self.check_words(histogram)?;
        for (word, count) in histogram.iter() {
            self.weights[usize::from(word)] += weight * term(count, use_sign);
        }
        Ok(())
    }

    /// Dot product of `h` with the accumulated weights
    pub fn score(&self, histogram: &WordHistogram, use_sign: bool) -> Result<f64> {
        self.check_words(histogram)?;
        Ok(histogram
            .iter()
            .map(|(word, count)| self.weights[usize::from(word)] * term(count, use_sign))
            .sum())
    }

    /// Zero every weight, keeping the allocation
    pub fn clear(&mut self) {
        self.weights.fill(0.0);
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn check_words(&self, histogram: &WordHistogram) -> Result<()> {
        match histogram.max_word() {
            Some(word) if usize::from(word) >= self.weights.len() => {
                Err(KernelError::InvalidParameter(format!(
                    "word {} outside dictionary of size {}",
                    word,
                    self.weights.len()
                )))
            }
            _ => Ok(()),
        }
    }
}
