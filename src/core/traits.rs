//! Core traits for the comm-word kernel

use crate::core::{Result, WordHistogram};
use std::borrow::Cow;

/// Source of word histograms, one per feature vector
pub trait WordFeatures: Send + Sync {
    /// Number of feature vectors
    fn num_vectors(&self) -> usize;

    /// Alphabet cardinality, i.e. the number of distinct word ids
    fn num_symbols(&self) -> usize;

    /// Histogram of vector `index`
    ///
    /// Callers check `index < num_vectors()` first; implementations may
    /// still fail if the vector has to be produced on demand.
    fn histogram(&self, index: usize) -> Result<Cow<'_, WordHistogram>>;

    /// Number of words in vector `index`
    fn vector_len(&self, index: usize) -> Result<usize>;
}
