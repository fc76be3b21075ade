//! Comm-word (spectrum) string kernel for support vector machines
//!
//! Compares sequences by the k-mer words they share, with six normalization
//! rules and a dictionary fast path for scoring against a trained linear
//! combination of vectors.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod persistence;

// Re-export main types for convenience
pub use crate::api::{kernel_matrix, kernel_row, LinearScorer};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{KernelError, Result, Side};
pub use crate::data::{Alphabet, WordStringFeatures};
pub use crate::kernel::{CommWordKernel, Kernel, LinearOptimization};
pub use crate::persistence::DictionarySnapshot;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
