//! Kernel trait definitions

use crate::core::Result;

/// Kernel over two bound feature sets, addressed by vector index
///
/// `compute` only reads kernel state, so it may be called concurrently for
/// different cells. Rebinding requires exclusive access.
pub trait Kernel: Send + Sync {
    /// Short kernel name
    fn name(&self) -> &'static str;

    /// Number of bound lhs vectors (0 when unbound)
    fn num_lhs(&self) -> usize;

    /// Number of bound rhs vectors (0 when unbound)
    fn num_rhs(&self) -> usize;

    /// Normalized kernel value K(lhs[a], rhs[b])
    fn compute(&self, a: usize, b: usize) -> Result<f64>;
}

/// Linear fast path: fold a weighted sum of lhs vectors into one normal
/// vector and score rhs vectors against it
pub trait LinearOptimization: Kernel {
    /// Accumulate `weights[k] · lhs[indices[k]]` into the normal vector
    fn init_optimization(&mut self, indices: &[usize], weights: &[f64]) -> Result<()>;

    /// Drop the normal vector. Safe to call when none exists.
    fn delete_optimization(&mut self);

    /// Unnormalized dot product of rhs vector `idx` with the normal vector
    fn compute_optimized(&self, idx: usize) -> Result<f64>;

    /// Accumulate a single `weight · lhs[idx]`
    fn add_to_normal(&mut self, idx: usize, weight: f64) -> Result<()>;

    /// Zero the normal vector without releasing it
    fn clear_normal(&mut self);
}
