//! Normalization of raw comm-word kernel values

use crate::core::{KernelError, NormalizationType, Result};

impl NormalizationType {
    /// Scale a raw kernel value.
    ///
    /// `sqrt_diag` is the stored square root of the vector's self-similarity
    /// and must be present for `Sqrt` and `Full`. `seq_len` is the number of
    /// words in the vector. A zero length under the length-based variants
    /// yields an IEEE infinity or NaN; it is not guarded.
    pub fn normalize(self, value: f64, sqrt_diag: Option<f64>, seq_len: usize) -> Result<f64> {
        let len = seq_len as f64;
        let result = match self {
            NormalizationType::None => value,
            NormalizationType::Sqrt => value / require_diagonal(sqrt_diag)?.sqrt(),
            NormalizationType::Full => {
                let d = require_diagonal(sqrt_diag)?;
                value / (d * d)
            }
            NormalizationType::SqrtLen => value / len.sqrt().sqrt(),
            NormalizationType::Len => value / len.sqrt(),
            NormalizationType::SqLen => value / len,
        };
        Ok(result)
    }
}

fn require_diagonal(sqrt_diag: Option<f64>) -> Result<f64> {
    sqrt_diag.ok_or_else(|| {
        KernelError::Uninitialized("normalization requires the diagonal cache".to_string())
    })
}
