//! Kernel init data and dictionary export
//!
//! Init data is the diagonal cache in a flat binary layout: a little-endian
//! `i64` element count followed by that many little-endian `f64` values.
//! A shared diagonal is written as one record, otherwise lhs then rhs.
//!
//! The optimization dictionary can be exported as JSON for inspection.

use crate::core::{KernelError, NormalizationType, Result, WordFeatures};
use crate::kernel::{CommWordKernel, DiagonalCache};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Write a fully built diagonal cache
pub fn write_diagonal<W: Write>(cache: &DiagonalCache, mut writer: W) -> Result<()> {
    let (lhs, rhs) = match (cache.lhs(), cache.rhs()) {
        (Some(lhs), Some(rhs)) => (lhs, rhs),
        _ => {
            return Err(KernelError::Uninitialized(
                "no diagonal cache to save".to_string(),
            ))
        }
    };

    write_record(&mut writer, lhs)?;
    if !cache.is_shared() {
        write_record(&mut writer, rhs)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a diagonal cache for a binding with `n_lhs`/`n_rhs` vectors.
///
/// `shared` selects the single-record layout. Counts that do not match the
/// binding are rejected before any values are read.
pub fn read_diagonal<R: Read>(
    mut reader: R,
    shared: bool,
    n_lhs: usize,
    n_rhs: usize,
) -> Result<DiagonalCache> {
    let lhs = read_record(&mut reader, n_lhs)?;
    let rhs = if shared {
        None
    } else {
        Some(read_record(&mut reader, n_rhs)?)
    };
    Ok(DiagonalCache::from_parts(lhs, rhs))
}

fn write_record<W: Write>(writer: &mut W, values: &[f64]) -> Result<()> {
    let count = i64::try_from(values.len())
        .map_err(|_| KernelError::InvalidFormat(format!("{} values", values.len())))?;
    writer.write_all(&count.to_le_bytes())?;
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_record<R: Read>(reader: &mut R, expected: usize) -> Result<Vec<f64>> {
    let mut word = [0u8; 8];
    reader.read_exact(&mut word)?;
    let count = i64::from_le_bytes(word);

    if usize::try_from(count).ok() != Some(expected) {
        return Err(KernelError::InvalidFormat(format!(
            "record holds {count} values, bound features have {expected}"
        )));
    }

    let mut values = Vec::new();
    values
        .try_reserve_exact(expected)
        .map_err(|_| KernelError::Allocation(expected))?;
    for _ in 0..expected {
        reader.read_exact(&mut word)?;
        values.push(f64::from_le_bytes(word));
    }
    Ok(values)
}

/// Serializable view of an optimization dictionary
#[derive(Debug, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    /// Number of word ids
    pub size: usize,
    /// Accumulated weight per word id
    pub weights: Vec<f64>,
    pub use_sign: bool,
    pub normalization: NormalizationType,
    /// Library version used to create the snapshot
    pub library_version: String,
    /// Creation timestamp
    pub created_at: String,
}

impl DictionarySnapshot {
    /// Capture the dictionary of a kernel
    pub fn from_kernel<F: WordFeatures>(kernel: &CommWordKernel<F>) -> Result<Self> {
        let weights = kernel.get_dictionary().ok_or_else(|| {
            KernelError::Uninitialized("optimization dictionary not built".to_string())
        })?;

        Ok(Self {
            size: weights.len(),
            weights: weights.to_vec(),
            use_sign: kernel.use_sign(),
            normalization: kernel.normalization(),
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Save snapshot to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(KernelError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| KernelError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load snapshot from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(KernelError::IoError)?;
        let reader = BufReader::new(file);
        let snapshot: Self = serde_json::from_reader(reader)
            .map_err(|e| KernelError::SerializationError(e.to_string()))?;

        if snapshot.weights.len() != snapshot.size {
            return Err(KernelError::InvalidFormat(format!(
                "snapshot declares {} words but holds {} weights",
                snapshot.size,
                snapshot.weights.len()
            )));
        }
        Ok(snapshot)
    }

    /// Words with nonzero weight, largest magnitude first
    pub fn top_words(&self, limit: usize) -> Vec<(usize, f64)> {
        let mut words: Vec<(usize, f64)> = self
            .weights
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, w)| w != 0.0)
            .collect();
        words.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        words.truncate(limit);
        words
    }
}
