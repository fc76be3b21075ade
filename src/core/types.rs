//! Core type definitions for the comm-word kernel

use crate::core::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

/// Fixed-width symbol tuple id (e.g. a k-mer code)
pub type Word = u16;

/// Largest alphabet a `Word` can address
pub const MAX_NUM_SYMBOLS: usize = 1 << Word::BITS;

/// Largest kernel value cache, in MB
pub const MAX_CACHE_SIZE_MB: usize = 256;

/// Sparse word-count vector with strictly increasing words
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordHistogram {
    entries: Vec<(Word, u32)>,
}

impl WordHistogram {
    /// Create a histogram from (word, count) pairs, rejecting unsorted or duplicate words
    pub fn new(entries: Vec<(Word, u32)>) -> Result<Self> {
        if let Some(pos) = entries.windows(2).position(|w| w[0].0 >= w[1].0) {
            return Err(KernelError::InvalidParameter(format!(
                "histogram words must be strictly increasing (word {} at position {} followed by {})",
                entries[pos].0,
                pos,
                entries[pos + 1].0
            )));
        }
        Ok(Self { entries })
    }

    /// Create a histogram by sorting a raw word sequence and counting runs
    pub fn from_words(mut words: Vec<Word>) -> Self {
        words.sort_unstable();

        let mut entries: Vec<(Word, u32)> = Vec::new();
        for word in words {
            if let Some((last, count)) = entries.last_mut() {
                if *last == word {
                    *count += 1;
                    continue;
                }
            }
            entries.push((word, 1));
        }

        Self { entries }
    }

    /// Create an empty histogram
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sparse dot product using a merge over both sorted word lists.
    ///
    /// With `use_sign` every nonzero count is treated as 1, so the result is
    /// the number of words present in both histograms.
    pub fn dot(&self, other: &WordHistogram, use_sign: bool) -> f64 {
        let x = &self.entries;
        let y = &other.entries;
        let mut result = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < x.len() && j < y.len() {
            let (x_word, x_count) = x[i];
            let (y_word, y_count) = y[j];

            if x_word == y_word {
                result += term(x_count, use_sign) * term(y_count, use_sign);
                i += 1;
                j += 1;
            } else if x_word < y_word {
                i += 1;
            } else {
                j += 1;
            }
        }

        result
    }

    /// Dot product of the histogram with itself
    pub fn self_dot(&self, use_sign: bool) -> f64 {
        self.entries
            .iter()
            .map(|&(_, count)| {
                let t = term(count, use_sign);
                t * t
            })
            .sum()
    }

    /// Iterate over (word, count) pairs in word order
    pub fn iter(&self) -> impl Iterator<Item = (Word, u32)> + '_ {
        self.entries.iter().copied()
    }

    /// Largest word in the histogram
    pub fn max_word(&self) -> Option<Word> {
        self.entries.last().map(|&(word, _)| word)
    }

    /// Number of distinct words
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all counts
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|&(_, c)| u64::from(c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-entry contribution of a count, honouring the presence-kernel mode
#[inline]
pub(crate) fn term(count: u32, use_sign: bool) -> f64 {
    if use_sign {
        if count > 0 {
            1.0
        } else {
            0.0
        }
    } else {
        f64::from(count)
    }
}

/// Scaling rule applied to raw kernel values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationType {
    None,
    Sqrt,
    #[default]
    Full,
    SqrtLen,
    Len,
    SqLen,
}

impl NormalizationType {
    /// Whether the variant reads the diagonal cache
    pub fn needs_diagonal(self) -> bool {
        matches!(self, NormalizationType::Sqrt | NormalizationType::Full)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NormalizationType::None => "none",
            NormalizationType::Sqrt => "sqrt",
            NormalizationType::Full => "full",
            NormalizationType::SqrtLen => "sqrtlen",
            NormalizationType::Len => "len",
            NormalizationType::SqLen => "sqlen",
        }
    }
}

impl fmt::Display for NormalizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(NormalizationType::None),
            "sqrt" => Ok(NormalizationType::Sqrt),
            "full" => Ok(NormalizationType::Full),
            "sqrtlen" => Ok(NormalizationType::SqrtLen),
            "len" => Ok(NormalizationType::Len),
            "sqlen" => Ok(NormalizationType::SqLen),
            other => Err(KernelError::InvalidParameter(format!(
                "unknown normalization: {other}"
            ))),
        }
    }
}

/// Configuration for a comm-word kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Kernel value cache size in MB (0 disables the cache)
    pub cache_size: usize,
    /// Presence kernel instead of count kernel
    pub use_sign: bool,
    pub normalization: NormalizationType,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cache_size: 10,
            use_sign: false,
            normalization: NormalizationType::Full,
        }
    }
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set kernel value cache size in MB
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_use_sign(mut self, use_sign: bool) -> Self {
        self.use_sign = use_sign;
        self
    }

    pub fn with_normalization(mut self, normalization: NormalizationType) -> Self {
        self.normalization = normalization;
        self
    }

    /// Reject settings the kernel cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.cache_size > MAX_CACHE_SIZE_MB {
            return Err(KernelError::InvalidParameter(format!(
                "cache size {} MB exceeds the {MAX_CACHE_SIZE_MB} MB limit",
                self.cache_size
            )));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(KernelError::IoError)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| KernelError::SerializationError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_rejects_unsorted_words() {
        assert!(WordHistogram::new(vec![(5, 1), (2, 1)]).is_err());
        assert!(WordHistogram::new(vec![(2, 1), (2, 3)]).is_err());
        assert!(WordHistogram::new(vec![(2, 1), (3, 3)]).is_ok());
    }

    #[test]
    fn test_histogram_from_words() {
        let h = WordHistogram::from_words(vec![7, 2, 7, 7, 1, 2]);
        let entries: Vec<_> = h.iter().collect();
        assert_eq!(entries, vec![(1, 1), (2, 2), (7, 3)]);
        assert_eq!(h.nnz(), 3);
        assert_eq!(h.total_count(), 6);
        assert_eq!(h.max_word(), Some(7));
    }

    #[test]
    fn test_dot_only_overlapping_words() {
        let a = WordHistogram::new(vec![(2, 4), (5, 1)]).unwrap();
        let b = WordHistogram::new(vec![(2, 3), (7, 2)]).unwrap();

        // Only word 2 overlaps: 4 * 3
        assert_eq!(a.dot(&b, false), 12.0);
        assert_eq!(b.dot(&a, false), 12.0);
    }

    #[test]
    fn test_dot_sign_mode_counts_shared_presence() {
        let a = WordHistogram::new(vec![(0, 3), (1, 0), (2, 5)]).unwrap();
        let b = WordHistogram::new(vec![(0, 1), (1, 0), (2, 2)]).unwrap();

        assert_eq!(a.dot(&b, true), 2.0);
        assert_eq!(a.dot(&b, false), 13.0);
    }

    #[test]
    fn test_self_dot() {
        let a = WordHistogram::new(vec![(0, 3), (4, 0), (9, 2)]).unwrap();
        assert_eq!(a.self_dot(false), 13.0);
        assert_eq!(a.self_dot(true), 2.0);
        assert_eq!(a.self_dot(false), a.dot(&a, false));
    }

    #[test]
    fn test_dot_empty() {
        let a = WordHistogram::empty();
        let b = WordHistogram::new(vec![(1, 2)]).unwrap();
        assert_eq!(a.dot(&b, false), 0.0);
        assert_eq!(b.dot(&a, true), 0.0);
        assert!(a.is_empty());
    }

    #[test]
    fn test_normalization_parse_and_display() {
        for variant in [
            NormalizationType::None,
            NormalizationType::Sqrt,
            NormalizationType::Full,
            NormalizationType::SqrtLen,
            NormalizationType::Len,
            NormalizationType::SqLen,
        ] {
            assert_eq!(variant.as_str().parse::<NormalizationType>().unwrap(), variant);
        }
        assert_eq!("FULL".parse::<NormalizationType>().unwrap(), NormalizationType::Full);
        assert!("cubic".parse::<NormalizationType>().is_err());
    }

    #[test]
    fn test_kernel_config_default_and_builder() {
        let config = KernelConfig::default();
        assert_eq!(config.cache_size, 10);
        assert!(!config.use_sign);
        assert_eq!(config.normalization, NormalizationType::Full);

        let config = KernelConfig::new()
            .with_cache_size(0)
            .with_use_sign(true)
            .with_normalization(NormalizationType::Len);
        assert_eq!(config.cache_size, 0);
        assert!(config.use_sign);
        assert_eq!(config.normalization, NormalizationType::Len);
    }

    #[test]
    fn test_kernel_config_json_defaults_missing_fields() {
        let config: KernelConfig =
            serde_json::from_str(r#"{"normalization": "sqlen"}"#).unwrap();
        assert_eq!(config.normalization, NormalizationType::SqLen);
        assert_eq!(config.cache_size, 10);
        assert!(!config.use_sign);
    }

    #[test]
    fn test_kernel_config_rejects_oversized_cache() {
        let config: KernelConfig =
            serde_json::from_str(r#"{"cache_size": 17592186044416}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(KernelError::InvalidParameter(_))
        ));
        assert!(KernelConfig::new()
            .with_cache_size(MAX_CACHE_SIZE_MB)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_kernel_config_from_file_validates() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cache_size": 17592186044416}}"#).unwrap();
        file.flush().unwrap();
        assert!(KernelConfig::from_file(file.path()).is_err());
    }
}
