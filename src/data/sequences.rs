//! K-mer word features built from symbol sequences
//!
//! Supports loading sequence files with one feature vector per line:
//! [label] sequence
//!
//! Example:
//! +1 ACGTTGCA
//! -1 TTGACCAG

use crate::core::{KernelError, Result, Word, WordFeatures, WordHistogram, MAX_NUM_SYMBOLS};
use crate::data::Alphabet;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Word histograms of overlapping k-mers, one per input sequence
#[derive(Debug, Clone)]
pub struct WordStringFeatures {
    alphabet: Alphabet,
    order: usize,
    num_symbols: usize,
    histograms: Vec<WordHistogram>,
    lengths: Vec<usize>,
    labels: Vec<f64>,
}

impl WordStringFeatures {
    /// Build features from sequences, cutting each into k-mers of length `order`
    pub fn new<S: AsRef<str>>(sequences: &[S], alphabet: Alphabet, order: usize) -> Result<Self> {
        let num_symbols = word_space(alphabet, order)?;

        let mut histograms = Vec::with_capacity(sequences.len());
        let mut lengths = Vec::with_capacity(sequences.len());

        for (i, sequence) in sequences.iter().enumerate() {
            let words = encode_kmers(sequence.as_ref(), alphabet, order)
                .map_err(|e| KernelError::ParseError(format!("sequence {i}: {e}")))?;
            lengths.push(words.len());
            histograms.push(WordHistogram::from_words(words));
        }

        Ok(Self {
            alphabet,
            order,
            num_symbols,
            histograms,
            lengths,
            labels: Vec::new(),
        })
    }

    /// Attach one label per feature vector
    pub fn with_labels(mut self, labels: Vec<f64>) -> Result<Self> {
        if labels.len() != self.histograms.len() {
            return Err(KernelError::InvalidParameter(format!(
                "expected {} labels, got {}",
                self.histograms.len(),
                labels.len()
            )));
        }
        self.labels = labels;
        Ok(self)
    }

    /// Load features from a sequence file
    pub fn from_file<P: AsRef<Path>>(path: P, alphabet: Alphabet, order: usize) -> Result<Self> {
        let file = File::open(path).map_err(KernelError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader, alphabet, order)
    }

    /// Load features from a reader (for testing and flexibility)
    pub fn from_reader<R: BufRead>(reader: R, alphabet: Alphabet, order: usize) -> Result<Self> {
        let mut sequences = Vec::new();
        let mut labels = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(KernelError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, sequence) = Self::parse_line(line).map_err(|e| {
                KernelError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;

            match label {
                Some(label) if labels.len() == sequences.len() => labels.push(label),
                None if labels.is_empty() => {}
                _ => {
                    return Err(KernelError::ParseError(format!(
                        "Error parsing line {}: either every line or no line carries a label",
                        line_num + 1
                    )));
                }
            }
            sequences.push(sequence.to_string());
        }

        if sequences.is_empty() {
            return Err(KernelError::ParseError("no sequences found".to_string()));
        }

        let features = Self::new(&sequences, alphabet, order)?;
        if labels.is_empty() {
            Ok(features)
        } else {
            features.with_labels(labels)
        }
    }

    /// Split a line into an optional label and the sequence
    fn parse_line(line: &str) -> std::result::Result<(Option<f64>, &str), String> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.as_slice() {
            [sequence] => Ok((None, *sequence)),
            [label, sequence] => {
                let label = label
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid label: {label}"))?;
                Ok((Some(label), *sequence))
            }
            _ => Err(format!(
                "expected '[label] sequence', got {} fields",
                parts.len()
            )),
        }
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// K-mer length
    pub fn order(&self) -> usize {
        self.order
    }

    /// Labels, if the features were loaded with them
    pub fn labels(&self) -> Option<&[f64]> {
        if self.labels.is_empty() {
            None
        } else {
            Some(&self.labels)
        }
    }
}

impl WordFeatures for WordStringFeatures {
    fn num_vectors(&self) -> usize {
        self.histograms.len()
    }

    fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    fn histogram(&self, index: usize) -> Result<Cow<'_, WordHistogram>> {
        self.histograms
            .get(index)
            .map(Cow::Borrowed)
            .ok_or_else(|| KernelError::FeatureFetch(format!("no feature vector {index}")))
    }

    fn vector_len(&self, index: usize) -> Result<usize> {
        self.lengths
            .get(index)
            .copied()
            .ok_or_else(|| KernelError::FeatureFetch(format!("no feature vector {index}")))
    }
}

/// Number of distinct k-mer words, rejecting spaces a `Word` cannot address
fn word_space(alphabet: Alphabet, order: usize) -> Result<usize> {
    if order == 0 {
        return Err(KernelError::InvalidParameter(
            "k-mer order must be positive".to_string(),
        ));
    }

    u32::try_from(order)
        .ok()
        .and_then(|order| alphabet.num_symbols().checked_pow(order))
        .filter(|&n| n <= MAX_NUM_SYMBOLS)
        .ok_or_else(|| {
            KernelError::InvalidParameter(format!(
                "{alphabet} words of order {order} exceed {MAX_NUM_SYMBOLS} symbols"
            ))
        })
}

/// Encode every overlapping k-mer of `sequence` as a word id
fn encode_kmers(sequence: &str, alphabet: Alphabet, order: usize) -> Result<Vec<Word>> {
    let codes = sequence
        .bytes()
        .map(|symbol| {
            alphabet.encode(symbol).ok_or_else(|| {
                KernelError::ParseError(format!(
                    "symbol '{}' is not in the {alphabet} alphabet",
                    symbol as char
                ))
            })
        })
        .collect::<Result<Vec<u16>>>()?;

    if codes.len() < order {
        return Ok(Vec::new());
    }

    let base = alphabet.num_symbols() as u32;
    let words = codes
        .windows(order)
        .map(|kmer| {
            // Fits in a Word: word_space() bounds base^order
            kmer.iter().fold(0u32, |acc, &c| acc * base + u32::from(c)) as Word
        })
        .collect();

    Ok(words)
}
