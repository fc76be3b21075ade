//! Sequence alphabets and symbol encoding

use crate::core::{KernelError, Result};
use std::fmt;
use std::str::FromStr;

/// Alphabet a sequence is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// A, C, G, T
    Dna,
    /// A, C, G, U
    Rna,
    /// The 20 standard amino acids
    Protein,
}

const DNA_SYMBOLS: &[u8] = b"ACGT";
const RNA_SYMBOLS: &[u8] = b"ACGU";
const PROTEIN_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

impl Alphabet {
    fn symbols(self) -> &'static [u8] {
        match self {
            Alphabet::Dna => DNA_SYMBOLS,
            Alphabet::Rna => RNA_SYMBOLS,
            Alphabet::Protein => PROTEIN_SYMBOLS,
        }
    }

    /// Number of symbols in the alphabet
    pub fn num_symbols(self) -> usize {
        self.symbols().len()
    }

    /// Map a symbol to its code in `0..num_symbols()` (case-insensitive)
    pub fn encode(self, symbol: u8) -> Option<u16> {
        let upper = symbol.to_ascii_uppercase();
        self.symbols()
            .iter()
            .position(|&s| s == upper)
            .map(|code| code as u16)
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alphabet::Dna => write!(f, "dna"),
            Alphabet::Rna => write!(f, "rna"),
            Alphabet::Protein => write!(f, "protein"),
        }
    }
}

impl FromStr for Alphabet {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dna" => Ok(Alphabet::Dna),
            "rna" => Ok(Alphabet::Rna),
            "protein" => Ok(Alphabet::Protein),
            other => Err(KernelError::InvalidParameter(format!(
                "unknown alphabet: {other}"
            ))),
        }
    }
}
