//! Feature sources for the comm-word kernel
//!
//! This module provides `WordFeatures` implementations that turn symbol
//! sequences into sorted word histograms.

pub mod alphabet;
pub mod sequences;

pub use self::alphabet::*;
pub use self::sequences::*;
