//! Comm-word kernel and its supporting caches

pub mod comm_word;
pub mod diagonal;
pub mod dictionary;
pub mod normalization;
pub mod traits;

pub use self::comm_word::*;
pub use self::diagonal::*;
pub use self::dictionary::*;
pub use self::traits::*;
