//! Infrastructure layer for experiments
//!
//! Provides random sources used for weighted variant selection.

mod random;

pub use random::{SeededRandom, ThreadRandom};
