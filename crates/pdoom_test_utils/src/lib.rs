//! # P(Doom) Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Scripted players that drive sessions headlessly
//! - Content and scenario fixtures
//! - Batch statistics over many seeds
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;
pub mod players;

/// Re-export proptest for convenience.
pub use proptest;
