//! Test helpers
//!
//! Ledgers on temporary directories with an easy difficulty, plus funded
//! wallets for exercising transfers.

pub mod test_utils;

pub use test_utils::*;
