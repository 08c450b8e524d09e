//! Canonical in-memory model representations.

pub mod oblivious;
