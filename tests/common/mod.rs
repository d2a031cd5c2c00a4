//! Shared test utilities for logscope integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Every helper pins "now" so windows and partitions are
//! deterministic.

pub mod assertions;
pub mod builders;
pub mod fake_client;

pub use builders::*;
pub use fake_client::*;
