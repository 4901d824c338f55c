//! Integration tests for ctxpool.
//!
//! Each test builds a real pipeline over the built-in processors and drives
//! it through its public endpoints only.
//!
//! ## Running Integration Tests
//!
//! ```bash
//! cargo test -p integration-tests
//! ```
//!
//! Set `RUST_LOG=debug` to see per-worker context and value events.

mod common;
mod properties_test;
mod scenarios_test;
