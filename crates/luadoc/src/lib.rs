// lib.rs - Library root shared by the binary, benchmarks and integration tests.

pub mod cli;
pub mod config;
pub mod features;
pub mod index;
pub mod perf;
pub mod reference;
pub mod state;
pub mod syntax;
pub mod utf16;
pub mod workspace;

// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
