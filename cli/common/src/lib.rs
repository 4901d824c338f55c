//! Shared utilities for ctxpool CLI binaries.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_millis, format_number};
pub use logging::init_logging;
