//! CLI argument definitions for cp-demo.

use clap::{Parser, ValueEnum};
pub use cp_cli_common::LogLevel;

/// Sends one context and one value through a pool of slow multiplying
/// workers and reports what came out.
///
/// ## Examples
///
/// Single worker, always deterministic:
///   cp-demo -w 1 --slowness-ms 0
///
/// Ten workers, synchronized on quiescence:
///   cp-demo -w 10 --slowness-ms 100 --wait quiescence
///
/// Ten workers, value sent immediately (result or missing-context error):
///   cp-demo -w 10 --slowness-ms 100 --wait none
#[derive(Parser, Debug)]
#[command(name = "cp-demo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Pool ===
    /// Number of workers (must be >= 1)
    #[arg(short = 'w', long, env = "CP_WORKERS", default_value = "10", value_parser = parse_positive_usize)]
    pub workers: usize,

    /// Time each worker takes to absorb a context, in milliseconds
    #[arg(long, env = "CP_SLOWNESS_MS", default_value = "100")]
    pub slowness_ms: u64,

    // === Inputs ===
    /// Context to broadcast
    #[arg(short = 'c', long, default_value = "10", allow_negative_numbers = true)]
    pub context: i64,

    /// Value to transform
    #[arg(short = 'v', long, default_value = "2", allow_negative_numbers = true)]
    pub value: i64,

    // === Synchronization ===
    /// How to wait between sending the context and sending the value
    #[arg(long, value_enum, default_value = "quiescence")]
    pub wait: WaitMode,

    /// Sleep duration for --wait sleep, in milliseconds
    #[arg(long, default_value = "100")]
    pub wait_ms: u64,

    /// Deadline for quiescence and for the result, in seconds
    #[arg(long, env = "CP_TIMEOUT_SECS", default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    // === Logging ===
    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// Synchronization between the context and the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WaitMode {
    /// Await pipeline quiescence
    Quiescence,
    /// Sleep for --wait-ms
    Sleep,
    /// Send the value immediately
    #[value(name = "none")]
    Immediate,
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}
