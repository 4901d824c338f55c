//! cp-demo CLI
//!
//! Sends one context and one value through a ctxpool pipeline.

use clap::Parser;
use cp_cli_common::{format_millis, format_number, init_logging};

mod args;
mod run;

use args::Cli;
use run::Outcome;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Initialize logging (to stderr, so stdout is clean for the result)
    init_logging(args.log_level)?;

    let workers = args.workers;
    let report = run::execute(args).await?;

    // Report results to stderr
    eprintln!();
    eprintln!("Pipeline finished:");
    eprintln!("  Workers:            {}", workers);
    eprintln!(
        "  Contexts absorbed:  {}",
        format_number(report.stats.lanes.iter().map(|l| l.contexts_absorbed).sum())
    );
    eprintln!(
        "  Values processed:   {}",
        format_number(report.stats.values_processed)
    );
    eprintln!("  Elapsed:            {}", format_millis(report.elapsed));

    match report.outcome {
        Outcome::Result(result) => {
            println!("result={result}");
            Ok(())
        }
        Outcome::Failed(error) => {
            eprintln!("  Error:              {error}");
            std::process::exit(3); // Pipeline failure
        }
        Outcome::TimedOut(error) => {
            eprintln!("  Timeout:            {error}");
            std::process::exit(4); // Deadline exceeded
        }
    }
}
