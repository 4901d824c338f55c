//! Main execution logic for cp-demo.

use anyhow::Result;
use cp_error::CpError;
use cp_pipeline::{Pipeline, PipelineConfig, RunningPipeline, StatsSnapshot};
use cp_processor::slow_multiply_factory;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::args::{Cli, WaitMode};

/// What the pipeline produced.
#[derive(Debug)]
pub enum Outcome {
    /// A clean result
    Result(i64),

    /// The pipeline failed
    Failed(CpError),

    /// Quiescence or the result did not arrive in time
    TimedOut(CpError),
}

/// Outcome plus the statistics gathered while producing it.
#[derive(Debug)]
pub struct Report {
    pub outcome: Outcome,
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
}

/// Run one exchange with the provided arguments.
pub async fn execute(args: Cli) -> Result<Report> {
    let timeout = Duration::from_secs(args.timeout_secs);
    let config = PipelineConfig::new()
        .with_pool_size(args.workers)
        .with_quiescence_timeout(timeout);

    // Validate configuration
    config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;

    let factory = slow_multiply_factory::<i64, i64>(Duration::from_millis(args.slowness_ms));
    let pipeline = Pipeline::builder(factory).with_config(config).build()?;

    info!(
        workers = args.workers,
        slowness_ms = args.slowness_ms,
        wait = ?args.wait,
        "Starting pipeline"
    );

    let start = Instant::now();
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = pipeline.start();

    contexts.send(args.context).await?;

    match args.wait {
        WaitMode::Quiescence => match handle.await_default_quiescence().await {
            Ok(()) => info!("Pipeline quiescent"),
            Err(error @ CpError::Timeout { .. }) => {
                warn!(error = %error, "Quiescence not reached");
                handle.cancel();
                return Ok(Report {
                    outcome: Outcome::TimedOut(error),
                    stats: handle.stats(),
                    elapsed: start.elapsed(),
                });
            }
            Err(error) => {
                return Ok(Report {
                    outcome: Outcome::Failed(error),
                    stats: handle.stats(),
                    elapsed: start.elapsed(),
                });
            }
        },
        WaitMode::Sleep => tokio::time::sleep(Duration::from_millis(args.wait_ms)).await,
        WaitMode::Immediate => {}
    }

    // A failed pipeline refuses the value; its error is on the result stream.
    if let Err(error) = values.send(args.value).await {
        warn!(error = %error, "Value not accepted");
    }
    contexts.close();
    values.close();

    let outcome = match tokio::time::timeout(timeout, results.next()).await {
        Ok(Some(Ok(result))) => Outcome::Result(result),
        Ok(Some(Err(error))) => Outcome::Failed(error),
        Ok(None) => Outcome::Failed(handle.failure().unwrap_or(CpError::InputClosed("value"))),
        Err(_) => {
            let stats = handle.stats();
            let absorbed = stats
                .lanes
                .iter()
                .filter(|lane| lane.contexts_absorbed > 0)
                .count();
            handle.cancel();
            Outcome::TimedOut(CpError::Timeout {
                waited: timeout,
                absorbed,
                required: handle.pool_size(),
            })
        }
    };

    // Drain so a clean run reaches Completed.
    if matches!(outcome, Outcome::Result(_)) {
        while results.next().await.is_some() {}
    }

    Ok(Report {
        outcome,
        stats: handle.stats(),
        elapsed: start.elapsed(),
    })
}
