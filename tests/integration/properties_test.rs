//! Ordering, failure, and delivery guarantees across many inputs.

use crate::common::{collect_all, init_tracing, slow_pipeline};
use cp_error::{CpError, Result};
use cp_pipeline::{Pipeline, PipelineConfig, RunningPipeline};
use cp_processor::{FailingProcessor, FnProcessor, MultiplyProcessor, multiply_factory};
use cp_traits::BoxProcessor;
use cp_types::{PipelineState, WorkerId};
use futures::StreamExt;
use std::time::Duration;

#[tokio::test]
async fn test_single_worker_is_deterministic() {
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = slow_pipeline(1, Duration::ZERO);

    // Interleave context updates with values; one producer keeps send order.
    let producer = tokio::spawn(async move {
        for (context, batch) in [(10, 0..5), (3, 5..10), (-1, 10..15)] {
            contexts.send(context).await?;
            for value in batch {
                values.send(value).await?;
            }
        }
        Ok::<_, CpError>(())
    });

    let items = collect_all(&mut results).await;
    producer.await.unwrap().unwrap();

    let produced: Vec<i64> = items.into_iter().map(|item| item.unwrap()).collect();
    let expected: Vec<i64> = (0..5)
        .map(|v| v * 10)
        .chain((5..10).map(|v| v * 3))
        .chain((10..15).map(|v| -v))
        .collect();
    assert_eq!(produced, expected);
    assert_eq!(handle.state(), PipelineState::Completed);
}

#[tokio::test]
async fn test_single_worker_value_first_fails_every_time() {
    for _ in 0..10 {
        let RunningPipeline {
            contexts,
            values,
            mut results,
            ..
        } = slow_pipeline(1, Duration::ZERO);

        values.send(2).await.unwrap();
        contexts.send(10).await.unwrap();
        drop((contexts, values));

        let items = collect_all(&mut results).await;
        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_no_context());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_quiescence_is_safe_for_any_pool_size() {
    for workers in [2, 3, 8, 16] {
        for _ in 0..5 {
            let RunningPipeline {
                contexts,
                values,
                mut results,
                handle,
            } = slow_pipeline(workers, Duration::from_millis(5));

            contexts.send(7).await.unwrap();
            handle
                .await_quiescence(Duration::from_secs(10))
                .await
                .unwrap();
            values.send(6).await.unwrap();
            drop((contexts, values));

            let items = collect_all(&mut results).await;
            assert_eq!(items.len(), 1, "workers={workers}");
            assert_eq!(*items[0].as_ref().unwrap(), 42, "workers={workers}");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_quiescence_waits_for_latest_context() {
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = slow_pipeline(4, Duration::from_millis(10));

    for context in [1, 2, 3] {
        contexts.send(context).await.unwrap();
    }
    handle
        .await_quiescence(Duration::from_secs(10))
        .await
        .unwrap();

    drop(contexts);
    let producer = tokio::spawn(async move {
        for value in 0..20 {
            values.send(value).await?;
        }
        Ok::<_, CpError>(())
    });

    let mut produced: Vec<i64> = collect_all(&mut results)
        .await
        .into_iter()
        .map(|item| item.unwrap())
        .collect();
    producer.await.unwrap().unwrap();
    produced.sort_unstable();
    assert_eq!(produced, (0..20).map(|v| v * 3).collect::<Vec<_>>());

    let stats = handle.stats();
    assert!(stats.lanes.iter().all(|lane| lane.contexts_absorbed == 3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unsynchronized_outcomes_are_one_of_two() {
    for _ in 0..10 {
        let RunningPipeline {
            contexts,
            values,
            mut results,
            ..
        } = slow_pipeline(10, Duration::from_millis(20));

        contexts.send(10).await.unwrap();
        values.send(2).await.unwrap();

        match results.next().await.unwrap() {
            Ok(result) => assert_eq!(result, 20),
            Err(error) => assert!(error.is_no_context(), "unexpected error: {error}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_missing_context_fails_whole_pipeline() {
    let RunningPipeline {
        contexts: _contexts,
        values,
        mut results,
        handle,
    } = slow_pipeline(4, Duration::ZERO);

    let producer = tokio::spawn(async move {
        for value in 0..8 {
            if values.send(value).await.is_err() {
                break;
            }
        }
    });

    let items = collect_all(&mut results).await;
    producer.await.unwrap();

    assert_eq!(items.len(), 1);
    assert!(items[0].as_ref().unwrap_err().is_no_context());
    assert_eq!(handle.state(), PipelineState::Failed);
    assert!(handle.failure().unwrap().is_no_context());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_processing_fault_stops_healthy_workers() {
    let factory = |worker: WorkerId| -> Result<BoxProcessor<i64, i64, i64>> {
        Ok(Box::new(FailingProcessor::new(MultiplyProcessor, 50i64, worker)))
    };
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = Pipeline::builder(factory)
        .with_pool_size(4)
        .build()
        .unwrap()
        .start();

    contexts.send(2).await.unwrap();
    handle.await_default_quiescence().await.unwrap();

    let producer = tokio::spawn(async move {
        let mut accepted = 0;
        for value in 0..1000 {
            if values.send(value).await.is_err() {
                break;
            }
            accepted += 1;
        }
        accepted
    });

    let items = collect_all(&mut results).await;
    let accepted = producer.await.unwrap();

    let (ok, errors): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| item.is_ok());
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0].as_ref().unwrap_err(),
        CpError::Processing { .. }
    ));
    assert!(ok.len() < 1000);
    assert!(accepted < 1000);
    assert_eq!(handle.state(), PipelineState::Failed);
    drop(contexts);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_value_yields_exactly_one_result() {
    init_tracing();
    let config = PipelineConfig::new()
        .with_pool_size(8)
        .with_input_buffer(16);
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = Pipeline::builder(multiply_factory::<i64, i64>())
        .with_config(config)
        .build()
        .unwrap()
        .start();

    contexts.send(3).await.unwrap();
    handle.await_default_quiescence().await.unwrap();

    let producer = tokio::spawn(async move {
        for value in 0..1000 {
            values.send(value).await?;
        }
        Ok::<_, CpError>(())
    });
    drop(contexts);

    let mut produced: Vec<i64> = collect_all(&mut results)
        .await
        .into_iter()
        .map(|item| item.unwrap())
        .collect();
    producer.await.unwrap().unwrap();

    produced.sort_unstable();
    assert_eq!(produced, (0..1000).map(|v| v * 3).collect::<Vec<_>>());

    let stats = handle.stats();
    assert_eq!(stats.values_submitted, 1000);
    assert_eq!(stats.values_processed, 1000);
    assert_eq!(stats.values_failed, 0);
    assert_eq!(handle.state(), PipelineState::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_custom_combine_function() {
    let factory = |_worker: WorkerId| -> Result<BoxProcessor<String, u32, String>> {
        Ok(Box::new(FnProcessor::new(
            |context: &String, value: u32| -> Result<String> { Ok(context.repeat(value as usize)) },
        )))
    };
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = Pipeline::builder(factory)
        .with_pool_size(3)
        .build()
        .unwrap()
        .start();

    contexts.send("ab".to_string()).await.unwrap();
    handle.await_default_quiescence().await.unwrap();
    values.send(3).await.unwrap();
    drop((contexts, values));

    assert_eq!(results.next().await.unwrap().unwrap(), "ababab");
    assert!(results.next().await.is_none());
}
