//! End-to-end exchanges of one context and one value.
//!
//! Each test sends context 10 and value 2 through a pool of slow
//! multiplying workers and checks what a caller can rely on for a given
//! pool size and synchronization strategy.

use crate::common::{collect_all, slow_pipeline, workers_with_context};
use cp_error::{CpError, ErrorCategory, classify_error};
use cp_pipeline::RunningPipeline;
use cp_types::PipelineState;
use futures::StreamExt;
use std::time::Duration;

#[tokio::test]
async fn test_single_worker_needs_no_synchronization() {
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = slow_pipeline(1, Duration::ZERO);

    contexts.send(10).await.unwrap();
    values.send(2).await.unwrap();
    drop((contexts, values));

    let items = collect_all(&mut results).await;
    assert_eq!(items.len(), 1);
    assert_eq!(*items[0].as_ref().unwrap(), 20);
    assert_eq!(handle.state(), PipelineState::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_quiescence_makes_ten_workers_safe() {
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = slow_pipeline(10, Duration::from_millis(100));

    contexts.send(10).await.unwrap();
    handle
        .await_quiescence(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(workers_with_context(&handle), 10);

    values.send(2).await.unwrap();
    assert_eq!(results.next().await.unwrap().unwrap(), 20);

    drop((contexts, values));
    assert!(results.next().await.is_none());
    assert_eq!(handle.wait_terminated().await, PipelineState::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unsynchronized_value_races_context() {
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = slow_pipeline(10, Duration::from_millis(100));

    contexts.send(10).await.unwrap();
    values.send(2).await.unwrap();

    // Either outcome is legitimate; only the shape of each is checked.
    match results.next().await.unwrap() {
        Ok(result) => {
            assert_eq!(result, 20);
            drop((contexts, values));
            assert!(results.next().await.is_none());
        }
        Err(error) => {
            assert!(error.is_no_context(), "unexpected error: {error}");
            assert!(results.next().await.is_none());
            assert_eq!(handle.state(), PipelineState::Failed);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_short_sleep_is_not_enough_for_slow_workers() {
    let RunningPipeline {
        contexts,
        values,
        mut results,
        handle,
    } = slow_pipeline(100, Duration::from_millis(2000));

    contexts.send(10).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    values.send(2).await.unwrap();

    let early = tokio::time::timeout(Duration::from_millis(500), results.next()).await;
    match early {
        // Still absorbing: the pool is visibly not quiescent yet.
        Err(_) => {
            let err = handle
                .await_quiescence(Duration::from_millis(50))
                .await
                .unwrap_err();
            assert!(matches!(err, CpError::Timeout { required: 100, .. }));
            assert_eq!(classify_error(&err), ErrorCategory::Recoverable);
        }
        Ok(Some(Err(error))) => assert!(error.is_no_context(), "unexpected error: {error}"),
        Ok(other) => panic!("a clean exchange should not be possible yet: {other:?}"),
    }

    handle.cancel();
}
