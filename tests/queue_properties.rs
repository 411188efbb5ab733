//! Queue behavior integration tests
//!
//! Drives `ChatQueue` with a scripted mock client. Most tests run on a paused
//! tokio clock so window and cool-down timing is exact.

use std::sync::Arc;
use std::time::Duration;

use chatgate::error::GateError;
use chatgate::llm::{MockLlmClient, MockOutcome};
use chatgate::{AdmissionConfig, ChatQueue, DrainConfig};
use futures::future::join_all;
use tokio::time::{Instant, sleep};

const MINUTE: Duration = Duration::from_secs(60);
const COOLDOWN: Duration = Duration::from_secs(20);

fn queue(mock: &Arc<MockLlmClient>, max_requests: usize) -> ChatQueue {
    ChatQueue::new(
        mock.clone(),
        AdmissionConfig::new(max_requests, MINUTE, COOLDOWN),
        DrainConfig::default(),
    )
}

/// Largest number of calls that started inside any window of length `window`
fn max_calls_in_any_window(starts: &[Instant], window: Duration) -> usize {
    starts
        .iter()
        .map(|&start| starts.iter().filter(|&&t| t >= start && t - start < window).count())
        .max()
        .unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn test_fifo_dispatch_order() {
    let mock = Arc::new(MockLlmClient::new());
    let queue = queue(&mock, 3);

    let prompts: Vec<String> = (1..=8).map(|i| format!("question {}", i)).collect();
    let handles: Vec<_> = prompts.iter().map(|p| queue.submit(p.clone()).unwrap()).collect();

    let results = join_all(handles.into_iter().map(|h| h.wait())).await;

    assert_eq!(mock.prompts(), prompts);
    for (result, prompt) in results.into_iter().zip(&prompts) {
        assert_eq!(result.unwrap(), format!("echo: {}", prompt));
    }
}

#[tokio::test(start_paused = true)]
async fn test_window_rollover_scenario() {
    let mock = Arc::new(MockLlmClient::new());
    let queue = queue(&mock, 2);
    let t0 = Instant::now();

    let first = queue.submit("item 1").unwrap();
    sleep(Duration::from_millis(1)).await;
    let second = queue.submit("item 2").unwrap();
    sleep(Duration::from_millis(1)).await;
    let third = queue.submit("item 3").unwrap();

    for handle in [first, second, third] {
        handle.wait().await.unwrap();
    }

    let calls = mock.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].started_at - t0 < Duration::from_millis(5));
    assert!(calls[1].started_at - t0 < Duration::from_millis(5));

    let third_delay = calls[2].started_at - t0;
    assert!(third_delay >= MINUTE, "third call started after {:?}", third_delay);
    assert!(third_delay < MINUTE + Duration::from_secs(2), "third call started after {:?}", third_delay);
}

#[tokio::test(start_paused = true)]
async fn test_never_more_than_max_per_window() {
    let mock = Arc::new(MockLlmClient::new().with_latency(Duration::from_millis(250)));
    let queue = queue(&mock, 5);

    let handles: Vec<_> = (0..17).map(|i| queue.submit(format!("q{}", i)).unwrap()).collect();
    for result in join_all(handles.into_iter().map(|h| h.wait())).await {
        result.unwrap();
    }

    let starts: Vec<Instant> = mock.calls().iter().map(|c| c.started_at).collect();
    assert_eq!(starts.len(), 17);
    assert!(max_calls_in_any_window(&starts, MINUTE) <= 5);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_after_rejection() {
    let mock = Arc::new(MockLlmClient::new().with_script([MockOutcome::RateLimited]));
    let queue = queue(&mock, 5);
    let t0 = Instant::now();

    let first = queue.submit("item 1").unwrap();
    sleep(Duration::from_millis(1)).await;
    let second = queue.submit("item 2").unwrap();

    let err = first.wait().await.unwrap_err();
    assert!(matches!(err, GateError::RateLimited { retry_after } if retry_after == COOLDOWN));
    assert_eq!(err.retry_after_secs(), Some(20));

    assert_eq!(second.wait().await.unwrap(), "echo: item 2");

    let calls = mock.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].started_at - t0 >= COOLDOWN);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_call_in_flight_under_concurrent_submitters() {
    let mock = Arc::new(MockLlmClient::new().with_latency(Duration::from_millis(5)));
    let queue = queue(&mock, 1000);

    let tasks: Vec<_> = (0..8)
        .map(|caller| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut results = Vec::new();
                for i in 0..4 {
                    let handle = queue.submit(format!("caller {} request {}", caller, i)).unwrap();
                    results.push(handle.wait().await);
                }
                results
            })
        })
        .collect();

    for task in join_all(tasks).await {
        for result in task.unwrap() {
            result.unwrap();
        }
    }

    assert_eq!(mock.calls().len(), 32);
    assert_eq!(mock.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_item_resolves_exactly_once() {
    let mock = Arc::new(MockLlmClient::new().with_script([
        MockOutcome::Reply("ok".to_string()),
        MockOutcome::RateLimited,
        MockOutcome::Fail("upstream 503".to_string()),
        MockOutcome::Panic,
        MockOutcome::Reply("fine".to_string()),
    ]));
    let queue = queue(&mock, 2);

    let handles: Vec<_> = (0..7).map(|i| queue.submit(format!("p{}", i)).unwrap()).collect();
    let results = join_all(handles.into_iter().map(|h| h.wait())).await;

    assert_eq!(results.len(), 7);
    assert_eq!(results[0].as_ref().unwrap(), "ok");
    assert!(matches!(results[1], Err(GateError::RateLimited { .. })));
    assert!(matches!(results[2], Err(GateError::Internal(_))));
    assert!(matches!(results[3], Err(GateError::Internal(_))));
    assert_eq!(results[4].as_ref().unwrap(), "fine");
    assert_eq!(results[5].as_ref().unwrap(), "echo: p5");
    assert_eq!(results[6].as_ref().unwrap(), "echo: p6");

    // Each item reached the client once; none were retried
    assert_eq!(mock.calls().len(), 7);
    assert_eq!(queue.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_drain_flag_resets_and_restarts() {
    let mock = Arc::new(MockLlmClient::new());
    let queue = queue(&mock, 5);

    assert!(!queue.is_draining());
    queue.submit("first").unwrap().wait().await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(!queue.is_draining());
    assert_eq!(queue.pending(), 0);

    let text = queue.submit("second").unwrap().wait().await.unwrap();
    assert_eq!(text, "echo: second");
    sleep(Duration::from_millis(10)).await;
    assert!(!queue.is_draining());
}

#[tokio::test(start_paused = true)]
async fn test_blocked_queue_keeps_head_and_accepts_submissions() {
    let mock = Arc::new(MockLlmClient::new());
    let queue = queue(&mock, 1);

    queue.submit("a").unwrap().wait().await.unwrap();
    let b = queue.submit("b").unwrap();
    sleep(Duration::from_secs(5)).await;

    // Blocked by the window: nothing dispatched, head still queued
    assert_eq!(queue.pending(), 1);
    assert!(queue.is_draining());

    let c = queue.submit("c").unwrap();
    assert_eq!(queue.pending(), 2);

    assert_eq!(b.wait().await.unwrap(), "echo: b");
    assert_eq!(c.wait().await.unwrap(), "echo: c");
    assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_token_budget_blocks_dispatch() {
    let mock = Arc::new(MockLlmClient::new().with_tokens_per_call(100));
    let admission = AdmissionConfig::new(10, MINUTE, COOLDOWN).with_token_budget(150);
    let queue = ChatQueue::new(mock.clone(), admission, DrainConfig::default());
    let t0 = Instant::now();

    let handles: Vec<_> = (0..3).map(|i| queue.submit(format!("t{}", i)).unwrap()).collect();
    for result in join_all(handles.into_iter().map(|h| h.wait())).await {
        result.unwrap();
    }

    let calls = mock.calls();
    assert!(calls[1].started_at - t0 < Duration::from_millis(5));
    assert!(calls[2].started_at - t0 >= MINUTE);
}
