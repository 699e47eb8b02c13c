//! Job lifecycle integration tests
//!
//! Drives the SDK facade over scripted transports: submit, follow the status
//! stream, fetch the result, cancel, and the stream fallbacks.

use std::sync::Arc;

use falqueue_core::domain::{JobStatus, QueuePriority};
use falqueue_core::port::transport::mocks::{Reply, ScriptedTransport};
use falqueue_core::port::{Method, TransportError};
use falqueue_sdk::{ClientConfig, FalClient};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

const MODEL: &str = "fal-ai/flux/dev";

fn input(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn client(queue: &Arc<ScriptedTransport>) -> FalClient {
    let config = ClientConfig::new("test-key").with_webhook_url("https://example.com/hook");
    FalClient::with_transports(config, queue.clone(), Arc::new(ScriptedTransport::default()))
}

/// Submit -> stream until COMPLETED -> result
#[test]
fn test_submit_stream_result() {
    let queue = Arc::new(ScriptedTransport::new(vec![
        Reply::json(
            200,
            &json!({
                "request_id": "req-123",
                "response_url": "https://queue.fal.run/fal-ai/flux/requests/req-123",
                "status_url": "https://queue.fal.run/fal-ai/flux/requests/req-123/status",
                "cancel_url": "https://queue.fal.run/fal-ai/flux/requests/req-123/cancel"
            }),
        ),
        // Chunk boundaries fall inside lines and inside the prefix
        Reply::event_stream(&[
            ": connected\n",
            "data: {\"status\": \"IN_QUEUE\", \"queue_position\": 2}\nda",
            "ta: {\"status\": \"IN_QUEUE\", \"queue_position\": 1}\n\n",
            "data: {\"status\": \"IN_PROGRESS\", \"logs\": [{\"message\": \"loading\", \"level\": \"INFO\"}]}\n",
            "data: {\"status\": \"COMPLETED\", \"metrics\": {\"inference_time\": 1.5}}\n",
            "data: {\"status\": \"IN_QUEUE\"}\n",
        ]),
        Reply::json(
            200,
            &json!({"images": [{"url": "https://cdn.fal.media/out.png"}], "seed": 7}),
        ),
    ]));
    let client = client(&queue);

    let request = client
        .request(MODEL, input(json!({"prompt": "a castle", "image_urls": "https://x/in.png"})))
        .with_priority(QueuePriority::Low);
    let submitted = client.queue().submit(&request).unwrap();
    assert_eq!(submitted.request_id(), Some("req-123"));
    assert_eq!(submitted.status(), None);
    assert!(submitted.cancel_url().is_some());

    let updates: Vec<_> = client
        .queue()
        .stream_status(MODEL, "req-123", true)
        .unwrap()
        .map(|update| update.unwrap())
        .collect();
    let statuses: Vec<_> = updates.iter().map(|u| u.status().unwrap()).collect();
    assert_eq!(
        statuses,
        vec![
            JobStatus::InQueue,
            JobStatus::InQueue,
            JobStatus::InProgress,
            JobStatus::Completed
        ]
    );
    assert_eq!(updates[1].queue_position(), Some(1));
    assert_eq!(updates[2].logs().unwrap()[0].message, "loading");
    assert_eq!(updates[3].metrics().unwrap()["inference_time"], 1.5);

    let result = client.queue().result(MODEL, "req-123").unwrap();
    assert!(result.is_success());
    assert_eq!(result.payload().unwrap()["seed"], json!(7));

    let requests = queue.requests();
    assert_eq!(requests.len(), 3);

    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].path, "fal-ai/flux");
    assert_eq!(
        requests[0].query_value("fal_webhook"),
        Some("https://example.com/hook")
    );
    assert_eq!(
        requests[0].body,
        Some(json!({
            "prompt": "a castle",
            "image_urls": ["https://x/in.png"],
            "__priority": "low"
        }))
    );

    assert_eq!(requests[1].path, "fal-ai/flux/dev/requests/req-123/status/stream");
    assert_eq!(requests[2].path, "fal-ai/flux/dev/requests/req-123");
    assert_eq!(queue.remaining(), 0);
}

#[test]
fn test_cancel_then_status() {
    let queue = Arc::new(ScriptedTransport::new(vec![
        Reply::json(202, &json!({"status": "CANCELLATION_REQUESTED"})),
        Reply::json(400, &json!({"status": "ALREADY_COMPLETED"})),
    ]));
    let client = client(&queue);

    let cancelled = client.queue().cancel(MODEL, "req-1").unwrap();
    assert_eq!(cancelled.status(), Some(JobStatus::CancellationRequested));

    let again = client.queue().cancel(MODEL, "req-1").unwrap();
    assert_eq!(again.status(), Some(JobStatus::AlreadyCompleted));
    assert!(again.is_finished());

    for request in queue.requests() {
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "fal-ai/flux/dev/requests/req-1/cancel");
    }
}

/// A broken stream degrades to exactly one status check
#[test]
fn test_stream_fallback_midstream() {
    let queue = Arc::new(ScriptedTransport::new(vec![
        Reply::Stream {
            status: 200,
            headers: falqueue_core::domain::Headers::new()
                .with("content-type", "text/event-stream"),
            chunks: vec![
                Ok(b"data: {\"status\": \"IN_PROGRESS\"}\n".to_vec()),
                Err(TransportError::StreamProtocol("unexpected EOF in frame".into())),
            ],
        },
        Reply::json(200, &json!({"status": "COMPLETED"})),
    ]));
    let client = client(&queue);

    let mut stream = client.queue().stream_status(MODEL, "req-9", false).unwrap();
    let updates: Vec<_> = stream.by_ref().map(|u| u.unwrap()).collect();

    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].status(), Some(JobStatus::Completed));
    assert!(stream.used_fallback());
    assert_eq!(queue.requests()[1].path, "fal-ai/flux/dev/requests/req-9/status");
}

#[test]
fn test_streaming_submit_fallback() {
    let queue = Arc::new(ScriptedTransport::new(vec![
        Reply::Fail(TransportError::StreamProtocol("stream refused".into())),
        Reply::json(200, &json!({"request_id": "req-5"})),
    ]));
    let client = client(&queue);

    let request = client.request("fal-ai/any-llm", input(json!({"prompt": "hi"})));
    let updates: Vec<_> = client
        .queue()
        .submit_streaming(&request)
        .unwrap()
        .map(|u| u.unwrap())
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].request_id(), Some("req-5"));

    let requests = queue.requests();
    assert_eq!(requests[0].body.as_ref().unwrap()["stream"], json!(true));
    assert_eq!(
        requests[0].body.as_ref().unwrap()["webhook_url"],
        json!("https://example.com/hook")
    );
    assert_eq!(requests[1].body, Some(json!({"prompt": "hi"})));
    assert_eq!(
        requests[1].query_value("fal_webhook"),
        Some("https://example.com/hook")
    );
}

#[test]
fn test_remote_errors_are_data() {
    let queue = Arc::new(ScriptedTransport::new(vec![
        Reply::json(200, &json!({"status": "ERROR", "error": ""})),
        Reply::json(500, &json!({"message": "worker crashed"})),
        Reply::json(200, &json!({"status": "ERROR"})),
    ]));
    let client = client(&queue);

    let first = client.queue().status(MODEL, "r", false).unwrap();
    assert_eq!(first.error(), Some("unknown error"));

    let second = client.queue().result(MODEL, "r").unwrap();
    assert_eq!(second.error(), Some("HTTP 500: worker crashed"));
    assert_eq!(second.payload(), None);

    let third = client.queue().status(MODEL, "r", false).unwrap();
    assert_eq!(third.status(), Some(JobStatus::Error));
    assert!(!third.error().unwrap().is_empty());
}
