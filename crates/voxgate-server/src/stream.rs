use std::convert::Infallible;
use std::future::Future;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde_json::json;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::warn;

use voxgate_core::ids::TurnId;
use voxgate_core::stream::StreamHandle;

/// Build a streaming SSE response whose body is produced by `handler`.
///
/// The handler runs as its own task (the producer) pushing frames through
/// the [`StreamHandle`]; the response body (the consumer) forwards chunks as
/// they arrive, so output reaches the client while the handler is still
/// working. Termination is guaranteed: whether the handler returns `Ok`,
/// returns `Err`, or panics, exactly one `response.end` frame is emitted —
/// on failure preceded by an in-band `response.data` error frame. The HTTP
/// exchange itself stays 200 once streaming has begun.
///
/// After observing the stop sentinel the consumer awaits the producer task,
/// so no task outlives the response. If the client disconnects early the
/// body is dropped and a drop-guard aborts the producer instead of letting
/// it run on unobserved.
pub fn stream_response<F, Fut>(turn_id: TurnId, handler: F) -> Response
where
    F: FnOnce(StreamHandle) -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let (handle, mut rx) = StreamHandle::channel(turn_id);

    // The handler gets its own task so that even a panic is observed as a
    // JoinError here rather than skipping the terminal frame.
    let inner = tokio::spawn(handler(handle.clone()));
    let inner_abort = inner.abort_handle();

    let producer = tokio::spawn(async move {
        match inner.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(error = %err, "agent handler failed; relaying in-band");
                handle.data(json!({"error": err.to_string()}));
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => {
                warn!(error = %join_err, "agent handler panicked; relaying in-band");
                handle.data(json!({"error": format!("handler aborted: {join_err}")}));
            }
        }
        handle.end();
    });

    // Constructed before the generator so that dropping a never-polled body
    // still aborts the producer.
    let guard = ProducerGuard::new(producer, inner_abort);
    let body_stream = async_stream::stream! {
        let mut producer = guard;
        while let Some(chunk) = rx.recv().await {
            if chunk.is_empty() {
                break;
            }
            yield Ok::<Bytes, Infallible>(chunk);
        }
        producer.join().await;
    };

    // Consumer-loop exit is authoritative for closing the transport; the
    // builder cannot fail with these static headers.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .header(header::CONNECTION, "keep-alive")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Awaits the producer on the normal path; aborts both producer and handler
/// if the body stream is dropped before the sentinel (client disconnect).
struct ProducerGuard {
    producer: Option<JoinHandle<()>>,
    handler_abort: AbortHandle,
}

impl ProducerGuard {
    fn new(producer: JoinHandle<()>, handler_abort: AbortHandle) -> Self {
        Self {
            producer: Some(producer),
            handler_abort,
        }
    }

    async fn join(&mut self) {
        if let Some(producer) = self.producer.take() {
            let _ = producer.await;
        }
    }
}

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            self.handler_abort.abort();
            producer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn collect_frames(response: Response) -> Vec<String> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        text.split("\n\n")
            .filter(|s| !s.is_empty())
            .map(|s| s.strip_prefix("data: ").expect("SSE prefix").to_owned())
            .collect()
    }

    #[tokio::test]
    async fn streams_frames_then_terminates() {
        let response = stream_response(TurnId::from_raw("t1"), |stream| async move {
            stream.tts("hello");
            stream.tts("world");
            stream.end();
            Ok(())
        });

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );

        let frames = collect_frames(response).await;
        assert_eq!(frames.len(), 3);
        assert!(frames[0].contains("response.tts") && frames[0].contains("hello"));
        assert!(frames[1].contains("world"));
        assert!(frames[2].contains("response.end"));
    }

    #[tokio::test]
    async fn handler_without_explicit_end_still_terminates() {
        let response = stream_response(TurnId::from_raw("t1"), |stream| async move {
            stream.tts("only speech");
            Ok(())
        });

        let frames = collect_frames(response).await;
        assert!(frames.last().unwrap().contains("response.end"));
    }

    #[tokio::test]
    async fn handler_error_is_relayed_in_band() {
        let response = stream_response(TurnId::from_raw("t1"), |stream| async move {
            stream.tts("partial");
            anyhow::bail!("model exploded")
        });

        assert_eq!(response.status(), StatusCode::OK);
        let frames = collect_frames(response).await;
        assert_eq!(frames.len(), 3);
        assert!(frames[1].contains("response.data"));
        assert!(frames[1].contains("model exploded"));
        assert!(frames[2].contains("response.end"));
    }

    #[tokio::test]
    async fn handler_panic_still_yields_single_terminal_frame() {
        let response = stream_response(TurnId::from_raw("t1"), |_stream| async move {
            panic!("boom");
            #[allow(unreachable_code)]
            Ok(())
        });

        let frames = collect_frames(response).await;
        let terminals = frames.iter().filter(|f| f.contains("response.end")).count();
        assert_eq!(terminals, 1);
    }

    #[tokio::test]
    async fn double_end_emits_one_terminal_frame() {
        let response = stream_response(TurnId::from_raw("t1"), |stream| async move {
            stream.end();
            stream.end();
            Ok(())
        });

        let frames = collect_frames(response).await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("response.end"));
    }

    #[tokio::test]
    async fn frames_carry_the_originating_turn_id() {
        let response = stream_response(TurnId::from_raw("turn-42"), |stream| async move {
            stream.tts("x");
            stream.end();
            Ok(())
        });

        for frame in collect_frames(response).await {
            assert!(frame.contains(r#""turn_id":"turn-42""#), "frame: {frame}");
        }
    }

    #[tokio::test]
    async fn dropping_the_body_aborts_the_producer() {
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

        let response = stream_response(TurnId::from_raw("t1"), |stream| async move {
            started_tx.send(()).ok();
            stream.tts("first");
            tokio::time::sleep(Duration::from_secs(30)).await;
            let _ = done_tx.send(());
            Ok(())
        });

        // Wait for the handler to start, then drop the body as a
        // disconnecting client would.
        let body = response.into_body();
        started_rx.await.unwrap();
        drop(body);

        // The handler must be aborted rather than run to completion.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(done_rx.await.is_err(), "handler survived client disconnect");
    }
}
