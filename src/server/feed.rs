//! Bridges blocking pipelines onto async response bodies.

use crate::session::SessionEvent;
use axum::response::sse::Event;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Multipart boundary separating JPEG parts in the live feed.
pub const MJPEG_BOUNDARY: &str = "frame";

/// Content type of the live feed response.
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Runs `pipeline` on its own thread, forwarding items through a channel
/// holding at most `depth` of them.
///
/// The thread exits when the pipeline ends or when the returned stream is
/// dropped, whichever comes first; a dropped stream is noticed at the next
/// item the pipeline produces.
pub fn spawn_producer<I>(name: &str, pipeline: I, depth: usize) -> ReceiverStream<I::Item>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    let (tx, rx) = mpsc::channel(depth.max(1));
    let spawned = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            for item in pipeline {
                if tx.blocking_send(item).is_err() {
                    debug!("Client disconnected, producer exiting");
                    return;
                }
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, producer = name, "Failed to spawn producer thread");
    }
    ReceiverStream::new(rx)
}

/// Wraps one JPEG image as a part of the multipart replace-stream.
pub fn multipart_part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{MJPEG_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}

/// Frames a session event as a server-sent event.
///
/// Progress carries the capture count as its data; completion is a named
/// `done` event.
pub fn sse_event(event: SessionEvent) -> Event {
    match event {
        SessionEvent::Progress(captured) => Event::default().data(captured.to_string()),
        SessionEvent::Done => Event::default().event("done").data("Capture complete"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn test_multipart_part_layout() {
        let part = multipart_part(&[0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(
            &part[..],
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8\xFF\xD9\r\n"
        );
    }

    #[tokio::test]
    async fn test_producer_forwards_until_exhausted() {
        let stream = spawn_producer("test-producer", 0..5u32, 1);
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_producer_stops_when_consumer_drops() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let pipeline = (0u64..).inspect(move |i| {
            if *i > 100_000 {
                let _ = done_tx.send(());
            }
        });

        let mut stream = spawn_producer("test-endless", pipeline, 1);
        assert_eq!(stream.next().await, Some(0));
        drop(stream);

        // The producer thread would keep going forever if it missed the drop
        let leaked = tokio::task::spawn_blocking(move || {
            done_rx.recv_timeout(std::time::Duration::from_millis(200)).is_ok()
        })
        .await
        .unwrap();
        assert!(!leaked);
    }
}
