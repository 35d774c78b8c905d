//! Byte stream boundary between the transfer layer and the writer.
//!
//! The transfer layer pushes chunks into a bounded pipe; the writer pulls
//! them one at a time with `next()`. The bound is the producer-side
//! backpressure surface: a slow disk stops the writer from pulling, which
//! fills the pipe and suspends the producer.

use tokio::sync::mpsc;

use crate::error::StreamError;

/// Ordered, immutable buffer of bytes plus its sequence position within the
/// stream. Ownership transfers to the writer on pull.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub sequence: u64,
    pub bytes: Vec<u8>,
}

/// One pull from the source: data, end of stream, or a transfer failure.
#[derive(Debug)]
pub enum StreamPayload {
    Data(Chunk),
    Eof,
    Err(StreamError),
}

/// Consumer half of the pipe, owned by the download file controller.
pub struct ByteStream {
    rx: mpsc::Receiver<StreamPayload>,
}

impl ByteStream {
    /// Pull the next payload. A producer that goes away without signalling
    /// end-of-stream reads as a network failure, not a clean end.
    pub async fn next(&mut self) -> StreamPayload {
        match self.rx.recv().await {
            Some(payload) => payload,
            None => StreamPayload::Err(StreamError::Network(
                "source dropped before end of stream".to_string(),
            )),
        }
    }
}

/// Producer half of the pipe, handed to the transfer layer. Assigns
/// sequence numbers in send order.
pub struct ByteStreamWriter {
    tx: mpsc::Sender<StreamPayload>,
    next_sequence: u64,
}

impl ByteStreamWriter {
    /// Send one chunk of transfer data. Suspends while the pipe is full.
    /// Returns false when the consumer is gone (download ended first).
    pub async fn send(&mut self, bytes: Vec<u8>) -> bool {
        let chunk = Chunk {
            sequence: self.next_sequence,
            bytes,
        };
        self.next_sequence += 1;
        self.tx.send(StreamPayload::Data(chunk)).await.is_ok()
    }

    /// Signal a clean end of stream.
    pub async fn finish(self) {
        let _ = self.tx.send(StreamPayload::Eof).await;
    }

    /// Signal a transfer failure.
    pub async fn fail(self, error: StreamError) {
        let _ = self.tx.send(StreamPayload::Err(error)).await;
    }
}

/// Create a stream pipe holding at most `capacity` in-flight payloads.
pub fn byte_stream(capacity: usize) -> (ByteStreamWriter, ByteStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ByteStreamWriter {
            tx,
            next_sequence: 0,
        },
        ByteStream { rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_arrive_in_order_with_sequence() {
        let (mut tx, mut rx) = byte_stream(4);
        assert!(tx.send(b"ab".to_vec()).await);
        assert!(tx.send(b"cd".to_vec()).await);
        tx.finish().await;

        for (i, expected) in [b"ab", b"cd"].iter().enumerate() {
            match rx.next().await {
                StreamPayload::Data(chunk) => {
                    assert_eq!(chunk.sequence, i as u64);
                    assert_eq!(chunk.bytes, expected.to_vec());
                }
                other => panic!("expected data, got {:?}", other),
            }
        }
        assert!(matches!(rx.next().await, StreamPayload::Eof));
    }

    #[tokio::test]
    async fn dropped_producer_reads_as_network_error() {
        let (tx, mut rx) = byte_stream(4);
        drop(tx);
        match rx.next().await {
            StreamPayload::Err(StreamError::Network(_)) => {}
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn explicit_failure_is_forwarded() {
        let (tx, mut rx) = byte_stream(4);
        tx.fail(StreamError::Stalled).await;
        assert!(matches!(
            rx.next().await,
            StreamPayload::Err(StreamError::Stalled)
        ));
    }
}
