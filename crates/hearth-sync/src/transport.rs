//! Shared duplex channel between the UI process and the host.
//!
//! The core only needs "send a frame" on the way out and a stream of raw
//! frames on the way in. [`local_channel`] wires both directions in-process
//! with bounded `mpsc` queues.

use tokio::sync::mpsc;

use crate::error::ChannelError;

/// Outbound half of the shared channel. Sending never blocks.
pub trait Transport: Send + Sync {
    fn send(&self, frame: String) -> Result<(), ChannelError>;
}

/// [`Transport`] backed by a bounded tokio `mpsc` queue.
#[derive(Clone)]
pub struct LocalTransport {
    tx: mpsc::Sender<String>,
}

impl LocalTransport {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Transport for LocalTransport {
    fn send(&self, frame: String) -> Result<(), ChannelError> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(msg_len = msg.len(), "send queue full, dropping frame");
                Err(ChannelError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ChannelError::Closed),
        }
    }
}

/// UI-process side: send requests, receive replies.
pub struct UiEnd {
    pub transport: LocalTransport,
    pub inbound: mpsc::Receiver<String>,
}

/// Host-process side: receive requests, send replies.
pub struct HostEnd {
    pub requests: mpsc::Receiver<String>,
    pub replies: LocalTransport,
}

/// Create both ends of an in-process channel.
pub fn local_channel(capacity: usize) -> (UiEnd, HostEnd) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (reply_tx, reply_rx) = mpsc::channel(capacity);
    (
        UiEnd {
            transport: LocalTransport::new(request_tx),
            inbound: reply_rx,
        },
        HostEnd {
            requests: request_rx,
            replies: LocalTransport::new(reply_tx),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_in_both_directions() {
        let (mut ui, mut host) = local_channel(8);

        ui.transport.send("request".into()).unwrap();
        assert_eq!(host.requests.recv().await.unwrap(), "request");

        host.replies.send("reply".into()).unwrap();
        assert_eq!(ui.inbound.recv().await.unwrap(), "reply");
    }

    #[test]
    fn full_queue_is_reported() {
        let (ui, _host) = local_channel(1);
        ui.transport.send("one".into()).unwrap();
        assert_eq!(ui.transport.send("two".into()), Err(ChannelError::Full));
    }

    #[test]
    fn closed_peer_is_reported() {
        let (ui, host) = local_channel(1);
        drop(host);
        assert_eq!(ui.transport.send("one".into()), Err(ChannelError::Closed));
    }
}
