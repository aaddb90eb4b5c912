//! Central demultiplexer for the shared channel.
//!
//! Every fetcher registers one pending entry per request, keyed by the
//! request's `subjectId`, and the hub routes each inbound `data-loaded` frame
//! to the entry whose full `{name, context, subjectId}` triple matches. Replies
//! with no matching entry are dropped.

use std::sync::Arc;

use dashmap::DashMap;
use hearth_core::{ChannelFrame, Correlation, RequestEnvelope, RequestId, ResponseEnvelope};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::ChannelError;
use crate::fetch::InFlightSlot;
use crate::transport::Transport;

struct Pending {
    correlation: Correlation,
    tx: oneshot::Sender<ResponseEnvelope>,
    slot: Arc<InFlightSlot>,
}

/// What happened to an inbound reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Routed to its pending request.
    Delivered,
    /// A request with this `subjectId` is pending but `name`/`context` differ.
    Mismatched,
    /// No request with this `subjectId` is pending (stale or foreign).
    Unknown,
}

pub struct ChannelHub {
    transport: Arc<dyn Transport>,
    pending: DashMap<RequestId, Pending>,
}

impl ChannelHub {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pending: DashMap::new(),
        }
    }

    /// Record a pending request. The returned receiver resolves with the one
    /// matching reply.
    pub(crate) fn register(
        &self,
        correlation: Correlation,
        slot: Arc<InFlightSlot>,
    ) -> oneshot::Receiver<ResponseEnvelope> {
        let (tx, rx) = oneshot::channel();
        let key = correlation.subject_id.clone();
        let _ = self.pending.insert(
            key,
            Pending {
                correlation,
                tx,
                slot,
            },
        );
        rx
    }

    /// Encode and send a `data-load` frame.
    pub(crate) fn dispatch(&self, request: &RequestEnvelope) -> Result<(), ChannelError> {
        let frame = ChannelFrame::Load(request.clone())
            .encode()
            .map_err(|e| ChannelError::Encode(e.to_string()))?;
        self.transport.send(frame)
    }

    /// Drop a pending entry without resolving it, releasing its fetcher.
    pub(crate) fn cancel(&self, subject_id: &RequestId) -> bool {
        match self.pending.remove(subject_id) {
            Some((_, pending)) => {
                pending.slot.clear_if(subject_id);
                true
            }
            None => false,
        }
    }

    /// Route one reply to its pending request.
    pub fn deliver(&self, response: ResponseEnvelope) -> Delivery {
        let removed = self
            .pending
            .remove_if(&response.subject_id, |_, pending| response.matches(&pending.correlation));

        match removed {
            Some((subject_id, pending)) => {
                pending.slot.clear_if(&subject_id);
                if pending.tx.send(response).is_err() {
                    debug!(subject_id = %subject_id, "reply arrived after caller went away");
                }
                Delivery::Delivered
            }
            None if self.pending.contains_key(&response.subject_id) => {
                debug!(
                    correlation = %response.correlation(),
                    "correlation mismatch, dropping reply"
                );
                Delivery::Mismatched
            }
            None => {
                debug!(correlation = %response.correlation(), "no pending request, dropping reply");
                Delivery::Unknown
            }
        }
    }

    /// Decode a raw inbound frame and route it.
    pub fn handle_frame(&self, raw: &str) -> Result<Delivery, ChannelError> {
        match ChannelFrame::decode(raw).map_err(|e| ChannelError::Decode(e.to_string()))? {
            ChannelFrame::Loaded(response) => Ok(self.deliver(response)),
            frame => {
                warn!(
                    event = %frame.event(),
                    correlation = %frame.correlation(),
                    "ignoring request frame on the reply channel"
                );
                Ok(Delivery::Unknown)
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, subject_id: &RequestId) -> bool {
        self.pending.contains_key(subject_id)
    }

    /// Fail every pending request. Their fetchers see [`crate::FetchError::Closed`].
    pub fn close_all(&self) -> usize {
        let keys: Vec<RequestId> = self.pending.iter().map(|e| e.key().clone()).collect();
        keys.iter().filter(|k| self.cancel(k)).count()
    }

    /// Consume inbound frames until the channel closes, then fail whatever is
    /// still pending.
    pub fn spawn_inbound(
        self: &Arc<Self>,
        mut inbound: mpsc::Receiver<String>,
    ) -> tokio::task::JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(raw) = inbound.recv().await {
                if let Err(e) = hub.handle_frame(&raw) {
                    warn!(error = %e, "dropping malformed frame");
                }
            }
            let failed = hub.close_all();
            info!(failed, "inbound channel closed");
        })
    }
}
