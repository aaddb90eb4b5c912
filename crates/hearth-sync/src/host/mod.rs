//! Host side of the shared channel.
//!
//! [`serve_host`] reads `data-load` frames, hands each one to a
//! [`HostDispatcher`] on its own task and answers with exactly one
//! `data-loaded` frame echoing the request's correlation triple. Because every
//! request runs independently, replies can come back in any order.

pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{ChannelFrame, RequestEnvelope, ResponseEnvelope};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::Transport;

pub use mock::MockHost;

/// A decoded `data-load` request as seen by the host.
pub type HostRequest = RequestEnvelope;

/// Resolves one request to a reply payload or an error message.
#[async_trait]
pub trait HostDispatcher: Send + Sync {
    async fn dispatch(&self, request: &HostRequest) -> Result<Value, String>;
}

/// Serve requests until the request channel closes or `cancel` fires.
/// Returns how many requests were accepted.
pub async fn serve_host(
    dispatcher: Arc<dyn HostDispatcher>,
    mut requests: mpsc::Receiver<String>,
    replies: Arc<dyn Transport>,
    cancel: CancellationToken,
) -> usize {
    let mut accepted = 0;
    loop {
        let raw = tokio::select! {
            () = cancel.cancelled() => {
                info!(accepted, "host loop cancelled");
                break;
            }
            frame = requests.recv() => match frame {
                Some(raw) => raw,
                None => {
                    info!(accepted, "request channel closed");
                    break;
                }
            },
        };

        let request = match ChannelFrame::decode(&raw) {
            Ok(ChannelFrame::Load(request)) => request,
            Ok(frame) => {
                warn!(
                    event = %frame.event(),
                    correlation = %frame.correlation(),
                    "ignoring reply frame on the request channel"
                );
                continue;
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed request frame");
                continue;
            }
        };
        accepted += 1;

        let dispatcher = Arc::clone(&dispatcher);
        let replies = Arc::clone(&replies);
        let _ = tokio::spawn(async move {
            let response = match dispatcher.dispatch(&request).await {
                Ok(data) => ResponseEnvelope::data(&request, data),
                Err(message) => {
                    debug!(correlation = %request.correlation(), %message, "request failed");
                    ResponseEnvelope::error(&request, message)
                }
            };
            match ChannelFrame::Loaded(response).encode() {
                Ok(frame) => {
                    if let Err(e) = replies.send(frame) {
                        warn!(
                            correlation = %request.correlation(),
                            error = %e,
                            "failed to send reply"
                        );
                    }
                }
                Err(e) => warn!(error = %e, "failed to encode reply"),
            }
        });
    }
    accepted
}
