//! Shared test wiring: an [`AppContext`] talking to a [`MockHost`] over an
//! in-process channel.

use std::sync::Arc;

use hearth_core::{EventType, MemberId, Notification, SubscriberId};
use hearth_settings::HearthSettings;
use hearth_sync::{local_channel, serve_host, AppContext, ListenerRegistry, MockHost};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

pub struct Harness {
    pub ctx: Arc<AppContext>,
    pub host: Arc<MockHost>,
    cancel: CancellationToken,
}

impl Harness {
    pub fn start(host: MockHost) -> Self {
        let (ui, host_end) = local_channel(64);
        let (ctx, _inbound) = AppContext::connect(ui, HearthSettings::default());
        let host = Arc::new(host);
        let cancel = CancellationToken::new();
        let _ = tokio::spawn(serve_host(
            host.clone(),
            host_end.requests,
            Arc::new(host_end.replies),
            cancel.clone(),
        ));
        Self { ctx, host, cancel }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub fn owner() -> MemberId {
    MemberId::from_raw("me")
}

pub fn journal_item(id: u64, title: &str, rating: u8) -> Value {
    json!({
        "id": id,
        "title": title,
        "body": "",
        "rating": rating,
        "createdAt": "2026-03-01T09:00:00Z"
    })
}

/// Records every notification `registry` raises for `events`, in order.
pub fn record(
    registry: &ListenerRegistry,
    events: &[EventType],
) -> Arc<Mutex<Vec<Notification>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for event in events {
        let sink = Arc::clone(&seen);
        registry.register_listener(&SubscriberId::from_raw("test"), *event, move |n| {
            sink.lock().push(n.clone());
        });
    }
    seen
}

pub fn events(seen: &Mutex<Vec<Notification>>) -> Vec<EventType> {
    seen.lock().iter().map(|n| n.event).collect()
}
