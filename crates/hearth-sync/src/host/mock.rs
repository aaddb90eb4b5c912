use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hearth_core::{RequestEnvelope, RequestType};
use parking_lot::Mutex;
use serde_json::Value;

use super::{HostDispatcher, HostRequest};

type RouteKey = (RequestType, String);

/// Canned answer for one `(request type, urn)` pair.
#[derive(Clone, Debug)]
pub enum MockReply {
    Data(Value),
    Error(String),
    /// Wait, then answer with the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Route-table host for tests and the demo binary.
///
/// Routes can be replaced while the host is serving, so a test can change
/// what the next fetch of the same urn returns.
#[derive(Default)]
pub struct MockHost {
    routes: Mutex<HashMap<RouteKey, MockReply>>,
    calls: Mutex<HashMap<RouteKey, usize>>,
    requests: Mutex<Vec<RequestEnvelope>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, request_type: RequestType, urn: &str, reply: MockReply) -> Self {
        self.set_route(request_type, urn, reply);
        self
    }

    pub fn with_data(self, request_type: RequestType, urn: &str, data: Value) -> Self {
        self.with_route(request_type, urn, MockReply::Data(data))
    }

    pub fn set_route(&self, request_type: RequestType, urn: &str, reply: MockReply) {
        let _ = self.routes.lock().insert((request_type, urn.to_string()), reply);
    }

    pub fn call_count(&self, request_type: RequestType, urn: &str) -> usize {
        self.calls
            .lock()
            .get(&(request_type, urn.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HostDispatcher for MockHost {
    async fn dispatch(&self, request: &HostRequest) -> Result<Value, String> {
        let key = (request.request_type, request.urn.clone());
        self.requests.lock().push(request.clone());
        *self.calls.lock().entry(key.clone()).or_default() += 1;

        let mut reply = self
            .routes
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| format!("no route for {} {}", request.request_type, request.urn))?;

        loop {
            match reply {
                MockReply::Data(data) => return Ok(data),
                MockReply::Error(message) => return Err(message),
                MockReply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}
