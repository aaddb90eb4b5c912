//! Correlated, single-flight remote fetch.
//!
//! A [`RemoteFetcher`] belongs to exactly one model instance. It allows one
//! outstanding request at a time: a second call while the first is in flight
//! fails with [`FetchError::CallInProgress`] and leaves the first untouched.
//! There is no deadline unless one is configured; a request whose reply never
//! arrives keeps the fetcher busy.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use hearth_core::{
    now_millis, ContextId, Correlation, ModelName, RequestEnvelope, RequestId, RequestType,
    ResponseEnvelope,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::FetchError;
use crate::hub::ChannelHub;

/// The in-flight marker for one outstanding request.
#[derive(Clone, Debug, PartialEq)]
pub struct InFlight {
    pub correlation: Correlation,
    pub timestamp: i64,
    pub urn: String,
    pub request_type: RequestType,
}

/// Holds a fetcher's in-flight marker. Shared with the hub so that routing a
/// reply releases the fetcher even if the caller stopped waiting.
#[derive(Debug, Default)]
pub struct InFlightSlot {
    current: Mutex<Option<InFlight>>,
}

impl InFlightSlot {
    /// Install `marker` unless one is already set.
    fn try_claim(&self, marker: InFlight) -> bool {
        let mut current = self.current.lock();
        if current.is_some() {
            return false;
        }
        *current = Some(marker);
        true
    }

    /// Clear the marker only if it still belongs to `subject_id`.
    pub(crate) fn clear_if(&self, subject_id: &RequestId) -> bool {
        let mut current = self.current.lock();
        if current
            .as_ref()
            .is_some_and(|m| &m.correlation.subject_id == subject_id)
        {
            *current = None;
            true
        } else {
            false
        }
    }

    pub fn get(&self) -> Option<InFlight> {
        self.current.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.current.lock().is_some()
    }
}

/// How to turn a reply's raw `data` into a typed result.
pub trait ResultShape: 'static {
    type Output: Send + 'static;
    fn hydrate(data: Value) -> Result<Self::Output, FetchError>;
}

/// A single record.
pub struct One<T>(PhantomData<fn() -> T>);

/// An ordered list of records. `null` hydrates to an empty list.
pub struct List<T>(PhantomData<fn() -> T>);

impl<T: DeserializeOwned + Send + 'static> ResultShape for One<T> {
    type Output = T;

    fn hydrate(data: Value) -> Result<T, FetchError> {
        serde_json::from_value(data).map_err(|e| FetchError::Hydrate(e.to_string()))
    }
}

impl<T: DeserializeOwned + Send + 'static> ResultShape for List<T> {
    type Output = Vec<T>;

    fn hydrate(data: Value) -> Result<Vec<T>, FetchError> {
        if data.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(data).map_err(|e| FetchError::Hydrate(e.to_string()))
    }
}

pub struct RemoteFetcher {
    name: ModelName,
    context: ContextId,
    hub: Arc<ChannelHub>,
    slot: Arc<InFlightSlot>,
    timeout: Option<Duration>,
}

impl RemoteFetcher {
    pub fn new(name: ModelName, context: ContextId, hub: Arc<ChannelHub>) -> Self {
        Self {
            name,
            context,
            hub,
            slot: Arc::new(InFlightSlot::default()),
            timeout: None,
        }
    }

    /// Fail a fetch with [`FetchError::Timeout`] if no reply arrives in time.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &ModelName {
        &self.name
    }

    pub fn context(&self) -> &ContextId {
        &self.context
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_in_flight(&self) -> bool {
        self.slot.is_set()
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.slot.get()
    }

    /// Claim the single-flight slot, register with the hub and send the
    /// request. Fails immediately if a request is already outstanding.
    pub fn begin<S: ResultShape>(
        &self,
        args: Value,
        urn: impl Into<String>,
        request_type: RequestType,
    ) -> Result<PendingFetch<S>, FetchError> {
        let urn = urn.into();
        let correlation = Correlation {
            name: self.name.clone(),
            context: self.context.clone(),
            subject_id: RequestId::new(),
        };
        let timestamp = now_millis();

        let claimed = self.slot.try_claim(InFlight {
            correlation: correlation.clone(),
            timestamp,
            urn: urn.clone(),
            request_type,
        });
        if !claimed {
            debug!(model = %self.name, urn = %urn, "rejecting overlapping fetch");
            return Err(FetchError::CallInProgress {
                name: self.name.clone(),
            });
        }

        let rx = self.hub.register(correlation.clone(), Arc::clone(&self.slot));
        let request = RequestEnvelope {
            name: correlation.name.clone(),
            context: correlation.context.clone(),
            subject_id: correlation.subject_id.clone(),
            timestamp,
            payload: args,
            urn,
            request_type,
        };
        if let Err(e) = self.hub.dispatch(&request) {
            let _ = self.hub.cancel(&correlation.subject_id);
            return Err(e.into());
        }

        debug!(
            correlation = %correlation,
            urn = %request.urn,
            request_type = %request_type,
            "fetch dispatched"
        );
        Ok(PendingFetch {
            correlation,
            rx,
            hub: Arc::clone(&self.hub),
            timeout: self.timeout,
            _shape: PhantomData,
        })
    }

    /// Send a request and wait for its hydrated reply.
    pub async fn fetch<S: ResultShape>(
        &self,
        args: Value,
        urn: impl Into<String>,
        request_type: RequestType,
    ) -> Result<S::Output, FetchError> {
        self.begin::<S>(args, urn, request_type)?.wait().await
    }

    /// Callback form. `callback` runs exactly once: immediately if the fetch
    /// cannot start, otherwise from a spawned task when the reply arrives.
    pub fn fetch_with<S, F>(
        &self,
        args: Value,
        urn: impl Into<String>,
        request_type: RequestType,
        callback: F,
    ) where
        S: ResultShape,
        F: FnOnce(Result<S::Output, FetchError>) + Send + 'static,
    {
        match self.begin::<S>(args, urn, request_type) {
            Ok(pending) => {
                tokio::spawn(async move {
                    callback(pending.wait().await);
                });
            }
            Err(e) => callback(Err(e)),
        }
    }
}

/// A dispatched request awaiting its reply.
pub struct PendingFetch<S> {
    correlation: Correlation,
    rx: oneshot::Receiver<ResponseEnvelope>,
    hub: Arc<ChannelHub>,
    timeout: Option<Duration>,
    _shape: PhantomData<fn() -> S>,
}

impl<S> std::fmt::Debug for PendingFetch<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFetch")
            .field("correlation", &self.correlation)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S: ResultShape> PendingFetch<S> {
    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    pub async fn wait(self) -> Result<S::Output, FetchError> {
        let received = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(received) => received,
                Err(_) => {
                    let _ = self.hub.cancel(&self.correlation.subject_id);
                    debug!(correlation = %self.correlation, ?limit, "fetch timed out");
                    return Err(FetchError::Timeout(limit));
                }
            },
            None => self.rx.await,
        };
        let response = received.map_err(|_| FetchError::Closed)?;

        if let Some(error) = response.error {
            return Err(FetchError::Remote(error));
        }
        S::hydrate(response.data.unwrap_or(Value::Null))
    }
}
