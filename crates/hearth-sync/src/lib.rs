//! # hearth-sync
//!
//! Client-side plumbing that lets UI-process models load data from the host
//! process over one shared duplex channel:
//!
//! - [`ChannelHub`] routes each `data-loaded` reply to the request whose
//!   `{name, context, subjectId}` triple it carries.
//! - [`RemoteFetcher`] issues one request at a time per model and hydrates
//!   the reply into typed records.
//! - [`ListenerRegistry`] fans out model notifications to UI subscribers.
//! - [`DelegationProxy`] switches a model between its own data and another
//!   member's without callers noticing.
//! - [`host`] serves requests on the other end of the channel.

#![deny(unsafe_code)]

pub mod context;
pub mod delegate;
pub mod error;
pub mod fetch;
pub mod host;
pub mod hub;
pub mod listeners;
pub mod registry;
pub mod transport;

pub use context::AppContext;
pub use delegate::{cascade_notification_chains, AlternateScope, DelegationMode, DelegationProxy};
pub use error::{ChannelError, DelegationError, FetchError, RegistryError};
pub use fetch::{InFlight, List, One, PendingFetch, RemoteFetcher, ResultShape};
pub use host::{serve_host, HostDispatcher, HostRequest, MockHost};
pub use hub::{ChannelHub, Delivery};
pub use listeners::{ListenerGuard, ListenerRegistry, Notifier};
pub use registry::{Model, ModelRegistry};
pub use transport::{local_channel, HostEnd, LocalTransport, Transport, UiEnd};
