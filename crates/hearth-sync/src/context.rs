//! Shared runtime state handed to every model.

use std::sync::Arc;

use hearth_core::{ContextId, MemberId, ModelName};
use hearth_settings::HearthSettings;
use tokio::task::JoinHandle;

use crate::error::RegistryError;
use crate::fetch::RemoteFetcher;
use crate::hub::ChannelHub;
use crate::registry::{Model, ModelRegistry};
use crate::transport::{Transport, UiEnd};

pub struct AppContext {
    hub: Arc<ChannelHub>,
    settings: Arc<HearthSettings>,
    context: ContextId,
    registry: ModelRegistry,
}

impl AppContext {
    pub fn new(hub: Arc<ChannelHub>, settings: HearthSettings) -> Self {
        let context = ContextId::from_raw(settings.sync.default_context.clone());
        Self {
            hub,
            settings: Arc::new(settings),
            context,
            registry: ModelRegistry::new(),
        }
    }

    /// Build a context over the UI end of a channel and start routing its
    /// inbound replies. Must be called inside a tokio runtime.
    pub fn connect(ui: UiEnd, settings: HearthSettings) -> (Arc<Self>, JoinHandle<()>) {
        let transport: Arc<dyn Transport> = Arc::new(ui.transport);
        let hub = Arc::new(ChannelHub::new(transport));
        let inbound = hub.spawn_inbound(ui.inbound);
        (Arc::new(Self::new(hub, settings)), inbound)
    }

    pub fn hub(&self) -> &Arc<ChannelHub> {
        &self.hub
    }

    pub fn settings(&self) -> &HearthSettings {
        &self.settings
    }

    /// Owning scope stamped on every envelope from this context.
    pub fn context_id(&self) -> &ContextId {
        &self.context
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// A fresh fetcher for `name`, sharing this context's hub and deadline.
    pub fn fetcher(&self, name: impl Into<ModelName>) -> RemoteFetcher {
        RemoteFetcher::new(name.into(), self.context.clone(), Arc::clone(&self.hub))
            .with_timeout(self.settings.sync.fetch_timeout())
    }

    pub fn model<M: Model>(&self, owner: &MemberId) -> Result<Arc<M>, RegistryError> {
        self.registry.get_or_create::<M>(self, owner)
    }
}
