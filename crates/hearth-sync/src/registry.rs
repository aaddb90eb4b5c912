//! Process-wide model instances, one per model name.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use hearth_core::MemberId;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::AppContext;
use crate::error::RegistryError;

/// A primary model the registry can build on demand.
pub trait Model: Send + Sync + 'static {
    const NAME: &'static str;

    fn create(ctx: &AppContext, owner: &MemberId) -> Self;
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<&'static str, Entry>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance registered under `M::NAME`, creating it first if
    /// needed. Creation runs without the lock held so a model may look up
    /// others while it is being built; if two callers race, the first insert
    /// wins and both get that instance.
    pub fn get_or_create<M: Model>(
        &self,
        ctx: &AppContext,
        owner: &MemberId,
    ) -> Result<Arc<M>, RegistryError> {
        if let Some(existing) = self.get::<M>()? {
            return Ok(existing);
        }

        let created: Entry = Arc::new(M::create(ctx, owner));
        let entry = {
            let mut models = self.models.write();
            Arc::clone(models.entry(M::NAME).or_insert(created))
        };
        debug!(model = M::NAME, owner = %owner, "model registered");
        downcast::<M>(entry)
    }

    /// Look up an existing instance without creating one.
    pub fn get<M: Model>(&self) -> Result<Option<Arc<M>>, RegistryError> {
        let entry = self.models.read().get(M::NAME).cloned();
        entry.map(downcast::<M>).transpose()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}

fn downcast<M: Model>(entry: Entry) -> Result<Arc<M>, RegistryError> {
    entry
        .downcast::<M>()
        .map_err(|_| RegistryError::TypeMismatch { name: M::NAME })
}
