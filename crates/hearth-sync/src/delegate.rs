//! Context switching between a primary strategy and an alternate one.
//!
//! A primary model keeps its local-user behavior behind a strategy trait and
//! holds a second implementation of the same trait scoped to another member.
//! Each public method is bound once, at construction, as either
//! [`DelegationMode::Delegate`] (runs on whichever side is active) or
//! [`DelegationMode::NoOp`] (runs on the primary only; skipped while another
//! member is selected). Callers keep calling the primary model; the proxy
//! picks the side.

use std::collections::HashMap;
use std::sync::Arc;

use hearth_core::{MemberId, ModelName};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::DelegationError;
use crate::listeners::{ListenerRegistry, Notifier};

/// Scoping hooks every alternate-context extension provides.
pub trait AlternateScope: Send + Sync {
    /// Point the extension at `member`. Called under the proxy's selection
    /// lock; must not call back into the proxy.
    fn scope_to(&self, member: &MemberId);

    /// Whether the extension already holds data for `member`.
    fn is_member_loaded(&self, member: &MemberId) -> bool;

    /// Drop any member-scoped state.
    fn clear(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegationMode {
    Delegate,
    NoOp,
}

pub struct DelegationProxy<S: ?Sized> {
    name: ModelName,
    primary: Arc<S>,
    alternate: Arc<S>,
    scope: Arc<dyn AlternateScope>,
    bindings: HashMap<&'static str, DelegationMode>,
    selection: RwLock<Option<MemberId>>,
}

impl<S: ?Sized> DelegationProxy<S> {
    /// `alternate` and `scope` are normally the same extension object viewed
    /// through two traits.
    pub fn new(
        name: ModelName,
        primary: Arc<S>,
        alternate: Arc<S>,
        scope: Arc<dyn AlternateScope>,
    ) -> Self {
        Self {
            name,
            primary,
            alternate,
            scope,
            bindings: HashMap::new(),
            selection: RwLock::new(None),
        }
    }

    /// Route `method` to the alternate while a member is selected.
    pub fn configure_delegate_call(&mut self, method: &'static str) -> &mut Self {
        let _ = self.bindings.insert(method, DelegationMode::Delegate);
        self
    }

    /// Run `method` on the primary only; skip it while a member is selected.
    pub fn configure_no_op(&mut self, method: &'static str) -> &mut Self {
        let _ = self.bindings.insert(method, DelegationMode::NoOp);
        self
    }

    pub fn name(&self) -> &ModelName {
        &self.name
    }

    pub fn mode(&self, method: &str) -> Option<DelegationMode> {
        self.bindings.get(method).copied()
    }

    /// Resolve the strategy a call to `method` runs against. `Ok(None)` means
    /// the call is a silent no-op.
    ///
    /// The returned `Arc` pins the side for the duration of the call, so a
    /// selection change mid-call does not move it.
    pub fn dispatch(&self, method: &str) -> Result<Option<Arc<S>>, DelegationError> {
        let mode = self.mode(method).ok_or_else(|| DelegationError::NotConfigured {
            method: method.to_string(),
        })?;
        let alternate_active = self.selection.read().is_some();

        Ok(match (mode, alternate_active) {
            (DelegationMode::Delegate, true) => Some(Arc::clone(&self.alternate)),
            (DelegationMode::NoOp, true) => {
                debug!(model = %self.name, method, "skipping write in alternate context");
                None
            }
            (_, false) => Some(Arc::clone(&self.primary)),
        })
    }

    /// Make the alternate side active for `member`. Selecting the member that
    /// is already selected changes nothing and returns `false`.
    pub fn set_member_selection(&self, member: &MemberId) -> bool {
        let mut selection = self.selection.write();
        if selection.as_ref() == Some(member) {
            return false;
        }
        self.scope.scope_to(member);
        *selection = Some(member.clone());
        debug!(model = %self.name, member = %member, "alternate context selected");
        true
    }

    /// Return to the primary side. Returns `false` if it was already active.
    pub fn reset_member_selection(&self) -> bool {
        let mut selection = self.selection.write();
        if selection.take().is_none() {
            return false;
        }
        self.scope.clear();
        debug!(model = %self.name, "alternate context reset");
        true
    }

    /// The side read accessors should consult right now.
    pub fn active(&self) -> Arc<S> {
        if self.selection.read().is_some() {
            Arc::clone(&self.alternate)
        } else {
            Arc::clone(&self.primary)
        }
    }

    pub fn selected_member(&self) -> Option<MemberId> {
        self.selection.read().clone()
    }

    pub fn is_alternate_active(&self) -> bool {
        self.selection.read().is_some()
    }

    pub fn is_member_loaded(&self, member: &MemberId) -> bool {
        self.scope.is_member_loaded(member)
    }

    pub fn primary(&self) -> &Arc<S> {
        &self.primary
    }

    pub fn alternate(&self) -> &Arc<S> {
        &self.alternate
    }
}

/// Build the alternate's notifier so its events also reach the primary's
/// subscribers.
pub fn cascade_notification_chains(
    primary: &Arc<ListenerRegistry>,
    alternate: &Arc<ListenerRegistry>,
) -> Notifier {
    Notifier::cascading(Arc::clone(alternate), Arc::clone(primary))
}
