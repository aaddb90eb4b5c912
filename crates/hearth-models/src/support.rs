use std::sync::Arc;

use hearth_sync::DelegationProxy;

use crate::error::{ModelError, Result};

/// Resolve a method bound with `configure_delegate_call`. Such methods always
/// have a side to run on; a skip means the binding table is wrong.
pub(crate) fn delegated<S: ?Sized>(
    proxy: &DelegationProxy<S>,
    method: &'static str,
) -> Result<Arc<S>> {
    proxy.dispatch(method)?.ok_or_else(|| ModelError::Unsupported {
        model: proxy.name().clone(),
        operation: method,
    })
}
