use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    domain::{ChannelHandle, ChannelIdentifier},
    transport::TransportPort,
};

/// Maps configured identifiers to channels, tolerating stale or private identifiers.
///
/// Direct lookup is tried first; on any failure the account's dialog list is scanned. Hits are
/// cached for the lifetime of the resolver (one run), misses are not.
pub struct EntityResolver {
    transport: Arc<dyn TransportPort>,
    cache: Mutex<HashMap<ChannelIdentifier, ChannelHandle>>,
}

impl EntityResolver {
    pub fn new(transport: Arc<dyn TransportPort>) -> Self {
        Self {
            transport,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `id`, returning `None` when neither lookup nor dialog scan finds it.
    pub async fn resolve(&self, id: &ChannelIdentifier) -> Option<ChannelHandle> {
        if let Some(hit) = self.cache.lock().await.get(id) {
            return Some(hit.clone());
        }

        let found = match self.transport.resolve_entity(id).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("direct lookup of channel {id} failed: {e}; scanning dialogs");
                self.scan_dialogs(id).await
            }
        };

        match &found {
            Some(handle) => {
                self.cache.lock().await.insert(id.clone(), handle.clone());
            }
            None => tracing::error!("channel with identifier {id} not found"),
        }
        found
    }

    async fn scan_dialogs(&self, id: &ChannelIdentifier) -> Option<ChannelHandle> {
        let dialogs = match self.transport.list_dialogs().await {
            Ok(dialogs) => dialogs,
            Err(e) => {
                tracing::error!("failed to list dialogs while looking for {id}: {e}");
                return None;
            }
        };

        dialogs.into_iter().find(|dialog| dialog_matches(dialog, id))
    }
}

/// Exact stringified id match, or handle equality ignoring leading `@`.
fn dialog_matches(dialog: &ChannelHandle, id: &ChannelIdentifier) -> bool {
    if dialog.id.to_string() == id.to_string() {
        return true;
    }
    match (id.bare_handle(), dialog.username.as_deref()) {
        (Some(wanted), Some(username)) => !wanted.is_empty() && wanted == username,
        _ => false,
    }
}
