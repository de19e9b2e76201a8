//! Scope registry
//!
//! Query API over every open scope of one item type:
//! - Open and close scopes by id
//! - Subscribe to list, pagination, loading and sync state by id
//! - Forward pagination and visible-range requests

use crate::config::SyncConfig;
use crate::entity::Identified;
use crate::error::SyncError;
use crate::loading::ListLoadingState;
use crate::observable::Subscriber;
use crate::pagination::PaginationStatus;
use crate::scope::{ListScope, ScopeHandle, ScopeId, ScopeWriter, SnapshotSink, SyncState};
use crate::upstream::UpstreamControl;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use listsync_diff::{ItemMapper, MaterializedList};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of running scopes
///
/// # Type Parameters
/// - `T`: Raw item type carried by the diff streams
/// - `M`: Materialized item type
#[derive(Debug)]
pub struct ScopeRegistry<T, M: Clone> {
    config: SyncConfig,
    scopes: DashMap<ScopeId, ListScope<T, M>>,
}

impl<T, M> ScopeRegistry<T, M>
where
    T: Identified + Send + 'static,
    M: Identified + Clone + Send + Sync + 'static,
{
    /// Create empty registry
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            scopes: DashMap::new(),
        }
    }

    /// Configuration applied to new scopes
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Open a scope without snapshot sinks
    ///
    /// # Errors
    /// Returns `SyncError::DuplicateScope` if `id` is already open.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn open<P>(
        &self,
        id: ScopeId,
        mapper: P,
        upstream: Arc<dyn UpstreamControl>,
    ) -> Result<ScopeHandle<T, M>, SyncError>
    where
        P: ItemMapper<T, Item = M> + 'static,
    {
        self.open_with_sinks(id, mapper, upstream, Vec::new())
    }

    /// Open a scope whose snapshots also feed `sinks`
    ///
    /// # Errors
    /// Returns `SyncError::DuplicateScope` if `id` is already open.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn open_with_sinks<P>(
        &self,
        id: ScopeId,
        mapper: P,
        upstream: Arc<dyn UpstreamControl>,
        sinks: Vec<Arc<dyn SnapshotSink<M>>>,
    ) -> Result<ScopeHandle<T, M>, SyncError>
    where
        P: ItemMapper<T, Item = M> + 'static,
    {
        match self.scopes.entry(id.clone()) {
            Entry::Occupied(_) => Err(SyncError::DuplicateScope(id)),
            Entry::Vacant(slot) => {
                let writer = sinks
                    .into_iter()
                    .fold(ScopeWriter::new(id.clone(), mapper, upstream, &self.config), |writer, sink| {
                        writer.with_sink(sink)
                    });
                let scope = ListScope::spawn(writer, &self.config);
                let handle = scope.handle().clone();
                slot.insert(scope);

                info!(scope = %id, "scope opened");
                Ok(handle)
            }
        }
    }

    /// Handle to an open scope
    ///
    /// # Errors
    /// Returns `SyncError::UnknownScope` if `id` is not open.
    pub fn handle(&self, id: &ScopeId) -> Result<ScopeHandle<T, M>, SyncError> {
        self.scopes
            .get(id)
            .map(|scope| scope.handle().clone())
            .ok_or_else(|| SyncError::UnknownScope(id.clone()))
    }

    /// Check if `id` is open
    #[must_use]
    pub fn contains(&self, id: &ScopeId) -> bool {
        self.scopes.contains_key(id)
    }

    /// Number of open scopes
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Check if no scope is open
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Ids of open scopes, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<ScopeId> {
        let mut ids: Vec<ScopeId> = self.scopes.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Subscribe to list snapshots of `id`
    ///
    /// # Errors
    /// Returns `SyncError::UnknownScope` if `id` is not open.
    pub fn observe_list(&self, id: &ScopeId) -> Result<Subscriber<MaterializedList<M>>, SyncError> {
        Ok(self.handle(id)?.observe_list())
    }

    /// Subscribe to pagination status of `id`
    ///
    /// # Errors
    /// Returns `SyncError::UnknownScope` if `id` is not open.
    pub fn observe_pagination_status(
        &self,
        id: &ScopeId,
    ) -> Result<Subscriber<PaginationStatus>, SyncError> {
        Ok(self.handle(id)?.observe_pagination_status())
    }

    /// Subscribe to loading state of `id`
    ///
    /// # Errors
    /// Returns `SyncError::UnknownScope` if `id` is not open.
    pub fn observe_loading_state(
        &self,
        id: &ScopeId,
    ) -> Result<Subscriber<ListLoadingState>, SyncError> {
        Ok(self.handle(id)?.observe_loading_state())
    }

    /// Subscribe to sync state of `id`
    ///
    /// # Errors
    /// Returns `SyncError::UnknownScope` if `id` is not open.
    pub fn observe_sync_state(&self, id: &ScopeId) -> Result<Subscriber<SyncState>, SyncError> {
        Ok(self.handle(id)?.observe_sync_state())
    }

    /// Ask upstream of `id` for more items
    ///
    /// Does nothing if the scope is closed or was never opened.
    pub fn paginate(&self, id: &ScopeId) {
        // Upstream may call back into the registry; no map guard is held
        match self.handle(id) {
            Ok(handle) => handle.paginate(),
            Err(_) => debug!(scope = %id, "paginate on unknown scope ignored"),
        }
    }

    /// Tell upstream of `id` which indices are visible
    ///
    /// Does nothing if the scope is closed or was never opened.
    pub fn set_visible_range(&self, id: &ScopeId, range: Range<usize>) {
        match self.handle(id) {
            Ok(handle) => handle.set_visible_range(range),
            Err(_) => debug!(scope = %id, "visible range on unknown scope ignored"),
        }
    }

    /// Close `id`, waiting for its writer to stop
    ///
    /// Returns `false` if no such scope was open.
    pub async fn close(&self, id: &ScopeId) -> bool {
        let Some((_, scope)) = self.scopes.remove(id) else {
            return false;
        };
        scope.close().await;
        info!(scope = %id, "scope closed");
        true
    }

    /// Close every scope
    pub async fn close_all(&self) {
        for id in self.ids() {
            self.close(&id).await;
        }
    }
}
