//! List scopes
//!
//! A scope owns one reconciled list together with its pagination status,
//! loading state and sync state. All writes go through a single [`ScopeWriter`]; a
//! spawned [`ListScope`] runs that writer in its own task and serializes
//! every command through one channel.
//!
//! - Diff batches publish exactly one snapshot each
//! - A malformed batch desynchronizes the scope; see [`ScopeWriter::apply_batch`]
//! - Snapshot sinks (derived caches) are fed before readers are woken, and
//!   emptied when the scope stops

use crate::config::SyncConfig;
use crate::entity::Identified;
use crate::error::SyncError;
use crate::loading::{ListLoadingState, LoadingTracker};
use crate::observable::{Observable, Publisher, Subscriber};
use crate::pagination::{PaginationStateMachine, PaginationStatus};
use crate::upstream::UpstreamControl;
use listsync_cache::{DerivedCache, Projection};
use listsync_diff::{
    refresh_batch, DiffBatch, ItemMapper, ListReconciler, MaterializedList, ReconcileError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Scope identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Create scope id from any name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Scope of the session-wide room list
    #[must_use]
    pub fn all_rooms() -> Self {
        Self::new("all-rooms")
    }

    /// Scope of a space's child rooms
    #[must_use]
    pub fn space(space_id: &str) -> Self {
        Self(format!("space:{space_id}"))
    }

    /// Scope of a room's member list
    #[must_use]
    pub fn room_members(room_id: &str) -> Self {
        Self(format!("members:{room_id}"))
    }

    /// Get as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the local replica matches upstream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// Every batch so far applied cleanly
    #[default]
    Synced,
    /// A malformed batch was received; the list is empty until a reset
    Desynchronized {
        /// Description of the failing operation
        reason: String,
    },
}

impl SyncState {
    /// Check if the replica is desynchronized
    #[inline]
    #[must_use]
    pub fn is_desynchronized(&self) -> bool {
        matches!(self, Self::Desynchronized { .. })
    }
}

/// Consumer of every snapshot a scope publishes
///
/// Sinks run on the writer, before subscribers are woken. They must not
/// block.
pub trait SnapshotSink<M: Clone>: Send + Sync {
    /// Observe a freshly published snapshot
    fn on_snapshot(&self, snapshot: &MaterializedList<M>);

    /// The owning scope stopped; drop everything derived from it
    fn on_close(&self) {}
}

impl<E, P> SnapshotSink<E> for DerivedCache<E, P>
where
    E: Clone,
    P: Projection<E>,
{
    fn on_snapshot(&self, snapshot: &MaterializedList<E>) {
        self.replace(snapshot.iter());
    }

    fn on_close(&self) {
        self.clear();
    }
}

/// Result of handing one batch to a writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A new snapshot was published
    Applied {
        /// Version of the published snapshot
        version: u64,
        /// Length of the published snapshot
        len: usize,
    },
    /// Nothing to do (empty batch or nothing to refresh)
    Skipped,
    /// Dropped while waiting for a full reset, or a refresh before the
    /// list is fully loaded
    Ignored,
    /// The batch was malformed and the replica was discarded
    Desynchronized(ReconcileError),
}

impl BatchOutcome {
    /// Check if a snapshot was published
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Convert to a result, failing on desynchronization
    ///
    /// # Errors
    /// Returns `SyncError::Reconcile` for [`BatchOutcome::Desynchronized`].
    pub fn into_result(self) -> Result<Self, SyncError> {
        match self {
            Self::Desynchronized(err) => Err(SyncError::Reconcile(err)),
            other => Ok(other),
        }
    }
}

/// Commands accepted by a running scope
#[derive(Debug, Clone)]
pub enum ScopeCommand<T> {
    /// Apply a diff batch
    Diff(DiffBatch<T>),
    /// Upstream pagination status changed
    Pagination(PaginationStatus),
    /// Upstream loading state changed
    Loading(ListLoadingState),
    /// Refresh known items in place
    Refresh(Vec<T>),
    /// Stop the scope
    Shutdown,
}

/// Single writer of one scope
///
/// Owns the reconciler and the publishing ends of the scope's
/// observables. Nothing here blocks or awaits.
pub struct ScopeWriter<T, P: ItemMapper<T>> {
    id: ScopeId,
    reconciler: ListReconciler<T, P>,
    list: Publisher<MaterializedList<P::Item>>,
    pagination: PaginationStateMachine,
    loading: LoadingTracker,
    sync_state: Publisher<SyncState>,
    upstream: Arc<dyn UpstreamControl>,
    sinks: Vec<Arc<dyn SnapshotSink<P::Item>>>,
    resync_on_desync: bool,
    desynchronized: bool,
}

impl<T, P: ItemMapper<T>> ScopeWriter<T, P> {
    /// Create writer with an empty list
    ///
    /// The empty list, [`PaginationStatus::INITIAL`],
    /// [`ListLoadingState::NotLoaded`] and [`SyncState::Synced`] are
    /// published immediately so that the first subscriber of each
    /// receives a value.
    #[must_use]
    pub fn new(
        id: ScopeId,
        mapper: P,
        upstream: Arc<dyn UpstreamControl>,
        config: &SyncConfig,
    ) -> Self {
        let reconciler = ListReconciler::new(mapper);
        let list = Publisher::with_initial(config.buffer_policy, reconciler.snapshot().clone());

        Self {
            id,
            reconciler,
            list,
            pagination: PaginationStateMachine::new(config.buffer_policy),
            loading: LoadingTracker::new(config.buffer_policy),
            sync_state: Publisher::with_initial(config.buffer_policy, SyncState::Synced),
            upstream,
            sinks: Vec::new(),
            resync_on_desync: config.resync_on_desync,
            desynchronized: false,
        }
    }

    /// With a snapshot sink
    ///
    /// The sink is fed the current snapshot right away, so it never holds
    /// anything the scope does not.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink<P::Item>>) -> Self {
        sink.on_snapshot(self.reconciler.snapshot());
        self.sinks.push(sink);
        self
    }

    /// Empty and drop every sink
    pub fn detach_sinks(&mut self) {
        for sink in self.sinks.drain(..) {
            sink.on_close();
        }
    }

    /// Scope id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ScopeId {
        &self.id
    }

    /// Current snapshot
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> &MaterializedList<P::Item> {
        self.reconciler.snapshot()
    }

    /// Current pagination status
    #[must_use]
    pub fn pagination_status(&self) -> PaginationStatus {
        self.pagination.current()
    }

    /// Current loading state
    #[must_use]
    pub fn loading_state(&self) -> ListLoadingState {
        self.loading.current()
    }

    /// Check if waiting for a full reset
    #[inline]
    #[must_use]
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// List observable
    #[must_use]
    pub fn observe_list(&self) -> Observable<MaterializedList<P::Item>> {
        self.list.observable()
    }

    /// Pagination status observable
    #[must_use]
    pub fn observe_pagination_status(&self) -> Observable<PaginationStatus> {
        self.pagination.observable()
    }

    /// Loading state observable
    #[must_use]
    pub fn observe_loading_state(&self) -> Observable<ListLoadingState> {
        self.loading.observable()
    }

    /// Sync state observable
    #[must_use]
    pub fn observe_sync_state(&self) -> Observable<SyncState> {
        self.sync_state.observable()
    }

    /// Upstream control
    #[must_use]
    pub fn upstream(&self) -> Arc<dyn UpstreamControl> {
        Arc::clone(&self.upstream)
    }

    /// Apply one diff batch and publish the result
    ///
    /// Empty batches publish nothing. A batch with an out-of-range index
    /// is discarded whole: the replica is replaced by an empty list, the
    /// sync state becomes [`SyncState::Desynchronized`] and, if
    /// configured, upstream is asked for a reset. Until a batch starting
    /// with `Reset` or `Clear` arrives, every other batch is ignored.
    pub fn apply_batch(&mut self, batch: DiffBatch<T>) -> BatchOutcome {
        if batch.is_empty() {
            trace!(scope = %self.id, "empty batch");
            return BatchOutcome::Skipped;
        }

        if self.desynchronized && !batch.starts_with_full_replacement() {
            debug!(scope = %self.id, ops = batch.len(), "dropping batch while desynchronized");
            return BatchOutcome::Ignored;
        }

        let ops = batch.len();
        match self.reconciler.apply(batch) {
            Ok(snapshot) => {
                let snapshot = snapshot.clone();
                let (version, len) = (snapshot.version(), snapshot.len());
                debug!(scope = %self.id, ops, len, version, "batch applied");

                self.publish(snapshot);
                if self.desynchronized {
                    self.desynchronized = false;
                    info!(scope = %self.id, "resynchronized");
                    self.sync_state.publish(SyncState::Synced);
                }
                BatchOutcome::Applied { version, len }
            }
            Err(err) => {
                self.desynchronize(&err);
                BatchOutcome::Desynchronized(err)
            }
        }
    }

    /// Forward an upstream pagination status
    pub fn apply_pagination(&mut self, status: PaginationStatus) {
        self.pagination.on_upstream(status);
    }

    /// Forward an upstream loading state
    pub fn apply_loading_state(&mut self, state: ListLoadingState) {
        if state != self.loading.current() {
            debug!(scope = %self.id, %state, "loading state changed");
        }
        self.loading.on_upstream(state);
    }

    fn desynchronize(&mut self, err: &ReconcileError) {
        error!(scope = %self.id, error = %err, "diff stream desynchronized, discarding replica");

        self.desynchronized = true;
        let empty = self.reconciler.discard().clone();
        self.publish(empty);
        self.sync_state.publish(SyncState::Desynchronized {
            reason: err.to_string(),
        });

        if !self.resync_on_desync {
            return;
        }
        if self.upstream.request_reset() {
            info!(scope = %self.id, "requested full reset from upstream");
        } else {
            warn!(scope = %self.id, "upstream cannot resend the list");
        }
    }

    fn publish(&self, snapshot: MaterializedList<P::Item>) {
        for sink in &self.sinks {
            sink.on_snapshot(&snapshot);
        }
        self.list.publish(snapshot);
    }
}

impl<T, P> ScopeWriter<T, P>
where
    T: Identified,
    P: ItemMapper<T>,
    P::Item: Identified,
{
    /// Replace known items in place
    ///
    /// Each entry whose identifier is in the current list is re-mapped
    /// and `Set` at its first position. All of them land in one snapshot.
    /// Unknown identifiers and placeholders are skipped. Nothing happens
    /// until upstream reports the list fully loaded.
    pub fn refresh(&mut self, entries: Vec<T>) -> BatchOutcome {
        if !self.loading.current().is_fully_loaded() {
            debug!(
                scope = %self.id,
                loading = %self.loading.current(),
                "ignoring refresh before list is fully loaded"
            );
            return BatchOutcome::Ignored;
        }
        if self.desynchronized {
            debug!(scope = %self.id, "ignoring refresh while desynchronized");
            return BatchOutcome::Ignored;
        }

        let batch = refresh_batch(
            self.reconciler.snapshot(),
            entries.into_iter().filter(|raw| raw.identifier().is_some()),
            |raw| raw.identifier().unwrap_or_default().to_owned(),
            |item| item.identifier().map(str::to_owned),
        );
        self.apply_batch(batch)
    }

    /// Handle one command
    ///
    /// Returns `false` once the scope should stop.
    pub fn handle(&mut self, command: ScopeCommand<T>) -> bool {
        match command {
            ScopeCommand::Diff(batch) => {
                self.apply_batch(batch);
            }
            ScopeCommand::Pagination(status) => self.apply_pagination(status),
            ScopeCommand::Loading(state) => self.apply_loading_state(state),
            ScopeCommand::Refresh(entries) => {
                self.refresh(entries);
            }
            ScopeCommand::Shutdown => return false,
        }
        true
    }
}

impl<T, P> fmt::Debug for ScopeWriter<T, P>
where
    P: ItemMapper<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeWriter")
            .field("id", &self.id)
            .field("version", &self.reconciler.snapshot().version())
            .field("len", &self.reconciler.snapshot().len())
            .field("loading", &self.loading.current())
            .field("desynchronized", &self.desynchronized)
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

/// Sending half of a scope's command queue
enum CommandSender<T> {
    Bounded(mpsc::Sender<ScopeCommand<T>>),
    Unbounded(mpsc::UnboundedSender<ScopeCommand<T>>),
}

/// Receiving half of a scope's command queue
enum CommandReceiver<T> {
    Bounded(mpsc::Receiver<ScopeCommand<T>>),
    Unbounded(mpsc::UnboundedReceiver<ScopeCommand<T>>),
}

fn command_queue<T>(capacity: Option<usize>) -> (CommandSender<T>, CommandReceiver<T>) {
    match capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (CommandSender::Bounded(tx), CommandReceiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (CommandSender::Unbounded(tx), CommandReceiver::Unbounded(rx))
        }
    }
}

impl<T> CommandSender<T> {
    async fn send(&self, command: ScopeCommand<T>) -> bool {
        match self {
            Self::Bounded(tx) => tx.send(command).await.is_ok(),
            Self::Unbounded(tx) => tx.send(command).is_ok(),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Bounded(tx) => tx.is_closed(),
            Self::Unbounded(tx) => tx.is_closed(),
        }
    }
}

impl<T> Clone for CommandSender<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Bounded(tx) => Self::Bounded(tx.clone()),
            Self::Unbounded(tx) => Self::Unbounded(tx.clone()),
        }
    }
}

impl<T> CommandReceiver<T> {
    async fn recv(&mut self) -> Option<ScopeCommand<T>> {
        match self {
            Self::Bounded(rx) => rx.recv().await,
            Self::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// Handle for feeding and observing a running scope
///
/// Cheap to clone. Feeding a stopped scope fails with
/// [`SyncError::ScopeClosed`]; `paginate` and `set_visible_range` on a
/// stopped scope do nothing.
pub struct ScopeHandle<T, M: Clone> {
    id: ScopeId,
    commands: CommandSender<T>,
    list: Observable<MaterializedList<M>>,
    pagination: Observable<PaginationStatus>,
    loading: Observable<ListLoadingState>,
    sync_state: Observable<SyncState>,
    upstream: Arc<dyn UpstreamControl>,
}

impl<T, M: Clone> ScopeHandle<T, M> {
    /// Scope id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ScopeId {
        &self.id
    }

    /// Check if the writer task has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: ScopeCommand<T>) -> Result<(), SyncError> {
        if self.commands.send(command).await {
            Ok(())
        } else {
            Err(SyncError::ScopeClosed(self.id.clone()))
        }
    }

    /// Queue a diff batch
    ///
    /// # Errors
    /// Returns `SyncError::ScopeClosed` if the scope has stopped.
    pub async fn push_diff(&self, batch: impl Into<DiffBatch<T>>) -> Result<(), SyncError> {
        self.send(ScopeCommand::Diff(batch.into())).await
    }

    /// Queue an upstream pagination status
    ///
    /// # Errors
    /// Returns `SyncError::ScopeClosed` if the scope has stopped.
    pub async fn push_pagination(&self, status: PaginationStatus) -> Result<(), SyncError> {
        self.send(ScopeCommand::Pagination(status)).await
    }

    /// Queue an upstream loading state
    ///
    /// # Errors
    /// Returns `SyncError::ScopeClosed` if the scope has stopped.
    pub async fn push_loading_state(&self, state: ListLoadingState) -> Result<(), SyncError> {
        self.send(ScopeCommand::Loading(state)).await
    }

    /// Queue an in-place refresh of known items
    ///
    /// # Errors
    /// Returns `SyncError::ScopeClosed` if the scope has stopped.
    pub async fn refresh(&self, entries: Vec<T>) -> Result<(), SyncError> {
        self.send(ScopeCommand::Refresh(entries)).await
    }

    /// Ask the scope to stop after the commands already queued
    pub async fn shutdown(&self) {
        if !self.commands.send(ScopeCommand::Shutdown).await {
            debug!(scope = %self.id, "shutdown on closed scope ignored");
        }
    }

    /// Subscribe to list snapshots
    #[must_use]
    pub fn observe_list(&self) -> Subscriber<MaterializedList<M>> {
        self.list.subscribe()
    }

    /// Subscribe to pagination status
    #[must_use]
    pub fn observe_pagination_status(&self) -> Subscriber<PaginationStatus> {
        self.pagination.subscribe()
    }

    /// Subscribe to loading state
    #[must_use]
    pub fn observe_loading_state(&self) -> Subscriber<ListLoadingState> {
        self.loading.subscribe()
    }

    /// Subscribe to sync state
    #[must_use]
    pub fn observe_sync_state(&self) -> Subscriber<SyncState> {
        self.sync_state.subscribe()
    }

    /// Latest snapshot
    #[must_use]
    pub fn current_list(&self) -> MaterializedList<M> {
        self.list.get().unwrap_or_default()
    }

    /// Latest pagination status
    #[must_use]
    pub fn pagination_status(&self) -> PaginationStatus {
        self.pagination.get().unwrap_or_default()
    }

    /// Latest loading state
    #[must_use]
    pub fn loading_state(&self) -> ListLoadingState {
        self.loading.get().unwrap_or_default()
    }

    /// Latest sync state
    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.sync_state.get().unwrap_or_default()
    }

    /// Ask upstream for more items
    ///
    /// Never rejected locally, even while loading.
    pub fn paginate(&self) {
        if self.is_closed() {
            debug!(scope = %self.id, "paginate on closed scope ignored");
            return;
        }
        self.upstream.request_more();
    }

    /// Tell upstream which indices are visible
    pub fn set_visible_range(&self, range: Range<usize>) {
        if self.is_closed() {
            debug!(scope = %self.id, "visible range on closed scope ignored");
            return;
        }
        trace!(scope = %self.id, start = range.start, end = range.end, "visible range");
        self.upstream.set_visible_range(range);
    }
}

impl<T, M: Clone> Clone for ScopeHandle<T, M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            commands: self.commands.clone(),
            list: self.list.clone(),
            pagination: self.pagination.clone(),
            loading: self.loading.clone(),
            sync_state: self.sync_state.clone(),
            upstream: Arc::clone(&self.upstream),
        }
    }
}

impl<T, M: Clone> fmt::Debug for ScopeHandle<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Running scope: a writer task plus its handle
#[derive(Debug)]
pub struct ListScope<T, M: Clone> {
    handle: ScopeHandle<T, M>,
    task: JoinHandle<()>,
}

impl<T, M> ListScope<T, M>
where
    T: Identified + Send + 'static,
    M: Identified + Clone + Send + Sync + 'static,
{
    /// Spawn `writer` on the current Tokio runtime
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn<P>(writer: ScopeWriter<T, P>, config: &SyncConfig) -> Self
    where
        P: ItemMapper<T, Item = M> + 'static,
    {
        let (commands, receiver) = command_queue(config.command_queue_capacity);
        let handle = ScopeHandle {
            id: writer.id().clone(),
            commands,
            list: writer.observe_list(),
            pagination: writer.observe_pagination_status(),
            loading: writer.observe_loading_state(),
            sync_state: writer.observe_sync_state(),
            upstream: writer.upstream(),
        };

        let task = tokio::spawn(scope_task(writer, receiver));
        Self { handle, task }
    }
}

impl<T, M: Clone> ListScope<T, M> {
    /// Handle to the running scope
    #[inline]
    #[must_use]
    pub fn handle(&self) -> &ScopeHandle<T, M> {
        &self.handle
    }

    /// Stop the scope and wait for its writer to finish
    ///
    /// Commands queued before the call are still applied. Snapshot sinks
    /// are emptied before this returns; subscribers see their streams end
    /// afterwards.
    pub async fn close(self) {
        self.handle.shutdown().await;
        if let Err(err) = self.task.await {
            warn!(scope = %self.handle.id, error = %err, "scope task failed");
        }
    }
}

/// Scope lifecycle loop (runs in its own tokio task)
async fn scope_task<T, P>(mut writer: ScopeWriter<T, P>, mut commands: CommandReceiver<T>)
where
    T: Identified,
    P: ItemMapper<T>,
    P::Item: Identified,
{
    info!(scope = %writer.id(), "scope started");
    while let Some(command) = commands.recv().await {
        if !writer.handle(command) {
            break;
        }
    }
    writer.detach_sinks();
    info!(
        scope = %writer.id(),
        version = writer.snapshot().version(),
        "scope stopped"
    );
}
