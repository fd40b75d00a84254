//! Replays the offline queue against the remote data service.
//!
//! [`SyncDriver::sync`] walks the queue once in FIFO order, awaiting each
//! remote call before the next one so dependent writes (create, then update)
//! land in order. A failed action stays queued and the walk continues; it is
//! retried on the next sync, with no retry cap.

mod connectivity;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::queue::{ActionBody, ActionId, OfflineAction, OfflineQueue, QueuedAction};
use crate::remote::{Collection, RemoteError, RemoteService};
use crate::state::SyncState;
use crate::store::LocalStore;

pub use connectivity::{Connectivity, ConnectivitySignal};

/// Delay between coming back online and starting a sync
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Ratings are unique per user and snippet
const RATING_CONFLICT_COLUMNS: &[&str] = &["user_id", "snippet_id"];

/// Why a single queued action could not be replayed
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("unrecognized `{kind}` action: {reason}")]
    Malformed { kind: String, reason: String },
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub action_id: ActionId,
    pub kind: String,
    pub reason: String,
}

/// Result of one pass over the queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// True when nothing is left behind
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// User-facing one-line summary
    pub fn summary(&self) -> String {
        if self.attempted == 0 {
            "No pending changes".to_string()
        } else if self.failed == 0 {
            "All changes synced".to_string()
        } else if self.failed == 1 {
            "1 change failed to sync".to_string()
        } else {
            format!("{} changes failed to sync", self.failed)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// Another sync was already running; nothing was dispatched
    Skipped,
}

/// Drives replays of an [`OfflineQueue`] through a [`RemoteService`]
pub struct SyncDriver<S, R> {
    queue: Arc<OfflineQueue<S>>,
    remote: R,
    in_flight: AtomicBool,
    settle_delay: Duration,
    state: watch::Sender<SyncState>,
}

impl<S: LocalStore, R: RemoteService> SyncDriver<S, R> {
    pub fn new(queue: Arc<OfflineQueue<S>>, remote: R) -> Self {
        let (state, _) = watch::channel(SyncState::Synced);
        Self {
            queue,
            remote,
            in_flight: AtomicBool::new(false),
            settle_delay: DEFAULT_SETTLE_DELAY,
            state,
        }
    }

    #[must_use]
    pub const fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub const fn queue(&self) -> &Arc<OfflineQueue<S>> {
        &self.queue
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Replay every pending action once.
    ///
    /// Returns [`SyncOutcome::Skipped`] if a sync is already running.
    pub async fn sync(&self) -> SyncOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Sync already in progress, skipping");
            return SyncOutcome::Skipped;
        };

        let pending = self.queue.list_pending();
        if pending.is_empty() {
            self.state.send_replace(SyncState::Synced);
            return SyncOutcome::Completed(SyncReport::default());
        }

        self.state.send_replace(SyncState::Syncing);
        tracing::info!("Syncing {} offline change(s)", pending.len());

        let mut report = SyncReport::default();
        for queued in pending {
            report.attempted += 1;
            match self.replay(&queued).await {
                Ok(()) => {
                    report.synced += 1;
                    match self.queue.remove(&queued.id) {
                        Ok(true) => {}
                        Ok(false) => tracing::warn!(
                            "Synced action {} was already gone from the queue",
                            queued.id
                        ),
                        // It will be replayed again next time; remote writes
                        // are expected to tolerate that.
                        Err(error) => tracing::error!(
                            "Synced action {} but could not dequeue it: {}",
                            queued.id,
                            error
                        ),
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        "Failed to sync {} action {}: {}",
                        queued.kind_label(),
                        queued.id,
                        error
                    );
                    report.failed += 1;
                    report.failures.push(SyncFailure {
                        action_id: queued.id.clone(),
                        kind: queued.kind_label().to_string(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        if report.is_clean() {
            tracing::info!("{}", report.summary());
            self.state.send_replace(SyncState::Synced);
        } else {
            tracing::warn!("{}", report.summary());
            self.state.send_replace(SyncState::Error);
        }
        SyncOutcome::Completed(report)
    }

    async fn replay(&self, queued: &QueuedAction) -> Result<(), ReplayError> {
        match &queued.body {
            ActionBody::Ready(action) => dispatch(&self.remote, action).await,
            ActionBody::Malformed(malformed) => Err(ReplayError::Malformed {
                kind: malformed.kind.clone(),
                reason: malformed.reason.clone(),
            }),
        }
    }
}

impl<S, R> SyncDriver<S, R>
where
    S: LocalStore + 'static,
    R: RemoteService + 'static,
{
    /// Sync automatically whenever `connectivity` goes from offline to online.
    ///
    /// The sync starts after the settle delay, and only if the signal still
    /// reads online by then. The task ends when the signal is dropped.
    pub fn watch_connectivity(
        self: &Arc<Self>,
        mut connectivity: watch::Receiver<Connectivity>,
    ) -> JoinHandle<()> {
        let mut previous = *connectivity.borrow_and_update();
        if !previous.is_online() {
            self.state.send_replace(SyncState::Offline);
        }

        let driver = Arc::clone(self);
        tokio::spawn(async move {
            while connectivity.changed().await.is_ok() {
                let mut current = *connectivity.borrow_and_update();
                if !previous.is_online() && current.is_online() {
                    tokio::time::sleep(driver.settle_delay).await;
                    current = *connectivity.borrow_and_update();
                    if current.is_online() {
                        log_outcome(&driver.sync().await);
                    } else {
                        tracing::debug!("Connectivity dropped during settle delay");
                    }
                }
                if !current.is_online() {
                    driver.state.send_replace(SyncState::Offline);
                }
                previous = current;
            }
            tracing::debug!("Connectivity signal closed, stopping sync trigger");
        })
    }
}

/// Send one action to the remote service using the operation its type implies
pub async fn dispatch<R: RemoteService>(
    remote: &R,
    action: &OfflineAction,
) -> Result<(), ReplayError> {
    match action {
        OfflineAction::CreateSnippet(snippet) => {
            remote
                .insert(Collection::Snippets, serde_json::to_value(snippet)?)
                .await?;
        }
        OfflineAction::UpdateSnippet { id, updates } => {
            remote
                .update(
                    Collection::Snippets,
                    id.as_str(),
                    serde_json::to_value(updates)?,
                )
                .await?;
        }
        OfflineAction::DeleteSnippet { id } => {
            remote.delete(Collection::Snippets, id.as_str()).await?;
        }
        OfflineAction::CreateComment(comment) => {
            remote
                .insert(Collection::Comments, serde_json::to_value(comment)?)
                .await?;
        }
        OfflineAction::RateSnippet(rating) => {
            remote
                .upsert(
                    Collection::Ratings,
                    serde_json::to_value(rating)?,
                    RATING_CONFLICT_COLUMNS,
                )
                .await?;
        }
    }
    Ok(())
}

fn log_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Completed(report) => {
            tracing::info!("Reconnect sync finished: {}", report.summary());
        }
        SyncOutcome::Skipped => tracing::debug!("Reconnect sync skipped, one is already running"),
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewComment, NewSnippet, Rating, SnippetId, SnippetUpdate};
    use crate::queue::DEFAULT_QUEUE_KEY;
    use crate::remote::RemoteResult;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Call {
        op: &'static str,
        collection: Collection,
        target: String,
    }

    /// Records every call; fails the calls whose 1-based index is listed.
    #[derive(Clone, Default)]
    struct MockRemote {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_calls: Vec<usize>,
        delay: Duration,
    }

    impl MockRemote {
        fn failing_on(fail_calls: &[usize]) -> Self {
            Self {
                fail_calls: fail_calls.to_vec(),
                ..Self::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        async fn record(
            &self,
            op: &'static str,
            collection: Collection,
            target: String,
        ) -> RemoteResult<()> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Call {
                    op,
                    collection,
                    target,
                });
                calls.len()
            };
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_calls.contains(&index) {
                Err(RemoteError::Api(format!("call {index} rejected (503)")))
            } else {
                Ok(())
            }
        }
    }

    impl RemoteService for MockRemote {
        async fn insert(&self, collection: Collection, record: Value) -> RemoteResult<()> {
            self.record("insert", collection, record.to_string()).await
        }

        async fn update(&self, collection: Collection, id: &str, fields: Value) -> RemoteResult<()> {
            self.record("update", collection, format!("{id} {fields}"))
                .await
        }

        async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()> {
            self.record("delete", collection, id.to_string()).await
        }

        async fn upsert(
            &self,
            collection: Collection,
            record: Value,
            conflict_columns: &[&str],
        ) -> RemoteResult<()> {
            self.record(
                "upsert",
                collection,
                format!("{} on {}", record, conflict_columns.join(",")),
            )
            .await
        }
    }

    fn delete(id: &str) -> OfflineAction {
        OfflineAction::DeleteSnippet {
            id: SnippetId::from(id),
        }
    }

    fn driver_with(remote: MockRemote) -> SyncDriver<MemoryStore, MockRemote> {
        let queue = Arc::new(OfflineQueue::with_default_key(MemoryStore::new()));
        SyncDriver::new(queue, remote).with_settle_delay(Duration::from_millis(10))
    }

    fn completed(outcome: SyncOutcome) -> SyncReport {
        match outcome {
            SyncOutcome::Completed(report) => report,
            SyncOutcome::Skipped => panic!("sync was skipped"),
        }
    }

    #[tokio::test]
    async fn sync_empties_queue_when_every_dispatch_succeeds() {
        let remote = MockRemote::default();
        let driver = driver_with(remote.clone());
        for id in ["s1", "s2", "s3"] {
            driver.queue().enqueue("u1", delete(id));
        }

        let report = completed(driver.sync().await);

        assert_eq!(report.attempted, 3);
        assert_eq!(report.synced, 3);
        assert!(report.is_clean());
        assert_eq!(report.summary(), "All changes synced");
        assert!(driver.queue().is_empty());
        assert_eq!(driver.state(), SyncState::Synced);

        let targets: Vec<_> = remote.calls().into_iter().map(|call| call.target).collect();
        assert_eq!(targets, vec!["s1", "s2", "s3"]);
    }

    #[tokio::test]
    async fn sync_keeps_only_the_failing_action() {
        let remote = MockRemote::failing_on(&[2]);
        let driver = driver_with(remote.clone());
        for id in ["s1", "s2", "s3", "s4"] {
            driver.queue().enqueue("u1", delete(id));
        }
        let second = driver.queue().list_pending()[1].clone();

        let report = completed(driver.sync().await);

        assert_eq!(remote.calls().len(), 4);
        assert_eq!(report.synced, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].action_id, second.id);
        assert_eq!(report.summary(), "1 change failed to sync");
        assert_eq!(driver.queue().list_pending(), vec![second]);
        assert_eq!(driver.state(), SyncState::Error);
    }

    #[tokio::test]
    async fn failed_action_is_retried_on_next_sync_only() {
        let remote = MockRemote::failing_on(&[1]);
        let driver = driver_with(remote.clone());
        driver.queue().enqueue("u1", delete("s1"));

        let first = completed(driver.sync().await);
        assert_eq!(first.failed, 1);
        assert_eq!(remote.calls().len(), 1);

        let second = completed(driver.sync().await);
        assert!(second.is_clean());
        assert_eq!(remote.calls().len(), 2);
        assert!(driver.queue().is_empty());
    }

    #[tokio::test]
    async fn overlapping_sync_is_skipped() {
        let remote = MockRemote::slow(Duration::from_millis(20));
        let driver = driver_with(remote.clone());
        for id in ["s1", "s2", "s3"] {
            driver.queue().enqueue("u1", delete(id));
        }

        let (first, second) = tokio::join!(driver.sync(), driver.sync());

        assert_eq!(second, SyncOutcome::Skipped);
        assert_eq!(completed(first).synced, 3);
        assert_eq!(remote.calls().len(), 3);
        assert!(!driver.is_syncing());
    }

    #[tokio::test]
    async fn dispatch_maps_each_action_to_its_operation() {
        let remote = MockRemote::default();
        let driver = driver_with(remote.clone());
        let queue = driver.queue();
        queue.enqueue(
            "u1",
            OfflineAction::CreateSnippet(NewSnippet::new("u1", "Hi", "echo hi", "bash")),
        );
        queue.enqueue(
            "u1",
            OfflineAction::UpdateSnippet {
                id: SnippetId::from("s1"),
                updates: SnippetUpdate {
                    title: Some("Hello".to_string()),
                    ..SnippetUpdate::default()
                },
            },
        );
        queue.enqueue("u1", delete("s2"));
        queue.enqueue(
            "u1",
            OfflineAction::CreateComment(NewComment::new(SnippetId::from("s1"), "u1", "neat")),
        );
        queue.enqueue(
            "u1",
            OfflineAction::RateSnippet(Rating::new(SnippetId::from("s1"), "u1", 4).unwrap()),
        );

        assert!(completed(driver.sync().await).is_clean());

        let ops: Vec<_> = remote
            .calls()
            .into_iter()
            .map(|call| (call.op, call.collection))
            .collect();
        assert_eq!(
            ops,
            vec![
                ("insert", Collection::Snippets),
                ("update", Collection::Snippets),
                ("delete", Collection::Snippets),
                ("insert", Collection::Comments),
                ("upsert", Collection::Ratings),
            ]
        );

        let calls = remote.calls();
        assert_eq!(calls[1].target, r#"s1 {"title":"Hello"}"#);
        let comment_body: Value = serde_json::from_str(&calls[3].target).unwrap();
        let mut comment_keys: Vec<_> = comment_body
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        comment_keys.sort();
        assert_eq!(comment_keys, vec!["content", "snippet_id", "user_id"]);
        assert!(calls[4].target.ends_with("on user_id,snippet_id"));
    }

    #[tokio::test]
    async fn malformed_action_fails_and_stays_queued() {
        let store = MemoryStore::new();
        store
            .write(
                DEFAULT_QUEUE_KEY,
                r#"[{"id":"a1","type":"archive_snippet","payload":{},"createdAt":1,"ownerId":"u1"},
                    {"id":"a2","type":"delete_snippet","payload":{"id":"s1"},"createdAt":2,"ownerId":"u1"}]"#,
            )
            .unwrap();
        let remote = MockRemote::default();
        let queue = Arc::new(OfflineQueue::with_default_key(store));
        let driver = SyncDriver::new(queue, remote.clone());

        let report = completed(driver.sync().await);

        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].kind, "archive_snippet");
        assert_eq!(remote.calls().len(), 1);
        let remaining = driver.queue().list_pending();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, ActionId::from("a1"));
    }

    #[tokio::test]
    async fn empty_queue_sync_dispatches_nothing() {
        let remote = MockRemote::default();
        let driver = driver_with(remote.clone());

        let report = completed(driver.sync().await);

        assert_eq!(report, SyncReport::default());
        assert_eq!(report.summary(), "No pending changes");
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn reconnect_triggers_sync_after_settle_delay() {
        let remote = MockRemote::default();
        let driver = Arc::new(driver_with(remote.clone()));
        driver.queue().enqueue("u1", delete("s1"));
        driver.queue().enqueue("u1", delete("s2"));

        let signal = ConnectivitySignal::new(Connectivity::Offline);
        let mut states = driver.subscribe_state();
        let handle = driver.watch_connectivity(signal.subscribe());
        assert_eq!(driver.state(), SyncState::Offline);
        assert!(remote.calls().is_empty());

        signal.set(Connectivity::Online);
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|state| *state == SyncState::Synced),
        )
        .await
        .expect("sync should finish")
        .unwrap();

        assert_eq!(remote.calls().len(), 2);
        assert!(driver.queue().is_empty());

        drop(signal);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn going_offline_publishes_offline_state() {
        let driver = Arc::new(driver_with(MockRemote::default()));
        let signal = ConnectivitySignal::new(Connectivity::Online);
        let mut states = driver.subscribe_state();
        let _handle = driver.watch_connectivity(signal.subscribe());

        signal.set(Connectivity::Offline);
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|state| *state == SyncState::Offline),
        )
        .await
        .expect("state should flip to offline")
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_waits_for_settle_delay_and_rechecks() {
        let remote = MockRemote::default();
        let queue = Arc::new(OfflineQueue::with_default_key(MemoryStore::new()));
        let driver = Arc::new(
            SyncDriver::new(queue, remote.clone()).with_settle_delay(Duration::from_secs(1)),
        );
        driver.queue().enqueue("u1", delete("s1"));

        let signal = ConnectivitySignal::new(Connectivity::Offline);
        let mut states = driver.subscribe_state();
        let _handle = driver.watch_connectivity(signal.subscribe());

        signal.set(Connectivity::Online);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(remote.calls().is_empty(), "dispatched before the settle delay");

        signal.set(Connectivity::Offline);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(remote.calls().is_empty(), "dispatched after going offline again");
        assert_eq!(driver.state(), SyncState::Offline);
        assert_eq!(driver.queue().len(), 1);

        signal.set(Connectivity::Online);
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|state| *state == SyncState::Synced),
        )
        .await
        .expect("sync should finish")
        .unwrap();
        assert_eq!(remote.calls().len(), 1);
        assert!(driver.queue().is_empty());
    }
}
