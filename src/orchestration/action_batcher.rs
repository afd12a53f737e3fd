//! # Action Batcher
//!
//! Defers side effects triggered by workflow changes (reindexing, mostly) so
//! that a bulk operation executes each of them once instead of once per
//! state change.
//!
//! ## Overview
//!
//! `enter_batch()` and `resume_batch()` bracket a batching region. While at
//! least one region is open, pushed actions are queued and deduplicated by
//! `(object, action)`. Regions nest: only the outermost `resume_batch()`
//! flushes, executing the queue in first-declared order. Outside any region
//! a pushed action executes immediately.
//!
//! Deferral is cooperative. The depth counter is not a lock and the lock
//! guarding it is never held across an executor call.
//!
//! ## Scoping
//!
//! `scoped()` gives a future its own depth counter and queue, carried in a
//! tokio task-local. Concurrent operations on one batcher therefore never
//! share a region: each flushes its own queue when its outermost
//! `resume_batch()` runs. Calls outside any scope fall back to the
//! batcher's shared state.

use crate::models::Uid;
use crate::portal::ActionExecutor;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A side effect that may be deferred to the end of a batching region
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeferredAction {
    /// Reindex every catalog entry of the object
    Reindex,
    /// Reindex only the named indexes
    ReindexIndexes(Vec<String>),
}

impl fmt::Display for DeferredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reindex => f.write_str("reindex"),
            Self::ReindexIndexes(indexes) => write!(f, "reindex[{}]", indexes.join(",")),
        }
    }
}

/// Outcome of flushing a batching region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub executed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct BatchState {
    depth: usize,
    queue: Vec<(Uid, DeferredAction)>,
    seen: HashSet<(Uid, DeferredAction)>,
}

type SharedState = Arc<Mutex<BatchState>>;

/// Batch state installed by `ActionBatcher::scoped` for one batcher
struct ScopedBatch {
    owner: u64,
    state: SharedState,
}

tokio::task_local! {
    static SCOPED_BATCH: ScopedBatch;
}

static NEXT_BATCHER_ID: AtomicU64 = AtomicU64::new(1);

pub struct ActionBatcher {
    id: u64,
    shared: SharedState,
    executor: Arc<dyn ActionExecutor>,
}

impl fmt::Debug for ActionBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        let state = state.lock();
        f.debug_struct("ActionBatcher")
            .field("id", &self.id)
            .field("depth", &state.depth)
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl ActionBatcher {
    pub fn new(executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            id: NEXT_BATCHER_ID.fetch_add(1, Ordering::Relaxed),
            shared: Arc::new(Mutex::new(BatchState::default())),
            executor,
        }
    }

    /// Run `operation` with batch state of its own. Nested scopes of the
    /// same batcher reuse the outer state, so regions still nest along the
    /// call stack.
    pub async fn scoped<F>(&self, operation: F) -> F::Output
    where
        F: Future,
    {
        if self.in_scope() {
            return operation.await;
        }
        let scope = ScopedBatch {
            owner: self.id,
            state: Arc::new(Mutex::new(BatchState::default())),
        };
        SCOPED_BATCH.scope(scope, operation).await
    }

    fn in_scope(&self) -> bool {
        SCOPED_BATCH
            .try_with(|scope| scope.owner == self.id)
            .unwrap_or(false)
    }

    fn state(&self) -> SharedState {
        SCOPED_BATCH
            .try_with(|scope| (scope.owner == self.id).then(|| scope.state.clone()))
            .ok()
            .flatten()
            .unwrap_or_else(|| self.shared.clone())
    }

    /// Open a batching region
    pub fn enter_batch(&self) {
        let state = self.state();
        let mut state = state.lock();
        state.depth += 1;
        debug!(depth = state.depth, "Entered action batch");
    }

    pub fn is_batching(&self) -> bool {
        self.state().lock().depth > 0
    }

    pub fn pending(&self) -> usize {
        self.state().lock().queue.len()
    }

    /// Declare a side effect. Queued while batching, executed right away
    /// otherwise. Failures of an immediate execution are logged.
    pub async fn push(&self, uid: &Uid, action: DeferredAction) {
        {
            let state = self.state();
            let mut state = state.lock();
            if state.depth > 0 {
                let key = (uid.clone(), action);
                if state.seen.insert(key.clone()) {
                    state.queue.push(key);
                }
                return;
            }
        }

        if let Err(e) = self.executor.execute(uid, &action).await {
            warn!(uid = %uid, action = %action, error = %e, "Side effect failed");
        }
    }

    /// Close a batching region. The outermost close flushes the queue in
    /// declaration order; inner closes only decrement the depth.
    pub async fn resume_batch(&self) -> FlushReport {
        let queue = {
            let state = self.state();
            let mut state = state.lock();
            if state.depth == 0 {
                warn!("resume_batch called without an open batch");
                return FlushReport::default();
            }
            state.depth -= 1;
            if state.depth > 0 {
                return FlushReport::default();
            }
            state.seen.clear();
            std::mem::take(&mut state.queue)
        };

        let mut report = FlushReport::default();
        for (uid, action) in &queue {
            match self.executor.execute(uid, action).await {
                Ok(()) => report.executed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(uid = %uid, action = %action, error = %e, "Deferred action failed");
                }
            }
        }
        debug!(
            executed = report.executed,
            failed = report.failed,
            "Flushed action batch"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LimsError, LimsResult};
    use async_trait::async_trait;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Uid, DeferredAction)>>,
        fail_on: Option<DeferredAction>,
    }

    #[async_trait]
    impl ActionExecutor for Recorder {
        async fn execute(&self, uid: &Uid, action: &DeferredAction) -> LimsResult<()> {
            self.calls.lock().push((uid.clone(), action.clone()));
            if self.fail_on.as_ref() == Some(action) {
                return Err(LimsError::Storage("index unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_push_outside_batch_executes_immediately() {
        let recorder = Arc::new(Recorder::default());
        let batcher = ActionBatcher::new(recorder.clone());
        let uid = Uid::generate();

        batcher.push(&uid, DeferredAction::Reindex).await;

        assert_eq!(recorder.calls.lock().len(), 1);
        assert_eq!(batcher.pending(), 0);
    }

    #[tokio::test]
    async fn test_batch_dedupes_and_keeps_first_declared_order() {
        let recorder = Arc::new(Recorder::default());
        let batcher = ActionBatcher::new(recorder.clone());
        let a = Uid::generate();
        let b = Uid::generate();

        batcher.enter_batch();
        batcher.push(&b, DeferredAction::Reindex).await;
        batcher.push(&a, DeferredAction::Reindex).await;
        batcher.push(&b, DeferredAction::Reindex).await;
        assert!(recorder.calls.lock().is_empty());

        let report = batcher.resume_batch().await;

        assert_eq!(report.executed, 2);
        let calls = recorder.calls.lock();
        assert_eq!(calls[0].0, b);
        assert_eq!(calls[1].0, a);
    }

    #[tokio::test]
    async fn test_nested_regions_flush_only_at_outermost() {
        let recorder = Arc::new(Recorder::default());
        let batcher = ActionBatcher::new(recorder.clone());
        let uid = Uid::generate();

        batcher.enter_batch();
        batcher.enter_batch();
        batcher.push(&uid, DeferredAction::Reindex).await;
        let inner = batcher.resume_batch().await;
        assert_eq!(inner, FlushReport::default());
        assert!(recorder.calls.lock().is_empty());
        assert!(batcher.is_batching());

        batcher.push(&uid, DeferredAction::Reindex).await;
        let outer = batcher.resume_batch().await;
        assert_eq!(outer.executed, 1);
        assert!(!batcher.is_batching());
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_raised() {
        let fail_on = DeferredAction::ReindexIndexes(vec!["isRootAncestor".to_string()]);
        let recorder = Arc::new(Recorder {
            fail_on: Some(fail_on.clone()),
            ..Default::default()
        });
        let batcher = ActionBatcher::new(recorder.clone());
        let uid = Uid::generate();

        batcher.enter_batch();
        batcher.push(&uid, fail_on).await;
        batcher.push(&uid, DeferredAction::Reindex).await;
        let report = batcher.resume_batch().await;

        assert_eq!(report, FlushReport { executed: 1, failed: 1 });
    }

    fn count_for(recorder: &Recorder, uid: &Uid) -> usize {
        recorder.calls.lock().iter().filter(|(u, _)| u == uid).count()
    }

    #[tokio::test]
    async fn test_interleaved_scopes_flush_their_own_actions() {
        let recorder = Arc::new(Recorder::default());
        let batcher = ActionBatcher::new(recorder.clone());
        let a = Uid::generate();
        let b = Uid::generate();

        let first = batcher.scoped(async {
            batcher.enter_batch();
            batcher.push(&a, DeferredAction::Reindex).await;
            tokio::task::yield_now().await;
            let report = batcher.resume_batch().await;
            (report, count_for(&recorder, &a))
        });
        let second = batcher.scoped(async {
            batcher.enter_batch();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            batcher.push(&b, DeferredAction::Reindex).await;
            let report = batcher.resume_batch().await;
            (report, count_for(&recorder, &b))
        });

        let ((first_report, a_done), (second_report, b_done)) = tokio::join!(first, second);

        assert_eq!(first_report.executed, 1);
        assert_eq!(a_done, 1);
        assert_eq!(second_report.executed, 1);
        assert_eq!(b_done, 1);
        assert_eq!(recorder.calls.lock().len(), 2);
        assert!(!batcher.is_batching());
    }

    #[tokio::test]
    async fn test_nested_scope_shares_the_outer_region() {
        let recorder = Arc::new(Recorder::default());
        let batcher = ActionBatcher::new(recorder.clone());
        let uid = Uid::generate();

        batcher
            .scoped(async {
                batcher.enter_batch();
                batcher
                    .scoped(async {
                        batcher.enter_batch();
                        batcher.push(&uid, DeferredAction::Reindex).await;
                        batcher.resume_batch().await;
                    })
                    .await;
                assert_eq!(batcher.pending(), 1);
                assert!(recorder.calls.lock().is_empty());
                batcher.resume_batch().await;
            })
            .await;

        assert_eq!(count_for(&recorder, &uid), 1);
    }

    #[tokio::test]
    async fn test_scope_does_not_touch_shared_state() {
        let recorder = Arc::new(Recorder::default());
        let batcher = ActionBatcher::new(recorder.clone());
        let uid = Uid::generate();

        batcher.enter_batch();
        batcher
            .scoped(async {
                assert!(!batcher.is_batching());
                batcher.push(&uid, DeferredAction::Reindex).await;
            })
            .await;

        assert_eq!(count_for(&recorder, &uid), 1);
        assert!(batcher.is_batching());
        assert_eq!(batcher.resume_batch().await, FlushReport::default());
    }

    #[tokio::test]
    async fn test_unbalanced_resume_is_harmless() {
        let batcher = ActionBatcher::new(Arc::new(Recorder::default()));
        assert_eq!(batcher.resume_batch().await, FlushReport::default());
        assert!(!batcher.is_batching());
    }
}
