//! The single consumer of story events.
//!
//! A session owns the reload director and rebuilds the catalog once per
//! coalesced batch, so a fingerprint is only ever compared against the
//! complete on-disk state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::EventBatch;
use super::watcher::StoryWatcher;
use crate::catalog::CatalogBuilder;
use crate::fingerprint::FingerprintOutcome;
use crate::reload::{ReloadDecision, ReloadDirector, ServerBridge};

/// Where a session is in handling events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for events.
    #[default]
    Idle,
    /// A batch arrived and more may be coalesced into it.
    EventPending,
    /// Rebuilding the catalog and comparing fingerprints.
    Recomputing,
}

/// Statistics for a watch session.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub batches: AtomicU64,
    pub events: AtomicU64,
    pub recomputations: AtomicU64,
    pub reloads: AtomicU64,
    pub retained: AtomicU64,
}

impl SessionStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            retained: self.retained.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of session stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatsSnapshot {
    pub batches: u64,
    pub events: u64,
    pub recomputations: u64,
    pub reloads: u64,
    pub retained: u64,
}

/// Turns story events into reload decisions.
pub struct WatchSession<B> {
    builder: Arc<CatalogBuilder>,
    director: ReloadDirector<B>,
    state: SessionState,
    stats: Arc<SessionStats>,
}

impl<B: ServerBridge> WatchSession<B> {
    /// Create a session driving `bridge`.
    pub fn new(builder: Arc<CatalogBuilder>, bridge: B) -> Self {
        Self {
            builder,
            director: ReloadDirector::new(bridge),
            state: SessionState::Idle,
            stats: SessionStats::new(),
        }
    }

    /// Build the initial catalog and prime the director with it.
    pub async fn start(&mut self) -> ReloadDecision {
        let outcome = FingerprintOutcome::from_build(self.builder.build().await);
        self.director.prime(outcome)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Shared statistics.
    #[must_use]
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// The reload director.
    #[must_use]
    pub const fn director(&self) -> &ReloadDirector<B> {
        &self.director
    }

    /// Recompute after one batch of events.
    pub async fn handle_batch(&mut self, batch: EventBatch) -> ReloadDecision {
        self.state = SessionState::EventPending;
        self.stats.batches.fetch_add(1, Ordering::Relaxed);
        self.stats
            .events
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        for event in batch.events() {
            tracing::debug!(kind = event.kind(), path = %event.path().display(), "Story event");
        }

        if batch.is_empty() {
            self.state = SessionState::Idle;
            return ReloadDecision::Unchanged;
        }

        self.state = SessionState::Recomputing;
        self.stats.recomputations.fetch_add(1, Ordering::Relaxed);

        let outcome = FingerprintOutcome::from_build(self.builder.build().await);
        if let Some(fingerprint) = outcome.fingerprint() {
            tracing::debug!(digest = %fingerprint, "Story fingerprint recomputed");
        }
        let decision = self.director.observe(outcome);

        match &decision {
            ReloadDecision::Reloaded { .. } => {
                self.stats.reloads.fetch_add(1, Ordering::Relaxed);
            }
            ReloadDecision::Retained { .. } => {
                self.stats.retained.fetch_add(1, Ordering::Relaxed);
            }
            ReloadDecision::Baseline | ReloadDecision::Unchanged => {}
        }

        self.state = SessionState::Idle;
        decision
    }

    /// Process batches until the channel closes or `shutdown` fires.
    ///
    /// Batches that queued up while the previous one was being handled are
    /// merged and handled together.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<EventBatch>,
        shutdown: CancellationToken,
    ) -> SessionStatsSnapshot {
        tracing::info!("Watch session started");

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    tracing::info!("Watch session cancelled");
                    break;
                }
                received = events.recv() => {
                    let Some(mut batch) = received else {
                        tracing::info!("Story event channel closed, stopping session");
                        break;
                    };
                    while let Ok(more) = events.try_recv() {
                        batch.merge(more);
                    }
                    self.handle_batch(batch).await;
                }
            }
        }

        self.director.reset();
        self.stats.snapshot()
    }

    /// Run against a live watcher, keeping its subscription open until the
    /// session ends.
    pub async fn watch(
        self,
        mut watcher: StoryWatcher,
        shutdown: CancellationToken,
    ) -> SessionStatsSnapshot {
        let events = watcher.take_receiver();
        let stats = self.run(events, shutdown).await;
        drop(watcher);
        stats
    }
}
