//! Reload decisions from successive fingerprints.

use super::bridge::{InvalidateOutcome, ReloadEvent, ServerBridge, GENERATED_LIST_MODULE_ID};
use crate::fingerprint::{Fingerprint, FingerprintOutcome};
use crate::server::metrics::RELOADS_TOTAL;
use crate::server::observability::spans;

/// What the director did with an observed fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadDecision {
    /// Stored as the baseline without touching the server.
    Baseline,
    /// Same as the last-known fingerprint; nothing to do.
    Unchanged,
    /// No fingerprint was available; the last-known one is kept.
    Retained { reason: String },
    /// The catalog changed; the story list was invalidated and clients told
    /// to reload.
    Reloaded {
        invalidated: InvalidateOutcome,
        clients: usize,
    },
}

impl ReloadDecision {
    /// Whether a reload was sent.
    #[must_use]
    pub const fn is_reload(&self) -> bool {
        matches!(self, Self::Reloaded { .. })
    }
}

/// Holds the last-known fingerprint for one watch session and reloads the
/// dev server when it changes.
#[derive(Debug)]
pub struct ReloadDirector<B> {
    bridge: B,
    last: Fingerprint,
}

impl<B: ServerBridge> ReloadDirector<B> {
    /// Create a director with the empty sentinel as its baseline.
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            last: Fingerprint::empty(),
        }
    }

    /// Record the initial fingerprint without reloading anything.
    pub fn prime(&mut self, outcome: FingerprintOutcome) -> ReloadDecision {
        match outcome {
            FingerprintOutcome::Ready(fingerprint) => {
                tracing::debug!(digest = %fingerprint, "Primed story fingerprint");
                self.last = fingerprint;
                ReloadDecision::Baseline
            }
            FingerprintOutcome::Unavailable(reason) => {
                tracing::warn!(%reason, "No initial story fingerprint");
                ReloadDecision::Retained { reason }
            }
        }
    }

    /// Compare a new fingerprint with the last-known one and reload on change.
    pub fn observe(&mut self, outcome: FingerprintOutcome) -> ReloadDecision {
        let fingerprint = match outcome {
            FingerprintOutcome::Ready(fingerprint) => fingerprint,
            FingerprintOutcome::Unavailable(reason) => {
                tracing::warn!(%reason, digest = %self.last, "Keeping last story fingerprint");
                return ReloadDecision::Retained { reason };
            }
        };

        if fingerprint == self.last {
            tracing::trace!(digest = %fingerprint, "Stories unchanged");
            return ReloadDecision::Unchanged;
        }

        let span = spans::reload_span(&self.last.to_string(), &fingerprint.to_string());
        let _guard = span.enter();

        self.last = fingerprint;

        let invalidated = self.bridge.invalidate_module(GENERATED_LIST_MODULE_ID);
        if invalidated == InvalidateOutcome::NotLoaded {
            tracing::debug!("Story list module was not loaded");
        }

        let clients = self.bridge.notify_clients(&ReloadEvent::full_reload());
        if clients == 0 {
            tracing::debug!("No clients connected");
        }

        RELOADS_TOTAL.inc();
        tracing::info!(clients, "Stories changed, full reload sent");

        ReloadDecision::Reloaded {
            invalidated,
            clients,
        }
    }

    /// Forget the last-known fingerprint.
    pub fn reset(&mut self) {
        self.last = Fingerprint::empty();
    }

    /// The last-known fingerprint.
    #[must_use]
    pub const fn last(&self) -> &Fingerprint {
        &self.last
    }

    /// The bridge being driven.
    #[must_use]
    pub const fn bridge(&self) -> &B {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{test_entry, Catalog};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingBridge {
        loaded: Mutex<bool>,
        invalidations: Mutex<Vec<String>>,
        notifications: Mutex<Vec<ReloadEvent>>,
    }

    impl ServerBridge for RecordingBridge {
        fn invalidate_module(&self, module_id: &str) -> InvalidateOutcome {
            self.invalidations.lock().push(module_id.to_string());
            if std::mem::take(&mut *self.loaded.lock()) {
                InvalidateOutcome::Invalidated
            } else {
                InvalidateOutcome::NotLoaded
            }
        }

        fn notify_clients(&self, event: &ReloadEvent) -> usize {
            self.notifications.lock().push(event.clone());
            2
        }
    }

    fn ready(ids: &[&str]) -> FingerprintOutcome {
        let mut catalog = Catalog::new();
        for id in ids {
            catalog.insert_file(*id, vec![test_entry(id, id, 1)]);
        }
        FingerprintOutcome::from_build(Ok(catalog))
    }

    #[test]
    fn test_prime_is_silent() {
        let mut director = ReloadDirector::new(RecordingBridge::default());

        assert_eq!(director.prime(ready(&["a"])), ReloadDecision::Baseline);
        assert!(director.bridge().invalidations.lock().is_empty());
        assert!(director.bridge().notifications.lock().is_empty());
        assert!(!director.last().is_empty());
    }

    #[test]
    fn test_unchanged_is_noop() {
        let mut director = ReloadDirector::new(RecordingBridge::default());
        director.prime(ready(&["a"]));

        assert_eq!(director.observe(ready(&["a"])), ReloadDecision::Unchanged);
        assert!(director.bridge().notifications.lock().is_empty());
    }

    #[test]
    fn test_change_invalidates_and_notifies() {
        let mut director = ReloadDirector::new(RecordingBridge::default());
        director.prime(ready(&["a"]));
        *director.bridge().loaded.lock() = true;

        let decision = director.observe(ready(&["a", "b"]));

        assert_eq!(
            decision,
            ReloadDecision::Reloaded {
                invalidated: InvalidateOutcome::Invalidated,
                clients: 2
            }
        );
        assert_eq!(
            *director.bridge().invalidations.lock(),
            vec![GENERATED_LIST_MODULE_ID.to_string()]
        );
        assert_eq!(
            *director.bridge().notifications.lock(),
            vec![ReloadEvent::full_reload()]
        );
    }

    #[test]
    fn test_module_not_loaded_still_notifies() {
        let mut director = ReloadDirector::new(RecordingBridge::default());
        director.prime(ready(&["a"]));

        let decision = director.observe(ready(&["b"]));

        assert_eq!(
            decision,
            ReloadDecision::Reloaded {
                invalidated: InvalidateOutcome::NotLoaded,
                clients: 2
            }
        );
    }

    #[test]
    fn test_unavailable_retains_baseline() {
        let mut director = ReloadDirector::new(RecordingBridge::default());
        director.prime(ready(&["a"]));
        let before = director.last().clone();

        let decision =
            director.observe(FingerprintOutcome::Unavailable("broken".to_string()));

        assert_eq!(
            decision,
            ReloadDecision::Retained {
                reason: "broken".to_string()
            }
        );
        assert_eq!(director.last(), &before);
        assert!(director.bridge().notifications.lock().is_empty());

        // recovering to the same catalog is not a change
        assert_eq!(director.observe(ready(&["a"])), ReloadDecision::Unchanged);
    }

    #[test]
    fn test_observe_without_baseline_reloads() {
        let mut director = ReloadDirector::new(RecordingBridge::default());
        director.prime(FingerprintOutcome::Unavailable("broken".to_string()));

        assert!(director.observe(ready(&["a"])).is_reload());
    }

    #[test]
    fn test_reset_forgets_baseline() {
        let mut director = ReloadDirector::new(RecordingBridge::default());
        director.prime(ready(&["a"]));
        director.reset();

        assert!(director.last().is_empty());
        assert!(director.observe(ready(&["a"])).is_reload());
    }
}
