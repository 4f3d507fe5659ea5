//! Story file event types and batching.

#![allow(clippy::missing_const_for_fn)]

use std::path::{Path, PathBuf};

/// Filesystem event for a path matching the stories glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryEvent {
    /// A new story file appeared.
    Added(PathBuf),
    /// A known story file was written.
    Changed(PathBuf),
    /// A known story file disappeared.
    Removed(PathBuf),
}

impl StoryEvent {
    /// Get the path associated with this event.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Added(p) | Self::Changed(p) | Self::Removed(p) => p,
        }
    }

    /// Short event name (`add`, `change`, `unlink`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "add",
            Self::Changed(_) => "change",
            Self::Removed(_) => "unlink",
        }
    }
}

/// Batch of story events, at most one per path.
///
/// Successive events for the same path are folded together so a batch
/// describes the net change since the previous batch.
#[derive(Debug, Default, Clone)]
pub struct EventBatch {
    events: Vec<StoryEvent>,
}

impl EventBatch {
    /// Create a new empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event to the batch.
    pub fn add(&mut self, event: StoryEvent) {
        let Some(idx) = self.events.iter().position(|e| e.path() == event.path()) else {
            self.events.push(event);
            return;
        };

        let previous = self.events.remove(idx);
        let folded = match (previous, event) {
            // created then deleted inside one batch: nothing happened
            (StoryEvent::Added(_), StoryEvent::Removed(_)) => None,
            (StoryEvent::Added(p), StoryEvent::Changed(_)) => Some(StoryEvent::Added(p)),
            (StoryEvent::Removed(p), StoryEvent::Added(_)) => Some(StoryEvent::Changed(p)),
            (_, latest) => Some(latest),
        };

        if let Some(event) = folded {
            self.events.insert(idx, event);
        }
    }

    /// Fold another batch into this one.
    pub fn merge(&mut self, other: Self) {
        for event in other.events {
            self.add(event);
        }
    }

    /// Events in arrival order.
    #[must_use]
    pub fn events(&self) -> &[StoryEvent] {
        &self.events
    }

    /// Check if batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl FromIterator<StoryEvent> for EventBatch {
    fn from_iter<I: IntoIterator<Item = StoryEvent>>(iter: I) -> Self {
        let mut batch = Self::new();
        for event in iter {
            batch.add(event);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_path_and_kind() {
        let added = StoryEvent::Added(PathBuf::from("/a.stories.js"));
        assert_eq!(added.path(), Path::new("/a.stories.js"));
        assert_eq!(added.kind(), "add");

        assert_eq!(StoryEvent::Changed(PathBuf::from("/a")).kind(), "change");
        assert_eq!(StoryEvent::Removed(PathBuf::from("/a")).kind(), "unlink");
    }

    #[test]
    fn test_batch_deduplicates_changes() {
        let mut batch = EventBatch::new();
        batch.add(StoryEvent::Changed(PathBuf::from("/a.js")));
        batch.add(StoryEvent::Changed(PathBuf::from("/b.js")));
        batch.add(StoryEvent::Changed(PathBuf::from("/a.js")));

        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_added_then_removed_cancels() {
        let mut batch = EventBatch::new();
        batch.add(StoryEvent::Added(PathBuf::from("/tmp.js")));
        batch.add(StoryEvent::Removed(PathBuf::from("/tmp.js")));

        assert!(batch.is_empty());
    }

    #[test]
    fn test_added_then_changed_stays_added() {
        let batch: EventBatch = [
            StoryEvent::Added(PathBuf::from("/a.js")),
            StoryEvent::Changed(PathBuf::from("/a.js")),
        ]
        .into_iter()
        .collect();

        assert_eq!(batch.events(), &[StoryEvent::Added(PathBuf::from("/a.js"))]);
    }

    #[test]
    fn test_removed_then_added_is_change() {
        let batch: EventBatch = [
            StoryEvent::Removed(PathBuf::from("/a.js")),
            StoryEvent::Added(PathBuf::from("/a.js")),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            batch.events(),
            &[StoryEvent::Changed(PathBuf::from("/a.js"))]
        );
    }

    #[test]
    fn test_merge_batches() {
        let mut first: EventBatch = [StoryEvent::Added(PathBuf::from("/a.js"))]
            .into_iter()
            .collect();
        let second: EventBatch = [
            StoryEvent::Changed(PathBuf::from("/a.js")),
            StoryEvent::Removed(PathBuf::from("/b.js")),
        ]
        .into_iter()
        .collect();

        first.merge(second);

        assert_eq!(
            first.events(),
            &[
                StoryEvent::Added(PathBuf::from("/a.js")),
                StoryEvent::Removed(PathBuf::from("/b.js")),
            ]
        );
    }
}
