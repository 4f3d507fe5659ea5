//! SSE channel for reload events.
//!
//! Browsers subscribe to `/__reload` and receive one `message` event per
//! reload, with the JSON payload as data.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};

use super::metrics::CONNECTED_CLIENTS;
use super::rest::DevState;
use crate::reload::ReloadEvent;

/// Buffered events per client before it is considered lagging.
const CLIENT_BUFFER: usize = 16;

/// Keep-alive interval for idle connections.
const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Fan-out of reload events to connected clients.
#[derive(Debug, Clone)]
pub struct ClientHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientHub {
    /// Create a hub with no clients.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CLIENT_BUFFER);
        Self { tx }
    }

    /// Subscribe a new client.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Send an event to every client, returning how many received it.
    pub fn send(&self, event: &ReloadEvent) -> usize {
        self.tx.send(event.clone()).unwrap_or(0)
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Tracks one open SSE connection in the clients gauge.
struct ClientGuard;

impl ClientGuard {
    fn new() -> Self {
        CONNECTED_CLIENTS.inc();
        Self
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        CONNECTED_CLIENTS.dec();
    }
}

/// SSE connection handler.
pub(super) async fn reload_stream(
    State(state): State<Arc<DevState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let guard = ClientGuard::new();
    let rx = state.hub.subscribe();
    tracing::debug!(clients = state.hub.client_count(), "Reload client connected");

    let hello = futures::stream::once(async {
        Ok::<_, Infallible>(message(&ReloadEvent::connected()))
    });

    let updates = BroadcastStream::new(rx).map(move |received| {
        let _connection = &guard;
        let event = match received {
            Ok(event) => event,
            // a client that missed events can only recover by reloading
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                tracing::debug!(missed, "Reload client lagged");
                ReloadEvent::full_reload()
            }
        };
        Ok::<_, Infallible>(message(&event))
    });

    Sse::new(hello.chain(updates)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("ping"))
}

fn message(event: &ReloadEvent) -> Event {
    Event::default().event("message").data(event.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_without_clients() {
        let hub = ClientHub::new();
        assert_eq!(hub.send(&ReloadEvent::full_reload()), 0);
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_send_reaches_subscribers() {
        let hub = ClientHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        assert_eq!(hub.send(&ReloadEvent::full_reload()), 2);
        assert_eq!(first.recv().await.unwrap(), ReloadEvent::full_reload());
        assert_eq!(second.recv().await.unwrap(), ReloadEvent::full_reload());
    }

    #[test]
    fn test_dropped_client_is_not_counted() {
        let hub = ClientHub::new();
        let rx = hub.subscribe();
        assert_eq!(hub.client_count(), 1);
        drop(rx);
        assert_eq!(hub.client_count(), 0);
    }
}
