use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use tokio::sync::watch;

/// The current value of `rx`, then every later change, until the sender goes away.
pub fn watch_values<T>(rx: watch::Receiver<T>) -> impl Stream<Item = T> + Send + 'static
where
    T: Clone + Send + Sync + 'static,
{
    let initial = rx.borrow().clone();
    stream::once(async move { initial }).chain(stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let value = rx.borrow_and_update().clone();
        Some((value, rx))
    }))
}

/// Serves a stream of values as JSON server-sent events.
pub fn json_events<S, T>(values: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let events = values.filter_map(|value| async move {
        match Event::default().json_data(&value) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!("Dropping unserializable event: {}", e);
                None
            }
        }
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}
