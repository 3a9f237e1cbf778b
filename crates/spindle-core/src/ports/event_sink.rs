//! EventSink port - injected observability sink

use crate::domain::PoolEvent;

/// Receives every `PoolEvent` the pool emits.
///
/// Called from worker tasks, never while the backlog lock is held. Keep
/// `emit` cheap and non-blocking.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PoolEvent);
}
