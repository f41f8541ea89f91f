// Engine event bridge
//
// Engine callbacks run on threads the engine owns. The forwarder turns each
// callback into one EngineEvent and posts it into an unbounded queue; the UI
// side drains that queue on its own thread and is the only place state changes.

use crate::engine::{EngineEventHandler, RtcStats, UserOfflineReason};
use crate::metrics::Metrics;
use crate::models::Uid;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Discriminant of an [`EngineEvent`], stable across the integer encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    JoinChannelSuccess = 1,
    LeaveChannel = 2,
    UserJoined = 3,
    UserOffline = 4,
    StreamInjectedStatus = 5,
}

impl EventKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(EventKind::JoinChannelSuccess),
            2 => Some(EventKind::LeaveChannel),
            3 => Some(EventKind::UserJoined),
            4 => Some(EventKind::UserOffline),
            5 => Some(EventKind::StreamInjectedStatus),
            _ => None,
        }
    }
}

/// One engine callback, marshalled for the UI thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    JoinChannelSuccess { uid: Uid, elapsed_ms: u32 },
    LeaveChannel,
    UserJoined { uid: Uid, elapsed_ms: u32 },
    UserOffline { uid: Uid, reason: UserOfflineReason },
    StreamInjectedStatus { uid: Uid, status: i32 },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::JoinChannelSuccess { .. } => EventKind::JoinChannelSuccess,
            EngineEvent::LeaveChannel => EventKind::LeaveChannel,
            EngineEvent::UserJoined { .. } => EventKind::UserJoined,
            EngineEvent::UserOffline { .. } => EventKind::UserOffline,
            EngineEvent::StreamInjectedStatus { .. } => EventKind::StreamInjectedStatus,
        }
    }

    /// Flatten to `(kind, payload_a, payload_b)` for integer-only transports.
    ///
    /// Uids travel bit-for-bit as `i32`.
    pub fn to_parts(&self) -> (i32, i32, i32) {
        let kind = self.kind() as i32;
        match *self {
            EngineEvent::JoinChannelSuccess { uid, elapsed_ms } => {
                (kind, uid.0 as i32, elapsed_ms as i32)
            }
            EngineEvent::LeaveChannel => (kind, 0, 0),
            EngineEvent::UserJoined { uid, elapsed_ms } => (kind, uid.0 as i32, elapsed_ms as i32),
            EngineEvent::UserOffline { uid, reason } => (kind, uid.0 as i32, reason.code()),
            EngineEvent::StreamInjectedStatus { uid, status } => (kind, uid.0 as i32, status),
        }
    }

    /// Rebuild an event from [`to_parts`](Self::to_parts). `None` for an unknown kind.
    pub fn from_parts(kind: i32, payload_a: i32, payload_b: i32) -> Option<Self> {
        let uid = Uid(payload_a as u32);
        let event = match EventKind::from_code(kind)? {
            EventKind::JoinChannelSuccess => EngineEvent::JoinChannelSuccess {
                uid,
                elapsed_ms: payload_b as u32,
            },
            EventKind::LeaveChannel => EngineEvent::LeaveChannel,
            EventKind::UserJoined => EngineEvent::UserJoined {
                uid,
                elapsed_ms: payload_b as u32,
            },
            EventKind::UserOffline => EngineEvent::UserOffline {
                uid,
                reason: UserOfflineReason::from_code(payload_b),
            },
            EventKind::StreamInjectedStatus => EngineEvent::StreamInjectedStatus {
                uid,
                status: payload_b,
            },
        };
        Some(event)
    }
}

/// Create the queue between engine callbacks and the UI thread.
///
/// The [`EventPoster`] is the strong end and belongs to the UI component;
/// forwarders handed to the engine only hold a weak reference to it.
pub fn event_channel(metrics: Arc<Metrics>) -> (EventPoster, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventPoster { tx, metrics },
        EventQueue { rx },
    )
}

/// Owning end of the event queue, held by the UI component.
///
/// Once every poster is dropped, forwarders drop their events and the queue
/// drains to completion.
pub struct EventPoster {
    tx: mpsc::UnboundedSender<EngineEvent>,
    metrics: Arc<Metrics>,
}

impl EventPoster {
    /// Adapter to register with the engine.
    pub fn forwarder(&self) -> EventForwarder {
        EventForwarder {
            target: self.tx.downgrade(),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Post directly from the owning side (used for replay and tests).
    pub fn post(&self, event: EngineEvent) -> bool {
        let posted = self.tx.send(event).is_ok();
        if posted {
            self.metrics.record_event_posted();
        }
        posted
    }
}

/// Engine callback adapter.
///
/// Translates every callback into exactly one [`EngineEvent`] post. Never
/// blocks, never touches dialog state.
#[derive(Clone)]
pub struct EventForwarder {
    target: mpsc::WeakUnboundedSender<EngineEvent>,
    metrics: Arc<Metrics>,
}

impl EventForwarder {
    fn post(&self, event: EngineEvent) {
        let delivered = self
            .target
            .upgrade()
            .is_some_and(|tx| tx.send(event).is_ok());

        if delivered {
            self.metrics.record_event_posted();
        } else {
            self.metrics.record_event_dropped();
            tracing::debug!("UI side gone, dropping {:?}", event.kind());
        }
    }

    /// Whether the UI side still accepts events.
    pub fn is_connected(&self) -> bool {
        self.target.upgrade().is_some()
    }
}

impl EngineEventHandler for EventForwarder {
    fn on_join_channel_success(&self, channel: &str, uid: Uid, elapsed_ms: u32) {
        tracing::debug!("join channel success: channel={}, uid={}", channel, uid);
        self.post(EngineEvent::JoinChannelSuccess { uid, elapsed_ms });
    }

    fn on_leave_channel(&self, stats: &RtcStats) {
        tracing::debug!(
            "left channel after {}s with {} users",
            stats.duration_secs,
            stats.user_count
        );
        self.post(EngineEvent::LeaveChannel);
    }

    fn on_user_joined(&self, uid: Uid, elapsed_ms: u32) {
        self.post(EngineEvent::UserJoined { uid, elapsed_ms });
    }

    fn on_user_offline(&self, uid: Uid, reason: UserOfflineReason) {
        self.post(EngineEvent::UserOffline { uid, reason });
    }

    fn on_stream_injected_status(&self, url: &str, uid: Uid, status: i32) {
        tracing::debug!("inject status {} for {} (uid {})", status, url, uid);
        self.post(EngineEvent::StreamInjectedStatus { uid, status });
    }
}

/// Consuming end of the event queue, drained on the UI thread.
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EventQueue {
    /// Wait for the next event. `None` once every poster is gone and the queue is empty.
    pub async fn next(&mut self) -> Option<EngineEvent> {
        let event = self.rx.recv().await;
        self.note(event)
    }

    /// Take the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<EngineEvent> {
        let event = self.rx.try_recv().ok();
        self.note(event)
    }

    /// Blocking variant for a dedicated bridge thread. Must not be called from async context.
    pub fn blocking_next(&mut self) -> Option<EngineEvent> {
        let event = self.rx.blocking_recv();
        self.note(event)
    }

    /// Everything queued right now, in arrival order.
    pub fn drain_ready(&mut self) -> Vec<EngineEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    fn note(&self, event: Option<EngineEvent>) -> Option<EngineEvent> {
        if let Some(ref event) = event {
            tracing::trace!("dequeued {:?}", event);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn channel() -> (EventPoster, EventQueue, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        let (poster, queue) = event_channel(Arc::clone(&metrics));
        (poster, queue, metrics)
    }

    #[test]
    fn test_one_post_per_callback() {
        let (poster, mut queue, metrics) = channel();
        let forwarder = poster.forwarder();

        forwarder.on_join_channel_success("demo", Uid(7), 120);
        forwarder.on_user_joined(Uid(666), 0);
        forwarder.on_stream_injected_status("rtmp://host/live", Uid(666), 3);

        assert_eq!(
            queue.drain_ready(),
            vec![
                EngineEvent::JoinChannelSuccess {
                    uid: Uid(7),
                    elapsed_ms: 120
                },
                EngineEvent::UserJoined {
                    uid: Uid(666),
                    elapsed_ms: 0
                },
                EngineEvent::StreamInjectedStatus {
                    uid: Uid(666),
                    status: 3
                },
            ]
        );
        assert_eq!(metrics.events_posted(), 3);
    }

    #[test]
    fn test_events_dropped_after_poster_gone() {
        let (poster, mut queue, metrics) = channel();
        let forwarder = poster.forwarder();
        assert!(forwarder.is_connected());

        drop(poster);
        forwarder.on_leave_channel(&RtcStats::default());

        assert!(!forwarder.is_connected());
        assert_eq!(queue.try_next(), None);
        assert_eq!(metrics.events_dropped(), 1);
        assert_eq!(metrics.events_posted(), 0);
    }

    #[test]
    fn test_concurrent_callbacks_all_delivered() {
        let (poster, mut queue, _metrics) = channel();

        let handles: Vec<_> = (0..4u32)
            .map(|thread| {
                let forwarder = poster.forwarder();
                std::thread::spawn(move || {
                    for n in 0..25u32 {
                        forwarder.on_user_joined(Uid(thread * 100 + n), 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = queue.drain_ready();
        assert_eq!(events.len(), 100);

        // FIFO per producer
        for thread in 0..4u32 {
            let uids: Vec<u32> = events
                .iter()
                .filter_map(|event| match event {
                    EngineEvent::UserJoined { uid, .. } if uid.0 / 100 == thread => Some(uid.0),
                    _ => None,
                })
                .collect();
            let mut sorted = uids.clone();
            sorted.sort_unstable();
            assert_eq!(uids, sorted);
        }
    }

    #[test]
    fn test_next_pending_until_posted() {
        let (poster, mut queue, _metrics) = channel();
        let mut next = task::spawn(async move { queue.next().await });

        assert_pending!(next.poll());

        poster.post(EngineEvent::LeaveChannel);
        assert!(next.is_woken());
        assert_ready_eq!(next.poll(), Some(EngineEvent::LeaveChannel));
    }

    #[test]
    fn test_queue_closes_when_poster_dropped() {
        let (poster, mut queue, _metrics) = channel();
        poster.post(EngineEvent::LeaveChannel);
        drop(poster);

        let mut next = task::spawn(async { (queue.next().await, queue.next().await) });
        assert_ready_eq!(next.poll(), (Some(EngineEvent::LeaveChannel), None));
    }

    #[test]
    fn test_parts_keep_large_uids() {
        let event = EngineEvent::UserOffline {
            uid: Uid(u32::MAX - 1),
            reason: UserOfflineReason::Dropped,
        };
        let (kind, a, b) = event.to_parts();
        assert_eq!(EngineEvent::from_parts(kind, a, b), Some(event));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert_eq!(EngineEvent::from_parts(0, 1, 2), None);
        assert_eq!(EngineEvent::from_parts(99, 1, 2), None);
    }
}
