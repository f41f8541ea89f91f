// EventLoopBridge - Moves engine events from the event queue onto the Slint event loop
//
// Engine callbacks arrive on engine threads and are queued by the
// EventForwarder. The dialog controller lives on the Slint thread and is not
// Send, so a background thread drains the queue and hands every event to the
// event loop with upgrade_in_event_loop. Order is preserved end to end.

use crate::events::{EngineEvent, EventQueue};
use slint::ComponentHandle;
use std::thread::JoinHandle;

/// Drain `queue` into `sink` until the queue closes or `sink` returns false.
///
/// Blocks the calling thread; never call from async code.
///
/// # Returns
/// The number of events accepted by `sink`
pub fn pump_events<S>(queue: &mut EventQueue, mut sink: S) -> usize
where
    S: FnMut(EngineEvent) -> bool,
{
    let mut delivered = 0;
    while let Some(event) = queue.blocking_next() {
        if !sink(event) {
            break;
        }
        delivered += 1;
    }
    delivered
}

/// Delivers queued engine events to a Slint component on its event loop thread.
///
/// # Example
/// ```ignore
/// let (poster, queue) = event_channel(metrics.clone());
/// let ui = MainWindow::new()?;
/// let bridge = EventLoopBridge::new(&ui, queue, |ui, event| {
///     let (kind, a, b) = event.to_parts();
///     ui.invoke_engine_event(EngineMessage { kind, payload_a: a, payload_b: b });
/// });
/// ```
pub struct EventLoopBridge {
    /// Pump thread; exits once every poster is dropped or the event loop is gone
    pump: Option<JoinHandle<usize>>,
}

impl EventLoopBridge {
    /// Start the pump thread.
    ///
    /// # Arguments
    /// * `ui` - The component that receives the events
    /// * `queue` - Receiving end of the engine event channel
    /// * `deliver` - Runs on the Slint thread once per event, in arrival order
    pub fn new<T: ComponentHandle + 'static>(
        ui: &T,
        mut queue: EventQueue,
        deliver: fn(&T, EngineEvent),
    ) -> Self {
        let target = ui.as_weak();

        let pump = std::thread::Builder::new()
            .name("engine-event-pump".to_string())
            .spawn(move || {
                tracing::debug!("Engine event pump started");

                let delivered = pump_events(&mut queue, |event| {
                    match target.upgrade_in_event_loop(move |ui| deliver(&ui, event)) {
                        Ok(()) => true,
                        Err(e) => {
                            // The event loop has stopped, nobody is left to notify
                            tracing::warn!("Failed to queue engine event to event loop: {:?}", e);
                            false
                        }
                    }
                });

                tracing::debug!("Engine event pump stopped after {} events", delivered);
                delivered
            });

        let pump = match pump {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start engine event pump: {}", e);
                None
            }
        };

        Self { pump }
    }

    /// Whether the pump thread is still delivering.
    pub fn is_running(&self) -> bool {
        self.pump
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
