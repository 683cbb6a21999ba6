use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{EventError, EventResult};
use crate::event::{Event, EventSender, WaitingQueue};
use crate::queue::PendingList;

/// Type-keyed map of the events a service has handed out.
#[derive(Default)]
pub(crate) struct EventTable {
    events: HashMap<TypeId, Box<dyn Any>>,
}

impl EventTable {
    pub(crate) fn get_mut<D: 'static>(&mut self) -> Option<&mut Event<D>> {
        self.events
            .get_mut(&TypeId::of::<D>())
            .and_then(|event| event.downcast_mut())
    }
}

/// Tuning for [`EventService::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventServiceConfig {
    /// Maximum number of buffer flips per drain. `None` drains until the
    /// waiting queue is empty, however long that takes.
    #[serde(default)]
    pub max_flips: Option<usize>,
}

impl EventServiceConfig {
    /// Cap the number of flips per drain.
    pub fn with_max_flips(mut self, max: usize) -> Self {
        self.max_flips = Some(max);
        self
    }
}

/// What a successful drain did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Number of waiting/executing buffer swaps.
    pub flips: usize,
    /// Number of invocations delivered.
    pub delivered: usize,
}

/// Per-scene event dispatcher.
///
/// Owns one [`Event`] per payload type plus the double-buffered queue. The
/// waiting buffer is shared with every sender behind a spin lock and the
/// executing buffer is touched only by [`EventService::update`]. Both are
/// linked through the invocation records, so sending and flipping are
/// pointer swaps.
pub struct EventService {
    events: EventTable,
    waiting: Arc<WaitingQueue>,
    executing: PendingList,
    config: EventServiceConfig,
}

impl Default for EventService {
    fn default() -> Self {
        Self::new(EventServiceConfig::default())
    }
}

impl std::fmt::Debug for EventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventService")
            .field("events", &self.events.events.len())
            .field("pending", &self.pending())
            .field("config", &self.config)
            .finish()
    }
}

impl EventService {
    /// Create an empty service.
    pub fn new(config: EventServiceConfig) -> Self {
        Self {
            events: EventTable::default(),
            waiting: Arc::new(spin::Mutex::new(PendingList::default())),
            executing: PendingList::default(),
            config,
        }
    }

    /// The event for payload type `D`, created on first request.
    pub fn get_event<D: Send + 'static>(&mut self) -> &mut Event<D> {
        let waiting = &self.waiting;
        let slot = self
            .events
            .events
            .entry(TypeId::of::<D>())
            .or_insert_with(|| {
                debug!(payload = std::any::type_name::<D>(), "event created");
                Box::new(Event::<D>::new(Arc::clone(waiting)))
            });
        match slot.downcast_mut::<Event<D>>() {
            Some(event) => event,
            None => unreachable!("event table is keyed by payload type"),
        }
    }

    /// Queue `data` on the event for `D`.
    pub fn send<D: Send + 'static>(&mut self, data: D) {
        self.get_event::<D>().send(data);
    }

    /// A thread-safe sender for payload type `D`.
    pub fn sender<D: Send + 'static>(&mut self) -> EventSender<D> {
        self.get_event::<D>().sender()
    }

    /// Number of distinct payload types with an event.
    pub fn event_count(&self) -> usize {
        self.events.events.len()
    }

    /// Invocations not yet delivered, across both buffers.
    pub fn pending(&self) -> usize {
        self.waiting.lock().len() + self.executing.len()
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &EventServiceConfig {
        &self.config
    }

    /// Deliver everything queued, including anything sent while delivering.
    ///
    /// Each round swaps the waiting and executing buffers under the lock and
    /// then delivers the executing buffer without it. Rounds repeat until the
    /// waiting buffer is empty, or until `max_flips` rounds have run, in which
    /// case the remainder stays queued and [`EventError::DrainOverflow`] is
    /// returned. A failing listener stops the drain immediately; whatever was
    /// not yet delivered is delivered first on the next call.
    pub fn update(&mut self) -> EventResult<DrainReport> {
        let mut report = DrainReport::default();
        self.deliver_executing(&mut report)?;

        loop {
            let mut batch = {
                let mut waiting = self.waiting.lock();
                if waiting.is_empty() {
                    break;
                }
                if self.config.max_flips.is_some_and(|max| report.flips >= max) {
                    let pending = waiting.len();
                    drop(waiting);
                    warn!(flips = report.flips, pending, "event drain hit flip cap");
                    return Err(EventError::DrainOverflow {
                        flips: report.flips,
                        pending,
                    });
                }
                waiting.take()
            };
            // Senders push at the head; restore send order outside the lock.
            batch.reverse();
            self.executing = batch;
            report.flips += 1;
            trace!(
                flip = report.flips,
                batch = self.executing.len(),
                "event buffers flipped"
            );
            self.deliver_executing(&mut report)?;
        }

        Ok(report)
    }

    fn deliver_executing(&mut self, report: &mut DrainReport) -> EventResult<()> {
        while let Some(invocation) = self.executing.pop_front() {
            if let Err(err) = invocation.deliver(&mut self.events) {
                warn!(error = %err, requeued = self.executing.len(), "event drain aborted");
                return Err(err);
            }
            report.delivered += 1;
        }
        Ok(())
    }
}
