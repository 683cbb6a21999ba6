use std::fmt;
use std::sync::Arc;

use crate::error::{EventError, EventResult};
use crate::pool::{Invocation, InvocationPool};
use crate::queue::{Pending, PendingList};
use crate::service::EventTable;

/// Invocations waiting for the next flip, shared by every channel of a service.
pub(crate) type WaitingQueue = spin::Mutex<PendingList>;

impl<D: Send + 'static> Pending for Invocation<D> {
    fn link(&mut self) -> &mut Option<Box<dyn Pending>> {
        &mut self.link
    }

    fn deliver(self: Box<Self>, table: &mut EventTable) -> EventResult<()> {
        match table.get_mut::<D>() {
            Some(event) => event.deliver(self),
            // Channels are only reachable through their event, so the event
            // exists for as long as anything can enqueue on it.
            None => Ok(()),
        }
    }
}

/// The thread-safe half of an event: its pool and the service's waiting queue.
struct Channel<D> {
    pool: InvocationPool<D>,
    waiting: Arc<WaitingQueue>,
}

impl<D: Send + 'static> Channel<D> {
    fn enqueue(&self, data: D) {
        let invocation = self.pool.get(data);
        self.waiting.lock().push_front(invocation);
    }
}

/// Identifies a listener on one [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<D> = Box<dyn FnMut(&D) -> Result<(), String>>;

struct Listener<D> {
    id: ListenerId,
    callback: Callback<D>,
}

/// The channel for one payload type within an [`crate::EventService`].
///
/// Listener management happens on the simulation thread. Use
/// [`Event::sender`] to produce payloads from other threads.
pub struct Event<D> {
    listeners: Vec<Listener<D>>,
    next_listener: u64,
    channel: Arc<Channel<D>>,
}

impl<D: Send + 'static> Event<D> {
    pub(crate) fn new(waiting: Arc<WaitingQueue>) -> Self {
        Self {
            listeners: Vec::new(),
            next_listener: 0,
            channel: Arc::new(Channel {
                pool: InvocationPool::new(),
                waiting,
            }),
        }
    }

    /// Register a listener. Listeners run in the order they were added.
    pub fn add_listener<F>(&mut self, mut listener: F) -> ListenerId
    where
        F: FnMut(&D) + 'static,
    {
        self.push_listener(Box::new(move |data| {
            listener(data);
            Ok(())
        }))
    }

    /// Register a listener that may fail. A failure aborts the drain that
    /// delivered the payload and surfaces as [`EventError::ListenerFailed`].
    pub fn add_fallible_listener<F, E>(&mut self, mut listener: F) -> ListenerId
    where
        F: FnMut(&D) -> Result<(), E> + 'static,
        E: fmt::Display,
    {
        self.push_listener(Box::new(move |data| {
            listener(data).map_err(|err| err.to_string())
        }))
    }

    fn push_listener(&mut self, callback: Callback<D>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener { id, callback });
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue `data` for delivery on the next drain.
    pub fn send(&self, data: D) {
        self.channel.enqueue(data);
    }

    /// A cloneable handle that can send on this event from any thread.
    pub fn sender(&self) -> EventSender<D> {
        EventSender {
            channel: Arc::clone(&self.channel),
        }
    }

    /// Invocation records this event has ever allocated.
    pub fn allocated(&self) -> usize {
        self.channel.pool.allocated()
    }

    /// Invocation records currently idle in this event's pool.
    pub fn pooled(&self) -> usize {
        self.channel.pool.pooled()
    }

    fn deliver(&mut self, mut invocation: Box<Invocation<D>>) -> EventResult<()> {
        let result = match invocation.payload.take() {
            Some(data) => self.notify(&data),
            None => Ok(()),
        };
        self.channel.pool.recycle(invocation);
        result
    }

    fn notify(&mut self, data: &D) -> EventResult<()> {
        for listener in &mut self.listeners {
            (listener.callback)(data).map_err(|reason| EventError::ListenerFailed {
                event: std::any::type_name::<D>(),
                reason,
            })?;
        }
        Ok(())
    }
}

impl<D> fmt::Debug for Event<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("payload", &std::any::type_name::<D>())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Sends payloads of type `D` from any thread.
pub struct EventSender<D> {
    channel: Arc<Channel<D>>,
}

impl<D: Send + 'static> EventSender<D> {
    /// Queue `data` for delivery on the next drain. Never blocks on I/O and
    /// never fails.
    pub fn send(&self, data: D) {
        self.channel.enqueue(data);
    }
}

impl<D> Clone for EventSender<D> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<D> fmt::Debug for EventSender<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("payload", &std::any::type_name::<D>())
            .finish()
    }
}
