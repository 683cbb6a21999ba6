//! Typed publish/subscribe for Tessera scenes.
//!
//! Producers call [`Event::send`] (or [`EventSender::send`] from another
//! thread); the payload is parked in a pooled invocation on the service's
//! waiting queue. Once per tick the owning scene calls
//! [`EventService::update`], which flips the waiting and executing buffers and
//! delivers every queued payload to the event's listeners in registration
//! order.

/// Error types for the event pipeline.
pub mod error;
/// Per-payload-type channels, listeners and cross-thread senders.
pub mod event;
/// Pooled invocation records.
mod pool;
/// Intrusive queue of type-erased invocations.
mod queue;
/// The per-scene dispatcher that owns the event table and the queues.
pub mod service;

/// Re-exports of [`error::EventError`] and [`error::EventResult`].
pub use error::{EventError, EventResult};
/// Re-exports of [`event::Event`], [`event::EventSender`] and [`event::ListenerId`].
pub use event::{Event, EventSender, ListenerId};
/// Re-exports of the service types.
pub use service::{DrainReport, EventService, EventServiceConfig};
