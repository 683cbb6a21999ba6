//! Entity/behaviour composition for Tessera.
//!
//! Entities are bags of named, typed [`Property`] slots plus the behaviours
//! attached to them. Every behaviour type has one [`Manager`] per scene which
//! owns all live instances and updates them as one flat pass per tick,
//! instead of each entity updating its own behaviours.
//!
//! Entities are built through [`ManagerSet::spawn`]: behaviours declare their
//! properties as they are attached, are initialised once the whole entity is
//! declared, and are then moved into their managers.

/// Behaviour lifecycle traits and the declaration context.
pub mod behaviour;
/// Entity construction.
pub mod builder;
/// Per-tick context handed to managers.
pub mod context;
/// Entities and their identifiers.
pub mod entity;
/// Error types for composition and scheduling.
pub mod error;
/// The manager traits and the generic behaviour registry.
pub mod manager;
/// The per-scene set of bound managers and their schedule.
pub mod managers;
/// Named, change-notifying values.
pub mod property;
/// How scenes advance simulated time.
pub mod timestep;

/// Re-exports of the behaviour lifecycle types.
pub use behaviour::{Behaviour, BehaviourId, PropertyContext, Update};
/// Re-export of [`builder::EntityBuilder`].
pub use builder::EntityBuilder;
/// Re-export of [`context::TickContext`].
pub use context::TickContext;
/// Re-exports of the entity types.
pub use entity::{Attachment, Entity, EntityId};
/// Re-exports of [`error::CoreError`] and [`error::CoreResult`].
pub use error::{CoreError, CoreResult};
/// Re-exports of the manager types.
pub use manager::{BehaviourManager, Manager, ManagerOf, PassControl, UPDATE_PASS};
/// Re-export of [`managers::ManagerSet`].
pub use managers::ManagerSet;
/// Re-exports of the property types.
pub use property::{Property, PropertyTable, SubscriptionId};
/// Re-export of [`timestep::Timestep`].
pub use timestep::Timestep;
