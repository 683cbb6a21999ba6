use tracing::{debug, warn};

use crate::behaviour::{Behaviour, BehaviourId, PropertyContext};
use crate::entity::{Attachment, Entity, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::manager::ManagerOf;
use crate::managers::ManagerSet;
use crate::property::{Property, PropertyTable};

/// A behaviour that has declared its properties and waits for the rest of
/// its entity before being initialised and handed to its manager.
trait Staged {
    fn initialise(&mut self, entity: &mut Entity) -> CoreResult<()>;
    fn register(self: Box<Self>, managers: &mut ManagerSet) -> CoreResult<()>;
}

struct StagedBehaviour<B> {
    id: BehaviourId,
    behaviour: B,
}

impl<B: Behaviour> Staged for StagedBehaviour<B> {
    fn initialise(&mut self, entity: &mut Entity) -> CoreResult<()> {
        let mut ctx = PropertyContext::initialising(entity);
        self.behaviour.initialise(&mut ctx)
    }

    fn register(self: Box<Self>, managers: &mut ManagerSet) -> CoreResult<()> {
        let manager = managers.get_mut::<B::Manager>().ok_or_else(|| {
            CoreError::NotFound(format!(
                "manager {} for {}",
                std::any::type_name::<B::Manager>(),
                std::any::type_name::<B>()
            ))
        })?;
        manager.register(self.id, self.behaviour)
    }
}

/// Assembles one entity: template properties first, then behaviours in
/// attach order.
pub struct EntityBuilder<'a> {
    entity: Entity,
    managers: &'a ManagerSet,
    staged: Vec<Box<dyn Staged>>,
}

impl<'a> EntityBuilder<'a> {
    fn new(name: String, managers: &'a ManagerSet) -> CoreResult<Self> {
        if name.is_empty() {
            return Err(CoreError::InvalidArgument("entity name is empty".into()));
        }
        Ok(Self {
            entity: Entity::new(name),
            managers,
            staged: Vec::new(),
        })
    }

    /// The identifier the entity will have once spawned.
    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }

    /// Properties declared so far.
    pub fn properties(&self) -> &PropertyTable {
        &self.entity.properties
    }

    /// Add a template property. Behaviours that declare a property of the
    /// same name and type pick this one up instead of creating their own.
    pub fn property<T: 'static>(&mut self, name: &str, value: T) -> CoreResult<Property<T>> {
        self.entity.properties.create(name, value)
    }

    /// Attach a behaviour and run its declaration phase.
    ///
    /// Fails with `PreconditionViolation` if no manager for the behaviour is
    /// bound, or if the behaviour's own dependency checks fail.
    pub fn attach<B: Behaviour>(&mut self, mut behaviour: B) -> CoreResult<BehaviourId> {
        if !self.managers.is_bound::<B::Manager>() {
            return Err(CoreError::PreconditionViolation(format!(
                "no {} is bound, so {} cannot be attached",
                std::any::type_name::<B::Manager>(),
                std::any::type_name::<B>()
            )));
        }

        let id = BehaviourId::new(self.entity.id(), self.entity.behaviours.len() as u32);
        behaviour.declare(&mut PropertyContext::declaring(&mut self.entity))?;
        self.entity.behaviours.push(Attachment::of::<B>(id));
        self.staged.push(Box::new(StagedBehaviour { id, behaviour }));
        Ok(id)
    }
}

impl std::fmt::Debug for EntityBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBuilder")
            .field("entity", &self.entity)
            .field("staged", &self.staged.len())
            .finish()
    }
}

impl ManagerSet {
    /// Build an entity.
    ///
    /// `configure` adds template properties and attaches behaviours; each
    /// behaviour declares as it is attached. Once `configure` returns, every
    /// behaviour is initialised in attach order and then registered with its
    /// manager. Nothing is registered if any step fails.
    ///
    /// The returned entity does not own its registrations: dropping it leaves
    /// its behaviours running. Pass it to [`ManagerSet::despawn`] to remove
    /// them.
    pub fn spawn<F>(&mut self, name: impl Into<String>, configure: F) -> CoreResult<Entity>
    where
        F: FnOnce(&mut EntityBuilder<'_>) -> CoreResult<()>,
    {
        let mut builder = EntityBuilder::new(name.into(), self)?;
        configure(&mut builder)?;
        let EntityBuilder {
            mut entity,
            mut staged,
            ..
        } = builder;

        for behaviour in &mut staged {
            behaviour.initialise(&mut entity)?;
        }

        let mut registered = 0;
        for behaviour in staged {
            if let Err(err) = behaviour.register(self) {
                for attachment in &entity.behaviours[..registered] {
                    self.deregister(attachment);
                }
                return Err(err);
            }
            registered += 1;
        }

        debug!(
            entity = %entity.id(),
            name = entity.name(),
            behaviours = entity.behaviours.len(),
            properties = entity.properties.len(),
            "entity spawned"
        );
        Ok(entity)
    }

    /// Deregister every behaviour of `entity` from its manager. Returns the
    /// number of behaviours that were still registered.
    pub fn despawn(&mut self, entity: &Entity) -> usize {
        let mut removed = 0;
        for attachment in entity.behaviours() {
            if self.deregister(attachment) {
                removed += 1;
            } else {
                warn!(
                    entity = %entity.id(),
                    behaviour = attachment.behaviour_name,
                    "behaviour was not registered with its manager"
                );
            }
        }
        removed
    }
}
