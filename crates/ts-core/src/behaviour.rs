use std::any::TypeId;
use std::fmt;

use crate::context::TickContext;
use crate::entity::{Entity, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::manager::{ManagerOf, PassControl};
use crate::property::Property;

/// Identity of one behaviour instance: its entity plus its attach position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BehaviourId {
    entity: EntityId,
    ordinal: u32,
}

impl BehaviourId {
    /// Build an identity for the `ordinal`-th behaviour of `entity`.
    pub fn new(entity: EntityId, ordinal: u32) -> Self {
        Self { entity, ordinal }
    }

    /// The owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Position of the behaviour in its entity's attach order.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

impl fmt::Display for BehaviourId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity, self.ordinal)
    }
}

/// A unit of logic attached to an entity.
///
/// Behaviours go through two phases when their entity is spawned:
///
/// 1. [`Behaviour::declare`] runs as the behaviour is attached. It creates or
///    looks up the properties the behaviour owns and checks hard dependencies
///    on behaviours attached before it.
/// 2. [`Behaviour::initialise`] runs once every behaviour of the entity has
///    declared, so sibling properties can be resolved regardless of attach
///    order.
///
/// After initialisation the behaviour is moved into its manager.
pub trait Behaviour: Sized + 'static {
    /// The per-scene manager that owns and updates behaviours of this type.
    type Manager: ManagerOf<Self>;

    /// Declare owned properties and check co-dependencies.
    fn declare(&mut self, ctx: &mut PropertyContext<'_>) -> CoreResult<()>;

    /// Resolve references to sibling properties.
    fn initialise(&mut self, _ctx: &mut PropertyContext<'_>) -> CoreResult<()> {
        Ok(())
    }
}

/// Per-tick step for behaviours driven by a plain [`crate::BehaviourManager`].
pub trait Update {
    /// Advance this behaviour by one tick.
    fn update(&mut self, ctx: &mut TickContext<'_>, control: &mut PassControl) -> CoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Declare,
    Initialise,
}

/// The view of an entity a behaviour gets while it is being set up.
pub struct PropertyContext<'a> {
    entity: &'a mut Entity,
    phase: Phase,
}

impl<'a> PropertyContext<'a> {
    pub(crate) fn declaring(entity: &'a mut Entity) -> Self {
        Self {
            entity,
            phase: Phase::Declare,
        }
    }

    pub(crate) fn initialising(entity: &'a mut Entity) -> Self {
        Self {
            entity,
            phase: Phase::Initialise,
        }
    }

    /// The entity being built.
    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }

    /// Display name of the entity being built.
    pub fn entity_name(&self) -> &str {
        self.entity.name()
    }

    /// Create a new property. Fails with `DuplicateName` if the name is
    /// taken, and with `PreconditionViolation` outside the declaration phase.
    pub fn create_property<T: 'static>(&mut self, name: &str, initial: T) -> CoreResult<Property<T>> {
        self.ensure_declaring(name)?;
        self.entity.properties.create(name, initial)
    }

    /// Look up a property, or create it with `initial` if no property of
    /// that name exists. A property of that name but another type is an error.
    pub fn declare_property<T: 'static>(&mut self, name: &str, initial: T) -> CoreResult<Property<T>> {
        if self.entity.properties.contains(name) {
            return self.entity.properties.get(name);
        }
        self.create_property(name, initial)
    }

    /// Look up an existing property by name and type.
    pub fn get_property<T: 'static>(&self, name: &str) -> CoreResult<Property<T>> {
        self.entity.properties.get(name)
    }

    /// The first behaviour of type `B` already attached to this entity.
    pub fn get_behaviour<B: Behaviour>(&self) -> CoreResult<BehaviourId> {
        self.entity.behaviour::<B>().ok_or_else(|| {
            CoreError::NotFound(format!(
                "behaviour {} on entity \"{}\"",
                std::any::type_name::<B>(),
                self.entity.name()
            ))
        })
    }

    /// Like [`PropertyContext::get_behaviour`], but a missing behaviour is a
    /// `PreconditionViolation`. Call this before creating any property.
    pub fn require_behaviour<B: Behaviour>(&self, dependent: &str) -> CoreResult<BehaviourId> {
        self.entity.behaviour::<B>().ok_or_else(|| {
            CoreError::PreconditionViolation(format!(
                "{dependent} requires {} to be attached to entity \"{}\" first",
                std::any::type_name::<B>(),
                self.entity.name()
            ))
        })
    }

    /// Whether any behaviour of type `B` is attached.
    pub fn has_behaviour<B: Behaviour>(&self) -> bool {
        self.entity
            .behaviours
            .iter()
            .any(|a| a.behaviour == TypeId::of::<B>())
    }

    fn ensure_declaring(&self, name: &str) -> CoreResult<()> {
        match self.phase {
            Phase::Declare => Ok(()),
            Phase::Initialise => Err(CoreError::PreconditionViolation(format!(
                "property \"{name}\" must be created during declaration, not initialisation"
            ))),
        }
    }
}

impl fmt::Debug for PropertyContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyContext")
            .field("entity", &self.entity.name())
            .field("phase", &self.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Attachment;
    use crate::manager::BehaviourManager;

    #[derive(Debug)]
    struct Marker;

    impl Behaviour for Marker {
        type Manager = BehaviourManager<Self>;

        fn declare(&mut self, _: &mut PropertyContext<'_>) -> CoreResult<()> {
            Ok(())
        }
    }

    impl Update for Marker {
        fn update(&mut self, _: &mut TickContext<'_>, _: &mut PassControl) -> CoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn declare_property_reuses_an_existing_slot() {
        let mut entity = Entity::new("crate".into());
        let mut ctx = PropertyContext::declaring(&mut entity);
        let first = ctx.declare_property("mass", 2.0_f32).unwrap();
        let second = ctx.declare_property("mass", 9.0_f32).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(second.get(), 2.0);

        assert!(matches!(
            ctx.declare_property("mass", 1_u8),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn declare_property_respects_the_phase() {
        let mut entity = Entity::new("crate".into());
        let mut ctx = PropertyContext::initialising(&mut entity);
        assert!(matches!(
            ctx.declare_property("mass", 1.0_f32),
            Err(CoreError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn behaviour_lookup_distinguishes_missing_from_required() {
        let mut entity = Entity::new("crate".into());
        {
            let ctx = PropertyContext::declaring(&mut entity);
            assert!(!ctx.has_behaviour::<Marker>());
            assert!(matches!(
                ctx.get_behaviour::<Marker>(),
                Err(CoreError::NotFound(_))
            ));
            assert!(matches!(
                ctx.require_behaviour::<Marker>("Test"),
                Err(CoreError::PreconditionViolation(_))
            ));
        }

        let id = BehaviourId::new(entity.id(), 0);
        entity.behaviours.push(Attachment::of::<Marker>(id));
        let ctx = PropertyContext::declaring(&mut entity);
        assert!(ctx.has_behaviour::<Marker>());
        assert_eq!(ctx.get_behaviour::<Marker>().unwrap(), id);
        assert_eq!(ctx.require_behaviour::<Marker>("Test").unwrap(), id);
    }

    #[test]
    fn behaviour_id_display_names_entity_and_ordinal() {
        let entity = EntityId::new();
        let id = BehaviourId::new(entity, 3);
        assert_eq!(id.to_string(), format!("{entity}#3"));
    }
}
