use std::any::TypeId;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::behaviour::{Behaviour, BehaviourId};
use crate::error::CoreResult;
use crate::property::{Property, PropertyTable};

/// Unique identifier for every entity in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Record of one behaviour attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// Identity of the behaviour inside its manager.
    pub id: BehaviourId,
    /// Concrete behaviour type.
    pub behaviour: TypeId,
    /// Type name of the behaviour, for diagnostics.
    pub behaviour_name: &'static str,
    /// Type of the manager the behaviour is registered with.
    pub manager: TypeId,
}

impl Attachment {
    pub(crate) fn of<B: Behaviour>(id: BehaviourId) -> Self {
        Self {
            id,
            behaviour: TypeId::of::<B>(),
            behaviour_name: std::any::type_name::<B>(),
            manager: TypeId::of::<B::Manager>(),
        }
    }
}

/// A bag of named properties plus the behaviours that operate on them.
///
/// Entities are produced by [`crate::ManagerSet::spawn`]; their behaviour
/// list is fixed once spawned.
pub struct Entity {
    id: EntityId,
    name: String,
    pub(crate) properties: PropertyTable,
    pub(crate) behaviours: Vec<Attachment>,
}

impl Entity {
    pub(crate) fn new(name: String) -> Self {
        Self {
            id: EntityId::new(),
            name,
            properties: PropertyTable::default(),
            behaviours: Vec::new(),
        }
    }

    /// The entity's identifier.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a property by name and type.
    pub fn property<T: 'static>(&self, name: &str) -> CoreResult<Property<T>> {
        self.properties.get(name)
    }

    /// All properties of the entity.
    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    /// Attached behaviours in attach order.
    pub fn behaviours(&self) -> &[Attachment] {
        &self.behaviours
    }

    /// The first attached behaviour of type `B`, if any.
    pub fn behaviour<B: Behaviour>(&self) -> Option<BehaviourId> {
        self.behaviours
            .iter()
            .find(|a| a.behaviour == TypeId::of::<B>())
            .map(|a| a.id)
    }

    /// Whether a behaviour of type `B` is attached.
    pub fn has_behaviour<B: Behaviour>(&self) -> bool {
        self.behaviour::<B>().is_some()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field(
                "behaviours",
                &self
                    .behaviours
                    .iter()
                    .map(|a| a.behaviour_name)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_display_shows_short_form() {
        let id = EntityId(Uuid::parse_str("a3f2b1c8-1234-5678-9abc-def012345678").unwrap());
        assert_eq!(id.to_string(), "a3f2b1c8");
    }

    #[test]
    fn new_entities_get_distinct_ids() {
        let a = Entity::new("a".into());
        let b = Entity::new("b".into());
        assert_ne!(a.id(), b.id());
        assert!(a.properties().is_empty());
        assert!(a.behaviours().is_empty());
    }

    #[test]
    fn property_lookup_goes_through_table() {
        let mut entity = Entity::new("crate".into());
        entity.properties.create("mass", 3.0_f32).unwrap();
        assert_eq!(entity.property::<f32>("mass").unwrap().get(), 3.0);
        assert!(entity.property::<f32>("volume").is_err());
    }
}
