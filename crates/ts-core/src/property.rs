use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{CoreError, CoreResult};

/// Identifies a change subscription on one [`Property`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    name: String,
    value: RefCell<T>,
    subscribers: RefCell<Vec<(SubscriptionId, Subscriber<T>)>>,
    next_subscription: Cell<u64>,
}

/// A named, typed value owned by an entity.
///
/// Handles are cheap to clone and all clones observe the same slot. Every
/// write notifies every subscriber, in subscription order, even if the value
/// did not change. Subscribers must not write the property they observe.
pub struct Property<T> {
    slot: Rc<Slot<T>>,
}

impl<T: 'static> Property<T> {
    pub(crate) fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            slot: Rc::new(Slot {
                name: name.into(),
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
            }),
        }
    }

    /// The property's name within its entity.
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// A copy of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.slot.value.borrow().clone()
    }

    /// Borrow the current value.
    pub fn read(&self) -> Ref<'_, T> {
        self.slot.value.borrow()
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.slot.value.borrow_mut() = value;
        self.notify();
    }

    /// Edit the value in place and notify subscribers once.
    pub fn update(&self, edit: impl FnOnce(&mut T)) {
        edit(&mut self.slot.value.borrow_mut());
        self.notify();
    }

    /// Call `callback` after every write.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.slot.next_subscription.get());
        self.slot.next_subscription.set(id.0 + 1);
        self.slot
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));
        id
    }

    /// Drop a subscription. Returns `false` if it was not active.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.slot.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.slot.subscribers.borrow().len()
    }

    /// Whether two handles point at the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    fn notify(&self) {
        // Snapshot so a subscriber may (un)subscribe while being notified.
        let subscribers: Vec<Subscriber<T>> = self
            .slot
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        if subscribers.is_empty() {
            return;
        }
        let value = self.slot.value.borrow();
        for callback in subscribers {
            callback(&value);
        }
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.slot.name)
            .field("value", &self.slot.value)
            .finish()
    }
}

struct TableEntry {
    type_name: &'static str,
    handle: Box<dyn Any>,
}

/// The properties of one entity, keyed by name.
#[derive(Default)]
pub struct PropertyTable {
    entries: HashMap<String, TableEntry>,
    order: Vec<String>,
}

impl PropertyTable {
    /// Create a property. Fails if the name is empty or already taken.
    pub fn create<T: 'static>(&mut self, name: &str, initial: T) -> CoreResult<Property<T>> {
        if name.is_empty() {
            return Err(CoreError::InvalidArgument("property name is empty".into()));
        }
        if self.entries.contains_key(name) {
            return Err(CoreError::DuplicateName(format!("property \"{name}\"")));
        }
        let property = Property::new(name, initial);
        self.entries.insert(
            name.to_string(),
            TableEntry {
                type_name: std::any::type_name::<T>(),
                handle: Box::new(property.clone()),
            },
        );
        self.order.push(name.to_string());
        Ok(property)
    }

    /// Look up a property by name and type.
    pub fn get<T: 'static>(&self, name: &str) -> CoreResult<Property<T>> {
        if name.is_empty() {
            return Err(CoreError::InvalidArgument("property name is empty".into()));
        }
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CoreError::NotFound(format!("property \"{name}\"")))?;
        entry
            .handle
            .downcast_ref::<Property<T>>()
            .cloned()
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "property \"{name}\" of type {} (it holds {})",
                    std::any::type_name::<T>(),
                    entry.type_name
                ))
            })
    }

    /// Whether a property with this name exists, whatever its type.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Property names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PropertyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.order
                    .iter()
                    .filter_map(|name| self.entries.get(name).map(|e| (name, e.type_name))),
            )
            .finish()
    }
}
