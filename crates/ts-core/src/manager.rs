use std::any::Any;
use std::fmt;

use tracing::debug;

use crate::behaviour::{Behaviour, BehaviourId, Update};
use crate::context::TickContext;
use crate::error::{CoreError, CoreResult};
use crate::timestep::Timestep;

/// Name of the single pass exposed by managers that do not split their work.
pub const UPDATE_PASS: &str = "update";

/// A per-scene singleton that owns every live behaviour of one type and
/// updates them in batches.
///
/// A manager exposes one or more ordered passes. The scene schedule decides
/// when each pass runs, so other managers can be interleaved between the
/// passes of a multi-pass manager.
pub trait Manager: fmt::Debug + Any {
    /// Human-readable name for logs and diagnostics.
    fn name(&self) -> &str;

    /// The passes this manager exposes, in the order they are meant to run.
    fn passes(&self) -> &'static [&'static str] {
        &[UPDATE_PASS]
    }

    /// Check that this manager can run in a scene advancing by `timestep`.
    /// Called before the manager is bound.
    fn check_timestep(&self, _timestep: &Timestep) -> CoreResult<()> {
        Ok(())
    }

    /// Run the pass at `pass` (an index into [`Manager::passes`]).
    fn run_pass(&mut self, pass: usize, ctx: &mut TickContext<'_>) -> CoreResult<()>;

    /// Remove a behaviour by identity. Returns `false` if it was not registered.
    fn deregister(&mut self, id: BehaviourId) -> bool;

    /// Number of registered behaviours.
    fn behaviour_count(&self) -> usize;

    /// Support downcasting to the concrete manager type.
    fn as_any(&self) -> &dyn Any;

    /// Support downcasting to the concrete manager type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A manager that accepts behaviours of type `B`.
pub trait ManagerOf<B>: Manager {
    /// Append a behaviour. Registering the same identity twice is an error.
    fn register(&mut self, id: BehaviourId, behaviour: B) -> CoreResult<()>;
}

/// Build the error for a pass index a manager does not have.
pub fn unknown_pass(manager: &str, pass: usize) -> CoreError {
    CoreError::NotFound(format!("pass {pass} of manager {manager}"))
}

/// Handed to each step of a pass so it can retire behaviours.
///
/// Retirement is deferred: a retired behaviour is skipped for the rest of the
/// pass and removed from the manager once the pass ends.
#[derive(Debug, Default)]
pub struct PassControl {
    current: Option<BehaviourId>,
    retired: Vec<BehaviourId>,
}

impl PassControl {
    /// The behaviour currently being stepped.
    pub fn current(&self) -> Option<BehaviourId> {
        self.current
    }

    /// Retire the behaviour currently being stepped.
    pub fn retire_current(&mut self) {
        if let Some(id) = self.current {
            self.retire(id);
        }
    }

    /// Retire any behaviour of this manager.
    pub fn retire(&mut self, id: BehaviourId) {
        if !self.retired.contains(&id) {
            self.retired.push(id);
        }
    }

    /// Whether `id` has been retired during this pass.
    pub fn is_retired(&self, id: BehaviourId) -> bool {
        self.retired.contains(&id)
    }
}

struct Entry<B> {
    id: BehaviourId,
    behaviour: B,
}

/// Ordered registry of every live behaviour of type `B` in a scene.
///
/// Iteration follows registration order. Removal keeps the order of the
/// remaining behaviours.
pub struct BehaviourManager<B> {
    entries: Vec<Entry<B>>,
}

impl<B> Default for BehaviourManager<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> BehaviourManager<B> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a behaviour to the end of the update order.
    pub fn add(&mut self, id: BehaviourId, behaviour: B) -> CoreResult<()> {
        if self.contains(id) {
            return Err(CoreError::DuplicateName(format!(
                "behaviour {id} is already registered with {}",
                std::any::type_name::<Self>()
            )));
        }
        self.entries.push(Entry { id, behaviour });
        Ok(())
    }

    /// Remove a behaviour by identity, returning it.
    pub fn remove(&mut self, id: BehaviourId) -> Option<B> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index).behaviour)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: BehaviourId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Borrow a behaviour by identity.
    pub fn get(&self, id: BehaviourId) -> Option<&B> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.behaviour)
    }

    /// Mutably borrow a behaviour by identity.
    pub fn get_mut(&mut self, id: BehaviourId) -> Option<&mut B> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.behaviour)
    }

    /// Registered identities in update order.
    pub fn ids(&self) -> impl Iterator<Item = BehaviourId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Registered behaviours in update order.
    pub fn iter(&self) -> impl Iterator<Item = (BehaviourId, &B)> {
        self.entries.iter().map(|e| (e.id, &e.behaviour))
    }

    /// Number of registered behaviours.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no behaviours are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `step` over every behaviour in registration order.
    ///
    /// Behaviours retired through the [`PassControl`] are skipped for the
    /// rest of the pass and removed after it, even when a step fails.
    pub fn for_each<F>(&mut self, mut step: F) -> CoreResult<()>
    where
        F: FnMut(BehaviourId, &mut B, &mut PassControl) -> CoreResult<()>,
    {
        let mut control = PassControl::default();
        let mut result = Ok(());
        for entry in &mut self.entries {
            if control.is_retired(entry.id) {
                continue;
            }
            control.current = Some(entry.id);
            if let Err(err) = step(entry.id, &mut entry.behaviour, &mut control) {
                result = Err(err);
                break;
            }
        }

        if !control.retired.is_empty() {
            let before = self.entries.len();
            self.entries.retain(|e| !control.retired.contains(&e.id));
            debug!(
                manager = std::any::type_name::<Self>(),
                retired = before - self.entries.len(),
                "behaviours retired"
            );
        }
        result
    }
}

impl<B> fmt::Debug for BehaviourManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviourManager")
            .field("behaviour", &std::any::type_name::<B>())
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<B: Behaviour + Update> Manager for BehaviourManager<B> {
    fn name(&self) -> &str {
        std::any::type_name::<B>()
    }

    fn run_pass(&mut self, pass: usize, ctx: &mut TickContext<'_>) -> CoreResult<()> {
        if pass != 0 {
            return Err(unknown_pass(self.name(), pass));
        }
        self.for_each(|_, behaviour, control| behaviour.update(ctx, control))
    }

    fn deregister(&mut self, id: BehaviourId) -> bool {
        self.remove(id).is_some()
    }

    fn behaviour_count(&self) -> usize {
        self.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<B: Behaviour + Update> ManagerOf<B> for BehaviourManager<B> {
    fn register(&mut self, id: BehaviourId, behaviour: B) -> CoreResult<()> {
        self.add(id, behaviour)
    }
}
