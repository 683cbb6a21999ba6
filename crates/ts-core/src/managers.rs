use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use crate::context::TickContext;
use crate::entity::Attachment;
use crate::error::{CoreError, CoreResult};
use crate::manager::Manager;

/// One scheduled step: a pass of a bound manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    manager: usize,
    pass: usize,
}

/// The managers bound to one scene and the order their passes run in.
///
/// Each manager type can be bound once. Binding does not schedule anything;
/// [`ManagerSet::schedule`] appends passes to the tick order explicitly, and
/// [`ManagerSet::schedule_all`] appends every pass of one manager in its
/// declared order.
#[derive(Debug, Default)]
pub struct ManagerSet {
    managers: Vec<Box<dyn Manager>>,
    by_type: HashMap<TypeId, usize>,
    schedule: Vec<Step>,
}

impl ManagerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the scene's singleton manager of type `M`.
    pub fn bind<M: Manager>(&mut self, manager: M) -> CoreResult<()> {
        let key = TypeId::of::<M>();
        if self.by_type.contains_key(&key) {
            return Err(CoreError::DuplicateName(format!(
                "manager {} is already bound",
                manager.name()
            )));
        }
        debug!(manager = manager.name(), passes = ?manager.passes(), "manager bound");
        self.by_type.insert(key, self.managers.len());
        self.managers.push(Box::new(manager));
        Ok(())
    }

    /// Append one named pass of manager `M` to the tick order.
    pub fn schedule<M: Manager>(&mut self, pass: &str) -> CoreResult<()> {
        let index = self.index_of::<M>()?;
        let manager = &self.managers[index];
        let pass_index = manager
            .passes()
            .iter()
            .position(|p| *p == pass)
            .ok_or_else(|| {
                CoreError::NotFound(format!("pass \"{pass}\" of manager {}", manager.name()))
            })?;
        self.schedule.push(Step {
            manager: index,
            pass: pass_index,
        });
        Ok(())
    }

    /// Append every pass of manager `M`, in its declared order.
    pub fn schedule_all<M: Manager>(&mut self) -> CoreResult<()> {
        let index = self.index_of::<M>()?;
        let passes = self.managers[index].passes().len();
        self.schedule
            .extend((0..passes).map(|pass| Step { manager: index, pass }));
        Ok(())
    }

    /// Whether a manager of type `M` is bound.
    pub fn is_bound<M: Manager>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<M>())
    }

    /// Borrow the bound manager of type `M`.
    pub fn get<M: Manager>(&self) -> Option<&M> {
        let index = *self.by_type.get(&TypeId::of::<M>())?;
        self.managers[index].as_any().downcast_ref()
    }

    /// Mutably borrow the bound manager of type `M`.
    pub fn get_mut<M: Manager>(&mut self) -> Option<&mut M> {
        let index = *self.by_type.get(&TypeId::of::<M>())?;
        self.managers[index].as_any_mut().downcast_mut()
    }

    /// Run every scheduled pass in order. Stops at the first failure.
    pub fn run_schedule(&mut self, ctx: &mut TickContext<'_>) -> CoreResult<()> {
        for step in &self.schedule {
            self.managers[step.manager].run_pass(step.pass, ctx)?;
        }
        Ok(())
    }

    /// The tick order as `(manager, pass)` names.
    pub fn schedule_names(&self) -> Vec<(&str, &'static str)> {
        self.schedule
            .iter()
            .map(|step| {
                let manager = &self.managers[step.manager];
                (manager.name(), manager.passes()[step.pass])
            })
            .collect()
    }

    /// Remove an attached behaviour from the manager it was registered with.
    pub fn deregister(&mut self, attachment: &Attachment) -> bool {
        match self.by_type.get(&attachment.manager) {
            Some(&index) => self.managers[index].deregister(attachment.id),
            None => false,
        }
    }

    /// Total behaviours registered across every manager.
    pub fn behaviour_count(&self) -> usize {
        self.managers.iter().map(|m| m.behaviour_count()).sum()
    }

    /// Number of bound managers.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether no managers are bound.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    fn index_of<M: Manager>(&self) -> CoreResult<usize> {
        self.by_type
            .get(&TypeId::of::<M>())
            .copied()
            .ok_or_else(|| {
                CoreError::NotFound(format!("manager {}", std::any::type_name::<M>()))
            })
    }
}
