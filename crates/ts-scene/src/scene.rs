use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace, warn};
use ts_core::{
    CoreError, CoreResult, Entity, EntityBuilder, EntityId, Manager, ManagerSet, TickContext,
    Timestep,
};
use ts_events::{DrainReport, EventSender, EventService};

use crate::clock::SceneClock;
use crate::config::SceneConfig;
use crate::error::{SceneError, SceneResult};

/// Owns everything one simulation needs: entities, the managers that update
/// their behaviours, the event service, the clock and a seeded RNG.
///
/// A tick runs every scheduled manager pass in order, then drains the event
/// service. Dropping the scene drops its entities, managers and events.
pub struct Scene {
    config: SceneConfig,
    entities: HashMap<EntityId, Entity>,
    managers: ManagerSet,
    events: EventService,
    clock: SceneClock,
    rng: StdRng,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("tick", &self.clock.tick())
            .field("entities", &self.entities.len())
            .field("managers", &self.managers.len())
            .field("pending_events", &self.events.pending())
            .finish()
    }
}

impl Scene {
    /// Create an empty scene. Fails if the configuration is invalid.
    pub fn new(config: SceneConfig) -> SceneResult<Self> {
        config.validate()?;
        let events = EventService::new(config.event_service());
        let rng = StdRng::seed_from_u64(config.seed);
        debug!(seed = config.seed, timestep = ?config.timestep, "scene created");
        Ok(Self {
            config,
            entities: HashMap::new(),
            managers: ManagerSet::new(),
            events,
            clock: SceneClock::new(),
            rng,
        })
    }

    /// Bind a manager without scheduling any of its passes. Fails with
    /// `PreconditionViolation` if the manager cannot run at this scene's
    /// timestep.
    pub fn bind_manager<M: Manager>(&mut self, manager: M) -> SceneResult<()> {
        manager.check_timestep(&self.config.timestep)?;
        self.managers.bind(manager)?;
        Ok(())
    }

    /// Bind a manager and append all of its passes to the tick order.
    pub fn add_manager<M: Manager>(&mut self, manager: M) -> SceneResult<()> {
        self.bind_manager(manager)?;
        self.managers.schedule_all::<M>()?;
        Ok(())
    }

    /// Append one pass of a bound manager to the tick order.
    pub fn schedule<M: Manager>(&mut self, pass: &str) -> SceneResult<()> {
        self.managers.schedule::<M>(pass)?;
        Ok(())
    }

    /// Build an entity and register its behaviours with their managers.
    pub fn spawn<F>(&mut self, name: impl Into<String>, configure: F) -> SceneResult<EntityId>
    where
        F: FnOnce(&mut EntityBuilder<'_>) -> CoreResult<()>,
    {
        let entity = self.managers.spawn(name, configure)?;
        let id = entity.id();
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Remove an entity and deregister all of its behaviours.
    pub fn despawn(&mut self, id: EntityId) -> SceneResult<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(SceneError::EntityNotFound(id))?;
        let removed = self.managers.despawn(&entity);
        debug!(entity = %id, name = entity.name(), removed, "entity despawned");
        Ok(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// All entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Access a manager by its concrete type.
    pub fn manager<M: Manager>(&self) -> Option<&M> {
        self.managers.get::<M>()
    }

    /// Access a manager mutably by its concrete type.
    pub fn manager_mut<M: Manager>(&mut self) -> Option<&mut M> {
        self.managers.get_mut::<M>()
    }

    pub fn managers(&self) -> &ManagerSet {
        &self.managers
    }

    pub fn events(&self) -> &EventService {
        &self.events
    }

    /// The event service, for registering listeners and sending from the
    /// simulation thread.
    pub fn events_mut(&mut self) -> &mut EventService {
        &mut self.events
    }

    /// A handle other threads can send events of type `D` through.
    pub fn event_sender<D: Send + 'static>(&mut self) -> EventSender<D> {
        self.events.sender::<D>()
    }

    pub fn clock(&self) -> &SceneClock {
        &self.clock
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Run one tick. Fixed scenes step by `dt`, variable ones by `max_dt`.
    pub fn tick(&mut self) -> SceneResult<DrainReport> {
        self.step(self.config.timestep.limit())
    }

    /// Run `n` ticks.
    pub fn run(&mut self, n: u64) -> SceneResult<()> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Feed `elapsed` wall seconds into the scene. Returns the number of
    /// ticks run.
    ///
    /// On a fixed timestep this runs as many whole steps as the accumulator
    /// holds, up to `max_catch_up_ticks`, and drops the backlog past that.
    /// On a variable timestep it runs one tick of `min(elapsed, max_dt)`, or
    /// none if no time passed.
    pub fn advance(&mut self, elapsed: f32) -> SceneResult<u32> {
        if !(elapsed.is_finite() && elapsed >= 0.0) {
            return Err(CoreError::InvalidArgument(format!(
                "elapsed time must be finite and non-negative, got {elapsed}"
            ))
            .into());
        }

        match self.config.timestep {
            Timestep::Fixed { dt } => {
                self.clock.accumulate(elapsed);
                let mut ran = 0;
                while ran < self.config.max_catch_up_ticks && self.clock.consume(dt) {
                    self.step(dt)?;
                    ran += 1;
                }
                let dropped = self.clock.discard_backlog(dt);
                if dropped > 0 {
                    warn!(dropped, ran, "scene fell behind, dropping fixed steps");
                }
                Ok(ran)
            }
            Timestep::Variable { max_dt } => {
                if elapsed <= 0.0 {
                    return Ok(0);
                }
                self.step(elapsed.min(max_dt))?;
                Ok(1)
            }
        }
    }

    fn step(&mut self, dt: f32) -> SceneResult<DrainReport> {
        let tick = self.clock.advance(dt);
        let mut ctx = TickContext {
            tick,
            dt,
            events: &mut self.events,
            rng: &mut self.rng,
        };
        self.managers.run_schedule(&mut ctx)?;
        let report = self.events.update()?;
        trace!(tick, dt, flips = report.flips, delivered = report.delivered, "tick");
        Ok(report)
    }
}
