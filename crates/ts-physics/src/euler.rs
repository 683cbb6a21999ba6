use std::any::Any;

use ts_core::manager::unknown_pass;
use ts_core::{
    Behaviour, BehaviourId, BehaviourManager, CoreResult, Manager, ManagerOf, PropertyContext,
    TickContext,
};

use crate::arithmetic::Arithmetic;
use crate::integrator::{INTEGRATOR_PASSES, Kinematics, declared};

/// Explicit Euler integration over one entity's kinematic properties.
///
/// Velocity step: `v += a`. Position step: `p += (v + b) * dt`. Acceleration
/// and velocity bias are reset to zero by their step.
#[derive(Debug)]
pub struct Euler<P: Arithmetic> {
    policy: P,
    state: Option<Kinematics<P::Value>>,
}

impl<P: Arithmetic> Euler<P> {
    /// Create an integrator bound to `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            state: None,
        }
    }

    /// The property handles, once declared.
    pub fn kinematics(&self) -> Option<&Kinematics<P::Value>> {
        self.state.as_ref()
    }

    /// Fold this tick's acceleration into the velocity.
    pub fn integrate_velocity(&self) -> CoreResult<()> {
        let k = declared(&self.state, "Euler")?;
        let policy = self.policy;
        let a = k.acceleration.get();
        k.velocity.update(|v| *v = policy.add(*v, a));
        k.acceleration.set(policy.zero());
        Ok(())
    }

    /// Move the position by `(v + b) * dt`.
    pub fn integrate_position(&self, dt: f32) -> CoreResult<()> {
        let k = declared(&self.state, "Euler")?;
        let policy = self.policy;
        let step = policy.multiply(policy.add(k.velocity.get(), k.velocity_bias.get()), dt);
        k.position.update(|p| *p = policy.add(*p, step));
        k.velocity_bias.set(policy.zero());
        Ok(())
    }
}

impl<P: Arithmetic> Default for Euler<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: Arithmetic> Behaviour for Euler<P> {
    type Manager = EulerManager<P>;

    fn declare(&mut self, ctx: &mut PropertyContext<'_>) -> CoreResult<()> {
        self.state = Some(Kinematics::declare(ctx, &self.policy)?);
        Ok(())
    }
}

/// Batches every [`Euler`] integrator of one policy.
///
/// Exposes the `velocity` and `position` passes separately so constraint
/// solving can be scheduled between them.
#[derive(Debug)]
pub struct EulerManager<P: Arithmetic> {
    behaviours: BehaviourManager<Euler<P>>,
}

impl<P: Arithmetic> Default for EulerManager<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Arithmetic> EulerManager<P> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            behaviours: BehaviourManager::new(),
        }
    }

    /// The registered integrators.
    pub fn behaviours(&self) -> &BehaviourManager<Euler<P>> {
        &self.behaviours
    }

    /// Run the velocity pass.
    pub fn integrate_velocities(&mut self) -> CoreResult<()> {
        self.behaviours
            .for_each(|_, euler, _| euler.integrate_velocity())
    }

    /// Run the position pass.
    pub fn integrate_positions(&mut self, dt: f32) -> CoreResult<()> {
        self.behaviours
            .for_each(|_, euler, _| euler.integrate_position(dt))
    }

    /// Run both passes back to back.
    pub fn update(&mut self, dt: f32) -> CoreResult<()> {
        self.integrate_velocities()?;
        self.integrate_positions(dt)
    }
}

impl<P: Arithmetic> Manager for EulerManager<P> {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn passes(&self) -> &'static [&'static str] {
        INTEGRATOR_PASSES
    }

    fn run_pass(&mut self, pass: usize, ctx: &mut TickContext<'_>) -> CoreResult<()> {
        match pass {
            0 => self.integrate_velocities(),
            1 => self.integrate_positions(ctx.dt),
            _ => Err(unknown_pass(self.name(), pass)),
        }
    }

    fn deregister(&mut self, id: BehaviourId) -> bool {
        self.behaviours.remove(id).is_some()
    }

    fn behaviour_count(&self) -> usize {
        self.behaviours.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<P: Arithmetic> ManagerOf<Euler<P>> for EulerManager<P> {
    fn register(&mut self, id: BehaviourId, behaviour: Euler<P>) -> CoreResult<()> {
        self.behaviours.add(id, behaviour)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use glam::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ts_core::{Entity, ManagerSet};
    use ts_events::EventService;

    use super::*;
    use crate::arithmetic::{ScalarArithmetic, Vec2Arithmetic};
    use crate::integrator::{ACCELERATION, POSITION, VELOCITY, VELOCITY_BIAS};

    type Manager2 = EulerManager<Vec2Arithmetic>;

    fn scene() -> ManagerSet {
        let mut set = ManagerSet::new();
        set.bind(Manager2::new()).unwrap();
        set.schedule_all::<Manager2>().unwrap();
        set
    }

    fn ball(set: &mut ManagerSet, velocity: Vec2, acceleration: Vec2) -> Entity {
        set.spawn("ball", |e| {
            e.property(VELOCITY, velocity)?;
            e.property(ACCELERATION, acceleration)?;
            e.attach(Euler::<Vec2Arithmetic>::default())?;
            Ok(())
        })
        .unwrap()
    }

    fn vec2(entity: &Entity, name: &str) -> Vec2 {
        entity.property::<Vec2>(name).unwrap().get()
    }

    fn tick(set: &mut ManagerSet, dt: f32) {
        let mut events = EventService::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut ctx = TickContext {
            tick: 1,
            dt,
            events: &mut events,
            rng: &mut rng,
        };
        set.run_schedule(&mut ctx).unwrap();
    }

    #[test]
    fn falling_ball_single_step() {
        let mut set = scene();
        let entity = ball(&mut set, Vec2::new(1.0, 0.0), Vec2::new(0.0, -9.8));

        tick(&mut set, 0.1);

        assert!(vec2(&entity, VELOCITY).abs_diff_eq(Vec2::new(1.0, -9.8), 1e-6));
        assert!(vec2(&entity, POSITION).abs_diff_eq(Vec2::new(0.1, -0.98), 1e-6));
        assert_eq!(vec2(&entity, ACCELERATION), Vec2::ZERO);
        assert_eq!(vec2(&entity, VELOCITY_BIAS), Vec2::ZERO);
    }

    #[test]
    fn accumulators_do_not_leak_into_the_next_step() {
        let mut set = scene();
        let entity = ball(&mut set, Vec2::new(1.0, 0.0), Vec2::new(0.0, -9.8));

        tick(&mut set, 0.1);
        tick(&mut set, 0.1);

        assert!(vec2(&entity, VELOCITY).abs_diff_eq(Vec2::new(1.0, -9.8), 1e-6));
        assert!(vec2(&entity, POSITION).abs_diff_eq(Vec2::new(0.2, -1.96), 1e-5));
    }

    #[test]
    fn velocity_bias_moves_without_changing_velocity() {
        let mut set = scene();
        let entity = ball(&mut set, Vec2::new(1.0, 0.0), Vec2::ZERO);
        entity
            .property::<Vec2>(VELOCITY_BIAS)
            .unwrap()
            .set(Vec2::new(0.0, 2.0));

        let manager = set.get_mut::<Manager2>().unwrap();
        manager.update(0.5).unwrap();

        assert_eq!(vec2(&entity, VELOCITY), Vec2::new(1.0, 0.0));
        assert!(vec2(&entity, POSITION).abs_diff_eq(Vec2::new(0.5, 1.0), 1e-6));
        assert_eq!(vec2(&entity, VELOCITY_BIAS), Vec2::ZERO);
    }

    #[test]
    fn each_write_notifies_position_subscribers() {
        let mut set = scene();
        let entity = ball(&mut set, Vec2::ZERO, Vec2::ZERO);
        let writes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&writes);
        entity
            .property::<Vec2>(POSITION)
            .unwrap()
            .subscribe(move |_| counter.set(counter.get() + 1));

        // A zero step still writes.
        tick(&mut set, 0.1);
        tick(&mut set, 0.1);
        assert_eq!(writes.get(), 2);
    }

    #[test]
    fn passes_are_exposed_in_order() {
        let manager = Manager2::new();
        assert_eq!(manager.passes(), &["velocity", "position"]);
    }

    #[test]
    fn unknown_pass_is_not_found() {
        let mut manager = EulerManager::<ScalarArithmetic>::new();
        let mut events = EventService::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut ctx = TickContext {
            tick: 1,
            dt: 0.1,
            events: &mut events,
            rng: &mut rng,
        };
        assert!(matches!(
            manager.run_pass(2, &mut ctx),
            Err(ts_core::CoreError::NotFound(_))
        ));
    }

    #[test]
    fn scalar_policy_integrates_plain_floats() {
        let mut set = ManagerSet::new();
        set.bind(EulerManager::<ScalarArithmetic>::new()).unwrap();
        let entity = set
            .spawn("slider", |e| {
                e.property(VELOCITY, 2.0_f32)?;
                e.attach(Euler::new(ScalarArithmetic))?;
                Ok(())
            })
            .unwrap();
        set.get_mut::<EulerManager<ScalarArithmetic>>()
            .unwrap()
            .update(0.25)
            .unwrap();
        assert!((entity.property::<f32>(POSITION).unwrap().get() - 0.5).abs() < 1e-6);
    }
}
