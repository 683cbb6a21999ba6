use std::any::Any;

use tracing::{debug, warn};
use ts_core::manager::unknown_pass;
use ts_core::{
    Behaviour, BehaviourId, BehaviourManager, CoreError, CoreResult, Manager, ManagerOf, Property,
    PropertyContext, TickContext, Timestep,
};

use crate::arithmetic::Arithmetic;
use crate::integrator::{INTEGRATOR_PASSES, Kinematics, PREVIOUS_POSITION, declared};

#[derive(Debug)]
struct VerletState<T> {
    kinematics: Kinematics<T>,
    previous: Property<T>,
}

/// Störmer–Verlet integration in velocity form.
///
/// Velocity step: `v = (p - p_prev) / dt + a`. Position step:
/// `p_prev = p + b * dt`, then `p += (v + b) * dt`. Offsetting the stored
/// previous position by the bias displacement keeps the bias out of the
/// derived velocity.
///
/// Velocity is derived from positions, so moving a body between ticks
/// changes its velocity and writing the velocity directly only has an effect
/// before the first step. The first velocity step, before any previous
/// position exists, uses the stored velocity instead.
#[derive(Debug)]
pub struct Verlet<P: Arithmetic> {
    policy: P,
    state: Option<VerletState<P::Value>>,
    primed: bool,
}

impl<P: Arithmetic> Verlet<P> {
    /// Create an integrator bound to `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            state: None,
            primed: false,
        }
    }

    /// The property handles, once declared.
    pub fn kinematics(&self) -> Option<&Kinematics<P::Value>> {
        self.state.as_ref().map(|s| &s.kinematics)
    }

    /// Derive the velocity from the last displacement and add this tick's
    /// acceleration.
    pub fn integrate_velocity(&self, dt: f32) -> CoreResult<()> {
        let s = declared(&self.state, "Verlet")?;
        let k = &s.kinematics;
        let policy = self.policy;
        let base = if self.primed {
            let displacement = policy.subtract(k.position.get(), s.previous.get());
            policy.multiply(displacement, 1.0 / dt)
        } else {
            k.velocity.get()
        };
        k.velocity.set(policy.add(base, k.acceleration.get()));
        k.acceleration.set(policy.zero());
        Ok(())
    }

    /// Store `p + b * dt` as the previous position and move by `(v + b) * dt`.
    pub fn integrate_position(&mut self, dt: f32) -> CoreResult<()> {
        let s = declared(&self.state, "Verlet")?;
        let k = &s.kinematics;
        let policy = self.policy;
        let position = k.position.get();
        let bias = policy.multiply(k.velocity_bias.get(), dt);
        let step = policy.multiply(k.velocity.get(), dt);

        s.previous.set(policy.add(position, bias));
        k.position.set(policy.add(policy.add(position, step), bias));
        k.velocity_bias.set(policy.zero());
        self.primed = true;
        Ok(())
    }
}

impl<P: Arithmetic> Default for Verlet<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: Arithmetic> Behaviour for Verlet<P> {
    type Manager = VerletManager<P>;

    fn declare(&mut self, ctx: &mut PropertyContext<'_>) -> CoreResult<()> {
        let kinematics = Kinematics::declare(ctx, &self.policy)?;
        let previous = ctx.declare_property(PREVIOUS_POSITION, self.policy.zero())?;
        self.state = Some(VerletState {
            kinematics,
            previous,
        });
        Ok(())
    }
}

/// Batches every [`Verlet`] integrator of one policy.
///
/// Only valid on a fixed timestep; the step length is taken from the
/// [`Timestep`] at construction.
#[derive(Debug)]
pub struct VerletManager<P: Arithmetic> {
    behaviours: BehaviourManager<Verlet<P>>,
    dt: f32,
}

impl<P: Arithmetic> VerletManager<P> {
    /// Create a manager for a scene advancing by `timestep`.
    ///
    /// Fails with `PreconditionViolation` on a variable timestep and with
    /// `InvalidArgument` on a non-positive or non-finite fixed step.
    pub fn new(timestep: &Timestep) -> CoreResult<Self> {
        match *timestep {
            Timestep::Fixed { dt } if dt.is_finite() && dt > 0.0 => {
                debug!(dt, policy = std::any::type_name::<P>(), "verlet manager created");
                Ok(Self {
                    behaviours: BehaviourManager::new(),
                    dt,
                })
            }
            Timestep::Fixed { dt } => Err(CoreError::InvalidArgument(format!(
                "fixed timestep must be positive and finite, got {dt}"
            ))),
            Timestep::Variable { .. } => Err(CoreError::PreconditionViolation(
                "Verlet integration requires a fixed timestep".into(),
            )),
        }
    }

    /// The fixed step length.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// The registered integrators.
    pub fn behaviours(&self) -> &BehaviourManager<Verlet<P>> {
        &self.behaviours
    }

    /// Run the velocity pass.
    pub fn integrate_velocities(&mut self) -> CoreResult<()> {
        let dt = self.dt;
        self.behaviours
            .for_each(|_, verlet, _| verlet.integrate_velocity(dt))
    }

    /// Run the position pass.
    pub fn integrate_positions(&mut self) -> CoreResult<()> {
        let dt = self.dt;
        self.behaviours
            .for_each(|_, verlet, _| verlet.integrate_position(dt))
    }

    /// Run both passes back to back.
    pub fn update(&mut self) -> CoreResult<()> {
        self.integrate_velocities()?;
        self.integrate_positions()
    }

    fn check_dt(&self, dt: f32) -> CoreResult<()> {
        if (dt - self.dt).abs() > self.dt * 1e-4 {
            warn!(tick = dt, fixed = self.dt, "verlet manager given a mismatched tick");
            return Err(CoreError::PreconditionViolation(format!(
                "tick of {dt}s does not match the fixed step of {}s",
                self.dt
            )));
        }
        Ok(())
    }
}

impl<P: Arithmetic> Manager for VerletManager<P> {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn passes(&self) -> &'static [&'static str] {
        INTEGRATOR_PASSES
    }

    fn check_timestep(&self, timestep: &Timestep) -> CoreResult<()> {
        match *timestep {
            Timestep::Fixed { dt } => self.check_dt(dt),
            Timestep::Variable { .. } => Err(CoreError::PreconditionViolation(
                "Verlet integration cannot run in a variable-timestep scene".into(),
            )),
        }
    }

    fn run_pass(&mut self, pass: usize, ctx: &mut TickContext<'_>) -> CoreResult<()> {
        self.check_dt(ctx.dt)?;
        match pass {
            0 => self.integrate_velocities(),
            1 => self.integrate_positions(),
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

impl<P: Arithmetic> ManagerOf<Verlet<P>> for VerletManager<P> {
    fn register(&mut self, id: BehaviourId, behaviour: Verlet<P>) -> CoreResult<()> {
        self.behaviours.add(id, behaviour)
    }
}
