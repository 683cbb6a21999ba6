use ts_core::{
    Behaviour, BehaviourManager, CoreError, CoreResult, PassControl, Property, PropertyContext,
    TickContext, Update,
};

use crate::arithmetic::Arithmetic;
use crate::integrator::{ACCELERATION, FORCE, INVERSE_MASS, declared};

#[derive(Debug)]
struct MassState<T> {
    inverse_mass: Property<f32>,
    force: Property<T>,
    acceleration: Property<T>,
}

/// Turns the force accumulated during a tick into acceleration.
///
/// Each update adds `force * inverse_mass * dt` to the acceleration and
/// resets the force. Schedule it after every force producer and before the
/// integrator's velocity pass.
#[derive(Debug)]
pub struct InverseMass<P: Arithmetic> {
    policy: P,
    inverse_mass: f32,
    state: Option<MassState<P::Value>>,
}

impl<P: Arithmetic> InverseMass<P> {
    /// A body with the given inverse mass. A template `inverse_mass`
    /// property on the entity takes precedence.
    pub fn new(policy: P, inverse_mass: f32) -> Self {
        Self {
            policy,
            inverse_mass,
            state: None,
        }
    }

    /// A body of the given mass.
    pub fn with_mass(policy: P, mass: f32) -> CoreResult<Self> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(CoreError::InvalidArgument(format!(
                "mass must be positive and finite, got {mass}"
            )));
        }
        Ok(Self::new(policy, 1.0 / mass))
    }

    /// A body no force can move.
    pub fn immovable(policy: P) -> Self {
        Self::new(policy, 0.0)
    }

    /// The inverse mass property, once declared.
    pub fn inverse_mass(&self) -> Option<&Property<f32>> {
        self.state.as_ref().map(|s| &s.inverse_mass)
    }

    /// Convert the accumulated force into acceleration for a tick of `dt`.
    pub fn apply(&self, dt: f32) -> CoreResult<()> {
        let s = declared(&self.state, "InverseMass")?;
        let policy = self.policy;
        let delta = policy.multiply(s.force.get(), s.inverse_mass.get() * dt);
        s.acceleration.update(|a| *a = policy.add(*a, delta));
        s.force.set(policy.zero());
        Ok(())
    }
}

impl<P: Arithmetic> Behaviour for InverseMass<P> {
    type Manager = BehaviourManager<Self>;

    fn declare(&mut self, ctx: &mut PropertyContext<'_>) -> CoreResult<()> {
        if !(self.inverse_mass.is_finite() && self.inverse_mass >= 0.0) {
            return Err(CoreError::InvalidArgument(format!(
                "inverse mass must be non-negative and finite, got {}",
                self.inverse_mass
            )));
        }
        self.state = Some(MassState {
            inverse_mass: ctx.declare_property(INVERSE_MASS, self.inverse_mass)?,
            force: ctx.declare_property(FORCE, self.policy.zero())?,
            acceleration: ctx.declare_property(ACCELERATION, self.policy.zero())?,
        });
        Ok(())
    }
}

impl<P: Arithmetic> Update for InverseMass<P> {
    fn update(&mut self, ctx: &mut TickContext<'_>, _: &mut PassControl) -> CoreResult<()> {
        self.apply(ctx.dt)
    }
}
