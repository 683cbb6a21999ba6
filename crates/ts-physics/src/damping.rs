use ts_core::{
    Behaviour, BehaviourManager, CoreError, CoreResult, PassControl, Property, PropertyContext,
    TickContext, Update,
};

use crate::arithmetic::Arithmetic;
use crate::integrator::{DAMPING, FORCE, VELOCITY, declared};
use crate::inverse_mass::InverseMass;

#[derive(Debug)]
struct DampingState<T> {
    coefficient: Property<f32>,
    velocity: Property<T>,
    force: Property<T>,
}

/// Linear drag: each update adds `-velocity * damping` to the force.
///
/// Needs an [`InverseMass`] of the same policy attached earlier on the same
/// entity to turn that force into acceleration.
#[derive(Debug)]
pub struct Damping<P: Arithmetic> {
    policy: P,
    coefficient: f32,
    state: Option<DampingState<P::Value>>,
}

impl<P: Arithmetic> Damping<P> {
    /// Drag with the given coefficient. A template `damping` property on the
    /// entity takes precedence.
    pub fn new(policy: P, coefficient: f32) -> Self {
        Self {
            policy,
            coefficient,
            state: None,
        }
    }

    /// The coefficient property, once declared.
    pub fn coefficient(&self) -> Option<&Property<f32>> {
        self.state.as_ref().map(|s| &s.coefficient)
    }

    /// Add this tick's drag to the force accumulator.
    pub fn apply(&self) -> CoreResult<()> {
        let s = declared(&self.state, "Damping")?;
        let policy = self.policy;
        let drag = policy.multiply(s.velocity.get(), s.coefficient.get());
        s.force.update(|f| *f = policy.subtract(*f, drag));
        Ok(())
    }
}

impl<P: Arithmetic> Behaviour for Damping<P> {
    type Manager = BehaviourManager<Self>;

    fn declare(&mut self, ctx: &mut PropertyContext<'_>) -> CoreResult<()> {
        ctx.require_behaviour::<InverseMass<P>>("Damping")?;
        if !(self.coefficient.is_finite() && self.coefficient >= 0.0) {
            return Err(CoreError::InvalidArgument(format!(
                "damping must be non-negative and finite, got {}",
                self.coefficient
            )));
        }
        self.state = Some(DampingState {
            coefficient: ctx.declare_property(DAMPING, self.coefficient)?,
            velocity: ctx.declare_property(VELOCITY, self.policy.zero())?,
            force: ctx.get_property(FORCE)?,
        });
        Ok(())
    }
}

impl<P: Arithmetic> Update for Damping<P> {
    fn update(&mut self, _: &mut TickContext<'_>, _: &mut PassControl) -> CoreResult<()> {
        self.apply()
    }
}
