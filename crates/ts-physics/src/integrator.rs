//! Property vocabulary shared by the integrators and force behaviours.

use ts_core::{CoreError, CoreResult, Property, PropertyContext};

use crate::arithmetic::Arithmetic;

/// Current position.
pub const POSITION: &str = "position";
/// Current velocity.
pub const VELOCITY: &str = "velocity";
/// Velocity change accumulated for the current tick. Reset after each step.
pub const ACCELERATION: &str = "acceleration";
/// Extra velocity applied to this tick's position step only. Reset after
/// each step, and never folded into the stored velocity.
pub const VELOCITY_BIAS: &str = "velocity_bias";
/// Position before the last step (Verlet only).
pub const PREVIOUS_POSITION: &str = "previous_position";
/// Force accumulated for the current tick. Reset by `InverseMass`.
pub const FORCE: &str = "force";
/// Reciprocal of the mass. Zero makes a body immovable.
pub const INVERSE_MASS: &str = "inverse_mass";
/// Linear damping coefficient.
pub const DAMPING: &str = "damping";

/// Manager pass that folds acceleration into velocity.
pub const VELOCITY_PASS: &str = "velocity";
/// Manager pass that moves positions.
pub const POSITION_PASS: &str = "position";
/// Passes of the integrator managers, in run order.
pub const INTEGRATOR_PASSES: &[&str] = &[VELOCITY_PASS, POSITION_PASS];

/// Handles to the properties every integrator works on.
///
/// Each one is declared with `declare_property`, so a template value or a
/// sibling behaviour that declared the same name first is picked up.
#[derive(Debug, Clone)]
pub struct Kinematics<T> {
    /// See [`POSITION`].
    pub position: Property<T>,
    /// See [`VELOCITY`].
    pub velocity: Property<T>,
    /// See [`ACCELERATION`].
    pub acceleration: Property<T>,
    /// See [`VELOCITY_BIAS`].
    pub velocity_bias: Property<T>,
}

impl<T: Copy + 'static> Kinematics<T> {
    /// Declare the kinematic properties, defaulting each to `policy.zero()`.
    pub fn declare<P>(ctx: &mut PropertyContext<'_>, policy: &P) -> CoreResult<Self>
    where
        P: Arithmetic<Value = T>,
    {
        Ok(Self {
            position: ctx.declare_property(POSITION, policy.zero())?,
            velocity: ctx.declare_property(VELOCITY, policy.zero())?,
            acceleration: ctx.declare_property(ACCELERATION, policy.zero())?,
            velocity_bias: ctx.declare_property(VELOCITY_BIAS, policy.zero())?,
        })
    }
}

/// Unwrap state a behaviour only has once it has been declared.
pub(crate) fn declared<'a, S>(state: &'a Option<S>, behaviour: &str) -> CoreResult<&'a S> {
    state.as_ref().ok_or_else(|| {
        CoreError::PreconditionViolation(format!("{behaviour} has not been declared"))
    })
}
