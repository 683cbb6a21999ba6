//! Numeric policies and integrator behaviours for Tessera.
//!
//! Integrators are written once, generically over an [`Arithmetic`] policy,
//! and instantiated for scalars, 2D vectors and 3D vectors. Each integrator
//! type has a manager that splits its work into a `velocity` and a
//! `position` pass so other managers can run in between.

/// Add, subtract and scale for scalars and glam vectors.
pub mod arithmetic;
/// Linear damping.
pub mod damping;
/// Explicit Euler integration.
pub mod euler;
pub mod integrator;
/// Force to acceleration conversion.
pub mod inverse_mass;
/// Störmer–Verlet integration.
pub mod verlet;

pub use arithmetic::{Arithmetic, ScalarArithmetic, Vec2Arithmetic, Vec3Arithmetic};
pub use damping::Damping;
pub use euler::{Euler, EulerManager};
pub use integrator::Kinematics;
pub use inverse_mass::InverseMass;
pub use verlet::{Verlet, VerletManager};

/// Euler integration over `f32`.
pub type ScalarEuler = Euler<ScalarArithmetic>;
/// Euler integration over [`glam::Vec2`].
pub type Euler2D = Euler<Vec2Arithmetic>;
/// Euler integration over [`glam::Vec3`].
pub type Euler3D = Euler<Vec3Arithmetic>;
/// Verlet integration over `f32`.
pub type ScalarVerlet = Verlet<ScalarArithmetic>;
/// Verlet integration over [`glam::Vec2`].
pub type Verlet2D = Verlet<Vec2Arithmetic>;
/// Verlet integration over [`glam::Vec3`].
pub type Verlet3D = Verlet<Vec3Arithmetic>;
