use std::fmt;

use glam::{Vec2, Vec3};

/// Add, subtract and scale for one numeric representation.
///
/// Policies are stateless values handed to an integrator when it is built.
/// Integrators are generic over the policy, so every call is resolved at
/// compile time. Implementations must agree with the component-wise
/// arithmetic of their value type.
pub trait Arithmetic: Copy + Default + fmt::Debug + 'static {
    /// The represented numeric type.
    type Value: Copy + PartialEq + fmt::Debug + 'static;

    /// The additive identity.
    fn zero(&self) -> Self::Value;

    /// `a + b`.
    fn add(&self, a: Self::Value, b: Self::Value) -> Self::Value;

    /// `a - b`.
    fn subtract(&self, a: Self::Value, b: Self::Value) -> Self::Value;

    /// `a * scalar`.
    fn multiply(&self, a: Self::Value, scalar: f32) -> Self::Value;
}

/// Policy for plain `f32` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalarArithmetic;

impl Arithmetic for ScalarArithmetic {
    type Value = f32;

    fn zero(&self) -> f32 {
        0.0
    }

    fn add(&self, a: f32, b: f32) -> f32 {
        a + b
    }

    fn subtract(&self, a: f32, b: f32) -> f32 {
        a - b
    }

    fn multiply(&self, a: f32, scalar: f32) -> f32 {
        a * scalar
    }
}

/// Policy for 2D vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vec2Arithmetic;

impl Arithmetic for Vec2Arithmetic {
    type Value = Vec2;

    fn zero(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn add(&self, a: Vec2, b: Vec2) -> Vec2 {
        a + b
    }

    fn subtract(&self, a: Vec2, b: Vec2) -> Vec2 {
        a - b
    }

    fn multiply(&self, a: Vec2, scalar: f32) -> Vec2 {
        a * scalar
    }
}

/// Policy for 3D vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vec3Arithmetic;

impl Arithmetic for Vec3Arithmetic {
    type Value = Vec3;

    fn zero(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn add(&self, a: Vec3, b: Vec3) -> Vec3 {
        a + b
    }

    fn subtract(&self, a: Vec3, b: Vec3) -> Vec3 {
        a - b
    }

    fn multiply(&self, a: Vec3, scalar: f32) -> Vec3 {
        a * scalar
    }
}
