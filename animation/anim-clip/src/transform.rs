//! Bone transforms and the arithmetic used to blend them

use std::ops::{Add, Mul, Sub};

use glam::{Mat4, Quat, Vec3, Vec4};
#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// A decomposed local bone transform
///
/// Arithmetic operators work component-wise, with the rotation treated as
/// a plain 4-vector. Root motion deltas are built that way, so a rotation
/// produced by `+`/`-` is not necessarily a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Every component zero, including the rotation quaternion.
    pub const ZERO: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        scale: Vec3::ZERO,
    };

    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Decomposes a bind or pose matrix.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Composes scale, then rotation, then translation.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Linear interpolation of translation and scale, spherical for rotation.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// `self + other * weight` for every component.
    pub fn add_scaled(&self, other: &Self, weight: f32) -> Self {
        *self + *other * weight
    }

    /// Returns a copy with a unit rotation. A zero rotation stays zero.
    pub fn normalized_rotation(&self) -> Self {
        let rotation = Vec4::from(self.rotation).normalize_or_zero();
        Self {
            rotation: Quat::from_vec4(rotation),
            ..*self
        }
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

impl Add for Transform {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            translation: self.translation + rhs.translation,
            rotation: self.rotation + rhs.rotation,
            scale: self.scale + rhs.scale,
        }
    }
}

impl Sub for Transform {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            translation: self.translation - rhs.translation,
            rotation: self.rotation - rhs.rotation,
            scale: self.scale - rhs.scale,
        }
    }
}

impl Mul<f32> for Transform {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self {
            translation: self.translation * rhs,
            rotation: self.rotation * rhs,
            scale: self.scale * rhs,
        }
    }
}
