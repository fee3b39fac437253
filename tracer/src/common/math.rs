use std::ops::{Div, Mul};

use derive_more::{Add, AddAssign, Neg, Sub};

/// Plain 3D vector, also used for points.
#[derive(Debug, Copy, Clone, Default, PartialEq, Add, AddAssign, Sub, Neg)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

pub type Point3 = Vec3;

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;

    fn div(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3 { x, y, z }
    }

    pub const fn from_array(array: [f32; 3]) -> Vec3 {
        Vec3::new(array[0], array[1], array[2])
    }

    pub const fn x_axis() -> Vec3 {
        Vec3::new(1.0, 0.0, 0.0)
    }

    pub const fn y_axis() -> Vec3 {
        Vec3::new(0.0, 1.0, 0.0)
    }

    pub const fn z_axis() -> Vec3 {
        Vec3::new(0.0, 0.0, 1.0)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn norm_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn norm(self) -> f32 {
        self.norm_squared().sqrt()
    }

    pub fn try_normalized(self) -> Option<Vec3> {
        let norm = self.norm();
        if norm == 0.0 || !norm.is_finite() {
            None
        } else {
            Some(self / norm)
        }
    }

    /// Panics for zero-length vectors, callers are expected to have checked this.
    pub fn normalized(self) -> Vec3 {
        self.try_normalized()
            .unwrap_or_else(|| panic!("norm should be > 0.0 for {:?}", self))
    }

    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Two unit vectors that together with `self` form an orthonormal basis.
    /// `self` must already be normalized.
    pub fn orthonormal_basis(self) -> (Vec3, Vec3) {
        let helper = if self.x.abs() > 0.9 { Vec3::y_axis() } else { Vec3::x_axis() };
        let tangent = self.cross(helper).normalized();
        let bitangent = self.cross(tangent);
        (tangent, bitangent)
    }
}
