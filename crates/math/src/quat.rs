use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Dot product above which two unit vectors count as parallel in
/// [`Quat::rotation_to`], and below whose negation they count as opposite.
const PARALLEL_DOT: f32 = 0.999999;

/// Rotation quaternion `(x, y, z, w)`.
///
/// Unit length is only guaranteed right after [`Quat::normalize`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    pub fn set_identity(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Rotation of `rad` around `axis`. The axis must already be normalized.
    pub fn set_axis_angle(&mut self, axis: Vec3, rad: f32) {
        let half = rad * 0.5;
        let s = half.sin();
        self.x = s * axis.x;
        self.y = s * axis.y;
        self.z = s * axis.z;
        self.w = half.cos();
    }

    pub fn from_axis_angle(axis: Vec3, rad: f32) -> Self {
        let mut q = Self::IDENTITY;
        q.set_axis_angle(axis, rad);
        q
    }

    /// Set from euler angles in degrees.
    pub fn set_euler(&mut self, x: f32, y: f32, z: f32) {
        let half_to_rad = 0.5 * PI / 180.0;
        let (sx, cx) = (x * half_to_rad).sin_cos();
        let (sy, cy) = (y * half_to_rad).sin_cos();
        let (sz, cz) = (z * half_to_rad).sin_cos();

        self.x = sx * cy * cz - cx * sy * sz;
        self.y = cx * sy * cz + sx * cy * sz;
        self.z = cx * cy * sz - sx * sy * cz;
        self.w = cx * cy * cz + sx * sy * sz;
    }

    pub fn from_euler(x: f32, y: f32, z: f32) -> Self {
        let mut q = Self::IDENTITY;
        q.set_euler(x, y, z);
        q
    }

    /// `self = self * other`.
    pub fn multiply(&mut self, other: &Quat) {
        let (ax, ay, az, aw) = (self.x, self.y, self.z, self.w);
        let (bx, by, bz, bw) = (other.x, other.y, other.z, other.w);

        self.x = ax * bw + aw * bx + ay * bz - az * by;
        self.y = ay * bw + aw * by + az * bx - ax * bz;
        self.z = az * bw + aw * bz + ax * by - ay * bx;
        self.w = aw * bw - ax * bx - ay * by - az * bz;
    }

    pub fn rotate_x(&mut self, rad: f32) {
        let (bx, bw) = (rad * 0.5).sin_cos();
        let (ax, ay, az, aw) = (self.x, self.y, self.z, self.w);
        self.x = ax * bw + aw * bx;
        self.y = ay * bw + az * bx;
        self.z = az * bw - ay * bx;
        self.w = aw * bw - ax * bx;
    }

    pub fn rotate_y(&mut self, rad: f32) {
        let (by, bw) = (rad * 0.5).sin_cos();
        let (ax, ay, az, aw) = (self.x, self.y, self.z, self.w);
        self.x = ax * bw - az * by;
        self.y = ay * bw + aw * by;
        self.z = az * bw + ax * by;
        self.w = aw * bw - ay * by;
    }

    pub fn rotate_z(&mut self, rad: f32) {
        let (bz, bw) = (rad * 0.5).sin_cos();
        let (ax, ay, az, aw) = (self.x, self.y, self.z, self.w);
        self.x = ax * bw + ay * bz;
        self.y = ay * bw - ax * bz;
        self.z = az * bw + aw * bz;
        self.w = aw * bw - az * bz;
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Scale to unit length. A zero quaternion is left as is.
    pub fn normalize(&mut self) {
        let len_sq = self.dot(*self);
        if len_sq > 0.0 {
            let inv = 1.0 / len_sq.sqrt();
            self.x *= inv;
            self.y *= inv;
            self.z *= inv;
            self.w *= inv;
        }
    }

    /// Inverse rotation for a unit quaternion.
    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Set to the shortest-arc rotation taking unit vector `a` onto unit vector `b`.
    ///
    /// Opposite vectors rotate half a turn around an axis orthogonal to `a`:
    /// `X × a`, or `Y × a` when `a` lies on the X axis.
    pub fn rotation_to(&mut self, a: Vec3, b: Vec3) {
        let dot = a.dot(b);
        if dot < -PARALLEL_DOT {
            let mut axis = Vec3::X.cross(a);
            if axis.length() < 0.000001 {
                axis = Vec3::Y.cross(a);
            }
            axis.normalize();
            self.set_axis_angle(axis, PI);
        } else if dot > PARALLEL_DOT {
            self.set_identity();
        } else {
            let c = a.cross(b);
            self.x = c.x;
            self.y = c.y;
            self.z = c.z;
            self.w = 1.0 + dot;
            self.normalize();
        }
    }

    pub fn from_rotation_to(a: Vec3, b: Vec3) -> Self {
        let mut q = Self::IDENTITY;
        q.rotation_to(a, b);
        q
    }

    /// Rotate a vector by this (unit) quaternion.
    pub fn rotate_vec3(self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }
}

impl From<glam::Quat> for Quat {
    fn from(q: glam::Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

impl From<Quat> for glam::Quat {
    fn from(q: Quat) -> Self {
        glam::Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}
