use std::ops::Mul;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::{Quat, Vec3};

/// 4x4 column-major matrix.
///
/// `data` can be uploaded as a `mat4` uniform as is.
///
/// ```
/// use glscene_math::{Mat4, Quat, Vec3};
///
/// let mut model = Mat4::IDENTITY;
/// model.trs(Vec3::new(3.0, 5.0, 4.0), Quat::IDENTITY, Vec3::ONE);
/// assert_eq!(model.translation(), Vec3::new(3.0, 5.0, 4.0));
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Mat4 {
    pub data: [f32; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    #[rustfmt::skip]
    pub const IDENTITY: Self = Self::from_cols_array([
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]);
    pub const ZERO: Self = Self::from_cols_array([0.0; 16]);

    pub const fn from_cols_array(data: [f32; 16]) -> Self {
        Self { data }
    }

    pub fn as_array(&self) -> &[f32; 16] {
        &self.data
    }

    pub fn identity(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn zero(&mut self) {
        *self = Self::ZERO;
    }

    pub fn copy(&mut self, other: &Mat4) {
        self.data = other.data;
    }

    /// Translation column.
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.data[12], self.data[13], self.data[14])
    }

    pub fn determinant(&self) -> f32 {
        let [
            a00, a01, a02, a03,
            a10, a11, a12, a13,
            a20, a21, a22, a23,
            a30, a31, a32, a33,
        ] = self.data;

        let b00 = a00 * a11 - a01 * a10;
        let b01 = a00 * a12 - a02 * a10;
        let b02 = a00 * a13 - a03 * a10;
        let b03 = a01 * a12 - a02 * a11;
        let b04 = a01 * a13 - a03 * a11;
        let b05 = a02 * a13 - a03 * a12;
        let b06 = a20 * a31 - a21 * a30;
        let b07 = a20 * a32 - a22 * a30;
        let b08 = a20 * a33 - a23 * a30;
        let b09 = a21 * a32 - a22 * a31;
        let b10 = a21 * a33 - a23 * a31;
        let b11 = a22 * a33 - a23 * a32;

        b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06
    }

    /// Invert in place by cofactor expansion.
    ///
    /// When the determinant is exactly zero the matrix is left untouched and
    /// `false` is returned. No epsilon: near-singular matrices still invert.
    pub fn invert(&mut self) -> bool {
        let [
            a00, a01, a02, a03,
            a10, a11, a12, a13,
            a20, a21, a22, a23,
            a30, a31, a32, a33,
        ] = self.data;

        let b00 = a00 * a11 - a01 * a10;
        let b01 = a00 * a12 - a02 * a10;
        let b02 = a00 * a13 - a03 * a10;
        let b03 = a01 * a12 - a02 * a11;
        let b04 = a01 * a13 - a03 * a11;
        let b05 = a02 * a13 - a03 * a12;
        let b06 = a20 * a31 - a21 * a30;
        let b07 = a20 * a32 - a22 * a30;
        let b08 = a20 * a33 - a23 * a30;
        let b09 = a21 * a32 - a22 * a31;
        let b10 = a21 * a33 - a23 * a31;
        let b11 = a22 * a33 - a23 * a32;

        let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
        if det == 0.0 {
            return false;
        }
        let det = 1.0 / det;

        self.data = [
            (a11 * b11 - a12 * b10 + a13 * b09) * det,
            (a02 * b10 - a01 * b11 - a03 * b09) * det,
            (a31 * b05 - a32 * b04 + a33 * b03) * det,
            (a22 * b04 - a21 * b05 - a23 * b03) * det,
            (a12 * b08 - a10 * b11 - a13 * b07) * det,
            (a00 * b11 - a02 * b08 + a03 * b07) * det,
            (a32 * b02 - a30 * b05 - a33 * b01) * det,
            (a20 * b05 - a22 * b02 + a23 * b01) * det,
            (a10 * b10 - a11 * b08 + a13 * b06) * det,
            (a01 * b08 - a00 * b10 - a03 * b06) * det,
            (a30 * b04 - a31 * b02 + a33 * b00) * det,
            (a21 * b02 - a20 * b04 - a23 * b00) * det,
            (a11 * b07 - a10 * b09 - a12 * b06) * det,
            (a00 * b09 - a01 * b07 + a02 * b06) * det,
            (a31 * b01 - a30 * b03 - a32 * b00) * det,
            (a20 * b03 - a21 * b01 + a22 * b00) * det,
        ];
        true
    }

    /// Inverted copy, or `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Self> {
        let mut m = *self;
        m.invert().then_some(m)
    }

    /// Chain `other` after this transform: `self = other * self`.
    ///
    /// A point transformed by the result is first transformed by the old
    /// `self`, then by `other`. Used as `local.multiply(&parent_world)`.
    pub fn multiply(&mut self, other: &Mat4) {
        *self = *other * *self;
    }

    /// Set from position, rotation and scale: scale first, then rotate, then
    /// translate.
    pub fn trs(&mut self, pos: Vec3, rot: Quat, scale: Vec3) {
        let Quat { x, y, z, w } = rot;
        let x2 = x + x;
        let y2 = y + y;
        let z2 = z + z;

        let xx = x * x2;
        let xy = x * y2;
        let xz = x * z2;
        let yy = y * y2;
        let yz = y * z2;
        let zz = z * z2;
        let wx = w * x2;
        let wy = w * y2;
        let wz = w * z2;
        let Vec3 { x: sx, y: sy, z: sz } = scale;

        self.data = [
            (1.0 - (yy + zz)) * sx,
            (xy + wz) * sx,
            (xz - wy) * sx,
            0.0,
            (xy - wz) * sy,
            (1.0 - (xx + zz)) * sy,
            (yz + wx) * sy,
            0.0,
            (xz + wy) * sz,
            (yz - wx) * sz,
            (1.0 - (xx + yy)) * sz,
            0.0,
            pos.x,
            pos.y,
            pos.z,
            1.0,
        ];
    }

    pub fn from_trs(pos: Vec3, rot: Quat, scale: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.trs(pos, rot, scale);
        m
    }

    /// Reset to identity with translation `(x, y, z)`.
    pub fn set_translation(&mut self, x: f32, y: f32, z: f32) {
        self.identity();
        self.data[12] = x;
        self.data[13] = y;
        self.data[14] = z;
    }

    /// Right-handed perspective projection, clip z in [-1, 1].
    ///
    /// `far` of `None` or infinity yields the infinite far plane form.
    pub fn perspective(&mut self, fov: f32, aspect: f32, near: f32, far: Option<f32>) {
        let f = 1.0 / (fov / 2.0).tan();
        self.zero();
        self.data[0] = f / aspect;
        self.data[5] = f;
        self.data[11] = -1.0;
        match far.filter(|f| f.is_finite()) {
            Some(far) => {
                let nf = 1.0 / (near - far);
                self.data[10] = (far + near) * nf;
                self.data[14] = 2.0 * far * near * nf;
            }
            None => {
                self.data[10] = -1.0;
                self.data[14] = -2.0 * near;
            }
        }
    }

    /// Orthographic (parallel) projection for the given box.
    pub fn orthogonal(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        let lr = 1.0 / (left - right);
        let bt = 1.0 / (bottom - top);
        let nf = 1.0 / (near - far);
        self.zero();
        self.data[0] = -2.0 * lr;
        self.data[5] = -2.0 * bt;
        self.data[10] = 2.0 * nf;
        self.data[12] = (left + right) * lr;
        self.data[13] = (top + bottom) * bt;
        self.data[14] = (far + near) * nf;
        self.data[15] = 1.0;
    }
}

/// Ordinary matrix product: `(a * b)` applies `b` first.
impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let a = &self.data;
        let b = &rhs.data;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = a[row] * b[col * 4]
                    + a[4 + row] * b[col * 4 + 1]
                    + a[8 + row] * b[col * 4 + 2]
                    + a[12 + row] * b[col * 4 + 3];
            }
        }
        Mat4 { data: out }
    }
}

impl From<glam::Mat4> for Mat4 {
    fn from(m: glam::Mat4) -> Self {
        Self::from_cols_array(m.to_cols_array())
    }
}

impl From<Mat4> for glam::Mat4 {
    fn from(m: Mat4) -> Self {
        glam::Mat4::from_cols_array(&m.data)
    }
}
