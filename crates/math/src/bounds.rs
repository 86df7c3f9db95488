use serde::{Deserialize, Serialize};

use crate::{Mat4, Vec3};

/// Axis-aligned box with an enclosing sphere, e.g. for frustum culling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub radius: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::ONE)
    }
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        let mut b = Self {
            min,
            max,
            center: Vec3::ZERO,
            radius: 0.0,
        };
        b.calculate_sphere();
        b
    }

    /// Recompute `center` and `radius` (half diagonal) from the box.
    pub fn calculate_sphere(&mut self) {
        self.center = self.min.lerp(self.max, 0.5);
        self.radius = (self.max - self.center).length();
    }

    pub fn set_min_max(&mut self, min: Vec3, max: Vec3) {
        self.min = min;
        self.max = max;
        self.calculate_sphere();
    }

    /// Grow to also enclose `other`.
    pub fn extend_to_bounds(&mut self, other: &Bounds) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.calculate_sphere();
    }

    /// Smallest box enclosing every entry. An empty list collapses to the origin.
    pub fn from_bounds_list(&mut self, list: &[Bounds]) {
        match list.split_first() {
            Some((first, rest)) => {
                self.min = first.min;
                self.max = first.max;
                for b in rest {
                    self.min = self.min.min(b.min);
                    self.max = self.max.max(b.max);
                }
            }
            None => {
                self.min = Vec3::ZERO;
                self.max = Vec3::ZERO;
            }
        }
        self.calculate_sphere();
    }

    /// Box enclosing all eight corners of `local` after transforming by `matrix`.
    pub fn from_bounds_with_matrix(&mut self, local: &Bounds, matrix: &Mat4) {
        let (lo, hi) = (local.min, local.max);
        let corners = [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ];
        let first = corners[0].transformed(matrix);
        let (mut min, mut max) = (first, first);
        for corner in &corners[1..] {
            let p = corner.transformed(matrix);
            min = min.min(p);
            max = max.max(p);
        }
        self.set_min_max(min, max);
    }

    /// Box of a flat `[x, y, z, x, y, z, ..]` position array. Trailing
    /// components that do not form a full point are ignored.
    pub fn from_positions(positions: &[f32]) -> Option<Self> {
        let mut points = positions
            .chunks_exact(3)
            .map(|p| Vec3::new(p[0], p[1], p[2]));
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self::new(min, max))
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Quat, approx_eq};

    #[test]
    fn default_is_unit_box() {
        let b = Bounds::default();
        assert_eq!(b.center, Vec3::ZERO);
        assert!(approx_eq(b.radius, 3.0f32.sqrt(), 1e-6));
    }

    #[test]
    fn sphere_of_offset_box() {
        let b = Bounds::new(Vec3::new(2.0, 2.0, 2.0), Vec3::new(4.0, 2.0, 2.0));
        assert_eq!(b.center, Vec3::new(3.0, 2.0, 2.0));
        assert_eq!(b.radius, 1.0);
    }

    #[test]
    fn extend_grows_box() {
        let mut a = Bounds::new(Vec3::ZERO, Vec3::ONE);
        a.extend_to_bounds(&Bounds::new(Vec3::new(-2.0, 0.5, 0.5), Vec3::new(0.0, 3.0, 0.5)));
        assert_eq!(a.min, Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(a.max, Vec3::new(1.0, 3.0, 1.0));
    }

    #[test]
    fn list_does_not_include_origin() {
        let mut b = Bounds::default();
        b.from_bounds_list(&[
            Bounds::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(6.0, 6.0, 6.0)),
            Bounds::new(Vec3::new(7.0, 5.0, 5.0), Vec3::new(8.0, 6.0, 6.0)),
        ]);
        assert_eq!(b.min, Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(b.max, Vec3::new(8.0, 6.0, 6.0));

        b.from_bounds_list(&[]);
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::ZERO);
    }

    #[test]
    fn transformed_by_rotation_and_translation() {
        let local = Bounds::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let m = Mat4::from_trs(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
            Vec3::ONE,
        );
        let mut world = Bounds::default();
        world.from_bounds_with_matrix(&local, &m);
        assert!(approx_eq(world.min.x, 9.0, 1e-5));
        assert!(approx_eq(world.max.x, 10.0, 1e-5));
        assert!(approx_eq(world.min.y, 0.0, 1e-5));
        assert!(approx_eq(world.max.y, 2.0, 1e-5));
    }

    #[test]
    fn from_positions_ignores_partial_point() {
        let b = Bounds::from_positions(&[1.0, -1.0, 0.0, -3.0, 2.0, 5.0, 99.0]).unwrap();
        assert_eq!(b.min, Vec3::new(-3.0, -1.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 5.0));
        assert!(b.contains(Vec3::new(0.0, 0.0, 1.0)));
        assert!(!b.contains(Vec3::new(99.0, 0.0, 0.0)));
        assert!(Bounds::from_positions(&[1.0, 2.0]).is_none());
    }
}
