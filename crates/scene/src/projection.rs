//! Camera projection state carried by a camera node.
//!
//! # Invariants
//! - Every parameter setter marks the projection dirty; `set_width` and
//!   `set_height` only when the value actually changes.
//! - The dirty flag is independent of the owning node's matrix flag.

use glscene_gl::FramebufferId;
use glscene_math::Mat4;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Camera construction parameters.
///
/// `fov` is the vertical field of view in degrees. A `far` of
/// `f32::INFINITY` selects a projection without a far plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    /// Render target; `None` renders to the default framebuffer.
    pub target: Option<FramebufferId>,
    pub width: u32,
    pub height: u32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub perspective: bool,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            target: None,
            width: 100,
            height: 100,
            fov: 90.0,
            near: 0.1,
            far: 1000.0,
            left: -100.0,
            right: 100.0,
            bottom: -100.0,
            top: 100.0,
            perspective: true,
        }
    }
}

impl ProjectionParams {
    /// Orthographic box with the default near/far planes.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            perspective: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    params: ProjectionParams,
    projection_matrix: Mat4,
    view_projection: Mat4,
    inverse_view_projection: Mat4,
    needs_update: bool,
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(ProjectionParams::default())
    }
}

impl Projection {
    pub fn new(params: ProjectionParams) -> Self {
        Self {
            params,
            projection_matrix: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            inverse_view_projection: Mat4::IDENTITY,
            needs_update: true,
        }
    }

    pub fn params(&self) -> &ProjectionParams {
        &self.params
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    pub fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }

    pub fn inverse_view_projection(&self) -> &Mat4 {
        &self.inverse_view_projection
    }

    pub fn target(&self) -> Option<FramebufferId> {
        self.params.target
    }

    pub fn width(&self) -> u32 {
        self.params.width
    }

    pub fn height(&self) -> u32 {
        self.params.height
    }

    /// `width / height`; a zero height counts as one pixel.
    pub fn aspect(&self) -> f32 {
        self.params.width as f32 / self.params.height.max(1) as f32
    }

    /// Width and height are resolved from the target at activation.
    pub fn set_target(&mut self, target: Option<FramebufferId>) {
        self.params.target = target;
    }

    pub fn set_width(&mut self, width: u32) {
        if width != self.params.width {
            self.params.width = width;
            self.needs_update = true;
        }
    }

    pub fn set_height(&mut self, height: u32) {
        if height != self.params.height {
            self.params.height = height;
            self.needs_update = true;
        }
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.params.fov = fov;
        self.needs_update = true;
    }

    pub fn set_near(&mut self, near: f32) {
        self.params.near = near;
        self.needs_update = true;
    }

    pub fn set_far(&mut self, far: f32) {
        self.params.far = far;
        self.needs_update = true;
    }

    pub fn set_left(&mut self, left: f32) {
        self.params.left = left;
        self.needs_update = true;
    }

    pub fn set_right(&mut self, right: f32) {
        self.params.right = right;
        self.needs_update = true;
    }

    pub fn set_bottom(&mut self, bottom: f32) {
        self.params.bottom = bottom;
        self.needs_update = true;
    }

    pub fn set_top(&mut self, top: f32) {
        self.params.top = top;
        self.needs_update = true;
    }

    pub fn set_perspective(&mut self, perspective: bool) {
        self.params.perspective = perspective;
        self.needs_update = true;
    }

    /// Rebuild the projection matrix, then the view-projection against
    /// `world_to_local` of the camera node.
    pub fn update_projection_matrix(&mut self, world_to_local: &Mat4) {
        let aspect = self.aspect();
        let p = &self.params;
        if p.perspective {
            self.projection_matrix
                .perspective(p.fov.to_radians(), aspect, p.near, Some(p.far));
        } else {
            self.projection_matrix
                .orthogonal(p.left, p.right, p.bottom, p.top, p.near, p.far);
        }
        trace!(perspective = p.perspective, "projection matrix updated");
        self.update_view_projection_matrix(world_to_local);
        self.needs_update = false;
    }

    /// `view_projection` applies `world_to_local` first, then the projection.
    pub fn update_view_projection_matrix(&mut self, world_to_local: &Mat4) {
        self.view_projection.copy(world_to_local);
        self.view_projection.multiply(&self.projection_matrix);
        self.inverse_view_projection.copy(&self.view_projection);
        self.inverse_view_projection.invert();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glscene_math::{Vec3, approx_eq};

    #[test]
    fn defaults() {
        let p = Projection::default();
        assert!(p.needs_update());
        assert_eq!(p.params().fov, 90.0);
        assert_eq!((p.width(), p.height()), (100, 100));
        assert!(p.params().perspective);
        assert_eq!((p.params().bottom, p.params().top), (-100.0, 100.0));
        assert_eq!((p.params().left, p.params().right), (-100.0, 100.0));
    }

    #[test]
    fn size_setters_only_dirty_on_change() {
        let mut p = Projection::default();
        p.update_projection_matrix(&Mat4::IDENTITY);
        p.set_width(100);
        p.set_height(100);
        assert!(!p.needs_update());
        p.set_height(50);
        assert!(p.needs_update());
        assert_eq!(p.aspect(), 2.0);
    }

    #[test]
    fn every_parameter_setter_marks_dirty() {
        let setters: [fn(&mut Projection); 8] = [
            |p| p.set_fov(60.0),
            |p| p.set_near(1.0),
            |p| p.set_far(10.0),
            |p| p.set_left(-1.0),
            |p| p.set_right(1.0),
            |p| p.set_bottom(-1.0),
            |p| p.set_top(1.0),
            |p| p.set_perspective(false),
        ];
        for set in setters {
            let mut p = Projection::default();
            p.update_projection_matrix(&Mat4::IDENTITY);
            set(&mut p);
            assert!(p.needs_update());
        }
    }

    #[test]
    fn orthographic_maps_box_to_ndc() {
        let mut p = Projection::new(ProjectionParams {
            near: 0.0,
            far: 10.0,
            ..ProjectionParams::orthographic(-2.0, 2.0, -1.0, 1.0)
        });
        p.update_projection_matrix(&Mat4::IDENTITY);
        let corner = Vec3::new(2.0, 1.0, 0.0).transformed(p.view_projection());
        assert!(approx_eq(corner.x, 1.0, 1e-6));
        assert!(approx_eq(corner.y, 1.0, 1e-6));
        assert!(approx_eq(corner.z, -1.0, 1e-6));
    }

    #[test]
    fn view_projection_inverse_round_trips() {
        let mut view = Mat4::from_trs(Vec3::new(0.0, 0.0, 5.0), Default::default(), Vec3::ONE);
        view.invert();
        let mut p = Projection::default();
        p.update_projection_matrix(&view);

        let world = Vec3::new(0.5, -0.25, -3.0);
        let ndc = world.transformed(p.view_projection());
        let back = ndc.transformed(p.inverse_view_projection());
        assert!(approx_eq(back.x, world.x, 1e-3));
        assert!(approx_eq(back.y, world.y, 1e-3));
        assert!(approx_eq(back.z, world.z, 1e-3));
    }

    #[test]
    fn infinite_far_plane_is_finite_matrix() {
        let mut p = Projection::new(ProjectionParams {
            far: f32::INFINITY,
            ..ProjectionParams::default()
        });
        p.update_projection_matrix(&Mat4::IDENTITY);
        assert!(p.projection_matrix().data.iter().all(|v| v.is_finite()));
        assert_eq!(p.projection_matrix().data[10], -1.0);
    }

    #[test]
    fn params_from_partial_json() {
        let params: ProjectionParams =
            serde_json::from_str(r#"{"width": 640, "height": 480, "perspective": false}"#).unwrap();
        assert_eq!(params.width, 640);
        assert!(!params.perspective);
        assert_eq!(params.near, 0.1);
    }
}
