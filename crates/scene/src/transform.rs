//! Scene graph node: local TRS, cached world matrices and draw bindings.
//!
//! # Invariants
//! - Local-state setters mark the node dirty; the cached matrices are only
//!   recomputed by [`crate::SceneGraph::update_matrix`].
//! - `parent` and `children` are maintained by the graph; a node is listed in
//!   at most one parent's children.
//! - Hooks are taken out of the node while they run, so a hook cannot re-enter
//!   itself.

use std::collections::BTreeMap;
use std::fmt;

use glscene_gl::{ClearMask, GlContext, GlError, GpuResources, Mesh, MeshId, ProgramId, UniformValue};
use glscene_math::{Bounds, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::projection::{Projection, ProjectionParams};

/// Index of a node in its [`crate::SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Uniform carrying the camera's view-projection matrix.
pub const VIEW_PROJECTION_UNIFORM: &str = "u_viewProjectionMatrix";
/// Uniform carrying the node's world matrix.
pub const MODEL_UNIFORM: &str = "u_modelMatrix";

pub type UpdateHook = Box<dyn FnMut(&mut Transform)>;
pub type DrawHook = Box<dyn FnMut(&mut Transform, &mut dyn GlContext)>;

pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    pub(crate) local_to_world: Mat4,
    pub(crate) world_to_local: Mat4,
    pub(crate) bounds: Bounds,
    pub(crate) mesh_bounds: Option<Bounds>,
    pub(crate) matrix_needs_update: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    mesh: Option<MeshId>,
    pub program: Option<ProgramId>,
    /// Per-instance uniform overrides, uploaded after the program's own.
    pub uniforms: BTreeMap<String, UniformValue>,
    pub visible: bool,
    on_update: Option<UpdateHook>,
    on_before_draw: Option<DrawHook>,
    pub(crate) camera: Option<Projection>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_to_world: Mat4::IDENTITY,
            world_to_local: Mat4::IDENTITY,
            bounds: Bounds::default(),
            mesh_bounds: None,
            matrix_needs_update: true,
            parent: None,
            children: Vec::new(),
            mesh: None,
            program: None,
            uniforms: BTreeMap::new(),
            visible: true,
            on_update: None,
            on_before_draw: None,
            camera: None,
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("scale", &self.scale)
            .field("matrix_needs_update", &self.matrix_needs_update)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("mesh", &self.mesh)
            .field("program", &self.program)
            .field("visible", &self.visible)
            .field("camera", &self.camera.is_some())
            .finish_non_exhaustive()
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node drawing `mesh` with `program`. The mesh's local bounds are copied
    /// until [`Transform::refresh_mesh_bounds`] re-reads them.
    pub fn with_mesh(mesh_id: MeshId, mesh: &Mesh, program: ProgramId) -> Self {
        let mut t = Self::default();
        t.set_mesh(mesh_id, mesh);
        t.program = Some(program);
        t
    }

    pub fn camera(params: ProjectionParams) -> Self {
        Self {
            camera: Some(Projection::new(params)),
            ..Self::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.matrix_needs_update = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.matrix_needs_update = true;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.matrix_needs_update = true;
    }

    pub fn rotate_x(&mut self, rad: f32) {
        self.rotation.rotate_x(rad);
        self.matrix_needs_update = true;
    }

    pub fn rotate_y(&mut self, rad: f32) {
        self.rotation.rotate_y(rad);
        self.matrix_needs_update = true;
    }

    pub fn rotate_z(&mut self, rad: f32) {
        self.rotation.rotate_z(rad);
        self.matrix_needs_update = true;
    }

    pub fn local_to_world(&self) -> &Mat4 {
        &self.local_to_world
    }

    pub fn world_to_local(&self) -> &Mat4 {
        &self.world_to_local
    }

    /// World-space bounds as of the last matrix update.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn matrix_needs_update(&self) -> bool {
        self.matrix_needs_update
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    pub fn set_mesh(&mut self, id: MeshId, mesh: &Mesh) {
        self.mesh = Some(id);
        self.mesh_bounds = Some(*mesh.bounds());
        self.matrix_needs_update = true;
    }

    pub fn clear_mesh(&mut self) {
        self.mesh = None;
        self.mesh_bounds = None;
        self.matrix_needs_update = true;
    }

    /// Re-read the bound mesh's local bounds from `resources`. Marks the node
    /// dirty and returns true when they changed.
    pub fn refresh_mesh_bounds(&mut self, resources: &GpuResources) -> bool {
        let Some(fresh) = self.mesh.and_then(|id| resources.mesh(id)).map(|m| *m.bounds()) else {
            return false;
        };
        if self.mesh_bounds == Some(fresh) {
            return false;
        }
        self.mesh_bounds = Some(fresh);
        self.matrix_needs_update = true;
        trace!("mesh bounds refreshed");
        true
    }

    pub fn set_uniform(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        self.uniforms.insert(name.into(), value.into());
    }

    /// Runs at the start of every `update`, before the matrix refresh.
    pub fn set_on_update(&mut self, hook: impl FnMut(&mut Transform) + 'static) {
        self.on_update = Some(Box::new(hook));
    }

    /// Runs right before the node binds its program in `draw`.
    pub fn set_on_before_draw(&mut self, hook: impl FnMut(&mut Transform, &mut dyn GlContext) + 'static) {
        self.on_before_draw = Some(Box::new(hook));
    }

    pub(crate) fn run_on_update(&mut self) {
        if let Some(mut hook) = self.on_update.take() {
            hook(self);
            if self.on_update.is_none() {
                self.on_update = Some(hook);
            }
        }
    }

    fn run_on_before_draw(&mut self, ctx: &mut dyn GlContext) {
        if let Some(mut hook) = self.on_before_draw.take() {
            hook(self, ctx);
            if self.on_before_draw.is_none() {
                self.on_before_draw = Some(hook);
            }
        }
    }

    /// Recompute the world matrices from local TRS and the parent's world
    /// matrix. A singular world matrix keeps the previous inverse.
    pub(crate) fn recompute_matrices(&mut self, parent_world: Option<&Mat4>) {
        self.local_to_world
            .trs(self.position, self.rotation, self.scale);
        if let Some(parent) = parent_world {
            self.local_to_world.multiply(parent);
        }
        if let Some(inverse) = self.local_to_world.inverse() {
            self.world_to_local = inverse;
        }
    }

    /// Draw the node's mesh with its program. Nodes that are hidden or lack a
    /// mesh or program draw nothing.
    pub fn draw(
        &mut self,
        ctx: &mut dyn GlContext,
        resources: &mut GpuResources,
        view_projection: &Mat4,
    ) -> Result<(), GlError> {
        if !self.visible {
            return Ok(());
        }
        let (Some(mesh), Some(program)) = (self.mesh, self.program) else {
            return Ok(());
        };
        self.run_on_before_draw(ctx);
        if !resources.use_program(ctx, program)? {
            return Ok(());
        }
        resources.set_uniform(ctx, program, VIEW_PROJECTION_UNIFORM, &UniformValue::from(*view_projection));
        resources.set_uniform(ctx, program, MODEL_UNIFORM, &UniformValue::from(self.local_to_world));
        for (name, value) in &self.uniforms {
            resources.set_uniform(ctx, program, name, value);
        }
        resources.draw_mesh(ctx, mesh, program);
        Ok(())
    }

    // camera

    pub fn is_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.camera.as_ref()
    }

    pub fn projection_mut(&mut self) -> Option<&mut Projection> {
        self.camera.as_mut()
    }

    /// Rebuild the camera's projection and view-projection. Returns false if
    /// the node is not a camera.
    pub fn update_projection_matrix(&mut self) -> bool {
        let world_to_local = self.world_to_local;
        match self.camera.as_mut() {
            Some(projection) => {
                projection.update_projection_matrix(&world_to_local);
                true
            }
            None => false,
        }
    }

    /// Rebuild the camera's view-projection from the current world matrix.
    pub fn update_view_projection_matrix(&mut self) -> bool {
        let world_to_local = self.world_to_local;
        match self.camera.as_mut() {
            Some(projection) => {
                projection.update_view_projection_matrix(&world_to_local);
                true
            }
            None => false,
        }
    }

    /// Begin a frame with this camera: size the projection to the render
    /// target, refresh it if dirty, bind the target and clear color and depth.
    /// Returns false if the node is not a camera.
    pub fn set_active(&mut self, ctx: &mut dyn GlContext, resources: &mut GpuResources) -> bool {
        let world_to_local = self.world_to_local;
        let Some(projection) = self.camera.as_mut() else {
            return false;
        };
        let target = projection
            .target()
            .and_then(|t| resources.framebuffer_size(t).map(|size| (t, size)));
        let (width, height) = match target {
            Some((_, size)) => size,
            None => ctx.drawing_buffer_size(),
        };
        projection.set_width(width);
        projection.set_height(height);
        if projection.needs_update() {
            projection.update_projection_matrix(&world_to_local);
        }

        match target {
            Some((id, _)) => {
                resources.activate_framebuffer(ctx, id);
            }
            None => {
                ctx.bind_framebuffer(None);
                ctx.viewport(0, 0, width, height);
            }
        }
        ctx.clear(ClearMask::COLOR_DEPTH);
        trace!(width, height, "camera active");
        true
    }

    /// Map a pixel coordinate (y down, z kept) through the camera's
    /// normalized screen space into world space.
    pub fn screen_to_world(&self, point: Vec3) -> Option<Vec3> {
        let projection = self.camera.as_ref()?;
        let width = projection.width().max(1) as f32;
        let height = projection.height().max(1) as f32;
        let mut x = point.x / width * 2.0 - 1.0;
        let y = -(point.y / height * 2.0 - 1.0);
        x *= projection.aspect();
        Some(Vec3::new(x, y, point.z).transformed(&self.local_to_world))
    }

    /// Project a world-space point to pixel coordinates (y down). `z` holds the
    /// normalized device depth.
    pub fn world_to_screen(&self, point: Vec3) -> Option<Vec3> {
        let projection = self.camera.as_ref()?;
        let ndc = point.transformed(projection.view_projection());
        let width = projection.width() as f32;
        let height = projection.height() as f32;
        Some(Vec3::new(
            (ndc.x + 1.0) * 0.5 * width,
            (1.0 - ndc.y) * 0.5 * height,
            ndc.z,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glscene_gl::{
        GlCall, MeshAttribute, POSITION_ATTRIBUTE, RecordingContext, ShaderProgram, UniformUpload,
    };
    use glscene_math::approx_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    const VS: &str = "attribute vec3 position;\n\
        uniform mat4 u_viewProjectionMatrix;\n\
        uniform mat4 u_modelMatrix;\n\
        uniform float u_fade;\n\
        void main() {}";
    const FS: &str = "void main() {}";

    fn drawable(resources: &mut GpuResources) -> Transform {
        let mesh = Mesh::new(vec![MeshAttribute::new(POSITION_ATTRIBUTE, vec![0.0f32; 9])]);
        let program = resources.add_program(ShaderProgram::new(VS, FS));
        let mesh_id = resources.add_mesh(mesh);
        let mesh = resources.mesh(mesh_id).unwrap();
        Transform::with_mesh(mesh_id, mesh, program)
    }

    #[test]
    fn setters_mark_dirty() {
        let mut t = Transform::new();
        t.matrix_needs_update = false;
        t.set_position(Vec3::X);
        assert!(t.matrix_needs_update());

        t.matrix_needs_update = false;
        t.rotate_y(0.5);
        assert!(t.matrix_needs_update());

        t.matrix_needs_update = false;
        t.set_scale(Vec3::ONE * 2.0);
        assert!(t.matrix_needs_update());
    }

    #[test]
    fn singular_world_keeps_previous_inverse() {
        let mut t = Transform::new();
        t.set_position(Vec3::new(1.0, 0.0, 0.0));
        t.recompute_matrices(None);
        let before = t.world_to_local;

        t.set_scale(Vec3::ZERO);
        t.recompute_matrices(None);
        assert_eq!(t.local_to_world.determinant(), 0.0);
        assert_eq!(t.world_to_local, before);
    }

    #[test]
    fn draw_uploads_matrices_and_overrides() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let mut t = drawable(&mut resources);
        t.set_position(Vec3::new(3.0, 0.0, 0.0));
        t.recompute_matrices(None);
        t.set_uniform("u_fade", 0.25f32);

        let vp = Mat4::from_trs(Vec3::new(0.0, 0.0, -1.0), Quat::IDENTITY, Vec3::ONE);
        t.draw(&mut ctx, &mut resources, &vp).unwrap();

        assert_eq!(
            ctx.last_uniform(VIEW_PROJECTION_UNIFORM),
            Some(&UniformUpload::Matrix4(vp.data))
        );
        assert_eq!(
            ctx.last_uniform(MODEL_UNIFORM),
            Some(&UniformUpload::Matrix4(t.local_to_world().data))
        );
        assert_eq!(ctx.last_uniform("u_fade"), Some(&UniformUpload::Float(0.25)));
        assert_eq!(ctx.count(|c| matches!(c, GlCall::DrawArrays { .. })), 1);
    }

    #[test]
    fn hidden_or_unbound_nodes_skip_draw() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let mut t = drawable(&mut resources);
        t.visible = false;
        t.draw(&mut ctx, &mut resources, &Mat4::IDENTITY).unwrap();

        let mut bare = Transform::new();
        bare.draw(&mut ctx, &mut resources, &Mat4::IDENTITY).unwrap();
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn before_draw_hook_runs_each_draw() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let mut t = drawable(&mut resources);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        t.set_on_before_draw(move |node, _ctx| {
            seen.set(seen.get() + 1);
            node.set_uniform("u_fade", seen.get() as f32);
        });

        t.draw(&mut ctx, &mut resources, &Mat4::IDENTITY).unwrap();
        t.draw(&mut ctx, &mut resources, &Mat4::IDENTITY).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(ctx.last_uniform("u_fade"), Some(&UniformUpload::Float(2.0)));
    }

    #[test]
    fn shader_errors_propagate_from_draw() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let mut t = drawable(&mut resources);
        let bad = resources.add_program(ShaderProgram::new("#error nope", FS));
        t.program = Some(bad);
        let err = t.draw(&mut ctx, &mut resources, &Mat4::IDENTITY).unwrap_err();
        assert!(matches!(err, GlError::ShaderCompile { .. }));
    }

    #[test]
    fn set_active_sizes_to_surface_and_clears() {
        let mut ctx = RecordingContext::with_surface_size(640, 480);
        let mut resources = GpuResources::new();
        let mut cam = Transform::camera(ProjectionParams::default());
        assert!(cam.set_active(&mut ctx, &mut resources));

        let projection = cam.projection().unwrap();
        assert_eq!((projection.width(), projection.height()), (640, 480));
        assert!(!projection.needs_update());
        assert_eq!(
            ctx.calls(),
            &[
                GlCall::BindFramebuffer(None),
                GlCall::Viewport {
                    x: 0,
                    y: 0,
                    width: 640,
                    height: 480
                },
                GlCall::Clear(ClearMask::COLOR_DEPTH),
            ]
        );
        assert!(!Transform::new().set_active(&mut ctx, &mut resources));
    }

    #[test]
    fn set_active_renders_into_target() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let fb = resources.add_framebuffer(128, 64, true, true);
        let mut cam = Transform::camera(ProjectionParams {
            target: Some(fb),
            ..ProjectionParams::default()
        });
        cam.set_active(&mut ctx, &mut resources);

        assert_eq!(cam.projection().unwrap().aspect(), 2.0);
        assert!(ctx.calls().contains(&GlCall::Viewport {
            x: 0,
            y: 0,
            width: 128,
            height: 64
        }));
        assert!(!ctx.calls().contains(&GlCall::BindFramebuffer(None)));
    }

    #[test]
    fn screen_to_world_center_and_corner() {
        let mut cam = Transform::camera(ProjectionParams {
            width: 200,
            height: 100,
            ..ProjectionParams::default()
        });
        cam.set_position(Vec3::new(10.0, 0.0, 0.0));
        cam.recompute_matrices(None);

        let center = cam.screen_to_world(Vec3::new(100.0, 50.0, -1.0)).unwrap();
        assert_eq!(center, Vec3::new(10.0, 0.0, -1.0));

        // top-left pixel: y flipped, x scaled by aspect 2
        let corner = cam.screen_to_world(Vec3::new(0.0, 0.0, 0.0)).unwrap();
        assert!(approx_eq(corner.x, 8.0, 1e-6));
        assert!(approx_eq(corner.y, 1.0, 1e-6));
        assert!(Transform::new().screen_to_world(Vec3::ZERO).is_none());
    }

    #[test]
    fn world_to_screen_of_look_target_is_center() {
        let mut ctx = RecordingContext::with_surface_size(300, 200);
        let mut resources = GpuResources::new();
        let mut cam = Transform::camera(ProjectionParams::default());
        cam.set_position(Vec3::new(0.0, 0.0, 10.0));
        cam.recompute_matrices(None);
        cam.set_active(&mut ctx, &mut resources);

        let screen = cam.world_to_screen(Vec3::ZERO).unwrap();
        assert!(approx_eq(screen.x, 150.0, 1e-3));
        assert!(approx_eq(screen.y, 100.0, 1e-3));
    }

    #[test]
    fn orthographic_camera_matches_closed_form() {
        let mut cam = Transform::camera(ProjectionParams {
            near: 0.1,
            far: 100.0,
            ..ProjectionParams::orthographic(-10.0, 10.0, -10.0, 10.0)
        });
        assert!(cam.update_projection_matrix());

        let mut expected = Mat4::IDENTITY;
        expected.orthogonal(-10.0, 10.0, -10.0, 10.0, 0.1, 100.0);
        let projection = cam.projection().unwrap();
        assert_eq!(*projection.projection_matrix(), expected);
        assert_eq!(*projection.view_projection(), expected);
    }

    #[test]
    fn refresh_mesh_bounds_tracks_mesh_edits() {
        let mut resources = GpuResources::new();
        let mut t = drawable(&mut resources);
        let mesh = t.mesh().unwrap();
        t.matrix_needs_update = false;
        assert!(!t.refresh_mesh_bounds(&resources));
        assert!(!t.matrix_needs_update());

        resources
            .mesh_mut(mesh)
            .unwrap()
            .set_attribute_data(POSITION_ATTRIBUTE, vec![0.0f32, 0.0, 0.0, 2.0, 3.0, 4.0]);
        assert!(t.refresh_mesh_bounds(&resources));
        assert!(t.matrix_needs_update());
        assert_eq!(t.mesh_bounds.unwrap().max, Vec3::new(2.0, 3.0, 4.0));
        assert!(!Transform::new().refresh_mesh_bounds(&resources));
    }
}
