use glscene_gl::{GlContext, GpuResources};
use tracing::{debug, info_span, warn};

use crate::error::SceneError;
use crate::graph::SceneGraph;
use crate::transform::{NodeId, Transform};

/// Ordered draw list over a [`SceneGraph`] with an active camera.
#[derive(Debug, Default)]
pub struct Scene {
    pub graph: SceneGraph,
    transforms: Vec<NodeId>,
    active_camera: Option<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node to the draw list. A camera node becomes the active camera.
    /// Returns false for an id the graph does not know.
    pub fn add_transform(&mut self, id: NodeId) -> bool {
        let Some(node) = self.graph.get(id) else {
            warn!(node = %id, "unknown node not added to scene");
            return false;
        };
        if node.is_camera() {
            self.active_camera = Some(id);
            debug!(camera = %id, "active camera set");
        }
        self.transforms.push(id);
        true
    }

    /// Insert into the graph and add to the draw list.
    pub fn spawn(&mut self, transform: Transform) -> NodeId {
        let id = self.graph.insert(transform);
        self.add_transform(id);
        id
    }

    pub fn transforms(&self) -> &[NodeId] {
        &self.transforms
    }

    pub fn active_camera(&self) -> Option<NodeId> {
        self.active_camera
    }

    /// Returns false if `id` is not a camera node.
    pub fn set_active_camera(&mut self, id: NodeId) -> bool {
        match self.graph.get(id) {
            Some(node) if node.is_camera() => {
                self.active_camera = Some(id);
                true
            }
            _ => false,
        }
    }

    /// Update every listed node in insertion order. Mesh bounds are re-read
    /// from `resources` first, so edits to a mesh reach the node's bounds.
    pub fn update(&mut self, resources: &GpuResources) {
        for &id in &self.transforms {
            if let Some(node) = self.graph.get_mut(id) {
                node.refresh_mesh_bounds(resources);
            }
            self.graph.update(id);
        }
    }

    /// Activate `camera` (or the active camera) and draw every listed node
    /// with its view-projection, in insertion order.
    pub fn draw(
        &mut self,
        ctx: &mut dyn GlContext,
        resources: &mut GpuResources,
        camera: Option<NodeId>,
    ) -> Result<(), SceneError> {
        let Some(camera_id) = camera.or(self.active_camera) else {
            warn!("scene draw without a camera");
            return Err(SceneError::NoCamera);
        };
        let _span = info_span!("scene_draw", camera = %camera_id, nodes = self.transforms.len()).entered();

        let Some(cam) = self
            .graph
            .get_mut(camera_id)
            .filter(|node| node.is_camera())
        else {
            warn!(node = %camera_id, "draw camera has no projection");
            return Err(SceneError::NoCamera);
        };
        cam.set_active(ctx, resources);
        let view_projection = cam
            .projection()
            .map(|p| *p.view_projection())
            .ok_or(SceneError::NoCamera)?;

        for &id in &self.transforms {
            self.graph.draw(id, ctx, resources, &view_projection)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProjectionParams;
    use glscene_gl::{
        GlCall, GlError, Mesh, MeshAttribute, POSITION_ATTRIBUTE, RecordingContext, ShaderProgram,
        UniformUpload,
    };
    use glscene_math::Vec3;

    const VS: &str = "attribute vec3 position;\n\
        uniform mat4 u_viewProjectionMatrix;\n\
        uniform mat4 u_modelMatrix;\n\
        void main() {}";
    const FS: &str = "void main() {}";

    fn quad_node(resources: &mut GpuResources, x: f32) -> Transform {
        let mesh = resources.add_mesh(Mesh::new(vec![MeshAttribute::new(
            POSITION_ATTRIBUTE,
            vec![0.0f32; 18],
        )]));
        let program = resources.add_program(ShaderProgram::new(VS, FS));
        let mut t = Transform::with_mesh(mesh, resources.mesh(mesh).unwrap(), program);
        t.set_position(Vec3::new(x, 0.0, 0.0));
        t
    }

    #[test]
    fn draw_without_camera_fails() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let mut scene = Scene::new();
        scene.spawn(Transform::new());
        let err = scene.draw(&mut ctx, &mut resources, None).unwrap_err();
        assert!(matches!(err, SceneError::NoCamera));

        let plain = scene.spawn(Transform::new());
        let err = scene.draw(&mut ctx, &mut resources, Some(plain)).unwrap_err();
        assert!(matches!(err, SceneError::NoCamera));
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn last_added_camera_wins() {
        let mut scene = Scene::new();
        let first = scene.spawn(Transform::camera(ProjectionParams::default()));
        let second = scene.spawn(Transform::camera(ProjectionParams::default()));
        scene.spawn(Transform::new());
        assert_eq!(scene.active_camera(), Some(second));

        assert!(scene.set_active_camera(first));
        assert!(!scene.set_active_camera(NodeId(2)));
        assert_eq!(scene.active_camera(), Some(first));
        assert!(!scene.add_transform(NodeId(99)));
    }

    #[test]
    fn draws_nodes_in_insertion_order() {
        let mut ctx = RecordingContext::with_surface_size(400, 300);
        let mut resources = GpuResources::new();
        let mut scene = Scene::new();
        let mut cam = Transform::camera(ProjectionParams::default());
        cam.set_position(Vec3::new(0.0, 0.0, 5.0));
        scene.spawn(cam);
        let a = scene.spawn(quad_node(&mut resources, -1.0));
        let b = scene.spawn(quad_node(&mut resources, 1.0));

        scene.update(&resources);
        scene.draw(&mut ctx, &mut resources, None).unwrap();

        let models: Vec<[f32; 16]> = ctx
            .calls()
            .iter()
            .filter_map(|c| match c {
                GlCall::Uniform {
                    name,
                    value: UniformUpload::Matrix4(m),
                    ..
                } if name == "u_modelMatrix" => Some(*m),
                _ => None,
            })
            .collect();
        assert_eq!(
            models,
            vec![
                scene.graph.get(a).unwrap().local_to_world().data,
                scene.graph.get(b).unwrap().local_to_world().data,
            ]
        );
        assert_eq!(ctx.count(|c| matches!(c, GlCall::DrawArrays { count: 6, .. })), 2);
        assert_eq!(ctx.calls()[0], GlCall::BindFramebuffer(None));
    }

    #[test]
    fn explicit_camera_overrides_active() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let target = resources.add_framebuffer(32, 32, true, false);

        let mut scene = Scene::new();
        let offscreen = scene.graph.insert(Transform::camera(ProjectionParams {
            target: Some(target),
            ..ProjectionParams::default()
        }));
        scene.spawn(Transform::camera(ProjectionParams::default()));
        scene.update(&resources);
        scene.graph.update(offscreen);

        scene.draw(&mut ctx, &mut resources, Some(offscreen)).unwrap();
        assert!(ctx.calls().contains(&GlCall::Viewport {
            x: 0,
            y: 0,
            width: 32,
            height: 32
        }));
    }

    #[test]
    fn shader_failure_surfaces_as_scene_error() {
        let mut ctx = RecordingContext::new();
        let mut resources = GpuResources::new();
        let mut scene = Scene::new();
        scene.spawn(Transform::camera(ProjectionParams::default()));
        let mut node = quad_node(&mut resources, 0.0);
        node.program = Some(resources.add_program(ShaderProgram::new(VS, "#error broken")));
        scene.spawn(node);

        let err = scene.draw(&mut ctx, &mut resources, None).unwrap_err();
        assert!(matches!(err, SceneError::Gl(GlError::ShaderCompile { .. })));
    }

    #[test]
    fn mesh_edits_reach_node_bounds() {
        let mut resources = GpuResources::new();
        let mesh = resources.add_mesh(Mesh::new(vec![MeshAttribute::new(
            POSITION_ATTRIBUTE,
            vec![-1.0f32, -1.0, -1.0, 1.0, 1.0, 1.0],
        )]));
        let program = resources.add_program(ShaderProgram::new(VS, FS));
        let mut scene = Scene::new();
        let parent = scene.spawn(Transform::new());
        let node = scene.spawn(Transform::with_mesh(mesh, resources.mesh(mesh).unwrap(), program));
        scene.graph.add_child(parent, node);
        scene.update(&resources);
        assert_eq!(scene.graph.get(node).unwrap().bounds().max, Vec3::ONE);

        assert!(resources.mesh_mut(mesh).unwrap().set_attribute_data(
            POSITION_ATTRIBUTE,
            vec![-5.0f32, -5.0, -5.0, 5.0, 5.0, 5.0],
        ));
        scene.update(&resources);

        let bounds = scene.graph.get(node).unwrap().bounds();
        assert_eq!(bounds.min, Vec3::new(-5.0, -5.0, -5.0));
        assert_eq!(bounds.max, Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(scene.graph.get(parent).unwrap().bounds().max, Vec3::new(5.0, 5.0, 5.0));
    }
}
