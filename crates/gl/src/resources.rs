//! Owning store for GPU resources, addressed by typed ids.
//!
//! Scene nodes refer to meshes, programs and textures by id so that one
//! resource can be shared by many nodes. Operations on unknown ids are no-ops.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::context::GlContext;
use crate::error::GlError;
use crate::framebuffer::Framebuffer2D;
use crate::mesh::Mesh;
use crate::shader::{ShaderProgram, UniformValue};
use crate::texture::{DataTexture2D, GpuTexture, Texture, TextureParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FramebufferId(pub usize);

#[derive(Debug, Default)]
pub struct GpuResources {
    meshes: Vec<Mesh>,
    programs: Vec<ShaderProgram>,
    textures: Vec<Texture>,
    framebuffers: Vec<Framebuffer2D>,
}

impl GpuResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_program(&mut self, program: ShaderProgram) -> ProgramId {
        self.programs.push(program);
        ProgramId(self.programs.len() - 1)
    }

    pub fn add_texture(&mut self, texture: impl Into<Texture>) -> TextureId {
        self.textures.push(texture.into());
        TextureId(self.textures.len() - 1)
    }

    /// Register a framebuffer, plus its color texture when `use_color` is set.
    pub fn add_framebuffer(&mut self, width: u32, height: u32, use_color: bool, use_depth: bool) -> FramebufferId {
        let color = use_color.then(|| {
            self.add_texture(DataTexture2D::with_params(
                None,
                width,
                height,
                TextureParams::render_target(),
            ))
        });
        self.framebuffers
            .push(Framebuffer2D::new(width, height, color, use_depth));
        FramebufferId(self.framebuffers.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id.0)
    }

    pub fn program(&self, id: ProgramId) -> Option<&ShaderProgram> {
        self.programs.get(id.0)
    }

    pub fn program_mut(&mut self, id: ProgramId) -> Option<&mut ShaderProgram> {
        self.programs.get_mut(id.0)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0)
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.get_mut(id.0)
    }

    pub fn framebuffer(&self, id: FramebufferId) -> Option<&Framebuffer2D> {
        self.framebuffers.get(id.0)
    }

    pub fn framebuffer_mut(&mut self, id: FramebufferId) -> Option<&mut Framebuffer2D> {
        self.framebuffers.get_mut(id.0)
    }

    pub fn framebuffer_size(&self, id: FramebufferId) -> Option<(u32, u32)> {
        self.framebuffer(id).map(|fb| (fb.width(), fb.height()))
    }

    /// Bind a program and upload its own uniforms. Returns `Ok(false)` for an
    /// unknown id.
    pub fn use_program(&mut self, ctx: &mut dyn GlContext, id: ProgramId) -> Result<bool, GlError> {
        let Some(program) = self.programs.get_mut(id.0) else {
            return Ok(false);
        };
        program.use_program(ctx, &mut self.textures)?;
        Ok(true)
    }

    pub fn set_uniform(&mut self, ctx: &mut dyn GlContext, id: ProgramId, name: &str, value: &UniformValue) {
        if let Some(program) = self.programs.get_mut(id.0) {
            program.set_uniform(ctx, &mut self.textures, name, value);
        }
    }

    /// Draw `mesh` with `program`, which must already be in use.
    pub fn draw_mesh(&mut self, ctx: &mut dyn GlContext, mesh: MeshId, program: ProgramId) {
        let (Some(mesh), Some(program)) = (self.meshes.get_mut(mesh.0), self.programs.get_mut(program.0)) else {
            trace!(?mesh, ?program, "draw skipped, unknown resource");
            return;
        };
        mesh.draw(ctx, program);
    }

    /// Bind a framebuffer as the render target. Returns false for an unknown id.
    pub fn activate_framebuffer(&mut self, ctx: &mut dyn GlContext, id: FramebufferId) -> bool {
        let Some(fb) = self.framebuffers.get_mut(id.0) else {
            return false;
        };
        let color = match fb.color_texture().and_then(|t| self.textures.get_mut(t.0)) {
            Some(Texture::Data(tex)) => Some(tex),
            _ => None,
        };
        fb.set_active(ctx, color);
        true
    }

    /// Release every GL object held by the store. Resources stay registered
    /// and are recreated on next use.
    pub fn dispose_all(&mut self, ctx: &mut dyn GlContext) {
        debug!(
            meshes = self.meshes.len(),
            programs = self.programs.len(),
            textures = self.textures.len(),
            framebuffers = self.framebuffers.len(),
            "disposing gpu resources"
        );
        for mesh in &mut self.meshes {
            mesh.dispose(ctx);
        }
        for program in &mut self.programs {
            program.dispose(ctx);
        }
        for texture in &mut self.textures {
            texture.dispose(ctx);
        }
        for fb in &mut self.framebuffers {
            fb.dispose(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Attachment;
    use crate::mesh::{MeshAttribute, POSITION_ATTRIBUTE};
    use crate::recording::{GlCall, RecordingContext};

    const VS: &str = "attribute vec3 position;\nuniform mat4 u_modelMatrix;\nvoid main() {}";
    const FS: &str = "uniform sampler2D u_scene;\nvoid main() {}";

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut ctx = RecordingContext::new();
        let mut res = GpuResources::new();
        assert!(!res.use_program(&mut ctx, ProgramId(3)).unwrap());
        res.set_uniform(&mut ctx, ProgramId(3), "u_modelMatrix", &UniformValue::Float(1.0));
        res.draw_mesh(&mut ctx, MeshId(0), ProgramId(0));
        assert!(!res.activate_framebuffer(&mut ctx, FramebufferId(0)));
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn render_to_texture_then_sample_it() {
        let mut ctx = RecordingContext::new();
        let mut res = GpuResources::new();
        let fb = res.add_framebuffer(64, 32, true, true);
        let color = res.framebuffer(fb).and_then(Framebuffer2D::color_texture).unwrap();
        let program = res.add_program(ShaderProgram::new(VS, FS).with_uniform("u_scene", color));

        assert!(res.activate_framebuffer(&mut ctx, fb));
        let handle = res.texture(color).and_then(|t| t.handle()).unwrap();
        assert!(ctx
            .calls()
            .contains(&GlCall::FramebufferTexture2D(Attachment::Color0, handle)));

        assert!(res.use_program(&mut ctx, program).unwrap());
        assert!(ctx.calls().contains(&GlCall::BindTexture(Some(handle))));
        assert_eq!(res.framebuffer_size(fb), Some((64, 32)));
    }

    #[test]
    fn draw_mesh_and_dispose_all() {
        let mut ctx = RecordingContext::new();
        let mut res = GpuResources::new();
        let mesh = res.add_mesh(Mesh::new(vec![MeshAttribute::new(
            POSITION_ATTRIBUTE,
            vec![0.0f32; 9],
        )]));
        let program = res.add_program(ShaderProgram::new(VS, FS));

        res.use_program(&mut ctx, program).unwrap();
        res.draw_mesh(&mut ctx, mesh, program);
        assert_eq!(ctx.count(|c| matches!(c, GlCall::DrawArrays { count: 3, .. })), 1);

        res.dispose_all(&mut ctx);
        assert_eq!(ctx.count(|c| matches!(c, GlCall::DeleteBuffer(_))), 1);
        assert_eq!(ctx.count(|c| matches!(c, GlCall::DeleteProgram(_))), 1);
        assert_eq!(ctx.count(|c| matches!(c, GlCall::DeleteShader(_))), 2);
        assert!(!res.program(program).unwrap().is_compiled());
    }
}
