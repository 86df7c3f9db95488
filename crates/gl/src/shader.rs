//! Shader programs, their uniforms and fixed-function render state.
//!
//! # Invariants
//! - Uniform and attribute locations are looked up once per name and cached,
//!   including misses.
//! - Texture units are handed out from 0 on every `use_program`, in uniform
//!   name order for the program's own uniforms.
//! - Setting a uniform the program does not declare is a silent no-op.

use std::collections::{BTreeMap, HashMap};

use glscene_math::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::constants::{BlendFactor, Capability, CullFace, DepthFunc, ShaderStage};
use crate::context::{GlContext, ProgramHandle, ShaderHandle, UniformLocation, UniformUpload};
use crate::error::GlError;
use crate::resources::TextureId;
use crate::texture::{GpuTexture, Texture};

/// A value that can be assigned to a shader uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    /// Sampled texture; bound to the next free texture unit on upload.
    Texture(TextureId),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        UniformValue::Mat4(m.data)
    }
}

impl From<TextureId> for UniformValue {
    fn from(id: TextureId) -> Self {
        UniformValue::Texture(id)
    }
}

/// Blend, depth and cull state applied when a program is used.
/// `None` disables the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderState {
    pub blend: Option<(BlendFactor, BlendFactor)>,
    pub depth_test: Option<DepthFunc>,
    pub cull_face: Option<CullFace>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            blend: None,
            depth_test: Some(DepthFunc::LEqual),
            cull_face: Some(CullFace::Back),
        }
    }
}

impl RenderState {
    /// Additive `ONE, ONE` blending on top of the defaults.
    pub fn additive() -> Self {
        Self {
            blend: Some((BlendFactor::One, BlendFactor::One)),
            ..Self::default()
        }
    }

    pub fn apply(&self, ctx: &mut dyn GlContext) {
        match self.blend {
            Some((src, dst)) => {
                ctx.enable(Capability::Blend);
                ctx.blend_func(src, dst);
            }
            None => ctx.disable(Capability::Blend),
        }
        match self.depth_test {
            Some(func) => {
                ctx.enable(Capability::DepthTest);
                ctx.depth_func(func);
            }
            None => ctx.disable(Capability::DepthTest),
        }
        match self.cull_face {
            Some(face) => {
                ctx.enable(Capability::CullFace);
                ctx.cull_face(face);
            }
            None => ctx.disable(Capability::CullFace),
        }
    }
}

/// Vertex + fragment program with its own uniform values.
#[derive(Debug)]
pub struct ShaderProgram {
    vertex_source: String,
    fragment_source: String,
    pub uniforms: BTreeMap<String, UniformValue>,
    pub render_state: RenderState,
    vertex_shader: Option<ShaderHandle>,
    fragment_shader: Option<ShaderHandle>,
    program: Option<ProgramHandle>,
    texture_unit: u32,
    uniform_locations: HashMap<String, Option<UniformLocation>>,
    attribute_locations: HashMap<String, Option<u32>>,
}

impl ShaderProgram {
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            uniforms: BTreeMap::new(),
            render_state: RenderState::default(),
            vertex_shader: None,
            fragment_shader: None,
            program: None,
            texture_unit: 0,
            uniform_locations: HashMap::new(),
            attribute_locations: HashMap::new(),
        }
    }

    pub fn with_uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.insert(name.into(), value.into());
        self
    }

    pub fn with_render_state(mut self, state: RenderState) -> Self {
        self.render_state = state;
        self
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn handle(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    /// Compile both stages and link. Fails on the first stage whose compiler
    /// log is non-empty; stages created so far are released.
    pub fn compile(&mut self, ctx: &mut dyn GlContext) -> Result<(), GlError> {
        let vertex = compile_stage(ctx, ShaderStage::Vertex, &self.vertex_source)?;
        let fragment = match compile_stage(ctx, ShaderStage::Fragment, &self.fragment_source) {
            Ok(shader) => shader,
            Err(e) => {
                ctx.delete_shader(vertex);
                return Err(e);
            }
        };

        let program = ctx.create_program();
        ctx.attach_shader(program, vertex);
        ctx.attach_shader(program, fragment);
        ctx.link_program(program);
        debug!(program = program.0, "shader program linked");

        self.vertex_shader = Some(vertex);
        self.fragment_shader = Some(fragment);
        self.program = Some(program);
        self.uniform_locations.clear();
        self.attribute_locations.clear();
        Ok(())
    }

    pub fn attribute_location(&mut self, ctx: &mut dyn GlContext, name: &str) -> Option<u32> {
        let program = self.program?;
        if let Some(&loc) = self.attribute_locations.get(name) {
            return loc;
        }
        let loc = ctx.attrib_location(program, name);
        self.attribute_locations.insert(name.to_owned(), loc);
        loc
    }

    pub fn uniform_location(&mut self, ctx: &mut dyn GlContext, name: &str) -> Option<UniformLocation> {
        let program = self.program?;
        if let Some(&loc) = self.uniform_locations.get(name) {
            return loc;
        }
        let loc = ctx.uniform_location(program, name);
        self.uniform_locations.insert(name.to_owned(), loc);
        loc
    }

    /// Upload one uniform. Texture values activate the texture on the next
    /// free unit; unknown texture ids are skipped.
    pub fn set_uniform(
        &mut self,
        ctx: &mut dyn GlContext,
        textures: &mut [Texture],
        name: &str,
        value: &UniformValue,
    ) {
        let Some(loc) = self.uniform_location(ctx, name) else {
            trace!(name, "uniform not active, skipped");
            return;
        };
        let upload = match value {
            UniformValue::Float(v) => UniformUpload::Float(*v),
            UniformValue::Vec2(v) => UniformUpload::Vec2(*v),
            UniformValue::Vec3(v) => UniformUpload::Vec3(*v),
            UniformValue::Vec4(v) => UniformUpload::Vec4(*v),
            UniformValue::Mat2(m) => UniformUpload::Matrix2(*m),
            UniformValue::Mat3(m) => UniformUpload::Matrix3(*m),
            UniformValue::Mat4(m) => UniformUpload::Matrix4(*m),
            UniformValue::Texture(id) => {
                let Some(texture) = textures.get_mut(id.0) else {
                    return;
                };
                let unit = self.texture_unit;
                texture.set_active(ctx, unit);
                self.texture_unit += 1;
                UniformUpload::Int(unit as i32)
            }
        };
        ctx.uniform(loc, upload);
    }

    /// Bind the program (compiling on first use), upload its own uniforms and
    /// apply its render state.
    pub fn use_program(&mut self, ctx: &mut dyn GlContext, textures: &mut [Texture]) -> Result<(), GlError> {
        self.texture_unit = 0;
        if self.program.is_none() {
            self.compile(ctx)?;
        }
        ctx.use_program(self.program);

        let uniforms = std::mem::take(&mut self.uniforms);
        for (name, value) in &uniforms {
            self.set_uniform(ctx, textures, name, value);
        }
        self.uniforms = uniforms;

        self.render_state.apply(ctx);
        Ok(())
    }

    pub fn dispose(&mut self, ctx: &mut dyn GlContext) {
        if let Some(program) = self.program.take() {
            ctx.delete_program(program);
        }
        for shader in [self.vertex_shader.take(), self.fragment_shader.take()]
            .into_iter()
            .flatten()
        {
            ctx.delete_shader(shader);
        }
        self.uniform_locations.clear();
        self.attribute_locations.clear();
    }
}

fn compile_stage(ctx: &mut dyn GlContext, stage: ShaderStage, source: &str) -> Result<ShaderHandle, GlError> {
    let shader = ctx.create_shader(stage);
    ctx.shader_source(shader, source);
    ctx.compile_shader(shader);
    let log = ctx.shader_info_log(shader);
    if !log.is_empty() {
        ctx.delete_shader(shader);
        return Err(GlError::ShaderCompile {
            stage,
            log,
            shader_source: source.to_owned(),
        });
    }
    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{GlCall, RecordingContext};
    use crate::texture::DataTexture2D;

    const VS: &str = "attribute vec3 position;\n\
        uniform mat4 u_modelMatrix;\n\
        uniform mat4 u_viewProjectionMatrix;\n\
        void main() { gl_Position = u_viewProjectionMatrix * u_modelMatrix * vec4(position, 1.0); }";
    const FS: &str = "precision mediump float;\n\
        uniform sampler2D u_diffuse;\n\
        uniform sampler2D u_detail;\n\
        uniform float u_time;\n\
        void main() { gl_FragColor = texture2D(u_diffuse, vec2(u_time)); }";

    #[test]
    fn compile_failure_reports_stage_and_log() {
        let mut ctx = RecordingContext::new();
        let mut program = ShaderProgram::new(VS, "#error no fragment yet\nvoid main() {}");
        let err = program.compile(&mut ctx).unwrap_err();
        match err {
            GlError::ShaderCompile { stage, log, shader_source } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("no fragment yet"));
                assert!(shader_source.starts_with("#error"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!program.is_compiled());
        assert_eq!(ctx.count(|c| matches!(c, GlCall::DeleteShader(_))), 2);
    }

    #[test]
    fn use_program_uploads_own_uniforms_and_state() {
        let mut ctx = RecordingContext::new();
        let mut program = ShaderProgram::new(VS, FS).with_uniform("u_time", 0.5f32);
        program.use_program(&mut ctx, &mut []).unwrap();

        assert!(program.is_compiled());
        assert_eq!(ctx.last_uniform("u_time"), Some(&UniformUpload::Float(0.5)));
        assert!(ctx.calls().contains(&GlCall::DepthFunc(DepthFunc::LEqual)));
        assert!(ctx.calls().contains(&GlCall::CullFace(CullFace::Back)));
        assert!(ctx.calls().contains(&GlCall::Disable(Capability::Blend)));
    }

    #[test]
    fn unknown_uniform_is_ignored() {
        let mut ctx = RecordingContext::new();
        let mut program = ShaderProgram::new(VS, FS);
        program.compile(&mut ctx).unwrap();
        program.set_uniform(&mut ctx, &mut [], "u_missing", &UniformValue::Float(1.0));
        assert_eq!(ctx.count(|c| matches!(c, GlCall::Uniform { .. })), 0);
    }

    #[test]
    fn textures_get_consecutive_units() {
        let mut ctx = RecordingContext::new();
        let mut textures = vec![
            Texture::from(DataTexture2D::new(Some(vec![0; 4]), 1, 1)),
            Texture::from(DataTexture2D::new(Some(vec![0; 4]), 1, 1)),
        ];
        let mut program = ShaderProgram::new(VS, FS)
            .with_uniform("u_diffuse", TextureId(0))
            .with_uniform("u_detail", TextureId(1));

        program.use_program(&mut ctx, &mut textures).unwrap();
        // BTreeMap order: u_detail before u_diffuse
        assert_eq!(ctx.last_uniform("u_detail"), Some(&UniformUpload::Int(0)));
        assert_eq!(ctx.last_uniform("u_diffuse"), Some(&UniformUpload::Int(1)));

        // unit counter restarts on every use
        program.use_program(&mut ctx, &mut textures).unwrap();
        assert_eq!(ctx.last_uniform("u_detail"), Some(&UniformUpload::Int(0)));
        assert_eq!(ctx.count(|c| matches!(c, GlCall::CreateProgram(_))), 1);
    }

    #[test]
    fn missing_texture_id_skips_upload() {
        let mut ctx = RecordingContext::new();
        let mut program = ShaderProgram::new(VS, FS).with_uniform("u_diffuse", TextureId(7));
        program.use_program(&mut ctx, &mut []).unwrap();
        assert!(ctx.last_uniform("u_diffuse").is_none());
    }

    #[test]
    fn blend_state_applied() {
        let mut ctx = RecordingContext::new();
        let mut program = ShaderProgram::new(VS, FS).with_render_state(RenderState {
            blend: Some((BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)),
            depth_test: None,
            cull_face: None,
        });
        program.use_program(&mut ctx, &mut []).unwrap();
        assert!(ctx.calls().contains(&GlCall::Enable(Capability::Blend)));
        assert!(ctx.calls().contains(&GlCall::BlendFunc(
            BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha
        )));
        assert!(ctx.calls().contains(&GlCall::Disable(Capability::DepthTest)));
        assert!(ctx.calls().contains(&GlCall::Disable(Capability::CullFace)));
    }

    #[test]
    fn attribute_misses_are_cached() {
        let mut ctx = RecordingContext::new();
        let mut program = ShaderProgram::new(VS, FS);
        assert_eq!(program.attribute_location(&mut ctx, "position"), None);
        program.compile(&mut ctx).unwrap();
        assert_eq!(program.attribute_location(&mut ctx, "position"), Some(0));
        assert_eq!(program.attribute_location(&mut ctx, "uv"), None);
        assert_eq!(program.attribute_location(&mut ctx, "uv"), None);
    }

    #[test]
    fn render_state_serde_defaults() {
        let state: RenderState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, RenderState::default());
        let additive: RenderState =
            serde_json::from_str(r#"{"blend":["ONE","ONE"]}"#).unwrap();
        assert_eq!(additive, RenderState::additive());
    }
}
