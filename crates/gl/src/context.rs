//! The seam between resource wrappers and a concrete graphics backend.
//!
//! Everything in this crate talks to the GPU through `&mut dyn GlContext`.
//! A browser build forwards each call to `WebGLRenderingContext`; tests and the
//! CLI use [`crate::RecordingContext`].

use serde::{Deserialize, Serialize};

use crate::constants::{
    Attachment, BlendFactor, BufferTarget, BufferUsage, Capability, ClearMask, CullFace, DataType,
    DepthFunc, DrawMode, FilterMode, PixelFormat, PixelType, RenderbufferFormat, ShaderStage,
    TEXTURE_MAG_FILTER, TEXTURE_MIN_FILTER, TEXTURE_WRAP_S, TEXTURE_WRAP_T, WrapMode,
};

macro_rules! gl_handle {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            pub struct $name(pub u32);
        )+
    };
}

gl_handle! {
    /// GPU texture object.
    TextureHandle,
    /// GPU vertex buffer object.
    BufferHandle,
    FramebufferHandle,
    RenderbufferHandle,
    /// Compiled (or failed) shader stage.
    ShaderHandle,
    /// Linked shader program.
    ProgramHandle,
    /// Location of an active uniform within a program.
    UniformLocation,
}

/// One `texParameteri` on the bound 2D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TexParam {
    MagFilter(FilterMode),
    MinFilter(FilterMode),
    WrapS(WrapMode),
    WrapT(WrapMode),
}

impl TexParam {
    /// `(pname, param)` tokens.
    pub fn to_gl(self) -> (u32, u32) {
        match self {
            TexParam::MagFilter(f) => (TEXTURE_MAG_FILTER, f.to_gl()),
            TexParam::MinFilter(f) => (TEXTURE_MIN_FILTER, f.to_gl()),
            TexParam::WrapS(w) => (TEXTURE_WRAP_S, w.to_gl()),
            TexParam::WrapT(w) => (TEXTURE_WRAP_T, w.to_gl()),
        }
    }
}

/// Arguments of a `texImage2D` upload. `pixels: None` allocates storage only.
#[derive(Debug, Clone, Copy)]
pub struct TexImage<'a> {
    pub level: i32,
    pub internal_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    pub pixels: Option<&'a [u8]>,
}

/// A typed `uniform*` upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UniformUpload {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Matrix2([f32; 4]),
    Matrix3([f32; 9]),
    Matrix4([f32; 16]),
}

/// Subset of the WebGL 1 API used by the resource wrappers.
///
/// Methods mirror their WebGL namesakes; `None` handles unbind.
pub trait GlContext {
    /// Size in pixels of the default framebuffer.
    fn drawing_buffer_size(&self) -> (u32, u32);

    fn create_texture(&mut self) -> TextureHandle;
    fn delete_texture(&mut self, texture: TextureHandle);
    fn bind_texture(&mut self, texture: Option<TextureHandle>);
    fn active_texture(&mut self, unit: u32);
    fn tex_parameter(&mut self, param: TexParam);
    fn tex_image_2d(&mut self, image: TexImage<'_>);
    fn generate_mipmap(&mut self);

    fn create_buffer(&mut self) -> BufferHandle;
    fn delete_buffer(&mut self, buffer: BufferHandle);
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>);
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    fn create_framebuffer(&mut self) -> FramebufferHandle;
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);
    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: TextureHandle);
    fn create_renderbuffer(&mut self) -> RenderbufferHandle;
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle);
    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferHandle>);
    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32);
    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: RenderbufferHandle);

    fn create_shader(&mut self, stage: ShaderStage) -> ShaderHandle;
    fn delete_shader(&mut self, shader: ShaderHandle);
    fn shader_source(&mut self, shader: ShaderHandle, source: &str);
    fn compile_shader(&mut self, shader: ShaderHandle);
    /// Compiler output; empty when compilation succeeded.
    fn shader_info_log(&self, shader: ShaderHandle) -> String;
    fn create_program(&mut self) -> ProgramHandle;
    fn delete_program(&mut self, program: ProgramHandle);
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);
    fn link_program(&mut self, program: ProgramHandle);
    fn use_program(&mut self, program: Option<ProgramHandle>);
    /// `None` when the program has no active attribute of that name.
    fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32>;
    /// `None` when the program has no active uniform of that name.
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: i32,
        data_type: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn uniform(&mut self, location: UniformLocation, value: UniformUpload);

    fn enable(&mut self, capability: Capability);
    fn disable(&mut self, capability: Capability);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn depth_func(&mut self, func: DepthFunc);
    fn cull_face(&mut self, face: CullFace);
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn clear(&mut self, mask: ClearMask);
    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32);
}
