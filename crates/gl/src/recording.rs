//! Headless [`GlContext`] that records every call.
//!
//! # Invariants
//! - Handles of every kind come from one counter starting at 1, so a handle
//!   value is never reused within a context.
//! - A shader whose source contains a `#error` directive fails to compile; its
//!   info log names the line.
//! - Attribute and uniform locations resolve only for identifiers that appear
//!   in the program's attached sources (vertex sources only for attributes).
//!   Locations are stable per `(program, name)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    Attachment, BlendFactor, BufferTarget, BufferUsage, Capability, ClearMask, CullFace, DataType,
    DepthFunc, DrawMode, PixelFormat, PixelType, RenderbufferFormat, ShaderStage,
};
use crate::context::{
    BufferHandle, FramebufferHandle, GlContext, ProgramHandle, RenderbufferHandle, ShaderHandle,
    TexImage, TexParam, TextureHandle, UniformLocation, UniformUpload,
};

/// One recorded context call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlCall {
    CreateTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    BindTexture(Option<TextureHandle>),
    ActiveTexture(u32),
    TexParameter(TexParam),
    TexImage2D {
        level: i32,
        internal_format: PixelFormat,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixel_type: PixelType,
        /// Byte length of the upload, `None` for allocate-only.
        bytes: Option<usize>,
    },
    GenerateMipmap,
    CreateBuffer(BufferHandle),
    DeleteBuffer(BufferHandle),
    BindBuffer(BufferTarget, Option<BufferHandle>),
    BufferData {
        target: BufferTarget,
        bytes: usize,
        usage: BufferUsage,
    },
    CreateFramebuffer(FramebufferHandle),
    DeleteFramebuffer(FramebufferHandle),
    BindFramebuffer(Option<FramebufferHandle>),
    FramebufferTexture2D(Attachment, TextureHandle),
    CreateRenderbuffer(RenderbufferHandle),
    DeleteRenderbuffer(RenderbufferHandle),
    BindRenderbuffer(Option<RenderbufferHandle>),
    RenderbufferStorage {
        format: RenderbufferFormat,
        width: u32,
        height: u32,
    },
    FramebufferRenderbuffer(Attachment, RenderbufferHandle),
    CreateShader(ShaderHandle, ShaderStage),
    DeleteShader(ShaderHandle),
    ShaderSource(ShaderHandle),
    CompileShader(ShaderHandle),
    CreateProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    AttachShader(ProgramHandle, ShaderHandle),
    LinkProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    VertexAttribPointer {
        location: u32,
        size: i32,
        data_type: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    EnableVertexAttribArray(u32),
    Uniform {
        location: UniformLocation,
        name: String,
        value: UniformUpload,
    },
    Enable(Capability),
    Disable(Capability),
    BlendFunc(BlendFactor, BlendFactor),
    DepthFunc(DepthFunc),
    CullFace(CullFace),
    Viewport {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    Clear(ClearMask),
    DrawArrays {
        mode: DrawMode,
        first: i32,
        count: i32,
    },
}

#[derive(Debug)]
struct ShaderState {
    stage: ShaderStage,
    source: String,
    info_log: String,
}

/// Records calls instead of issuing them.
#[derive(Debug)]
pub struct RecordingContext {
    surface: (u32, u32),
    next_handle: u32,
    calls: Vec<GlCall>,
    shaders: HashMap<ShaderHandle, ShaderState>,
    programs: HashMap<ProgramHandle, Vec<ShaderHandle>>,
    attribs: HashMap<(ProgramHandle, String), u32>,
    next_attrib: HashMap<ProgramHandle, u32>,
    uniforms: HashMap<(ProgramHandle, String), UniformLocation>,
    uniform_names: HashMap<UniformLocation, String>,
    last_uniforms: HashMap<String, UniformUpload>,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::with_surface_size(800, 600)
    }
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface_size(width: u32, height: u32) -> Self {
        Self {
            surface: (width, height),
            next_handle: 1,
            calls: Vec::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            attribs: HashMap::new(),
            next_attrib: HashMap::new(),
            uniforms: HashMap::new(),
            uniform_names: HashMap::new(),
            last_uniforms: HashMap::new(),
        }
    }

    /// Change the default framebuffer size, as a canvas resize would.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface = (width, height);
    }

    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Most recent value uploaded to the uniform called `name`, in any program.
    pub fn last_uniform(&self, name: &str) -> Option<&UniformUpload> {
        self.last_uniforms.get(name)
    }

    fn alloc(&mut self) -> u32 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    fn program_mentions(&self, program: ProgramHandle, name: &str, stage: Option<ShaderStage>) -> bool {
        let Some(attached) = self.programs.get(&program) else {
            return false;
        };
        attached
            .iter()
            .filter_map(|s| self.shaders.get(s))
            .filter(|s| stage.is_none_or(|st| s.stage == st))
            .any(|s| has_identifier(&s.source, name))
    }
}

fn has_identifier(source: &str, name: &str) -> bool {
    source
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|tok| tok == name)
}

fn compile_log(source: &str) -> String {
    source
        .lines()
        .enumerate()
        .find_map(|(i, line)| {
            let rest = line.trim_start().strip_prefix("#error")?;
            Some(format!("ERROR: 0:{}: '#error' : {}", i + 1, rest.trim()))
        })
        .unwrap_or_default()
}

impl GlContext for RecordingContext {
    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.surface
    }

    fn create_texture(&mut self) -> TextureHandle {
        let h = TextureHandle(self.alloc());
        self.calls.push(GlCall::CreateTexture(h));
        h
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.calls.push(GlCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        self.calls.push(GlCall::BindTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(GlCall::ActiveTexture(unit));
    }

    fn tex_parameter(&mut self, param: TexParam) {
        self.calls.push(GlCall::TexParameter(param));
    }

    fn tex_image_2d(&mut self, image: TexImage<'_>) {
        self.calls.push(GlCall::TexImage2D {
            level: image.level,
            internal_format: image.internal_format,
            width: image.width,
            height: image.height,
            format: image.format,
            pixel_type: image.pixel_type,
            bytes: image.pixels.map(<[u8]>::len),
        });
    }

    fn generate_mipmap(&mut self) {
        self.calls.push(GlCall::GenerateMipmap);
    }

    fn create_buffer(&mut self) -> BufferHandle {
        let h = BufferHandle(self.alloc());
        self.calls.push(GlCall::CreateBuffer(h));
        h
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        self.calls.push(GlCall::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.calls.push(GlCall::BufferData {
            target,
            bytes: data.len(),
            usage,
        });
    }

    fn create_framebuffer(&mut self) -> FramebufferHandle {
        let h = FramebufferHandle(self.alloc());
        self.calls.push(GlCall::CreateFramebuffer(h));
        h
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.calls.push(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.calls.push(GlCall::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: TextureHandle) {
        self.calls.push(GlCall::FramebufferTexture2D(attachment, texture));
    }

    fn create_renderbuffer(&mut self) -> RenderbufferHandle {
        let h = RenderbufferHandle(self.alloc());
        self.calls.push(GlCall::CreateRenderbuffer(h));
        h
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferHandle) {
        self.calls.push(GlCall::DeleteRenderbuffer(renderbuffer));
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<RenderbufferHandle>) {
        self.calls.push(GlCall::BindRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: u32, height: u32) {
        self.calls.push(GlCall::RenderbufferStorage {
            format,
            width,
            height,
        });
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: RenderbufferHandle) {
        self.calls
            .push(GlCall::FramebufferRenderbuffer(attachment, renderbuffer));
    }

    fn create_shader(&mut self, stage: ShaderStage) -> ShaderHandle {
        let h = ShaderHandle(self.alloc());
        self.shaders.insert(
            h,
            ShaderState {
                stage,
                source: String::new(),
                info_log: String::new(),
            },
        );
        self.calls.push(GlCall::CreateShader(h, stage));
        h
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(GlCall::DeleteShader(shader));
    }

    fn shader_source(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(s) = self.shaders.get_mut(&shader) {
            s.source = source.to_owned();
        }
        self.calls.push(GlCall::ShaderSource(shader));
    }

    fn compile_shader(&mut self, shader: ShaderHandle) {
        if let Some(s) = self.shaders.get_mut(&shader) {
            s.info_log = compile_log(&s.source);
        }
        self.calls.push(GlCall::CompileShader(shader));
    }

    fn shader_info_log(&self, shader: ShaderHandle) -> String {
        self.shaders
            .get(&shader)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn create_program(&mut self) -> ProgramHandle {
        let h = ProgramHandle(self.alloc());
        self.programs.insert(h, Vec::new());
        self.calls.push(GlCall::CreateProgram(h));
        h
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.calls.push(GlCall::DeleteProgram(program));
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(attached) = self.programs.get_mut(&program) {
            attached.push(shader);
        }
        self.calls.push(GlCall::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: ProgramHandle) {
        self.calls.push(GlCall::LinkProgram(program));
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.calls.push(GlCall::UseProgram(program));
    }

    fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        let key = (program, name.to_owned());
        if let Some(&loc) = self.attribs.get(&key) {
            return Some(loc);
        }
        if !self.program_mentions(program, name, Some(ShaderStage::Vertex)) {
            return None;
        }
        let next = self.next_attrib.entry(program).or_insert(0);
        let loc = *next;
        *next += 1;
        self.attribs.insert(key, loc);
        Some(loc)
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let key = (program, name.to_owned());
        if let Some(&loc) = self.uniforms.get(&key) {
            return Some(loc);
        }
        if !self.program_mentions(program, name, None) {
            return None;
        }
        let loc = UniformLocation(self.alloc());
        self.uniforms.insert(key, loc);
        self.uniform_names.insert(loc, name.to_owned());
        Some(loc)
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: i32,
        data_type: DataType,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        self.calls.push(GlCall::VertexAttribPointer {
            location,
            size,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.calls.push(GlCall::EnableVertexAttribArray(location));
    }

    fn uniform(&mut self, location: UniformLocation, value: UniformUpload) {
        let name = self
            .uniform_names
            .get(&location)
            .cloned()
            .unwrap_or_default();
        self.last_uniforms.insert(name.clone(), value.clone());
        self.calls.push(GlCall::Uniform {
            location,
            name,
            value,
        });
    }

    fn enable(&mut self, capability: Capability) {
        self.calls.push(GlCall::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.calls.push(GlCall::Disable(capability));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.calls.push(GlCall::BlendFunc(src, dst));
    }

    fn depth_func(&mut self, func: DepthFunc) {
        self.calls.push(GlCall::DepthFunc(func));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.calls.push(GlCall::CullFace(face));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.calls.push(GlCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear(&mut self, mask: ClearMask) {
        self.calls.push(GlCall::Clear(mask));
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) {
        self.calls.push(GlCall::DrawArrays { mode, first, count });
    }
}
