use glscene_math::Bounds;
use tracing::{debug, trace};

use crate::constants::{BufferTarget, BufferUsage, DataType, DrawMode};
use crate::context::{BufferHandle, GlContext};
use crate::shader::ShaderProgram;

/// Name of the attribute that carries vertex positions.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Typed vertex data. The variant decides the GL component type.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    F32(Vec<f32>),
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
}

impl AttributeData {
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeData::F32(_) => DataType::Float,
            AttributeData::U8(_) => DataType::UnsignedByte,
            AttributeData::I8(_) => DataType::Byte,
            AttributeData::U16(_) => DataType::UnsignedShort,
            AttributeData::I16(_) => DataType::Short,
        }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(v) => v.len(),
            AttributeData::U8(v) => v.len(),
            AttributeData::I8(v) => v.len(),
            AttributeData::U16(v) => v.len(),
            AttributeData::I16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::F32(v) => bytemuck::cast_slice(v),
            AttributeData::U8(v) => v.as_slice(),
            AttributeData::I8(v) => bytemuck::cast_slice(v),
            AttributeData::U16(v) => bytemuck::cast_slice(v),
            AttributeData::I16(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            AttributeData::F32(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for AttributeData {
    fn from(v: Vec<f32>) -> Self {
        AttributeData::F32(v)
    }
}

impl From<Vec<u8>> for AttributeData {
    fn from(v: Vec<u8>) -> Self {
        AttributeData::U8(v)
    }
}

impl From<Vec<i8>> for AttributeData {
    fn from(v: Vec<i8>) -> Self {
        AttributeData::I8(v)
    }
}

impl From<Vec<u16>> for AttributeData {
    fn from(v: Vec<u16>) -> Self {
        AttributeData::U16(v)
    }
}

impl From<Vec<i16>> for AttributeData {
    fn from(v: Vec<i16>) -> Self {
        AttributeData::I16(v)
    }
}

/// One named vertex attribute backed by its own array buffer.
#[derive(Debug)]
pub struct MeshAttribute {
    name: String,
    data: AttributeData,
    /// Components per vertex.
    pub size: i32,
    pub normalized: bool,
    pub usage: BufferUsage,
    buffer: Option<BufferHandle>,
    needs_update: bool,
}

impl MeshAttribute {
    pub fn new(name: impl Into<String>, data: impl Into<AttributeData>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            size: 3,
            normalized: false,
            usage: BufferUsage::StaticDraw,
            buffer: None,
            needs_update: true,
        }
    }

    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn with_usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<AttributeData>) {
        self.data = data.into();
        self.needs_update = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Vertices described by the data at the current component size.
    pub fn vertex_count(&self) -> usize {
        match usize::try_from(self.size) {
            Ok(size) if size > 0 => self.data.len() / size,
            _ => 0,
        }
    }

    pub fn init(&mut self, ctx: &mut dyn GlContext) {
        if self.buffer.is_none() {
            let buffer = ctx.create_buffer();
            debug!(attribute = %self.name, buffer = buffer.0, "vertex buffer created");
            self.buffer = Some(buffer);
        }
    }

    pub fn update(&mut self, ctx: &mut dyn GlContext) {
        ctx.bind_buffer(BufferTarget::ArrayBuffer, self.buffer);
        ctx.buffer_data(BufferTarget::ArrayBuffer, self.data.as_bytes(), self.usage);
        self.needs_update = false;
    }

    /// Point the program's attribute of the same name at this buffer.
    /// No-op when the program does not use the attribute.
    pub fn bind(&mut self, ctx: &mut dyn GlContext, program: &mut ShaderProgram) {
        let Some(location) = program.attribute_location(ctx, &self.name) else {
            return;
        };
        ctx.bind_buffer(BufferTarget::ArrayBuffer, self.buffer);
        ctx.vertex_attrib_pointer(location, self.size, self.data.data_type(), self.normalized, 0, 0);
        ctx.enable_vertex_attrib_array(location);
    }

    pub fn dispose(&mut self, ctx: &mut dyn GlContext) {
        if let Some(buffer) = self.buffer.take() {
            ctx.delete_buffer(buffer);
            self.needs_update = true;
        }
    }
}

/// A set of vertex attributes drawn with one `drawArrays` call.
#[derive(Debug)]
pub struct Mesh {
    attributes: Vec<MeshAttribute>,
    pub draw_mode: DrawMode,
    bounds: Bounds,
}

impl Mesh {
    pub fn new(attributes: Vec<MeshAttribute>) -> Self {
        let mut mesh = Self {
            attributes,
            draw_mode: DrawMode::Triangles,
            bounds: Bounds::default(),
        };
        mesh.calculate_bounds();
        mesh
    }

    pub fn with_draw_mode(mut self, mode: DrawMode) -> Self {
        self.draw_mode = mode;
        self
    }

    pub fn attributes(&self) -> &[MeshAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&MeshAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut MeshAttribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    /// Replace an attribute's data. Returns false if there is no such attribute.
    pub fn set_attribute_data(&mut self, name: &str, data: impl Into<AttributeData>) -> bool {
        let Some(attribute) = self.attribute_mut(name) else {
            return false;
        };
        attribute.set_data(data);
        if name == POSITION_ATTRIBUTE {
            self.calculate_bounds();
        }
        true
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Recompute bounds from float `position` data. Meshes without usable
    /// positions keep their previous bounds.
    pub fn calculate_bounds(&mut self) {
        let computed = self
            .attribute(POSITION_ATTRIBUTE)
            .and_then(|a| a.data.as_f32())
            .and_then(Bounds::from_positions);
        if let Some(bounds) = computed {
            self.bounds = bounds;
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.attribute(POSITION_ATTRIBUTE)
            .map_or(0, MeshAttribute::vertex_count)
    }

    /// Upload dirty attributes, bind them to `program` and draw.
    pub fn draw(&mut self, ctx: &mut dyn GlContext, program: &mut ShaderProgram) {
        for attribute in &mut self.attributes {
            if !attribute.is_initialized() {
                attribute.init(ctx);
            }
            if attribute.needs_update() {
                attribute.update(ctx);
            }
            attribute.bind(ctx, program);
        }

        let count = self.vertex_count();
        if count > 0 {
            trace!(count, mode = %self.draw_mode, "draw arrays");
            ctx.draw_arrays(self.draw_mode, 0, count as i32);
        }
        ctx.bind_buffer(BufferTarget::ArrayBuffer, None);
    }

    pub fn dispose(&mut self, ctx: &mut dyn GlContext) {
        for attribute in &mut self.attributes {
            attribute.dispose(ctx);
        }
    }
}
