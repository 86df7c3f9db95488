//! Thin, lazily-initialized wrappers over a WebGL-style rendering context.
//!
//! All GPU work goes through the object-safe [`GlContext`] trait. Wrappers
//! create their GL objects on first use and re-upload only when marked dirty.
//!
//! # Invariants
//! - Nothing touches the context until a wrapper is first activated or drawn.
//! - Symbolic constants are closed enums; raw integers only appear at the
//!   `to_gl()` boundary.
//! - Lookups of unknown uniforms, attributes and resource ids are silent no-ops.

mod constants;
mod context;
mod error;
mod framebuffer;
mod mesh;
mod recording;
mod resources;
mod shader;
mod texture;

pub use constants::{
    Attachment, BlendFactor, BufferTarget, BufferUsage, Capability, ClearMask, CullFace, DataType,
    DepthFunc, DrawMode, FilterMode, PixelFormat, PixelType, RenderbufferFormat, ShaderStage,
    WrapMode,
};
pub use context::{
    BufferHandle, FramebufferHandle, GlContext, ProgramHandle, RenderbufferHandle, ShaderHandle,
    TexImage, TexParam, TextureHandle, UniformLocation, UniformUpload,
};
pub use error::GlError;
pub use framebuffer::Framebuffer2D;
pub use mesh::{AttributeData, Mesh, MeshAttribute, POSITION_ATTRIBUTE};
pub use recording::{GlCall, RecordingContext};
pub use resources::{FramebufferId, GpuResources, MeshId, ProgramId, TextureId};
pub use shader::{RenderState, ShaderProgram, UniformValue};
pub use texture::{
    DataTexture2D, DecodedImage, GpuTexture, ImageLoadHandle, ImageTexture2D, Texture, TextureParams,
};

pub fn crate_info() -> &'static str {
    "glscene-gl v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert_eq!(crate_info(), "glscene-gl v0.1.0");
    }

    #[test]
    fn context_is_object_safe() {
        let mut ctx = RecordingContext::with_surface_size(4, 4);
        let dynamic: &mut dyn GlContext = &mut ctx;
        assert_eq!(dynamic.drawing_buffer_size(), (4, 4));
        dynamic.clear(ClearMask::COLOR_DEPTH);
        assert_eq!(ctx.calls(), &[GlCall::Clear(ClearMask::COLOR_DEPTH)]);
    }
}
