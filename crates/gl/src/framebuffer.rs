use tracing::debug;

use crate::constants::{Attachment, RenderbufferFormat};
use crate::context::{FramebufferHandle, GlContext, RenderbufferHandle};
use crate::resources::TextureId;
use crate::texture::{DataTexture2D, GpuTexture};

/// Off-screen render target with an optional color texture and depth buffer.
///
/// The color texture lives in [`crate::GpuResources`] so shaders can sample
/// it; methods that touch it take it as a separate argument.
#[derive(Debug)]
pub struct Framebuffer2D {
    width: u32,
    height: u32,
    color_texture: Option<TextureId>,
    use_depth: bool,
    framebuffer: Option<FramebufferHandle>,
    depth_buffer: Option<RenderbufferHandle>,
    needs_update: bool,
}

impl Framebuffer2D {
    pub fn new(width: u32, height: u32, color_texture: Option<TextureId>, use_depth: bool) -> Self {
        Self {
            width,
            height,
            color_texture,
            use_depth,
            framebuffer: None,
            depth_buffer: None,
            needs_update: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_texture(&self) -> Option<TextureId> {
        self.color_texture
    }

    pub fn uses_depth(&self) -> bool {
        self.use_depth
    }

    pub fn is_initialized(&self) -> bool {
        self.framebuffer.is_some()
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn handle(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.needs_update = true;
    }

    /// Create the framebuffer and attach the color texture and depth buffer.
    pub fn init(&mut self, ctx: &mut dyn GlContext, color: Option<&mut DataTexture2D>) {
        let framebuffer = ctx.create_framebuffer();
        ctx.bind_framebuffer(Some(framebuffer));

        if let Some(tex) = color {
            tex.set_size(self.width, self.height);
            tex.init(ctx);
            tex.update(ctx);
            if let Some(handle) = tex.handle() {
                ctx.framebuffer_texture_2d(Attachment::Color0, handle);
            }
        }

        if self.use_depth {
            let depth = ctx.create_renderbuffer();
            ctx.bind_renderbuffer(Some(depth));
            ctx.renderbuffer_storage(RenderbufferFormat::DepthComponent16, self.width, self.height);
            ctx.framebuffer_renderbuffer(Attachment::Depth, depth);
            self.depth_buffer = Some(depth);
        }

        debug!(
            framebuffer = framebuffer.0,
            width = self.width,
            height = self.height,
            depth = self.use_depth,
            "framebuffer created"
        );
        self.framebuffer = Some(framebuffer);
        self.needs_update = false;
    }

    /// Resize the attached storage to the current size.
    pub fn update(&mut self, ctx: &mut dyn GlContext, color: Option<&mut DataTexture2D>) {
        if let Some(tex) = color {
            tex.set_size(self.width, self.height);
            tex.update(ctx);
        }
        if let Some(depth) = self.depth_buffer {
            ctx.bind_renderbuffer(Some(depth));
            ctx.renderbuffer_storage(RenderbufferFormat::DepthComponent16, self.width, self.height);
        }
        self.needs_update = false;
    }

    /// Bind as the render target and set the viewport to cover it.
    pub fn set_active(&mut self, ctx: &mut dyn GlContext, color: Option<&mut DataTexture2D>) {
        if self.framebuffer.is_none() {
            self.init(ctx, color);
        } else if self.needs_update {
            self.update(ctx, color);
        }
        ctx.bind_framebuffer(self.framebuffer);
        ctx.viewport(0, 0, self.width, self.height);
    }

    /// Release the framebuffer and depth buffer. The color texture is owned
    /// by the resource store and disposed there.
    pub fn dispose(&mut self, ctx: &mut dyn GlContext) {
        if let Some(depth) = self.depth_buffer.take() {
            ctx.delete_renderbuffer(depth);
        }
        if let Some(fb) = self.framebuffer.take() {
            ctx.delete_framebuffer(fb);
        }
        self.needs_update = true;
    }
}
