//! 2D textures: raw-data textures and image-backed textures.
//!
//! # Invariants
//! - GL objects are created lazily on first `set_active` (or explicit `init`).
//! - Parameters are re-applied on every `update`, so edits to `params` take
//!   effect after `mark_dirty`.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{FilterMode, PixelFormat, PixelType, WrapMode};
use crate::context::{GlContext, TexImage, TexParam, TextureHandle};
use crate::error::GlError;

/// Sampling and storage format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureParams {
    pub internal_format: PixelFormat,
    pub source_format: PixelFormat,
    pub pixel_type: PixelType,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub use_mipmaps: bool,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            internal_format: PixelFormat::Rgba,
            source_format: PixelFormat::Rgba,
            pixel_type: PixelType::UnsignedByte,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            use_mipmaps: false,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
        }
    }
}

impl TextureParams {
    /// Defaults with linear filtering.
    pub fn linear() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Self::default()
        }
    }

    /// Clamp-to-edge, nearest filtering. Used for render targets.
    pub fn render_target() -> Self {
        Self {
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            ..Self::default()
        }
    }

    /// Apply to the currently bound texture.
    pub fn apply(&self, ctx: &mut dyn GlContext) {
        ctx.tex_parameter(TexParam::MagFilter(self.mag_filter));
        ctx.tex_parameter(TexParam::MinFilter(self.min_filter));
        ctx.tex_parameter(TexParam::WrapS(self.wrap_s));
        ctx.tex_parameter(TexParam::WrapT(self.wrap_t));
    }
}

/// Shared behavior of every texture kind.
pub trait GpuTexture {
    fn params(&self) -> &TextureParams;
    fn params_mut(&mut self) -> &mut TextureParams;
    fn handle(&self) -> Option<TextureHandle>;
    fn needs_update(&self) -> bool;
    fn mark_dirty(&mut self);

    /// Create the texture object if it does not exist yet.
    fn init(&mut self, ctx: &mut dyn GlContext);
    /// Upload pixels and parameters, clearing the dirty flag.
    fn update(&mut self, ctx: &mut dyn GlContext);
    /// Release the texture object.
    fn dispose(&mut self, ctx: &mut dyn GlContext);

    /// Pick up asynchronously delivered content. Default: nothing to poll.
    fn poll(&mut self) {}

    /// Lazily init/update, then bind on texture unit `unit`.
    fn set_active(&mut self, ctx: &mut dyn GlContext, unit: u32) {
        self.poll();
        if self.handle().is_none() {
            self.init(ctx);
        }
        if self.needs_update() {
            self.update(ctx);
        }
        ctx.active_texture(unit);
        ctx.bind_texture(self.handle());
    }
}

/// State common to both texture kinds.
#[derive(Debug)]
struct TextureCore {
    params: TextureParams,
    handle: Option<TextureHandle>,
    needs_update: bool,
}

impl TextureCore {
    fn new(params: TextureParams, needs_update: bool) -> Self {
        Self {
            params,
            handle: None,
            needs_update,
        }
    }

    fn init(&mut self, ctx: &mut dyn GlContext) {
        if self.handle.is_none() {
            let handle = ctx.create_texture();
            debug!(texture = handle.0, "texture created");
            self.handle = Some(handle);
        }
    }

    fn upload(&mut self, ctx: &mut dyn GlContext, width: u32, height: u32, pixels: Option<&[u8]>) {
        ctx.bind_texture(self.handle);
        ctx.tex_image_2d(TexImage {
            level: 0,
            internal_format: self.params.internal_format,
            width,
            height,
            format: self.params.source_format,
            pixel_type: self.params.pixel_type,
            pixels,
        });
        self.finish_update(ctx);
    }

    fn finish_update(&mut self, ctx: &mut dyn GlContext) {
        ctx.bind_texture(self.handle);
        self.params.apply(ctx);
        if self.params.use_mipmaps {
            ctx.generate_mipmap();
        }
        self.needs_update = false;
    }

    fn dispose(&mut self, ctx: &mut dyn GlContext) {
        if let Some(handle) = self.handle.take() {
            ctx.delete_texture(handle);
            self.needs_update = true;
        }
    }
}

/// Texture whose pixels are supplied as raw bytes, or none for render targets.
#[derive(Debug)]
pub struct DataTexture2D {
    core: TextureCore,
    data: Option<Vec<u8>>,
    width: u32,
    height: u32,
}

impl DataTexture2D {
    pub fn new(data: Option<Vec<u8>>, width: u32, height: u32) -> Self {
        Self::with_params(data, width, height, TextureParams::default())
    }

    pub fn with_params(data: Option<Vec<u8>>, width: u32, height: u32, params: TextureParams) -> Self {
        Self {
            core: TextureCore::new(params, true),
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn set_data(&mut self, data: Option<Vec<u8>>) {
        self.data = data;
        self.core.needs_update = true;
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.core.needs_update = true;
    }
}

impl GpuTexture for DataTexture2D {
    fn params(&self) -> &TextureParams {
        &self.core.params
    }

    fn params_mut(&mut self) -> &mut TextureParams {
        &mut self.core.params
    }

    fn handle(&self) -> Option<TextureHandle> {
        self.core.handle
    }

    fn needs_update(&self) -> bool {
        self.core.needs_update
    }

    fn mark_dirty(&mut self) {
        self.core.needs_update = true;
    }

    fn init(&mut self, ctx: &mut dyn GlContext) {
        self.core.init(ctx);
    }

    fn update(&mut self, ctx: &mut dyn GlContext) {
        self.core
            .upload(ctx, self.width, self.height, self.data.as_deref());
    }

    fn dispose(&mut self, ctx: &mut dyn GlContext) {
        self.core.dispose(ctx);
    }
}

/// RGBA8 pixels of a decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Decode PNG or JPEG bytes to RGBA8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GlError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }
}

/// Completion side of an image load. Whoever fetches the url delivers the
/// result here; the texture picks it up at its next `set_active`.
#[derive(Debug, Clone)]
pub struct ImageLoadHandle {
    slot: Rc<RefCell<Option<DecodedImage>>>,
}

impl ImageLoadHandle {
    pub fn complete(&self, image: DecodedImage) {
        *self.slot.borrow_mut() = Some(image);
    }

    /// Decode `bytes` and complete the load. On error the texture stays blank.
    pub fn complete_from_bytes(&self, bytes: &[u8]) -> Result<(), GlError> {
        let image = DecodedImage::from_bytes(bytes)?;
        self.complete(image);
        Ok(())
    }
}

/// Texture whose pixels arrive later from an image url.
#[derive(Debug)]
pub struct ImageTexture2D {
    core: TextureCore,
    url: String,
    image: Option<DecodedImage>,
    pending: Rc<RefCell<Option<DecodedImage>>>,
}

impl ImageTexture2D {
    /// Linear filtering by default.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_params(url, TextureParams::linear())
    }

    pub fn with_params(url: impl Into<String>, params: TextureParams) -> Self {
        Self {
            core: TextureCore::new(params, false),
            url: url.into(),
            image: None,
            pending: Rc::new(RefCell::new(None)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }

    pub fn loader(&self) -> ImageLoadHandle {
        ImageLoadHandle {
            slot: Rc::clone(&self.pending),
        }
    }
}

impl GpuTexture for ImageTexture2D {
    fn params(&self) -> &TextureParams {
        &self.core.params
    }

    fn params_mut(&mut self) -> &mut TextureParams {
        &mut self.core.params
    }

    fn handle(&self) -> Option<TextureHandle> {
        self.core.handle
    }

    fn needs_update(&self) -> bool {
        self.core.needs_update
    }

    fn mark_dirty(&mut self) {
        self.core.needs_update = true;
    }

    fn init(&mut self, ctx: &mut dyn GlContext) {
        self.core.init(ctx);
    }

    fn update(&mut self, ctx: &mut dyn GlContext) {
        match &self.image {
            Some(img) => self
                .core
                .upload(ctx, img.width, img.height, Some(img.pixels.as_slice())),
            None => self.core.finish_update(ctx),
        }
    }

    fn dispose(&mut self, ctx: &mut dyn GlContext) {
        self.core.dispose(ctx);
    }

    fn poll(&mut self) {
        if let Some(img) = self.pending.borrow_mut().take() {
            debug!(url = %self.url, width = img.width, height = img.height, "image loaded");
            self.image = Some(img);
            self.core.needs_update = true;
        }
    }
}

/// Any texture stored in [`crate::GpuResources`].
#[derive(Debug)]
pub enum Texture {
    Data(DataTexture2D),
    Image(ImageTexture2D),
}

impl From<DataTexture2D> for Texture {
    fn from(t: DataTexture2D) -> Self {
        Texture::Data(t)
    }
}

impl From<ImageTexture2D> for Texture {
    fn from(t: ImageTexture2D) -> Self {
        Texture::Image(t)
    }
}

impl Texture {
    fn inner(&self) -> &dyn GpuTexture {
        match self {
            Texture::Data(t) => t,
            Texture::Image(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn GpuTexture {
        match self {
            Texture::Data(t) => t,
            Texture::Image(t) => t,
        }
    }
}

impl GpuTexture for Texture {
    fn params(&self) -> &TextureParams {
        self.inner().params()
    }

    fn params_mut(&mut self) -> &mut TextureParams {
        self.inner_mut().params_mut()
    }

    fn handle(&self) -> Option<TextureHandle> {
        self.inner().handle()
    }

    fn needs_update(&self) -> bool {
        self.inner().needs_update()
    }

    fn mark_dirty(&mut self) {
        self.inner_mut().mark_dirty();
    }

    fn init(&mut self, ctx: &mut dyn GlContext) {
        self.inner_mut().init(ctx);
    }

    fn update(&mut self, ctx: &mut dyn GlContext) {
        self.inner_mut().update(ctx);
    }

    fn dispose(&mut self, ctx: &mut dyn GlContext) {
        self.inner_mut().dispose(ctx);
    }

    fn poll(&mut self) {
        self.inner_mut().poll();
    }

    fn set_active(&mut self, ctx: &mut dyn GlContext, unit: u32) {
        self.inner_mut().set_active(ctx, unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{GlCall, RecordingContext};

    fn uploads(ctx: &RecordingContext) -> Vec<(u32, u32, Option<usize>)> {
        ctx.calls()
            .iter()
            .filter_map(|c| match c {
                GlCall::TexImage2D {
                    width,
                    height,
                    bytes,
                    ..
                } => Some((*width, *height, *bytes)),
                _ => None,
            })
            .collect()
    }

    fn png_2x1() -> Vec<u8> {
        let img = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 255, 0, 255]).unwrap();
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn data_texture_uploads_once() {
        let mut ctx = RecordingContext::new();
        let mut tex = DataTexture2D::new(Some(vec![0; 16]), 2, 2);
        tex.set_active(&mut ctx, 0);
        tex.set_active(&mut ctx, 1);

        assert_eq!(ctx.count(|c| matches!(c, GlCall::CreateTexture(_))), 1);
        assert_eq!(uploads(&ctx), vec![(2, 2, Some(16))]);
        assert!(ctx.calls().contains(&GlCall::ActiveTexture(1)));
        assert!(!tex.needs_update());
    }

    #[test]
    fn params_applied_on_update() {
        let mut ctx = RecordingContext::new();
        let mut tex = DataTexture2D::with_params(None, 4, 4, TextureParams::render_target());
        tex.params_mut().use_mipmaps = true;
        tex.set_active(&mut ctx, 0);

        assert!(ctx
            .calls()
            .contains(&GlCall::TexParameter(TexParam::WrapS(WrapMode::ClampToEdge))));
        assert!(ctx.calls().contains(&GlCall::GenerateMipmap));
        assert_eq!(uploads(&ctx), vec![(4, 4, None)]);
    }

    #[test]
    fn resize_marks_dirty() {
        let mut ctx = RecordingContext::new();
        let mut tex = DataTexture2D::new(None, 4, 4);
        tex.set_active(&mut ctx, 0);
        tex.set_size(8, 2);
        assert!(tex.needs_update());
        tex.set_active(&mut ctx, 0);
        assert_eq!(uploads(&ctx), vec![(4, 4, None), (8, 2, None)]);
    }

    #[test]
    fn image_texture_is_blank_until_loaded() {
        let mut ctx = RecordingContext::new();
        let mut tex = ImageTexture2D::new("tiles.png");
        let loader = tex.loader();

        tex.set_active(&mut ctx, 0);
        assert!(uploads(&ctx).is_empty());
        assert!(tex.handle().is_some());

        loader.complete_from_bytes(&png_2x1()).unwrap();
        tex.set_active(&mut ctx, 0);
        assert!(tex.is_loaded());
        assert_eq!(uploads(&ctx), vec![(2, 1, Some(8))]);
        assert!(ctx
            .calls()
            .contains(&GlCall::TexParameter(TexParam::MagFilter(FilterMode::Linear))));
    }

    #[test]
    fn undecodable_bytes_leave_texture_blank() {
        let tex = ImageTexture2D::new("broken.png");
        let err = tex.loader().complete_from_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, GlError::ImageDecode(_)));
        assert!(tex.pending.borrow().is_none());
    }

    #[test]
    fn dispose_releases_and_allows_reinit() {
        let mut ctx = RecordingContext::new();
        let mut tex = Texture::from(DataTexture2D::new(Some(vec![1, 2, 3, 4]), 1, 1));
        tex.set_active(&mut ctx, 0);
        let handle = tex.handle().unwrap();
        tex.dispose(&mut ctx);
        assert!(ctx.calls().contains(&GlCall::DeleteTexture(handle)));
        assert!(tex.handle().is_none());

        tex.set_active(&mut ctx, 0);
        assert_eq!(uploads(&ctx).len(), 2);
    }
}
