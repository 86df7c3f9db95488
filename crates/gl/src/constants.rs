//! Closed enums for the symbolic WebGL constants the library uses.
//!
//! Each enum maps to the integer token of the underlying API via `to_gl()` and
//! (de)serializes under its WebGL spelling, e.g. `WrapMode::Repeat` is
//! `"REPEAT"` and `0x2901`.

use serde::{Deserialize, Serialize};

macro_rules! gl_enum {
    (
        $(#[$meta:meta])*
        pub enum $ty:ident {
            $( $variant:ident = ($name:literal, $value:expr) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $ty {
            $( #[serde(rename = $name)] $variant ),+
        }

        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Integer token of the underlying graphics API.
            pub const fn to_gl(self) -> u32 {
                match self {
                    $( $ty::$variant => $value ),+
                }
            }

            /// WebGL spelling of the constant.
            pub const fn name(self) -> &'static str {
                match self {
                    $( $ty::$variant => $name ),+
                }
            }

            /// Look a constant up by its WebGL spelling.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.name() == name)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub(crate) const TEXTURE_MAG_FILTER: u32 = 0x2800;
pub(crate) const TEXTURE_MIN_FILTER: u32 = 0x2801;
pub(crate) const TEXTURE_WRAP_S: u32 = 0x2802;
pub(crate) const TEXTURE_WRAP_T: u32 = 0x2803;

gl_enum! {
    /// Texture coordinate wrapping.
    pub enum WrapMode {
        Repeat = ("REPEAT", 0x2901),
        ClampToEdge = ("CLAMP_TO_EDGE", 0x812F),
        MirroredRepeat = ("MIRRORED_REPEAT", 0x8370),
    }
}

gl_enum! {
    /// Texture magnification / minification filter.
    pub enum FilterMode {
        Nearest = ("NEAREST", 0x2600),
        Linear = ("LINEAR", 0x2601),
        NearestMipmapNearest = ("NEAREST_MIPMAP_NEAREST", 0x2700),
        LinearMipmapNearest = ("LINEAR_MIPMAP_NEAREST", 0x2701),
        NearestMipmapLinear = ("NEAREST_MIPMAP_LINEAR", 0x2702),
        LinearMipmapLinear = ("LINEAR_MIPMAP_LINEAR", 0x2703),
    }
}

gl_enum! {
    /// Pixel layout of texture storage and uploads.
    pub enum PixelFormat {
        Alpha = ("ALPHA", 0x1906),
        Rgb = ("RGB", 0x1907),
        Rgba = ("RGBA", 0x1908),
        Luminance = ("LUMINANCE", 0x1909),
        LuminanceAlpha = ("LUMINANCE_ALPHA", 0x190A),
    }
}

gl_enum! {
    /// Component type of uploaded pixels.
    pub enum PixelType {
        UnsignedByte = ("UNSIGNED_BYTE", 0x1401),
        UnsignedShort565 = ("UNSIGNED_SHORT_5_6_5", 0x8363),
        UnsignedShort4444 = ("UNSIGNED_SHORT_4_4_4_4", 0x8033),
        UnsignedShort5551 = ("UNSIGNED_SHORT_5_5_5_1", 0x8034),
        Float = ("FLOAT", 0x1406),
    }
}

gl_enum! {
    /// Component type of vertex attribute data.
    pub enum DataType {
        Byte = ("BYTE", 0x1400),
        UnsignedByte = ("UNSIGNED_BYTE", 0x1401),
        Short = ("SHORT", 0x1402),
        UnsignedShort = ("UNSIGNED_SHORT", 0x1403),
        Float = ("FLOAT", 0x1406),
    }
}

gl_enum! {
    /// Buffer usage hint.
    pub enum BufferUsage {
        StaticDraw = ("STATIC_DRAW", 0x88E4),
        DynamicDraw = ("DYNAMIC_DRAW", 0x88E8),
        StreamDraw = ("STREAM_DRAW", 0x88E0),
    }
}

gl_enum! {
    pub enum BufferTarget {
        ArrayBuffer = ("ARRAY_BUFFER", 0x8892),
        ElementArrayBuffer = ("ELEMENT_ARRAY_BUFFER", 0x8893),
    }
}

gl_enum! {
    /// Primitive assembly mode for draw calls.
    pub enum DrawMode {
        Points = ("POINTS", 0x0000),
        Lines = ("LINES", 0x0001),
        LineLoop = ("LINE_LOOP", 0x0002),
        LineStrip = ("LINE_STRIP", 0x0003),
        Triangles = ("TRIANGLES", 0x0004),
        TriangleStrip = ("TRIANGLE_STRIP", 0x0005),
        TriangleFan = ("TRIANGLE_FAN", 0x0006),
    }
}

gl_enum! {
    pub enum BlendFactor {
        Zero = ("ZERO", 0x0000),
        One = ("ONE", 0x0001),
        SrcColor = ("SRC_COLOR", 0x0300),
        OneMinusSrcColor = ("ONE_MINUS_SRC_COLOR", 0x0301),
        SrcAlpha = ("SRC_ALPHA", 0x0302),
        OneMinusSrcAlpha = ("ONE_MINUS_SRC_ALPHA", 0x0303),
        DstAlpha = ("DST_ALPHA", 0x0304),
        OneMinusDstAlpha = ("ONE_MINUS_DST_ALPHA", 0x0305),
        DstColor = ("DST_COLOR", 0x0306),
        OneMinusDstColor = ("ONE_MINUS_DST_COLOR", 0x0307),
    }
}

gl_enum! {
    /// Depth comparison function.
    pub enum DepthFunc {
        Never = ("NEVER", 0x0200),
        Less = ("LESS", 0x0201),
        Equal = ("EQUAL", 0x0202),
        LEqual = ("LEQUAL", 0x0203),
        Greater = ("GREATER", 0x0204),
        NotEqual = ("NOTEQUAL", 0x0205),
        GEqual = ("GEQUAL", 0x0206),
        Always = ("ALWAYS", 0x0207),
    }
}

gl_enum! {
    pub enum CullFace {
        Front = ("FRONT", 0x0404),
        Back = ("BACK", 0x0405),
        FrontAndBack = ("FRONT_AND_BACK", 0x0408),
    }
}

gl_enum! {
    /// Server-side capabilities toggled with `enable` / `disable`.
    pub enum Capability {
        Blend = ("BLEND", 0x0BE2),
        DepthTest = ("DEPTH_TEST", 0x0B71),
        CullFace = ("CULL_FACE", 0x0B44),
    }
}

gl_enum! {
    pub enum ShaderStage {
        Vertex = ("VERTEX_SHADER", 0x8B31),
        Fragment = ("FRAGMENT_SHADER", 0x8B30),
    }
}

gl_enum! {
    /// Framebuffer attachment point.
    pub enum Attachment {
        Color0 = ("COLOR_ATTACHMENT0", 0x8CE0),
        Depth = ("DEPTH_ATTACHMENT", 0x8D00),
    }
}

gl_enum! {
    pub enum RenderbufferFormat {
        DepthComponent16 = ("DEPTH_COMPONENT16", 0x81A5),
    }
}

impl Default for WrapMode {
    fn default() -> Self {
        Self::Repeat
    }
}

impl Default for FilterMode {
    fn default() -> Self {
        Self::Nearest
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::Rgba
    }
}

impl Default for PixelType {
    fn default() -> Self {
        Self::UnsignedByte
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::StaticDraw
    }
}

impl Default for DrawMode {
    fn default() -> Self {
        Self::Triangles
    }
}

/// Buffers cleared by `clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    pub const COLOR_DEPTH: Self = Self {
        color: true,
        depth: true,
        stencil: false,
    };

    /// `COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT | STENCIL_BUFFER_BIT` as selected.
    pub const fn to_gl(self) -> u32 {
        let mut bits = 0;
        if self.color {
            bits |= 0x4000;
        }
        if self.depth {
            bits |= 0x0100;
        }
        if self.stencil {
            bits |= 0x0400;
        }
        bits
    }
}
