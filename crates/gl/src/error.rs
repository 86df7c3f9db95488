use crate::constants::ShaderStage;

/// Errors surfaced by GPU resource setup.
#[derive(Debug, thiserror::Error)]
pub enum GlError {
    #[error("{stage} failed to compile: {log}")]
    ShaderCompile {
        stage: ShaderStage,
        log: String,
        shader_source: String,
    },
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),
}
