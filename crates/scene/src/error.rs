use glscene_gl::GlError;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("no camera available to render with")]
    NoCamera,
    #[error(transparent)]
    Gl(#[from] GlError),
}
