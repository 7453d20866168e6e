//! Error types for scene file I/O.

/// Errors that can occur while saving or loading a scene file.
///
/// Problems confined to one entity record are not errors: the record is
/// skipped with a warning and the rest of the scene loads.
#[derive(Debug, thiserror::Error)]
pub enum SceneFileError {
    /// The text is not a valid scene document.
    #[error("malformed scene file: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// RON encoding failed.
    #[error("failed to encode scene: {0}")]
    Encode(#[from] ron::Error),
    #[error("scene file I/O: {0}")]
    Io(#[from] std::io::Error),
}
