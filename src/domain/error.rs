// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every fallible operation below the application layer returns
// SegError. The application and CLI layers wrap these in anyhow
// with extra context before they reach the user.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegError {
    /// Invalid configuration, layer map or startup validation failure
    #[error("configuration error: {0}")]
    Config(String),

    /// An image, mask, weight store or directory could not be read or written
    #[error("cannot access '{path}': {reason}")]
    DataIo { path: PathBuf, reason: String },

    /// Two shapes that must agree do not
    #[error("shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what:     String,
        expected: Vec<usize>,
        found:    Vec<usize>,
    },

    /// A checkpoint file, step pointer or saved config is unreadable
    #[error("checkpoint '{path}' is unreadable: {reason}")]
    CheckpointCorrupt { path: PathBuf, reason: String },

    /// A predicted class has no entry in the colour table
    #[error("class index {index} has no colour (palette holds {len})")]
    ClassOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SegError {
    /// Shorthand for a DataIo error from anything displayable
    pub fn data_io(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        SegError::DataIo { path: path.into(), reason: reason.to_string() }
    }

    pub fn checkpoint(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        SegError::CheckpointCorrupt { path: path.into(), reason: reason.to_string() }
    }

    pub fn shape(
        what:     impl Into<String>,
        expected: impl Into<Vec<usize>>,
        found:    impl Into<Vec<usize>>,
    ) -> Self {
        SegError::ShapeMismatch {
            what:     what.into(),
            expected: expected.into(),
            found:    found.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SegError>;

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_names_both_shapes() {
        let e = SegError::shape("conv1_1.weight", [64, 3, 3, 3], [64, 3, 5, 5]);
        let msg = e.to_string();
        assert!(msg.contains("conv1_1.weight"));
        assert!(msg.contains("[64, 3, 3, 3]"));
        assert!(msg.contains("[64, 3, 5, 5]"));
    }

    #[test]
    fn test_io_error_converts() {
        let io  = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SegError = io.into();
        assert!(matches!(err, SegError::Io(_)));
    }
}
