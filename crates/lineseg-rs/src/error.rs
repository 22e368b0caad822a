use std::path::PathBuf;

/// Errors raised by label-map construction, decoding, and metric computation.
///
/// Every variant is a deterministic consequence of the input; nothing here is
/// transient, so callers never need to retry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced image or model path does not exist.
    #[error("resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),

    /// A fourth label was stacked onto a pixel already holding three.
    #[error("pixel ({row}, {col}) already holds 3 labels (packed value {value:#08x})")]
    Overflow { row: usize, col: usize, value: u32 },

    /// Buffer layout or spatial shapes do not conform.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Labels must fit in one byte and 0 is reserved for background.
    #[error("invalid polygon label {0}: expected 1..=255")]
    InvalidLabel(u32),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::ResourceNotFound`] unless `path` names an existing file.
pub fn require_file(path: &std::path::Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::ResourceNotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_file_missing() {
        let err = require_file(std::path::Path::new("nowhere_to_be_found.mlmodel")).unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound(_)));
        assert!(err.to_string().contains("nowhere_to_be_found.mlmodel"));
    }

    #[test]
    fn test_overflow_message() {
        let err = Error::Overflow {
            row: 2,
            col: 3,
            value: 0x020303,
        };
        assert_eq!(
            err.to_string(),
            "pixel (2, 3) already holds 3 labels (packed value 0x020303)"
        );
    }
}
