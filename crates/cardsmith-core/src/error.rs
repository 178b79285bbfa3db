//! Error types for the core crate.

use thiserror::Error;

/// Errors raised at the fallible edges of the core (parsing and construction).
///
/// Interactive operations on the store never fail; they follow the silent-recovery
/// policies documented on each method instead.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("invalid color {0:?}: expected #rgb, #rrggbb or #rrggbbaa")]
    InvalidColor(String),
    #[error("invalid pixel source: {0}")]
    InvalidPixelSource(String),
    #[error("invalid image filter {0:?}")]
    InvalidFilter(String),
    #[error("template error: {0}")]
    Template(#[from] serde_json::Error),
    #[error("template must be a JSON array of element descriptors")]
    TemplateShape,
    #[error("element {0} not found")]
    NotFound(String),
}

/// Result type for fallible core operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert!(
            CanvasError::InvalidColor("red".into())
                .to_string()
                .contains("\"red\"")
        );
        assert_eq!(
            CanvasError::NotFound("nome".into()).to_string(),
            "element nome not found"
        );
    }
}
