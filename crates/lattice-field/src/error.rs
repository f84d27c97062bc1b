//! Error types for field layout operations.

use thiserror::Error;

/// Errors raised while resolving or transforming a field layout.
///
/// Every variant is a precondition failure: operations check their inputs
/// before touching the backing array, so an error never leaves a field
/// partially modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// A descriptor or coordinate name is not resolvable.
    #[error("unknown axis or field type: {0}")]
    UnknownAxis(String),

    /// An axes order does not match the multiset of the field's axes.
    #[error("axes order {found:?} does not match field axes {expected:?}")]
    AxisMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Attempt to squeeze an axis occurrence larger than one.
    #[error("trying to squeeze axis '{axis}' with size {size} larger than one")]
    Squeeze { axis: String, size: usize },

    /// A chunk spec references an axis absent from the field shape.
    #[error("chunk spec references axis '{0}' which is not part of the field shape")]
    ChunkKey(String),

    /// A write-once attribute was assigned twice.
    #[error("{0} is already set and cannot be reassigned")]
    WriteOnce(&'static str),

    /// Malformed operation arguments.
    #[error("invalid parameters for {op}: {message}")]
    ParameterValidation { op: &'static str, message: String },

    /// Reorder between orders with different axis multisets.
    #[error("incompatible axes orders: new {new:?}, old {old:?}")]
    ReorderMismatch { new: Vec<String>, old: Vec<String> },

    /// The lattice definition is inconsistent.
    #[error("invalid lattice: {0}")]
    InvalidLattice(String),

    /// The array backend rejected an operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FieldError {
    /// Create an UnknownAxis error.
    pub fn unknown_axis(name: impl Into<String>) -> Self {
        Self::UnknownAxis(name.into())
    }

    /// Create an AxisMismatch error from two name sequences.
    pub fn axis_mismatch<E, F>(expected: &[E], found: &[F]) -> Self
    where
        E: AsRef<str>,
        F: AsRef<str>,
    {
        Self::AxisMismatch {
            expected: expected.iter().map(|s| s.as_ref().to_string()).collect(),
            found: found.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Create a ParameterValidation error.
    pub fn invalid_params(op: &'static str, message: impl Into<String>) -> Self {
        Self::ParameterValidation {
            op,
            message: message.into(),
        }
    }

    /// Create a Backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an InvalidLattice error.
    pub fn invalid_lattice(msg: impl Into<String>) -> Self {
        Self::InvalidLattice(msg.into())
    }
}

impl From<std::io::Error> for FieldError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for FieldError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for field operations.
pub type Result<T> = std::result::Result<T, FieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldError::unknown_axis("spinor");
        assert_eq!(err.to_string(), "unknown axis or field type: spinor");

        let err = FieldError::Squeeze {
            axis: "x".to_string(),
            size: 4,
        };
        assert!(err.to_string().contains("'x'"));
        assert!(err.to_string().contains("size 4"));

        let err = FieldError::WriteOnce("lattice");
        assert_eq!(
            err.to_string(),
            "lattice is already set and cannot be reassigned"
        );
    }

    #[test]
    fn test_axis_mismatch_collects_names() {
        let err = FieldError::axis_mismatch(&["x", "y"], &["x".to_string()]);
        assert_eq!(
            err,
            FieldError::AxisMismatch {
                expected: vec!["x".to_string(), "y".to_string()],
                found: vec!["x".to_string()],
            }
        );
    }
}
