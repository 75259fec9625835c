//! Error types shared by every effect.

use thiserror::Error;

use crate::effects::EffectKind;

/// Classification of an [`EffectError`], for hosts that decide between
/// aborting a derivative and falling back to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Arguments were missing, out of range or unrecognized.
    Validation,
    /// A pixel region could not be addressed.
    Geometry,
    /// A named overlay or font could not be resolved or read.
    Resource,
}

/// Error returned by effect operations and the pipeline.
#[derive(Debug, Error)]
pub enum EffectError {
    /// Rejected before any pixel was touched.
    #[error("invalid arguments for {operation}: {message}")]
    Validation {
        operation: EffectKind,
        message: String,
    },

    /// The requested region does not fit the buffers involved.
    #[error("geometry failure in {operation}: {message}")]
    Geometry {
        operation: EffectKind,
        message: String,
    },

    /// An overlay or font resource was unavailable.
    #[error("resource '{name}' unavailable: {message}")]
    Resource { name: String, message: String },

    /// The pipeline document could not be parsed.
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl EffectError {
    pub(crate) fn validation(operation: EffectKind, message: impl Into<String>) -> Self {
        EffectError::Validation {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn geometry(operation: EffectKind, message: impl Into<String>) -> Self {
        EffectError::Geometry {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn resource(name: impl Into<String>, message: impl Into<String>) -> Self {
        EffectError::Resource {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Which class of failure this is.
    pub fn kind(&self) -> FailureKind {
        match self {
            EffectError::Validation { .. } | EffectError::Config(_) => FailureKind::Validation,
            EffectError::Geometry { .. } => FailureKind::Geometry,
            EffectError::Resource { .. } => FailureKind::Resource,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EffectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EffectError::validation(EffectKind::Border, "border_thick_top must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid arguments for border: border_thick_top must be > 0"
        );

        let err = EffectError::resource("frame", "no overlay registered");
        assert_eq!(
            err.to_string(),
            "resource 'frame' unavailable: no overlay registered"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            EffectError::geometry(EffectKind::Padding, "x").kind(),
            FailureKind::Geometry
        );
        assert_eq!(
            EffectError::validation(EffectKind::Filter, "x").kind(),
            FailureKind::Validation
        );
        assert_eq!(
            EffectError::resource("font", "x").kind(),
            FailureKind::Resource
        );
    }

    #[test]
    fn test_config_error_is_validation() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = EffectError::from(json_err);
        assert_eq!(err.kind(), FailureKind::Validation);
        assert!(err.to_string().starts_with("invalid pipeline configuration"));
    }
}
