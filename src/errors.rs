use serde::{Deserialize, Serialize};

/// Category of a failed camera acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionErrorKind {
    /// The user or the OS refused camera access
    PermissionDenied,
    /// No camera, or the camera is busy / unreadable
    DeviceUnavailable,
    /// The requested resolution cannot be satisfied by the device
    ConstraintsUnsatisfiable,
    Other,
}

impl AcquisitionErrorKind {
    /// Canonical error name reported for this category
    pub fn canonical_name(&self) -> &'static str {
        match self {
            AcquisitionErrorKind::PermissionDenied => "NotAllowedError",
            AcquisitionErrorKind::DeviceUnavailable => "NotFoundError",
            AcquisitionErrorKind::ConstraintsUnsatisfiable => "OverconstrainedError",
            AcquisitionErrorKind::Other => "UnknownError",
        }
    }

    /// Classify a platform error name
    pub fn from_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "SecurityError" | "PermissionDeniedError" => {
                AcquisitionErrorKind::PermissionDenied
            }
            "NotFoundError" | "NotReadableError" | "AbortError" | "DevicesNotFoundError" => {
                AcquisitionErrorKind::DeviceUnavailable
            }
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => {
                AcquisitionErrorKind::ConstraintsUnsatisfiable
            }
            _ => AcquisitionErrorKind::Other,
        }
    }
}

/// A rejected camera acquisition, carrying the platform's category and text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{name} - {message}")]
pub struct AcquisitionError {
    pub kind: AcquisitionErrorKind,
    pub name: String,
    pub message: String,
}

impl AcquisitionError {
    pub fn new(kind: AcquisitionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: kind.canonical_name().to_string(),
            message: message.into(),
        }
    }

    /// Build from a named platform error, keeping the name verbatim
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: AcquisitionErrorKind::from_name(&name),
            name,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(AcquisitionErrorKind::PermissionDenied, message)
    }

    pub fn device_unavailable(message: impl Into<String>) -> Self {
        Self::new(AcquisitionErrorKind::DeviceUnavailable, message)
    }

    pub fn constraints_unsatisfiable(message: impl Into<String>) -> Self {
        Self::new(AcquisitionErrorKind::ConstraintsUnsatisfiable, message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Error accessing webcam: {0}")]
    Acquisition(#[from] AcquisitionError),
    #[error("Camera access unsupported: {0}")]
    UnsupportedPlatform(String),
    #[error("Invalid resolution selection: {0}")]
    InvalidSelection(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Encoding error: {0}")]
    EncodingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
