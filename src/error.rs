//! Error types for slotcycle.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Panel error: {0}")]
    Panel(#[from] PanelError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Panel client errors.
///
/// Every panel call returns one of these as a value; panel failures never
/// panic across the client boundary. Transport failures, rejected
/// operations and malformed payloads are distinguished so the fallback
/// logic can treat an "HTTP 200 but unusable" response the same way it
/// treats a timeout.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("Panel {panel} request failed: {reason}")]
    RequestFailed { panel: String, reason: String },

    #[error("Panel {panel} rejected the operation: {reason}")]
    Rejected { panel: String, reason: String },

    #[error("Invalid response from panel {panel}: {reason}")]
    InvalidResponse { panel: String, reason: String },

    #[error("Panel {panel} returned no slots")]
    NoSlots { panel: String },

    #[error("Member handle was not minted by panel {panel}")]
    HandleMismatch { panel: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PanelError {
    /// The panel a failure originated from, when known.
    pub fn panel(&self) -> Option<&str> {
        match self {
            Self::RequestFailed { panel, .. }
            | Self::Rejected { panel, .. }
            | Self::InvalidResponse { panel, .. }
            | Self::NoSlots { panel }
            | Self::HandleMismatch { panel } => Some(panel),
            Self::Http(_) | Self::Json(_) => None,
        }
    }
}

/// Batch-level errors.
///
/// A batch run only fails as a whole on invalid input; per-account and
/// per-slot failures are recorded in the summary instead.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Batch request contains no accounts")]
    NoAccounts,

    #[error("Batch request has an empty disposable number")]
    MissingDisposable,
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
