use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Axis '{axis}' missing from {context}")]
    MissingAxis { axis: String, context: String },

    #[error("Probe face {face} missing from saturation-current data")]
    MissingFace { face: u32 },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Cannot convert {from} to {to}")]
    UnitMismatch { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
