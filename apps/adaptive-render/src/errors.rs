use thiserror::Error;

/// Failures of the durable key-value store backing the tier cache.
/// Never surfaced past `TierCache`; a failing store reads as a cache miss.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded")]
    QuotaExceeded,
}

/// Benchmark environment anomalies.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// No off-DOM canvas could be created at all.
    #[error("Canvas unavailable")]
    CanvasUnavailable,

    /// A canvas exists but exposes no 2-D context.
    #[error("2-D canvas context unavailable")]
    ContextUnavailable,
}

impl BenchmarkError {
    /// A missing canvas is itself a strong signal of a constrained environment.
    pub fn is_constrained_environment(&self) -> bool {
        matches!(self, Self::CanvasUnavailable | Self::ContextUnavailable)
    }
}

/// A single DOM call failed. Callers skip the affected element.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("Element {0} no longer exists")]
    Detached(usize),

    #[error("Style access failed: {0}")]
    Style(String),

    #[error("Stylesheet injection failed: {0}")]
    Stylesheet(String),
}

/// Orchestration-level error. `AdaptiveRenderer::boot` is the only consumer and
/// always resolves it to the safe default tier.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Benchmark error: {0}")]
    Benchmark(#[from] BenchmarkError),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
