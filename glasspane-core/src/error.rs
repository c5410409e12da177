use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Error taxonomy for the rendering pipeline. Everything caused by
/// malformed or malicious provider input is recovered locally; only
/// `Surface` is fatal to a session, and nothing here is fatal to the host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Bad provenance or shape. Dropped and logged, no observable effect.
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Allowlist miss, surfaced to the calling program as a rejected call.
    #[error("Operation '{operation}' is not in the session capability allowlist")]
    CapabilityDenied { operation: String },

    #[error("Rate limit exceeded: {max} calls per {window_secs}s window")]
    RateLimited { max: u32, window_secs: u64 },

    #[error("Host call timed out after {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },

    /// The owning session was disposed while the call was outstanding.
    #[error("Call cancelled: session disposed")]
    Cancelled,

    #[error("Unsupported content type for resource '{uri}'")]
    UnsupportedContentType { uri: String },

    /// Uncaught fault in the provider program. The session moves to
    /// `Errored`; the fault never re-throws into the host.
    #[error("Script execution error: {0}")]
    Execution(String),

    /// The isolation primitive itself could not be instantiated. Fatal to
    /// the session, never to the host process.
    #[error("Surface creation failed: {0}")]
    Surface(String),

    /// The external tool collaborator failed or went away.
    #[error("Tool execution failed: {0}")]
    Tool(String),
}
