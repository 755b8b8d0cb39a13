use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    /// Bad request shape or values. Never mutates state.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Webhook payload whose signature could not be verified. Rejected with
    /// no state change so the rail retries or gives up per its own policy.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The requested operation is not legal for the entity's current state
    /// (e.g. paying an already-paid estimate).
    #[error("Invalid state: {0}")]
    InvalidStateError(String),

    /// The payment type makes no sense for the target (e.g. a repayment with
    /// nothing outstanding).
    #[error("Invalid payment type: {0}")]
    InvalidPaymentTypeError(String),

    /// An attempted move out of a terminal order status, or a move the state
    /// machine does not allow. Logged and rejected, never silently applied.
    #[error("Illegal transition for order {order_id}: {from} -> {to}")]
    IllegalTransitionError {
        order_id: String,
        from: String,
        to: String,
    },

    /// A rail call exceeded its bound. Retryable failure, never treated as an
    /// ambiguous success.
    #[error("Upstream call to {rail} timed out after {limit_ms}ms")]
    UpstreamTimeoutError { rail: String, limit_ms: u64 },

    /// The remote resource is missing. Triggers the hosted-checkout product
    /// self-heal; a hard failure everywhere else.
    #[error("Upstream resource not found: {0}")]
    UpstreamNotFoundError(String),

    /// Explicit failure reported by the rail itself.
    #[error("Upstream rejected the request: {0}")]
    UpstreamRejectedError(String),

    /// The rail has no adapter configured (or lacks the requested channel).
    #[error("Rail not configured: {0}")]
    NotConfigured(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
