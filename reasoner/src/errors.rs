use thiserror::Error;

/// Failure reported by an external transform or sink handler.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

#[derive(Debug, Error)]
pub enum ReasonerError {
    /// The two operands of a set operation are scoped to different graph
    /// patterns.
    #[error("binding set scope mismatch: [{left}] vs [{right}]")]
    ScopeMismatch { left: String, right: String },

    /// A match refers to a pattern that is not part of the binding set it is
    /// applied to (or of the translation target).
    #[error("match pattern [{pattern}] is outside the binding set scope [{scope}]")]
    PatternOutOfScope { pattern: String, scope: String },

    #[error("failed to parse triple pattern: {0}")]
    PatternParse(String),

    /// A handler failed while being resolved synchronously.
    #[error("handler of rule [{rule}] failed")]
    Handler {
        rule: String,
        #[source]
        source: HandlerError,
    },

    #[error("rule [{0}] has no inverse transform handler")]
    MissingInverseHandler(String),
}
