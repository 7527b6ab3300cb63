/// Evaluation and reporting errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("word {word} has no model clusters to evaluate against")]
    EmptyModelLayer { word: String },

    #[error("attempt {node} is not comparable with any model of word {word}")]
    IncomparableAttempt { word: String, node: String },

    #[error("malformed correction graph: {reason}")]
    MalformedCorrectionGraph { reason: String },

    #[error("report serialization failed: {reason}")]
    ReportSerialization { reason: String },
}
