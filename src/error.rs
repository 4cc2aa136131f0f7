// Error taxonomy shared by the table, aggregate and import layers.
// The service layer flattens every variant into a failure envelope.

/// Failures raised by roster operations.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// Missing or invalid required input. The message names the field.
    #[error("{0}")]
    Validation(String),

    /// Identifier does not resolve, or resolves to a soft-deleted row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Registration-number uniqueness violation.
    #[error("{0}")]
    Conflict(String),

    /// Unparseable time string.
    #[error("{0}")]
    Format(String),

    /// Underlying tabular store failed.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl RosterError {
    pub fn required(field: &str) -> Self {
        RosterError::Validation(format!("{} is required", field))
    }

    pub fn not_found(entity: &'static str, id: &str) -> Self {
        RosterError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RosterError::Validation(_) => "validation",
            RosterError::NotFound { .. } => "not_found",
            RosterError::Conflict(_) => "conflict",
            RosterError::Format(_) => "format",
            RosterError::Store(_) => "store",
        }
    }
}

pub type RosterResult<T> = Result<T, RosterError>;
