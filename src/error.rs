use thiserror::Error;

// ---------------------------------------------------------------------------
// Engine error taxonomy
// ---------------------------------------------------------------------------

/// Errors surfaced by engine operations.
///
/// Every error is local to the invocation that produced it; no partial
/// result accompanies an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// Requested column is not part of the allow-list.
    #[error("invalid column '{0}' (expected one of Age, Height, Weight)")]
    InvalidColumn(String),

    /// A column or column pair has no usable rows once missing entries are dropped.
    #[error("no valid data: {context}")]
    NoValidData { context: String },

    /// A numeric parameter lies outside its domain.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// Every nonlinear optimization strategy failed.
    #[error("curve fit failed: none of {attempted} strategies converged")]
    FitFailed { attempted: usize },
}

impl StatsError {
    pub fn no_valid_data(context: impl Into<String>) -> Self {
        StatsError::NoValidData {
            context: context.into(),
        }
    }

    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        StatsError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable name, used when rendering errors on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            StatsError::InvalidColumn(_) => "invalid_column",
            StatsError::NoValidData { .. } => "no_valid_data",
            StatsError::InvalidParameter { .. } => "invalid_parameter",
            StatsError::FitFailed { .. } => "fit_failed",
        }
    }
}

/// Result alias for engine operations.
pub type StatsResult<T> = Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(StatsError::InvalidColumn("Sport".into()).kind(), "invalid_column");
        assert_eq!(StatsError::no_valid_data("Age").kind(), "no_valid_data");
        assert_eq!(
            StatsError::invalid_parameter("bins", "must be positive").kind(),
            "invalid_parameter"
        );
        assert_eq!(StatsError::FitFailed { attempted: 3 }.kind(), "fit_failed");
    }

    #[test]
    fn test_display_mentions_parameter() {
        let err = StatsError::invalid_parameter("sample_size", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter 'sample_size': must be positive"
        );
    }
}
