use crate::types::RecordKind;

/// Failures raised by registry lookups and tick steps.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// A referenced id no longer resolves. Fatal to the step that hit it.
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },

    /// Settling a buyerless trade, or timing out a closed one.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl SimError {
    pub fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        SimError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Structural errors (broken references) halt the simulation loop.
    pub fn is_structural(&self) -> bool {
        matches!(self, SimError::NotFound { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;

/// Failures loading or validating a [`crate::config::SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::not_found(RecordKind::Stock, "abc");
        assert_eq!(err.to_string(), "stock abc not found");
        assert!(err.is_structural());

        let err = SimError::InvalidStateTransition("closing a buyerless trade".into());
        assert_eq!(
            err.to_string(),
            "invalid state transition: closing a buyerless trade"
        );
        assert!(!err.is_structural());
    }
}
