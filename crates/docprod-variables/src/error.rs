//! Error types for variable definitions, lookups and validation

use crate::ids::VariableId;
use crate::variable::VariableType;

/// Errors from the variable lookup collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Variable is not part of the variable set being consulted
    #[error("variable {0} not found")]
    VariableNotFound(VariableId),

    /// Backing store could not answer
    #[error("variable lookup unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised when a value is not legal for a variable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Nonzero list position on a variable that is not a list
    #[error("variable {variable_id} is not a list")]
    NotList {
        /// Variable being validated against
        variable_id: VariableId,
    },

    /// Value payload is of the wrong kind
    #[error("variable {variable_id} expects {expected} values, got {}", display_actual(.actual))]
    TypeMismatch {
        /// Variable being validated against
        variable_id: VariableId,
        /// Kind of the variable
        expected: VariableType,
        /// Kind of the value; `None` for deleted markers
        actual: Option<VariableType>,
    },

    /// Payload has the right kind but breaks a constraint
    #[error("invalid value for variable {variable_id}: {reason}")]
    Invalid {
        /// Variable being validated against
        variable_id: VariableId,
        /// Which constraint was broken
        reason: String,
    },

    /// Lookup needed by the validation failed
    #[error("lookup failed during validation: {0}")]
    Lookup(#[from] LookupError),
}

impl ValidationError {
    pub(crate) fn invalid(variable_id: VariableId, reason: impl Into<String>) -> Self {
        Self::Invalid {
            variable_id,
            reason: reason.into(),
        }
    }
}

fn display_actual(actual: &Option<VariableType>) -> String {
    actual.map_or_else(|| "deleted".to_string(), |t| t.to_string())
}

/// Errors in a variable definition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// Sections may only contain sections
    #[error("section child {child_id} must be a Section, got {actual}")]
    SectionChildNotSection {
        /// Offending child
        child_id: VariableId,
        /// Its kind
        actual: VariableType,
    },

    /// Same variable ID appears twice in one manifest
    #[error("variable {0} appears more than once in the manifest")]
    DuplicateVariable(VariableId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_message_names_both_kinds() {
        let err = ValidationError::TypeMismatch {
            variable_id: VariableId(3),
            expected: VariableType::Number,
            actual: Some(VariableType::Text),
        };
        assert_eq!(err.to_string(), "variable 3 expects Number values, got Text");

        let deleted = ValidationError::TypeMismatch {
            variable_id: VariableId(3),
            expected: VariableType::Number,
            actual: None,
        };
        assert!(deleted.to_string().ends_with("got deleted"));
    }

    #[test]
    fn lookup_errors_convert() {
        let err: ValidationError = LookupError::VariableNotFound(VariableId(1)).into();
        assert!(matches!(err, ValidationError::Lookup(_)));
    }
}
