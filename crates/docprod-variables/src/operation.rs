//! Value operations
//!
//! [`ValueOperation`] is the only vocabulary for mutating persisted values.
//! Operations are data: producing them never touches storage, and the host
//! applies a list of them in order inside one transaction.

use crate::ids::{Scope, VariableId, VariableValueId};
use crate::value::{ExistingValue, NewValue, RowRef};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind tag of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Add a value after the existing ones
    Append,
    /// Overwrite a persisted value in place
    Update,
    /// Remove a persisted value
    Delete,
    /// Swap all values of a variable (within a row) for a new list
    Replace,
}

impl Display for OperationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Append => "Append",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Replace => "Replace",
        };
        f.write_str(name)
    }
}

/// One mutation of persisted values
///
/// Order within an operation list matters: a column value whose row is
/// [`RowRef::Appended`] must come after the Append that creates the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum ValueOperation {
    /// Add a new value
    ///
    /// Positionless: the host assigns the final list position in Append order.
    Append {
        /// Value to add
        value: NewValue,
    },

    /// Overwrite a persisted value, keeping its identity
    Update {
        /// Replacement content, carrying the identity to overwrite
        value: ExistingValue,
    },

    /// Remove a persisted value
    Delete {
        /// Scope owning the value
        scope: Scope,
        /// Value to remove
        value_id: VariableValueId,
    },

    /// Replace every value of a variable, optionally within one table row
    Replace {
        /// Scope owning the values
        scope: Scope,
        /// Variable whose values are replaced
        variable_id: VariableId,
        /// Row the values belong to, for table columns
        row_value_id: Option<RowRef>,
        /// New values in list order
        values: Vec<NewValue>,
    },
}

impl ValueOperation {
    /// Append a new value
    #[inline]
    #[must_use]
    pub fn append(value: NewValue) -> Self {
        Self::Append { value }
    }

    /// Update a persisted value
    #[inline]
    #[must_use]
    pub fn update(value: ExistingValue) -> Self {
        Self::Update { value }
    }

    /// Delete a persisted value
    #[inline]
    #[must_use]
    pub fn delete(value: &ExistingValue) -> Self {
        Self::Delete {
            scope: value.scope(),
            value_id: value.id(),
        }
    }

    /// Kind tag
    #[inline]
    #[must_use]
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Append { .. } => OperationType::Append,
            Self::Update { .. } => OperationType::Update,
            Self::Delete { .. } => OperationType::Delete,
            Self::Replace { .. } => OperationType::Replace,
        }
    }

    /// Scope the operation mutates
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::Append { value } => value.scope(),
            Self::Update { value } => value.scope(),
            Self::Delete { scope, .. } | Self::Replace { scope, .. } => *scope,
        }
    }

    /// Variable the operation targets; unknown for deletes by value ID
    #[must_use]
    pub fn variable_id(&self) -> Option<VariableId> {
        match self {
            Self::Append { value } => Some(value.variable_id()),
            Self::Update { value } => Some(value.variable_id()),
            Self::Delete { .. } => None,
            Self::Replace { variable_id, .. } => Some(*variable_id),
        }
    }

    /// Value being added, if this is an Append
    #[inline]
    #[must_use]
    pub fn appended(&self) -> Option<&NewValue> {
        match self {
            Self::Append { value } => Some(value),
            _ => None,
        }
    }

    /// Check if operation requires a persisted value to exist
    #[inline]
    #[must_use]
    pub fn reads_state(&self) -> bool {
        matches!(self, Self::Update { .. } | Self::Delete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProjectId;
    use crate::value::{ValueBase, ValuePayload};

    fn scope() -> Scope {
        Scope::Project(ProjectId(3))
    }

    fn new_value() -> NewValue {
        NewValue::new(
            ValueBase::new(scope(), VariableId(8), 1),
            ValuePayload::Text("x".into()),
        )
    }

    #[test]
    fn operation_accessors() {
        let append = ValueOperation::append(new_value());
        assert_eq!(append.operation_type(), OperationType::Append);
        assert_eq!(append.scope(), scope());
        assert_eq!(append.variable_id(), Some(VariableId(8)));
        assert!(append.appended().is_some());
        assert!(!append.reads_state());

        let existing = new_value().with_id(VariableValueId(4));
        let delete = ValueOperation::delete(&existing);
        assert_eq!(
            delete,
            ValueOperation::Delete {
                scope: scope(),
                value_id: VariableValueId(4)
            }
        );
        assert_eq!(delete.variable_id(), None);
        assert!(delete.reads_state());
        assert!(ValueOperation::update(existing).reads_state());
    }

    #[test]
    fn replace_is_scoped_to_variable() {
        let replace = ValueOperation::Replace {
            scope: scope(),
            variable_id: VariableId(8),
            row_value_id: Some(RowRef::Value(VariableValueId(2))),
            values: vec![new_value()],
        };
        assert_eq!(replace.operation_type().to_string(), "Replace");
        assert_eq!(replace.variable_id(), Some(VariableId(8)));
        assert!(!replace.reads_state());
    }

    #[test]
    fn operations_serialize_with_tag() {
        let op = ValueOperation::Delete {
            scope: scope(),
            value_id: VariableValueId(4),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "Delete");
        let back: ValueOperation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
