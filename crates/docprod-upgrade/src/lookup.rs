//! Value lookup collaborator

use docprod_variables::{ExistingValue, LookupError, NewValue, Scope, Variable, VariableId};

/// Read-only access to persisted values
///
/// The calculator only reads through this trait; applying the returned
/// operations is the host's job.
pub trait ValueLookup {
    /// Values of a variable in a scope, ordered by list position
    ///
    /// Table column values of every row are included.
    ///
    /// # Errors
    /// Propagates store failures
    fn values(&self, scope: Scope, variable_id: VariableId) -> Result<Vec<ExistingValue>, LookupError>;

    /// Scopes holding at least one value of any of the variables
    ///
    /// # Errors
    /// Propagates store failures
    fn scopes_with_values(&self, variable_ids: &[VariableId]) -> Result<Vec<Scope>, LookupError>;

    /// Values a brand-new section starts with in a scope
    ///
    /// # Errors
    /// Propagates store failures
    fn default_values(&self, scope: Scope, variable: &Variable) -> Result<Vec<NewValue>, LookupError> {
        let _ = (scope, variable);
        Ok(Vec::new())
    }
}
