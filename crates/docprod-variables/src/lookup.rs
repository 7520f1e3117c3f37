//! Variable lookup collaborator
//!
//! Validation of section injections and the upgrade calculator resolve
//! variables by ID through [`VariableLookup`] instead of holding live
//! references, since a referenced variable may not be loaded yet.

use crate::error::LookupError;
use crate::ids::VariableId;
use crate::variable::Variable;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a variable ID to its current definition
pub trait VariableLookup {
    /// Fetch a variable
    ///
    /// # Errors
    /// [`LookupError::VariableNotFound`] if the ID is not part of the variable
    /// set this lookup represents.
    fn fetch_variable(&self, id: VariableId) -> Result<Arc<Variable>, LookupError>;

    /// Whether the ID resolves
    ///
    /// # Errors
    /// Propagates lookup failures other than "not found"
    fn contains_variable(&self, id: VariableId) -> Result<bool, LookupError> {
        match self.fetch_variable(id) {
            Ok(_) => Ok(true),
            Err(LookupError::VariableNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every variable this lookup knows, all revisions and nested ones included
    ///
    /// Lookups that cannot enumerate return an empty list.
    ///
    /// # Errors
    /// Propagates store failures
    fn fetch_all_variables(&self) -> Result<Vec<Arc<Variable>>, LookupError> {
        Ok(Vec::new())
    }
}

impl<F> VariableLookup for F
where
    F: Fn(VariableId) -> Result<Arc<Variable>, LookupError>,
{
    fn fetch_variable(&self, id: VariableId) -> Result<Arc<Variable>, LookupError> {
        self(id)
    }
}

/// In-memory variable store
///
/// Inserting a composite variable also registers its descendants, so
/// subsections and table columns resolve by ID.
#[derive(Debug, Clone, Default)]
pub struct VariableCatalog {
    variables: HashMap<VariableId, Arc<Variable>>,
}

impl VariableCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable and its descendants, replacing same-ID entries
    pub fn insert(&mut self, variable: Variable) {
        for node in variable.walk_tree().skip(1) {
            self.variables.insert(node.id(), Arc::new(node.clone()));
        }
        self.variables.insert(variable.id(), Arc::new(variable));
    }

    /// Get variable by ID
    #[inline]
    #[must_use]
    pub fn get(&self, id: VariableId) -> Option<&Arc<Variable>> {
        self.variables.get(&id)
    }

    /// Number of registered variables, descendants included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl VariableLookup for VariableCatalog {
    fn fetch_variable(&self, id: VariableId) -> Result<Arc<Variable>, LookupError> {
        self.variables
            .get(&id)
            .cloned()
            .ok_or(LookupError::VariableNotFound(id))
    }

    fn fetch_all_variables(&self) -> Result<Vec<Arc<Variable>>, LookupError> {
        let mut variables: Vec<_> = self.variables.values().cloned().collect();
        variables.sort_by_key(|variable| variable.id());
        Ok(variables)
    }
}

impl FromIterator<Variable> for VariableCatalog {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for variable in iter {
            catalog.insert(variable);
        }
        catalog
    }
}

impl Extend<Variable> for VariableCatalog {
    fn extend<I: IntoIterator<Item = Variable>>(&mut self, iter: I) {
        for variable in iter {
            self.insert(variable);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::StableId;
    use crate::variable::{BaseVariable, SectionVariable, VariableKind};

    fn base(id: i64) -> BaseVariable {
        BaseVariable::new(VariableId(id), StableId::new(format!("s{id}")), "v", 0)
    }

    #[test]
    fn catalog_registers_descendants() {
        let child = Variable::new(base(2), VariableKind::Section(SectionVariable::new(false)));
        let parent = Variable::new(
            base(1),
            VariableKind::Section(SectionVariable::new(true).with_child(child).unwrap()),
        );
        let catalog: VariableCatalog = std::iter::once(parent).collect();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.fetch_variable(VariableId(2)).is_ok());

        let ids: Vec<_> = catalog
            .fetch_all_variables()
            .unwrap()
            .iter()
            .map(|v| v.id())
            .collect();
        assert_eq!(ids, vec![VariableId(1), VariableId(2)]);
    }

    #[test]
    fn missing_variable_is_not_found() {
        let catalog = VariableCatalog::new();
        assert_eq!(
            catalog.fetch_variable(VariableId(5)).unwrap_err(),
            LookupError::VariableNotFound(VariableId(5))
        );
        assert_eq!(catalog.contains_variable(VariableId(5)), Ok(false));
    }

    #[test]
    fn closures_are_lookups() {
        let lookup = |id: VariableId| -> Result<Arc<Variable>, LookupError> {
            Err(LookupError::Unavailable(format!("offline for {id}")))
        };
        assert!(matches!(
            lookup.contains_variable(VariableId(1)),
            Err(LookupError::Unavailable(_))
        ));
    }
}
