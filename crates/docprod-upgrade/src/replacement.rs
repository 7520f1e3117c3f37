//! Replacement mapping between old and new variables
//!
//! The mapping must be a function from old to new: several old variables may
//! share one replacement, but no old variable may have two.

use crate::error::UpgradeError;
use docprod_variables::{LookupError, Manifest, Variable, VariableId, VariableLookup};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Old → new variable mapping of one upgrade
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementMap {
    /// New variable → the old variables it replaces, most recent first
    previous: IndexMap<VariableId, Vec<VariableId>>,
    /// Old variable → its replacement
    replacement: HashMap<VariableId, VariableId>,
}

impl ReplacementMap {
    /// Create empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(old, new)` pairs
    ///
    /// # Errors
    /// [`UpgradeError::AmbiguousReplacement`] if an old variable appears with
    /// two different new variables
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (VariableId, VariableId)>,
    ) -> Result<Self, UpgradeError> {
        let mut map = Self::new();
        for (old, new) in pairs {
            map.insert(old, new)?;
        }
        Ok(map)
    }

    /// Build from the `replaces_variable_id` links of a manifest
    ///
    /// Each link is followed backwards through `catalog`, so a variable
    /// replaced in several successive manifests maps every ancestor to the
    /// newest revision.
    ///
    /// # Errors
    /// - [`UpgradeError::AmbiguousReplacement`] if two chains share an ancestor
    /// - [`UpgradeError::Lookup`] if the catalog fails
    pub fn from_manifest(
        manifest: &Manifest,
        catalog: &dyn VariableLookup,
    ) -> Result<Self, UpgradeError> {
        Self::from_variables(manifest.variables().map(|variable| &**variable), catalog)
    }

    /// Build from the `replaces_variable_id` links of any set of variables
    ///
    /// Chains are followed as in [`ReplacementMap::from_manifest`].
    ///
    /// # Errors
    /// - [`UpgradeError::AmbiguousReplacement`] if two chains share an ancestor
    /// - [`UpgradeError::Lookup`] if the catalog fails
    pub fn from_variables<'v>(
        variables: impl IntoIterator<Item = &'v Variable>,
        catalog: &dyn VariableLookup,
    ) -> Result<Self, UpgradeError> {
        let mut map = Self::new();
        for variable in variables {
            let mut seen = HashSet::from([variable.id()]);
            let mut next = variable.replaces_variable_id();
            while let Some(old) = next {
                if !seen.insert(old) {
                    tracing::warn!("replacement chain of variable {} loops at {}", variable.id(), old);
                    break;
                }
                map.insert(old, variable.id())?;
                next = match catalog.fetch_variable(old) {
                    Ok(ancestor) => ancestor.replaces_variable_id(),
                    Err(LookupError::VariableNotFound(_)) => None,
                    Err(e) => return Err(UpgradeError::Lookup(e)),
                };
            }
        }
        Ok(map)
    }

    /// Record that `new` replaces `old`
    ///
    /// Repeating an existing pair is a no-op.
    ///
    /// # Errors
    /// [`UpgradeError::AmbiguousReplacement`] if `old` already has another
    /// replacement
    pub fn insert(&mut self, old: VariableId, new: VariableId) -> Result<(), UpgradeError> {
        match self.replacement.get(&old) {
            Some(&existing) if existing == new => return Ok(()),
            Some(&existing) => {
                return Err(UpgradeError::AmbiguousReplacement {
                    old,
                    first: existing,
                    second: new,
                })
            }
            None => {}
        }
        self.replacement.insert(old, new);
        self.previous.entry(new).or_default().push(old);
        Ok(())
    }

    /// Old variables replaced by `new`, most recent first
    #[must_use]
    pub fn previous(&self, new: VariableId) -> &[VariableId] {
        self.previous.get(&new).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replacement of `old`, if any
    #[inline]
    #[must_use]
    pub fn replacement(&self, old: VariableId) -> Option<VariableId> {
        self.replacement.get(&old).copied()
    }

    /// New variables in insertion order
    pub fn new_variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.previous.keys().copied()
    }

    /// Every replaced variable
    pub fn old_variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.previous.values().flatten().copied()
    }

    /// Number of old → new pairs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.replacement.len()
    }

    /// Whether nothing is replaced
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacement.is_empty()
    }
}
