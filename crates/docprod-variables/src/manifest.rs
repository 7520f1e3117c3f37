//! Manifests
//!
//! A [`Manifest`] is one version of the ordered variable set of a document
//! template. Top-level variables are ordered by position; nested sections and
//! table columns are flattened into document order behind their parent.

use crate::error::{DefinitionError, LookupError};
use crate::ids::{DocumentTemplateId, ManifestId, VariableId};
use crate::lookup::VariableLookup;
use crate::variable::Variable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of a manifest version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestHeader {
    /// Manifest version; later manifests have higher IDs
    pub id: ManifestId,
    /// Template the manifest belongs to
    pub document_template_id: DocumentTemplateId,
}

impl ManifestHeader {
    /// Create header
    #[inline]
    #[must_use]
    pub fn new(id: ManifestId, document_template_id: DocumentTemplateId) -> Self {
        Self {
            id,
            document_template_id,
        }
    }
}

/// Ordered variable set of one manifest version
#[derive(Debug, Clone)]
pub struct Manifest {
    header: ManifestHeader,
    top_level: Vec<Arc<Variable>>,
    variables: IndexMap<VariableId, Arc<Variable>>,
}

impl Manifest {
    /// Build a manifest from its top-level variables in any order
    ///
    /// # Errors
    /// [`DefinitionError::DuplicateVariable`] if a variable ID appears twice
    /// anywhere in the tree.
    pub fn new(
        header: ManifestHeader,
        variables: impl IntoIterator<Item = Variable>,
    ) -> Result<Self, DefinitionError> {
        let mut top_level: Vec<Arc<Variable>> = variables.into_iter().map(Arc::new).collect();
        top_level.sort_by_key(|variable| (variable.position(), variable.id()));

        let mut flattened = IndexMap::new();
        for root in &top_level {
            if flattened.insert(root.id(), Arc::clone(root)).is_some() {
                return Err(DefinitionError::DuplicateVariable(root.id()));
            }
            for node in root.walk_tree().skip(1) {
                if flattened
                    .insert(node.id(), Arc::new(node.clone()))
                    .is_some()
                {
                    return Err(DefinitionError::DuplicateVariable(node.id()));
                }
            }
        }

        tracing::debug!(
            "manifest {}: {} top-level, {} total variables",
            header.id,
            top_level.len(),
            flattened.len()
        );

        Ok(Self {
            header,
            top_level,
            variables: flattened,
        })
    }

    /// Header
    #[inline]
    #[must_use]
    pub fn header(&self) -> ManifestHeader {
        self.header
    }

    /// Manifest version
    #[inline]
    #[must_use]
    pub fn id(&self) -> ManifestId {
        self.header.id
    }

    /// Top-level variables ordered by position
    #[inline]
    #[must_use]
    pub fn top_level(&self) -> &[Arc<Variable>] {
        &self.top_level
    }

    /// Every variable, nested ones included, in document order
    pub fn variables(&self) -> impl Iterator<Item = &Arc<Variable>> + '_ {
        self.variables.values()
    }

    /// Variable by ID, nested ones included
    #[inline]
    #[must_use]
    pub fn get(&self, id: VariableId) -> Option<&Arc<Variable>> {
        self.variables.get(&id)
    }

    /// Whether the ID belongs to this manifest
    #[inline]
    #[must_use]
    pub fn contains(&self, id: VariableId) -> bool {
        self.variables.contains_key(&id)
    }

    /// Number of variables, nested ones included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the manifest has no variables
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl VariableLookup for Manifest {
    fn fetch_variable(&self, id: VariableId) -> Result<Arc<Variable>, LookupError> {
        self.get(id)
            .cloned()
            .ok_or(LookupError::VariableNotFound(id))
    }

    fn fetch_all_variables(&self) -> Result<Vec<Arc<Variable>>, LookupError> {
        Ok(self.variables.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::StableId;
    use crate::variable::{
        BaseVariable, SectionVariable, TableColumn, TableStyle, TableVariable, VariableKind,
    };

    fn header() -> ManifestHeader {
        ManifestHeader::new(ManifestId(1), DocumentTemplateId(1))
    }

    fn leaf(id: i64, position: u32) -> Variable {
        Variable::new(
            BaseVariable::new(VariableId(id), StableId::new(format!("{id}")), "v", position),
            VariableKind::Date,
        )
    }

    fn section(id: i64, position: u32, children: Vec<Variable>) -> Variable {
        let mut section = SectionVariable::new(true);
        for child in children {
            section.add_child(child).unwrap();
        }
        Variable::new(
            BaseVariable::new(VariableId(id), StableId::new(format!("{id}")), "s", position),
            VariableKind::Section(section),
        )
    }

    fn ids(manifest: &Manifest) -> Vec<i64> {
        manifest.variables().map(|v| v.id().value()).collect()
    }

    #[test]
    fn orders_by_position_then_flattens() {
        let table = Variable::new(
            BaseVariable::new(VariableId(5), StableId::new("5"), "t", 1),
            VariableKind::Table(TableVariable {
                table_style: TableStyle::Vertical,
                columns: vec![TableColumn {
                    is_header: true,
                    variable: leaf(6, 0),
                }],
            }),
        );
        let manifest = Manifest::new(
            header(),
            vec![
                leaf(9, 2),
                table,
                section(1, 0, vec![section(2, 0, vec![]), section(3, 1, vec![])]),
            ],
        )
        .unwrap();

        assert_eq!(ids(&manifest), vec![1, 2, 3, 5, 6, 9]);
        assert_eq!(manifest.top_level().len(), 3);
        assert!(manifest.contains(VariableId(6)));
        assert_eq!(manifest.fetch_variable(VariableId(3)).unwrap().id(), VariableId(3));
        assert_eq!(
            manifest.fetch_variable(VariableId(4)).unwrap_err(),
            LookupError::VariableNotFound(VariableId(4))
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = Manifest::new(
            header(),
            vec![section(1, 0, vec![section(2, 0, vec![])]), leaf(2, 1)],
        );
        assert_eq!(
            result.unwrap_err(),
            DefinitionError::DuplicateVariable(VariableId(2))
        );
    }

    #[test]
    fn empty_manifest() {
        let manifest = Manifest::new(header(), Vec::<Variable>::new()).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.len(), 0);
    }
}
