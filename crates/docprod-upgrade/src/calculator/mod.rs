//! Upgrade Calculator
//!
//! Computes the ordered [`ValueOperation`]s that move one scope's values from
//! replaced variables onto their replacements. The calculator reads through
//! the lookup collaborators and never writes: the host applies the returned
//! operations in order inside one transaction.
//!
//! # Guarantees
//! - A new variable that already has values in the scope gets no Appends, so
//!   applying the result and calculating again yields nothing new.
//! - Operations follow the document order of the new variables; within a
//!   variable, old list order; within a table, each row container precedes
//!   its column values.
//! - A value that cannot be converted or no longer validates is dropped.
//!   Only structurally impossible input is an error.
//! - Section values that use a replaced variable are re-pointed at its
//!   replacement, whether or not the variable belongs to the target manifest.

mod section;
mod table;

use crate::config::UpgradeConfig;
use crate::error::UpgradeError;
use crate::lookup::ValueLookup;
use crate::replacement::ReplacementMap;
use docprod_variables::{
    ExistingValue, LookupError, Manifest, ManifestHeader, RowRef, Scope, StableId,
    ValueOperation, ValuePayload, Variable, VariableId, VariableKind, VariableLookup,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Calculates value migrations for one manifest upgrade
///
/// Create one per upgrade; it can then be run against any number of scopes.
pub struct UpgradeCalculator<'a> {
    replacements: ReplacementMap,
    /// New variables in document order
    targets: Vec<Arc<Variable>>,
    /// Table columns among the targets; migrated with their table
    columns: HashSet<VariableId>,
    /// Resolves any variable, old or new
    catalog: &'a dyn VariableLookup,
    /// Resolves the variables new values are validated against
    references: ReferenceLookup<'a>,
    values: &'a dyn ValueLookup,
    config: UpgradeConfig,
    /// Brand-new sections may start from defaults (document mode only)
    section_defaults: bool,
}

impl<'a> UpgradeCalculator<'a> {
    /// Calculator for explicit `(old, new)` replacement pairs
    ///
    /// Besides the new variables, the current revision of every section the
    /// catalog knows is visited, so sections using a replaced variable are
    /// re-pointed. Variables are processed in `(position, id)` order.
    ///
    /// # Errors
    /// - [`UpgradeError::AmbiguousReplacement`] if an old variable has two
    ///   replacements
    /// - [`UpgradeError::VariableNotFound`] if a new variable is unknown to
    ///   `catalog`
    pub fn for_replacements(
        pairs: impl IntoIterator<Item = (VariableId, VariableId)>,
        catalog: &'a dyn VariableLookup,
        values: &'a dyn ValueLookup,
    ) -> Result<Self, UpgradeError> {
        let replacements = ReplacementMap::from_pairs(pairs)?;
        let mut targets = replacements
            .new_variables()
            .map(|id| catalog.fetch_variable(id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen: HashSet<VariableId> = targets.iter().map(|variable| variable.id()).collect();
        let sections = current_revisions(&catalog.fetch_all_variables()?)
            .into_iter()
            .filter(|variable| variable.as_section().is_some())
            .filter(|section| replacements.replacement(section.id()).is_none());
        for section in sections {
            if seen.insert(section.id()) {
                targets.push(section);
            }
        }
        targets.sort_by_key(|variable| (variable.position(), variable.id()));

        Ok(Self::assemble(replacements, targets, catalog, catalog, values))
    }

    /// Calculator moving a document from the `current` manifest to `target`
    ///
    /// Replacements come from the `replaces_variable_id` links of the target
    /// manifest and of the current revision of every non-section variable
    /// outside it (project-level variables sections may use), followed back
    /// through `catalog`. Every variable of the target manifest is processed
    /// in document order, so sections that merely use replaced variables are
    /// updated as well.
    ///
    /// # Errors
    /// - [`UpgradeError::Downgrade`] if `target` is older than `current` and
    ///   downgrades are not allowed
    /// - [`UpgradeError::TemplateMismatch`] if the manifests belong to
    ///   different document templates
    /// - [`UpgradeError::EmptyManifest`] if `target` has no variables
    pub fn for_document(
        current: ManifestHeader,
        target: &'a Manifest,
        catalog: &'a dyn VariableLookup,
        values: &'a dyn ValueLookup,
        config: UpgradeConfig,
    ) -> Result<Self, UpgradeError> {
        let header = target.header();
        if header.id < current.id && !config.allow_downgrade {
            return Err(UpgradeError::Downgrade {
                from: current.id,
                to: header.id,
            });
        }
        if header.document_template_id != current.document_template_id {
            return Err(UpgradeError::TemplateMismatch {
                from_template: current.document_template_id,
                from_manifest: current.id,
                to_template: header.document_template_id,
                to_manifest: header.id,
            });
        }
        if target.is_empty() {
            return Err(UpgradeError::EmptyManifest(header.id));
        }

        let in_manifest: HashSet<&StableId> =
            target.variables().map(|variable| variable.stable_id()).collect();
        let shared: Vec<Arc<Variable>> = current_revisions(&catalog.fetch_all_variables()?)
            .into_iter()
            .filter(|variable| variable.as_section().is_none())
            .filter(|variable| !in_manifest.contains(variable.stable_id()))
            .collect();

        let replacements = ReplacementMap::from_variables(
            target.variables().chain(&shared).map(|variable| &**variable),
            catalog,
        )?;
        tracing::info!(
            "upgrade from manifest {} to {}: {} replaced variables, {} shared variables",
            current.id,
            header.id,
            replacements.len(),
            shared.len()
        );

        let targets = target.variables().cloned().collect();
        let mut calculator = Self::assemble(replacements, targets, catalog, target, values);
        calculator.section_defaults = true;
        Ok(calculator.with_config(config))
    }

    fn assemble(
        replacements: ReplacementMap,
        targets: Vec<Arc<Variable>>,
        catalog: &'a dyn VariableLookup,
        target: &'a dyn VariableLookup,
        values: &'a dyn ValueLookup,
    ) -> Self {
        let columns = targets
            .iter()
            .filter_map(|variable| variable.as_table())
            .flat_map(|table| table.columns.iter().map(|column| column.variable.id()))
            .collect();

        Self {
            replacements,
            targets,
            columns,
            catalog,
            references: ReferenceLookup { target, catalog },
            values,
            config: UpgradeConfig::default(),
            section_defaults: false,
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: UpgradeConfig) -> Self {
        self.config = config;
        self
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> UpgradeConfig {
        self.config
    }

    /// Old → new mapping in effect
    #[inline]
    #[must_use]
    pub fn replacements(&self) -> &ReplacementMap {
        &self.replacements
    }

    /// Operations migrating one scope
    ///
    /// # Errors
    /// Structural errors only: a value not matching its own variable, an
    /// unknown variable, or a failing store.
    pub fn calculate(&self, scope: Scope) -> Result<Vec<ValueOperation>, UpgradeError> {
        let mut run = Run::new(self, scope);

        for target in &self.targets {
            if self.columns.contains(&target.id()) {
                continue;
            }
            match target.kind() {
                VariableKind::Section(_) => run.section(target)?,
                VariableKind::Table(table) => run.table(target, table)?,
                VariableKind::Number(_)
                | VariableKind::Text(_)
                | VariableKind::Date
                | VariableKind::Email
                | VariableKind::Image
                | VariableKind::Link
                | VariableKind::Select(_) => run.scalar(target)?,
            }
        }

        tracing::info!("calculated {} operations for {}", run.operations.len(), scope);
        Ok(run.operations)
    }

    /// Operations for every scope holding values of a replaced variable or of
    /// a visited section
    ///
    /// Scopes are processed in ascending order; scopes that end up with no
    /// operations (typically because they were already migrated) are left out.
    ///
    /// # Errors
    /// The first structural error of any scope
    pub fn calculate_all_scopes(&self) -> Result<BTreeMap<Scope, Vec<ValueOperation>>, UpgradeError> {
        let sections = self
            .targets
            .iter()
            .filter(|variable| variable.as_section().is_some())
            .map(|section| section.id());
        let watched: Vec<VariableId> = self.replacements.old_variables().chain(sections).collect();
        let mut scopes = self.values.scopes_with_values(&watched)?;
        scopes.sort_unstable();
        scopes.dedup();

        let mut result = BTreeMap::new();
        for scope in scopes {
            let operations = self.calculate(scope)?;
            if operations.is_empty() {
                tracing::debug!("{} needs no migration", scope);
            } else {
                result.insert(scope, operations);
            }
        }
        Ok(result)
    }
}

impl fmt::Debug for UpgradeCalculator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeCalculator")
            .field("replacements", &self.replacements)
            .field("targets", &self.targets.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Current revision of each stable variable
///
/// A variable another one replaces is never current. Table columns are left
/// out; they travel with their table.
fn current_revisions(all: &[Arc<Variable>]) -> Vec<Arc<Variable>> {
    let mut superseded: HashSet<VariableId> = all
        .iter()
        .filter_map(|variable| variable.replaces_variable_id())
        .collect();
    superseded.extend(
        all.iter()
            .filter_map(|variable| variable.as_table())
            .flat_map(|table| table.columns.iter().map(|column| column.variable.id())),
    );

    let mut latest: BTreeMap<&StableId, &Arc<Variable>> = BTreeMap::new();
    for variable in all.iter().filter(|variable| !superseded.contains(&variable.id())) {
        latest
            .entry(variable.stable_id())
            .and_modify(|newest| {
                if variable.id() > newest.id() {
                    *newest = variable;
                }
            })
            .or_insert(variable);
    }
    latest.into_values().cloned().collect()
}

/// Resolves variables that new values may use
///
/// The target comes first. Anything else the catalog knows still counts,
/// except sections: a section outside the target is gone.
#[derive(Clone, Copy)]
struct ReferenceLookup<'a> {
    target: &'a dyn VariableLookup,
    catalog: &'a dyn VariableLookup,
}

impl VariableLookup for ReferenceLookup<'_> {
    fn fetch_variable(&self, id: VariableId) -> Result<Arc<Variable>, LookupError> {
        match self.target.fetch_variable(id) {
            Err(LookupError::VariableNotFound(_)) => {
                let variable = self.catalog.fetch_variable(id)?;
                if variable.as_section().is_some() {
                    Err(LookupError::VariableNotFound(id))
                } else {
                    Ok(variable)
                }
            }
            found => found,
        }
    }
}

/// Values of a variable plus the variable itself
type Predecessor = (Arc<Variable>, Arc<Vec<ExistingValue>>);

/// State of one `calculate` call
struct Run<'c, 'a> {
    calculator: &'c UpgradeCalculator<'a>,
    scope: Scope,
    /// Values fetched so far, by variable
    cache: HashMap<VariableId, Arc<Vec<ExistingValue>>>,
    operations: Vec<ValueOperation>,
}

impl<'c, 'a> Run<'c, 'a> {
    fn new(calculator: &'c UpgradeCalculator<'a>, scope: Scope) -> Self {
        Self {
            calculator,
            scope,
            cache: HashMap::new(),
            operations: Vec::new(),
        }
    }

    /// Live values of a variable in list order; deleted markers are skipped
    fn values(&mut self, variable_id: VariableId) -> Result<Arc<Vec<ExistingValue>>, UpgradeError> {
        if let Some(values) = self.cache.get(&variable_id) {
            return Ok(Arc::clone(values));
        }

        let mut values = self.calculator.values.values(self.scope, variable_id)?;
        values.retain(|value| value.payload != ValuePayload::Deleted);
        values.sort_by_key(ExistingValue::list_position);

        let values = Arc::new(values);
        self.cache.insert(variable_id, Arc::clone(&values));
        Ok(values)
    }

    /// First replaced variable, most recent first, that has values
    fn predecessor(&mut self, target: &Variable) -> Result<Option<Predecessor>, UpgradeError> {
        let calculator = self.calculator;
        for &old in calculator.replacements.previous(target.id()) {
            let values = self.values(old)?;
            if !values.is_empty() {
                let variable = calculator.catalog.fetch_variable(old)?;
                return Ok(Some((variable, values)));
            }
        }
        Ok(None)
    }

    /// Predecessor values still waiting to be migrated onto `target`
    fn pending_predecessor(&mut self, target: &Variable) -> Result<Option<Predecessor>, UpgradeError> {
        if self.calculator.replacements.previous(target.id()).is_empty() {
            return Ok(None);
        }
        if !self.values(target.id())?.is_empty() {
            tracing::debug!(
                "variable {} already has values in {}, skipping",
                target.id(),
                self.scope
            );
            return Ok(None);
        }
        self.predecessor(target)
    }

    fn scalar(&mut self, target: &Variable) -> Result<(), UpgradeError> {
        let Some((old_variable, old_values)) = self.pending_predecessor(target)? else {
            return Ok(());
        };

        for old_value in old_values.iter() {
            if old_value.row_value_id().is_some() {
                tracing::warn!(
                    "skipping value {} of variable {}: column value outside of a table upgrade",
                    old_value.id(),
                    old_variable.id()
                );
                continue;
            }
            self.migrate_value(target, &old_variable, old_value, None)?;
        }
        Ok(())
    }

    /// Convert one old value and append it if it survives
    ///
    /// Returns the index of the Append within the operation list.
    fn migrate_value(
        &mut self,
        target: &Variable,
        old_variable: &Variable,
        old_value: &ExistingValue,
        row: Option<RowRef>,
    ) -> Result<Option<usize>, UpgradeError> {
        check_value_type(old_variable, old_value)?;

        let converted =
            target.convert_value(old_variable, old_value, row, &self.calculator.references)?;
        let index = converted.map(|value| {
            self.operations.push(ValueOperation::append(value));
            self.operations.len() - 1
        });

        self.supersede(old_value);
        Ok(index)
    }

    fn supersede(&mut self, old_value: &ExistingValue) {
        if self.calculator.config.delete_superseded_values {
            self.operations.push(ValueOperation::delete(old_value));
        }
    }
}

/// A stored value must at least match the kind of its own variable
fn check_value_type(variable: &Variable, value: &ExistingValue) -> Result<(), UpgradeError> {
    variable
        .check_value_type(value)
        .map_err(|source| UpgradeError::ValueTypeMismatch {
            value_id: value.id(),
            variable_id: variable.id(),
            source,
        })
}
