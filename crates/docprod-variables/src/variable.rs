//! Variable Variant Model
//!
//! A [`Variable`] is the manifest-scoped definition of one input of a document
//! or project. Properties shared by every kind live in [`BaseVariable`]; the
//! kind-specific constraints live in the closed [`VariableKind`] sum type so
//! that validation, conversion and tree walking must handle every kind.
//!
//! Constructing a variable never validates any value. Validation is a separate
//! operation (see [`Variable::validate`]).

use crate::error::DefinitionError;
use crate::ids::{DeliverableId, ManifestId, SelectOptionId, StableId, VariableId};
use crate::tree::WalkTree;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Kind tag of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// Decimal number
    Number,
    /// Free text
    Text,
    /// Calendar date
    Date,
    /// Email address
    Email,
    /// Uploaded image with caption
    Image,
    /// URL with optional title
    Link,
    /// Choice among fixed options
    Select,
    /// Document outline section
    Section,
    /// Rows of column values
    Table,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Number => "Number",
            Self::Text => "Text",
            Self::Date => "Date",
            Self::Email => "Email",
            Self::Image => "Image",
            Self::Link => "Link",
            Self::Select => "Select",
            Self::Section => "Section",
            Self::Table => "Table",
        };
        f.write_str(name)
    }
}

/// Comparison used by a dependency condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyCondition {
    /// Equal to
    Eq,
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
    /// Not equal to
    Neq,
}

/// Another variable's value gating this variable's relevance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDependency {
    /// Stable ID of the variable this one depends on
    pub variable_stable_id: StableId,
    /// How the other variable's value is compared
    pub condition: DependencyCondition,
    /// Value the other variable is compared against
    pub value: Option<String>,
}

/// Properties shared by every variable kind
///
/// `id`, `stable_id`, `is_list` and `replaces_variable_id` never change once a
/// variable is created. The remaining presentation attributes may differ
/// between manifests that reference the same stable variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseVariable {
    /// Manifest-scoped identity
    pub id: VariableId,
    /// Identity shared by all revisions of this variable
    pub stable_id: StableId,
    /// Manifest the per-manifest attributes come from
    pub manifest_id: Option<ManifestId>,
    /// User-facing name
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Whether the variable accepts multiple values
    pub is_list: bool,
    /// Whether a value is required once the dependency condition is met
    pub is_required: bool,
    /// Hidden from external users
    pub internal_only: bool,
    /// Position within the manifest, from 0
    pub position: u32,
    /// Variable of an older manifest this one supersedes
    pub replaces_variable_id: Option<VariableId>,
    /// Condition on another variable
    pub dependency: Option<VariableDependency>,
    /// Position within each associated deliverable
    pub deliverable_positions: BTreeMap<DeliverableId, u32>,
    /// Question shown in deliverable questionnaires
    pub deliverable_question: Option<String>,
    /// Sections recommending this variable
    pub recommended_by: Vec<VariableId>,
}

impl BaseVariable {
    /// Create base properties with defaults for everything optional
    #[must_use]
    pub fn new(id: VariableId, stable_id: StableId, name: impl Into<String>, position: u32) -> Self {
        Self {
            id,
            stable_id,
            manifest_id: None,
            name: name.into(),
            description: None,
            is_list: false,
            is_required: false,
            internal_only: false,
            position,
            replaces_variable_id: None,
            dependency: None,
            deliverable_positions: BTreeMap::new(),
            deliverable_question: None,
            recommended_by: Vec::new(),
        }
    }

    /// Mark as list-valued
    #[inline]
    #[must_use]
    pub fn with_list(mut self, is_list: bool) -> Self {
        self.is_list = is_list;
        self
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn with_required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    /// Set the variable this one replaces
    #[inline]
    #[must_use]
    pub fn with_replaces(mut self, old: VariableId) -> Self {
        self.replaces_variable_id = Some(old);
        self
    }

    /// Set owning manifest
    #[inline]
    #[must_use]
    pub fn with_manifest(mut self, manifest_id: ManifestId) -> Self {
        self.manifest_id = Some(manifest_id);
        self
    }

    /// Set description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set dependency condition
    #[inline]
    #[must_use]
    pub fn with_dependency(mut self, dependency: VariableDependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    /// Associate with a deliverable at a position
    #[inline]
    #[must_use]
    pub fn with_deliverable(mut self, deliverable_id: DeliverableId, position: u32) -> Self {
        self.deliverable_positions.insert(deliverable_id, position);
        self
    }
}

/// Constraints of a number variable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberVariable {
    /// Inclusive lower bound
    pub min_value: Option<Decimal>,
    /// Inclusive upper bound
    pub max_value: Option<Decimal>,
    /// Maximum number of digits after the decimal point
    pub decimal_places: Option<u32>,
}

/// Whether text may span lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextType {
    /// No line breaks allowed
    SingleLine,
    /// Line breaks allowed
    MultiLine,
}

/// Constraints of a text variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextVariable {
    /// Single- or multi-line
    pub text_type: TextType,
}

/// One choice of a select variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Option identity
    pub id: SelectOptionId,
    /// Display name, also used to match options across manifests
    pub name: String,
    /// Optional explanation
    pub description: Option<String>,
    /// Text rendered into documents instead of the name
    pub rendered_text: Option<String>,
}

impl SelectOption {
    /// Create option with only a name
    #[must_use]
    pub fn new(id: SelectOptionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            rendered_text: None,
        }
    }
}

/// Options of a select variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectVariable {
    /// Whether more than one option may be selected
    pub is_multiple: bool,
    /// Options in display order
    pub options: Vec<SelectOption>,
}

impl SelectVariable {
    /// Look up an option by ID
    #[must_use]
    pub fn option(&self, id: SelectOptionId) -> Option<&SelectOption> {
        self.options.iter().find(|option| option.id == id)
    }

    /// Look up an option by name, ignoring case and surrounding whitespace
    #[must_use]
    pub fn option_named(&self, name: &str) -> Option<&SelectOption> {
        let wanted = name.trim().to_lowercase();
        self.options
            .iter()
            .find(|option| option.name.to_lowercase() == wanted)
    }

    /// Whether an option ID belongs to this variable
    #[inline]
    #[must_use]
    pub fn has_option(&self, id: SelectOptionId) -> bool {
        self.option(id).is_some()
    }
}

/// Outline node of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionVariable {
    /// Whether the section renders its name as a heading
    pub render_heading: bool,
    children: Vec<Variable>,
    /// Variables this section recommends
    pub recommends: Vec<VariableId>,
}

impl SectionVariable {
    /// Create section without children
    #[must_use]
    pub fn new(render_heading: bool) -> Self {
        Self {
            render_heading,
            children: Vec::new(),
            recommends: Vec::new(),
        }
    }

    /// Append a subsection
    ///
    /// # Errors
    /// Returns error if `child` is not a section variable
    pub fn add_child(&mut self, child: Variable) -> Result<(), DefinitionError> {
        if child.variable_type() != VariableType::Section {
            return Err(DefinitionError::SectionChildNotSection {
                child_id: child.id(),
                actual: child.variable_type(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    /// Builder form of [`SectionVariable::add_child`]
    ///
    /// # Errors
    /// Returns error if `child` is not a section variable
    pub fn with_child(mut self, child: Variable) -> Result<Self, DefinitionError> {
        self.add_child(child)?;
        Ok(self)
    }

    /// Subsections in document order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Variable] {
        &self.children
    }
}

/// Table orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableStyle {
    /// One row per value, columns across
    Horizontal,
    /// One column per value, rows down
    Vertical,
}

/// Column of a table; itself a full variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Whether the column is rendered as a header
    pub is_header: bool,
    /// Column definition
    pub variable: Variable,
}

/// Columns of a table variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableVariable {
    /// Orientation
    pub table_style: TableStyle,
    /// Columns in display order
    pub columns: Vec<TableColumn>,
}

impl TableVariable {
    /// Column with the given variable ID
    #[must_use]
    pub fn column(&self, id: VariableId) -> Option<&TableColumn> {
        self.columns.iter().find(|column| column.variable.id() == id)
    }
}

/// Kind-specific part of a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VariableKind {
    /// Decimal number
    Number(NumberVariable),
    /// Free text
    Text(TextVariable),
    /// Calendar date
    Date,
    /// Email address
    Email,
    /// Image
    Image,
    /// Link
    Link,
    /// Select
    Select(SelectVariable),
    /// Section
    Section(SectionVariable),
    /// Table
    Table(TableVariable),
}

impl VariableKind {
    /// Kind tag
    #[must_use]
    pub fn variable_type(&self) -> VariableType {
        match self {
            Self::Number(_) => VariableType::Number,
            Self::Text(_) => VariableType::Text,
            Self::Date => VariableType::Date,
            Self::Email => VariableType::Email,
            Self::Image => VariableType::Image,
            Self::Link => VariableType::Link,
            Self::Select(_) => VariableType::Select,
            Self::Section(_) => VariableType::Section,
            Self::Table(_) => VariableType::Table,
        }
    }
}

/// A variable as it appears in one manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    base: BaseVariable,
    kind: VariableKind,
}

impl Variable {
    /// Combine base properties with a kind
    #[inline]
    #[must_use]
    pub fn new(base: BaseVariable, kind: VariableKind) -> Self {
        Self { base, kind }
    }

    /// Shared properties
    #[inline]
    #[must_use]
    pub fn base(&self) -> &BaseVariable {
        &self.base
    }

    /// Kind-specific constraints
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    /// Kind tag
    #[inline]
    #[must_use]
    pub fn variable_type(&self) -> VariableType {
        self.kind.variable_type()
    }

    /// Manifest-scoped identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> VariableId {
        self.base.id
    }

    /// Version-independent identity
    #[inline]
    #[must_use]
    pub fn stable_id(&self) -> &StableId {
        &self.base.stable_id
    }

    /// User-facing name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.base.name
    }

    /// Position in the manifest
    #[inline]
    #[must_use]
    pub fn position(&self) -> u32 {
        self.base.position
    }

    /// Variable this one supersedes
    #[inline]
    #[must_use]
    pub fn replaces_variable_id(&self) -> Option<VariableId> {
        self.base.replaces_variable_id
    }

    /// Whether multiple values are accepted. Sections always are.
    #[inline]
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self.kind, VariableKind::Section(_)) || self.base.is_list
    }

    /// Select options, if this is a select variable
    #[inline]
    #[must_use]
    pub fn as_select(&self) -> Option<&SelectVariable> {
        match &self.kind {
            VariableKind::Select(select) => Some(select),
            _ => None,
        }
    }

    /// Columns, if this is a table variable
    #[inline]
    #[must_use]
    pub fn as_table(&self) -> Option<&TableVariable> {
        match &self.kind {
            VariableKind::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Subsections, if this is a section variable
    #[inline]
    #[must_use]
    pub fn as_section(&self) -> Option<&SectionVariable> {
        match &self.kind {
            VariableKind::Section(section) => Some(section),
            _ => None,
        }
    }

    /// This variable followed by all its descendants in document order
    ///
    /// Each call starts a fresh traversal.
    #[inline]
    #[must_use]
    pub fn walk_tree(&self) -> WalkTree<'_> {
        WalkTree::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(id: i64) -> BaseVariable {
        BaseVariable::new(VariableId(id), StableId::new(format!("s{id}")), "Test", 0)
    }

    #[test]
    fn sections_are_always_lists() {
        let section = Variable::new(base(1), VariableKind::Section(SectionVariable::new(true)));
        assert!(section.is_list());

        let date = Variable::new(base(2), VariableKind::Date);
        assert!(!date.is_list());
        let dates = Variable::new(base(3).with_list(true), VariableKind::Date);
        assert!(dates.is_list());
    }

    #[test]
    fn section_rejects_non_section_child() {
        let child = Variable::new(base(2), VariableKind::Email);
        let result = SectionVariable::new(false).with_child(child);
        assert!(matches!(
            result,
            Err(DefinitionError::SectionChildNotSection {
                actual: VariableType::Email,
                ..
            })
        ));
    }

    #[test]
    fn select_option_lookup_ignores_case() {
        let select = SelectVariable {
            is_multiple: false,
            options: vec![
                SelectOption::new(SelectOptionId(1), "Forest"),
                SelectOption::new(SelectOptionId(2), "Mangrove"),
            ],
        };
        assert_eq!(
            select.option_named(" mangrove ").map(|o| o.id),
            Some(SelectOptionId(2))
        );
        assert!(select.option_named("Desert").is_none());
        assert!(select.has_option(SelectOptionId(1)));
        assert!(!select.has_option(SelectOptionId(3)));
    }

    #[test]
    fn kind_tag_matches_variant() {
        let text = Variable::new(
            base(1),
            VariableKind::Text(TextVariable {
                text_type: TextType::MultiLine,
            }),
        );
        assert_eq!(text.variable_type(), VariableType::Text);
        assert_eq!(text.variable_type().to_string(), "Text");
    }

    #[test]
    fn base_builder_sets_replacement() {
        let b = base(5).with_replaces(VariableId(4)).with_required(true);
        assert_eq!(b.replaces_variable_id, Some(VariableId(4)));
        assert!(b.is_required);
    }
}
