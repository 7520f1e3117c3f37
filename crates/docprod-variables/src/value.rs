//! Value Model
//!
//! A [`VariableValue`] is one value of one variable in one [`Scope`]. The
//! identity type parameter separates values that have not been persisted yet
//! ([`NewValue`], identity `()`) from persisted ones ([`ExistingValue`],
//! identity [`VariableValueId`]). Everything else is shared between the two.

use crate::ids::{FileId, Scope, SelectOptionId, VariableId, VariableValueId};
use crate::variable::VariableType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;
use url::Url;

/// Sealed trait - only `()` and [`VariableValueId`] are value identities
pub(crate) mod private {
    /// Sealed trait marker
    pub trait Sealed {}

    impl Sealed for () {}
    impl Sealed for crate::ids::VariableValueId {}
}

/// Identity carried by a value
///
/// `()` for values that are not persisted yet, [`VariableValueId`] for
/// persisted ones.
pub trait ValueIdentity: Copy + Debug + PartialEq + Eq + private::Sealed {
    /// Persisted identity, if any
    fn value_id(&self) -> Option<VariableValueId>;
}

impl ValueIdentity for () {
    #[inline]
    fn value_id(&self) -> Option<VariableValueId> {
        None
    }
}

impl ValueIdentity for VariableValueId {
    #[inline]
    fn value_id(&self) -> Option<VariableValueId> {
        Some(*self)
    }
}

/// Reference from a table-column value to the row containing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowRef {
    /// A persisted row value
    Value(VariableValueId),
    /// A row created by the Append at this index of the same operation list
    Appended(usize),
}

/// Properties common to values of every kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueBase<Id: ValueIdentity> {
    /// Persisted identity, or `()` for new values
    pub id: Id,
    /// Project or document owning the value
    pub scope: Scope,
    /// Variable the value belongs to
    pub variable_id: VariableId,
    /// Position within a list variable; 0 for non-list variables
    pub list_position: u32,
    /// Provenance note
    pub citation: Option<String>,
    /// Row containing this value, for table columns
    pub row_value_id: Option<RowRef>,
}

impl ValueBase<()> {
    /// Base properties of a not-yet-persisted value
    #[must_use]
    pub fn new(scope: Scope, variable_id: VariableId, list_position: u32) -> Self {
        Self {
            id: (),
            scope,
            variable_id,
            list_position,
            citation: None,
            row_value_id: None,
        }
    }

    /// Attach persisted identity
    #[inline]
    #[must_use]
    pub fn with_id(self, id: VariableValueId) -> ValueBase<VariableValueId> {
        ValueBase {
            id,
            scope: self.scope,
            variable_id: self.variable_id,
            list_position: self.list_position,
            citation: self.citation,
            row_value_id: self.row_value_id,
        }
    }
}

impl<Id: ValueIdentity> ValueBase<Id> {
    /// Set citation
    #[inline]
    #[must_use]
    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = Some(citation.into());
        self
    }

    /// Set containing row
    #[inline]
    #[must_use]
    pub fn with_row(mut self, row: RowRef) -> Self {
        self.row_value_id = Some(row);
        self
    }
}

/// URL with optional title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkValueDetails {
    /// Target
    pub url: Url,
    /// Display text
    pub title: Option<String>,
}

/// Reference to an uploaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageValueDetails {
    /// Stored file
    pub file_id: FileId,
    /// Caption rendered under the image
    pub caption: Option<String>,
}

/// How a variable is used inside section prose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageType {
    /// The variable's value is rendered in place
    Injection,
    /// Only a reference to the variable is rendered
    Reference,
}

/// How an injected value is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayStyle {
    /// Inside the surrounding paragraph
    Inline,
    /// As its own block
    Block,
}

/// Typed reference to another variable inside section prose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionVariableRef {
    /// Variable being used
    pub used_variable_id: VariableId,
    /// Injection or reference
    pub usage_type: UsageType,
    /// Required for injections
    pub display_style: Option<DisplayStyle>,
}

impl SectionVariableRef {
    /// Same reference pointing at another variable
    #[inline]
    #[must_use]
    pub fn repointed(self, used_variable_id: VariableId) -> Self {
        Self {
            used_variable_id,
            ..self
        }
    }
}

/// One fragment of a section's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionValueFragment {
    /// Literal prose
    Text(String),
    /// Use of another variable
    Variable(SectionVariableRef),
}

/// Typed payload of a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ValuePayload {
    /// Number
    Number(Decimal),
    /// Text
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Email address
    Email(String),
    /// Link
    Link(LinkValueDetails),
    /// Image
    Image(ImageValueDetails),
    /// Selected option IDs
    Select(BTreeSet<SelectOptionId>),
    /// Section fragment
    Section(SectionValueFragment),
    /// Table row container; column values point at it
    Table,
    /// Book-keeping marker for a value whose meaning no longer applies
    Deleted,
}

impl ValuePayload {
    /// Variable kind this payload belongs to; `None` for deleted markers
    #[must_use]
    pub fn value_type(&self) -> Option<VariableType> {
        match self {
            Self::Number(_) => Some(VariableType::Number),
            Self::Text(_) => Some(VariableType::Text),
            Self::Date(_) => Some(VariableType::Date),
            Self::Email(_) => Some(VariableType::Email),
            Self::Link(_) => Some(VariableType::Link),
            Self::Image(_) => Some(VariableType::Image),
            Self::Select(_) => Some(VariableType::Select),
            Self::Section(_) => Some(VariableType::Section),
            Self::Table => Some(VariableType::Table),
            Self::Deleted => None,
        }
    }
}

/// One value of one variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValue<Id: ValueIdentity> {
    /// Identity, scope and placement
    pub base: ValueBase<Id>,
    /// Typed content
    pub payload: ValuePayload,
}

/// Value that has not been persisted
pub type NewValue = VariableValue<()>;

/// Persisted value
pub type ExistingValue = VariableValue<VariableValueId>;

impl<Id: ValueIdentity> VariableValue<Id> {
    /// Combine base and payload
    #[inline]
    #[must_use]
    pub fn new(base: ValueBase<Id>, payload: ValuePayload) -> Self {
        Self { base, payload }
    }

    /// Variable the value belongs to
    #[inline]
    #[must_use]
    pub fn variable_id(&self) -> VariableId {
        self.base.variable_id
    }

    /// Owning scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.base.scope
    }

    /// Position within the list
    #[inline]
    #[must_use]
    pub fn list_position(&self) -> u32 {
        self.base.list_position
    }

    /// Provenance note
    #[inline]
    #[must_use]
    pub fn citation(&self) -> Option<&str> {
        self.base.citation.as_deref()
    }

    /// Containing row
    #[inline]
    #[must_use]
    pub fn row_value_id(&self) -> Option<RowRef> {
        self.base.row_value_id
    }

    /// Variable kind of the payload
    #[inline]
    #[must_use]
    pub fn value_type(&self) -> Option<VariableType> {
        self.payload.value_type()
    }
}

impl NewValue {
    /// Attach persisted identity
    #[inline]
    #[must_use]
    pub fn with_id(self, id: VariableValueId) -> ExistingValue {
        VariableValue {
            base: self.base.with_id(id),
            payload: self.payload,
        }
    }
}

impl ExistingValue {
    /// Persisted identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> VariableValueId {
        self.base.id
    }

    /// Copy without identity, e.g. to append elsewhere
    #[must_use]
    pub fn to_new(&self) -> NewValue {
        VariableValue {
            base: ValueBase {
                id: (),
                scope: self.base.scope,
                variable_id: self.base.variable_id,
                list_position: self.base.list_position,
                citation: self.base.citation.clone(),
                row_value_id: self.base.row_value_id,
            },
            payload: self.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProjectId;

    fn scope() -> Scope {
        Scope::Project(ProjectId(1))
    }

    #[test]
    fn new_value_has_no_identity() {
        let value = NewValue::new(
            ValueBase::new(scope(), VariableId(1), 0),
            ValuePayload::Text("hello".into()),
        );
        assert_eq!(value.base.id.value_id(), None);
    }

    #[test]
    fn with_id_preserves_everything_else() {
        let value = NewValue::new(
            ValueBase::new(scope(), VariableId(3), 2)
                .with_citation("page 4")
                .with_row(RowRef::Value(VariableValueId(8))),
            ValuePayload::Number(Decimal::new(15, 1)),
        );
        let existing = value.clone().with_id(VariableValueId(99));

        assert_eq!(existing.id(), VariableValueId(99));
        assert_eq!(existing.list_position(), 2);
        assert_eq!(existing.citation(), Some("page 4"));
        assert_eq!(existing.row_value_id(), Some(RowRef::Value(VariableValueId(8))));
        assert_eq!(existing.to_new(), value);
    }

    #[test]
    fn payload_reports_kind() {
        assert_eq!(ValuePayload::Table.value_type(), Some(VariableType::Table));
        assert_eq!(ValuePayload::Deleted.value_type(), None);
        assert_eq!(
            ValuePayload::Select(BTreeSet::new()).value_type(),
            Some(VariableType::Select)
        );
    }

    #[test]
    fn repointed_reference_keeps_style() {
        let reference = SectionVariableRef {
            used_variable_id: VariableId(1),
            usage_type: UsageType::Injection,
            display_style: Some(DisplayStyle::Block),
        };
        let moved = reference.repointed(VariableId(2));
        assert_eq!(moved.used_variable_id, VariableId(2));
        assert_eq!(moved.usage_type, UsageType::Injection);
        assert_eq!(moved.display_style, Some(DisplayStyle::Block));
    }
}
