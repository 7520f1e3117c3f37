//! Document Producer Variables
//!
//! Typed variable definitions, typed values, per-kind validation and
//! cross-kind value conversion.
//!
//! # Core Concepts
//!
//! - [`Variable`]: Closed set of variable kinds behind shared [`BaseVariable`] properties
//! - [`VariableValue<Id>`]: One value; [`NewValue`] before persistence, [`ExistingValue`] after
//! - [`Variable::validate`]: Whether a value is legal for a variable
//! - [`Variable::convert_value`]: Carry a value over to another variable, or drop it
//! - [`ValueOperation`]: Append/Update/Delete/Replace, the only way values change
//! - [`VariableLookup`]: Resolves variable IDs for cross-reference checks
//!
//! # Example
//!
//! ```rust,ignore
//! use docprod_variables::{Variable, VariableCatalog};
//!
//! let catalog: VariableCatalog = manifest_variables.into_iter().collect();
//! if let Some(value) = new_variable.convert_value(&old_variable, &old_value, None, &catalog)? {
//!     operations.push(ValueOperation::append(value));
//! }
//! ```

mod conversion;
mod error;
mod ids;
mod lookup;
mod manifest;
mod operation;
mod tree;
mod validation;
mod value;
mod variable;

pub use error::{DefinitionError, LookupError, ValidationError};
pub use ids::{
    DeliverableId, DocumentId, DocumentTemplateId, FileId, ManifestId, ProjectId, Scope,
    SelectOptionId, StableId, VariableId, VariableValueId,
};
pub use lookup::{VariableCatalog, VariableLookup};
pub use manifest::{Manifest, ManifestHeader};
pub use operation::{OperationType, ValueOperation};
pub use tree::WalkTree;
pub use validation::is_valid_email;
pub use value::{
    DisplayStyle, ExistingValue, ImageValueDetails, LinkValueDetails, NewValue, RowRef,
    SectionValueFragment, SectionVariableRef, UsageType, ValueBase, ValueIdentity, ValuePayload,
    VariableValue,
};
pub use variable::{
    BaseVariable, DependencyCondition, NumberVariable, SectionVariable, SelectOption,
    SelectVariable, TableColumn, TableStyle, TableVariable, TextType, TextVariable, Variable,
    VariableDependency, VariableKind, VariableType,
};

/// Sealed trait support for value identities
#[doc(hidden)]
pub mod __private {
    pub use super::value::private::Sealed;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
