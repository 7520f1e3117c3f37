//! Identifier newtypes
//!
//! Every persisted entity is addressed by a distinct integer newtype so that a
//! variable ID can never be passed where a value ID is expected.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value
            #[inline]
            #[must_use]
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Manifest-scoped variable identity
    VariableId
);
numeric_id!(
    /// Persisted value identity
    VariableValueId
);
numeric_id!(
    /// Variable manifest identity
    ManifestId
);
numeric_id!(
    /// Option of a select variable
    SelectOptionId
);
numeric_id!(
    /// Project owning a set of values
    ProjectId
);
numeric_id!(
    /// Document owning a set of values
    DocumentId
);
numeric_id!(
    /// Deliverable a variable is grouped under
    DeliverableId
);
numeric_id!(
    /// Document template a manifest belongs to
    DocumentTemplateId
);
numeric_id!(
    /// Uploaded file backing an image value
    FileId
);

/// Version-independent identity of a variable
///
/// Survives across manifests: every revision of "the same" variable shares
/// its stable ID even though each revision gets a fresh [`VariableId`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    /// Create stable ID
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// String form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unit values are stored and migrated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum Scope {
    /// Project-level values (questionnaires, deliverables)
    Project(ProjectId),
    /// Values of one document
    Document(DocumentId),
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(id) => write!(f, "project {id}"),
            Self::Document(id) => write!(f, "document {id}"),
        }
    }
}
