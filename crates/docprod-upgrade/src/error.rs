//! Error types for upgrade calculation
//!
//! Only structurally impossible input is an error. Values that cannot be
//! carried over are dropped by the calculator and never surface here.

use docprod_variables::{
    DocumentTemplateId, LookupError, ManifestId, ValidationError, VariableId, VariableValueId,
};

/// Upgrade calculation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpgradeError {
    /// One old variable mapped to two different new variables
    #[error("variable {old} cannot be replaced by both {first} and {second}")]
    AmbiguousReplacement {
        /// Variable being replaced
        old: VariableId,
        /// Replacement seen first
        first: VariableId,
        /// Conflicting replacement
        second: VariableId,
    },

    /// Stored value does not match its own variable's kind
    #[error("value {value_id} does not match variable {variable_id}: {source}")]
    ValueTypeMismatch {
        /// Offending value
        value_id: VariableValueId,
        /// Variable it is stored under
        variable_id: VariableId,
        /// Mismatch details
        #[source]
        source: ValidationError,
    },

    /// Variable referenced by the mapping or a value does not exist
    #[error("variable {0} not found")]
    VariableNotFound(VariableId),

    /// Backing store could not answer
    #[error("lookup failed: {0}")]
    Lookup(#[source] LookupError),

    /// Target manifest is older than the current one
    #[error("cannot downgrade from manifest {from} to older manifest {to}")]
    Downgrade {
        /// Current manifest
        from: ManifestId,
        /// Requested manifest
        to: ManifestId,
    },

    /// Target manifest belongs to another document template
    #[error(
        "upgrade cannot change document template from {from_template} (manifest {from_manifest}) \
         to {to_template} (manifest {to_manifest})"
    )]
    TemplateMismatch {
        /// Current template
        from_template: DocumentTemplateId,
        /// Current manifest
        from_manifest: ManifestId,
        /// Template of the target manifest
        to_template: DocumentTemplateId,
        /// Target manifest
        to_manifest: ManifestId,
    },

    /// Target manifest has no variables
    #[error("no variables defined in manifest {0}")]
    EmptyManifest(ManifestId),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl UpgradeError {
    /// Check if error indicates a corrupt manifest or caller misuse
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Lookup(_) | Self::Config(_))
    }

    /// Check if running the same calculation again may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Lookup(LookupError::Unavailable(_)))
    }
}

impl From<LookupError> for UpgradeError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::VariableNotFound(id) => Self::VariableNotFound(id),
            other => Self::Lookup(other),
        }
    }
}
