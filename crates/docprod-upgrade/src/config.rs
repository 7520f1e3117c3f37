//! Upgrade configuration

use crate::error::UpgradeError;
use serde::{Deserialize, Serialize};

/// Upgrade calculator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Emit a Delete for every old value the upgrade consumed, whether or not
    /// it converted
    pub delete_superseded_values: bool,
    /// Permit a target manifest older than the document's current one
    pub allow_downgrade: bool,
    /// Give brand-new sections without predecessor values their default values
    pub populate_section_defaults: bool,
}

impl UpgradeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from TOML; missing keys take their defaults
    ///
    /// # Errors
    /// [`UpgradeError::Config`] if the text is not valid TOML for this struct
    pub fn from_toml_str(text: &str) -> Result<Self, UpgradeError> {
        toml::from_str(text).map_err(|e| UpgradeError::Config(e.to_string()))
    }

    /// With superseded-value deletes
    #[inline]
    #[must_use]
    pub fn with_delete_superseded_values(mut self, enabled: bool) -> Self {
        self.delete_superseded_values = enabled;
        self
    }

    /// With downgrades permitted
    #[inline]
    #[must_use]
    pub fn with_allow_downgrade(mut self, enabled: bool) -> Self {
        self.allow_downgrade = enabled;
        self
    }

    /// With section defaults
    #[inline]
    #[must_use]
    pub fn with_populate_section_defaults(mut self, enabled: bool) -> Self {
        self.populate_section_defaults = enabled;
        self
    }
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            delete_superseded_values: false,
            allow_downgrade: false,
            populate_section_defaults: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = UpgradeConfig::new();
        assert!(!config.delete_superseded_values);
        assert!(!config.allow_downgrade);
        assert!(config.populate_section_defaults);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = UpgradeConfig::from_toml_str("delete_superseded_values = true").unwrap();
        assert_eq!(
            config,
            UpgradeConfig::default().with_delete_superseded_values(true)
        );
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let result = UpgradeConfig::from_toml_str("allow_downgrade = \"sometimes\"");
        assert!(matches!(result, Err(UpgradeError::Config(_))));
    }

    #[test]
    fn builders_chain() {
        let config = UpgradeConfig::new()
            .with_allow_downgrade(true)
            .with_populate_section_defaults(false);
        assert!(config.allow_downgrade);
        assert!(!config.populate_section_defaults);
    }
}
