//! Document Producer Upgrade
//!
//! Computes the value operations that migrate documents and projects onto a
//! newer variable manifest.
//!
//! # Core Concepts
//!
//! - [`UpgradeCalculator`]: Ordered [`ValueOperation`](docprod_variables::ValueOperation)s for one scope
//! - [`ReplacementMap`]: Old → new variable mapping; must be a function
//! - [`ValueLookup`]: Read-only access to persisted values
//! - [`UpgradeConfig`]: Optional behaviors, loadable from TOML
//!
//! # Example
//!
//! ```rust,ignore
//! use docprod_upgrade::{UpgradeCalculator, UpgradeConfig};
//!
//! let calculator = UpgradeCalculator::for_document(
//!     document_manifest,
//!     &target_manifest,
//!     &catalog,
//!     &value_store,
//!     UpgradeConfig::default(),
//! )?;
//! let operations = calculator.calculate(Scope::Document(document_id))?;
//! host.apply_in_transaction(operations)?;
//! ```

mod calculator;
mod config;
mod error;
mod lookup;
mod replacement;

pub use calculator::UpgradeCalculator;
pub use config::UpgradeConfig;
pub use error::UpgradeError;
pub use lookup::ValueLookup;
pub use replacement::ReplacementMap;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
