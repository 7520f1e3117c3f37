//! Section migration
//!
//! Section values can need changes even when the section itself was not
//! replaced, since their fragments may use variables that were.

use super::{check_value_type, Run};
use crate::error::UpgradeError;
use docprod_variables::{
    ExistingValue, SectionValueFragment, SectionVariableRef, ValidationError, ValueOperation,
    ValuePayload, Variable, VariableLookup,
};

impl Run<'_, '_> {
    pub(super) fn section(&mut self, target: &Variable) -> Result<(), UpgradeError> {
        let existing = self.values(target.id())?;
        if !existing.is_empty() {
            return self.repoint_references(target, &existing);
        }

        match self.predecessor(target)? {
            Some((old_variable, old_values)) => {
                self.carry_over_section(target, &old_variable, &old_values)
            }
            None if self.calculator.section_defaults
                && self.calculator.config.populate_section_defaults =>
            {
                self.section_defaults(target)
            }
            None => Ok(()),
        }
    }

    /// Section kept its values: fix references to replaced or removed variables
    fn repoint_references(
        &mut self,
        target: &Variable,
        existing: &[ExistingValue],
    ) -> Result<(), UpgradeError> {
        let calculator = self.calculator;
        for value in existing {
            check_value_type(target, value)?;
            let ValuePayload::Section(SectionValueFragment::Variable(reference)) = &value.payload
            else {
                continue;
            };

            let used = reference.used_variable_id;
            if let Some(replacement) = calculator.replacements.replacement(used) {
                let mut updated = value.clone();
                updated.payload = ValuePayload::Section(SectionValueFragment::Variable(
                    reference.repointed(replacement),
                ));
                self.operations.push(ValueOperation::update(updated));
            } else if !calculator.references.contains_variable(used)? {
                tracing::debug!(
                    "section {} uses removed variable {}, deleting value {}",
                    target.id(),
                    used,
                    value.id()
                );
                self.operations.push(ValueOperation::delete(value));
            }
        }
        Ok(())
    }

    /// Section was replaced: append rewritten copies of its predecessor's values
    fn carry_over_section(
        &mut self,
        target: &Variable,
        old_variable: &Variable,
        old_values: &[ExistingValue],
    ) -> Result<(), UpgradeError> {
        for old_value in old_values {
            let rewritten = match &old_value.payload {
                ValuePayload::Section(SectionValueFragment::Variable(reference)) => {
                    match self.rewrite_reference(*reference)? {
                        Some(reference) => {
                            let mut rewritten = old_value.clone();
                            rewritten.payload =
                                ValuePayload::Section(SectionValueFragment::Variable(reference));
                            rewritten
                        }
                        None => {
                            tracing::debug!(
                                "dropping value {} of section {}: variable {} no longer exists",
                                old_value.id(),
                                old_variable.id(),
                                reference.used_variable_id
                            );
                            self.supersede(old_value);
                            continue;
                        }
                    }
                }
                _ => old_value.clone(),
            };
            self.migrate_value(target, old_variable, &rewritten, None)?;
        }
        Ok(())
    }

    /// Point at the replacement, keep if still present, otherwise drop
    fn rewrite_reference(
        &self,
        reference: SectionVariableRef,
    ) -> Result<Option<SectionVariableRef>, UpgradeError> {
        let calculator = self.calculator;
        let used = reference.used_variable_id;
        if let Some(replacement) = calculator.replacements.replacement(used) {
            Ok(Some(reference.repointed(replacement)))
        } else if calculator.references.contains_variable(used)? {
            Ok(Some(reference))
        } else {
            Ok(None)
        }
    }

    /// Brand-new section: start from the host's defaults
    fn section_defaults(&mut self, target: &Variable) -> Result<(), UpgradeError> {
        let calculator = self.calculator;
        for value in calculator.values.default_values(self.scope, target)? {
            match target.validate(&value, &calculator.references) {
                Ok(()) => self.operations.push(ValueOperation::append(value)),
                Err(ValidationError::Lookup(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::debug!("dropping default value of section {}: {}", target.id(), e);
                }
            }
        }
        Ok(())
    }
}
