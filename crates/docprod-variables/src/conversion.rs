//! Conversion Engine
//!
//! Turns a value of one variable into a candidate value of another. A
//! conversion that is undefined for the kind pair, or whose candidate fails
//! validation against the target, yields `None`: stale data is dropped, never
//! corrupted.

use crate::error::{LookupError, ValidationError};
use crate::lookup::VariableLookup;
use crate::value::{
    LinkValueDetails, NewValue, RowRef, ValueBase, ValueIdentity, ValuePayload, VariableValue,
};
use crate::variable::{SelectVariable, TextType, Variable, VariableKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;
use url::Url;

impl Variable {
    /// Convert a value of `old_variable` into a validated value of this variable
    ///
    /// The new value keeps the scope, list position and citation of the old
    /// one. `new_row` becomes the containing row for table-column values.
    ///
    /// # Errors
    /// Only lookup failures other than "not found" are errors; every other
    /// reason a value cannot be carried over yields `Ok(None)`.
    pub fn convert_value<Id: ValueIdentity>(
        &self,
        old_variable: &Variable,
        old_value: &VariableValue<Id>,
        new_row: Option<RowRef>,
        lookup: &dyn VariableLookup,
    ) -> Result<Option<NewValue>, LookupError> {
        let Some(candidate) = self.convert_value_for_type(old_variable, old_value, new_row) else {
            tracing::debug!(
                "dropping value {:?} of variable {}: no {} conversion from {:?}",
                old_value.base.id.value_id(),
                old_variable.id(),
                self.variable_type(),
                old_value.value_type()
            );
            return Ok(None);
        };

        match self.validate(&candidate, lookup) {
            Ok(()) => Ok(Some(candidate)),
            Err(ValidationError::Lookup(e)) => Err(e),
            Err(e) => {
                tracing::debug!(
                    "dropping value {:?} of variable {}: {}",
                    old_value.base.id.value_id(),
                    old_variable.id(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Build a candidate value for this variable without validating it
    ///
    /// Returns `None` when the kind pair has no conversion or the source
    /// payload cannot be interpreted (unparsable text, no matching options).
    ///
    /// Text becomes a link only if it is an absolute URL with a scheme.
    /// Relative references such as `/docs/a` or a bare `www.example.org/a`
    /// have no base to resolve against and are dropped.
    #[must_use]
    pub fn convert_value_for_type<Id: ValueIdentity>(
        &self,
        old_variable: &Variable,
        old_value: &VariableValue<Id>,
        new_row: Option<RowRef>,
    ) -> Option<NewValue> {
        let payload = self.convert_payload(old_variable, &old_value.payload)?;

        let base = ValueBase {
            id: (),
            scope: old_value.scope(),
            variable_id: self.id(),
            list_position: old_value.list_position(),
            citation: old_value.base.citation.clone(),
            row_value_id: new_row,
        };
        Some(NewValue::new(base, payload))
    }

    fn convert_payload(&self, old_variable: &Variable, old: &ValuePayload) -> Option<ValuePayload> {
        match self.kind() {
            VariableKind::Number(_) => match old {
                ValuePayload::Number(n) => Some(ValuePayload::Number(*n)),
                ValuePayload::Text(s) => parse_decimal(s).map(ValuePayload::Number),
                _ => None,
            },
            VariableKind::Text(text) => {
                let converted = match old {
                    ValuePayload::Date(date) => date.to_string(),
                    ValuePayload::Email(email) => email.clone(),
                    ValuePayload::Number(n) => n.normalize().to_string(),
                    ValuePayload::Text(s) if text.text_type == TextType::MultiLine => s.clone(),
                    ValuePayload::Text(s) => first_line(s),
                    ValuePayload::Link(link) => match &link.title {
                        Some(title) => format!("{title} ({})", link.url),
                        None => link.url.to_string(),
                    },
                    ValuePayload::Select(selected) => {
                        option_names(old_variable.as_select()?, selected).join(", ")
                    }
                    _ => return None,
                };
                Some(ValuePayload::Text(converted))
            }
            VariableKind::Date => match old {
                ValuePayload::Date(date) => Some(ValuePayload::Date(*date)),
                ValuePayload::Text(s) => NaiveDate::from_str(s.trim()).ok().map(ValuePayload::Date),
                _ => None,
            },
            VariableKind::Email => match old {
                ValuePayload::Email(s) | ValuePayload::Text(s) => {
                    Some(ValuePayload::Email(s.trim().to_lowercase()))
                }
                _ => None,
            },
            VariableKind::Image => match old {
                ValuePayload::Image(image) => Some(ValuePayload::Image(image.clone())),
                _ => None,
            },
            VariableKind::Link => match old {
                ValuePayload::Link(link) => Some(ValuePayload::Link(link.clone())),
                ValuePayload::Text(s) => Url::parse(s.trim())
                    .ok()
                    .map(|url| ValuePayload::Link(LinkValueDetails { url, title: None })),
                _ => None,
            },
            VariableKind::Select(select) => {
                let matched: BTreeSet<_> = match old {
                    ValuePayload::Select(selected) => {
                        option_names(old_variable.as_select()?, selected)
                            .into_iter()
                            .filter_map(|name| select.option_named(name))
                            .map(|option| option.id)
                            .collect()
                    }
                    ValuePayload::Text(s) => select.option_named(s).map(|option| option.id).into_iter().collect(),
                    _ => return None,
                };
                if matched.is_empty() {
                    None
                } else {
                    Some(ValuePayload::Select(matched))
                }
            }
            VariableKind::Section(_) => match old {
                ValuePayload::Section(fragment) => Some(ValuePayload::Section(fragment.clone())),
                _ => None,
            },
            VariableKind::Table(_) => match old {
                ValuePayload::Table => Some(ValuePayload::Table),
                _ => None,
            },
        }
    }
}

/// Names of selected options in option-list order; unknown IDs are skipped
fn option_names<'a>(
    select: &'a SelectVariable,
    selected: &BTreeSet<crate::ids::SelectOptionId>,
) -> Vec<&'a str> {
    select
        .options
        .iter()
        .filter(|option| selected.contains(&option.id))
        .map(|option| option.name.as_str())
        .collect()
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

/// Plain or scientific notation
fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
