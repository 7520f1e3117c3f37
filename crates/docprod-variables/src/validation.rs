//! Validation Engine
//!
//! Decides whether a value is legal for a variable. The generic list-position
//! rule runs first, then the payload kind is checked, then the kind-specific
//! constraints.

use crate::error::{LookupError, ValidationError};
use crate::lookup::VariableLookup;
use crate::value::{
    SectionValueFragment, UsageType, ValueIdentity, ValuePayload, VariableValue,
};
use crate::variable::{TextType, Variable, VariableKind};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_EMAIL_LOCAL_LENGTH: usize = 64;

/// Dot-atom local part and a hostname with an alphabetic top-level label
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$"#,
    )
    .expect("email pattern is a valid regex")
});

/// Whether `text` is a bare email address (no display name, no list)
#[must_use]
pub fn is_valid_email(text: &str) -> bool {
    if text.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    match text.split_once('@') {
        Some((local, _)) if local.len() <= MAX_EMAIL_LOCAL_LENGTH => EMAIL_PATTERN.is_match(text),
        _ => false,
    }
}

impl Variable {
    /// Check whether a value is legal for this variable
    ///
    /// # Errors
    /// - [`ValidationError::NotList`] for a nonzero list position on a
    ///   non-list variable
    /// - [`ValidationError::TypeMismatch`] if the payload is of another kind
    /// - [`ValidationError::Invalid`] if a kind-specific constraint fails
    /// - [`ValidationError::Lookup`] if resolving a referenced variable failed
    ///   for a reason other than "not found"
    pub fn validate<Id: ValueIdentity>(
        &self,
        value: &VariableValue<Id>,
        lookup: &dyn VariableLookup,
    ) -> Result<(), ValidationError> {
        if !self.is_list() && value.list_position() > 0 {
            return Err(ValidationError::NotList {
                variable_id: self.id(),
            });
        }

        self.validate_for_type(value, lookup)
    }

    /// Check only that the payload kind matches this variable's kind
    ///
    /// # Errors
    /// [`ValidationError::TypeMismatch`] on mismatch
    pub fn check_value_type<Id: ValueIdentity>(
        &self,
        value: &VariableValue<Id>,
    ) -> Result<(), ValidationError> {
        if value.value_type() == Some(self.variable_type()) {
            Ok(())
        } else {
            Err(self.type_mismatch(&value.payload))
        }
    }

    fn type_mismatch(&self, payload: &ValuePayload) -> ValidationError {
        ValidationError::TypeMismatch {
            variable_id: self.id(),
            expected: self.variable_type(),
            actual: payload.value_type(),
        }
    }

    fn validate_for_type<Id: ValueIdentity>(
        &self,
        value: &VariableValue<Id>,
        lookup: &dyn VariableLookup,
    ) -> Result<(), ValidationError> {
        let id = self.id();
        let payload = &value.payload;

        match self.kind() {
            VariableKind::Number(number) => {
                let ValuePayload::Number(n) = payload else {
                    return Err(self.type_mismatch(payload));
                };
                if let Some(min) = number.min_value {
                    if *n < min {
                        return Err(ValidationError::invalid(
                            id,
                            format!("{n} is less than minimum value {min}"),
                        ));
                    }
                }
                if let Some(max) = number.max_value {
                    if *n > max {
                        return Err(ValidationError::invalid(
                            id,
                            format!("{n} is greater than maximum value {max}"),
                        ));
                    }
                }
                if let Some(places) = number.decimal_places {
                    if n.scale() > places {
                        return Err(ValidationError::invalid(
                            id,
                            format!("{n} has more decimal places than the maximum {places}"),
                        ));
                    }
                }
                Ok(())
            }
            VariableKind::Text(text) => {
                let ValuePayload::Text(s) = payload else {
                    return Err(self.type_mismatch(payload));
                };
                if text.text_type == TextType::SingleLine && s.contains('\n') {
                    return Err(ValidationError::invalid(
                        id,
                        "single-line text value cannot contain line breaks",
                    ));
                }
                Ok(())
            }
            VariableKind::Email => {
                let ValuePayload::Email(s) = payload else {
                    return Err(self.type_mismatch(payload));
                };
                if !is_valid_email(s) {
                    return Err(ValidationError::invalid(
                        id,
                        "value is not a valid email address",
                    ));
                }
                Ok(())
            }
            VariableKind::Select(select) => {
                let ValuePayload::Select(selected) = payload else {
                    return Err(self.type_mismatch(payload));
                };
                if !select.is_multiple && selected.len() > 1 {
                    return Err(ValidationError::invalid(
                        id,
                        "cannot select multiple values on single-selection variable",
                    ));
                }
                if let Some(unknown) = selected.iter().find(|option| !select.has_option(**option))
                {
                    return Err(ValidationError::invalid(
                        id,
                        format!("{unknown} is not a valid option ID for this variable"),
                    ));
                }
                Ok(())
            }
            VariableKind::Section(_) => {
                let ValuePayload::Section(fragment) = payload else {
                    return Err(self.type_mismatch(payload));
                };
                match fragment {
                    SectionValueFragment::Text(_) => Ok(()),
                    SectionValueFragment::Variable(reference) => {
                        if reference.usage_type == UsageType::Injection
                            && reference.display_style.is_none()
                        {
                            return Err(ValidationError::invalid(
                                id,
                                "display style is required for variable injections",
                            ));
                        }
                        match lookup.fetch_variable(reference.used_variable_id) {
                            Ok(_) => Ok(()),
                            Err(LookupError::VariableNotFound(used)) => {
                                Err(ValidationError::invalid(
                                    id,
                                    format!(
                                        "variable {used} is used but does not exist in manifest"
                                    ),
                                ))
                            }
                            Err(e) => Err(e.into()),
                        }
                    }
                }
            }
            VariableKind::Date => match payload {
                ValuePayload::Date(_) => Ok(()),
                _ => Err(self.type_mismatch(payload)),
            },
            VariableKind::Link => match payload {
                ValuePayload::Link(_) => Ok(()),
                _ => Err(self.type_mismatch(payload)),
            },
            VariableKind::Image => match payload {
                ValuePayload::Image(_) => Ok(()),
                _ => Err(self.type_mismatch(payload)),
            },
            VariableKind::Table(_) => match payload {
                ValuePayload::Table => Ok(()),
                _ => Err(self.type_mismatch(payload)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FileId, ProjectId, Scope, SelectOptionId, StableId, VariableId};
    use crate::value::{
        DisplayStyle, ImageValueDetails, LinkValueDetails, NewValue, SectionVariableRef,
        ValueBase,
    };
    use crate::variable::{
        BaseVariable, NumberVariable, SectionVariable, SelectOption, SelectVariable,
        TextVariable,
    };
    use rust_decimal::Decimal;
    use std::collections::BTreeSet;
    use std::str::FromStr;
    use std::sync::Arc;

    /// Variable ID that fails to resolve
    const NONEXISTENT: VariableId = VariableId(10);

    fn lookup(id: VariableId) -> Result<Arc<Variable>, LookupError> {
        if id == NONEXISTENT {
            Err(LookupError::VariableNotFound(id))
        } else {
            Ok(Arc::new(Variable::new(base(id.value()), VariableKind::Link)))
        }
    }

    fn base(id: i64) -> BaseVariable {
        BaseVariable::new(VariableId(id), StableId::new("A"), "Test", 0)
    }

    fn value(payload: ValuePayload) -> NewValue {
        value_at(0, payload)
    }

    fn value_at(list_position: u32, payload: ValuePayload) -> NewValue {
        NewValue::new(
            ValueBase::new(Scope::Project(ProjectId(1)), VariableId(1), list_position),
            payload,
        )
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn number(min: Option<&str>, max: Option<&str>, places: Option<u32>) -> Variable {
        Variable::new(
            base(1),
            VariableKind::Number(NumberVariable {
                min_value: min.map(dec),
                max_value: max.map(dec),
                decimal_places: places,
            }),
        )
    }

    fn text(text_type: TextType) -> Variable {
        Variable::new(base(1), VariableKind::Text(TextVariable { text_type }))
    }

    fn select(is_multiple: bool) -> Variable {
        Variable::new(
            base(1),
            VariableKind::Select(SelectVariable {
                is_multiple,
                options: vec![
                    SelectOption::new(SelectOptionId(1), "One"),
                    SelectOption::new(SelectOptionId(2), "Two"),
                ],
            }),
        )
    }

    fn selected(ids: &[i64]) -> ValuePayload {
        ValuePayload::Select(ids.iter().copied().map(SelectOptionId).collect::<BTreeSet<_>>())
    }

    fn section() -> Variable {
        Variable::new(base(1), VariableKind::Section(SectionVariable::new(true)))
    }

    fn injection(used: VariableId, display_style: Option<DisplayStyle>) -> ValuePayload {
        ValuePayload::Section(SectionValueFragment::Variable(SectionVariableRef {
            used_variable_id: used,
            usage_type: UsageType::Injection,
            display_style,
        }))
    }

    #[test]
    fn rejects_nonzero_list_positions_for_non_list_variables() {
        let variable = Variable::new(base(1), VariableKind::Date);
        let result = variable.validate(
            &value_at(1, ValuePayload::Date(chrono::NaiveDate::MIN)),
            &lookup,
        );
        assert_eq!(
            result,
            Err(ValidationError::NotList {
                variable_id: VariableId(1)
            })
        );
    }

    #[test]
    fn allows_nonzero_list_positions_for_list_variables() {
        let variable = Variable::new(base(1).with_list(true), VariableKind::Date);
        let result = variable.validate(
            &value_at(1, ValuePayload::Date(chrono::NaiveDate::MIN)),
            &lookup,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn list_rule_runs_before_type_check() {
        let variable = Variable::new(base(1), VariableKind::Date);
        let result = variable.validate(&value_at(2, ValuePayload::Text("x".into())), &lookup);
        assert!(matches!(result, Err(ValidationError::NotList { .. })));
    }

    #[test]
    fn rejects_values_of_incorrect_types() {
        let variables = vec![
            number(None, None, None),
            text(TextType::MultiLine),
            Variable::new(base(1), VariableKind::Date),
            Variable::new(base(1), VariableKind::Email),
            Variable::new(base(1), VariableKind::Image),
            Variable::new(base(1), VariableKind::Link),
            select(true),
            section(),
        ];
        for variable in variables {
            let result = variable.validate(&value(ValuePayload::Table), &lookup);
            assert!(
                matches!(result, Err(ValidationError::TypeMismatch { .. })),
                "{} accepted a table value",
                variable.variable_type()
            );
        }

        let table = Variable::new(
            base(1),
            VariableKind::Table(crate::variable::TableVariable {
                table_style: crate::variable::TableStyle::Horizontal,
                columns: vec![],
            }),
        );
        assert!(matches!(
            table.validate(&value(ValuePayload::Deleted), &lookup),
            Err(ValidationError::TypeMismatch { actual: None, .. })
        ));
    }

    #[test]
    fn accepts_payload_only_kinds() {
        let url = url::Url::parse("https://example.com/").unwrap();
        let cases = vec![
            (
                Variable::new(base(1), VariableKind::Link),
                ValuePayload::Link(LinkValueDetails { url, title: None }),
            ),
            (
                Variable::new(base(1), VariableKind::Image),
                ValuePayload::Image(ImageValueDetails {
                    file_id: FileId(3),
                    caption: Some("Nursery".into()),
                }),
            ),
        ];
        for (variable, payload) in cases {
            assert!(variable.validate(&value(payload), &lookup).is_ok());
        }
    }

    #[test]
    fn number_allows_value_that_meets_constraints() {
        let variable = number(Some("1"), Some("10"), Some(2));
        assert!(variable
            .validate(&value(ValuePayload::Number(dec("5.25"))), &lookup)
            .is_ok());
        assert!(variable
            .validate(&value(ValuePayload::Number(dec("10"))), &lookup)
            .is_ok());
    }

    #[test]
    fn number_rejects_values_below_minimum() {
        let variable = number(Some("1"), None, None);
        assert!(matches!(
            variable.validate(&value(ValuePayload::Number(dec("0.99"))), &lookup),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn number_rejects_values_above_maximum() {
        let variable = number(None, Some("10"), None);
        assert!(matches!(
            variable.validate(&value(ValuePayload::Number(dec("10.01"))), &lookup),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn number_rejects_too_many_decimal_places() {
        let variable = number(None, None, Some(1));
        assert!(matches!(
            variable.validate(&value(ValuePayload::Number(dec("1.25"))), &lookup),
            Err(ValidationError::Invalid { .. })
        ));
        // Scale counts trailing zeros.
        assert!(variable
            .validate(&value(ValuePayload::Number(dec("1.20"))), &lookup)
            .is_err());
    }

    #[test]
    fn email_validation() {
        let variable = Variable::new(base(1), VariableKind::Email);
        let check = |s: &str| variable.validate(&value(ValuePayload::Email(s.into())), &lookup);

        assert!(check("valid@example.com").is_ok());
        assert!(check("first.last+tag@sub.example.org").is_ok());
        assert!(check("Real Person <valid@example.com>").is_err());
        assert!(check("invalid").is_err());
        assert!(check("a@b.com,c@d.com").is_err());
        assert!(check("dot.@example.com").is_err());
        assert!(check("user@localhost").is_err());
    }

    #[test]
    fn single_line_text_rejects_line_breaks() {
        let single = text(TextType::SingleLine);
        let multi = text(TextType::MultiLine);
        let one_line = value(ValuePayload::Text("one line".into()));
        let two_lines = value(ValuePayload::Text("first\nsecond".into()));

        assert!(single.validate(&one_line, &lookup).is_ok());
        assert!(multi.validate(&two_lines, &lookup).is_ok());
        assert!(matches!(
            single.validate(&two_lines, &lookup),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn select_rules() {
        assert!(select(false).validate(&value(selected(&[1])), &lookup).is_ok());
        assert!(select(true).validate(&value(selected(&[1, 2])), &lookup).is_ok());
        assert!(select(false).validate(&value(selected(&[])), &lookup).is_ok());
        assert!(matches!(
            select(false).validate(&value(selected(&[1, 2])), &lookup),
            Err(ValidationError::Invalid { .. })
        ));
        assert!(matches!(
            select(true).validate(&value(selected(&[1, 3])), &lookup),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn section_accepts_text_and_valid_references() {
        let variable = section();
        let text_fragment =
            value(ValuePayload::Section(SectionValueFragment::Text("Intro".into())));
        assert!(variable.validate(&text_fragment, &lookup).is_ok());

        assert!(variable
            .validate(&value(injection(VariableId(3), Some(DisplayStyle::Inline))), &lookup)
            .is_ok());

        let reference = value(ValuePayload::Section(SectionValueFragment::Variable(
            SectionVariableRef {
                used_variable_id: VariableId(3),
                usage_type: UsageType::Reference,
                display_style: None,
            },
        )));
        assert!(variable.validate(&reference, &lookup).is_ok());
    }

    #[test]
    fn section_rejects_reference_to_nonexistent_variable() {
        let result = section().validate(
            &value(injection(NONEXISTENT, Some(DisplayStyle::Block))),
            &lookup,
        );
        assert!(matches!(result, Err(ValidationError::Invalid { .. })));
    }

    #[test]
    fn section_rejects_injection_without_display_style() {
        let result = section().validate(&value(injection(VariableId(3), None)), &lookup);
        assert!(matches!(result, Err(ValidationError::Invalid { .. })));
    }

    #[test]
    fn section_propagates_lookup_outages() {
        let offline = |_: VariableId| -> Result<Arc<Variable>, LookupError> {
            Err(LookupError::Unavailable("store offline".into()))
        };
        let result = section().validate(
            &value(injection(VariableId(3), Some(DisplayStyle::Block))),
            &offline,
        );
        assert!(matches!(result, Err(ValidationError::Lookup(_))));
    }
}
