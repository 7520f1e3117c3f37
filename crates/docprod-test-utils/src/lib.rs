//! Testing utilities for the document producer workspace
//!
//! Shared fixtures and an in-memory value store that can apply operation lists.

#![allow(missing_docs)]

use docprod_upgrade::ValueLookup;
use docprod_variables::{
    BaseVariable, DocumentId, ExistingValue, LookupError, NewValue, NumberVariable, ProjectId,
    RowRef, Scope, SectionVariable, SelectOption, SelectOptionId, SelectVariable, StableId,
    TableColumn, TableStyle, TableVariable, TextType, TextVariable, ValueBase, ValueOperation,
    ValuePayload, Variable, VariableId, VariableKind, VariableValueId,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn project(id: i64) -> Scope {
    Scope::Project(ProjectId(id))
}

pub fn document(id: i64) -> Scope {
    Scope::Document(DocumentId(id))
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// List-valued base properties with a stable ID derived from `id`
pub fn base(id: i64, position: u32) -> BaseVariable {
    BaseVariable::new(
        VariableId(id),
        StableId::new(format!("var-{id}")),
        format!("Variable {id}"),
        position,
    )
    .with_list(true)
}

pub fn number_variable(id: i64, position: u32) -> Variable {
    number_variable_with(id, position, NumberVariable::default())
}

pub fn number_variable_with(id: i64, position: u32, constraints: NumberVariable) -> Variable {
    Variable::new(base(id, position), VariableKind::Number(constraints))
}

pub fn text_variable(id: i64, position: u32, text_type: TextType) -> Variable {
    Variable::new(
        base(id, position),
        VariableKind::Text(TextVariable { text_type }),
    )
}

pub fn select_variable(id: i64, position: u32, is_multiple: bool, options: &[(i64, &str)]) -> Variable {
    Variable::new(
        base(id, position),
        VariableKind::Select(SelectVariable {
            is_multiple,
            options: options
                .iter()
                .map(|(option_id, name)| SelectOption::new(SelectOptionId(*option_id), *name))
                .collect(),
        }),
    )
}

pub fn section_variable(id: i64, position: u32, children: Vec<Variable>) -> Variable {
    let mut section = SectionVariable::new(true);
    for child in children {
        section.add_child(child).unwrap();
    }
    Variable::new(base(id, position), VariableKind::Section(section))
}

pub fn table_variable(id: i64, position: u32, columns: Vec<Variable>) -> Variable {
    Variable::new(
        base(id, position),
        VariableKind::Table(TableVariable {
            table_style: TableStyle::Horizontal,
            columns: columns
                .into_iter()
                .map(|variable| TableColumn {
                    is_header: false,
                    variable,
                })
                .collect(),
        }),
    )
}

/// Same variable with `replaces_variable_id` set
pub fn replacing(variable: &Variable, old: i64) -> Variable {
    Variable::new(
        variable.base().clone().with_replaces(VariableId(old)),
        variable.kind().clone(),
    )
}

pub fn new_value(scope: Scope, variable_id: i64, list_position: u32, payload: ValuePayload) -> NewValue {
    NewValue::new(
        ValueBase::new(scope, VariableId(variable_id), list_position),
        payload,
    )
}

pub fn number_value(scope: Scope, variable_id: i64, list_position: u32, number: &str) -> NewValue {
    new_value(scope, variable_id, list_position, ValuePayload::Number(dec(number)))
}

pub fn text_value(scope: Scope, variable_id: i64, list_position: u32, text: &str) -> NewValue {
    new_value(scope, variable_id, list_position, ValuePayload::Text(text.to_string()))
}

/// Value store that assigns IDs and positions the way a host would
#[derive(Debug, Clone, Default)]
pub struct InMemoryValueStore {
    values: BTreeMap<VariableValueId, ExistingValue>,
    defaults: HashMap<VariableId, Vec<ValuePayload>>,
    next_id: i64,
}

impl InMemoryValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a value as given, keeping its list position
    pub fn insert(&mut self, value: NewValue) -> VariableValueId {
        self.next_id += 1;
        let id = VariableValueId(self.next_id);
        self.values.insert(id, value.with_id(id));
        id
    }

    /// Persist a table-column value inside a persisted row
    pub fn insert_in_row(&mut self, row: VariableValueId, value: NewValue) -> VariableValueId {
        let value = NewValue::new(value.base.with_row(RowRef::Value(row)), value.payload);
        self.insert(value)
    }

    /// Default values handed to brand-new sections
    pub fn set_defaults(&mut self, variable_id: VariableId, payloads: Vec<ValuePayload>) {
        self.defaults.insert(variable_id, payloads);
    }

    pub fn get(&self, id: VariableValueId) -> Option<&ExistingValue> {
        self.values.get(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of a variable in a scope, ordered by list position
    pub fn values_of(&self, scope: Scope, variable_id: VariableId) -> Vec<ExistingValue> {
        let mut values: Vec<_> = self
            .values
            .values()
            .filter(|v| v.scope() == scope && v.variable_id() == variable_id)
            .cloned()
            .collect();
        values.sort_by_key(ExistingValue::list_position);
        values
    }

    /// Apply operations in order; returns the IDs of appended values
    ///
    /// Appends get the next free list position of their variable (within
    /// their row), and [`RowRef::Appended`] references are resolved to the
    /// rows created earlier in the same list.
    pub fn apply(&mut self, operations: &[ValueOperation]) -> Vec<VariableValueId> {
        let mut appended: HashMap<usize, VariableValueId> = HashMap::new();

        for (index, operation) in operations.iter().enumerate() {
            match operation {
                ValueOperation::Append { value } => {
                    let row = value.row_value_id().map(|row| resolve(&appended, row));
                    let mut base = value.base.clone();
                    base.row_value_id = row;
                    base.list_position = self.next_position(base.scope, base.variable_id, row);
                    let id = self.insert(NewValue::new(base, value.payload.clone()));
                    appended.insert(index, id);
                }
                ValueOperation::Update { value } => {
                    assert!(
                        self.values.contains_key(&value.id()),
                        "update of unknown value {}",
                        value.id()
                    );
                    self.values.insert(value.id(), value.clone());
                }
                ValueOperation::Delete { value_id, .. } => {
                    self.values.remove(value_id);
                }
                ValueOperation::Replace {
                    scope,
                    variable_id,
                    row_value_id,
                    values,
                } => {
                    let row = row_value_id.map(|row| resolve(&appended, row));
                    self.values.retain(|_, v| {
                        !(v.scope() == *scope
                            && v.variable_id() == *variable_id
                            && v.row_value_id() == row)
                    });
                    for (position, value) in (0u32..).zip(values) {
                        let mut base = value.base.clone();
                        base.row_value_id = row;
                        base.list_position = position;
                        self.insert(NewValue::new(base, value.payload.clone()));
                    }
                }
            }
        }

        let mut ids: Vec<_> = appended.into_iter().collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn next_position(&self, scope: Scope, variable_id: VariableId, row: Option<RowRef>) -> u32 {
        self.values
            .values()
            .filter(|v| v.scope() == scope && v.variable_id() == variable_id && v.row_value_id() == row)
            .map(|v| v.list_position() + 1)
            .max()
            .unwrap_or(0)
    }
}

fn resolve(appended: &HashMap<usize, VariableValueId>, row: RowRef) -> RowRef {
    match row {
        RowRef::Value(id) => RowRef::Value(id),
        RowRef::Appended(index) => RowRef::Value(
            *appended
                .get(&index)
                .unwrap_or_else(|| panic!("row reference to operation {index}, which appended nothing")),
        ),
    }
}

impl ValueLookup for InMemoryValueStore {
    fn values(&self, scope: Scope, variable_id: VariableId) -> Result<Vec<ExistingValue>, LookupError> {
        Ok(self.values_of(scope, variable_id))
    }

    fn scopes_with_values(&self, variable_ids: &[VariableId]) -> Result<Vec<Scope>, LookupError> {
        let mut scopes: Vec<_> = self
            .values
            .values()
            .filter(|v| variable_ids.contains(&v.variable_id()))
            .map(ExistingValue::scope)
            .collect();
        scopes.sort_unstable();
        scopes.dedup();
        Ok(scopes)
    }

    fn default_values(&self, scope: Scope, variable: &Variable) -> Result<Vec<NewValue>, LookupError> {
        Ok(self
            .defaults
            .get(&variable.id())
            .into_iter()
            .flatten()
            .zip(0u32..)
            .map(|(payload, position)| {
                NewValue::new(ValueBase::new(scope, variable.id(), position), payload.clone())
            })
            .collect())
    }
}
