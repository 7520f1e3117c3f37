//! Table migration
//!
//! Each old row becomes a new row container followed by the converted values
//! of the columns that were replaced. Column values reference their new row
//! through [`RowRef::Appended`], since the row does not exist yet.

use super::Run;
use crate::error::UpgradeError;
use docprod_variables::{RowRef, TableVariable, Variable};

impl Run<'_, '_> {
    pub(super) fn table(
        &mut self,
        target: &Variable,
        new_table: &TableVariable,
    ) -> Result<(), UpgradeError> {
        let Some((old_variable, old_rows)) = self.pending_predecessor(target)? else {
            return Ok(());
        };
        let Some(old_table) = old_variable.as_table() else {
            tracing::warn!(
                "variable {} used to be {} but is now a table",
                target.name(),
                old_variable.variable_type()
            );
            return Ok(());
        };

        let calculator = self.calculator;
        let mut columns = Vec::new();
        for column in &new_table.columns {
            let new_column = &column.variable;
            let old_column = calculator
                .replacements
                .previous(new_column.id())
                .iter()
                .copied()
                .chain(new_column.replaces_variable_id())
                .find_map(|id| old_table.column(id));

            if let Some(old_column) = old_column {
                let values = self.values(old_column.variable.id())?;
                columns.push((new_column, &old_column.variable, values));
            }
        }

        for row in old_rows.iter() {
            let Some(row_index) = self.migrate_value(target, &old_variable, row, None)? else {
                tracing::debug!("row {} of table {} was not carried over", row.id(), old_variable.id());
                continue;
            };

            let old_row = RowRef::Value(row.id());
            for (new_column, old_column, values) in &columns {
                for old_value in values.iter().filter(|v| v.row_value_id() == Some(old_row)) {
                    self.migrate_value(
                        new_column,
                        old_column,
                        old_value,
                        Some(RowRef::Appended(row_index)),
                    )?;
                }
            }
        }
        Ok(())
    }
}
