//! Depth-first traversal of composite variables

use crate::variable::{Variable, VariableKind};
use std::iter::FusedIterator;

/// Pre-order walk over a variable and its descendants
///
/// Sections yield their subsections, tables yield their column variables.
/// Finite: bounded by the size of the definition it borrows.
#[derive(Debug, Clone)]
pub struct WalkTree<'a> {
    stack: Vec<&'a Variable>,
}

impl<'a> WalkTree<'a> {
    pub(crate) fn new(root: &'a Variable) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for WalkTree<'a> {
    type Item = &'a Variable;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        match current.kind() {
            VariableKind::Section(section) => {
                self.stack.extend(section.children().iter().rev());
            }
            VariableKind::Table(table) => {
                self.stack
                    .extend(table.columns.iter().rev().map(|column| &column.variable));
            }
            VariableKind::Number(_)
            | VariableKind::Text(_)
            | VariableKind::Date
            | VariableKind::Email
            | VariableKind::Image
            | VariableKind::Link
            | VariableKind::Select(_) => {}
        }
        Some(current)
    }
}

impl FusedIterator for WalkTree<'_> {}
