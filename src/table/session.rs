//! Scoped edit session over a feature table.
//!
//! Opening a session calls `begin_edit`; the session is committed either
//! explicitly with [`EditSession::commit`] or, on any early exit, when it is
//! dropped. The table never stays in a half-open edit state.

use super::{Cell, FeatureTable, TableError};
use crate::store::FeatureId;
use tracing::{debug, warn};

pub struct EditSession<'a, T: FeatureTable + ?Sized> {
    table: &'a mut T,
    label: String,
    open: bool,
}

impl<'a, T: FeatureTable + ?Sized> EditSession<'a, T> {
    pub fn begin(table: &'a mut T, label: impl Into<String>) -> Result<Self, TableError> {
        let label = label.into();
        table.begin_edit()?;
        debug!(session = %label, "BEGIN");
        Ok(Self { table, label, open: true })
    }

    pub fn get_cell(&self, row: FeatureId, field: &str) -> Result<Cell, TableError> {
        self.table.get_cell(row, field)
    }

    pub fn set_cell(&mut self, row: FeatureId, field: &str, value: Cell) -> Result<(), TableError> {
        self.table.set_cell(row, field, value)
    }

    pub fn delete_row(&mut self, row: FeatureId) -> Result<(), TableError> {
        self.table.delete_row(row)
    }

    pub fn commit(mut self) -> Result<(), TableError> {
        self.open = false;
        self.table.commit_edit()?;
        debug!(session = %self.label, "END");
        Ok(())
    }
}

impl<T: FeatureTable + ?Sized> Drop for EditSession<'_, T> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        match self.table.commit_edit() {
            Ok(()) => debug!(session = %self.label, "END (early exit)"),
            Err(e) => warn!(session = %self.label, error = %e, "failed to close edit session"),
        }
    }
}
