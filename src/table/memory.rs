//! memory.rs
//! Dense columnar feature table. Rows are addressed by `FeatureId` through an
//! index map; each column stores one cell per row in row order.

use super::{Cell, FeatureTable, FieldType, TableError};
use crate::store::FeatureId;
use std::collections::{BTreeSet, HashMap};

/// Summary statistics of a numeric column, refreshed on every commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl ColumnStats {
    fn from_cells(cells: &[Cell]) -> Self {
        let mut stats = ColumnStats::default();
        let mut total = 0.0;
        for cell in cells {
            match cell {
                Cell::Number(v) => {
                    stats.count += 1;
                    total += v;
                    stats.min = Some(stats.min.map_or(*v, |m| m.min(*v)));
                    stats.max = Some(stats.max.map_or(*v, |m| m.max(*v)));
                }
                Cell::Missing => stats.missing += 1,
                Cell::Text(_) => {}
            }
        }
        if stats.count > 0 {
            stats.mean = Some(total / stats.count as f64);
        }
        stats
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    field_type: FieldType,
    cells: Vec<Cell>,
    stats: ColumnStats,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Vec<FeatureId>,
    row_index: HashMap<FeatureId, usize>,
    columns: Vec<Column>,
    editing: bool,
    // Columns written since the last commit.
    dirty: BTreeSet<usize>,
}

impl MemoryTable {
    pub fn new(rows: impl IntoIterator<Item = FeatureId>) -> Self {
        let rows: Vec<FeatureId> = rows.into_iter().collect();
        let row_index = rows.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self { rows, row_index, ..Default::default() }
    }

    /// A table with features `0..count`.
    pub fn with_rows(count: usize) -> Self {
        Self::new(0..count as FeatureId)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.column_position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| TableError::UnknownField(name.to_string()))
    }

    fn row_position(&self, row: FeatureId) -> Result<usize, TableError> {
        self.row_index.get(&row).copied().ok_or(TableError::UnknownFeature(row))
    }

    /// Adds a fully populated column outside any edit session; `None` becomes `Missing`.
    pub fn add_numeric_column(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), TableError> {
        self.add_populated_column(name, FieldType::Double, values.into_iter().map(Cell::from).collect())
    }

    pub fn add_text_column(&mut self, name: &str, values: Vec<&str>) -> Result<(), TableError> {
        self.add_populated_column(name, FieldType::Text, values.into_iter().map(|v| Cell::Text(v.to_string())).collect())
    }

    fn add_populated_column(&mut self, name: &str, field_type: FieldType, mut cells: Vec<Cell>) -> Result<(), TableError> {
        if self.column_position(name).is_some() {
            return Err(TableError::DuplicateField(name.to_string()));
        }
        cells.resize(self.rows.len(), Cell::Missing);
        let stats = ColumnStats::from_cells(&cells);
        self.columns.push(Column { name: name.to_string(), field_type, cells, stats });
        Ok(())
    }

    /// Every value of a column in row order, `None` for anything non-numeric.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        Ok(self.column(name)?.cells.iter().map(Cell::as_number).collect())
    }

    pub fn stats(&self, name: &str) -> Option<&ColumnStats> {
        self.column(name).ok().map(|c| &c.stats)
    }

    fn check_type(field: &str, field_type: FieldType, value: &Cell) -> Result<(), TableError> {
        let ok = match (field_type, value) {
            (_, Cell::Missing) => true,
            (FieldType::Double, Cell::Number(_)) => true,
            (FieldType::Integer, Cell::Number(v)) => v.fract() == 0.0,
            (FieldType::Text, Cell::Text(_)) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(TableError::TypeMismatch { field: field.to_string(), expected: field_type, found: value.type_name() })
        }
    }
}

impl FeatureTable for MemoryTable {
    fn row_ids(&self) -> Vec<FeatureId> {
        self.rows.clone()
    }

    fn field_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn field_type(&self, field: &str) -> Option<FieldType> {
        self.column(field).ok().map(|c| c.field_type)
    }

    fn get_cell(&self, row: FeatureId, field: &str) -> Result<Cell, TableError> {
        let column = self.column(field)?;
        let idx = self.row_position(row)?;
        Ok(column.cells[idx].clone())
    }

    fn add_column(&mut self, name: &str, field_type: FieldType) -> Result<(), TableError> {
        self.add_populated_column(name, field_type, Vec::new())
    }

    fn delete_column(&mut self, name: &str) -> Result<(), TableError> {
        let pos = self.column_position(name).ok_or_else(|| TableError::UnknownField(name.to_string()))?;
        self.columns.remove(pos);
        // Positions after the removed column shift down by one.
        self.dirty = self.dirty.iter().filter(|&&i| i != pos).map(|&i| if i > pos { i - 1 } else { i }).collect();
        Ok(())
    }

    fn set_cell(&mut self, row: FeatureId, field: &str, value: Cell) -> Result<(), TableError> {
        if !self.editing {
            return Err(TableError::NotEditing);
        }
        let idx = self.row_position(row)?;
        let pos = self.column_position(field).ok_or_else(|| TableError::UnknownField(field.to_string()))?;
        Self::check_type(field, self.columns[pos].field_type, &value)?;
        self.columns[pos].cells[idx] = value;
        self.dirty.insert(pos);
        Ok(())
    }

    fn delete_row(&mut self, row: FeatureId) -> Result<(), TableError> {
        if !self.editing {
            return Err(TableError::NotEditing);
        }
        let idx = self.row_position(row)?;
        self.rows.remove(idx);
        for column in self.columns.iter_mut() {
            column.cells.remove(idx);
        }
        self.row_index = self.rows.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        self.dirty.extend(0..self.columns.len());
        Ok(())
    }

    fn begin_edit(&mut self) -> Result<(), TableError> {
        if self.editing {
            return Err(TableError::AlreadyEditing);
        }
        self.editing = true;
        Ok(())
    }

    fn commit_edit(&mut self) -> Result<(), TableError> {
        if !self.editing {
            return Err(TableError::NotEditing);
        }
        for pos in std::mem::take(&mut self.dirty) {
            let column = &mut self.columns[pos];
            column.stats = ColumnStats::from_cells(&column.cells);
        }
        self.editing = false;
        Ok(())
    }

    fn is_editing(&self) -> bool {
        self.editing
    }
}
