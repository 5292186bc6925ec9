//! Columnar result tables
//!
//! This module defines:
//! - Field / Schema: named, typed columns
//! - RecordTable: an ordered columnar row set (row order is the ranking)
//! - Row: one materialized row, columns in schema order
//!
//! Tables are immutable values. Every transformation (`take`, `slice`,
//! `append_column`, `drop_column`, ...) returns a new table.

use crate::error::{QuiverError, QuiverResult};
use crate::value::{DataType, Value};
use serde::{Deserialize, Serialize};

// ============================================================================
// Schema
// ============================================================================

/// A named, typed column description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Logical type
    pub data_type: DataType,
    /// Whether the column may hold `Null`
    pub nullable: bool,
}

impl Field {
    /// Create a field
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Ordered list of fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Create a schema; field names must be unique
    pub fn new(fields: Vec<Field>) -> QuiverResult<Self> {
        for (i, f) in fields.iter().enumerate() {
            if fields[..i].iter().any(|g| g.name == f.name) {
                return Err(QuiverError::schema_mismatch(format!(
                    "duplicate column '{}'",
                    f.name
                )));
            }
        }
        Ok(Schema { fields })
    }

    /// All fields in order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of a column
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether a column exists
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Fixed-size float32 vector columns, in schema order
    pub fn vector_columns(&self) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|f| f.data_type.is_vector())
            .collect()
    }

    /// Column names in order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

// ============================================================================
// Row
// ============================================================================

/// One row, columns in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Value of a column
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate `(column, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object view, used for typed records
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

// ============================================================================
// RecordTable
// ============================================================================

/// Ordered columnar row set
///
/// # Invariants
///
/// - one value vector per schema field, all of equal length
/// - every value is accepted by its field's type
/// - `Null` only appears in nullable fields
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    schema: Schema,
    columns: Vec<Vec<Value>>,
    num_rows: usize,
}

impl RecordTable {
    /// Build a table from a schema and one value vector per field
    pub fn new(schema: Schema, columns: Vec<Vec<Value>>) -> QuiverResult<Self> {
        if columns.len() != schema.len() {
            return Err(QuiverError::schema_mismatch(format!(
                "schema has {} fields but {} columns were given",
                schema.len(),
                columns.len()
            )));
        }
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for (field, values) in schema.fields().iter().zip(&columns) {
            check_column(field, values, num_rows)?;
        }
        Ok(RecordTable {
            schema,
            columns,
            num_rows,
        })
    }

    /// Zero-row table with the given schema
    pub fn empty(schema: Schema) -> Self {
        let columns = vec![Vec::new(); schema.len()];
        RecordTable {
            schema,
            columns,
            num_rows: 0,
        }
    }

    /// Build a table from row-major values
    pub fn from_rows(schema: Schema, rows: Vec<Vec<Value>>) -> QuiverResult<Self> {
        let mut columns = vec![Vec::with_capacity(rows.len()); schema.len()];
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != schema.len() {
                return Err(QuiverError::schema_mismatch(format!(
                    "row {} has {} values, schema has {} fields",
                    i,
                    row.len(),
                    schema.len()
                )));
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.push(value);
            }
        }
        RecordTable::new(schema, columns)
    }

    /// The table schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    /// Values of a column
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.schema.index_of(name).map(|i| self.columns[i].as_slice())
    }

    /// Values of a column, failing with `ColumnNotFound`
    pub fn require_column(&self, name: &str) -> QuiverResult<&[Value]> {
        self.column(name)
            .ok_or_else(|| QuiverError::column_not_found(name))
    }

    /// Read a float column as `f32`
    ///
    /// Fails on nulls and non-numeric values.
    pub fn f32_column(&self, name: &str) -> QuiverResult<Vec<f32>> {
        self.require_column(name)?
            .iter()
            .map(|v| {
                v.as_f64().map(|x| x as f32).ok_or_else(|| {
                    QuiverError::schema_mismatch(format!(
                        "column '{}' holds a non-numeric {} value",
                        name,
                        v.type_name()
                    ))
                })
            })
            .collect()
    }

    /// Read a row-id style column as `u64`
    pub fn u64_column(&self, name: &str) -> QuiverResult<Vec<u64>> {
        self.require_column(name)?
            .iter()
            .map(|v| {
                v.as_u64().ok_or_else(|| {
                    QuiverError::schema_mismatch(format!(
                        "column '{}' holds a non-integer {} value",
                        name,
                        v.type_name()
                    ))
                })
            })
            .collect()
    }

    /// Rows at `indices`, in the given order
    pub fn take(&self, indices: &[usize]) -> QuiverResult<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.num_rows) {
            return Err(QuiverError::schema_mismatch(format!(
                "row index {} out of bounds for {} rows",
                bad, self.num_rows
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
            .collect();
        Ok(RecordTable {
            schema: self.schema.clone(),
            columns,
            num_rows: indices.len(),
        })
    }

    /// At most `len` rows starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        let start = offset.min(self.num_rows);
        let end = start.saturating_add(len).min(self.num_rows);
        let columns = self
            .columns
            .iter()
            .map(|col| col[start..end].to_vec())
            .collect();
        RecordTable {
            schema: self.schema.clone(),
            columns,
            num_rows: end - start,
        }
    }

    /// Add a column at the end; an existing column of the same name is
    /// replaced in place
    pub fn append_column(self, field: Field, values: Vec<Value>) -> QuiverResult<Self> {
        let at = self.schema.len();
        self.insert_column(at, field, values)
    }

    /// Add a column at the front; an existing column of the same name is
    /// replaced in place
    pub fn prepend_column(self, field: Field, values: Vec<Value>) -> QuiverResult<Self> {
        self.insert_column(0, field, values)
    }

    fn insert_column(self, at: usize, field: Field, values: Vec<Value>) -> QuiverResult<Self> {
        let num_rows = if self.schema.is_empty() {
            values.len()
        } else {
            self.num_rows
        };
        check_column(&field, &values, num_rows)?;

        let name = field.name.clone();
        let at = self.schema.index_of(&name).unwrap_or(at);
        let mut table = self.drop_column(&name);
        let at = at.min(table.schema.len());
        table.schema.fields.insert(at, field);
        table.columns.insert(at, values);
        table.num_rows = num_rows;
        Ok(table)
    }

    /// Remove a column; no-op when absent
    pub fn drop_column(mut self, name: &str) -> Self {
        if let Some(i) = self.schema.index_of(name) {
            self.schema.fields.remove(i);
            self.columns.remove(i);
        }
        self
    }

    /// Keep only the named columns, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> QuiverResult<Self> {
        let mut fields = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let i = self
                .schema
                .index_of(name)
                .ok_or_else(|| QuiverError::column_not_found(name))?;
            fields.push(self.schema.fields[i].clone());
            columns.push(self.columns[i].clone());
        }
        Ok(RecordTable {
            schema: Schema::new(fields)?,
            columns,
            num_rows: self.num_rows,
        })
    }

    /// Stack tables vertically
    ///
    /// The output schema is the union of input columns in first-seen order.
    /// Columns missing from a table are filled with `Null` and become
    /// nullable. A column whose type differs between tables is an error.
    pub fn concat(tables: &[RecordTable]) -> QuiverResult<Self> {
        let mut fields: Vec<Field> = Vec::new();
        for table in tables {
            for f in table.schema.fields() {
                match fields.iter_mut().find(|g| g.name == f.name) {
                    Some(g) if g.data_type != f.data_type => {
                        return Err(QuiverError::schema_mismatch(format!(
                            "column '{}' is {} in one table and {} in another",
                            f.name, g.data_type, f.data_type
                        )));
                    }
                    Some(g) => g.nullable |= f.nullable,
                    None => fields.push(f.clone()),
                }
            }
        }
        for f in fields.iter_mut() {
            if tables.iter().any(|t| !t.has_column(&f.name)) {
                f.nullable = true;
            }
        }

        let total: usize = tables.iter().map(|t| t.num_rows).sum();
        let mut columns = Vec::with_capacity(fields.len());
        for f in &fields {
            let mut col = Vec::with_capacity(total);
            for table in tables {
                match table.column(&f.name) {
                    Some(values) => col.extend_from_slice(values),
                    None => col.extend(std::iter::repeat(Value::Null).take(table.num_rows)),
                }
            }
            columns.push(col);
        }
        Ok(RecordTable {
            schema: Schema::new(fields)?,
            columns,
            num_rows: total,
        })
    }

    /// Value at `(row, column)`
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// Materialize one row
    pub fn row(&self, index: usize) -> Option<Row> {
        if index >= self.num_rows {
            return None;
        }
        let entries = self
            .schema
            .fields()
            .iter()
            .zip(&self.columns)
            .map(|(f, col)| (f.name.clone(), col[index].clone()))
            .collect();
        Some(Row { entries })
    }

    /// Materialize every row, in table order
    pub fn rows(&self) -> Vec<Row> {
        (0..self.num_rows).filter_map(|i| self.row(i)).collect()
    }
}

fn check_column(field: &Field, values: &[Value], num_rows: usize) -> QuiverResult<()> {
    if values.len() != num_rows {
        return Err(QuiverError::schema_mismatch(format!(
            "column '{}' has {} values, expected {}",
            field.name,
            values.len(),
            num_rows
        )));
    }
    for v in values {
        if v.is_null() && !field.nullable {
            return Err(QuiverError::schema_mismatch(format!(
                "null value in non-nullable column '{}'",
                field.name
            )));
        }
        if !field.data_type.accepts(v) {
            return Err(QuiverError::schema_mismatch(format!(
                "column '{}' of type {} cannot hold a {} value",
                field.name,
                field.data_type,
                v.type_name()
            )));
        }
    }
    Ok(())
}
