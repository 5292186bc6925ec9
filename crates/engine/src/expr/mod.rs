//! SQL-like expression language for filters and projections
//!
//! Literals (integers, floats, single-quoted strings, `TRUE`, `FALSE`,
//! `NULL`), column references, comparison, arithmetic, `AND`/`OR`/`NOT`,
//! `[NOT] IN (...)` and `IS [NOT] NULL`. Keywords are case-insensitive.
//!
//! Evaluation uses three-valued logic: a comparison involving `NULL` yields
//! `NULL`, and a filter keeps only rows whose predicate is exactly `TRUE`.

mod parser;

pub use parser::parse;

use quiver_core::{
    DataType, Field, Projection, QuiverError, QuiverResult, RecordTable, Schema, Value,
};
use std::cmp::Ordering;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `=` / `==`
    Eq,
    /// `!=` / `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (always floating point)
    Div,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant
    Literal(Value),
    /// Column reference
    Column(String),
    /// Arithmetic negation
    Neg(Box<Expr>),
    /// Arithmetic
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Comparison
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    /// Logical and
    And(Box<Expr>, Box<Expr>),
    /// Logical or
    Or(Box<Expr>, Box<Expr>),
    /// Logical not
    Not(Box<Expr>),
    /// `expr IS [NOT] NULL`
    IsNull {
        /// Tested expression
        expr: Box<Expr>,
        /// `IS NOT NULL`
        negated: bool,
    },
    /// `expr [NOT] IN (list)`
    InList {
        /// Tested expression
        expr: Box<Expr>,
        /// Candidates
        list: Vec<Expr>,
        /// `NOT IN`
        negated: bool,
    },
}

impl Expr {
    /// Every column this expression reads, in first-seen order
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Neg(e) | Expr::Not(e) | Expr::IsNull { expr: e, .. } => e.collect_columns(out),
            Expr::Binary(_, l, r) | Expr::Compare(_, l, r) | Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_columns(out);
                for e in list {
                    e.collect_columns(out);
                }
            }
        }
    }

    /// Fail with `ColumnNotFound` if the expression reads a missing column
    pub fn check_columns(&self, schema: &Schema) -> QuiverResult<()> {
        match self.columns().into_iter().find(|c| !schema.contains(c)) {
            Some(missing) => Err(QuiverError::column_not_found(missing)),
            None => Ok(()),
        }
    }

    /// Evaluate against one row of `table`
    pub fn eval(&self, table: &RecordTable, row: usize) -> Result<Value, String> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column(name) => table
                .value(row, name)
                .cloned()
                .ok_or_else(|| format!("column '{}' not found", name)),
            Expr::Neg(e) => match e.eval(table, row)? {
                Value::Null => Ok(Value::Null),
                Value::Int(i) => i
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| "integer overflow".to_string()),
                Value::UInt(u) => Ok(Value::Int(-(u as i64))),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(format!("cannot negate a {} value", other.type_name())),
            },
            Expr::Binary(op, l, r) => arithmetic(*op, l.eval(table, row)?, r.eval(table, row)?),
            Expr::Compare(op, l, r) => compare(*op, &l.eval(table, row)?, &r.eval(table, row)?),
            Expr::And(l, r) => {
                let a = truth(&l.eval(table, row)?)?;
                if a == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let b = truth(&r.eval(table, row)?)?;
                Ok(match (a, b) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            Expr::Or(l, r) => {
                let a = truth(&l.eval(table, row)?)?;
                if a == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let b = truth(&r.eval(table, row)?)?;
                Ok(match (a, b) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            Expr::Not(e) => Ok(match truth(&e.eval(table, row)?)? {
                Some(b) => Value::Bool(!b),
                None => Value::Null,
            }),
            Expr::IsNull { expr, negated } => {
                let is_null = expr.eval(table, row)?.is_null();
                Ok(Value::Bool(is_null != *negated))
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let needle = expr.eval(table, row)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for candidate in list {
                    let candidate = candidate.eval(table, row)?;
                    match compare(CmpOp::Eq, &needle, &candidate)? {
                        Value::Bool(true) => return Ok(Value::Bool(!negated)),
                        Value::Null => saw_null = true,
                        _ => {}
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Bool(*negated)
                })
            }
        }
    }
}

fn truth(v: &Value) -> Result<Option<bool>, String> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(format!("expected a boolean, found {}", other.type_name())),
    }
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<Value, String> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    let ord = l
        .sql_cmp(r)
        .ok_or_else(|| format!("cannot compare {} with {}", l.type_name(), r.type_name()))?;
    let result = match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::NotEq => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::LtEq => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::GtEq => ord != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: BinaryOp, l: Value, r: Value) -> Result<Value, String> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    if let (Value::Int(a), Value::Int(b)) = (&l, &r) {
        let checked = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            BinaryOp::Mul => a.checked_mul(*b),
            BinaryOp::Div => None,
        };
        if op != BinaryOp::Div {
            return checked
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string());
        }
    }
    let (a, b) = match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(format!(
                "arithmetic on {} and {}",
                l.type_name(),
                r.type_name()
            ))
        }
    };
    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
    }))
}

/// Positions of the rows of `table` matching `predicate`, in table order
pub fn matching_rows(table: &RecordTable, predicate: &str) -> QuiverResult<Vec<usize>> {
    let expr = parse(predicate)?;
    expr.check_columns(table.schema())?;

    let mut keep = Vec::new();
    for row in 0..table.num_rows() {
        let v = expr
            .eval(table, row)
            .map_err(|reason| QuiverError::invalid_filter(predicate, reason))?;
        match v {
            Value::Bool(true) => keep.push(row),
            Value::Bool(false) | Value::Null => {}
            other => {
                return Err(QuiverError::invalid_filter(
                    predicate,
                    format!("predicate produced a {} value", other.type_name()),
                ))
            }
        }
    }
    Ok(keep)
}

/// Apply a projection to `table`
///
/// Column projections select and reorder. Expression projections compute
/// each output column; a bare column reference keeps the source field type,
/// other expressions take the type of their first non-null result.
pub fn project(table: &RecordTable, projection: &Projection) -> QuiverResult<RecordTable> {
    match projection {
        Projection::Columns(names) => table.select(names),
        Projection::Expressions(pairs) => {
            let mut fields = Vec::with_capacity(pairs.len());
            let mut columns = Vec::with_capacity(pairs.len());
            for (name, src) in pairs {
                let expr = parse(src)?;
                expr.check_columns(table.schema())?;

                if let Expr::Column(source) = &expr {
                    if let Some(field) = table.schema().field(source) {
                        fields.push(Field::new(name.clone(), field.data_type, field.nullable));
                        columns.push(table.require_column(source)?.to_vec());
                        continue;
                    }
                }

                let values = (0..table.num_rows())
                    .map(|row| expr.eval(table, row))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|reason| QuiverError::invalid_filter(src.as_str(), reason))?;
                let data_type = values
                    .iter()
                    .find(|v| !v.is_null())
                    .map(data_type_of)
                    .unwrap_or(DataType::Utf8);
                fields.push(Field::new(name.clone(), data_type, true));
                columns.push(values);
            }
            RecordTable::new(Schema::new(fields)?, columns)
        }
    }
}

fn data_type_of(v: &Value) -> DataType {
    match v {
        Value::Bool(_) => DataType::Bool,
        Value::Int(_) => DataType::Int64,
        Value::UInt(_) => DataType::UInt64,
        Value::Float(_) => DataType::Float64,
        Value::Vector(v) => DataType::Vector(v.len()),
        Value::String(_) | Value::Null => DataType::Utf8,
    }
}
