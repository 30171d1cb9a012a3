//! Predicate evaluation for page and row pruning.
//!
//! A [`FilterPredicate`] is an immutable tree of column comparisons combined
//! with AND, OR and NOT, plus user-defined leaf predicates. It can be
//! evaluated two ways:
//!
//! - against a materialized row ([`FilterPredicate::matches`]), which is the
//!   ground truth;
//! - against column statistics ([`FilterPredicate::evaluate_statistics`]),
//!   which returns a three-valued [`Verdict`]. A `Drop` verdict is only
//!   returned when row evaluation would reject every row the statistics
//!   describe.

mod rewrite;
mod row;
mod stats;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::statistics::ColumnStatistics;
use crate::{ParquetError, ParquetValue, PhysicalType, Result, Schema};

/// Comparison operators of a column predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    pub fn is_ordering(&self) -> bool {
        !matches!(self, ComparisonOp::Eq | ComparisonOp::NotEq)
    }

    fn name(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::NotEq => "notEq",
            ComparisonOp::Lt => "lt",
            ComparisonOp::LtEq => "ltEq",
            ComparisonOp::Gt => "gt",
            ComparisonOp::GtEq => "gtEq",
        }
    }
}

/// Outcome of evaluating a predicate against statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Every row satisfies the predicate
    Keep,
    /// No row satisfies the predicate
    Drop,
    /// The statistics cannot decide
    Undecided,
}

impl Verdict {
    pub fn and(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Drop, _) | (_, Verdict::Drop) => Verdict::Drop,
            (Verdict::Keep, Verdict::Keep) => Verdict::Keep,
            _ => Verdict::Undecided,
        }
    }

    pub fn or(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Keep, _) | (_, Verdict::Keep) => Verdict::Keep,
            (Verdict::Drop, Verdict::Drop) => Verdict::Drop,
            _ => Verdict::Undecided,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Verdict {
        match self {
            Verdict::Keep => Verdict::Drop,
            Verdict::Drop => Verdict::Keep,
            Verdict::Undecided => Verdict::Undecided,
        }
    }

    pub fn can_drop(&self) -> bool {
        *self == Verdict::Drop
    }
}

/// A predicate over single column values supplied by the caller.
///
/// `keep` is called with [`ParquetValue::Null`] for null rows. The optional
/// statistics hooks let pages be pruned: `can_drop` returns true only when
/// no value in range can satisfy `keep`, `inverse_can_drop` only when every
/// value does.
pub trait UserDefinedPredicate: fmt::Debug + Send + Sync {
    fn keep(&self, value: &ParquetValue) -> bool;

    fn can_drop(&self, _statistics: &ColumnStatistics) -> bool {
        false
    }

    fn inverse_can_drop(&self, _statistics: &ColumnStatistics) -> bool {
        false
    }
}

/// Predicate tree evaluated against rows or statistics
#[derive(Debug, Clone)]
pub enum FilterPredicate {
    Comparison {
        column: Arc<str>,
        op: ComparisonOp,
        /// `Null` is only meaningful for `Eq` and `NotEq`
        value: ParquetValue,
    },
    And(Box<FilterPredicate>, Box<FilterPredicate>),
    Or(Box<FilterPredicate>, Box<FilterPredicate>),
    Not(Box<FilterPredicate>),
    UserDefined {
        column: Arc<str>,
        predicate: Arc<dyn UserDefinedPredicate>,
    },
}

impl PartialEq for FilterPredicate {
    fn eq(&self, other: &Self) -> bool {
        use FilterPredicate::*;
        match (self, other) {
            (
                Comparison { column, op, value },
                Comparison {
                    column: c2,
                    op: o2,
                    value: v2,
                },
            ) => column == c2 && op == o2 && value == v2,
            (And(a, b), And(c, d)) | (Or(a, b), Or(c, d)) => a == c && b == d,
            (Not(a), Not(b)) => a == b,
            (
                UserDefined { column, predicate },
                UserDefined {
                    column: c2,
                    predicate: p2,
                },
            ) => column == c2 && Arc::ptr_eq(predicate, p2),
            _ => false,
        }
    }
}

fn comparison(column: &str, op: ComparisonOp, value: ParquetValue) -> FilterPredicate {
    FilterPredicate::Comparison {
        column: Arc::from(column),
        op,
        value,
    }
}

/// Rows whose `column` equals `value`; `Null` matches null rows
pub fn eq(column: &str, value: impl Into<ParquetValue>) -> FilterPredicate {
    comparison(column, ComparisonOp::Eq, value.into())
}

/// Rows whose `column` differs from `value`, including null rows when `value`
/// is not null
pub fn not_eq(column: &str, value: impl Into<ParquetValue>) -> FilterPredicate {
    comparison(column, ComparisonOp::NotEq, value.into())
}

pub fn lt(column: &str, value: impl Into<ParquetValue>) -> FilterPredicate {
    comparison(column, ComparisonOp::Lt, value.into())
}

pub fn lt_eq(column: &str, value: impl Into<ParquetValue>) -> FilterPredicate {
    comparison(column, ComparisonOp::LtEq, value.into())
}

pub fn gt(column: &str, value: impl Into<ParquetValue>) -> FilterPredicate {
    comparison(column, ComparisonOp::Gt, value.into())
}

pub fn gt_eq(column: &str, value: impl Into<ParquetValue>) -> FilterPredicate {
    comparison(column, ComparisonOp::GtEq, value.into())
}

pub fn and(left: FilterPredicate, right: FilterPredicate) -> FilterPredicate {
    FilterPredicate::And(Box::new(left), Box::new(right))
}

pub fn or(left: FilterPredicate, right: FilterPredicate) -> FilterPredicate {
    FilterPredicate::Or(Box::new(left), Box::new(right))
}

pub fn not(predicate: FilterPredicate) -> FilterPredicate {
    FilterPredicate::Not(Box::new(predicate))
}

pub fn user_defined<P>(column: &str, predicate: P) -> FilterPredicate
where
    P: UserDefinedPredicate + 'static,
{
    FilterPredicate::UserDefined {
        column: Arc::from(column),
        predicate: Arc::new(predicate),
    }
}

/// Source of per-column statistics for statistics mode
pub trait StatisticsProvider {
    fn statistics(&self, column: &str) -> Option<&ColumnStatistics>;
}

impl StatisticsProvider for HashMap<String, ColumnStatistics> {
    fn statistics(&self, column: &str) -> Option<&ColumnStatistics> {
        self.get(column)
    }
}

impl StatisticsProvider for IndexMap<String, ColumnStatistics> {
    fn statistics(&self, column: &str) -> Option<&ColumnStatistics> {
        self.get(column)
    }
}

/// Statistics of a single column, e.g. one page of a column chunk
#[derive(Debug, Clone, Copy)]
pub struct SingleColumnStatistics<'a> {
    column: &'a str,
    statistics: Option<&'a ColumnStatistics>,
}

impl<'a> SingleColumnStatistics<'a> {
    pub fn new(column: &'a str, statistics: Option<&'a ColumnStatistics>) -> Self {
        Self { column, statistics }
    }
}

impl StatisticsProvider for SingleColumnStatistics<'_> {
    fn statistics(&self, column: &str) -> Option<&ColumnStatistics> {
        if column == self.column {
            self.statistics
        } else {
            None
        }
    }
}

/// Access to a materialized row for row mode; a missing column reads as null
pub trait RowAccessor {
    fn value(&self, column: &str) -> Option<&ParquetValue>;
}

impl RowAccessor for HashMap<String, ParquetValue> {
    fn value(&self, column: &str) -> Option<&ParquetValue> {
        self.get(column)
    }
}

impl RowAccessor for IndexMap<String, ParquetValue> {
    fn value(&self, column: &str) -> Option<&ParquetValue> {
        self.get(column)
    }
}

impl RowAccessor for [(&str, ParquetValue)] {
    fn value(&self, column: &str) -> Option<&ParquetValue> {
        self.iter().find(|(name, _)| *name == column).map(|(_, v)| v)
    }
}

impl FilterPredicate {
    /// Evaluate against a row
    pub fn matches<R: RowAccessor + ?Sized>(&self, row: &R) -> bool {
        row::matches(self, row)
    }

    /// Evaluate against statistics
    pub fn evaluate_statistics<S: StatisticsProvider + ?Sized>(&self, statistics: &S) -> Verdict {
        stats::evaluate(self, statistics)
    }

    /// Rewrite the tree so NOT only remains where it cannot be pushed into
    /// the leaves without changing which rows match
    pub fn push_down_not(self) -> FilterPredicate {
        rewrite::push_down_not(self)
    }

    /// Columns referenced by the predicate, in first-use order
    pub fn columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterPredicate::Comparison { column, .. } | FilterPredicate::UserDefined { column, .. } => {
                let name: &str = column;
                if !out.contains(&name) {
                    out.push(name);
                }
            }
            FilterPredicate::And(a, b) | FilterPredicate::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            FilterPredicate::Not(p) => p.collect_columns(out),
        }
    }

    /// Check the predicate against `schema`
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        match self {
            FilterPredicate::Comparison { column, op, value } => {
                let descr = schema.column(column).ok_or_else(|| {
                    ParquetError::configuration(format!("Column '{}' not found in schema", column))
                })?;
                let physical_type = descr.physical_type();
                if value.is_null() {
                    if op.is_ordering() {
                        return Err(ParquetError::configuration(format!(
                            "{} on column '{}' cannot compare against null",
                            op.name(),
                            column
                        )));
                    }
                    return Ok(());
                }
                if !value.matches_type(&physical_type) {
                    return Err(ParquetError::configuration(format!(
                        "Column '{}' of type {} cannot be compared with a {} literal",
                        column,
                        physical_type.type_name(),
                        value.type_name()
                    )));
                }
                if let (PhysicalType::FixedLenByteArray(len), ParquetValue::Bytes(b)) =
                    (physical_type, value)
                {
                    if b.len() != len {
                        return Err(ParquetError::configuration(format!(
                            "Column '{}' holds {}-byte values but the literal has {} bytes",
                            column,
                            len,
                            b.len()
                        )));
                    }
                }
                if op.is_ordering() && !physical_type.supports_ordering() {
                    return Err(ParquetError::configuration(format!(
                        "{} is not supported on {} column '{}'",
                        op.name(),
                        physical_type.type_name(),
                        column
                    )));
                }
                Ok(())
            }
            FilterPredicate::UserDefined { column, .. } => {
                if schema.has_column(column) {
                    Ok(())
                } else {
                    Err(ParquetError::configuration(format!(
                        "Column '{}' not found in schema",
                        column
                    )))
                }
            }
            FilterPredicate::And(a, b) | FilterPredicate::Or(a, b) => {
                a.validate(schema)?;
                b.validate(schema)
            }
            FilterPredicate::Not(p) => p.validate(schema),
        }
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterPredicate::Comparison { column, op, value } => {
                write!(f, "{}({}, ", op.name(), column)?;
                match value {
                    ParquetValue::Null => write!(f, "null)"),
                    ParquetValue::Boolean(v) => write!(f, "{})", v),
                    ParquetValue::Int32(v) => write!(f, "{})", v),
                    ParquetValue::Int64(v) => write!(f, "{})", v),
                    ParquetValue::Float32(v) => write!(f, "{})", v),
                    ParquetValue::Float64(v) => write!(f, "{})", v),
                    ParquetValue::Bytes(b) => write!(f, "{:?})", String::from_utf8_lossy(b)),
                }
            }
            FilterPredicate::And(a, b) => write!(f, "and({}, {})", a, b),
            FilterPredicate::Or(a, b) => write!(f, "or({}, {})", a, b),
            FilterPredicate::Not(p) => write!(f, "not({})", p),
            FilterPredicate::UserDefined { column, predicate } => {
                write!(f, "userDefined({}, {:?})", column, predicate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDescriptor, SchemaBuilder};

    fn schema() -> Schema {
        SchemaBuilder::new()
            .with_column(ColumnDescriptor::optional("id", PhysicalType::Int64).unwrap())
            .with_column(ColumnDescriptor::optional("flag", PhysicalType::Boolean).unwrap())
            .with_column(
                ColumnDescriptor::required("hash", PhysicalType::FixedLenByteArray(2)).unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_verdict_tables() {
        use Verdict::*;
        let all = [Keep, Drop, Undecided];
        for a in all {
            for b in all {
                let and = a.and(b);
                let or = a.or(b);
                assert_eq!(and, b.and(a));
                assert_eq!(or, b.or(a));
                assert_eq!(and == Drop, a == Drop || b == Drop);
                assert_eq!(and == Keep, a == Keep && b == Keep);
                assert_eq!(or == Keep, a == Keep || b == Keep);
                assert_eq!(or == Drop, a == Drop && b == Drop);
            }
            assert_eq!(a.not().not(), a);
        }
        assert_eq!(Undecided.not(), Undecided);
    }

    #[test]
    fn test_validate() {
        let schema = schema();
        assert!(and(gt("id", 5i64), eq("flag", true)).validate(&schema).is_ok());
        assert!(eq("id", ParquetValue::Null).validate(&schema).is_ok());

        let cases = [
            eq("missing", 1i64),
            eq("id", 1i32),
            lt("flag", true),
            lt("id", ParquetValue::Null),
            eq("hash", "abc"),
            not(or(eq("id", 1i64), gt_eq("nope", 1i64))),
        ];
        for predicate in cases {
            let err = predicate.validate(&schema).unwrap_err();
            assert!(matches!(err, ParquetError::Configuration(_)), "{}", predicate);
        }
    }

    #[test]
    fn test_display_and_columns() {
        let predicate = and(not(lt("a", 3i32)), or(eq("b", "x"), eq("a", ParquetValue::Null)));
        assert_eq!(
            predicate.to_string(),
            "and(not(lt(a, 3)), or(eq(b, \"x\"), eq(a, null)))"
        );
        assert_eq!(predicate.columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_row_accessors() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), ParquetValue::Int32(4));
        assert!(gt("a", 3i32).matches(&map));
        let row: &[(&str, ParquetValue)] = &[("a", ParquetValue::Int32(1))];
        assert!(!gt("a", 3i32).matches(row));
        // missing columns read as null
        assert!(eq("zzz", ParquetValue::Null).matches(row));
    }
}
