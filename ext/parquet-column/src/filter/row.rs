use std::cmp::Ordering;

use super::{ComparisonOp, FilterPredicate, RowAccessor};
use crate::ParquetValue;

static NULL: ParquetValue = ParquetValue::Null;

pub(super) fn matches<R: RowAccessor + ?Sized>(predicate: &FilterPredicate, row: &R) -> bool {
    match predicate {
        FilterPredicate::Comparison { column, op, value } => {
            let actual = row.value(column).unwrap_or(&NULL);
            compare(actual, *op, value)
        }
        FilterPredicate::And(a, b) => matches(a, row) && matches(b, row),
        FilterPredicate::Or(a, b) => matches(a, row) || matches(b, row),
        FilterPredicate::Not(p) => !matches(p, row),
        FilterPredicate::UserDefined { column, predicate } => {
            predicate.keep(row.value(column).unwrap_or(&NULL))
        }
    }
}

/// Nulls only satisfy `eq(null)` and `notEq(v)` for non-null `v`. Values
/// that do not compare (NaN, mismatched types) satisfy only `notEq`.
fn compare(actual: &ParquetValue, op: ComparisonOp, literal: &ParquetValue) -> bool {
    match op {
        ComparisonOp::Eq => equals(actual, literal),
        ComparisonOp::NotEq => !equals(actual, literal),
        _ => {
            let ordering = match actual.compare(literal) {
                Some(ordering) => ordering,
                None => return false,
            };
            match op {
                ComparisonOp::Lt => ordering == Ordering::Less,
                ComparisonOp::LtEq => ordering != Ordering::Greater,
                ComparisonOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
    }
}

fn equals(actual: &ParquetValue, literal: &ParquetValue) -> bool {
    match (actual.is_null(), literal.is_null()) {
        (true, true) => true,
        (true, false) | (false, true) => false,
        (false, false) => actual.compare(literal) == Some(Ordering::Equal),
    }
}
