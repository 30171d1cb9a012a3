use super::{ComparisonOp, FilterPredicate};
use crate::ParquetValue;

pub(super) fn push_down_not(predicate: FilterPredicate) -> FilterPredicate {
    match predicate {
        FilterPredicate::Not(inner) => negate(*inner),
        FilterPredicate::And(a, b) => {
            FilterPredicate::And(Box::new(push_down_not(*a)), Box::new(push_down_not(*b)))
        }
        FilterPredicate::Or(a, b) => {
            FilterPredicate::Or(Box::new(push_down_not(*a)), Box::new(push_down_not(*b)))
        }
        leaf => leaf,
    }
}

fn negate(predicate: FilterPredicate) -> FilterPredicate {
    match predicate {
        FilterPredicate::Not(inner) => push_down_not(*inner),
        FilterPredicate::And(a, b) => FilterPredicate::Or(Box::new(negate(*a)), Box::new(negate(*b))),
        FilterPredicate::Or(a, b) => FilterPredicate::And(Box::new(negate(*a)), Box::new(negate(*b))),
        FilterPredicate::Comparison { column, op, value } => invert(column, op, value),
        udp @ FilterPredicate::UserDefined { .. } => FilterPredicate::Not(Box::new(udp)),
    }
}

fn invert(column: std::sync::Arc<str>, op: ComparisonOp, value: ParquetValue) -> FilterPredicate {
    let flipped = match op {
        ComparisonOp::Eq => ComparisonOp::NotEq,
        ComparisonOp::NotEq => ComparisonOp::Eq,
        ComparisonOp::Lt => ComparisonOp::GtEq,
        ComparisonOp::LtEq => ComparisonOp::Gt,
        ComparisonOp::Gt => ComparisonOp::LtEq,
        ComparisonOp::GtEq => ComparisonOp::Lt,
    };

    if !op.is_ordering() {
        return FilterPredicate::Comparison {
            column,
            op: flipped,
            value,
        };
    }

    // NaN rows and null literals fail both an ordering and its complement
    if value.is_null() || matches!(value, ParquetValue::Float32(_) | ParquetValue::Float64(_)) {
        return FilterPredicate::Not(Box::new(FilterPredicate::Comparison { column, op, value }));
    }

    // null rows fail every ordering, so the negation has to admit them
    FilterPredicate::Or(
        Box::new(FilterPredicate::Comparison {
            column: column.clone(),
            op: flipped,
            value,
        }),
        Box::new(FilterPredicate::Comparison {
            column,
            op: ComparisonOp::Eq,
            value: ParquetValue::Null,
        }),
    )
}
