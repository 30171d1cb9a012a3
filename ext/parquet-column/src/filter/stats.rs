use std::cmp::Ordering;

use super::{ComparisonOp, FilterPredicate, StatisticsProvider, Verdict};
use crate::statistics::ColumnStatistics;
use crate::ParquetValue;

pub(super) fn evaluate<S: StatisticsProvider + ?Sized>(
    predicate: &FilterPredicate,
    provider: &S,
) -> Verdict {
    match predicate {
        FilterPredicate::Comparison { column, op, value } => match provider.statistics(column) {
            Some(stats) => comparison(stats, *op, value),
            None => Verdict::Undecided,
        },
        FilterPredicate::And(a, b) => {
            let left = evaluate(a, provider);
            if left == Verdict::Drop {
                return Verdict::Drop;
            }
            left.and(evaluate(b, provider))
        }
        FilterPredicate::Or(a, b) => {
            let left = evaluate(a, provider);
            if left == Verdict::Keep {
                return Verdict::Keep;
            }
            left.or(evaluate(b, provider))
        }
        FilterPredicate::Not(p) => evaluate(p, provider).not(),
        FilterPredicate::UserDefined { column, predicate } => match provider.statistics(column) {
            Some(stats) if predicate.can_drop(stats) => Verdict::Drop,
            Some(stats) if predicate.inverse_can_drop(stats) => Verdict::Keep,
            _ => Verdict::Undecided,
        },
    }
}

/// Literal position relative to the page bounds, when both are known and
/// comparable with the literal
struct Bounds {
    // literal compared to min
    vs_min: Ordering,
    // literal compared to max
    vs_max: Ordering,
}

fn bounds(stats: &ColumnStatistics, literal: &ParquetValue) -> Option<Bounds> {
    let min = stats.min.as_ref()?;
    let max = stats.max.as_ref()?;
    Some(Bounds {
        vs_min: literal.compare(min)?,
        vs_max: literal.compare(max)?,
    })
}

fn comparison(stats: &ColumnStatistics, op: ComparisonOp, literal: &ParquetValue) -> Verdict {
    let all_null = stats.is_all_null();
    let no_nulls = stats.null_count == Some(0);

    if literal.is_null() {
        return match op {
            ComparisonOp::Eq if all_null == Some(true) => Verdict::Keep,
            ComparisonOp::Eq if no_nulls => Verdict::Drop,
            ComparisonOp::NotEq if no_nulls => Verdict::Keep,
            ComparisonOp::NotEq if all_null == Some(true) => Verdict::Drop,
            ComparisonOp::Eq | ComparisonOp::NotEq => Verdict::Undecided,
            // ordering against null never matches
            _ => Verdict::Drop,
        };
    }

    if all_null == Some(true) {
        // only notEq matches nulls
        return if op == ComparisonOp::NotEq {
            Verdict::Keep
        } else {
            Verdict::Drop
        };
    }

    let Some(b) = bounds(stats, literal) else {
        return Verdict::Undecided;
    };

    let below_min = b.vs_min == Ordering::Less;
    let above_max = b.vs_max == Ordering::Greater;
    let single_value = b.vs_min == Ordering::Equal && b.vs_max == Ordering::Equal;

    let (drop, keep) = match op {
        ComparisonOp::Eq => (below_min || above_max, single_value && no_nulls),
        ComparisonOp::NotEq => (single_value && no_nulls, below_min || above_max),
        // every value >= literal
        ComparisonOp::Lt => (b.vs_min != Ordering::Greater, no_nulls && above_max),
        ComparisonOp::LtEq => (below_min, no_nulls && b.vs_max != Ordering::Less),
        ComparisonOp::Gt => (b.vs_max != Ordering::Less, no_nulls && below_min),
        ComparisonOp::GtEq => (above_max, no_nulls && b.vs_min != Ordering::Greater),
    };

    if drop {
        Verdict::Drop
    } else if keep {
        Verdict::Keep
    } else {
        Verdict::Undecided
    }
}
