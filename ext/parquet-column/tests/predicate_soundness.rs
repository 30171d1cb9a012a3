use ordered_float::OrderedFloat;
use parquet_column::filter::{
    and, eq, gt, gt_eq, lt, lt_eq, not, not_eq, or, user_defined, UserDefinedPredicate,
};
use parquet_column::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

mod test_helpers;
use test_helpers::*;

const VERDICTS: [Verdict; 3] = [Verdict::Keep, Verdict::Drop, Verdict::Undecided];

/// Possible truth values of a row under a verdict
fn outcomes(verdict: Verdict) -> Vec<bool> {
    match verdict {
        Verdict::Keep => vec![true],
        Verdict::Drop => vec![false],
        Verdict::Undecided => vec![true, false],
    }
}

fn from_outcomes(values: &[bool]) -> Verdict {
    if values.iter().all(|&v| v) {
        Verdict::Keep
    } else if values.iter().all(|&v| !v) {
        Verdict::Drop
    } else {
        Verdict::Undecided
    }
}

fn reference_and(a: Verdict, b: Verdict) -> Verdict {
    let mut values = Vec::new();
    for x in outcomes(a) {
        for y in outcomes(b) {
            values.push(x && y);
        }
    }
    from_outcomes(&values)
}

fn reference_or(a: Verdict, b: Verdict) -> Verdict {
    let mut values = Vec::new();
    for x in outcomes(a) {
        for y in outcomes(b) {
            values.push(x || y);
        }
    }
    from_outcomes(&values)
}

fn reference_not(a: Verdict) -> Verdict {
    let values: Vec<bool> = outcomes(a).into_iter().map(|x| !x).collect();
    from_outcomes(&values)
}

/// Leaf whose statistics verdict is fixed
#[derive(Debug)]
struct FixedVerdict(Verdict);

impl UserDefinedPredicate for FixedVerdict {
    fn keep(&self, _value: &ParquetValue) -> bool {
        self.0 != Verdict::Drop
    }

    fn can_drop(&self, _statistics: &ColumnStatistics) -> bool {
        self.0 == Verdict::Drop
    }

    fn inverse_can_drop(&self, _statistics: &ColumnStatistics) -> bool {
        self.0 == Verdict::Keep
    }
}

fn fixed(column: &str, verdict: Verdict) -> FilterPredicate {
    user_defined(column, FixedVerdict(verdict))
}

#[test]
fn test_verdict_combinators_match_reference() {
    for a in VERDICTS {
        assert_eq!(a.not(), reference_not(a), "not {:?}", a);
        for b in VERDICTS {
            assert_eq!(a.and(b), reference_and(a, b), "{:?} and {:?}", a, b);
            assert_eq!(a.or(b), reference_or(a, b), "{:?} or {:?}", a, b);
        }
    }
}

#[test]
fn test_predicate_trees_match_reference_exhaustively() {
    let mut provider: HashMap<String, ColumnStatistics> = HashMap::new();
    for column in ["a", "b", "c"] {
        provider.insert(column.to_string(), ColumnStatistics::unknown());
    }

    for va in VERDICTS {
        for vb in VERDICTS {
            for vc in VERDICTS {
                let (a, b, c) = (fixed("a", va), fixed("b", vb), fixed("c", vc));
                let cases = vec![
                    (
                        and(a.clone(), or(b.clone(), c.clone())),
                        reference_and(va, reference_or(vb, vc)),
                    ),
                    (
                        or(a.clone(), and(b.clone(), c.clone())),
                        reference_or(va, reference_and(vb, vc)),
                    ),
                    (
                        not(and(a.clone(), or(b.clone(), not(c.clone())))),
                        reference_not(reference_and(va, reference_or(vb, reference_not(vc)))),
                    ),
                    (
                        or(not(a.clone()), and(not(b.clone()), c.clone())),
                        reference_or(reference_not(va), reference_and(reference_not(vb), vc)),
                    ),
                ];
                for (predicate, expected) in cases {
                    assert_eq!(
                        predicate.evaluate_statistics(&provider),
                        expected,
                        "{} with {:?}",
                        predicate,
                        (va, vb, vc)
                    );
                    assert_eq!(
                        predicate.clone().push_down_not().evaluate_statistics(&provider),
                        expected,
                        "{} rewritten",
                        predicate
                    );
                }
            }
        }
    }
}

#[derive(Debug)]
struct InRange(i64, i64);

impl UserDefinedPredicate for InRange {
    fn keep(&self, value: &ParquetValue) -> bool {
        matches!(value, ParquetValue::Int64(v) if *v >= self.0 && *v <= self.1)
    }

    fn can_drop(&self, statistics: &ColumnStatistics) -> bool {
        if statistics.is_all_null() == Some(true) {
            return true;
        }
        match (&statistics.min, &statistics.max) {
            (Some(ParquetValue::Int64(min)), Some(ParquetValue::Int64(max))) => {
                *max < self.0 || *min > self.1
            }
            _ => false,
        }
    }

    fn inverse_can_drop(&self, statistics: &ColumnStatistics) -> bool {
        if statistics.null_count != Some(0) {
            return false;
        }
        match (&statistics.min, &statistics.max) {
            (Some(ParquetValue::Int64(min)), Some(ParquetValue::Int64(max))) => {
                *min >= self.0 && *max <= self.1
            }
            _ => false,
        }
    }
}

fn random_literal(rng: &mut StdRng) -> ParquetValue {
    if rng.random_bool(0.1) {
        ParquetValue::Null
    } else {
        ParquetValue::Int64(rng.random_range(-12..=12))
    }
}

fn random_comparison(rng: &mut StdRng, literal: ParquetValue) -> FilterPredicate {
    match rng.random_range(0..6) {
        0 => eq("x", literal),
        1 => not_eq("x", literal),
        2 => lt("x", literal),
        3 => lt_eq("x", literal),
        4 => gt("x", literal),
        _ => gt_eq("x", literal),
    }
}

fn random_predicate(rng: &mut StdRng, depth: usize) -> FilterPredicate {
    if depth == 0 || rng.random_bool(0.35) {
        if rng.random_bool(0.1) {
            let lo = rng.random_range(-12..=12);
            return user_defined("x", InRange(lo, lo + rng.random_range(0..6)));
        }
        let literal = random_literal(rng);
        return random_comparison(rng, literal);
    }
    match rng.random_range(0..3) {
        0 => and(random_predicate(rng, depth - 1), random_predicate(rng, depth - 1)),
        1 => or(random_predicate(rng, depth - 1), random_predicate(rng, depth - 1)),
        _ => not(random_predicate(rng, depth - 1)),
    }
}

fn random_page(rng: &mut StdRng) -> Vec<ParquetValue> {
    let len = rng.random_range(1..=20);
    let null_rate = [0.0, 0.2, 1.0][rng.random_range(0..3)];
    let lo = rng.random_range(-10..=10);
    let spread = rng.random_range(0..=8);
    (0..len)
        .map(|_| {
            if rng.random_bool(null_rate) {
                ParquetValue::Null
            } else {
                ParquetValue::Int64(rng.random_range(lo..=lo + spread))
            }
        })
        .collect()
}

fn page_statistics(rng: &mut StdRng, values: &[ParquetValue]) -> ColumnStatistics {
    let mut builder = StatisticsBuilder::new();
    for value in values {
        builder.update(value);
    }
    let full = builder.build();
    match rng.random_range(0..6) {
        0 => ColumnStatistics::unknown(),
        1 => ColumnStatistics::new(full.min, full.max, None, full.value_count),
        2 => ColumnStatistics::new(None, None, full.null_count, full.value_count),
        _ => full,
    }
}

/// A Drop verdict means no row matches, a Keep verdict means every row does
fn assert_sound(predicate: &FilterPredicate, stats: &ColumnStatistics, values: &[ParquetValue]) {
    let mut provider: HashMap<String, ColumnStatistics> = HashMap::new();
    provider.insert("x".to_string(), stats.clone());
    let verdict = predicate.evaluate_statistics(&provider);
    let matching = values
        .iter()
        .filter(|v| predicate.matches(&[("x", (*v).clone())][..]))
        .count();
    match verdict {
        Verdict::Drop => assert_eq!(
            matching, 0,
            "{} dropped a page with matching rows {:?} ({:?})",
            predicate, values, stats
        ),
        Verdict::Keep => assert_eq!(
            matching,
            values.len(),
            "{} kept a page with failing rows {:?} ({:?})",
            predicate,
            values,
            stats
        ),
        Verdict::Undecided => {}
    }
}

#[test]
fn test_random_integer_pages_are_sound() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..5_000 {
        let values = random_page(&mut rng);
        let stats = page_statistics(&mut rng, &values);
        let predicate = random_predicate(&mut rng, 3);
        assert_sound(&predicate, &stats, &values);
    }
}

#[test]
fn test_rewritten_predicates_are_equivalent_and_sound() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..3_000 {
        let values = random_page(&mut rng);
        let stats = page_statistics(&mut rng, &values);
        let predicate = random_predicate(&mut rng, 3);
        let rewritten = predicate.clone().push_down_not();

        for value in &values {
            let row = [("x", value.clone())];
            assert_eq!(
                predicate.matches(&row[..]),
                rewritten.matches(&row[..]),
                "{} vs {} on {:?}",
                predicate,
                rewritten,
                value
            );
        }
        assert_sound(&rewritten, &stats, &values);
    }
}

#[test]
fn test_random_double_pages_with_nan_are_sound() {
    let mut rng = StdRng::seed_from_u64(7);
    let pool = [-1.5, 0.0, 2.5, f64::NAN];
    let literals = [-2.0, -1.5, 0.0, 1.0, 2.5, 3.0];
    for _ in 0..3_000 {
        let len = rng.random_range(1..=10);
        let values: Vec<ParquetValue> = (0..len)
            .map(|_| {
                if rng.random_bool(0.15) {
                    ParquetValue::Null
                } else {
                    ParquetValue::Float64(OrderedFloat(pool[rng.random_range(0..pool.len())]))
                }
            })
            .collect();
        let stats = page_statistics(&mut rng, &values);

        let literal = if rng.random_bool(0.1) {
            ParquetValue::Null
        } else {
            ParquetValue::Float64(OrderedFloat(literals[rng.random_range(0..literals.len())]))
        };
        let leaf = random_comparison(&mut rng, literal);
        let predicate = if rng.random_bool(0.5) { not(leaf) } else { leaf };

        assert_sound(&predicate, &stats, &values);
        assert_sound(&predicate.clone().push_down_not(), &stats, &values);
    }
}

#[test]
fn test_page_filter_never_loses_matching_rows() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let values: Vec<ParquetValue> = (0..rng.random_range(1..200))
            .map(|i| {
                if rng.random_bool(0.1) {
                    ParquetValue::Null
                } else {
                    ParquetValue::Int64(i / 4 + rng.random_range(-3..=3))
                }
            })
            .collect();
        let predicate = random_predicate(&mut rng, 2);
        let descr = ColumnDescriptor::optional("x", PhysicalType::Int64).unwrap();
        let chunk = write_chunk(descr, fixed_props(Encoding::Plain, 16), &values).unwrap();

        let expected: Vec<ParquetValue> = values
            .iter()
            .filter(|v| predicate.matches(&[("x", (*v).clone())][..]))
            .cloned()
            .collect();
        let reader = ColumnChunkReader::new(chunk).unwrap().with_page_filter(predicate.clone());
        let mut surviving = Vec::new();
        for value in reader {
            let value = value.unwrap();
            if predicate.matches(&[("x", value.clone())][..]) {
                surviving.push(value);
            }
        }
        assert_eq!(surviving, expected, "{}", predicate);
    }
}
