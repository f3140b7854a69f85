//! Property tests for filter algebra.
//!
//! Checks negation, simplification, content keys and spec serialization
//! against direct evaluation on generated rows.

use std::sync::Arc;

use proptest::prelude::*;
use viz_data::{Column, ColumnType, DataTable, Record, Value};
use viz_filter::{Filter, FilterKind, LikeOptions};

// ============================================================================
// Generators
// ============================================================================

fn arb_property() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["a", "b", "c"])
}

fn arb_value() -> impl Strategy<Value = Value> {
    (-3i32..=3).prop_map(Value::from)
}

fn arb_comparison_kind() -> impl Strategy<Value = FilterKind> {
    prop::sample::select(vec![
        FilterKind::IsEqual,
        FilterKind::IsGreater,
        FilterKind::IsGreaterOrEqual,
        FilterKind::IsLess,
        FilterKind::IsLessOrEqual,
    ])
}

fn arb_like_options() -> impl Strategy<Value = LikeOptions> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(anchor_start, anchor_end, case_insensitive)| LikeOptions {
        anchor_start,
        anchor_end,
        case_insensitive,
    })
}

/// Property filters with non-null numeric references
fn arb_leaf() -> impl Strategy<Value = Filter> {
    prop_oneof![
        Just(Filter::True),
        Just(Filter::False),
        (arb_comparison_kind(), arb_property(), arb_value())
            .prop_map(|(kind, property, value)| Filter::comparison(kind, property, value).unwrap()),
        (arb_property(), prop::collection::vec(arb_value(), 0..3))
            .prop_map(|(property, values)| Filter::is_in(property, values).unwrap()),
        (arb_property(), prop::sample::select(vec!["", "1", "-", "2"]), arb_like_options())
            .prop_map(|(property, text, options)| Filter::is_like(property, text, options).unwrap()),
    ]
}

fn arb_filter() -> impl Strategy<Value = Filter> {
    arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Filter::and_all),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Filter::or_all),
            inner.clone().prop_map(Filter::not),
            inner.prop_map(|f| Filter::Not(Arc::new(f))),
        ]
    })
}

/// Rows where every property holds a number
fn arb_complete_row() -> impl Strategy<Value = Record> {
    (-3i32..=3, -3i32..=3, -3i32..=3).prop_map(|(a, b, c)| Record::new().with("a", a).with("b", b).with("c", c))
}

/// Rows where properties may be absent or null
fn arb_sparse_row() -> impl Strategy<Value = Record> {
    prop::collection::vec(prop::option::of(prop::option::of(-3i32..=3)), 3).prop_map(|cells| {
        let mut record = Record::new();
        for (name, cell) in ["a", "b", "c"].into_iter().zip(cells) {
            if let Some(value) = cell {
                record = record.with(name, value);
            }
        }
        record
    })
}

fn table_of(rows: &[(i32, i32, i32)]) -> DataTable {
    let mut table = DataTable::new(vec![
        Column::new("a", ColumnType::Number),
        Column::new("b", ColumnType::Number),
        Column::new("c", ColumnType::Number),
    ])
    .unwrap();
    for &(a, b, c) in rows {
        table.add_values(vec![Value::from(a), Value::from(b), Value::from(c)]).unwrap();
    }
    table
}

/// `filter` rebuilt through [`Filter::not`], as the spec parser builds it
fn collapse_negations(filter: &Filter) -> Filter {
    match filter {
        Filter::And(operands) => Filter::and_all(operands.iter().map(collapse_negations)),
        Filter::Or(operands) => Filter::or_all(operands.iter().map(collapse_negations)),
        Filter::Not(inner) => Filter::not(collapse_negations(inner)),
        leaf => leaf.clone(),
    }
}

// ============================================================================
// Laws
// ============================================================================

proptest! {
    #[test]
    fn double_negation_preserves_results(filter in arb_filter(), row in arb_complete_row()) {
        let twice = filter.negate().negate();
        prop_assert_eq!(twice.contains(&row), filter.contains(&row));
    }

    #[test]
    fn negation_complements_on_complete_rows(filter in arb_filter(), row in arb_complete_row()) {
        prop_assert_eq!(filter.negate().contains(&row), !filter.contains(&row));
    }

    #[test]
    fn simplify_preserves_results(filter in arb_filter(), row in arb_sparse_row()) {
        prop_assert_eq!(filter.simplify().contains(&row), filter.contains(&row));
    }

    #[test]
    fn simplify_is_idempotent(filter in arb_filter()) {
        let once = filter.simplify();
        prop_assert_eq!(once.simplify(), once);
    }

    #[test]
    fn content_key_is_a_function_of_structure(left in arb_filter(), right in arb_filter()) {
        prop_assert_eq!(left == right, left.content_key() == right.content_key());
        prop_assert_eq!(left.clone().content_key(), left.content_key());
    }

    #[test]
    fn spec_round_trip(filter in arb_filter()) {
        // Parsing collapses directly nested negations, which leaves results unchanged
        let parsed = Filter::from_spec(&filter.to_spec()).unwrap();
        prop_assert_eq!(&parsed, &collapse_negations(&filter));
        prop_assert_eq!(Filter::from_spec(&filter.to_alias_spec()).unwrap(), parsed.clone());
        prop_assert_eq!(Filter::from_spec(&parsed.to_spec()).unwrap(), parsed);
    }

    #[test]
    fn table_filtering_matches_contains(
        filter in arb_filter(),
        rows in prop::collection::vec((-3i32..=3, -3i32..=3, -3i32..=3), 0..8),
    ) {
        let table = table_of(&rows);
        let expected: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, (a, b, c))| filter.contains(&Record::new().with("a", *a).with("b", *b).with("c", *c)))
            .map(|(idx, _)| idx)
            .collect();

        prop_assert_eq!(filter.row_indices(&table), expected.clone());
        let mut iter = filter.filter(&table);
        let first_pass: Vec<usize> = iter.by_ref().map(|row| row.index()).collect();
        let second_pass: Vec<usize> = iter.restart().map(|row| row.index()).collect();
        prop_assert_eq!(first_pass, expected.clone());
        prop_assert_eq!(second_pass, expected);
    }
}
