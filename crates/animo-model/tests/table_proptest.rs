//! Property tests for table indexing and level-result lookups.

use std::collections::BTreeMap;

use animo_model::{LevelResult, Series, Table, TimeKey, INFINITE_TIME};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence, RngAlgorithm};

fn model_proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        source_file: Some(file!()),
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource(
            "proptest-regressions",
        ))),
        rng_algorithm: RngAlgorithm::ChaCha,
        ..ProptestConfig::default()
    }
}

/// Every index of a table with shape `dims`, in row-major order.
fn all_indices(dims: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &d in dims {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..d).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    out
}

proptest! {
    #![proptest_config(model_proptest_config())]

    #[test]
    fn setting_every_cell_fills_row_major_order(dims in prop::collection::vec(1usize..5, 1..4)) {
        let mut table = Table::new(dims.clone());
        for (n, index) in all_indices(&dims).iter().enumerate() {
            table.set(index, n as i32).unwrap();
        }
        let expected: Vec<i32> = (0..table.len() as i32).collect();
        prop_assert_eq!(table.values(), expected.as_slice());
        prop_assert_eq!(table.finite_count(), table.len());

        let mut outside = vec![0; dims.len()];
        let last = outside.len() - 1;
        outside[last] = dims[last];
        prop_assert!(table.get(&outside).is_none());
        prop_assert!(table.set(&outside, 1).is_err());
    }

    #[test]
    fn finite_count_skips_the_sentinel(
        values in prop::collection::vec(prop_oneof![Just(INFINITE_TIME), 1i32..1000], 1..40),
    ) {
        let n = values.len();
        let expected = values.iter().filter(|&&v| v != INFINITE_TIME).count();
        let table = Table::from_values(vec![n], values).unwrap();
        prop_assert_eq!(table.finite_count(), expected);
    }

    #[test]
    fn concentration_is_the_last_value_at_or_before_t(
        points in prop::collection::btree_map(0u32..500, -100i32..100, 1..20),
        at in 0u32..600,
    ) {
        let series: Series = points
            .iter()
            .map(|(&t, &v)| (TimeKey(f64::from(t)), f64::from(v)))
            .collect();
        let mut map = BTreeMap::new();
        map.insert("R0".to_string(), series);
        let result = LevelResult::new(map);

        let expected = points.range(..=at).next_back().map(|(_, &v)| f64::from(v));
        prop_assert_eq!(result.concentration("R0", f64::from(at)), expected);
        prop_assert_eq!(result.concentration("R9", f64::from(at)), None);
    }
}
