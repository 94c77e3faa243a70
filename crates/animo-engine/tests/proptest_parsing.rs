//! Property-based tests for the matrix serializer and the trace parser.

mod common;

use animo_engine::compiler::matrix::nested_string;
use animo_engine::error::{AnalysisError, ParseError, REMAINDER_LIMIT};
use animo_engine::parse_trace;
use animo_model::{Model, ModelSettings, Reactant};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence, RngAlgorithm};

use common::trace_text;

fn engine_proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 96,
        source_file: Some(file!()),
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource(
            "proptest-regressions",
        ))),
        rng_algorithm: RngAlgorithm::ChaCha,
        ..ProptestConfig::default()
    }
}

fn dims_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..4)
}

fn model() -> Model {
    let mut m = Model::new(ModelSettings::default());
    let mut a = Reactant::new("R0", "a", 15).with_initial(3, 15);
    a.step_size = 0.5;
    m.add_reactant(a).unwrap();
    m.add_reactant(Reactant::new("R1", "b", 15).with_initial(0, 15)).unwrap();
    m
}

proptest! {
    #![proptest_config(engine_proptest_config())]

    #[test]
    fn nested_braces_balance_and_every_element_appears(dims in dims_strategy()) {
        let count: usize = dims.iter().product();
        let values: Vec<i32> = (0..count as i32).collect();
        let text = nested_string(&values, &dims, &|v| format!("<{v}>"));

        let mut depth = 0i64;
        let mut max_depth = 0i64;
        for c in text.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            prop_assert!(depth >= 0);
            max_depth = max_depth.max(depth);
        }
        prop_assert_eq!(depth, 0);
        prop_assert_eq!(max_depth as usize, dims.len());
        prop_assert_eq!(text.matches('<').count(), count);
        for v in &values {
            let needle = format!("<{v}>");
            prop_assert!(text.contains(&needle));
        }
    }

    #[test]
    fn trace_series_are_monotone_and_end_at_the_requested_time(
        steps in prop::collection::vec((1u32..50, 0u32..16, 0u32..16), 1..20),
        tail in 0u32..100,
    ) {
        let mut blocks = vec![(0.0, "R0=3 R1=0".to_string())];
        let mut t = 0.0;
        for (dt, a, b) in &steps {
            t += f64::from(*dt);
            blocks.push((t, format!("R0={a} R1={b}")));
        }
        let time_to = t as i64 + i64::from(tail);
        let borrowed: Vec<(f64, &str)> = blocks.iter().map(|(t, v)| (*t, v.as_str())).collect();
        let text = trace_text(&borrowed);

        let result = parse_trace(&model(), text.as_bytes(), time_to).unwrap();

        let (_, last_a, last_b) = steps[steps.len() - 1];
        for (id, last) in [("R0", f64::from(last_a) * 0.5), ("R1", f64::from(last_b))] {
            let series = result.series(id).unwrap();
            let keys: Vec<f64> = series.keys().map(|k| k.0).collect();
            prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(keys.first().copied(), Some(0.0));
            prop_assert_eq!(keys.last().copied(), Some(time_to as f64));
            prop_assert_eq!(result.concentration(id, time_to as f64), Some(last));
        }
    }

    #[test]
    fn broken_state_reports_the_unread_tail_within_the_limit(
        junk in prop::collection::vec("[a-z ]{1,60}", 0..400),
    ) {
        let mut text = trace_text(&[(0.0, "R0=3 R1=0")]);
        text.push_str("State:\n( P0.reacting )\nR0=4\n");
        for line in &junk {
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("end of output\n");

        let err = parse_trace(&model(), text.as_bytes(), 10).unwrap_err();
        let AnalysisError::Parse(ParseError::Output { remainder, .. }) = err else {
            panic!("expected an output error");
        };
        prop_assert!(remainder.starts_with("R0=4\n"));
        prop_assert!(remainder.ends_with("end of output\n"));
        prop_assert!(remainder.len() < REMAINDER_LIMIT + 64);
    }
}
