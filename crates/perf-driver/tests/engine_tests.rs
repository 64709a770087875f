//! Sweep engine and adaptive extension against a scripted invoker

use perf_driver::prelude::*;
use perf_driver::registry::{DENSE_GRID_TEST, DENSE_THREAD_GRID};
use perf_test_utils::{fixture_catalog, test_config, Response, ScriptedInvoker};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};

const CREATE_MANY: TestId = TestId(21);
const YIELD_MANY: TestId = TestId(31);

fn grid_of(config: &DriverConfig) -> Vec<u64> {
    config.thread_grid.clone()
}

#[tokio::test]
async fn one_argument_sweep_follows_grid_order() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::constant(2.0);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap();

    assert_eq!(outcome.result.shape(), (1, 8));
    assert_eq!(outcome.grid, ArgumentGrid::Linear { values: grid_of(&config) });
    let issued: Vec<Vec<u64>> = grid_of(&config).into_iter().map(|v| vec![v]).collect();
    assert_eq!(invoker.arguments_for(Variant::Baseline), issued);
}

#[tokio::test]
async fn two_argument_sweep_is_row_per_thread_value() {
    let config = test_config().with_grids(vec![1, 2, 5], vec![10, 20]);
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker =
        ScriptedInvoker::by_arguments(|args| 1.0 + args[0] as f64 + args[1] as f64 / 100.0);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(YIELD_MANY, Variant::Baseline).await.unwrap();

    let SweepResult::Matrix(rows) = outcome.result else {
        panic!("expected a matrix");
    };
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.len() == 2));
    assert!((rows[2][1] - 6.2).abs() < 1e-6);
    assert_eq!(
        invoker.arguments_for(Variant::Baseline),
        vec![
            vec![1, 10],
            vec![1, 20],
            vec![2, 10],
            vec![2, 20],
            vec![5, 10],
            vec![5, 20]
        ]
    );
}

#[tokio::test]
async fn extension_stops_at_first_sample_over_budget() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::by_arguments(|args| if args[0] >= 1000 { 1.5 } else { 0.3 });
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap();

    let SweepResult::Series(latencies) = &outcome.result else {
        panic!("expected a series");
    };
    assert_eq!(latencies.len(), 9);
    assert!(latencies[8] >= 1.0);
    let mut values = grid_of(&config);
    values.push(1000);
    assert_eq!(outcome.grid, ArgumentGrid::Linear { values });
}

#[tokio::test]
async fn extension_never_passes_the_ceiling() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::constant(0.1);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap();

    let ArgumentGrid::Linear { values } = &outcome.grid else {
        panic!("expected a linear grid");
    };
    let extended = &values[8..];
    assert_eq!(extended, &[1000, 2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000, 10000]);
    assert_eq!(outcome.result.sample_count(), values.len());

    let bound = (config.hard_ceiling - 500).div_ceil(config.extension_step);
    assert!(extended.len() as u64 <= bound);
}

#[tokio::test]
async fn two_argument_extension_adds_column_then_row() {
    let config = test_config().with_grids(vec![1, 2], vec![1, 2]);
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker =
        ScriptedInvoker::by_arguments(|args| if args == [1000, 1000] { 2.0 } else { 0.1 });
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(YIELD_MANY, Variant::Baseline).await.unwrap();

    assert_eq!(
        &invoker.arguments_for(Variant::Baseline)[4..],
        &[
            vec![1, 1000],
            vec![2, 1000],
            vec![1000, 1],
            vec![1000, 2],
            vec![1000, 1000]
        ]
    );
    assert_eq!(outcome.result.shape(), (3, 3));
    assert_eq!(
        outcome.grid,
        ArgumentGrid::Rect {
            outer: vec![1, 2, 1000],
            inner: vec![1, 2, 1000]
        }
    );
}

#[tokio::test]
async fn two_argument_extension_stops_on_combined_ceiling() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::constant(0.1);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(YIELD_MANY, Variant::Baseline).await.unwrap();

    // (5000, 5000) is the last pair whose sum stays within 10000.
    assert_eq!(outcome.result.shape(), (13, 13));
    let SweepResult::Matrix(rows) = &outcome.result else {
        panic!("expected a matrix");
    };
    assert!(rows.iter().all(|row| row.len() == 13));
    let ArgumentGrid::Rect { outer, inner } = &outcome.grid else {
        panic!("expected a rectangular grid");
    };
    assert_eq!(&outer[8..], &[1000, 2000, 3000, 4000, 5000]);
    assert_eq!(outer, inner);
}

#[tokio::test]
async fn disabled_extension_keeps_the_base_grid() {
    let config = test_config().with_adaptive_extension(false);
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::constant(0.1);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap();

    assert_eq!(outcome.result.sample_count(), 8);
    assert_eq!(invoker.call_count(), 8);
}

#[tokio::test]
async fn dense_grid_test_uses_its_own_grid_without_extension() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::constant(0.1);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(DENSE_GRID_TEST, Variant::ThreadLibrary).await.unwrap();

    assert_eq!(outcome.result.sample_count(), DENSE_THREAD_GRID.len());
    assert_eq!(
        invoker.arguments_for(Variant::ThreadLibrary),
        DENSE_THREAD_GRID.iter().map(|&v| vec![v]).collect::<Vec<_>>()
    );

    let display = registry
        .invoke_override(
            DENSE_GRID_TEST,
            Variant::Baseline,
            OverrideMode::Display,
            engine.context(),
        )
        .await
        .unwrap();
    assert_eq!(
        display,
        Some(OverrideOutcome::Grid(ArgumentGrid::Linear {
            values: DENSE_THREAD_GRID.to_vec()
        }))
    );
    assert_eq!(invoker.call_count(), DENSE_THREAD_GRID.len());
}

#[tokio::test]
async fn no_argument_tests_average_their_iterations() {
    let config = test_config().with_no_arg_iterations(3);
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let count = AtomicUsize::new(0);
    let invoker = ScriptedInvoker::new(move |_, _| {
        let n = count.fetch_add(1, Ordering::SeqCst);
        Response::ok(0.1 * (n + 1) as f64)
    });
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(TestId(1), Variant::Baseline).await.unwrap();

    let SweepResult::Scalar(mean) = outcome.result else {
        panic!("expected a scalar");
    };
    assert!((mean - 0.2).abs() < 1e-6);
    assert_eq!(invoker.arguments_for(Variant::Baseline), vec![Vec::<u64>::new(); 3]);
}

#[tokio::test]
async fn generic_no_argument_sweep_runs_once() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::new();
    let invoker = ScriptedInvoker::constant(0.1);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(TestId(12), Variant::StackOverflowHandling).await.unwrap();

    assert_eq!(outcome.grid, ArgumentGrid::NoArguments);
    assert!(matches!(outcome.result, SweepResult::Scalar(_)));
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn crashes_are_recorded_by_default() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::new(|_, _| Response::exited(2.0, 1));
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let outcome = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap();

    assert_eq!(outcome.result.sample_count(), 8);
}

#[tokio::test]
async fn fail_policy_aborts_on_first_crash() {
    let config = test_config().with_crash_policy(CrashPolicy::Fail);
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::new(|_, _| Response::signalled(0.1));
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let err = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap_err();

    match err {
        SweepError::InvocationFailed {
            test_id,
            arguments,
            outcome,
            ..
        } => {
            assert_eq!(test_id, CREATE_MANY);
            assert_eq!(arguments, vec![1]);
            assert_eq!(outcome, Outcome::Signalled);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(invoker.call_count(), 1);
}

#[tokio::test]
async fn spawn_failure_aborts_the_sweep() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::new(|_, _| Response::SpawnFailure);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let err = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap_err();

    assert!(matches!(err, SweepError::Invoke(InvokeError::Spawn { .. })));
}

#[tokio::test]
async fn uncataloged_pair_is_not_found() {
    let config = test_config();
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::constant(0.1);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let err = engine.sweep(TestId(99), Variant::Baseline).await.unwrap_err();

    assert!(matches!(err, SweepError::Resolve(CatalogError::NotFound { .. })));
    assert_eq!(invoker.call_count(), 0);
}

#[tokio::test]
async fn zero_extension_step_keeps_the_base_grid() {
    let mut config = test_config();
    config.extension_step = 0;
    let catalog = fixture_catalog(&config);
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ScriptedInvoker::constant(0.1);
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);

    let linear = engine.sweep(CREATE_MANY, Variant::Baseline).await.unwrap();
    let rect = engine.sweep(YIELD_MANY, Variant::Baseline).await.unwrap();

    assert_eq!(linear.result.sample_count(), 8);
    assert_eq!(rect.result.shape(), (8, 8));
    assert_eq!(invoker.call_count(), 8 + 64);
}
