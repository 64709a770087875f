//! Install directory discovery against a real file tree

use perf_driver::prelude::*;
use perf_test_utils::{test_config, write_install_tree, FIXTURE_TESTS};
use pretty_assertions::assert_eq;

#[test]
fn discovers_all_three_variant_sets() {
    let dir = tempfile::tempdir().unwrap();
    write_install_tree(dir.path()).unwrap();

    let sets = discover(dir.path()).unwrap();

    assert_eq!(sets.baseline.len(), FIXTURE_TESTS.len());
    assert!(sets.baseline.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(sets.thread_library.as_ref().map(Vec::len), Some(FIXTURE_TESTS.len()));
    assert_eq!(sets.stack_overflow_handling.as_ref().map(Vec::len), Some(FIXTURE_TESTS.len()));

    let catalog = Catalog::from_sets(sets, &test_config()).unwrap();
    assert_eq!(catalog.len(), 3 * FIXTURE_TESTS.len());
    let stack = catalog.resolve(TestId(31), Variant::StackOverflowHandling).unwrap();
    assert_eq!(stack.path, dir.path().join("stack").join("s31-yield-many"));
}

#[test]
fn missing_thread_library_build_names_the_make_target() {
    let dir = tempfile::tempdir().unwrap();
    write_install_tree(dir.path()).unwrap();
    std::fs::remove_dir_all(dir.path().join("pthreads")).unwrap();

    let sets = discover(dir.path()).unwrap();
    assert!(sets.thread_library.is_none());

    let err = Catalog::from_sets(sets, &test_config()).unwrap_err();
    assert!(matches!(err, CatalogError::MissingVariantSet(Variant::ThreadLibrary)));
    assert!(err.to_string().contains("make pthreads"));
    assert!(err.is_configuration_fault());
}

#[test]
fn unreadable_root_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = discover(&dir.path().join("missing")).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("perf.toml");
    std::fs::write(
        &path,
        "time_budget_secs = 0.25\nexcluded_tests = [21]\ncrash_policy = \"fail\"\n",
    )
    .unwrap();

    let config = DriverConfig::load(&path).unwrap();

    assert_eq!(config.time_budget_secs, 0.25);
    assert!(config.excluded_tests.contains(&TestId(21)));
    assert_eq!(config.crash_policy, CrashPolicy::Fail);
    assert_eq!(config.thread_grid, DriverConfig::default().thread_grid);
}

#[cfg(unix)]
#[test]
fn symlinked_executables_are_discovered() {
    let dir = tempfile::tempdir().unwrap();
    write_install_tree(dir.path()).unwrap();
    let build = dir.path().join("build");
    std::fs::create_dir(&build).unwrap();
    std::fs::write(build.join("s21-create-many"), b"").unwrap();
    let link = dir.path().join("stack").join("s21-create-many");
    std::fs::remove_file(&link).unwrap();
    std::os::unix::fs::symlink(build.join("s21-create-many"), &link).unwrap();

    let sets = discover(dir.path()).unwrap();

    assert_eq!(sets.stack_overflow_handling.as_ref().map(Vec::len), Some(FIXTURE_TESTS.len()));
    let catalog = Catalog::from_sets(sets, &test_config()).unwrap();
    let stack = catalog.resolve(TestId(21), Variant::StackOverflowHandling).unwrap();
    assert_eq!(stack.path, link);
}
