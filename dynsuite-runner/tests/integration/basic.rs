// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, bail, ensure};
use dynsuite_runner::{
    config::DynsuiteConfig,
    engine::{ExecutionEngine, TestExecutionListener},
    errors::{EventOrderViolation, ExecuteError, ReplayError, TestAbortedError},
    executor::{DynamicSuiteExecutor, ExecutionContext},
    identifier::{TestIdentifier, UniqueId},
    request::{DiscoveryRequest, DiscoverySelector, SuiteRequest, TestFilter},
    result::TestExecutionResult,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_case::test_case;
use test_strategy::proptest;

#[test]
fn test_no_selectors() {
    test_init();

    let engine = ScriptedEngine::new([FixtureClass::new("com.example.FooTest").passing("a")]);
    let executor = DynamicSuiteExecutor::new(&engine);
    let err = executor
        .execute(&SuiteRequest::new("unselected").filter(TestFilter::include_tags(["x"])))
        .expect_err("suite without selectors is rejected");

    assert!(
        matches!(&err, ExecuteError::NoDiscoverySelectors { suite } if suite == "unselected"),
        "unexpected error: {err}"
    );
    assert_eq!(engine.requests(), vec![], "engine is never invoked");
}

#[proptest(cases = 64)]
fn test_passing_tests_replay(#[strategy(1usize..16)] count: usize) {
    const NAMES: [&str; 16] = [
        "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9", "t10", "t11", "t12", "t13",
        "t14", "t15",
    ];
    let class = NAMES[..count]
        .iter()
        .copied()
        .fold(FixtureClass::new("com.example.ManyTest"), |class, name| {
            class.passing(name)
        });
    let engine = ScriptedEngine::new([class]);
    let nodes = DynamicSuiteExecutor::new(&engine)
        .execute(&class_suite("many", "com.example.ManyTest"))
        .expect("suite runs");

    let tests = all_tests(nodes);
    assert_eq!(tests.len(), count);
    for (test, name) in tests.iter().zip(NAMES) {
        assert_eq!(test.display_name(), format!("ManyTest.{name}"));
        assert!(test.execute().is_ok());
    }
}

#[test]
fn test_failure_replays_original_cause() -> Result<()> {
    test_init();

    let original = cause("expected 3, found 4");
    let engine = ScriptedEngine::new([FixtureClass::new("com.example.FooTest")
        .passing("ok")
        .test("broken", FixtureStatus::Fail(original.clone()))]);
    let nodes = DynamicSuiteExecutor::new(&engine).execute(&class_suite("foo", "com.example.FooTest"))?;

    let tests = all_tests(nodes);
    assert_eq!(tests.len(), 2);
    ensure!(tests[0].execute().is_ok(), "first test passes");
    match tests[1].execute() {
        Err(ReplayError::Failed(replayed)) => {
            ensure!(Arc::ptr_eq(&replayed, &original), "same cause is replayed");
        }
        other => bail!("expected failure, found {other:?}"),
    }
    // Replaying twice returns the same result.
    ensure!(tests[1].execute().is_err());
    Ok(())
}

#[test]
fn test_failed_class_renders_problem_only() -> Result<()> {
    test_init();

    let engine = ScriptedEngine::new([FixtureClass::new("com.example.FooTest")
        .passing("a")
        .nested(FixtureClass::new("com.example.FooTest.Inner").passing("b"))
        .failing_after_all(cause("after all failed"))]);
    let nodes = DynamicSuiteExecutor::new(&engine).execute(&class_suite("foo", "com.example.FooTest"))?;

    assert_eq!(shape(nodes), vec![c("FooTest", vec![t("FooTest.FooTest")])]);
    Ok(())
}

#[test]
fn test_empty_classes_are_pruned() -> Result<()> {
    test_init();

    let engine = ScriptedEngine::new([
        FixtureClass::new("com.example.SlowTest").tagged_test("slow", &["slow"], FixtureStatus::Pass),
        FixtureClass::new("com.example.MixedTest")
            .tagged_test("slow", &["slow"], FixtureStatus::Pass)
            .passing("fast"),
        FixtureClass::new("com.example.EmptyTest"),
        FixtureClass::new("com.example.BrokenTest").failing_after_all(cause("setup failed")),
    ]);
    let suite = SuiteRequest::new("fast")
        .select(DiscoverySelector::package("com.example"))
        .filter(TestFilter::exclude_tags(["slow"]));
    let nodes = DynamicSuiteExecutor::new(&engine).execute(&suite)?;

    // Failed classes are kept even if they have no tests.
    assert_eq!(
        shape(nodes),
        vec![
            c("MixedTest", vec![t("MixedTest.fast")]),
            c("BrokenTest", vec![t("BrokenTest.BrokenTest")]),
        ]
    );
    Ok(())
}

#[test]
fn test_skipped_test_carries_reason() -> Result<()> {
    test_init();

    let engine = ScriptedEngine::new([FixtureClass::new("com.example.FooTest")
        .test("disabled", FixtureStatus::Disabled("disabled on CI"))
        .test("aborted", FixtureStatus::Abort(cause("assumption failed")))]);
    let nodes = DynamicSuiteExecutor::new(&engine).execute(&class_suite("foo", "com.example.FooTest"))?;

    let tests = all_tests(nodes);
    match tests[0].execute() {
        Err(ReplayError::Aborted(cause)) => {
            let aborted = cause
                .downcast_ref::<TestAbortedError>()
                .expect("skip reason is a TestAbortedError");
            assert_eq!(aborted.reason(), "disabled on CI");
        }
        other => bail!("expected abort, found {other:?}"),
    }
    match tests[1].execute() {
        Err(error @ ReplayError::Aborted(_)) => {
            assert_eq!(error.to_string(), "aborted: assumption failed");
        }
        other => bail!("expected abort, found {other:?}"),
    }
    Ok(())
}

#[test_case(
    SuiteRequest::new("method").select(DiscoverySelector::method("com.example.FooTest", "b")),
    vec![c("FooTest", vec![t("FooTest.b")])]
    ; "method selector"
)]
#[test_case(
    SuiteRequest::new("pattern")
        .select(DiscoverySelector::package("com.example"))
        .filter(TestFilter::include_class_name_patterns([r".*\.Bar.*"]).unwrap()),
    vec![c("BarTest", vec![t("BarTest.c")])]
    ; "class name pattern"
)]
#[test_case(
    SuiteRequest::new("tags")
        .select(DiscoverySelector::package("com.example"))
        .filter(TestFilter::include_tags(["smoke"])),
    vec![c("FooTest", vec![t("FooTest.a")])]
    ; "include tags"
)]
fn test_selectors_and_filters(suite: SuiteRequest, expected: Vec<Shape>) -> Result<()> {
    test_init();

    let engine = ScriptedEngine::new([
        FixtureClass::new("com.example.FooTest")
            .tagged_test("a", &["smoke"], FixtureStatus::Pass)
            .passing("b"),
        FixtureClass::new("com.example.BarTest").passing("c"),
    ]);
    let nodes = DynamicSuiteExecutor::new(&engine).execute(&suite)?;
    assert_eq!(shape(nodes), expected);
    Ok(())
}

#[test]
fn test_context_is_reset_after_outermost_execution() -> Result<()> {
    test_init();

    let engine = ScriptedEngine::new([
        FixtureClass::new("com.example.FooTest").passing("a"),
        FixtureClass::new("com.example.BarTest").passing("b"),
    ]);
    let executor = DynamicSuiteExecutor::new(&engine);
    let cx = ExecutionContext::new();

    let first = shape(executor.execute_in(&cx, &class_suite("foo", "com.example.FooTest"))?);
    ensure!(!cx.is_executing());
    let second = shape(executor.execute_in(&cx, &class_suite("bar", "com.example.BarTest"))?);

    assert_eq!(first, vec![c("FooTest", vec![t("FooTest.a")])]);
    assert_eq!(second, vec![c("BarTest", vec![t("BarTest.b")])]);
    assert_eq!(
        engine
            .requests()
            .into_iter()
            .map(|request| request.executing)
            .collect::<Vec<_>>(),
        vec![vec!["foo".to_owned()], vec!["bar".to_owned()]],
    );
    Ok(())
}

#[test]
fn test_config_controls_naming() -> Result<()> {
    test_init();

    let dir = Utf8TempDir::new()?;
    let config_path = dir.path().join(DynsuiteConfig::CONFIG_PATH);
    std::fs::create_dir_all(config_path.parent().expect("config path has a parent"))?;
    std::fs::write(
        &config_path,
        indoc! {r#"
            [replay]
            separator = "::"
        "#},
    )?;
    let config = DynsuiteConfig::from_project_root(dir.path())?;

    let engine = ScriptedEngine::new([FixtureClass::new("com.example.FooTest").passing("a")]);
    let nodes = DynamicSuiteExecutor::with_config(&engine, config)
        .execute(&class_suite("foo", "com.example.FooTest"))?;
    assert_eq!(shape(nodes), vec![c("FooTest", vec![t("FooTest::a")])]);
    Ok(())
}

/// An engine that finishes a container that never started.
struct MisorderedEngine;

impl ExecutionEngine for MisorderedEngine {
    fn execute(&self, _request: &DiscoveryRequest, listener: &dyn TestExecutionListener) {
        let root = TestIdentifier::container(UniqueId::for_engine("misordered"), None, "misordered");
        let class = TestIdentifier::container(
            root.unique_id.append("class", "FooTest"),
            Some(root.unique_id.clone()),
            "FooTest",
        );
        let stray = TestIdentifier::container(
            root.unique_id.append("class", "StrayTest"),
            Some(root.unique_id.clone()),
            "StrayTest",
        );
        let test = TestIdentifier::test(
            class.unique_id.append("method", "a"),
            Some(class.unique_id.clone()),
            "a",
        );

        listener.execution_started(&root);
        listener.execution_started(&class);
        listener.execution_started(&test);
        listener.execution_finished(&test, &TestExecutionResult::successful());
        listener.execution_finished(&stray, &TestExecutionResult::successful());
        listener.execution_finished(&class, &TestExecutionResult::successful());
        listener.execution_finished(&root, &TestExecutionResult::successful());
    }
}

#[test_case(false ; "lenient")]
#[test_case(true ; "strict")]
fn test_event_order_violations(strict: bool) -> Result<()> {
    test_init();

    let mut config = DynsuiteConfig::default();
    config.set_strict_event_order(strict);
    let executor = DynamicSuiteExecutor::with_config(MisorderedEngine, config);
    let result = executor.execute(&class_suite("misordered", "FooTest"));

    if strict {
        let Err(ExecuteError::EventOrder { suite, violations }) = result else {
            bail!("expected event order error");
        };
        assert_eq!(suite, "misordered");
        assert_eq!(
            violations,
            vec![EventOrderViolation::UnexpectedFinish {
                unique_id: UniqueId::new("[engine:misordered]/[class:StrayTest]"),
                current: UniqueId::new("[engine:misordered]/[class:FooTest]"),
            }]
        );
    } else {
        // The stray event is ignored and the tree is intact.
        assert_eq!(shape(result?), vec![c("FooTest", vec![t("FooTest.a")])]);
    }
    Ok(())
}
