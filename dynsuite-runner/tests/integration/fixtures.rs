// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use dynsuite_runner::{
    dynamic::{DynamicNode, DynamicNodes, DynamicTest},
    engine::{ExecutionEngine, TestExecutionListener},
    executor::DynamicSuiteExecutor,
    identifier::{TestIdentifier, TestSource, UniqueId},
    request::{DiscoveryRequest, DiscoverySelector, SuiteRequest, TestFilter},
    result::{Cause, TestExecutionResult},
};
use parking_lot::Mutex;
use std::{collections::BTreeSet, io, sync::Arc, sync::Once, thread};

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        color_eyre::install().expect("color-eyre installed once");
        dynsuite_runner::output::init_logging();
    });
}

pub(crate) fn cause(message: &str) -> Cause {
    Arc::new(io::Error::other(message.to_owned()))
}

#[derive(Clone, Debug)]
pub(crate) enum FixtureStatus {
    Pass,
    Fail(Cause),
    FailWithoutCause,
    Abort(Cause),
    Disabled(&'static str),
}

impl FixtureStatus {
    fn to_result(&self) -> TestExecutionResult {
        match self {
            FixtureStatus::Pass => TestExecutionResult::successful(),
            FixtureStatus::Fail(cause) => TestExecutionResult::failed(Some(cause.clone())),
            FixtureStatus::FailWithoutCause => TestExecutionResult::failed(None),
            FixtureStatus::Abort(cause) => TestExecutionResult::aborted(Some(cause.clone())),
            FixtureStatus::Disabled(reason) => TestExecutionResult::skipped(*reason),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum FixtureMember {
    Test {
        name: &'static str,
        tags: &'static [&'static str],
        status: FixtureStatus,
    },
    /// A test factory that executes another suite.
    Factory {
        name: &'static str,
        suite: SuiteRequest,
        mode: FactoryMode,
    },
    Nested(FixtureClass),
}

/// How a test factory executes its suite.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FactoryMode {
    /// On the engine's thread, with the scripted engine.
    SameThread,
    /// On a worker thread, with the scripted engine.
    Worker,
    /// On the engine's thread, with an engine that reports no events.
    Silent,
}

#[derive(Clone, Debug)]
pub(crate) struct FixtureClass {
    pub(crate) class_name: &'static str,
    pub(crate) members: Vec<FixtureMember>,
    pub(crate) after_all: Option<Cause>,
}

impl FixtureClass {
    pub(crate) fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            members: Vec::new(),
            after_all: None,
        }
    }

    pub(crate) fn test(self, name: &'static str, status: FixtureStatus) -> Self {
        self.tagged_test(name, &[], status)
    }

    pub(crate) fn passing(self, name: &'static str) -> Self {
        self.test(name, FixtureStatus::Pass)
    }

    pub(crate) fn tagged_test(
        mut self,
        name: &'static str,
        tags: &'static [&'static str],
        status: FixtureStatus,
    ) -> Self {
        self.members.push(FixtureMember::Test { name, tags, status });
        self
    }

    pub(crate) fn factory(self, name: &'static str, suite: SuiteRequest) -> Self {
        self.factory_with_mode(name, suite, FactoryMode::SameThread)
    }

    pub(crate) fn worker_factory(self, name: &'static str, suite: SuiteRequest) -> Self {
        self.factory_with_mode(name, suite, FactoryMode::Worker)
    }

    pub(crate) fn silent_factory(self, name: &'static str, suite: SuiteRequest) -> Self {
        self.factory_with_mode(name, suite, FactoryMode::Silent)
    }

    fn factory_with_mode(
        mut self,
        name: &'static str,
        suite: SuiteRequest,
        mode: FactoryMode,
    ) -> Self {
        self.members.push(FixtureMember::Factory { name, suite, mode });
        self
    }

    pub(crate) fn nested(mut self, class: FixtureClass) -> Self {
        self.members.push(FixtureMember::Nested(class));
        self
    }

    pub(crate) fn failing_after_all(mut self, cause: Cause) -> Self {
        self.after_all = Some(cause);
        self
    }

    fn display_name(&self) -> &'static str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(self.class_name)
    }

    fn identifier(&self, parent: &UniqueId) -> TestIdentifier {
        TestIdentifier::container(
            parent.append("class", self.class_name),
            Some(parent.clone()),
            self.display_name(),
        )
        .with_source(TestSource::Class {
            class_name: self.class_name.to_owned(),
        })
    }
}

/// What the engine saw for a single discovery request.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RecordedRequest {
    pub(crate) selectors: Vec<DiscoverySelector>,
    pub(crate) filters: Vec<TestFilter>,
    pub(crate) executing: Vec<String>,
}

/// An in-memory execution engine that reports a fixed set of classes.
#[derive(Debug)]
pub(crate) struct ScriptedEngine {
    name: &'static str,
    classes: Vec<FixtureClass>,
    requests: Mutex<Vec<RecordedRequest>>,
    inner_node_counts: Mutex<Vec<usize>>,
}

impl ScriptedEngine {
    pub(crate) fn new(classes: impl IntoIterator<Item = FixtureClass>) -> Self {
        Self {
            name: "scripted",
            classes: classes.into_iter().collect(),
            requests: Mutex::new(Vec::new()),
            inner_node_counts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// The number of nodes returned to test factories by inner suite executions.
    pub(crate) fn inner_node_counts(&self) -> Vec<usize> {
        self.inner_node_counts.lock().clone()
    }

    fn run_class(
        &self,
        request: &DiscoveryRequest,
        listener: &dyn TestExecutionListener,
        parent: &UniqueId,
        class: &FixtureClass,
        methods: Option<&BTreeSet<String>>,
    ) {
        let id = class.identifier(parent);
        if !request.apply_filters(&id).is_included() {
            return;
        }

        listener.execution_started(&id);
        for member in &class.members {
            match member {
                FixtureMember::Test { name, tags, status } => {
                    if methods.is_some_and(|methods| !methods.contains(*name)) {
                        continue;
                    }
                    let test_id = TestIdentifier::test(
                        id.unique_id.append("method", name),
                        Some(id.unique_id.clone()),
                        *name,
                    )
                    .with_source(TestSource::Method {
                        class_name: class.class_name.to_owned(),
                        method_name: (*name).to_owned(),
                    })
                    .with_tags(tags.iter().copied());
                    if !request.apply_filters(&test_id).is_included() {
                        continue;
                    }

                    match status {
                        FixtureStatus::Disabled(reason) => {
                            listener.execution_skipped(&test_id, reason)
                        }
                        status => {
                            listener.execution_started(&test_id);
                            listener.execution_finished(&test_id, &status.to_result());
                        }
                    }
                }
                FixtureMember::Factory { name, suite, mode } => {
                    if methods.is_some_and(|methods| !methods.contains(*name)) {
                        continue;
                    }
                    self.run_factory(request, listener, &id.unique_id, name, suite, *mode);
                }
                FixtureMember::Nested(nested) => {
                    self.run_class(request, listener, &id.unique_id, nested, None);
                }
            }
        }

        let result = match &class.after_all {
            Some(cause) => TestExecutionResult::failed(Some(cause.clone())),
            None => TestExecutionResult::successful(),
        };
        listener.execution_finished(&id, &result);
    }

    fn run_factory(
        &self,
        request: &DiscoveryRequest,
        listener: &dyn TestExecutionListener,
        class_id: &UniqueId,
        name: &str,
        suite: &SuiteRequest,
        mode: FactoryMode,
    ) {
        let id = TestIdentifier::container(
            class_id.append("test-factory", name),
            Some(class_id.clone()),
            name,
        );
        listener.execution_started(&id);

        let result = match mode {
            FactoryMode::SameThread => {
                DynamicSuiteExecutor::new(self).execute_in(request.context(), suite)
            }
            FactoryMode::Worker => {
                let cx = request.context().clone();
                thread::scope(|s| {
                    s.spawn(move || DynamicSuiteExecutor::new(self).execute_in(&cx, suite))
                        .join()
                        .expect("worker thread didn't panic")
                })
            }
            FactoryMode::Silent => {
                DynamicSuiteExecutor::new(SilentEngine).execute_in(request.context(), suite)
            }
        };

        match result {
            Ok(nodes) => {
                self.inner_node_counts.lock().push(nodes.count());
                listener.execution_finished(&id, &TestExecutionResult::successful());
            }
            Err(error) => {
                listener.execution_finished(&id, &TestExecutionResult::failed(Some(Arc::new(error))));
            }
        }
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn execute(&self, request: &DiscoveryRequest, listener: &dyn TestExecutionListener) {
        self.requests.lock().push(RecordedRequest {
            selectors: request.selectors().to_vec(),
            filters: request.filters().to_vec(),
            executing: request.context().executing_suites(),
        });

        let root = TestIdentifier::container(UniqueId::for_engine(self.name), None, self.name);
        listener.execution_started(&root);
        for class in &self.classes {
            if let Some(methods) = selection(request, class.class_name) {
                self.run_class(request, listener, &root.unique_id, class, methods.as_ref());
            }
        }
        listener.execution_finished(&root, &TestExecutionResult::successful());
    }
}

/// An engine that discovers nothing and reports no events, not even its root.
#[derive(Debug)]
pub(crate) struct SilentEngine;

impl ExecutionEngine for SilentEngine {
    fn execute(&self, _request: &DiscoveryRequest, _listener: &dyn TestExecutionListener) {}
}

/// Returns `None` if the class isn't selected, `Some(None)` if the whole class is selected, and
/// the selected methods otherwise.
fn selection(request: &DiscoveryRequest, class_name: &str) -> Option<Option<BTreeSet<String>>> {
    let mut all = false;
    let mut methods = BTreeSet::new();
    for selector in request.selectors() {
        match selector {
            DiscoverySelector::Package { package_name } => {
                if class_name
                    .strip_prefix(package_name.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
                {
                    all = true;
                }
            }
            DiscoverySelector::Class {
                class_name: selected,
            } => {
                if selected == class_name {
                    all = true;
                }
            }
            DiscoverySelector::Method {
                class_name: selected,
                method_name,
            } => {
                if selected == class_name {
                    methods.insert(method_name.clone());
                }
            }
            DiscoverySelector::UniqueId(_) => {}
        }
    }

    if all {
        Some(None)
    } else if methods.is_empty() {
        None
    } else {
        Some(Some(methods))
    }
}

/// A simplified description of a rendered tree.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Shape {
    Container(String, Vec<Shape>),
    Test(String),
}

pub(crate) fn c(name: &str, children: Vec<Shape>) -> Shape {
    Shape::Container(name.to_owned(), children)
}

pub(crate) fn t(name: &str) -> Shape {
    Shape::Test(name.to_owned())
}

pub(crate) fn shape(nodes: DynamicNodes) -> Vec<Shape> {
    nodes
        .map(|node| match node {
            DynamicNode::Container(container) => Shape::Container(
                container.display_name().to_owned(),
                shape(container.into_children()),
            ),
            DynamicNode::Test(test) => Shape::Test(test.display_name().to_owned()),
        })
        .collect()
}

/// Collects every test in the tree, depth first.
pub(crate) fn all_tests(nodes: DynamicNodes) -> Vec<DynamicTest> {
    let mut tests = Vec::new();
    for node in nodes {
        match node {
            DynamicNode::Container(container) => tests.extend(all_tests(container.into_children())),
            DynamicNode::Test(test) => tests.push(test),
        }
    }
    tests
}

pub(crate) fn class_suite(name: &str, class_name: &str) -> SuiteRequest {
    SuiteRequest::new(name).select(DiscoverySelector::class(class_name))
}
