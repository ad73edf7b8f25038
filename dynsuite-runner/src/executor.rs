// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executing suites, possibly nested within each other.
//!
//! A [`DynamicSuiteExecutor`] runs a [`SuiteRequest`] through an [`ExecutionEngine`]. If a test
//! factory within that run executes another suite in the same [`ExecutionContext`], the inner
//! suite inherits the filters of every suite around it, and its results are attached to the tree
//! of the outermost suite. Only the outermost execution returns nodes.
//!
//! # Threads
//!
//! An [`ExecutionContext`] can be cloned and moved to worker threads. Suites executed from a
//! worker with a clone of the context are attached to the same tree, as long as the engine
//! delivers events one at a time. Engines that fork workers must hand the context over
//! explicitly; nothing is inherited implicitly.

use crate::{
    config::DynsuiteConfig,
    dynamic::DynamicNodes,
    engine::{ExecutionEngine, TestExecutionListener},
    errors::ExecuteError,
    identifier::TestIdentifier,
    listener::SuiteExecutionListener,
    request::{DiscoveryRequest, SuiteRequest},
    result::TestExecutionResult,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// State shared by all suite executions nested within one outermost execution.
///
/// The state is created by the outermost execution and discarded once it returns, so a context
/// can be reused for unrelated executions afterwards.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    state: Arc<Mutex<Option<SharedState>>>,
}

impl ExecutionContext {
    /// Creates a new, idle context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a suite is currently executing in this context.
    pub fn is_executing(&self) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|state| !state.executing.is_empty())
    }

    /// Returns the names of the suites currently executing, outermost first.
    pub fn executing_suites(&self) -> Vec<String> {
        self.state.lock().as_ref().map_or_else(Vec::new, |state| {
            state
                .executing
                .iter()
                .map(|suite| suite.name().to_owned())
                .collect()
        })
    }

    fn with_listener(&self, f: impl FnOnce(&mut SuiteExecutionListener)) {
        match self.state.lock().as_mut() {
            Some(state) => f(&mut state.listener),
            None => debug!("ignoring engine event received outside of a suite execution"),
        }
    }
}

#[derive(Debug)]
struct SharedState {
    executing: Vec<SuiteRequest>,
    listener: SuiteExecutionListener,
}

/// Forwards engine events to the listener within the shared state.
///
/// The lock is only held for the duration of a single callback, so that test factories invoked by
/// the engine can execute inner suites in the same context.
struct ContextListener<'cx> {
    cx: &'cx ExecutionContext,
}

impl TestExecutionListener for ContextListener<'_> {
    fn execution_started(&self, identifier: &TestIdentifier) {
        self.cx
            .with_listener(|listener| listener.execution_started(identifier));
    }

    fn execution_finished(&self, identifier: &TestIdentifier, result: &TestExecutionResult) {
        self.cx
            .with_listener(|listener| listener.execution_finished(identifier, result));
    }

    fn execution_skipped(&self, identifier: &TestIdentifier, reason: &str) {
        self.cx
            .with_listener(|listener| listener.execution_skipped(identifier, reason));
    }
}

/// Pops the executing stack when dropped, including while unwinding from a panicking engine.
struct ExecutingGuard<'cx> {
    cx: &'cx ExecutionContext,
    is_outer: bool,
    popped: bool,
}

impl ExecutingGuard<'_> {
    /// Pops the stack. For the outermost execution, this also takes the shared state out of the
    /// context.
    fn pop(mut self) -> Option<SharedState> {
        self.popped = true;
        self.pop_impl()
    }

    fn pop_impl(&self) -> Option<SharedState> {
        let mut guard = self.cx.state.lock();
        if let Some(state) = guard.as_mut() {
            if let Some(suite) = state.executing.pop() {
                debug!("finished executing suite `{}`", suite.name());
            }
            if !self.is_outer {
                state.listener.end_inner_suite();
            }
        }
        if self.is_outer { guard.take() } else { None }
    }
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        if !self.popped {
            self.pop_impl();
        }
    }
}

/// Executes suites through an execution engine.
#[derive(Clone, Debug)]
pub struct DynamicSuiteExecutor<E> {
    engine: E,
    config: DynsuiteConfig,
}

impl<E: ExecutionEngine> DynamicSuiteExecutor<E> {
    /// Creates a new executor with the default configuration.
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, DynsuiteConfig::default())
    }

    /// Creates a new executor with the given configuration.
    ///
    /// Within a nested execution, the configuration of the outermost executor applies.
    pub fn with_config(engine: E, config: DynsuiteConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DynsuiteConfig {
        &self.config
    }

    /// Executes a suite in a new context.
    pub fn execute(&self, suite: &SuiteRequest) -> Result<DynamicNodes, ExecuteError> {
        self.execute_in(&ExecutionContext::new(), suite)
    }

    /// Executes a suite within `cx`.
    ///
    /// If no other suite is executing within `cx`, this is the outermost execution: it returns
    /// the nodes for everything that ran, including any inner suites. Otherwise, the results are
    /// attached to the tree of the outermost execution and an empty sequence is returned.
    pub fn execute_in(
        &self,
        cx: &ExecutionContext,
        suite: &SuiteRequest,
    ) -> Result<DynamicNodes, ExecuteError> {
        if suite.discovery_selectors().is_empty() {
            return Err(ExecuteError::NoDiscoverySelectors {
                suite: suite.name().to_owned(),
            });
        }

        let (request, is_outer) = {
            let mut guard = cx.state.lock();
            let state = guard.get_or_insert_with(|| SharedState {
                executing: Vec::new(),
                listener: SuiteExecutionListener::new(&self.config),
            });
            let is_outer = state.executing.is_empty();
            if !is_outer {
                state.listener.start_inner_suite();
            }

            let request = DiscoveryRequest::builder()
                .selectors(suite.discovery_selectors().iter().cloned())
                .filters(
                    state
                        .executing
                        .iter()
                        .flat_map(|outer| outer.test_filters())
                        .chain(suite.test_filters())
                        .cloned(),
                )
                .build(cx.clone());

            state.executing.push(suite.clone());
            debug!(
                "executing suite `{}` (depth {}) with {} selectors and {} filters",
                suite.name(),
                state.executing.len(),
                request.selectors().len(),
                request.filters().len(),
            );
            (request, is_outer)
        };

        let executing = ExecutingGuard {
            cx,
            is_outer,
            popped: false,
        };
        self.engine.execute(&request, &ContextListener { cx });
        let state = executing.pop();

        let Some(state) = state else {
            // Inner suites contribute to the outer tree.
            return Ok(DynamicNodes::empty());
        };

        let (nodes, violations) = state.listener.finish();
        if !violations.is_empty() && self.config.tree().strict_event_order() {
            return Err(ExecuteError::EventOrder {
                suite: suite.name().to_owned(),
                violations,
            });
        }
        Ok(nodes)
    }
}
