// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds a container tree from the events an execution engine reports.
//!
//! The listener keeps track of the most recently started container that hasn't finished yet.
//! Containers that start become children of it, and tests that finish are recorded in it.
//!
//! When a suite is executed from within a test factory of another suite, the inner engine run
//! introduces two levels that don't mean anything to users: the test factory method, and the
//! engine root of the inner run. On the first container of the inner run, the listener redirects
//! the inner root's children to the class that declared the test factory, and clears that class's
//! existing children. The inner suite's containers then show up directly below the class.

use crate::{
    config::DynsuiteConfig,
    dynamic::{DynamicNode, DynamicNodes},
    errors::EventOrderViolation,
    identifier::TestIdentifier,
    result::TestExecutionResult,
    tree::{ContainerIdx, ContainerTree},
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

// The inner engine root and the test factory that started the inner suite.
const FLATTENED_LEVELS: usize = 2;

#[derive(Debug)]
pub(crate) struct SuiteExecutionListener {
    tree: ContainerTree,
    top: Option<ContainerIdx>,
    most_recent: Option<ContainerIdx>,
    inner_suite_starting: bool,
    prune_empty_containers: bool,
    violations: Vec<EventOrderViolation>,
}

impl SuiteExecutionListener {
    pub(crate) fn new(config: &DynsuiteConfig) -> Self {
        Self {
            tree: ContainerTree::new(config.replay().clone()),
            top: None,
            most_recent: None,
            inner_suite_starting: false,
            prune_empty_containers: config.tree().prune_empty_containers(),
            violations: Vec::new(),
        }
    }

    /// Called just before a suite is executed from within a running suite.
    pub(crate) fn start_inner_suite(&mut self) {
        self.inner_suite_starting = true;
    }

    /// Called once a suite executed from within a running suite has returned.
    ///
    /// An inner engine run may report no containers at all, in which case the flag set by
    /// [`Self::start_inner_suite`] is still set and must not apply to the outer run's next
    /// container.
    pub(crate) fn end_inner_suite(&mut self) {
        if self.inner_suite_starting {
            debug!("inner suite reported no containers");
            self.inner_suite_starting = false;
        }
    }

    pub(crate) fn execution_started(&mut self, identifier: &TestIdentifier) {
        trace!("execution started: {identifier}");

        if identifier.is_container() {
            self.check_parent(identifier);
            let Some(container) = self.add_container(identifier) else {
                return;
            };
            if self.inner_suite_starting {
                self.inner_suite_starting = false;
                self.flatten_inner_suite(container);
            }
        }
    }

    pub(crate) fn execution_finished(
        &mut self,
        identifier: &TestIdentifier,
        result: &TestExecutionResult,
    ) {
        trace!("execution finished: {identifier} -> {result}");

        if identifier.is_container() {
            self.finish_container(identifier, result);
        }
        if identifier.is_test() {
            // Tests that are also containers were checked when they started.
            if !identifier.is_container() {
                self.check_parent(identifier);
            }
            self.add_test(identifier, result.clone());
        }
    }

    pub(crate) fn execution_skipped(&mut self, identifier: &TestIdentifier, reason: &str) {
        trace!("execution skipped: {identifier} ({reason})");

        // Disabled tests and failed preconditions are reported as skipped rather than finished.
        // Skipped containers have no events for their children, so there's nothing to record.
        if identifier.is_test() {
            self.check_parent(identifier);
            self.add_test(identifier, TestExecutionResult::skipped(reason));
        }
    }

    /// Consumes the listener, returning the rendered child containers of the top container along
    /// with any events that were out of order.
    pub(crate) fn finish(self) -> (DynamicNodes, Vec<EventOrderViolation>) {
        if let Some(current) = self.most_recent {
            debug!(
                "engine run ended with container '{}' still open",
                self.tree.identifier(current).display_name
            );
        }

        let nodes = match self.top {
            Some(top) => {
                let children = self.tree.child_containers(top).to_vec();
                let tree = Arc::new(self.tree);
                DynamicNodes::new(
                    children
                        .into_iter()
                        .map(move |child| DynamicNode::Container(ContainerTree::render(&tree, child))),
                )
            }
            None => DynamicNodes::empty(),
        };
        (nodes, self.violations)
    }

    fn add_container(&mut self, identifier: &TestIdentifier) -> Option<ContainerIdx> {
        let container = match self.most_recent {
            Some(current) => self.tree.add_child_container(current, identifier.clone()),
            None => {
                if self.top.is_some() {
                    self.violation(EventOrderViolation::TopContainerAlreadySet {
                        unique_id: identifier.unique_id.clone(),
                    });
                    return None;
                }
                let top = self.tree.add_root(identifier.clone());
                self.top = Some(top);
                top
            }
        };
        self.most_recent = Some(container);
        Some(container)
    }

    fn flatten_inner_suite(&mut self, inner_root: ContainerIdx) {
        match self.tree.ancestor(inner_root, FLATTENED_LEVELS) {
            Some(ancestor) => {
                debug!(
                    "attaching inner suite '{}' to '{}'",
                    self.tree.identifier(inner_root).display_name,
                    self.tree.identifier(ancestor).display_name,
                );
                self.tree.redirect_children(inner_root, ancestor);
            }
            None => {
                self.violation(EventOrderViolation::NoFlattenAncestor {
                    unique_id: self.tree.identifier(inner_root).unique_id.clone(),
                });
            }
        }
    }

    fn finish_container(&mut self, identifier: &TestIdentifier, result: &TestExecutionResult) {
        let Some(current) = self.most_recent else {
            self.violation(EventOrderViolation::NoCurrentContainer {
                unique_id: identifier.unique_id.clone(),
            });
            return;
        };

        let current_id = &self.tree.identifier(current).unique_id;
        if current_id != &identifier.unique_id {
            let current_id = current_id.clone();
            self.violation(EventOrderViolation::UnexpectedFinish {
                unique_id: identifier.unique_id.clone(),
                current: current_id,
            });
            return;
        }

        if !result.is_successful() {
            self.tree.set_problem(current, result.clone());
        }

        // A container that failed as a whole is kept even if it has no children, so the failure
        // is still reported.
        if self.prune_empty_containers
            && !self.tree.has_problem(current)
            && self.tree.is_empty(current)
        {
            trace!("pruning empty container {identifier}");
            self.tree.detach(current);
        }

        self.most_recent = self.tree.parent(current);
    }

    fn add_test(&mut self, identifier: &TestIdentifier, result: TestExecutionResult) {
        match self.most_recent {
            Some(current) => self.tree.add_child_test(current, identifier, result),
            None => self.violation(EventOrderViolation::NoCurrentContainer {
                unique_id: identifier.unique_id.clone(),
            }),
        }
    }

    fn check_parent(&mut self, identifier: &TestIdentifier) {
        // Engine roots have no parent. This includes the root of an inner suite, which starts
        // while the test factory that triggered it is current.
        let Some(parent_id) = &identifier.parent_id else {
            return;
        };
        let expected = self
            .most_recent
            .map(|current| self.tree.identifier(current).unique_id.clone());
        if expected.as_ref() != Some(parent_id) {
            self.violation(EventOrderViolation::ParentMismatch {
                unique_id: identifier.unique_id.clone(),
                expected,
                actual: parent_id.clone(),
            });
        }
    }

    fn violation(&mut self, violation: EventOrderViolation) {
        warn!("inconsistent event from execution engine: {violation}");
        self.violations.push(violation);
    }
}
