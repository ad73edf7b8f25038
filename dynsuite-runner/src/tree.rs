// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The container tree built from engine events.
//!
//! Nodes live in an arena and refer to each other by index. A node's list of child containers is
//! either owned by the node or redirected to the list of another node. Redirection is how an inner
//! suite's containers end up attached to an ancestor in the outer suite.

use crate::{
    config::ReplayConfig,
    dynamic::{DynamicContainer, DynamicNode, DynamicNodes, DynamicTest},
    identifier::TestIdentifier,
    replay::TestOutcome,
    result::TestExecutionResult,
};
use std::sync::Arc;
use tracing::trace;

/// The index of a container within a [`ContainerTree`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct ContainerIdx(usize);

#[derive(Debug)]
enum ChildContainers {
    Owned(Vec<ContainerIdx>),
    // Children added to this node are added to the list owned by the target instead.
    Redirected(ContainerIdx),
}

#[derive(Debug)]
struct ContainerInfo {
    identifier: TestIdentifier,
    // None for the root.
    parent: Option<ContainerIdx>,
    child_containers: ChildContainers,
    child_tests: Vec<TestOutcome>,
    problem: Option<TestOutcome>,
}

#[derive(Debug)]
pub(crate) struct ContainerTree {
    nodes: Vec<ContainerInfo>,
    naming: ReplayConfig,
}

impl ContainerTree {
    pub(crate) fn new(naming: ReplayConfig) -> Self {
        Self {
            nodes: Vec::new(),
            naming,
        }
    }

    /// Adds a container without a parent.
    pub(crate) fn add_root(&mut self, identifier: TestIdentifier) -> ContainerIdx {
        self.push(identifier, None)
    }

    /// Adds a container as the last child of `parent`.
    pub(crate) fn add_child_container(
        &mut self,
        parent: ContainerIdx,
        identifier: TestIdentifier,
    ) -> ContainerIdx {
        let child = self.push(identifier, Some(parent));
        self.child_list_mut(parent).push(child);
        child
    }

    /// Records a finished test within `container`.
    pub(crate) fn add_child_test(
        &mut self,
        container: ContainerIdx,
        identifier: &TestIdentifier,
        result: TestExecutionResult,
    ) {
        let outcome = self.outcome_for(container, identifier, result);
        self.node_mut(container).child_tests.push(outcome);
    }

    /// Marks `container` as failed as a whole.
    pub(crate) fn set_problem(&mut self, container: ContainerIdx, result: TestExecutionResult) {
        let identifier = self.node(container).identifier.clone();
        let outcome = self.outcome_for(container, &identifier, result);
        self.node_mut(container).problem = Some(outcome);
    }

    pub(crate) fn identifier(&self, container: ContainerIdx) -> &TestIdentifier {
        &self.node(container).identifier
    }

    pub(crate) fn parent(&self, container: ContainerIdx) -> Option<ContainerIdx> {
        self.node(container).parent
    }

    /// Returns the ancestor `levels` levels above `container`.
    pub(crate) fn ancestor(&self, container: ContainerIdx, levels: usize) -> Option<ContainerIdx> {
        (0..levels).try_fold(container, |current, _| self.parent(current))
    }

    pub(crate) fn has_problem(&self, container: ContainerIdx) -> bool {
        self.node(container).problem.is_some()
    }

    /// Returns true if the container has neither tests nor child containers.
    pub(crate) fn is_empty(&self, container: ContainerIdx) -> bool {
        self.node(container).child_tests.is_empty() && self.child_containers(container).is_empty()
    }

    /// Returns the child containers, following any redirection.
    pub(crate) fn child_containers(&self, container: ContainerIdx) -> &[ContainerIdx] {
        match &self.node(self.list_owner(container)).child_containers {
            ChildContainers::Owned(children) => children,
            ChildContainers::Redirected(_) => &[],
        }
    }

    /// Removes `container` from the child list of its parent.
    pub(crate) fn detach(&mut self, container: ContainerIdx) {
        let Some(parent) = self.parent(container) else {
            return;
        };
        let children = self.child_list_mut(parent);
        if let Some(pos) = children.iter().position(|&child| child == container) {
            children.remove(pos);
        }
    }

    /// Clears the child containers of `ancestor`, and makes containers added to `container` from
    /// now on become children of `ancestor`.
    pub(crate) fn redirect_children(&mut self, container: ContainerIdx, ancestor: ContainerIdx) {
        let owner = self.list_owner(ancestor);
        self.child_list_mut(owner).clear();
        self.node_mut(container).child_containers = ChildContainers::Redirected(owner);
    }

    /// Renders `container` as a dynamic container.
    ///
    /// Children are rendered lazily, as the returned container is iterated over.
    pub(crate) fn render(tree: &Arc<Self>, container: ContainerIdx) -> DynamicContainer {
        let identifier = tree.identifier(container);
        trace!("rendering container '{}'", identifier.display_name);
        DynamicContainer::new(
            identifier.display_name.clone(),
            identifier.source_uri(),
            Self::render_children(tree, container),
        )
    }

    /// Renders the children of `container`. A container with a problem renders only the problem.
    pub(crate) fn render_children(tree: &Arc<Self>, container: ContainerIdx) -> DynamicNodes {
        let node = tree.node(container);
        if let Some(problem) = &node.problem {
            let problem = DynamicNode::Test(DynamicTest::new(problem.clone()));
            return DynamicNodes::new(std::iter::once(problem));
        }

        let containers = tree.child_containers(container).to_vec();
        let tests = node.child_tests.clone();
        let tree = Arc::clone(tree);
        DynamicNodes::new(
            containers
                .into_iter()
                .map(move |child| DynamicNode::Container(Self::render(&tree, child)))
                .chain(
                    tests
                        .into_iter()
                        .map(|outcome| DynamicNode::Test(DynamicTest::new(outcome))),
                ),
        )
    }

    fn push(&mut self, identifier: TestIdentifier, parent: Option<ContainerIdx>) -> ContainerIdx {
        let idx = ContainerIdx(self.nodes.len());
        self.nodes.push(ContainerInfo {
            identifier,
            parent,
            child_containers: ChildContainers::Owned(Vec::new()),
            child_tests: Vec::new(),
            problem: None,
        });
        idx
    }

    fn outcome_for(
        &self,
        container: ContainerIdx,
        identifier: &TestIdentifier,
        result: TestExecutionResult,
    ) -> TestOutcome {
        let display_name = self.naming.display_name(
            &self.identifier(container).display_name,
            &identifier.display_name,
        );
        TestOutcome::new(identifier, display_name, result)
    }

    // Follows redirections to the node that owns the list of child containers.
    fn list_owner(&self, mut container: ContainerIdx) -> ContainerIdx {
        while let ChildContainers::Redirected(target) = self.node(container).child_containers {
            container = target;
        }
        container
    }

    fn child_list_mut(&mut self, container: ContainerIdx) -> &mut Vec<ContainerIdx> {
        let owner = self.list_owner(container);
        match &mut self.node_mut(owner).child_containers {
            ChildContainers::Owned(children) => children,
            ChildContainers::Redirected(_) => unreachable!("list_owner returns an owning node"),
        }
    }

    fn node(&self, container: ContainerIdx) -> &ContainerInfo {
        &self.nodes[container.0]
    }

    fn node_mut(&mut self, container: ContainerIdx) -> &mut ContainerInfo {
        &mut self.nodes[container.0]
    }
}
