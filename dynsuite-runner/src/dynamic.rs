// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dynamic test nodes handed to the reporting layer.
//!
//! The outermost suite execution returns a lazy sequence of [`DynamicNode`]s. Containers produce
//! their children on demand, and tests replay a recorded result when executed.

use crate::{errors::ReplayError, replay::TestOutcome};
use debug_ignore::DebugIgnore;
use std::iter;

/// A container or a test in the dynamic tree.
#[derive(Debug)]
pub enum DynamicNode {
    /// A container with further nodes inside it.
    Container(DynamicContainer),

    /// A test.
    Test(DynamicTest),
}

impl DynamicNode {
    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        match self {
            DynamicNode::Container(container) => container.display_name(),
            DynamicNode::Test(test) => test.display_name(),
        }
    }

    /// Returns the source URI, if known.
    pub fn source_uri(&self) -> Option<&str> {
        match self {
            DynamicNode::Container(container) => container.source_uri(),
            DynamicNode::Test(test) => test.source_uri(),
        }
    }
}

/// A container of dynamic nodes.
#[derive(Debug)]
pub struct DynamicContainer {
    display_name: String,
    source_uri: Option<String>,
    children: DynamicNodes,
}

impl DynamicContainer {
    pub(crate) fn new(
        display_name: impl Into<String>,
        source_uri: Option<String>,
        children: DynamicNodes,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            source_uri,
            children,
        }
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the source URI, if known.
    pub fn source_uri(&self) -> Option<&str> {
        self.source_uri.as_deref()
    }

    /// Consumes the container, returning its children.
    pub fn into_children(self) -> DynamicNodes {
        self.children
    }
}

/// A test that replays a recorded result.
#[derive(Clone, Debug)]
pub struct DynamicTest {
    outcome: TestOutcome,
}

impl DynamicTest {
    pub(crate) fn new(outcome: TestOutcome) -> Self {
        Self { outcome }
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        self.outcome.display_name()
    }

    /// Returns the source URI, if known.
    pub fn source_uri(&self) -> Option<&str> {
        self.outcome.source_uri()
    }

    /// Returns the recorded outcome.
    pub fn outcome(&self) -> &TestOutcome {
        &self.outcome
    }

    /// Executes the test by replaying its recorded result.
    ///
    /// This never runs the original test again. Executing more than once returns the same result.
    pub fn execute(&self) -> Result<(), ReplayError> {
        self.outcome.replay()
    }
}

/// A lazy, finite sequence of dynamic nodes.
///
/// Like any iterator, a `DynamicNodes` can only be consumed once.
#[derive(Debug)]
pub struct DynamicNodes {
    inner: DebugIgnore<Box<dyn Iterator<Item = DynamicNode> + Send>>,
}

impl DynamicNodes {
    pub(crate) fn new(inner: impl Iterator<Item = DynamicNode> + Send + 'static) -> Self {
        Self {
            inner: DebugIgnore(Box::new(inner)),
        }
    }

    /// Returns an empty sequence.
    pub fn empty() -> Self {
        Self::new(iter::empty())
    }
}

impl Iterator for DynamicNodes {
    type Item = DynamicNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
