// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers for the containers and tests an execution engine reports.

use camino::Utf8PathBuf;
use smol_str::SmolStr;
use std::{collections::BTreeSet, fmt};

/// A stable identifier assigned by an execution engine to a container or a test.
///
/// Identifiers are made of bracketed segments, for example
/// `[engine:scripted]/[class:com.example.FooTest]/[method:bar]`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UniqueId(SmolStr);

impl UniqueId {
    /// Creates a new `UniqueId` from its string form.
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier of an engine root, `[engine:<name>]`.
    pub fn for_engine(engine: &str) -> Self {
        Self(SmolStr::new(format!("[engine:{engine}]")))
    }

    /// Returns a new identifier with a `[kind:value]` segment appended.
    pub fn append(&self, kind: &str, value: &str) -> Self {
        Self(SmolStr::new(format!("{}/[{kind}:{value}]", self.0)))
    }

    /// Returns the string form of this identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether an identifier refers to a container, a test, or both.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TestType {
    /// A grouping of other containers and tests, for example a class or a test factory.
    Container,

    /// A leaf test.
    Test,

    /// A test that can also contain other tests.
    ContainerAndTest,
}

impl TestType {
    /// Returns true if this is a container.
    pub fn is_container(self) -> bool {
        matches!(self, TestType::Container | TestType::ContainerAndTest)
    }

    /// Returns true if this is a test.
    pub fn is_test(self) -> bool {
        matches!(self, TestType::Test | TestType::ContainerAndTest)
    }
}

/// Where a container or test was defined.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestSource {
    /// A class.
    Class {
        /// The fully qualified class name.
        class_name: String,
    },

    /// A method within a class.
    Method {
        /// The fully qualified class name.
        class_name: String,

        /// The method name.
        method_name: String,
    },

    /// A location within a file.
    File {
        /// The path to the file.
        path: Utf8PathBuf,

        /// The line number, if known.
        line: Option<u32>,
    },
}

impl TestSource {
    /// Returns the class name for class and method sources.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TestSource::Class { class_name } | TestSource::Method { class_name, .. } => {
                Some(class_name)
            }
            TestSource::File { .. } => None,
        }
    }

    /// Returns the source as a URI.
    ///
    /// The URI forms are `class:<name>`, `method:<class>#<method>` and `file:<path>`, with an
    /// optional `?line=<n>` query for files.
    pub fn to_uri(&self) -> String {
        match self {
            TestSource::Class { class_name } => format!("class:{class_name}"),
            TestSource::Method {
                class_name,
                method_name,
            } => format!("method:{class_name}#{method_name}"),
            TestSource::File {
                path,
                line: Some(line),
            } => format!("file:{path}?line={line}"),
            TestSource::File { path, line: None } => format!("file:{path}"),
        }
    }
}

/// A container or a test, as reported by an execution engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestIdentifier {
    /// The unique ID of this container or test.
    pub unique_id: UniqueId,

    /// The unique ID of the enclosing container. `None` for engine roots.
    pub parent_id: Option<UniqueId>,

    /// The name shown to users.
    pub display_name: String,

    /// Where this container or test was defined.
    pub source: Option<TestSource>,

    /// Whether this is a container, a test, or both.
    pub test_type: TestType,

    /// Tags attached to this container or test.
    pub tags: BTreeSet<String>,
}

impl TestIdentifier {
    /// Creates a new identifier for a container.
    pub fn container(
        unique_id: UniqueId,
        parent_id: Option<UniqueId>,
        display_name: impl Into<String>,
    ) -> Self {
        Self::new(unique_id, parent_id, display_name, TestType::Container)
    }

    /// Creates a new identifier for a test.
    pub fn test(
        unique_id: UniqueId,
        parent_id: Option<UniqueId>,
        display_name: impl Into<String>,
    ) -> Self {
        Self::new(unique_id, parent_id, display_name, TestType::Test)
    }

    /// Creates a new identifier.
    pub fn new(
        unique_id: UniqueId,
        parent_id: Option<UniqueId>,
        display_name: impl Into<String>,
        test_type: TestType,
    ) -> Self {
        Self {
            unique_id,
            parent_id,
            display_name: display_name.into(),
            source: None,
            test_type,
            tags: BTreeSet::new(),
        }
    }

    /// Sets the source of this identifier.
    pub fn with_source(mut self, source: TestSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Adds tags to this identifier.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Returns the source as a URI, if a source is known.
    pub fn source_uri(&self) -> Option<String> {
        self.source.as_ref().map(TestSource::to_uri)
    }

    /// Returns true if this is a container.
    pub fn is_container(&self) -> bool {
        self.test_type.is_container()
    }

    /// Returns true if this is a test.
    pub fn is_test(&self) -> bool {
        self.test_type.is_test()
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.unique_id)
    }
}
