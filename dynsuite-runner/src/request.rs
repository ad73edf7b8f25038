// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Describing what an execution engine should discover and run.
//!
//! A [`SuiteRequest`] is the user-facing description of a suite. The
//! [`DynamicSuiteExecutor`](crate::executor::DynamicSuiteExecutor) turns it into a
//! [`DiscoveryRequest`], which also carries the filters inherited from enclosing suites.

use crate::{
    errors::FilterParseError, executor::ExecutionContext, identifier::TestIdentifier,
    identifier::UniqueId,
};
use itertools::Itertools;
use regex::Regex;
use std::{collections::BTreeSet, fmt};

/// Tells the execution engine what to discover.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DiscoverySelector {
    /// All classes within a package.
    Package {
        /// The package name.
        package_name: String,
    },

    /// A single class.
    Class {
        /// The fully qualified class name.
        class_name: String,
    },

    /// A single method within a class.
    Method {
        /// The fully qualified class name.
        class_name: String,

        /// The method name.
        method_name: String,
    },

    /// A container or test by its unique ID.
    UniqueId(UniqueId),
}

impl DiscoverySelector {
    /// Selects all classes within a package.
    pub fn package(package_name: impl Into<String>) -> Self {
        Self::Package {
            package_name: package_name.into(),
        }
    }

    /// Selects a class.
    pub fn class(class_name: impl Into<String>) -> Self {
        Self::Class {
            class_name: class_name.into(),
        }
    }

    /// Selects a method.
    pub fn method(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self::Method {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }
}

impl fmt::Display for DiscoverySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverySelector::Package { package_name } => write!(f, "package:{package_name}"),
            DiscoverySelector::Class { class_name } => write!(f, "class:{class_name}"),
            DiscoverySelector::Method {
                class_name,
                method_name,
            } => write!(f, "method:{class_name}#{method_name}"),
            DiscoverySelector::UniqueId(unique_id) => write!(f, "uid:{unique_id}"),
        }
    }
}

/// Narrows down the containers and tests an engine runs.
#[derive(Clone, Debug)]
pub enum TestFilter {
    /// Only include classes whose fully qualified names match one of the patterns.
    IncludeClassNamePatterns(ClassNamePatterns),

    /// Exclude classes whose fully qualified names match one of the patterns.
    ExcludeClassNamePatterns(ClassNamePatterns),

    /// Only include tests carrying at least one of the tags.
    IncludeTags(BTreeSet<String>),

    /// Exclude tests carrying any of the tags.
    ExcludeTags(BTreeSet<String>),
}

impl TestFilter {
    /// Creates a filter including classes whose names fully match one of the regex patterns.
    pub fn include_class_name_patterns(
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, FilterParseError> {
        Ok(Self::IncludeClassNamePatterns(ClassNamePatterns::new(
            patterns,
        )?))
    }

    /// Creates a filter excluding classes whose names fully match one of the regex patterns.
    pub fn exclude_class_name_patterns(
        patterns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, FilterParseError> {
        Ok(Self::ExcludeClassNamePatterns(ClassNamePatterns::new(
            patterns,
        )?))
    }

    /// Creates a filter including tests with any of the given tags.
    pub fn include_tags(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::IncludeTags(tags.into_iter().map(Into::into).collect())
    }

    /// Creates a filter excluding tests with any of the given tags.
    pub fn exclude_tags(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::ExcludeTags(tags.into_iter().map(Into::into).collect())
    }

    /// Applies this filter to a container or test.
    ///
    /// Class name filters only apply to identifiers whose source names a class. Tag filters only
    /// apply to tests; containers are kept and left for pruning if they end up empty.
    pub fn apply(&self, identifier: &TestIdentifier) -> FilterResult {
        match self {
            TestFilter::IncludeClassNamePatterns(patterns) => {
                match identifier.source.as_ref().and_then(|s| s.class_name()) {
                    Some(class_name) if !patterns.is_match(class_name) => FilterResult::Excluded {
                        reason: FilterMismatchReason::ClassNameNotIncluded,
                    },
                    _ => FilterResult::Included,
                }
            }
            TestFilter::ExcludeClassNamePatterns(patterns) => {
                match identifier.source.as_ref().and_then(|s| s.class_name()) {
                    Some(class_name) if patterns.is_match(class_name) => FilterResult::Excluded {
                        reason: FilterMismatchReason::ClassNameExcluded,
                    },
                    _ => FilterResult::Included,
                }
            }
            TestFilter::IncludeTags(tags) => {
                if identifier.test_type.is_container() || !identifier.tags.is_disjoint(tags) {
                    FilterResult::Included
                } else {
                    FilterResult::Excluded {
                        reason: FilterMismatchReason::TagNotIncluded,
                    }
                }
            }
            TestFilter::ExcludeTags(tags) => {
                if identifier.test_type.is_test() && !identifier.tags.is_disjoint(tags) {
                    FilterResult::Excluded {
                        reason: FilterMismatchReason::TagExcluded,
                    }
                } else {
                    FilterResult::Included
                }
            }
        }
    }
}

impl PartialEq for TestFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::IncludeClassNamePatterns(a), Self::IncludeClassNamePatterns(b))
            | (Self::ExcludeClassNamePatterns(a), Self::ExcludeClassNamePatterns(b)) => a == b,
            (Self::IncludeTags(a), Self::IncludeTags(b))
            | (Self::ExcludeTags(a), Self::ExcludeTags(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestFilter::IncludeClassNamePatterns(patterns) => {
                write!(f, "include classes matching {patterns}")
            }
            TestFilter::ExcludeClassNamePatterns(patterns) => {
                write!(f, "exclude classes matching {patterns}")
            }
            TestFilter::IncludeTags(tags) => write!(f, "include tags {tags:?}"),
            TestFilter::ExcludeTags(tags) => write!(f, "exclude tags {tags:?}"),
        }
    }
}

/// A set of regular expressions matched against fully qualified class names.
#[derive(Clone, Debug)]
pub struct ClassNamePatterns {
    patterns: Vec<Regex>,
}

impl ClassNamePatterns {
    fn new(patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self, FilterParseError> {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                // Class name patterns must match the entire name.
                Regex::new(&format!("^(?:{pattern})$"))
                    .map_err(|err| FilterParseError::new(pattern, err))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if any pattern matches the class name.
    pub fn is_match(&self, class_name: &str) -> bool {
        self.patterns.iter().any(|regex| regex.is_match(class_name))
    }
}

impl PartialEq for ClassNamePatterns {
    fn eq(&self, other: &Self) -> bool {
        self.patterns.len() == other.patterns.len()
            && self
                .patterns
                .iter()
                .zip(&other.patterns)
                .all(|(a, b)| a.as_str() == b.as_str())
    }
}

impl fmt::Display for ClassNamePatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.patterns
                .iter()
                .map(|regex| format!("`{}`", regex.as_str()))
                .join(", ")
        )
    }
}

/// Whether a filter included a container or test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterResult {
    /// The container or test is included.
    Included,

    /// The container or test is excluded.
    Excluded {
        /// Why it was excluded.
        reason: FilterMismatchReason,
    },
}

impl FilterResult {
    /// Returns true if included.
    pub fn is_included(self) -> bool {
        matches!(self, FilterResult::Included)
    }
}

/// The reason a filter excluded a container or test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterMismatchReason {
    /// The class name did not match any include pattern.
    ClassNameNotIncluded,

    /// The class name matched an exclude pattern.
    ClassNameExcluded,

    /// The test carries none of the included tags.
    TagNotIncluded,

    /// The test carries an excluded tag.
    TagExcluded,
}

impl fmt::Display for FilterMismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMismatchReason::ClassNameNotIncluded => write!(f, "class name not included"),
            FilterMismatchReason::ClassNameExcluded => write!(f, "class name excluded"),
            FilterMismatchReason::TagNotIncluded => write!(f, "no included tags"),
            FilterMismatchReason::TagExcluded => write!(f, "has an excluded tag"),
        }
    }
}

/// A description of a suite: what to discover and how to filter it.
#[derive(Clone, Debug, PartialEq)]
pub struct SuiteRequest {
    name: String,
    selectors: Vec<DiscoverySelector>,
    filters: Vec<TestFilter>,
}

impl SuiteRequest {
    /// Creates a new, empty suite request.
    ///
    /// At least one selector must be added before the suite can be executed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selectors: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Adds a discovery selector.
    pub fn select(mut self, selector: DiscoverySelector) -> Self {
        self.selectors.push(selector);
        self
    }

    /// Adds several discovery selectors.
    pub fn select_all(mut self, selectors: impl IntoIterator<Item = DiscoverySelector>) -> Self {
        self.selectors.extend(selectors);
        self
    }

    /// Adds a test filter.
    pub fn filter(mut self, filter: TestFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Returns the name of this suite.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the discovery selectors.
    pub fn discovery_selectors(&self) -> &[DiscoverySelector] {
        &self.selectors
    }

    /// Returns the test filters.
    pub fn test_filters(&self) -> &[TestFilter] {
        &self.filters
    }
}

/// A request handed to an [`ExecutionEngine`](crate::engine::ExecutionEngine).
#[derive(Clone, Debug)]
pub struct DiscoveryRequest {
    selectors: Vec<DiscoverySelector>,
    filters: Vec<TestFilter>,
    context: ExecutionContext,
}

impl DiscoveryRequest {
    /// Returns a new builder.
    pub fn builder() -> DiscoveryRequestBuilder {
        DiscoveryRequestBuilder::default()
    }

    /// Returns the selectors to discover.
    pub fn selectors(&self) -> &[DiscoverySelector] {
        &self.selectors
    }

    /// Returns all filters to apply, outermost suite first.
    pub fn filters(&self) -> &[TestFilter] {
        &self.filters
    }

    /// Returns the execution context this request runs in.
    ///
    /// Engines must hand this context to any dynamic test factory they invoke, so that suites
    /// executed from within the factory are attached to the same tree.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Applies all filters to an identifier. The first exclusion wins.
    pub fn apply_filters(&self, identifier: &TestIdentifier) -> FilterResult {
        self.filters
            .iter()
            .map(|filter| filter.apply(identifier))
            .find(|result| !result.is_included())
            .unwrap_or(FilterResult::Included)
    }
}

/// A builder for [`DiscoveryRequest`] instances.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryRequestBuilder {
    selectors: Vec<DiscoverySelector>,
    filters: Vec<TestFilter>,
}

impl DiscoveryRequestBuilder {
    /// Adds selectors.
    pub fn selectors(&mut self, selectors: impl IntoIterator<Item = DiscoverySelector>) -> &mut Self {
        self.selectors.extend(selectors);
        self
    }

    /// Adds filters.
    pub fn filters(&mut self, filters: impl IntoIterator<Item = TestFilter>) -> &mut Self {
        self.filters.extend(filters);
        self
    }

    /// Builds the request, attaching it to the given context.
    pub fn build(&self, context: ExecutionContext) -> DiscoveryRequest {
        DiscoveryRequest {
            selectors: self.selectors.clone(),
            filters: self.filters.clone(),
            context,
        }
    }
}
