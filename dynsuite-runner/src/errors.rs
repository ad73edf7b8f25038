// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by dynsuite.

use crate::{
    identifier::UniqueId,
    result::{Cause, Status},
};
use camino::Utf8PathBuf;
use config::ConfigError;
use itertools::Itertools;
use std::{error::Error as StdError, fmt};
use thiserror::Error;

/// An error that occurred while executing a suite.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecuteError {
    /// The suite request did not specify anything to discover.
    #[error("suite `{suite}` has no discovery selectors and is misconfigured")]
    NoDiscoverySelectors {
        /// The name of the suite.
        suite: String,
    },

    /// The execution engine reported events in an order that doesn't describe a tree.
    ///
    /// Only returned if `strict-event-order` is enabled.
    #[error(
        "execution engine reported events out of order while running suite `{suite}`:\n{}",
        .violations.iter().map(|v| format!("  - {v}")).join("\n"),
    )]
    EventOrder {
        /// The name of the outermost suite.
        suite: String,

        /// The violations observed.
        violations: Vec<EventOrderViolation>,
    },
}

/// A callback from the execution engine that didn't fit the tree built so far.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventOrderViolation {
    /// An event needed a current container, but none was open.
    NoCurrentContainer {
        /// The identifier in the event.
        unique_id: UniqueId,
    },

    /// A second engine root started after the first one finished.
    TopContainerAlreadySet {
        /// The identifier of the second root.
        unique_id: UniqueId,
    },

    /// The parent of an identifier is not the current container.
    ParentMismatch {
        /// The identifier in the event.
        unique_id: UniqueId,

        /// The current container, if any.
        expected: Option<UniqueId>,

        /// The parent reported by the engine.
        actual: UniqueId,
    },

    /// A container finished while a different container was current.
    UnexpectedFinish {
        /// The container that finished.
        unique_id: UniqueId,

        /// The current container.
        current: UniqueId,
    },

    /// An inner suite started without a test factory and class above it.
    NoFlattenAncestor {
        /// The engine root of the inner suite.
        unique_id: UniqueId,
    },
}

impl fmt::Display for EventOrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventOrderViolation::NoCurrentContainer { unique_id } => {
                write!(f, "event for `{unique_id}` with no current container")
            }
            EventOrderViolation::TopContainerAlreadySet { unique_id } => {
                write!(f, "`{unique_id}` started after the top container finished")
            }
            EventOrderViolation::ParentMismatch {
                unique_id,
                expected: Some(expected),
                actual,
            } => write!(
                f,
                "`{unique_id}` has parent `{actual}`, but the current container is `{expected}`"
            ),
            EventOrderViolation::ParentMismatch {
                unique_id,
                expected: None,
                actual,
            } => write!(
                f,
                "`{unique_id}` has parent `{actual}`, but no container is current"
            ),
            EventOrderViolation::UnexpectedFinish { unique_id, current } => write!(
                f,
                "`{unique_id}` finished while `{current}` was the current container"
            ),
            EventOrderViolation::NoFlattenAncestor { unique_id } => write!(
                f,
                "inner suite root `{unique_id}` has no enclosing class to attach to"
            ),
        }
    }
}

/// The outcome of replaying a test result that was not a success.
///
/// Returned by [`DynamicTest::execute`](crate::dynamic::DynamicTest::execute).
#[derive(Clone, Debug, Error)]
pub enum ReplayError {
    /// The test failed. This is the cause originally reported by the engine.
    #[error("{0}")]
    Failed(Cause),

    /// The test was aborted or skipped. This is the cause originally reported by the engine.
    #[error("aborted: {0}")]
    Aborted(Cause),

    /// The test did not succeed, but no cause was recorded.
    #[error("test was {status}, but no cause was recorded")]
    Inconsistent {
        /// The recorded status.
        status: Status,
    },
}

impl ReplayError {
    /// Returns the cause reported by the engine, if any.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            ReplayError::Failed(cause) | ReplayError::Aborted(cause) => Some(cause),
            ReplayError::Inconsistent { .. } => None,
        }
    }
}

/// The cause recorded for a test the engine skipped instead of running.
#[derive(Clone, Debug, Error)]
#[error("{reason}")]
pub struct TestAbortedError {
    reason: String,
}

impl TestAbortedError {
    /// Creates a new `TestAbortedError` with the skip reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason the test was skipped.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// An error that occurs while parsing a [`TestFilter`](crate::request::TestFilter).
#[derive(Clone, Debug, Error)]
#[error("invalid class name pattern `{pattern}`")]
pub struct FilterParseError {
    pattern: String,
    #[source]
    err: regex::Error,
}

impl FilterParseError {
    pub(crate) fn new(pattern: impl Into<String>, err: regex::Error) -> Self {
        Self {
            pattern: pattern.into(),
            err,
        }
    }
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error(
    "failed to parse dynsuite config{}",
    .config_file.as_ref().map(|file| format!(" at `{file}`")).unwrap_or_default(),
)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, err: ConfigError) -> Self {
        Self { config_file, err }
    }

    /// Returns the config file that failed to parse, or `None` for the default config.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }
}

/// An error that occurred while writing a JUnit report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteJunitError {
    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}

/// Displays an error along with the chain of errors that caused it.
pub(crate) struct DisplayErrorChain<'a> {
    error: &'a (dyn StdError + 'a),
}

impl<'a> DisplayErrorChain<'a> {
    pub(crate) fn new(error: &'a (dyn StdError + 'a)) -> Self {
        Self { error }
    }
}

impl fmt::Display for DisplayErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        if source.is_some() {
            write!(f, "\ncaused by:")?;
        }
        while let Some(error) = source {
            write!(f, "\n  - {error}")?;
            source = error.source();
        }

        Ok(())
    }
}
