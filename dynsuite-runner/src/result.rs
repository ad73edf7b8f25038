// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Results reported by an execution engine when a container or test finishes.

use crate::errors::TestAbortedError;
use std::{error::Error, fmt, sync::Arc};

/// The cause of a failed or aborted container or test.
///
/// Causes are shared rather than cloned, so a replayed failure is the very same error the engine
/// reported.
pub type Cause = Arc<dyn Error + Send + Sync + 'static>;

/// The status of a finished container or test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// Execution succeeded.
    Successful,

    /// Execution started but was aborted, for example because a precondition did not hold.
    Aborted,

    /// Execution failed.
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Successful => write!(f, "successful"),
            Status::Aborted => write!(f, "aborted"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// The result of executing a container or test.
#[derive(Clone, Debug)]
pub struct TestExecutionResult {
    status: Status,
    cause: Option<Cause>,
}

impl TestExecutionResult {
    /// Creates a successful result.
    pub fn successful() -> Self {
        Self {
            status: Status::Successful,
            cause: None,
        }
    }

    /// Creates an aborted result.
    pub fn aborted(cause: Option<Cause>) -> Self {
        Self {
            status: Status::Aborted,
            cause,
        }
    }

    /// Creates a failed result.
    pub fn failed(cause: Option<Cause>) -> Self {
        Self {
            status: Status::Failed,
            cause,
        }
    }

    /// Creates the aborted result recorded for a test the engine skipped.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::aborted(Some(Arc::new(TestAbortedError::new(reason))))
    }

    /// Returns the status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the cause, if one was recorded.
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Returns true if the status is [`Status::Successful`].
    pub fn is_successful(&self) -> bool {
        self.status == Status::Successful
    }
}

impl fmt::Display for TestExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({cause})", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}
