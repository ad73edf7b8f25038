// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replaying results that were recorded while the engine ran.
//!
//! Every test in a suite has already run once by the time the tree is rendered. Rather than run
//! it again, the rendered test returns the original result: nothing for a success, the original
//! cause for a failure or abort.

use crate::{
    errors::ReplayError,
    identifier::{TestIdentifier, UniqueId},
    result::{Status, TestExecutionResult},
};

/// The recorded outcome of a test that has already run.
#[derive(Clone, Debug)]
pub struct TestOutcome {
    unique_id: UniqueId,
    display_name: String,
    source_uri: Option<String>,
    result: TestExecutionResult,
}

impl TestOutcome {
    /// Records the outcome of a test. `display_name` is the name to show when replaying.
    pub fn new(
        identifier: &TestIdentifier,
        display_name: impl Into<String>,
        result: TestExecutionResult,
    ) -> Self {
        Self {
            unique_id: identifier.unique_id.clone(),
            display_name: display_name.into(),
            source_uri: identifier.source_uri(),
            result,
        }
    }

    /// Returns the unique ID of the test.
    pub fn unique_id(&self) -> &UniqueId {
        &self.unique_id
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the source URI.
    pub fn source_uri(&self) -> Option<&str> {
        self.source_uri.as_deref()
    }

    /// Returns the recorded result.
    pub fn result(&self) -> &TestExecutionResult {
        &self.result
    }

    /// Replays the recorded result.
    pub fn replay(&self) -> Result<(), ReplayError> {
        replay(&self.result)
    }
}

/// Reproduces a recorded result without running anything.
///
/// A recorded cause is always returned as is, wrapped according to the status. A non-successful
/// result without a cause is reported as [`ReplayError::Inconsistent`].
pub fn replay(result: &TestExecutionResult) -> Result<(), ReplayError> {
    match (result.status(), result.cause()) {
        (Status::Aborted, Some(cause)) => Err(ReplayError::Aborted(cause.clone())),
        (_, Some(cause)) => Err(ReplayError::Failed(cause.clone())),
        (Status::Successful, None) => Ok(()),
        (status, None) => Err(ReplayError::Inconsistent { status }),
    }
}
