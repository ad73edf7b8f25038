// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The boundary with the execution engine.
//!
//! dynsuite doesn't discover or run tests itself. An [`ExecutionEngine`] does that, and reports
//! what happens to a [`TestExecutionListener`].

use crate::{identifier::TestIdentifier, request::DiscoveryRequest, result::TestExecutionResult};
use std::sync::Arc;

/// Receives events from an [`ExecutionEngine`].
///
/// For every container the engine reports `execution_started`, then events for its children, then
/// `execution_finished`. A test is reported either as started and then finished, or only as
/// skipped.
pub trait TestExecutionListener: Send + Sync {
    /// A container or test started.
    fn execution_started(&self, identifier: &TestIdentifier) {
        let _ = identifier;
    }

    /// A container or test finished.
    fn execution_finished(&self, identifier: &TestIdentifier, result: &TestExecutionResult) {
        let _ = (identifier, result);
    }

    /// A container or test was skipped without being started.
    fn execution_skipped(&self, identifier: &TestIdentifier, reason: &str) {
        let _ = (identifier, reason);
    }
}

/// Discovers and executes tests, reporting to a listener.
pub trait ExecutionEngine {
    /// Discovers everything the request selects, applies its filters, and runs the result.
    ///
    /// Events must be delivered to `listener` one at a time. Dynamic test factories invoked
    /// during the run must be given [`DiscoveryRequest::context`].
    fn execute(&self, request: &DiscoveryRequest, listener: &dyn TestExecutionListener);
}

impl<T: ExecutionEngine + ?Sized> ExecutionEngine for &T {
    fn execute(&self, request: &DiscoveryRequest, listener: &dyn TestExecutionListener) {
        (**self).execute(request, listener)
    }
}

impl<T: ExecutionEngine + ?Sized> ExecutionEngine for Box<T> {
    fn execute(&self, request: &DiscoveryRequest, listener: &dyn TestExecutionListener) {
        (**self).execute(request, listener)
    }
}

impl<T: ExecutionEngine + ?Sized> ExecutionEngine for Arc<T> {
    fn execute(&self, request: &DiscoveryRequest, listener: &dyn TestExecutionListener) {
        (**self).execute(request, listener)
    }
}
