// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Runs a dynamic test suite through an execution engine and replays the results as a tree of
//! dynamic test nodes.
//!
//! The basic flow is:
//!
//! 1. A [`SuiteRequest`](request::SuiteRequest) describes what to discover and which filters to
//!    apply.
//! 2. A [`DynamicSuiteExecutor`](executor::DynamicSuiteExecutor) turns it into a
//!    [`DiscoveryRequest`](request::DiscoveryRequest) and hands it to an
//!    [`ExecutionEngine`](engine::ExecutionEngine).
//! 3. The engine reports start, finish and skip events, from which a container tree is built.
//!    Suites executed from within a running suite are spliced into the outer tree.
//! 4. The outermost execution renders the tree as [`DynamicNode`](dynamic::DynamicNode)s. Each
//!    test node replays the recorded result instead of running the test again.

pub mod config;
pub mod dynamic;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod identifier;
mod listener;
pub mod output;
pub mod replay;
pub mod reporter;
pub mod request;
pub mod result;
mod tree;
