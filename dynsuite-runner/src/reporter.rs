// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generates JUnit XML reports from rendered dynamic nodes.
//!
//! Every top-level container becomes a test suite. Containers nested within it are flattened into
//! the classname of the test cases they hold, with display names joined by `/`.

use crate::{
    config::JunitConfig,
    dynamic::{DynamicContainer, DynamicNode, DynamicTest},
    errors::{DisplayErrorChain, ReplayError, TestAbortedError, WriteJunitError},
};
use camino::Utf8Path;
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::fs::File;
use tracing::debug;

/// Builds JUnit reports by replaying dynamic tests.
#[derive(Clone, Debug)]
pub struct JunitExporter {
    report_name: String,
}

impl JunitExporter {
    /// Creates a new exporter.
    pub fn new(config: &JunitConfig) -> Self {
        Self {
            report_name: config.report_name().to_owned(),
        }
    }

    /// Consumes `nodes`, executing every test exactly once, and returns the report.
    pub fn export(&self, nodes: impl IntoIterator<Item = DynamicNode>) -> Report {
        let mut test_suites: IndexMap<String, TestSuite> = IndexMap::new();

        for node in nodes {
            match node {
                DynamicNode::Container(container) => {
                    let name = container.display_name().to_owned();
                    let test_suite = test_suites.entry(name.clone()).or_insert_with(|| {
                        let mut test_suite = TestSuite::new(name.clone());
                        if let Some(uri) = container.source_uri() {
                            test_suite.add_property(("source", uri));
                        }
                        test_suite
                    });
                    add_container(test_suite, &name, container);
                }
                DynamicNode::Test(test) => {
                    // Tests outside of any container are grouped under the report name.
                    let test_suite = test_suites
                        .entry(self.report_name.clone())
                        .or_insert_with(|| TestSuite::new(self.report_name.clone()));
                    test_suite.add_test_case(test_case(&self.report_name, &test));
                }
            }
        }

        debug!(
            "exporting {} test suites to JUnit report `{}`",
            test_suites.len(),
            self.report_name
        );
        let mut report = Report::new(self.report_name.clone());
        report.add_test_suites(test_suites.into_values());
        report
    }

    /// Writes `report` to `path`, creating parent directories as needed.
    pub fn write_to_path(report: &Report, path: &Utf8Path) -> Result<(), WriteJunitError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteJunitError::Fs {
                file: dir.to_path_buf(),
                error,
            })?;
        }

        let f = File::create(path).map_err(|error| WriteJunitError::Fs {
            file: path.to_path_buf(),
            error,
        })?;
        report
            .serialize(f)
            .map_err(|error| WriteJunitError::Junit {
                file: path.to_path_buf(),
                error,
            })
    }
}

fn add_container(test_suite: &mut TestSuite, classname: &str, container: DynamicContainer) {
    for child in container.into_children() {
        match child {
            DynamicNode::Container(nested) => {
                let nested_classname = format!("{classname}/{}", nested.display_name());
                add_container(test_suite, &nested_classname, nested);
            }
            DynamicNode::Test(test) => {
                test_suite.add_test_case(test_case(classname, &test));
            }
        }
    }
}

fn test_case(classname: &str, test: &DynamicTest) -> TestCase {
    let status = match test.execute() {
        Ok(()) => TestCaseStatus::success(),
        Err(ReplayError::Failed(cause)) => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
            status
                .set_message(cause.to_string())
                .set_type("test failure")
                .set_description(DisplayErrorChain::new(&*cause).to_string());
            status
        }
        Err(ReplayError::Aborted(cause)) => {
            let message = match cause.downcast_ref::<TestAbortedError>() {
                Some(aborted) => aborted.reason().to_owned(),
                None => cause.to_string(),
            };
            let mut status = TestCaseStatus::skipped();
            status.set_message(message);
            status
        }
        Err(error @ ReplayError::Inconsistent { .. }) => {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Error);
            status
                .set_message(error.to_string())
                .set_type("inconsistent result");
            status
        }
    };

    let mut test_case = TestCase::new(test.display_name(), status);
    test_case.set_classname(classname);
    test_case
}
