// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for dynsuite.
//!
//! The main structure in this module is [`DynsuiteConfig`]. It is read from the embedded default
//! config, with an optional TOML file layered on top.

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Overall configuration for dynsuite.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DynsuiteConfig {
    replay: ReplayConfig,
    tree: TreeConfig,
    junit: JunitConfig,
}

impl DynsuiteConfig {
    /// The default location of the config within a project, relative to its root.
    pub const CONFIG_PATH: &'static str = ".config/dynsuite.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Configuration read from a file is layered on top of this.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, layered on top of the default config.
    ///
    /// If `config_file` is `None`, the default config is returned. Unknown keys are logged and
    /// otherwise ignored.
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }

        let config_file = config_file.map(Utf8Path::to_path_buf);
        let config = builder
            .build()
            .map_err(|err| ConfigParseError::new(config_file.clone(), err))?;

        let mut unknown = BTreeSet::new();
        let deserialized: DynsuiteConfigDeserialize =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })
            .map_err(|err| ConfigParseError::new(config_file.clone(), err))?;

        if !unknown.is_empty() {
            warn!(
                "ignoring unknown configuration keys in {}: {}",
                config_file.as_deref().map_or("default config", Utf8Path::as_str),
                unknown.iter().join(", "),
            );
        }

        Ok(deserialized.into())
    }

    /// Reads the config from [`Self::CONFIG_PATH`] within `root`, if that file exists.
    pub fn from_project_root(root: &Utf8Path) -> Result<Self, ConfigParseError> {
        let config_file: Utf8PathBuf = root.join(Self::CONFIG_PATH);
        if config_file.is_file() {
            Self::from_sources(Some(&config_file))
        } else {
            Self::from_sources(None)
        }
    }

    /// Returns the replay configuration.
    pub fn replay(&self) -> &ReplayConfig {
        &self.replay
    }

    /// Returns the tree configuration.
    pub fn tree(&self) -> &TreeConfig {
        &self.tree
    }

    /// Returns the JUnit configuration.
    pub fn junit(&self) -> &JunitConfig {
        &self.junit
    }

    /// Sets whether engine events out of order cause execution to fail.
    pub fn set_strict_event_order(&mut self, strict: bool) -> &mut Self {
        self.tree.strict_event_order = strict;
        self
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }
}

/// How replayed tests are named.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ReplayConfig {
    prefix_container_name: bool,
    separator: String,
}

impl ReplayConfig {
    #[cfg(test)]
    pub(crate) fn new(prefix_container_name: bool, separator: &str) -> Self {
        Self {
            prefix_container_name,
            separator: separator.to_owned(),
        }
    }

    /// Returns true if test names are prefixed with the name of their container.
    pub fn prefix_container_name(&self) -> bool {
        self.prefix_container_name
    }

    /// Returns the separator between container and test names.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns the display name for a test within a container.
    pub fn display_name(&self, container_name: &str, test_name: &str) -> String {
        if self.prefix_container_name {
            format!("{container_name}{}{test_name}", self.separator)
        } else {
            test_name.to_owned()
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            prefix_container_name: true,
            separator: ".".to_owned(),
        }
    }
}

/// How the container tree is built.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TreeConfig {
    prune_empty_containers: bool,
    strict_event_order: bool,
}

impl TreeConfig {
    /// Returns true if containers that end up empty are removed.
    pub fn prune_empty_containers(&self) -> bool {
        self.prune_empty_containers
    }

    /// Returns true if events out of order fail the execution.
    pub fn strict_event_order(&self) -> bool {
        self.strict_event_order
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            prune_empty_containers: true,
            strict_event_order: false,
        }
    }
}

/// JUnit report configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct JunitConfig {
    report_name: String,
}

impl JunitConfig {
    /// Returns the name of the JUnit report.
    pub fn report_name(&self) -> &str {
        &self.report_name
    }
}

impl Default for JunitConfig {
    fn default() -> Self {
        Self {
            report_name: "dynsuite-run".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DynsuiteConfigDeserialize {
    replay: ReplayConfig,
    tree: TreeConfig,
    junit: JunitConfig,
}

impl From<DynsuiteConfigDeserialize> for DynsuiteConfig {
    fn from(value: DynsuiteConfigDeserialize) -> Self {
        Self {
            replay: value.replay,
            tree: value.tree,
            junit: value.junit,
        }
    }
}
