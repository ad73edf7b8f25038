// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup for binaries and test harnesses embedding dynsuite.
//!
//! dynsuite logs through [`tracing`]. Libraries don't install subscribers on their own, so a host
//! that wants to see these logs either installs its own subscriber or calls [`init_logging`].

use std::{fmt, sync::Once};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable holding the log filter, in the syntax of [`Targets`].
pub const LOG_ENV: &str = "DYNSUITE_LOG";

static INIT_LOGGER: Once = Once::new();

/// Installs a stderr logger filtered by [`LOG_ENV`], defaulting to `info`.
///
/// Only the first call has any effect. If another global subscriber is already installed, it is
/// left in place.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let (targets, parse_error) = targets_from_env(std::env::var_os(LOG_ENV));

        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter)
            .with_writer(std::io::stderr)
            .with_filter(targets);

        if tracing_subscriber::registry().with(layer).try_init().is_ok()
            && let Some(error) = parse_error
        {
            tracing::warn!("ignoring invalid {LOG_ENV}: {error}");
        }
    });
}

fn targets_from_env(value: Option<std::ffi::OsString>) -> (Targets, Option<String>) {
    let default = || Targets::new().with_default(LevelFilter::INFO);
    let Some(value) = value else {
        return (default(), None);
    };
    let Ok(value) = value.into_string() else {
        return (default(), Some("value is not UTF-8".to_owned()));
    };

    // If the level string is empty, use the standard level filter instead.
    if value.is_empty() {
        return (default(), None);
    }
    match value.parse::<Targets>() {
        Ok(targets) => (targets, None),
        Err(error) => (default(), Some(format!("`{value}`: {error}"))),
    }
}

struct SimpleFormatter;

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let level = match *metadata.level() {
            Level::ERROR => "error",
            Level::WARN => "warning",
            Level::INFO => "info",
            Level::DEBUG => "debug",
            Level::TRACE => "trace",
        };
        write!(writer, "{level}: ")?;

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            // Show other fields for debug or trace output.
            show_other: *metadata.level() >= Level::DEBUG,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    show_other: bool,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let result = if field.name() == MESSAGE_FIELD {
            write!(self.writer, "{value:?}")
        } else if self.show_other {
            write!(self.writer, "; {} = {:?}", field.name(), value)
        } else {
            Ok(())
        };
        if let Err(error) = result {
            self.error = Some(error);
        }
    }
}
