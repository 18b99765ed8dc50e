/*
 *   Copyright (c) 2024 R3BL LLC
 *   All rights reserved.
 *
 *   Licensed under the Apache License, Version 2.0 (the "License");
 *   you may not use this file except in compliance with the License.
 *   You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 *   Unless required by applicable law or agreed to in writing, software
 *   distributed under the License is distributed on an "AS IS" BASIS,
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *   See the License for the specific language governing permissions and
 *   limitations under the License.
 */

use std::{fmt::Debug, path::PathBuf};

use tracing_core::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::SharedPrinter;

/// Configure the tracing logging to suit your needs. You can display the logs to a
/// file, to `stdout`, `stderr`, or a [`SharedPrinter`] (so that log lines don't clobber
/// the line being edited), or both a display and a file.
#[derive(Debug)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level: tracing::Level,
}

/// The `String` payloads are the file path and prefix to use for the log file. Eg:
/// `/tmp/termline` or `termline_debug`.
#[derive(Debug, Clone)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    File(String),
    DisplayAndFile(DisplayPreference, String),
}

#[derive(Clone)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
    SharedPrinter(SharedPrinter),
}

impl Debug for DisplayPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayPreference::Stdout => write!(f, "Stdout"),
            DisplayPreference::Stderr => write!(f, "Stderr"),
            DisplayPreference::SharedPrinter(_) => write!(f, "SharedPrinter"),
        }
    }
}

impl TracingConfig {
    /// The default configuration: log to both the given [DisplayPreference] and a file.
    pub fn new_file_and_display(
        filename: Option<String>,
        preferred_display: DisplayPreference,
    ) -> Self {
        Self {
            writer_config: WriterConfig::DisplayAndFile(
                preferred_display,
                filename.unwrap_or_else(|| "tracing_log_file_debug.log".to_string()),
            ),
            level: tracing::Level::DEBUG,
        }
    }

    pub fn new_display(preferred_display: DisplayPreference) -> Self {
        Self {
            writer_config: WriterConfig::Display(preferred_display),
            level: tracing::Level::DEBUG,
        }
    }

    pub fn new_file(filename: Option<String>) -> Self {
        Self {
            writer_config: WriterConfig::File(
                filename.unwrap_or_else(|| "tracing_log_file_debug.log".to_string()),
            ),
            level: tracing::Level::DEBUG,
        }
    }

    pub fn get_level_filter(&self) -> LevelFilter {
        tracing_subscriber::filter::LevelFilter::from_level(self.level)
    }
}

pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer.
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_thread_ids(true)
            .with_thread_names(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true)
    };
}

/// Initialize the tracing system with the provided [TracingConfig].
pub fn init_tracing(tracing_config: TracingConfig) -> miette::Result<()> {
    try_create_layers(tracing_config)
        .map(|layers| tracing_subscriber::registry().with(layers).init())
}

/// Returns the layers. This does not initialize the tracing system; don't forget to do
/// that manually by calling `init` on the returned layers.
pub fn try_create_layers(
    tracing_config: TracingConfig,
) -> miette::Result<Vec<Box<DynLayer<tracing_subscriber::Registry>>>> {
    let level_filter = tracing_config.get_level_filter();

    let mut layers: Vec<Box<DynLayer<tracing_subscriber::Registry>>> = vec![];

    // Set the level filter from the tracing configuration. This is needed if you add
    // more layers which don't have a level filter of their own.
    layers.push(Box::new(level_filter));

    match tracing_config.writer_config {
        WriterConfig::None => {}
        WriterConfig::Display(preferred_display) => {
            layers.push(create_display_layer(level_filter, preferred_display));
        }
        WriterConfig::File(path_and_prefix) => {
            layers.push(try_create_file_layer(level_filter, &path_and_prefix)?);
        }
        WriterConfig::DisplayAndFile(preferred_display, path_and_prefix) => {
            layers.push(create_display_layer(level_filter, preferred_display));
            layers.push(try_create_file_layer(level_filter, &path_and_prefix)?);
        }
    }

    Ok(layers)
}

fn create_display_layer(
    level_filter: LevelFilter,
    preferred_display: DisplayPreference,
) -> Box<DynLayer<tracing_subscriber::Registry>> {
    let fmt_layer = create_fmt!();
    match preferred_display {
        DisplayPreference::Stdout => Box::new(
            fmt_layer
                .with_writer(std::io::stdout)
                .with_filter(level_filter),
        ),
        DisplayPreference::Stderr => Box::new(
            fmt_layer
                .with_writer(std::io::stderr)
                .with_filter(level_filter),
        ),
        DisplayPreference::SharedPrinter(shared_printer) => {
            let tracing_writer = move || -> Box<dyn std::io::Write> {
                Box::new(shared_printer.clone())
            };
            Box::new(fmt_layer.with_writer(tracing_writer).with_filter(level_filter))
        }
    }
}

fn try_create_file_layer(
    level_filter: LevelFilter,
    path_and_prefix: &str,
) -> miette::Result<Box<DynLayer<tracing_subscriber::Registry>>> {
    let file = try_create_rolling_file_appender(path_and_prefix)?;
    let fmt_layer = create_fmt!();
    Ok(Box::new(fmt_layer.with_writer(file).with_filter(level_filter)))
}

/// Note that wrapping this up in a [tracing_appender::non_blocking] writer does not
/// work; the appender is used directly.
pub fn try_create_rolling_file_appender(
    path_str: &str,
) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let path = PathBuf::from(path_str);

    let parent = path.parent().ok_or_else(|| {
        miette::miette!(
            "Can't access current folder {}. It might not exist, or don't have required permissions.",
            path.display()
        )
    })?;

    let file_stem = path.file_name().ok_or_else(|| {
        miette::miette!(
            "Can't access file name {}. It might not exist, or don't have required permissions.",
            path.display()
        )
    })?;

    Ok(tracing_appender::rolling::never(parent, file_stem))
}
