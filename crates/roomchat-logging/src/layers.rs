//! Layer construction for console and file output
//!
//! Every layer is boxed against the bare [`Registry`] so that any
//! combination of outputs can be stacked in a single `Vec` without a
//! match arm per combination.

use std::fs::{self, File};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{Layer, Registry};

use crate::config::{ConsoleConfig, FileConfig, JsonlConfig, RotationStrategy};
use crate::error::LogResult;

/// A type-erased layer over the base registry
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Create the console layer. Output goes to stderr.
pub fn console_layer(console: &ConsoleConfig, jsonl: &JsonlConfig) -> BoxedLayer {
    if console.pretty {
        tracing_subscriber::fmt::layer()
            .with_ansi(console.ansi)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        jsonl_layer(std::io::stderr, jsonl)
    }
}

/// Create a JSONL formatting layer writing to `writer`
///
/// This configures tracing-subscriber's JSON formatter with settings
/// suited to log aggregation systems.
pub fn jsonl_layer<W>(writer: W, jsonl: &JsonlConfig) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(jsonl.include_spans)
        .flatten_event(jsonl.flatten_events)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
        .boxed()
}

/// Open the non-blocking file writer described by `file`
///
/// `Never` truncates a single `<prefix>.log`; the other strategies append
/// to a rolling appender.
pub fn file_writer(file: &FileConfig) -> LogResult<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&file.directory)?;

    let writer = match file.rotation {
        RotationStrategy::Never => {
            let path = file.directory.join(format!("{}.log", file.prefix));
            tracing_appender::non_blocking(File::create(path)?)
        }
        RotationStrategy::Daily => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::DAILY,
            &file.directory,
            &file.prefix,
        )),
        RotationStrategy::Hourly => tracing_appender::non_blocking(RollingFileAppender::new(
            Rotation::HOURLY,
            &file.directory,
            &file.prefix,
        )),
    };

    Ok(writer)
}
