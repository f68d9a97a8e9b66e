//! Console and log file output through `tracing`.

use std::path::Path;

use chrono::Local;
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};


/// Initializes the global `tracing` subscriber with two outputs:
/// - the console (stderr), filtered by `console_level_filter`, and
/// - a log file in `log_file_output_directory`, filtered by `log_file_level_filter`.
///
/// The log file name is `{log_file_name_prefix}_{timestamp}.log`.
///
/// The returned guard must be held for as long as logging should work;
/// dropping it flushes the file writer.
pub fn initialize_tracing<P>(
    console_level_filter: EnvFilter,
    log_file_level_filter: EnvFilter,
    log_file_output_directory: P,
    log_file_name_prefix: &str,
) -> Result<WorkerGuard>
where
    P: AsRef<Path>,
{
    let log_file_output_directory = log_file_output_directory.as_ref();

    std::fs::create_dir_all(log_file_output_directory)
        .into_diagnostic()
        .wrap_err_with(|| {
            miette!(
                "Failed to create log file output directory at {}.",
                log_file_output_directory.display()
            )
        })?;


    let log_file_name = format!(
        "{}_{}.log",
        log_file_name_prefix,
        Local::now().format("%Y-%m-%d_%H-%M-%S")
    );

    let file_appender = tracing_appender::rolling::never(log_file_output_directory, log_file_name);
    let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);


    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_level_filter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file_writer)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_filter(log_file_level_filter);


    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .into_diagnostic()
        .wrap_err("Failed to install global tracing subscriber.")?;

    Ok(guard)
}
