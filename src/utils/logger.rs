use crate::config::LoggingConfig;

/// Initialize a non-blocking logger, to stdout or to an hourly rotated file.
pub fn init_logger(config: &LoggingConfig) -> tracing_appender::non_blocking::WorkerGuard {
    // guard must be held to flush logs on shutdown.
    let (non_blocking, guard) = match config {
        LoggingConfig::Console => tracing_appender::non_blocking(std::io::stdout()),
        LoggingConfig::File {
            directory,
            filename,
        } => tracing_appender::non_blocking(tracing_appender::rolling::hourly(
            directory, filename,
        )),
    };

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(matches!(config, LoggingConfig::Console))
        .init();

    guard
}
