use std::path::{Path, PathBuf};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialise logging. The level is `info` unless debug logging is enabled in
/// the settings file, in which case it defaults to `debug` and can be
/// overridden via the `RUST_LOG` environment variable.
///
/// When `log_file` is set every record is also appended to that file. Release
/// builds run without a console, so the file is the only place startup
/// failures end up.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // Ignore `RUST_LOG` unless debug logging was asked for explicitly so a
    // stray variable in the user's environment does not flood the log.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let file_layer = log_file.as_deref().and_then(split_log_path).map(|(dir, name)| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(tracing_appender::rolling::never(dir, name))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
}

fn split_log_path(path: &Path) -> Option<(PathBuf, PathBuf)> {
    let name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, PathBuf::from(name)))
}
