use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE: &str = "chatlist.log";

/// Install the global subscriber once per process: stderr plus a log file in the data
/// dir. Filter comes from `RUST_LOG`, default `info`. If the host already installed a
/// subscriber, that one stays.
pub(crate) fn init_logging(data_dir: &str) {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let file_layer = open_log_file(data_dir).map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
        });

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(file_layer)
            .try_init();
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}

fn open_log_file(data_dir: &str) -> Option<std::fs::File> {
    let dir = Path::new(data_dir);
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("chatlist: cannot create log dir {}: {e}", dir.display());
        return None;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))
        .ok()
}
