//! Logging setup.
//!
//! Console output through `tracing`, plus an append-mode file log under the
//! platform data directory. Third-party HTTP crates are quieted unless
//! `RUST_LOG` says otherwise.

use std::fs::{self, File, OpenOptions};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "datapilot={level},datapilot_core={level},hyper=warn,reqwest=warn,ureq=warn"
        ))
    });

    let file_layer = log_file().map(|file| fmt::layer().with_ansi(false).with_writer(Arc::new(file)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
}

fn log_file() -> Option<File> {
    let dir = dirs::data_dir()?.join("datapilot").join("logs");
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("datapilot.log"))
        .ok()
}
