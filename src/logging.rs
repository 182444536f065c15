// src/logging.rs

use std::io::Write;

use chrono::Local;
use log::LevelFilter;

/// Install the global logger. Every line is prefixed with the local wall-clock time.
///
/// `level` wins over `RUST_LOG`; both fall back to `info`. Calling this twice is harmless
/// (the second call is ignored), which keeps integration tests simple.
pub fn init_logging(level: Option<&str>) {
    let log_level = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(LevelFilter::Info);

    let _ = env_logger::Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "{}  [{:5}] {}",
                Local::now().format("%H:%M"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}
