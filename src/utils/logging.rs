// src/utils/logging.rs
//! Logging configuration and utilities
//!
//! Every participant and solve worker runs on a thread named after the
//! participant, so log lines carry the thread name next to the source
//! location:
//!
//! ```text
//! [1718000000123 INFO Minnie sudoku_miner_rs::miner::engine:201] Minnie: found proof for block 3 in 84 ms
//! ```
//!
//! Uses `env_logger` under the hood; `RUST_LOG` overrides the default level.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes logging for simulations and one-shot commands
///
/// # Configuration
/// - Logs to stdout
/// - Default log level: Info
/// - Respects `RUST_LOG` environment variable if set
///
/// Calling it more than once is harmless.
pub fn init_logging() {
    init_with_default(LevelFilter::Info);
}

/// Initializes logging for benchmarks
///
/// Same format as [`init_logging`], Debug by default so per-thread
/// progress is visible.
pub fn init_bench_logging() {
    init_with_default(LevelFilter::Debug);
}

fn init_with_default(default: LevelFilter) {
    let mut builder = common_log_config();

    match env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder.filter_level(default);
        }
    }

    // A second initialization (tests, repeated subcommands) keeps the first logger.
    let _ = builder.try_init();
}

/// Creates a logger builder with the shared line format
///
/// `[<ms since epoch> <LEVEL> <thread> <module>:<line>] <message>`, written to
/// stdout. Unnamed threads show as `main`.
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_millis();
            let thread = std::thread::current();
            let thread_name = thread.name().unwrap_or("main");

            writeln!(
                buf,
                "[{} {} {} {}:{}] {}",
                ts,
                record.level(),
                thread_name,
                record.module_path().unwrap_or_default(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
