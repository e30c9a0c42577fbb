// src/bin/kj-stress.rs

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use kj_stress::cli::{Cli, run};

/// A timer that writes nothing, keeping log lines free of timestamps.
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(
        &self,
        _w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        Ok(())
    }
}

fn main() -> ExitCode {
    // Logging is off unless KJ_STRESS_LOG holds a filter directive.
    if let Ok(filter) = EnvFilter::try_from_env("KJ_STRESS_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(NoTimestamp)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }

    let cli = Cli::parse();
    run(&cli)
}
