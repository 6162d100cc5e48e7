//! Structured logging: the binary crate wires the level and sink format in
//! from its CLI via `LogConfig`; everything else just takes a `&slog::Logger`.

pub use slog::{debug, info, o, warn, Logger};

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    pub level: Severity,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: Severity::Info,
            format: LogFormat::Terminal,
        }
    }
}

/// Build the root logger for the process. A sink-construction failure is not
/// recoverable, so this unwraps rather than threading it through `ChatError`.
pub fn init(config: LogConfig) -> Logger {
    match config.format {
        LogFormat::Terminal => {
            let mut builder = TerminalLoggerBuilder::new();
            builder.level(config.level);
            builder.destination(Destination::Stderr);
            builder.build().expect("failed to build terminal logger")
        }
        LogFormat::Json => {
            let mut builder = sloggers::json::JsonLoggerBuilder::new();
            builder.level(config.level);
            builder.destination(Destination::Stderr);
            builder.build().expect("failed to build json logger")
        }
    }
}
