//! CLI surface, built with clap 4's derive API.

use chat_flux::logging::{LogConfig, LogFormat};
use clap::{Parser, ValueEnum};
use sloggers::types::Severity;

#[derive(Parser, Debug)]
#[command(name = "chat-server", about = "Multi-user line-protocol chat server")]
pub struct Cli {
    /// TCP port to listen on.
    pub port: u16,

    /// Address to bind. Loopback-only is the supported configuration; this
    /// stays a flag (rather than hardcoded) so tests can target a specific
    /// loopback alias.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    #[arg(long, value_enum, default_value_t = CliLogLevel::Info)]
    pub log_level: CliLogLevel,

    #[arg(long, value_enum, default_value_t = CliLogFormat::Terminal)]
    pub log_format: CliLogFormat,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum CliLogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum CliLogFormat {
    Terminal,
    Json,
}

impl Cli {
    pub fn log_config(&self) -> LogConfig {
        let level = match self.log_level {
            CliLogLevel::Trace => Severity::Trace,
            CliLogLevel::Debug => Severity::Debug,
            CliLogLevel::Info => Severity::Info,
            CliLogLevel::Warning => Severity::Warning,
            CliLogLevel::Error => Severity::Error,
            CliLogLevel::Critical => Severity::Critical,
        };
        let format = match self.log_format {
            CliLogFormat::Terminal => LogFormat::Terminal,
            CliLogFormat::Json => LogFormat::Json,
        };
        LogConfig { level, format }
    }
}
