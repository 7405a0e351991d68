use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Tick rate, i.e. number of ticks per second
    #[arg(short, long, value_name = "FLOAT", default_value_t = 4.0)]
    pub tick_rate: f64,

    /// Frame rate, i.e. number of frames per second
    #[arg(short, long, value_name = "FLOAT", default_value_t = 60.0)]
    pub frame_rate: f64,

    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Field schema to offer in the option lists (.json5, .json, .toml or .yaml)
    #[arg(long = "schema", value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Enable file logging at the given level (overridden by RUST_LOG)
    #[arg(long = "logging", value_enum)]
    pub logging: Option<LogLevel>,

    /// Print the query as JSON when the bar closes
    #[arg(long)]
    pub print: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["querybar"]).unwrap();
        assert_eq!(cli.tick_rate, 4.0);
        assert_eq!(cli.frame_rate, 60.0);
        assert_eq!(cli.schema, None);
        assert!(!cli.print);
    }

    #[test]
    fn test_paths_level_and_print() {
        let cli = Cli::try_parse_from([
            "querybar", "--schema", "fields.json5", "--logging", "debug", "--print", "-t", "2",
        ])
        .unwrap();
        assert_eq!(cli.schema, Some(PathBuf::from("fields.json5")));
        assert_eq!(cli.logging.map(tracing::Level::from), Some(tracing::Level::DEBUG));
        assert!(cli.print);
        assert_eq!(cli.tick_rate, 2.0);
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["querybar", "--logging", "loud"]).is_err());
    }
}
