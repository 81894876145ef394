// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::tasks;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Incremental static-asset builds with a live-reloading dev server.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run, in order. A task shared by several requests runs once.
    /// Defaults to `default` (build, then serve).
    #[arg(
        value_name = "TASK",
        value_parser = PossibleValuesParser::new(tasks::ALL.iter().copied())
    )]
    pub tasks: Vec<String>,

    /// Path to the config file (TOML). Defaults to `Assetpipe.toml`.
    ///
    /// Relative paths inside it resolve against its directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Rebuild every file, ignoring modification times.
    #[arg(long)]
    pub force: bool,

    /// Dev server port. Overrides `[serve].port`.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print the task graph, but don't build.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    /// Requested task names, falling back to `default`.
    pub fn requested_tasks(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            vec![tasks::DEFAULT.to_string()]
        } else {
            self.tasks.clone()
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tasks_means_default() {
        let args = CliArgs::try_parse_from(["assetpipe"]).unwrap();
        assert_eq!(args.requested_tasks(), vec!["default".to_string()]);
        assert_eq!(args.config_path(), default_config_path());
        assert!(!args.force);
    }

    #[test]
    fn parses_tasks_and_flags() {
        let args = CliArgs::try_parse_from([
            "assetpipe",
            "styles",
            "scripts",
            "--force",
            "--port",
            "8080",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.requested_tasks(), vec!["styles", "scripts"]);
        assert!(args.force);
        assert_eq!(args.port, Some(8080));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn explicit_config_path_wins() {
        let args = CliArgs::try_parse_from(["assetpipe", "--config", "site/Assetpipe.toml"]).unwrap();
        assert_eq!(args.config_path(), PathBuf::from("site/Assetpipe.toml"));
    }

    #[test]
    fn rejects_unknown_task_names() {
        assert!(CliArgs::try_parse_from(["assetpipe", "deploy"]).is_err());
    }
}
