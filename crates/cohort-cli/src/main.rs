//! Cohort CLI - tooling for capability filters and component registries.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
pub mod config_bridge;

use commands::{config, demo, filter};

/// Cohort - capability filters and component lifecycle tooling
#[derive(Parser)]
#[command(name = "cohort")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a configuration file layered over ~/.cohort/config.toml
    #[arg(short, long, global = true, env = "COHORT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, evaluate and build capability filters
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },

    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Wire a sample component graph and show the registry at each step
    Demo {
        /// Print snapshots as JSON
        #[arg(long)]
        json: bool,
        /// Print the registry events emitted by each step
        #[arg(short, long)]
        events: bool,
    },
}

#[derive(Subcommand)]
enum FilterCommands {
    /// Parse a filter and print its normalized canonical form and tree
    Parse {
        /// Filter string, e.g. "(&(lang=rust)(version>=2))"
        filter: String,
    },
    /// Test a filter against a JSON object of properties (exit code 1 on no match)
    Match {
        /// Filter string
        filter: String,
        /// Properties as a JSON object
        #[arg(short, long, default_value = "{}")]
        properties: String,
    },
    /// Escape filter special characters in a value
    Escape {
        /// Raw text
        text: String,
    },
    /// Remove escape characters from a value
    Unescape {
        /// Escaped text
        text: String,
    },
    /// Combine filters under one operator
    Combine {
        /// Operator: and, or, not (or &, |, !)
        #[arg(short, long, default_value = "and")]
        operator: String,
        /// Filter strings; blank ones are dropped
        filters: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show {
        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: String,
        /// Show only one section (registry or logging)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the current configuration
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let unified_cfg = match cohort_config::Config::load(cli.config.as_deref()) {
        Ok(resolved) => Some(resolved.config),
        Err(e) => {
            if !matches!(cli.command, Commands::Config { .. }) {
                eprintln!("Warning: using default configuration: {e}");
            }
            None
        },
    };

    let mut log_config = unified_cfg
        .as_ref()
        .map(config_bridge::to_log_config)
        .unwrap_or_default();
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = cohort_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Filter { command } => handle_filter(command)?,
        Commands::Config { command } => match command {
            ConfigCommands::Show { format, section } => {
                config::show_config(cli.config.as_deref(), &format, section.as_deref())?;
            },
            ConfigCommands::Validate => config::validate_config(cli.config.as_deref())?,
        },
        Commands::Demo { json, events } => {
            let settings = unified_cfg
                .as_ref()
                .map(config_bridge::to_registry_settings)
                .unwrap_or_default();
            demo::run_demo(settings, json, events)?;
        },
    }

    Ok(())
}

fn handle_filter(command: FilterCommands) -> Result<()> {
    match command {
        FilterCommands::Parse { filter } => filter::parse_filter(&filter),
        FilterCommands::Match { filter, properties } => {
            if !filter::match_filter(&filter, &properties)? {
                std::process::exit(1);
            }
            Ok(())
        },
        FilterCommands::Escape { text } => {
            filter::escape_text(&text);
            Ok(())
        },
        FilterCommands::Unescape { text } => {
            filter::unescape_text(&text);
            Ok(())
        },
        FilterCommands::Combine { operator, filters } => {
            filter::combine_filters(&operator, &filters)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_filter_match_args() {
        let cli = Cli::try_parse_from([
            "cohort",
            "filter",
            "match",
            "(lang=rust)",
            "--properties",
            r#"{"lang":"rust"}"#,
        ])
        .unwrap();
        match cli.command {
            Commands::Filter {
                command: FilterCommands::Match { filter, properties },
            } => {
                assert_eq!(filter, "(lang=rust)");
                assert_eq!(properties, r#"{"lang":"rust"}"#);
            },
            _ => panic!("expected filter match"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["cohort", "demo", "--config", "/tmp/c.toml", "-e"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Demo { events: true, json: false }));
    }
}
