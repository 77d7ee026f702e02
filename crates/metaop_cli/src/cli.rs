// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line arguments.

use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and instantiate meta-operations
#[derive(Parser, Debug)]
#[command(name = "metaop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and instantiate node-graph meta-operations")]
#[command(long_about = r#"
Builds the graphs of registered meta-operations without rendering them.

EXAMPLES:
  metaop list
  metaop schema gegl:sparkle
  metaop instantiate sparkle --set scale=0.3 --set color=#3366ff
  metaop plan lb:sparkle2 --preset blue-stars
  metaop parse "rgb-clip color-to-alpha color=#ff7aff"

ENVIRONMENT VARIABLES:
  METAOP_CONFIG   Configuration file (default: ./metaop.ron)
  METAOP_LOG      tracing filter, e.g. metaop_graph=debug
"#)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, env = "METAOP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter directives
    #[arg(long, env = "METAOP_LOG", global = true)]
    pub log: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List registered meta-operations
    List,

    /// Print the property schema of a meta-operation
    Schema {
        /// Meta-operation name
        name: String,
    },

    /// Build a meta-operation and print its graph
    Instantiate {
        /// Meta-operation name
        name: String,
        /// Property values
        #[command(flatten)]
        values: ValueArgs,
    },

    /// Build a meta-operation and print its render order
    Plan {
        /// Meta-operation name
        name: String,
        /// Property values
        #[command(flatten)]
        values: ValueArgs,
    },

    /// Parse a graph string and print it normalized
    Parse {
        /// Graph string
        text: String,
    },
}

/// Property values applied after instantiation
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ValueArgs {
    /// Preset from the configuration file, applied first
    #[arg(long)]
    pub preset: Option<String>,

    /// Property assignment, may be repeated
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,
}

fn parse_assignment(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{text}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_instantiate() {
        let cli = Cli::try_parse_from([
            "metaop",
            "instantiate",
            "sparkle",
            "--set",
            "scale=0.3",
            "--set",
            "color=#3366ff",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(
            cli.command,
            Command::Instantiate {
                name: "sparkle".to_string(),
                values: ValueArgs {
                    preset: None,
                    set: vec![
                        ("scale".to_string(), "0.3".to_string()),
                        ("color".to_string(), "#3366ff".to_string()),
                    ],
                },
            }
        );
    }

    #[test]
    fn test_rejects_bad_assignment() {
        assert!(Cli::try_parse_from(["metaop", "plan", "sparkle", "--set", "scale"]).is_err());
        assert!(Cli::try_parse_from(["metaop", "plan", "sparkle", "--set", "=1"]).is_err());
    }
}
