//! Command line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use lockyard_types::RequirementGroup;
use std::path::PathBuf;

/// lockyard - administer a registry of lockable resources
#[derive(Parser)]
#[command(name = "lockyard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Administer a registry of lockable resources")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Plain output without table borders
    #[arg(long, global = true, conflicts_with = "json")]
    pub plain: bool,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use alternate registry file
    #[arg(long, global = true, value_name = "PATH", env = "LOCKYARD_REGISTRY")]
    pub registry: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List resources and their state
    #[command(alias = "ls")]
    List {
        /// Only resources matching this capability expression
        #[arg(long, value_name = "EXPR")]
        matching: Option<String>,
    },

    /// Register a new resource
    Create {
        name: String,

        /// Capability tags, separated by spaces or commas
        #[arg(short, long, value_name = "TAGS")]
        capabilities: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Remove a resource nobody holds
    #[command(alias = "rm")]
    Delete { name: String },

    /// Replace the capability tags of a resource
    Tag {
        name: String,

        /// Capability tags, separated by spaces or commas
        capabilities: String,
    },

    /// Show every capability tag in use
    Capabilities {
        /// Include resource names
        #[arg(long)]
        with_names: bool,
    },

    /// Place an administrative hold on free resources
    Reserve {
        #[arg(required = true)]
        names: Vec<String>,

        /// Who holds the reservation
        #[arg(long, value_name = "USER")]
        by: String,
    },

    /// Remove administrative holds
    Unreserve {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Clear every hold on resources
    Reset {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Lock resources for a requester without waiting
    Lock {
        /// Requesting execution id
        #[arg(long, value_name = "ID")]
        requester: String,

        #[command(flatten)]
        request: RequestArgs,

        /// Variable receiving the granted names
        #[arg(long, value_name = "NAME")]
        variable: Option<String>,
    },

    /// Release resources held by a requester
    Unlock {
        #[arg(long, value_name = "ID")]
        requester: String,

        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show resources matching a capability expression
    Match {
        expression: String,

        /// Variables for `$NAME` references, as KEY=VALUE
        #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        env: Vec<(String, String)>,
    },

    /// Show what a request would be granted, without locking
    Plan {
        #[command(flatten)]
        request: RequestArgs,

        /// Ignore current resource state
        #[arg(long)]
        any_state: bool,
    },

    /// Turn fairness ranking on or off in the config file
    Fair { state: Toggle },
}

/// Requirement groups of a request
#[derive(clap::Args)]
pub struct RequestArgs {
    /// Resource names locked together as one group
    #[arg(short = 'r', long = "resource", value_name = "NAME")]
    pub resources: Vec<String>,

    /// Capability group as `EXPR[:QTY]`, or `=a,b` for names
    #[arg(short = 'c', long = "capability", value_name = "GROUP")]
    pub groups: Vec<RequirementGroup>,

    /// Variables for `$NAME` references, as KEY=VALUE
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty variable name in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
