//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Hierarchical preferences store: inspect and edit a preferences tree on disk
#[derive(Parser, Debug)]
#[command(name = "rsprefs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Backing store file (overrides configured location)
    #[arg(short = 'f', long, global = true, env = "RSPREFS_FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value stored at a preference path (node.key)
    Get {
        /// Preference path, e.g. `app.theme` or `/volume`
        path: String,
    },

    /// Store a value (JSON literal, plain text otherwise)
    Set {
        /// Preference path, e.g. `app.theme`
        path: String,
        /// Value to store
        value: String,
    },

    /// Remove a key
    Unset {
        /// Preference path
        path: String,
    },

    /// List the keys of a node
    Keys {
        /// Node path (default: root)
        #[arg(default_value = "/")]
        node: String,
    },

    /// Show the node hierarchy
    Tree {
        /// Node path (default: root)
        #[arg(default_value = "/")]
        node: String,

        /// Include keys and values
        #[arg(short, long)]
        values: bool,
    },

    /// Remove a node and everything below it
    Rm {
        /// Node path
        node: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective config
    Show,

    /// Show config paths
    Path,

    /// Print a config template
    Template,
}
