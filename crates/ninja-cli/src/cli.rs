//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// config-ninja - Keep configuration files in sync with their sources
#[derive(Parser, Debug)]
#[command(name = "config-ninja")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file
    #[arg(short, long, global = true, env = "CONFIG_NINJA_SETTINGS")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the current value of objects
    ///
    /// Fetches from each backend and decodes with the source format;
    /// destinations are not touched and hooks do not run.
    Get {
        /// Object keys (all objects when omitted)
        keys: Vec<String>,

        /// Keep printing values as they change
        #[arg(long)]
        poll: bool,
    },

    /// Write objects to their destinations
    ///
    /// Examples:
    ///   config-ninja apply               # Apply every object once
    ///   config-ninja apply app           # Apply only `app`
    ///   config-ninja apply --poll        # Keep applying changes
    Apply {
        /// Object keys (all objects when omitted)
        keys: Vec<String>,

        /// Keep applying changes until interrupted
        #[arg(long)]
        poll: bool,
    },

    /// Apply changes continuously until interrupted
    Monitor {
        /// Object keys (all objects when omitted)
        keys: Vec<String>,
    },

    /// Run hooks by name
    Hook {
        /// Hook names from CONFIG_NINJA_HOOKS
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Commands about config-ninja itself
    #[command(name = "self")]
    Itself {
        #[command(subcommand)]
        action: SelfAction,
    },
}

/// `self` subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SelfAction {
    /// Print the configured objects
    Print,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_apply_with_keys() {
        let cli = Cli::try_parse_from(["config-ninja", "apply", "a", "b", "--poll"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Apply {
                keys: vec!["a".into(), "b".into()],
                poll: true,
            }
        );
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["config-ninja", "monitor", "-v", "-c", "s.yaml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("s.yaml")));
    }

    #[test]
    fn parse_self_print() {
        let cli = Cli::try_parse_from(["config-ninja", "self", "print"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Itself {
                action: SelfAction::Print
            }
        );
    }

    #[test]
    fn hook_requires_a_name() {
        assert!(Cli::try_parse_from(["config-ninja", "hook"]).is_err());
    }
}
