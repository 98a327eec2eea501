//! CLI argument definitions for `recipe`.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "recipe",
    version,
    about = "Inspect package build recipes and derive their build configuration",
    long_about = "recipe evaluates a package recipe's conditional dependency, patch, flag and \
                  environment rules against a build context or a resolved lock file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Recipe file to use instead of Recipe.toml or the built-in recipe
    #[arg(long, global = true, env = "RECIPE_FILE")]
    pub recipe: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show versions, variants and rule counts of the recipe
    Info,

    /// Evaluate the recipe's rules for a build context
    Resolve {
        /// Package version to build (defaults to the preferred release)
        #[arg(long = "version", value_name = "VERSION")]
        version: Option<String>,
        /// Target platform (defaults to the host platform)
        #[arg(short, long)]
        platform: Option<String>,
        /// Pin profile
        #[arg(long)]
        pin: Option<String>,
        /// Variant override, repeatable
        #[arg(short = 'V', long = "variant", value_name = "NAME=VALUE")]
        variants: Vec<String>,
        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the CMake arguments for a resolved build, one per line
    Flags {
        /// Lock file written by the dependency resolver
        #[arg(long)]
        lock: PathBuf,
    },

    /// Print the environment changes for one phase of a resolved build
    Env {
        /// Lock file written by the dependency resolver
        #[arg(long)]
        lock: PathBuf,
        /// Phase: build, run, dependent-build, dependent-run
        #[arg(long, default_value = "run")]
        phase: String,
        /// Print a POSIX shell script instead of a list
        #[arg(long)]
        sh: bool,
    },
}

/// Parse command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}
