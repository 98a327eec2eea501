//! Command dispatch and handler modules.

mod env;
mod flags;
mod info;
mod resolve;

use std::path::Path;

use recipe_core::manifest::{RecipeManifest, RECIPE_FILE};
use recipe_core::package::PackageSpec;
use recipe_core::recipes;
use recipe_util::errors::{RecipeError, RecipeResult};
use recipe_util::fs::locate_recipe;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> RecipeResult<()> {
    let spec = load_recipe(cli.recipe.as_deref())?;
    match cli.command {
        Command::Info => info::exec(&spec),
        Command::Resolve {
            version,
            platform,
            pin,
            variants,
            json,
        } => resolve::exec(
            &spec,
            version.as_deref(),
            platform.as_deref(),
            pin.as_deref(),
            &variants,
            json,
        ),
        Command::Flags { lock } => flags::exec(&spec, &lock),
        Command::Env { lock, phase, sh } => env::exec(&spec, &lock, &phase, sh),
    }
}

/// The recipe named on the command line, else `Recipe.toml` in this directory
/// or a parent, else the built-in FairRoot recipe.
fn load_recipe(explicit: Option<&Path>) -> RecipeResult<PackageSpec> {
    let cwd = std::env::current_dir().map_err(RecipeError::Io)?;
    match locate_recipe(explicit, &cwd, RECIPE_FILE) {
        Some(path) => {
            let spec = RecipeManifest::from_path(&path)?.into_spec()?;
            tracing::info!("using recipe {} from {}", spec.name(), path.display());
            Ok(spec)
        }
        None => {
            tracing::info!("no {RECIPE_FILE} found, using the built-in fairroot recipe");
            Ok(recipes::fairroot()?)
        }
    }
}
