use std::path::Path;

use recipe_core::lockfile::BuildLock;
use recipe_core::package::PackageSpec;
use recipe_core::resolved::ResolvedBuild;
use recipe_env::composer::EnvironmentComposer;
use recipe_util::errors::RecipeResult;
use recipe_util::progress::status;

pub fn exec(spec: &PackageSpec, lock: &Path) -> RecipeResult<()> {
    let lock = BuildLock::from_path(lock)?;
    let build = ResolvedBuild::from_lock(spec, &lock)?;
    status(
        "Configuring",
        &format!("{}@{} {}", build.package(), build.version(), build.variants()),
    );

    for flag in EnvironmentComposer::new(spec).build_flags(&build)? {
        println!("{flag}");
    }
    Ok(())
}
