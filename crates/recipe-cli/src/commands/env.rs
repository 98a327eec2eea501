use std::path::Path;

use recipe_core::lockfile::BuildLock;
use recipe_core::package::PackageSpec;
use recipe_core::resolved::ResolvedBuild;
use recipe_core::rule::Phase;
use recipe_env::composer::EnvironmentComposer;
use recipe_env::mutation::render_script;
use recipe_util::errors::RecipeResult;

pub fn exec(spec: &PackageSpec, lock: &Path, phase: &str, sh: bool) -> RecipeResult<()> {
    let phase: Phase = phase.parse()?;
    let lock = BuildLock::from_path(lock)?;
    let build = ResolvedBuild::from_lock(spec, &lock)?;
    let mutations = EnvironmentComposer::new(spec).environment_mutations(&build, phase)?;

    if sh {
        print!("{}", render_script(&mutations));
        return Ok(());
    }
    if mutations.is_empty() {
        println!("No environment changes for the {phase} phase.");
        return Ok(());
    }
    println!("{} environment ({} changes):", phase, mutations.len());
    for mutation in &mutations {
        println!("  {mutation}");
    }
    Ok(())
}
