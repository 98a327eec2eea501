use recipe_core::package::{PackageSpec, VersionSource};
use recipe_util::errors::RecipeResult;

pub fn exec(spec: &PackageSpec) -> RecipeResult<()> {
    println!("{}", spec.name());
    if let Some(ref description) = spec.metadata.description {
        println!("  {description}");
    }
    if let Some(ref homepage) = spec.metadata.homepage {
        println!("  homepage: {homepage}");
    }

    let preferred = spec.preferred_version();
    println!();
    println!("Versions:");
    for declared in spec.versions() {
        let source = match &declared.source {
            VersionSource::Checksum { sha256 } => format!("sha256 {sha256}"),
            VersionSource::Branch { branch } => format!("branch {branch}"),
            VersionSource::Tag { tag } => format!("tag {tag}"),
        };
        let marker = if preferred == Some(&declared.version) {
            " (preferred)"
        } else {
            ""
        };
        println!("  {}{marker}  {source}", declared.version);
    }

    println!();
    println!("Variants:");
    for variant in spec.variants() {
        let values = if variant.is_bool() {
            "on/off".to_string()
        } else {
            variant.allowed().join(", ")
        };
        println!(
            "  {} [{values}] default {}",
            variant.name,
            variant.default_value()
        );
        if let Some(ref description) = variant.description {
            println!("      {description}");
        }
    }

    println!();
    println!(
        "Rules: {} dependency, {} patch, {} flag, {} environment",
        spec.dependency_rules().len(),
        spec.patch_rules().len(),
        spec.flag_rules().len(),
        spec.env_rules().len()
    );
    Ok(())
}
