use std::collections::BTreeMap;

use recipe_core::context::BuildContext;
use recipe_core::package::PackageSpec;
use recipe_core::platform::Platform;
use recipe_core::resolution::{MergedDependency, Resolution, RuleKind};
use recipe_core::version::Version;
use recipe_util::errors::{RecipeError, RecipeResult};
use recipe_util::progress::{status, status_info, status_warn};

pub fn exec(
    spec: &PackageSpec,
    version: Option<&str>,
    platform: Option<&str>,
    pin: Option<&str>,
    variants: &[String],
    json: bool,
) -> RecipeResult<()> {
    let version = match version {
        Some(v) => Version::parse(v)?,
        None => {
            let preferred = spec.preferred_version().cloned().ok_or_else(|| {
                RecipeError::IncompleteBuildContext {
                    axis: "version".to_string(),
                }
            })?;
            tracing::info!("no --version given, using {preferred}");
            preferred
        }
    };
    let platform = match platform {
        Some(p) => p.parse::<Platform>()?,
        None => Platform::current(),
    };

    let mut ctx = BuildContext::new()
        .with_version(version)
        .with_platform(platform);
    if let Some(pin) = pin {
        ctx = ctx.with_pin(pin);
    }
    for assignment in variants {
        let (name, value) = assignment.split_once('=').ok_or_else(|| {
            RecipeError::parse(assignment.as_str(), "expected NAME=VALUE")
        })?;
        ctx = ctx.with_variant(name.trim(), value.trim());
    }

    let resolution = spec.resolve_predicates(&ctx)?;
    for conflict in &resolution.conflicts().conflicts {
        status_warn("Conflict", &conflict.to_string());
    }
    let merged = resolution.merged()?;

    if json {
        print_json(&resolution, &merged)
    } else {
        print_text(&resolution, &merged);
        Ok(())
    }
}

fn kind_name(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::Dependency => "dependency",
        RuleKind::Patch => "patch",
    }
}

fn print_text(resolution: &Resolution, merged: &BTreeMap<String, MergedDependency>) {
    status(
        "Resolved",
        &format!(
            "{}@{} on {} {}",
            resolution.package, resolution.version, resolution.platform, resolution.variants
        ),
    );

    println!("Constraints:");
    for c in &resolution.constraints {
        let types: Vec<&str> = c.types.iter().map(|t| t.as_str()).collect();
        if c.when.is_always() {
            println!("  #{:<3} {} ({})", c.rule, c.spec, types.join(","));
        } else {
            println!(
                "  #{:<3} {} ({}) when {}",
                c.rule,
                c.spec,
                types.join(","),
                c.when
            );
        }
    }

    println!();
    println!("Dependencies:");
    for (name, dep) in merged {
        let kind = if dep.is_build_only() { " [build]" } else { "" };
        println!("  {name}: {}{kind}", dep.spec);
    }

    if !resolution.patches.is_empty() {
        println!();
        println!("Patches:");
        for patch in &resolution.patches {
            println!("  {} (level {})", patch.id, patch.level);
        }
    }

    for deferred in &resolution.deferred {
        status_info(
            "Deferred",
            &format!(
                "{} rule #{} ({}) needs the version of {}",
                kind_name(deferred.kind),
                deferred.rule,
                deferred.subject,
                deferred.waiting_on
            ),
        );
    }
}

fn print_json(
    resolution: &Resolution,
    merged: &BTreeMap<String, MergedDependency>,
) -> RecipeResult<()> {
    let constraints: Vec<_> = resolution
        .constraints
        .iter()
        .map(|c| {
            serde_json::json!({
                "rule": c.rule,
                "dependency": c.spec.name,
                "spec": c.spec.to_string(),
                "types": c.types,
                "when": c.when.to_string(),
            })
        })
        .collect();
    let dependencies: serde_json::Map<String, serde_json::Value> = merged
        .iter()
        .map(|(name, dep)| {
            (
                name.clone(),
                serde_json::json!({
                    "spec": dep.spec.to_string(),
                    "versions": dep.spec.versions.to_string(),
                    "types": dep.types,
                    "rules": dep.rules,
                }),
            )
        })
        .collect();
    let patches: Vec<_> = resolution
        .patches
        .iter()
        .map(|p| serde_json::json!({ "rule": p.rule, "id": p.id, "level": p.level }))
        .collect();
    let deferred: Vec<_> = resolution
        .deferred
        .iter()
        .map(|d| {
            serde_json::json!({
                "kind": kind_name(d.kind),
                "rule": d.rule,
                "subject": d.subject,
                "waiting_on": d.waiting_on,
                "when": d.when.to_string(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "package": resolution.package,
        "version": resolution.version,
        "platform": resolution.platform,
        "variants": resolution.variants,
        "constraints": constraints,
        "dependencies": dependencies,
        "patches": patches,
        "deferred": deferred,
    });
    let rendered = serde_json::to_string_pretty(&output).map_err(|e| RecipeError::Generic {
        message: format!("Failed to render JSON: {e}"),
    })?;
    println!("{rendered}");
    Ok(())
}
