use recipe_util::errors::RecipeError;

use crate::expr::Predicate;
use crate::package::{PackageMetadata, PackageSpec, VersionSource};
use crate::platform::Platform;
use crate::rule::{DepType, DependencyRule, EnvRule, FlagRule, MutationKind, PatchRule, Phase};
use crate::variant::VariantDef;

const ROOT_JUN19_LINUX: &str =
    "root@6.16.00+fortran+gdml+memstat+pythia6+pythia8+vc~vdt+python+tmva+xrootd+sqlite ^mesa~llvm";
const ROOT_JUN19_DARWIN: &str =
    "root@6.16.00+fortran+gdml+memstat+pythia6+pythia8+vc~vdt+python+tmva+xrootd+sqlite+aqua";

/// Versions that still build with the pre-19 CMake setup.
const LEGACY_CMAKE: &str = "@:18,develop";

/// The FairRoot simulation, reconstruction and analysis framework.
pub fn fairroot() -> Result<PackageSpec, RecipeError> {
    let mut metadata = PackageMetadata::new("fairroot");
    metadata.description = Some(
        "C++ simulation, reconstruction and analysis framework for particle physics experiments"
            .to_string(),
    );
    metadata.homepage = Some("http://fairroot.gsi.de".to_string());
    metadata.url =
        Some("https://github.com/FairRootGroup/FairRoot/archive/v{version}.tar.gz".to_string());
    metadata.git = Some("https://github.com/FairRootGroup/FairRoot.git".to_string());
    let mut spec = PackageSpec::new(metadata);

    spec.declare_version("develop", VersionSource::Branch { branch: "dev".into() })?;
    for (id, sha256) in [
        ("18.4.1", "d8455c4bb705a2d5989ad947ffc50bb2f0d00affb649bb5e30d9463b5be0b490"),
        ("18.4.0", "97ad86d039db195acf12e9978eb660daab0c91e95e517921bac5a0f157a3e309"),
        ("18.2.1", "a9c22965d2d99e385f64c0df1867b477b9c129bcd087ba3b683d0ada6f3d66d0"),
    ] {
        spec.declare_version(id, VersionSource::Checksum { sha256: sha256.into() })?;
    }

    spec.add_variant(
        VariantDef::new("cxxstd", ["11", "14", "17"], "11")?
            .with_description("Use the specified C++ standard when building."),
    )?;
    spec.add_variant(
        VariantDef::boolean("sim", true)
            .with_description("Enable simulation engines and event generators"),
    )?;
    spec.add_variant(VariantDef::boolean("examples", false).with_description("Install examples"))?;
    spec.add_variant(
        VariantDef::new("pin", ["develop", "jun19", "none"], "develop")?.with_description(
            "Use certain dependency versions pinned in the given FairSoft release.",
        ),
    )?;

    add_dependencies(&mut spec)?;
    add_patches(&mut spec)?;
    add_flags(&mut spec)?;
    add_environment(&mut spec)?;

    tracing::trace!(
        "built-in fairroot recipe: {} dependency rules, {} patches",
        spec.dependency_rules().len(),
        spec.patch_rules().len()
    );
    Ok(spec)
}

fn depends(spec: &mut PackageSpec, constraint: &str, when: &str) -> Result<(), RecipeError> {
    spec.add_dependency_rule(DependencyRule::parse(constraint, when)?)
}

fn add_dependencies(spec: &mut PackageSpec) -> Result<(), RecipeError> {
    spec.add_dependency_rule(DependencyRule::parse("cmake@3.13.4:", "")?.with_types(&[DepType::Build]))?;

    depends(spec, "boost@1.68.0: cxxstd=11 +container", "")?;
    depends(spec, "boost@1.68.0 cxxstd=11 +container", "pin=jun19")?;

    depends(spec, "dds@3.0", "pin=jun19")?;

    depends(spec, "fairlogger@1.4.0:", "")?;
    depends(spec, "fairlogger@1.4.0", "pin=jun19")?;

    depends(spec, "fairmq@1.4.11:", "")?;
    depends(spec, "fairmq@1.4.11", "pin=jun19")?;

    depends(spec, "flatbuffers", "")?;

    depends(spec, "geant4", "")?;
    depends(spec, "geant4@10.5.1~qt~vecgeom~opengl~x11~motif~threads", "pin=jun19")?;

    depends(spec, "googletest@1.7.0:", "")?;
    depends(spec, "googletest@1.8.1", "pin=jun19")?;

    depends(spec, "hepmc@2.06.09 length=CM momentum=GEV", "pin=jun19")?;

    depends(spec, "msgpack-c@3.1:", "+examples")?;

    depends(spec, "protobuf", "")?;

    depends(spec, "pythia6", "+sim")?;
    depends(spec, "pythia6@428-alice1", "+sim pin=jun19")?;

    depends(spec, "pythia8", "+sim")?;
    depends(spec, "pythia8@8240", "+sim pin=jun19")?;

    depends(spec, "root+http", "pin=none")?;
    depends(spec, "fairsoft-config", "pin=none")?;
    depends(spec, "geant3", "pin=none")?;
    depends(spec, "geant4-vmc", "+sim pin=none")?;

    for (platform, root) in [
        (Platform::Linux, ROOT_JUN19_LINUX),
        (Platform::Darwin, ROOT_JUN19_DARWIN),
    ] {
        let when = format!("pin=jun19 platform={platform}");
        depends(spec, root, &when)?;
        depends(spec, &format!("fairsoft-config@jun19 ^{root}"), &when)?;
        depends(spec, &format!("geant3@2.7 ^{root}"), &when)?;
        depends(spec, &format!("geant4-vmc@4-0-p1 ^{root}"), &format!("+sim {when}"))?;
    }

    depends(spec, "vgm", "+sim")?;
    depends(spec, "vgm@4-5", "+sim pin=jun19")?;

    depends(spec, "vmc", "@18.4: ^root@6.18:")?;

    depends(spec, "yaml-cpp", "@18.2:")?;

    // concretizer hints for the jun19 release
    depends(spec, "python@2.7.18", "pin=jun19")?;
    depends(spec, "py-numpy@1.16.6", "pin=jun19")?;
    depends(spec, "py-setuptools@44.1.0", "pin=jun19")?;
    Ok(())
}

fn add_patches(spec: &mut PackageSpec) -> Result<(), RecipeError> {
    spec.add_patch_rule(PatchRule::parse("cmake_utf8.patch", "@18.2.1")?)?;
    spec.add_patch_rule(PatchRule::parse("fairlogger_incdir.patch", "@18.2.1")?.with_level(0))?;
    spec.add_patch_rule(PatchRule::parse("find_pythia8_cmake.patch", "@:18.4.0 +sim")?)?;
    spec.add_patch_rule(PatchRule::parse(
        "support_geant4_with_external_clhep_18.2.patch",
        "@18.2 +sim",
    )?)?;
    spec.add_patch_rule(PatchRule::parse(
        "support_geant4_with_external_clhep.patch",
        "@18.4 +sim ^Geant4@:10.5",
    )?)?;
    Ok(())
}

fn add_flags(spec: &mut PackageSpec) -> Result<(), RecipeError> {
    let legacy = Predicate::parse(LEGACY_CMAKE)?;
    spec.add_flag_rule(FlagRule::dependency_prefix("root", "ROOTSYS").when(legacy.clone()))?;
    spec.add_flag_rule(FlagRule::dependency_prefix("pythia8", "PYTHIA8_DIR").when(legacy))?;
    spec.add_flag_rule(FlagRule::variant_switch("examples", "BUILD_EXAMPLES", Some("BOOL")))?;
    spec.add_flag_rule(
        FlagRule::define("Boost_NO_BOOST_CMAKE", "ON").when(Predicate::parse("^boost@:1.69.99")?),
    )?;
    Ok(())
}

fn add_environment(spec: &mut PackageSpec) -> Result<(), RecipeError> {
    spec.add_env_rule(
        EnvRule::new(
            &[Phase::Build],
            MutationKind::AppendFlags,
            "CXXFLAGS",
            Some("-std=c++{variant:cxxstd}"),
        )
        .when(Predicate::parse(LEGACY_CMAKE)?),
    )?;
    for var in ["SIMPATH", "FAIRSOFT_ROOT"] {
        spec.add_env_rule(EnvRule::new(&[Phase::Build], MutationKind::Unset, var, None))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_error() {
        let spec = fairroot().unwrap();
        assert_eq!(spec.name(), "fairroot");
        assert_eq!(spec.versions().len(), 4);
        assert_eq!(spec.variants().len(), 4);
        assert_eq!(spec.patch_rules().len(), 5);
        assert_eq!(spec.flag_rules().len(), 4);
        assert!(spec.has_pin_profiles());
    }

    #[test]
    fn preferred_is_latest_release() {
        let spec = fairroot().unwrap();
        assert_eq!(spec.preferred_version().unwrap().as_str(), "18.4.1");
    }
}
