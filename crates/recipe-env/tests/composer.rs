use std::collections::BTreeMap;

use recipe_core::context::BuildContext;
use recipe_core::package::{PackageMetadata, PackageSpec, VersionSource};
use recipe_core::platform::Platform;
use recipe_core::recipes::fairroot;
use recipe_core::resolved::{ResolvedBuild, ResolvedDependency};
use recipe_core::rule::{EnvRule, FlagRule, MutationKind, Phase};
use recipe_core::variant::VariantDef;
use recipe_core::version::Version;
use recipe_env::composer::{expand, EnvironmentComposer, LIBRARY_PATH_VAR};
use recipe_env::mutation::{apply_all, render_script, EnvMutation};
use recipe_util::errors::RecipeError;

fn dep(name: &str, version: &str) -> ResolvedDependency {
    ResolvedDependency::new(
        name,
        Version::parse(version).unwrap(),
        format!("/opt/{name}/{version}"),
    )
}

fn ctx(version: &str, pin: &str) -> BuildContext {
    BuildContext::new()
        .with_version(Version::parse(version).unwrap())
        .with_platform(Platform::Linux)
        .with_pin(pin)
}

/// 18.2.1 without pins, simulation on, C++14.
fn legacy_build(spec: &PackageSpec) -> ResolvedBuild {
    let deps = vec![
        dep("boost", "1.68.0")
            .with_variant("cxxstd", "11")
            .with_variant("container", "true"),
        dep("fairlogger", "1.4.0"),
        dep("fairmq", "1.4.11"),
        dep("flatbuffers", "1.11.0"),
        dep("geant4", "10.5.1"),
        dep("googletest", "1.8.1"),
        dep("protobuf", "3.11.4"),
        dep("pythia6", "428-alice1"),
        dep("pythia8", "8240"),
        dep("root", "6.16.00").with_variant("http", "true"),
        dep("fairsoft-config", "jun19"),
        dep("geant3", "2.7"),
        dep("geant4-vmc", "4-0-p1"),
        dep("vgm", "4-5"),
        dep("yaml-cpp", "0.6.3"),
    ];
    ResolvedBuild::new(
        spec,
        &ctx("18.2.1", "none").with_variant("cxxstd", "14"),
        "/opt/fairroot/18.2.1",
        deps,
    )
    .unwrap()
}

/// 18.4.1 on the develop pin, simulation off, newer boost.
fn lean_build(spec: &PackageSpec, examples: bool) -> ResolvedBuild {
    let mut deps = vec![
        dep("boost", "1.72.0")
            .with_variant("cxxstd", "11")
            .with_variant("container", "true"),
        dep("fairlogger", "1.9.0"),
        dep("fairmq", "1.4.26"),
        dep("flatbuffers", "1.12.0"),
        dep("geant4", "10.7.1"),
        dep("googletest", "1.10.0"),
        dep("protobuf", "3.12.2"),
        dep("yaml-cpp", "0.6.3"),
    ];
    if examples {
        deps.push(dep("msgpack-c", "3.3.0"));
    }
    let c = ctx("18.4.1", "develop")
        .with_variant("sim", "false")
        .with_variant("examples", examples.to_string());
    ResolvedBuild::new(spec, &c, "/opt/fairroot/18.4.1", deps).unwrap()
}

#[test]
fn legacy_flags_point_at_root_and_pythia8() {
    let spec = fairroot().unwrap();
    let flags = EnvironmentComposer::new(&spec)
        .build_flags(&legacy_build(&spec))
        .unwrap();
    assert_eq!(
        flags,
        vec![
            "-DCMAKE_INSTALL_PREFIX=/opt/fairroot/18.2.1",
            "-DCMAKE_BUILD_TYPE=RelWithDebInfo",
            "-DROOTSYS=/opt/root/6.16.00",
            "-DPYTHIA8_DIR=/opt/pythia8/8240",
            "-DBUILD_EXAMPLES:BOOL=OFF",
            "-DBoost_NO_BOOST_CMAKE=ON",
        ]
    );
}

#[test]
fn absent_dependencies_and_new_boost_drop_flags() {
    let spec = fairroot().unwrap();
    let flags = EnvironmentComposer::new(&spec)
        .build_flags(&lean_build(&spec, false))
        .unwrap();
    assert_eq!(
        flags,
        vec![
            "-DCMAKE_INSTALL_PREFIX=/opt/fairroot/18.4.1",
            "-DCMAKE_BUILD_TYPE=RelWithDebInfo",
            "-DBUILD_EXAMPLES:BOOL=OFF",
        ]
    );
}

#[test]
fn examples_switch_turns_on() {
    let spec = fairroot().unwrap();
    let flags = EnvironmentComposer::new(&spec)
        .build_flags(&lean_build(&spec, true))
        .unwrap();
    assert!(flags.contains(&"-DBUILD_EXAMPLES:BOOL=ON".to_string()));
}

#[test]
fn flags_are_deterministic() {
    let spec = fairroot().unwrap();
    let composer = EnvironmentComposer::new(&spec);
    let build = legacy_build(&spec);
    assert_eq!(
        composer.build_flags(&build).unwrap(),
        composer.build_flags(&build).unwrap()
    );
}

#[test]
fn library_path_in_every_phase_but_build() {
    let spec = fairroot().unwrap();
    let composer = EnvironmentComposer::new(&spec);
    let build = legacy_build(&spec);
    let expected = EnvMutation::prepend_path(LIBRARY_PATH_VAR, "/opt/fairroot/18.2.1/lib");

    for phase in [Phase::Run, Phase::DependentBuild, Phase::DependentRun] {
        let mutations = composer.environment_mutations(&build, phase).unwrap();
        assert_eq!(mutations, vec![expected.clone()], "{phase}");
    }
    let build_env = composer.environment_mutations(&build, Phase::Build).unwrap();
    assert!(!build_env.contains(&expected));
}

#[test]
fn build_phase_sets_standard_and_clears_fairsoft() {
    let spec = fairroot().unwrap();
    let mutations = EnvironmentComposer::new(&spec)
        .environment_mutations(&legacy_build(&spec), Phase::Build)
        .unwrap();
    assert_eq!(
        mutations,
        vec![
            EnvMutation::append_flags("CXXFLAGS", "-std=c++14"),
            EnvMutation::unset("SIMPATH"),
            EnvMutation::unset("FAIRSOFT_ROOT"),
        ]
    );

    let mut vars: BTreeMap<String, String> = [
        ("CXXFLAGS", "-O2"),
        ("SIMPATH", "/opt/fairsoft"),
        ("FAIRSOFT_ROOT", "/opt/fairsoft"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    apply_all(&mutations, &mut vars);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars["CXXFLAGS"], "-O2 -std=c++14");
}

#[test]
fn script_rendering_keeps_order() {
    let spec = fairroot().unwrap();
    let mutations = EnvironmentComposer::new(&spec)
        .environment_mutations(&legacy_build(&spec), Phase::Build)
        .unwrap();
    let script = render_script(&mutations);
    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("export CXXFLAGS="));
    assert_eq!(lines[1], "unset SIMPATH");
    assert_eq!(lines[2], "unset FAIRSOFT_ROOT");
}

fn tool_spec() -> PackageSpec {
    let mut spec = PackageSpec::new(PackageMetadata::new("tool"));
    spec.declare_version("2.1", VersionSource::Checksum { sha256: "aa".into() })
        .unwrap();
    spec.declare_variant("build_type", &["Release", "Debug"], "Release")
        .unwrap();
    spec.add_variant(VariantDef::boolean("shared", true)).unwrap();
    spec.add_flag_rule(FlagRule::variant_switch("shared", "BUILD_SHARED_LIBS", None))
        .unwrap();
    spec.add_env_rule(EnvRule::new(
        &[Phase::Run, Phase::DependentRun],
        MutationKind::PrependPath,
        "PATH",
        Some("{prefix}/bin"),
    ))
    .unwrap();
    spec.add_env_rule(EnvRule::new(
        &[Phase::DependentBuild],
        MutationKind::Set,
        "TOOL_ZLIB",
        Some("{dep:zlib}/lib/libz.so.{version}"),
    ))
    .unwrap();
    spec
}

fn tool_build(spec: &PackageSpec) -> ResolvedBuild {
    let c = BuildContext::new()
        .with_version(Version::parse("2.1").unwrap())
        .with_platform(Platform::Darwin)
        .with_variant("build_type", "Debug");
    ResolvedBuild::new(spec, &c, "/opt/tool", vec![dep("zlib", "1.2.11")]).unwrap()
}

#[test]
fn build_type_variant_overrides_default() {
    let spec = tool_spec();
    let flags = EnvironmentComposer::new(&spec)
        .build_flags(&tool_build(&spec))
        .unwrap();
    assert_eq!(
        flags,
        vec![
            "-DCMAKE_INSTALL_PREFIX=/opt/tool",
            "-DCMAKE_BUILD_TYPE=Debug",
            "-DBUILD_SHARED_LIBS=ON",
        ]
    );
}

#[test]
fn templates_expand_per_phase() {
    let spec = tool_spec();
    let composer = EnvironmentComposer::new(&spec);
    let build = tool_build(&spec);

    let run = composer.environment_mutations(&build, Phase::Run).unwrap();
    assert_eq!(run.len(), 2);
    assert_eq!(run[0].var, LIBRARY_PATH_VAR);
    assert_eq!(run[1], EnvMutation::prepend_path("PATH", "/opt/tool/bin"));

    let dependent = composer
        .environment_mutations(&build, Phase::DependentBuild)
        .unwrap();
    assert_eq!(
        dependent[1],
        EnvMutation::set("TOOL_ZLIB", "/opt/zlib/1.2.11/lib/libz.so.2.1")
    );

    assert!(composer
        .environment_mutations(&build, Phase::Build)
        .unwrap()
        .is_empty());
}

#[test]
fn bad_templates_fail() {
    let spec = tool_spec();
    let build = tool_build(&spec);
    assert_eq!(expand("{variant:build_type}", &build).unwrap(), "Debug");
    assert!(matches!(
        expand("{dep:openssl}", &build).unwrap_err(),
        RecipeError::MissingDependency { .. }
    ));
    assert!(matches!(
        expand("{home}", &build).unwrap_err(),
        RecipeError::Parse { .. }
    ));
    assert!(expand("{prefix", &build).is_err());
}

#[test]
fn composer_rejects_foreign_build() {
    let fairroot = fairroot().unwrap();
    let tool = tool_spec();
    let build = tool_build(&tool);
    assert!(EnvironmentComposer::new(&fairroot).build_flags(&build).is_err());
}
