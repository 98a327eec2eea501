use std::path::Path;

use recipe_core::expr::Predicate;
use recipe_core::lockfile::BuildLock;
use recipe_core::recipes::fairroot;
use recipe_core::resolved::ResolvedBuild;
use recipe_util::errors::RecipeError;

const LOCK_18_2_1: &str = r#"
package = "fairroot"
version = "18.2.1"
platform = "linux"
prefix = "/opt/fairroot/18.2.1"
pin = "none"

[variants]
cxxstd = 14
sim = true

[dependencies.boost]
version = "1.68.0"
prefix = "/opt/boost/1.68.0"
variants = { cxxstd = 11, container = true }

[dependencies.fairlogger]
version = "1.4.0"
prefix = "/opt/fairlogger/1.4.0"

[dependencies.fairmq]
version = "1.4.11"
prefix = "/opt/fairmq/1.4.11"

[dependencies.flatbuffers]
version = "1.11.0"
prefix = "/opt/flatbuffers/1.11.0"

[dependencies.geant4]
version = "10.5.1"
prefix = "/opt/geant4/10.5.1"

[dependencies.googletest]
version = "1.8.1"
prefix = "/opt/googletest/1.8.1"

[dependencies.protobuf]
version = "3.11.4"
prefix = "/opt/protobuf/3.11.4"

[dependencies.pythia6]
version = "428-alice1"
prefix = "/opt/pythia6/428-alice1"

[dependencies.pythia8]
version = "8240"
prefix = "/opt/pythia8/8240"

[dependencies.root]
version = "6.16.00"
prefix = "/opt/root/6.16.00"
variants = { http = true }

[dependencies.fairsoft-config]
version = "jun19"
prefix = "/opt/fairsoft-config/jun19"

[dependencies.geant3]
version = "2.7"
prefix = "/opt/geant3/2.7"

[dependencies.geant4-vmc]
version = "4-0-p1"
prefix = "/opt/geant4-vmc/4-0-p1"

[dependencies.vgm]
version = "4-5"
prefix = "/opt/vgm/4-5"

[dependencies.yaml-cpp]
version = "0.6.3"
prefix = "/opt/yaml-cpp/0.6.3"
"#;

fn lock() -> BuildLock {
    BuildLock::from_str(LOCK_18_2_1).unwrap()
}

#[test]
fn lock_parses_scalar_variants() {
    let lock = lock();
    assert_eq!(lock.package, "fairroot");
    assert_eq!(lock.pin.as_deref(), Some("none"));
    assert_eq!(lock.variants["cxxstd"].to_string(), "14");
    assert_eq!(lock.dependencies.len(), 15);
    assert_eq!(lock.dependencies["boost"].variants["container"].to_string(), "true");
}

#[test]
fn resolved_build_from_lock() {
    let spec = fairroot().unwrap();
    let build = ResolvedBuild::from_lock(&spec, &lock()).unwrap();

    assert_eq!(build.package(), "fairroot");
    assert_eq!(build.version().as_str(), "18.2.1");
    assert_eq!(build.variants().get("cxxstd"), Some("14"));
    assert_eq!(build.variants().get("examples"), Some("false"));
    assert_eq!(build.prefix(), Path::new("/opt/fairroot/18.2.1"));
    assert_eq!(build.lib_dir(), Path::new("/opt/fairroot/18.2.1/lib"));
    assert_eq!(
        build.dependency("ROOT").unwrap().prefix,
        Path::new("/opt/root/6.16.00")
    );
    assert_eq!(build.patches().len(), 4);
    assert_eq!(build.patches()[1].id, "fairlogger_incdir.patch");
}

#[test]
fn satisfies_checks_dependency_clauses() {
    let spec = fairroot().unwrap();
    let build = ResolvedBuild::from_lock(&spec, &lock()).unwrap();
    let p = |s: &str| Predicate::parse(s).unwrap();

    assert!(build.satisfies(&p("@:18,develop")));
    assert!(build.satisfies(&p("^boost@:1.69.99")));
    assert!(build.satisfies(&p("+sim cxxstd=14")));
    assert!(!build.satisfies(&p("^root@6.18:")));
    assert!(!build.satisfies(&p("^vmc")));
    assert!(!build.satisfies(&p("platform=darwin")));
}

#[test]
fn cmake_may_be_left_out_of_the_lock() {
    let spec = fairroot().unwrap();
    let lock = lock();
    assert!(!lock.dependencies.contains_key("cmake"));
    assert!(ResolvedBuild::from_lock(&spec, &lock).is_ok());
}

#[test]
fn locked_version_outside_constraint_fails() {
    let spec = fairroot().unwrap();
    let mut lock = lock();
    lock.dependencies.get_mut("fairlogger").unwrap().version = "1.3.0".to_string();
    let err = ResolvedBuild::from_lock(&spec, &lock).unwrap_err();
    assert!(matches!(
        err,
        RecipeError::UnsatisfiableConstraint { ref dependency, .. } if dependency == "fairlogger"
    ));
}

#[test]
fn locked_variant_mismatch_fails() {
    let spec = fairroot().unwrap();
    let lock = BuildLock::from_str(&LOCK_18_2_1.replace("http = true", "http = false")).unwrap();
    let err = ResolvedBuild::from_lock(&spec, &lock).unwrap_err();
    assert!(matches!(
        err,
        RecipeError::UnsatisfiableConstraint { ref dependency, .. } if dependency == "root"
    ));
}

#[test]
fn locked_variants_accept_other_boolean_spellings() {
    let spec = fairroot().unwrap();
    let lock = BuildLock::from_str(&LOCK_18_2_1.replace("http = true", "http = \"on\"")).unwrap();
    let build = ResolvedBuild::from_lock(&spec, &lock).unwrap();
    assert!(build.satisfies(&Predicate::parse("^root+http").unwrap()));
}

#[test]
fn missing_link_dependency_fails() {
    let spec = fairroot().unwrap();
    let mut lock = lock();
    lock.dependencies.remove("protobuf");
    let err = ResolvedBuild::from_lock(&spec, &lock).unwrap_err();
    assert!(matches!(
        err,
        RecipeError::MissingDependency { ref dependency } if dependency == "protobuf"
    ));
}

#[test]
fn lock_for_another_package_is_rejected() {
    let spec = fairroot().unwrap();
    let mut lock = lock();
    lock.package = "fairmq".to_string();
    assert!(matches!(
        ResolvedBuild::from_lock(&spec, &lock).unwrap_err(),
        RecipeError::Manifest { .. }
    ));
}

#[test]
fn lock_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fairroot.lock");
    std::fs::write(&path, lock().to_string_pretty().unwrap()).unwrap();

    let reloaded = BuildLock::from_path(&path).unwrap();
    assert_eq!(reloaded.version, "18.2.1");
    assert_eq!(reloaded.dependencies.len(), 15);
    assert!(BuildLock::from_path(&dir.path().join("missing.lock")).is_err());
}
