//! End-to-end tests: definition file on disk to result document on disk.

use std::fs;

use lineage_analyzer::{AnalyzerError, SimpleDefinitionFile, create_flat_result};
use lineage_core::{
    Identifier, PackageLinkage, PipelineResult, ScopeExcludeReason, Severity, VcsType, format,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

const DEFINITION_TOML: &str = r#"
name = "storefront"
vcs_type = "Git"
vcs_url = "git@github.com:acme/storefront.git"
vcs_revision = "main"

[[dependencies]]
id = "Maven:org.example:http-client:2.1.0"
vcs_type = "Git"
vcs_url = "https://github.com/example/http-client.git"
vcs_revision = "v2.1.0"
dependencies = ["Maven:org.example:codec:1.4"]

[[dependencies]]
id = "Maven:org.example:codec:1.4"
source_artifact_url = "https://repo.example.org/codec-1.4-sources.jar"
is_dynamically_linked = true

[[dependencies]]
id = "Maven:org.junit:junit:4.13"
is_excluded = true
"#;

fn write_definition(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn storefront() -> PipelineResult {
    let dir = TempDir::new().unwrap();
    let path = write_definition(&dir, "definition.toml", DEFINITION_TOML);
    let definition = SimpleDefinitionFile::read(&path).unwrap();
    create_flat_result(&definition).unwrap()
}

#[test]
fn builds_the_unmanaged_project() {
    let result = storefront();
    let analyzer = &result.analyzer.result;

    assert_eq!(analyzer.projects.len(), 1);
    let project = analyzer.projects.iter().next().unwrap();
    assert_eq!(project.id.to_string(), "Unmanaged::storefront:");
    assert_eq!(project.vcs.url, "git@github.com:acme/storefront.git");
    assert_eq!(project.vcs_processed.url, "https://github.com/acme/storefront");
    assert_eq!(project.scope_names(), vec!["excluded", "main"]);

    assert_eq!(result.repository.vcs.url, "https://github.com/acme/storefront");
    assert_eq!(result.repository.vcs.vcs_type, VcsType::Git);
    let excludes = &result.repository.config.excludes.scopes;
    assert_eq!(excludes.len(), 1);
    assert_eq!(excludes[0].pattern, "excluded");
    assert_eq!(excludes[0].reason, ScopeExcludeReason::DevDependencyOf);
    assert!(result.provenance.is_none());
}

#[test]
fn scopes_hold_trees_with_linkage() {
    let result = storefront();
    let project = result.analyzer.result.projects.iter().next().unwrap();

    let main = project.scope("main").unwrap();
    let client = main
        .dependencies
        .iter()
        .find(|dep| dep.id.name == "http-client")
        .unwrap();
    assert_eq!(client.linkage, PackageLinkage::Static);
    let codec = client.dependencies.iter().next().unwrap();
    assert_eq!(codec.id.name, "codec");
    assert_eq!(codec.linkage, PackageLinkage::Dynamic);

    let excluded = project.scope("excluded").unwrap();
    assert_eq!(excluded.dependencies.len(), 1);
    assert!(result.is_excluded(&Identifier::from("Maven:org.junit:junit:4.13")));
    assert!(!result.is_excluded(&Identifier::from("Maven:org.example:codec:1.4")));
}

#[test]
fn packages_carry_origins() {
    let result = storefront();
    let packages = &result.analyzer.result.packages;
    assert_eq!(packages.len(), 3);

    let client = &packages[&Identifier::from("Maven:org.example:http-client:2.1.0")];
    assert_eq!(client.vcs_processed.url, "https://github.com/example/http-client");
    assert_eq!(client.vcs_processed.revision, "v2.1.0");
    assert!(client.source_artifact.is_none());

    let codec = &packages[&Identifier::from("Maven:org.example:codec:1.4")];
    assert!(codec.vcs.is_empty());
    let artifact = codec.source_artifact.as_ref().unwrap();
    assert_eq!(artifact.url, "https://repo.example.org/codec-1.4-sources.jar");
    assert!(artifact.hash.is_none());

    assert!(result.analyzer.result.dangling_references().is_empty());
    assert!(result.analyzer.result.issues.is_empty());
}

#[rstest]
#[case("result.json")]
#[case("result.toml")]
fn written_result_reads_back_equal(#[case] file_name: &str) {
    let result = storefront();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out").join(file_name);

    format::write_value(&path, &result).unwrap();
    let recovered: PipelineResult = format::read_value(&path).unwrap();

    assert_eq!(recovered, result);
}

#[test]
fn json_definitions_are_read_too() {
    let dir = TempDir::new().unwrap();
    let path = write_definition(
        &dir,
        "definition.json",
        r#"{ "name": "tiny", "dependencies": [ { "id": "NPM::left-pad:1.3.0" } ] }"#,
    );

    let result = create_flat_result(&SimpleDefinitionFile::read(&path).unwrap()).unwrap();

    let project = result.analyzer.result.projects.iter().next().unwrap();
    assert_eq!(project.id.to_string(), "Unmanaged::tiny:");
    assert!(project.scope("excluded").unwrap().is_empty());
    assert!(result.repository.vcs.is_empty());
}

#[test]
fn cycles_become_warnings_on_the_project() {
    let dir = TempDir::new().unwrap();
    let path = write_definition(
        &dir,
        "cyclic.toml",
        r#"
name = "cyclic"

[[dependencies]]
id = "Cargo::ping:1.0"
dependencies = ["Cargo::pong:1.0"]

[[dependencies]]
id = "Cargo::pong:1.0"
dependencies = ["Cargo::ping:1.0"]
"#,
    );

    let result = create_flat_result(&SimpleDefinitionFile::read(&path).unwrap()).unwrap();

    let issues = &result.analyzer.result.issues[&Identifier::from("Unmanaged::cyclic:")];
    assert!(!issues.is_empty());
    assert!(issues.iter().all(|issue| issue.severity == Severity::Warning));
    let project = result.analyzer.result.projects.iter().next().unwrap();
    let main = project.scope("main").unwrap();
    assert!(main.dependencies.iter().all(|tree| tree.depth() == 1));
}

#[test]
fn invalid_descriptors_fail_the_whole_build() {
    let dir = TempDir::new().unwrap();
    let path = write_definition(
        &dir,
        "broken.toml",
        r#"
name = "broken"

[[dependencies]]
id = "NPM::fine:1.0"

[[dependencies]]
id = "NPM:::2.0"
"#,
    );
    let definition = SimpleDefinitionFile::read(&path).unwrap();

    let error = create_flat_result(&definition).unwrap_err();

    assert!(matches!(error, AnalyzerError::Validation(ref problems) if problems.len() == 1));
    assert!(error.to_string().contains("dependency #1"));
}

#[test]
fn unknown_extensions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_definition(&dir, "definition.yml", "name: x");

    assert!(matches!(
        SimpleDefinitionFile::read(&path),
        Err(AnalyzerError::Core(_))
    ));
}
