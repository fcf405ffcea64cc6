// tests/config_loading.rs

use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;
use reactor::cli::CliArgs;
use reactor::config::{default_config_path, load_and_validate, load_from_path};
use reactor::dag::DependencyGraph;
use reactor::errors::ReactorError;
use reactor::types::ReactorFailureBehaviour;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_descriptor_loads_with_defaults() {
    let file = write_config(
        r#"
[reactor]
root = "com.example:parent"
threads = "1.5C"
failure_behaviour = "fail-fast"

[[default.execution]]
phase = "validate"
cmd = "echo validate"

[plugin.site.goal.stage]
cmd = "echo staging"
aggregator = true
fork_phase = "package"

[project."com.example:parent"]

[project."com.example:api"]
dir = "api"
depends_on = ["com.example:parent"]
[[project."com.example:api".execution]]
phase = "compile"
cmd = "make"

[project."com.example:core"]
depends_on = ["com.example:api"]
[[project."com.example:core".execution]]
phase = "test"
id = "unit-tests"
cmd = "make test"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.reactor.threads.as_deref(), Some("1.5C"));
    assert_eq!(cfg.reactor.failure_behaviour, ReactorFailureBehaviour::FailFast);
    assert!(!cfg.reactor.weave);
    assert_eq!(cfg.reactor.shutdown_grace_ms, 5000);
    assert_eq!(cfg.lifecycle.phases.first().map(String::as_str), Some("validate"));
    assert_eq!(cfg.project.len(), 3);
    assert!(cfg.plugin["site"].goal["stage"].aggregator);

    let graph = DependencyGraph::from_config(&cfg).unwrap();
    let order: Vec<&str> = graph.projects().iter().map(|p| p.key().as_str()).collect();
    assert_eq!(
        order,
        vec!["com.example:parent", "com.example:api", "com.example:core"]
    );
}

#[test]
fn project_cycle_returns_structured_error() {
    let file = write_config(
        r#"
[project."g:a"]
depends_on = ["g:b"]

[project."g:b"]
depends_on = ["g:a"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ReactorError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("g:a") || msg.contains("g:b"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_dependency_returns_config_error() {
    let file = write_config(
        r#"
[project."g:a"]
depends_on = ["g:missing"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ReactorError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("g:missing"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let file = write_config(
        r#"
[project."g:a"]
depends_on = ["g:a"]
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ReactorError::ConfigError(msg)) if msg.contains("itself")
    ));
}

#[test]
fn execution_bound_to_unknown_phase_is_rejected() {
    let file = write_config(
        r#"
[lifecycle]
phases = ["compile", "test"]

[project."g:a"]
[[project."g:a".execution]]
phase = "deploy"
cmd = "echo deploy"
"#,
    );

    match load_and_validate(file.path()) {
        Err(ReactorError::ConfigError(msg)) => assert!(msg.contains("deploy")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn root_must_be_a_declared_project() {
    let file = write_config(
        r#"
[reactor]
root = "g:nowhere"

[project."g:a"]
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(ReactorError::ConfigError(msg)) if msg.contains("g:nowhere")
    ));
}

#[test]
fn duplicate_or_empty_lifecycle_is_rejected() {
    let dup = write_config("[lifecycle]\nphases = [\"compile\", \"compile\"]\n");
    assert!(matches!(
        load_and_validate(dup.path()),
        Err(ReactorError::ConfigError(_))
    ));

    let empty = write_config("[lifecycle]\nphases = []\n");
    assert!(matches!(
        load_and_validate(empty.path()),
        Err(ReactorError::ConfigError(_))
    ));
}

#[test]
fn invalid_failure_behaviour_is_a_toml_error() {
    let file = write_config("[reactor]\nfailure_behaviour = \"sometimes\"\n");

    assert!(matches!(
        load_from_path(file.path()),
        Err(ReactorError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Reactor.toml"),
        Err(ReactorError::IoError(_))
    ));
}

#[test]
fn failure_behaviour_parses_from_cli_spellings() {
    assert_eq!(
        "fail_at_end".parse::<ReactorFailureBehaviour>(),
        Ok(ReactorFailureBehaviour::FailAtEnd)
    );
    assert_eq!(
        "FAIL-NEVER".parse::<ReactorFailureBehaviour>(),
        Ok(ReactorFailureBehaviour::FailNever)
    );
    assert!("never".parse::<ReactorFailureBehaviour>().is_err());
    assert_eq!(ReactorFailureBehaviour::FailFast.to_string(), "fail-fast");
}

#[test]
fn cli_reads_default_descriptor_unless_overridden() {
    let args = CliArgs::try_parse_from(["reactor", "install"]).unwrap();
    assert_eq!(args.file, default_config_path());
    assert_eq!(args.goals, vec!["install"]);

    let args = CliArgs::try_parse_from(["reactor", "-f", "build/Reactor.toml"]).unwrap();
    assert_eq!(args.file, std::path::PathBuf::from("build/Reactor.toml"));
}
