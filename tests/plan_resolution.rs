//! Build plan resolution against on-disk server trees

mod support;

use mcpship::fs::RealFileSystem;
use mcpship::plan::{
    BuildPlanResolver, CommandSource, DependencyDescriptor, InferenceFailure, PackageManager,
    PlanError, ResolveOptions, StartCommand,
};
use support::server_fixture;
use yare::parameterized;

fn resolve(name: &str, options: &ResolveOptions) -> Result<mcpship::BuildPlan, PlanError> {
    BuildPlanResolver::new(RealFileSystem::new()).resolve(&server_fixture(name), options)
}

#[parameterized(
    python_uv = { "python-uv", PackageManager::Uv, Some(DependencyDescriptor::ProjectManifest), CommandSource::ProjectScripts, &["weather-mcp"] },
    python_poetry = { "python-poetry", PackageManager::Poetry, Some(DependencyDescriptor::ProjectManifest), CommandSource::ProjectScripts, &["notes-server"] },
    requirements = { "requirements", PackageManager::Pip, Some(DependencyDescriptor::Requirements), CommandSource::ConventionalFile, &["python", "server.py"] },
    setup_py = { "setup-py", PackageManager::Pip, Some(DependencyDescriptor::LegacySetup), CommandSource::LegacySetupScript, &["todo-mcp"] },
    readme_uvx = { "readme-uvx", PackageManager::Pip, Some(DependencyDescriptor::ProjectManifest), CommandSource::Readme, &["uvx", "mcp-server-fetch", "--ignore-robots-txt"] },
    keyword_file = { "keyword-file", PackageManager::Pip, Some(DependencyDescriptor::Requirements), CommandSource::ConventionalFile, &["python", "weather_mcp.py"] },
    package_main = { "package-main", PackageManager::Pip, None, CommandSource::ConventionalFile, &["python", "-m", "package-main"] },
)]
fn test_fixture_plan(
    fixture: &str,
    manager: PackageManager,
    descriptor: Option<DependencyDescriptor>,
    source: CommandSource,
    command: &[&str],
) {
    let plan = resolve(fixture, &ResolveOptions::default()).unwrap();

    assert_eq!(plan.package_manager, manager);
    assert_eq!(
        plan.dependency_artifact.as_ref().map(|a| a.descriptor),
        descriptor
    );
    assert_eq!(plan.command_source, source);
    assert_eq!(plan.start_command.tokens(), command);

    let entrypoint = plan.entrypoint_command.tokens();
    assert_eq!(&entrypoint[..5], &["mcp-proxy", "--debug", "--port", "8000", "--shell"]);
    assert_eq!(entrypoint[5], command[0]);
}

#[test]
fn test_multi_token_entrypoint_uses_separator() {
    let plan = resolve("readme-uvx", &ResolveOptions::default()).unwrap();
    assert_eq!(
        plan.entrypoint_command.tokens(),
        &[
            "mcp-proxy",
            "--debug",
            "--port",
            "8000",
            "--shell",
            "uvx",
            "--",
            "mcp-server-fetch",
            "--ignore-robots-txt"
        ]
    );
}

#[test]
fn test_override_wins_over_readme() {
    let command = StartCommand::new(["python", "-m", "fetch_server"]).unwrap();
    let options = ResolveOptions::default().with_override(command.clone());
    let plan = resolve("readme-uvx", &options).unwrap();

    assert_eq!(plan.start_command, command);
    assert_eq!(plan.command_source, CommandSource::Override);
}

#[test]
fn test_environment_is_carried_into_plan() {
    let options = ResolveOptions::default()
        .with_env("API_BASE", "https://api.example.com")
        .with_env("MODE", "prod");
    let plan = resolve("requirements", &options).unwrap();
    assert_eq!(plan.environment_variables.len(), 2);
    assert_eq!(plan.environment_variables["MODE"], "prod");
}

#[test]
fn test_docker_only_readme_fails() {
    let err = resolve("readme-docker-only", &ResolveOptions::default()).unwrap_err();
    assert_eq!(err.inference_failure(), Some(InferenceFailure::DockerOnly));
    assert!(err.help_message().contains("command_override"));
}

#[test]
fn test_docker_only_readme_fails_even_when_guessing() {
    let err = resolve("readme-docker-only", &ResolveOptions::default().allow_guess(true)).unwrap_err();
    assert_eq!(err.inference_failure(), Some(InferenceFailure::DockerOnly));
}

#[test]
fn test_tree_without_entrypoint_fails_by_default() {
    let err = resolve("no-entrypoint", &ResolveOptions::default()).unwrap_err();
    assert_eq!(err.inference_failure(), Some(InferenceFailure::NothingFound));
}

#[test]
fn test_guess_accepted_when_allowed() {
    let plan = resolve("no-entrypoint", &ResolveOptions::default().allow_guess(true)).unwrap();
    assert_eq!(plan.command_source, CommandSource::Guessed);
    assert_eq!(plan.start_command.tokens(), &["python", "server.py"]);
}

#[test]
fn test_missing_root() {
    let err = resolve("does-not-exist", &ResolveOptions::default()).unwrap_err();
    assert!(matches!(err, PlanError::SourceNotFound(_)));
}

#[test]
fn test_resolution_is_deterministic() {
    let first = resolve("python-uv", &ResolveOptions::default()).unwrap();
    let second = resolve("python-uv", &ResolveOptions::default()).unwrap();
    assert_eq!(first, second);
}
