//! Generation pass integration tests
//!
//! Tests the complete `generate_for_print_env` pass including:
//! - Files written and their locations
//! - Template variant selection
//! - Glibc patch flake
//! - Git staging inside and outside a repository
//! - Idempotence of repeated passes

mod common;

use common::*;
use flakeforge_core::testing::RecordingRunner;
use flakeforge_core::{CommandOutput, ProjectConfig};
use flakeforge_gen::{generate_for_print_env, GenerationContext, Tracking};

fn basic_plan() -> flakeforge_gen::BuildPlan {
    PlanBuilder::new()
        .with_input(
            "nixpkgs-f80ac8",
            &format!("github:NixOS/nixpkgs/{}", COMMIT),
            &["hello", "jq"],
        )
        .with_package("hello", "nixpkgs#hello", false)
        .with_package("jq", "nixpkgs#jq", false)
        .with_env("EDITOR", "vim")
        .build()
}

#[tokio::test]
async fn test_writes_all_files() {
    let project = TestProject::new();
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();

    generate_for_print_env(&mut ctx, &project, &basic_plan(), &runner)
        .await
        .unwrap();

    let shell = project.read(".flakeforge/gen/shell.nix");
    assert!(shell.contains("devShells.x86_64-linux.default"));

    let gitignore = project.read(".flakeforge/.gitignore");
    assert!(gitignore.contains("gen/"));

    let flake = project.read(".flakeforge/gen/flake/flake.nix");
    assert!(flake.contains("nixpkgs-f80ac8.legacyPackages.x86_64-linux.jq"));
    assert!(flake.contains(r#"{"EDITOR":"vim"}"#));
    assert!(!project.flake_dir().join("glibc-patch").exists());
}

#[tokio::test]
async fn test_remove_nixpkgs_variant() {
    let mut project = TestProject::new();
    project.remove_nixpkgs = true;
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();

    generate_for_print_env(&mut ctx, &project, &basic_plan(), &runner)
        .await
        .unwrap();

    let flake = project.read(".flakeforge/gen/flake/flake.nix");
    assert!(flake.contains("flake = false;"));
}

#[tokio::test]
async fn test_outside_repository_runs_no_git() {
    let project = TestProject::new();
    if project.has_foreign_repository() {
        return;
    }
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();

    let tracking = generate_for_print_env(&mut ctx, &project, &basic_plan(), &runner)
        .await
        .unwrap();

    assert_eq!(tracking, Tracking::NotInRepository);
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_inside_repository_stages_flake() {
    let project = TestProject::in_git_repo();
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();

    let tracking = generate_for_print_env(&mut ctx, &project, &basic_plan(), &runner)
        .await
        .unwrap();

    assert_eq!(
        tracking,
        Tracking::Staged {
            files: vec!["flake.nix".to_string()]
        }
    );
    let flake_dir = project.flake_dir();
    assert_eq!(
        runner.lines(),
        vec![
            format!("git -C {} init", flake_dir),
            format!("git -C {} add flake.nix", flake_dir),
        ]
    );
}

#[tokio::test]
async fn test_glibc_patch_flake() {
    let project = TestProject::in_git_repo();
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();
    let plan = PlanBuilder::new()
        .with_package(
            "python",
            "github:NixOS/nixpkgs/5ed627539ac84809c78b2dd6d26a5cebeb5ae269#python3",
            true,
        )
        .build();

    let tracking = generate_for_print_env(&mut ctx, &project, &plan, &runner)
        .await
        .unwrap();

    let patch = project.read(".flakeforge/gen/flake/glibc-patch/flake.nix");
    assert!(patch.contains(&format!("github:NixOS/nixpkgs/{}", COMMIT)));
    assert!(project
        .flake_dir()
        .join("glibc-patch/glibc-patch.bash")
        .exists());

    let flake = project.read(".flakeforge/gen/flake/flake.nix");
    assert!(flake.contains("glibc-patch.url = \"path:./glibc-patch\";"));
    assert!(flake.contains("glibc-patch.packages.x86_64-linux.\"python\""));

    assert_eq!(
        tracking,
        Tracking::Staged {
            files: vec![
                "flake.nix".to_string(),
                "glibc-patch/flake.nix".to_string(),
                "glibc-patch/glibc-patch.bash".to_string(),
            ]
        }
    );
}

#[tokio::test]
async fn test_invalid_glibc_installable_fails_before_flake() {
    let project = TestProject::new();
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();
    let plan = PlanBuilder::new()
        .with_package("python", "python3", true)
        .build();

    let err = generate_for_print_env(&mut ctx, &project, &plan, &runner)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("glibc patch"));
    assert!(!project.flake_dir().join("flake.nix").exists());
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_second_pass_leaves_files_untouched() {
    let project = TestProject::new();
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();
    let plan = basic_plan();

    generate_for_print_env(&mut ctx, &project, &plan, &runner)
        .await
        .unwrap();
    let flake = project.flake_dir().join("flake.nix");
    let before = age(&flake);

    generate_for_print_env(&mut ctx, &project, &plan, &runner)
        .await
        .unwrap();

    assert_eq!(mtime(&flake), before);
}

#[tokio::test]
async fn test_plan_change_rewrites_flake() {
    let project = TestProject::new();
    let runner = RecordingRunner::new();
    let mut ctx = GenerationContext::default();

    generate_for_print_env(&mut ctx, &project, &basic_plan(), &runner)
        .await
        .unwrap();
    let plan = PlanBuilder::new()
        .with_input("nixpkgs-f80ac8", "github:NixOS/nixpkgs/abc", &["ripgrep"])
        .build();
    generate_for_print_env(&mut ctx, &project, &plan, &runner)
        .await
        .unwrap();

    let flake = project.read(".flakeforge/gen/flake/flake.nix");
    assert!(flake.contains("ripgrep"));
    assert!(!flake.contains(".jq"));
}

#[tokio::test]
async fn test_git_failure_is_reported() {
    let project = TestProject::in_git_repo();
    let runner = RecordingRunner::new();
    runner.respond(" init", CommandOutput::failure(1, "fatal: cannot mkdir"));
    let mut ctx = GenerationContext::default();

    let err = generate_for_print_env(&mut ctx, &project, &basic_plan(), &runner)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("fatal: cannot mkdir"));
    assert!(project.flake_dir().join("flake.nix").exists());
}
