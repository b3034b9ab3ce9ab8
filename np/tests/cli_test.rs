//! Integration tests for the `np` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `np` isolated in a temp home with a config pointing the store into it
fn np(home: &Path) -> Command {
    let config = home.join("nomadpost.yml");
    if !config.exists() {
        let store = home.join("store");
        let posts = home.join("posts");
        fs::write(
            &config,
            format!(
                "storage:\n  placestore-dir: {}\npublisher:\n  kind: file\n  output-dir: {}\n",
                store.display(),
                posts.display()
            ),
        )
        .expect("write config");
    }

    let mut cmd = Command::cargo_bin("np").expect("np binary");
    cmd.env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("MIN_DAYS_PER_LOCATION")
        .env_remove("MAX_DAYS_PER_LOCATION")
        .env_remove("POST_GENERATION_SCHEDULE")
        .env_remove("IMAGE_PROVIDER")
        .arg("--config")
        .arg(&config);
    cmd
}

// =============================================================================
// Help and Parsing
// =============================================================================

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().expect("Failed to create temp dir");
    np(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cycle"))
        .stdout(predicate::str::contains("journey"))
        .stdout(predicate::str::contains("settings"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let home = TempDir::new().expect("Failed to create temp dir");
    np(home.path()).arg("teleport").assert().failure();
}

// =============================================================================
// Read-only Commands on an Empty Store
// =============================================================================

#[test]
fn test_status_without_journey() {
    let home = TempDir::new().expect("Failed to create temp dir");
    np(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No journey yet"));
}

#[test]
fn test_journey_and_posts_empty() {
    let home = TempDir::new().expect("Failed to create temp dir");
    np(home.path())
        .arg("journey")
        .assert()
        .success()
        .stdout(predicate::str::contains("No journey yet"));
    np(home.path())
        .arg("posts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No posts published yet"));
}

// =============================================================================
// Settings
// =============================================================================

#[test]
fn test_settings_set_get_unset() {
    let home = TempDir::new().expect("Failed to create temp dir");

    np(home.path())
        .args(["settings", "set", "max-days-per-location", "14"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored"));
    np(home.path())
        .args(["settings", "get", "max-days-per-location"])
        .assert()
        .success()
        .stdout(predicate::str::contains("14"));
    np(home.path())
        .args(["settings", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max-days-per-location"));
    np(home.path())
        .args(["settings", "unset", "max-days-per-location"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    np(home.path())
        .args(["settings", "get", "max-days-per-location"])
        .assert()
        .failure();
}

#[test]
fn test_settings_reject_bad_values() {
    let home = TempDir::new().expect("Failed to create temp dir");

    np(home.path())
        .args(["settings", "set", "favourite-colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
    np(home.path())
        .args(["settings", "set", "min-days-per-location", "zero"])
        .assert()
        .failure();
    np(home.path())
        .args(["settings", "set", "post-generation-schedule", "every morning"])
        .assert()
        .failure();
    // Default max is 21, so a min above it is refused
    np(home.path())
        .args(["settings", "set", "min-days-per-location", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to store"));
}

#[test]
fn test_cycle_requires_api_key() {
    let home = TempDir::new().expect("Failed to create temp dir");
    np(home.path())
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .arg("cycle")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key not found"));
}
