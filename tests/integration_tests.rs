//! Integration tests for the vangraph CLI
//!
//! These drive the binary against a SQLite board in a temporary directory.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a vangraph Command rooted in `dir`
fn vangraph(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("vangraph");
    cmd.current_dir(dir.path())
        .env_remove("VANGRAPH_PORT")
        .env_remove("VANGRAPH_DB_PATH")
        .env_remove("VANGRAPH_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    vangraph(&dir).arg("init").assert().success();
    dir
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        cargo_bin_cmd!("vangraph").arg("--help").assert().success();
    }

    #[test]
    fn test_version() {
        cargo_bin_cmd!("vangraph")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("vangraph"));
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = TempDir::new().unwrap();

        vangraph(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized vangraph project"));

        assert!(dir.path().join(".vangraph/vangraph.toml").exists());
        assert!(dir.path().join(".vangraph/vangraph.db").exists());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = init_project();
        vangraph(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already present"));
    }

    #[test]
    fn test_project_dir_flag() {
        let dir = TempDir::new().unwrap();
        cargo_bin_cmd!("vangraph")
            .arg("--project-dir")
            .arg(dir.path())
            .arg("init")
            .assert()
            .success();
        assert!(dir.path().join(".vangraph").exists());
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        vangraph(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 3141"))
            .stdout(predicate::str::contains("auto_rebalance = true"));
    }

    #[test]
    fn test_config_validate_warns_on_bad_step() {
        let dir = init_project();
        std::fs::write(
            dir.path().join(".vangraph/vangraph.toml"),
            "[positions]\nstep = -5.0\n",
        )
        .unwrap();

        vangraph(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("positions.step"));
    }

    #[test]
    fn test_invalid_step_is_fatal_for_board_commands() {
        let dir = init_project();
        vangraph(&dir).args(["project", "create", "Demo"]).assert().success();
        std::fs::write(
            dir.path().join(".vangraph/vangraph.toml"),
            "[positions]\nstep = -1000.0\n",
        )
        .unwrap();

        vangraph(&dir)
            .args(["rebalance", "1", "todo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("[positions]"));
        vangraph(&dir)
            .args(["issue", "create", "1", "Card", "--column", "todo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("step -1000"));
        vangraph(&dir)
            .args(["serve", "--in-memory"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("[positions]"));
    }

    #[test]
    fn test_config_validate_clean() {
        let dir = init_project();
        vangraph(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"));
    }
}

// =============================================================================
// Board Tests
// =============================================================================

mod board {
    use super::*;

    #[test]
    fn test_create_move_and_show() {
        let dir = init_project();

        vangraph(&dir)
            .args(["project", "create", "Demo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("#1"));

        vangraph(&dir)
            .args(["issue", "create", "1", "First", "--column", "todo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("position 1000"));
        vangraph(&dir)
            .args(["issue", "create", "1", "Second", "--column", "todo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("position 2000"));
        vangraph(&dir)
            .args(["issue", "create", "1", "Third", "--priority", "high"])
            .assert()
            .success();

        vangraph(&dir)
            .args(["issue", "move", "3", "todo", "--index", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("position 1500"));

        let board = stdout_of(vangraph(&dir).args(["board", "1"]));
        let first = board.find("First").unwrap();
        let third = board.find("Third").unwrap();
        let second = board.find("Second").unwrap();
        assert!(first < third && third < second, "unexpected order:\n{}", board);
        assert!(board.contains("Backlog"));
    }

    #[test]
    fn test_move_to_end_of_column() {
        let dir = init_project();
        vangraph(&dir).args(["project", "create", "Demo"]).assert().success();
        vangraph(&dir)
            .args(["issue", "create", "1", "Shipped", "--column", "done"])
            .assert()
            .success();
        vangraph(&dir)
            .args(["issue", "create", "1", "Mover"])
            .assert()
            .success();

        vangraph(&dir)
            .args(["issue", "move", "2", "done"])
            .assert()
            .success()
            .stdout(predicate::str::contains("position 2000"));

        let listing = stdout_of(vangraph(&dir).args(["issue", "list", "1", "--column", "done"]));
        assert!(listing.contains("Shipped"));
        assert!(listing.contains("Mover"));
    }

    #[test]
    fn test_invalid_column_rejected() {
        let dir = init_project();
        vangraph(&dir).args(["project", "create", "Demo"]).assert().success();
        vangraph(&dir)
            .args(["issue", "create", "1", "Card", "--column", "archive"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("archive"));
    }

    #[test]
    fn test_move_unknown_issue_fails() {
        let dir = init_project();
        vangraph(&dir)
            .args(["issue", "move", "42", "done"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("42"));
    }

    #[test]
    fn test_rebalance_column() {
        let dir = init_project();
        vangraph(&dir).args(["project", "create", "Demo"]).assert().success();
        for title in ["A", "B", "C"] {
            vangraph(&dir)
                .args(["issue", "create", "1", title, "--column", "todo"])
                .assert()
                .success();
        }
        // Pull C between A and B so positions are no longer evenly spaced.
        vangraph(&dir)
            .args(["issue", "move", "3", "todo", "--index", "1"])
            .assert()
            .success();

        vangraph(&dir)
            .args(["rebalance", "1", "todo"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Rebalanced 3 issue(s)"))
            .stdout(predicate::str::contains("3000"));
    }

    #[test]
    fn test_project_list() {
        let dir = init_project();
        vangraph(&dir)
            .args(["project", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No projects yet"));
        vangraph(&dir)
            .args(["project", "create", "Alpha", "--description", "first"])
            .assert()
            .success();
        vangraph(&dir)
            .args(["project", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Alpha"));
    }
}
