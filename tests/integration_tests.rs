//! Integration tests for the Shelfwise CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to get a shelfwise command isolated from the user's config
fn shelfwise(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shelfwise").unwrap();
    cmd.current_dir(tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".xdg"))
        .env("SHELFWISE_USER", "tester")
        .env_remove("SHELFWISE_OFFLINE")
        .env_remove("SHELFWISE_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    shelfwise(&tmp).arg("init").assert().success();
    tmp
}

/// Run a command with `--format id` and return its single line of output
fn id_of(tmp: &TempDir, args: &[&str]) -> String {
    let output = shelfwise(tmp)
        .args(args)
        .args(["--format", "id"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

struct Shelf {
    warehouse: String,
    shelf: String,
    column: String,
}

/// Warehouse -> zone -> bay -> shelf -> one column of the given height
fn build_shelf(tmp: &TempDir, max_height: &str) -> Shelf {
    let warehouse = id_of(tmp, &["warehouse", "new", "--name", "Main"]);
    let zone = id_of(tmp, &["add", "zone", &warehouse, "--name", "Dry"]);
    let bay = id_of(tmp, &["add", "bay", &zone, "--name", "A"]);
    let shelf = id_of(tmp, &["add", "shelf", &bay, "--name", "1"]);
    let column = id_of(tmp, &["add", "column", &shelf, "--max-height", max_height]);
    Shelf {
        warehouse,
        shelf,
        column,
    }
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    shelfwise(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("warehouse"))
        .stdout(predicate::str::contains("tray"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    shelfwise(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shelfwise"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    shelfwise(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shelfwise"));
}

// ============================================================================
// Init & Config Tests
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = setup_test_project();
    assert!(tmp.path().join(".shelfwise/config.yaml").exists());
    assert!(tmp.path().join(".shelfwise/store.db").exists());
}

#[test]
fn test_init_twice_reports_existing_project() {
    let tmp = setup_test_project();
    shelfwise(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    shelfwise(&tmp)
        .args(["warehouse", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a Shelfwise project"));
}

#[test]
fn test_config_show_reports_env_user() {
    let tmp = setup_test_project();
    shelfwise(&tmp)
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"user\": \"tester\""));
}

#[test]
fn test_project_flag_from_elsewhere() {
    let tmp = setup_test_project();
    let elsewhere = TempDir::new().unwrap();
    shelfwise(&elsewhere)
        .args(["warehouse", "list", "--project"])
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No warehouses found"));
}

// ============================================================================
// Hierarchy Tests
// ============================================================================

#[test]
fn test_warehouse_new_and_list() {
    let tmp = setup_test_project();
    let id = id_of(&tmp, &["warehouse", "new", "--name", "North"]);
    assert_eq!(id.len(), 26);

    shelfwise(&tmp)
        .args(["warehouse", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("North"))
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("tester"));
}

#[test]
fn test_add_paths_nest_under_parent() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "3");
    assert!(shelf.column.starts_with(&format!("warehouses/{}/zones/", shelf.warehouse)));
    assert!(shelf.column.contains("/bays/"));
    assert!(shelf.column.contains("/shelves/"));
    assert!(shelf.column.contains("/columns/"));
}

#[test]
fn test_add_zone_requires_name() {
    let tmp = setup_test_project();
    let warehouse = id_of(&tmp, &["warehouse", "new", "--name", "Main"]);
    shelfwise(&tmp)
        .args(["add", "zone", &warehouse])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name is required"));
}

#[test]
fn test_add_under_wrong_kind_fails() {
    let tmp = setup_test_project();
    let warehouse = id_of(&tmp, &["warehouse", "new", "--name", "Main"]);
    shelfwise(&tmp)
        .args(["add", "bay", &warehouse, "--name", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a zone"));
}

#[test]
fn test_unknown_warehouse_fails_to_load() {
    let tmp = setup_test_project();
    shelfwise(&tmp)
        .args(["tree", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_tree_lists_every_level() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "2");
    id_of(&tmp, &["tray", "add", &shelf.column, "--weight", "4"]);

    shelfwise(&tmp)
        .args(["tree", &shelf.warehouse])
        .assert()
        .success()
        .stdout(predicate::str::contains("Main"))
        .stdout(predicate::str::contains("Dry"))
        .stdout(predicate::str::contains("(max 2)"))
        .stdout(predicate::str::contains("4.00kg"));

    let output = shelfwise(&tmp)
        .args(["tree", &shelf.warehouse, "--depth", "bay", "--format", "id"])
        .output()
        .unwrap();
    let lines = String::from_utf8_lossy(&output.stdout).lines().count();
    assert_eq!(lines, 3);
}

// ============================================================================
// Category & Tray Tests
// ============================================================================

#[test]
fn test_category_add_and_list() {
    let tmp = setup_test_project();
    let warehouse = id_of(&tmp, &["warehouse", "new", "--name", "Main"]);
    id_of(
        &tmp,
        &["category", "add", &warehouse, "--name", "Tinned tomatoes", "--short", "TOM"],
    );

    shelfwise(&tmp)
        .args(["category", "list", &warehouse, "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tinned tomatoes\tTOM"));
}

#[test]
fn test_tray_add_with_unknown_category_fails() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "3");
    shelfwise(&tmp)
        .args(["tray", "add", &shelf.column, "--category", "BEANS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no category 'BEANS'"));
}

#[test]
fn test_shelf_show_pads_column() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "3");
    id_of(&tmp, &["category", "add", &shelf.warehouse, "--name", "Soup", "--short", "SP"]);
    id_of(&tmp, &["tray", "add", &shelf.column, "--category", "sp", "--expiry", "2026-05"]);

    let output = shelfwise(&tmp)
        .args(["shelf", "show", &shelf.shelf, "--format", "tsv"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("0.0\t"));
    assert!(lines[0].contains("SP May 2026"));
    assert!(lines[1].starts_with("0.1\t-\t(empty)"));
    assert!(lines[2].starts_with("0.2\t-\t(empty)"));
}

#[test]
fn test_shelf_select_range() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "4");
    id_of(&tmp, &["tray", "add", &shelf.column]);

    shelfwise(&tmp)
        .args(["shelf", "select", &shelf.shelf, "0.2", "0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 cell(s) selected"));
}

#[test]
fn test_tray_set_updates_fields() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "3");
    let tray = id_of(&tmp, &["tray", "add", &shelf.column]);

    shelfwise(&tmp)
        .args(["tray", "set", &tray, "--weight", "12.5", "--comment", "dented"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"))
        .stdout(predicate::str::contains("weight"));

    shelfwise(&tmp)
        .args(["tree", &tray, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("12.5"))
        .stdout(predicate::str::contains("dented"));

    shelfwise(&tmp)
        .args(["tray", "set", &tray, "--weight", "12.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_tray_set_rejects_non_finite_weight() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "3");
    let tray = id_of(&tmp, &["tray", "add", &shelf.column]);

    for weight in ["NaN", "inf"] {
        shelfwise(&tmp)
            .args(["tray", "set", &tray, "--weight", weight])
            .assert()
            .failure()
            .stderr(predicate::str::contains("finite"));
    }

    // nothing was written
    shelfwise(&tmp)
        .args(["tree", &tray, "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NaN").not());
}

#[test]
fn test_tray_rm_reindexes_remaining_trays() {
    let tmp = setup_test_project();
    let shelf = build_shelf(&tmp, "0");
    let bottom = id_of(&tmp, &["tray", "add", &shelf.column, "--weight", "1"]);
    id_of(&tmp, &["tray", "add", &shelf.column, "--weight", "2"]);

    shelfwise(&tmp)
        .args(["tray", "rm", &bottom])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed tray"));

    // the former second tray now sits at index 0, followed by one free slot
    let output = shelfwise(&tmp)
        .args(["shelf", "show", &shelf.shelf, "--format", "tsv"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("#0"));
    assert!(lines[0].contains("2.00kg"));
}

// ============================================================================
// Offline Mode
// ============================================================================

#[test]
fn test_offline_writes_are_discarded() {
    let tmp = setup_test_project();
    shelfwise(&tmp)
        .env("SHELFWISE_OFFLINE", "1")
        .args(["warehouse", "new", "--name", "Ghost"])
        .assert()
        .success();

    shelfwise(&tmp)
        .args(["warehouse", "list", "--format", "id"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
