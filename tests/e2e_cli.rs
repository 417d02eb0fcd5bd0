//! End-to-end tests for the `bt` binary.
//!
//! Each test gets its own temp workspace; outputs are checked through
//! `--json` and errors through the structured JSON printed to stderr.

mod common;

use common::cli::{BtRun, BtWorkspace, run_bt, run_bt_with_env};
use serde_json::Value;

const USER: &str = "0000000a-0000-0000-0000-0000000000aa";
const COMPONENT: &str = "000000c0-0000-0000-0000-0000000000c0";

/// Initialized workspace with `COMPONENT` registered.
fn registered_workspace() -> BtWorkspace {
    BtWorkspace::with_component(COMPONENT, USER)
}

fn create(workspace: &BtWorkspace, title: &str, extra: &[&str], label: &str) -> Value {
    let mut args = vec!["create", title, "-c", COMPONENT, "--user", USER, "--json"];
    args.extend_from_slice(extra);
    let run = run_bt(workspace, args, label);
    assert!(run.status.success(), "create failed: {}", run.stderr);
    run.json()
}

fn assert_error(run: &BtRun, exit: i32, code: &str) {
    assert_eq!(run.status.code(), Some(exit), "stderr: {}", run.stderr);
    assert_eq!(run.stderr_json()["error"]["code"], code);
}

fn titles(result: &Value) -> Vec<String> {
    result["issues"]
        .as_array()
        .expect("issues array")
        .iter()
        .map(|issue| issue["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn e2e_init_creates_workspace() {
    let _log = common::test_log("e2e_init_creates_workspace");
    let workspace = BtWorkspace::new();

    let run = run_bt(&workspace, ["init", "--json"], "init");
    assert!(run.status.success(), "init failed: {}", run.stderr);
    assert!(workspace.root.join(".bugtrack").join("bugtrack.db").exists());
    assert!(workspace.root.join(".bugtrack").join("config.yaml").exists());

    let again = run_bt(&workspace, ["init", "--json"], "init_again");
    assert_error(&again, 2, "ALREADY_INITIALIZED");

    let forced = run_bt(&workspace, ["init", "--force"], "init_force");
    assert!(forced.status.success(), "forced init failed: {}", forced.stderr);
}

#[test]
fn e2e_commands_require_workspace() {
    let _log = common::test_log("e2e_commands_require_workspace");
    let workspace = BtWorkspace::new();

    let run = run_bt(&workspace, ["list", "--json"], "list_uninit");
    assert_error(&run, 2, "NOT_INITIALIZED");
}

#[test]
fn e2e_create_show_list_search() {
    let _log = common::test_log("e2e_create_show_list_search");
    let workspace = registered_workspace();

    let created = create(
        &workspace,
        "Login page crashes",
        &["-p", "P0", "-s", "S0", "-l", "ui,login"],
        "create_login",
    );
    assert_eq!(created["status"], "NEW");
    assert_eq!(created["priority"], "P0");
    assert_eq!(created["severity"], "S0");
    assert_eq!(created["sla"]["hours"], 2);
    assert_eq!(created["due_date"], created["sla"]["target_date"]);
    assert_eq!(created["reporter_id"], USER);
    let id = created["id"].as_str().expect("id").to_string();

    create(&workspace, "Typo in footer", &["-p", "P4", "-s", "S3"], "create_typo");

    let show = run_bt(&workspace, ["show", &id, "--json"], "show");
    assert!(show.status.success(), "show failed: {}", show.stderr);
    let details = show.json();
    assert_eq!(details["title"], "Login page crashes");
    assert_eq!(details["labels"], serde_json::json!(["login", "ui"]));

    let list = run_bt(&workspace, ["list", "--json"], "list");
    assert!(list.status.success(), "list failed: {}", list.stderr);
    let result = list.json();
    assert_eq!(result["total"], 2);
    assert_eq!(titles(&result), vec!["Typo in footer", "Login page crashes"]);

    let search = run_bt(&workspace, ["search", "priority:P0", "crash", "--json"], "search");
    assert!(search.status.success(), "search failed: {}", search.stderr);
    assert_eq!(titles(&search.json()), vec!["Login page crashes"]);

    let paged = run_bt(&workspace, ["list", "--limit", "1", "--json"], "list_paged");
    let first = paged.json();
    assert_eq!(titles(&first), vec!["Typo in footer"]);
    let token = first["next_page_token"].as_str().expect("token").to_string();
    let next = run_bt(
        &workspace,
        ["list", "--limit", "1", "--page-token", &token, "--json"],
        "list_next",
    );
    let second = next.json();
    assert_eq!(titles(&second), vec!["Login page crashes"]);
    assert!(second.get("next_page_token").is_none());
}

#[test]
fn e2e_create_errors() {
    let _log = common::test_log("e2e_create_errors");
    let workspace = registered_workspace();

    let anonymous = run_bt(
        &workspace,
        ["create", "No reporter", "-c", COMPONENT, "--json"],
        "create_anonymous",
    );
    assert_error(&anonymous, 3, "IDENTITY_REQUIRED");

    let bad_priority = run_bt(
        &workspace,
        ["create", "Bad", "-c", COMPONENT, "-p", "P9", "--user", USER, "--json"],
        "create_bad_priority",
    );
    assert_error(&bad_priority, 4, "INVALID_PRIORITY");

    let bad_component = run_bt(
        &workspace,
        ["create", "Bad", "-c", "web", "--user", USER, "--json"],
        "create_bad_component",
    );
    assert_error(&bad_component, 4, "INVALID_ID");

    let unregistered = run_bt(
        &workspace,
        [
            "create",
            "Bad",
            "-c",
            "000000c1-0000-0000-0000-0000000000c1",
            "--user",
            USER,
            "--json",
        ],
        "create_unregistered_component",
    );
    assert_error(&unregistered, 3, "COMPONENT_NOT_FOUND");

    let blank_search = run_bt(&workspace, ["search", "--json"], "search_blank");
    assert_error(&blank_search, 4, "VALIDATION_FAILED");

    let missing = run_bt(
        &workspace,
        ["show", "00000000-0000-0000-0000-000000000001", "--json"],
        "show_missing",
    );
    assert_error(&missing, 3, "ISSUE_NOT_FOUND");
}

#[test]
fn e2e_component_and_team_registry() {
    let _log = common::test_log("e2e_component_and_team_registry");
    let workspace = BtWorkspace::initialized();

    let team = run_bt(
        &workspace,
        ["team", "create", "Payments", "--user", USER, "--json"],
        "team_create",
    );
    assert!(team.status.success(), "team create failed: {}", team.stderr);
    let team = team.json();
    assert_eq!(team["lead_id"], USER);
    let team_id = team["id"].as_str().expect("team id").to_string();

    let component = run_bt(
        &workspace,
        ["component", "create", "checkout", "--team", &team_id, "--user", USER, "--json"],
        "component_create",
    );
    assert!(component.status.success(), "component create failed: {}", component.stderr);
    let component = component.json();
    assert_eq!(component["team_id"], team_id.as_str());
    let component_id = component["id"].as_str().expect("component id").to_string();

    let search = run_bt(
        &workspace,
        ["component", "create", "search", "--user", USER],
        "component_create_search",
    );
    assert!(search.status.success(), "component create failed: {}", search.stderr);
    assert!(search.stdout.starts_with("Created component "));
    let duplicate = run_bt(
        &workspace,
        ["component", "create", "search", "--user", USER, "--json"],
        "component_duplicate",
    );
    assert_error(&duplicate, 4, "VALIDATION_FAILED");

    let orphan = run_bt(
        &workspace,
        [
            "component",
            "create",
            "billing",
            "--team",
            "000000e0-0000-0000-0000-0000000000e0",
            "--user",
            USER,
            "--json",
        ],
        "component_orphan",
    );
    assert_error(&orphan, 3, "TEAM_NOT_FOUND");

    let all = run_bt(&workspace, ["component", "list", "--json"], "component_list").json();
    let names: Vec<&str> = all
        .as_array()
        .expect("components array")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["checkout", "search"]);

    let owned = run_bt(
        &workspace,
        ["component", "list", "--team", &team_id, "--json"],
        "component_list_team",
    );
    assert_eq!(owned.json().as_array().map(Vec::len), Some(1));

    let teams = run_bt(&workspace, ["team", "list", "--json"], "team_list");
    assert_eq!(teams.json()[0]["name"], "Payments");

    let run = run_bt(
        &workspace,
        ["create", "Cart empties", "-c", &component_id, "--user", USER, "--json"],
        "create_in_component",
    );
    assert!(run.status.success(), "create failed: {}", run.stderr);
    let issue_id = run.json()["id"].as_str().expect("id").to_string();

    let moved = run_bt(
        &workspace,
        [
            "update",
            &issue_id,
            "--component",
            "000000c9-0000-0000-0000-0000000000c9",
            "--json",
        ],
        "update_unregistered_component",
    );
    assert_error(&moved, 3, "COMPONENT_NOT_FOUND");
}

#[test]
fn e2e_update_records_history() {
    let _log = common::test_log("e2e_update_records_history");
    let workspace = registered_workspace();
    let created = create(&workspace, "Export slow", &[], "create");
    let id = created["id"].as_str().expect("id").to_string();
    let before = run_bt(&workspace, ["show", &id, "--json"], "show_before").json();

    let run = run_bt(
        &workspace,
        [
            "update",
            &id,
            "--status",
            "in_progress",
            "--assignee",
            USER,
            "--add-label",
            "perf",
            "--user",
            USER,
            "--json",
        ],
        "update",
    );
    assert!(run.status.success(), "update failed: {}", run.stderr);
    let updated = run.json();
    assert_eq!(updated["status"], "IN_PROGRESS");
    assert_eq!(updated["assignee_id"], USER);
    assert_eq!(updated["labels"], serde_json::json!(["perf"]));
    assert_eq!(updated["due_date"], before["due_date"]);

    let empty = run_bt(&workspace, ["update", &id, "--json"], "update_empty");
    assert_error(&empty, 4, "VALIDATION_FAILED");

    let mine = run_bt(
        &workspace,
        ["list", "assignee:me", "--user", USER, "--json"],
        "list_mine",
    );
    assert_eq!(titles(&mine.json()), vec!["Export slow"]);

    let history = run_bt(&workspace, ["history", &id, "--json"], "history");
    assert!(history.status.success(), "history failed: {}", history.stderr);
    let events = history.json();
    let types: Vec<&str> = events
        .as_array()
        .expect("events array")
        .iter()
        .filter_map(|event| event["event_type"].as_str())
        .collect();
    assert!(types.contains(&"created"));
    assert!(types.contains(&"status_changed"));
    assert!(types.contains(&"assignee_changed"));
    assert!(types.contains(&"label_added"));
    assert_eq!(types.last(), Some(&"created"));
}

#[test]
fn e2e_comments() {
    let _log = common::test_log("e2e_comments");
    let workspace = registered_workspace();
    let created = create(&workspace, "Avatar upload fails", &[], "create");
    let id = created["id"].as_str().expect("id").to_string();

    let anonymous = run_bt(
        &workspace,
        ["comments", "add", &id, "still", "broken", "--json"],
        "comment_anonymous",
    );
    assert_error(&anonymous, 3, "IDENTITY_REQUIRED");

    for (text, label) in [("first", "comment_first"), ("second", "comment_second")] {
        let run = run_bt(
            &workspace,
            ["comments", "add", &id, text, "--user", USER, "--json"],
            label,
        );
        assert!(run.status.success(), "comment failed: {}", run.stderr);
        assert_eq!(run.json()["content"], text);
    }

    let list = run_bt(&workspace, ["comments", "list", &id, "--json"], "comment_list");
    assert!(list.status.success(), "comment list failed: {}", list.stderr);
    let comments = list.json();
    let texts: Vec<&str> = comments
        .as_array()
        .expect("comments array")
        .iter()
        .filter_map(|c| c["content"].as_str())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);

    let show = run_bt(&workspace, ["show", &id, "--json"], "show_with_comments");
    assert_eq!(show.json()["comments"].as_array().map(Vec::len), Some(2));
}

#[test]
fn e2e_saved_views() {
    let _log = common::test_log("e2e_saved_views");
    let workspace = registered_workspace();
    create(&workspace, "Checkout crash", &["-p", "P1"], "create_crash");
    create(&workspace, "Docs outdated", &["-p", "P3"], "create_docs");

    let save = run_bt(
        &workspace,
        ["view", "save", "urgent", "priority:P1", "is:open", "--user", USER, "--json"],
        "view_save",
    );
    assert!(save.status.success(), "view save failed: {}", save.stderr);
    let view = save.json();
    assert_eq!(view["name"], "urgent");
    assert_eq!(view["query_string"], "priority:P1 is:open");
    let view_id = view["id"].as_str().expect("view id").to_string();

    let list = run_bt(&workspace, ["view", "list", "--user", USER, "--json"], "view_list");
    assert_eq!(list.json().as_array().map(Vec::len), Some(1));

    let run = run_bt(&workspace, ["view", "run", &view_id, "--json"], "view_run");
    assert!(run.status.success(), "view run failed: {}", run.stderr);
    assert_eq!(titles(&run.json()), vec!["Checkout crash"]);

    let delete = run_bt(
        &workspace,
        ["view", "delete", &view_id, "--user", USER, "--json"],
        "view_delete",
    );
    assert!(delete.status.success(), "view delete failed: {}", delete.stderr);

    let gone = run_bt(&workspace, ["view", "show", &view_id, "--json"], "view_gone");
    assert_error(&gone, 3, "VIEW_NOT_FOUND");
}

#[test]
fn e2e_sla_commands() {
    let _log = common::test_log("e2e_sla_commands");
    let workspace = registered_workspace();

    let target = run_bt(
        &workspace,
        ["sla", "target", "-p", "P1", "-s", "S1", "--json"],
        "sla_target",
    );
    assert!(target.status.success(), "sla target failed: {}", target.stderr);
    assert_eq!(target.json()["hours"], 18);

    let bad = run_bt(&workspace, ["sla", "target", "-s", "S7", "--json"], "sla_target_bad");
    assert_error(&bad, 4, "INVALID_SEVERITY");

    let urgent = create(&workspace, "Outage", &["-p", "P0", "-s", "S2"], "create_outage");
    create(&workspace, "Cosmetic", &["-p", "P4", "-s", "S3"], "create_cosmetic");

    let risk = run_bt(&workspace, ["sla", "risk", "--json"], "sla_risk");
    assert!(risk.status.success(), "sla risk failed: {}", risk.stderr);
    let report = risk.json();
    assert_eq!(report["threshold_hours"], 4);
    assert_eq!(report["at_risk"], 1);
    assert_eq!(report["breached"], 0);
    assert_eq!(report["entries"][0]["issue_id"], urgent["id"]);

    let id = urgent["id"].as_str().expect("id").to_string();
    let close = run_bt(
        &workspace,
        ["update", &id, "--status", "closed", "--user", USER],
        "close",
    );
    assert!(close.status.success(), "close failed: {}", close.stderr);

    let stats = run_bt(
        &workspace,
        ["sla", "stats", "--component", COMPONENT, "--json"],
        "sla_stats",
    );
    assert!(stats.status.success(), "sla stats failed: {}", stats.stderr);
    let report = stats.json();
    assert_eq!(report["issues_scanned"], 2);
    assert_eq!(report["stats"]["total"], 1);
    assert_eq!(report["stats"]["met"], 1);

    let no_scope = run_bt(&workspace, ["sla", "stats", "--json"], "sla_stats_no_scope");
    assert_error(&no_scope, 4, "VALIDATION_FAILED");

    let huge_threshold = run_bt(
        &workspace,
        ["sla", "risk", "--threshold", "3000000000", "--json"],
        "sla_risk_huge_threshold",
    );
    assert_error(&huge_threshold, 4, "VALIDATION_FAILED");

    let huge_window = run_bt(
        &workspace,
        ["sla", "stats", "--component", COMPONENT, "--start=-99999999999999w", "--json"],
        "sla_stats_huge_window",
    );
    assert_error(&huge_window, 4, "VALIDATION_FAILED");

    let zero_limit = run_bt(
        &workspace,
        ["sla", "risk", "--limit", "0", "--include-closed", "--json"],
        "sla_risk_zero_limit",
    );
    assert!(zero_limit.status.success(), "sla risk failed: {}", zero_limit.stderr);
    assert_eq!(zero_limit.json()["at_risk"], 1);
}

#[test]
fn e2e_config_shows_sources() {
    let _log = common::test_log("e2e_config_shows_sources");
    let workspace = registered_workspace();

    let run = run_bt_with_env(
        &workspace,
        ["config", "--user", USER, "--json"],
        [("BT_PAGE_SIZE", "7")],
        "config",
    );
    assert!(run.status.success(), "config failed: {}", run.stderr);
    let entries = run.json();
    let entry = |key: &str| {
        entries
            .as_array()
            .expect("entries array")
            .iter()
            .find(|entry| entry["key"] == key)
            .cloned()
            .unwrap_or(Value::Null)
    };
    assert_eq!(entry("page-size")["value"], "7");
    assert_eq!(entry("page-size")["source"], "environment");
    assert_eq!(entry("user")["value"], USER);
    assert_eq!(entry("user")["source"], "cli");

    let get = run_bt(&workspace, ["config", "--get", "lock_timeout"], "config_get");
    assert!(get.status.success(), "config get failed: {}", get.stderr);
    assert_eq!(get.stdout.trim(), "30000");
}
