use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BROKEN_REGISTRY: &str = r#"{
    "catalog": [{"event_type": "lesson_reminder"}],
    "fields": {},
    "descriptions": {"categories": [], "events": {}}
}"#;

fn policyctl(store: &Path) -> Command {
    let mut cmd = Command::cargo_bin("policyctl").unwrap();
    cmd.env("POLICY_STORE_DIR", store)
        .env("NO_COLOR", "1")
        .env_remove("POLICY_REGISTRY_FILE")
        .env_remove("POLICY_TENANT")
        .env_remove("WARDS_VALIDATION_MODE")
        .env_remove("WARDS_LEGACY_FALLBACK")
        .env_remove("WARDS_PROVISION_ENABLED");
    cmd
}

fn edit_stored_value(store: &Path, tenant: &str, edit: impl FnOnce(&mut Value)) {
    let path = store.join(tenant).join("config.json");
    let mut doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    edit(&mut doc["value"]);
    fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
}

#[test]
fn given_builtin_registries_when_catalog_listed_then_planned_rules_are_opt_in() {
    let dir = TempDir::new().unwrap();

    policyctl(dir.path())
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("payment_due_reminder"))
        .stdout(predicate::str::contains("birthday_greeting").not())
        .stdout(predicate::str::contains("33 rules"));

    policyctl(dir.path())
        .args(["catalog", "--include-planned"])
        .assert()
        .success()
        .stdout(predicate::str::contains("birthday_greeting"))
        .stdout(predicate::str::contains("39 rules"));
}

#[test]
fn given_builtin_registries_when_validated_then_consistent() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("registries are consistent (39 events)"));
}

#[test]
fn given_unknown_event_when_fields_requested_then_fails() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["fields", "auto_consultation_summary"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("auto_consultation_summary"));

    policyctl(dir.path())
        .args(["fields", "monthly_business_report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("report_day"))
        .stdout(predicate::str::contains("1..=28"));
}

#[test]
fn given_uninitialized_tenant_when_gated_then_skips() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["gate", "--tenant", "acme", "payment_due_reminder"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("skip: payment_due_reminder (no policy stored)"));
}

#[test]
fn given_provisioned_tenant_when_gated_then_active_runs_and_planned_skips() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["init", "--tenant", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provisioned tenant acme at revision 1"));

    policyctl(dir.path())
        .args(["init", "--tenant", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already provisioned"));

    policyctl(dir.path())
        .args(["gate", "--tenant", "acme", "payment_due_reminder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("run: payment_due_reminder (enabled)"));

    policyctl(dir.path())
        .args(["gate", "--tenant", "acme", "birthday_greeting"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("(disabled)"));
}

#[test]
fn given_disabled_provisioning_when_gated_then_active_rules_skip() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .env("WARDS_PROVISION_ENABLED", "false")
        .args(["init", "--tenant", "acme"])
        .assert()
        .success();

    policyctl(dir.path())
        .args(["gate", "--tenant", "acme", "payment_due_reminder", "--json"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains(r#""reason":"disabled""#));
}

#[test]
fn given_update_when_set_then_show_reflects_it() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args([
            "set",
            "--tenant",
            "acme",
            "payment_due_reminder",
            "--enabled",
            "true",
            "--param",
            "days_before_first=5",
            "--param",
            "channel=kakao_at",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated payment_due_reminder for acme (revision 1)"));

    policyctl(dir.path())
        .args(["show", "--tenant", "acme", "--event", "payment_due_reminder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled: on"))
        .stdout(predicate::str::contains("days_before_first: 5"))
        .stdout(predicate::str::contains("channel: kakao_at"))
        .stdout(predicate::str::contains("days_before_second: not set"));
}

#[test]
fn given_invalid_param_when_set_then_fails_and_nothing_written() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["set", "--tenant", "acme", "monthly_business_report", "--param", "report_day=31"])
        .assert()
        .failure();
    assert!(!dir.path().join("acme").join("config.json").exists());

    policyctl(dir.path())
        .args(["set", "--tenant", "acme", "payment_due_reminder", "--param", "channel=email"])
        .assert()
        .failure();

    policyctl(dir.path())
        .args(["set", "--tenant", "acme", "payment_due_reminder"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to update"));
}

#[test]
fn given_stale_revision_when_set_then_conflict() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["init", "--tenant", "acme"])
        .assert()
        .success();
    policyctl(dir.path())
        .args(["set", "--tenant", "acme", "refund_spike", "--enabled", "false", "--expect-revision", "1"])
        .assert()
        .success();

    policyctl(dir.path())
        .args(["set", "--tenant", "acme", "churn_increase", "--enabled", "false", "--expect-revision", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("revision"));
}

#[test]
fn given_hand_edited_document_when_audited_then_findings_reported() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["init", "--tenant", "acme"])
        .assert()
        .success();
    policyctl(dir.path())
        .args(["audit", "--tenant", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clean"));

    edit_stored_value(dir.path(), "acme", |value| {
        value["auto_notification"]["refund_spike"]["enabled"] = json!("yes");
    });

    policyctl(dir.path())
        .args(["gate", "--tenant", "acme", "refund_spike"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("not a boolean"));
    policyctl(dir.path())
        .args(["audit", "--tenant", "acme"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("/auto_notification/refund_spike/enabled"));
}

#[test]
fn given_legacy_flag_when_gated_then_fallback_is_configurable() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["set", "--tenant", "acme", "refund_spike", "--enabled", "true"])
        .assert()
        .success();
    edit_stored_value(dir.path(), "acme", |value| {
        value["auto_consultation_summary"] = json!({"enabled": true});
    });

    policyctl(dir.path())
        .args(["gate", "--tenant", "acme", "consultation_summary_ready"])
        .assert()
        .success();
    policyctl(dir.path())
        .args(["show", "--tenant", "acme", "--event", "consultation_summary_ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled: on"));

    policyctl(dir.path())
        .env("WARDS_LEGACY_FALLBACK", "false")
        .args(["gate", "--tenant", "acme", "consultation_summary_ready"])
        .assert()
        .code(3);
    policyctl(dir.path())
        .env("WARDS_LEGACY_FALLBACK", "false")
        .args(["show", "--tenant", "acme", "--event", "consultation_summary_ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("enabled: not set"));
}

#[test]
fn given_inconsistent_registry_when_loaded_then_mode_decides() {
    let dir = TempDir::new().unwrap();
    let registry = dir.path().join("registry.json");
    fs::write(&registry, BROKEN_REGISTRY).unwrap();

    policyctl(dir.path())
        .env("WARDS_VALIDATION_MODE", "strict")
        .arg("--registry")
        .arg(&registry)
        .arg("catalog")
        .assert()
        .failure()
        .stderr(predicate::str::contains("lesson_reminder: no description entry"));

    policyctl(dir.path())
        .arg("--registry")
        .arg(&registry)
        .arg("catalog")
        .assert()
        .success()
        .stdout(predicate::str::contains("lesson_reminder"));

    policyctl(dir.path())
        .arg("--registry")
        .arg(&registry)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 registry inconsistencies found"));
}

#[test]
fn given_bad_tenant_id_when_init_then_rejected() {
    let dir = TempDir::new().unwrap();
    policyctl(dir.path())
        .args(["init", "--tenant", "../escape"])
        .assert()
        .failure();
}
