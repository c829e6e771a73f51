use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::tempdir;

fn cli_bin() -> &'static str {
    env!("CARGO_BIN_EXE_i18n-lift")
}

fn run_cli<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Output {
    Command::new(cli_bin())
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("failed to run i18n-lift")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write_config(root: &Path, targets: &[&str]) -> PathBuf {
    let config = json!({
        "roots": ["src"],
        "messagesDir": "messages",
        "sourceLocale": "en",
        "targetLocales": targets,
    });
    let config_path = root.join("i18n-lift.json");
    fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    config_path
}

fn write_source(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("missing json file");
    serde_json::from_str(&content).expect("invalid json")
}

const SETTINGS: &str = "export function Settings() {\n  return (\n    <section>\n      <h2>Notification settings</h2>\n      <input aria-label=\"Email address\" />\n    </section>\n  );\n}\n";

#[test]
fn extract_then_replace() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/features/account/Settings.tsx", SETTINGS);
    write_config(project, &["de"]);

    let output = run_cli(project, &["extract"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== i18n-lift extract ==="));
    assert!(stdout.contains("account.Settings.notification_setting"));

    let en = read_json(&project.join("messages/en.json"));
    assert_eq!(
        en["account"]["Settings"]["notification_setting"],
        "Notification settings"
    );
    assert_eq!(en["account"]["Settings"]["email_address"], "Email address");
    let de = read_json(&project.join("messages/de.json"));
    assert_eq!(
        de["account"]["Settings"]["email_address"],
        "[TODO] Email address"
    );

    let manifest = read_json(&project.join(".i18n-lift/manifest.json"));
    assert_eq!(manifest.as_array().unwrap().len(), 2);
    assert_eq!(manifest[0]["syntacticContext"], "MarkupText");
    assert_eq!(manifest[1]["attribute"], "aria-label");

    let output = run_cli(project, &["replace"]);
    assert_success(&output);
    let content = fs::read_to_string(project.join("src/features/account/Settings.tsx")).unwrap();
    assert!(content.starts_with("import { useTranslations } from 'next-intl';\n"));
    assert!(content.contains("  const tAccount = useTranslations('account');\n"));
    assert!(content.contains("<h2>{tAccount('Settings.notification_setting')}</h2>"));
    assert!(content.contains("aria-label={tAccount('Settings.email_address')}"));
}

#[test]
fn dry_run_leaves_project_untouched() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/features/account/Settings.tsx", SETTINGS);
    write_config(project, &[]);

    let output = run_cli(project, &["--dry-run", "extract"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Would add 2 key(s)"));
    assert!(!project.join("messages").exists());
    assert!(!project.join(".i18n-lift").exists());
}

#[test]
fn replace_without_manifest_fails() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/features/account/Settings.tsx", SETTINGS);
    write_config(project, &[]);

    let output = run_cli(project, &["replace"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No manifest"), "stderr: {}", stderr);
    assert_eq!(
        fs::read_to_string(project.join("src/features/account/Settings.tsx")).unwrap(),
        SETTINGS
    );
}

#[test]
fn report_rerenders_last_run() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/features/account/Settings.tsx", SETTINGS);
    write_config(project, &[]);

    let output = run_cli(project, &["report"]);
    assert!(!output.status.success());

    assert_success(&run_cli(project, &["extract"]));
    fs::remove_file(project.join(".i18n-lift/report.md")).unwrap();

    let output = run_cli(project, &["report"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Newly extracted: 2"));
    let md = fs::read_to_string(project.join(".i18n-lift/report.md")).unwrap();
    assert!(md.contains("| account | 2 |"));
}

#[test]
fn report_dry_run_writes_nothing() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_source(project, "src/features/account/Settings.tsx", SETTINGS);
    write_config(project, &[]);

    assert_success(&run_cli(project, &["extract"]));
    let json_before = fs::read_to_string(project.join(".i18n-lift/report.json")).unwrap();
    fs::remove_file(project.join(".i18n-lift/report.md")).unwrap();

    let output = run_cli(project, &["--dry-run", "report"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Newly extracted: 2"));
    assert!(!project.join(".i18n-lift/report.md").exists());
    assert_eq!(
        fs::read_to_string(project.join(".i18n-lift/report.json")).unwrap(),
        json_before
    );
}

#[test]
fn init_creates_config_once() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();

    let output = run_cli(project, &["init", "--target-locales", "fr,de"]);
    assert_success(&output);
    let config = read_json(&project.join("i18n-lift.json"));
    assert_eq!(config["targetLocales"], json!(["fr", "de"]));
    assert_eq!(config["sourceLocale"], "en");
    assert!(project.join("src/messages/en.json").exists());

    let output = run_cli(project, &["init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));

    assert_success(&run_cli(project, &["init", "--force"]));
}

#[test]
fn invalid_log_level_is_rejected() {
    let tmp = tempdir().unwrap();
    let project = tmp.path();
    write_config(project, &[]);

    let output = run_cli(project, &["--log-level", "loud", "extract"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown log level"));
}
