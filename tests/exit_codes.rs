use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

fn baseline_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_baseline"));
    cmd.env("HOME", home);
    cmd.current_dir(home);
    cmd.env_remove("BASELINE_CONFIG");
    cmd.env_remove("BASELINE_UI_COLOR");
    cmd.env_remove("BASELINE_UI_MAX_TABLE_ROWS");
    cmd.env_remove("BASELINE_INGEST_DIR");
    cmd.env_remove("BASELINE_INGEST_PATTERNS");
    cmd.env_remove("BASELINE_LOG_LEVEL");
    cmd.env_remove("BASELINE_LOG");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    baseline_cmd(home).args(args).output().expect("run baseline")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let home = std::env::temp_dir().join(format!("baseline-exit-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdirs");
    }
    std::fs::write(path, bytes).expect("write");
}

#[test]
fn completion_unknown_shell_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn completion_bash_succeeds() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "bash"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("baseline"));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn ui_requires_tty_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["ui"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn json_with_markdown_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["summary", "--json", "--markdown"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--markdown"), "stderr: {stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn unknown_status_value_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["summary", "--status", "maybe"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn missing_explicit_config_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["--config", "nope.toml", "summary"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_config_exits_2() {
    let home = make_temp_home();
    write_file(
        home.join(".config/baseline/config.toml").as_path(),
        b"[ui]\nmax_table_rows = 0\n",
    );
    let out = run(&home, &["summary"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_pattern_exits_2() {
    let home = make_temp_home();
    let out = baseline_cmd(&home)
        .env("BASELINE_INGEST_PATTERNS", "[")
        .args(["summary"])
        .output()
        .expect("run baseline");
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn missing_working_directory_exits_10() {
    let home = make_temp_home();
    let out = run(&home, &["--dir", "does-not-exist", "summary"]);
    assert_eq!(out.status.code(), Some(10));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("working directory not found"), "stderr: {stderr}");
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn no_data_is_not_an_error() {
    let home = make_temp_home();
    let out = run(&home, &["summary"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("No data loaded."));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn malformed_file_is_not_an_error() {
    let home = make_temp_home();
    write_file(home.join("bad.csv").as_path(), b"Host,Result\nh1,pass\n");
    let out = run(&home, &["summary"]);
    assert!(out.status.success());
    let _ = std::fs::remove_dir_all(&home);
}
