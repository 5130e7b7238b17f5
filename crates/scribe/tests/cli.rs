//! Command-line tests for scribe
//!
//! Every run gets its own HOME, working directory and data directory so no
//! real configuration leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    fn data_dir(&self) -> std::path::PathBuf {
        self.root.path().join("data")
    }

    fn scribe(&self) -> Command {
        let mut cmd = Command::cargo_bin("scribe").unwrap();
        cmd.current_dir(self.root.path())
            .env("HOME", self.root.path())
            .env("SLIDESCRIBE_DATA_DIR", self.data_dir())
            .env("SLIDESCRIBE_LOG_LEVEL", "warn")
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("RUST_LOG")
            .env_remove("SLIDESCRIBE_USER")
            .env_remove("SLIDESCRIBE_START_TIME")
            .env_remove("SLIDESCRIBE_REFRESH_MS");
        cmd
    }

    fn write_record(&self, user: &str, lecture: &str, record: &str, json: &str) {
        let dir = self
            .data_dir()
            .join("users")
            .join(user)
            .join("lectures")
            .join(lecture);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{record}.json")), json).unwrap();
    }
}

const RECORD: &str = r#"{
  "lecture_name": "Physics",
  "records": [
    {"slide_number": "1", "slide_title": "Welcome", "start_time": "00:00:00.000", "end_time": "00:00:02.000", "notes": "say hi"},
    {"slide_number": "2", "slide_title": "Agenda", "start_time": "00:00:02.000", "end_time": "00:00:05.000", "notes": ""}
  ],
  "created_at": "2024-05-01T10:00:00Z",
  "updated_at": "2024-05-01T10:05:00Z"
}"#;

const SRT: &str = "1
00:00:00,200 --> 00:00:01,900
Hello and welcome

2
00:00:02,100 --> 00:00:04,800
Here is the plan
";

#[test]
fn config_prints_effective_settings() {
    let sandbox = Sandbox::new();
    sandbox
        .scribe()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[timer]"))
        .stdout(predicate::str::contains("default_start_time = \"00:00:00.000\""))
        .stdout(predicate::str::contains(
            sandbox.data_dir().display().to_string(),
        ));
}

#[test]
fn config_reads_local_file() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.root.path().join("slidescribe.toml"),
        "[user]\nname = \"lecturer\"\n",
    )
    .unwrap();

    sandbox
        .scribe()
        .args(["config", "--sources"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name = \"lecturer\""))
        .stdout(predicate::str::contains("# loaded:"))
        .stdout(predicate::str::contains("SLIDESCRIBE_DATA_DIR"));
}

#[test]
fn lecture_lifecycle() {
    let sandbox = Sandbox::new();

    sandbox
        .scribe()
        .args(["lectures", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No lectures yet"));

    sandbox
        .scribe()
        .args(["lectures", "create", "Physics"])
        .assert()
        .success();
    assert!(sandbox
        .data_dir()
        .join("users/guest/lectures/Physics")
        .is_dir());

    sandbox
        .scribe()
        .args(["lectures", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Physics"));

    sandbox
        .scribe()
        .args(["lectures", "delete", "Physics"])
        .assert()
        .success();
    sandbox
        .scribe()
        .args(["lectures", "delete", "Physics"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Lecture not found"));
}

#[test]
fn lecture_names_cannot_escape_data_dir() {
    let sandbox = Sandbox::new();
    sandbox
        .scribe()
        .args(["lectures", "create", "../outside"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid lecture name"));

    sandbox.write_record("guest", "Physics", "take1", RECORD);
    for name in [".", ".."] {
        sandbox
            .scribe()
            .args(["lectures", "delete", name])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid lecture name"));
    }
    assert!(sandbox
        .data_dir()
        .join("users/guest/lectures/Physics/take1.json")
        .is_file());
}

#[test]
fn records_are_scoped_by_user() {
    let sandbox = Sandbox::new();
    sandbox.write_record("alice", "Physics", "take1", RECORD);

    sandbox
        .scribe()
        .args(["--user", "alice", "records", "list", "--lecture", "Physics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("take1"));

    sandbox
        .scribe()
        .args(["records", "list", "--lecture", "Physics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No records"));
}

#[test]
fn records_show_and_delete() {
    let sandbox = Sandbox::new();
    sandbox.write_record("guest", "Physics", "take1", RECORD);

    sandbox
        .scribe()
        .args(["records", "show", "--lecture", "Physics", "take1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome"))
        .stdout(predicate::str::contains("00:00:05.000"));

    sandbox
        .scribe()
        .args(["records", "delete", "--lecture", "Physics", "take1.json"])
        .assert()
        .success();

    sandbox
        .scribe()
        .args(["records", "show", "--lecture", "Physics", "take1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Record not found"));
}

#[test]
fn align_writes_results() {
    let sandbox = Sandbox::new();
    sandbox.write_record("guest", "Physics", "take1", RECORD);
    let srt = sandbox.root.path().join("talk.srt");
    std::fs::write(&srt, SRT).unwrap();
    let output = sandbox.root.path().join("aligned.json");

    sandbox
        .scribe()
        .args(["align", "--lecture", "Physics", "--record", "take1", "--srt"])
        .arg(&srt)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello and welcome"))
        .stdout(predicate::str::contains("Here is the plan"));

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value["slide_count"], 2);
    assert_eq!(value["slides"][0]["notes"], "say hi");
}

#[test]
fn align_export_uses_timestamped_name() {
    let sandbox = Sandbox::new();
    sandbox.write_record("guest", "Physics", "take1", RECORD);
    let srt = sandbox.root.path().join("talk.srt");
    std::fs::write(&srt, SRT).unwrap();

    sandbox
        .scribe()
        .args(["align", "-l", "Physics", "-r", "take1", "--export", "-s"])
        .arg(&srt)
        .assert()
        .success()
        .stdout(predicate::str::contains("Results written to parsed_results_"));

    let exported: Vec<_> = std::fs::read_dir(sandbox.root.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("parsed_results_") && name.ends_with(".json"))
        .collect();
    assert_eq!(exported.len(), 1);
}

#[test]
fn align_without_overlap_fails() {
    let sandbox = Sandbox::new();
    sandbox.write_record("guest", "Physics", "take1", RECORD);
    let srt = sandbox.root.path().join("late.srt");
    std::fs::write(&srt, "1\n01:00:00,000 --> 01:00:01,000\nToo late\n").unwrap();

    sandbox
        .scribe()
        .args(["align", "-l", "Physics", "-r", "take1", "-s"])
        .arg(&srt)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching content"));
}

#[test]
fn session_records_and_saves_from_piped_input() {
    let sandbox = Sandbox::new();

    sandbox
        .scribe()
        .args(["session", "--lecture", "Physics", "--record", "live"])
        .write_stdin("start\nrecord Intro | first slide\nrecord Outro\nsave\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Slide 1 recorded"))
        .stdout(predicate::str::contains("Records saved as \"live\""));

    sandbox
        .scribe()
        .args(["records", "show", "--lecture", "Physics", "live", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"slide_title\": \"Intro\""))
        .stdout(predicate::str::contains("\"slide_number\": \"2\""));
}
