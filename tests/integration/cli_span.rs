#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    fixture: PathBuf,
    db: PathBuf,
    query: PathBuf,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().expect("tempdir");
    let fixture = dir.path().join("fixture.json");
    let fixture_json = json!({
        "knobs": ["k1", "k2", "k3"],
        "default_plan": {"node": "SeqScan"},
        "plans": {
            "k2": {"node": "IndexScan"},
            "k1,k2": {"node": "BitmapScan"}
        },
        "failed": ["k3"]
    });
    fs::write(&fixture, fixture_json.to_string()).expect("write fixture");
    let query = dir.path().join("q1.sql");
    fs::write(&query, "SELECT * FROM t WHERE id = 1;").expect("write query");
    let db = dir.path().join("span.sqlite");
    Workspace {
        fixture,
        db,
        query,
        _dir: dir,
    }
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, body).expect("write config");
    path
}

#[test]
fn span_json_report() {
    let ws = workspace();
    let output = cargo_bin_cmd!("hintspan")
        .args(["--format", "json", "span", "--mode", "iterative", "--threads", "2"])
        .arg("--fixture")
        .arg(&ws.fixture)
        .arg("--db")
        .arg(&ws.db)
        .arg(&ws.query)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).expect("valid json");
    let keys: Vec<&str> = report["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|entry| entry["key"].as_str().expect("key"))
        .collect();
    assert_eq!(keys, ["", "k3", "k2", "k1,k2"]);
    assert_eq!(report["entries"][1]["required"], Value::Bool(true));
    assert_eq!(report["entries"][3]["parent"], Value::String("k2".into()));
    assert_eq!(report["stats"]["explains"], json!(5));
}

#[test]
fn singleton_mode_from_config_then_show() {
    let ws = workspace();
    let config = write_config(
        ws.db.parent().expect("dir"),
        "[explain]\nthreads = 1\nmode = \"singleton\"\n",
    );
    cargo_bin_cmd!("hintspan")
        .arg("--config")
        .arg(&config)
        .arg("span")
        .arg("--fixture")
        .arg(&ws.fixture)
        .arg("--db")
        .arg(&ws.db)
        .arg(&ws.query)
        .assert()
        .success();

    let output = cargo_bin_cmd!("hintspan")
        .args(["--format", "json"])
        .arg("--config")
        .arg(&config)
        .arg("show")
        .arg("--db")
        .arg(&ws.db)
        .arg(&ws.query)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(report["hint_sets"].as_array().expect("hint sets").len(), 3);
    assert!(report["dependencies"].as_array().expect("deps").is_empty());
}

#[test]
fn failing_query_sets_exit_status() {
    let ws = workspace();
    let missing = ws.query.with_file_name("missing.sql");
    cargo_bin_cmd!("hintspan")
        .arg("span")
        .arg("--fixture")
        .arg(&ws.fixture)
        .arg("--db")
        .arg(&ws.db)
        .arg(&missing)
        .arg(&ws.query)
        .assert()
        .failure();
}

#[test]
fn zero_threads_rejected() {
    let ws = workspace();
    cargo_bin_cmd!("hintspan")
        .args(["span", "--threads", "0"])
        .arg("--fixture")
        .arg(&ws.fixture)
        .arg("--db")
        .arg(&ws.db)
        .arg(&ws.query)
        .assert()
        .failure();
}
