use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PROXY: &str = r"<?php
namespace Acme\Checkout\Model\Session;

/**
 * Proxy class for @see \Acme\Checkout\Model\Session
 */
class Proxy extends \Acme\Checkout\Model\Session implements \Magento\Framework\ObjectManager\NoninterceptableInterface
{
    public function getQuote()
    {
        return $this->_getSubject()->getQuote();
    }

    public function clearQuote()
    {
        return $this->_getSubject()->clearQuote();
    }
}
";

const PLAIN: &str = "def total(items):\n    return sum(i.price for i in items)\n\n\ndef count(items):\n    return len(items)\n";

#[allow(deprecated)]
fn sift() -> Command {
    Command::cargo_bin("sift").expect("binary")
}

fn setup_tree() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("generated/code/Session")).unwrap();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(root.join("generated/code/Session/Proxy.php"), PROXY).unwrap();
    fs::write(root.join("app/cart.py"), PLAIN).unwrap();
    temp
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("valid json line"))
        .collect()
}

fn report_for<'a>(reports: &'a [Value], suffix: &str) -> &'a Value {
    reports
        .iter()
        .find(|r| r["path"].as_str().is_some_and(|p| p.ends_with(suffix)))
        .unwrap_or_else(|| panic!("no report for {suffix}"))
}

fn assert_covers(report: &Value, len: usize) {
    let chunks = report["chunks"].as_array().expect("chunks");
    let mut cursor = 0;
    for (idx, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk["sequence_index"], idx);
        assert_eq!(chunk["start_offset"], cursor);
        cursor = chunk["end_offset"].as_u64().unwrap() as usize;
    }
    assert_eq!(cursor, len);
}

#[test]
fn chunk_json_reports_every_file() {
    let temp = setup_tree();
    let output = sift()
        .arg("chunk")
        .arg("--json")
        .arg(temp.path())
        .output()
        .expect("command run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let reports = json_lines(&output.stdout);
    assert_eq!(reports.len(), 2);

    let proxy = report_for(&reports, "Proxy.php");
    assert_eq!(proxy["language"], "php");
    assert_eq!(proxy["generated_kind"], "proxy");
    assert_eq!(proxy["chunks"].as_array().unwrap().len(), 1);
    assert_eq!(proxy["chunks"][0]["generated_kind"], "proxy");
    assert!(proxy["chunks"][0]["confidence"].as_f64().unwrap() >= 0.5);
    assert_covers(proxy, PROXY.len());

    let plain = report_for(&reports, "cart.py");
    assert_eq!(plain["generated_kind"], "none");
    assert_covers(plain, PLAIN.len());
}

#[test]
fn pretty_json_is_one_document() {
    let temp = setup_tree();
    let output = sift()
        .args(["chunk", "--json", "--pretty"])
        .arg(temp.path())
        .output()
        .expect("command run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let document: Value = serde_json::from_slice(&output.stdout).expect("one json document");
    let reports = document.as_array().expect("array of reports");
    assert_eq!(reports.len(), 2);
    assert_eq!(report_for(reports, "Proxy.php")["generated_kind"], "proxy");
}

#[test]
fn chunk_text_lists_chunks_and_summary() {
    let temp = setup_tree();
    sift()
        .arg("chunk")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[php] proxy"))
        .stdout(predicate::str::contains("[python] none"))
        .stdout(predicate::str::contains("Files: 2 (failed: 0)"))
        .stdout(predicate::str::contains("Generated files: proxy: 1"));
}

#[test]
fn summary_only_skips_per_file_listing() {
    let temp = setup_tree();
    sift()
        .args(["chunk", "--summary"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Chunks: "))
        .stdout(predicate::str::contains("#0").not());
}

#[test]
fn invalid_utf8_is_reported_not_fatal() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("broken.php");
    fs::write(&path, [b'<', b'?', b'\n', 0xff, 0xfe, b'\n']).unwrap();

    let output = sift()
        .args(["chunk", "--json"])
        .arg(&path)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let reports = json_lines(&output.stdout);
    assert_eq!(reports.len(), 1);
    assert!(reports[0]["input_error"]
        .as_str()
        .unwrap()
        .contains("not valid UTF-8"));
    assert_eq!(reports[0]["chunks"].as_array().unwrap().len(), 1);
    assert_eq!(reports[0]["chunks"][0]["end_offset"], 6);
}

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn bad_config_fails_before_processing() {
    let temp = setup_tree();
    let config = write(
        temp.path(),
        "sift.toml",
        "target_chunk_bytes = 9000\nmax_chunk_bytes = 100\n",
    );

    sift()
        .arg("chunk")
        .arg("--config")
        .arg(&config)
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn bad_catalog_fails_before_processing() {
    let temp = setup_tree();
    let catalog = write(
        temp.path(),
        "catalog.toml",
        "[[delegation_idioms]]\npattern = \"(unclosed\"\n",
    );

    sift()
        .arg("chunk")
        .arg("--catalog")
        .arg(&catalog)
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid chunker configuration or catalog"));
}

#[test]
fn custom_catalog_adds_fingerprints() {
    let temp = tempdir().unwrap();
    let source = write(
        temp.path(),
        "client.ts",
        "// @generated by openapi-generator\nexport class PetClient {\n  list() { return this.http.get('/pets'); }\n}\n",
    );
    let catalog = write(
        temp.path(),
        "catalog.toml",
        "[[doc_markers]]\nphrase = \"@generated by openapi-generator\"\nkind = \"other\"\nweight = 0.7\n",
    );

    let output = sift()
        .args(["chunk", "--json", "--replace-catalog", "--catalog"])
        .arg(&catalog)
        .arg(&source)
        .output()
        .expect("command run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let reports = json_lines(&output.stdout);
    assert_eq!(reports[0]["generated_kind"], "other");
}

#[test]
fn missing_path_is_an_error() {
    sift()
        .args(["chunk", "definitely/not/here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
}

#[test]
fn catalog_command_prints_builtin_catalog() {
    let output = sift().arg("catalog").output().expect("command run");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("Interceptor class for"));
    let parsed = sift_code_chunker::SignalCatalog::from_toml_str(&text).expect("valid toml");
    assert_eq!(parsed, sift_code_chunker::SignalCatalog::builtin());
}
