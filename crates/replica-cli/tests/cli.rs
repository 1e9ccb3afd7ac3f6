#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::fs;

use common::{SAMPLE_PAGE, TEST_KEY_ENV, replica_cmd, write_config};
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn analyze_prints_fingerprint_json() {
    let dir = tempdir().unwrap();
    let page = dir.path().join("page.html");
    fs::write(&page, SAMPLE_PAGE).unwrap();

    let output = replica_cmd()
        .args(["analyze", page.to_str().unwrap(), "--base-url", "https://example.com/docs/"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let analysis: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(analysis["title"], "Sample");
    assert_eq!(
        analysis["fingerprint"]["design"]["fonts"],
        json!(["Helvetica Neue", "sans-serif"])
    );
    assert_eq!(analysis["fingerprint"]["design"]["colors"], json!(["#112233"]));
    assert_eq!(analysis["fingerprint"]["layout"]["breakpoints"], json!([768.0]));
    assert_eq!(
        analysis["fingerprint"]["assets"]["images"][0]["url"],
        "https://example.com/hero.png"
    );
    assert_eq!(analysis["css"][1]["url"], "https://example.com/main.css");
}

#[test]
fn analyze_reads_stdin() {
    replica_cmd()
        .args(["analyze", "-", "--base-url", "example.com", "--fingerprint-only"])
        .write_stdin("<html><body><h2>x</h2></body></html>")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"h2\": 1"));
}

#[test]
fn analyze_rejects_bad_base_url() {
    replica_cmd()
        .args(["analyze", "-", "--base-url", "ftp://example.com"])
        .write_stdin("<html></html>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --base-url"));
}

#[test]
fn prompt_stays_within_budget() {
    let dir = tempdir().unwrap();
    let page = dir.path().join("page.html");
    let filler = "<p>lorem ipsum</p>".repeat(5_000);
    fs::write(&page, SAMPLE_PAGE.replace("<p>Body text</p>", &filler)).unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[budget]\nmax_prompt_chars = 40000\n").unwrap();

    let output = replica_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "prompt",
            page.to_str().unwrap(),
            "--base-url",
            "https://example.com",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let prompt = String::from_utf8(output).unwrap();
    // println! appends one newline
    assert!(prompt.trim_end_matches('\n').chars().count() <= 40_000);
    assert!(prompt.contains("https://example.com/"));
}

#[test]
fn prompt_json_payload() {
    let output = replica_cmd()
        .args(["prompt", "-", "--base-url", "https://example.com", "--json"])
        .write_stdin(SAMPLE_PAGE)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let payload: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(payload["url"], "https://example.com/");
    assert!(payload["prompt"].as_str().unwrap().contains("Helvetica Neue"));
}

#[test]
fn repair_wraps_plain_text() {
    replica_cmd()
        .args(["repair", "-"])
        .write_stdin("Sorry, I cannot do that.")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<!DOCTYPE html>"))
        .stdout(predicate::str::contains(r#"name="viewport""#))
        .stdout(predicate::str::contains("Sorry, I cannot do that."));
}

#[test]
fn repair_missing_file_fails() {
    replica_cmd()
        .args(["repair", "/no/such/draft.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/no/such/draft.txt"));
}

#[test]
fn clone_requires_api_key() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:9", 5);

    replica_cmd()
        .env_remove(TEST_KEY_ENV)
        .args(["--config", config.to_str().unwrap(), "clone", "example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(TEST_KEY_ENV));
}

#[tokio::test(flavor = "multi_thread")]
async fn clone_end_to_end_writes_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:generateContent"))
        .and(header("x-goog-api-key", "k3y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Here you go:\n<html><body><h1>Sample</h1></body></html>"}]}}]
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri(), 5);
    let out = dir.path().join("clone.html");
    let site = format!("{}/site", server.uri());

    let (config_arg, out_arg) = (config.clone(), out.clone());
    let assert = tokio::task::spawn_blocking(move || {
        replica_cmd()
            .env(TEST_KEY_ENV, "k3y")
            .args([
                "--config",
                config_arg.to_str().unwrap(),
                "clone",
                &site,
                "-o",
                out_arg.to_str().unwrap(),
            ])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stderr(predicate::str::contains("scraping"))
        .stderr(predicate::str::contains("cloning"))
        .stderr(predicate::str::contains("completed"));

    let document = fs::read_to_string(&out).unwrap();
    assert!(document.starts_with("<!DOCTYPE html>"));
    assert!(document.contains("<h1>Sample</h1>"));
    assert!(!document.contains("Here you go"));
}

#[tokio::test(flavor = "multi_thread")]
async fn clone_reports_generation_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri(), 5);
    let site = server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        replica_cmd()
            .env(TEST_KEY_ENV, "k3y")
            .args(["--config", config.to_str().unwrap(), "clone", &site, "--json-events"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("\"status\":\"failed\""))
        .stderr(predicate::str::contains("Quota exceeded or rate limit reached"));
}
