use std::process::Command;

fn wordbloom() -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("wordbloom");
    let mut cmd = Command::new(bin);
    // Keep runs hermetic: no endpoints or keys from the developer's shell.
    for k in [
        "WORDBLOOM_SERVER_ENDPOINT",
        "WORDBLOOM_MODEL_DIRECT",
        "WORDBLOOM_GEMINI_API_KEY",
        "GEMINI_API_KEY",
        "WORDBLOOM_MAX_CHARS",
        "WORDBLOOM_MAX_BODY_BYTES",
        "RUST_LOG",
    ] {
        cmd.env_remove(k);
    }
    cmd
}

fn json_stdout(out: &std::process::Output) -> serde_json::Value {
    let s = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(s.trim()).unwrap_or_else(|e| panic!("bad json ({e}): {s}"))
}

#[test]
fn analyze_text_reports_counts_and_local_creative() {
    let out = wordbloom()
        .args([
            "analyze",
            "--text",
            "Apple ant apricot banana",
            "--char",
            "a",
            "--type",
            "riddle",
        ])
        .output()
        .expect("run analyze");
    assert!(out.status.success());
    let v = json_stdout(&out);
    assert_eq!(v["kind"].as_str(), Some("analysis"));
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["total_words"].as_u64(), Some(4));
    assert_eq!(v["starts_with_count"].as_u64(), Some(3));
    assert_eq!(v["path"].as_str(), Some("text"));
    assert_eq!(v["creative_source"].as_str(), Some("local"));
    let creative = v["creative"].as_str().unwrap_or("");
    assert!(creative.to_lowercase().contains('a'));
}

#[test]
fn analyze_survives_an_unusable_server_endpoint() {
    let out = wordbloom()
        .args([
            "analyze",
            "--text",
            "bee bat bear",
            "--char",
            "b",
            "--server",
            "not a url",
        ])
        .output()
        .expect("run analyze");
    assert!(out.status.success());
    let v = json_stdout(&out);
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["total_words"].as_u64(), Some(3));
    assert_eq!(v["creative_source"].as_str(), Some("local"));
    let notes: Vec<&str> = v["notes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n.as_str())
        .collect();
    assert!(notes.contains(&"invalid_url"));
}

#[test]
fn analyze_rejects_multi_char_target_with_validation_error() {
    let out = wordbloom()
        .args(["analyze", "--text", "hello", "--char", "ab"])
        .output()
        .expect("run analyze");
    assert!(!out.status.success());
    let v = json_stdout(&out);
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["error"]["code"].as_str(), Some("validation"));
}

#[test]
fn analyze_rejects_unknown_generation_type() {
    let out = wordbloom()
        .args(["analyze", "--text", "hello", "--char", "h", "--type", "sonnet"])
        .output()
        .expect("run analyze");
    assert!(!out.status.success());
    assert_eq!(json_stdout(&out)["error"]["code"].as_str(), Some("validation"));
}

#[test]
fn analyze_reads_stdin_and_prints_text_format() {
    assert_cmd::Command::from_std(wordbloom())
        .args(["analyze", "--char", "b", "--type", "poem", "--output", "text"])
        .write_stdin("big blue boats\nbeyond the bay\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("Total words: 6"))
        .stdout(predicates::str::contains("Words starting with \"b\": 5"));
}

#[test]
fn sample_without_input_prints_a_stock_text() {
    let out = wordbloom().args(["sample"]).output().expect("run sample");
    assert!(out.status.success());
    assert!(!String::from_utf8_lossy(&out.stdout).trim().is_empty());
}

#[test]
fn version_json_names_the_binary() {
    let out = wordbloom().args(["version"]).output().expect("run version");
    assert!(out.status.success());
    let v = json_stdout(&out);
    assert_eq!(v["kind"].as_str(), Some("version"));
    assert_eq!(v["name"].as_str(), Some("wordbloom"));
}
