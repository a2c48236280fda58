use std::process::Command;

use serde_json::{json, Value};
use tempfile::tempdir;

#[test]
fn rollup_averages_ranks_per_chapter() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("ranked.json");
    let out = dir.path().join("rollup.json");

    let scenes = json!([
        {"chapter": "I", "characters": [{"name": "Nick", "joy": 1}, {"name": "Tom", "joy": 2}]},
        {"chapter": "I", "characters": [{"name": "Tom", "joy": 1}, {"name": "Nick", "joy": 2}, {"name": "Daisy", "joy": 3}]},
        {"chapter": "II", "characters": [{"name": "Gatsby", "joy": 1}]}
    ]);
    // String-encoded input is accepted like the HTTP `data` field.
    std::fs::write(&input, Value::String(scenes.to_string()).to_string()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_annotator"))
        .args(["rollup", "--axis", "joy"])
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let rollup: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(rollup[0]["chapter"], "I");
    assert_eq!(
        rollup[0]["entities"],
        json!([
            {"name": "Nick", "mean_rank": 1.5, "rank": 1},
            {"name": "Tom", "mean_rank": 1.5, "rank": 2},
            {"name": "Daisy", "mean_rank": 3.0, "rank": 3}
        ])
    );
    assert_eq!(rollup[1]["entities"][0]["rank"], 1);
}

#[test]
fn llm_commands_fail_cleanly_without_api_key() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("entities.json");
    std::fs::write(&input, r#"[{"character": "Nick"}]"#).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_annotator"))
        .env_remove("OPENROUTER_API_KEY")
        .args(["colors", "--attribute", "mood"])
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(dir.path().join("out.json"))
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OPENROUTER_API_KEY"), "{stderr}");
    assert!(!dir.path().join("out.json").exists());
}

#[test]
fn help_lists_subcommands() {
    let output = Command::new(env!("CARGO_BIN_EXE_annotator"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["serve", "colors", "yaxis", "rollup", "ask", "find-chapter"] {
        assert!(stdout.contains(sub), "missing {sub} in help");
    }
}
