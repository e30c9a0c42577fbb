// tests/cli.rs
//! End-to-end tests of the kj-stress binary.

use std::process::Command;

use kj_stress::cli::Manifest;

fn kj_stress() -> Command {
    Command::new(env!("CARGO_BIN_EXE_kj-stress"))
}

#[test]
fn writes_programs_and_manifest() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = kj_stress()
        .args(["--seed", "5", "--count", "3", "--profile", "small", "--output"])
        .arg(dir.path())
        .output()
        .expect("failed to run kj-stress");

    let manifest = std::fs::read_to_string(dir.path().join("manifest.json"))
        .expect("manifest written");
    let manifest: Manifest = serde_json::from_str(&manifest).expect("manifest parses");
    assert_eq!(manifest.first_seed, 5);
    assert_eq!(manifest.count, 3);
    assert_eq!(manifest.programs.len(), 6);
    for entry in &manifest.programs {
        if let Some(file) = &entry.file {
            assert!(dir.path().join(file).exists(), "{file} missing");
        }
    }
    assert_eq!(
        output.status.success(),
        manifest.programs.iter().all(|p| p.ok),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn prints_to_stdout_without_output_dir() {
    let output = kj_stress()
        .args(["--language", "java", "--seed", "11", "--top-level", "2", "--max-depth", "2"])
        .output()
        .expect("failed to run kj-stress");

    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        assert!(stdout.contains("// java, seed 11"), "{stdout}");
        assert!(stdout.contains("class Main {"), "{stdout}");
    }
}

#[test]
fn rejects_unknown_profile() {
    let output = kj_stress()
        .args(["--profile", "no-such-profile", "--seed", "1"])
        .output()
        .expect("failed to run kj-stress");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no-such-profile"), "{stderr}");
}
