use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[test]
fn test_cli_help_lists_engine_flags() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("instaconsult"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--acceptance-timeout-secs"))
        .stdout(predicate::str::contains("--sweep-interval-secs"))
        .stdout(predicate::str::contains("--directory"))
        .stdout(predicate::str::contains("--db-path"));

    Ok(())
}

#[test]
fn test_cli_rejects_non_positive_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("instaconsult"));
    cmd.args(["--acceptance-timeout-secs", "0", "--bind", "127.0.0.1:0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid engine configuration"));

    Ok(())
}

#[test]
fn test_cli_rejects_out_of_range_timeouts() -> Result<(), Box<dyn std::error::Error>> {
    for secs in ["86401", "9223372036854775807"] {
        let mut cmd = Command::new(cargo_bin!("instaconsult"));
        cmd.args(["--acceptance-timeout-secs", secs, "--bind", "127.0.0.1:0"]);

        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("invalid engine configuration"));
    }

    Ok(())
}

#[test]
fn test_cli_rejects_malformed_directory() -> Result<(), Box<dyn std::error::Error>> {
    let mut directory = tempfile::NamedTempFile::new()?;
    writeln!(directory, "{{ not json")?;

    let mut cmd = Command::new(cargo_bin!("instaconsult"));
    cmd.arg("--directory")
        .arg(directory.path())
        .args(["--bind", "127.0.0.1:0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to load directory"));

    Ok(())
}
