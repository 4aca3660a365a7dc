// Drive the compiled binary through a pty for the commands that need no model
use anyhow::Result;
use rexpect::spawn;
use std::fs;
use std::path::Path;

const TIMEOUT_MS: Option<u64> = Some(10_000);

fn write_config(dir: &Path) -> Result<String> {
    let config = dir.join("legalbrief.toml");
    fs::write(
        &config,
        format!(
            r#"
            [model]
            device = "cpu"

            [evaluation]
            database = "{}"
            "#,
            dir.join("evaluations.db").display()
        ),
    )?;
    Ok(config.display().to_string())
}

fn legalbrief(args: &str) -> String {
    format!("{} {}", env!("CARGO_BIN_EXE_legalbrief"), args)
}

#[test]
fn test_jargon_command() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_config(dir.path())?;
    let doc = dir.path().join("lease.txt");
    fs::write(&doc, "WITNESSETH: the Lessee shall vacate forthwith.")?;

    let mut session = spawn(
        &legalbrief(&format!("--config {} jargon {}", config, doc.display())),
        TIMEOUT_MS,
    )?;
    session.exp_string("\"forthwith\": \"immediately\"")?;
    session.exp_string("\"witnesseth\": \"certifies that\"")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn test_extract_command() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_config(dir.path())?;
    let doc = dir.path().join("note.txt");
    fs::write(&doc, "Pursuant to clause 4 the rent is due.")?;

    let mut session = spawn(
        &legalbrief(&format!("--config {} extract {}", config, doc.display())),
        TIMEOUT_MS,
    )?;
    session.exp_string("Pursuant to clause 4 the rent is due.")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn test_device_command_honours_cpu_preference() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_config(dir.path())?;

    let mut session = spawn(&legalbrief(&format!("--config {} device", config)), TIMEOUT_MS)?;
    session.exp_string("cpu")?;
    session.exp_eof()?;
    Ok(())
}

#[test]
fn test_export_empty_database_writes_header() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_config(dir.path())?;
    let out = dir.path().join("scores.csv");

    let mut session = spawn(
        &legalbrief(&format!("--config {} export --out {}", config, out.display())),
        TIMEOUT_MS,
    )?;
    session.exp_eof()?;

    let csv = fs::read_to_string(&out)?;
    assert_eq!(csv.trim(), "file,rouge_l,readability_grade,latency_seconds,timestamp");
    Ok(())
}
