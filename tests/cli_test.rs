use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

const ABEBE: &str = "2f1c0d7e9b6a4c3e8d5f1a2b3c4d5e6f";
const SARA: &str = "8a7b6c5d4e3f4a1b9c8d7e6f5a4b3c2d";

fn seed_file(rows: &[&str]) -> tempfile::NamedTempFile {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "id, name, phone_number, role, connects").unwrap();
    for row in rows {
        writeln!(csv, "{row}").unwrap();
    }
    csv
}

#[test]
fn test_export_ledger_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let seed = seed_file(&[
        &format!("{SARA}, Sara, , citizen, 0"),
        &format!("{ABEBE}, Abebe, 0911000000, officer, 5"),
    ]);

    let mut cmd = Command::new(cargo_bin!("connectpay"));
    cmd.arg("export-ledger").arg("--seed-users").arg(seed.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("user,name,role,connects,active"))
        .stdout(predicate::str::contains(format!("{ABEBE},Abebe,officer,5,true")))
        .stdout(predicate::str::contains(format!("{SARA},Sara,citizen,0,true")));

    Ok(())
}

#[test]
fn test_invalid_seed_rows_are_skipped() {
    let seed = seed_file(&[
        &format!("{ABEBE}, Abebe, , officer, 5"),
        &format!("{SARA}, Sara, , mayor, 1"),
        ", Hanna, , admin, -3",
    ]);

    let mut cmd = Command::new(cargo_bin!("connectpay"));
    cmd.arg("export-ledger").arg("--seed-users").arg(seed.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(format!("{ABEBE},Abebe,officer,5,true")))
        .stdout(predicate::str::contains("Sara").not())
        .stdout(predicate::str::contains("Hanna").not())
        .stderr(predicate::str::contains("skipping invalid seed row"));
}

#[test]
fn test_missing_seed_file_fails() {
    let mut cmd = Command::new(cargo_bin!("connectpay"));
    cmd.arg("export-ledger")
        .arg("--seed-users")
        .arg("does/not/exist.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to open seed file"));
}
