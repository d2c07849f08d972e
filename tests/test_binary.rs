//! End-to-end tests running the cohortbal binary

use assert_cmd::Command;
use polars::prelude::Column;
use predicates::prelude::*;
use tempfile::TempDir;

mod common;

fn cohortbal() -> Command {
    Command::cargo_bin("cohortbal").unwrap()
}

#[test]
fn test_balance_writes_output_report_and_manifest() {
    let mut df = common::create_cohort_dataframe();
    let (dir, input) = common::create_temp_csv(&mut df);

    cohortbal()
        .arg("-i")
        .arg(&input)
        .args(["--seed", "42", "--no-confirm", "--object-id-column", "object_id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sampled 4 of 8 'severe' records"));

    let output = dir.path().join("cohorts_balanced.csv");
    assert!(output.exists(), "balanced output should be written");
    let balanced = common::read_csv(&output);
    assert_eq!(balanced.height(), 8);
    let counts = common::value_counts(&balanced, "cohort");
    assert_eq!(counts.get("mild"), Some(&4));
    assert_eq!(counts.get("severe"), Some(&4));

    let report_path = dir.path().join("cohorts_balance_report.json");
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["groups"]["reference_label"], "mild");
    assert_eq!(report["groups"]["zero_weight_records"], 2);
    assert_eq!(report["metadata"]["seed"], 42);

    let manifest_path = dir.path().join("cohorts_manifest.json");
    let manifest: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(manifest_path).unwrap()).unwrap();
    assert_eq!(manifest.len(), 8);
    assert!(manifest.iter().all(|e| e["object_id"].is_string()));
}

#[test]
fn test_same_seed_gives_same_output() {
    let mut df = common::create_cohort_dataframe();
    let (dir, input) = common::create_temp_csv(&mut df);
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    for out in [&first, &second] {
        cohortbal()
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(out)
            .args(["--seed", "7", "--no-confirm", "--no-report"])
            .assert()
            .success();
    }

    assert_eq!(
        std::fs::read_to_string(&first).unwrap(),
        std::fs::read_to_string(&second).unwrap()
    );
    assert!(!dir.path().join("cohorts_balance_report.json").exists());
}

#[test]
fn test_two_files_labelled_by_stem() {
    let df = common::create_cohort_dataframe();
    let dir = TempDir::new().unwrap();
    let mild = dir.path().join("mild.csv");
    let severe = dir.path().join("severe.csv");
    common::write_csv(&mut common::cohort_subset(&df, "mild"), &mild);
    common::write_csv(&mut common::cohort_subset(&df, "severe"), &severe);
    let out = dir.path().join("balanced.parquet");

    cohortbal()
        .arg("-i")
        .arg(&mild)
        .arg(&severe)
        .arg("-o")
        .arg(&out)
        .args(["--seed", "1", "--no-confirm"])
        .assert()
        .success();

    let balanced = cohortbal::pipeline::load_dataset(&out, 100)
        .unwrap()
        .collect()
        .unwrap();
    assert_eq!(balanced.height(), 8);
    assert_eq!(common::value_counts(&balanced, "cohort").get("severe"), Some(&4));
}

#[test]
fn test_strata_subcommand_prints_tables() {
    let mut df = common::create_cohort_dataframe();
    let (_dir, input) = common::create_temp_csv(&mut df);

    cohortbal()
        .arg("strata")
        .arg("-i")
        .arg(&input)
        .args(["-a", "sex,race"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mild"))
        .stdout(predicate::str::contains("severe"))
        .stdout(predicate::str::contains("white"));
}

#[test]
fn test_manifest_subcommand() {
    let mut df = common::create_cohort_dataframe();
    let (dir, input) = common::create_temp_csv(&mut df);
    let out = dir.path().join("files.json");

    cohortbal()
        .arg("manifest")
        .arg(&input)
        .arg(&out)
        .assert()
        .success();

    let entries = cohortbal::download::read_manifest(&out).unwrap();
    assert_eq!(entries.len(), 12);
    assert_eq!(entries[0].object_id, "dg.m1");
}

#[test]
fn test_three_cohorts_fail_in_split_stage() {
    let mut df = common::create_cohort_dataframe();
    let mut cohort = vec!["mild"; 4];
    cohort.extend(["severe"; 8]);
    cohort[11] = "moderate";
    df.with_column(Column::new("cohort".into(), cohort)).unwrap();
    let (_dir, input) = common::create_temp_csv(&mut df);

    cohortbal()
        .arg("-i")
        .arg(&input)
        .arg("--no-confirm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cohort split stage failed"));
}

#[test]
fn test_strict_unknowns_fail_in_extraction_stage() {
    let mut df = common::create_cohort_dataframe();
    let (_dir, input) = common::create_temp_csv(&mut df);

    cohortbal()
        .arg("-i")
        .arg(&input)
        .args(["--no-confirm", "--strict-unknowns"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("record extraction stage failed"));
}

#[test]
fn test_invalid_bins_fail_before_loading() {
    cohortbal()
        .args(["-i", "does_not_exist.csv", "--age-bins", "50,40", "--no-confirm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid bin edges"));
}

#[test]
fn test_missing_input_is_an_error() {
    cohortbal()
        .arg("--no-confirm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file is required"));
}

#[cfg(unix)]
#[test]
fn test_download_with_fake_client() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let client = dir.path().join("fake-client");
    std::fs::write(
        &client,
        "#!/bin/sh\ncase \"$3\" in\n  --guid=dg.bad) echo 'Failed: 1' ;;\n  *) echo 'Succeeded: 1' ;;\nesac\n",
    )
    .unwrap();
    std::fs::set_permissions(&client, std::fs::Permissions::from_mode(0o755)).unwrap();

    let manifest = dir.path().join("manifest.json");
    std::fs::write(&manifest, r#"[{"object_id": "dg.1"}, {"object_id": "dg.2"}]"#).unwrap();
    let dest = dir.path().join("files");

    cohortbal()
        .arg("download")
        .arg(&manifest)
        .arg("--dest")
        .arg(&dest)
        .arg("--client")
        .arg(&client)
        .args(["-p", "test", "--no-confirm"])
        .assert()
        .success();
    assert!(dest.is_dir());

    std::fs::write(&manifest, r#"[{"object_id": "dg.1"}, {"object_id": "dg.bad"}]"#).unwrap();
    cohortbal()
        .arg("download")
        .arg(&manifest)
        .arg("--dest")
        .arg(&dest)
        .arg("--client")
        .arg(&client)
        .args(["-p", "test", "--no-confirm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 2 download(s) failed"));
}
