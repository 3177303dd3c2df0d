use std::fs;
use std::path::Path;

use antmocdata::log::{
    DatabaseOptions, Extractor, ExtractorOptions, LogDatabase, LogFormat, Query, Value,
};

const LOG_A: &str = "\
[  NORMAL ]  Number of azimuthal angles = 32
[  NORMAL ]  Number of polar angles = 2
[  NORMAL ]  Iteration 10: k_eff = 1.001234  res = 3.0E-06
";

const LOG_B: &str = "\
[  NORMAL ]  Number of azimuthal angles = 64
[  NORMAL ]  Number of polar angles = 6
[  NORMAL ]  Iteration 12: k_eff = 0.986789  res = 1.0E-06
";

const LOG_C: &str = "\
[  NORMAL ]  Number of azimuthal angles = 640
[  NORMAL ]  Number of polar angles = 1
";

fn write_logs(root: &Path) {
    fs::create_dir_all(root.join("log/run2")).unwrap();
    fs::write(root.join("log/101-a.log"), LOG_A).unwrap();
    fs::write(root.join("log/run2/102-b.log"), LOG_B).unwrap();
    fs::write(root.join("log/103-c.log"), LOG_C).unwrap();
}

fn database(root: &Path) -> LogDatabase {
    let mut database = LogDatabase::new();
    database.disable_progress();
    database.setup(&DatabaseOptions {
        filenames: vec![format!("{}/log/**/*.log", root.display())],
        format: LogFormat::Text,
        cache: true,
    });
    database
}

#[test]
fn discover_cache_save_restore_extract() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path());

    // discovery parses nothing
    let mut logs = database(dir.path());
    assert_eq!(logs.len(), 3);
    assert_eq!(logs.n_cached(), 0);

    assert_eq!(logs.cache_all().unwrap(), 3);

    let snapshots = dir.path().join("db");
    assert_eq!(logs.save(&snapshots).unwrap(), 3);
    fs::remove_dir_all(dir.path().join("log")).unwrap();

    let mut restored = LogDatabase::new();
    restored.disable_progress();
    assert_eq!(restored.restore(&snapshots).unwrap(), 3);
    assert_eq!(restored.n_cached(), 3);

    let query = Query::parse(["Azims", "JobId", "Polars>=2"]).unwrap();
    let result = restored.query(&query);
    assert_eq!(result.len(), 2);
    assert_eq!(result.rows()[0].values()[0], Some(Value::Int(32)));
    assert_eq!(
        result.rows()[0].values()[1],
        Some(Value::Str("101".to_string()))
    );

    // table sorted by Keff, so run b comes first
    let output = dir.path().join("records.csv");
    let options = ExtractorOptions {
        specs: vec!["Azims".into(), "Keff".into(), "Polars>=2".into()],
        sort_by: Some("Keff".into()),
        output: output.clone(),
        truncate: true,
        summary: true,
        ..Default::default()
    };
    let report = Extractor::new(&mut restored, options).extract().unwrap();
    assert_eq!(report.n_records, 2);
    assert_eq!(report.n_broken(), 0);
    assert!(report.failures.is_empty());
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Azims,Keff\n64,0.986789\n32,1.001234\n"
    );
}

#[test]
fn unreadable_members_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(dir.path());

    let mut logs = database(dir.path());
    fs::remove_file(dir.path().join("log/103-c.log")).unwrap();

    let output = dir.path().join("records.csv");
    let options = ExtractorOptions {
        specs: vec!["Azims".into(), "Keff".into()],
        output: output.clone(),
        truncate: true,
        summary: true,
        ..Default::default()
    };
    let report = Extractor::new(&mut logs, options).extract().unwrap();

    assert_eq!(report.n_records, 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("103-c.log"));
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Azims,Keff\n32,1.001234\n64,0.986789\n"
    );
}
