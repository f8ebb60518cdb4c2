mod common;

use tabplot::source::load_path;
use tabplot::{load_all, ColumnRef, LoadOptions};
use tempfile::TempDir;

#[test]
fn test_duplicate_file_names_get_suffixes() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("one");
    let second = dir.path().join("two");
    std::fs::create_dir_all(&first).unwrap();
    std::fs::create_dir_all(&second).unwrap();
    let a = common::write_file(&first, "data.csv", "v\n1\n");
    let b = common::write_file(&second, "data.csv", "v\n2\n");

    let report = load_all(&[a, b], &LoadOptions::default());
    assert!(report.failures.is_empty());
    assert_eq!(report.tables.names(), vec!["data.csv", "data.csv (2)"]);
    let second_table = report
        .tables
        .resolve(&ColumnRef::parse("data.csv (2)||v"))
        .unwrap();
    assert_eq!(second_table.height(), 1);
}

#[test]
fn test_failing_file_does_not_stop_the_rest() {
    let dir = TempDir::new().unwrap();
    let good = common::write_file(dir.path(), "good.csv", "a,b\n1,x\n2,y\n");
    let broken = common::write_file(dir.path(), "broken.xlsx", "not a workbook");

    let report = load_all(&[broken.clone(), good], &LoadOptions::default());
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables.primary().unwrap().name, "good.csv");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, broken);
    assert!(report.failures[0].1.starts_with("Failed to load"));
}

#[test]
fn test_tsv_and_txt_files() {
    let dir = TempDir::new().unwrap();
    let tsv = common::write_file(dir.path(), "t.tsv", "a\tb\n1\t2.5\n");
    let txt = common::write_file(dir.path(), "t.txt", "a,b\n1,2\n");

    let table = load_path(&tsv, &LoadOptions::default()).unwrap();
    assert!(table.is_numeric("b"));
    let table = load_path(&txt, &LoadOptions::default()).unwrap();
    assert_eq!(table.column_names(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_ignore_errors_keeps_the_file() {
    let text = "v\n1\n2\n3\noops\n";
    let strict = LoadOptions {
        infer_schema_length: Some(2),
        ..LoadOptions::default()
    };
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "v.csv", text);
    assert!(load_path(&path, &strict).is_err());

    let lenient = LoadOptions {
        ignore_errors: true,
        ..strict
    };
    let table = load_path(&path, &lenient).unwrap();
    assert_eq!(table.height(), 4);
}
