#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tabplot::source::load_bytes;
use tabplot::{LoadOptions, TableSet};

/// Build a table set from `(file name, CSV text)` pairs, in order.
pub fn table_set(files: &[(&str, &str)]) -> TableSet {
    let mut tables = TableSet::new();
    for (name, text) in files {
        let table = load_bytes(name, text.as_bytes().to_vec(), &LoadOptions::default())
            .expect("test CSV should parse");
        tables.push(table);
    }
    tables
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test file");
    path
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
