#![allow(dead_code)]
use std::path::Path;

use scopelang::parser::{self, ParsedProgram};

/// `(label, source)` for every fixture case with benchmarking enabled.
pub fn workloads() -> Vec<(String, String)> {
    test_support::bench_workloads(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load bench workloads: {err:#}"))
}

pub fn load_program(label: &str, source: &str) -> ParsedProgram {
    parser::parse(source).unwrap_or_else(|err| panic!("parse {label}:\n{err}"))
}
