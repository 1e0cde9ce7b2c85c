use std::io::Write;

use relshell::executor::ExecutionEngine;
use relshell::Error;
use tempfile::NamedTempFile;

fn program_file(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_program_file() {
    let file = program_file(
        "-- staff listing\n\
         Emp(_id, name, #dept)\n\
         \x20   dept references Dept.id\n\
         Dept(_id, name)\n\
         \n\
         insert Dept(1, 'Eng')\n\
         insert Emp(10, 'Ann', 1)\n\
         Names := π name (Emp)\n",
    );

    let mut engine = ExecutionEngine::new();
    engine.load_file(file.path()).unwrap();

    let catalog = engine.catalog();
    assert_eq!(catalog.names(), vec!["Emp", "Dept", "Names"]);
    assert!(catalog.relation("Names").unwrap().temporary);
    assert_eq!(catalog.relation("Names").unwrap().len(), 1);
}

#[test]
fn test_load_error_reports_line() {
    let file = program_file(
        "Emp(_id, name, #dept)\n\
         \x20   dept references Dept.id\n\
         Dept(_id, name)\n\
         insert Dept(1, 'Eng')\n\
         insert Emp(10, 'Ann', 2)\n\
         insert Emp(11, 'Bob', 1)\n",
    );

    let mut engine = ExecutionEngine::new();
    let err = engine.load_file(file.path()).unwrap_err();

    assert!(matches!(err, Error::AtLine { line: 5, .. }));
    assert!(err.to_string().starts_with("Line 5: Foreign key constraint failed"));
    // Commands before the failure stay applied, later ones never run
    assert_eq!(engine.catalog().relation("Dept").unwrap().len(), 1);
    assert!(engine.catalog().relation("Emp").unwrap().is_empty());
}

#[test]
fn test_bad_schema_batch() {
    let mut engine = ExecutionEngine::new();
    let err = engine
        .load_program("Emp(_id, #dept)\nDept(_id)\n")
        .unwrap_err();

    assert!(matches!(err, Error::AtLine { line: 1, .. }));
    assert!(matches!(
        err.inner(),
        Error::ForeignKeyNotExplained { relation, .. } if relation == "Emp"
    ));
    assert!(engine.catalog().is_empty());
}

#[test]
fn test_program_rejects_queries() {
    let mut engine = ExecutionEngine::new();
    let err = engine
        .load_program("R(_a)\ninsert R(1)\nprint R\n")
        .unwrap_err();
    assert!(matches!(err, Error::AtLine { line: 3, .. }));
}

#[test]
fn test_empty_program() {
    let file = program_file("");
    let mut engine = ExecutionEngine::new();
    engine.load_file(file.path()).unwrap();
    assert!(engine.catalog().is_empty());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = ExecutionEngine::new();
    let err = engine
        .load_file(dir.path().join("missing.rel"))
        .unwrap_err();
    assert!(matches!(err, Error::IoError(_)));
}
