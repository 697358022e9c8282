use std::fs;

use pretty_assertions::assert_eq;

use golite::{Error, InterpreterBuilder};

use crate::common::{build_with, failure};

#[test]
fn test_files_and_globs_form_one_program() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a_math.go"), "func twice(n int) int { return n * 2 }").unwrap();
    fs::write(dir.path().join("b_text.go"), "func shout(s string) string { return s + \"!\" }")
        .unwrap();
    fs::write(dir.path().join("notes.txt"), "this is not a script").unwrap();
    let main = dir.path().join("main.golite");
    fs::write(&main, "func main() {\n\tprintln(twice(21), shout(\"hi\"))\n}\n").unwrap();

    let pattern = dir.path().join("*.go").to_string_lossy().into_owned();
    let (mut interp, out) = build_with(InterpreterBuilder::new().glob(pattern).source_file(&main));
    interp.run().unwrap();
    assert_eq!(out.get_output(), "42 hi!\n");
}

#[test]
fn test_unreadable_sources_name_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.go");
    let err = failure(InterpreterBuilder::new().source_file(&missing));
    assert!(matches!(&err, Error::Io { path, .. } if *path == missing));

    let pattern = dir.path().join("nowhere").join("*.go");
    let err = failure(InterpreterBuilder::new().glob(pattern.to_string_lossy()));
    assert!(matches!(err, Error::Io { .. }));

    // An empty match is no error.
    let empty = dir.path().join("*.go").to_string_lossy().into_owned();
    let (mut interp, out) =
        build_with(InterpreterBuilder::new().glob(empty).source("println(\"alone\")"));
    interp.run().unwrap();
    assert_eq!(out.get_output(), "alone\n");
}
