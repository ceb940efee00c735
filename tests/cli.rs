use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

use p4ir::ir::blocks::P4Program;
use p4ir::ir::identity::IdAllocator;
use p4ir::ir::json::to_json_string;
use p4ir::ir::node::Node;
use p4ir::ir::type_decls::StructKind;
use test_utils::ir::builders::{sample_program, struct_type};

fn p4ir(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_p4ir"))
        .args(["--no-color", "--log-level", "warn"])
        .args(args)
        .output()
        .expect("failed to run p4ir")
}

fn write_tree(dir: &TempDir, file: &str, root: &Node) -> PathBuf {
    let path = dir.path().join(file);
    fs::write(&path, to_json_string(root).unwrap()).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_check_accepts_sample_program() {
    let dir = TempDir::new().unwrap();
    let input = write_tree(&dir, "sample.json", &sample_program(&IdAllocator::new()));
    let output = p4ir(&["check", arg(&input)]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_check_fails_on_duplicate_declaration() {
    let ids = IdAllocator::new();
    let first = struct_type(&ids, StructKind::Struct, "meta_t", &[("a", 1)]);
    let second = struct_type(&ids, StructKind::Header, "meta_t", &[("b", 2)]);
    let root: Node = P4Program::new([first.into(), second.into()]).unwrap().into();

    let dir = TempDir::new().unwrap();
    let input = write_tree(&dir, "dup.json", &root);
    let output = p4ir(&["check", arg(&input)]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("duplicate declaration"), "stdout: {}", stdout);
}

#[test]
fn test_print_debug_lists_nodes() {
    let dir = TempDir::new().unwrap();
    let input = write_tree(&dir, "sample.json", &sample_program(&IdAllocator::new()));
    let output = p4ir(&["print", "--debug", arg(&input)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("P4Program [5]"));
    assert!(stdout.contains("\n  TypeExtern "));
}

#[test]
fn test_print_lists_top_level_declarations() {
    let dir = TempDir::new().unwrap();
    let input = write_tree(&dir, "sample.json", &sample_program(&IdAllocator::new()));
    let output = p4ir(&["print", arg(&input)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 5, "stdout: {}", stdout);
    assert_eq!(lines[0], "TypeStruct h_t");
    assert_eq!(lines[2], "DeclarationConstant LIMIT");
}

#[test]
fn test_json_applies_rename_and_drop() {
    let dir = TempDir::new().unwrap();
    let input = write_tree(&dir, "sample.json", &sample_program(&IdAllocator::new()));
    let out = dir.path().join("out.json");
    let output = p4ir(&[
        "json",
        arg(&input),
        "--rename",
        "LIMIT=LIMIT_0",
        "--drop-annotation",
        "name",
        "--output",
        arg(&out),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains(r#""name": "LIMIT_0""#));
    assert!(text.contains(r#""original_name": "LIMIT""#));
    assert!(!text.contains("drop_it"));
}

#[test]
fn test_json_rejects_malformed_rename() {
    let dir = TempDir::new().unwrap();
    let input = write_tree(&dir, "sample.json", &sample_program(&IdAllocator::new()));
    let output = p4ir(&["json", arg(&input), "--rename", "LIMIT"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("expected OLD=NEW"));
}

#[test]
fn test_missing_input_is_an_error() {
    let output = p4ir(&["check", "/nonexistent/tree.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("reading /nonexistent/tree.json"));
}
