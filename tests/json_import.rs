use quickcheck::{QuickCheck, TestResult};

use p4ir::ir::blocks::{P4Control, P4Program};
use p4ir::ir::capability::{Declaration, GeneralNamespace, SimpleNamespace};
use p4ir::ir::identity::IdAllocator;
use p4ir::ir::json::{from_json_str, to_json_string};
use p4ir::ir::visitor::{NodeCounter, inspect};
use test_utils::ir::builders::sample_program;
use test_utils::ir::generator::ExprSpec;

#[test]
fn test_sample_program_survives_reimport() {
    let ids = IdAllocator::new();
    let root = sample_program(&ids);
    let text = to_json_string(&root).unwrap();
    assert!(text.contains(r#""Node_Type": "P4Program""#));

    let fresh = IdAllocator::new();
    let imported = from_json_str(&text, &fresh).unwrap();
    assert_eq!(to_json_string(&imported).unwrap(), text);
    assert_eq!(fresh.allocated(), ids.allocated());

    let mut before = NodeCounter::new();
    inspect(&root, &mut before);
    let mut after = NodeCounter::new();
    inspect(&imported, &mut after);
    assert_eq!(before.counts(), after.counts());

    // Control-plane name and source positions come back.
    let program = imported.to::<P4Program>().unwrap();
    let control = program.get_decls_by_name("C").next().unwrap();
    let drop = control.to::<P4Control>().unwrap().get_decl_by_name("drop").unwrap();
    assert_eq!(drop.as_declaration().unwrap().external_name(), "drop_it");
    let limit = program.get_decls_by_name("LIMIT").next().unwrap();
    assert_eq!(limit.src_info().to_string(), root.to::<P4Program>().unwrap().objects[2].src_info().to_string());
}

#[test]
fn test_expressions_survive_reimport() {
    fn prop(spec: ExprSpec) -> TestResult {
        let root = spec.build();
        let text = to_json_string(&root).unwrap();
        let imported = from_json_str(&text, &IdAllocator::new()).unwrap();
        TestResult::from_bool(imported.to_string() == root.to_string() && to_json_string(&imported).unwrap() == text)
    }

    QuickCheck::new().tests(200).quickcheck(prop as fn(ExprSpec) -> TestResult);
}

#[test]
fn test_import_rejects_invalid_tree() {
    // A program may only hold declarations.
    let text = r#"{"Node_Type": "P4Program", "objects": [{"Node_Type": "BoolLiteral", "value": true}]}"#;
    assert!(from_json_str(text, &IdAllocator::new()).is_err());
}
