use quickcheck::{QuickCheck, TestResult};

use p4ir::ir::DiagnosticCollector;
use p4ir::ir::blocks::{P4Control, P4Program};
use p4ir::ir::capability::{Declaration, GeneralNamespace, Namespace, SimpleNamespace};
use p4ir::ir::identity::IdAllocator;
use p4ir::ir::node::NodeKind;
use p4ir::ir::type_decls::TypeExtern;
use test_utils::ir::builders::sample_program;
use test_utils::ir::generator::ProgramSpec;

#[test]
fn test_program_duplicates_match_repeated_names() {
    fn prop(spec: ProgramSpec) -> TestResult {
        let ids = IdAllocator::new();
        let root = spec.build(&ids);
        let Some(program) = root.to::<P4Program>() else {
            return TestResult::failed();
        };
        let mut sink = DiagnosticCollector::new();
        let reported = program.check_duplicate_declarations(&mut sink);
        TestResult::from_bool(reported == spec.expected_duplicates() && sink.error_count() == reported)
    }

    QuickCheck::new().tests(300).quickcheck(prop as fn(ProgramSpec) -> TestResult);
}

#[test]
fn test_general_lookup_returns_every_declaration_in_order() {
    fn prop(spec: ProgramSpec) -> TestResult {
        let ids = IdAllocator::new();
        let root = spec.build(&ids);
        let program = root.to::<P4Program>().unwrap();
        let total: usize = ["a", "b", "c", "hdr", "meta", "x"]
            .iter()
            .map(|name| program.get_decls_by_name(name).count())
            .sum();
        let declared: Vec<_> = program.declarations().collect();
        TestResult::from_bool(total == spec.structs.len() && declared.len() == spec.structs.len())
    }

    QuickCheck::new().tests(300).quickcheck(prop as fn(ProgramSpec) -> TestResult);
}

#[test]
fn test_struct_widths_follow_fields() {
    fn prop(spec: ProgramSpec) -> TestResult {
        let ids = IdAllocator::new();
        let root = spec.build(&ids);
        let program = root.to::<P4Program>().unwrap();
        let widths: Vec<u32> = program.objects.iter().map(|o| o.width_bits()).collect();
        TestResult::from_bool(widths == spec.widths())
    }

    QuickCheck::new().tests(300).quickcheck(prop as fn(ProgramSpec) -> TestResult);
}

#[test]
fn test_declarations_get_distinct_ids() {
    fn prop(spec: ProgramSpec) -> TestResult {
        let ids = IdAllocator::new();
        let root = spec.build(&ids);
        let program = root.to::<P4Program>().unwrap();
        let mut seen = std::collections::HashSet::new();
        let distinct = program.declarations().all(|d| seen.insert(d.as_declaration().unwrap().decl_id()));
        // Rebuilding the same names yields different declared types.
        let again = spec.build(&ids);
        let again = again.to::<P4Program>().unwrap();
        let unequal = program.objects.iter().zip(again.objects.iter()).all(|(a, b)| !a.equiv(b));
        TestResult::from_bool(distinct && unequal)
    }

    QuickCheck::new().tests(200).quickcheck(prop as fn(ProgramSpec) -> TestResult);
}

#[test]
fn test_sample_program_scopes() {
    let ids = IdAllocator::new();
    let root = sample_program(&ids);
    let program = root.to::<P4Program>().unwrap();

    let control = program.get_decls_by_name("C").next().unwrap();
    assert_eq!(control.kind(), NodeKind::P4Control);
    let control = control.to::<P4Control>().unwrap();
    let names: Vec<_> = control.declarations().filter_map(|d| d.declared_name().map(str::to_owned)).collect();
    assert_eq!(names, ["hdr", "r", "drop", "t"]);
    assert_eq!(control.get_decl_by_name("t").map(|d| d.kind()), Some(NodeKind::P4Table));
    assert!(control.get_decl_by_name("missing").is_none());

    let register = program.get_decls_by_name("Register").next().unwrap();
    let register = register.to::<TypeExtern>().unwrap();
    assert!(register.lookup_method("read", 1).is_some());
    assert!(register.lookup_method("read", 2).is_none());

    let mut sink = DiagnosticCollector::new();
    assert_eq!(program.check_duplicate_declarations(&mut sink), 0);
    assert!(sink.is_empty());
}
