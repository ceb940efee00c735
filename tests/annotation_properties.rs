use std::sync::Arc;

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

use p4ir::ir::annotations::{Annotations, PredefinedAnnotation};
use p4ir::ir::diagnostics::DiagnosticCollector;
use p4ir::ir::expressions::Constant;
use p4ir::ir::node::Node;
use p4ir::ir::source_info::SourceInfo;
use test_utils::ir::generator::{AnnotationsSpec, arbitrary_annotation_name};

fn one() -> Node {
    Constant::new(SourceInfo::invalid(), 1).unwrap().into()
}

#[derive(Clone, Debug)]
struct Case {
    list: AnnotationsSpec,
    name: String,
}

impl Arbitrary for Case {
    fn arbitrary(g: &mut Gen) -> Self {
        Case { list: AnnotationsSpec::arbitrary(g), name: arbitrary_annotation_name(g) }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let name = self.name.clone();
        Box::new(self.list.shrink().map(move |list| Case { list, name: name.clone() }))
    }
}

#[test]
fn test_add_if_new_is_identity_when_present() {
    fn prop(case: Case) -> TestResult {
        let annotations = case.list.build();
        let result = annotations.add_annotation_if_new(&case.name, one()).unwrap();
        if case.list.names().contains(&case.name.as_str()) {
            TestResult::from_bool(Arc::ptr_eq(&result, &annotations))
        } else {
            TestResult::from_bool(
                result.len() == annotations.len() + 1
                    && result.get_all(&case.name).count() == 1
                    && annotations.len() == case.list.0.len(),
            )
        }
    }

    QuickCheck::new().tests(500).quickcheck(prop as fn(Case) -> TestResult);
}

#[test]
fn test_add_or_replace_leaves_exactly_one() {
    fn prop(case: Case) -> TestResult {
        let annotations = case.list.build();
        let result = annotations.add_or_replace(&case.name, one()).unwrap();
        let others_before = annotations.iter().filter(|a| a.name() != case.name).count();
        let others_after = result.iter().filter(|a| a.name() != case.name).count();
        TestResult::from_bool(
            !Arc::ptr_eq(&result, &annotations)
                && result.get_all(&case.name).count() == 1
                && others_before == others_after,
        )
    }

    QuickCheck::new().tests(500).quickcheck(prop as fn(Case) -> TestResult);
}

#[test]
fn test_filter_keeps_order_and_shares_when_nothing_dropped() {
    fn prop(case: Case) -> TestResult {
        let annotations = case.list.build();
        let kept = annotations.filter(|a| a.name() != case.name);
        let expected: Vec<&str> = case.list.names().into_iter().filter(|n| *n != case.name).collect();
        let actual: Vec<&str> = kept.iter().map(|a| a.name()).collect();
        if expected != actual {
            return TestResult::failed();
        }
        let nothing_dropped = expected.len() == annotations.len();
        TestResult::from_bool(nothing_dropped == Arc::ptr_eq(&kept, &annotations))
    }

    QuickCheck::new().tests(500).quickcheck(prop as fn(Case) -> TestResult);
}

#[test]
fn test_get_single_returns_first_match() {
    fn prop(case: Case) -> TestResult {
        let annotations = case.list.build();
        let first = case.list.0.iter().position(|a| a.name == case.name);
        match (annotations.get_single(&case.name), first) {
            (None, None) => TestResult::passed(),
            (Some(found), Some(index)) => {
                let expected = annotations.iter().nth(index).unwrap();
                TestResult::from_bool(Arc::ptr_eq(found, expected))
            }
            _ => TestResult::failed(),
        }
    }

    QuickCheck::new().tests(500).quickcheck(prop as fn(Case) -> TestResult);
}

#[test]
fn test_control_plane_warnings_count_extra_names() {
    fn prop(list: AnnotationsSpec) -> TestResult {
        let key = PredefinedAnnotation::Name.key();
        let names = list.names().into_iter().filter(|n| *n == key).count();
        let mut sink = DiagnosticCollector::new();
        let reported = list.build().check_control_plane_names(&mut sink);
        TestResult::from_bool(reported == names.saturating_sub(1) && sink.warning_count() == reported)
    }

    QuickCheck::new().tests(500).quickcheck(prop as fn(AnnotationsSpec) -> TestResult);
}

#[test]
fn test_in_place_push_matches_pure_add() {
    let mut built = Annotations::default();
    built.push_annotation("hidden", one()).unwrap();
    built.push_annotation("atomic", one()).unwrap();
    let built = Arc::new(built);

    let pure = Annotations::empty().add_annotation("hidden", one()).unwrap().add_annotation("atomic", one()).unwrap();
    let names = |a: &Annotations| a.iter().map(|x| x.name().to_string()).collect::<Vec<_>>();
    assert_eq!(names(&built), names(&pure));
    assert!(Annotations::empty().is_empty());
}
