//! Classfile-only roots: Java and Scala 2 classes populated from
//! descriptors.

use pretty_assertions::assert_eq;
use scry_ast::Type;
use scry_classpath::PackageData;
use scry_core::{to_package_name, Name, TermName, TypeName};
use scry_loader::Context;

use super::fixtures::*;

fn scala_int() -> Type {
    Type::type_ref(
        Type::package(to_package_name("scala")),
        TypeName::simple("Int"),
    )
}

fn java_context(marker_attributes: &[&str]) -> Context {
    let bytes = build_classfile(
        "jdk/Box",
        marker_attributes,
        &[("value", "I")],
        &[("get", "()I"), ("set", "(I)V")],
    );
    context_for(
        vec![PackageData {
            dotted_name: "jdk".to_string(),
            classes: vec![class_entry("Box", bytes)],
            tastys: Vec::new(),
        }],
        StubDecoder::default(),
    )
}

#[test]
fn java_roots_are_populated_from_descriptors() {
    let ctx = java_context(&[]);
    let cls = ctx.find_top_level_class("jdk", "Box").expect("class loads");
    assert!(ctx.is_initialised(cls.as_symbol()));

    let field = ctx
        .lookup_declaration(cls.as_symbol(), &Name::Term(TermName::simple("value")))
        .expect("field entered");
    assert_eq!(ctx.declared_type_of(field), Some(scala_int()));

    // Methods are entered under signed names; the overload-set lookup
    // regroups them by base name.
    let getters = ctx.declarations_matching(cls.as_symbol(), &TermName::simple("get"));
    assert_eq!(getters.len(), 1);
    match ctx.declared_type_of(getters[0]) {
        Some(Type::Method(method)) => {
            assert!(method.param_types.is_empty());
            assert_eq!(method.result_type, scala_int());
        }
        other => panic!("expected a method type, got {other:?}"),
    }

    let setters = ctx.declarations_matching(cls.as_symbol(), &TermName::simple("set"));
    assert_eq!(setters.len(), 1);
    match ctx.declared_type_of(setters[0]) {
        Some(Type::Method(method)) => {
            assert_eq!(method.param_types, vec![scala_int()]);
            assert_eq!(method.result_type, Type::Unit);
        }
        other => panic!("expected a method type, got {other:?}"),
    }
}

#[test]
fn scala2_roots_are_populated_from_the_erased_classfile_view() {
    let ctx = java_context(&["ScalaSig"]);
    let cls = ctx.find_top_level_class("jdk", "Box").expect("class loads");
    assert!(ctx.is_initialised(cls.as_symbol()));
    assert!(ctx
        .lookup_declaration(cls.as_symbol(), &Name::Term(TermName::simple("value")))
        .is_some());
}

#[test]
fn widening_an_unsigned_method_reference_picks_the_unique_overload() {
    let ctx = java_context(&[]);
    let cls = ctx.find_top_level_class("jdk", "Box").expect("class loads");
    let prefix = Type::type_ref_symbol(Type::package(to_package_name("jdk")), cls);
    let get_ref = Type::term_ref(prefix, TermName::simple("get"));
    match get_ref.widen_overloads(&ctx).unwrap() {
        Type::Method(method) => assert_eq!(method.result_type, scala_int()),
        other => panic!("expected a method type, got {other:?}"),
    }
}
