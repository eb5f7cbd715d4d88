//! The loader's discovery protocol: idempotence, entry consumption, and
//! `top_level_trees` visibility rules.

use scry_ast::Type;
use scry_classpath::PackageData;
use scry_core::{to_package_name, Name, TermName, TypeName};
use scry_loader::{Context, EventTag, LoaderError};

use super::fixtures::*;

fn simple_context(roots: &[&str]) -> Context {
    let mut decoder = StubDecoder::default();
    for root in roots {
        decoder = decoder.with(
            root,
            Default::default(),
            vec![package_def("p", vec![class_def(root, vec![])])],
        );
    }
    context_for(vec![tasty_only_package("p", roots)], decoder)
}

#[test]
fn scan_package_is_idempotent() {
    let ctx = simple_context(&["Foo"]);
    let pkg = ctx.find_package(&to_package_name("p")).expect("package");
    ctx.scan_package(pkg).unwrap();
    // A second scan is a no-op: root symbols are not re-entered and no
    // duplicate-declaration error surfaces.
    ctx.scan_package(pkg).unwrap();
    assert!(ctx.is_initialised(pkg.as_symbol()));
}

#[test]
fn scan_package_enters_all_three_root_symbols() {
    let ctx = simple_context(&["Foo"]);
    let pkg = ctx.find_package(&to_package_name("p")).expect("package");
    ctx.scan_package(pkg).unwrap();

    let owner = pkg.as_symbol();
    let value = ctx
        .lookup_declaration(owner, &Name::Term(TermName::simple("Foo")))
        .expect("module value entered");
    let class = ctx
        .lookup_declaration(owner, &Name::Type(TypeName::simple("Foo")))
        .expect("class entered");
    let module_class = ctx
        .lookup_declaration(owner, &Name::Type(TypeName::simple("Foo").object_class()))
        .expect("object class entered");
    assert!(ctx.as_class(class).is_some());
    assert!(ctx.as_class(module_class).is_some());
    assert!(ctx.as_class(value).is_none());
}

#[test]
fn scan_class_consumes_its_entry_and_short_circuits() {
    let ctx = simple_context(&["Foo"]);
    let cls = ctx.find_top_level_class("p", "Foo").expect("class loads");
    // `find_top_level_class` already scanned the class.
    assert!(!ctx.has_entry(cls));
    assert!(!ctx.scan_class(cls).unwrap());
    assert!(ctx.top_level_trees(cls).is_some());
}

#[test]
fn nested_and_module_entries_are_not_roots() {
    let ctx = context_for(
        vec![tasty_only_package("p", &["Foo$", "Foo$Inner", "Bar$package$"])],
        StubDecoder::default(),
    );
    let pkg = ctx.find_package(&to_package_name("p")).expect("package");
    ctx.scan_package(pkg).unwrap();
    assert!(ctx
        .lookup_declaration(pkg.as_symbol(), &Name::Type(TypeName::simple("Foo$Inner")))
        .is_none());
    // No roots at all: the only entries were modules and nested classes.
    assert_eq!(
        ctx.with_symbols(|symbols| symbols.declarations(pkg.as_symbol()).len()),
        0
    );
}

#[test]
fn package_chains_are_created_segment_by_segment() {
    let ctx = context_for(
        vec![PackageData {
            dotted_name: "a.b.c".to_string(),
            classes: Vec::new(),
            tastys: vec![tasty_entry("Deep")],
        }],
        StubDecoder::default(),
    );
    let abc = ctx.find_package(&to_package_name("a.b.c")).expect("a.b.c");
    let ab = ctx.find_package(&to_package_name("a.b")).expect("a.b");
    let a = ctx.find_package(&to_package_name("a")).expect("a");
    let root = ctx.defn().root_package;
    assert_eq!(ctx.owner_of(abc.as_symbol()), Some(ab.as_symbol()));
    assert_eq!(ctx.owner_of(ab.as_symbol()), Some(a.as_symbol()));
    assert_eq!(ctx.owner_of(a.as_symbol()), Some(root.as_symbol()));
}

#[test]
fn missing_top_level_tasty_fails_the_root_scan() {
    let bytes = build_classfile("p/Broken", &["TASTY", "Scala"], &[], &[]);
    let ctx = context_for(
        vec![PackageData {
            dotted_name: "p".to_string(),
            classes: vec![class_entry("Broken", bytes)],
            tastys: Vec::new(),
        }],
        StubDecoder::default(),
    );
    let pkg = ctx.find_package(&to_package_name("p")).expect("package");
    ctx.scan_package(pkg).unwrap();
    let cls = ctx
        .lookup_declaration(pkg.as_symbol(), &Name::Type(TypeName::simple("Broken")))
        .and_then(|id| ctx.as_class(id))
        .expect("root entered");

    let err = ctx.scan_class(cls).unwrap_err();
    assert!(matches!(err, LoaderError::MissingTopLevelTasty(_)));
    // The entry is consumed and the root stays uninitialized.
    assert!(!ctx.has_entry(cls));
    assert!(!ctx.is_initialised(cls.as_symbol()));
    assert!(ctx.find_top_level_class("p", "Broken").is_none());
}

#[test]
fn object_class_shadows_do_not_expose_top_level_trees() {
    // A root defining both `class Foo` and `object Foo`.
    let forest = vec![package_def(
        "p",
        vec![
            class_def("Foo", vec![]),
            class_def_named(TypeName::simple("Foo").object_class(), vec![]),
            node(
                EventTag::ValDef,
                vec![
                    term("Foo"),
                    child(type_ident("p", "Foo$")),
                    none(),
                ],
            ),
        ],
    )];
    let decoder = StubDecoder::default().with("Foo", Default::default(), forest);
    let ctx = context_for(vec![tasty_only_package("p", &["Foo"])], decoder);

    let cls = ctx.find_top_level_class("p", "Foo").expect("class loads");
    assert!(ctx.top_level_trees(cls).is_some());

    let pkg = ctx.find_package(&to_package_name("p")).expect("package");
    let shadow = ctx
        .lookup_declaration(pkg.as_symbol(), &Name::Type(TypeName::simple("Foo").object_class()))
        .and_then(|id| ctx.as_class(id))
        .expect("object class entered");
    assert!(ctx.is_initialised(shadow.as_symbol()));
    assert!(ctx.top_level_trees(shadow).is_none());

    // The module value's declared type chains to the object class.
    let value = ctx
        .lookup_declaration(pkg.as_symbol(), &Name::Term(TermName::simple("Foo")))
        .expect("module value entered");
    assert_eq!(
        ctx.declared_type_of(value),
        Some(Type::type_ref(
            Type::package(to_package_name("p")),
            TypeName::simple("Foo$"),
        ))
    );
}

#[test]
fn failed_roots_resolve_to_none_from_then_on() {
    // No forest registered for this root: the decoder reports corruption.
    let ctx = context_for(
        vec![tasty_only_package("p", &["Ghost"])],
        StubDecoder::default(),
    );
    assert!(ctx.find_top_level_class("p", "Ghost").is_none());
    // The entry was consumed by the failed scan; later queries still miss.
    assert!(ctx.find_top_level_class("p", "Ghost").is_none());
}
