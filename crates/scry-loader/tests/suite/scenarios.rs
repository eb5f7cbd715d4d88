//! End-to-end decoding scenarios: classpath in, typed trees out.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use scry_ast::{Parent, Tree, TreeKind, Type, TypeBoundsDef, TypeTreeKind};
use scry_core::{to_package_name, Constant, TypeName};
use scry_loader::{Context, EventTag};

use super::fixtures::*;

fn scala_int() -> Type {
    Type::type_ref(
        Type::package(to_package_name("scala")),
        TypeName::simple("Int"),
    )
}

fn load_single(package: &str, root: &str, forest: Vec<scry_loader::EventNode>) -> (Context, Vec<Arc<Tree>>) {
    let decoder = StubDecoder::default().with(root, Default::default(), forest);
    let ctx = context_for(vec![tasty_only_package(package, &[root])], decoder);
    let cls = ctx
        .find_top_level_class(package, root)
        .expect("root resolves");
    let trees = ctx.top_level_trees(cls).expect("top-level trees recorded");
    (ctx, trees)
}

#[test]
fn empty_class_decodes_to_its_package_and_class_definition() {
    let forest = vec![package_def("empty_class", vec![class_def("EmptyClass", vec![])])];
    let (ctx, trees) = load_single("empty_class", "EmptyClass", forest);

    assert_eq!(trees.len(), 1);
    let TreeKind::PackageDef { pid, stats } = &trees[0].kind else {
        panic!("expected a PackageDef at the top level");
    };
    assert_eq!(ctx.full_package_name(*pid).to_string(), "empty_class");
    assert_eq!(stats.len(), 1);

    let TreeKind::ClassDef {
        name,
        template,
        symbol,
    } = &stats[0].kind
    else {
        panic!("expected a ClassDef");
    };
    assert_eq!(name.to_string(), "EmptyClass");

    let TreeKind::Template {
        constr,
        parents,
        self_def,
        body,
    } = &template.kind
    else {
        panic!("expected a Template");
    };
    assert!(matches!(&constr.kind, TreeKind::DefDef { name, .. } if name.to_string() == "<init>"));
    assert_eq!(parents.len(), 1);
    assert!(matches!(&parents[0], Parent::Term(tree) if matches!(tree.kind, TreeKind::Apply { .. })));
    assert!(self_def.is_none());
    assert!(body.is_empty());

    // The class symbol points back at exactly this definition.
    let back = ctx.tree_of(symbol.as_symbol()).expect("defining tree linked");
    assert!(Arc::ptr_eq(&back, &stats[0]));
    assert!(ctx.is_initialised(symbol.as_symbol()));
}

#[test]
fn position_section_spans_attach_to_decoded_trees() {
    use scry_core::Span;

    let forest = vec![package_def(
        "empty_class",
        vec![node_at(
            scry_loader::EventTag::ClassDef,
            3,
            vec![
                type_name("EmptyClass"),
                child(node(
                    scry_loader::EventTag::Template,
                    vec![child(empty_ctor()), children(vec![]), none(), children(vec![])],
                )),
            ],
        )],
    )];
    let positions = scry_loader::PositionTable::from([(3, Span::new(10, 42))]);
    let decoder = StubDecoder::default().with("EmptyClass", positions, forest);
    let ctx = context_for(
        vec![tasty_only_package("empty_class", &["EmptyClass"])],
        decoder,
    );
    let cls = ctx
        .find_top_level_class("empty_class", "EmptyClass")
        .expect("root resolves");
    let trees = ctx.top_level_trees(cls).expect("trees recorded");

    let class_def = trees[0]
        .find(|tree| matches!(tree.kind, TreeKind::ClassDef { .. }))
        .expect("class decoded");
    assert_eq!(class_def.span, Span::new(10, 42));
    // Nodes without a recorded position carry the sentinel span.
    assert!(!trees[0].span.exists());
}

#[test]
fn nested_packages_decode_as_nested_package_defs() {
    let forest = vec![package_def(
        "simple_trees",
        vec![package_def(
            "simple_trees.nested",
            vec![class_def("InNestedPackage", vec![])],
        )],
    )];
    let (ctx, trees) = load_single("simple_trees.nested", "InNestedPackage", forest);

    let TreeKind::PackageDef { pid, .. } = &trees[0].kind else {
        panic!("expected a PackageDef");
    };
    assert_eq!(ctx.full_package_name(*pid).to_string(), "simple_trees");

    let inner = trees[0]
        .find(|tree| {
            matches!(&tree.kind, TreeKind::PackageDef { pid, .. }
                if ctx.full_package_name(*pid).to_string() == "simple_trees.nested")
        })
        .expect("nested PackageDef present");
    assert!(inner
        .find(|tree| matches!(&tree.kind, TreeKind::ClassDef { name, .. }
            if name.to_string() == "InNestedPackage"))
        .is_some());
}

#[test]
fn imports_decode_with_their_selectors() {
    let selector = |name: &str| {
        node(
            EventTag::ImportSelector,
            vec![
                child(node(EventTag::Ident, vec![term(name)])),
                none(),
                none(),
            ],
        )
    };
    let import = node(
        EventTag::Import,
        vec![
            child(node(
                EventTag::ReferencedPackage,
                vec![package_name("imported_files")],
            )),
            children(vec![selector("A"), selector("B")]),
        ],
    );
    let forest = vec![package_def(
        "imports",
        vec![import, class_def("MultipleImports", vec![])],
    )];
    let (ctx, trees) = load_single("imports", "MultipleImports", forest);

    let import = trees[0]
        .find(|tree| matches!(tree.kind, TreeKind::Import { .. }))
        .expect("import decoded");
    let TreeKind::Import { expr, selectors } = &import.kind else {
        unreachable!();
    };
    let TreeKind::ReferencedPackage { full_name } = &expr.kind else {
        panic!("expected a ReferencedPackage qualifier");
    };
    assert_eq!(full_name.to_string(), "imported_files");
    assert_eq!(
        expr.tpe(&ctx).unwrap(),
        &Type::package(to_package_name("imported_files"))
    );

    let imported_names: Vec<String> = selectors
        .iter()
        .map(|selector| {
            let TreeKind::ImportSelector {
                imported,
                renamed,
                bound,
            } = &selector.kind
            else {
                panic!("expected an ImportSelector");
            };
            assert!(renamed.is_none());
            assert!(bound.is_none());
            let TreeKind::Ident { name, .. } = &imported.kind else {
                panic!("expected an Ident selector");
            };
            name.to_string()
        })
        .collect();
    assert_eq!(imported_names, ["A", "B"]);
}

#[test]
fn identity_method_decodes_with_linked_symbols_and_method_type() {
    let param = node(
        EventTag::ValDef,
        vec![term("x"), child(type_ident("scala", "Int")), none()],
    );
    let rhs = node(
        EventTag::Ident,
        vec![
            term("x"),
            child(node(
                EventTag::TermRefTy,
                vec![child(node(EventTag::NoPrefixTy, vec![])), term("x")],
            )),
        ],
    );
    let def = node(
        EventTag::DefDef,
        vec![
            term("id"),
            children(vec![node(EventTag::TermParams, vec![children(vec![param])])]),
            child(type_ident("scala", "Int")),
            children(vec![rhs]),
        ],
    );
    let forest = vec![package_def(
        "simple_trees",
        vec![class_def("IdentityMethod", vec![def])],
    )];
    let (ctx, trees) = load_single("simple_trees", "IdentityMethod", forest);

    let def = trees[0]
        .find(|tree| matches!(&tree.kind, TreeKind::DefDef { name, .. } if name.to_string() == "id"))
        .expect("method decoded");
    let TreeKind::DefDef {
        param_lists,
        result_tpt,
        rhs,
        symbol,
        ..
    } = &def.kind
    else {
        unreachable!();
    };

    assert_eq!(param_lists.len(), 1);
    let params = param_lists[0].trees();
    assert_eq!(params.len(), 1);
    let TreeKind::ValDef {
        name: param_name,
        tpt,
        rhs: param_rhs,
        symbol: param_symbol,
    } = &params[0].kind
    else {
        panic!("expected a ValDef parameter");
    };
    assert_eq!(param_name.to_string(), "x");
    assert!(param_rhs.is_none());
    assert!(matches!(&tpt.kind, TypeTreeKind::TypeIdent { name, .. }
        if name.to_string() == "Int"));
    let param_back = ctx.tree_of(*param_symbol).expect("param tree linked");
    assert!(Arc::ptr_eq(&param_back, &params[0]));

    assert!(matches!(&result_tpt.kind, TypeTreeKind::TypeIdent { name, .. }
        if name.to_string() == "Int"));
    assert!(matches!(
        &rhs.as_ref().expect("rhs present").kind,
        TreeKind::Ident { name, .. } if name.to_string() == "x"
    ));

    let back = ctx.tree_of(*symbol).expect("method tree linked");
    assert!(std::ptr::eq(Arc::as_ptr(&back), def as *const _));
    assert_eq!(
        ctx.declared_type_of(*symbol).expect("declared type set"),
        Type::method(
            vec![scry_core::TermName::simple("x")],
            vec![scala_int()],
            scala_int(),
        )
    );
}

#[test]
fn constants_decode_to_literal_vals_with_constant_types() {
    let expected = [
        ("unitVal", Constant::Unit),
        ("falseVal", Constant::Boolean(false)),
        ("trueVal", Constant::Boolean(true)),
        ("intVal", Constant::Int(1)),
        ("charVal", Constant::Char('a')),
        ("floatVal", Constant::float(1.1)),
        ("doubleVal", Constant::double(1.1)),
        ("stringVal", Constant::string("string")),
        ("nullVal", Constant::Null),
    ];
    let any_tpt = || node(EventTag::WrapperTpt, vec![child(node(EventTag::AnyTy, vec![]))]);
    let body = expected
        .iter()
        .map(|(name, value)| {
            node(
                EventTag::ValDef,
                vec![
                    term(name),
                    child(any_tpt()),
                    children(vec![node(EventTag::Literal, vec![constant(value.clone())])]),
                ],
            )
        })
        .collect();
    let forest = vec![package_def(
        "simple_trees",
        vec![class_def("Constants", body)],
    )];
    let (ctx, trees) = load_single("simple_trees", "Constants", forest);

    for (name, value) in expected {
        let val = trees[0]
            .find(|tree| {
                matches!(&tree.kind, TreeKind::ValDef { name: n, .. } if n.to_string() == name)
            })
            .unwrap_or_else(|| panic!("{name} decoded"));
        let TreeKind::ValDef { rhs, .. } = &val.kind else {
            unreachable!();
        };
        let rhs = rhs.as_ref().expect("literal rhs");
        assert!(
            matches!(&rhs.kind, TreeKind::Literal { constant } if constant == &value),
            "unexpected literal for {name}"
        );
        assert_eq!(rhs.tpe(&ctx).unwrap(), &Type::Constant(value));
    }
}

#[test]
fn higher_kinded_type_param_bounds_carry_a_type_lambda() {
    let lambda = node_at(
        EventTag::LambdaTy,
        7,
        vec![
            children(vec![node(
                EventTag::LambdaParamDef,
                vec![
                    type_name("_$1"),
                    child(node(
                        EventTag::BoundsTy,
                        vec![
                            child(node(EventTag::NothingTy, vec![])),
                            child(node(EventTag::AnyTy, vec![])),
                        ],
                    )),
                ],
            )]),
            child(node(EventTag::AnyTy, vec![])),
        ],
    );
    let bounds = node(
        EventTag::BoundsTy,
        vec![child(node(EventTag::NothingTy, vec![])), child(lambda)],
    );
    let type_param = node(EventTag::TypeParam, vec![type_name("A"), child(bounds)]);
    let ctor = node(
        EventTag::DefDef,
        vec![
            term("<init>"),
            children(vec![
                node(EventTag::TypeParams, vec![children(vec![type_param])]),
                node(EventTag::TermParams, vec![children(vec![])]),
            ]),
            child(unit_tpt()),
            none(),
        ],
    );
    let forest = vec![package_def(
        "simple_trees",
        vec![class_def_with_ctor("HigherKinded", ctor, vec![])],
    )];
    let (_ctx, trees) = load_single("simple_trees", "HigherKinded", forest);

    let type_param = trees[0]
        .find(|tree| {
            matches!(&tree.kind, TreeKind::TypeParam { name, .. } if name.to_string() == "A")
        })
        .expect("type parameter decoded");
    let TreeKind::TypeParam { bounds, .. } = &type_param.kind else {
        unreachable!();
    };
    let TypeBoundsDef::Bounds(bounds) = bounds else {
        panic!("expected structural bounds");
    };
    assert_eq!(bounds.low, Type::Nothing);
    let Type::Lambda(lambda) = &bounds.high else {
        panic!("expected a type lambda upper bound, got {:?}", bounds.high);
    };
    assert_eq!(lambda.params().len(), 1);
    assert_eq!(lambda.params()[0].name.to_string(), "_$1");
    assert!(lambda.params()[0].bounds.is_unbounded());
    assert_eq!(lambda.result_type(), &Type::Any);
}
