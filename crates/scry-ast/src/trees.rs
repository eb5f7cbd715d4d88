//! The tree model: a closed family of immutable nodes with memoized types.
//!
//! Nodes are shared as `Arc<Tree>`; the only interior state is the one-shot
//! memo slot holding the node's computed type. Type computation follows the
//! per-variant rules implemented in `calculate_type` and is retryable: a
//! failed computation is returned to the caller and not cached.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use scry_core::{Constant, Name, Span, TermName, TypeName};

use crate::contexts::BaseContext;
use crate::errors::TypeError;
use crate::symbols::{ClassId, PackageId, SymbolId};
use crate::types::{LambdaParam, MatchType, MatchTypeCase, PackageRef, Type, TypeBounds, TypeLambda};

/// A parent clause of a [`TreeKind::Template`]: a constructor invocation for
/// class parents, a plain type tree otherwise.
#[derive(Debug, Clone)]
pub enum Parent {
    Term(Arc<Tree>),
    TypeTree(Arc<TypeTree>),
}

/// One parameter clause of a [`TreeKind::DefDef`].
#[derive(Debug, Clone)]
pub enum ParamList {
    /// A clause of value parameters (`ValDef` trees).
    Terms(Vec<Arc<Tree>>),
    /// A clause of type parameters (`TypeParam` trees).
    Types(Vec<Arc<Tree>>),
}

impl ParamList {
    pub fn trees(&self) -> &[Arc<Tree>] {
        match self {
            ParamList::Terms(trees) | ParamList::Types(trees) => trees,
        }
    }
}

/// The right-hand side of a type member or the bounds of a type parameter:
/// either still in tree form, or already a structural bounds value.
#[derive(Debug, Clone)]
pub enum TypeBoundsDef {
    Tree(Arc<TypeTree>),
    Bounds(TypeBounds),
}

impl TypeBoundsDef {
    /// The structural bounds this definition denotes.
    pub fn bounds(&self, cx: &BaseContext) -> Result<TypeBounds, TypeError> {
        match self {
            TypeBoundsDef::Bounds(bounds) => Ok(bounds.clone()),
            TypeBoundsDef::Tree(tree) => match tree.to_type(cx)? {
                Type::Bounds(bounds) => Ok((**bounds).clone()),
                other => Ok(TypeBounds::new(Type::Nothing, other.clone())),
            },
        }
    }
}

/// One refinement inside a [`TypeTreeKind::Refined`] tree.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub name: Name,
    pub info: Arc<TypeTree>,
}

/// One case of a [`TypeTreeKind::MatchTypeTree`].
#[derive(Debug, Clone)]
pub struct TypeCaseDef {
    pub pattern: Arc<TypeTree>,
    pub result: Arc<TypeTree>,
}

/// A tree node.
#[derive(Debug)]
pub struct Tree {
    pub span: Span,
    pub kind: TreeKind,
    tpe_cell: OnceCell<Type>,
}

/// The payload of a tree node.
#[derive(Debug)]
pub enum TreeKind {
    PackageDef {
        pid: PackageId,
        stats: Vec<Arc<Tree>>,
    },
    Import {
        expr: Arc<Tree>,
        selectors: Vec<Arc<Tree>>,
    },
    Export {
        expr: Arc<Tree>,
        selectors: Vec<Arc<Tree>>,
    },
    ImportSelector {
        imported: Arc<Tree>,
        renamed: Option<Arc<Tree>>,
        bound: Option<Arc<TypeTree>>,
    },
    ClassDef {
        name: TypeName,
        template: Arc<Tree>,
        symbol: ClassId,
    },
    Template {
        constr: Arc<Tree>,
        parents: Vec<Parent>,
        self_def: Option<Arc<Tree>>,
        body: Vec<Arc<Tree>>,
    },
    ValDef {
        name: TermName,
        tpt: Arc<TypeTree>,
        rhs: Option<Arc<Tree>>,
        symbol: SymbolId,
    },
    DefDef {
        name: TermName,
        param_lists: Vec<ParamList>,
        result_tpt: Arc<TypeTree>,
        rhs: Option<Arc<Tree>>,
        symbol: SymbolId,
    },
    Select {
        qualifier: Arc<Tree>,
        name: TermName,
    },
    SelectIn {
        qualifier: Arc<Tree>,
        name: TermName,
        owner: Type,
    },
    Super {
        qualifier: Arc<Tree>,
        mix: Option<TypeName>,
    },
    Apply {
        fun: Arc<Tree>,
        args: Vec<Arc<Tree>>,
    },
    TypeApply {
        fun: Arc<Tree>,
        args: Vec<Arc<TypeTree>>,
    },
    Typed {
        expr: Arc<Tree>,
        tpt: Arc<TypeTree>,
    },
    Assign {
        lhs: Arc<Tree>,
        rhs: Arc<Tree>,
    },
    NamedArg {
        name: TermName,
        arg: Arc<Tree>,
    },
    Block {
        stats: Vec<Arc<Tree>>,
        expr: Arc<Tree>,
    },
    If {
        cond: Arc<Tree>,
        then_part: Arc<Tree>,
        else_part: Arc<Tree>,
    },
    InlineIf {
        cond: Arc<Tree>,
        then_part: Arc<Tree>,
        else_part: Arc<Tree>,
    },
    Lambda {
        meth: Arc<Tree>,
        tpt: Option<Arc<TypeTree>>,
    },
    Match {
        selector: Arc<Tree>,
        cases: Vec<Arc<Tree>>,
    },
    InlineMatch {
        selector: Option<Arc<Tree>>,
        cases: Vec<Arc<Tree>>,
    },
    CaseDef {
        pattern: Arc<Tree>,
        guard: Option<Arc<Tree>>,
        body: Arc<Tree>,
    },
    Bind {
        name: TermName,
        body: Arc<Tree>,
        symbol: SymbolId,
    },
    Alternative {
        trees: Vec<Arc<Tree>>,
    },
    Unapply {
        fun: Arc<Tree>,
        implicits: Vec<Arc<Tree>>,
        patterns: Vec<Arc<Tree>>,
    },
    SeqLiteral {
        elems: Vec<Arc<Tree>>,
        elem_tpt: Arc<TypeTree>,
    },
    While {
        cond: Arc<Tree>,
        body: Arc<Tree>,
    },
    Throw {
        expr: Arc<Tree>,
    },
    Try {
        expr: Arc<Tree>,
        cases: Vec<Arc<Tree>>,
        finalizer: Option<Arc<Tree>>,
    },
    Return {
        expr: Option<Arc<Tree>>,
        from: Arc<Tree>,
    },
    Inlined {
        expr: Arc<Tree>,
        caller: Option<Arc<TypeTree>>,
        bindings: Vec<Arc<Tree>>,
    },
    Literal {
        constant: Constant,
    },
    New {
        tpt: Arc<TypeTree>,
    },
    TypeMember {
        name: TypeName,
        rhs: TypeBoundsDef,
        symbol: SymbolId,
    },
    TypeParam {
        name: TypeName,
        bounds: TypeBoundsDef,
        symbol: SymbolId,
    },
    This {
        qualifier: Arc<TypeTree>,
    },
    /// A reference whose type was resolved by the decoder.
    Ident {
        name: TermName,
        tpe: Type,
    },
    /// A reference that does not live in the enclosing scope hierarchy.
    FreeIdent {
        name: TermName,
        tpe: Type,
    },
    /// An identifier denoting a package, e.g. as an import qualifier.
    ReferencedPackage {
        full_name: TermName,
    },
    EmptyTree,
}

impl Tree {
    pub fn new(kind: TreeKind, span: Span) -> Arc<Tree> {
        Arc::new(Tree {
            span,
            kind,
            tpe_cell: OnceCell::new(),
        })
    }

    /// The name of this node's variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            TreeKind::PackageDef { .. } => "PackageDef",
            TreeKind::Import { .. } => "Import",
            TreeKind::Export { .. } => "Export",
            TreeKind::ImportSelector { .. } => "ImportSelector",
            TreeKind::ClassDef { .. } => "ClassDef",
            TreeKind::Template { .. } => "Template",
            TreeKind::ValDef { .. } => "ValDef",
            TreeKind::DefDef { .. } => "DefDef",
            TreeKind::Select { .. } => "Select",
            TreeKind::SelectIn { .. } => "SelectIn",
            TreeKind::Super { .. } => "Super",
            TreeKind::Apply { .. } => "Apply",
            TreeKind::TypeApply { .. } => "TypeApply",
            TreeKind::Typed { .. } => "Typed",
            TreeKind::Assign { .. } => "Assign",
            TreeKind::NamedArg { .. } => "NamedArg",
            TreeKind::Block { .. } => "Block",
            TreeKind::If { .. } => "If",
            TreeKind::InlineIf { .. } => "InlineIf",
            TreeKind::Lambda { .. } => "Lambda",
            TreeKind::Match { .. } => "Match",
            TreeKind::InlineMatch { .. } => "InlineMatch",
            TreeKind::CaseDef { .. } => "CaseDef",
            TreeKind::Bind { .. } => "Bind",
            TreeKind::Alternative { .. } => "Alternative",
            TreeKind::Unapply { .. } => "Unapply",
            TreeKind::SeqLiteral { .. } => "SeqLiteral",
            TreeKind::While { .. } => "While",
            TreeKind::Throw { .. } => "Throw",
            TreeKind::Try { .. } => "Try",
            TreeKind::Return { .. } => "Return",
            TreeKind::Inlined { .. } => "Inlined",
            TreeKind::Literal { .. } => "Literal",
            TreeKind::New { .. } => "New",
            TreeKind::TypeMember { .. } => "TypeMember",
            TreeKind::TypeParam { .. } => "TypeParam",
            TreeKind::This { .. } => "This",
            TreeKind::Ident { .. } => "Ident",
            TreeKind::FreeIdent { .. } => "FreeIdent",
            TreeKind::ReferencedPackage { .. } => "ReferencedPackage",
            TreeKind::EmptyTree => "EmptyTree",
        }
    }

    /// The symbol introduced by this node, for definition trees.
    pub fn symbol(&self) -> Option<SymbolId> {
        match &self.kind {
            TreeKind::PackageDef { pid, .. } => Some(pid.as_symbol()),
            TreeKind::ClassDef { symbol, .. } => Some(symbol.as_symbol()),
            TreeKind::ValDef { symbol, .. }
            | TreeKind::DefDef { symbol, .. }
            | TreeKind::Bind { symbol, .. }
            | TreeKind::TypeMember { symbol, .. }
            | TreeKind::TypeParam { symbol, .. } => Some(*symbol),
            _ => None,
        }
    }

    /// The type of this node. Computed at most once; a failing computation
    /// is reported to the caller and may be retried.
    pub fn tpe(&self, cx: &BaseContext) -> Result<&Type, TypeError> {
        self.tpe_cell.get_or_try_init(|| self.calculate_type(cx))
    }

    fn error(&self) -> TypeError {
        TypeError::TypeComputation {
            node: self.kind_name(),
            span: self.span,
        }
    }

    fn calculate_type(&self, cx: &BaseContext) -> Result<Type, TypeError> {
        match &self.kind {
            // Definitions have no type of their own.
            TreeKind::PackageDef { .. }
            | TreeKind::Import { .. }
            | TreeKind::Export { .. }
            | TreeKind::ImportSelector { .. }
            | TreeKind::ClassDef { .. }
            | TreeKind::Template { .. }
            | TreeKind::ValDef { .. }
            | TreeKind::DefDef { .. }
            | TreeKind::Bind { .. }
            | TreeKind::TypeMember { .. }
            | TreeKind::TypeParam { .. }
            | TreeKind::EmptyTree => Ok(Type::NoType),

            TreeKind::Select { qualifier, name } => {
                qualifier.tpe(cx)?.select(&Name::Term(name.clone()))
            }
            TreeKind::SelectIn { name, owner, .. } => owner.select_in(name, owner),
            TreeKind::Super { qualifier, .. } => Ok(qualifier.tpe(cx)?.clone()),
            TreeKind::Apply { fun, .. } => {
                match fun.tpe(cx)?.widen_overloads(cx)? {
                    Type::Method(method) => Ok(method.result_type.clone()),
                    other => Err(TypeError::NonMethodReference(format!(
                        "applied a non-method type {other:?}"
                    ))),
                }
            }
            TreeKind::TypeApply { fun, .. } => {
                match fun.tpe(cx)?.widen_overloads(cx)? {
                    Type::Poly(poly) => Ok(poly.result_type.clone()),
                    other => Err(TypeError::NonMethodReference(format!(
                        "type-applied a non-polymorphic type {other:?}"
                    ))),
                }
            }
            TreeKind::Typed { tpt, .. } | TreeKind::New { tpt } => Ok(tpt.to_type(cx)?.clone()),
            TreeKind::Assign { .. } | TreeKind::While { .. } => Ok(Type::Unit),
            TreeKind::NamedArg { arg, .. } => Ok(arg.tpe(cx)?.clone()),
            TreeKind::Block { expr, .. } => Ok(expr.tpe(cx)?.clone()),
            TreeKind::If {
                then_part,
                else_part,
                ..
            }
            | TreeKind::InlineIf {
                then_part,
                else_part,
                ..
            } => Ok(Type::or(then_part.tpe(cx)?.clone(), else_part.tpe(cx)?.clone())),
            TreeKind::Lambda { tpt, .. } => match tpt {
                Some(tpt) => Ok(tpt.to_type(cx)?.clone()),
                None => Err(self.error()),
            },
            TreeKind::Match { cases, .. } | TreeKind::InlineMatch { cases, .. } => {
                join_branches(None, cases, cx)
            }
            TreeKind::CaseDef { body, .. } => Ok(body.tpe(cx)?.clone()),
            TreeKind::Try { expr, cases, .. } => {
                join_branches(Some(expr.tpe(cx)?.clone()), cases, cx)
            }
            TreeKind::Throw { .. } | TreeKind::Return { .. } => Ok(Type::Nothing),
            TreeKind::Inlined { expr, .. } => Ok(expr.tpe(cx)?.clone()),
            TreeKind::Literal { constant } => Ok(Type::Constant(constant.clone())),
            TreeKind::This { qualifier } => match qualifier.to_type(cx)? {
                Type::Package(p) | Type::PackageTypeRef(p) => Ok(Type::Package(p.clone())),
                Type::TypeRef(tref) => Ok(Type::this(tref.clone())),
                _ => Err(self.error()),
            },
            TreeKind::Ident { tpe, .. } | TreeKind::FreeIdent { tpe, .. } => Ok(tpe.clone()),
            TreeKind::ReferencedPackage { full_name } => {
                Ok(Type::Package(PackageRef::new(full_name.clone())))
            }

            // Pattern-only nodes are matched positions, not expressions.
            TreeKind::Alternative { .. }
            | TreeKind::Unapply { .. }
            | TreeKind::SeqLiteral { .. } => Err(self.error()),
        }
    }

    /// The direct subtrees of this node, in visit order.
    pub fn subtrees(&self) -> Vec<&Arc<Tree>> {
        let mut out = Vec::new();
        self.push_subtrees(&mut out);
        out
    }

    fn push_subtrees<'t>(&'t self, out: &mut Vec<&'t Arc<Tree>>) {
        match &self.kind {
            TreeKind::PackageDef { stats, .. } => out.extend(stats),
            TreeKind::Import { expr, selectors } | TreeKind::Export { expr, selectors } => {
                out.push(expr);
                out.extend(selectors);
            }
            TreeKind::ImportSelector {
                imported, renamed, ..
            } => {
                out.push(imported);
                out.extend(renamed);
            }
            TreeKind::ClassDef { template, .. } => out.push(template),
            TreeKind::Template {
                constr,
                parents,
                self_def,
                body,
            } => {
                out.push(constr);
                for parent in parents {
                    if let Parent::Term(tree) = parent {
                        out.push(tree);
                    }
                }
                out.extend(self_def);
                out.extend(body);
            }
            TreeKind::ValDef { rhs, .. } => out.extend(rhs),
            TreeKind::DefDef {
                param_lists, rhs, ..
            } => {
                for params in param_lists {
                    out.extend(params.trees());
                }
                out.extend(rhs);
            }
            TreeKind::Select { qualifier, .. }
            | TreeKind::SelectIn { qualifier, .. }
            | TreeKind::Super { qualifier, .. } => out.push(qualifier),
            TreeKind::Apply { fun, args } => {
                out.push(fun);
                out.extend(args);
            }
            TreeKind::TypeApply { fun, .. } => out.push(fun),
            TreeKind::Typed { expr, .. } => out.push(expr),
            TreeKind::Assign { lhs, rhs } => {
                out.push(lhs);
                out.push(rhs);
            }
            TreeKind::NamedArg { arg, .. } => out.push(arg),
            TreeKind::Block { stats, expr } => {
                out.extend(stats);
                out.push(expr);
            }
            TreeKind::If {
                cond,
                then_part,
                else_part,
            }
            | TreeKind::InlineIf {
                cond,
                then_part,
                else_part,
            } => {
                out.push(cond);
                out.push(then_part);
                out.push(else_part);
            }
            TreeKind::Lambda { meth, .. } => out.push(meth),
            TreeKind::Match { selector, cases } => {
                out.push(selector);
                out.extend(cases);
            }
            TreeKind::InlineMatch { selector, cases } => {
                out.extend(selector);
                out.extend(cases);
            }
            TreeKind::CaseDef {
                pattern,
                guard,
                body,
            } => {
                out.push(pattern);
                out.extend(guard);
                out.push(body);
            }
            TreeKind::Bind { body, .. } => out.push(body),
            TreeKind::Alternative { trees } => out.extend(trees),
            TreeKind::Unapply {
                fun,
                implicits,
                patterns,
            } => {
                out.push(fun);
                out.extend(implicits);
                out.extend(patterns);
            }
            TreeKind::SeqLiteral { elems, .. } => out.extend(elems),
            TreeKind::While { cond, body } => {
                out.push(cond);
                out.push(body);
            }
            TreeKind::Throw { expr } => out.push(expr),
            TreeKind::Try {
                expr,
                cases,
                finalizer,
            } => {
                out.push(expr);
                out.extend(cases);
                out.extend(finalizer);
            }
            TreeKind::Return { expr, from } => {
                out.extend(expr);
                out.push(from);
            }
            TreeKind::Inlined { expr, bindings, .. } => {
                out.push(expr);
                out.extend(bindings);
            }
            TreeKind::Literal { .. }
            | TreeKind::New { .. }
            | TreeKind::TypeMember { .. }
            | TreeKind::TypeParam { .. }
            | TreeKind::This { .. }
            | TreeKind::Ident { .. }
            | TreeKind::FreeIdent { .. }
            | TreeKind::ReferencedPackage { .. }
            | TreeKind::EmptyTree => {}
        }
    }

    /// The type trees carried directly by this node.
    pub fn type_trees(&self) -> Vec<&Arc<TypeTree>> {
        let mut out = Vec::new();
        match &self.kind {
            TreeKind::ImportSelector { bound, .. } => out.extend(bound),
            TreeKind::Template { parents, .. } => {
                for parent in parents {
                    if let Parent::TypeTree(tpt) = parent {
                        out.push(tpt);
                    }
                }
            }
            TreeKind::ValDef { tpt, .. } => out.push(tpt),
            TreeKind::DefDef { result_tpt, .. } => out.push(result_tpt),
            TreeKind::TypeApply { args, .. } => out.extend(args),
            TreeKind::Typed { tpt, .. } => out.push(tpt),
            TreeKind::Lambda { tpt, .. } => out.extend(tpt),
            TreeKind::SeqLiteral { elem_tpt, .. } => out.push(elem_tpt),
            TreeKind::New { tpt } => out.push(tpt),
            TreeKind::TypeMember {
                rhs: TypeBoundsDef::Tree(tpt),
                ..
            } => out.push(tpt),
            TreeKind::TypeParam {
                bounds: TypeBoundsDef::Tree(tpt),
                ..
            } => out.push(tpt),
            TreeKind::This { qualifier } => out.push(qualifier),
            _ => {}
        }
        out
    }

    /// Visits this node and, depth-first in projection order, every subtree.
    pub fn walk_tree<F: FnMut(&Tree)>(&self, op: &mut F) {
        op(self);
        for child in self.subtrees() {
            child.walk_tree(op);
        }
    }

    /// Folds `op` over the tree, combining each node's value with its
    /// children's results in visit order.
    pub fn fold_tree<R>(
        &self,
        op: &mut impl FnMut(&Tree) -> R,
        combine: &impl Fn(R, R) -> R,
    ) -> R {
        let mut acc = op(self);
        for child in self.subtrees() {
            acc = combine(acc, child.fold_tree(op, combine));
        }
        acc
    }

    /// Applies `op` to the type trees discovered at every visited tree.
    pub fn walk_type_trees<F: FnMut(&TypeTree)>(&self, op: &mut F) {
        self.walk_tree(&mut |tree| {
            for tpt in tree.type_trees() {
                op(tpt);
            }
        });
    }

    /// Finds the first node satisfying `pred` in visit order.
    pub fn find<F: Fn(&Tree) -> bool>(&self, pred: F) -> Option<&Tree> {
        fn go<'t, F: Fn(&Tree) -> bool>(tree: &'t Tree, pred: &F) -> Option<&'t Tree> {
            if pred(tree) {
                return Some(tree);
            }
            for child in tree.subtrees() {
                if let Some(found) = go(child, pred) {
                    return Some(found);
                }
            }
            None
        }
        go(self, &pred)
    }
}

/// Joins branch types into a left-nested `OrType`, with no normalization.
fn join_branches(
    start: Option<Type>,
    cases: &[Arc<Tree>],
    cx: &BaseContext,
) -> Result<Type, TypeError> {
    let mut acc = start;
    for case in cases {
        let tpe = case.tpe(cx)?.clone();
        acc = Some(match acc {
            Some(joined) => Type::or(joined, tpe),
            None => tpe,
        });
    }
    Ok(acc.unwrap_or(Type::Nothing))
}

/// A tree denoting a type rather than a term.
#[derive(Debug)]
pub struct TypeTree {
    pub span: Span,
    pub kind: TypeTreeKind,
    tpe_cell: OnceCell<Type>,
}

#[derive(Debug)]
pub enum TypeTreeKind {
    /// A type identifier, already anchored at its prefix by the decoder.
    TypeIdent { name: TypeName, prefix: Type },
    /// A type member selected from a term qualifier.
    TypeSelect {
        qualifier: Arc<Tree>,
        name: TypeName,
    },
    /// A type without tree structure of its own.
    TypeWrapper { tpe: Type },
    /// The singleton type of a path expression.
    Singleton { ref_tree: Arc<Tree> },
    Applied {
        tycon: Arc<TypeTree>,
        args: Vec<Arc<TypeTree>>,
    },
    Refined {
        underlying: Arc<TypeTree>,
        refinements: Vec<Refinement>,
    },
    ByName { result: Arc<TypeTree> },
    /// A type lambda; `params` are `TypeParam` trees.
    TypeLambdaTree {
        params: Vec<Arc<Tree>>,
        body: Arc<TypeTree>,
    },
    Bounds {
        low: Arc<TypeTree>,
        high: Arc<TypeTree>,
    },
    MatchTypeTree {
        bound: Option<Arc<TypeTree>>,
        scrutinee: Arc<TypeTree>,
        cases: Vec<TypeCaseDef>,
    },
    EmptyTypeTree,
}

impl TypeTree {
    pub fn new(kind: TypeTreeKind, span: Span) -> Arc<TypeTree> {
        Arc::new(TypeTree {
            span,
            kind,
            tpe_cell: OnceCell::new(),
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            TypeTreeKind::TypeIdent { .. } => "TypeIdent",
            TypeTreeKind::TypeSelect { .. } => "TypeSelect",
            TypeTreeKind::TypeWrapper { .. } => "TypeWrapper",
            TypeTreeKind::Singleton { .. } => "Singleton",
            TypeTreeKind::Applied { .. } => "AppliedTypeTree",
            TypeTreeKind::Refined { .. } => "RefinedTypeTree",
            TypeTreeKind::ByName { .. } => "ByNameTypeTree",
            TypeTreeKind::TypeLambdaTree { .. } => "TypeLambdaTree",
            TypeTreeKind::Bounds { .. } => "TypeBoundsTree",
            TypeTreeKind::MatchTypeTree { .. } => "MatchTypeTree",
            TypeTreeKind::EmptyTypeTree => "EmptyTypeTree",
        }
    }

    /// Projects this tree onto the type it denotes. Memoized like
    /// `Tree::tpe`.
    pub fn to_type(&self, cx: &BaseContext) -> Result<&Type, TypeError> {
        self.tpe_cell.get_or_try_init(|| self.calculate(cx))
    }

    fn calculate(&self, cx: &BaseContext) -> Result<Type, TypeError> {
        match &self.kind {
            TypeTreeKind::TypeIdent { name, prefix } => {
                Ok(Type::type_ref(prefix.clone(), name.clone()))
            }
            TypeTreeKind::TypeSelect { qualifier, name } => {
                qualifier.tpe(cx)?.select(&Name::Type(name.clone()))
            }
            TypeTreeKind::TypeWrapper { tpe } => Ok(tpe.clone()),
            TypeTreeKind::Singleton { ref_tree } => Ok(ref_tree.tpe(cx)?.clone()),
            TypeTreeKind::Applied { tycon, args } => {
                let tycon = tycon.to_type(cx)?.clone();
                let args = args
                    .iter()
                    .map(|arg| arg.to_type(cx).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::applied(tycon, args))
            }
            TypeTreeKind::Refined {
                underlying,
                refinements,
            } => {
                let mut acc = underlying.to_type(cx)?.clone();
                for refinement in refinements {
                    let info = refinement.info.to_type(cx)?.clone();
                    acc = Type::refined(acc, refinement.name.clone(), info);
                }
                Ok(acc)
            }
            TypeTreeKind::ByName { result } => Ok(Type::by_name(result.to_type(cx)?.clone())),
            TypeTreeKind::TypeLambdaTree { params, body } => {
                // Parameter bounds collapse to `>: Nothing <: Any` until
                // higher-kinded parameter references are resolved.
                let lambda_params = params
                    .iter()
                    .map(|param| match &param.kind {
                        TreeKind::TypeParam { name, .. } => Ok(LambdaParam {
                            name: name.clone(),
                            bounds: TypeBounds::unbounded(),
                        }),
                        _ => Err(TypeError::TypeComputation {
                            node: param.kind_name(),
                            span: param.span,
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let body = body.to_type(cx)?.clone();
                let lambda = TypeLambda::create(lambda_params, |_| Ok::<_, TypeError>(body))?;
                Ok(Type::Lambda(lambda))
            }
            TypeTreeKind::Bounds { low, high } => Ok(Type::bounds(TypeBounds::new(
                low.to_type(cx)?.clone(),
                high.to_type(cx)?.clone(),
            ))),
            TypeTreeKind::MatchTypeTree {
                bound,
                scrutinee,
                cases,
            } => {
                let bound = match bound {
                    Some(tree) => tree.to_type(cx)?.clone(),
                    None => Type::Any,
                };
                let scrutinee = scrutinee.to_type(cx)?.clone();
                let cases = cases
                    .iter()
                    .map(|case| {
                        Ok(MatchTypeCase {
                            pattern: case.pattern.to_type(cx)?.clone(),
                            result: case.result.to_type(cx)?.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, TypeError>>()?;
                Ok(Type::Match(Arc::new(MatchType {
                    bound,
                    scrutinee,
                    cases,
                })))
            }
            TypeTreeKind::EmptyTypeTree => Ok(Type::NoType),
        }
    }
}
