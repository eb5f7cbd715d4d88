//! TASTy decoder glue: staged section unpickling and event lowering.
//!
//! The byte-level decoder is a collaborator behind [`TastyDecoder`]; this
//! module interprets its structured event forest, creating symbols for
//! definitions, computing declared types, and producing the typed trees the
//! consumer walks. Decoded shapes are validated against the expected payload
//! of each tag; mismatches surface as [`DecoderError`]s.

use std::collections::HashMap;
use std::sync::Arc;

use scry_ast::{
    BaseContext, LambdaParam, PackageId, PackageRef, ParamList, Parent, Refinement, SymbolId,
    Tree, TreeKind, Type, TypeBounds, TypeBoundsDef, TypeCaseDef, TypeLambda, TypeTree,
    TypeTreeKind,
};
use scry_classpath::TastyData;
use scry_core::{Name, Span, TermName};

use crate::classfiles::erased_signature;
use crate::errors::{DecoderError, LoaderError};
use crate::events::{EventArg, EventNode, EventTag};
use crate::loader::LoadRoot;

/// Spans per tree address, unpickled from the position section.
pub type PositionTable = HashMap<u32, Span>;

/// The byte-level TASTy decoder collaborator: bytes in, a position table
/// and a structured event forest out.
pub trait TastyDecoder {
    fn unpickle_positions(&self, tasty: &TastyData) -> Result<PositionTable, DecoderError>;
    fn unpickle_trees(&self, tasty: &TastyData) -> Result<Vec<EventNode>, DecoderError>;
}

/// Stages the two sections of a TASTy payload: positions, then trees.
pub struct TastyUnpickler<'a> {
    decoder: &'a dyn TastyDecoder,
    tasty: &'a TastyData,
}

impl<'a> TastyUnpickler<'a> {
    pub fn new(decoder: &'a dyn TastyDecoder, tasty: &'a TastyData) -> Self {
        Self { decoder, tasty }
    }

    pub fn unpickle_position_section(&self) -> Result<PositionTable, DecoderError> {
        self.decoder.unpickle_positions(self.tasty)
    }

    /// Lowers the tree section into typed trees, creating and linking
    /// symbols along the way. Requires the [`LoadRoot`] capability: only a
    /// class scan may populate root symbols.
    pub fn unpickle_tree_section(
        &self,
        spans: &PositionTable,
        cx: &BaseContext,
        token: &LoadRoot,
    ) -> Result<Vec<Arc<Tree>>, LoaderError> {
        let events = self.decoder.unpickle_trees(self.tasty)?;
        let mut builder = TreeBuilder::new(cx, spans, token);
        events
            .iter()
            .map(|event| builder.build_tree(event))
            .collect()
    }
}

struct TreeBuilder<'a> {
    cx: &'a BaseContext,
    spans: &'a PositionTable,
    owners: Vec<SymbolId>,
    binders: HashMap<u32, Arc<TypeLambda>>,
    _token: &'a LoadRoot,
}

fn malformed(node: &EventNode, expected: &'static str) -> LoaderError {
    LoaderError::Decoder(DecoderError::MalformedEvent {
        tag: node.tag,
        expected,
    })
}

impl<'a> TreeBuilder<'a> {
    fn new(cx: &'a BaseContext, spans: &'a PositionTable, token: &'a LoadRoot) -> Self {
        Self {
            cx,
            spans,
            owners: Vec::new(),
            binders: HashMap::new(),
            _token: token,
        }
    }

    fn span(&self, node: &EventNode) -> Span {
        self.spans.get(&node.addr).copied().unwrap_or(Span::NONE)
    }

    fn current_owner(&self) -> SymbolId {
        self.owners
            .last()
            .copied()
            .unwrap_or_else(|| self.cx.defn().root_package.as_symbol())
    }

    fn build_trees(&mut self, nodes: &[EventNode]) -> Result<Vec<Arc<Tree>>, LoaderError> {
        nodes.iter().map(|node| self.build_tree(node)).collect()
    }

    fn build_opt_tree(
        &mut self,
        nodes: &[EventNode],
        parent: &EventNode,
    ) -> Result<Option<Arc<Tree>>, LoaderError> {
        match nodes {
            [] => Ok(None),
            [node] => Ok(Some(self.build_tree(node)?)),
            _ => Err(malformed(parent, "at most one optional subtree")),
        }
    }

    fn enter_package(&mut self, full_name: &TermName) -> Result<PackageId, LoaderError> {
        if full_name.is_empty() {
            return Ok(self.cx.defn().empty_package);
        }
        let mut pkg = self.cx.defn().root_package;
        for segment in full_name.segments() {
            pkg = self.cx.create_package_symbol_if_new(segment, pkg)?;
        }
        Ok(pkg)
    }

    fn build_tree(&mut self, node: &EventNode) -> Result<Arc<Tree>, LoaderError> {
        let span = self.span(node);
        match (node.tag, node.args.as_slice()) {
            (EventTag::PackageDef, [EventArg::TermName(full_name), EventArg::List(stats)]) => {
                let pid = self.enter_package(full_name)?;
                self.owners.push(pid.as_symbol());
                let stats = self.build_trees(stats);
                self.owners.pop();
                Ok(Tree::new(
                    TreeKind::PackageDef {
                        pid,
                        stats: stats?,
                    },
                    span,
                ))
            }
            (EventTag::Import, [EventArg::Node(expr), EventArg::List(selectors)]) => {
                Ok(Tree::new(
                    TreeKind::Import {
                        expr: self.build_tree(expr)?,
                        selectors: self.build_trees(selectors)?,
                    },
                    span,
                ))
            }
            (EventTag::Export, [EventArg::Node(expr), EventArg::List(selectors)]) => {
                Ok(Tree::new(
                    TreeKind::Export {
                        expr: self.build_tree(expr)?,
                        selectors: self.build_trees(selectors)?,
                    },
                    span,
                ))
            }
            (
                EventTag::ImportSelector,
                [EventArg::Node(imported), EventArg::List(renamed), EventArg::List(bound)],
            ) => {
                let imported = self.build_tree(imported)?;
                let renamed = self.build_opt_tree(renamed, node)?;
                let bound = match bound.as_slice() {
                    [] => None,
                    [tpt] => Some(self.build_type_tree(tpt)?),
                    _ => return Err(malformed(node, "at most one selector bound")),
                };
                Ok(Tree::new(
                    TreeKind::ImportSelector {
                        imported,
                        renamed,
                        bound,
                    },
                    span,
                ))
            }
            (EventTag::ClassDef, [EventArg::TypeName(name), EventArg::Node(template)]) => {
                let owner = self.current_owner();
                let key = Name::Type(name.clone());
                let symbol = match self
                    .cx
                    .lookup_declaration(owner, &key)
                    .and_then(|id| self.cx.as_class(id))
                {
                    Some(existing) => existing,
                    None => self.cx.create_class_symbol(name.clone(), owner)?,
                };
                self.owners.push(symbol.as_symbol());
                let template = self.build_tree(template);
                self.owners.pop();
                let tree = Tree::new(
                    TreeKind::ClassDef {
                        name: name.clone(),
                        template: template?,
                        symbol,
                    },
                    span,
                );
                self.cx.set_tree(symbol.as_symbol(), Arc::downgrade(&tree))?;
                self.cx.set_initialised(symbol.as_symbol())?;
                tracing::trace!(class = %name, "decoded class definition");
                Ok(tree)
            }
            (
                EventTag::Template,
                [EventArg::Node(constr), EventArg::List(parents), EventArg::List(self_def), EventArg::List(body)],
            ) => {
                let constr = self.build_tree(constr)?;
                let parents = parents
                    .iter()
                    .map(|parent| {
                        if parent.tag.is_type_tree() {
                            Ok(Parent::TypeTree(self.build_type_tree(parent)?))
                        } else {
                            Ok(Parent::Term(self.build_tree(parent)?))
                        }
                    })
                    .collect::<Result<Vec<_>, LoaderError>>()?;
                let self_def = self.build_opt_tree(self_def, node)?;
                let body = self.build_trees(body)?;
                Ok(Tree::new(
                    TreeKind::Template {
                        constr,
                        parents,
                        self_def,
                        body,
                    },
                    span,
                ))
            }
            (
                EventTag::ValDef,
                [EventArg::TermName(name), EventArg::Node(tpt), EventArg::List(rhs)],
            ) => self.build_val_def(node, name, tpt, rhs, span),
            (
                EventTag::DefDef,
                [EventArg::TermName(name), EventArg::List(groups), EventArg::Node(result_tpt), EventArg::List(rhs)],
            ) => self.build_def_def(node, name, groups, result_tpt, rhs, span),
            (EventTag::Select, [EventArg::Node(qualifier), EventArg::TermName(name)]) => {
                Ok(Tree::new(
                    TreeKind::Select {
                        qualifier: self.build_tree(qualifier)?,
                        name: name.clone(),
                    },
                    span,
                ))
            }
            (
                EventTag::SelectIn,
                [EventArg::Node(qualifier), EventArg::TermName(name), EventArg::Node(owner)],
            ) => Ok(Tree::new(
                TreeKind::SelectIn {
                    qualifier: self.build_tree(qualifier)?,
                    name: name.clone(),
                    owner: self.build_type(owner)?,
                },
                span,
            )),
            (EventTag::Super, [EventArg::Node(qualifier)]) => Ok(Tree::new(
                TreeKind::Super {
                    qualifier: self.build_tree(qualifier)?,
                    mix: None,
                },
                span,
            )),
            (EventTag::Super, [EventArg::Node(qualifier), EventArg::TypeName(mix)]) => {
                Ok(Tree::new(
                    TreeKind::Super {
                        qualifier: self.build_tree(qualifier)?,
                        mix: Some(mix.clone()),
                    },
                    span,
                ))
            }
            (EventTag::Apply, [EventArg::Node(fun), EventArg::List(args)]) => Ok(Tree::new(
                TreeKind::Apply {
                    fun: self.build_tree(fun)?,
                    args: self.build_trees(args)?,
                },
                span,
            )),
            (EventTag::TypeApply, [EventArg::Node(fun), EventArg::List(args)]) => {
                Ok(Tree::new(
                    TreeKind::TypeApply {
                        fun: self.build_tree(fun)?,
                        args: self.build_type_trees(args)?,
                    },
                    span,
                ))
            }
            (EventTag::Typed, [EventArg::Node(expr), EventArg::Node(tpt)]) => Ok(Tree::new(
                TreeKind::Typed {
                    expr: self.build_tree(expr)?,
                    tpt: self.build_type_tree(tpt)?,
                },
                span,
            )),
            (EventTag::Assign, [EventArg::Node(lhs), EventArg::Node(rhs)]) => Ok(Tree::new(
                TreeKind::Assign {
                    lhs: self.build_tree(lhs)?,
                    rhs: self.build_tree(rhs)?,
                },
                span,
            )),
            (EventTag::NamedArg, [EventArg::TermName(name), EventArg::Node(arg)]) => {
                Ok(Tree::new(
                    TreeKind::NamedArg {
                        name: name.clone(),
                        arg: self.build_tree(arg)?,
                    },
                    span,
                ))
            }
            (EventTag::Block, [EventArg::List(stats), EventArg::Node(expr)]) => Ok(Tree::new(
                TreeKind::Block {
                    stats: self.build_trees(stats)?,
                    expr: self.build_tree(expr)?,
                },
                span,
            )),
            (
                EventTag::If | EventTag::InlineIf,
                [EventArg::Node(cond), EventArg::Node(then_part), EventArg::Node(else_part)],
            ) => {
                let cond = self.build_tree(cond)?;
                let then_part = self.build_tree(then_part)?;
                let else_part = self.build_tree(else_part)?;
                let kind = if node.tag == EventTag::If {
                    TreeKind::If {
                        cond,
                        then_part,
                        else_part,
                    }
                } else {
                    TreeKind::InlineIf {
                        cond,
                        then_part,
                        else_part,
                    }
                };
                Ok(Tree::new(kind, span))
            }
            (EventTag::Lambda, [EventArg::Node(meth), EventArg::List(tpt)]) => {
                let meth = self.build_tree(meth)?;
                let tpt = match tpt.as_slice() {
                    [] => None,
                    [tpt] => Some(self.build_type_tree(tpt)?),
                    _ => return Err(malformed(node, "at most one lambda type")),
                };
                Ok(Tree::new(TreeKind::Lambda { meth, tpt }, span))
            }
            (EventTag::Match, [EventArg::Node(selector), EventArg::List(cases)]) => {
                Ok(Tree::new(
                    TreeKind::Match {
                        selector: self.build_tree(selector)?,
                        cases: self.build_trees(cases)?,
                    },
                    span,
                ))
            }
            (EventTag::InlineMatch, [EventArg::List(selector), EventArg::List(cases)]) => {
                Ok(Tree::new(
                    TreeKind::InlineMatch {
                        selector: self.build_opt_tree(selector, node)?,
                        cases: self.build_trees(cases)?,
                    },
                    span,
                ))
            }
            (
                EventTag::CaseDef,
                [EventArg::Node(pattern), EventArg::List(guard), EventArg::Node(body)],
            ) => Ok(Tree::new(
                TreeKind::CaseDef {
                    pattern: self.build_tree(pattern)?,
                    guard: self.build_opt_tree(guard, node)?,
                    body: self.build_tree(body)?,
                },
                span,
            )),
            (EventTag::Bind, [EventArg::TermName(name), EventArg::Node(body)]) => {
                let owner = self.current_owner();
                let symbol = self.cx.create_symbol(Name::Term(name.clone()), owner)?;
                let tree = Tree::new(
                    TreeKind::Bind {
                        name: name.clone(),
                        body: self.build_tree(body)?,
                        symbol,
                    },
                    span,
                );
                self.cx.set_tree(symbol, Arc::downgrade(&tree))?;
                self.cx.set_initialised(symbol)?;
                Ok(tree)
            }
            (EventTag::Alternative, [EventArg::List(trees)]) => Ok(Tree::new(
                TreeKind::Alternative {
                    trees: self.build_trees(trees)?,
                },
                span,
            )),
            (
                EventTag::Unapply,
                [EventArg::Node(fun), EventArg::List(implicits), EventArg::List(patterns)],
            ) => Ok(Tree::new(
                TreeKind::Unapply {
                    fun: self.build_tree(fun)?,
                    implicits: self.build_trees(implicits)?,
                    patterns: self.build_trees(patterns)?,
                },
                span,
            )),
            (EventTag::SeqLiteral, [EventArg::List(elems), EventArg::Node(elem_tpt)]) => {
                Ok(Tree::new(
                    TreeKind::SeqLiteral {
                        elems: self.build_trees(elems)?,
                        elem_tpt: self.build_type_tree(elem_tpt)?,
                    },
                    span,
                ))
            }
            (EventTag::While, [EventArg::Node(cond), EventArg::Node(body)]) => Ok(Tree::new(
                TreeKind::While {
                    cond: self.build_tree(cond)?,
                    body: self.build_tree(body)?,
                },
                span,
            )),
            (EventTag::Throw, [EventArg::Node(expr)]) => Ok(Tree::new(
                TreeKind::Throw {
                    expr: self.build_tree(expr)?,
                },
                span,
            )),
            (
                EventTag::Try,
                [EventArg::Node(expr), EventArg::List(cases), EventArg::List(finalizer)],
            ) => Ok(Tree::new(
                TreeKind::Try {
                    expr: self.build_tree(expr)?,
                    cases: self.build_trees(cases)?,
                    finalizer: self.build_opt_tree(finalizer, node)?,
                },
                span,
            )),
            (EventTag::Return, [EventArg::List(expr), EventArg::Node(from)]) => Ok(Tree::new(
                TreeKind::Return {
                    expr: self.build_opt_tree(expr, node)?,
                    from: self.build_tree(from)?,
                },
                span,
            )),
            (
                EventTag::Inlined,
                [EventArg::Node(expr), EventArg::List(caller), EventArg::List(bindings)],
            ) => {
                let expr = self.build_tree(expr)?;
                let caller = match caller.as_slice() {
                    [] => None,
                    [tpt] => Some(self.build_type_tree(tpt)?),
                    _ => return Err(malformed(node, "at most one inline caller")),
                };
                Ok(Tree::new(
                    TreeKind::Inlined {
                        expr,
                        caller,
                        bindings: self.build_trees(bindings)?,
                    },
                    span,
                ))
            }
            (EventTag::Literal, [EventArg::Constant(constant)]) => Ok(Tree::new(
                TreeKind::Literal {
                    constant: constant.clone(),
                },
                span,
            )),
            (EventTag::New, [EventArg::Node(tpt)]) => Ok(Tree::new(
                TreeKind::New {
                    tpt: self.build_type_tree(tpt)?,
                },
                span,
            )),
            (EventTag::TypeMember, [EventArg::TypeName(name), EventArg::Node(rhs)]) => {
                let owner = self.current_owner();
                let symbol = self.cx.create_symbol(Name::Type(name.clone()), owner)?;
                let rhs = self.build_bounds_def(rhs)?;
                let tree = Tree::new(
                    TreeKind::TypeMember {
                        name: name.clone(),
                        rhs,
                        symbol,
                    },
                    span,
                );
                self.cx.set_tree(symbol, Arc::downgrade(&tree))?;
                self.cx.set_initialised(symbol)?;
                Ok(tree)
            }
            (EventTag::TypeParam, [EventArg::TypeName(name), EventArg::Node(bounds)]) => {
                let owner = self.current_owner();
                let symbol = self.cx.create_symbol(Name::Type(name.clone()), owner)?;
                let bounds = self.build_bounds_def(bounds)?;
                let tree = Tree::new(
                    TreeKind::TypeParam {
                        name: name.clone(),
                        bounds,
                        symbol,
                    },
                    span,
                );
                self.cx.set_tree(symbol, Arc::downgrade(&tree))?;
                self.cx.set_initialised(symbol)?;
                Ok(tree)
            }
            (EventTag::This, [EventArg::Node(qualifier)]) => Ok(Tree::new(
                TreeKind::This {
                    qualifier: self.build_type_tree(qualifier)?,
                },
                span,
            )),
            (EventTag::Ident, [EventArg::TermName(name)]) => Ok(Tree::new(
                TreeKind::Ident {
                    name: name.clone(),
                    tpe: Type::NoType,
                },
                span,
            )),
            (EventTag::Ident, [EventArg::TermName(name), EventArg::Node(tpe)]) => {
                Ok(Tree::new(
                    TreeKind::Ident {
                        name: name.clone(),
                        tpe: self.build_type(tpe)?,
                    },
                    span,
                ))
            }
            (EventTag::FreeIdent, [EventArg::TermName(name), EventArg::Node(tpe)]) => {
                Ok(Tree::new(
                    TreeKind::FreeIdent {
                        name: name.clone(),
                        tpe: self.build_type(tpe)?,
                    },
                    span,
                ))
            }
            (EventTag::ReferencedPackage, [EventArg::TermName(full_name)]) => Ok(Tree::new(
                TreeKind::ReferencedPackage {
                    full_name: full_name.clone(),
                },
                span,
            )),
            (EventTag::EmptyTree, []) => Ok(Tree::new(TreeKind::EmptyTree, span)),
            _ => Err(malformed(node, "a tree payload of the tag's shape")),
        }
    }

    fn build_val_def(
        &mut self,
        node: &EventNode,
        name: &TermName,
        tpt_node: &EventNode,
        rhs_list: &[EventNode],
        span: Span,
    ) -> Result<Arc<Tree>, LoaderError> {
        let owner = self.current_owner();
        let key = Name::Term(name.clone());
        // Top-level module values were pre-entered when the root was
        // registered; reuse the placeholder instead of re-creating it.
        let placeholder = self
            .cx
            .as_package(owner)
            .and_then(|_| self.cx.lookup_declaration(owner, &key))
            .filter(|id| self.cx.as_class(*id).is_none() && self.cx.as_package(*id).is_none());
        let symbol = match placeholder {
            Some(existing) => existing,
            None => self.cx.create_symbol(key, owner)?,
        };

        self.owners.push(symbol);
        let built = (|| {
            let tpt = self.build_type_tree(tpt_node)?;
            let rhs = self.build_opt_tree(rhs_list, node)?;
            Ok::<_, LoaderError>((tpt, rhs))
        })();
        self.owners.pop();
        let (tpt, rhs) = built?;

        let tree = Tree::new(
            TreeKind::ValDef {
                name: name.clone(),
                tpt: Arc::clone(&tpt),
                rhs,
                symbol,
            },
            span,
        );
        let declared = tpt.to_type(self.cx)?.clone();
        self.cx.set_declared_type(symbol, declared)?;
        self.cx.set_tree(symbol, Arc::downgrade(&tree))?;
        self.cx.set_initialised(symbol)?;
        Ok(tree)
    }

    fn build_def_def(
        &mut self,
        node: &EventNode,
        name: &TermName,
        groups: &[EventNode],
        result_node: &EventNode,
        rhs_list: &[EventNode],
        span: Span,
    ) -> Result<Arc<Tree>, LoaderError> {
        let owner = self.current_owner();
        // The disambiguated (signed) name needs the parameter types, so the
        // symbol is reserved first and named after its clauses are decoded.
        let symbol = self.cx.reserve_symbol(owner);

        self.owners.push(symbol);
        let built = (|| {
            let param_lists = groups
                .iter()
                .map(|group| self.build_param_list(group))
                .collect::<Result<Vec<_>, LoaderError>>()?;
            let result_tpt = self.build_type_tree(result_node)?;
            let rhs = self.build_opt_tree(rhs_list, node)?;
            Ok::<_, LoaderError>((param_lists, result_tpt, rhs))
        })();
        self.owners.pop();
        let (param_lists, result_tpt, rhs) = built?;

        let declared = self.method_declared_type(node, &param_lists, &result_tpt)?;
        let signed = TermName::signed(name.clone(), erased_signature(&declared), name.last());
        self.cx.complete_symbol(symbol, Name::Term(signed))?;

        let tree = Tree::new(
            TreeKind::DefDef {
                name: name.clone(),
                param_lists,
                result_tpt,
                rhs,
                symbol,
            },
            span,
        );
        self.cx.set_declared_type(symbol, declared)?;
        self.cx.set_tree(symbol, Arc::downgrade(&tree))?;
        self.cx.set_initialised(symbol)?;
        Ok(tree)
    }

    fn build_param_list(&mut self, group: &EventNode) -> Result<ParamList, LoaderError> {
        match (group.tag, group.args.as_slice()) {
            (EventTag::TermParams, [EventArg::List(params)]) => {
                Ok(ParamList::Terms(self.build_trees(params)?))
            }
            (EventTag::TypeParams, [EventArg::List(params)]) => {
                Ok(ParamList::Types(self.build_trees(params)?))
            }
            _ => Err(malformed(group, "a term or type parameter clause")),
        }
    }

    /// Folds the built parameter clauses into the declared `MethodType` /
    /// `PolyType` of a method, right to left.
    fn method_declared_type(
        &self,
        node: &EventNode,
        param_lists: &[ParamList],
        result_tpt: &Arc<TypeTree>,
    ) -> Result<Type, LoaderError> {
        let mut acc = result_tpt.to_type(self.cx)?.clone();
        for list in param_lists.iter().rev() {
            match list {
                ParamList::Terms(params) => {
                    let mut names = Vec::with_capacity(params.len());
                    let mut types = Vec::with_capacity(params.len());
                    for param in params {
                        let TreeKind::ValDef { name, tpt, .. } = &param.kind else {
                            return Err(malformed(node, "value parameters to be ValDef trees"));
                        };
                        names.push(name.clone());
                        types.push(tpt.to_type(self.cx)?.clone());
                    }
                    acc = Type::method(names, types, acc);
                }
                ParamList::Types(params) => {
                    let mut names = Vec::with_capacity(params.len());
                    let mut bounds = Vec::with_capacity(params.len());
                    for param in params {
                        let TreeKind::TypeParam {
                            name,
                            bounds: param_bounds,
                            ..
                        } = &param.kind
                        else {
                            return Err(malformed(node, "type parameters to be TypeParam trees"));
                        };
                        names.push(name.clone());
                        bounds.push(param_bounds.bounds(self.cx)?);
                    }
                    acc = Type::poly(names, bounds, acc);
                }
            }
        }
        Ok(acc)
    }

    fn build_type_trees(
        &mut self,
        nodes: &[EventNode],
    ) -> Result<Vec<Arc<TypeTree>>, LoaderError> {
        nodes.iter().map(|node| self.build_type_tree(node)).collect()
    }

    fn build_type_tree(&mut self, node: &EventNode) -> Result<Arc<TypeTree>, LoaderError> {
        let span = self.span(node);
        match (node.tag, node.args.as_slice()) {
            (EventTag::IdentTpt, [EventArg::TypeName(name), EventArg::Node(prefix)]) => {
                Ok(TypeTree::new(
                    TypeTreeKind::TypeIdent {
                        name: name.clone(),
                        prefix: self.build_type(prefix)?,
                    },
                    span,
                ))
            }
            (EventTag::SelectTpt, [EventArg::Node(qualifier), EventArg::TypeName(name)]) => {
                Ok(TypeTree::new(
                    TypeTreeKind::TypeSelect {
                        qualifier: self.build_tree(qualifier)?,
                        name: name.clone(),
                    },
                    span,
                ))
            }
            (EventTag::WrapperTpt, [EventArg::Node(tpe)]) => Ok(TypeTree::new(
                TypeTreeKind::TypeWrapper {
                    tpe: self.build_type(tpe)?,
                },
                span,
            )),
            (EventTag::SingletonTpt, [EventArg::Node(ref_tree)]) => Ok(TypeTree::new(
                TypeTreeKind::Singleton {
                    ref_tree: self.build_tree(ref_tree)?,
                },
                span,
            )),
            (EventTag::AppliedTpt, [EventArg::Node(tycon), EventArg::List(args)]) => {
                Ok(TypeTree::new(
                    TypeTreeKind::Applied {
                        tycon: self.build_type_tree(tycon)?,
                        args: self.build_type_trees(args)?,
                    },
                    span,
                ))
            }
            (
                EventTag::RefinedTpt,
                [EventArg::Node(underlying), EventArg::List(refinements)],
            ) => {
                let underlying = self.build_type_tree(underlying)?;
                let refinements = refinements
                    .iter()
                    .map(|refinement| self.build_refinement(refinement))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeTree::new(
                    TypeTreeKind::Refined {
                        underlying,
                        refinements,
                    },
                    span,
                ))
            }
            (EventTag::ByNameTpt, [EventArg::Node(result)]) => Ok(TypeTree::new(
                TypeTreeKind::ByName {
                    result: self.build_type_tree(result)?,
                },
                span,
            )),
            (EventTag::LambdaTpt, [EventArg::List(params), EventArg::Node(body)]) => {
                Ok(TypeTree::new(
                    TypeTreeKind::TypeLambdaTree {
                        params: self.build_trees(params)?,
                        body: self.build_type_tree(body)?,
                    },
                    span,
                ))
            }
            (EventTag::BoundsTpt, [EventArg::Node(low), EventArg::Node(high)]) => {
                Ok(TypeTree::new(
                    TypeTreeKind::Bounds {
                        low: self.build_type_tree(low)?,
                        high: self.build_type_tree(high)?,
                    },
                    span,
                ))
            }
            (
                EventTag::MatchTpt,
                [EventArg::List(bound), EventArg::Node(scrutinee), EventArg::List(cases)],
            ) => {
                let bound = match bound.as_slice() {
                    [] => None,
                    [tpt] => Some(self.build_type_tree(tpt)?),
                    _ => return Err(malformed(node, "at most one match-type bound")),
                };
                let scrutinee = self.build_type_tree(scrutinee)?;
                let cases = cases
                    .iter()
                    .map(|case| match (case.tag, case.args.as_slice()) {
                        (
                            EventTag::TypeCase,
                            [EventArg::Node(pattern), EventArg::Node(result)],
                        ) => Ok(TypeCaseDef {
                            pattern: self.build_type_tree(pattern)?,
                            result: self.build_type_tree(result)?,
                        }),
                        _ => Err(malformed(case, "a type-case pattern and result")),
                    })
                    .collect::<Result<Vec<_>, LoaderError>>()?;
                Ok(TypeTree::new(
                    TypeTreeKind::MatchTypeTree {
                        bound,
                        scrutinee,
                        cases,
                    },
                    span,
                ))
            }
            (EventTag::EmptyTpt, []) => {
                Ok(TypeTree::new(TypeTreeKind::EmptyTypeTree, span))
            }
            _ => Err(malformed(node, "a type-tree payload of the tag's shape")),
        }
    }

    fn build_refinement(&mut self, node: &EventNode) -> Result<Refinement, LoaderError> {
        match (node.tag, node.args.as_slice()) {
            (EventTag::RefineDef, [EventArg::TermName(name), EventArg::Node(info)]) => {
                Ok(Refinement {
                    name: Name::Term(name.clone()),
                    info: self.build_type_tree(info)?,
                })
            }
            (EventTag::RefineDef, [EventArg::TypeName(name), EventArg::Node(info)]) => {
                Ok(Refinement {
                    name: Name::Type(name.clone()),
                    info: self.build_type_tree(info)?,
                })
            }
            _ => Err(malformed(node, "a refinement member and its info")),
        }
    }

    /// Bounds positions accept a bounds tree, a structural bounds type, or
    /// any plain type (wrapped, for alias right-hand sides).
    fn build_bounds_def(&mut self, node: &EventNode) -> Result<TypeBoundsDef, LoaderError> {
        if node.tag.is_type_tree() {
            return Ok(TypeBoundsDef::Tree(self.build_type_tree(node)?));
        }
        if node.tag == EventTag::BoundsTy {
            return Ok(TypeBoundsDef::Bounds(self.build_type_bounds(node)?));
        }
        if node.tag.is_type() {
            let span = self.span(node);
            let tpe = self.build_type(node)?;
            return Ok(TypeBoundsDef::Tree(TypeTree::new(
                TypeTreeKind::TypeWrapper { tpe },
                span,
            )));
        }
        Err(malformed(node, "bounds as a tree or structural type"))
    }

    fn build_type_bounds(&mut self, node: &EventNode) -> Result<TypeBounds, LoaderError> {
        match (node.tag, node.args.as_slice()) {
            (EventTag::BoundsTy, [EventArg::Node(low), EventArg::Node(high)]) => Ok(
                TypeBounds::new(self.build_type(low)?, self.build_type(high)?),
            ),
            _ => Err(malformed(node, "a lower and upper bound")),
        }
    }

    fn build_types(&mut self, nodes: &[EventNode]) -> Result<Vec<Type>, LoaderError> {
        nodes.iter().map(|node| self.build_type(node)).collect()
    }

    fn build_type(&mut self, node: &EventNode) -> Result<Type, LoaderError> {
        match (node.tag, node.args.as_slice()) {
            (EventTag::TermRefTy, [EventArg::Node(prefix), EventArg::TermName(name)]) => {
                Ok(Type::term_ref(self.build_type(prefix)?, name.clone()))
            }
            (EventTag::TypeRefTy, [EventArg::Node(prefix), EventArg::TypeName(name)]) => {
                Ok(Type::type_ref(self.build_type(prefix)?, name.clone()))
            }
            (EventTag::PackageRefTy, [EventArg::TermName(full_name)]) => {
                Ok(Type::package(full_name.clone()))
            }
            (EventTag::PackageTypeRefTy, [EventArg::TermName(full_name)]) => {
                Ok(Type::PackageTypeRef(PackageRef::new(full_name.clone())))
            }
            (EventTag::ThisTy, [EventArg::Node(tref)]) => match self.build_type(tref)? {
                Type::TypeRef(tref) => Ok(Type::this(tref)),
                _ => Err(malformed(node, "a type reference under This")),
            },
            (EventTag::AppliedTy, [EventArg::Node(tycon), EventArg::List(args)]) => Ok(
                Type::applied(self.build_type(tycon)?, self.build_types(args)?),
            ),
            (EventTag::AndTy, [EventArg::Node(left), EventArg::Node(right)]) => {
                Ok(Type::and(self.build_type(left)?, self.build_type(right)?))
            }
            (EventTag::OrTy, [EventArg::Node(left), EventArg::Node(right)]) => {
                Ok(Type::or(self.build_type(left)?, self.build_type(right)?))
            }
            (
                EventTag::RefinedTy,
                [EventArg::Node(parent), EventArg::TermName(name), EventArg::Node(info)],
            ) => Ok(Type::refined(
                self.build_type(parent)?,
                Name::Term(name.clone()),
                self.build_type(info)?,
            )),
            (
                EventTag::RefinedTy,
                [EventArg::Node(parent), EventArg::TypeName(name), EventArg::Node(info)],
            ) => Ok(Type::refined(
                self.build_type(parent)?,
                Name::Type(name.clone()),
                self.build_type(info)?,
            )),
            (EventTag::AliasTy, [EventArg::Node(target)]) => {
                Ok(Type::alias(self.build_type(target)?))
            }
            (EventTag::BoundsTy, _) => Ok(Type::bounds(self.build_type_bounds(node)?)),
            (EventTag::ByNameTy, [EventArg::Node(result)]) => {
                Ok(Type::by_name(self.build_type(result)?))
            }
            (EventTag::MethodTy, [EventArg::List(params), EventArg::Node(result)]) => {
                let mut names = Vec::with_capacity(params.len());
                let mut types = Vec::with_capacity(params.len());
                for param in params {
                    match (param.tag, param.args.as_slice()) {
                        (
                            EventTag::MethodParam,
                            [EventArg::TermName(name), EventArg::Node(tpe)],
                        ) => {
                            names.push(name.clone());
                            types.push(self.build_type(tpe)?);
                        }
                        _ => return Err(malformed(param, "a method parameter name and type")),
                    }
                }
                Ok(Type::method(names, types, self.build_type(result)?))
            }
            (EventTag::PolyTy, [EventArg::List(params), EventArg::Node(result)]) => {
                let mut names = Vec::with_capacity(params.len());
                let mut bounds = Vec::with_capacity(params.len());
                for param in params {
                    match (param.tag, param.args.as_slice()) {
                        (
                            EventTag::PolyParam,
                            [EventArg::TypeName(name), EventArg::Node(param_bounds)],
                        ) => {
                            names.push(name.clone());
                            bounds.push(self.build_type_bounds(param_bounds)?);
                        }
                        _ => return Err(malformed(param, "a poly parameter name and bounds")),
                    }
                }
                Ok(Type::poly(names, bounds, self.build_type(result)?))
            }
            (EventTag::LambdaTy, [EventArg::List(params), EventArg::Node(result)]) => {
                let mut lambda_params = Vec::with_capacity(params.len());
                for param in params {
                    match (param.tag, param.args.as_slice()) {
                        (
                            EventTag::LambdaParamDef,
                            [EventArg::TypeName(name), EventArg::Node(param_bounds)],
                        ) => lambda_params.push(LambdaParam {
                            name: name.clone(),
                            bounds: self.build_type_bounds(param_bounds)?,
                        }),
                        _ => return Err(malformed(param, "a lambda parameter name and bounds")),
                    }
                }
                let addr = node.addr;
                let lambda = TypeLambda::create(lambda_params, |binder| {
                    self.binders.insert(addr, Arc::clone(binder));
                    self.build_type(result)
                })?;
                Ok(Type::Lambda(lambda))
            }
            (EventTag::ParamRefTy, [EventArg::Index(binder), EventArg::Index(index)]) => {
                let lambda = self
                    .binders
                    .get(binder)
                    .ok_or(DecoderError::UnknownBinder(*binder))?;
                Ok(lambda.param_ref(*index as usize))
            }
            (EventTag::ConstTy, [EventArg::Constant(constant)]) => {
                Ok(Type::Constant(constant.clone()))
            }
            (EventTag::AnyTy, []) => Ok(Type::Any),
            (EventTag::NothingTy, []) => Ok(Type::Nothing),
            (EventTag::UnitTy, []) => Ok(Type::Unit),
            (EventTag::NoTy, []) => Ok(Type::NoType),
            (EventTag::NoPrefixTy, []) => Ok(Type::NoPrefix),
            _ => Err(malformed(node, "a type payload of the tag's shape")),
        }
    }
}
