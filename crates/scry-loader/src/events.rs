//! The structured event stream handed over by the TASTy decoder.
//!
//! The byte-level decoder owns framing and the name table; what reaches the
//! loader is a forest of tagged nodes whose arguments are nested nodes, node
//! lists, names, and constants. Tags come in three families, mirroring the
//! three syntactic families of the model: term trees (bare names), type
//! trees (`…Tpt`), and types (`…Ty`). Each node's `addr` keys into the
//! position table unpickled from the position section.

use scry_core::{Constant, TermName, TypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    // Term and definition trees.
    PackageDef,
    Import,
    Export,
    ImportSelector,
    ClassDef,
    Template,
    ValDef,
    DefDef,
    Select,
    SelectIn,
    Super,
    Apply,
    TypeApply,
    Typed,
    Assign,
    NamedArg,
    Block,
    If,
    InlineIf,
    Lambda,
    Match,
    InlineMatch,
    CaseDef,
    Bind,
    Alternative,
    Unapply,
    SeqLiteral,
    While,
    Throw,
    Try,
    Return,
    Inlined,
    Literal,
    New,
    TypeMember,
    TypeParam,
    This,
    Ident,
    FreeIdent,
    ReferencedPackage,
    EmptyTree,
    // Grouping nodes inside `DefDef` parameter lists.
    TermParams,
    TypeParams,
    // Type trees.
    IdentTpt,
    SelectTpt,
    WrapperTpt,
    SingletonTpt,
    AppliedTpt,
    RefinedTpt,
    ByNameTpt,
    LambdaTpt,
    BoundsTpt,
    MatchTpt,
    EmptyTpt,
    // Auxiliary nodes of composite trees and types.
    RefineDef,
    TypeCase,
    MethodParam,
    PolyParam,
    LambdaParamDef,
    // Types.
    TermRefTy,
    TypeRefTy,
    PackageRefTy,
    PackageTypeRefTy,
    ThisTy,
    AppliedTy,
    AndTy,
    OrTy,
    RefinedTy,
    AliasTy,
    BoundsTy,
    ByNameTy,
    MethodTy,
    PolyTy,
    LambdaTy,
    ParamRefTy,
    ConstTy,
    AnyTy,
    NothingTy,
    UnitTy,
    NoTy,
    NoPrefixTy,
}

impl EventTag {
    /// Whether this tag opens a type tree.
    pub fn is_type_tree(self) -> bool {
        matches!(
            self,
            EventTag::IdentTpt
                | EventTag::SelectTpt
                | EventTag::WrapperTpt
                | EventTag::SingletonTpt
                | EventTag::AppliedTpt
                | EventTag::RefinedTpt
                | EventTag::ByNameTpt
                | EventTag::LambdaTpt
                | EventTag::BoundsTpt
                | EventTag::MatchTpt
                | EventTag::EmptyTpt
        )
    }

    /// Whether this tag opens a type proper.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            EventTag::TermRefTy
                | EventTag::TypeRefTy
                | EventTag::PackageRefTy
                | EventTag::PackageTypeRefTy
                | EventTag::ThisTy
                | EventTag::AppliedTy
                | EventTag::AndTy
                | EventTag::OrTy
                | EventTag::RefinedTy
                | EventTag::AliasTy
                | EventTag::BoundsTy
                | EventTag::ByNameTy
                | EventTag::MethodTy
                | EventTag::PolyTy
                | EventTag::LambdaTy
                | EventTag::ParamRefTy
                | EventTag::ConstTy
                | EventTag::AnyTy
                | EventTag::NothingTy
                | EventTag::UnitTy
                | EventTag::NoTy
                | EventTag::NoPrefixTy
        )
    }
}

/// One argument of an event node.
#[derive(Debug, Clone, PartialEq)]
pub enum EventArg {
    Node(EventNode),
    List(Vec<EventNode>),
    TermName(TermName),
    TypeName(TypeName),
    Constant(Constant),
    /// A raw index: binder addresses, parameter positions.
    Index(u32),
}

/// One node of the decoder's event forest.
#[derive(Debug, Clone, PartialEq)]
pub struct EventNode {
    pub tag: EventTag,
    /// Address in the tree section; keys into the position table.
    pub addr: u32,
    pub args: Vec<EventArg>,
}

impl EventNode {
    pub fn new(tag: EventTag, addr: u32, args: Vec<EventArg>) -> EventNode {
        EventNode { tag, addr, args }
    }
}
