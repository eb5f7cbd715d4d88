//! The immutable type algebra.
//!
//! Type terms are value types: structural equality, cheap clones (recursive
//! positions are `Arc`-shared), no mutation after construction. The one
//! exception is [`TypeLambda`], whose result slot is filled exactly once
//! during construction so that parameter references inside the body can
//! point back at their binder; lambdas therefore compare by identity.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use scry_core::{Constant, Name, SimpleName, TermName, TypeName};

use crate::contexts::BaseContext;
use crate::errors::TypeError;
use crate::symbols::{ClassId, SymbolId};

/// A reference to a package, by fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    pub full_name: TermName,
}

impl PackageRef {
    pub fn new(full_name: TermName) -> Self {
        Self { full_name }
    }
}

/// A reference to a term member of `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermRef {
    pub prefix: Arc<Type>,
    pub name: TermName,
}

/// What a [`TypeRef`] points at: a name still to be resolved against the
/// prefix, or an already-known class symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesignator {
    Name(TypeName),
    Symbol(ClassId),
}

/// A reference to a type member of `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub prefix: Arc<Type>,
    pub designator: TypeDesignator,
}

impl TypeRef {
    pub fn name(&self) -> Option<&TypeName> {
        match &self.designator {
            TypeDesignator::Name(name) => Some(name),
            TypeDesignator::Symbol(_) => None,
        }
    }
}

/// The type of `this` inside the class denoted by `tref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThisType {
    pub tref: TypeRef,
}

/// A type constructor applied to arguments; wildcard arguments appear as
/// [`Type::Bounds`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppliedType {
    pub tycon: Arc<Type>,
    pub args: Vec<Type>,
}

/// One refinement step, `parent { member : info }`; nested refinements are
/// chained through `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefinedType {
    pub parent: Arc<Type>,
    pub member: Name,
    pub info: Arc<Type>,
}

/// Lower and upper bounds. `low <: high` is assumed, not checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeBounds {
    pub low: Type,
    pub high: Type,
}

impl TypeBounds {
    pub fn new(low: Type, high: Type) -> Self {
        Self { low, high }
    }

    /// `>: Nothing <: Any`.
    pub fn unbounded() -> Self {
        Self {
            low: Type::Nothing,
            high: Type::Any,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.low == Type::Nothing && self.high == Type::Any
    }
}

/// The type of a method: value parameters and a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
    pub param_names: Vec<TermName>,
    pub param_types: Vec<Type>,
    pub result_type: Type,
}

/// The type of a type-parameterized method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolyType {
    pub param_names: Vec<TypeName>,
    pub param_bounds: Vec<TypeBounds>,
    pub result_type: Type,
}

/// One parameter of a [`TypeLambda`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LambdaParam {
    pub name: TypeName,
    pub bounds: TypeBounds,
}

/// A type-level lambda.
///
/// Created through [`TypeLambda::create`], which lets the body refer back to
/// the binder via [`TypeLambda::param_ref`] before the result is installed.
pub struct TypeLambda {
    params: Vec<LambdaParam>,
    result: OnceCell<Type>,
}

static NO_TYPE: Type = Type::NoType;

impl TypeLambda {
    /// Builds a lambda whose body may reference the binder under
    /// construction. The result slot is filled exactly once, when the
    /// closure returns.
    pub fn create<E>(
        params: Vec<LambdaParam>,
        result: impl FnOnce(&Arc<TypeLambda>) -> Result<Type, E>,
    ) -> Result<Arc<TypeLambda>, E> {
        let lambda = Arc::new(TypeLambda {
            params,
            result: OnceCell::new(),
        });
        let tpe = result(&lambda)?;
        // The cell of a freshly created lambda is necessarily empty.
        let _ = lambda.result.set(tpe);
        Ok(lambda)
    }

    pub fn params(&self) -> &[LambdaParam] {
        &self.params
    }

    /// The body of the lambda; `NoType` while still under construction.
    pub fn result_type(&self) -> &Type {
        self.result.get().unwrap_or(&NO_TYPE)
    }

    /// A reference to the `index`-th parameter of this binder.
    pub fn param_ref(self: &Arc<Self>, index: usize) -> Type {
        Type::TypeParamRef(TypeParamRef {
            binder: Arc::clone(self),
            index,
        })
    }
}

// Lambdas are compared by identity: a parameter reference inside the body
// points back at its binder, so structural comparison would not terminate.
impl PartialEq for TypeLambda {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for TypeLambda {}

impl Hash for TypeLambda {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self as *const TypeLambda).hash(state);
    }
}

impl std::fmt::Debug for TypeLambda {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeLambda")
            .field("params", &self.params)
            .field("result", &self.result.get())
            .finish()
    }
}

/// A reference to a parameter of an enclosing [`TypeLambda`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParamRef {
    pub binder: Arc<TypeLambda>,
    pub index: usize,
}

impl TypeParamRef {
    pub fn param_name(&self) -> Option<&TypeName> {
        self.binder.params.get(self.index).map(|p| &p.name)
    }
}

/// A match type: `scrutinee match { cases } <: bound`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchType {
    pub bound: Type,
    pub scrutinee: Type,
    pub cases: Vec<MatchTypeCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchTypeCase {
    pub pattern: Type,
    pub result: Type,
}

/// A value of the type algebra.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The absence of a type (definitions, empty trees).
    NoType,
    /// The absence of a prefix on a reference.
    NoPrefix,
    Any,
    Nothing,
    Unit,
    Constant(Constant),
    Package(PackageRef),
    /// The type-namespace view of a package, as seen by qualifiers.
    PackageTypeRef(PackageRef),
    TermRef(TermRef),
    TypeRef(TypeRef),
    This(ThisType),
    Applied(AppliedType),
    And(Arc<Type>, Arc<Type>),
    Or(Arc<Type>, Arc<Type>),
    Refined(RefinedType),
    Alias(Arc<Type>),
    Bounds(Arc<TypeBounds>),
    /// A by-name (`=> T`) parameter type.
    ByName(Arc<Type>),
    Method(Arc<MethodType>),
    Poly(Arc<PolyType>),
    Lambda(Arc<TypeLambda>),
    TypeParamRef(TypeParamRef),
    Match(Arc<MatchType>),
}

impl Type {
    pub fn package(full_name: TermName) -> Type {
        Type::Package(PackageRef::new(full_name))
    }

    pub fn term_ref(prefix: Type, name: TermName) -> Type {
        Type::TermRef(TermRef {
            prefix: Arc::new(prefix),
            name,
        })
    }

    pub fn type_ref(prefix: Type, name: TypeName) -> Type {
        Type::TypeRef(TypeRef {
            prefix: Arc::new(prefix),
            designator: TypeDesignator::Name(name),
        })
    }

    pub fn type_ref_symbol(prefix: Type, class: ClassId) -> Type {
        Type::TypeRef(TypeRef {
            prefix: Arc::new(prefix),
            designator: TypeDesignator::Symbol(class),
        })
    }

    pub fn this(tref: TypeRef) -> Type {
        Type::This(ThisType { tref })
    }

    pub fn applied(tycon: Type, args: Vec<Type>) -> Type {
        Type::Applied(AppliedType {
            tycon: Arc::new(tycon),
            args,
        })
    }

    pub fn and(left: Type, right: Type) -> Type {
        Type::And(Arc::new(left), Arc::new(right))
    }

    pub fn or(left: Type, right: Type) -> Type {
        Type::Or(Arc::new(left), Arc::new(right))
    }

    pub fn refined(parent: Type, member: Name, info: Type) -> Type {
        Type::Refined(RefinedType {
            parent: Arc::new(parent),
            member,
            info: Arc::new(info),
        })
    }

    pub fn alias(target: Type) -> Type {
        Type::Alias(Arc::new(target))
    }

    pub fn bounds(bounds: TypeBounds) -> Type {
        Type::Bounds(Arc::new(bounds))
    }

    pub fn by_name(result: Type) -> Type {
        Type::ByName(Arc::new(result))
    }

    pub fn method(param_names: Vec<TermName>, param_types: Vec<Type>, result_type: Type) -> Type {
        Type::Method(Arc::new(MethodType {
            param_names,
            param_types,
            result_type,
        }))
    }

    pub fn poly(
        param_names: Vec<TypeName>,
        param_bounds: Vec<TypeBounds>,
        result_type: Type,
    ) -> Type {
        Type::Poly(Arc::new(PolyType {
            param_names,
            param_bounds,
            result_type,
        }))
    }

    /// Whether this type is a path: something a member can be selected from.
    pub fn is_path(&self) -> bool {
        matches!(
            self,
            Type::NoPrefix
                | Type::Package(_)
                | Type::PackageTypeRef(_)
                | Type::TermRef(_)
                | Type::TypeRef(_)
                | Type::This(_)
        )
    }

    /// Selects `name` from this path, producing a `TermRef` or `TypeRef`
    /// with `self` as the prefix.
    pub fn select(&self, name: &Name) -> Result<Type, TypeError> {
        if !self.is_path() {
            return Err(TypeError::BadSelection { name: name.clone() });
        }
        Ok(match name {
            Name::Term(term) => Type::term_ref(self.clone(), term.clone()),
            Name::Type(tpe) => Type::type_ref(self.clone(), tpe.clone()),
        })
    }

    /// Like [`Type::select`], but the reference is anchored at `owner`, the
    /// declaring class recorded for overload resolution.
    pub fn select_in(&self, name: &TermName, owner: &Type) -> Result<Type, TypeError> {
        if !owner.is_path() {
            return Err(TypeError::BadSelection {
                name: Name::Term(name.clone()),
            });
        }
        Ok(Type::term_ref(owner.clone(), name.clone()))
    }

    /// Widens a term reference to the declared type of the member it
    /// denotes, resolving overload sets: a signed reference picks its exact
    /// overload, an unsigned one must match a unique method. References to
    /// non-method members (and every other type) widen to themselves.
    pub fn widen_overloads(&self, cx: &BaseContext) -> Result<Type, TypeError> {
        let Type::TermRef(tref) = self else {
            return Ok(self.clone());
        };
        let owner = scope_symbol_of(&tref.prefix, cx)?;
        if tref.name.signature().is_some() {
            let key = Name::Term(tref.name.clone());
            let symbol = cx.lookup_declaration(owner, &key).ok_or_else(|| {
                TypeError::UnresolvedReference { name: key.clone() }
            })?;
            return cx
                .declared_type_of(symbol)
                .ok_or(TypeError::UnresolvedReference { name: key });
        }
        let candidates = cx.declarations_matching(owner, &tref.name);
        if candidates.is_empty() {
            return Err(TypeError::UnresolvedReference {
                name: Name::Term(tref.name.clone()),
            });
        }
        let mut methods = candidates
            .iter()
            .filter_map(|id| match cx.declared_type_of(*id) {
                Some(tpe @ (Type::Method(_) | Type::Poly(_))) => Some(tpe),
                _ => None,
            })
            .collect::<Vec<_>>();
        match methods.len() {
            0 => Ok(self.clone()),
            1 => Ok(methods.remove(0)),
            _ => Err(TypeError::AmbiguousOverload {
                name: Name::Term(tref.name.clone()),
            }),
        }
    }

    /// The fully qualified erased rendering of a reference type, used when
    /// building overload signatures. `None` for types without a stable
    /// erased name.
    pub fn erased_name(&self) -> Option<SimpleName> {
        match self {
            Type::Any => Some(SimpleName::new("scala.Any")),
            Type::Nothing => Some(SimpleName::new("scala.Nothing")),
            Type::Unit => Some(SimpleName::new("scala.Unit")),
            Type::Applied(applied) => applied.tycon.erased_name(),
            Type::Alias(target) | Type::ByName(target) => target.erased_name(),
            Type::Bounds(bounds) => bounds.high.erased_name(),
            _ => self.path_string().map(SimpleName::new),
        }
    }

    fn path_string(&self) -> Option<String> {
        fn join(prefix: &Type, last: &str) -> Option<String> {
            match prefix.path_string() {
                Some(p) if !p.is_empty() => Some(format!("{p}.{last}")),
                Some(_) => Some(last.to_string()),
                None => None,
            }
        }
        match self {
            Type::NoPrefix => Some(String::new()),
            Type::Package(p) | Type::PackageTypeRef(p) => Some(p.full_name.to_string()),
            Type::TermRef(tref) => join(&tref.prefix, &tref.name.last().to_string()),
            Type::TypeRef(tref) => match &tref.designator {
                TypeDesignator::Name(name) => join(&tref.prefix, &name.last().to_string()),
                TypeDesignator::Symbol(_) => None,
            },
            Type::This(this) => Type::TypeRef(this.tref.clone()).path_string(),
            _ => None,
        }
    }
}

/// Resolves a path type to the symbol whose declarations hold the members
/// of a value or type of that type.
fn scope_symbol_of(tpe: &Type, cx: &BaseContext) -> Result<SymbolId, TypeError> {
    match tpe {
        Type::Package(p) | Type::PackageTypeRef(p) => cx
            .find_package(&p.full_name)
            .map(|pkg| pkg.as_symbol())
            .ok_or_else(|| TypeError::UnresolvedReference {
                name: Name::Term(p.full_name.clone()),
            }),
        Type::TypeRef(tref) => match &tref.designator {
            TypeDesignator::Symbol(class) => Ok(class.as_symbol()),
            TypeDesignator::Name(name) => {
                let owner = scope_symbol_of(&tref.prefix, cx)?;
                cx.lookup_declaration(owner, &Name::Type(name.clone()))
                    .ok_or_else(|| TypeError::UnresolvedReference {
                        name: Name::Type(name.clone()),
                    })
            }
        },
        Type::This(this) => scope_symbol_of(&Type::TypeRef(this.tref.clone()), cx),
        Type::TermRef(tref) => {
            let owner = scope_symbol_of(&tref.prefix, cx)?;
            let key = Name::Term(tref.name.clone());
            let symbol = cx
                .lookup_declaration(owner, &key)
                .ok_or_else(|| TypeError::UnresolvedReference { name: key.clone() })?;
            let declared = cx
                .declared_type_of(symbol)
                .ok_or(TypeError::UnresolvedReference { name: key })?;
            scope_symbol_of(&declared, cx)
        }
        other => Err(TypeError::BadSelection {
            name: Name::Term(TermName::simple(format!("{other:?}"))),
        }),
    }
}
