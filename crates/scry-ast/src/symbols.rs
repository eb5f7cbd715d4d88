//! The symbol table: named declarations addressed by stable ids.
//!
//! Symbols live in an arena owned by [`SymbolTable`]; trees and types refer
//! to them through [`SymbolId`] (and the typed wrappers [`PackageId`] /
//! [`ClassId`]). A symbol's defining tree is reached through a one-shot weak
//! back-pointer, so the tree owns the symbol id and the table never keeps a
//! tree alive on its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use scry_core::{Name, QualifiedTag, SimpleName, TermName, TypeName};

use crate::errors::SymbolError;
use crate::trees::Tree;
use crate::types::Type;

/// Index of a symbol in its [`SymbolTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

macro_rules! typed_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(SymbolId);

        impl $name {
            #[inline]
            pub fn as_symbol(self) -> SymbolId {
                self.0
            }
        }

        impl From<$name> for SymbolId {
            fn from(value: $name) -> SymbolId {
                value.0
            }
        }
    };
}

typed_id!(
    /// Id of a package symbol.
    PackageId
);
typed_id!(
    /// Id of a class symbol.
    ClassId
);

/// One declaration in the program: a package, a class, or a regular term or
/// type member.
#[derive(Debug)]
pub struct Symbol {
    name: Name,
    owner: Option<SymbolId>,
    initialised: bool,
    tree: Option<Weak<Tree>>,
    kind: SymbolKind,
}

#[derive(Debug)]
enum SymbolKind {
    Package {
        full_name: TermName,
        declarations: HashMap<Name, SymbolId>,
    },
    Class {
        declarations: Vec<(Name, SymbolId)>,
        in_package: bool,
    },
    Regular {
        declared_type: Option<Type>,
    },
}

impl Symbol {
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn owner(&self) -> Option<SymbolId> {
        self.owner
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn is_package(&self) -> bool {
        matches!(self.kind, SymbolKind::Package { .. })
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, SymbolKind::Class { .. })
    }

    /// Whether this is a class symbol directly owned by a package.
    pub fn is_package_member_class(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Class {
                in_package: true,
                ..
            }
        )
    }

    pub fn declared_type(&self) -> Option<&Type> {
        match &self.kind {
            SymbolKind::Regular { declared_type } => declared_type.as_ref(),
            _ => None,
        }
    }

    fn scope(&self) -> Option<Vec<(&Name, SymbolId)>> {
        match &self.kind {
            SymbolKind::Package { declarations, .. } => {
                Some(declarations.iter().map(|(n, s)| (n, *s)).collect())
            }
            SymbolKind::Class { declarations, .. } => {
                Some(declarations.iter().map(|(n, s)| (n, *s)).collect())
            }
            SymbolKind::Regular { .. } => None,
        }
    }
}

/// The three symbols pre-entered for a top-level root `R`: the module value
/// `R`, the object class `R$`, and the class `R`.
#[derive(Debug, Clone, Copy)]
pub struct RootSymbols {
    pub module_value: SymbolId,
    pub module_class: ClassId,
    pub class: ClassId,
}

/// The arena of all symbols known to one context.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    root: PackageId,
    empty_package: PackageId,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        let root_symbol = Symbol {
            name: Name::Term(TermName::EMPTY),
            owner: None,
            initialised: true,
            tree: None,
            kind: SymbolKind::Package {
                full_name: TermName::EMPTY,
                declarations: HashMap::new(),
            },
        };
        let empty_symbol = Symbol {
            name: Name::Term(TermName::EMPTY),
            owner: Some(SymbolId(0)),
            initialised: false,
            tree: None,
            kind: SymbolKind::Package {
                full_name: TermName::EMPTY,
                declarations: HashMap::new(),
            },
        };
        let mut table = SymbolTable {
            symbols: vec![root_symbol, empty_symbol],
            root: PackageId(SymbolId(0)),
            empty_package: PackageId(SymbolId(1)),
        };
        table.register(SymbolId(0), Name::Term(TermName::EMPTY), SymbolId(1));
        table
    }

    /// The root of every owner chain.
    pub fn root_package(&self) -> PackageId {
        self.root
    }

    /// The package holding classes compiled outside any package clause.
    pub fn empty_package(&self) -> PackageId {
        self.empty_package
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn as_package(&self, id: SymbolId) -> Option<PackageId> {
        self.symbol(id).is_package().then_some(PackageId(id))
    }

    pub fn as_class(&self, id: SymbolId) -> Option<ClassId> {
        self.symbol(id).is_class().then_some(ClassId(id))
    }

    /// The dotted name of a package, rooted at the root package.
    pub fn full_package_name(&self, pkg: PackageId) -> &TermName {
        static EMPTY: TermName = TermName::EMPTY;
        match &self.symbol(pkg.as_symbol()).kind {
            SymbolKind::Package { full_name, .. } => full_name,
            // A PackageId is only minted for package symbols.
            _ => &EMPTY,
        }
    }

    fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    fn register(&mut self, owner: SymbolId, name: Name, child: SymbolId) {
        match &mut self.symbol_mut(owner).kind {
            SymbolKind::Package { declarations, .. } => {
                declarations.insert(name, child);
            }
            SymbolKind::Class { declarations, .. } => declarations.push((name, child)),
            SymbolKind::Regular { .. } => {}
        }
    }

    fn check_fresh(&self, owner: SymbolId, name: &Name) -> Result<(), SymbolError> {
        if self.declaration(owner, name).is_some() {
            return Err(SymbolError::DuplicateDeclaration {
                owner: self.symbol(owner).name().to_string(),
                name: name.clone(),
            });
        }
        Ok(())
    }

    /// Creates a regular (term or type member) symbol owned by `owner`.
    ///
    /// Fails if `owner` is a declaring symbol that already declares `name`.
    /// Owners without a declaration scope (e.g. methods owning their locals)
    /// accept any name.
    pub fn create_symbol(&mut self, name: Name, owner: SymbolId) -> Result<SymbolId, SymbolError> {
        self.check_fresh(owner, &name)?;
        let id = self.alloc(Symbol {
            name: name.clone(),
            owner: Some(owner),
            initialised: false,
            tree: None,
            kind: SymbolKind::Regular {
                declared_type: None,
            },
        });
        self.register(owner, name, id);
        Ok(id)
    }

    /// Creates a class symbol owned by `owner`.
    pub fn create_class_symbol(
        &mut self,
        name: TypeName,
        owner: SymbolId,
    ) -> Result<ClassId, SymbolError> {
        let key = Name::Type(name);
        self.check_fresh(owner, &key)?;
        let in_package = self.symbol(owner).is_package();
        let id = self.alloc(Symbol {
            name: key.clone(),
            owner: Some(owner),
            initialised: false,
            tree: None,
            kind: SymbolKind::Class {
                declarations: Vec::new(),
                in_package,
            },
        });
        self.register(owner, key, id);
        Ok(ClassId(id))
    }

    /// Creates the package `segment` under `parent`, or returns the existing
    /// package symbol of that name. Fails only when the name is taken by a
    /// non-package declaration.
    pub fn create_package_symbol_if_new(
        &mut self,
        segment: SimpleName,
        parent: PackageId,
    ) -> Result<PackageId, SymbolError> {
        let key = Name::Term(TermName::Simple(segment.clone()));
        if let Some(existing) = self.declaration(parent.as_symbol(), &key) {
            return match self.as_package(existing) {
                Some(pkg) => Ok(pkg),
                None => Err(SymbolError::DuplicateDeclaration {
                    owner: self.symbol(parent.as_symbol()).name().to_string(),
                    name: key,
                }),
            };
        }
        let parent_full = self.full_package_name(parent).clone();
        let full_name = if parent_full.is_empty() {
            TermName::Simple(segment)
        } else {
            TermName::qualified(QualifiedTag::Package, parent_full, segment)
        };
        let id = self.alloc(Symbol {
            name: key.clone(),
            owner: Some(parent.as_symbol()),
            initialised: false,
            tree: None,
            kind: SymbolKind::Package {
                full_name,
                declarations: HashMap::new(),
            },
        });
        self.register(parent.as_symbol(), key, id);
        Ok(PackageId(id))
    }

    /// Pre-enters the three symbols of a top-level root: the module value,
    /// the object class, and the class itself. The operation is atomic: if
    /// any of the three names is taken, nothing is entered.
    pub fn enter_root_symbols(
        &mut self,
        name: SimpleName,
        pkg: PackageId,
    ) -> Result<RootSymbols, SymbolError> {
        let owner = pkg.as_symbol();
        let class_name = TypeName::new(TermName::Simple(name.clone()));
        let object_class_name = class_name.object_class();
        let value_name = Name::Term(TermName::Simple(name));

        self.check_fresh(owner, &value_name)?;
        self.check_fresh(owner, &Name::Type(object_class_name.clone()))?;
        self.check_fresh(owner, &Name::Type(class_name.clone()))?;

        let module_value = self.create_symbol(value_name, owner)?;
        let module_class = self.create_class_symbol(object_class_name, owner)?;
        let class = self.create_class_symbol(class_name, owner)?;
        Ok(RootSymbols {
            module_value,
            module_class,
            class,
        })
    }

    /// Allocates a regular symbol whose name is chosen later, for
    /// definitions (methods) whose disambiguated name is only known once
    /// enough of the definition has been decoded. The symbol stays outside
    /// its owner's scope until [`SymbolTable::complete_symbol`] names it.
    pub fn reserve_symbol(&mut self, owner: SymbolId) -> SymbolId {
        self.alloc(Symbol {
            name: Name::Term(TermName::EMPTY),
            owner: Some(owner),
            initialised: false,
            tree: None,
            kind: SymbolKind::Regular {
                declared_type: None,
            },
        })
    }

    /// Names and registers a reserved symbol. One-shot.
    pub fn complete_symbol(&mut self, id: SymbolId, name: Name) -> Result<(), SymbolError> {
        let current = self.symbol(id);
        if !matches!(current.name(), Name::Term(t) if t.is_empty()) {
            return Err(SymbolError::AlreadyNamed {
                name: current.name().clone(),
            });
        }
        let Some(owner) = current.owner() else {
            return Err(SymbolError::AlreadyNamed { name: name.clone() });
        };
        self.check_fresh(owner, &name)?;
        self.symbol_mut(id).name = name.clone();
        self.register(owner, name, id);
        Ok(())
    }

    /// One-shot link from a symbol to its defining tree.
    pub fn set_tree(&mut self, id: SymbolId, tree: Weak<Tree>) -> Result<(), SymbolError> {
        let symbol = self.symbol_mut(id);
        if symbol.tree.is_some() {
            return Err(SymbolError::TreeAlreadySet {
                name: symbol.name.clone(),
            });
        }
        symbol.tree = Some(tree);
        Ok(())
    }

    pub fn tree(&self, id: SymbolId) -> Option<Arc<Tree>> {
        self.symbol(id).tree.as_ref().and_then(Weak::upgrade)
    }

    /// Flips the initialization latch; it transitions exactly once.
    pub fn set_initialised(&mut self, id: SymbolId) -> Result<(), SymbolError> {
        let symbol = self.symbol_mut(id);
        if symbol.initialised {
            return Err(SymbolError::AlreadyInitialised {
                name: symbol.name.clone(),
            });
        }
        symbol.initialised = true;
        Ok(())
    }

    /// One-shot record of a regular symbol's declared type.
    pub fn set_declared_type(&mut self, id: SymbolId, tpe: Type) -> Result<(), SymbolError> {
        let symbol = self.symbol_mut(id);
        match &mut symbol.kind {
            SymbolKind::Regular { declared_type } => {
                if declared_type.is_some() {
                    return Err(SymbolError::TypeAlreadySet {
                        name: symbol.name.clone(),
                    });
                }
                *declared_type = Some(tpe);
                Ok(())
            }
            _ => Err(SymbolError::NotATermSymbol {
                name: symbol.name.clone(),
            }),
        }
    }

    /// Looks up `name` among the declarations of `owner`.
    pub fn declaration(&self, owner: SymbolId, name: &Name) -> Option<SymbolId> {
        match &self.symbol(owner).kind {
            SymbolKind::Package { declarations, .. } => declarations.get(name).copied(),
            SymbolKind::Class { declarations, .. } => declarations
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, s)| *s),
            SymbolKind::Regular { .. } => None,
        }
    }

    /// All term declarations of `owner` whose unsigned base name is `base`.
    ///
    /// Overloaded members are entered under distinct signed names; this is
    /// the lookup that re-groups them into an overload set.
    pub fn declarations_matching(&self, owner: SymbolId, base: &TermName) -> Vec<SymbolId> {
        let Some(scope) = self.symbol(owner).scope() else {
            return Vec::new();
        };
        let base = base.unsigned();
        scope
            .into_iter()
            .filter_map(|(name, id)| match name {
                Name::Term(t) if t.unsigned() == base => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Snapshot of the declarations of `owner`, mainly for traversal/tests.
    pub fn declarations(&self, owner: SymbolId) -> Vec<(Name, SymbolId)> {
        self.symbol(owner)
            .scope()
            .map(|scope| {
                scope
                    .into_iter()
                    .map(|(n, s)| (n.clone(), s))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolves a dotted package name, walking segment by segment from the
    /// root. The empty name resolves to the empty package.
    pub fn find_package(&self, name: &TermName) -> Option<PackageId> {
        if name.is_empty() {
            return Some(self.empty_package);
        }
        let mut current = self.root;
        for segment in name.segments() {
            let key = Name::Term(TermName::Simple(segment));
            let child = self.declaration(current.as_symbol(), &key)?;
            current = self.as_package(child)?;
        }
        Some(current)
    }
}
