//! The ambient context threaded through type and tree computations.
//!
//! `BaseContext` owns the symbol table behind a `RefCell`: construction is
//! single-threaded, and every accessor takes and releases its borrow within
//! the call, so borrows never escape to callers.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use scry_core::{Name, SimpleName, TermName, TypeName};

use crate::errors::SymbolError;
use crate::symbols::{ClassId, PackageId, RootSymbols, SymbolId, SymbolTable};
use crate::trees::Tree;
use crate::types::Type;

/// Well-known symbols created with every context.
#[derive(Debug, Clone, Copy)]
pub struct Definitions {
    pub root_package: PackageId,
    pub empty_package: PackageId,
}

/// The base capability: symbol-table access and predefined definitions.
///
/// Loaders layer further capabilities (classpath access, root scanning) on
/// top of this; pure type computation never needs more than a `BaseContext`.
pub struct BaseContext {
    symbols: RefCell<SymbolTable>,
    defn: Definitions,
}

impl Default for BaseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseContext {
    pub fn new() -> BaseContext {
        let table = SymbolTable::new();
        let defn = Definitions {
            root_package: table.root_package(),
            empty_package: table.empty_package(),
        };
        BaseContext {
            symbols: RefCell::new(table),
            defn,
        }
    }

    pub fn defn(&self) -> Definitions {
        self.defn
    }

    /// Runs `f` with shared access to the symbol table.
    pub fn with_symbols<R>(&self, f: impl FnOnce(&SymbolTable) -> R) -> R {
        f(&self.symbols.borrow())
    }

    /// Runs `f` with exclusive access to the symbol table.
    pub fn with_symbols_mut<R>(&self, f: impl FnOnce(&mut SymbolTable) -> R) -> R {
        f(&mut self.symbols.borrow_mut())
    }

    pub fn name_of(&self, id: SymbolId) -> Name {
        self.with_symbols(|s| s.symbol(id).name().clone())
    }

    pub fn owner_of(&self, id: SymbolId) -> Option<SymbolId> {
        self.with_symbols(|s| s.symbol(id).owner())
    }

    pub fn is_initialised(&self, id: SymbolId) -> bool {
        self.with_symbols(|s| s.symbol(id).is_initialised())
    }

    pub fn declared_type_of(&self, id: SymbolId) -> Option<Type> {
        self.with_symbols(|s| s.symbol(id).declared_type().cloned())
    }

    pub fn tree_of(&self, id: SymbolId) -> Option<Arc<Tree>> {
        self.with_symbols(|s| s.tree(id))
    }

    pub fn as_package(&self, id: SymbolId) -> Option<PackageId> {
        self.with_symbols(|s| s.as_package(id))
    }

    pub fn as_class(&self, id: SymbolId) -> Option<ClassId> {
        self.with_symbols(|s| s.as_class(id))
    }

    pub fn full_package_name(&self, pkg: PackageId) -> TermName {
        self.with_symbols(|s| s.full_package_name(pkg).clone())
    }

    pub fn find_package(&self, name: &TermName) -> Option<PackageId> {
        self.with_symbols(|s| s.find_package(name))
    }

    pub fn lookup_declaration(&self, owner: SymbolId, name: &Name) -> Option<SymbolId> {
        self.with_symbols(|s| s.declaration(owner, name))
    }

    pub fn declarations_matching(&self, owner: SymbolId, base: &TermName) -> Vec<SymbolId> {
        self.with_symbols(|s| s.declarations_matching(owner, base))
    }

    /// Resolves a path of names by walking declarations from the root
    /// package. Purely a read; no loading happens.
    pub fn find_static_symbol(&self, path: &[Name]) -> Option<SymbolId> {
        self.with_symbols(|s| {
            let mut current = s.root_package().as_symbol();
            for name in path {
                current = s.declaration(current, name)?;
            }
            Some(current)
        })
    }

    pub fn create_symbol(&self, name: Name, owner: SymbolId) -> Result<SymbolId, SymbolError> {
        self.with_symbols_mut(|s| s.create_symbol(name, owner))
    }

    pub fn reserve_symbol(&self, owner: SymbolId) -> SymbolId {
        self.with_symbols_mut(|s| s.reserve_symbol(owner))
    }

    pub fn complete_symbol(&self, id: SymbolId, name: Name) -> Result<(), SymbolError> {
        self.with_symbols_mut(|s| s.complete_symbol(id, name))
    }

    pub fn create_class_symbol(
        &self,
        name: TypeName,
        owner: SymbolId,
    ) -> Result<ClassId, SymbolError> {
        self.with_symbols_mut(|s| s.create_class_symbol(name, owner))
    }

    pub fn create_package_symbol_if_new(
        &self,
        segment: SimpleName,
        parent: PackageId,
    ) -> Result<PackageId, SymbolError> {
        self.with_symbols_mut(|s| s.create_package_symbol_if_new(segment, parent))
    }

    pub fn enter_root_symbols(
        &self,
        name: SimpleName,
        pkg: PackageId,
    ) -> Result<RootSymbols, SymbolError> {
        self.with_symbols_mut(|s| s.enter_root_symbols(name, pkg))
    }

    pub fn set_tree(&self, id: SymbolId, tree: Weak<Tree>) -> Result<(), SymbolError> {
        self.with_symbols_mut(|s| s.set_tree(id, tree))
    }

    pub fn set_initialised(&self, id: SymbolId) -> Result<(), SymbolError> {
        self.with_symbols_mut(|s| s.set_initialised(id))
    }

    pub fn set_declared_type(&self, id: SymbolId, tpe: Type) -> Result<(), SymbolError> {
        self.with_symbols_mut(|s| s.set_declared_type(id, tpe))
    }
}
