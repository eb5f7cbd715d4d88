//! The full context handed to consumers: base capabilities plus the loader.

use std::cell::RefCell;
use std::ops::Deref;
use std::sync::Arc;

use scry_ast::{BaseContext, ClassId, PackageId, SymbolId, Tree};
use scry_classpath::Classpath;
use scry_core::{to_package_name, Name, TypeName};

use crate::errors::LoaderError;
use crate::loader::Loader;
use crate::tasty::TastyDecoder;

/// Owns the symbol table and the loader for one classpath.
///
/// Derefs to [`BaseContext`], so tree and type computations take a
/// `&Context` directly. Lookup methods scan packages and classes on demand;
/// a root whose scan failed stays uninitialized and resolves to `None` from
/// then on.
pub struct Context {
    base: BaseContext,
    loader: RefCell<Loader>,
}

impl Deref for Context {
    type Target = BaseContext;

    fn deref(&self) -> &BaseContext {
        &self.base
    }
}

impl Context {
    /// Creates a context over `classpath` and builds the package inventory.
    pub fn initialize(
        classpath: Classpath,
        decoder: Arc<dyn TastyDecoder>,
    ) -> Result<Context, LoaderError> {
        let base = BaseContext::new();
        let mut loader = Loader::new(classpath, decoder);
        loader.init_packages(&base)?;
        Ok(Context {
            base,
            loader: RefCell::new(loader),
        })
    }

    pub fn base(&self) -> &BaseContext {
        &self.base
    }

    pub fn scan_package(&self, pkg: PackageId) -> Result<(), LoaderError> {
        self.loader.borrow_mut().scan_package(pkg, &self.base)
    }

    pub fn scan_class(&self, cls: ClassId) -> Result<bool, LoaderError> {
        self.loader.borrow_mut().scan_class(cls, &self.base)
    }

    /// Whether `cls` still has an unconsumed backing-bytes entry.
    pub fn has_entry(&self, cls: ClassId) -> bool {
        self.loader.borrow().has_entry(cls)
    }

    /// The decoded top-level trees of `cls`, when `cls` is an initialized
    /// package-owned root.
    pub fn top_level_trees(&self, cls: ClassId) -> Option<Vec<Arc<Tree>>> {
        self.loader
            .borrow()
            .top_level_tasty(cls, &self.base)
            .cloned()
    }

    /// Resolves a path of names from the root package, scanning packages
    /// and the final class on demand.
    pub fn find_symbol(&self, path: &[Name]) -> Option<SymbolId> {
        let mut current = self.base.defn().root_package.as_symbol();
        for name in path {
            if let Some(pkg) = self.base.as_package(current) {
                if let Err(err) = self.scan_package(pkg) {
                    tracing::debug!(%err, "package scan failed");
                    return None;
                }
            }
            current = self.base.lookup_declaration(current, name)?;
        }
        if let Some(cls) = self.base.as_class(current) {
            if !self.base.is_initialised(current) {
                match self.scan_class(cls) {
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!(%err, "class scan failed");
                        return None;
                    }
                }
                if !self.base.is_initialised(current) {
                    return None;
                }
            }
        }
        Some(current)
    }

    /// Resolves `package.class` to an initialized top-level class symbol.
    pub fn find_top_level_class(&self, package: &str, class: &str) -> Option<ClassId> {
        // The empty package is addressed through its empty-named segment.
        let mut path: Vec<Name> = to_package_name(package)
            .segments()
            .into_iter()
            .map(|segment| Name::Term(scry_core::TermName::Simple(segment)))
            .collect();
        path.push(Name::Type(TypeName::simple(class)));
        let symbol = self.find_symbol(&path)?;
        self.base.as_class(symbol)
    }
}
