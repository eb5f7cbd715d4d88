//! The demand-driven class loader.
//!
//! Discovery is two-phase. `init_packages` happens once per loader and
//! creates a package symbol for every inventory package. `scan_package`
//! runs at most once per package: it enumerates the package's entries,
//! pre-enters the three root symbols per retained top-level class, and
//! records which bytes back each root. `scan_class` consumes a root's entry
//! and dispatches on its backing bytes; every mutation of root symbols
//! happens under the [`LoadRoot`] capability minted here.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use scry_ast::{BaseContext, ClassId, PackageId, Tree};
use scry_classfile::ClassKind;
use scry_classpath::{ClassData, Classpath, PackageData, TastyData};
use scry_core::{Name, SimpleName, TermName};

use crate::classfiles;
use crate::errors::LoaderError;
use crate::tasty::{TastyDecoder, TastyUnpickler};

/// The simple-name suffix of top-level-definition wrapper classes, exempt
/// from nested-class filtering.
const TOP_LEVEL_SUFFIX: &str = "$package";

/// Capability required to populate a root's symbols. Constructible only
/// inside `Loader::scan_class`.
pub struct LoadRoot {
    _private: (),
}

/// The bytes backing one root class.
#[derive(Debug, Clone)]
pub enum Entry {
    ClassAndTasty { class: ClassData, tasty: TastyData },
    TastyOnly { tasty: TastyData },
    ClassOnly { class: ClassData },
}

pub struct Loader {
    classpath: Classpath,
    searched: bool,
    packages: HashMap<PackageId, Arc<PackageData>>,
    lookup: HashMap<ClassId, Entry>,
    top_level_tastys: HashMap<ClassId, Vec<Arc<Tree>>>,
    package_names: HashMap<String, TermName>,
    decoder: Arc<dyn TastyDecoder>,
}

impl Loader {
    pub fn new(classpath: Classpath, decoder: Arc<dyn TastyDecoder>) -> Loader {
        Loader {
            classpath,
            searched: false,
            packages: HashMap::new(),
            lookup: HashMap::new(),
            top_level_tastys: HashMap::new(),
            package_names: HashMap::new(),
            decoder,
        }
    }

    /// Builds the package inventory. A no-op after its first completion.
    pub fn init_packages(&mut self, cx: &BaseContext) -> Result<(), LoaderError> {
        if self.searched {
            return Ok(());
        }
        for data in self.classpath.packages().to_vec() {
            let pkg = self.enter_package_chain(&data.dotted_name, cx)?;
            tracing::debug!(package = %data.dotted_name, "registered package");
            self.packages.insert(pkg, data);
        }
        self.searched = true;
        Ok(())
    }

    fn enter_package_chain(
        &mut self,
        dotted: &str,
        cx: &BaseContext,
    ) -> Result<PackageId, LoaderError> {
        let name = self
            .package_names
            .entry(dotted.to_string())
            .or_insert_with(|| scry_core::to_package_name(dotted))
            .clone();
        if name.is_empty() {
            return Ok(cx.defn().empty_package);
        }
        let mut pkg = cx.defn().root_package;
        for segment in name.segments() {
            pkg = cx.create_package_symbol_if_new(segment, pkg)?;
        }
        Ok(pkg)
    }

    /// Enumerates a package's entries, entering a root per retained
    /// top-level class. Runs at most once per package; later calls are
    /// no-ops.
    pub fn scan_package(&mut self, pkg: PackageId, cx: &BaseContext) -> Result<(), LoaderError> {
        let Some(data) = self.packages.remove(&pkg) else {
            return Ok(());
        };
        tracing::debug!(package = %data.dotted_name, "scanning package");

        let mut roots: BTreeMap<&str, (Option<&ClassData>, Option<&TastyData>)> = BTreeMap::new();
        for class in &data.classes {
            roots.entry(&class.simple_name).or_default().0 = Some(class);
        }
        for tasty in &data.tastys {
            roots.entry(&tasty.simple_name).or_default().1 = Some(tasty);
        }

        for (simple_name, (class, tasty)) in roots {
            if is_module_class_name(simple_name) || is_nested_class_name(simple_name) {
                tracing::trace!(name = %simple_name, "skipping non-root entry");
                continue;
            }
            let entry = match (class, tasty) {
                (None, Some(tasty)) => Entry::TastyOnly {
                    tasty: tasty.clone(),
                },
                (Some(class), Some(tasty)) => Entry::ClassAndTasty {
                    class: class.clone(),
                    tasty: tasty.clone(),
                },
                (Some(class), None) => Entry::ClassOnly {
                    class: class.clone(),
                },
                (None, None) => continue,
            };
            let symbols = cx.enter_root_symbols(SimpleName::new(simple_name), pkg)?;
            self.lookup.insert(symbols.class, entry);
        }

        cx.set_initialised(pkg.as_symbol())?;
        Ok(())
    }

    /// Inspects the bytes backing `cls` and initializes the root when they
    /// carry definitions for it. Returns whether `cls` became initialized.
    /// Consumes the root's entry; duplicate calls short-circuit to `false`.
    pub fn scan_class(&mut self, cls: ClassId, cx: &BaseContext) -> Result<bool, LoaderError> {
        let Some(entry) = self.lookup.remove(&cls) else {
            return Ok(false);
        };
        let token = LoadRoot { _private: () };
        match entry {
            Entry::TastyOnly { tasty } => self.unpickle_root(cls, &tasty, cx, &token),
            Entry::ClassOnly { class } => self.scan_class_bytes(cls, &class, None, cx, &token),
            Entry::ClassAndTasty { class, tasty } => {
                self.scan_class_bytes(cls, &class, Some(&tasty), cx, &token)
            }
        }
    }

    fn scan_class_bytes(
        &mut self,
        cls: ClassId,
        class: &ClassData,
        tasty: Option<&TastyData>,
        cx: &BaseContext,
        token: &LoadRoot,
    ) -> Result<bool, LoaderError> {
        match scry_classfile::read_kind(&class.bytes)? {
            ClassKind::Scala2 {
                structure,
                runtime_annot_start,
            } => {
                classfiles::load_scala2_class(cx, cls, &structure, runtime_annot_start, token)?;
                Ok(cx.is_initialised(cls.as_symbol()))
            }
            ClassKind::Java {
                structure,
                signature,
            } => {
                classfiles::load_java_class(cx, cls, &structure, signature.as_deref(), token)?;
                Ok(cx.is_initialised(cls.as_symbol()))
            }
            ClassKind::Tasty => match tasty {
                Some(tasty) => self.unpickle_root(cls, tasty, cx, token),
                None => Err(LoaderError::MissingTopLevelTasty(
                    class.debug_path.clone(),
                )),
            },
            ClassKind::Other => {
                tracing::debug!(path = %class.debug_path, "ignoring non-root classfile");
                Ok(false)
            }
        }
    }

    fn unpickle_root(
        &mut self,
        cls: ClassId,
        tasty: &TastyData,
        cx: &BaseContext,
        token: &LoadRoot,
    ) -> Result<bool, LoaderError> {
        tracing::debug!(path = %tasty.debug_path, "unpickling tasty");
        let unpickler = TastyUnpickler::new(self.decoder.as_ref(), tasty);
        let spans = unpickler.unpickle_position_section()?;
        let trees = unpickler.unpickle_tree_section(&spans, cx, token)?;
        if cx.is_initialised(cls.as_symbol()) {
            self.top_level_tastys.insert(cls, trees);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// The decoded top-level trees of `cls`, available when `cls` is a
    /// package-owned initialized root and not the object-class shadow of a
    /// real class.
    pub fn top_level_tasty(&self, cls: ClassId, cx: &BaseContext) -> Option<&Vec<Arc<Tree>>> {
        let owner = cx.owner_of(cls.as_symbol())?;
        cx.as_package(owner)?;
        if !cx.is_initialised(cls.as_symbol()) {
            return None;
        }
        if let Name::Type(name) = cx.name_of(cls.as_symbol()) {
            if let Some(base) = name.companion_base() {
                if cx.lookup_declaration(owner, &Name::Type(base)).is_some() {
                    return None;
                }
            }
        }
        self.top_level_tastys.get(&cls)
    }

    /// Whether `cls` still has an unconsumed entry.
    pub fn has_entry(&self, cls: ClassId) -> bool {
        self.lookup.contains_key(&cls)
    }
}

/// A module (object) class: `foo$`, but not a lone `$`.
fn is_module_class_name(name: &str) -> bool {
    name.len() > 1 && name.ends_with('$')
}

/// A nested class: a `$` strictly before the final character, after
/// exempting the top-level-definition wrapper suffix.
fn is_nested_class_name(name: &str) -> bool {
    let base = name.strip_suffix(TOP_LEVEL_SUFFIX).unwrap_or(name);
    match base.find('$') {
        Some(index) => index + 1 < base.len(),
        None => false,
    }
}
