//! The package inventory backing a loader.
//!
//! A [`Classpath`] is an immutable, ordered sequence of [`PackageData`]
//! records, each tying a dotted package name to the `.class` and `.tasty`
//! payloads found for it. Inventories are built from class directories and
//! jar archives ([`Classpath::from_entries`]) or assembled directly from
//! in-memory data (tests, embedded payloads).

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

mod ingest;

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// One origin of class data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClasspathEntry {
    ClassDir(PathBuf),
    Jar(PathBuf),
}

/// The bytes of one `.class` file.
#[derive(Debug, Clone)]
pub struct ClassData {
    pub simple_name: String,
    /// Where the bytes came from, for diagnostics (`dir/Foo.class` or
    /// `app.jar!p/Foo.class`).
    pub debug_path: String,
    pub bytes: Arc<[u8]>,
}

/// The bytes of one `.tasty` file.
#[derive(Debug, Clone)]
pub struct TastyData {
    pub simple_name: String,
    pub debug_path: String,
    pub bytes: Arc<[u8]>,
}

/// Everything found for one package across all classpath entries.
#[derive(Debug, Clone)]
pub struct PackageData {
    /// Dotted package name; empty for the unnamed package.
    pub dotted_name: String,
    pub classes: Vec<ClassData>,
    pub tastys: Vec<TastyData>,
}

/// An immutable ordered package inventory.
#[derive(Debug, Clone)]
pub struct Classpath {
    packages: Vec<Arc<PackageData>>,
}

impl Classpath {
    pub fn new(packages: Vec<PackageData>) -> Classpath {
        Classpath {
            packages: packages.into_iter().map(Arc::new).collect(),
        }
    }

    /// Builds the inventory by reading every entry, in order. On duplicate
    /// `(package, file)` pairs the earliest entry wins.
    pub fn from_entries(entries: &[ClasspathEntry]) -> Result<Classpath, ClasspathError> {
        ingest::build(entries)
    }

    pub fn packages(&self) -> &[Arc<PackageData>] {
        &self.packages
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Narrows the inventory to the requested `(package, class)` pairs,
    /// keeping each requested top-level class together with its companion
    /// artifacts (`Foo$`, `Foo$Inner`, ...). Filtering is idempotent.
    pub fn with_filter(&self, fqns: &[(&str, &str)]) -> Classpath {
        let retain_name = |package: &str, simple: &str| {
            fqns.iter().any(|(p, c)| {
                *p == package
                    && (simple == *c
                        || simple
                            .strip_prefix(*c)
                            .is_some_and(|rest| rest.starts_with('$')))
            })
        };
        let packages = self
            .packages
            .iter()
            .filter(|data| fqns.iter().any(|(p, _)| *p == data.dotted_name))
            .map(|data| {
                let classes = data
                    .classes
                    .iter()
                    .filter(|c| retain_name(&data.dotted_name, &c.simple_name))
                    .cloned()
                    .collect();
                let tastys = data
                    .tastys
                    .iter()
                    .filter(|t| retain_name(&data.dotted_name, &t.simple_name))
                    .cloned()
                    .collect();
                Arc::new(PackageData {
                    dotted_name: data.dotted_name.clone(),
                    classes,
                    tastys,
                })
            })
            .filter(|data| !data.classes.is_empty() || !data.tastys.is_empty())
            .collect();
        Classpath { packages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(simple_name: &str) -> ClassData {
        ClassData {
            simple_name: simple_name.to_string(),
            debug_path: format!("test/{simple_name}.class"),
            bytes: Arc::from(&b"bytes"[..]),
        }
    }

    fn sample() -> Classpath {
        Classpath::new(vec![
            PackageData {
                dotted_name: "a".to_string(),
                classes: vec![class("Foo"), class("Foo$"), class("Bar")],
                tastys: Vec::new(),
            },
            PackageData {
                dotted_name: "b".to_string(),
                classes: vec![class("Baz")],
                tastys: Vec::new(),
            },
        ])
    }

    #[test]
    fn with_filter_keeps_requested_classes_and_companions() {
        let narrowed = sample().with_filter(&[("a", "Foo")]);
        assert_eq!(narrowed.packages().len(), 1);
        let names: Vec<&str> = narrowed.packages()[0]
            .classes
            .iter()
            .map(|c| c.simple_name.as_str())
            .collect();
        assert_eq!(names, ["Foo", "Foo$"]);
    }

    #[test]
    fn with_filter_is_idempotent() {
        let fqns = [("a", "Foo"), ("b", "Baz")];
        let once = sample().with_filter(&fqns);
        let twice = once.with_filter(&fqns);
        let names = |cp: &Classpath| {
            cp.packages()
                .iter()
                .flat_map(|p| p.classes.iter().map(|c| c.simple_name.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&once), names(&twice));
        assert_eq!(once.packages().len(), twice.packages().len());
    }

    #[test]
    fn with_filter_drops_unrequested_packages() {
        let narrowed = sample().with_filter(&[("b", "Baz")]);
        assert_eq!(narrowed.packages().len(), 1);
        assert_eq!(narrowed.packages()[0].dotted_name, "b");
    }
}
