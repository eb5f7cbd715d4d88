use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::{ClassData, Classpath, ClasspathEntry, ClasspathError, PackageData, TastyData};

#[derive(Default)]
struct PackageAccumulator {
    classes: BTreeMap<String, ClassData>,
    tastys: BTreeMap<String, TastyData>,
}

type Inventory = BTreeMap<String, PackageAccumulator>;

pub(crate) fn build(entries: &[ClasspathEntry]) -> Result<Classpath, ClasspathError> {
    let mut inventory = Inventory::new();
    for entry in entries {
        match entry {
            ClasspathEntry::ClassDir(dir) => read_class_dir(dir, &mut inventory)?,
            ClasspathEntry::Jar(path) => read_jar(path, &mut inventory)?,
        }
    }
    let packages = inventory
        .into_iter()
        .map(|(dotted_name, acc)| {
            Arc::new(PackageData {
                dotted_name,
                classes: acc.classes.into_values().collect(),
                tastys: acc.tastys.into_values().collect(),
            })
        })
        .collect();
    Ok(Classpath { packages })
}

fn read_class_dir(dir: &Path, inventory: &mut Inventory) -> Result<(), ClasspathError> {
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let Some(inner) = relative.to_str() else {
            tracing::debug!(path = %entry.path().display(), "skipping non-UTF-8 path");
            continue;
        };
        let inner = inner.replace('\\', "/");
        let bytes = std::fs::read(entry.path())?;
        record_file(&inner, entry.path().display().to_string(), bytes, inventory);
    }
    Ok(())
}

fn read_jar(path: &Path, inventory: &mut Inventory) -> Result<(), ClasspathError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let inner = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        let debug_path = format!("{}!{inner}", path.display());
        record_file(&inner, debug_path, bytes, inventory);
    }
    Ok(())
}

fn record_file(inner: &str, debug_path: String, bytes: Vec<u8>, inventory: &mut Inventory) {
    let Some((package, simple_name)) = split_inner_path(inner) else {
        return;
    };
    let accumulator = inventory.entry(package.clone()).or_default();
    let bytes: Arc<[u8]> = Arc::from(bytes);
    if inner.ends_with(".class") {
        if accumulator.classes.contains_key(&simple_name) {
            tracing::debug!(%package, %simple_name, "duplicate class entry ignored");
            return;
        }
        tracing::trace!(%package, %simple_name, "recorded class entry");
        accumulator.classes.insert(
            simple_name.clone(),
            ClassData {
                simple_name,
                debug_path,
                bytes,
            },
        );
    } else if inner.ends_with(".tasty") {
        if accumulator.tastys.contains_key(&simple_name) {
            tracing::debug!(%package, %simple_name, "duplicate tasty entry ignored");
            return;
        }
        tracing::trace!(%package, %simple_name, "recorded tasty entry");
        accumulator.tastys.insert(
            simple_name.clone(),
            TastyData {
                simple_name,
                debug_path,
                bytes,
            },
        );
    }
}

/// Splits `p/q/Foo.class` into the dotted package `p.q` and the simple name
/// `Foo`. Returns `None` for files that are neither classes nor tastys.
fn split_inner_path(inner: &str) -> Option<(String, String)> {
    let stem = inner
        .strip_suffix(".class")
        .or_else(|| inner.strip_suffix(".tasty"))?;
    match stem.rsplit_once('/') {
        Some((dirs, simple)) => Some((dirs.replace('/', "."), simple.to_string())),
        None => Some((String::new(), stem.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn splits_package_paths() {
        assert_eq!(
            split_inner_path("a/b/Foo.class"),
            Some(("a.b".to_string(), "Foo".to_string()))
        );
        assert_eq!(
            split_inner_path("Top.tasty"),
            Some((String::new(), "Top".to_string()))
        );
        assert_eq!(split_inner_path("META-INF/MANIFEST.MF"), None);
    }

    #[test]
    fn reads_class_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pkg_dir = tmp.path().join("com/example");
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("Foo.class"), b"class-bytes").unwrap();
        std::fs::write(pkg_dir.join("Foo.tasty"), b"tasty-bytes").unwrap();
        std::fs::write(tmp.path().join("Top.class"), b"top-bytes").unwrap();

        let classpath =
            Classpath::from_entries(&[ClasspathEntry::ClassDir(tmp.path().to_path_buf())])
                .unwrap();
        let packages = classpath.packages();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].dotted_name, "");
        assert_eq!(packages[0].classes[0].simple_name, "Top");
        assert_eq!(packages[1].dotted_name, "com.example");
        assert_eq!(packages[1].classes[0].simple_name, "Foo");
        assert_eq!(packages[1].tastys[0].simple_name, "Foo");
    }

    #[test]
    fn reads_jar_archives_and_prefers_the_first_entry() {
        let tmp = tempfile::TempDir::new().unwrap();
        let jar_path = tmp.path().join("app.jar");
        let file = std::fs::File::create(&jar_path).unwrap();
        let mut jar = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        jar.start_file("p/A.class", options).unwrap();
        jar.write_all(b"from-jar").unwrap();
        jar.finish().unwrap();

        let dir = tmp.path().join("classes/p");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("A.class"), b"from-dir").unwrap();

        let classpath = Classpath::from_entries(&[
            ClasspathEntry::Jar(jar_path),
            ClasspathEntry::ClassDir(tmp.path().join("classes")),
        ])
        .unwrap();
        let package = &classpath.packages()[0];
        assert_eq!(package.dotted_name, "p");
        assert_eq!(&*package.classes[0].bytes, b"from-jar");
    }
}
