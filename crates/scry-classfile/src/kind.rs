use crate::error::Result;
use crate::structure::ClassStructure;

/// What kind of compiled artifact backs a classfile, as decided by its
/// marker attributes.
#[derive(Debug, Clone)]
pub enum ClassKind {
    /// A Scala 2 classfile; the pickle payload sits in the runtime
    /// annotations starting at `runtime_annot_start` (0 when absent).
    Scala2 {
        structure: ClassStructure,
        runtime_annot_start: u32,
    },
    /// A plain Java classfile, with its class-level generic signature.
    Java {
        structure: ClassStructure,
        signature: Option<String>,
    },
    /// A Scala 3 classfile whose definitions live in a companion TASTy
    /// entry.
    Tasty,
    /// Not a class root (module descriptors, package objects' metadata,
    /// synthetic artifacts); silently ignored by the loader.
    Other,
}

/// Classifies a classfile from its bytes.
///
/// The decision mirrors what the compilers emit: Scala 3 marks classfiles
/// with a `TASTY` attribute, Scala 2 with `Scala`/`ScalaSig`, and anything
/// else with member definitions is treated as Java.
pub fn read_kind(bytes: &[u8]) -> Result<ClassKind> {
    let structure = ClassStructure::parse(bytes)?;

    if structure.is_module()
        || structure.simple_binary_name() == "module-info"
        || structure.simple_binary_name() == "package-info"
    {
        return Ok(ClassKind::Other);
    }

    if structure.has_attribute("TASTY") {
        return Ok(ClassKind::Tasty);
    }

    if structure.has_attribute("ScalaSig") || structure.has_attribute("Scala") {
        let runtime_annot_start = structure
            .attribute("RuntimeVisibleAnnotations")
            .map(|attr| attr.start)
            .unwrap_or(0);
        return Ok(ClassKind::Scala2 {
            structure,
            runtime_annot_start,
        });
    }

    let signature = structure.signature.clone();
    Ok(ClassKind::Java {
        structure,
        signature,
    })
}
