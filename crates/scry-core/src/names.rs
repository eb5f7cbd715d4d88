//! Structured names for symbols read out of compiled artifacts.
//!
//! Names are immutable and compare structurally. Short texts are stored
//! inline via [`smol_str::SmolStr`]; nested name terms are shared through
//! `Arc` so that prefixes of deeply qualified names are cheap to clone.
//!
//! The term and type namespaces are kept apart at the type level: a
//! [`TypeName`] is a wrapper marking its underlying [`TermName`] as living in
//! the type namespace, and [`Name`] is the union used wherever either
//! namespace may appear (e.g. scope keys and refinement members).

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

/// An unstructured identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimpleName(SmolStr);

impl SimpleName {
    pub const EMPTY: SimpleName = SimpleName(SmolStr::new_inline(""));
    pub const WILDCARD: SimpleName = SimpleName(SmolStr::new_inline("_"));

    #[inline]
    pub fn new(text: impl Into<SmolStr>) -> Self {
        Self(text.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SimpleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SimpleName").field(&self.0.as_str()).finish()
    }
}

impl fmt::Display for SimpleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SimpleName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Distinguishes the flavors of qualified-name composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualifiedTag {
    /// Member selection, `prefix.suffix`.
    Member,
    /// A package path segment, `prefix.suffix`.
    Package,
    /// A compiler-expanded private name, `prefix$$suffix`.
    Expanded,
}

/// Suffix markers attached by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixTag {
    /// The class backing a module value, rendered `base$`.
    ObjectClass,
    /// The retained body of an inline definition.
    BodyRetainer,
}

impl SuffixTag {
    fn render(self) -> &'static str {
        match self {
            SuffixTag::ObjectClass => "$",
            SuffixTag::BodyRetainer => "$retainedBody",
        }
    }
}

/// The erased shape of one parameter inside a [`Signature`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamSig {
    /// Erased type of a term parameter, as a fully qualified dotted name.
    Term(SimpleName),
    /// Length of a leading type-parameter section.
    TypeLen(u32),
}

/// An erased method signature, used to disambiguate overloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<ParamSig>,
    pub result: SimpleName,
}

impl Signature {
    pub fn new(params: Vec<ParamSig>, result: SimpleName) -> Self {
        Self { params, result }
    }
}

/// A term-namespace name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TermName {
    Simple(SimpleName),
    Qualified {
        tag: QualifiedTag,
        prefix: Arc<TermName>,
        suffix: SimpleName,
    },
    /// An overload-disambiguated reference to `base`.
    Signed {
        base: Arc<TermName>,
        sig: Signature,
        target: SimpleName,
    },
    /// A compiler-synthesized fresh name, rendered `underlying{prefix}{index}`.
    Unique {
        prefix: SmolStr,
        underlying: Arc<TermName>,
        index: u32,
    },
    Suffixed {
        tag: SuffixTag,
        base: Arc<TermName>,
    },
}

impl TermName {
    pub const EMPTY: TermName = TermName::Simple(SimpleName::EMPTY);
    pub const WILDCARD: TermName = TermName::Simple(SimpleName::WILDCARD);

    #[inline]
    pub fn simple(text: impl Into<SmolStr>) -> TermName {
        TermName::Simple(SimpleName::new(text))
    }

    pub fn qualified(tag: QualifiedTag, prefix: TermName, suffix: SimpleName) -> TermName {
        TermName::Qualified {
            tag,
            prefix: Arc::new(prefix),
            suffix,
        }
    }

    pub fn signed(base: TermName, sig: Signature, target: SimpleName) -> TermName {
        TermName::Signed {
            base: Arc::new(base),
            sig,
            target,
        }
    }

    pub fn unique(prefix: impl Into<SmolStr>, underlying: TermName, index: u32) -> TermName {
        TermName::Unique {
            prefix: prefix.into(),
            underlying: Arc::new(underlying),
            index,
        }
    }

    pub fn suffixed(tag: SuffixTag, base: TermName) -> TermName {
        TermName::Suffixed {
            tag,
            base: Arc::new(base),
        }
    }

    /// Member selection: `self.member`.
    pub fn select(&self, member: SimpleName) -> TermName {
        TermName::Qualified {
            tag: QualifiedTag::Member,
            prefix: Arc::new(self.clone()),
            suffix: member,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TermName::Simple(s) if s.is_empty())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TermName::Simple(s) if s == &SimpleName::WILDCARD)
    }

    /// The rightmost simple component.
    pub fn last(&self) -> SimpleName {
        match self {
            TermName::Simple(s) => s.clone(),
            TermName::Qualified { suffix, .. } => suffix.clone(),
            TermName::Signed { base, .. } => base.last(),
            TermName::Unique { underlying, .. } => underlying.last(),
            TermName::Suffixed { base, .. } => base.last(),
        }
    }

    /// The dotted-path components of this name, left to right.
    pub fn segments(&self) -> Vec<SimpleName> {
        match self {
            TermName::Simple(s) => vec![s.clone()],
            TermName::Qualified { prefix, suffix, .. } => {
                let mut out = prefix.segments();
                out.push(suffix.clone());
                out
            }
            TermName::Signed { base, .. } => base.segments(),
            TermName::Unique { underlying, .. } => underlying.segments(),
            TermName::Suffixed { base, .. } => base.segments(),
        }
    }

    /// Left-associative prefix expansion: for `a.b.c` the result is
    /// `[a, a.b, a.b.c]`. Simple names expand to themselves.
    pub fn subnames(&self) -> Vec<TermName> {
        match self {
            TermName::Qualified { prefix, .. } => {
                let mut out = prefix.subnames();
                out.push(self.clone());
                out
            }
            other => vec![other.clone()],
        }
    }

    /// The signature of a signed name, if any.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            TermName::Signed { sig, .. } => Some(sig),
            _ => None,
        }
    }

    /// The underlying name of a signed name; `self` otherwise.
    pub fn unsigned(&self) -> &TermName {
        match self {
            TermName::Signed { base, .. } => base,
            other => other,
        }
    }

    #[inline]
    pub fn to_type_name(self) -> TypeName {
        TypeName(self)
    }
}

impl fmt::Debug for TermName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermName({self})")
    }
}

impl fmt::Display for TermName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermName::Simple(s) => fmt::Display::fmt(s, f),
            TermName::Qualified {
                tag,
                prefix,
                suffix,
            } => {
                let sep = match tag {
                    QualifiedTag::Member | QualifiedTag::Package => ".",
                    QualifiedTag::Expanded => "$$",
                };
                write!(f, "{prefix}{sep}{suffix}")
            }
            TermName::Signed { base, .. } => fmt::Display::fmt(base, f),
            TermName::Unique {
                prefix,
                underlying,
                index,
            } => write!(f, "{underlying}{prefix}{index}"),
            TermName::Suffixed { tag, base } => write!(f, "{base}{}", tag.render()),
        }
    }
}

/// A name in the type namespace, wrapping the spelled-out [`TermName`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeName(TermName);

impl TypeName {
    #[inline]
    pub fn new(underlying: TermName) -> TypeName {
        TypeName(underlying)
    }

    #[inline]
    pub fn simple(text: impl Into<SmolStr>) -> TypeName {
        TypeName(TermName::simple(text))
    }

    #[inline]
    pub fn to_term_name(&self) -> &TermName {
        &self.0
    }

    #[inline]
    pub fn into_term_name(self) -> TermName {
        self.0
    }

    /// The name of the object class backing a module named like `self`.
    pub fn object_class(&self) -> TypeName {
        TypeName(TermName::suffixed(SuffixTag::ObjectClass, self.0.clone()))
    }

    pub fn is_object_class(&self) -> bool {
        matches!(
            &self.0,
            TermName::Suffixed {
                tag: SuffixTag::ObjectClass,
                ..
            }
        )
    }

    /// For an object-class name `base$`, the plain class name `base`.
    pub fn companion_base(&self) -> Option<TypeName> {
        match &self.0 {
            TermName::Suffixed {
                tag: SuffixTag::ObjectClass,
                base,
            } => Some(TypeName((**base).clone())),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> SimpleName {
        self.0.last()
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({})", self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A name in either namespace.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Name {
    Term(TermName),
    Type(TypeName),
}

impl Name {
    pub fn is_type_namespace(&self) -> bool {
        matches!(self, Name::Type(_))
    }

    pub fn as_term(&self) -> Option<&TermName> {
        match self {
            Name::Term(t) => Some(t),
            Name::Type(_) => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeName> {
        match self {
            Name::Type(t) => Some(t),
            Name::Term(_) => None,
        }
    }

    pub fn last(&self) -> SimpleName {
        match self {
            Name::Term(t) => t.last(),
            Name::Type(t) => t.last(),
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Term(t) => fmt::Debug::fmt(t, f),
            Name::Type(t) => fmt::Debug::fmt(t, f),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Term(t) => fmt::Display::fmt(t, f),
            Name::Type(t) => fmt::Display::fmt(t, f),
        }
    }
}

impl From<TermName> for Name {
    fn from(value: TermName) -> Self {
        Name::Term(value)
    }
}

impl From<TypeName> for Name {
    fn from(value: TypeName) -> Self {
        Name::Type(value)
    }
}

/// Builds a package name from its dotted rendering.
///
/// The empty string maps to the empty name (the root/empty package); a
/// dotted path maps to a chain of package-qualified names.
pub fn to_package_name(dotted: &str) -> TermName {
    if dotted.is_empty() {
        return TermName::EMPTY;
    }
    let mut segments = dotted.split('.');
    let first = segments.next().unwrap_or_default();
    let mut name = TermName::simple(first);
    for segment in segments {
        name = TermName::qualified(QualifiedTag::Package, name, SimpleName::new(segment));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_builds_member_qualified_names() {
        let base = TermName::simple("scala");
        let name = base.select(SimpleName::new("Predef"));
        assert_eq!(name.to_string(), "scala.Predef");
        assert_eq!(name.last(), SimpleName::new("Predef"));
    }

    #[test]
    fn package_name_subnames_expand_left_associatively() {
        let name = to_package_name("a.b.c");
        let subnames = name.subnames();
        let rendered: Vec<String> = subnames.iter().map(|n| n.to_string()).collect();
        assert_eq!(rendered, ["a", "a.b", "a.b.c"]);
        assert_eq!(name.segments().len(), 3);
    }

    #[test]
    fn empty_package_name_is_the_empty_name() {
        assert_eq!(to_package_name(""), TermName::EMPTY);
        assert!(TermName::EMPTY.is_empty());
    }

    #[test]
    fn object_class_names_round_trip() {
        let cls = TypeName::simple("Foo");
        let object_class = cls.object_class();
        assert_eq!(object_class.to_string(), "Foo$");
        assert!(object_class.is_object_class());
        assert_eq!(object_class.companion_base(), Some(cls));
    }

    #[test]
    fn signed_names_render_as_their_base() {
        let sig = Signature::new(
            vec![ParamSig::Term(SimpleName::new("scala.Int"))],
            SimpleName::new("scala.Int"),
        );
        let name = TermName::signed(TermName::simple("id"), sig, SimpleName::new("id"));
        assert_eq!(name.to_string(), "id");
        assert!(name.signature().is_some());
        assert_eq!(name.unsigned(), &TermName::simple("id"));
    }

    #[test]
    fn wildcard_is_recognized() {
        assert!(TermName::WILDCARD.is_wildcard());
        assert!(!TermName::simple("x").is_wildcard());
    }

    #[test]
    fn unique_names_render_with_separator_and_index() {
        let name = TermName::unique("$", TermName::simple("x"), 3);
        assert_eq!(name.to_string(), "x$3");
    }
}
