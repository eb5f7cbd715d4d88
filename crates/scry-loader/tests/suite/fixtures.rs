//! Shared fixtures: a canned-forest decoder, event builders, and a minimal
//! classfile byte builder.

use std::collections::HashMap;
use std::sync::Arc;

use scry_classpath::{ClassData, Classpath, PackageData, TastyData};
use scry_core::{to_package_name, Constant, TermName, TypeName};
use scry_loader::{
    Context, DecoderError, EventArg, EventNode, EventTag, PositionTable, TastyDecoder,
};

/// A decoder replaying canned event forests, keyed by the tasty payload
/// bytes (which the fixtures set to the root's name).
#[derive(Default)]
pub struct StubDecoder {
    forests: HashMap<Vec<u8>, (PositionTable, Vec<EventNode>)>,
}

impl StubDecoder {
    pub fn with(mut self, key: &str, positions: PositionTable, trees: Vec<EventNode>) -> Self {
        self.forests
            .insert(key.as_bytes().to_vec(), (positions, trees));
        self
    }

    fn entry(&self, tasty: &TastyData) -> Result<&(PositionTable, Vec<EventNode>), DecoderError> {
        self.forests
            .get(&*tasty.bytes)
            .ok_or_else(|| DecoderError::Corrupt(format!("no forest for {}", tasty.debug_path)))
    }
}

impl TastyDecoder for StubDecoder {
    fn unpickle_positions(&self, tasty: &TastyData) -> Result<PositionTable, DecoderError> {
        self.entry(tasty).map(|(positions, _)| positions.clone())
    }

    fn unpickle_trees(&self, tasty: &TastyData) -> Result<Vec<EventNode>, DecoderError> {
        self.entry(tasty).map(|(_, trees)| trees.clone())
    }
}

pub fn tasty_entry(simple_name: &str) -> TastyData {
    TastyData {
        simple_name: simple_name.to_string(),
        debug_path: format!("{simple_name}.tasty"),
        bytes: Arc::from(simple_name.as_bytes()),
    }
}

pub fn class_entry(simple_name: &str, bytes: Vec<u8>) -> ClassData {
    ClassData {
        simple_name: simple_name.to_string(),
        debug_path: format!("{simple_name}.class"),
        bytes: Arc::from(bytes),
    }
}

pub fn tasty_only_package(dotted_name: &str, roots: &[&str]) -> PackageData {
    PackageData {
        dotted_name: dotted_name.to_string(),
        classes: Vec::new(),
        tastys: roots.iter().map(|root| tasty_entry(root)).collect(),
    }
}

pub fn context_for(packages: Vec<PackageData>, decoder: StubDecoder) -> Context {
    Context::initialize(Classpath::new(packages), Arc::new(decoder)).expect("context initializes")
}

// Event construction helpers.

pub fn node(tag: EventTag, args: Vec<EventArg>) -> EventNode {
    EventNode::new(tag, 0, args)
}

pub fn node_at(tag: EventTag, addr: u32, args: Vec<EventArg>) -> EventNode {
    EventNode::new(tag, addr, args)
}

pub fn child(node: EventNode) -> EventArg {
    EventArg::Node(node)
}

pub fn children(nodes: Vec<EventNode>) -> EventArg {
    EventArg::List(nodes)
}

pub fn none() -> EventArg {
    EventArg::List(Vec::new())
}

pub fn term(name: &str) -> EventArg {
    EventArg::TermName(TermName::simple(name))
}

pub fn type_name(name: &str) -> EventArg {
    EventArg::TypeName(TypeName::simple(name))
}

pub fn package_name(dotted: &str) -> EventArg {
    EventArg::TermName(to_package_name(dotted))
}

pub fn constant(value: Constant) -> EventArg {
    EventArg::Constant(value)
}

// Common event fragments.

/// `scala.Unit` as a wrapped type tree.
pub fn unit_tpt() -> EventNode {
    node(EventTag::WrapperTpt, vec![child(node(EventTag::UnitTy, vec![]))])
}

/// A `TypeIdent` anchored in a package, e.g. `scala.Int`.
pub fn type_ident(package: &str, name: &str) -> EventNode {
    node(
        EventTag::IdentTpt,
        vec![
            type_name(name),
            child(node(EventTag::PackageRefTy, vec![package_name(package)])),
        ],
    )
}

/// An empty constructor: `def <init>(): Unit`.
pub fn empty_ctor() -> EventNode {
    node(
        EventTag::DefDef,
        vec![
            term("<init>"),
            children(vec![node(EventTag::TermParams, vec![children(vec![])])]),
            child(unit_tpt()),
            none(),
        ],
    )
}

/// The `java.lang.Object` parent constructor invocation.
pub fn object_parent() -> EventNode {
    let object_ref = node(
        EventTag::TypeRefTy,
        vec![
            child(node(EventTag::PackageRefTy, vec![package_name("java.lang")])),
            type_name("Object"),
        ],
    );
    let new_object = node(
        EventTag::New,
        vec![child(node(
            EventTag::WrapperTpt,
            vec![child(object_ref)],
        ))],
    );
    node(
        EventTag::Apply,
        vec![
            child(node(
                EventTag::Select,
                vec![child(new_object), term("<init>")],
            )),
            children(vec![]),
        ],
    )
}

/// A class with an empty constructor, `java.lang.Object` as parent, and the
/// given template body.
pub fn class_def(name: &str, body: Vec<EventNode>) -> EventNode {
    class_def_named(TypeName::simple(name), body)
}

/// Like [`class_def`] but with a structured class name (e.g. an
/// object-class name).
pub fn class_def_named(name: TypeName, body: Vec<EventNode>) -> EventNode {
    class_def_with(name, empty_ctor(), body)
}

pub fn class_def_with_ctor(name: &str, ctor: EventNode, body: Vec<EventNode>) -> EventNode {
    class_def_with(TypeName::simple(name), ctor, body)
}

fn class_def_with(name: TypeName, ctor: EventNode, body: Vec<EventNode>) -> EventNode {
    node(
        EventTag::ClassDef,
        vec![
            EventArg::TypeName(name),
            child(node(
                EventTag::Template,
                vec![
                    child(ctor),
                    children(vec![object_parent()]),
                    none(),
                    children(body),
                ],
            )),
        ],
    )
}

pub fn package_def(dotted: &str, stats: Vec<EventNode>) -> EventNode {
    node(
        EventTag::PackageDef,
        vec![package_name(dotted), children(stats)],
    )
}

// Classfile byte building.

/// Builds a minimal classfile: the given binary name, `java.lang.Object`
/// super class, descriptor-typed members, and empty class-level marker
/// attributes (e.g. `TASTY`, `ScalaSig`).
pub fn build_classfile(
    binary_name: &str,
    marker_attributes: &[&str],
    fields: &[(&str, &str)],
    methods: &[(&str, &str)],
) -> Vec<u8> {
    let mut pool = ConstantPoolBuilder::default();
    let this_class = pool.class(binary_name);
    let super_class = pool.class("java/lang/Object");
    let field_refs: Vec<(u16, u16)> = fields
        .iter()
        .map(|(name, descriptor)| (pool.utf8(name), pool.utf8(descriptor)))
        .collect();
    let method_refs: Vec<(u16, u16)> = methods
        .iter()
        .map(|(name, descriptor)| (pool.utf8(name), pool.utf8(descriptor)))
        .collect();
    let attribute_refs: Vec<u16> = marker_attributes
        .iter()
        .map(|name| pool.utf8(name))
        .collect();

    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // minor
    out.extend_from_slice(&52u16.to_be_bytes()); // major (Java 8)
    pool.write(&mut out);
    out.extend_from_slice(&0x0021u16.to_be_bytes()); // ACC_PUBLIC | ACC_SUPER
    out.extend_from_slice(&this_class.to_be_bytes());
    out.extend_from_slice(&super_class.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // interfaces

    out.extend_from_slice(&(field_refs.len() as u16).to_be_bytes());
    for (name, descriptor) in field_refs {
        write_member(&mut out, name, descriptor);
    }
    out.extend_from_slice(&(method_refs.len() as u16).to_be_bytes());
    for (name, descriptor) in method_refs {
        write_member(&mut out, name, descriptor);
    }

    out.extend_from_slice(&(attribute_refs.len() as u16).to_be_bytes());
    for name in attribute_refs {
        out.extend_from_slice(&name.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // empty payload
    }
    out
}

fn write_member(out: &mut Vec<u8>, name: u16, descriptor: u16) {
    out.extend_from_slice(&0x0001u16.to_be_bytes()); // ACC_PUBLIC
    out.extend_from_slice(&name.to_be_bytes());
    out.extend_from_slice(&descriptor.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // no attributes
}

#[derive(Default)]
struct ConstantPoolBuilder {
    entries: Vec<Vec<u8>>,
}

impl ConstantPoolBuilder {
    fn utf8(&mut self, text: &str) -> u16 {
        let mut entry = vec![1u8];
        entry.extend_from_slice(&(text.len() as u16).to_be_bytes());
        entry.extend_from_slice(text.as_bytes());
        self.push(entry)
    }

    fn class(&mut self, binary_name: &str) -> u16 {
        let name_index = self.utf8(binary_name);
        let mut entry = vec![7u8];
        entry.extend_from_slice(&name_index.to_be_bytes());
        self.push(entry)
    }

    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.entries.push(entry);
        self.entries.len() as u16
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&((self.entries.len() + 1) as u16).to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
    }
}
