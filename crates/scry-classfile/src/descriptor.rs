use scry_ast::Type;
use scry_core::{to_package_name, TermName, TypeName};

use crate::error::{Error, Result};

/// The Scala-side reference for a JVM internal class name, e.g.
/// `java/lang/String` becomes `TypeRef(PackageRef(java.lang), String)`.
pub(crate) fn class_reference(internal_name: &str) -> Type {
    match internal_name.rsplit_once('/') {
        Some((package, simple)) => Type::type_ref(
            Type::package(to_package_name(&package.replace('/', "."))),
            TypeName::simple(simple),
        ),
        None => Type::type_ref(
            Type::package(TermName::EMPTY),
            TypeName::simple(internal_name),
        ),
    }
}

pub(crate) fn scala_reference(simple: &str) -> Type {
    Type::type_ref(
        Type::package(to_package_name("scala")),
        TypeName::simple(simple),
    )
}

pub(crate) fn base_type(tag: u8) -> Option<Type> {
    let simple = match tag {
        b'B' => "Byte",
        b'C' => "Char",
        b'D' => "Double",
        b'F' => "Float",
        b'I' => "Int",
        b'J' => "Long",
        b'S' => "Short",
        b'Z' => "Boolean",
        _ => return None,
    };
    Some(scala_reference(simple))
}

pub(crate) fn array_of(element: Type) -> Type {
    Type::applied(scala_reference("Array"), vec![element])
}

/// Parses an erased field descriptor into the type it denotes.
pub fn parse_field_descriptor(descriptor: &str) -> Result<Type> {
    let mut parser = DescriptorParser::new(descriptor);
    let tpe = parser.parse_type()?;
    parser.expect_eof()?;
    Ok(tpe)
}

/// Parses an erased method descriptor into a `MethodType` with synthesized
/// parameter names.
pub fn parse_method_descriptor(descriptor: &str) -> Result<Type> {
    let mut parser = DescriptorParser::new(descriptor);
    parser.expect(b'(')?;
    let mut param_types = Vec::new();
    while parser.peek() != Some(b')') {
        if parser.is_eof() {
            return Err(parser.error());
        }
        param_types.push(parser.parse_type()?);
    }
    parser.expect(b')')?;
    let result_type = if parser.peek() == Some(b'V') {
        parser.bump();
        Type::Unit
    } else {
        parser.parse_type()?
    };
    parser.expect_eof()?;
    let param_names = (1..=param_types.len())
        .map(|i| TermName::unique("$", TermName::simple("x"), i as u32))
        .collect();
    Ok(Type::method(param_names, param_types, result_type))
}

struct DescriptorParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self) -> Error {
        Error::BadDescriptor(self.src.to_string())
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.bump() == Some(byte) {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.is_eof() {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn parse_type(&mut self) -> Result<Type> {
        match self.bump() {
            Some(b'[') => Ok(array_of(self.parse_type()?)),
            Some(b'L') => {
                let start = self.pos;
                while self.peek() != Some(b';') {
                    if self.bump().is_none() {
                        return Err(self.error());
                    }
                }
                let name = &self.src[start..self.pos];
                self.bump();
                if name.is_empty() {
                    return Err(self.error());
                }
                Ok(class_reference(name))
            }
            Some(tag) => base_type(tag).ok_or_else(|| self.error()),
            None => Err(self.error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_descriptors_map_to_scala_references() {
        assert_eq!(parse_field_descriptor("I").unwrap(), scala_reference("Int"));
        assert_eq!(
            parse_field_descriptor("Ljava/lang/String;").unwrap(),
            class_reference("java/lang/String"),
        );
        assert_eq!(
            parse_field_descriptor("[I").unwrap(),
            array_of(scala_reference("Int")),
        );
    }

    #[test]
    fn method_descriptors_build_method_types() {
        let tpe = parse_method_descriptor("(ILjava/lang/String;)V").unwrap();
        match tpe {
            Type::Method(method) => {
                assert_eq!(method.param_types.len(), 2);
                assert_eq!(method.result_type, Type::Unit);
                assert_eq!(method.param_names[0].to_string(), "x$1");
            }
            other => panic!("expected a method type, got {other:?}"),
        }
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(parse_field_descriptor("II").is_err());
        assert!(parse_field_descriptor("Ljava/lang/String").is_err());
        assert!(parse_method_descriptor("(I").is_err());
    }
}