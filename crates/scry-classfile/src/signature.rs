//! Generic (`Signature` attribute) parsing, producing `scry-ast` types.
//!
//! Type variables become unresolved `TypeRef`s with no prefix; wildcards
//! become bounds, so `List<? extends Number>` reads back as
//! `AppliedType(List, [Bounds(Nothing, Number)])`.

use scry_ast::{Type, TypeBounds};
use scry_core::{TermName, TypeName};

use crate::descriptor::{array_of, base_type, class_reference};
use crate::error::{Error, Result};

/// Parses a field's generic signature into the type it denotes.
pub fn parse_field_signature(signature: &str) -> Result<Type> {
    let mut parser = SignatureParser::new(signature);
    let tpe = parser.parse_field_type()?;
    parser.expect_eof()?;
    Ok(tpe)
}

/// Parses a method's generic signature into a `MethodType`, wrapped in a
/// `PolyType` when the method has type parameters. The throws clause is
/// validated and dropped.
pub fn parse_method_signature(signature: &str) -> Result<Type> {
    let mut parser = SignatureParser::new(signature);
    let type_params = parser.parse_type_params_if_present()?;

    parser.expect(b'(')?;
    let mut param_types = Vec::new();
    while parser.peek() != Some(b')') {
        if parser.is_eof() {
            return Err(parser.error());
        }
        param_types.push(parser.parse_any_type()?);
    }
    parser.expect(b')')?;
    let result_type = if parser.peek() == Some(b'V') {
        parser.bump();
        Type::Unit
    } else {
        parser.parse_any_type()?
    };
    while parser.peek() == Some(b'^') {
        parser.bump();
        match parser.peek() {
            Some(b'L') | Some(b'T') => {
                parser.parse_field_type()?;
            }
            _ => return Err(parser.error()),
        }
    }
    parser.expect_eof()?;

    let param_names = (1..=param_types.len())
        .map(|i| TermName::unique("$", TermName::simple("x"), i as u32))
        .collect();
    let method = Type::method(param_names, param_types, result_type);
    if type_params.is_empty() {
        Ok(method)
    } else {
        let (names, bounds) = type_params.into_iter().unzip();
        Ok(Type::poly(names, bounds, method))
    }
}

struct SignatureParser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SignatureParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self) -> Error {
        Error::BadSignature(self.src.to_string())
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

    fn identifier_until(&mut self, stops: &[u8]) -> Result<&'a str> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if stops.contains(&byte) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error());
        }
        Ok(&self.src[start..self.pos])
    }

    fn parse_type_params_if_present(&mut self) -> Result<Vec<(TypeName, TypeBounds)>> {
        if self.peek() != Some(b'<') {
            return Ok(Vec::new());
        }
        self.bump();
        let mut params = Vec::new();
        while self.peek() != Some(b'>') {
            if self.is_eof() {
                return Err(self.error());
            }
            params.push(self.parse_type_param()?);
        }
        self.bump();
        Ok(params)
    }

    fn parse_type_param(&mut self) -> Result<(TypeName, TypeBounds)> {
        let name = self.identifier_until(&[b':'])?.to_string();
        self.expect(b':')?;
        let mut uppers = Vec::new();
        // The class bound may be empty (`T::Ljava/lang/Comparable;`).
        match self.peek() {
            Some(b':') => {}
            Some(b'L') | Some(b'T') | Some(b'[') => uppers.push(self.parse_field_type()?),
            _ => return Err(self.error()),
        }
        while self.peek() == Some(b':') {
            self.bump();
            uppers.push(self.parse_field_type()?);
        }
        let high = match uppers.len() {
            0 => Type::Any,
            1 => uppers.remove(0),
            _ => {
                let first = uppers.remove(0);
                uppers.into_iter().fold(first, Type::and)
            }
        };
        Ok((
            TypeName::simple(name),
            TypeBounds::new(Type::Nothing, high),
        ))
    }

    /// A parameter or result position: base type or field-type signature.
    fn parse_any_type(&mut self) -> Result<Type> {
        match self.peek() {
            Some(b'L') | Some(b'T') | Some(b'[') => self.parse_field_type(),
            Some(tag) => {
                let tpe = base_type(tag).ok_or_else(|| self.error())?;
                self.bump();
                Ok(tpe)
            }
            None => Err(self.error()),
        }
    }

    fn parse_field_type(&mut self) -> Result<Type> {
        match self.peek() {
            Some(b'L') => self.parse_class_type(),
            Some(b'T') => {
                self.bump();
                let name = self.identifier_until(&[b';'])?.to_string();
                self.expect(b';')?;
                Ok(Type::type_ref(Type::NoPrefix, TypeName::simple(name)))
            }
            Some(b'[') => {
                self.bump();
                Ok(array_of(self.parse_any_type()?))
            }
            _ => Err(self.error()),
        }
    }

    fn parse_class_type(&mut self) -> Result<Type> {
        self.expect(b'L')?;
        let mut path = String::new();
        let mut segment = self
            .identifier_until(&[b'/', b';', b'<', b'.'])?
            .to_string();
        while self.peek() == Some(b'/') {
            self.bump();
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(&segment);
            segment = self
                .identifier_until(&[b'/', b';', b'<', b'.'])?
                .to_string();
        }

        let internal = if path.is_empty() {
            segment.clone()
        } else {
            format!("{path}/{segment}")
        };
        let mut tpe = class_reference(&internal);
        let args = self.parse_type_args_if_present()?;
        if !args.is_empty() {
            tpe = Type::applied(tpe, args);
        }

        // Nested generic segments select from the enclosing instance.
        while self.peek() == Some(b'.') {
            self.bump();
            let inner = self.identifier_until(&[b';', b'<', b'.'])?.to_string();
            tpe = Type::type_ref(tpe, TypeName::simple(inner));
            let args = self.parse_type_args_if_present()?;
            if !args.is_empty() {
                tpe = Type::applied(tpe, args);
            }
        }

        self.expect(b';')?;
        Ok(tpe)
    }

    fn parse_type_args_if_present(&mut self) -> Result<Vec<Type>> {
        if self.peek() != Some(b'<') {
            return Ok(Vec::new());
        }
        self.bump();
        let mut args = Vec::new();
        while self.peek() != Some(b'>') {
            if self.is_eof() {
                return Err(self.error());
            }
            let arg = match self.peek() {
                Some(b'*') => {
                    self.bump();
                    Type::bounds(TypeBounds::unbounded())
                }
                Some(b'+') => {
                    self.bump();
                    Type::bounds(TypeBounds::new(Type::Nothing, self.parse_field_type()?))
                }
                Some(b'-') => {
                    self.bump();
                    Type::bounds(TypeBounds::new(self.parse_field_type()?, Type::Any))
                }
                _ => self.parse_field_type()?,
            };
            args.push(arg);
        }
        self.bump();
        Ok(args)
    }
}
