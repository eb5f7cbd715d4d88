//! Classfile glue: populating root symbols from classfile-only classes.
//!
//! Java roots get one regular symbol per field and method, typed from the
//! generic signature when present and the erased descriptor otherwise.
//! Scala 2 roots are populated from the same erased classfile view; the
//! Scala 2 pickle itself is not decoded.

use scry_ast::{BaseContext, ClassId, Type};
use scry_classfile::{
    parse_field_descriptor, parse_field_signature, parse_method_descriptor,
    parse_method_signature, ClassStructure, MemberData,
};
use scry_core::{Name, ParamSig, Signature, SimpleName, TermName};

use crate::errors::LoaderError;
use crate::loader::LoadRoot;

pub(crate) fn load_java_class(
    cx: &BaseContext,
    cls: ClassId,
    structure: &ClassStructure,
    _class_signature: Option<&str>,
    _token: &LoadRoot,
) -> Result<(), LoaderError> {
    populate_members(cx, cls, structure)?;
    cx.set_initialised(cls.as_symbol())?;
    tracing::debug!(class = %structure.binary_name, "loaded java class");
    Ok(())
}

pub(crate) fn load_scala2_class(
    cx: &BaseContext,
    cls: ClassId,
    structure: &ClassStructure,
    _runtime_annot_start: u32,
    _token: &LoadRoot,
) -> Result<(), LoaderError> {
    populate_members(cx, cls, structure)?;
    cx.set_initialised(cls.as_symbol())?;
    tracing::debug!(class = %structure.binary_name, "loaded scala 2 class");
    Ok(())
}

fn populate_members(
    cx: &BaseContext,
    cls: ClassId,
    structure: &ClassStructure,
) -> Result<(), LoaderError> {
    for field in &structure.fields {
        let declared = member_type(field, false)?;
        let name = Name::Term(TermName::simple(field.name.as_str()));
        match cx.create_symbol(name, cls.as_symbol()) {
            Ok(symbol) => {
                cx.set_declared_type(symbol, declared)?;
                cx.set_initialised(symbol)?;
            }
            Err(err) => {
                tracing::debug!(field = %field.name, %err, "skipping duplicate field");
            }
        }
    }
    for method in &structure.methods {
        if method.name == "<clinit>" {
            continue;
        }
        let declared = member_type(method, true)?;
        let base = TermName::simple(method.name.as_str());
        let signed = TermName::signed(base.clone(), erased_signature(&declared), base.last());
        match cx.create_symbol(Name::Term(signed), cls.as_symbol()) {
            Ok(symbol) => {
                cx.set_declared_type(symbol, declared)?;
                cx.set_initialised(symbol)?;
            }
            Err(err) => {
                tracing::debug!(method = %method.name, %err, "skipping duplicate method");
            }
        }
    }
    Ok(())
}

fn member_type(member: &MemberData, is_method: bool) -> Result<Type, LoaderError> {
    if let Some(signature) = member.signature.as_deref() {
        let parsed = if is_method {
            parse_method_signature(signature)
        } else {
            parse_field_signature(signature)
        };
        match parsed {
            Ok(tpe) => return Ok(tpe),
            Err(err) => {
                // Some tools emit malformed signatures; fall back to the
                // erased descriptor.
                tracing::debug!(member = %member.name, %err, "unusable generic signature");
            }
        }
    }
    let tpe = if is_method {
        parse_method_descriptor(&member.descriptor)?
    } else {
        parse_field_descriptor(&member.descriptor)?
    };
    Ok(tpe)
}

/// The erased overload signature of a declared method type: one entry per
/// term parameter (its erased type name), a length entry per type-parameter
/// clause, and the erased result.
pub(crate) fn erased_signature(tpe: &Type) -> Signature {
    fn erased(tpe: &Type) -> SimpleName {
        tpe.erased_name()
            .unwrap_or_else(|| SimpleName::new("java.lang.Object"))
    }

    fn collect(tpe: &Type, params: &mut Vec<ParamSig>) -> SimpleName {
        match tpe {
            Type::Method(method) => {
                for param in &method.param_types {
                    params.push(ParamSig::Term(erased(param)));
                }
                collect(&method.result_type, params)
            }
            Type::Poly(poly) => {
                params.push(ParamSig::TypeLen(poly.param_names.len() as u32));
                collect(&poly.result_type, params)
            }
            other => erased(other),
        }
    }

    let mut params = Vec::new();
    let result = collect(tpe, &mut params);
    Signature::new(params, result)
}
