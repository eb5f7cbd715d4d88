use crate::error::{Error, Result};
use crate::pool::ConstantPool;
use crate::reader::Cursor;

pub(crate) const ACC_MODULE: u16 = 0x8000;

/// The classfile-level view of one class: names, members, and the class
/// attributes relevant to kind classification.
#[derive(Debug, Clone)]
pub struct ClassStructure {
    pub access_flags: u16,
    /// Internal (slash-separated) binary name.
    pub binary_name: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberData>,
    pub methods: Vec<MemberData>,
    /// The class-level generic `Signature` attribute, if present.
    pub signature: Option<String>,
    /// Names and payload offsets of the class-level attributes.
    pub attributes: Vec<ClassAttribute>,
}

#[derive(Debug, Clone)]
pub struct MemberData {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    /// The member's generic `Signature` attribute, if present.
    pub signature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassAttribute {
    pub name: String,
    /// Byte offset of the attribute payload within the classfile.
    pub start: u32,
    pub length: u32,
}

impl ClassStructure {
    pub fn parse(bytes: &[u8]) -> Result<ClassStructure> {
        let mut cursor = Cursor::new(bytes);
        let magic = cursor.next_u32()?;
        if magic != 0xCAFE_BABE {
            return Err(Error::BadMagic(magic));
        }
        // minor, major
        cursor.skip(4)?;
        let pool = ConstantPool::parse(&mut cursor)?;

        let access_flags = cursor.next_u16()?;
        let this_class = cursor.next_u16()?;
        let binary_name = pool.class_name(this_class)?.to_string();
        let super_index = cursor.next_u16()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index)?.to_string())
        };

        let interface_count = cursor.next_u16()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            let index = cursor.next_u16()?;
            interfaces.push(pool.class_name(index)?.to_string());
        }

        let fields = parse_members(&mut cursor, &pool)?;
        let methods = parse_members(&mut cursor, &pool)?;

        let mut signature = None;
        let mut attributes = Vec::new();
        let attribute_count = cursor.next_u16()?;
        for _ in 0..attribute_count {
            let name = pool.utf8(cursor.next_u16()?)?.to_string();
            let length = cursor.next_u32()?;
            let start = cursor.offset();
            if name == "Signature" && length == 2 {
                let index = cursor.next_u16()?;
                signature = Some(pool.utf8(index)?.to_string());
            } else {
                cursor.skip(length as usize)?;
            }
            attributes.push(ClassAttribute {
                name,
                start,
                length,
            });
        }

        Ok(ClassStructure {
            access_flags,
            binary_name,
            super_class,
            interfaces,
            fields,
            methods,
            signature,
            attributes,
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&ClassAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub(crate) fn is_module(&self) -> bool {
        self.access_flags & ACC_MODULE != 0
    }

    /// The simple (unqualified) binary name.
    pub fn simple_binary_name(&self) -> &str {
        match self.binary_name.rsplit_once('/') {
            Some((_, simple)) => simple,
            None => &self.binary_name,
        }
    }
}

fn parse_members(cursor: &mut Cursor<'_>, pool: &ConstantPool) -> Result<Vec<MemberData>> {
    let count = cursor.next_u16()? as usize;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let access_flags = cursor.next_u16()?;
        let name = pool.utf8(cursor.next_u16()?)?.to_string();
        let descriptor = pool.utf8(cursor.next_u16()?)?.to_string();
        let mut signature = None;
        let attribute_count = cursor.next_u16()?;
        for _ in 0..attribute_count {
            let attr_name = pool.utf8(cursor.next_u16()?)?;
            let length = cursor.next_u32()?;
            if attr_name == "Signature" && length == 2 {
                let index = cursor.next_u16()?;
                signature = Some(pool.utf8(index)?.to_string());
            } else {
                cursor.skip(length as usize)?;
            }
        }
        members.push(MemberData {
            access_flags,
            name,
            descriptor,
            signature,
        });
    }
    Ok(members)
}
