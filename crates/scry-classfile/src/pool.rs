use crate::error::{Error, Result};
use crate::reader::Cursor;

/// The constant pool, reduced to what classification needs: Utf8 texts and
/// class-name references. Everything else is parsed for its size only.
pub(crate) struct ConstantPool {
    entries: Vec<Entry>,
}

enum Entry {
    Utf8(String),
    Class { name_index: u16 },
    /// A retained slot we never look at (including the padding slot after
    /// `Long`/`Double` entries and index 0).
    Opaque,
}

impl ConstantPool {
    pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
        let count = cursor.next_u16()? as usize;
        if count == 0 {
            return Err(Error::Malformed("constant pool count"));
        }
        let mut entries = Vec::with_capacity(count);
        entries.push(Entry::Opaque);
        while entries.len() < count {
            let tag = cursor.next_u8()?;
            match tag {
                // Utf8
                1 => {
                    let len = cursor.next_u16()? as usize;
                    let text = decode_modified_utf8(cursor.take(len)?)?;
                    entries.push(Entry::Utf8(text));
                }
                // Class
                7 => {
                    let name_index = cursor.next_u16()?;
                    entries.push(Entry::Class { name_index });
                }
                // Integer, Float, Fieldref, Methodref, InterfaceMethodref,
                // NameAndType, Dynamic, InvokeDynamic
                3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                    cursor.skip(4)?;
                    entries.push(Entry::Opaque);
                }
                // Long, Double: eight payload bytes and a phantom second slot.
                5 | 6 => {
                    cursor.skip(8)?;
                    entries.push(Entry::Opaque);
                    entries.push(Entry::Opaque);
                }
                // String, MethodType, Module, Package
                8 | 16 | 19 | 20 => {
                    cursor.skip(2)?;
                    entries.push(Entry::Opaque);
                }
                // MethodHandle
                15 => {
                    cursor.skip(3)?;
                    entries.push(Entry::Opaque);
                }
                other => return Err(Error::UnknownConstantTag(other)),
            }
        }
        if entries.len() != count {
            return Err(Error::Malformed("constant pool"));
        }
        Ok(Self { entries })
    }

    pub(crate) fn utf8(&self, index: u16) -> Result<&str> {
        match self.entries.get(index as usize) {
            Some(Entry::Utf8(text)) => Ok(text),
            Some(_) => Err(Error::NotUtf8 { index }),
            None => Err(Error::BadConstantIndex(index)),
        }
    }

    pub(crate) fn class_name(&self, index: u16) -> Result<&str> {
        match self.entries.get(index as usize) {
            Some(Entry::Class { name_index }) => self.utf8(*name_index),
            Some(_) => Err(Error::NotUtf8 { index }),
            None => Err(Error::BadConstantIndex(index)),
        }
    }
}

/// Decodes classfile "modified UTF-8": plain UTF-8 over the BMP, with NUL
/// written as `0xC0 0x80` and supplementary characters as CESU-8 surrogate
/// pairs. Decoded through UTF-16 code units so unpaired surrogates in
/// generated names do not reject the whole classfile.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    fn continuation(byte: u8) -> Result<u16> {
        if byte & 0xC0 == 0x80 {
            Ok((byte & 0x3F) as u16)
        } else {
            Err(Error::InvalidUtf8)
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(byte) = iter.next() {
        let unit = match byte {
            0x01..=0x7F => byte as u16,
            0xC0..=0xDF => {
                let second = iter.next().ok_or(Error::InvalidUtf8)?;
                (byte as u16 & 0x1F) << 6 | continuation(second)?
            }
            0xE0..=0xEF => {
                let second = iter.next().ok_or(Error::InvalidUtf8)?;
                let third = iter.next().ok_or(Error::InvalidUtf8)?;
                (byte as u16 & 0x0F) << 12 | continuation(second)? << 6 | continuation(third)?
            }
            // A bare NUL byte and 4-byte sequences never appear in
            // modified UTF-8.
            _ => return Err(Error::InvalidUtf8),
        };
        units.push(unit);
    }
    Ok(String::from_utf16_lossy(&units))
}
