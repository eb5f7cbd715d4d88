use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Truncated,
    BadMagic(u32),
    BadConstantIndex(u16),
    UnknownConstantTag(u8),
    NotUtf8 { index: u16 },
    InvalidUtf8,
    BadDescriptor(String),
    BadSignature(String),
    Malformed(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => f.write_str("classfile ends prematurely"),
            Error::BadMagic(magic) => write!(f, "bad classfile magic: 0x{magic:08x}"),
            Error::BadConstantIndex(index) => {
                write!(f, "constant pool index {index} out of range")
            }
            Error::UnknownConstantTag(tag) => write!(f, "unknown constant pool tag {tag}"),
            Error::NotUtf8 { index } => {
                write!(f, "constant pool entry {index} is not a Utf8 constant")
            }
            Error::InvalidUtf8 => f.write_str("invalid modified UTF-8 text"),
            Error::BadDescriptor(desc) => write!(f, "malformed descriptor: {desc}"),
            Error::BadSignature(sig) => write!(f, "malformed signature: {sig}"),
            Error::Malformed(what) => write!(f, "malformed {what}"),
        }
    }
}

impl std::error::Error for Error {}
