//! Wire value types
//!
//! Every bridged property advertises a [`TypeTag`] that fixes its byte
//! encoding. Tags without a natural host representation on the peer side
//! (auto structs, object references, void) collapse to a one-byte dummy
//! payload and are never writable.

pub mod codec;

pub use codec::{decode_into, decode_string, decode_track, encode_string, encode_track, encode_value};

/// Wire type of a bridged property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    String,
    /// Enum carried as its member name
    EnumAsString,
    Vec2,
    Vec3,
    Vec4,
    /// Euler rotation with axis order permuted at the boundary
    Rotator,
    /// Camera telemetry record, 19 doubles
    Track,
    /// Shareable texture, identified out of band
    TextureHandle,
    /// Struct expanded into child properties, the parent itself carries no data
    AutoStruct,
    /// Object reference expanded into child properties
    ObjectReference,
    Void,
}

impl TypeTag {
    /// Peer-facing type name
    pub fn wire_name(self) -> &'static str {
        match self {
            TypeTag::F32 => "float",
            TypeTag::F64 => "double",
            TypeTag::I8 => "sbyte",
            TypeTag::I16 => "short",
            TypeTag::I32 => "int",
            TypeTag::I64 => "long",
            TypeTag::U8 => "ubyte",
            TypeTag::U16 => "ushort",
            TypeTag::U32 => "uint",
            TypeTag::U64 => "ulong",
            TypeTag::Bool => "bool",
            TypeTag::String | TypeTag::EnumAsString => "string",
            TypeTag::Vec2 => "vec2d",
            TypeTag::Vec3 => "vec3d",
            TypeTag::Vec4 => "vec4d",
            TypeTag::Rotator => "rotator",
            TypeTag::Track => "track",
            TypeTag::TextureHandle => "texture",
            TypeTag::AutoStruct | TypeTag::ObjectReference | TypeTag::Void => "void",
        }
    }

    /// Fixed payload size in bytes, `None` for string-carrying tags
    pub fn natural_size(self) -> Option<usize> {
        match self {
            TypeTag::I8 | TypeTag::U8 | TypeTag::Bool => Some(1),
            TypeTag::I16 | TypeTag::U16 => Some(2),
            TypeTag::F32 | TypeTag::I32 | TypeTag::U32 => Some(4),
            TypeTag::F64 | TypeTag::I64 | TypeTag::U64 => Some(8),
            TypeTag::String | TypeTag::EnumAsString => None,
            TypeTag::Vec2 => Some(16),
            TypeTag::Vec3 | TypeTag::Rotator => Some(24),
            TypeTag::Vec4 => Some(32),
            TypeTag::Track => Some(152),
            TypeTag::TextureHandle => Some(16),
            // one-byte dummy payload
            TypeTag::AutoStruct | TypeTag::ObjectReference | TypeTag::Void => Some(1),
        }
    }

    /// Whether inbound values may be written through this tag
    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            TypeTag::Void | TypeTag::AutoStruct | TypeTag::ObjectReference | TypeTag::TextureHandle
        )
    }
}
